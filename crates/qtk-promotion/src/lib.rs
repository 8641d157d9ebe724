mod artifact_gate; // Patch B6 — golden-artifact hash-lock gate
mod evaluator;
mod types;

pub use artifact_gate::{lock_artifact_from_str, ArtifactLock, LockError};
pub use evaluator::{
    build_report, check_metrics_finite, compute_metrics, evaluate_promotion, pick_winner,
    select_best,
};
pub use types::{
    write_promotion_report_json, Candidate, PromotionConfig, PromotionDecision, PromotionInput,
    PromotionMetrics, PromotionReport, StressSuiteResult,
};
