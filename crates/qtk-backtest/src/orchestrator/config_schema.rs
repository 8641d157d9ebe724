//! Grid search over a strategy's tunable parameter axes.
//!
//! A strategy's `CONFIG_SCHEMA` enumerates its tunable parameters with
//! numeric min/max bounds (the JSON-Schema shape itself lives with the
//! strategy registry; this module only needs the min/max/integer facts to
//! expand a Cartesian product of values).

use std::collections::BTreeMap;

/// One tunable parameter's bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigAxis {
    pub name: String,
    pub min: f64,
    pub max: f64,
    /// Values are rounded to the nearest integer and deduplicated before
    /// the Cartesian product is built.
    pub is_integer: bool,
}

impl ConfigAxis {
    pub fn new(name: impl Into<String>, min: f64, max: f64, is_integer: bool) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            is_integer,
        }
    }
}

pub const DEFAULT_STEPS_PER_AXIS: usize = 5;

fn axis_values(axis: &ConfigAxis, steps: usize) -> Vec<f64> {
    if steps <= 1 || axis.max <= axis.min {
        return vec![axis.min];
    }
    let raw: Vec<f64> = (0..steps)
        .map(|i| axis.min + (axis.max - axis.min) * i as f64 / (steps - 1) as f64)
        .collect();

    if axis.is_integer {
        let mut rounded: Vec<i64> = raw.iter().map(|v| v.round() as i64).collect();
        rounded.dedup();
        rounded.into_iter().map(|v| v as f64).collect()
    } else {
        raw
    }
}

/// Result of expanding a grid search: the combinations actually produced
/// (after truncation), whether truncation happened, and how many
/// combinations existed before the cap was applied.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSearchResult {
    pub combinations: Vec<BTreeMap<String, f64>>,
    pub truncated: bool,
    pub total_before_cap: usize,
}

/// Enumerate the Cartesian product of every axis's values (default 5
/// steps per axis), capped at `max_combinations`. Truncation is logged via
/// `tracing::warn!`, never silent.
pub fn grid_search(
    schema: &[ConfigAxis],
    steps_per_axis: usize,
    max_combinations: usize,
) -> GridSearchResult {
    let axis_value_lists: Vec<(String, Vec<f64>)> = schema
        .iter()
        .map(|axis| (axis.name.clone(), axis_values(axis, steps_per_axis)))
        .collect();

    let mut combos: Vec<BTreeMap<String, f64>> = vec![BTreeMap::new()];
    for (name, values) in &axis_value_lists {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for value in values {
                let mut expanded = combo.clone();
                expanded.insert(name.clone(), *value);
                next.push(expanded);
            }
        }
        combos = next;
    }

    let total_before_cap = combos.len();
    let truncated = total_before_cap > max_combinations;
    if truncated {
        tracing::warn!(
            total_before_cap,
            max_combinations,
            "grid search combination count exceeds max_combinations, truncating"
        );
        combos.truncate(max_combinations);
    }

    GridSearchResult {
        combinations: combos,
        truncated,
        total_before_cap,
    }
}
