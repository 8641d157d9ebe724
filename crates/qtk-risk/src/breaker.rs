//! Percentage-based circuit breaker — spec §4.5.
//!
//! Distinct from [`crate::engine::evaluate`]'s absolute-micros waterfall:
//! this breaker works in fractions of peak equity and raw cash units, is a
//! one-way latch (no programmatic untrip), and enforces hard ceilings that
//! a caller-supplied, looser config can never exceed. Mirrors the reference
//! `RiskCircuitBreaker`, generalized to the deterministic `day_id` rollover
//! convention already used by [`crate::engine::tick`] instead of reading the
//! wall clock.

/// The absolute ceilings no configured limit may exceed, regardless of what
/// a caller requests. Mirrors `HARD_LIMITS` in the reference breaker.
pub const HARD_MAX_DRAWDOWN_PCT: f64 = 0.15;
pub const HARD_SINGLE_ORDER_SIZE_CAP: f64 = 1.0;
pub const HARD_DAILY_LOSS_LIMIT: f64 = 5000.0;

/// Caller-requested limits. Clamped to the hard ceilings in
/// [`CircuitBreakerLimits::clamped`] before use — configuration can only
/// ever make the breaker stricter, never looser.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CircuitBreakerLimits {
    pub max_drawdown_pct: f64,
    pub single_order_size_cap: f64,
    pub daily_loss_limit: f64,
}

impl CircuitBreakerLimits {
    pub fn clamped(self) -> Self {
        Self {
            max_drawdown_pct: self.max_drawdown_pct.min(HARD_MAX_DRAWDOWN_PCT),
            single_order_size_cap: self.single_order_size_cap.min(HARD_SINGLE_ORDER_SIZE_CAP),
            daily_loss_limit: self.daily_loss_limit.min(HARD_DAILY_LOSS_LIMIT),
        }
    }
}

/// Why the breaker refused an order or latched.
#[derive(Clone, Debug, PartialEq)]
pub enum BreachReason {
    OrderSizeExceedsCap { order_size: f64, cap: f64 },
    MaxDrawdownBreached { drawdown_pct: f64, limit_pct: f64 },
    DailyLossLimitBreached { daily_loss: f64, limit: f64 },
    AlreadyTripped { reason: Box<BreachReason> },
}

impl std::fmt::Display for BreachReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreachReason::OrderSizeExceedsCap { order_size, cap } => {
                write!(f, "order size {order_size} exceeds cap {cap}")
            }
            BreachReason::MaxDrawdownBreached { drawdown_pct, limit_pct } => write!(
                f,
                "max drawdown breached: {:.2}% >= {:.2}%",
                drawdown_pct * 100.0,
                limit_pct * 100.0
            ),
            BreachReason::DailyLossLimitBreached { daily_loss, limit } => {
                write!(f, "daily loss limit breached: ${daily_loss:.2} >= ${limit:.2}")
            }
            BreachReason::AlreadyTripped { reason } => {
                write!(f, "circuit breaker tripped: {reason}")
            }
        }
    }
}

impl std::error::Error for BreachReason {}

/// One trip event, retained for audit/status reporting.
#[derive(Clone, Debug, PartialEq)]
pub struct TripRecord {
    pub reason: BreachReason,
    pub day_id: u32,
    pub equity: f64,
    pub daily_pnl: f64,
}

/// Runtime state of the breaker. `day_id` is a caller-supplied monotonic day
/// counter (matches [`crate::RiskState::day_id`]'s rollover convention) —
/// this module never reads the wall clock itself.
#[derive(Clone, Debug, PartialEq)]
pub struct CircuitBreakerState {
    pub is_tripped: bool,
    pub tripped_reason: Option<BreachReason>,
    pub daily_pnl: f64,
    pub peak_equity: f64,
    pub current_equity: f64,
    pub day_id: u32,
    pub trip_history: Vec<TripRecord>,
}

impl CircuitBreakerState {
    pub fn new(initial_equity: f64, day_id: u32) -> Self {
        Self {
            is_tripped: false,
            tripped_reason: None,
            daily_pnl: 0.0,
            peak_equity: initial_equity,
            current_equity: initial_equity,
            day_id,
            trip_history: Vec::new(),
        }
    }

    pub fn current_drawdown_pct(&self) -> f64 {
        if self.peak_equity > 0.0 {
            (self.peak_equity - self.current_equity) / self.peak_equity
        } else {
            0.0
        }
    }

    fn maybe_reset_daily(&mut self, day_id: u32) {
        if day_id != self.day_id {
            self.daily_pnl = 0.0;
            self.day_id = day_id;
        }
    }

    fn daily_loss(&self) -> f64 {
        if self.daily_pnl < 0.0 {
            -self.daily_pnl
        } else {
            0.0
        }
    }

    fn trip(&mut self, reason: BreachReason) -> BreachReason {
        self.is_tripped = true;
        self.tripped_reason = Some(reason.clone());
        self.trip_history.push(TripRecord {
            reason: reason.clone(),
            day_id: self.day_id,
            equity: self.current_equity,
            daily_pnl: self.daily_pnl,
        });
        reason
    }
}

/// Non-bypassable risk circuit breaker: a one-way latch with no
/// programmatic untrip, exactly as the reference implementation documents
/// itself ("SAFETY CRITICAL... cannot be disabled or bypassed").
#[derive(Clone, Debug, PartialEq)]
pub struct RiskCircuitBreaker {
    pub limits: CircuitBreakerLimits,
    pub state: CircuitBreakerState,
}

impl RiskCircuitBreaker {
    pub fn new(limits: CircuitBreakerLimits, initial_equity: f64, day_id: u32) -> Self {
        Self {
            limits: limits.clamped(),
            state: CircuitBreakerState::new(initial_equity, day_id),
        }
    }

    /// Is this order size, on its own, within the per-order cap? Does not
    /// consult drawdown/daily-loss state beyond the tripped latch — those
    /// are evaluated by `update_equity`/`record_trade_pnl`.
    pub fn check_order(&self, order_size: f64) -> Result<(), BreachReason> {
        if self.state.is_tripped {
            let reason = self
                .state
                .tripped_reason
                .clone()
                .expect("is_tripped implies tripped_reason is set");
            return Err(BreachReason::AlreadyTripped {
                reason: Box::new(reason),
            });
        }
        if order_size > self.limits.single_order_size_cap {
            return Err(BreachReason::OrderSizeExceedsCap {
                order_size,
                cap: self.limits.single_order_size_cap,
            });
        }
        Ok(())
    }

    /// Update tracked equity, roll peak forward, and check drawdown + daily
    /// loss. Trips (latches) the breaker on breach.
    pub fn update_equity(&mut self, current_equity: f64, day_id: u32) -> Result<(), BreachReason> {
        self.state.maybe_reset_daily(day_id);
        self.state.current_equity = current_equity;
        if current_equity > self.state.peak_equity {
            self.state.peak_equity = current_equity;
        }

        let drawdown = self.state.current_drawdown_pct();
        if drawdown >= self.limits.max_drawdown_pct {
            return Err(self.state.trip(BreachReason::MaxDrawdownBreached {
                drawdown_pct: drawdown,
                limit_pct: self.limits.max_drawdown_pct,
            }));
        }

        let daily_loss = self.state.daily_loss();
        if daily_loss >= self.limits.daily_loss_limit {
            return Err(self.state.trip(BreachReason::DailyLossLimitBreached {
                daily_loss,
                limit: self.limits.daily_loss_limit,
            }));
        }

        Ok(())
    }

    /// Record a completed trade's realized PnL and check the daily loss
    /// limit. Does not touch drawdown (that's equity-based, via
    /// `update_equity`).
    pub fn record_trade_pnl(&mut self, pnl: f64, day_id: u32) -> Result<(), BreachReason> {
        self.state.maybe_reset_daily(day_id);
        self.state.daily_pnl += pnl;

        let daily_loss = self.state.daily_loss();
        if daily_loss >= self.limits.daily_loss_limit {
            return Err(self.state.trip(BreachReason::DailyLossLimitBreached {
                daily_loss,
                limit: self.limits.daily_loss_limit,
            }));
        }
        Ok(())
    }

    pub fn is_tripped(&self) -> bool {
        self.state.is_tripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> CircuitBreakerLimits {
        CircuitBreakerLimits {
            max_drawdown_pct: 0.08,
            single_order_size_cap: 0.1,
            daily_loss_limit: 500.0,
        }
    }

    #[test]
    fn user_config_cannot_exceed_hard_limits() {
        let loose = CircuitBreakerLimits {
            max_drawdown_pct: 0.5,
            single_order_size_cap: 10.0,
            daily_loss_limit: 1_000_000.0,
        };
        let breaker = RiskCircuitBreaker::new(loose, 10_000.0, 1);
        assert_eq!(breaker.limits.max_drawdown_pct, HARD_MAX_DRAWDOWN_PCT);
        assert_eq!(breaker.limits.single_order_size_cap, HARD_SINGLE_ORDER_SIZE_CAP);
        assert_eq!(breaker.limits.daily_loss_limit, HARD_DAILY_LOSS_LIMIT);
    }

    #[test]
    fn order_size_over_cap_is_rejected() {
        let breaker = RiskCircuitBreaker::new(limits(), 10_000.0, 1);
        let err = breaker.check_order(0.2).unwrap_err();
        assert!(matches!(err, BreachReason::OrderSizeExceedsCap { .. }));
    }

    #[test]
    fn drawdown_breach_trips_the_breaker() {
        let mut breaker = RiskCircuitBreaker::new(limits(), 10_000.0, 1);
        breaker.update_equity(10_000.0, 1).unwrap();
        let err = breaker.update_equity(9_000.0, 1).unwrap_err();
        assert!(matches!(err, BreachReason::MaxDrawdownBreached { .. }));
        assert!(breaker.is_tripped());
    }

    #[test]
    fn tripped_breaker_rejects_every_subsequent_order() {
        let mut breaker = RiskCircuitBreaker::new(limits(), 10_000.0, 1);
        breaker.update_equity(9_000.0, 1).unwrap_err();
        let err = breaker.check_order(0.01).unwrap_err();
        assert!(matches!(err, BreachReason::AlreadyTripped { .. }));
    }

    #[test]
    fn daily_loss_limit_trips_via_trade_pnl() {
        let mut breaker = RiskCircuitBreaker::new(limits(), 10_000.0, 1);
        breaker.record_trade_pnl(-300.0, 1).unwrap();
        let err = breaker.record_trade_pnl(-250.0, 1).unwrap_err();
        assert!(matches!(err, BreachReason::DailyLossLimitBreached { .. }));
    }

    #[test]
    fn daily_pnl_resets_on_day_rollover() {
        let mut breaker = RiskCircuitBreaker::new(limits(), 10_000.0, 1);
        breaker.record_trade_pnl(-400.0, 1).unwrap();
        // New day: daily_pnl resets before accumulating further losses.
        breaker.record_trade_pnl(-400.0, 2).unwrap();
        assert!(!breaker.is_tripped());
        assert_eq!(breaker.state.daily_pnl, -400.0);
    }
}
