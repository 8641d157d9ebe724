use std::collections::BTreeMap;

/// BUY or SELL for fills.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// A single executed fill (the accounting atom).
///
/// qty is always positive.
/// price_micros is price per unit in micros (1e-6).
/// fee_micros is absolute cash fee in micros (>= 0).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fill {
    pub symbol: String,
    pub side: Side,
    pub qty: i64,
    pub price_micros: i64,
    pub fee_micros: i64,
}

impl Fill {
    pub fn new<S: Into<String>>(
        symbol: S,
        side: Side,
        qty: i64,
        price_micros: i64,
        fee_micros: i64,
    ) -> Self {
        debug_assert!(qty > 0, "Fill.qty must be > 0");
        debug_assert!(price_micros >= 0, "Fill.price_micros must be >= 0");
        debug_assert!(fee_micros >= 0, "Fill.fee_micros must be >= 0");
        Self {
            symbol: symbol.into(),
            side,
            qty,
            price_micros,
            fee_micros,
        }
    }
}

/// A cash-only entry (for fees/dividends/adjustments).
///
/// amount_micros may be positive or negative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CashEntry {
    pub amount_micros: i64,
    pub reason: String,
}

impl CashEntry {
    pub fn new<S: Into<String>>(amount_micros: i64, reason: S) -> Self {
        Self {
            amount_micros,
            reason: reason.into(),
        }
    }
}

/// A funding settlement for one open perpetual position.
///
/// `rate_micros` is the funding rate scaled by 1e-6 (e.g. 0.0001 => 100).
/// Sign convention per spec §4.4: longs pay when rate > 0, shorts receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundingSettlement {
    pub symbol: String,
    pub rate_micros: i64,
}

impl FundingSettlement {
    pub fn new<S: Into<String>>(symbol: S, rate_micros: i64) -> Self {
        Self {
            symbol: symbol.into(),
            rate_micros,
        }
    }
}

/// Ledger entry types: fills, cash adjustments, and funding settlements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEntry {
    Fill(Fill),
    Cash(CashEntry),
    Funding(FundingSettlement),
}

/// Position direction. Distinct from `Side` (which describes a fill, not a
/// resting position) because a Buy fill can either open a Long or close part
/// of a Short.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

/// Derived position state for a symbol — single size-weighted average-entry
/// price model (spec §4.4), not FIFO lots: a symbol has at most one open
/// position at a time, carrying one `avg_price_micros` across all same
/// direction adds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionState {
    pub symbol: String,
    pub side: PositionSide,
    /// Always > 0 while the position exists; the position is removed from
    /// the map entirely when it would become flat.
    pub qty: i64,
    pub avg_price_micros: i64,
    /// Realized PnL accumulated by fills that reduced *this* position
    /// instance (reset when the position flips or re-opens from flat).
    pub realized_pnl_micros: i64,
    pub cumulative_fees_micros: i64,
}

impl PositionState {
    pub fn open<S: Into<String>>(symbol: S, side: PositionSide, qty: i64, price_micros: i64) -> Self {
        debug_assert!(qty > 0, "position qty must be > 0 on open");
        Self {
            symbol: symbol.into(),
            side,
            qty,
            avg_price_micros: price_micros,
            realized_pnl_micros: 0,
            cumulative_fees_micros: 0,
        }
    }

    /// Signed position quantity (+long, -short, 0 flat).
    pub fn qty_signed(&self) -> i64 {
        match self.side {
            PositionSide::Long => self.qty,
            PositionSide::Short => -self.qty,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.qty == 0
    }
}

/// The portfolio state derived from a ledger stream.
///
/// - `ledger`: source of truth (append-only in practice)
/// - `positions`: derived, maintained incrementally by apply_entry/apply_fill
/// - `cash_micros`: derived cash balance
/// - `realized_pnl_micros`: derived realized PnL (explicit accumulator)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortfolioState {
    pub initial_cash_micros: i64,
    pub cash_micros: i64,
    pub realized_pnl_micros: i64,
    pub ledger: Vec<LedgerEntry>,
    pub positions: BTreeMap<String, PositionState>,
}

impl PortfolioState {
    pub fn new(initial_cash_micros: i64) -> Self {
        Self {
            initial_cash_micros,
            cash_micros: initial_cash_micros,
            realized_pnl_micros: 0,
            ledger: Vec::new(),
            positions: BTreeMap::new(),
        }
    }
}
