/// BUY or SELL.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order types per spec §4.3.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
    /// Reduce-only take-profit/stop-loss pair. Submitting a `TpSl` order
    /// spawns up to two child `Stop`/`StopLimit` orders internally; it never
    /// rests as an order in its own right.
    TpSl,
    TrailingStop,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Filled,
    PartiallyFilled,
    Cancelled,
    Rejected,
}

/// A request to place an order. `qty` must be > 0 or the order is Rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub instrument: String,
    pub side: Side,
    pub kind: OrderKind,
    pub qty: f64,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    /// TpSl only: favorable-side take-profit trigger.
    pub tp_price: Option<f64>,
    /// TpSl only: adverse-side stop-loss trigger.
    pub sl_price: Option<f64>,
    /// TrailingStop only: retracement percentage as a fraction, e.g. 0.01 = 1%.
    pub callback_rate: Option<f64>,
    /// TrailingStop only: trailing does not arm until price first reaches this level.
    pub activation_price: Option<f64>,
    /// Reduce-only orders (e.g. TP/SL children) never open new exposure.
    pub reduce_only: bool,
}

impl OrderRequest {
    pub fn market(instrument: impl Into<String>, side: Side, qty: f64) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            kind: OrderKind::Market,
            qty,
            limit_price: None,
            stop_price: None,
            tp_price: None,
            sl_price: None,
            callback_rate: None,
            activation_price: None,
            reduce_only: false,
        }
    }

    pub fn limit(instrument: impl Into<String>, side: Side, qty: f64, price: f64) -> Self {
        Self {
            limit_price: Some(price),
            ..Self::market(instrument, side, qty)
        }
    }
}

/// A resting or filled order tracked by the matching engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub id: u64,
    pub instrument: String,
    pub side: Side,
    pub kind: OrderKind,
    pub qty: f64,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub callback_rate: Option<f64>,
    pub activation_price: Option<f64>,
    pub reduce_only: bool,
    pub status: OrderStatus,
    pub fill_price: Option<f64>,
    pub fill_qty: f64,
    pub fee: f64,
    /// Submission sequence number — same-tick crosses resolve in this order.
    pub seq: u64,
    /// Created at this tick (backtest bar index / paper tick counter).
    pub created_tick: u64,
    pub filled_tick: Option<u64>,
    /// Trailing-stop bookkeeping: running peak (sell side) or trough (buy side).
    pub trailing_extreme: Option<f64>,
    /// Whether the trailing stop has armed (seen its activation price).
    pub trailing_armed: bool,
    /// Take-profit child of a TpSl bracket: trigger polarity is reversed
    /// (fires on favorable movement rather than adverse movement).
    pub is_take_profit: bool,
    /// For StopLimit: whether the stop has fired and the order now behaves
    /// as a resting Limit order at `limit_price`.
    pub triggered: bool,
}

impl Order {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// Produced when an order (fully) fills.
#[derive(Clone, Debug, PartialEq)]
pub struct Fill {
    pub order_id: u64,
    pub instrument: String,
    pub side: Side,
    pub qty: f64,
    pub price: f64,
    pub fee: f64,
    pub is_taker: bool,
    pub tick: u64,
}

/// Fee schedule. Rates are fractions of notional (e.g. 0.0004 = 4 bps).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FeeConfig {
    pub taker_rate: f64,
    pub maker_rate: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        // Binance-futures-VIP0-shaped defaults, consistent with the paper
        // engine this crate is grounded on.
        Self {
            taker_rate: 0.0004,
            maker_rate: 0.0002,
        }
    }
}

/// Slippage applied to taker fills, in basis points of the reference price.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SlippageConfig {
    pub slippage_bps: f64,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self { slippage_bps: 1.0 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchingError {
    /// `qty` was zero or negative.
    NonPositiveQuantity,
    UnknownOrder,
}
