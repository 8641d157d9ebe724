use serde::{Deserialize, Serialize};

/// Market-data snapshot for a single instrument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last_price: f64,
    pub bid_price: f64,
    pub ask_price: f64,
    pub volume_24h: f64,
    pub ts_ms: i64,
}

/// One level of an order book side.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub qty: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Orderbook {
    pub symbol: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub ts_ms: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    pub rate: f64,
    pub next_funding_ts_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundingRateHistoryEntry {
    pub rate: f64,
    pub funding_ts_ms: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkPrice {
    pub mark_price: f64,
    pub ts_ms: i64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginType {
    Isolated,
    Cross,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub qty: f64,
    pub limit_price: Option<f64>,
    pub client_order_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderAck {
    pub venue_order_id: String,
    pub accepted: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub symbol: String,
    pub qty_signed: f64,
    pub entry_price: f64,
    pub leverage: f64,
}

/// Uniform venue error surface. `NotImplemented` is the expected response
/// from a connector's trading-side methods when it only advertises
/// market-data support.
#[derive(Clone, Debug, PartialEq)]
pub enum VenueError {
    NotImplemented { method: &'static str, venue: String },
    Transport(String),
    Api { code: String, message: String },
    RateLimited { retry_after_ms: u64 },
}

impl std::fmt::Display for VenueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VenueError::NotImplemented { method, venue } => {
                write!(f, "{venue} does not implement {method}")
            }
            VenueError::Transport(msg) => write!(f, "transport error: {msg}"),
            VenueError::Api { code, message } => write!(f, "venue error {code}: {message}"),
            VenueError::RateLimited { retry_after_ms } => {
                write!(f, "rate limited, retry after {retry_after_ms}ms")
            }
        }
    }
}

impl std::error::Error for VenueError {}
