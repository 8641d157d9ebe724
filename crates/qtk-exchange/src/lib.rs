//! Venue connector crate: the uniform market-data/trading interface
//! (`connector`), concrete venue implementations (`binance`), and the
//! helpers every connector shares (`types`, `rate_limit`, `liquidation`).

pub mod binance;
pub mod connector;
pub mod liquidation;
pub mod rate_limit;
pub mod types;

pub use binance::BinanceConnector;
pub use connector::{MarketDataConnector, TradingConnector};
pub use liquidation::{liquidation_price, PositionDirection, DEFAULT_MMR};
pub use rate_limit::SlidingWindowLimiter;
pub use types::{
    Balance, BookLevel, FundingRate, FundingRateHistoryEntry, MarginType, MarkPrice, Orderbook,
    OrderSide, PlaceOrderAck, PlaceOrderRequest, PositionInfo, Ticker, VenueError,
};
