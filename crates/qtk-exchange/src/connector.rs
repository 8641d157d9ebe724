//! The uniform venue-connector interface.
//!
//! Split across two traits, mirroring this workspace's existing split
//! between a market-data boundary (`qtk-md`) and an execution/broker
//! boundary (`qtk-execution`): [`MarketDataConnector`] carries the
//! mandatory market-data methods every connector must implement;
//! [`TradingConnector`] carries the account/trading methods, which default
//! to `NotImplemented` so a connector that only ever backs a backtest or
//! dashboard feed does not need to stub out order placement.

use async_trait::async_trait;

use crate::types::{
    Balance, FundingRate, FundingRateHistoryEntry, MarginType, MarkPrice, Orderbook,
    PlaceOrderAck, PlaceOrderRequest, PositionInfo, Ticker, VenueError,
};

/// Market-data side of the venue-connector interface. Every connector must
/// implement this; it is what `qtk-md`'s cache layer and a live/paper
/// session's price feed both consume.
#[async_trait]
pub trait MarketDataConnector: Send + Sync {
    /// Canonical name this connector advertises (`"binance"`, `"bybit"`, ...).
    fn venue_name(&self) -> &str;

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, VenueError>;

    async fn get_orderbook(&self, symbol: &str, depth: u32) -> Result<Orderbook, VenueError>;

    async fn get_funding_rate(&self, symbol: &str) -> Result<FundingRate, VenueError>;

    async fn get_mark_price(&self, symbol: &str) -> Result<MarkPrice, VenueError>;

    async fn get_funding_rate_history(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<FundingRateHistoryEntry>, VenueError>;
}

/// Account/trading side of the venue-connector interface. Methods default
/// to `NotImplemented`; a connector only overrides the ones it actually
/// supports (e.g. a read-only market-data-only connector overrides none of
/// them).
#[async_trait]
pub trait TradingConnector: Send + Sync {
    fn venue_name(&self) -> &str;

    async fn place_order(&self, _req: PlaceOrderRequest) -> Result<PlaceOrderAck, VenueError> {
        Err(VenueError::NotImplemented {
            method: "place_order",
            venue: self.venue_name().to_string(),
        })
    }

    async fn cancel_order(&self, _venue_order_id: &str) -> Result<(), VenueError> {
        Err(VenueError::NotImplemented {
            method: "cancel_order",
            venue: self.venue_name().to_string(),
        })
    }

    async fn get_balances(&self) -> Result<Vec<Balance>, VenueError> {
        Err(VenueError::NotImplemented {
            method: "get_balances",
            venue: self.venue_name().to_string(),
        })
    }

    async fn get_positions(&self) -> Result<Vec<PositionInfo>, VenueError> {
        Err(VenueError::NotImplemented {
            method: "get_positions",
            venue: self.venue_name().to_string(),
        })
    }

    async fn set_leverage(&self, _symbol: &str, _leverage: f64) -> Result<(), VenueError> {
        Err(VenueError::NotImplemented {
            method: "set_leverage",
            venue: self.venue_name().to_string(),
        })
    }

    async fn set_margin_type(
        &self,
        _symbol: &str,
        _margin_type: MarginType,
    ) -> Result<(), VenueError> {
        Err(VenueError::NotImplemented {
            method: "set_margin_type",
            venue: self.venue_name().to_string(),
        })
    }
}
