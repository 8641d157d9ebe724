//! Binance USD-M futures venue connector.
//!
//! Covers the `GET /fapi/v1/ticker/24hr`, `GET /fapi/v1/depth`,
//! `GET /fapi/v1/premiumIndex`, `GET /fapi/v1/fundingRate` shapes. Mirrors
//! `qtk-md::BinanceKlinesProvider`'s client/base-url construction rather
//! than introducing a second HTTP client convention.

use async_trait::async_trait;
use serde::Deserialize;

use crate::connector::{MarketDataConnector, TradingConnector};
use crate::rate_limit::SlidingWindowLimiter;
use crate::types::{
    BookLevel, FundingRate, FundingRateHistoryEntry, MarkPrice, Orderbook, Ticker, VenueError,
};
use std::sync::Mutex;

#[derive(Debug)]
pub struct BinanceConnector {
    http: reqwest::Client,
    base_url: String,
    limiter: Mutex<SlidingWindowLimiter>,
}

impl BinanceConnector {
    pub fn new() -> Self {
        Self::new_with_base_url("https://fapi.binance.com".to_string())
    }

    pub fn new_with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            // Binance USD-M futures market-data weight budget: 2400/min raw
            // weight; 1000 req/min is a conservative per-connector floor.
            limiter: Mutex::new(SlidingWindowLimiter::per_minute(1000)),
        }
    }

    fn acquire(&self) -> Result<(), VenueError> {
        let mut limiter = self.limiter.lock().expect("rate limiter mutex poisoned");
        limiter.try_acquire().map_err(|retry_after| VenueError::RateLimited {
            retry_after_ms: retry_after.as_millis() as u64,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, VenueError> {
        self.acquire()?;

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| VenueError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| VenueError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(VenueError::Api {
                code: status.as_u16().to_string(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| VenueError::Api {
            code: "decode".to_string(),
            message: format!("{e}: {body}"),
        })
    }
}

impl Default for BinanceConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct Ticker24hrResponse {
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "bidPrice", default)]
    bid_price: Option<String>,
    #[serde(rename = "askPrice", default)]
    ask_price: Option<String>,
    volume: String,
    #[serde(rename = "closeTime")]
    close_time: i64,
}

#[derive(Debug, Deserialize)]
struct DepthResponse {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
    #[serde(rename = "E", default)]
    event_time: i64,
}

#[derive(Debug, Deserialize)]
struct PremiumIndexResponse {
    #[serde(rename = "markPrice")]
    mark_price: String,
    #[serde(rename = "lastFundingRate")]
    last_funding_rate: String,
    #[serde(rename = "nextFundingTime")]
    next_funding_time: i64,
    time: i64,
}

#[derive(Debug, Deserialize)]
struct FundingRateHistoryResponse {
    #[serde(rename = "fundingRate")]
    funding_rate: String,
    #[serde(rename = "fundingTime")]
    funding_time: i64,
}

fn parse_f64(s: &str, field: &'static str) -> Result<f64, VenueError> {
    s.parse::<f64>().map_err(|_| VenueError::Api {
        code: "decode".to_string(),
        message: format!("could not parse {field} as f64: {s}"),
    })
}

#[async_trait]
impl MarketDataConnector for BinanceConnector {
    fn venue_name(&self) -> &str {
        "binance"
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, VenueError> {
        let resp: Ticker24hrResponse = self
            .get_json("/fapi/v1/ticker/24hr", &[("symbol", symbol.to_string())])
            .await?;

        let last_price = parse_f64(&resp.last_price, "lastPrice")?;
        Ok(Ticker {
            symbol: symbol.to_string(),
            last_price,
            bid_price: resp
                .bid_price
                .map(|s| parse_f64(&s, "bidPrice"))
                .transpose()?
                .unwrap_or(last_price),
            ask_price: resp
                .ask_price
                .map(|s| parse_f64(&s, "askPrice"))
                .transpose()?
                .unwrap_or(last_price),
            volume_24h: parse_f64(&resp.volume, "volume")?,
            ts_ms: resp.close_time,
        })
    }

    async fn get_orderbook(&self, symbol: &str, depth: u32) -> Result<Orderbook, VenueError> {
        let resp: DepthResponse = self
            .get_json(
                "/fapi/v1/depth",
                &[("symbol", symbol.to_string()), ("limit", depth.to_string())],
            )
            .await?;

        let to_levels = |rows: Vec<[String; 2]>| -> Result<Vec<BookLevel>, VenueError> {
            rows.into_iter()
                .map(|[price, qty]| {
                    Ok(BookLevel {
                        price: parse_f64(&price, "price")?,
                        qty: parse_f64(&qty, "qty")?,
                    })
                })
                .collect()
        };

        Ok(Orderbook {
            symbol: symbol.to_string(),
            bids: to_levels(resp.bids)?,
            asks: to_levels(resp.asks)?,
            ts_ms: resp.event_time,
        })
    }

    async fn get_funding_rate(&self, symbol: &str) -> Result<FundingRate, VenueError> {
        let resp: PremiumIndexResponse = self
            .get_json("/fapi/v1/premiumIndex", &[("symbol", symbol.to_string())])
            .await?;

        Ok(FundingRate {
            rate: parse_f64(&resp.last_funding_rate, "lastFundingRate")?,
            next_funding_ts_ms: resp.next_funding_time,
        })
    }

    async fn get_mark_price(&self, symbol: &str) -> Result<MarkPrice, VenueError> {
        let resp: PremiumIndexResponse = self
            .get_json("/fapi/v1/premiumIndex", &[("symbol", symbol.to_string())])
            .await?;

        Ok(MarkPrice {
            mark_price: parse_f64(&resp.mark_price, "markPrice")?,
            ts_ms: resp.time,
        })
    }

    async fn get_funding_rate_history(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<FundingRateHistoryEntry>, VenueError> {
        let resp: Vec<FundingRateHistoryResponse> = self
            .get_json(
                "/fapi/v1/fundingRate",
                &[("symbol", symbol.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        resp.into_iter()
            .map(|row| {
                Ok(FundingRateHistoryEntry {
                    rate: parse_f64(&row.funding_rate, "fundingRate")?,
                    funding_ts_ms: row.funding_time,
                })
            })
            .collect()
    }
}

/// Binance trading/account methods are intentionally not wired up: this
/// workspace routes live order placement through `qtk-execution`'s
/// `BrokerGateway` boundary, not directly through a venue connector. This
/// impl only advertises the connector's name so callers can match on
/// `venue_name()`; every method falls through to the trait's
/// `NotImplemented` default.
#[async_trait]
impl TradingConnector for BinanceConnector {
    fn venue_name(&self) -> &str {
        "binance"
    }
}
