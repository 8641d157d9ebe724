//! qtk-md
//!
//! PATCH C — Historical provider ingest (pluggable providers).
//!
//! This crate owns the provider abstraction, the concrete historical
//! venue providers, and the on-disk cache policy (§4.1) that serves
//! `FetchBars` requests from cache when possible and fetches only the
//! uncovered prefix/suffix otherwise. It does **not** write to the
//! relational store; callers (CLI / `qtk-runtime`) fetch bars and hand
//! them to `qtk-db` ingestion.

pub mod cache;
pub mod ingest_csv;
pub mod normalizer;
pub mod provider;
pub mod quality;

pub use ingest_csv::{parse_csv_file, parse_csv_str, parse_is_complete, CsvIngestError, CsvRow};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Supported bar-aggregation identifiers for historical ingestion.
///
/// Canonical user-facing values match the spec's supported aggregation set
/// exactly: `{1m, 5m, 15m, 1h, 4h, 1d}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Binance kline interval string (identical to the canonical string for
    /// every aggregation this workspace supports).
    pub fn as_binance_interval(&self) -> &'static str {
        self.as_str()
    }

    /// Seconds in one bar of this aggregation. Used by the cache layer to
    /// detect gaps and by pagination to step the "from" cursor.
    pub fn duration_secs(&self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 5 * 60,
            Timeframe::M15 => 15 * 60,
            Timeframe::H1 => 60 * 60,
            Timeframe::H4 => 4 * 60 * 60,
            Timeframe::D1 => 24 * 60 * 60,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" | "1min" | "1minute" => Ok(Timeframe::M1),
            "5m" | "5min" | "5minute" => Ok(Timeframe::M5),
            "15m" | "15min" | "15minute" => Ok(Timeframe::M15),
            "1h" | "1hour" => Ok(Timeframe::H1),
            "4h" | "4hour" => Ok(Timeframe::H4),
            "1d" | "1day" => Ok(Timeframe::D1),
            other => Err(anyhow!(
                "invalid timeframe '{}'. expected one of: 1m | 5m | 15m | 1h | 4h | 1d",
                other
            )),
        }
    }
}

/// A raw OHLCV bar as returned by a historical provider.
///
/// IMPORTANT: Prices remain as decimal strings so callers can normalize deterministically
/// (no floats) using qtk-db canonical conversion rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderBar {
    pub symbol: String,
    pub timeframe: String,
    /// Bar end timestamp (epoch seconds, UTC).
    pub end_ts: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: i64,
    pub is_complete: bool,
}

/// Fetch request for a provider.
#[derive(Debug, Clone)]
pub struct FetchBarsRequest {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    /// Inclusive start date (UTC). Providers that only accept dates should treat this as start-of-day.
    pub start: NaiveDate,
    /// Inclusive end date (UTC). Providers that only accept dates should treat this as end-of-day.
    pub end: NaiveDate,
}

/// Pluggable historical provider interface.
#[async_trait::async_trait]
pub trait HistoricalProvider: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_bars(&self, req: FetchBarsRequest) -> Result<Vec<ProviderBar>>;
}

/// Binance-shaped klines historical provider.
///
/// Covers the `GET /api/v3/klines` (spot) / `GET /fapi/v1/klines` (perp)
/// shape: an array-of-arrays response, open/close time in epoch
/// milliseconds, OHLCV as JSON strings. Pagination caps at 1000 klines per
/// call on the real venue; this provider walks pages using the prior page's
/// last open-time, per §4.1.
#[derive(Debug, Clone)]
pub struct BinanceKlinesProvider {
    http: reqwest::Client,
    base_url: String,
    /// Klines per page. The real venue caps this at 1000.
    page_limit: u32,
}

impl BinanceKlinesProvider {
    pub fn new() -> Self {
        Self::new_with_base_url("https://api.binance.com".to_string())
    }

    pub fn new_with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            page_limit: 1000,
        }
    }

    fn build_klines_url(&self) -> String {
        format!("{}/api/v3/klines", self.base_url.trim_end_matches('/'))
    }

    async fn fetch_symbol_paginated(
        &self,
        symbol: &str,
        tf: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<ProviderBar>> {
        let mut out = Vec::new();
        let mut cursor = start_ms;

        loop {
            let url = self.build_klines_url();
            let resp = self
                .http
                .get(url)
                .query(&[
                    ("symbol", symbol.to_string()),
                    ("interval", tf.as_binance_interval().to_string()),
                    ("startTime", cursor.to_string()),
                    ("endTime", end_ms.to_string()),
                    ("limit", self.page_limit.to_string()),
                ])
                .send()
                .await
                .context("binance klines request failed")?;

            let status = resp.status();
            let body = resp.text().await.context("binance response body read failed")?;

            if !status.is_success() {
                return Err(anyhow!(
                    "binance http error status={} body={}",
                    status.as_u16(),
                    body
                ));
            }

            let rows: Vec<serde_json::Value> =
                serde_json::from_str(&body).context("binance klines json decode failed")?;

            if rows.is_empty() {
                break;
            }

            let page_len = rows.len();
            let mut last_open_ms = cursor;

            for row in &rows {
                let row = BinanceKlineRow::from_json_array(row)
                    .context("binance kline row shape mismatch")?;
                last_open_ms = row.open_time_ms;
                out.push(ProviderBar {
                    symbol: symbol.to_string(),
                    timeframe: tf.as_str().to_string(),
                    end_ts: row.close_time_ms / 1000,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume.parse::<f64>().unwrap_or(0.0).round() as i64,
                    is_complete: row.close_time_ms <= end_ms,
                });
            }

            if (page_len as u32) < self.page_limit || last_open_ms >= end_ms {
                break;
            }

            // Walk forward using the prior page's last open-time, per §4.1 pagination rule.
            cursor = last_open_ms + tf.duration_secs() * 1000;
        }

        Ok(out)
    }
}

impl Default for BinanceKlinesProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HistoricalProvider for BinanceKlinesProvider {
    fn source_name(&self) -> &'static str {
        "binance"
    }

    async fn fetch_bars(&self, req: FetchBarsRequest) -> Result<Vec<ProviderBar>> {
        let start_ms = req
            .start
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("invalid start date"))?
            .and_utc()
            .timestamp_millis();
        let end_ms = req
            .end
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| anyhow!("invalid end date"))?
            .and_utc()
            .timestamp_millis();

        let mut out = Vec::new();
        for sym in req.symbols.iter() {
            let bars = self
                .fetch_symbol_paginated(sym, req.timeframe, start_ms, end_ms)
                .await?;
            out.extend(bars);
        }

        Ok(out)
    }
}

/// One row of a Binance-shaped klines response.
///
/// The wire format is a heterogeneous JSON array
/// `[openTime, open, high, low, close, volume, closeTime, ...]`; this struct
/// is the decoded, named-field view callers actually want to work with.
struct BinanceKlineRow {
    open_time_ms: i64,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
    close_time_ms: i64,
}

impl BinanceKlineRow {
    fn from_json_array(v: &serde_json::Value) -> Result<Self> {
        let arr = v
            .as_array()
            .ok_or_else(|| anyhow!("kline row is not a JSON array"))?;
        if arr.len() < 7 {
            return Err(anyhow!("kline row has {} fields, expected >= 7", arr.len()));
        }
        let as_str = |i: usize| -> Result<String> {
            arr[i]
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| anyhow!("kline field {} is not a string", i))
        };
        let as_i64 = |i: usize| -> Result<i64> {
            arr[i]
                .as_i64()
                .ok_or_else(|| anyhow!("kline field {} is not an integer", i))
        };
        Ok(Self {
            open_time_ms: as_i64(0)?,
            open: as_str(1)?,
            high: as_str(2)?,
            low: as_str(3)?,
            close: as_str(4)?,
            volume: as_str(5)?,
            close_time_ms: as_i64(6)?,
        })
    }
}
