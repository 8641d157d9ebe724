//! On-disk historical-bar cache (§4.1).
//!
//! A request fully covered by the cached `(instrument, aggregation)` range
//! is served without calling the provider. A broader request fetches only
//! the uncovered prefix/suffix, deduplicates by bar end-time, persists the
//! merged series, and updates the content hash. A fetch failure with a
//! partial cache returns the cached subset and a [`PartialCache`] warning;
//! a fetch failure with no cache raises [`CacheError::DataGap`].
//!
//! The cache file is written atomically (write-to-temp, then rename) so a
//! reader never observes a torn write.

use crate::{FetchBarsRequest, HistoricalProvider, ProviderBar, Timeframe};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One `market_data_cache` catalog entry: what is on disk for one
/// `(instrument, aggregation)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheIndexEntry {
    pub instrument: String,
    pub aggregation: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub record_count: usize,
    pub file_path: PathBuf,
    pub content_hash: String,
    pub fetch_timestamp_ms: i64,
}

/// Errors a [`BarCache::fetch_bars`] call may raise.
#[derive(Debug)]
pub enum CacheError {
    /// The venue returned no data for a required gap and no cached subset
    /// exists to fall back to.
    DataGap(String),
    /// The requested aggregation is not in the supported set.
    Unsupported(String),
    /// Any other transport/IO failure.
    Other(anyhow::Error),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::DataGap(msg) => write!(f, "DataGap: {msg}"),
            CacheError::Unsupported(msg) => write!(f, "Unsupported: {msg}"),
            CacheError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<anyhow::Error> for CacheError {
    fn from(e: anyhow::Error) -> Self {
        CacheError::Other(e)
    }
}

/// Result of a `fetch_bars` call that may have fallen back to a partial
/// cached subset after a provider failure.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub bars: Vec<ProviderBar>,
    /// Set when the provider failed but a cached subset was served instead.
    pub partial_cache_warning: Option<String>,
}

/// Root directory + in-memory catalog for cached historical bars.
///
/// On-disk layout: `<root>/<instrument>/<aggregation>.json` holds the
/// merged, deduplicated bar series for that pair; `<root>/index.json` holds
/// the [`CacheIndexEntry`] catalog.
pub struct BarCache {
    root: PathBuf,
    index: BTreeMap<String, CacheIndexEntry>,
}

fn index_key(instrument: &str, aggregation: &str) -> String {
    format!("{instrument}|{aggregation}")
}

impl BarCache {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).context("create cache root dir")?;
        let index_path = root.join("index.json");
        let index: BTreeMap<String, CacheIndexEntry> = if index_path.exists() {
            let raw = fs::read_to_string(&index_path).context("read cache index")?;
            serde_json::from_str(&raw).context("parse cache index")?
        } else {
            BTreeMap::new()
        };
        Ok(Self { root, index })
    }

    fn bars_path(&self, instrument: &str, aggregation: &str) -> PathBuf {
        self.root.join(instrument).join(format!("{aggregation}.json"))
    }

    fn persist_index(&self) -> Result<()> {
        let index_path = self.root.join("index.json");
        let tmp_path = self.root.join("index.json.tmp");
        let json = serde_json::to_string_pretty(&self.index).context("serialize cache index")?;
        fs::write(&tmp_path, json).context("write cache index tmp")?;
        fs::rename(&tmp_path, &index_path).context("rename cache index tmp")?;
        Ok(())
    }

    fn load_bars(&self, path: &Path) -> Result<Vec<ProviderBar>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(path).with_context(|| format!("read cache file {path:?}"))?;
        let bars: Vec<ProviderBar> =
            serde_json::from_str(&raw).with_context(|| format!("parse cache file {path:?}"))?;
        Ok(bars)
    }

    /// Write `bars` atomically and refresh the index entry + content hash.
    fn persist_bars(
        &mut self,
        instrument: &str,
        aggregation: &str,
        bars: &[ProviderBar],
        start_date: NaiveDate,
        end_date: NaiveDate,
        now_ms: i64,
    ) -> Result<()> {
        let dir = self.root.join(instrument);
        fs::create_dir_all(&dir).context("create instrument cache dir")?;
        let path = self.bars_path(instrument, aggregation);
        let tmp_path = dir.join(format!("{aggregation}.json.tmp"));

        let json = serde_json::to_string(bars).context("serialize cache bars")?;
        fs::write(&tmp_path, json.as_bytes()).context("write cache bars tmp")?;
        fs::rename(&tmp_path, &path).context("rename cache bars tmp")?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        let content_hash = format!("{:x}", hasher.finalize());

        self.index.insert(
            index_key(instrument, aggregation),
            CacheIndexEntry {
                instrument: instrument.to_string(),
                aggregation: aggregation.to_string(),
                start_date,
                end_date,
                record_count: bars.len(),
                file_path: path,
                content_hash,
                fetch_timestamp_ms: now_ms,
            },
        );
        self.persist_index()
    }

    /// Validate the on-disk file still hashes to the indexed `content_hash`.
    /// A mismatch invalidates the entry (it is removed and treated as a miss).
    fn validate_entry(&mut self, instrument: &str, aggregation: &str) -> Option<Vec<ProviderBar>> {
        let key = index_key(instrument, aggregation);
        let entry = self.index.get(&key)?.clone();
        let bars = self.load_bars(&entry.file_path).ok()?;
        let json = serde_json::to_string(&bars).ok()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        let actual_hash = format!("{:x}", hasher.finalize());
        if actual_hash != entry.content_hash {
            self.index.remove(&key);
            let _ = self.persist_index();
            return None;
        }
        Some(bars)
    }

    pub fn list_catalog(&self) -> Vec<CacheIndexEntry> {
        self.index.values().cloned().collect()
    }

    pub fn delete_catalog(&mut self, instrument: &str, aggregation: &str) -> Result<()> {
        let key = index_key(instrument, aggregation);
        if let Some(entry) = self.index.remove(&key) {
            let _ = fs::remove_file(&entry.file_path);
            self.persist_index()?;
        }
        Ok(())
    }

    /// Serve `FetchBars(instrument, aggregation, start, end)`.
    ///
    /// Fully covered by cache -> served without calling `provider`.
    /// Partially covered -> fetch only the uncovered prefix/suffix, merge,
    /// re-persist, update the content hash.
    /// Not covered at all and the provider fails -> [`CacheError::DataGap`].
    /// Partially covered and the provider fails on the gap -> the cached
    /// subset is returned with a `partial_cache_warning`.
    pub async fn fetch_bars(
        &mut self,
        provider: &dyn HistoricalProvider,
        instrument: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<FetchOutcome, CacheError> {
        if end < start {
            return Err(CacheError::Other(anyhow::anyhow!(
                "end date {end} is before start date {start}"
            )));
        }

        let aggregation = timeframe.as_str();
        let cached = self
            .validate_entry(instrument, aggregation)
            .unwrap_or_default();
        let entry = self.index.get(&index_key(instrument, aggregation)).cloned();

        let (covered_start, covered_end) = match &entry {
            Some(e) => (Some(e.start_date), Some(e.end_date)),
            None => (None, None),
        };

        let fully_covered = matches!(
            (covered_start, covered_end),
            (Some(cs), Some(ce)) if cs <= start && end <= ce
        );

        if fully_covered {
            let bars = filter_range(&cached, start, end);
            return Ok(FetchOutcome {
                bars,
                partial_cache_warning: None,
            });
        }

        // Determine the uncovered prefix/suffix gaps that must be fetched.
        let mut gaps: Vec<(NaiveDate, NaiveDate)> = Vec::new();
        match (covered_start, covered_end) {
            (Some(cs), Some(ce)) => {
                if start < cs {
                    gaps.push((start, cs.pred_opt().unwrap_or(start)));
                }
                if end > ce {
                    gaps.push((ce.succ_opt().unwrap_or(end), end));
                }
            }
            _ => gaps.push((start, end)),
        }

        let mut fetched: Vec<ProviderBar> = Vec::new();
        let mut fetch_err: Option<anyhow::Error> = None;
        for (gs, ge) in &gaps {
            let req = FetchBarsRequest {
                symbols: vec![instrument.to_string()],
                timeframe,
                start: *gs,
                end: *ge,
            };
            match provider.fetch_bars(req).await {
                Ok(bars) => fetched.extend(bars),
                Err(e) => {
                    fetch_err = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = fetch_err {
            if cached.is_empty() {
                return Err(CacheError::DataGap(format!(
                    "no cached data for {instrument}/{aggregation} and provider fetch failed: {e}"
                )));
            }
            let bars = filter_range(&cached, start, end);
            return Ok(FetchOutcome {
                bars,
                partial_cache_warning: Some(format!(
                    "PartialCache: provider fetch failed for a gap ({e}); serving cached subset"
                )),
            });
        }

        if fetched.is_empty() && cached.is_empty() {
            return Err(CacheError::DataGap(format!(
                "venue returned no data for {instrument}/{aggregation} in [{start}, {end}]"
            )));
        }

        let merged = merge_dedupe(cached, fetched);
        let new_start = covered_start.map(|cs| cs.min(start)).unwrap_or(start);
        let new_end = covered_end.map(|ce| ce.max(end)).unwrap_or(end);

        self.persist_bars(instrument, aggregation, &merged, new_start, new_end, 0)
            .map_err(CacheError::Other)?;

        let bars = filter_range(&merged, start, end);
        Ok(FetchOutcome {
            bars,
            partial_cache_warning: None,
        })
    }
}

/// Merge two bar series, deduplicating by `end_ts` (later series wins on
/// conflict) and sorting by `end_ts` ascending.
fn merge_dedupe(existing: Vec<ProviderBar>, incoming: Vec<ProviderBar>) -> Vec<ProviderBar> {
    let mut by_ts: BTreeMap<i64, ProviderBar> =
        existing.into_iter().map(|b| (b.end_ts, b)).collect();
    for bar in incoming {
        by_ts.insert(bar.end_ts, bar);
    }
    by_ts.into_values().collect()
}

fn filter_range(bars: &[ProviderBar], start: NaiveDate, end: NaiveDate) -> Vec<ProviderBar> {
    let start_ts = start
        .and_hms_opt(0, 0, 0)
        .expect("valid start-of-day")
        .and_utc()
        .timestamp();
    let end_ts = end
        .and_hms_opt(23, 59, 59)
        .expect("valid end-of-day")
        .and_utc()
        .timestamp();
    bars.iter()
        .filter(|b| b.end_ts >= start_ts && b.end_ts <= end_ts)
        .cloned()
        .collect()
}
