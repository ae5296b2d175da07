//! CSV-backed market-data feed.
//!
//! Reads `<data_dir>/<SYMBOL>.csv` with the header
//! `timestamp,open,high,low,close,volume` (RFC 3339 timestamps, oldest first).
//!
//! Files hold bars of a single timeframe, fixed when the feed is built.
//! Requests for any other timeframe fail rather than resample.

use super::traits::MarketDataFeed;
use super::types::{Bar, Timeframe};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvBarFeed {
    data_dir: PathBuf,
    timeframe: Timeframe,
}

impl CsvBarFeed {
    /// Feed over `data_dir` whose files hold `timeframe` bars.
    pub fn new(data_dir: impl Into<PathBuf>, timeframe: Timeframe) -> Self {
        Self {
            data_dir: data_dir.into(),
            timeframe,
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{symbol}.csv"))
    }

    /// Every bar in the file for `symbol`.
    pub fn read_all(&self, symbol: &str) -> Result<Vec<Bar>> {
        read_bars(&self.path_for(symbol))
    }
}

fn read_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open bar file {}", path.display()))?;

    reader
        .deserialize::<Bar>()
        .enumerate()
        .map(|(row, record)| {
            record.with_context(|| format!("{}: bad record at row {}", path.display(), row + 1))
        })
        .collect()
}

#[async_trait]
impl MarketDataFeed for CsvBarFeed {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        anyhow::ensure!(
            timeframe == self.timeframe,
            "{symbol}: requested {timeframe} bars but CSV data is {}",
            self.timeframe
        );

        let path = self.path_for(symbol);
        let bars = tokio::task::spawn_blocking(move || read_bars(&path))
            .await
            .context("Bar reader task panicked")??;

        let window: Vec<Bar> = bars
            .into_iter()
            .filter(|bar| bar.timestamp >= from && bar.timestamp <= to)
            .collect();

        debug!(%symbol, %timeframe, bars = window.len(), "Loaded bars from CSV");
        Ok(window)
    }
}
