//! Indicator engine.
//!
//! Pure functions over a bar window. [`compute`] drops zero-range bars,
//! evaluates every indicator the strategy needs and returns only the rows on
//! which all of them are defined, each aligned with the bar it belongs to.

pub mod atr;
pub mod bollinger;
pub mod rsi;
pub mod vwap;

use crate::config::{StrategyConfig, StrategyKind};
use crate::exchange::Bar;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// ATR length used for stop distances.
pub const ATR_LENGTH: usize = 7;

/// Which indicators to compute and with what parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorParams {
    pub rsi_length: usize,
    pub bb_length: usize,
    pub bb_std: f64,
    /// Only the VWAP strategy needs VWAP
    pub with_vwap: bool,
}

impl From<&StrategyConfig> for IndicatorParams {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            rsi_length: config.rsi_length,
            bb_length: config.bb_length(),
            bb_std: config.bb_std(),
            with_vwap: config.strategy == StrategyKind::VwapBollinger,
        }
    }
}

/// One bar with every indicator defined on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub rsi: f64,
    pub atr: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub vwap: Option<f64>,
}

/// Indicator rows in bar order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    rows: Vec<IndicatorRow>,
}

impl IndicatorSeries {
    pub fn new(rows: Vec<IndicatorRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    pub fn last(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Compute indicators for `bars` (oldest first).
///
/// Output is empty when the window is shorter than the longest warm-up.
pub fn compute(bars: &[Bar], params: &IndicatorParams) -> IndicatorSeries {
    let bars: Vec<Bar> = bars.iter().filter(|bar| !bar.is_flat()).copied().collect();
    let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();

    let rsi = rsi::rsi(&closes, params.rsi_length);
    let bands = bollinger::bollinger(&closes, params.bb_length, params.bb_std);
    let atr = atr::atr(&bars, ATR_LENGTH);
    let vwap = params.with_vwap.then(|| vwap::vwap(&bars));

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            rsi: rsi[i],
            atr: atr[i],
            bb_upper: bands.upper[i],
            bb_middle: bands.middle[i],
            bb_lower: bands.lower[i],
            vwap: vwap.as_ref().map(|v| v[i]),
        })
        .filter(is_defined)
        .collect();

    IndicatorSeries::new(rows)
}

fn is_defined(row: &IndicatorRow) -> bool {
    [
        row.open,
        row.high,
        row.low,
        row.close,
        row.rsi,
        row.atr,
        row.bb_upper,
        row.bb_middle,
        row.bb_lower,
    ]
    .iter()
    .all(|v| v.is_finite())
        && row.vwap.map_or(true, f64::is_finite)
}

/// Bars stepping 5 minutes apart with a ±0.0005 range around the open/close span.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::TimeZone;
    let start = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 0.0005,
                low: open.min(close) - 0.0005,
                close,
                volume: 100.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, epsilon={epsilon}"
    );
}
