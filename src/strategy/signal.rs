//! Discrete trading signals and the building blocks both strategies share.

use crate::exchange::OrderSide;
use crate::indicators::IndicatorRow;
use serde::Serialize;
use std::fmt;

/// RSI values inspected by the momentum filter: current plus five prior.
pub const RSI_WINDOW: usize = 6;
/// Every value in the window above this is bullish momentum.
pub const RSI_BULLISH: f64 = 50.1;
/// Every value in the window below this is bearish momentum.
pub const RSI_BEARISH: f64 = 49.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Signal {
    None = 0,
    Sell = 1,
    Buy = 2,
}

impl Signal {
    /// Order side to open, `None` for a flat signal.
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Signal::None => None,
            Signal::Sell => Some(OrderSide::Sell),
            Signal::Buy => Some(OrderSide::Buy),
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::None => "none",
            Signal::Sell => "sell",
            Signal::Buy => "buy",
        };
        f.write_str(name)
    }
}

/// Mean-reversion signal: close at or through a band.
pub fn bollinger_signal(row: &IndicatorRow) -> Signal {
    if row.close <= row.bb_lower {
        Signal::Buy
    } else if row.close >= row.bb_upper {
        Signal::Sell
    } else {
        Signal::None
    }
}

/// Momentum signal over the RSI values ending at `index`.
///
/// Near the start of the series the window holds fewer than six values.
pub fn rsi_window_signal(rsi: &[f64], index: usize) -> Signal {
    if index >= rsi.len() {
        return Signal::None;
    }
    let window = &rsi[index.saturating_sub(RSI_WINDOW - 1)..=index];

    if window.iter().all(|&v| v > RSI_BULLISH) {
        Signal::Buy
    } else if window.iter().all(|&v| v < RSI_BEARISH) {
        Signal::Sell
    } else {
        Signal::None
    }
}

/// Price position relative to VWAP over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VwapTrend {
    None = 0,
    Down = 1,
    Up = 2,
    /// Bodies touch VWAP from both sides at once (o = c = VWAP); never traded
    Ambiguous = 3,
}

impl VwapTrend {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// Trend over rows `index - backcandles ..= index`.
///
/// Uptrend: every body sits at or above VWAP. Downtrend: every body sits at
/// or below it. Rows without a full window, or without VWAP, have no trend.
pub fn vwap_trend(rows: &[IndicatorRow], index: usize, backcandles: usize) -> VwapTrend {
    if index >= rows.len() || index < backcandles {
        return VwapTrend::None;
    }
    let window = &rows[index - backcandles..=index];

    let mut up = true;
    let mut down = true;
    for row in window {
        let Some(vwap) = row.vwap else {
            return VwapTrend::None;
        };
        if row.open.min(row.close) < vwap {
            up = false;
        }
        if row.open.max(row.close) > vwap {
            down = false;
        }
    }

    match (up, down) {
        (true, true) => VwapTrend::Ambiguous,
        (true, false) => VwapTrend::Up,
        (false, true) => VwapTrend::Down,
        (false, false) => VwapTrend::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(open: f64, close: f64, vwap: Option<f64>) -> IndicatorRow {
        IndicatorRow {
            timestamp: Utc::now(),
            open,
            high: open.max(close) + 0.001,
            low: open.min(close) - 0.001,
            close,
            rsi: 50.0,
            atr: 0.001,
            bb_upper: 1.2,
            bb_middle: 1.1,
            bb_lower: 1.0,
            vwap,
        }
    }

    #[test]
    fn test_rsi_window_examples() {
        let bullish = [55.0, 56.0, 54.0, 60.0, 58.0, 61.0];
        let bearish = [45.0, 46.0, 44.0, 48.0, 47.0, 49.0];
        let mixed = [55.0, 45.0, 56.0, 58.0, 60.0, 61.0];

        assert_eq!(rsi_window_signal(&bullish, 5), Signal::Buy);
        assert_eq!(rsi_window_signal(&bearish, 5), Signal::Sell);
        assert_eq!(rsi_window_signal(&mixed, 5), Signal::None);
    }

    #[test]
    fn test_rsi_window_only_looks_back_six() {
        // The 45 falls out of the window once the index moves past it
        let values = [45.0, 55.0, 56.0, 54.0, 60.0, 58.0, 61.0];
        assert_eq!(rsi_window_signal(&values, 5), Signal::None);
        assert_eq!(rsi_window_signal(&values, 6), Signal::Buy);
    }

    #[test]
    fn test_rsi_window_thresholds_are_strict() {
        assert_eq!(rsi_window_signal(&[50.1; 6], 5), Signal::None);
        assert_eq!(rsi_window_signal(&[49.9; 6], 5), Signal::None);
        assert_eq!(rsi_window_signal(&[60.0, 60.0], 1), Signal::Buy);
    }

    #[test]
    fn test_bollinger_signal() {
        let mut r = row(1.1, 1.0, None);
        assert_eq!(bollinger_signal(&r), Signal::Buy);
        r.close = 1.2;
        assert_eq!(bollinger_signal(&r), Signal::Sell);
        r.close = 1.1;
        assert_eq!(bollinger_signal(&r), Signal::None);
    }

    #[test]
    fn test_vwap_trend() {
        let above = vec![row(1.11, 1.12, Some(1.10)); 3];
        let below = vec![row(1.08, 1.09, Some(1.10)); 3];
        let touching = vec![row(1.10, 1.10, Some(1.10)); 3];
        let mut crossing = above.clone();
        crossing[1] = row(1.09, 1.11, Some(1.10));

        assert_eq!(vwap_trend(&above, 2, 2), VwapTrend::Up);
        assert_eq!(vwap_trend(&below, 2, 2), VwapTrend::Down);
        assert_eq!(vwap_trend(&touching, 2, 2), VwapTrend::Ambiguous);
        assert_eq!(vwap_trend(&crossing, 2, 2), VwapTrend::None);
        assert_eq!(VwapTrend::Ambiguous.code(), 3);
    }

    #[test]
    fn test_vwap_trend_needs_full_window() {
        let above = vec![row(1.11, 1.12, Some(1.10)); 3];
        assert_eq!(vwap_trend(&above, 1, 2), VwapTrend::None);
        let no_vwap = vec![row(1.11, 1.12, None); 3];
        assert_eq!(vwap_trend(&no_vwap, 2, 2), VwapTrend::None);
    }

    #[test]
    fn test_signal_codes() {
        assert_eq!(Signal::None.code(), 0);
        assert_eq!(Signal::Sell.code(), 1);
        assert_eq!(Signal::Buy.code(), 2);
        assert_eq!(Signal::Buy.side(), Some(OrderSide::Buy));
    }
}
