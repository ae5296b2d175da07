//! Bollinger entries in the direction of the VWAP trend.

use super::signal::{vwap_trend, Signal, VwapTrend};
use super::Strategy;
use crate::indicators::IndicatorSeries;

/// RSI must be below this to buy a lower-band touch in an uptrend.
const BUY_RSI_CEILING: f64 = 45.0;
/// RSI must be above this to sell an upper-band touch in a downtrend.
const SELL_RSI_FLOOR: f64 = 55.0;

#[derive(Debug, Clone, Copy)]
pub struct VwapBollinger {
    backcandles: usize,
}

impl VwapBollinger {
    pub fn new(backcandles: usize) -> Self {
        Self { backcandles }
    }
}

impl Strategy for VwapBollinger {
    fn name(&self) -> &'static str {
        "vwap_bollinger"
    }

    fn evaluate(&self, series: &IndicatorSeries) -> Signal {
        let rows = series.rows();
        let Some(last) = rows.last() else {
            return Signal::None;
        };

        match vwap_trend(rows, rows.len() - 1, self.backcandles) {
            VwapTrend::Up if last.close <= last.bb_lower && last.rsi < BUY_RSI_CEILING => {
                Signal::Buy
            }
            VwapTrend::Down if last.close >= last.bb_upper && last.rsi > SELL_RSI_FLOOR => {
                Signal::Sell
            }
            _ => Signal::None,
        }
    }
}
