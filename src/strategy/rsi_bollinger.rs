//! Bollinger mean reversion confirmed by sustained RSI momentum.

use super::signal::{bollinger_signal, rsi_window_signal, Signal};
use super::Strategy;
use crate::indicators::IndicatorSeries;

/// Trades the Bollinger signal only when the RSI window points the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsiBollinger;

impl Strategy for RsiBollinger {
    fn name(&self) -> &'static str {
        "rsi_bollinger"
    }

    fn evaluate(&self, series: &IndicatorSeries) -> Signal {
        let Some(last) = series.last() else {
            return Signal::None;
        };
        let rsi: Vec<f64> = series.rows().iter().map(|row| row.rsi).collect();

        let bands = bollinger_signal(last);
        let momentum = rsi_window_signal(&rsi, rsi.len() - 1);
        if bands == momentum {
            bands
        } else {
            Signal::None
        }
    }
}
