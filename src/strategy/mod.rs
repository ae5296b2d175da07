//! Signal strategies.
//!
//! A strategy turns an indicator series into one [`Signal`] for the latest
//! row. [`strategy_for`] maps the configured kind to an implementation, so the
//! engine never matches on strategy kinds itself.

pub mod rsi_bollinger;
pub mod signal;
pub mod vwap_bollinger;

pub use rsi_bollinger::RsiBollinger;
pub use signal::{Signal, VwapTrend};
pub use vwap_bollinger::VwapBollinger;

use crate::config::{StrategyConfig, StrategyKind};
use crate::indicators::IndicatorSeries;

pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Signal for the last row of `series`; `Signal::None` for an empty series.
    fn evaluate(&self, series: &IndicatorSeries) -> Signal;
}

/// Build the strategy configured for a symbol.
pub fn strategy_for(config: &StrategyConfig) -> Box<dyn Strategy> {
    match config.strategy {
        StrategyKind::RsiBollinger => Box::new(RsiBollinger),
        StrategyKind::VwapBollinger => Box::new(VwapBollinger::new(config.backcandles)),
    }
}

#[cfg(test)]
pub(crate) fn test_row(close: f64, rsi: f64, vwap: Option<f64>) -> crate::indicators::IndicatorRow {
    crate::indicators::IndicatorRow {
        timestamp: chrono::Utc::now(),
        open: close,
        high: close + 0.001,
        low: close - 0.001,
        close,
        rsi,
        atr: 0.001,
        bb_upper: 1.2,
        bb_middle: 1.1,
        bb_lower: 1.0,
        vwap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_picks_strategy() {
        let rsi = StrategyConfig::new("EURUSD", StrategyKind::RsiBollinger);
        let vwap = StrategyConfig::new("AUDNZD", StrategyKind::VwapBollinger);
        assert_eq!(strategy_for(&rsi).name(), "rsi_bollinger");
        assert_eq!(strategy_for(&vwap).name(), "vwap_bollinger");
    }

    #[test]
    fn test_empty_series_is_flat() {
        let config = StrategyConfig::new("EURUSD", StrategyKind::RsiBollinger);
        let strategy = strategy_for(&config);
        assert_eq!(strategy.evaluate(&IndicatorSeries::default()), Signal::None);
    }
}
