//! Risk-based lot sizing.
//!
//! lots = risk_perc × equity / (stop_distance × pip_value) / 100 000, where the
//! stop distance is ATR × coefficient and the pip value of one lot is
//! 1e-4 / close × 1e5. Rounded to 0.01 lots, then clamped to the visible
//! liquidity on the side the order would consume.

use crate::config::StrategyConfig;
use crate::error::TradingError;
use crate::exchange::{OrderBook, OrderSide, CONTRACT_SIZE};
use crate::utils::decimal::{lots_from_f64, round_down_to_lot, to_f64, LOT_STEP};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// Price increment of one pip on 4/5-digit quotes.
pub const PIP_SIZE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingResult {
    /// Lot size to submit, after any liquidity clamp
    pub lots: Decimal,
    /// Lot size before the liquidity clamp
    pub unclamped_lots: Decimal,
    /// Price distance from entry to stop-loss
    pub stop_distance: f64,
    pub pip_value: f64,
    pub tp_sl_ratio: f64,
}

impl SizingResult {
    pub fn was_clamped(&self) -> bool {
        self.lots < self.unclamped_lots
    }
}

pub struct PositionSizer;

impl PositionSizer {
    /// Size an order for `side` at the latest `close` with the latest `atr`.
    ///
    /// Fails with `SizingInvalid` instead of returning a zero size when any
    /// input or intermediate is non-finite or non-positive.
    pub fn size(
        config: &StrategyConfig,
        atr: f64,
        close: f64,
        equity: Decimal,
        side: OrderSide,
        book: Option<&OrderBook>,
    ) -> Result<SizingResult, TradingError> {
        let symbol = &config.symbol;
        let invalid = |what: &str, value: f64| {
            Err(TradingError::SizingInvalid(format!(
                "{symbol}: {what} is {value}"
            )))
        };

        if !atr.is_finite() || atr <= 0.0 {
            return invalid("ATR", atr);
        }
        if !close.is_finite() || close <= 0.0 {
            return invalid("close", close);
        }

        let stop_distance = atr * config.sl_atr_coef;
        if !stop_distance.is_finite() || stop_distance <= 0.0 {
            return invalid("stop distance", stop_distance);
        }

        let pip_value = PIP_SIZE / close * CONTRACT_SIZE;
        if !pip_value.is_finite() || pip_value <= 0.0 {
            return invalid("pip value", pip_value);
        }

        let equity = to_f64(equity);
        let raw = config.risk_perc * equity / (stop_distance * pip_value) / CONTRACT_SIZE;
        if !raw.is_finite() || raw < 0.0 {
            return invalid("raw lot size", raw);
        }
        let Some(unclamped_lots) = lots_from_f64(raw) else {
            return invalid("raw lot size", raw);
        };

        let lots = match book.and_then(|b| b.liquidity_for(side)) {
            Some(liquidity) => unclamped_lots.min(round_down_to_lot(liquidity, LOT_STEP)),
            None => unclamped_lots,
        };

        debug!(
            %symbol,
            %side,
            %lots,
            %unclamped_lots,
            stop_distance,
            pip_value,
            "Position sized"
        );

        Ok(SizingResult {
            lots,
            unclamped_lots,
            stop_distance,
            pip_value,
            tp_sl_ratio: config.tp_sl_ratio,
        })
    }
}
