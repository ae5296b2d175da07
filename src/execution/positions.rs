//! Exits for open positions: RSI-based closes per symbol and flatten-all.

use super::executor::OrderExecutor;
use crate::config::StrategyConfig;
use crate::error::TradingError;
use crate::exchange::{Position, TradingVenue};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Tickets closed and tickets that could not be closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReport {
    pub closed: Vec<u64>,
    pub failed: Vec<u64>,
}

impl CloseReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct PositionManager {
    executor: Arc<OrderExecutor>,
}

impl PositionManager {
    pub fn new(executor: Arc<OrderExecutor>) -> Self {
        Self { executor }
    }

    /// Longs exit once RSI reaches overbought, shorts once it falls to oversold.
    pub fn should_close(position: &Position, rsi: f64, config: &StrategyConfig) -> bool {
        if position.is_long() {
            rsi >= config.rsi_overbought
        } else {
            rsi <= config.rsi_oversold
        }
    }

    /// Close every position on `config.symbol` whose RSI exit condition holds.
    ///
    /// Tickets in `exclude` (entries made this cycle) are left alone.
    pub async fn close_on_rsi(
        &self,
        venue: &dyn TradingVenue,
        config: &StrategyConfig,
        rsi: f64,
        exclude: &[u64],
    ) -> Result<CloseReport, TradingError> {
        let symbol = config.symbol.as_str();
        let positions = venue.get_positions(Some(symbol)).await.map_err(|e| {
            TradingError::Connectivity(format!("{symbol}: positions unavailable: {e}"))
        })?;

        let mut report = CloseReport::default();
        for position in positions
            .iter()
            .filter(|p| !exclude.contains(&p.ticket) && Self::should_close(p, rsi, config))
        {
            info!(%symbol, ticket = position.ticket, rsi, long = position.is_long(), "RSI exit");
            self.close(venue, position, "close", &mut report).await;
        }
        Ok(report)
    }

    /// Close every open position on every symbol.
    ///
    /// Safe to repeat: once everything is flat there is nothing to send.
    pub async fn flatten_all(&self, venue: &dyn TradingVenue) -> Result<CloseReport, TradingError> {
        let positions = venue
            .get_positions(None)
            .await
            .map_err(|e| TradingError::Connectivity(format!("positions unavailable: {e}")))?;

        if !positions.is_empty() {
            warn!(count = positions.len(), "Flattening all positions");
        }

        let mut report = CloseReport::default();
        for position in &positions {
            self.close(venue, position, "close all", &mut report).await;
        }

        if !report.is_clean() {
            error!(critical = true, failed = ?report.failed, "Flatten-all left positions open");
        }
        Ok(report)
    }

    async fn close(
        &self,
        venue: &dyn TradingVenue,
        position: &Position,
        comment: &str,
        report: &mut CloseReport,
    ) {
        match self.executor.close_position(venue, position, comment).await {
            Ok(_) => report.closed.push(position.ticket),
            Err(e) => {
                warn!(
                    symbol = %position.symbol,
                    ticket = position.ticket,
                    error = %e,
                    "Failed to close position"
                );
                report.failed.push(position.ticket);
            }
        }
    }
}
