//! Order construction and submission.
//!
//! Resolves the entry price (best opposing book level, or quote plus
//! synthetic slippage), derives stop-loss / take-profit from the sized stop
//! distance, applies the spread gate and submits with bounded fixed-delay
//! retries.

use super::slippage::SlippageTable;
use crate::audit::AuditLog;
use crate::config::{ExecutionConfig, StrategyConfig};
use crate::error::TradingError;
use crate::exchange::{
    ConnectionSupervisor, OrderBook, OrderRequest, OrderResult, OrderSide, Position, Quote,
    TradingVenue,
};
use crate::risk::SizingResult;
use crate::utils::{Clock, RetryPolicy};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Stop-loss and take-profit for an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectiveLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Result of an entry attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Filled(OrderResult),
    /// Spread at or above the symbol's ceiling; nothing was sent
    SpreadTooWide { spread: f64, max_spread: f64 },
}

pub struct OrderExecutor {
    retry: RetryPolicy,
    magic: u64,
    slippage: SlippageTable,
    connection: ConnectionSupervisor,
    clock: Arc<dyn Clock>,
    audit: AuditLog,
}

impl OrderExecutor {
    pub fn new(
        retry: RetryPolicy,
        magic: u64,
        slippage: SlippageTable,
        connection: ConnectionSupervisor,
        clock: Arc<dyn Clock>,
        audit: AuditLog,
    ) -> Self {
        Self {
            retry,
            magic,
            slippage,
            connection,
            clock,
            audit,
        }
    }

    pub fn from_config(
        config: &ExecutionConfig,
        connection: ConnectionSupervisor,
        clock: Arc<dyn Clock>,
        audit: AuditLog,
    ) -> Self {
        Self::new(
            config.retry_policy(),
            config.magic,
            SlippageTable::from_config(config),
            connection,
            clock,
            audit,
        )
    }

    /// Price an order on `side` would fill at.
    pub fn resolve_entry(
        &self,
        symbol: &str,
        side: OrderSide,
        quote: &Quote,
        book: Option<&OrderBook>,
    ) -> f64 {
        if let Some(price) = book.and_then(|b| b.best_opposing(side)) {
            return price;
        }
        let slippage = self.slippage.sample(symbol);
        match side {
            OrderSide::Buy => quote.ask + slippage,
            OrderSide::Sell => quote.bid - slippage,
        }
    }

    /// SL beyond the stop distance and TP at `stop × ratio`, both widened by the spread.
    pub fn protective_levels(
        side: OrderSide,
        entry: f64,
        stop_distance: f64,
        tp_sl_ratio: f64,
        spread: f64,
    ) -> ProtectiveLevels {
        let target = stop_distance * tp_sl_ratio;
        match side {
            OrderSide::Buy => ProtectiveLevels {
                stop_loss: entry - stop_distance - spread,
                take_profit: entry + target + spread,
            },
            OrderSide::Sell => ProtectiveLevels {
                stop_loss: entry + stop_distance + spread,
                take_profit: entry - target - spread,
            },
        }
    }

    /// Deterministic tag for the entry decided on the bar at `bar_time`.
    pub fn entry_tag(symbol: &str, side: OrderSide, bar_time: DateTime<Utc>) -> String {
        format!("{symbol}-{side}-{}", bar_time.timestamp())
    }

    /// Open a position sized by `sizing` if the spread allows it.
    pub async fn open_position(
        &self,
        venue: &dyn TradingVenue,
        config: &StrategyConfig,
        side: OrderSide,
        sizing: &SizingResult,
        bar_time: DateTime<Utc>,
    ) -> Result<EntryOutcome, TradingError> {
        let symbol = config.symbol.as_str();

        self.connection
            .ensure_connected(venue, self.clock.as_ref())
            .await?;
        let quote = venue
            .get_quote(symbol)
            .await
            .map_err(|e| TradingError::data_quality(symbol, format!("quote unavailable: {e}")))?;

        let spread = quote.spread();
        self.audit
            .record_spread(symbol, self.clock.now(), spread, config.max_spread);
        if !(spread < config.max_spread) {
            info!(%symbol, spread, max_spread = config.max_spread, "Spread too wide, skipping entry");
            return Ok(EntryOutcome::SpreadTooWide {
                spread,
                max_spread: config.max_spread,
            });
        }

        let book = match venue.get_order_book(symbol).await {
            Ok(book) => book,
            Err(e) => {
                warn!(%symbol, error = %e, "Order book unavailable, using quote");
                None
            }
        };

        let entry = self.resolve_entry(symbol, side, &quote, book.as_ref());
        let levels = Self::protective_levels(
            side,
            entry,
            sizing.stop_distance,
            sizing.tp_sl_ratio,
            spread,
        );

        let request = OrderRequest::open(
            symbol,
            side,
            sizing.lots,
            entry,
            levels.stop_loss,
            levels.take_profit,
            Self::entry_tag(symbol, side, bar_time),
            self.magic,
        )?;

        info!(
            %symbol,
            %side,
            volume = %sizing.lots,
            entry,
            stop_loss = levels.stop_loss,
            take_profit = levels.take_profit,
            tag = %request.tag(),
            "Submitting entry order"
        );

        let result = self.submit_with_retry(venue, &request).await?;
        Ok(EntryOutcome::Filled(result))
    }

    /// Close `position` at the current opposite-side price.
    pub async fn close_position(
        &self,
        venue: &dyn TradingVenue,
        position: &Position,
        comment: &str,
    ) -> Result<OrderResult, TradingError> {
        let symbol = position.symbol.as_str();

        self.connection
            .ensure_connected(venue, self.clock.as_ref())
            .await?;
        let quote = venue
            .get_quote(symbol)
            .await
            .map_err(|e| TradingError::data_quality(symbol, format!("quote unavailable: {e}")))?;
        let price = if position.is_long() { quote.bid } else { quote.ask };

        let request = OrderRequest::close(position, price, self.magic, comment)?;
        info!(
            %symbol,
            ticket = position.ticket,
            side = %request.side(),
            volume = %request.volume(),
            price,
            comment,
            "Submitting close order"
        );
        self.submit_with_retry(venue, &request).await
    }

    /// Submit `request`, retrying unacknowledged, unsuccessful and failed
    /// submissions up to the policy's attempt budget.
    pub async fn submit_with_retry(
        &self,
        venue: &dyn TradingVenue,
        request: &OrderRequest,
    ) -> Result<OrderResult, TradingError> {
        let symbol = request.symbol();
        let tag = request.tag();
        let max_attempts = self.retry.max_attempts;
        let mut last_reason = String::from("not attempted");

        for attempt in 1..=max_attempts {
            if let Err(e) = self
                .connection
                .ensure_connected(venue, self.clock.as_ref())
                .await
            {
                last_reason = e.to_string();
            } else {
                match venue.submit_order(request).await {
                    Ok(Some(result)) if result.is_success() => {
                        info!(
                            %symbol,
                            %tag,
                            attempt,
                            ticket = ?result.ticket,
                            price = ?result.price,
                            "Order executed"
                        );
                        self.audit.record_order(self.clock.now(), request, &result);
                        return Ok(result);
                    }
                    Ok(Some(result)) => {
                        last_reason = format!("{:?}: {}", result.status, result.comment);
                    }
                    Ok(None) => {
                        last_reason = "no response from venue".to_string();
                    }
                    Err(e) => {
                        last_reason = e.to_string();
                    }
                }
            }

            warn!(
                %symbol,
                %tag,
                attempt,
                max_attempts,
                reason = %last_reason,
                "Order attempt failed"
            );
            if self.retry.has_next(attempt) {
                self.clock.sleep(self.retry.delay).await;
            }
        }

        error!(
            critical = true,
            %symbol,
            %tag,
            attempts = max_attempts,
            reason = %last_reason,
            "Order failed after all retries"
        );
        self.audit.record_error(
            self.clock.now(),
            &format!("{symbol} order {tag} failed after {max_attempts} attempts: {last_reason}"),
        );
        Err(TradingError::ExecutionRejected {
            symbol: symbol.to_string(),
            tag: tag.to_string(),
            attempts: max_attempts,
            reason: last_reason,
        })
    }
}
