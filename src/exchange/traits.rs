//! Boundaries to the market-data feed and the execution venue.
//!
//! The engine only talks to these traits. The crate ships a CSV feed and an
//! in-memory paper venue; a live brokerage connector implements the same pair.

use super::order::OrderRequest;
use super::types::{AccountSnapshot, Bar, OrderBook, OrderResult, Position, Quote, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of historical bars.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Bars for `symbol` with `from <= timestamp <= to`, oldest first.
    ///
    /// An empty vector means the feed had nothing; callers retry.
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Bar>>;
}

/// Brokerage / execution venue.
#[async_trait]
pub trait TradingVenue: Send + Sync {
    /// Cheap liveness check.
    async fn is_connected(&self) -> bool;

    /// (Re)establish the session.
    async fn connect(&self) -> anyhow::Result<()>;

    async fn get_account(&self) -> anyhow::Result<AccountSnapshot>;

    async fn get_quote(&self, symbol: &str) -> anyhow::Result<Quote>;

    /// Market depth. `None` when the venue publishes no book for the symbol.
    async fn get_order_book(&self, symbol: &str) -> anyhow::Result<Option<OrderBook>>;

    /// Open positions, optionally filtered to one symbol.
    async fn get_positions(&self, symbol: Option<&str>) -> anyhow::Result<Vec<Position>>;

    /// Submit a market order.
    ///
    /// `Ok(None)` means the venue never acknowledged the request.
    async fn submit_order(&self, order: &OrderRequest) -> anyhow::Result<Option<OrderResult>>;
}
