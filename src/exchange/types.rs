//! Type definitions shared across the market-data feed and the venue.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Units of base currency in one standard lot.
pub const CONTRACT_SIZE: f64 = 100_000.0;

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Tick volume
    pub volume: f64,
}

impl Bar {
    /// Bars with no range carry no information (bad tick or illiquid minute).
    pub fn is_flat(&self) -> bool {
        self.high == self.low
    }

    /// Typical price used by VWAP.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Bar timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    /// Length of one bar in minutes.
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }

    /// Time spanned by `bars` consecutive bars.
    pub fn span(&self, bars: usize) -> Duration {
        Duration::minutes(self.minutes() * bars as i64)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Account balance and equity.
///
/// Equity below balance means open positions are carrying an unrealized loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub balance: Decimal,
    pub equity: Decimal,
}

/// Best bid/ask for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the order book a level rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookSide {
    /// Resting buy orders
    Bid,
    /// Resting sell orders
    Ask,
}

/// One depth level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub side: BookSide,
    pub price: f64,
    pub volume: Decimal,
}

/// Market depth snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub levels: Vec<BookLevel>,
}

impl OrderBook {
    pub fn new(levels: Vec<BookLevel>) -> Self {
        Self { levels }
    }

    /// Lowest resting ask.
    pub fn best_ask(&self) -> Option<f64> {
        self.prices(BookSide::Ask).reduce(f64::min)
    }

    /// Highest resting bid.
    pub fn best_bid(&self) -> Option<f64> {
        self.prices(BookSide::Bid).reduce(f64::max)
    }

    /// Best price an order on `side` would trade against.
    pub fn best_opposing(&self, side: OrderSide) -> Option<f64> {
        match side {
            OrderSide::Buy => self.best_ask(),
            OrderSide::Sell => self.best_bid(),
        }
    }

    /// Total visible volume an order on `side` could consume.
    ///
    /// Returns `None` when that side of the book is empty.
    pub fn liquidity_for(&self, side: OrderSide) -> Option<Decimal> {
        let book_side = match side {
            OrderSide::Buy => BookSide::Ask,
            OrderSide::Sell => BookSide::Bid,
        };
        let mut levels = self.levels.iter().filter(|l| l.side == book_side).peekable();
        levels.peek()?;
        Some(levels.map(|l| l.volume).sum())
    }

    fn prices(&self, side: BookSide) -> impl Iterator<Item = f64> + '_ {
        self.levels
            .iter()
            .filter(move |l| l.side == side && l.price.is_finite())
            .map(|l| l.price)
    }
}

/// An open position at the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticket: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub volume: Decimal,
    pub open_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == OrderSide::Buy
    }
}

/// Venue verdict on a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Done,
    Rejected,
    Requote,
    NoLiquidity,
    MarketClosed,
}

/// Response to an order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub status: OrderStatus,
    pub comment: String,
    /// Ticket of the opened (or closed) position
    pub ticket: Option<u64>,
    /// Fill price reported by the venue
    pub price: Option<f64>,
}

impl OrderResult {
    pub fn is_success(&self) -> bool {
        self.status == OrderStatus::Done
    }
}
