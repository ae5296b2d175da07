//! Order requests sent to the venue.
//!
//! Requests can only be built through [`OrderRequest::open`] and
//! [`OrderRequest::close`], which reject anything the venue should never see:
//! zero volume, non-finite prices, or protective levels on the wrong side of
//! the entry.

use super::types::{OrderSide, Position};
use crate::error::TradingError;
use rust_decimal::Decimal;
use serde::Serialize;

/// What the order does at the venue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum OrderIntent {
    /// Open a new position with protective levels
    Open { stop_loss: f64, take_profit: f64 },
    /// Close an existing position by ticket
    Close { ticket: u64 },
}

/// A validated market order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    symbol: String,
    side: OrderSide,
    volume: Decimal,
    price: f64,
    #[serde(flatten)]
    intent: OrderIntent,
    tag: String,
    magic: u64,
    comment: String,
}

impl OrderRequest {
    /// Build an entry order.
    ///
    /// `tag` must be deterministic for the decision it represents so that a
    /// venue can recognise a replayed submission.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        symbol: &str,
        side: OrderSide,
        volume: Decimal,
        price: f64,
        stop_loss: f64,
        take_profit: f64,
        tag: String,
        magic: u64,
    ) -> Result<Self, TradingError> {
        let request = Self {
            symbol: symbol.to_string(),
            side,
            volume,
            price,
            intent: OrderIntent::Open {
                stop_loss,
                take_profit,
            },
            tag,
            magic,
            comment: "open".to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Build an order closing `position` at `price`.
    pub fn close(
        position: &Position,
        price: f64,
        magic: u64,
        comment: &str,
    ) -> Result<Self, TradingError> {
        let request = Self {
            symbol: position.symbol.clone(),
            side: position.side.opposite(),
            volume: position.volume,
            price,
            intent: OrderIntent::Close {
                ticket: position.ticket,
            },
            tag: format!("close-{}", position.ticket),
            magic,
            comment: comment.to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<(), TradingError> {
        let invalid = |reason: String| Err(TradingError::InvalidOrder(reason));

        if self.symbol.trim().is_empty() {
            return invalid("symbol is empty".to_string());
        }
        if self.tag.trim().is_empty() {
            return invalid(format!("{}: tag is empty", self.symbol));
        }
        if self.volume <= Decimal::ZERO {
            return invalid(format!("{}: volume {} is not positive", self.symbol, self.volume));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return invalid(format!("{}: entry price {} is invalid", self.symbol, self.price));
        }

        if let OrderIntent::Open {
            stop_loss,
            take_profit,
        } = self.intent
        {
            if !stop_loss.is_finite() || !take_profit.is_finite() {
                return invalid(format!("{}: protective levels must be finite", self.symbol));
            }
            let ordered = match self.side {
                OrderSide::Buy => stop_loss < self.price && self.price < take_profit,
                OrderSide::Sell => take_profit < self.price && self.price < stop_loss,
            };
            if !ordered {
                return invalid(format!(
                    "{}: {} at {} has SL {} / TP {} on the wrong side",
                    self.symbol, self.side, self.price, stop_loss, take_profit
                ));
            }
        }

        Ok(())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn intent(&self) -> OrderIntent {
        self.intent
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn magic(&self) -> u64 {
        self.magic
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Stop-loss level for entry orders.
    pub fn stop_loss(&self) -> Option<f64> {
        match self.intent {
            OrderIntent::Open { stop_loss, .. } => Some(stop_loss),
            OrderIntent::Close { .. } => None,
        }
    }

    /// Take-profit level for entry orders.
    pub fn take_profit(&self) -> Option<f64> {
        match self.intent {
            OrderIntent::Open { take_profit, .. } => Some(take_profit),
            OrderIntent::Close { .. } => None,
        }
    }
}
