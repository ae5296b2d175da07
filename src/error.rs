//! Error taxonomy for the trading engine.
//!
//! Every per-symbol failure maps to one of these variants. Only `Init` is
//! fatal to the process; everything else is caught at the symbol boundary,
//! logged, and the cycle moves on.

use thiserror::Error;

/// Trading engine errors
#[derive(Debug, Error)]
pub enum TradingError {
    /// Venue or feed unreachable after the bounded reconnect sequence
    #[error("Connectivity lost: {0}")]
    Connectivity(String),
    /// Empty, unordered or NaN-laden price / indicator data
    #[error("Data quality issue for {symbol}: {reason}")]
    DataQuality { symbol: String, reason: String },
    /// Stop distance or pip value could not produce a finite lot size
    #[error("Invalid sizing inputs: {0}")]
    SizingInvalid(String),
    /// Venue rejected or never acknowledged the order
    #[error("Order {tag} for {symbol} failed after {attempts} attempts: {reason}")]
    ExecutionRejected {
        symbol: String,
        tag: String,
        attempts: u32,
        reason: String,
    },
    /// Order request failed construction-time validation
    #[error("Invalid order request: {0}")]
    InvalidOrder(String),
    /// Initial venue connection could not be established
    #[error("Initialization failed: {0}")]
    Init(String),
}

impl TradingError {
    /// Shorthand for a data-quality failure on `symbol`.
    pub fn data_quality(symbol: &str, reason: impl Into<String>) -> Self {
        TradingError::DataQuality {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this failure should terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TradingError::Init(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_init_is_fatal() {
        assert!(TradingError::Init("no terminal".into()).is_fatal());
        assert!(!TradingError::Connectivity("timeout".into()).is_fatal());
        assert!(!TradingError::data_quality("EURUSD", "empty").is_fatal());
    }

    #[test]
    fn test_display_includes_symbol() {
        let err = TradingError::data_quality("USDCAD", "no bars returned");
        assert_eq!(
            err.to_string(),
            "Data quality issue for USDCAD: no bars returned"
        );
    }
}
