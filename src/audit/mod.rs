//! Plain-text audit trail.
//!
//! Files under the audit directory:
//! - `<SYMBOL>_last_bar.txt`: latest indicator row, overwritten each cycle
//! - `<SYMBOL>_bars.log`: every evaluated indicator row, one JSON line each
//! - `<SYMBOL>_size.log`: `timestamp,size,stop_distance,pip_value`
//! - `<SYMBOL>_spread.log`: `timestamp,spread,max_spread,allowed`
//! - `orders.log`: one JSON line per executed order
//! - `errors.log`: operational errors
//!
//! Write failures are logged and swallowed; the trail never stops trading.

use crate::config::AuditConfig;
use crate::exchange::{OrderRequest, OrderResult};
use crate::indicators::IndicatorRow;
use crate::risk::SizingResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AuditLog {
    directory: Option<PathBuf>,
}

#[derive(Serialize)]
struct OrderRecord<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    request: &'a OrderRequest,
    result: &'a OrderResult,
}

impl AuditLog {
    /// Audit into `directory`, creating it if needed.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).with_context(|| {
            format!("Failed to create audit directory {}", directory.display())
        })?;
        Ok(Self {
            directory: Some(directory),
        })
    }

    /// Audit log that writes nothing.
    pub fn disabled() -> Self {
        Self { directory: None }
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        if config.enabled {
            Self::new(&config.directory)
        } else {
            Ok(Self::disabled())
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Snapshot the evaluated row and append it to the symbol's bar history.
    pub fn record_bar(&self, symbol: &str, row: &IndicatorRow) {
        let (body, line) = match (serde_json::to_string_pretty(row), serde_json::to_string(row)) {
            (Ok(body), Ok(line)) => (body, line),
            (Err(e), _) | (_, Err(e)) => {
                warn!(%symbol, error = %e, "Failed to serialize bar snapshot");
                return;
            }
        };
        self.write(&format!("{symbol}_last_bar.txt"), &body, false);
        self.write(&format!("{symbol}_bars.log"), &line, true);
    }

    pub fn record_size(&self, symbol: &str, timestamp: DateTime<Utc>, sizing: &SizingResult) {
        let line = format!(
            "{},{},{},{}",
            timestamp.to_rfc3339(),
            sizing.lots,
            sizing.stop_distance,
            sizing.pip_value
        );
        self.write(&format!("{symbol}_size.log"), &line, true);
    }

    pub fn record_spread(&self, symbol: &str, timestamp: DateTime<Utc>, spread: f64, max_spread: f64) {
        let line = format!(
            "{},{},{},{}",
            timestamp.to_rfc3339(),
            spread,
            max_spread,
            spread < max_spread
        );
        self.write(&format!("{symbol}_spread.log"), &line, true);
    }

    pub fn record_order(&self, timestamp: DateTime<Utc>, request: &OrderRequest, result: &OrderResult) {
        let record = OrderRecord {
            timestamp,
            request,
            result,
        };
        match serde_json::to_string(&record) {
            Ok(line) => self.write("orders.log", &line, true),
            Err(e) => warn!(tag = %request.tag(), error = %e, "Failed to serialize order record"),
        }
    }

    pub fn record_error(&self, timestamp: DateTime<Utc>, message: &str) {
        let line = format!("{} {}", timestamp.to_rfc3339(), message);
        self.write("errors.log", &line, true);
    }

    fn write(&self, file: &str, content: &str, append: bool) {
        let Some(directory) = &self.directory else {
            return;
        };
        let path = directory.join(file);
        let result = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .and_then(|mut f| writeln!(f, "{content}"));

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Audit write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{OrderSide, OrderStatus};
    use rust_decimal_macros::dec;

    fn read(log: &AuditLog, file: &str) -> String {
        std::fs::read_to_string(log.directory().unwrap().join(file)).unwrap()
    }

    fn sizing() -> SizingResult {
        SizingResult {
            lots: dec!(0.12),
            unclamped_lots: dec!(0.12),
            stop_distance: 0.0008,
            pip_value: 8.9,
            tp_sl_ratio: 1.5,
        }
    }

    #[test]
    fn test_size_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path()).unwrap();
        let ts = Utc::now();

        log.record_size("EURUSD", ts, &sizing());
        log.record_size("EURUSD", ts, &sizing());

        let content = read(&log, "EURUSD_size.log");
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with(&format!("{},0.12,", ts.to_rfc3339())));
    }

    #[test]
    fn test_last_bar_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path()).unwrap();
        let mut row = crate::strategy::test_row(1.1, 55.0, None);

        log.record_bar("USDCAD", &row);
        row.close = 1.3;
        log.record_bar("USDCAD", &row);

        let content = read(&log, "USDCAD_last_bar.txt");
        assert!(content.contains("\"close\": 1.3"));
        assert!(!content.contains("\"close\": 1.1"));
    }

    #[test]
    fn test_bar_history_keeps_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path()).unwrap();
        let mut row = crate::strategy::test_row(1.1, 55.0, None);

        log.record_bar("AUDNZD", &row);
        row.close = 1.3;
        log.record_bar("AUDNZD", &row);

        let history = read(&log, "AUDNZD_bars.log");
        let closes: Vec<f64> = history
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["close"].as_f64().unwrap())
            .collect();
        assert_eq!(closes, vec![1.1, 1.3]);
    }

    #[test]
    fn test_order_and_error_records() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path()).unwrap();
        let request = OrderRequest::open(
            "EURUSD",
            OrderSide::Buy,
            dec!(0.1),
            1.1,
            1.09,
            1.12,
            "EURUSD-buy-1".to_string(),
            234000,
        )
        .unwrap();
        let result = OrderResult {
            status: OrderStatus::Done,
            comment: "filled".to_string(),
            ticket: Some(7),
            price: Some(1.1),
        };

        log.record_order(Utc::now(), &request, &result);
        log.record_error(Utc::now(), "EURUSD order failed");

        let orders = read(&log, "orders.log");
        assert!(orders.contains("\"tag\":\"EURUSD-buy-1\""));
        assert!(orders.contains("\"status\":\"DONE\""));
        assert!(read(&log, "errors.log").contains("EURUSD order failed"));
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let log = AuditLog::disabled();
        log.record_error(Utc::now(), "ignored");
        assert!(log.directory().is_none());
    }
}
