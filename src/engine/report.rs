//! Per-cycle summary returned by [`super::TradingEngine::run_cycle`].

use crate::execution::CloseReport;
use crate::strategy::Signal;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Every symbol was visited
    Completed,
    /// Venue unreachable after the reconnect budget; nothing was traded
    ConnectivityLost,
    /// Account snapshot could not be read; nothing was traded
    AccountUnavailable,
    /// Daily-loss breaker tripped this cycle and everything was flattened
    GuardTripped,
    /// Breaker tripped earlier; flatten-all re-run, no trading
    Halted,
}

/// What happened to the entry leg of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    NoSignal,
    Opened { ticket: Option<u64>, lots: Decimal },
    SpreadTooWide,
    SizingFailed(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub signal: Signal,
    pub entry: EntryResult,
    /// Tickets closed by the RSI exit
    pub closed: Vec<u64>,
    /// Error that ended processing of this symbol early
    pub error: Option<String>,
}

impl SymbolOutcome {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            signal: Signal::None,
            entry: EntryResult::NoSignal,
            closed: Vec::new(),
            error: None,
        }
    }

    pub fn opened(&self) -> bool {
        matches!(self.entry, EntryResult::Opened { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub status: CycleStatus,
    pub symbols: Vec<SymbolOutcome>,
    /// Set when the cycle ran flatten-all
    pub flattened: Option<CloseReport>,
}

impl CycleReport {
    pub fn new(started_at: DateTime<Utc>, status: CycleStatus) -> Self {
        Self {
            started_at,
            status,
            symbols: Vec::new(),
            flattened: None,
        }
    }

    pub fn orders_opened(&self) -> usize {
        self.symbols.iter().filter(|s| s.opened()).count()
    }

    pub fn errors(&self) -> usize {
        self.symbols.iter().filter(|s| s.error.is_some()).count()
    }

    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }
}
