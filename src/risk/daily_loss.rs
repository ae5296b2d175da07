//! Daily-loss circuit breaker.
//!
//! Compares floating loss (balance - equity) against balance every cycle.
//! Once the loss reaches the configured percentage the guard latches into
//! `Tripped` for the rest of the process: every later cycle only flattens.

use crate::exchange::AccountSnapshot;
use crate::utils::decimal::percentage_of;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskGuardState {
    Normal,
    Tripped,
}

/// What the engine should do this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Trade normally
    Allow,
    /// Guard tripped on this snapshot: flatten everything, skip all symbols
    Trip,
    /// Guard was already tripped: re-run flatten-all only
    Halted,
}

impl GuardVerdict {
    pub fn allows_trading(&self) -> bool {
        matches!(self, GuardVerdict::Allow)
    }
}

pub struct RiskGuard {
    max_daily_loss_pct: Decimal,
    state: RiskGuardState,
    tripped_at: Option<DateTime<Utc>>,
    /// Drawdown that tripped the guard
    trip_drawdown_pct: Option<Decimal>,
}

impl RiskGuard {
    pub fn new(max_daily_loss_pct: Decimal) -> Self {
        Self {
            max_daily_loss_pct,
            state: RiskGuardState::Normal,
            tripped_at: None,
            trip_drawdown_pct: None,
        }
    }

    pub fn state(&self) -> RiskGuardState {
        self.state
    }

    pub fn is_tripped(&self) -> bool {
        self.state == RiskGuardState::Tripped
    }

    pub fn tripped_at(&self) -> Option<DateTime<Utc>> {
        self.tripped_at
    }

    pub fn trip_drawdown_pct(&self) -> Option<Decimal> {
        self.trip_drawdown_pct
    }

    /// Floating loss as a percentage of balance; `None` when balance is not positive.
    pub fn drawdown_pct(account: &AccountSnapshot) -> Option<Decimal> {
        if account.balance <= Decimal::ZERO {
            return None;
        }
        percentage_of(account.balance - account.equity, account.balance)
    }

    /// Evaluate a fresh account snapshot.
    pub fn evaluate(&mut self, account: &AccountSnapshot, now: DateTime<Utc>) -> GuardVerdict {
        if self.is_tripped() {
            return GuardVerdict::Halted;
        }

        let drawdown = Self::drawdown_pct(account);
        let breached = match drawdown {
            Some(pct) => pct >= self.max_daily_loss_pct,
            // Nothing left to protect
            None => true,
        };

        if !breached {
            return GuardVerdict::Allow;
        }

        self.state = RiskGuardState::Tripped;
        self.tripped_at = Some(now);
        self.trip_drawdown_pct = drawdown;
        error!(
            critical = true,
            balance = %account.balance,
            equity = %account.equity,
            drawdown_pct = ?drawdown,
            max_daily_loss_pct = %self.max_daily_loss_pct,
            "Daily loss limit reached, circuit breaker tripped"
        );
        info!("Trading halted until restart; flattening all positions");
        GuardVerdict::Trip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(balance: Decimal, equity: Decimal) -> AccountSnapshot {
        AccountSnapshot { balance, equity }
    }

    #[test]
    fn test_trips_exactly_at_threshold() {
        let mut guard = RiskGuard::new(dec!(10));
        let verdict = guard.evaluate(&snapshot(dec!(10000), dec!(9000)), Utc::now());
        assert_eq!(verdict, GuardVerdict::Trip);
        assert!(guard.is_tripped());
        assert!(guard.tripped_at().is_some());
    }

    #[test]
    fn test_just_below_threshold_allows() {
        let mut guard = RiskGuard::new(dec!(10));
        let verdict = guard.evaluate(&snapshot(dec!(10000), dec!(9001)), Utc::now());
        assert_eq!(verdict, GuardVerdict::Allow);
        assert_eq!(guard.state(), RiskGuardState::Normal);
    }

    #[test]
    fn test_latched_after_recovery() {
        let mut guard = RiskGuard::new(dec!(10));
        guard.evaluate(&snapshot(dec!(10000), dec!(8500)), Utc::now());

        // Equity recovered but the breaker stays open
        let verdict = guard.evaluate(&snapshot(dec!(10000), dec!(10000)), Utc::now());
        assert_eq!(verdict, GuardVerdict::Halted);
        assert!(!verdict.allows_trading());
    }

    #[test]
    fn test_non_positive_balance_trips() {
        let mut guard = RiskGuard::new(dec!(10));
        let verdict = guard.evaluate(&snapshot(dec!(0), dec!(0)), Utc::now());
        assert_eq!(verdict, GuardVerdict::Trip);
    }

    #[test]
    fn test_floating_profit_is_not_a_loss() {
        let mut guard = RiskGuard::new(dec!(10));
        let verdict = guard.evaluate(&snapshot(dec!(10000), dec!(12000)), Utc::now());
        assert!(verdict.allows_trading());
        assert_eq!(
            RiskGuard::drawdown_pct(&snapshot(dec!(10000), dec!(12000))),
            Some(dec!(-20))
        );
    }
}
