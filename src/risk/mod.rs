//! Risk management.
//!
//! - Risk-percentage position sizing with a liquidity clamp
//! - Daily-loss circuit breaker gating every cycle

mod daily_loss;
mod sizing;

pub use daily_loss::{GuardVerdict, RiskGuard, RiskGuardState};
pub use sizing::{PositionSizer, SizingResult, PIP_SIZE};
