//! Order execution and position exits.

mod executor;
mod positions;
mod slippage;

pub use executor::{EntryOutcome, OrderExecutor, ProtectiveLevels};
pub use positions::{CloseReport, PositionManager};
pub use slippage::{SlippageBounds, SlippageTable};
