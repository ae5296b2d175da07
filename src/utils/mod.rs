//! Shared utilities.

pub mod clock;
pub mod decimal;
pub mod retry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use retry::RetryPolicy;
