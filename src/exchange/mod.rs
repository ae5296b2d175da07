//! Market-data feed and execution venue boundary.
//!
//! Traits the engine depends on, the shared domain types, and the reference
//! implementations used by the binary and the tests.

pub mod connection;
pub mod csv_feed;
pub mod order;
pub mod paper;
pub mod traits;
pub mod types;

pub use connection::ConnectionSupervisor;
pub use csv_feed::CsvBarFeed;
pub use order::{OrderIntent, OrderRequest};
pub use paper::{PaperVenue, ScriptedSubmit};
pub use traits::{MarketDataFeed, TradingVenue};
pub use types::*;

#[cfg(test)]
pub use traits::MockMarketDataFeed;
