//! # FX Signal Trader
//!
//! A scheduled FX trading controller: every few minutes it pulls recent bars
//! per symbol, computes RSI / Bollinger / ATR / VWAP, turns them into a
//! buy/sell/none signal, sizes the trade from account equity and ATR, and
//! places market orders with protective stops. A daily-loss breaker flattens
//! everything when floating loss gets too deep.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `exchange`: Feed / venue traits, domain types, paper venue and CSV feed
//! - `indicators`: Pure indicator functions over a bar window
//! - `strategy`: RSI+Bollinger and VWAP+Bollinger signal policies
//! - `risk`: Position sizing and the daily-loss circuit breaker
//! - `execution`: Order submission with retries, RSI exits, flatten-all
//! - `engine`: One trading cycle end to end
//! - `schedule`: Weekly session and cycle cadence
//! - `audit`: Plain-text audit trail
//! - `utils`: Clock, retry policy and decimal helpers

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod execution;
pub mod indicators;
pub mod risk;
pub mod schedule;
pub mod strategy;
pub mod utils;

pub use config::Config;
pub use error::TradingError;
