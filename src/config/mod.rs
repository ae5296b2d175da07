//! Configuration management for the signal trader.
//!
//! Loads settings from an optional `config.toml` plus `FST__`-prefixed
//! environment variables. The resulting [`Config`] is immutable and handed to
//! each component explicitly.

use crate::exchange::Timeframe;
use crate::indicators::ATR_LENGTH;
use crate::utils::RetryPolicy;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Daily-loss circuit breaker
    #[serde(default)]
    pub risk: RiskConfig,
    /// Order submission and slippage parameters
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Venue reconnect policy
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Bar window and feed settings
    #[serde(default)]
    pub data: DataConfig,
    /// Trading session and cycle cadence
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Plain-text audit trail
    #[serde(default)]
    pub audit: AuditConfig,
    /// Paper venue used by the binary
    #[serde(default)]
    pub paper: PaperConfig,
    /// One entry per traded symbol
    #[serde(default = "default_symbols")]
    pub symbols: Vec<StrategyConfig>,
}

/// Which signal policy a symbol trades with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    RsiBollinger,
    VwapBollinger,
}

/// Per-symbol strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Venue symbol, e.g. "EURUSD"
    pub symbol: String,
    pub strategy: StrategyKind,
    #[serde(default = "default_rsi_length")]
    pub rsi_length: usize,
    /// Bollinger length; unset means the strategy's default (see [`Self::bb_length`])
    #[serde(default)]
    pub bb_length: Option<usize>,
    /// Bollinger width in standard deviations; unset means the strategy's default
    #[serde(default)]
    pub bb_std: Option<f64>,
    /// VWAP trend lookback; the trend window spans `backcandles + 1` bars
    #[serde(default = "default_backcandles")]
    pub backcandles: usize,
    /// Fraction of equity risked per trade (0.01 = 1%)
    #[serde(default = "default_risk_perc")]
    pub risk_perc: f64,
    /// Stop distance = ATR * coefficient
    #[serde(default = "default_sl_atr_coef", alias = "slatrcoef")]
    pub sl_atr_coef: f64,
    /// Take-profit distance as a multiple of the stop distance
    #[serde(default = "default_tp_sl_ratio")]
    pub tp_sl_ratio: f64,
    /// Orders are only sent while ask - bid is strictly below this
    #[serde(default = "default_max_spread")]
    pub max_spread: f64,
    /// Longs close once RSI reaches this level
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
    /// Shorts close once RSI falls to this level
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Drawdown of equity vs balance, in percent, that trips the breaker
    #[serde(default = "default_max_daily_loss_pct")]
    pub max_daily_loss_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Submission attempts per order (including the first)
    #[serde(default = "default_order_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between submission attempts
    #[serde(default = "default_order_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Magic number stamped on every order
    #[serde(default = "default_magic")]
    pub magic: u64,
    /// Per-symbol synthetic slippage bounds
    #[serde(default = "default_slippage")]
    pub slippage: Vec<SlippageEntry>,
    /// Bounds for symbols not listed in `slippage`
    #[serde(default = "default_fallback_slippage")]
    pub default_slippage: SlippageEntry,
    /// Fixed RNG seed for reproducible slippage (None = entropy)
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Slippage range for one symbol. `symbol` is ignored for the default entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlippageEntry {
    #[serde(default)]
    pub symbol: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Reconnect attempts before giving up
    #[serde(default = "default_connect_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_connect_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,
    /// Number of bars requested per cycle
    #[serde(default = "default_window_bars")]
    pub window_bars: usize,
    /// Directory holding `<SYMBOL>.csv` bar files for the paper feed
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Fetch attempts when the feed returns nothing
    #[serde(default = "default_fetch_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_fetch_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes between cycles
    #[serde(default = "default_cadence_minutes")]
    pub cadence_minutes: u32,
    /// Minute within each cadence slot at which the cycle fires
    #[serde(default = "default_minute_offset")]
    pub minute_offset: u32,
    /// Fixed offset of the session clock from UTC
    #[serde(default)]
    pub utc_offset_hours: i32,
    /// Weekly session start, e.g. "Sun 22:00"
    #[serde(default = "default_session_open")]
    pub session_open: String,
    /// Weekly flatten-all and session end, e.g. "Fri 21:30"
    #[serde(default = "default_weekly_flatten")]
    pub weekly_flatten: String,
    /// Minutes between connectivity heartbeats
    #[serde(default = "default_heartbeat_minutes")]
    pub heartbeat_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    #[serde(default = "default_audit_dir")]
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_paper_balance")]
    pub initial_balance: Decimal,
    /// Quoted spread around the last close
    #[serde(default = "default_paper_spread")]
    pub spread: f64,
}

// Default value functions
fn default_rsi_length() -> usize {
    14
}

/// Bollinger (length, width) used when a symbol leaves them unset.
fn default_bands(strategy: StrategyKind) -> (usize, f64) {
    match strategy {
        StrategyKind::RsiBollinger => (15, 1.5),
        StrategyKind::VwapBollinger => (14, 2.0),
    }
}

fn default_backcandles() -> usize {
    15
}

fn default_risk_perc() -> f64 {
    0.01 // 1% of equity
}

fn default_sl_atr_coef() -> f64 {
    1.0
}

fn default_tp_sl_ratio() -> f64 {
    1.5
}

fn default_max_spread() -> f64 {
    0.0003 // 3 pips on 5-digit quotes
}

fn default_rsi_overbought() -> f64 {
    70.0
}

fn default_rsi_oversold() -> f64 {
    30.0
}

fn default_max_daily_loss_pct() -> Decimal {
    Decimal::new(10, 0) // 10%
}

fn default_order_attempts() -> u32 {
    3
}

fn default_order_retry_delay_ms() -> u64 {
    5_000
}

fn default_magic() -> u64 {
    234_000
}

fn default_slippage() -> Vec<SlippageEntry> {
    vec![
        SlippageEntry {
            symbol: "AUDNZD".to_string(),
            min: -0.0002,
            max: 0.0002,
        },
        SlippageEntry {
            symbol: "USDCAD".to_string(),
            min: -0.0003,
            max: 0.0003,
        },
        SlippageEntry {
            symbol: "EURUSD".to_string(),
            min: -0.0001,
            max: 0.00015,
        },
    ]
}

fn default_fallback_slippage() -> SlippageEntry {
    SlippageEntry {
        symbol: String::new(),
        min: -0.0003,
        max: 0.0003,
    }
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_connect_retry_delay_secs() -> u64 {
    5
}

fn default_timeframe() -> Timeframe {
    Timeframe::M5
}

fn default_window_bars() -> usize {
    150
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_fetch_retry_delay_secs() -> u64 {
    5
}

fn default_cadence_minutes() -> u32 {
    5
}

fn default_minute_offset() -> u32 {
    1 // fire at :01, :06, ... :56
}

fn default_session_open() -> String {
    "Sun 22:00".to_string()
}

fn default_weekly_flatten() -> String {
    "Fri 21:30".to_string()
}

fn default_heartbeat_minutes() -> u32 {
    3
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_dir() -> String {
    "audit".to_string()
}

fn default_paper_balance() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_paper_spread() -> f64 {
    0.0001
}

fn default_symbols() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::new("EURUSD", StrategyKind::RsiBollinger),
        StrategyConfig::new("USDCAD", StrategyKind::RsiBollinger),
        StrategyConfig::new("AUDNZD", StrategyKind::VwapBollinger),
    ]
}

impl StrategyConfig {
    /// Build a config for `symbol` with default parameters.
    pub fn new(symbol: &str, strategy: StrategyKind) -> Self {
        Self {
            symbol: symbol.to_string(),
            strategy,
            rsi_length: default_rsi_length(),
            bb_length: None,
            bb_std: None,
            backcandles: default_backcandles(),
            risk_perc: default_risk_perc(),
            sl_atr_coef: default_sl_atr_coef(),
            tp_sl_ratio: default_tp_sl_ratio(),
            max_spread: default_max_spread(),
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
        }
    }

    /// Bollinger length, falling back to the strategy's default.
    pub fn bb_length(&self) -> usize {
        self.bb_length
            .unwrap_or_else(|| default_bands(self.strategy).0)
    }

    /// Bollinger width, falling back to the strategy's default.
    pub fn bb_std(&self) -> f64 {
        self.bb_std.unwrap_or_else(|| default_bands(self.strategy).1)
    }

    /// Bars consumed before every indicator of this symbol is defined.
    pub fn warmup_bars(&self) -> usize {
        let indicators = self
            .rsi_length
            .max(self.bb_length().saturating_sub(1))
            .max(ATR_LENGTH);
        match self.strategy {
            StrategyKind::RsiBollinger => indicators + 1,
            StrategyKind::VwapBollinger => indicators + self.backcandles + 1,
        }
    }

    fn validate(&self) -> Result<()> {
        let symbol = &self.symbol;
        anyhow::ensure!(!symbol.trim().is_empty(), "symbol must not be empty");
        anyhow::ensure!(self.rsi_length >= 1, "{symbol}: rsi_length must be >= 1");
        anyhow::ensure!(self.bb_length() >= 2, "{symbol}: bb_length must be >= 2");
        anyhow::ensure!(
            self.bb_std().is_finite() && self.bb_std() > 0.0,
            "{symbol}: bb_std must be positive"
        );
        anyhow::ensure!(
            self.risk_perc > 0.0 && self.risk_perc <= 1.0,
            "{symbol}: risk_perc must be between 0 and 1"
        );
        anyhow::ensure!(
            self.sl_atr_coef.is_finite() && self.sl_atr_coef > 0.0,
            "{symbol}: sl_atr_coef must be positive"
        );
        anyhow::ensure!(
            self.tp_sl_ratio.is_finite() && self.tp_sl_ratio > 0.0,
            "{symbol}: tp_sl_ratio must be positive"
        );
        anyhow::ensure!(
            self.max_spread.is_finite() && self.max_spread > 0.0,
            "{symbol}: max_spread must be positive"
        );
        anyhow::ensure!(
            self.rsi_oversold < self.rsi_overbought,
            "{symbol}: rsi_oversold must be below rsi_overbought"
        );
        Ok(())
    }
}

impl ExecutionConfig {
    /// Retry policy for order submission.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

impl ConnectionConfig {
    /// Retry policy for reconnecting to the venue.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.retry_delay_secs))
    }
}

impl DataConfig {
    /// Retry policy for empty bar fetches.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.retry_delay_secs))
    }
}

impl Config {
    /// Load configuration from environment variables and `config.toml`.
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration from the named file (extension optional) and the environment.
    pub fn load_from(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::default().separator("__").prefix("FST"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.risk.max_daily_loss_pct > Decimal::ZERO
                && self.risk.max_daily_loss_pct <= Decimal::new(100, 0),
            "max_daily_loss_pct must be between 0 and 100"
        );

        anyhow::ensure!(
            self.execution.max_attempts >= 1,
            "execution.max_attempts must be >= 1"
        );
        anyhow::ensure!(
            self.connection.max_attempts >= 1,
            "connection.max_attempts must be >= 1"
        );
        anyhow::ensure!(self.data.max_attempts >= 1, "data.max_attempts must be >= 1");

        for entry in self
            .execution
            .slippage
            .iter()
            .chain(std::iter::once(&self.execution.default_slippage))
        {
            anyhow::ensure!(
                entry.min.is_finite() && entry.max.is_finite() && entry.min <= entry.max,
                "slippage bounds for '{}' must be finite with min <= max",
                entry.symbol
            );
        }

        anyhow::ensure!(!self.symbols.is_empty(), "at least one symbol must be configured");

        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            symbol.validate()?;
            anyhow::ensure!(
                seen.insert(symbol.symbol.as_str()),
                "symbol {} configured twice",
                symbol.symbol
            );
            anyhow::ensure!(
                self.data.window_bars >= symbol.warmup_bars(),
                "data.window_bars ({}) is shorter than the warm-up of {} ({})",
                self.data.window_bars,
                symbol.symbol,
                symbol.warmup_bars()
            );
        }

        anyhow::ensure!(
            self.schedule.cadence_minutes >= 1 && self.schedule.cadence_minutes <= 60,
            "schedule.cadence_minutes must be between 1 and 60"
        );
        anyhow::ensure!(
            self.schedule.minute_offset < self.schedule.cadence_minutes,
            "schedule.minute_offset must be below cadence_minutes"
        );
        crate::schedule::TradingCalendar::from_config(&self.schedule)
            .context("Invalid schedule")?;

        anyhow::ensure!(
            self.paper.spread.is_finite() && self.paper.spread >= 0.0,
            "paper.spread must be non-negative"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            risk: RiskConfig::default(),
            execution: ExecutionConfig::default(),
            connection: ConnectionConfig::default(),
            data: DataConfig::default(),
            schedule: ScheduleConfig::default(),
            audit: AuditConfig::default(),
            paper: PaperConfig::default(),
            symbols: default_symbols(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_loss_pct: default_max_daily_loss_pct(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_order_attempts(),
            retry_delay_ms: default_order_retry_delay_ms(),
            magic: default_magic(),
            slippage: default_slippage(),
            default_slippage: default_fallback_slippage(),
            rng_seed: None,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_connect_attempts(),
            retry_delay_secs: default_connect_retry_delay_secs(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            timeframe: default_timeframe(),
            window_bars: default_window_bars(),
            data_dir: default_data_dir(),
            max_attempts: default_fetch_attempts(),
            retry_delay_secs: default_fetch_retry_delay_secs(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cadence_minutes: default_cadence_minutes(),
            minute_offset: default_minute_offset(),
            utc_offset_hours: 0,
            session_open: default_session_open(),
            weekly_flatten: default_weekly_flatten(),
            heartbeat_minutes: default_heartbeat_minutes(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            directory: default_audit_dir(),
        }
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_balance: default_paper_balance(),
            spread: default_paper_spread(),
        }
    }
}
