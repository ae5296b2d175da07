//! Trading cycle orchestration.
//!
//! One [`TradingEngine::run_cycle`] call is one scheduled job:
//!
//! 1. Make sure the venue is reachable
//! 2. Read the account and run the daily-loss guard
//! 3. If the guard blocks trading, flatten everything and stop
//! 4. Otherwise, per symbol: fetch bars → indicators → signal → size →
//!    entry → RSI exit
//!
//! Failures inside a symbol are logged, written to the audit trail and do
//! not affect the other symbols.

mod report;

pub use report::{CycleReport, CycleStatus, EntryResult, SymbolOutcome};

use crate::audit::AuditLog;
use crate::config::{Config, StrategyConfig};
use crate::error::TradingError;
use crate::exchange::{Bar, ConnectionSupervisor, MarketDataFeed, TradingVenue};
use crate::execution::{CloseReport, EntryOutcome, OrderExecutor, PositionManager};
use crate::indicators::{self, IndicatorParams};
use crate::risk::{GuardVerdict, PositionSizer, RiskGuard};
use crate::strategy::{strategy_for, Strategy};
use crate::utils::{Clock, RetryPolicy};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct TradingEngine {
    config: Config,
    feed: Arc<dyn MarketDataFeed>,
    venue: Arc<dyn TradingVenue>,
    executor: Arc<OrderExecutor>,
    positions: PositionManager,
    connection: ConnectionSupervisor,
    guard: RiskGuard,
    strategies: Vec<(StrategyConfig, Box<dyn Strategy>)>,
    data_retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    audit: AuditLog,
}

impl TradingEngine {
    /// Wire every component from `config`.
    pub fn new(
        config: Config,
        feed: Arc<dyn MarketDataFeed>,
        venue: Arc<dyn TradingVenue>,
        clock: Arc<dyn Clock>,
        audit: AuditLog,
    ) -> Self {
        let connection = ConnectionSupervisor::new(config.connection.retry_policy());
        let executor = Arc::new(OrderExecutor::from_config(
            &config.execution,
            connection.clone(),
            clock.clone(),
            audit.clone(),
        ));
        let strategies = config
            .symbols
            .iter()
            .map(|symbol| (symbol.clone(), strategy_for(symbol)))
            .collect();

        Self {
            positions: PositionManager::new(executor.clone()),
            guard: RiskGuard::new(config.risk.max_daily_loss_pct),
            data_retry: config.data.retry_policy(),
            config,
            feed,
            venue,
            executor,
            connection,
            strategies,
            clock,
            audit,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn risk_guard(&self) -> &RiskGuard {
        &self.guard
    }

    /// Open the first venue session. An error here should end the process.
    pub async fn initialize(&self) -> Result<(), TradingError> {
        self.connection
            .initialize(self.venue.as_ref(), self.clock.as_ref())
            .await?;
        for (config, strategy) in &self.strategies {
            info!(
                symbol = %config.symbol,
                strategy = strategy.name(),
                risk_perc = config.risk_perc,
                max_spread = config.max_spread,
                "Symbol configured"
            );
        }
        Ok(())
    }

    /// Heartbeat: reconnect if the venue dropped between cycles.
    pub async fn check_connection(&self) -> Result<(), TradingError> {
        self.connection
            .ensure_connected(self.venue.as_ref(), self.clock.as_ref())
            .await
    }

    /// Close every open position (weekly flatten, guard trip, manual command).
    pub async fn flatten_all(&self) -> Result<CloseReport, TradingError> {
        self.check_connection().await?;
        let report = self.positions.flatten_all(self.venue.as_ref()).await?;
        info!(
            closed = report.closed.len(),
            failed = report.failed.len(),
            "Flatten-all finished"
        );
        Ok(report)
    }

    /// Run one scheduled trading cycle.
    #[instrument(skip(self), name = "cycle")]
    pub async fn run_cycle(&mut self) -> CycleReport {
        let now = self.clock.now();
        info!(%now, symbols = self.strategies.len(), "Trading cycle started");

        if let Err(e) = self.check_connection().await {
            self.audit.record_error(now, &format!("cycle skipped: {e}"));
            return CycleReport::new(now, CycleStatus::ConnectivityLost);
        }

        let account = match self.venue.get_account().await {
            Ok(account) => account,
            Err(e) => {
                warn!(error = %e, "Account snapshot unavailable, skipping cycle");
                self.audit
                    .record_error(now, &format!("account unavailable: {e}"));
                return CycleReport::new(now, CycleStatus::AccountUnavailable);
            }
        };
        debug!(balance = %account.balance, equity = %account.equity, "Account snapshot");

        let verdict = self.guard.evaluate(&account, now);
        if !verdict.allows_trading() {
            let status = match verdict {
                GuardVerdict::Trip => CycleStatus::GuardTripped,
                _ => CycleStatus::Halted,
            };
            if verdict == GuardVerdict::Trip {
                self.audit.record_error(
                    now,
                    &format!(
                        "daily loss limit reached: balance {} equity {}",
                        account.balance, account.equity
                    ),
                );
            }

            let mut report = CycleReport::new(now, status);
            match self.positions.flatten_all(self.venue.as_ref()).await {
                Ok(closed) => report.flattened = Some(closed),
                Err(e) => {
                    error!(critical = true, error = %e, "Flatten-all failed");
                    self.audit.record_error(now, &format!("flatten-all failed: {e}"));
                }
            }
            return report;
        }

        let mut report = CycleReport::new(now, CycleStatus::Completed);
        for (config, strategy) in &self.strategies {
            let outcome = self
                .process_symbol(config, strategy.as_ref(), account.equity)
                .await;
            report.symbols.push(outcome);
        }

        info!(
            opened = report.orders_opened(),
            errors = report.errors(),
            "Trading cycle finished"
        );
        report
    }

    #[instrument(skip_all, name = "symbol", fields(symbol = %config.symbol))]
    async fn process_symbol(
        &self,
        config: &StrategyConfig,
        strategy: &dyn Strategy,
        equity: Decimal,
    ) -> SymbolOutcome {
        let mut outcome = SymbolOutcome::new(&config.symbol);
        if let Err(e) = self.trade_symbol(config, strategy, equity, &mut outcome).await {
            warn!(symbol = %config.symbol, error = %e, "Symbol processing failed");
            self.audit
                .record_error(self.clock.now(), &format!("{}: {e}", config.symbol));
            outcome.error = Some(e.to_string());
        }
        outcome
    }

    async fn trade_symbol(
        &self,
        config: &StrategyConfig,
        strategy: &dyn Strategy,
        equity: Decimal,
        outcome: &mut SymbolOutcome,
    ) -> Result<(), TradingError> {
        let symbol = config.symbol.as_str();
        let venue = self.venue.as_ref();

        self.check_connection().await?;

        let bars = self.fetch_bars(symbol).await?;
        check_bars(symbol, &bars)?;

        let series = indicators::compute(&bars, &IndicatorParams::from(config));
        let Some(last) = series.last().copied() else {
            return Err(TradingError::data_quality(
                symbol,
                format!("{} bars are not enough to define every indicator", bars.len()),
            ));
        };
        self.audit.record_bar(symbol, &last);

        let signal = strategy.evaluate(&series);
        outcome.signal = signal;
        debug!(
            %symbol,
            strategy = strategy.name(),
            %signal,
            close = last.close,
            rsi = last.rsi,
            atr = last.atr,
            "Signal evaluated"
        );

        let mut opened = Vec::new();
        if let Some(side) = signal.side() {
            let book = match venue.get_order_book(symbol).await {
                Ok(book) => book,
                Err(e) => {
                    debug!(%symbol, error = %e, "No order book for sizing");
                    None
                }
            };

            outcome.entry = match PositionSizer::size(
                config,
                last.atr,
                last.close,
                equity,
                side,
                book.as_ref(),
            ) {
                Err(e) => {
                    warn!(%symbol, error = %e, "Sizing failed, no entry");
                    self.audit
                        .record_error(self.clock.now(), &format!("{symbol}: {e}"));
                    EntryResult::SizingFailed(e.to_string())
                }
                Ok(sizing) => {
                    self.audit.record_size(symbol, self.clock.now(), &sizing);
                    match self
                        .executor
                        .open_position(venue, config, side, &sizing, last.timestamp)
                        .await
                    {
                        Ok(EntryOutcome::Filled(result)) => {
                            opened.extend(result.ticket);
                            EntryResult::Opened {
                                ticket: result.ticket,
                                lots: sizing.lots,
                            }
                        }
                        Ok(EntryOutcome::SpreadTooWide { .. }) => EntryResult::SpreadTooWide,
                        Err(e) => EntryResult::Failed(e.to_string()),
                    }
                }
            };
        }

        let closes = self
            .positions
            .close_on_rsi(venue, config, last.rsi, &opened)
            .await?;
        outcome.closed = closes.closed;
        Ok(())
    }

    /// Latest `window_bars` bars, retrying empty or failed fetches.
    #[instrument(skip(self), level = "debug")]
    async fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, TradingError> {
        let data = &self.config.data;
        let max_attempts = self.data_retry.max_attempts;
        let mut last_reason = String::from("not attempted");

        for attempt in 1..=max_attempts {
            let to = self.clock.now();
            let from = to - data.timeframe.span(data.window_bars);
            match self.feed.get_bars(symbol, data.timeframe, from, to).await {
                Ok(mut bars) => {
                    drop_forming(symbol, &mut bars, data.timeframe.span(1), to);
                    if !bars.is_empty() {
                        let excess = bars.len().saturating_sub(data.window_bars);
                        return Ok(bars.split_off(excess));
                    }
                    last_reason = "no bars returned".to_string();
                }
                Err(e) => last_reason = e.to_string(),
            }

            warn!(%symbol, attempt, max_attempts, reason = %last_reason, "Bar fetch failed");
            if self.data_retry.has_next(attempt) {
                self.clock.sleep(self.data_retry.delay).await;
            }
        }

        Err(TradingError::data_quality(
            symbol,
            format!("bar fetch failed after {max_attempts} attempts: {last_reason}"),
        ))
    }
}

/// Drop trailing bars whose interval has not closed by `now`.
fn drop_forming(symbol: &str, bars: &mut Vec<Bar>, bar_span: Duration, now: DateTime<Utc>) {
    let forming = bars
        .iter()
        .rev()
        .take_while(|b| b.timestamp + bar_span > now)
        .count();
    if forming > 0 {
        debug!(%symbol, forming, "Ignoring bars that are still forming");
        bars.truncate(bars.len() - forming);
    }
}

/// Bars must be finite and strictly increasing in time.
fn check_bars(symbol: &str, bars: &[Bar]) -> Result<(), TradingError> {
    if let Some(bad) = bars
        .iter()
        .find(|b| ![b.open, b.high, b.low, b.close].iter().all(|v| v.is_finite()))
    {
        return Err(TradingError::data_quality(
            symbol,
            format!("non-finite price in bar at {}", bad.timestamp),
        ));
    }
    if let Some(pair) = bars.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
        return Err(TradingError::data_quality(
            symbol,
            format!(
                "bars out of order: {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            ),
        ));
    }
    Ok(())
}
