//! FX Signal Trader - Main Entry Point
//!
//! Runs the trading engine against the paper venue, fed from CSV bar files.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fx_signal_trader::audit::AuditLog;
use fx_signal_trader::config::Config;
use fx_signal_trader::engine::{CycleReport, CycleStatus, EntryResult, TradingEngine};
use fx_signal_trader::exchange::{CsvBarFeed, MarketDataFeed, PaperVenue};
use fx_signal_trader::schedule::TradingCalendar;
use fx_signal_trader::utils::{Clock, ManualClock, SystemClock};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// FX Signal Trader CLI
#[derive(Parser)]
#[command(name = "fx-signal-trader")]
#[command(version, about = "Scheduled RSI/Bollinger/VWAP FX trading controller")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config", global = true)]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trade on the configured schedule until Ctrl-C (default)
    Run,

    /// Run a single trading cycle and exit
    Once {
        /// Evaluate as of this time (RFC 3339), e.g. to replay CSV data
        #[arg(long)]
        at: Option<String>,
    },

    /// Validate the configuration and print it
    CheckConfig,
}

/// Paper venue and CSV feed the engine trades against.
struct PaperSetup {
    venue: Arc<PaperVenue>,
    feed: Arc<CsvBarFeed>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load_from(&cli.config)?;
    config.validate().context("Invalid configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckConfig => {
            log_config(&config);
            info!("✅ Configuration is valid");
            Ok(())
        }
        Commands::Once { at } => {
            let clock: Arc<dyn Clock> = match at {
                Some(at) => {
                    let at = DateTime::parse_from_rfc3339(&at)
                        .with_context(|| format!("Invalid --at timestamp '{at}'"))?;
                    Arc::new(ManualClock::new(at.with_timezone(&Utc)))
                }
                None => Arc::new(SystemClock),
            };
            let (mut engine, paper) = build_engine(config, clock.clone())?;
            start(&engine).await?;

            mark_quotes(&engine, &paper, clock.now()).await;
            let report = engine.run_cycle().await;
            log_report(&report);
            Ok(())
        }
        Commands::Run => {
            log_config(&config);
            let calendar = TradingCalendar::from_config(&config.schedule)?;
            let (mut engine, paper) = build_engine(config, Arc::new(SystemClock))?;
            start(&engine).await?;
            run_schedule(&mut engine, &paper, &calendar).await;
            Ok(())
        }
    }
}

fn build_engine(config: Config, clock: Arc<dyn Clock>) -> Result<(TradingEngine, PaperSetup)> {
    let audit = AuditLog::from_config(&config.audit)?;
    let paper = PaperSetup {
        venue: Arc::new(PaperVenue::new(config.paper.initial_balance)),
        feed: Arc::new(CsvBarFeed::new(&config.data.data_dir, config.data.timeframe)),
    };

    info!(
        balance = %config.paper.initial_balance,
        data_dir = %config.data.data_dir,
        timeframe = %paper.feed.timeframe(),
        "📝 Paper venue with CSV bar feed"
    );

    let engine = TradingEngine::new(
        config,
        paper.feed.clone(),
        paper.venue.clone(),
        clock,
        audit,
    );
    Ok((engine, paper))
}

/// Connect to the venue; failure ends the process with a non-zero status.
async fn start(engine: &TradingEngine) -> Result<()> {
    if let Err(e) = engine.initialize().await {
        error!(critical = true, error = %e, "❌ [INIT] Could not connect to venue");
        return Err(e.into());
    }
    info!("✅ [INIT] Venue connected");
    Ok(())
}

/// Quote every symbol from its latest CSV bar so the paper venue prices
/// entries, exits and equity like the data the engine just read.
async fn mark_quotes(engine: &TradingEngine, paper: &PaperSetup, now: DateTime<Utc>) {
    let config = engine.config();
    let timeframe = config.data.timeframe;
    let from = now - timeframe.span(config.data.window_bars);

    for symbol in &config.symbols {
        match paper.feed.get_bars(&symbol.symbol, timeframe, from, now).await {
            Ok(bars) => match bars.last() {
                Some(bar) => {
                    paper
                        .venue
                        .mark_from_bar(&symbol.symbol, bar, config.paper.spread)
                        .await
                }
                None => debug!(symbol = %symbol.symbol, "No bar to quote from"),
            },
            Err(e) => warn!(symbol = %symbol.symbol, error = %e, "Could not read bars for quote"),
        }
    }
}

/// Main scheduling loop: cycles on the cadence while the session is open,
/// weekly flatten at session end, heartbeat in between.
async fn run_schedule(engine: &mut TradingEngine, paper: &PaperSetup, calendar: &TradingCalendar) {
    let mut shutdown = Box::pin(tokio::signal::ctrl_c());
    let mut heartbeat = tokio::time::interval(calendar.heartbeat_interval());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("🚀 Starting trading schedule...");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut next_tick = calendar.next_tick(Utc::now());
    let mut next_flatten = calendar.next_flatten(Utc::now());

    loop {
        let wake = next_tick.min(next_flatten);
        let wait = (wake - Utc::now()).to_std().unwrap_or_default();
        debug!(%wake, "Waiting for next event");

        tokio::select! {
            _ = &mut shutdown => {
                info!("🛑 Shutdown signal received");
                break;
            }
            _ = heartbeat.tick() => {
                if let Err(e) = engine.check_connection().await {
                    warn!(error = %e, "💓 [HEARTBEAT] Venue unreachable");
                }
            }
            _ = tokio::time::sleep(wait) => {
                if wake == next_flatten {
                    info!("📅 [WEEKLY] Session end, flattening all positions");
                    if let Err(e) = engine.flatten_all().await {
                        error!(critical = true, error = %e, "Weekly flatten failed");
                    }
                    next_flatten = calendar.next_flatten(wake);
                }
                if wake == next_tick {
                    if calendar.is_open(wake) {
                        mark_quotes(engine, paper, wake).await;
                        let report = engine.run_cycle().await;
                        log_report(&report);
                    } else {
                        debug!(%wake, "Market closed, cycle skipped");
                    }
                    next_tick = calendar.next_tick(Utc::now().max(wake));
                }
            }
        }
    }

    info!("👋 Trader stopped");
}

fn log_report(report: &CycleReport) {
    match report.status {
        CycleStatus::Completed => {
            for outcome in &report.symbols {
                let entry = match &outcome.entry {
                    EntryResult::NoSignal => "no signal".to_string(),
                    EntryResult::Opened { ticket, lots } => format!("opened {lots} lots (ticket {ticket:?})"),
                    EntryResult::SpreadTooWide => "spread too wide".to_string(),
                    EntryResult::SizingFailed(reason) => format!("sizing failed: {reason}"),
                    EntryResult::Failed(reason) => format!("entry failed: {reason}"),
                };
                info!(
                    "   {} | signal: {} | {} | closed: {} {}",
                    outcome.symbol,
                    outcome.signal,
                    entry,
                    outcome.closed.len(),
                    outcome.error.as_deref().map(|e| format!("| ⚠️  {e}")).unwrap_or_default()
                );
            }
            info!(
                "📊 [CYCLE] {} symbols, {} opened, {} errors",
                report.symbols.len(),
                report.orders_opened(),
                report.errors()
            );
        }
        CycleStatus::GuardTripped | CycleStatus::Halted => {
            let closed = report.flattened.as_ref().map_or(0, |r| r.closed.len());
            warn!("🚨 [RISK] {:?}: trading halted, {} positions closed", report.status, closed);
        }
        status => warn!("⚠️  [CYCLE] Skipped: {:?}", status),
    }
}

/// Initialize logging with tracing.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::daily("logs", "fx-signal-trader.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer flushing for the life of the process
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("fx_signal_trader=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!("   Max Daily Loss: {}%", config.risk.max_daily_loss_pct);
    info!(
        "   Order Retries: {} attempts, {} ms apart",
        config.execution.max_attempts, config.execution.retry_delay_ms
    );
    info!("   Magic: {}", config.execution.magic);
    info!(
        "   Bars: {} x {}",
        config.data.window_bars, config.data.timeframe
    );
    info!(
        "   Session: {} → {} (UTC{:+})",
        config.schedule.session_open, config.schedule.weekly_flatten, config.schedule.utc_offset_hours
    );
    info!(
        "   Cadence: every {} min at +{}",
        config.schedule.cadence_minutes, config.schedule.minute_offset
    );
    for symbol in &config.symbols {
        info!(
            "   {} | {:?} | risk {:.2}% | SL {}×ATR | TP/SL {} | max spread {}",
            symbol.symbol,
            symbol.strategy,
            symbol.risk_perc * 100.0,
            symbol.sl_atr_coef,
            symbol.tp_sl_ratio,
            symbol.max_spread
        );
    }
}
