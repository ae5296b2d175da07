//! End-to-end trading cycles against the paper venue.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use fx_signal_trader::audit::AuditLog;
use fx_signal_trader::config::{Config, StrategyConfig, StrategyKind};
use fx_signal_trader::engine::{CycleStatus, EntryResult, TradingEngine};
use fx_signal_trader::exchange::{
    AccountSnapshot, Bar, BookLevel, BookSide, MarketDataFeed, OrderBook, OrderSide, PaperVenue,
    Quote, ScriptedSubmit, Timeframe, TradingVenue,
};
use fx_signal_trader::indicators::{self, IndicatorParams};
use fx_signal_trader::strategy::Signal;
use fx_signal_trader::utils::ManualClock;
use rust_decimal_macros::dec;
use std::sync::Arc;

// ===== Helper functions =====

/// Feed that returns the same bars for every request.
struct FixedFeed {
    bars: Vec<Bar>,
}

#[async_trait]
impl MarketDataFeed for FixedFeed {
    async fn get_bars(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Bar>> {
        Ok(self.bars.clone())
    }
}

/// Five-minute bars from midnight, each opening at the previous close.
fn bars_from(closes: &[f64], volume: impl Fn(usize) -> f64) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 0.0005,
                low: open.min(close) - 0.0005,
                close,
                volume: volume(i),
            }
        })
        .collect()
}

/// A steady climb, a pause, then one bar closing through the lower band
/// while RSI momentum is still bullish.
fn buy_setup_bars() -> Vec<Bar> {
    let mut closes: Vec<f64> = (0..130).map(|i| 1.1 + 0.001 * i as f64).collect();
    let top = closes[129];
    closes.extend(std::iter::repeat(top).take(19));
    closes.push(top - 0.001);
    bars_from(&closes, |_| 100.0)
}

/// The buy setup upside down: a steady fall, a pause, then one bar closing
/// through the upper band while RSI momentum is still bearish.
fn sell_setup_bars() -> Vec<Bar> {
    let mut closes: Vec<f64> = (0..130).map(|i| 1.3 - 0.001 * i as f64).collect();
    let bottom = closes[129];
    closes.extend(std::iter::repeat(bottom).take(19));
    closes.push(bottom + 0.001);
    bars_from(&closes, |_| 100.0)
}

/// Heavy trading around 1.05 anchors VWAP low; thin trading around 1.10
/// keeps every recent body above it until a sharp drop to 1.09.
fn vwap_pullback_bars() -> Vec<Bar> {
    let mut closes: Vec<f64> = (0..110)
        .map(|i| if i % 2 == 1 { 1.0503 } else { 1.05 })
        .collect();
    closes.extend((0..39).map(|i| if i % 2 == 1 { 1.1002 } else { 1.10 }));
    closes.push(1.09);
    bars_from(&closes, |i| if i < 110 { 1000.0 } else { 10.0 })
}

fn config() -> Config {
    let mut config = Config::default();
    config.symbols = vec![StrategyConfig::new("EURUSD", StrategyKind::RsiBollinger)];
    config.execution.rng_seed = Some(11);
    config.execution.retry_delay_ms = 0;
    config.connection.retry_delay_secs = 0;
    config.data.retry_delay_secs = 0;
    config
}

fn vwap_config() -> Config {
    let mut config = config();
    config.symbols = vec![StrategyConfig::new("AUDNZD", StrategyKind::VwapBollinger)];
    config
}

struct Harness {
    engine: TradingEngine,
    venue: Arc<PaperVenue>,
    audit_dir: tempfile::TempDir,
}

async fn harness(quote: Quote) -> Harness {
    harness_with(config(), buy_setup_bars(), quote).await
}

async fn harness_with(config: Config, bars: Vec<Bar>, quote: Quote) -> Harness {
    let audit_dir = tempfile::tempdir().unwrap();
    let venue = Arc::new(PaperVenue::new(dec!(10000)));
    venue.set_quote(&config.symbols[0].symbol, quote).await;

    let engine = TradingEngine::new(
        config,
        Arc::new(FixedFeed { bars }),
        venue.clone(),
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 6, 12, 31, 0).unwrap(),
        )),
        AuditLog::new(audit_dir.path()).unwrap(),
    );

    Harness {
        engine,
        venue,
        audit_dir,
    }
}

fn normal_quote() -> Quote {
    Quote {
        bid: 1.2280,
        ask: 1.2281,
    }
}

// ===== Tests =====

#[tokio::test]
async fn buy_signal_places_one_protected_long() {
    let mut h = harness(normal_quote()).await;

    let report = h.engine.run_cycle().await;

    assert_eq!(report.status, CycleStatus::Completed);
    assert_eq!(report.orders_opened(), 1);

    let sent = h.venue.submissions().await;
    assert_eq!(sent.len(), 1);
    let order = &sent[0];
    assert_eq!(order.side(), OrderSide::Buy);
    assert_eq!(order.magic(), 234000);
    assert_eq!(order.volume(), dec!(0.10));

    let atr = indicators::compute(
        &buy_setup_bars(),
        &IndicatorParams::from(&config().symbols[0]),
    )
    .last()
    .unwrap()
    .atr;
    let spread = normal_quote().ask - normal_quote().bid;
    let entry = order.price();
    let stop_loss = order.stop_loss().unwrap();
    let take_profit = order.take_profit().unwrap();

    assert!(stop_loss < entry);
    assert!((entry - stop_loss - (atr + spread)).abs() < 1e-9);
    assert!((take_profit - entry - (atr * 1.5 + spread)).abs() < 1e-9);
}

#[tokio::test]
async fn sell_signal_places_one_protected_short_on_the_bid() {
    let quote = Quote {
        bid: 1.1720,
        ask: 1.1721,
    };
    let mut h = harness_with(config(), sell_setup_bars(), quote).await;
    h.venue
        .set_order_book(
            "EURUSD",
            Some(OrderBook::new(vec![
                BookLevel { side: BookSide::Bid, price: 1.1719, volume: dec!(0.03) },
                BookLevel { side: BookSide::Bid, price: 1.1718, volume: dec!(0.01) },
                BookLevel { side: BookSide::Ask, price: 1.1722, volume: dec!(5) },
            ])),
        )
        .await;

    let report = h.engine.run_cycle().await;

    let outcome = report.outcome("EURUSD").unwrap();
    assert_eq!(outcome.signal, Signal::Sell);
    assert!(outcome.opened());

    let sent = h.venue.submissions().await;
    assert_eq!(sent.len(), 1);
    let order = &sent[0];
    assert_eq!(order.side(), OrderSide::Sell);
    // Risk alone sizes 0.10 lots; the bids only hold 0.04
    assert_eq!(order.volume(), dec!(0.04));
    assert_eq!(order.price(), 1.1719);

    let atr = indicators::compute(
        &sell_setup_bars(),
        &IndicatorParams::from(&config().symbols[0]),
    )
    .last()
    .unwrap()
    .atr;
    let spread = quote.ask - quote.bid;
    let entry = order.price();
    let stop_loss = order.stop_loss().unwrap();
    let take_profit = order.take_profit().unwrap();

    assert!(stop_loss > entry);
    assert!(take_profit < entry);
    assert!((stop_loss - entry - (atr + spread)).abs() < 1e-9);
    assert!((entry - take_profit - (atr * 1.5 + spread)).abs() < 1e-9);

    let position = &h.venue.get_positions(Some("EURUSD")).await.unwrap()[0];
    assert_eq!(position.side, OrderSide::Sell);
}

#[tokio::test]
async fn vwap_symbol_buys_pullback_in_uptrend() {
    let quote = Quote {
        bid: 1.0900,
        ask: 1.0901,
    };
    let mut h = harness_with(vwap_config(), vwap_pullback_bars(), quote).await;

    let report = h.engine.run_cycle().await;

    assert_eq!(report.status, CycleStatus::Completed);
    let outcome = report.outcome("AUDNZD").unwrap();
    assert_eq!(outcome.signal, Signal::Buy);
    assert!(matches!(outcome.entry, EntryResult::Opened { lots, .. } if lots == dec!(0.04)));

    let sent = h.venue.submissions().await;
    assert_eq!(sent.len(), 1);
    let order = &sent[0];
    assert_eq!(order.symbol(), "AUDNZD");
    assert_eq!(order.side(), OrderSide::Buy);
    // No book: ask plus AUDNZD slippage of at most 2 pips
    assert!((order.price() - quote.ask).abs() <= 0.0002 + 1e-12);

    let last = *indicators::compute(
        &vwap_pullback_bars(),
        &IndicatorParams::from(&vwap_config().symbols[0]),
    )
    .last()
    .unwrap();
    assert!(last.vwap.unwrap() < last.close);
    assert!(last.close <= last.bb_lower);

    let spread = quote.ask - quote.bid;
    let entry = order.price();
    assert!((entry - order.stop_loss().unwrap() - (last.atr + spread)).abs() < 1e-9);
    assert!((order.take_profit().unwrap() - entry - (last.atr * 1.5 + spread)).abs() < 1e-9);
}

#[tokio::test]
async fn cycle_leaves_an_audit_trail() {
    let mut h = harness(normal_quote()).await;

    h.engine.run_cycle().await;

    let dir = h.audit_dir.path();
    for file in [
        "EURUSD_last_bar.txt",
        "EURUSD_bars.log",
        "EURUSD_size.log",
        "EURUSD_spread.log",
        "orders.log",
    ] {
        assert!(dir.join(file).exists(), "{file} missing");
    }
    let orders = std::fs::read_to_string(dir.join("orders.log")).unwrap();
    assert_eq!(orders.lines().count(), 1);
    assert!(orders.contains("EURUSD"));
}

#[tokio::test]
async fn wide_spread_sends_nothing() {
    let mut h = harness(Quote {
        bid: 1.2280,
        ask: 1.2290,
    })
    .await;

    let report = h.engine.run_cycle().await;

    let outcome = report.outcome("EURUSD").unwrap();
    assert_eq!(outcome.entry, EntryResult::SpreadTooWide);
    assert!(h.venue.submissions().await.is_empty());

    let spread_log = std::fs::read_to_string(h.audit_dir.path().join("EURUSD_spread.log")).unwrap();
    assert!(spread_log.trim_end().ends_with("false"));
}

#[tokio::test]
async fn unacknowledged_entry_gives_up_after_retries() {
    let mut h = harness(normal_quote()).await;
    h.venue
        .script_submissions([ScriptedSubmit::NoResponse; 3])
        .await;

    let report = h.engine.run_cycle().await;

    let outcome = report.outcome("EURUSD").unwrap();
    assert!(matches!(outcome.entry, EntryResult::Failed(_)));
    assert_eq!(h.venue.submissions().await.len(), 3);
    assert!(h.venue.get_positions(None).await.unwrap().is_empty());

    let errors = std::fs::read_to_string(h.audit_dir.path().join("errors.log")).unwrap();
    assert!(errors.contains("failed after 3 attempts"));
}

#[tokio::test]
async fn daily_loss_flattens_and_stops_trading() {
    let mut h = harness(normal_quote()).await;
    h.engine.run_cycle().await;
    assert_eq!(h.venue.get_positions(None).await.unwrap().len(), 1);

    h.venue
        .override_account(Some(AccountSnapshot {
            balance: dec!(10000),
            equity: dec!(9000),
        }))
        .await;
    let report = h.engine.run_cycle().await;

    assert_eq!(report.status, CycleStatus::GuardTripped);
    assert!(h.engine.risk_guard().is_tripped());
    assert!(h.venue.get_positions(None).await.unwrap().is_empty());

    // The buy setup is still there, but nothing new is opened
    h.venue.override_account(None).await;
    let submitted = h.venue.submissions().await.len();
    let report = h.engine.run_cycle().await;
    assert_eq!(report.status, CycleStatus::Halted);
    assert_eq!(h.venue.submissions().await.len(), submitted);
}
