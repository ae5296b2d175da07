//! In-memory paper venue.
//!
//! Fills every accepted market order at the request price, marks open
//! positions to the latest quote and triggers stop-loss / take-profit when a
//! quote update crosses them. Order tags are remembered so a replayed
//! submission returns the original result instead of opening a second
//! position.
//!
//! Failure injection (refused connects, unacknowledged or rejected
//! submissions, unreadable account) lets the engine's recovery paths run
//! without a live broker.

use super::order::{OrderIntent, OrderRequest};
use super::traits::TradingVenue;
use super::types::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Scripted outcome for the next submission, consumed in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedSubmit {
    /// Venue swallows the request (`Ok(None)`)
    NoResponse,
    /// Venue answers with this non-success status
    Reject(OrderStatus),
    /// Transport failure (`Err`)
    TransportError,
}

#[derive(Debug)]
struct PaperState {
    balance: Decimal,
    quotes: HashMap<String, Quote>,
    books: HashMap<String, OrderBook>,
    positions: Vec<Position>,
    results_by_tag: HashMap<String, OrderResult>,
    connected: bool,
    connect_failures: u32,
    script: VecDeque<ScriptedSubmit>,
    account_unavailable: bool,
    account_override: Option<AccountSnapshot>,
    submissions: Vec<OrderRequest>,
}

/// Paper trading venue.
pub struct PaperVenue {
    state: Arc<RwLock<PaperState>>,
    ticket_counter: AtomicU64,
}

impl PaperVenue {
    /// Create a connected venue holding `initial_balance` and no positions.
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            state: Arc::new(RwLock::new(PaperState {
                balance: initial_balance,
                quotes: HashMap::new(),
                books: HashMap::new(),
                positions: Vec::new(),
                results_by_tag: HashMap::new(),
                connected: true,
                connect_failures: 0,
                script: VecDeque::new(),
                account_unavailable: false,
                account_override: None,
                submissions: Vec::new(),
            })),
            ticket_counter: AtomicU64::new(1),
        }
    }

    /// Update the quote for `symbol`, closing any position whose SL or TP it crosses.
    pub async fn set_quote(&self, symbol: &str, quote: Quote) {
        let mut state = self.state.write().await;
        state.quotes.insert(symbol.to_string(), quote);

        let mut realized = Decimal::ZERO;
        state.positions.retain(|position| {
            if position.symbol != symbol {
                return true;
            }
            match protective_exit(position, &quote) {
                Some(exit_price) => {
                    let pnl = position_pnl(position, exit_price);
                    info!(
                        ticket = position.ticket,
                        %symbol,
                        exit_price,
                        pnl = %pnl,
                        "Protective level hit, position closed"
                    );
                    realized += pnl;
                    false
                }
                None => true,
            }
        });
        state.balance += realized;
    }

    /// Quote `symbol` around the close of `bar`: bid at the close, ask `spread` above.
    pub async fn mark_from_bar(&self, symbol: &str, bar: &Bar, spread: f64) {
        self.set_quote(
            symbol,
            Quote {
                bid: bar.close,
                ask: bar.close + spread,
            },
        )
        .await;
    }

    /// Publish (or withdraw, with `None`) a depth snapshot for `symbol`.
    pub async fn set_order_book(&self, symbol: &str, book: Option<OrderBook>) {
        let mut state = self.state.write().await;
        match book {
            Some(book) => {
                state.books.insert(symbol.to_string(), book);
            }
            None => {
                state.books.remove(symbol);
            }
        }
    }

    pub async fn set_connected(&self, connected: bool) {
        self.state.write().await.connected = connected;
    }

    /// Make the next `count` calls to `connect` fail.
    pub async fn fail_next_connects(&self, count: u32) {
        self.state.write().await.connect_failures = count;
    }

    /// Queue outcomes for upcoming submissions. Unscripted submissions fill normally.
    pub async fn script_submissions(&self, outcomes: impl IntoIterator<Item = ScriptedSubmit>) {
        self.state.write().await.script.extend(outcomes);
    }

    pub async fn set_account_unavailable(&self, unavailable: bool) {
        self.state.write().await.account_unavailable = unavailable;
    }

    /// Report a fixed snapshot from `get_account` instead of the marked one.
    pub async fn override_account(&self, snapshot: Option<AccountSnapshot>) {
        self.state.write().await.account_override = snapshot;
    }

    /// Every request passed to `submit_order`, in order.
    pub async fn submissions(&self) -> Vec<OrderRequest> {
        self.state.read().await.submissions.clone()
    }

    pub async fn balance(&self) -> Decimal {
        self.state.read().await.balance
    }

    fn next_ticket(&self) -> u64 {
        self.ticket_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn fill(&self, state: &mut PaperState, order: &OrderRequest) -> OrderResult {
        match order.intent() {
            OrderIntent::Open {
                stop_loss,
                take_profit,
            } => {
                let ticket = self.next_ticket();
                state.positions.push(Position {
                    ticket,
                    symbol: order.symbol().to_string(),
                    side: order.side(),
                    volume: order.volume(),
                    open_price: order.price(),
                    stop_loss: Some(stop_loss),
                    take_profit: Some(take_profit),
                });
                info!(
                    ticket,
                    symbol = %order.symbol(),
                    side = %order.side(),
                    volume = %order.volume(),
                    price = order.price(),
                    "Paper position opened"
                );
                done(ticket, order.price())
            }
            OrderIntent::Close { ticket } => {
                let Some(index) = state.positions.iter().position(|p| p.ticket == ticket) else {
                    return OrderResult {
                        status: OrderStatus::Rejected,
                        comment: format!("position {ticket} not found"),
                        ticket: Some(ticket),
                        price: None,
                    };
                };
                let position = state.positions.remove(index);
                let pnl = position_pnl(&position, order.price());
                state.balance += pnl;
                info!(
                    ticket,
                    symbol = %position.symbol,
                    price = order.price(),
                    pnl = %pnl,
                    "Paper position closed"
                );
                done(ticket, order.price())
            }
        }
    }
}

fn done(ticket: u64, price: f64) -> OrderResult {
    OrderResult {
        status: OrderStatus::Done,
        comment: "filled".to_string(),
        ticket: Some(ticket),
        price: Some(price),
    }
}

/// Price at which the quote takes out a protective level, if it does.
fn protective_exit(position: &Position, quote: &Quote) -> Option<f64> {
    match position.side {
        OrderSide::Buy => {
            let bid = quote.bid;
            match (position.stop_loss, position.take_profit) {
                (Some(sl), _) if bid <= sl => Some(sl),
                (_, Some(tp)) if bid >= tp => Some(tp),
                _ => None,
            }
        }
        OrderSide::Sell => {
            let ask = quote.ask;
            match (position.stop_loss, position.take_profit) {
                (Some(sl), _) if ask >= sl => Some(sl),
                (_, Some(tp)) if ask <= tp => Some(tp),
                _ => None,
            }
        }
    }
}

/// Profit of `position` if it exited at `price`, in account currency.
fn position_pnl(position: &Position, price: f64) -> Decimal {
    let lots = position.volume.to_f64().unwrap_or(0.0);
    let direction = if position.is_long() { 1.0 } else { -1.0 };
    let pnl = (price - position.open_price) * direction * lots * CONTRACT_SIZE;
    Decimal::from_f64(pnl).unwrap_or(Decimal::ZERO).round_dp(2)
}

#[async_trait]
impl TradingVenue for PaperVenue {
    async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }

    async fn connect(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            state.connected = false;
            return Err(anyhow!("paper venue refused connection"));
        }
        state.connected = true;
        debug!("Paper venue connected");
        Ok(())
    }

    async fn get_account(&self) -> Result<AccountSnapshot> {
        let state = self.state.read().await;
        if state.account_unavailable {
            return Err(anyhow!("account information unavailable"));
        }
        if let Some(snapshot) = state.account_override {
            return Ok(snapshot);
        }

        let unrealized: Decimal = state
            .positions
            .iter()
            .map(|position| {
                let mark = state
                    .quotes
                    .get(&position.symbol)
                    .map(|q| if position.is_long() { q.bid } else { q.ask })
                    .unwrap_or(position.open_price);
                position_pnl(position, mark)
            })
            .sum();

        Ok(AccountSnapshot {
            balance: state.balance,
            equity: state.balance + unrealized,
        })
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        self.state
            .read()
            .await
            .quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow!("no quote for {}", symbol))
    }

    async fn get_order_book(&self, symbol: &str) -> Result<Option<OrderBook>> {
        Ok(self.state.read().await.books.get(symbol).cloned())
    }

    async fn get_positions(&self, symbol: Option<&str>) -> Result<Vec<Position>> {
        let state = self.state.read().await;
        Ok(state
            .positions
            .iter()
            .filter(|p| symbol.map_or(true, |s| p.symbol == s))
            .cloned()
            .collect())
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<Option<OrderResult>> {
        let mut state = self.state.write().await;
        state.submissions.push(order.clone());

        if !state.connected {
            return Err(anyhow!("paper venue not connected"));
        }

        match state.script.pop_front() {
            Some(ScriptedSubmit::NoResponse) => {
                warn!(tag = %order.tag(), "Scripted: submission not acknowledged");
                return Ok(None);
            }
            Some(ScriptedSubmit::Reject(status)) => {
                warn!(tag = %order.tag(), ?status, "Scripted: submission rejected");
                return Ok(Some(OrderResult {
                    status,
                    comment: "scripted rejection".to_string(),
                    ticket: None,
                    price: None,
                }));
            }
            Some(ScriptedSubmit::TransportError) => {
                return Err(anyhow!("scripted transport failure"));
            }
            None => {}
        }

        if let Some(previous) = state.results_by_tag.get(order.tag()) {
            debug!(tag = %order.tag(), "Duplicate tag, returning original result");
            return Ok(Some(previous.clone()));
        }

        let result = self.fill(&mut state, order);
        if result.is_success() {
            state
                .results_by_tag
                .insert(order.tag().to_string(), result.clone());
        }
        Ok(Some(result))
    }
}
