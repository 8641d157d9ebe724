//! Live/paper session worker: the single place that ties a deployed
//! strategy to the matching engine, ledger, risk breaker, lifecycle state
//! machine, and event bus.
//!
//! One [`SessionWorker`] is the runtime counterpart of one
//! [`qtk_lifecycle::Session`] — deploying it, stepping it on market
//! events, and stopping it are the "runtime" half of the lifecycle guards
//! `qtk-lifecycle` only encodes the rules for.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use qtk_eventbus::{Event, EventBus, Topic};
use qtk_matching::{Fill as MatchingFill, MatchingEngine};
use qtk_portfolio::Ledger;
use qtk_risk::breaker::{BreachReason, RiskCircuitBreaker};
use qtk_strategy::{EventStrategy, MarketEvent, Signal};

use crate::equity::LedgerEquityView;
use crate::translate::{fill_to_ledger_fill, signal_to_order_request};

#[derive(Debug)]
pub enum RuntimeError {
    RiskBreach(BreachReason),
    Ledger(qtk_portfolio::LedgerError),
    Matching(qtk_matching::MatchingError),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::RiskBreach(reason) => write!(f, "risk breach: {reason}"),
            RuntimeError::Ledger(e) => write!(f, "ledger error: {e}"),
            RuntimeError::Matching(e) => write!(f, "matching error: {e:?}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Whether a session's fills are simulated in-process or, eventually,
/// placed against a live venue connector. Both modes run the same
/// strategy/matching/ledger/risk pipeline; only the price source and
/// (for `Live`) the eventual order-placement path differ.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Paper,
    Live,
}

/// Drives one deployed strategy through the matching engine, ledger, and
/// risk breaker, publishing session events onto `bus`.
pub struct SessionWorker<S: EventStrategy> {
    session_id: Uuid,
    mode: SessionMode,
    strategy: S,
    matching: MatchingEngine,
    ledger: Ledger,
    breaker: RiskCircuitBreaker,
    bus: EventBus,
    tick: u64,
    day_id: u32,
    last_realized_pnl_micros: i64,
    instruments: BTreeSet<String>,
}

impl<S: EventStrategy> SessionWorker<S> {
    pub fn new(
        session_id: Uuid,
        mode: SessionMode,
        strategy: S,
        matching: MatchingEngine,
        ledger: Ledger,
        breaker: RiskCircuitBreaker,
        bus: EventBus,
        day_id: u32,
    ) -> Self {
        Self {
            session_id,
            mode,
            strategy,
            matching,
            ledger,
            breaker,
            bus,
            tick: 0,
            day_id,
            last_realized_pnl_micros: 0,
            instruments: BTreeSet::new(),
        }
    }

    fn topic(&self) -> Topic {
        Topic::Live(self.session_id.to_string())
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn breaker(&self) -> &RiskCircuitBreaker {
        &self.breaker
    }

    /// Run the strategy's `on_start` hook and publish the session's opening
    /// state change. Does not itself transition `qtk_lifecycle` state — the
    /// caller confirms `Running` via `LifecycleEngine::confirm_running` once
    /// this returns.
    pub async fn start(&mut self, now: DateTime<Utc>) {
        let equity = LedgerEquityView::new(&self.ledger, &self.matching);
        self.strategy.on_start(&equity);
        self.publish_state_change("running", now).await;
    }

    /// Feed one market event through the pipeline: update the matching
    /// engine's price, apply any fills it produces to the ledger and
    /// breaker, run the matching strategy handler, and submit any
    /// resulting signal as a new order.
    pub async fn on_event(
        &mut self,
        event: MarketEvent,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchingFill>, RuntimeError> {
        self.tick += 1;
        let tick = self.tick;

        let mut fills = Vec::new();
        if let Some((symbol, price)) = reference_price(&event) {
            self.instruments.insert(symbol.clone());
            fills = self.matching.on_price(&symbol, price, tick);
            for fill in &fills {
                self.apply_fill(fill, now).await?;
            }
        }

        let signals = self.dispatch(&event);
        for signal in signals {
            self.handle_signal(&signal, tick).await?;
        }

        self.refresh_equity()?;
        Ok(fills)
    }

    fn dispatch(&mut self, event: &MarketEvent) -> Vec<Signal> {
        let equity = LedgerEquityView::new(&self.ledger, &self.matching);
        match event {
            MarketEvent::Bar { .. } => self.strategy.on_bar(event, &equity),
            MarketEvent::Trade { .. } => self.strategy.on_trade(event, &equity),
            MarketEvent::Orderbook { .. } => self.strategy.on_orderbook(event, &equity),
            MarketEvent::FundingRate { .. } => self.strategy.on_funding_rate(event, &equity),
        }
    }

    async fn handle_signal(&mut self, signal: &Signal, tick: u64) -> Result<(), RuntimeError> {
        self.instruments.insert(signal.symbol.clone());
        let Some(price) = self.matching.last_price(&signal.symbol) else {
            return Ok(());
        };

        let equity = LedgerEquityView::new(&self.ledger, &self.matching);
        let Some(req) = signal_to_order_request(signal, price, &equity) else {
            return Ok(());
        };

        self.breaker
            .check_order(req.qty)
            .map_err(RuntimeError::RiskBreach)?;

        let ids = self
            .matching
            .submit(req, tick)
            .map_err(RuntimeError::Matching)?;

        // A market order against a known reference price fills
        // immediately on submit; pick those fills up here since
        // `MatchingEngine::submit` does not return them directly.
        let fills: Vec<MatchingFill> = self
            .matching
            .filled_orders()
            .filter(|o| ids.contains(&o.id) && o.filled_tick == Some(tick))
            .map(|o| MatchingFill {
                order_id: o.id,
                instrument: o.instrument.clone(),
                side: o.side,
                qty: o.fill_qty,
                price: o.fill_price.unwrap_or(0.0),
                fee: o.fee,
                is_taker: true,
                tick,
            })
            .collect();

        for fill in &fills {
            self.apply_fill(fill, Utc::now()).await?;
        }

        Ok(())
    }

    async fn apply_fill(&mut self, fill: &MatchingFill, now: DateTime<Utc>) -> Result<(), RuntimeError> {
        let ledger_fill = fill_to_ledger_fill(fill);
        self.ledger.append_fill(ledger_fill).map_err(RuntimeError::Ledger)?;

        let realized = self.ledger.realized_pnl_micros();
        let pnl_delta = (realized - self.last_realized_pnl_micros) as f64 / qtk_portfolio::MICROS_SCALE as f64;
        self.last_realized_pnl_micros = realized;
        if pnl_delta != 0.0 {
            self.breaker
                .record_trade_pnl(pnl_delta, self.day_id)
                .map_err(RuntimeError::RiskBreach)?;
        }

        self.publish(
            "live.fill",
            json!({
                "instrument": fill.instrument,
                "qty": fill.qty,
                "price": fill.price,
                "fee": fill.fee,
            }),
            now,
        )
        .await;
        Ok(())
    }

    fn refresh_equity(&mut self) -> Result<(), RuntimeError> {
        let equity = LedgerEquityView::new(&self.ledger, &self.matching).total_equity();
        self.breaker
            .update_equity(equity, self.day_id)
            .map_err(RuntimeError::RiskBreach)
    }

    /// Called once when the lifecycle engine has moved this session to
    /// `Stopping`: drain open orders (cancel-all) and ask the strategy to
    /// flatten whatever it wants flattened, submitting those as reduce-only
    /// orders. Callers bound this with a timeout (5s, per the session
    /// drain convention) — this method itself does not time out.
    pub async fn stop(&mut self, now: DateTime<Utc>) -> Result<(), RuntimeError> {
        let open_ids: Vec<u64> = self
            .instruments
            .iter()
            .flat_map(|symbol| self.matching.open_orders(symbol))
            .map(|o| o.id)
            .collect();
        for id in open_ids {
            self.matching.cancel(id);
        }

        let equity = LedgerEquityView::new(&self.ledger, &self.matching);
        let signals = self.strategy.on_stop(&equity);
        let tick = self.tick;
        for signal in signals {
            self.handle_signal(&signal, tick).await?;
        }

        self.publish_state_change("stopped", now).await;
        Ok(())
    }

    async fn publish_state_change(&self, state: &str, now: DateTime<Utc>) {
        self.publish("live.state_change", json!({ "state": state }), now).await;
    }

    async fn publish(&self, kind: &str, payload: serde_json::Value, now: DateTime<Utc>) {
        self.bus.publish(&self.topic(), Event::new(kind, payload, now)).await;
    }
}

fn reference_price(event: &MarketEvent) -> Option<(String, f64)> {
    match event {
        MarketEvent::Bar { symbol, close, .. } => Some((symbol.clone(), *close)),
        MarketEvent::Trade { symbol, price, .. } => Some((symbol.clone(), *price)),
        MarketEvent::Orderbook {
            symbol,
            best_bid,
            best_ask,
            ..
        } => Some((symbol.clone(), (best_bid + best_ask) / 2.0)),
        MarketEvent::FundingRate { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtk_matching::{FeeConfig, SlippageConfig};
    use qtk_risk::breaker::CircuitBreakerLimits;
    use qtk_strategy::{Direction, EquityView, SignalSize};

    struct BuyAndHold {
        bought: bool,
    }

    impl EventStrategy for BuyAndHold {
        fn name(&self) -> &str {
            "buy_and_hold"
        }

        fn on_bar(&mut self, event: &MarketEvent, _equity: &dyn EquityView) -> Vec<Signal> {
            if self.bought {
                return Vec::new();
            }
            self.bought = true;
            let MarketEvent::Bar { symbol, .. } = event else {
                return Vec::new();
            };
            vec![Signal::new(
                symbol.clone(),
                Direction::Long,
                SignalSize::Fraction(0.1),
            )]
        }

        fn on_trade(&mut self, _event: &MarketEvent, _equity: &dyn EquityView) -> Vec<Signal> {
            Vec::new()
        }
    }

    fn limits() -> CircuitBreakerLimits {
        CircuitBreakerLimits {
            max_drawdown_pct: 0.1,
            single_order_size_cap: 10.0,
            daily_loss_limit: 5_000.0,
        }
    }

    #[tokio::test]
    async fn bar_event_triggers_a_buy_that_lands_in_the_ledger() {
        let mut worker = SessionWorker::new(
            Uuid::new_v4(),
            SessionMode::Paper,
            BuyAndHold { bought: false },
            MatchingEngine::new(FeeConfig::default(), SlippageConfig::default()),
            Ledger::new(10_000 * qtk_portfolio::MICROS_SCALE),
            RiskCircuitBreaker::new(limits(), 10_000.0, 1),
            EventBus::default(),
            1,
        );

        worker.start(Utc::now()).await;
        worker
            .on_event(
                MarketEvent::Bar {
                    symbol: "BTCUSDT".to_string(),
                    open: 100.0,
                    high: 101.0,
                    low: 99.0,
                    close: 100.0,
                    volume: 10.0,
                    end_ts_ms: 0,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        assert!(worker.ledger().qty_signed("BTCUSDT") > 0);
    }

    #[tokio::test]
    async fn order_exceeding_single_order_cap_is_rejected() {
        let tight_limits = CircuitBreakerLimits {
            max_drawdown_pct: 0.1,
            single_order_size_cap: 0.0001,
            daily_loss_limit: 5_000.0,
        };
        let mut worker = SessionWorker::new(
            Uuid::new_v4(),
            SessionMode::Paper,
            BuyAndHold { bought: false },
            MatchingEngine::new(FeeConfig::default(), SlippageConfig::default()),
            Ledger::new(10_000 * qtk_portfolio::MICROS_SCALE),
            RiskCircuitBreaker::new(tight_limits, 10_000.0, 1),
            EventBus::default(),
            1,
        );

        let err = worker
            .on_event(
                MarketEvent::Bar {
                    symbol: "BTCUSDT".to_string(),
                    open: 100.0,
                    high: 101.0,
                    low: 99.0,
                    close: 100.0,
                    volume: 10.0,
                    end_ts_ms: 0,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::RiskBreach(_)));
    }
}
