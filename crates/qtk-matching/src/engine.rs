use std::collections::{BTreeMap, VecDeque};

use crate::types::{
    FeeConfig, Fill, MatchingError, Order, OrderKind, OrderRequest, OrderStatus, Side,
    SlippageConfig,
};

const DEFAULT_FILLED_LOG_CAP: usize = 10_000;

/// Matching engine: accepts orders, fills them against a price stream.
///
/// One engine instance is shared by backtest and paper-trading sessions;
/// the only difference between the two modes is where the price stream
/// comes from (bar closes vs. live tickers) — this type is agnostic to that.
pub struct MatchingEngine {
    fees: FeeConfig,
    slippage: SlippageConfig,
    next_id: u64,
    next_seq: u64,
    /// Per-instrument last known price.
    last_price: BTreeMap<String, f64>,
    /// Resting (non-terminal) orders, keyed by instrument, in submission order.
    resting: BTreeMap<String, Vec<Order>>,
    /// Bounded ring of every order that reached a terminal state.
    filled_log: VecDeque<Order>,
    filled_log_cap: usize,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new(FeeConfig::default(), SlippageConfig::default())
    }
}

impl MatchingEngine {
    pub fn new(fees: FeeConfig, slippage: SlippageConfig) -> Self {
        Self {
            fees,
            slippage,
            next_id: 1,
            next_seq: 1,
            last_price: BTreeMap::new(),
            resting: BTreeMap::new(),
            filled_log: VecDeque::new(),
            filled_log_cap: DEFAULT_FILLED_LOG_CAP,
        }
    }

    pub fn with_filled_log_cap(mut self, cap: usize) -> Self {
        self.filled_log_cap = cap;
        self
    }

    pub fn last_price(&self, instrument: &str) -> Option<f64> {
        self.last_price.get(instrument).copied()
    }

    /// Submit a new order. Returns the assigned order id, or a rejection.
    ///
    /// A `TpSl` request never rests as an order itself: it spawns up to two
    /// reduce-only child orders (a take-profit leg and a stop-loss leg) and
    /// returns the id of the first spawned child.
    pub fn submit(
        &mut self,
        req: OrderRequest,
        tick: u64,
    ) -> Result<Vec<u64>, MatchingError> {
        if req.qty <= 0.0 {
            return Err(MatchingError::NonPositiveQuantity);
        }

        if req.kind == OrderKind::TpSl {
            return Ok(self.submit_tp_sl(req, tick));
        }

        let id = self.new_order(req, tick);
        self.try_submit_fill(id, tick);
        Ok(vec![id])
    }

    fn submit_tp_sl(&mut self, req: OrderRequest, tick: u64) -> Vec<u64> {
        let mut ids = Vec::with_capacity(2);
        if let Some(tp) = req.tp_price {
            let mut child = req.clone();
            child.kind = OrderKind::Stop;
            child.stop_price = Some(tp);
            child.reduce_only = true;
            let id = self.new_order(child, tick);
            if let Some(o) = self.order_mut(id) {
                o.is_take_profit = true;
            }
            ids.push(id);
        }
        if let Some(sl) = req.sl_price {
            let mut child = req.clone();
            child.kind = OrderKind::Stop;
            child.stop_price = Some(sl);
            child.reduce_only = true;
            ids.push(self.new_order(child, tick));
        }
        ids
    }

    fn new_order(&mut self, req: OrderRequest, tick: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        let order = Order {
            id,
            instrument: req.instrument.clone(),
            side: req.side,
            kind: req.kind,
            qty: req.qty,
            limit_price: req.limit_price,
            stop_price: req.stop_price,
            callback_rate: req.callback_rate,
            activation_price: req.activation_price,
            reduce_only: req.reduce_only,
            status: OrderStatus::Pending,
            fill_price: None,
            fill_qty: 0.0,
            fee: 0.0,
            seq,
            created_tick: tick,
            filled_tick: None,
            trailing_extreme: None,
            trailing_armed: req.activation_price.is_none(),
            is_take_profit: false,
            triggered: false,
        };

        self.resting
            .entry(req.instrument)
            .or_default()
            .push(order);
        id
    }

    fn order_mut(&mut self, id: u64) -> Option<&mut Order> {
        self.resting
            .values_mut()
            .flat_map(|v| v.iter_mut())
            .find(|o| o.id == id)
    }

    /// Attempt to fill an order immediately at submission time (market orders
    /// with a known reference price, or limit orders whose condition is
    /// already satisfied). Leaves the order resting otherwise.
    fn try_submit_fill(&mut self, id: u64, tick: u64) -> Option<Fill> {
        let price = {
            let order = self.order_mut(id)?;
            self.last_price.get(&order.instrument).copied()
        };

        let order = self.order_mut(id)?;
        match order.kind {
            OrderKind::Market => {
                if let Some(p) = price {
                    let fill = fill_taker(order, p, tick, &self.fees, &self.slippage);
                    return Some(self.finalize(fill));
                }
                None
            }
            OrderKind::Limit => {
                if let Some(p) = price {
                    if crosses_limit(order.side, order.limit_price.unwrap(), p) {
                        let limit_price = order.limit_price.unwrap();
                        let fill = fill_at(order, limit_price, tick, true, &self.fees);
                        return Some(self.finalize(fill));
                    }
                }
                None
            }
            // Stop/StopLimit/TrailingStop never fill at submission; they are
            // armed and wait for a subsequent price tick.
            OrderKind::Stop | OrderKind::StopLimit | OrderKind::TrailingStop | OrderKind::TpSl => {
                None
            }
        }
    }

    fn finalize(&mut self, fill: Fill) -> Fill {
        if let Some(order) = self.order_mut(fill.order_id) {
            order.status = OrderStatus::Filled;
            order.fill_price = Some(fill.price);
            order.fill_qty = fill.qty;
            order.fee = fill.fee;
            order.filled_tick = Some(fill.tick);
        }
        self.drain_terminal();
        fill
    }

    /// Cancel a resting order. No-op (returns false) if it does not exist or
    /// is already terminal.
    pub fn cancel(&mut self, id: u64) -> bool {
        for orders in self.resting.values_mut() {
            if let Some(o) = orders.iter_mut().find(|o| o.id == id && !o.is_terminal()) {
                o.status = OrderStatus::Cancelled;
                self.drain_terminal();
                return true;
            }
        }
        false
    }

    /// Feed a new price for `instrument`. Returns every fill produced,
    /// in submission order for same-tick crosses.
    pub fn on_price(&mut self, instrument: &str, price: f64, tick: u64) -> Vec<Fill> {
        self.last_price.insert(instrument.to_string(), price);

        let mut fills = Vec::new();
        let Some(orders) = self.resting.get_mut(instrument) else {
            return fills;
        };
        // Submission order — BTreeMap insertion preserved push order within Vec.
        let ids: Vec<u64> = orders
            .iter()
            .filter(|o| !o.is_terminal())
            .map(|o| o.id)
            .collect();

        for id in ids {
            if let Some(fill) = self.tick_order(id, price, tick) {
                fills.push(fill);
            }
        }
        self.drain_terminal();
        fills
    }

    fn tick_order(&mut self, id: u64, price: f64, tick: u64) -> Option<Fill> {
        let order = self.order_mut(id)?;
        if order.is_terminal() {
            return None;
        }

        match order.kind {
            OrderKind::Market => {
                let fill = fill_taker(order, price, tick, &self.fees, &self.slippage);
                Some(self.finalize(fill))
            }
            OrderKind::Limit => {
                if crosses_limit(order.side, order.limit_price.unwrap(), price) {
                    let limit_price = order.limit_price.unwrap();
                    // Resting limit order filling on a later tick: maker fee.
                    let fill = fill_at(order, limit_price, tick, false, &self.fees);
                    Some(self.finalize(fill))
                } else {
                    None
                }
            }
            OrderKind::Stop => {
                if !order.triggered {
                    if stop_triggered(order, price) {
                        order.triggered = true;
                        let fill = fill_taker(order, price, tick, &self.fees, &self.slippage);
                        return Some(self.finalize(fill));
                    }
                    None
                } else {
                    None
                }
            }
            OrderKind::StopLimit => {
                if !order.triggered {
                    if stop_triggered(order, price) {
                        order.triggered = true;
                        let limit = order.limit_price.unwrap_or(price);
                        if crosses_limit(order.side, limit, price) {
                            let fill = fill_at(order, limit, tick, true, &self.fees);
                            return Some(self.finalize(fill));
                        }
                    }
                    None
                } else {
                    let limit = order.limit_price.unwrap();
                    if crosses_limit(order.side, limit, price) {
                        let fill = fill_at(order, limit, tick, false, &self.fees);
                        Some(self.finalize(fill))
                    } else {
                        None
                    }
                }
            }
            OrderKind::TrailingStop => self.tick_trailing(id, price, tick),
            OrderKind::TpSl => None,
        }
    }

    fn tick_trailing(&mut self, id: u64, price: f64, tick: u64) -> Option<Fill> {
        let order = self.order_mut(id)?;

        if !order.trailing_armed {
            let activation = order.activation_price.unwrap();
            let armed = match order.side {
                // Sell-side trailing protects a long: arms once price has
                // risen to the activation level.
                Side::Sell => price >= activation,
                // Buy-side trailing protects a short: arms once price has
                // fallen to the activation level.
                Side::Buy => price <= activation,
            };
            if !armed {
                return None;
            }
            order.trailing_armed = true;
        }

        let callback = order.callback_rate.unwrap_or(0.0);
        let extreme = order.trailing_extreme.unwrap_or(price);
        let new_extreme = match order.side {
            Side::Sell => extreme.max(price),
            Side::Buy => extreme.min(price),
        };
        order.trailing_extreme = Some(new_extreme);

        let triggered = match order.side {
            Side::Sell => price <= new_extreme * (1.0 - callback),
            Side::Buy => price >= new_extreme * (1.0 + callback),
        };

        if triggered {
            let fill = fill_taker(order, price, tick, &self.fees, &self.slippage);
            Some(self.finalize(fill))
        } else {
            None
        }
    }

    fn drain_terminal(&mut self) {
        for orders in self.resting.values_mut() {
            let mut i = 0;
            while i < orders.len() {
                if orders[i].is_terminal() {
                    let o = orders.remove(i);
                    self.filled_log.push_back(o);
                } else {
                    i += 1;
                }
            }
        }
        while self.filled_log.len() > self.filled_log_cap {
            self.filled_log.pop_front();
        }
    }

    pub fn filled_orders(&self) -> impl Iterator<Item = &Order> {
        self.filled_log.iter()
    }

    pub fn open_orders(&self, instrument: &str) -> &[Order] {
        self.resting
            .get(instrument)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

fn crosses_limit(side: Side, limit: f64, price: f64) -> bool {
    match side {
        Side::Buy => price <= limit,
        Side::Sell => price >= limit,
    }
}

/// A normal (non-take-profit) stop triggers on adverse movement: a sell
/// stop (protecting a long) fires when price falls to/through the stop; a
/// buy stop (protecting a short) fires when price rises to/through it. A
/// take-profit child of a TP/SL bracket has the polarity reversed — it
/// fires on favorable movement instead.
fn stop_triggered(order: &Order, price: f64) -> bool {
    let stop = order.stop_price.unwrap();
    let adverse = match order.side {
        Side::Sell => price <= stop,
        Side::Buy => price >= stop,
    };
    if order.is_take_profit {
        !adverse_equals_favorable(order.side, stop, price, adverse)
    } else {
        adverse
    }
}

fn adverse_equals_favorable(side: Side, stop: f64, price: f64, _adverse: bool) -> bool {
    // Favorable is simply the opposite crossing direction from adverse.
    match side {
        Side::Sell => !(price <= stop) && price >= stop,
        Side::Buy => !(price >= stop) && price <= stop,
    }
}

fn fill_taker(
    order: &mut Order,
    reference_price: f64,
    tick: u64,
    fees: &FeeConfig,
    slippage: &SlippageConfig,
) -> Fill {
    let slip = slippage.slippage_bps / 10_000.0;
    let price = match order.side {
        Side::Buy => reference_price * (1.0 + slip),
        Side::Sell => reference_price * (1.0 - slip),
    };
    make_fill(order, price, tick, true, fees)
}

fn fill_at(order: &mut Order, price: f64, tick: u64, is_taker: bool, fees: &FeeConfig) -> Fill {
    make_fill(order, price, tick, is_taker, fees)
}

fn make_fill(order: &mut Order, price: f64, tick: u64, is_taker: bool, fees: &FeeConfig) -> Fill {
    let rate = if is_taker {
        fees.taker_rate
    } else {
        fees.maker_rate
    };
    let notional = price * order.qty;
    let fee = notional * rate;
    Fill {
        order_id: order.id,
        instrument: order.instrument.clone(),
        side: order.side,
        qty: order.qty,
        price,
        fee,
        is_taker,
        tick,
    }
}
