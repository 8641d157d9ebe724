//! Pure market making: layers bid/ask signals around the mid-price to
//! capture spread, with an optional inventory skew that narrows the side
//! facing the strategy's current exposure.

use crate::signal::{Direction, EquityView, EventStrategy, MarketEvent, Signal, SignalSize};

/// Constructor-time configuration errors.
#[derive(Clone, Debug, PartialEq)]
pub enum MarketMakingError {
    InvalidOrderAmount { order_amount: f64 },
    InvalidSpread { spread: f64 },
    InvalidOrderLevels { order_levels: u32 },
    InvalidInventorySkew { inventory_skew: f64 },
}

impl std::fmt::Display for MarketMakingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidOrderAmount { order_amount } => {
                write!(f, "order_amount ({order_amount}) must be positive")
            }
            Self::InvalidSpread { spread } => {
                write!(f, "spread ({spread}) must be in [0.0001, 0.1]")
            }
            Self::InvalidOrderLevels { order_levels } => {
                write!(f, "order_levels ({order_levels}) must be in [1, 20]")
            }
            Self::InvalidInventorySkew { inventory_skew } => {
                write!(f, "inventory_skew ({inventory_skew}) must be in [0.0, 1.0]")
            }
        }
    }
}

impl std::error::Error for MarketMakingError {}

/// Pure market making strategy, quoting layered bid/ask signals around a
/// mid-price derived from the best bid/ask (or a bar close as a fallback
/// reference price).
pub struct MarketMakingStrategy {
    symbol: String,
    order_amount: f64,
    bid_spread: f64,
    ask_spread: f64,
    order_levels: u32,
    inventory_skew: f64,
    inventory: f64,
}

impl MarketMakingStrategy {
    /// # Errors
    /// `order_amount <= 0`, either spread outside `[0.0001, 0.1]`,
    /// `order_levels` outside `[1, 20]`, or `inventory_skew` outside
    /// `[0.0, 1.0]` each produce a [`MarketMakingError`].
    pub fn new(
        symbol: impl Into<String>,
        order_amount: f64,
        bid_spread: f64,
        ask_spread: f64,
        order_levels: u32,
        inventory_skew: f64,
    ) -> Result<Self, MarketMakingError> {
        if order_amount <= 0.0 {
            return Err(MarketMakingError::InvalidOrderAmount { order_amount });
        }
        if !(0.0001..=0.1).contains(&bid_spread) {
            return Err(MarketMakingError::InvalidSpread { spread: bid_spread });
        }
        if !(0.0001..=0.1).contains(&ask_spread) {
            return Err(MarketMakingError::InvalidSpread { spread: ask_spread });
        }
        if !(1..=20).contains(&order_levels) {
            return Err(MarketMakingError::InvalidOrderLevels { order_levels });
        }
        if !(0.0..=1.0).contains(&inventory_skew) {
            return Err(MarketMakingError::InvalidInventorySkew { inventory_skew });
        }

        Ok(Self {
            symbol: symbol.into(),
            order_amount,
            bid_spread,
            ask_spread,
            order_levels,
            inventory_skew,
            inventory: 0.0,
        })
    }

    /// Defaults matching the reference strategy: 0.1% spreads, 3 levels, no skew.
    pub fn with_defaults(symbol: impl Into<String>, order_amount: f64) -> Result<Self, MarketMakingError> {
        Self::new(symbol, order_amount, 0.001, 0.001, 3, 0.0)
    }

    /// Bid/ask sizes after inventory skew: a positive (long) inventory
    /// shrinks bid size and grows ask size, encouraging a return to flat.
    fn skewed_sizes(&self) -> (f64, f64) {
        if self.inventory_skew == 0.0 {
            return (self.order_amount, self.order_amount);
        }
        let normalized = self.inventory / self.order_amount;
        let skew = (self.inventory_skew * normalized).clamp(-1.0, 1.0);
        let bid = (self.order_amount * (1.0 - skew)).max(0.0);
        let ask = (self.order_amount * (1.0 + skew)).max(0.0);
        (bid, ask)
    }

    /// Zero or negative mid-price emits no signals — there is no valid
    /// reference price to quote around.
    fn generate_orders(&self, mid_price: f64) -> Vec<Signal> {
        if mid_price <= 0.0 {
            return Vec::new();
        }

        let (bid_size, ask_size) = self.skewed_sizes();
        let mut signals = Vec::new();

        for level in 1..=self.order_levels {
            let level_f = level as f64;
            if bid_size > 0.0 {
                let bid_price = mid_price * (1.0 - self.bid_spread * level_f);
                signals.push(
                    Signal::new(self.symbol.clone(), Direction::Long, SignalSize::Absolute(bid_size))
                        .with_limit_price(bid_price),
                );
            }
            if ask_size > 0.0 {
                let ask_price = mid_price * (1.0 + self.ask_spread * level_f);
                signals.push(
                    Signal::new(self.symbol.clone(), Direction::Short, SignalSize::Absolute(ask_size))
                        .with_limit_price(ask_price),
                );
            }
        }

        signals
    }
}

impl EventStrategy for MarketMakingStrategy {
    fn name(&self) -> &str {
        "basic_market_making"
    }

    fn on_bar(&mut self, event: &MarketEvent, _equity: &dyn EquityView) -> Vec<Signal> {
        let MarketEvent::Bar { close, .. } = event else {
            return Vec::new();
        };
        self.generate_orders(*close)
    }

    fn on_trade(&mut self, _event: &MarketEvent, _equity: &dyn EquityView) -> Vec<Signal> {
        Vec::new()
    }

    fn on_orderbook(&mut self, event: &MarketEvent, _equity: &dyn EquityView) -> Vec<Signal> {
        let MarketEvent::Orderbook { best_bid, best_ask, .. } = event else {
            return Vec::new();
        };
        if *best_bid <= 0.0 || *best_ask <= 0.0 {
            return Vec::new();
        }
        self.generate_orders((*best_bid + *best_ask) / 2.0)
    }
}
