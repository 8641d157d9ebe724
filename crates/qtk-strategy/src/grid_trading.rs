//! Grid trading: layers buy/sell signals at fixed price levels across a
//! range, profiting from oscillation in ranging markets. Arithmetic grids
//! space levels by a constant price gap; geometric grids space them by a
//! constant percentage gap.

use std::collections::BTreeSet;

use crate::signal::{Direction, EquityView, EventStrategy, MarketEvent, Signal, SignalSize};

/// Grid level spacing mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GridType {
    /// Evenly spaced levels (constant price gap).
    Arithmetic,
    /// Ratio-spaced levels (constant percentage gap); wider at higher prices.
    Geometric,
}

/// Constructor-time configuration errors.
#[derive(Clone, Debug, PartialEq)]
pub enum GridTradingError {
    InvalidRange { upper_price: f64, lower_price: f64 },
    InvalidGridCount { grid_count: u32 },
    InvalidInvestment { total_investment: f64 },
}

impl std::fmt::Display for GridTradingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange { upper_price, lower_price } => write!(
                f,
                "upper_price ({upper_price}) must be greater than lower_price ({lower_price})"
            ),
            Self::InvalidGridCount { grid_count } => {
                write!(f, "grid_count ({grid_count}) must be at least 2")
            }
            Self::InvalidInvestment { total_investment } => {
                write!(f, "total_investment ({total_investment}) must be positive")
            }
        }
    }
}

impl std::error::Error for GridTradingError {}

/// Grid trading strategy over `[lower_price, upper_price]`.
pub struct GridTradingStrategy {
    symbol: String,
    grid_levels: Vec<f64>,
    size_per_grid: f64,
    filled: BTreeSet<usize>,
    last_price: Option<f64>,
}

impl GridTradingStrategy {
    /// Builds the grid and validates parameters.
    ///
    /// # Errors
    /// `upper_price <= lower_price`, `grid_count < 2`, or
    /// `total_investment <= 0` each produce a [`GridTradingError`] rather
    /// than constructing a strategy with a meaningless grid.
    pub fn new(
        symbol: impl Into<String>,
        upper_price: f64,
        lower_price: f64,
        total_investment: f64,
        grid_count: u32,
        grid_type: GridType,
    ) -> Result<Self, GridTradingError> {
        if upper_price <= lower_price {
            return Err(GridTradingError::InvalidRange { upper_price, lower_price });
        }
        if grid_count < 2 {
            return Err(GridTradingError::InvalidGridCount { grid_count });
        }
        if total_investment <= 0.0 {
            return Err(GridTradingError::InvalidInvestment { total_investment });
        }

        let grid_levels = compute_grid_levels(upper_price, lower_price, grid_count, grid_type);
        let size_per_grid = total_investment / (grid_count as f64 + 1.0);

        Ok(Self {
            symbol: symbol.into(),
            grid_levels,
            size_per_grid,
            filled: BTreeSet::new(),
            last_price: None,
        })
    }

    pub fn grid_levels(&self) -> &[f64] {
        &self.grid_levels
    }

    /// Crossing detection against the last observed price: a downward
    /// crossing of an unfilled level emits a buy, an upward crossing of a
    /// filled level emits a sell.
    fn check_signals(&mut self, price: f64) -> Vec<Signal> {
        let Some(prev) = self.last_price else {
            self.last_price = Some(price);
            return Vec::new();
        };

        let mut signals = Vec::new();
        for (i, &level) in self.grid_levels.iter().enumerate() {
            if prev >= level && level > price && !self.filled.contains(&i) {
                signals.push(
                    Signal::new(self.symbol.clone(), Direction::Long, SignalSize::Absolute(self.size_per_grid / level))
                        .with_limit_price(level),
                );
                self.filled.insert(i);
            } else if prev <= level && level < price && self.filled.contains(&i) {
                signals.push(
                    Signal::new(self.symbol.clone(), Direction::Short, SignalSize::Absolute(self.size_per_grid / level))
                        .with_limit_price(level),
                );
                self.filled.remove(&i);
            }
        }

        self.last_price = Some(price);
        signals
    }
}

fn compute_grid_levels(upper: f64, lower: f64, grid_count: u32, grid_type: GridType) -> Vec<f64> {
    let n = grid_count as i64;
    (0..=n)
        .map(|i| match grid_type {
            GridType::Arithmetic => {
                let step = (upper - lower) / grid_count as f64;
                lower + i as f64 * step
            }
            GridType::Geometric => {
                let ratio = upper / lower;
                lower * ratio.powf(i as f64 / grid_count as f64)
            }
        })
        .collect()
}

impl EventStrategy for GridTradingStrategy {
    fn name(&self) -> &str {
        "grid_trading"
    }

    fn on_bar(&mut self, event: &MarketEvent, _equity: &dyn EquityView) -> Vec<Signal> {
        let MarketEvent::Bar { close, .. } = event else {
            return Vec::new();
        };
        if *close <= 0.0 {
            return Vec::new();
        }
        self.check_signals(*close)
    }

    fn on_trade(&mut self, event: &MarketEvent, _equity: &dyn EquityView) -> Vec<Signal> {
        let MarketEvent::Trade { price, .. } = event else {
            return Vec::new();
        };
        if *price <= 0.0 {
            return Vec::new();
        }
        self.check_signals(*price)
    }
}
