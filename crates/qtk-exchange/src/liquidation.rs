//! Liquidation-price helper shared by every connector.

/// Binance-futures-VIP0-shaped default maintenance margin rate. Connectors
/// override this for tiered MMR brackets (larger notional tiers carry a
/// higher MMR).
pub const DEFAULT_MMR: f64 = 0.004;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PositionDirection {
    Long,
    Short,
}

/// `entry * (1 - 1/leverage + mmr)` for LONG, `entry * (1 + 1/leverage - mmr)`
/// for SHORT.
pub fn liquidation_price(
    entry_price: f64,
    leverage: f64,
    direction: PositionDirection,
    mmr: f64,
) -> f64 {
    debug_assert!(leverage > 0.0, "leverage must be > 0");
    match direction {
        PositionDirection::Long => entry_price * (1.0 - 1.0 / leverage + mmr),
        PositionDirection::Short => entry_price * (1.0 + 1.0 / leverage - mmr),
    }
}
