//! Order Router: Deterministic execution boundary between internal engine and broker adapters.
//!
//! # Purpose
//! This module defines the thin, immutable boundary through which all order execution
//! requests must pass. It isolates the core execution engine from broker-specific
//! implementations, ensuring that routing logic remains deterministic and free of
//! strategy, risk, or accounting concerns.
//!
//! # Why This Boundary Exists
//! - Enforces separation of concerns between order generation (strategy/risk) and order delivery (broker)
//! - Provides a single choke-point for logging, metrics, and pre-flight validation
//! - Enables pluggable broker adapters (paper, Alpaca, etc.) without core engine changes
//!
//! # Why It Must Remain Thin
//! - Preserves deterministic behavior required for backtesting and simulation
//! - Avoids embedding business logic that belongs in risk or strategy modules
//! - Keeps the routing layer verifiable and low-risk
//!
//! # Enabling Paper Broker and Future Adapters
//! The `BrokerAdapter` trait allows any broker implementation (paper, Alpaca, etc.)
//! to be injected into the `OrderRouter`. The router itself remains agnostic to
//! the underlying broker, simply translating internal `ExecutionIntent` types into
//! broker-agnostic request structs. This design allows:
//! - Paper trading via a `PaperBroker` that simulates fills
//! - Live Alpaca integration via an `AlpacaBroker` that makes HTTP calls
//! - Testing via `MockBroker` as shown in the unit tests

/// Convenience alias so all public items in this module can use `Result<T>`
/// without spelling out the error type everywhere.
type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Broker-agnostic order submission request
#[derive(Debug, Clone)]
pub struct BrokerSubmitRequest {
    /// Internal order identifier
    pub order_id: String,
    /// Instrument identifier (symbol)
    pub symbol: String,
    /// Order quantity (positive for buy, negative for sell)
    pub quantity: i32,
    /// Order type (market, limit, etc.) - simplified for boundary
    pub order_type: String,
    /// Limit price (if applicable)
    pub limit_price: Option<f64>,
    /// Time in force
    pub time_in_force: String,
}

/// Broker-agnostic order submission response
#[derive(Debug, Clone)]
pub struct BrokerSubmitResponse {
    /// Broker-assigned order identifier
    pub broker_order_id: String,
    /// Timestamp of submission acknowledgment
    pub submitted_at: u64,
    /// Status of the submission
    pub status: String,
}

/// Broker-agnostic order cancellation response
#[derive(Debug, Clone)]
pub struct BrokerCancelResponse {
    /// Broker-assigned order identifier
    pub broker_order_id: String,
    /// Timestamp of cancellation acknowledgment
    pub cancelled_at: u64,
    /// Status of the cancellation
    pub status: String,
}

/// Broker-agnostic order replacement request
#[derive(Debug, Clone)]
pub struct BrokerReplaceRequest {
    /// Existing broker-assigned order identifier
    pub broker_order_id: String,
    /// New quantity (positive for buy, negative for sell)
    pub quantity: i32,
    /// New limit price (if applicable)
    pub limit_price: Option<f64>,
    /// New time in force
    pub time_in_force: String,
}

/// Broker-agnostic order replacement response
#[derive(Debug, Clone)]
pub struct BrokerReplaceResponse {
    /// Broker-assigned order identifier (may be new if replaced)
    pub broker_order_id: String,
    /// Timestamp of replacement acknowledgment
    pub replaced_at: u64,
    /// Status of the replacement
    pub status: String,
}

/// Trait that all broker adapters must implement
///
/// This trait defines the minimal interface required for order routing.
/// Implementations handle the actual communication with broker systems
/// (REST APIs, FIX connections, etc.) while remaining opaque to the router.
pub trait BrokerAdapter {
    /// Submit a new order to the broker
    fn submit_order(&self, req: BrokerSubmitRequest) -> Result<BrokerSubmitResponse>;

    /// Cancel an existing order
    fn cancel_order(&self, order_id: &str) -> Result<BrokerCancelResponse>;

    /// Replace/modify an existing order
    fn replace_order(&self, req: BrokerReplaceRequest) -> Result<BrokerReplaceResponse>;
}

/// Deterministic order router that delegates to a broker adapter
///
/// This struct serves as the immutable boundary layer between internal
/// execution intents and external broker systems. It performs minimal,
/// deterministic transformations and delegates all broker-specific
/// communication to the injected `BrokerAdapter`.
pub struct OrderRouter<B: BrokerAdapter> {
    broker: B,
}

impl<B: BrokerAdapter> OrderRouter<B> {
    /// Create a new order router with the given broker adapter
    pub fn new(broker: B) -> Self {
        Self { broker }
    }

    /// Route a broker-agnostic submission request straight to the adapter.
    ///
    /// # Returns
    /// * `Ok(BrokerSubmitResponse)` - Broker acknowledgment
    /// * `Err` - Routing or broker error
    pub fn route_submit(&self, req: BrokerSubmitRequest) -> Result<BrokerSubmitResponse> {
        self.broker.submit_order(req)
    }

    /// Route an order cancellation request
    ///
    /// # Arguments
    /// * `order_id` - Internal order identifier to cancel
    ///
    /// # Returns
    /// * `Ok(BrokerCancelResponse)` - Broker acknowledgment
    /// * `Err` - Routing or broker error
    pub fn route_cancel(&self, order_id: &str) -> Result<BrokerCancelResponse> {
        self.broker.cancel_order(order_id)
    }

    /// Route a broker-agnostic replace request straight to the adapter.
    ///
    /// # Returns
    /// * `Ok(BrokerReplaceResponse)` - Broker acknowledgment
    /// * `Err` - Routing or broker error
    pub fn route_replace(&self, req: BrokerReplaceRequest) -> Result<BrokerReplaceResponse> {
        self.broker.replace_order(req)
    }
}
