//! The `Exchange` capability trait (spec §4.1): every venue connector, live or future,
//! exposes this same surface so the rest of the system never matches on venue identity.

use async_trait::async_trait;
use hq_core::types::{Balance, Order, OrderBookLevel, OrderRequest, Position, Ticker, TradingPair};
use hq_core::Result;

/// A snapshot of both sides of the book, shallow copy of whatever depth the venue sent.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookSnapshot {
    pub pair: TradingPair,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

/// A venue connection. Implementors own their own connection/session state; `connect`
/// and `disconnect` bracket that lifecycle (spec §4.5 "Lifecycle").
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Stable identifier for logging and error messages, e.g. `"hyperliquid"`.
    fn name(&self) -> &'static str;

    /// Establish REST/WS connectivity. Idempotent: calling it while already connected is a
    /// no-op.
    async fn connect(&self) -> Result<()>;

    /// Tear down REST/WS connectivity. Idempotent.
    async fn disconnect(&self) -> Result<()>;

    /// Whether `connect` has been called and `disconnect` has not undone it.
    async fn is_connected(&self) -> bool;

    async fn get_ticker(&self, pair: &TradingPair) -> Result<Ticker>;

    /// Fetch the book for `pair`, copied out to `depth` levels per side.
    async fn get_orderbook(&self, pair: &TradingPair, depth: usize) -> Result<OrderBookSnapshot>;

    /// Submit `request` to the venue. Returns the accepted (or immediately filled/rejected)
    /// [`Order`] with its venue-assigned `exchange_order_id` populated where known.
    async fn create_order(&self, request: OrderRequest) -> Result<Order>;

    /// Cancel by venue order id. Returns `Ok(())` whether or not the order was still
    /// live — cancelling an already-terminal order is not an error (spec §4.8).
    async fn cancel_order(&self, pair: &TradingPair, exchange_order_id: u64) -> Result<()>;

    /// Cancel every open order on `pair`. Returns the number actually cancelled; `0` is a
    /// valid result when there were none open (spec §9 Open Question).
    async fn cancel_all_orders(&self, pair: &TradingPair) -> Result<u64>;

    async fn get_order(&self, pair: &TradingPair, exchange_order_id: u64) -> Result<Order>;

    async fn get_balance(&self, asset: &str) -> Result<Balance>;

    async fn get_positions(&self) -> Result<Vec<Position>>;
}
