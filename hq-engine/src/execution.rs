//! Pre-trade risk gate in front of the order manager (spec §4.12): enforces max order size
//! and max concurrent open orders before forwarding a request to the venue.

use hq_core::error::BusinessError;
use hq_core::types::{Order, OrderRequest};
use hq_core::Result;
use hq_order::OrderManager;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Static risk limits checked before an [`OrderRequest`] is forwarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionLimits {
    pub max_order_size: Decimal,
    pub max_concurrent_open_orders: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionEngineStats {
    pub orders_submitted: u64,
    pub orders_filled: u64,
    pub orders_rejected: u64,
}

/// Routes [`OrderRequest`]s to an [`OrderManager`], applying pre-trade checks first.
pub struct ExecutionEngine {
    manager: Arc<OrderManager>,
    limits: ExecutionLimits,
    orders_submitted: AtomicU64,
    orders_filled: AtomicU64,
    orders_rejected: AtomicU64,
}

impl ExecutionEngine {
    pub fn new(manager: Arc<OrderManager>, limits: ExecutionLimits) -> Self {
        Self {
            manager,
            limits,
            orders_submitted: AtomicU64::new(0),
            orders_filled: AtomicU64::new(0),
            orders_rejected: AtomicU64::new(0),
        }
    }

    /// Validate `request` against the static limits before submission. Does not inspect
    /// the venue; a request that clears here can still be rejected downstream.
    fn check_pre_trade(&self, request: &OrderRequest) -> Result<()> {
        if request.amount > self.limits.max_order_size {
            return Err(BusinessError::ExceedsMaxPositionSize.into());
        }
        if self.manager.get_active_orders().len() >= self.limits.max_concurrent_open_orders {
            return Err(BusinessError::OrderRejected(
                "max concurrent open orders reached".into(),
            )
            .into());
        }
        Ok(())
    }

    /// Accept an `OrderRequest` intent (from the bus or a direct caller), gate it, and
    /// forward to the order manager. The manager is responsible for publishing resulting
    /// bus events; this only tracks engine-level statistics.
    pub async fn submit_order(&self, request: OrderRequest) -> Result<Order> {
        if let Err(err) = self.check_pre_trade(&request) {
            self.orders_rejected.fetch_add(1, Ordering::Relaxed);
            return Err(err);
        }

        self.orders_submitted.fetch_add(1, Ordering::Relaxed);
        match self.manager.submit_order(request).await {
            Ok(order) => {
                if order.status.is_terminal() && order.filled_amount > Decimal::ZERO {
                    self.orders_filled.fetch_add(1, Ordering::Relaxed);
                } else if matches!(order.status, hq_core::types::OrderStatus::Rejected) {
                    self.orders_rejected.fetch_add(1, Ordering::Relaxed);
                }
                Ok(order)
            }
            Err(err) => {
                self.orders_rejected.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> ExecutionEngineStats {
        ExecutionEngineStats {
            orders_submitted: self.orders_submitted.load(Ordering::Relaxed),
            orders_filled: self.orders_filled.load(Ordering::Relaxed),
            orders_rejected: self.orders_rejected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hq_core::time::Timestamp;
    use hq_core::types::{
        Balance, OrderStatus, OrderType, Position, Side, TimeInForce, Ticker, TradingPair,
    };
    use hq_exchange::exchange::OrderBookSnapshot;
    use hq_exchange::Exchange;
    use rust_decimal_macros::dec;

    struct StubExchange;

    #[async_trait]
    impl Exchange for StubExchange {
        fn name(&self) -> &'static str {
            "stub"
        }
        async fn connect(&self) -> Result<()> {
            Ok(())
        }
        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }
        async fn is_connected(&self) -> bool {
            true
        }
        async fn get_ticker(&self, _pair: &TradingPair) -> Result<Ticker> {
            unimplemented!()
        }
        async fn get_orderbook(&self, _pair: &TradingPair, _depth: usize) -> Result<OrderBookSnapshot> {
            unimplemented!()
        }
        async fn create_order(&self, request: OrderRequest) -> Result<Order> {
            let mut order = Order::pending(
                request,
                "c1".into(),
                Timestamp::from_millis(0),
            );
            order.exchange_order_id = Some(1);
            order.status = OrderStatus::Open;
            Ok(order)
        }
        async fn cancel_order(&self, _pair: &TradingPair, _id: u64) -> Result<()> {
            Ok(())
        }
        async fn cancel_all_orders(&self, _pair: &TradingPair) -> Result<u64> {
            Ok(0)
        }
        async fn get_order(&self, _pair: &TradingPair, _id: u64) -> Result<Order> {
            unimplemented!()
        }
        async fn get_balance(&self, _asset: &str) -> Result<Balance> {
            unimplemented!()
        }
        async fn get_positions(&self) -> Result<Vec<Position>> {
            Ok(Vec::new())
        }
    }

    fn request(amount: Decimal) -> OrderRequest {
        OrderRequest {
            pair: TradingPair::new("BTC", "USDC"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            amount,
            price: Some(dec!(60000)),
            tif: TimeInForce::Gtc,
            reduce_only: false,
            client_order_id: None,
        }
    }

    fn engine(limits: ExecutionLimits) -> ExecutionEngine {
        let manager = Arc::new(OrderManager::new(Arc::new(StubExchange)));
        ExecutionEngine::new(manager, limits)
    }

    #[tokio::test]
    async fn oversized_order_is_rejected_before_reaching_the_manager() {
        let engine = engine(ExecutionLimits {
            max_order_size: dec!(0.01),
            max_concurrent_open_orders: 10,
        });

        let result = engine.submit_order(request(dec!(1))).await;
        assert!(result.is_err());
        assert_eq!(engine.stats().orders_rejected, 1);
        assert_eq!(engine.stats().orders_submitted, 0);
    }

    #[tokio::test]
    async fn accepted_order_increments_submitted_count() {
        let engine = engine(ExecutionLimits {
            max_order_size: dec!(1),
            max_concurrent_open_orders: 10,
        });

        let order = engine.submit_order(request(dec!(0.01))).await.unwrap();
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(engine.stats().orders_submitted, 1);
    }

    #[tokio::test]
    async fn max_concurrent_open_orders_blocks_further_submissions() {
        let engine = engine(ExecutionLimits {
            max_order_size: dec!(1),
            max_concurrent_open_orders: 1,
        });

        engine.submit_order(request(dec!(0.01))).await.unwrap();
        let result = engine.submit_order(request(dec!(0.01))).await;
        assert!(result.is_err());
        assert_eq!(engine.stats().orders_rejected, 1);
    }
}
