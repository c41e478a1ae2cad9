//! Single-connector registry (spec §4.3). The registry is the sole owner of the venue
//! connector it holds: at most one `Exchange` plus its configuration at a time, replaced
//! wholesale (with a warning) rather than keyed by name.

use crate::exchange::Exchange;
use hq_core::error::SystemError;
use hq_core::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

struct Slot<C> {
    exchange: Arc<dyn Exchange>,
    config: C,
}

pub struct ExchangeRegistry<C> {
    slot: Mutex<Option<Slot<C>>>,
}

impl<C> Default for ExchangeRegistry<C> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<C> ExchangeRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `exchange` as the held connector, replacing any prior one. Logs a warning
    /// on replacement since the registry owns at most one connector at a time.
    pub fn set_exchange(&self, exchange: Arc<dyn Exchange>, config: C) {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.as_ref() {
            warn!(
                replaced = previous.exchange.name(),
                installed = exchange.name(),
                "replacing registered exchange"
            );
        }
        *slot = Some(Slot { exchange, config });
    }

    /// The held connector, or `NoExchangeRegistered` if none has been set.
    pub fn get_exchange(&self) -> Result<Arc<dyn Exchange>> {
        self.slot
            .lock()
            .as_ref()
            .map(|slot| Arc::clone(&slot.exchange))
            .ok_or_else(|| SystemError::NoExchangeRegistered.into())
    }

    /// `connect` on the held connector.
    pub async fn connect_all(&self) -> Result<()> {
        let exchange = self.get_exchange()?;
        exchange.connect().await
    }

    /// `disconnect` on the held connector.
    pub async fn disconnect_all(&self) -> Result<()> {
        let exchange = self.get_exchange()?;
        exchange.disconnect().await
    }

    /// `false` if nothing is registered or the held connector reports disconnected.
    pub async fn is_connected(&self) -> bool {
        match self.get_exchange() {
            Ok(exchange) => exchange.is_connected().await,
            Err(_) => false,
        }
    }
}

impl<C> ExchangeRegistry<C>
where
    C: Clone,
{
    /// The configuration the held connector was installed with.
    pub fn config(&self) -> Result<C> {
        self.slot
            .lock()
            .as_ref()
            .map(|slot| slot.config.clone())
            .ok_or_else(|| SystemError::NoExchangeRegistered.into())
    }
}

impl<C> Drop for ExchangeRegistry<C> {
    /// Disconnects the held connector, releasing its resources. Best-effort: without a
    /// running Tokio runtime to spawn the async `disconnect` onto, the connector is simply
    /// dropped without a graceful teardown.
    fn drop(&mut self) {
        let Some(slot) = self.slot.get_mut().take() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = slot.exchange.disconnect().await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::OrderBookSnapshot;
    use async_trait::async_trait;
    use hq_core::types::{Balance, Order, OrderRequest, Position, Ticker, TradingPair};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubExchange {
        connected: AtomicBool,
    }

    impl StubExchange {
        fn new() -> Self {
            Self {
                connected: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Exchange for StubExchange {
        fn name(&self) -> &'static str {
            "stub"
        }
        async fn connect(&self) -> Result<()> {
            self.connected.store(true, Ordering::Release);
            Ok(())
        }
        async fn disconnect(&self) -> Result<()> {
            self.connected.store(false, Ordering::Release);
            Ok(())
        }
        async fn is_connected(&self) -> bool {
            self.connected.load(Ordering::Acquire)
        }
        async fn get_ticker(&self, _pair: &TradingPair) -> Result<Ticker> {
            unimplemented!()
        }
        async fn get_orderbook(&self, _pair: &TradingPair, _depth: usize) -> Result<OrderBookSnapshot> {
            unimplemented!()
        }
        async fn create_order(&self, _request: OrderRequest) -> Result<Order> {
            unimplemented!()
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
            unimplemented!()
        }
    }

    #[test]
    fn empty_registry_is_no_exchange_registered() {
        let registry: ExchangeRegistry<()> = ExchangeRegistry::new();
        assert!(registry.get_exchange().is_err());
    }

    #[test]
    fn set_exchange_replaces_the_held_connector() {
        let registry: ExchangeRegistry<&'static str> = ExchangeRegistry::new();
        registry.set_exchange(Arc::new(StubExchange::new()), "first");
        assert_eq!(registry.config().unwrap(), "first");

        registry.set_exchange(Arc::new(StubExchange::new()), "second");
        assert_eq!(registry.config().unwrap(), "second");
        assert_eq!(registry.get_exchange().unwrap().name(), "stub");
    }

    #[tokio::test]
    async fn connect_all_and_disconnect_all_drive_is_connected() {
        let registry: ExchangeRegistry<()> = ExchangeRegistry::new();
        registry.set_exchange(Arc::new(StubExchange::new()), ());

        assert!(!registry.is_connected().await);
        registry.connect_all().await.unwrap();
        assert!(registry.is_connected().await);
        registry.disconnect_all().await.unwrap();
        assert!(!registry.is_connected().await);
    }

    #[tokio::test]
    async fn connect_all_on_empty_registry_is_no_exchange_registered() {
        let registry: ExchangeRegistry<()> = ExchangeRegistry::new();
        assert!(registry.connect_all().await.is_err());
    }
}
