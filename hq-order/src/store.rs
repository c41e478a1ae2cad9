//! Dual-indexed order store (spec §4.8). `by_client_id` is the single owner of every
//! [`Order`]; every other index stores a `client_order_id` key rather than a reference, so
//! there is nothing to dangle if an order is ever dropped — the use-after-free class the
//! source's historical bug list documented doesn't have a Rust equivalent here, because no
//! index ever holds a pointer into another index's storage.

use hq_core::types::{Order, TradingPair};
use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use std::collections::HashMap;

#[derive(Default)]
pub struct OrderStore {
    by_client_id: IndexMap<SmolStr, Order>,
    by_exchange_id: HashMap<u64, SmolStr>,
    active_orders: IndexSet<SmolStr>,
    history_orders: IndexSet<SmolStr>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly built [`Order`]; `order.client_order_id` must be set.
    pub fn insert(&mut self, order: Order) {
        let client_id = order
            .client_order_id
            .clone()
            .expect("orders entering the store always carry a client_order_id");

        if let Some(exchange_id) = order.exchange_order_id {
            self.by_exchange_id.insert(exchange_id, client_id.clone());
        }
        if order.status.is_terminal() {
            self.history_orders.insert(client_id.clone());
        } else {
            self.active_orders.insert(client_id.clone());
        }
        self.by_client_id.insert(client_id, order);
    }

    pub fn get_by_client_id(&self, client_id: &str) -> Option<&Order> {
        self.by_client_id.get(client_id)
    }

    pub fn get_by_exchange_id(&self, exchange_id: u64) -> Option<&Order> {
        let client_id = self.by_exchange_id.get(&exchange_id)?;
        self.by_client_id.get(client_id.as_str())
    }

    /// Mutate the order keyed by `client_id` with `f`, then reconcile every index against
    /// whatever `f` changed (new exchange id assigned, active/history bucket, terminality).
    pub fn update_by_client_id(
        &mut self,
        client_id: &str,
        f: impl FnOnce(&mut Order),
    ) -> Option<()> {
        let order = self.by_client_id.get_mut(client_id)?;
        let was_terminal = order.status.is_terminal();
        f(order);
        let is_terminal = order.status.is_terminal();
        let exchange_id = order.exchange_order_id;

        if let Some(exchange_id) = exchange_id {
            self.by_exchange_id
                .entry(exchange_id)
                .or_insert_with(|| SmolStr::from(client_id));
        }

        if !was_terminal && is_terminal {
            self.active_orders.shift_remove(client_id);
            self.history_orders.insert(SmolStr::from(client_id));
        }

        Some(())
    }

    pub fn update_by_exchange_id(
        &mut self,
        exchange_id: u64,
        f: impl FnOnce(&mut Order),
    ) -> Option<()> {
        let client_id = self.by_exchange_id.get(&exchange_id)?.clone();
        self.update_by_client_id(&client_id, f)
    }

    pub fn active_orders(&self) -> Vec<Order> {
        self.active_orders
            .iter()
            .filter_map(|id| self.by_client_id.get(id.as_str()))
            .cloned()
            .collect()
    }

    /// History, most-recent-first, optionally filtered by pair and truncated to `limit`.
    pub fn history_orders(&self, pair: Option<&TradingPair>, limit: Option<usize>) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .history_orders
            .iter()
            .rev()
            .filter_map(|id| self.by_client_id.get(id.as_str()))
            .filter(|order| pair.map_or(true, |p| &order.pair == p))
            .cloned()
            .collect();
        if let Some(limit) = limit {
            orders.truncate(limit);
        }
        orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_core::time::Timestamp;
    use hq_core::types::{OrderRequest, OrderStatus, OrderType, Side, TimeInForce};
    use rust_decimal_macros::dec;

    fn pending_order(client_id: &str) -> Order {
        let request = OrderRequest {
            pair: TradingPair::new("BTC", "USDC"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            amount: dec!(0.01),
            price: Some(dec!(60000)),
            tif: TimeInForce::Gtc,
            reduce_only: false,
            client_order_id: None,
        };
        Order::pending(request, client_id.into(), Timestamp::from_millis(0))
    }

    #[test]
    fn inserted_order_starts_in_active_bucket() {
        let mut store = OrderStore::new();
        store.insert(pending_order("c1"));
        assert_eq!(store.active_orders().len(), 1);
        assert_eq!(store.history_orders(None, None).len(), 0);
    }

    #[test]
    fn transition_to_terminal_moves_active_to_history() {
        let mut store = OrderStore::new();
        store.insert(pending_order("c1"));
        store.update_by_client_id("c1", |order| {
            order.status = OrderStatus::Filled;
            order.exchange_order_id = Some(42);
        });

        assert_eq!(store.active_orders().len(), 0);
        assert_eq!(store.history_orders(None, None).len(), 1);
        assert!(store.get_by_exchange_id(42).is_some());
    }

    #[test]
    fn lookup_by_exchange_id_after_assignment() {
        let mut store = OrderStore::new();
        store.insert(pending_order("c1"));
        store.update_by_client_id("c1", |order| {
            order.exchange_order_id = Some(7);
            order.status = OrderStatus::Open;
        });

        let found = store.get_by_exchange_id(7).unwrap();
        assert_eq!(found.client_order_id.as_deref(), Some("c1"));
    }

    #[test]
    fn history_filters_by_pair_and_respects_limit() {
        let mut store = OrderStore::new();
        for (id, base) in [("c1", "BTC"), ("c2", "ETH"), ("c3", "BTC")] {
            let mut order = pending_order(id);
            order.pair = TradingPair::new(base, "USDC");
            store.insert(order);
            store.update_by_client_id(id, |order| order.status = OrderStatus::Filled);
        }

        let btc_only = store.history_orders(Some(&TradingPair::new("BTC", "USDC")), None);
        assert_eq!(btc_only.len(), 2);

        let limited = store.history_orders(None, Some(1));
        assert_eq!(limited.len(), 1);
    }
}
