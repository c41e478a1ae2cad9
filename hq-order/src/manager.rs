//! Order lifecycle manager (spec §4.8): submission, cancellation, and the reconciliation
//! between an HTTP response and a later WebSocket event for the same order.

use crate::store::OrderStore;
use hq_core::time::Timestamp;
use hq_core::types::{Order, OrderRequest, OrderStatus, TradingPair};
use hq_core::Result;
use hq_exchange::Exchange;
use hq_integration::{BusEvent, MessageBus};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

fn now() -> Timestamp {
    Timestamp::from_datetime(chrono::Utc::now())
}

/// A fill reported over the user WebSocket channel.
#[derive(Debug, Clone)]
pub struct UserFill {
    pub exchange_order_id: u64,
    pub price: Decimal,
    pub size: Decimal,
    pub commission: Decimal,
    pub timestamp: Timestamp,
}

/// An order status push over the user WebSocket channel.
#[derive(Debug, Clone)]
pub struct VenueOrderUpdate {
    pub exchange_order_id: u64,
    pub status: OrderStatus,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone)]
pub enum UserEvent {
    Fill(UserFill),
    OrderUpdate(VenueOrderUpdate),
}

/// Per-item outcome of a batch cancel.
pub struct CancelOutcome {
    pub exchange_order_id: u64,
    pub result: Result<()>,
}

pub struct OrderManager {
    exchange: Arc<dyn Exchange>,
    store: Mutex<OrderStore>,
    bus: Option<Arc<MessageBus>>,
    next_seq: AtomicU64,
}

impl OrderManager {
    pub fn new(exchange: Arc<dyn Exchange>) -> Self {
        Self {
            exchange,
            store: Mutex::new(OrderStore::new()),
            bus: None,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn with_bus(exchange: Arc<dyn Exchange>, bus: Arc<MessageBus>) -> Self {
        Self {
            exchange,
            store: Mutex::new(OrderStore::new()),
            bus: Some(bus),
            next_seq: AtomicU64::new(0),
        }
    }

    fn generate_client_id(&self) -> SmolStr {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        SmolStr::new(format!("hq-{}-{}", seq, now().as_millis()))
    }

    fn publish_update(&self, order: &Order) {
        if let Some(bus) = &self.bus {
            bus.publish("order.update", BusEvent::OrderUpdate(order.clone()));
        }
    }

    fn publish_fill(&self, order: &Order, price: Decimal, size: Decimal, commission: Decimal) {
        if let Some(bus) = &self.bus {
            let trade = hq_core::types::Trade {
                pair: order.pair.clone(),
                side: order.side,
                price,
                size,
                commission,
                exchange_order_id: order.exchange_order_id,
                reduce_only: order.reduce_only,
                timestamp: order.updated_at,
            };
            bus.publish("order.filled", BusEvent::OrderFill(trade));
        }
    }

    /// Build a client id, store a `Pending` order, delegate to the exchange, then merge the
    /// response back in. A rejection is recorded on the stored order, not just returned.
    pub async fn submit_order(&self, mut request: OrderRequest) -> Result<Order> {
        request.validate()?;
        let client_id = self.generate_client_id();
        request.client_order_id = Some(client_id.clone());

        let pending = Order::pending(request.clone(), client_id.clone(), now());
        self.store.lock().insert(pending);

        match self.exchange.create_order(request).await {
            Ok(response) => {
                self.store.lock().update_by_client_id(&client_id, |order| {
                    order.exchange_order_id = response.exchange_order_id;
                    order.status = response.status;
                    order.filled_amount = response.filled_amount;
                    order.avg_fill_price = response.avg_fill_price;
                    order.commission = response.commission;
                    order.error_message = response.error_message.clone();
                    order.updated_at = now();
                });

                let stored = self
                    .store
                    .lock()
                    .get_by_client_id(&client_id)
                    .cloned()
                    .expect("just inserted");
                self.publish_update(&stored);
                if stored.filled_amount > Decimal::ZERO {
                    let price = stored.avg_fill_price.unwrap_or(Decimal::ZERO);
                    self.publish_fill(&stored, price, stored.filled_amount, stored.commission);
                }
                Ok(stored)
            }
            Err(err) => {
                self.store.lock().update_by_client_id(&client_id, |order| {
                    order.status = OrderStatus::Rejected;
                    order.error_message = Some(SmolStr::new(err.to_string()));
                    order.updated_at = now();
                });
                if let Some(stored) = self.store.lock().get_by_client_id(&client_id).cloned() {
                    self.publish_update(&stored);
                }
                Err(err)
            }
        }
    }

    pub async fn cancel_order(&self, pair: &TradingPair, exchange_order_id: u64) -> Result<()> {
        let is_active = self
            .store
            .lock()
            .get_by_exchange_id(exchange_order_id)
            .map(|order| order.is_active())
            .unwrap_or(false);
        if !is_active {
            return Err(hq_core::error::BusinessError::OrderNotCancellable.into());
        }

        self.exchange.cancel_order(pair, exchange_order_id).await?;
        self.store
            .lock()
            .update_by_exchange_id(exchange_order_id, |order| {
                order.status = OrderStatus::Cancelled;
                order.updated_at = now();
            });

        if let Some(stored) = self
            .store
            .lock()
            .get_by_exchange_id(exchange_order_id)
            .cloned()
        {
            self.publish_update(&stored);
        }
        Ok(())
    }

    pub async fn cancel_order_by_cloid(&self, pair: &TradingPair, cloid: &str) -> Result<()> {
        let exchange_order_id = self
            .store
            .lock()
            .get_by_client_id(cloid)
            .and_then(|order| order.exchange_order_id)
            .ok_or(hq_core::error::BusinessError::OrderNotFound)?;
        self.cancel_order(pair, exchange_order_id).await
    }

    /// Cancel every order in `exchange_order_ids`, aggregating per-item success/failure.
    pub async fn cancel_orders(
        &self,
        pair: &TradingPair,
        exchange_order_ids: &[u64],
    ) -> Vec<CancelOutcome> {
        let mut outcomes = Vec::with_capacity(exchange_order_ids.len());
        for &id in exchange_order_ids {
            let result = self.cancel_order(pair, id).await;
            outcomes.push(CancelOutcome {
                exchange_order_id: id,
                result,
            });
        }
        outcomes
    }

    /// Refetch an order from the venue and reconcile it into the store under the same
    /// forward-only rule as [`Self::handle_order_update`].
    pub async fn refresh_order_status(
        &self,
        pair: &TradingPair,
        exchange_order_id: u64,
    ) -> Result<Order> {
        let fetched = self.exchange.get_order(pair, exchange_order_id).await?;
        self.reconcile_status(exchange_order_id, fetched.status, fetched.updated_at);
        self.store
            .lock()
            .get_by_exchange_id(exchange_order_id)
            .cloned()
            .ok_or_else(|| hq_core::error::BusinessError::OrderNotFound.into())
    }

    pub fn get_active_orders(&self) -> Vec<Order> {
        self.store.lock().active_orders()
    }

    pub fn get_order_history(&self, pair: Option<&TradingPair>, limit: Option<usize>) -> Vec<Order> {
        self.store.lock().history_orders(pair, limit)
    }

    pub fn get_by_client_id(&self, client_id: &str) -> Option<Order> {
        self.store.lock().get_by_client_id(client_id).cloned()
    }

    pub fn get_by_exchange_id(&self, exchange_order_id: u64) -> Option<Order> {
        self.store.lock().get_by_exchange_id(exchange_order_id).cloned()
    }

    pub fn handle_user_event(&self, event: UserEvent) {
        match event {
            UserEvent::Fill(fill) => self.handle_user_fill(fill),
            UserEvent::OrderUpdate(update) => self.handle_order_update(update),
        }
    }

    /// Accumulate a partial/full fill: size-weighted average price, commission, and the
    /// `open -> partially_filled -> filled` transition as the remainder reaches zero.
    pub fn handle_user_fill(&self, fill: UserFill) {
        let Some(order) = self.get_by_exchange_id(fill.exchange_order_id) else {
            warn!(
                exchange_order_id = fill.exchange_order_id,
                "fill for unknown order dropped"
            );
            return;
        };
        if order.status.is_terminal() && order.status != OrderStatus::PartiallyFilled {
            warn!(
                exchange_order_id = fill.exchange_order_id,
                "fill for already-terminal order dropped"
            );
            return;
        }

        let prior_filled = order.filled_amount;
        let candidate_filled = prior_filled + fill.size;

        self.store
            .lock()
            .update_by_exchange_id(fill.exchange_order_id, |order| {
                let new_filled = if candidate_filled < order.filled_amount {
                    warn!(
                        exchange_order_id = fill.exchange_order_id,
                        prior = %order.filled_amount,
                        candidate = %candidate_filled,
                        "fill would regress cumulative filled amount, keeping the maximum"
                    );
                    order.filled_amount
                } else {
                    candidate_filled
                };

                let prior_notional = order.avg_fill_price.unwrap_or(Decimal::ZERO) * prior_filled;
                let new_notional = prior_notional + fill.price * fill.size;
                order.avg_fill_price = if new_filled > Decimal::ZERO {
                    Some(new_notional / new_filled)
                } else {
                    order.avg_fill_price
                };
                order.filled_amount = new_filled;
                order.commission += fill.commission;
                order.status = if new_filled >= order.amount {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };
                order.updated_at = fill.timestamp;
            });

        if let Some(stored) = self.get_by_exchange_id(fill.exchange_order_id) {
            self.publish_update(&stored);
            self.publish_fill(&stored, fill.price, fill.size, fill.commission);
        }
    }

    /// Apply a venue order-status push through the same forward-only lattice as HTTP
    /// reconciliation (spec §4.8 "Reconciliation rule").
    pub fn handle_order_update(&self, update: VenueOrderUpdate) {
        self.reconcile_status(update.exchange_order_id, update.status, update.timestamp);
    }

    fn reconcile_status(&self, exchange_order_id: u64, status: OrderStatus, timestamp: Timestamp) {
        let Some(order) = self.get_by_exchange_id(exchange_order_id) else {
            warn!(exchange_order_id, "status update for unknown order dropped");
            return;
        };

        if timestamp < order.updated_at {
            warn!(exchange_order_id, "status update older than stored state, dropped");
            return;
        }
        if !order.status.can_transition_to(status) {
            warn!(
                exchange_order_id,
                from = ?order.status,
                to = ?status,
                "status regression dropped"
            );
            return;
        }

        self.store
            .lock()
            .update_by_exchange_id(exchange_order_id, |order| {
                order.status = status;
                order.updated_at = timestamp;
            });
        if let Some(stored) = self.get_by_exchange_id(exchange_order_id) {
            info!(exchange_order_id, status = ?stored.status, "order status reconciled");
            self.publish_update(&stored);
        }
    }
}
