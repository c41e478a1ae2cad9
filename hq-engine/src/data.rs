//! Normalizes venue market data into the shared [`Cache`], publishing through the bus as
//! it goes (spec §4.11).

use hq_core::time::Timestamp;
use hq_core::types::{Ticker, TradingPair};
use hq_exchange::hyperliquid::{venue_status, Hyperliquid, WsMessage};
use hq_integration::cache::PartialCandle;
use hq_integration::Cache;
use hq_order::manager::{OrderManager, UserFill, VenueOrderUpdate};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time counters for a [`DataEngine`]; cheap to snapshot, safe to read
/// concurrently with ingestion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DataEngineStats {
    pub quotes_processed: u64,
    pub candles_processed: u64,
}

/// Subscribes a connector's raw stream, normalizes it into unified types, and writes
/// through [`Cache`]. Holds no venue-specific state; connectors call `on_ticker`/
/// `on_trade` as frames arrive.
pub struct DataEngine {
    cache: Arc<Cache>,
    quotes_processed: AtomicU64,
    candles_processed: AtomicU64,
}

impl DataEngine {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self {
            cache,
            quotes_processed: AtomicU64::new(0),
            candles_processed: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Feed a normalized quote through the cache.
    pub fn on_ticker(&self, ticker: Ticker) {
        self.cache.update_ticker(ticker);
        self.quotes_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Feed a single trade print into the in-progress candle for `pair`, opening a new
    /// candle if none is building.
    pub fn on_trade(
        &self,
        pair: TradingPair,
        price: rust_decimal::Decimal,
        volume: rust_decimal::Decimal,
        ts: hq_core::time::Timestamp,
    ) {
        let mut candle = self
            .cache
            .candle(&pair)
            .unwrap_or_else(|| PartialCandle::open(price, volume, ts));
        candle.update(price, volume);
        self.cache.update_candle(pair, candle);
        self.candles_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> DataEngineStats {
        DataEngineStats {
            quotes_processed: self.quotes_processed.load(Ordering::Relaxed),
            candles_processed: self.candles_processed.load(Ordering::Relaxed),
        }
    }

    /// Start the connector's WebSocket feed (spec §4.5, §4.6), normalizing `l2Book`/
    /// `trades` through this cache and routing `orderUpdates`/`user` fills into
    /// `order_manager`.
    pub fn wire_hyperliquid(self: &Arc<Self>, connector: &Hyperliquid, order_manager: Arc<OrderManager>) {
        let engine = Arc::clone(self);
        connector.init_websocket(move |event| engine.dispatch_ws_event(event, &order_manager));
    }

    fn dispatch_ws_event(&self, event: WsMessage, order_manager: &OrderManager) {
        match event {
            WsMessage::L2Book(book) => {
                let (Some(bid), Some(ask)) = (book.levels[0].first(), book.levels[1].first()) else {
                    return;
                };
                self.on_ticker(Ticker {
                    pair: hq_core::symbol::SymbolMapper::from_hyperliquid(&book.coin),
                    bid: bid.price,
                    ask: ask.price,
                    last: (bid.price + ask.price) / Decimal::TWO,
                    volume_24h: Decimal::ZERO,
                    timestamp: Timestamp::from_millis(book.time as i64),
                });
            }
            WsMessage::Trades(trades) => {
                for trade in trades {
                    let pair = hq_core::symbol::SymbolMapper::from_hyperliquid(&trade.coin);
                    self.on_trade(pair, trade.px, trade.sz, Timestamp::from_millis(trade.time as i64));
                }
            }
            WsMessage::OrderUpdates(updates) => {
                for update in updates {
                    order_manager.handle_order_update(VenueOrderUpdate {
                        exchange_order_id: update.order.oid,
                        status: venue_status(&update.status),
                        timestamp: Timestamp::from_millis(update.status_timestamp as i64),
                    });
                }
            }
            WsMessage::User(user_event) => {
                for fill in user_event.fills {
                    order_manager.handle_user_fill(UserFill {
                        exchange_order_id: fill.oid,
                        price: fill.px,
                        size: fill.sz,
                        commission: fill.fee,
                        timestamp: Timestamp::from_millis(fill.time as i64),
                    });
                }
            }
            WsMessage::AllMids { .. } | WsMessage::SubscriptionResponse(_) => {}
            WsMessage::Error(message) => {
                tracing::warn!(message, "Hyperliquid WS error frame");
            }
        }
    }
}
