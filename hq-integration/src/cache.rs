//! Latest-value store for market data (spec §4.10): one [`Ticker`] and one partial
//! candle per instrument, single-writer/multiple-reader, copy-on-read snapshots.

use crate::bus::{BusEvent, MessageBus};
use hq_core::time::Timestamp;
use hq_core::types::{Ticker, TradingPair};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// A partial (in-progress) candle being built up from incoming trades/quotes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialCandle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub opened_at: Timestamp,
}

impl PartialCandle {
    pub fn open(price: Decimal, volume: Decimal, opened_at: Timestamp) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
            opened_at,
        }
    }

    pub fn update(&mut self, price: Decimal, volume: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += volume;
    }
}

#[derive(Default)]
struct CacheInner {
    tickers: HashMap<TradingPair, Ticker>,
    candles: HashMap<TradingPair, PartialCandle>,
}

/// Latest-value market-data cache. Readers get an owned copy, so they never observe a
/// write in progress.
pub struct Cache {
    inner: RwLock<CacheInner>,
    notify_bus: Option<Arc<MessageBus>>,
}

impl Cache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            notify_bus: None,
        }
    }

    /// Re-publish every update onto `bus` under `market_data.quote`.
    pub fn with_notifications(bus: Arc<MessageBus>) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            notify_bus: Some(bus),
        }
    }

    pub fn update_ticker(&self, ticker: Ticker) {
        let pair = ticker.pair.clone();
        self.inner.write().tickers.insert(pair, ticker.clone());
        if let Some(bus) = &self.notify_bus {
            bus.publish("market_data.quote", BusEvent::Quote(ticker));
        }
    }

    pub fn update_candle(&self, pair: TradingPair, candle: PartialCandle) {
        self.inner.write().candles.insert(pair, candle);
    }

    pub fn ticker(&self, pair: &TradingPair) -> Option<Ticker> {
        self.inner.read().tickers.get(pair).cloned()
    }

    pub fn candle(&self, pair: &TradingPair) -> Option<PartialCandle> {
        self.inner.read().candles.get(pair).copied()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
