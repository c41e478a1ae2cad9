//! Price-level order book ladder (spec §4.7): two sorted ladders, snapshot + incremental
//! delta updates, O(1) best-bid/ask/mid/spread queries.

use crate::time::Timestamp;
use crate::types::{OrderBookLevel, TradingPair};
use rust_decimal::Decimal;

/// One side of the book: bids sorted price-descending, asks price-ascending. Both sides
/// share this representation; the sort direction is enforced by [`Ladder::upsert`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ladder {
    levels: Vec<OrderBookLevel>,
    descending: bool,
}

impl Ladder {
    fn new(descending: bool) -> Self {
        Self {
            levels: Vec::new(),
            descending,
        }
    }

    fn replace(&mut self, mut levels: Vec<OrderBookLevel>) {
        if self.descending {
            levels.sort_by(|a, b| b.price.cmp(&a.price));
        } else {
            levels.sort_by(|a, b| a.price.cmp(&b.price));
        }
        self.levels = levels;
    }

    /// Insert, update, or (if `size == 0`) remove the level at `level.price`, preserving
    /// sort order.
    fn apply(&mut self, level: OrderBookLevel) {
        let pos = self.levels.iter().position(|l| l.price == level.price);

        if level.size.is_zero() {
            if let Some(pos) = pos {
                self.levels.remove(pos);
            }
            return;
        }

        match pos {
            Some(pos) => self.levels[pos] = level,
            None => {
                let insert_at = self
                    .levels
                    .iter()
                    .position(|l| {
                        if self.descending {
                            l.price < level.price
                        } else {
                            l.price > level.price
                        }
                    })
                    .unwrap_or(self.levels.len());
                self.levels.insert(insert_at, level);
            }
        }
    }

    pub fn levels(&self) -> &[OrderBookLevel] {
        &self.levels
    }

    pub fn best(&self) -> Option<OrderBookLevel> {
        self.levels.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// A [`TradingPair`]'s order book: bid/ask ladders plus the timestamp of the last
/// accepted update.
#[derive(Debug, Clone)]
pub struct OrderBook {
    pair: TradingPair,
    bids: Ladder,
    asks: Ladder,
    updated_at: Option<Timestamp>,
}

impl OrderBook {
    pub fn new(pair: TradingPair) -> Self {
        Self {
            pair,
            bids: Ladder::new(true),
            asks: Ladder::new(false),
            updated_at: None,
        }
    }

    pub fn pair(&self) -> &TradingPair {
        &self.pair
    }

    /// Replace both ladders atomically, provided `ts` is not older than the book's
    /// current timestamp (no rewinding).
    pub fn apply_snapshot(
        &mut self,
        bids: Vec<OrderBookLevel>,
        asks: Vec<OrderBookLevel>,
        ts: Timestamp,
    ) {
        if !self.accepts(ts) {
            return;
        }
        self.bids.replace(bids);
        self.asks.replace(asks);
        self.updated_at = Some(ts);
        debug_assert!(self.is_crossed_or_empty());
    }

    /// Upsert (or, if `level.size == 0`, remove) a single level on `side`.
    pub fn apply_delta(&mut self, side: crate::types::Side, level: OrderBookLevel, ts: Timestamp) {
        if !self.accepts(ts) {
            return;
        }
        match side {
            crate::types::Side::Buy => self.bids.apply(level),
            crate::types::Side::Sell => self.asks.apply(level),
        }
        self.updated_at = Some(ts);
        debug_assert!(self.is_crossed_or_empty());
    }

    fn accepts(&self, ts: Timestamp) -> bool {
        match self.updated_at {
            Some(current) => ts >= current,
            None => true,
        }
    }

    fn is_crossed_or_empty(&self) -> bool {
        match (self.bids.best(), self.asks.best()) {
            (Some(bid), Some(ask)) => bid.price < ask.price,
            _ => true,
        }
    }

    pub fn best_bid(&self) -> Option<OrderBookLevel> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<OrderBookLevel> {
        self.asks.best()
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.best_bid()?.price;
        let ask = self.best_ask()?.price;
        Some((bid + ask) / Decimal::TWO)
    }

    pub fn spread(&self) -> Option<Decimal> {
        let bid = self.best_bid()?.price;
        let ask = self.best_ask()?.price;
        Some(ask - bid)
    }

    pub fn bids(&self) -> &[OrderBookLevel] {
        self.bids.levels()
    }

    pub fn asks(&self) -> &[OrderBookLevel] {
        self.asks.levels()
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }
}
