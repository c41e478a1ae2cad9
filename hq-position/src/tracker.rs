//! `positions: map[coin -> Position]` plus the current `Account` (spec §4.9). At most one
//! open position per pair; a fill through a short (or through a long) flips it, splitting
//! into a realized-PnL close on the old side plus a fresh open on the residual.

use hq_core::types::{Account, Position, PositionSide, Side, TradingPair, Trade};
use hq_core::Result;
use hq_exchange::Exchange;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct PositionTracker {
    exchange: Arc<dyn Exchange>,
    positions: RwLock<HashMap<TradingPair, Position>>,
    account: RwLock<Account>,
}

impl PositionTracker {
    pub fn new(exchange: Arc<dyn Exchange>) -> Self {
        Self {
            exchange,
            positions: RwLock::new(HashMap::new()),
            account: RwLock::new(Account::default()),
        }
    }

    /// Fetch venue `clearinghouseState` and replace both maps atomically.
    pub async fn sync_account_state(&self) -> Result<()> {
        let positions = self.exchange.get_positions().await?;
        let mut replaced = HashMap::with_capacity(positions.len());
        for position in positions {
            replaced.insert(position.pair.clone(), position);
        }
        *self.positions.write() = replaced;
        Ok(())
    }

    pub fn get_position(&self, pair: &TradingPair) -> Option<Position> {
        self.positions.read().get(pair).cloned()
    }

    pub fn get_all_positions(&self) -> Vec<Position> {
        self.positions.read().values().cloned().collect()
    }

    pub fn account(&self) -> Account {
        self.account.read().clone()
    }

    /// Recompute every position's `unrealized_pnl` against `prices` (missing pairs are
    /// left untouched).
    pub fn update_mark_prices(&self, prices: &HashMap<TradingPair, Decimal>) {
        let mut positions = self.positions.write();
        for (pair, position) in positions.iter_mut() {
            if let Some(&mark) = prices.get(pair) {
                position.recompute_unrealized_pnl(mark);
            }
        }
    }

    /// Apply an incremental fill: opens, adds to, reduces, closes, or flips the position on
    /// `fill.pair` depending on direction relative to any existing position.
    pub fn apply_fill(&self, fill: &Trade) {
        let mut positions = self.positions.write();
        let existing = positions.get(&fill.pair).cloned();

        let fill_side = match fill.side {
            Side::Buy => PositionSide::Long,
            Side::Sell => PositionSide::Short,
        };

        let Some(mut position) = existing else {
            positions.insert(fill.pair.clone(), open_position(fill, fill_side));
            return;
        };

        if position.side == fill_side {
            let new_size = position.size + fill.size;
            let new_entry = (position.entry_price * position.size + fill.price * fill.size)
                / new_size;
            position.size = new_size;
            position.entry_price = new_entry;
            positions.insert(fill.pair.clone(), position);
            return;
        }

        // Opposite-direction fill: reduces, closes, or flips.
        let realized_on_closed = realized_pnl(&position, fill.price, position.size.min(fill.size));
        drop(positions);
        self.account.write().total_realized_pnl += realized_on_closed;
        let mut positions = self.positions.write();

        if fill.size < position.size {
            position.size -= fill.size;
            positions.insert(fill.pair.clone(), position);
        } else if fill.size == position.size {
            positions.remove(&fill.pair);
        } else if fill.reduce_only {
            // A reduce-only fill can never flip; the excess size is simply not absorbed.
            info!(pair = %fill.pair, "reduce-only fill exceeded position size, excess dropped");
            positions.remove(&fill.pair);
        } else {
            let residual = fill.size - position.size;
            positions.insert(fill.pair.clone(), open_position_with(&fill.pair, fill_side, residual, fill.price));
        }
    }
}

fn open_position(fill: &Trade, side: PositionSide) -> Position {
    open_position_with(&fill.pair, side, fill.size, fill.price)
}

fn open_position_with(pair: &TradingPair, side: PositionSide, size: Decimal, price: Decimal) -> Position {
    Position {
        pair: pair.clone(),
        side,
        size,
        entry_price: price,
        mark_price: None,
        liquidation_price: None,
        unrealized_pnl: Decimal::ZERO,
        leverage: Decimal::ONE,
        margin_used: Decimal::ZERO,
    }
}

/// `(exit - entry) * closed_size`, negated for shorts.
fn realized_pnl(position: &Position, exit_price: Decimal, closed_size: Decimal) -> Decimal {
    let diff = exit_price - position.entry_price;
    match position.side {
        PositionSide::Long => diff * closed_size,
        PositionSide::Short => -diff * closed_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hq_core::time::Timestamp;
    use hq_core::types::{Balance, Order, OrderRequest, Ticker};
    use hq_exchange::exchange::OrderBookSnapshot;
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
            Ok(Vec::new())
        }
    }

    fn pair() -> TradingPair {
        TradingPair::new("BTC", "USDC")
    }

    fn fill(side: Side, price: Decimal, size: Decimal, reduce_only: bool) -> Trade {
        Trade {
            pair: pair(),
            side,
            price,
            size,
            commission: Decimal::ZERO,
            exchange_order_id: None,
            reduce_only,
            timestamp: Timestamp::from_millis(0),
        }
    }

    fn tracker() -> PositionTracker {
        PositionTracker::new(Arc::new(StubExchange))
    }

    // S4 - position open then close.
    #[test]
    fn scenario_s4_open_then_close_realizes_pnl() {
        let tracker = tracker();
        tracker.apply_fill(&fill(Side::Buy, dec!(88000), dec!(0.001), false));

        let position = tracker.get_position(&pair()).unwrap();
        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.size, dec!(0.001));
        assert_eq!(position.entry_price, dec!(88000));

        tracker.apply_fill(&fill(Side::Sell, dec!(88500), dec!(0.001), true));

        assert!(tracker.get_position(&pair()).is_none());
        assert_eq!(tracker.account().total_realized_pnl, dec!(0.5));
    }

    #[test]
    fn adding_to_same_side_uses_size_weighted_entry() {
        let tracker = tracker();
        tracker.apply_fill(&fill(Side::Buy, dec!(100), dec!(1), false));
        tracker.apply_fill(&fill(Side::Buy, dec!(110), dec!(1), false));

        let position = tracker.get_position(&pair()).unwrap();
        assert_eq!(position.size, dec!(2));
        assert_eq!(position.entry_price, dec!(105));
    }

    #[test]
    fn opposite_fill_larger_than_position_flips_side() {
        let tracker = tracker();
        tracker.apply_fill(&fill(Side::Buy, dec!(100), dec!(1), false));
        tracker.apply_fill(&fill(Side::Sell, dec!(120), dec!(3), false));

        let position = tracker.get_position(&pair()).unwrap();
        assert_eq!(position.side, PositionSide::Short);
        assert_eq!(position.size, dec!(2));
        assert_eq!(position.entry_price, dec!(120));
        assert_eq!(tracker.account().total_realized_pnl, dec!(20));
    }

    #[test]
    fn update_mark_prices_recomputes_unrealized_pnl() {
        let tracker = tracker();
        tracker.apply_fill(&fill(Side::Buy, dec!(100), dec!(1), false));

        let mut marks = HashMap::new();
        marks.insert(pair(), dec!(110));
        tracker.update_mark_prices(&marks);

        let position = tracker.get_position(&pair()).unwrap();
        assert_eq!(position.unrealized_pnl, dec!(10));
        assert_eq!(position.mark_price, Some(dec!(110)));
    }
}
