//! In-memory paper trading simulator (spec §4.14): implements the [`Exchange`] capability
//! using the live [`Cache`]'s latest quote as the reference price, the same
//! slippage/commission model as the backtest engine, and the same order-store / position-
//! tracker contracts live execution uses.
//!
//! Simplification (recorded in the grounding ledger): a single quote-asset [`Balance`] with
//! no locked-margin accounting. Pre-trade checks require `cash >= notional + commission`
//! without reserving it afterward, since the data model only specifies `{total, available,
//! locked}` and not a leverage/margin schedule to drive `locked`.
//!
//! Reuses [`hq_backtest::EquityPoint`] for its own equity curve so the same metrics suite
//! (`hq_backtest::stats`) can be run over either engine's output.

use async_trait::async_trait;
use hq_backtest::{EquityPoint, OrderExecutor};
use hq_core::error::{BusinessError, DataError};
use hq_core::time::Timestamp;
use hq_core::types::{
    Balance, Order, OrderBookLevel, OrderRequest, OrderStatus, OrderType, Position, Side, Ticker,
    Trade, TradingPair,
};
use hq_core::Result;
use hq_exchange::exchange::OrderBookSnapshot;
use hq_exchange::Exchange;
use hq_integration::Cache;
use hq_order::OrderStore;
use hq_position::PositionTracker;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

fn now() -> Timestamp {
    Timestamp::from_datetime(chrono::Utc::now())
}

/// Paper trading never calls out to a venue; this exists only so [`PositionTracker::new`]
/// has an `Exchange` handle. Unreachable in normal operation since the simulator drives
/// positions through `apply_fill`/`update_mark_prices` directly.
struct NullExchange;

#[async_trait]
impl Exchange for NullExchange {
    fn name(&self) -> &'static str {
        "paper-backing"
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
        unimplemented!()
    }
    async fn cancel_all_orders(&self, _pair: &TradingPair) -> Result<u64> {
        unimplemented!()
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

pub struct PaperExchange {
    cache: Arc<Cache>,
    executor: OrderExecutor,
    tracker: PositionTracker,
    store: Mutex<OrderStore>,
    quote_asset: SmolStr,
    cash: Mutex<Decimal>,
    next_order_id: AtomicU64,
    equity_curve: Mutex<Vec<EquityPoint>>,
}

impl PaperExchange {
    pub fn new(
        cache: Arc<Cache>,
        quote_asset: impl Into<SmolStr>,
        initial_balance: Decimal,
        slippage: Decimal,
        commission_rate: Decimal,
    ) -> Self {
        Self {
            cache,
            executor: OrderExecutor::new(slippage, commission_rate),
            tracker: PositionTracker::new(Arc::new(NullExchange)),
            store: Mutex::new(OrderStore::new()),
            quote_asset: quote_asset.into(),
            cash: Mutex::new(initial_balance),
            next_order_id: AtomicU64::new(1),
            equity_curve: Mutex::new(Vec::new()),
        }
    }

    fn reference_price(&self, pair: &TradingPair, side: Side) -> Result<Decimal> {
        let ticker = self
            .cache
            .ticker(pair)
            .ok_or_else(|| DataError::NoPriceAvailable(pair.symbol().to_string()))?;
        Ok(match side {
            Side::Buy => ticker.ask,
            Side::Sell => ticker.bid,
        })
    }

    /// Apply `fill` through the position tracker and cash ledger, returning the realized
    /// PnL this fill produced (zero on an opening/adding fill).
    ///
    /// Cash only ever moves by `-commission` plus whatever PnL the tracker just realized,
    /// mirroring the backtest engine's cash model: opening a position consumes no cash
    /// beyond its commission, since margin/leverage accounting isn't part of this data
    /// model (see the pre-trade check in `create_order`, which is conservative instead).
    fn settle_fill(
        &self,
        pair: &TradingPair,
        side: Side,
        fill_price: Decimal,
        size: Decimal,
        commission: Decimal,
        reduce_only: bool,
        ts: Timestamp,
    ) -> Decimal {
        let realized_before = self.tracker.account().total_realized_pnl;
        self.tracker.apply_fill(&Trade {
            pair: pair.clone(),
            side,
            price: fill_price,
            size,
            commission,
            exchange_order_id: None,
            reduce_only,
            timestamp: ts,
        });
        let realized_after = self.tracker.account().total_realized_pnl;
        let realized_delta = realized_after - realized_before;

        let mut cash = self.cash.lock();
        *cash += realized_delta;
        *cash -= commission;
        realized_delta
    }

    fn record_equity_snapshot(&self, ts: Timestamp) {
        let unrealized: Decimal = self
            .tracker
            .get_all_positions()
            .iter()
            .map(|p| p.unrealized_pnl)
            .sum();
        let equity = *self.cash.lock() + unrealized;
        self.equity_curve.lock().push(EquityPoint { ts, equity });
    }

    /// Poll every deferred limit order against a fresh quote, filling any that now cross,
    /// and mark-to-market open positions for this pair.
    pub fn on_quote(&self, ticker: &Ticker) {
        let mut marks = std::collections::HashMap::new();
        marks.insert(ticker.pair.clone(), ticker.mid());
        self.tracker.update_mark_prices(&marks);

        let candidates: Vec<Order> = self
            .store
            .lock()
            .active_orders()
            .into_iter()
            .filter(|o| o.pair == ticker.pair && o.order_type == OrderType::Limit)
            .collect();

        for order in candidates {
            let limit_price = match order.price {
                Some(p) => p,
                None => continue,
            };
            let crosses = match order.side {
                Side::Buy => ticker.ask <= limit_price,
                Side::Sell => ticker.bid >= limit_price,
            };
            if !crosses {
                continue;
            }

            let commission = limit_price * order.amount * self.executor.commission_rate;
            let ts = now();
            self.settle_fill(
                &order.pair,
                order.side,
                limit_price,
                order.amount,
                commission,
                order.reduce_only,
                ts,
            );

            let client_id = match order.client_order_id.clone() {
                Some(id) => id,
                None => continue,
            };
            self.store.lock().update_by_client_id(&client_id, |o| {
                o.status = OrderStatus::Filled;
                o.filled_amount = o.amount;
                o.avg_fill_price = Some(limit_price);
                o.commission += commission;
                o.updated_at = ts;
            });
            info!(client_id = %client_id, price = %limit_price, "paper limit order filled");
        }

        self.record_equity_snapshot(now());
    }

    pub fn equity_curve(&self) -> Vec<EquityPoint> {
        self.equity_curve.lock().clone()
    }

    fn next_client_id(&self) -> SmolStr {
        let seq = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        SmolStr::new(format!("paper-{seq}"))
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    fn name(&self) -> &'static str {
        "paper"
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

    async fn get_ticker(&self, pair: &TradingPair) -> Result<Ticker> {
        self.cache
            .ticker(pair)
            .ok_or_else(|| DataError::NoPriceAvailable(pair.symbol().to_string()).into())
    }

    async fn get_orderbook(&self, pair: &TradingPair, depth: usize) -> Result<OrderBookSnapshot> {
        let ticker = self.get_ticker(pair).await?;
        let level = |price: Decimal| OrderBookLevel {
            price,
            size: Decimal::ONE,
            num_orders: 1,
        };
        Ok(OrderBookSnapshot {
            pair: pair.clone(),
            bids: vec![level(ticker.bid)].into_iter().take(depth).collect(),
            asks: vec![level(ticker.ask)].into_iter().take(depth).collect(),
        })
    }

    async fn create_order(&self, request: OrderRequest) -> Result<Order> {
        request.validate().map_err(hq_core::Error::from)?;

        let client_id = self.next_client_id();
        let ts = now();
        let mut order = Order::pending(request.clone(), client_id.clone(), ts);
        order.exchange_order_id = Some(self.next_order_id.fetch_add(1, Ordering::Relaxed));

        let reference = self.reference_price(&request.pair, request.side)?;
        let immediate_price = match request.order_type {
            OrderType::Market => Some(reference),
            OrderType::Limit => {
                let limit_price = request.price.expect("validated limit order has a price");
                let crosses = match request.side {
                    Side::Buy => reference <= limit_price,
                    Side::Sell => reference >= limit_price,
                };
                crosses.then_some(limit_price)
            }
        };

        let Some(base_price) = immediate_price else {
            order.status = OrderStatus::Open;
            self.store.lock().insert(order.clone());
            return Ok(order);
        };

        let fill = if matches!(request.order_type, OrderType::Market) {
            self.executor.fill(request.side, base_price, request.amount)
        } else {
            hq_backtest::Fill {
                price: base_price,
                size: request.amount,
                commission: base_price * request.amount * self.executor.commission_rate,
                realized_pnl: Decimal::ZERO,
            }
        };

        if matches!(request.side, Side::Buy) {
            let required = fill.price * fill.size + fill.commission;
            if *self.cash.lock() < required {
                order.status = OrderStatus::Rejected;
                order.error_message = Some("insufficient balance".into());
                self.store.lock().insert(order.clone());
                return Err(BusinessError::InsufficientBalance.into());
            }
        }

        self.settle_fill(
            &request.pair,
            request.side,
            fill.price,
            fill.size,
            fill.commission,
            request.reduce_only,
            ts,
        );

        order.status = OrderStatus::Filled;
        order.filled_amount = fill.size;
        order.avg_fill_price = Some(fill.price);
        order.commission = fill.commission;
        order.updated_at = ts;
        self.store.lock().insert(order.clone());
        self.record_equity_snapshot(ts);

        Ok(order)
    }

    async fn cancel_order(&self, _pair: &TradingPair, exchange_order_id: u64) -> Result<()> {
        let mut store = self.store.lock();
        let was_active = store
            .get_by_exchange_id(exchange_order_id)
            .map(|o| o.is_active())
            .unwrap_or(false);
        if was_active {
            store.update_by_exchange_id(exchange_order_id, |order| {
                order.status = OrderStatus::Cancelled;
                order.updated_at = now();
            });
        } else {
            warn!(exchange_order_id, "cancel requested for inactive or unknown paper order");
        }
        Ok(())
    }

    async fn cancel_all_orders(&self, pair: &TradingPair) -> Result<u64> {
        let ids: Vec<u64> = self
            .store
            .lock()
            .active_orders()
            .into_iter()
            .filter(|o| &o.pair == pair)
            .filter_map(|o| o.exchange_order_id)
            .collect();

        for id in &ids {
            self.cancel_order(pair, *id).await?;
        }
        Ok(ids.len() as u64)
    }

    async fn get_order(&self, _pair: &TradingPair, exchange_order_id: u64) -> Result<Order> {
        self.store
            .lock()
            .get_by_exchange_id(exchange_order_id)
            .cloned()
            .ok_or_else(|| BusinessError::OrderNotFound.into())
    }

    async fn get_balance(&self, _asset: &str) -> Result<Balance> {
        let cash = *self.cash.lock();
        Ok(Balance::new(self.quote_asset.clone(), cash, Decimal::ZERO))
    }

    async fn get_positions(&self) -> Result<Vec<Position>> {
        Ok(self.tracker.get_all_positions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pair() -> TradingPair {
        TradingPair::new("BTC", "USDC")
    }

    fn ticker(bid: Decimal, ask: Decimal) -> Ticker {
        Ticker {
            pair: pair(),
            bid,
            ask,
            last: (bid + ask) / Decimal::TWO,
            volume_24h: Decimal::ZERO,
            timestamp: Timestamp::from_millis(0),
        }
    }

    fn market_request(side: Side, amount: Decimal) -> OrderRequest {
        OrderRequest {
            pair: pair(),
            side,
            order_type: OrderType::Market,
            amount,
            price: None,
            tif: hq_core::types::TimeInForce::Ioc,
            reduce_only: false,
            client_order_id: None,
        }
    }

    fn limit_request(side: Side, amount: Decimal, price: Decimal) -> OrderRequest {
        OrderRequest {
            pair: pair(),
            side,
            order_type: OrderType::Limit,
            amount,
            price: Some(price),
            tif: hq_core::types::TimeInForce::Gtc,
            reduce_only: false,
            client_order_id: None,
        }
    }

    fn sim(initial: Decimal) -> PaperExchange {
        let cache = Arc::new(Cache::new());
        cache.update_ticker(ticker(dec!(100), dec!(101)));
        PaperExchange::new(cache, "USDC", initial, Decimal::ZERO, dec!(0.001))
    }

    #[tokio::test]
    async fn market_buy_fills_immediately_at_ask_plus_commission() {
        let sim = sim(dec!(10000));
        let order = sim.create_order(market_request(Side::Buy, dec!(1))).await.unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.avg_fill_price, Some(dec!(101)));

        // Opening a position only costs its commission; cash isn't debited the full
        // notional since there is no margin/leverage schedule in this data model.
        let balance = sim.get_balance("USDC").await.unwrap();
        assert_eq!(balance.available, dec!(10000) - dec!(0.101));
    }

    #[tokio::test]
    async fn insufficient_balance_rejects_the_buy() {
        let sim = sim(dec!(10));
        let result = sim.create_order(market_request(Side::Buy, dec!(1))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn limit_order_not_crossing_is_deferred_then_fills_on_quote() {
        let sim = sim(dec!(10000));
        let order = sim
            .create_order(limit_request(Side::Buy, dec!(1), dec!(95)))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Open);

        // Quote does not cross yet.
        sim.on_quote(&ticker(dec!(96), dec!(97)));
        let still_open = sim.get_order(&pair(), order.exchange_order_id.unwrap()).await.unwrap();
        assert_eq!(still_open.status, OrderStatus::Open);

        // Ask drops to/through the limit price.
        sim.on_quote(&ticker(dec!(94), dec!(95)));
        let filled = sim.get_order(&pair(), order.exchange_order_id.unwrap()).await.unwrap();
        assert_eq!(filled.status, OrderStatus::Filled);
        assert_eq!(filled.avg_fill_price, Some(dec!(95)));
    }

    // Scenario S4 reused through the paper exchange's execution path.
    #[tokio::test]
    async fn closing_sell_realizes_pnl_into_cash() {
        let cache = Arc::new(Cache::new());
        cache.update_ticker(ticker(dec!(110), dec!(111)));
        let sim = PaperExchange::new(cache, "USDC", dec!(0), Decimal::ZERO, Decimal::ZERO);

        // Position opened directly via the tracker to isolate the realize-on-close path.
        sim.tracker.apply_fill(&Trade {
            pair: pair(),
            side: Side::Buy,
            price: dec!(100),
            size: dec!(1),
            commission: Decimal::ZERO,
            exchange_order_id: None,
            reduce_only: false,
            timestamp: Timestamp::from_millis(0),
        });

        let sell = sim.create_order(market_request(Side::Sell, dec!(1))).await.unwrap();
        assert_eq!(sell.status, OrderStatus::Filled);
        assert_eq!(*sim.cash.lock(), dec!(10));
        assert!(sim.tracker.get_position(&pair()).is_none());
    }
}
