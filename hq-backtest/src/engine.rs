//! Deterministic event-driven historical replay (spec §4.13). Iterates candles in strict
//! timestamp order, applies fills through the same [`hq_position::PositionTracker`]
//! contract live execution uses, and force-closes any remaining position at the final
//! candle's close.

use crate::candle::Candle;
use crate::executor::OrderExecutor;
use crate::stats::{self, EquityPoint, Metrics};
use crate::strategy::Strategy;
use async_trait::async_trait;
use hq_core::time::Timestamp;
use hq_core::types::{Balance, Order, OrderRequest, Position, Side, Ticker, TradingPair};
use hq_core::Result;
use hq_exchange::exchange::OrderBookSnapshot;
use hq_exchange::Exchange;
use hq_position::PositionTracker;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The backtest engine never submits a live order; this only exists so
/// [`PositionTracker::new`] has a handle to hold. Every method is unreachable because the
/// engine drives positions through `apply_fill`/`update_mark_prices` directly.
struct NullExchange;

#[async_trait]
impl Exchange for NullExchange {
    fn name(&self) -> &'static str {
        "backtest"
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
        unimplemented!("backtest engine never queries a venue")
    }
    async fn get_orderbook(&self, _pair: &TradingPair, _depth: usize) -> Result<OrderBookSnapshot> {
        unimplemented!("backtest engine never queries a venue")
    }
    async fn create_order(&self, _request: OrderRequest) -> Result<Order> {
        unimplemented!("backtest engine never submits a live order")
    }
    async fn cancel_order(&self, _pair: &TradingPair, _id: u64) -> Result<()> {
        unimplemented!("backtest engine never submits a live order")
    }
    async fn cancel_all_orders(&self, _pair: &TradingPair) -> Result<u64> {
        unimplemented!("backtest engine never submits a live order")
    }
    async fn get_order(&self, _pair: &TradingPair, _id: u64) -> Result<Order> {
        unimplemented!("backtest engine never submits a live order")
    }
    async fn get_balance(&self, _asset: &str) -> Result<Balance> {
        unimplemented!("backtest engine never queries a venue")
    }
    async fn get_positions(&self) -> Result<Vec<Position>> {
        unimplemented!("backtest engine never queries a venue")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: Decimal,
    pub slippage: Decimal,
    pub commission_rate: Decimal,
}

/// One completed round trip: an entry fill followed by an exit fill on the same size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub pair: TradingPair,
    pub side: Side,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    pub commission: Decimal,
    pub gross_pnl: Decimal,
    pub net_pnl: Decimal,
    pub entry_ts: Timestamp,
    pub exit_ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub config: BacktestConfig,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
}

struct OpenTrade {
    side: Side,
    entry_price: Decimal,
    entry_commission: Decimal,
    size: Decimal,
    entry_ts: Timestamp,
}

pub struct BacktestEngine {
    executor: OrderExecutor,
    tracker: PositionTracker,
}

impl BacktestEngine {
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            executor: OrderExecutor::new(config.slippage, config.commission_rate),
            tracker: PositionTracker::new(Arc::new(NullExchange)),
        }
    }

    /// Run the full candle series for `pair` against `strategy`.
    pub fn run(
        candles: &[Candle],
        strategy: &mut dyn Strategy,
        pair: TradingPair,
        config: BacktestConfig,
    ) -> BacktestResult {
        let engine = Self::new(&config);
        let mut cash = config.initial_capital;
        let mut open_trade: Option<OpenTrade> = None;
        let mut trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(candles.len());

        for i in 0..candles.len() {
            let candle = &candles[i];
            let visible = &candles[..=i];

            if engine.tracker.get_position(&pair).is_some() {
                let mut marks = std::collections::HashMap::new();
                marks.insert(pair.clone(), candle.close);
                engine.tracker.update_mark_prices(&marks);
            }

            if open_trade.is_some() {
                if strategy.exit_signal(visible) {
                    let closing = open_trade.take().unwrap();
                    let fill = engine.executor.fill(closing.side.opposite(), candle.close, closing.size);
                    engine.tracker.apply_fill(&hq_core::types::Trade {
                        pair: pair.clone(),
                        side: closing.side.opposite(),
                        price: fill.price,
                        size: fill.size,
                        commission: fill.commission,
                        exchange_order_id: None,
                        reduce_only: true,
                        timestamp: candle.timestamp,
                    });

                    let diff = fill.price - closing.entry_price;
                    let gross = match closing.side {
                        Side::Buy => diff * closing.size,
                        Side::Sell => -diff * closing.size,
                    };
                    let total_commission = closing.entry_commission + fill.commission;
                    let net = gross - total_commission;
                    cash += net;

                    trades.push(ClosedTrade {
                        pair: pair.clone(),
                        side: closing.side,
                        entry_price: closing.entry_price,
                        exit_price: fill.price,
                        size: closing.size,
                        commission: total_commission,
                        gross_pnl: gross,
                        net_pnl: net,
                        entry_ts: closing.entry_ts,
                        exit_ts: candle.timestamp,
                    });
                }
            } else if let Some(signal) = strategy.entry_signal(visible) {
                let fill = engine.executor.fill(signal.side, candle.close, signal.size);
                engine.tracker.apply_fill(&hq_core::types::Trade {
                    pair: pair.clone(),
                    side: signal.side,
                    price: fill.price,
                    size: fill.size,
                    commission: fill.commission,
                    exchange_order_id: None,
                    reduce_only: false,
                    timestamp: candle.timestamp,
                });
                open_trade = Some(OpenTrade {
                    side: signal.side,
                    entry_price: fill.price,
                    entry_commission: fill.commission,
                    size: fill.size,
                    entry_ts: candle.timestamp,
                });
            }

            let unrealized = engine
                .tracker
                .get_position(&pair)
                .map(|p| p.unrealized_pnl)
                .unwrap_or(Decimal::ZERO);
            equity_curve.push(EquityPoint {
                ts: candle.timestamp,
                equity: cash + unrealized,
            });
        }

        // Force-close any remaining position at the last candle's close.
        if let (Some(closing), Some(last)) = (open_trade.take(), candles.last()) {
            let fill = engine
                .executor
                .fill(closing.side.opposite(), last.close, closing.size);
            engine.tracker.apply_fill(&hq_core::types::Trade {
                pair: pair.clone(),
                side: closing.side.opposite(),
                price: fill.price,
                size: fill.size,
                commission: fill.commission,
                exchange_order_id: None,
                reduce_only: true,
                timestamp: last.timestamp,
            });

            let diff = fill.price - closing.entry_price;
            let gross = match closing.side {
                Side::Buy => diff * closing.size,
                Side::Sell => -diff * closing.size,
            };
            let total_commission = closing.entry_commission + fill.commission;
            let net = gross - total_commission;
            cash += net;

            trades.push(ClosedTrade {
                pair: pair.clone(),
                side: closing.side,
                entry_price: closing.entry_price,
                exit_price: fill.price,
                size: closing.size,
                commission: total_commission,
                gross_pnl: gross,
                net_pnl: net,
                entry_ts: closing.entry_ts,
                exit_ts: last.timestamp,
            });

            if let Some(last_point) = equity_curve.last_mut() {
                last_point.equity = cash;
            }
        }

        let metrics = stats::compute(&trades, &equity_curve);

        BacktestResult {
            config,
            trades,
            equity_curve,
            metrics,
        }
    }
}
