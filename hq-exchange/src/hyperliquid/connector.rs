//! `Exchange` implementation for Hyperliquid (spec §4.5). Owns its own REST client, asset
//! index, and signer; nothing here is shared with another connector instance.

use super::assets::AssetIndexMap;
use super::rest::RestClient;
use super::signer::{HmacSigner, Signer};
use super::wire::{
    ExchangeAction, ExchangeResponse, InfoRequest, L2BookResponse, MetaResponse, OrderStatusWire,
    OrderTypeWire, OrderWire, WsMessage,
};
use super::ws::{self, Subscription};
use crate::exchange::{Exchange, OrderBookSnapshot};
use async_trait::async_trait;
use hq_core::error::{ApiError, BusinessError, DataError};
use hq_core::symbol::SymbolMapper;
use hq_core::time::Timestamp;
use hq_core::types::{
    Balance, Order, OrderBookLevel, OrderRequest, OrderStatus, Position, PositionSide, Side,
    Ticker, TimeInForce, TradingPair,
};
use hq_core::Result;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Config surface consumed by the core (spec §4.5 "Config surface"): absence of
/// `api_secret` disables the signer and makes write paths fail with `SignerRequired`.
#[derive(Debug, Clone)]
pub struct HyperliquidConfig {
    pub user_address: String,
    pub api_secret: Option<String>,
    pub testnet: bool,
}

const MAINNET_URL: &str = "https://api.hyperliquid.xyz";
const TESTNET_URL: &str = "https://api.hyperliquid-testnet.xyz";
const MAINNET_WS_URL: &str = "wss://api.hyperliquid.xyz/ws";
const TESTNET_WS_URL: &str = "wss://api.hyperliquid-testnet.xyz/ws";

pub struct Hyperliquid {
    config: HyperliquidConfig,
    rest: RestClient,
    assets: AssetIndexMap,
    connected: AtomicBool,
    nonce: Mutex<u64>,
    ws_subscriptions: Arc<parking_lot::Mutex<Vec<Subscription>>>,
    ws_stop: Arc<AtomicBool>,
    ws_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Hyperliquid {
    pub fn create(config: HyperliquidConfig) -> Self {
        let base_url = if config.testnet { TESTNET_URL } else { MAINNET_URL };
        let signer: Option<Arc<dyn Signer>> = config
            .api_secret
            .as_ref()
            .map(|secret| Arc::new(HmacSigner::new(secret)) as Arc<dyn Signer>);

        Self {
            rest: RestClient::new(base_url, signer),
            assets: AssetIndexMap::new(),
            connected: AtomicBool::new(false),
            nonce: Mutex::new(0),
            ws_subscriptions: Arc::new(parking_lot::Mutex::new(Vec::new())),
            ws_stop: Arc::new(AtomicBool::new(false)),
            ws_handle: Mutex::new(None),
            config,
        }
    }

    fn ws_url(&self) -> &'static str {
        if self.config.testnet {
            TESTNET_WS_URL
        } else {
            MAINNET_WS_URL
        }
    }

    /// Spawn the single WebSocket connection (spec §4.6), dispatching every parsed
    /// [`WsMessage`] to `on_event`. Calling this again while a connection is already
    /// running replaces it. The task reconnects with backoff on its own; `disconnect`
    /// stops it.
    pub fn init_websocket(&self, on_event: impl Fn(WsMessage) + Send + Sync + 'static) {
        self.ws_stop.store(false, Ordering::Release);
        let url = self.ws_url().to_string();
        let subscriptions = Arc::clone(&self.ws_subscriptions);
        let stop = Arc::clone(&self.ws_stop);

        let handle = tokio::spawn(ws::run_with_reconnect(url, subscriptions, stop, on_event));
        if let Some(previous) = self.ws_handle.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Add a subscription, taking effect on the next (re)connect.
    pub fn subscribe(&self, subscription: Subscription) {
        self.ws_subscriptions.lock().push(subscription);
    }

    fn next_nonce(&self) -> u64 {
        let wall_clock_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut last = self.nonce.lock();
        let nonce = wall_clock_ms.max(*last + 1);
        *last = nonce;
        nonce
    }

    async fn ensure_assets_loaded(&self) -> Result<()> {
        if self.assets.is_loaded() {
            return Ok(());
        }
        let meta: MetaResponse = self.rest.info(&InfoRequest::Meta).await?;
        self.assets
            .load(meta.universe.into_iter().map(|asset| asset.name));
        Ok(())
    }

    /// Hyperliquid's wire `tif` only knows `Alo`/`Ioc`/`Gtc`; `Fok` has no direct venue
    /// counterpart, so it rides on `Ioc` (immediate, no partial rest).
    fn tif_wire(tif: TimeInForce) -> &'static str {
        match tif {
            TimeInForce::Gtc => "Gtc",
            TimeInForce::Ioc | TimeInForce::Fok => "Ioc",
            TimeInForce::Alo => "Alo",
        }
    }
}

#[async_trait]
impl Exchange for Hyperliquid {
    fn name(&self) -> &'static str {
        "hyperliquid"
    }

    async fn connect(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            return Ok(());
        }
        self.ensure_assets_loaded().await?;
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        self.ws_stop.store(true, Ordering::Release);
        if let Some(handle) = self.ws_handle.lock().take() {
            handle.abort();
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn get_ticker(&self, pair: &TradingPair) -> Result<Ticker> {
        let coin = SymbolMapper::to_hyperliquid(pair)?;
        let book: L2BookResponse = self
            .rest
            .info(&InfoRequest::L2Book { coin: coin.as_str() })
            .await?;

        let best_bid = book.levels[0]
            .first()
            .ok_or_else(|| DataError::NoPriceAvailable(pair.symbol().to_string()))?;
        let best_ask = book.levels[1]
            .first()
            .ok_or_else(|| DataError::NoPriceAvailable(pair.symbol().to_string()))?;

        Ok(Ticker {
            pair: pair.clone(),
            bid: best_bid.price,
            ask: best_ask.price,
            last: (best_bid.price + best_ask.price) / Decimal::TWO,
            volume_24h: Decimal::ZERO,
            timestamp: Timestamp::from_millis(book.time as i64),
        })
    }

    async fn get_orderbook(&self, pair: &TradingPair, depth: usize) -> Result<OrderBookSnapshot> {
        let coin = SymbolMapper::to_hyperliquid(pair)?;
        let book: L2BookResponse = self
            .rest
            .info(&InfoRequest::L2Book { coin: coin.as_str() })
            .await?;

        let to_levels = |levels: &[super::wire::L2BookLevel]| {
            levels
                .iter()
                .take(depth)
                .map(|level| OrderBookLevel {
                    price: level.price,
                    size: level.size,
                    num_orders: level.num_orders,
                })
                .collect()
        };

        Ok(OrderBookSnapshot {
            pair: pair.clone(),
            bids: to_levels(&book.levels[0]),
            asks: to_levels(&book.levels[1]),
        })
    }

    async fn create_order(&self, request: OrderRequest) -> Result<Order> {
        request.validate().map_err(hq_core::Error::from)?;
        self.ensure_assets_loaded().await?;

        let coin = SymbolMapper::to_hyperliquid(&request.pair)?;
        let asset_index = self.assets.index_of(&coin)?;

        let price = request.price.unwrap_or(Decimal::ZERO);
        let wire = OrderWire {
            a: asset_index,
            b: matches!(request.side, Side::Buy),
            p: price.to_string(),
            s: request.amount.to_string(),
            r: request.reduce_only,
            t: OrderTypeWire::Limit {
                tif: Self::tif_wire(request.tif),
            },
        };

        let nonce = self.next_nonce();
        let response = self
            .rest
            .exchange(
                ExchangeAction::Order {
                    orders: vec![wire],
                    grouping: "na",
                },
                nonce,
            )
            .await?;

        let now = Timestamp::from_millis(nonce as i64);
        let client_order_id = request.client_order_id.clone().unwrap_or_default();
        let mut order = Order::pending(request, client_order_id, now);

        let status = extract_single_status(response)?;
        apply_order_status(&mut order, status, now);
        Ok(order)
    }

    async fn cancel_order(&self, pair: &TradingPair, exchange_order_id: u64) -> Result<()> {
        let coin = SymbolMapper::to_hyperliquid(pair)?;
        let asset_index = self.assets.index_of(&coin)?;
        let nonce = self.next_nonce();

        self.rest
            .exchange(
                ExchangeAction::Cancel {
                    cancels: vec![super::wire::CancelWire {
                        a: asset_index,
                        o: exchange_order_id,
                    }],
                },
                nonce,
            )
            .await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, pair: &TradingPair) -> Result<u64> {
        let open = self.fetch_open_order_ids(pair).await?;
        let count = open.len() as u64;
        for oid in open {
            self.cancel_order(pair, oid).await?;
        }
        Ok(count)
    }

    async fn get_order(&self, pair: &TradingPair, exchange_order_id: u64) -> Result<Order> {
        let response: super::wire::OrderStatusResponse = self
            .rest
            .info(&InfoRequest::OrderStatus {
                user: &self.config.user_address,
                oid: exchange_order_id,
            })
            .await?;

        let Some(entry) = response.order else {
            return Err(BusinessError::OrderNotFound.into());
        };
        let detail = entry.order;

        // Hyperliquid codes sell as "A" (ask) and buy as "B" (bid).
        let side = match detail.side.as_str() {
            "A" | "a" => Side::Sell,
            _ => Side::Buy,
        };

        let now = Timestamp::from_millis(detail.timestamp as i64);
        let client_order_id = detail.cloid.clone().unwrap_or_default();
        let request = OrderRequest {
            pair: pair.clone(),
            side,
            order_type: hq_core::types::OrderType::Limit,
            amount: detail.orig_sz,
            price: Some(detail.limit_px),
            tif: TimeInForce::Gtc,
            reduce_only: detail.reduce_only,
            client_order_id: detail.cloid.map(Into::into),
        };
        let mut order = Order::pending(request, client_order_id.into(), now);
        order.exchange_order_id = Some(detail.oid);
        order.filled_amount = detail.orig_sz - detail.sz;
        order.status = venue_status(&entry.status);
        Ok(order)
    }

    async fn get_balance(&self, asset: &str) -> Result<Balance> {
        let state: super::wire::ClearinghouseStateResponse = self
            .rest
            .info(&InfoRequest::ClearinghouseState {
                user: &self.config.user_address,
            })
            .await?;

        Ok(Balance::new(
            asset.to_string(),
            state.withdrawable,
            state.margin_summary.total_margin_used,
        ))
    }

    async fn get_positions(&self) -> Result<Vec<Position>> {
        let state: super::wire::ClearinghouseStateResponse = self
            .rest
            .info(&InfoRequest::ClearinghouseState {
                user: &self.config.user_address,
            })
            .await?;

        state
            .asset_positions
            .into_iter()
            .map(|entry| {
                let position = entry.position;
                let pair = SymbolMapper::from_hyperliquid(&position.coin);
                let side = if position.szi.is_sign_negative() {
                    PositionSide::Short
                } else {
                    PositionSide::Long
                };
                Ok(Position {
                    pair,
                    side,
                    size: position.szi.abs(),
                    entry_price: position.entry_px.unwrap_or(Decimal::ZERO),
                    mark_price: None,
                    liquidation_price: position.liquidation_px,
                    unrealized_pnl: position.unrealized_pnl,
                    leverage: position.leverage.value,
                    margin_used: position.margin_used,
                })
            })
            .collect()
    }
}

impl Hyperliquid {
    async fn fetch_open_order_ids(&self, pair: &TradingPair) -> Result<Vec<u64>> {
        let _coin = SymbolMapper::to_hyperliquid(pair)?;
        let open: Vec<serde_json::Value> = self
            .rest
            .info(&InfoRequest::OpenOrders {
                user: &self.config.user_address,
            })
            .await?;

        Ok(open
            .iter()
            .filter_map(|value| value.get("oid").and_then(|v| v.as_u64()))
            .collect())
    }
}

fn extract_single_status(response: ExchangeResponse) -> Result<OrderStatusWire> {
    match response {
        ExchangeResponse::Ok { response } => response
            .data
            .statuses
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidResponse("empty statuses array".into()).into()),
        ExchangeResponse::Err { response } => Err(ApiError::ServerError(response).into()),
    }
}

/// Map the `orderStatus`/`openOrders`/`orderUpdates` venue status string onto the unified
/// lattice. Public so callers dispatching `orderUpdates` WS frames can reuse it.
pub fn venue_status(status: &str) -> OrderStatus {
    match status.to_lowercase().as_str() {
        "open" => OrderStatus::Open,
        "filled" => OrderStatus::Filled,
        "canceled" | "cancelled" => OrderStatus::Cancelled,
        "rejected" => OrderStatus::Rejected,
        "partial_fill" | "partially_filled" => OrderStatus::PartiallyFilled,
        _ => OrderStatus::Open,
    }
}

fn apply_order_status(order: &mut Order, status: OrderStatusWire, now: Timestamp) {
    match status {
        OrderStatusWire::Resting { oid } => {
            order.exchange_order_id = Some(oid);
            order.status = OrderStatus::Open;
        }
        OrderStatusWire::Filled {
            oid,
            total_sz,
            avg_px,
        } => {
            order.exchange_order_id = Some(oid);
            order.status = OrderStatus::Filled;
            order.filled_amount = total_sz;
            order.avg_fill_price = Some(avg_px);
        }
        OrderStatusWire::Error { error } => {
            order.status = OrderStatus::Rejected;
            order.error_message = Some(error.into());
        }
    }
    order.updated_at = now;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_status_maps_to_open() {
        let mut order = sample_order();
        apply_order_status(
            &mut order,
            OrderStatusWire::Resting { oid: 42 },
            Timestamp::from_millis(1),
        );
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.exchange_order_id, Some(42));
    }

    #[test]
    fn filled_status_populates_fill_fields() {
        let mut order = sample_order();
        apply_order_status(
            &mut order,
            OrderStatusWire::Filled {
                oid: 7,
                total_sz: Decimal::new(15, 1),
                avg_px: Decimal::new(3000025, 2),
            },
            Timestamp::from_millis(1),
        );
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_amount, Decimal::new(15, 1));
    }

    #[test]
    fn error_status_maps_to_rejected() {
        let mut order = sample_order();
        apply_order_status(
            &mut order,
            OrderStatusWire::Error {
                error: "Insufficient margin".into(),
            },
            Timestamp::from_millis(1),
        );
        assert_eq!(order.status, OrderStatus::Rejected);
        assert!(order.error_message.is_some());
    }

    #[test]
    fn venue_status_maps_known_strings() {
        assert_eq!(venue_status("open"), OrderStatus::Open);
        assert_eq!(venue_status("filled"), OrderStatus::Filled);
        assert_eq!(venue_status("canceled"), OrderStatus::Cancelled);
        assert_eq!(venue_status("partially_filled"), OrderStatus::PartiallyFilled);
    }

    fn sample_order() -> Order {
        use hq_core::types::{OrderRequest, OrderType};
        let request = OrderRequest {
            pair: TradingPair::new("BTC", "USDC"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            amount: Decimal::ONE,
            price: Some(Decimal::new(30000, 0)),
            tif: TimeInForce::Gtc,
            reduce_only: false,
            client_order_id: None,
        };
        Order::pending(request, "cloid-1".into(), Timestamp::from_millis(0))
    }
}
