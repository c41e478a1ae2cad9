//! Venue-native JSON shapes for Hyperliquid's `Info` and `Exchange` REST endpoints (spec
//! §4.5 "Venue REST"). Numeric fields are strings on the wire; every parse goes through
//! `Decimal`, never through a float, so no precision is lost round-tripping the API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `POST /info` body. Each variant serializes to `{"type": "...", ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InfoRequest<'a> {
    AllMids,
    L2Book {
        coin: &'a str,
    },
    Meta,
    #[serde(rename = "clearinghouseState")]
    ClearinghouseState {
        user: &'a str,
    },
    OpenOrders {
        user: &'a str,
    },
    OrderStatus {
        user: &'a str,
        oid: u64,
    },
    UserFills {
        user: &'a str,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct L2BookLevel {
    #[serde(rename = "px")]
    pub price: Decimal,
    #[serde(rename = "sz")]
    pub size: Decimal,
    #[serde(rename = "n")]
    pub num_orders: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct L2BookResponse {
    pub coin: String,
    pub levels: [Vec<L2BookLevel>; 2],
    pub time: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetMeta {
    pub name: String,
    pub sz_decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaResponse {
    pub universe: Vec<AssetMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearinghousePosition {
    pub coin: String,
    pub szi: Decimal,
    pub entry_px: Option<Decimal>,
    pub leverage: ClearinghouseLeverage,
    pub liquidation_px: Option<Decimal>,
    pub unrealized_pnl: Decimal,
    pub margin_used: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearinghouseLeverage {
    pub value: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearinghouseAssetPosition {
    pub position: ClearinghousePosition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarginSummaryWire {
    pub account_value: Decimal,
    pub total_margin_used: Decimal,
    pub total_ntl_pos: Decimal,
    pub total_raw_usd: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearinghouseStateResponse {
    pub margin_summary: MarginSummaryWire,
    pub cross_margin_summary: MarginSummaryWire,
    pub withdrawable: Decimal,
    pub cross_maintenance_margin_used: Decimal,
    pub asset_positions: Vec<ClearinghouseAssetPosition>,
}

/// A single leg of the `order` exchange action: `{a, b, p, s, r, t}`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWire {
    pub a: u32,
    pub b: bool,
    pub p: String,
    pub s: String,
    pub r: bool,
    pub t: OrderTypeWire,
}

#[derive(Debug, Clone, Serialize)]
pub enum OrderTypeWire {
    #[serde(rename = "limit")]
    Limit { tif: &'static str },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExchangeAction {
    Order {
        orders: Vec<OrderWire>,
        grouping: &'static str,
    },
    Cancel {
        cancels: Vec<CancelWire>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelWire {
    pub a: u32,
    pub o: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRequest {
    pub action: ExchangeAction,
    pub nonce: u64,
    pub signature: String,
}

/// One entry of the `statuses` array in an order-placement response: either the order is
/// resting on the book, it filled immediately, or it was rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatusWire {
    Resting { oid: u64 },
    Filled {
        oid: u64,
        total_sz: Decimal,
        avg_px: Decimal,
    },
    Error { error: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeResponseData {
    pub statuses: Vec<OrderStatusWire>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExchangeResponse {
    Ok { response: ExchangeResponseInner },
    Err { response: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeResponseInner {
    pub data: ExchangeResponseData,
}

/// `orderStatus` info-endpoint response: `{status: "order"|"unknownOid", order?}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub status: String,
    pub order: Option<OrderStatusOrder>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusOrder {
    pub order: OrderStatusOrderDetail,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusOrderDetail {
    pub oid: u64,
    pub coin: String,
    pub side: String,
    pub limit_px: Decimal,
    pub sz: Decimal,
    pub orig_sz: Decimal,
    pub timestamp: u64,
    pub reduce_only: bool,
    pub cloid: Option<String>,
}

/// One order update pushed over the `orderUpdates` WS channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdateWire {
    pub order: OrderStatusOrderDetail,
    pub status: String,
    pub status_timestamp: u64,
}

/// One trade print pushed over the `trades` WS channel.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeWire {
    pub coin: String,
    pub px: Decimal,
    pub sz: Decimal,
    pub time: u64,
}

/// One fill pushed over the `user` WS channel.
#[derive(Debug, Clone, Deserialize)]
pub struct UserFillWire {
    pub oid: u64,
    pub px: Decimal,
    pub sz: Decimal,
    pub fee: Decimal,
    pub time: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserEventWire {
    #[serde(default)]
    pub fills: Vec<UserFillWire>,
}

/// Every shape Hyperliquid's WS feed sends, dispatched on the outer `{"channel": ...,
/// "data": ...}` envelope common to all of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "channel", content = "data")]
pub enum WsMessage {
    #[serde(rename = "allMids")]
    AllMids { mids: std::collections::HashMap<String, Decimal> },
    #[serde(rename = "l2Book")]
    L2Book(L2BookResponse),
    #[serde(rename = "trades")]
    Trades(Vec<TradeWire>),
    #[serde(rename = "orderUpdates")]
    OrderUpdates(Vec<OrderUpdateWire>),
    #[serde(rename = "user")]
    User(UserEventWire),
    #[serde(rename = "subscriptionResponse")]
    SubscriptionResponse(serde_json::Value),
    #[serde(rename = "error")]
    Error(String),
}
