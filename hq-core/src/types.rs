//! Unified market and account types (spec §3). Every typed value here is plain data,
//! owned by whichever component produced or accepted it — see spec §3 "Ownership".

use crate::error::BusinessError;
use crate::time::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{self, Display, Formatter};

/// Canonical identity of a tradable instrument: `{ base, quote }`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct TradingPair {
    pub base: SmolStr,
    pub quote: SmolStr,
}

impl TradingPair {
    pub fn new(base: impl Into<SmolStr>, quote: impl Into<SmolStr>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// `"BASE-QUOTE"`.
    pub fn symbol(&self) -> SmolStr {
        SmolStr::new(format!("{}-{}", self.base, self.quote))
    }
}

impl Display for TradingPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum TimeInForce {
    /// Good 'til cancelled.
    Gtc,
    /// Immediate or cancel.
    Ioc,
    /// Add liquidity only (post-only).
    Alo,
    /// Fill or kill.
    Fok,
}

/// Order lifecycle status. See [`OrderStatus::can_transition_to`] for the monotonic
/// lattice this type enforces (spec §3, §4.8 reconciliation rule).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum OrderStatus {
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// `true` if the order is still live on the book (spec §3: `isActive`).
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }

    /// `true` once an order has reached a sink state it can never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Rank in the status lattice: `Pending < Open < PartiallyFilled < Filled`, with
    /// `Cancelled`/`Rejected` reachable as terminal sinks from any non-terminal state.
    /// Used to detect a regressing transition (eg/ `Filled -> Open`) so it can be dropped.
    fn lattice_rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Open => 1,
            OrderStatus::PartiallyFilled => 2,
            OrderStatus::Filled => 3,
            OrderStatus::Cancelled => 3,
            OrderStatus::Rejected => 3,
        }
    }

    /// `true` if transitioning from `self` to `next` is forward (or staying put) in the
    /// lattice. Once in a terminal state, no further transition is permitted.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if matches!(next, OrderStatus::Cancelled | OrderStatus::Rejected) {
            return true;
        }
        next.lattice_rank() >= self.lattice_rank()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum PositionSide {
    Long,
    Short,
}

/// An order intent, not yet accepted by any venue.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderRequest {
    pub pair: TradingPair,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub tif: TimeInForce,
    pub reduce_only: bool,
    pub client_order_id: Option<SmolStr>,
}

impl OrderRequest {
    /// Validate the invariants from spec §3: amount positive; limit => price present and
    /// positive; market => price absent.
    pub fn validate(&self) -> Result<(), BusinessError> {
        if self.amount <= Decimal::ZERO {
            return Err(BusinessError::InvalidAmount);
        }
        match (self.order_type, self.price) {
            (OrderType::Limit, None) => return Err(BusinessError::LimitOrderRequiresPrice),
            (OrderType::Limit, Some(price)) if price <= Decimal::ZERO => {
                return Err(BusinessError::InvalidPrice);
            }
            (OrderType::Market, Some(_)) => {
                return Err(BusinessError::MarketOrderShouldNotHavePrice);
            }
            _ => {}
        }
        Ok(())
    }
}

/// A live order entity: the original request plus venue/fill state.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Order {
    pub pair: TradingPair,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub tif: TimeInForce,
    pub reduce_only: bool,
    pub client_order_id: Option<SmolStr>,

    pub exchange_order_id: Option<u64>,
    pub status: OrderStatus,
    pub filled_amount: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub commission: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub error_message: Option<SmolStr>,
}

impl Order {
    /// Construct a freshly submitted [`Order`] (status [`OrderStatus::Pending`]) from a
    /// validated [`OrderRequest`].
    pub fn pending(request: OrderRequest, client_order_id: SmolStr, now: Timestamp) -> Self {
        Self {
            pair: request.pair,
            side: request.side,
            order_type: request.order_type,
            amount: request.amount,
            price: request.price,
            tif: request.tif,
            reduce_only: request.reduce_only,
            client_order_id: Some(client_order_id),
            exchange_order_id: None,
            status: OrderStatus::Pending,
            filled_amount: Decimal::ZERO,
            avg_fill_price: None,
            commission: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            error_message: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// A single side's price level: `{ price, size, num_orders }`.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderBookLevel {
    pub price: Decimal,
    pub size: Decimal,
    pub num_orders: u32,
}

/// Top-of-book quote: `{ pair, bid, ask, last, volume_24h, timestamp }`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Ticker {
    pub pair: TradingPair,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub volume_24h: Decimal,
    pub timestamp: Timestamp,
}

impl Ticker {
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// `(ask - bid) / mid * 10_000`.
    pub fn spread_bps(&self) -> Decimal {
        let mid = self.mid();
        if mid.is_zero() {
            return Decimal::ZERO;
        }
        ((self.ask - self.bid) / mid) * crate::decimal::BPS_SCALE
    }
}

/// `{ asset, total, available, locked }`, invariant `total = available + locked`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Balance {
    pub asset: SmolStr,
    pub total: Decimal,
    pub available: Decimal,
    pub locked: Decimal,
}

impl Balance {
    pub fn new(asset: impl Into<SmolStr>, available: Decimal, locked: Decimal) -> Self {
        Self {
            asset: asset.into(),
            total: available + locked,
            available,
            locked,
        }
    }
}

/// An open position on one pair.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub pair: TradingPair,
    pub side: PositionSide,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Option<Decimal>,
    pub liquidation_price: Option<Decimal>,
    pub unrealized_pnl: Decimal,
    pub leverage: Decimal,
    pub margin_used: Decimal,
}

impl Position {
    /// Recompute `unrealized_pnl = (mark - entry) * size`, negated for shorts.
    pub fn recompute_unrealized_pnl(&mut self, mark_price: Decimal) {
        self.mark_price = Some(mark_price);
        let diff = mark_price - self.entry_price;
        self.unrealized_pnl = match self.side {
            PositionSide::Long => diff * self.size,
            PositionSide::Short => -diff * self.size,
        };
    }
}

/// An executed fill: the unit both the order manager (commission/avg-price accumulation)
/// and the position tracker (realized PnL, size-weighted entry price) apply against
/// their respective state.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trade {
    pub pair: TradingPair,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub commission: Decimal,
    pub exchange_order_id: Option<u64>,
    pub reduce_only: bool,
    pub timestamp: Timestamp,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MarginSummary {
    pub account_value: Decimal,
    pub total_margin_used: Decimal,
    pub total_ntl_pos: Decimal,
    pub total_raw_usd: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Account {
    pub margin_summary: MarginSummary,
    pub cross_margin_summary: MarginSummary,
    pub withdrawable: Decimal,
    pub cross_maintenance_margin_used: Decimal,
    pub total_realized_pnl: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn symbol_is_base_dash_quote() {
        let pair = TradingPair::new("BTC", "USDC");
        assert_eq!(pair.symbol().as_str(), "BTC-USDC");
    }

    #[test]
    fn order_request_rejects_nonpositive_amount() {
        let req = OrderRequest {
            pair: TradingPair::new("BTC", "USDC"),
            side: Side::Buy,
            order_type: OrderType::Market,
            amount: dec!(0),
            price: None,
            tif: TimeInForce::Ioc,
            reduce_only: false,
            client_order_id: None,
        };
        assert_eq!(req.validate(), Err(BusinessError::InvalidAmount));
    }

    #[test]
    fn limit_order_without_price_is_rejected() {
        let req = OrderRequest {
            pair: TradingPair::new("BTC", "USDC"),
            side: Side::Buy,
            order_type: OrderType::Limit,
            amount: dec!(1),
            price: None,
            tif: TimeInForce::Gtc,
            reduce_only: false,
            client_order_id: None,
        };
        assert_eq!(req.validate(), Err(BusinessError::LimitOrderRequiresPrice));
    }

    #[test]
    fn market_order_with_price_is_rejected() {
        let req = OrderRequest {
            pair: TradingPair::new("BTC", "USDC"),
            side: Side::Buy,
            order_type: OrderType::Market,
            amount: dec!(1),
            price: Some(dec!(100)),
            tif: TimeInForce::Ioc,
            reduce_only: false,
            client_order_id: None,
        };
        assert_eq!(
            req.validate(),
            Err(BusinessError::MarketOrderShouldNotHavePrice)
        );
    }

    #[test]
    fn status_lattice_forbids_regression() {
        assert!(OrderStatus::Open.can_transition_to(OrderStatus::PartiallyFilled));
        assert!(OrderStatus::PartiallyFilled.can_transition_to(OrderStatus::Filled));
        assert!(!OrderStatus::Filled.can_transition_to(OrderStatus::Open));
        assert!(OrderStatus::Open.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Open));
    }

    #[test]
    fn ticker_mid_and_spread_bps() {
        let ticker = Ticker {
            pair: TradingPair::new("BTC", "USDC"),
            bid: dec!(100),
            ask: dec!(101),
            last: dec!(100.5),
            volume_24h: dec!(0),
            timestamp: Timestamp::from_millis(0),
        };
        assert_eq!(ticker.mid(), dec!(100.5));
        assert_eq!(ticker.spread_bps(), dec!(99.50248756218905472636815920));
    }

    #[test]
    fn balance_total_is_available_plus_locked() {
        let balance = Balance::new("USDC", dec!(10), dec!(5));
        assert_eq!(balance.total, dec!(15));
    }

    #[test]
    fn position_pnl_is_negated_for_shorts() {
        let mut pos = Position {
            pair: TradingPair::new("BTC", "USDC"),
            side: PositionSide::Short,
            size: dec!(1),
            entry_price: dec!(100),
            mark_price: None,
            liquidation_price: None,
            unrealized_pnl: Decimal::ZERO,
            leverage: dec!(1),
            margin_used: dec!(100),
        };
        pos.recompute_unrealized_pnl(dec!(90));
        assert_eq!(pos.unrealized_pnl, dec!(10));
    }
}
