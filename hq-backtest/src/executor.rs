//! Applies slippage and commission to a strategy signal to produce a [`Fill`] (spec §4.13
//! step 5). Slippage is applied exactly once, here — strategies only ever see unadjusted
//! candle closes (a documented historical bug was strategies baking slippage in twice).

use hq_core::types::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: Decimal,
    pub size: Decimal,
    pub commission: Decimal,
    /// Only meaningful on a closing fill; zero on an opening fill.
    pub realized_pnl: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderExecutor {
    pub slippage: Decimal,
    pub commission_rate: Decimal,
}

impl OrderExecutor {
    pub fn new(slippage: Decimal, commission_rate: Decimal) -> Self {
        Self {
            slippage,
            commission_rate,
        }
    }

    /// `fill_price = base_price * (1 + slippage)` for buys, `* (1 - slippage)` for sells;
    /// `commission = fill_price * size * commission_rate`.
    pub fn fill(&self, side: Side, base_price: Decimal, size: Decimal) -> Fill {
        let price = match side {
            Side::Buy => base_price * (Decimal::ONE + self.slippage),
            Side::Sell => base_price * (Decimal::ONE - self.slippage),
        };
        let commission = price * size * self.commission_rate;
        Fill {
            price,
            size,
            commission,
            realized_pnl: Decimal::ZERO,
        }
    }
}
