//! Bidirectional mapping between unified [`TradingPair`]s and venue-native symbols (spec
//! §4.2). Hyperliquid perpetuals are the only venue the connector binds to, but Binance
//! and OKX helpers are kept here (ungrounded in a concrete connector) for future venues,
//! matching the exchange-identifier enum style of `jackbot-instrument::exchange::ExchangeId`.

use crate::error::DataError;
use crate::types::TradingPair;
use smol_str::SmolStr;

/// Hyperliquid perpetuals settle in USDC; any other quote currency cannot be mapped to a
/// Hyperliquid coin.
pub const HYPERLIQUID_QUOTE: &str = "USDC";

pub struct SymbolMapper;

impl SymbolMapper {
    /// `{base, "USDC"} -> base` ("coin", in Hyperliquid terms).
    pub fn to_hyperliquid(pair: &TradingPair) -> Result<SmolStr, DataError> {
        if pair.quote != HYPERLIQUID_QUOTE {
            return Err(DataError::UnsupportedQuoteCurrency(pair.quote.to_string()));
        }
        Ok(pair.base.clone())
    }

    /// `coin -> {coin, "USDC"}`.
    pub fn from_hyperliquid(coin: &str) -> TradingPair {
        TradingPair::new(coin, HYPERLIQUID_QUOTE)
    }

    /// `{base, quote} -> "BASEQUOTE"`.
    pub fn to_binance(pair: &TradingPair) -> SmolStr {
        SmolStr::new(format!("{}{}", pair.base, pair.quote))
    }

    /// `{base, quote} -> "BASE-QUOTE"`.
    pub fn to_okx(pair: &TradingPair) -> SmolStr {
        SmolStr::new(format!("{}-{}", pair.base, pair.quote))
    }
}
