//! Hyperliquid connector (spec §4.5, §4.6): `Info`/`Exchange` REST endpoints plus a single
//! WebSocket connection for quote and user-event streams.

mod assets;
mod connector;
mod rest;
mod signer;
mod wire;
pub mod ws;

pub use connector::{venue_status, Hyperliquid, HyperliquidConfig};
pub use signer::{HmacSigner, Signer};
pub use wire::WsMessage;
pub use ws::Subscription;
