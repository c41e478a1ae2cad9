//! Single WebSocket connection for quote and user-event streams (spec §4.6). Reconnects
//! with exponential backoff (1s initial, x2, capped at 30s) and restores subscriptions
//! after every reconnect.

use super::wire::WsMessage;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Exponential backoff policy for WebSocket reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub multiplier: u32,
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            multiplier: 2,
            max: Duration::from_secs(30),
        }
    }
}

pub struct ReconnectState {
    policy: ReconnectPolicy,
    current: Duration,
}

impl ReconnectState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            current: policy.initial,
            policy,
        }
    }

    pub fn reset(&mut self) {
        self.current = self.policy.initial;
    }

    /// The delay to sleep before the next attempt, advancing internal state.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * self.policy.multiplier).min(self.policy.max);
        delay
    }
}

/// A subscription to restore after every reconnect, eg. `{"type": "l2Book", "coin": "BTC"}`.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub channel: String,
    pub coin: String,
}

impl Subscription {
    fn to_message(&self) -> serde_json::Value {
        serde_json::json!({
            "method": "subscribe",
            "subscription": { "type": self.channel, "coin": self.coin },
        })
    }
}

/// Connect, subscribe to every entry in `subscriptions`, and forward raw text frames to
/// `on_message` until the socket closes. Callers drive reconnection via [`ReconnectState`];
/// this function handles a single connection attempt only.
pub async fn run_once(
    url: &str,
    subscriptions: &[Subscription],
    mut on_message: impl FnMut(&str),
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    for sub in subscriptions {
        write
            .send(Message::Text(sub.to_message().to_string().into()))
            .await?;
    }

    info!(url, subscriptions = subscriptions.len(), "Hyperliquid WS connected");

    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => on_message(&text),
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(frame) => {
                warn!(?frame, "Hyperliquid WS closed by peer");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Parse one text frame into a typed event. Frames that don't match any known channel (or
/// fail to parse at all) are dropped rather than surfaced as an error — the feed is
/// best-effort and unrecognized channels shouldn't take the connection down.
pub fn parse_message(text: &str) -> Option<WsMessage> {
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(err) => {
            debug!(%err, "unrecognized Hyperliquid WS frame");
            None
        }
    }
}

/// Run [`run_once`] in a loop, reconnecting with [`ReconnectState`] backoff whenever the
/// connection drops, until `stop` is set. Every reconnect restores `subscriptions` from
/// scratch since Hyperliquid does not remember subscriptions across connections.
pub async fn run_with_reconnect(
    url: String,
    subscriptions: Arc<parking_lot::Mutex<Vec<Subscription>>>,
    stop: Arc<AtomicBool>,
    on_event: impl Fn(WsMessage) + Send + Sync + 'static,
) {
    let mut backoff = ReconnectState::new(ReconnectPolicy::default());

    while !stop.load(Ordering::Acquire) {
        let subs = subscriptions.lock().clone();
        let result = run_once(&url, &subs, |text| {
            if let Some(event) = parse_message(text) {
                on_event(event);
            }
        })
        .await;

        if stop.load(Ordering::Acquire) {
            break;
        }

        if let Err(err) = result {
            warn!(%err, "Hyperliquid WS connection failed, reconnecting");
        } else {
            warn!("Hyperliquid WS connection closed, reconnecting");
        }

        let delay = backoff.next_delay();
        tokio::time::sleep(delay).await;
    }
}
