//! Process-wide in-memory pub/sub (spec §4.10). Topics are dot-segmented
//! (`market_data.quote`, `order.filled`, `system.tick`); `*` matches exactly one segment
//! at the tail of a subscription pattern. Publication is synchronous and fire-and-forget:
//! handler panics/errors never propagate back to the publisher.

use hq_core::time::Timestamp;
use hq_core::types::{Order, Ticker, Trade};
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::warn;

/// Every payload the bus carries. New event kinds are added here rather than making the
/// bus generic over an arbitrary type, so every subscriber sees one closed event set.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Quote(Ticker),
    OrderUpdate(Order),
    OrderFill(Trade),
    Tick(Timestamp),
}

pub trait Handler: Fn(&BusEvent) + Send + Sync {}
impl<F> Handler for F where F: Fn(&BusEvent) + Send + Sync {}

struct Subscription {
    pattern: SmolStr,
    handler: Arc<dyn Handler>,
}

/// Synchronous, single-process pub/sub bus.
///
/// The subscription list is guarded by a single lock; dispatch runs on the publisher's
/// thread in registration order, preserving within-topic ordering for a single publisher
/// (spec §5 "Ordering guarantees"). It does not guarantee any cross-topic ordering.
#[derive(Default)]
pub struct MessageBus {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler for every topic matching `topic_pattern`.
    pub fn subscribe(&self, topic_pattern: impl Into<SmolStr>, handler: impl Handler + 'static) {
        self.subscriptions.write().push(Subscription {
            pattern: topic_pattern.into(),
            handler: Arc::new(handler),
        });
    }

    /// Synchronously invoke every handler whose pattern matches `topic`, in registration
    /// order. Handler errors are not surfaced to the publisher (spec §7); there is
    /// nothing here to "catch" because handlers are infallible `Fn(&BusEvent)` closures —
    /// callers that need fallibility must catch and log inside their own handler body.
    pub fn publish(&self, topic: &str, event: BusEvent) {
        let subscriptions = self.subscriptions.read();
        for sub in subscriptions.iter() {
            if topic_matches(&sub.pattern, topic) {
                (sub.handler)(&event);
            }
        }
    }
}

/// `*` matches exactly one dot-segment at the tail of `pattern`; every other segment must
/// match literally. Pattern and topic must have the same segment count.
fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('.').collect();
    let topic_segments: Vec<&str> = topic.split('.').collect();

    if pattern_segments.len() != topic_segments.len() {
        return false;
    }

    pattern_segments
        .iter()
        .zip(topic_segments.iter())
        .all(|(p, t)| *p == "*" || p == t)
}

/// Convenience used by publishers that want a log line on an empty subscriber set,
/// without making that a first-class bus feature.
pub fn warn_if_unhandled(bus: &MessageBus, topic: &str) {
    if bus.subscriptions.read().is_empty() {
        warn!(topic, "MessageBus has no subscribers");
    }
}
