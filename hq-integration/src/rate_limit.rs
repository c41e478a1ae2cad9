//! Priority-tiered token-bucket rate limiter (spec §4.4): default 20 tokens/s, single
//! shared instance per connector. FIFO grant order within a priority tier; `High` drains
//! before `Normal` before `Low`. The connector only ever submits at `Priority::Normal`, so
//! observed behavior under spec scenario S6 is plain FIFO.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;

/// Priority of a rate-limited call. Higher-priority waiters are granted tokens first,
/// independent of arrival order relative to a lower tier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Priority {
    High,
    Normal,
    Low,
}

struct Waiter {
    tx: oneshot::Sender<()>,
}

struct Inner {
    capacity: usize,
    tokens: usize,
    interval: Duration,
    last_refill: Instant,
    high: VecDeque<Waiter>,
    normal: VecDeque<Waiter>,
    low: VecDeque<Waiter>,
}

impl Inner {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        if elapsed < self.interval {
            return;
        }
        let periods = elapsed.as_nanos() / self.interval.as_nanos().max(1);
        let granted = (periods as usize).saturating_mul(self.capacity);
        self.last_refill += self.interval * (periods as u32);
        self.tokens = (self.tokens + granted).min(self.capacity);

        while self.tokens > 0 {
            let Some(waiter) = self
                .high
                .pop_front()
                .or_else(|| self.normal.pop_front())
                .or_else(|| self.low.pop_front())
            else {
                break;
            };
            self.tokens -= 1;
            // Receiver may have been dropped (caller cancelled); token is simply lost for
            // this tick, matching a real bucket where an unused grant doesn't roll over
            // beyond `capacity`.
            let _ = waiter.tx.send(());
        }
    }

    fn queue_mut(&mut self, priority: Priority) -> &mut VecDeque<Waiter> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
            Priority::Low => &mut self.low,
        }
    }

    fn queues_empty(&self) -> bool {
        self.high.is_empty() && self.normal.is_empty() && self.low.is_empty()
    }
}

/// Token-bucket rate limiter. `wait()`/`wait_with_priority()` blocks the caller until a
/// token is available; it is the caller's duty (the connector, per spec §4.5) to invoke
/// it before every outbound HTTP request.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Inner>>,
}

impl RateLimiter {
    /// Hyperliquid's default: 20 requests/second.
    pub fn default_hyperliquid() -> Self {
        Self::new(20, Duration::from_secs(1))
    }

    pub fn new(capacity: usize, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                capacity,
                tokens: capacity,
                interval,
                last_refill: Instant::now(),
                high: VecDeque::new(),
                normal: VecDeque::new(),
                low: VecDeque::new(),
            })),
        }
    }

    /// Block until a token is available at [`Priority::Normal`]. Grant order is FIFO with
    /// respect to other `Normal` arrivals.
    pub async fn wait(&self) {
        self.wait_with_priority(Priority::Normal).await
    }

    /// Block until a token is available at `priority`. `High` waiters drain ahead of
    /// `Normal`, which drains ahead of `Low`; FIFO within a tier.
    pub async fn wait_with_priority(&self, priority: Priority) {
        let rx = {
            let mut inner = self.inner.lock().await;
            inner.refill();
            if inner.tokens > 0 {
                inner.tokens -= 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                inner.queue_mut(priority).push_back(Waiter { tx });
                Some(rx)
            }
        };

        let Some(rx) = rx else { return };

        // No waiter will be woken until the bucket's own refill tick runs, which only
        // happens inside `refill()` above — so poll on a cadence bounded by the interval
        // rather than relying solely on a future grant to arrive.
        tokio::select! {
            _ = rx => {}
            _ = self.poll_until_granted() => {}
        }
    }

    async fn poll_until_granted(&self) {
        loop {
            tokio::time::sleep(self.inner.lock().await.interval / 4).await;
            let mut inner = self.inner.lock().await;
            inner.refill();
            if inner.queues_empty() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant as TokioInstant;

    #[tokio::test(start_paused = true)]
    async fn burst_beyond_capacity_spills_into_next_interval() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));
        limiter.wait().await;
        limiter.wait().await;

        let start = TokioInstant::now();
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    // S6 — 40 calls against a 20 req/s limiter: the 40th completes no sooner than ~1.9s
    // after the first.
    #[tokio::test(start_paused = true)]
    async fn scenario_s6_rate_limited_burst() {
        let limiter = RateLimiter::default_hyperliquid();
        let start = TokioInstant::now();
        for _ in 0..40 {
            limiter.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(1_900));
    }

    #[tokio::test(start_paused = true)]
    async fn high_priority_drains_ahead_of_low_arrived_earlier() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_millis(50)));
        limiter.wait().await; // consume the initial token

        let order = Arc::new(Mutex::new(Vec::new()));

        let low_limiter = Arc::clone(&limiter);
        let low_order = Arc::clone(&order);
        let low = tokio::spawn(async move {
            low_limiter.wait_with_priority(Priority::Low).await;
            low_order.lock().await.push("low");
        });

        // Ensure the low-priority waiter is enqueued first.
        tokio::time::sleep(Duration::from_millis(1)).await;

        let high_limiter = Arc::clone(&limiter);
        let high_order = Arc::clone(&order);
        let high = tokio::spawn(async move {
            high_limiter.wait_with_priority(Priority::High).await;
            high_order.lock().await.push("high");
        });

        let _ = tokio::join!(low, high);
        assert_eq!(*order.lock().await, vec!["high", "low"]);
    }
}
