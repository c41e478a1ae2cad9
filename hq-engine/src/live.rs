//! Live trading engine tick scheduler (spec §5 "Threads", item 1): drives a fixed-interval
//! clock on its own task and publishes `system.tick` for every other component (data
//! engine polling, execution engine risk snapshots, strategies) to react to.

use hq_core::time::Timestamp;
use hq_integration::bus::BusEvent;
use hq_integration::MessageBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

/// Owns the tick task; dropping without calling [`LiveTradingEngine::stop`] leaves the
/// task running detached, so callers that need clean shutdown must call `stop` explicitly.
pub struct LiveTradingEngine {
    handle: Option<JoinHandle<()>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl LiveTradingEngine {
    /// Spawn the tick loop, publishing `system.tick` onto `bus` every `interval`.
    pub fn start(bus: Arc<MessageBus>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        bus.publish("system.tick", BusEvent::Tick(now()));
                    }
                    _ = &mut shutdown_rx => {
                        info!("live trading engine tick loop stopped");
                        break;
                    }
                }
            }
        });

        Self {
            handle: Some(handle),
            shutdown: Some(shutdown_tx),
        }
    }

    /// Signal the tick task to stop and wait for it to exit.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

fn now() -> Timestamp {
    Timestamp::from_datetime(chrono::Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test(start_paused = true)]
    async fn publishes_a_tick_on_every_interval() {
        let bus = Arc::new(MessageBus::new());
        let count = Arc::new(Mutex::new(0));
        let count_clone = Arc::clone(&count);
        bus.subscribe("system.tick", move |_event: &BusEvent| {
            *count_clone.lock() += 1;
        });

        let mut engine = LiveTradingEngine::start(Arc::clone(&bus), Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(35)).await;
        // yield so the spawned task's woken timer actually runs
        tokio::task::yield_now().await;

        engine.stop().await;
        assert!(*count.lock() >= 3);
    }
}
