use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::Store;
use crate::engine::Engine;

/// Periodically closes lapsed bidding windows. Placing and accepting bids
/// re-check the deadline themselves, so a slow or failed sweep only delays
/// when a closed window stops showing up as open.
pub struct ExpiryWatcher<S> {
    engine: Arc<Engine<S>>,
    period: Duration,
}

impl<S: Store + 'static> ExpiryWatcher<S> {
    pub fn new(engine: Arc<Engine<S>>, period: Duration) -> Self {
        Self { engine, period }
    }

    pub async fn sweep(&self) -> usize {
        match self.engine.expire_bidding_windows().await {
            Ok(closed) => {
                if closed > 0 {
                    tracing::info!(closed, "expiry sweep closed bidding windows");
                }
                closed
            }
            Err(err) => {
                tracing::error!(%err, "expiry sweep failed, retrying next tick");
                0
            }
        }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.sweep().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tracing::info!(period = ?self.period, "starting expiry watcher");

        tokio::spawn(self.run())
    }
}
