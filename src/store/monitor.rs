//! Periodic message refresh.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::stacks::{GuestbookChain, Wallet};
use crate::store::messages::MessageStore;

/// Re-fetches the message list every `interval` until shutdown.
pub struct RefreshMonitor<C, W> {
    store: MessageStore<C, W>,
    interval: Duration,
}

impl<C, W> RefreshMonitor<C, W>
where
    C: GuestbookChain + 'static,
    W: Wallet + 'static,
{
    pub fn new(store: MessageStore<C, W>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// The first tick fires immediately, so the list is loaded at startup.
    /// `interval` must be non-zero; config validation enforces it.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Refresh monitor starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.store.fetch_messages().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Refresh monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
