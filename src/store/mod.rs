//! Application state.
//!
//! # Data Flow
//! ```text
//! HTTP handlers / refresh monitor
//!     → auth.rs (wallet session)
//!     → messages.rs (message list, likes, pending transactions)
//!         → stacks::GuestbookChain (reads)
//!         → stacks::Wallet (writes)
//!         → reconcile.rs (pending entry → keep / drop / error)
//! monitor.rs: periodic fetch until shutdown
//! ```

pub mod auth;
pub mod messages;
pub mod monitor;
pub mod reconcile;
pub mod types;

use std::sync::atomic::{AtomicBool, Ordering};

pub use auth::AuthStore;
pub use messages::{MessageStore, StoreSettings};
pub use monitor::RefreshMonitor;
pub use types::{MessageSnapshot, PendingKind, PendingTransaction, StoreError, StoreResult};

/// Sets a loading flag for the lifetime of an action, including when the
/// action's future is dropped early.
pub(crate) struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    pub(crate) fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
