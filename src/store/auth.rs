//! Wallet session state.

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Network;
use crate::stacks::{UserSession, Wallet};
use crate::store::types::StoreResult;
use crate::store::LoadingGuard;

/// Authentication state, shared by cloning.
pub struct AuthStore<W> {
    inner: Arc<AuthInner<W>>,
}

struct AuthInner<W> {
    wallet: W,
    network: Network,
    session: ArcSwapOption<UserSession>,
    loading: AtomicBool,
}

impl<W> Clone for AuthStore<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Wallet> AuthStore<W> {
    pub fn new(wallet: W, network: Network) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                wallet,
                network,
                session: ArcSwapOption::empty(),
                loading: AtomicBool::new(false),
            }),
        }
    }

    pub fn wallet(&self) -> &W {
        &self.inner.wallet
    }

    pub fn network(&self) -> Network {
        self.inner.network
    }

    /// Pick up an existing wallet session, if any.
    pub async fn check_auth(&self) {
        let _loading = LoadingGuard::start(&self.inner.loading);
        match self.inner.wallet.load_session().await {
            Ok(Some(session)) => {
                tracing::info!(address = session.address_for(self.inner.network), "Restored wallet session");
                self.inner.session.store(Some(Arc::new(session)));
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "Error checking authentication"),
        }
    }

    /// Run the wallet handshake. On failure the previous session stays.
    pub async fn connect_wallet(&self) -> StoreResult<Arc<UserSession>> {
        let _loading = LoadingGuard::start(&self.inner.loading);
        match self.inner.wallet.connect().await {
            Ok(session) => {
                let session = Arc::new(session);
                self.inner.session.store(Some(Arc::clone(&session)));
                Ok(session)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error connecting wallet");
                Err(e.into())
            }
        }
    }

    /// Sign out. If the wallet refuses, the session is kept.
    pub async fn disconnect_wallet(&self) -> StoreResult<()> {
        let _loading = LoadingGuard::start(&self.inner.loading);
        match self.inner.wallet.sign_out().await {
            Ok(()) => {
                self.inner.session.store(None);
                tracing::info!("Wallet disconnected");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Error disconnecting wallet");
                Err(e.into())
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.load().is_some()
    }

    /// Address of the signed-in user on the active network.
    pub fn user_address(&self) -> Option<String> {
        self.inner
            .session
            .load()
            .as_ref()
            .map(|s| s.address_for(self.inner.network).to_string())
    }

    pub fn session(&self) -> Option<Arc<UserSession>> {
        self.inner.session.load_full()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }
}
