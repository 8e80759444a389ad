//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router (pages + JSON API)
//! - Wire up middleware (request id, tracing, timeout, request metrics)
//! - Serve until the shutdown signal fires

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{GuestbookConfig, NetworkConfig};
use crate::http::pages;
use crate::http::{api, request};
use crate::stacks::wallet::AppDetails;
use crate::stacks::{ContractIds, HttpWallet, StacksClient, StacksGuestbook, StacksResult};
use crate::store::{AuthStore, MessageStore, StoreSettings};

/// The store as wired in the service binary.
pub type GuestbookStore = MessageStore<StacksGuestbook, HttpWallet>;

/// Wire node client, wallet bridge and stores for the configured network.
pub fn build_store(config: &GuestbookConfig) -> StacksResult<GuestbookStore> {
    let network = config.current_network();
    let client = StacksClient::new(network, &config.node)?;
    let ids = ContractIds::from_network(network);

    let app = AppDetails {
        name: config.app.name.clone(),
        icon: "/favicon.ico".to_string(),
    };
    let wallet = HttpWallet::new(&config.wallet, config.app.network, app, client.clone())?;
    let auth = AuthStore::new(wallet, config.app.network);

    Ok(MessageStore::new(
        StacksGuestbook::new(client, ids.clone()),
        auth,
        ids,
        StoreSettings::from_config(&config.app),
    ))
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuestbookConfig>,
    pub store: GuestbookStore,
}

impl AppState {
    pub fn network(&self) -> &NetworkConfig {
        self.config.current_network()
    }

    pub fn chain(&self) -> &StacksGuestbook {
        self.store.chain()
    }
}

/// HTTP server for the guestbook.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: Arc<GuestbookConfig>, store: GuestbookStore) -> Self {
        let state = AppState {
            config: Arc::clone(&config),
            store,
        };
        let router = Self::build_router(&config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GuestbookConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(pages::home))
            .route("/about", get(pages::about))
            .nest("/api", api::routes())
            .route_layer(middleware::from_fn(request::track_requests))
            .fallback(pages::not_found)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(request::propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request::make_request_span))
            .layer(request::set_request_id_layer())
    }

    /// The router, for serving on a custom listener or in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
