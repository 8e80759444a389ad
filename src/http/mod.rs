//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request id, span, request metrics)
//!     → pages.rs (/, /about, not-found)
//!     → api.rs (/api/*, JSON)
//!         → store / node client
//!     → response.rs (JSON errors)
//! ```

pub mod api;
pub mod pages;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{build_store, AppState, GuestbookStore, HttpServer};
