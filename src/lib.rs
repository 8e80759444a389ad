//! Stacks Guestbook service library.
//!
//! A guestbook on the Stacks blockchain: messages, likes and tips live in
//! Clarity contracts; this crate reads them through a node's REST API, submits
//! writes through an external wallet, and tracks the resulting transactions
//! until they settle.

pub mod clarity;
pub mod config;
pub mod date;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod stacks;
pub mod store;

pub use config::GuestbookConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
