//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Node client, store, reconciler and HTTP layer produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! Request ids are attached by the HTTP middleware and show up in the
//! `tower_http` trace spans.

pub mod logging;
pub mod metrics;
