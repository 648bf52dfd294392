//! The tally ingest engine: aggregation, subscriptions, and notification
//! fan-out over a [`ScanStore`](tally_core::store::ScanStore).
//!
//! The [`Engine`](engine::Engine) is constructed once at process start and
//! injected into the ingestion and query paths; there are no module-level
//! singletons.

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod hub;

pub use engine::{Engine, IngestReport};
pub use error::{Error, Result};
pub use hub::{Notification, SubscriptionHub};
