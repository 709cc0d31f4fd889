//! relic-reconcile: startup/shutdown cleanup of ephemeral game servers.
//!
//! Server records are written by the provisioning subsystem when a game
//! server boots and removed on graceful shutdown. When the proxy dies first,
//! the records (and the droplets behind them) are orphaned. The
//! [`Reconciler`] runs once at startup and once at stop to destroy the
//! droplets and delete the records.
//!
//! # Failure policy
//!
//! ```text
//! fetch_all(collection) fails      → warn, collection skipped, count 0
//! terminate_instance(droplet) fails → retry if transient, then warn
//!                                     (the document is deleted anyway)
//! delete(document) fails            → warn, not counted
//! ```
//!
//! Documents are the source of truth for "already cleaned up", so a failed
//! termination never leaves a document behind. Nothing propagates out of
//! [`Reconciler::reconcile_collection`]; callers only see counts.

pub mod config;
pub mod reconciler;

pub use config::ReconcileConfig;
pub use reconciler::{ReconcileReport, Reconciler};
