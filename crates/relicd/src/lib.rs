//! relicd: the relic proxy daemon.
//!
//! Owns the proxy's startup and shutdown lifecycle: loading configuration,
//! connecting the persistence and compute gateways, cleaning up game servers
//! orphaned by a previous run, and wiring the optional analytics and Discord
//! integrations. The binary in `main.rs` is a thin CLI over [`bootstrap`].

pub mod analytics;
pub mod bootstrap;
pub mod discord;
pub mod error;

pub use bootstrap::{bootstrap, bootstrap_with, reconcile_once, ProxyServices};
pub use error::{FatalError, IntegrationError, IntegrationResult};
