//! relic-cache: the proxy's in-memory cache registry.
//!
//! Five independent lookup tables (players, servers, documents,
//! subscriptions, general) used by request-handling code. The registry is
//! created once at process start, shared as `Arc<CacheRegistry>`, and
//! dropped at stop. Nothing in it survives a restart; durable state lives
//! in the persistence store.
//!
//! # Concurrency model
//!
//! Each namespace is its own `RwLock<HashMap>`, so callers on different
//! namespaces never contend. Every `get`/`put`/`remove` is a single short
//! critical section with no I/O and no awaiting.

pub mod namespace;
pub mod registry;

pub use namespace::{CacheValue, Namespace};
pub use registry::{CacheNamespace, CacheRegistry, CacheStats};
