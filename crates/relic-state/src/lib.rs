//! relic-state: the persistence gateway for server records.
//!
//! Server and server-IP records are JSON documents grouped into named
//! collections. The reconciler only ever sees the [`DocumentStore`] trait;
//! [`StateStore`] is the redb-backed implementation the daemon opens.
//!
//! # Architecture
//!
//! Each [`Collection`] maps to one redb table keyed by document id, with the
//! document's fields JSON-serialized into the `&[u8]` value column.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod gateway;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use gateway::{DocumentStore, StoreConnector};
pub use store::{StateStore, StoreFile};
pub use types::*;
