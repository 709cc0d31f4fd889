//! relic-core: configuration shared by the relic proxy crates.
//!
//! Settings are read once at startup from `config.toml` in the data
//! directory and exposed through dotted-key lookups. The persistence
//! credentials live in a separate JSON file next to it.

pub mod config;
pub mod error;

pub use config::{DatabaseCredentials, Settings, CONFIG_FILE, CREDENTIALS_FILE};
pub use error::{ConfigError, ConfigResult};
