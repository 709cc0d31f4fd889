//! relic-compute: the compute gateway used to tear down game servers.
//!
//! The reconciler depends only on [`ComputeProvider`]. [`DigitalOceanClient`]
//! implements it against the DigitalOcean v2 REST API.

pub mod digital_ocean;
pub mod error;
pub mod provider;

pub use digital_ocean::{DigitalOceanClient, DigitalOceanConfig, DEFAULT_API_URL};
pub use error::{ComputeError, ComputeResult};
pub use provider::{ComputeProvider, DropletId};
