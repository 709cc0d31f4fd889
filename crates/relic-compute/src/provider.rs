//! The compute gateway seam.

use async_trait::async_trait;

use crate::error::ComputeResult;

/// Identifier of a compute instance, assigned by the provider.
pub type DropletId = u64;

/// Cloud provider able to terminate instances, injected for testability.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Terminate (destroy) the instance with the given id.
    async fn terminate_instance(&self, id: DropletId) -> ComputeResult<()>;
}
