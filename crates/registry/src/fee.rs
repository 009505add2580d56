use std::future::Future;

use crate::Result;

pub trait FeeEstimator: Send + Sync {
    /// Recommended fee in mojos for a single spend bundle.
    fn estimate(&self) -> impl Future<Output = Result<u64>> + Send;
}

/// Always recommends the same fee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedFee(pub u64);

impl FeeEstimator for FixedFee {
    async fn estimate(&self) -> Result<u64> {
        Ok(self.0)
    }
}
