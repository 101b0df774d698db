use serde::{Deserialize, Serialize};

use crate::engine_api::errors::OrderFlowError;

/// A resolved route between a branch and a delivery address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceInfo {
    pub distance_meters: u64,
    /// e.g. "12.4 km"
    pub distance_text: String,
    /// e.g. "25 mins"
    pub duration_text: String,
}

/// Resolves the road distance between an origin and a free-text destination address.
///
/// Implementations should return [`OrderFlowError::DistanceResolutionFailed`] when the service reports anything other
/// than a complete result. Timeouts are applied by the caller.
#[allow(async_fn_in_trait)]
pub trait DistanceResolver {
    async fn resolve_distance(&self, origin: &str, destination: &str) -> Result<DistanceInfo, OrderFlowError>;
}
