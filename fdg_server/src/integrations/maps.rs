use fdg_engine::{
    traits::{DistanceInfo, DistanceResolver},
    OrderFlowError,
};
use log::*;
use maps_tools::{MapsApi, MapsApiError, MapsConfig};

/// Resolves delivery distances with the hosted distance-matrix service.
#[derive(Clone)]
pub struct MapsDistanceResolver {
    api: MapsApi,
}

impl MapsDistanceResolver {
    pub fn new(config: MapsConfig) -> Result<Self, MapsApiError> {
        let api = MapsApi::new(config)?;
        Ok(Self { api })
    }
}

impl DistanceResolver for MapsDistanceResolver {
    async fn resolve_distance(&self, origin: &str, destination: &str) -> Result<DistanceInfo, OrderFlowError> {
        trace!("🗺️ Resolving distance from '{origin}' to '{destination}'");
        let result = self.api.distance(origin, destination).await.map_err(|e| {
            debug!("🗺️ Distance lookup failed. {e}");
            OrderFlowError::DistanceResolutionFailed(e.to_string())
        })?;
        Ok(DistanceInfo {
            distance_meters: result.distance_meters,
            distance_text: result.distance_text,
            duration_text: result.duration_text,
        })
    }
}
