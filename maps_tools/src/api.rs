use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{config::MapsConfig, data_objects::DistanceMatrixResponse, DistanceResult, MapsApiError};

#[derive(Clone)]
pub struct MapsApi {
    config: MapsConfig,
    client: Arc<Client>,
}

impl MapsApi {
    pub fn new(config: MapsConfig) -> Result<Self, MapsApiError> {
        let client =
            Client::builder().timeout(config.timeout).build().map_err(|e| MapsApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, MapsApiError> {
        let url = self.url(path);
        trace!("🗺️ Sending REST query: {url}");
        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("key", self.config.api_key.reveal().as_str())])
            .send()
            .await
            .map_err(|e| MapsApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🗺️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| MapsApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| MapsApiError::RestResponseError(e.to_string()))?;
            Err(MapsApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Fetches the driving distance between `origin` and `destination`. Any status other than "OK", or a response
    /// missing the distance or duration, is reported as an error.
    pub async fn distance(&self, origin: &str, destination: &str) -> Result<DistanceResult, MapsApiError> {
        debug!("🗺️ Fetching distance from [{origin}] to [{destination}]");
        let params = [("origins", origin), ("destinations", destination), ("units", "metric")];
        let response = self.rest_query::<DistanceMatrixResponse>("/distancematrix/json", &params).await?;
        let result = DistanceResult::try_from(response)?;
        debug!("🗺️ Distance to [{destination}] is {} ({})", result.distance_text, result.duration_text);
        Ok(result)
    }
}
