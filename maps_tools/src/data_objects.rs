use serde::{Deserialize, Serialize};

use crate::MapsApiError;

/// Raw distance-matrix response. Only a single origin and destination are ever requested, so only the first element
/// of the first row is meaningful.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DistanceMatrixResponse {
    pub status: String,
    #[serde(default)]
    pub rows: Vec<DistanceRow>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DistanceRow {
    #[serde(default)]
    pub elements: Vec<DistanceElement>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DistanceElement {
    pub status: String,
    pub distance: Option<TextValue>,
    pub duration: Option<TextValue>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TextValue {
    pub text: String,
    pub value: u64,
}

/// The result of a successful distance query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DistanceResult {
    pub distance_meters: u64,
    pub distance_text: String,
    pub duration_text: String,
}

impl TryFrom<DistanceMatrixResponse> for DistanceResult {
    type Error = MapsApiError;

    fn try_from(value: DistanceMatrixResponse) -> Result<Self, Self::Error> {
        if value.status != "OK" {
            let status = match value.error_message {
                Some(msg) => format!("{} ({msg})", value.status),
                None => value.status,
            };
            return Err(MapsApiError::StatusNotOk(status));
        }
        let element = value
            .rows
            .into_iter()
            .next()
            .and_then(|r| r.elements.into_iter().next())
            .ok_or(MapsApiError::MissingField("rows[0].elements[0]"))?;
        if element.status != "OK" {
            return Err(MapsApiError::StatusNotOk(element.status));
        }
        let distance = element.distance.ok_or(MapsApiError::MissingField("distance"))?;
        let duration = element.duration.ok_or(MapsApiError::MissingField("duration"))?;
        Ok(Self { distance_meters: distance.value, distance_text: distance.text, duration_text: duration.text })
    }
}
