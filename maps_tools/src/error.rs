use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MapsApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The distance service returned status {0}")]
    StatusNotOk(String),
    #[error("The distance service response is missing the {0} field")]
    MissingField(&'static str),
}
