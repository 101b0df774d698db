use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use fdg_engine::OrderFlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingActor | AuthError::InvalidActor(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::OrderFlow(e) => match e {
                OrderFlowError::DistanceResolutionFailed(_) => StatusCode::BAD_GATEWAY,
                OrderFlowError::DeliveryUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
                OrderFlowError::InvalidTransition { .. } => StatusCode::CONFLICT,
                OrderFlowError::TransitionNotPermitted { .. } => StatusCode::FORBIDDEN,
                OrderFlowError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
                OrderFlowError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::InvalidOrder(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::FeedbackRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
                OrderFlowError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("The request does not say who is making it. Set the fdg_actor header.")]
    MissingActor,
    #[error("The actor headers are not valid. {0}")]
    InvalidActor(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}
