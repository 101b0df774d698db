use thiserror::Error;

use crate::engine_api::errors::OrderFlowError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Could not encode order data: {0}")]
    EncodingError(String),
}

impl From<SqliteDatabaseError> for OrderFlowError {
    fn from(e: SqliteDatabaseError) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
