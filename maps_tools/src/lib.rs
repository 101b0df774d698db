//! # Maps tools
//!
//! A thin client for a hosted distance-matrix service. Given a delivery origin (a branch address) and a free-text
//! destination, [`MapsApi::distance`] returns the driving distance and duration, or a [`MapsApiError`].
//!
//! The client knows nothing about fees or orders. Callers are expected to wrap calls in their own timeout and fallback
//! policy.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::MapsApi;
pub use config::MapsConfig;
pub use data_objects::{DistanceElement, DistanceMatrixResponse, DistanceResult, DistanceRow, TextValue};
pub use error::MapsApiError;
