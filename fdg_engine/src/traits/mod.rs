//! # Backend contracts
//!
//! This module defines the behaviour that storage backends and external collaborators must expose to drive the order
//! lifecycle.
//!
//! * [`OrderManagement`] provides read-only queries over orders.
//! * [`DeliveryDatabase`] is the full storage contract. Every mutating method is a single conditional write, so that a
//!   backend enforces "compare and set" semantics on the `status`, `paid`, `rider_code` and feedback fields.
//! * [`DistanceResolver`] wraps the external distance service.
mod delivery_database;
mod distance_resolver;
mod order_management;

pub use delivery_database::DeliveryDatabase;
pub use distance_resolver::{DistanceInfo, DistanceResolver};
pub use order_management::OrderManagement;
