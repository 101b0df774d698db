//! Food Delivery Gateway engine
//!
//! This library contains the core logic of the order lifecycle and delivery economics engine. It is agnostic of the
//! HTTP layer and of the distance service provider.
//!
//! The library is divided into these sections:
//! 1. Storage ([`traits`] and, with the `sqlite` feature, [`SqliteDatabase`]). You should never need to access the
//!    database directly. Instead, use the public API. The exception is the data types used in the database. These are
//!    defined in the [`db_types`] module and are public.
//! 2. The engine API ([`mod@engine_api`]): delivery quotes, order placement, the order state machine, rider codes,
//!    payment callbacks and feedback.
//! 3. Events ([`events`]): hooks that are called after orders are placed, change status, or are paid, and the
//!    real-time [`events::SyncHub`] that tells viewers when an order has changed.
pub mod db_types;
pub mod engine_api;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteDatabaseError};

pub use engine_api::{
    errors::OrderFlowError,
    order_flow_api::{OrderFlowApi, OrderSettings},
    order_objects,
    quote_api::{DeliveryQuote, DeliveryQuoteApi},
};
