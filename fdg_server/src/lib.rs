//! # FDG server
//! This module hosts the HTTP service for the food delivery gateway. It is responsible for:
//! * Quoting delivery fees and accepting new orders from customers.
//! * Moving orders through their lifecycle on behalf of operators (and cancellations on behalf of customers).
//! * Receiving payment callbacks from the payment gateway.
//! * Streaming live order updates to viewers as server-sent events.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The order API. Callers identify themselves with the `fdg_actor` and `fdg_customer_id` headers.
//! * `/payments/callback`: The payment gateway callback. Requests must carry a valid `x-fdg-signature` HMAC.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod sse;

#[cfg(test)]
mod endpoint_tests;
