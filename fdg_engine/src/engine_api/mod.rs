//! # Order lifecycle engine API
//!
//! The `engine_api` module exposes the programmatic API of the engine. As with the storage traits, an API instance is
//! created by supplying a backend that implements the traits the API needs.
//!
//! * [`quote_api`] prices deliveries from a branch to an address, with a fallback when the distance service is down.
//! * [`order_flow_api`] places orders and drives them through their lifecycle: status transitions, rider codes, payment
//!   callbacks and feedback.
//! * [`economics`] holds the pure fee calculator and payment reconciler.
//! * [`state_machine`] decides which status transitions are legal.
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url("sqlite://data/fdg_store.db", 5).await?;
//! let quotes = DeliveryQuoteApi::new(resolver, branches, FeeSchedule::default(), DEFAULT_DISTANCE_TIMEOUT);
//! let orders = OrderFlowApi::new(db, producers);
//! let quote = quotes.quote(&request.selected_branch_id, Some(&request.address)).await?;
//! let placed = orders.place_order("customer-42", request, &quote).await?;
//! ```
pub mod branches;
pub mod economics;
pub mod errors;
pub mod fallback;
pub mod feedback;
pub mod order_flow_api;
pub mod order_locks;
pub mod order_objects;
pub mod payments;
pub mod quote_api;
pub mod rider_code;
pub mod state_machine;
