//! SQLite storage backend for the order lifecycle engine.
mod errors;
mod sqlite_impl;

pub mod db;
pub use errors::SqliteDatabaseError;
pub use sqlite_impl::SqliteDatabase;
