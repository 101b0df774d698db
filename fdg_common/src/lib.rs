mod amount;

pub mod helpers;
pub mod op;
mod secret;

pub use amount::{Amount, AmountConversionError, AmountOverflow};
pub use secret::Secret;
