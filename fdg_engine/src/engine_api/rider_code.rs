//! Rider confirmation codes.
//!
//! The code is a 4-character handshake token shown to the customer and quoted to the rider at drop-off. It carries no
//! cryptographic guarantee.
use crate::db_types::OrderId;

pub const RIDER_CODE_LEN: usize = 4;

/// Derives the rider code for an order: the last four characters of the order id, uppercased. Shorter ids are
/// left-padded with `0`.
pub fn derive_rider_code(order_id: &OrderId) -> String {
    let chars = order_id.as_str().chars().collect::<Vec<_>>();
    let tail = &chars[chars.len().saturating_sub(RIDER_CODE_LEN)..];
    let code = tail.iter().collect::<String>().to_uppercase();
    format!("{code:0>RIDER_CODE_LEN$}")
}

/// Compares a code quoted by a rider against the stored one, ignoring case and surrounding whitespace.
pub fn rider_code_matches(stored: &str, presented: &str) -> bool {
    !stored.is_empty() && stored.eq_ignore_ascii_case(presented.trim())
}
