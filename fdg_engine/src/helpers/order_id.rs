use rand::Rng;

use crate::db_types::OrderId;

pub const ORDER_ID_PREFIX: &str = "FDG-";
const ORDER_ID_LEN: usize = 10;
// No 0/O or 1/I, so the rider code can be read out loud.
const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates a fresh client-visible order id, e.g. `FDG-7KQ2M9XHRT`.
pub fn generate_order_id() -> OrderId {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ORDER_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();
    OrderId(format!("{ORDER_ID_PREFIX}{suffix}"))
}
