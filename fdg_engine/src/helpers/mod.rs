mod distance_text;
mod order_id;

pub use distance_text::{parse_distance_km, parse_duration_minutes};
pub use order_id::{generate_order_id, ORDER_ID_PREFIX};
