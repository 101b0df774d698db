use chrono::Utc;
use fdg_common::Amount;
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db_types::{Feedback, NewOrder, Order, OrderId, OrderStatusType, PaymentSettlement},
    engine_api::order_objects::OrderQueryFilter,
    sqlite::SqliteDatabaseError,
};

fn decode_error<E>(column: &str, e: E) -> sqlx::Error
where E: std::error::Error + Send + Sync + 'static {
    sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(e) }
}

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let items_json: String = row.try_get("items")?;
        let items = serde_json::from_str(&items_json).map_err(|e| decode_error("items", e))?;
        let payment_method =
            row.try_get::<String, _>("payment_method")?.parse().map_err(|e| decode_error("payment_method", e))?;
        let status = row.try_get::<String, _>("status")?.parse().map_err(|e| decode_error("status", e))?;
        let feedback_rating = row
            .try_get::<Option<i64>, _>("feedback_rating")?
            .map(u8::try_from)
            .transpose()
            .map_err(|e| decode_error("feedback_rating", e))?;
        Ok(Order {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            customer_id: row.try_get("customer_id")?,
            items,
            subtotal: row.try_get::<Amount, _>("subtotal")?,
            service_charge: row.try_get::<Amount, _>("service_charge")?,
            delivery_fee: row.try_get::<Amount, _>("delivery_fee")?,
            total: row.try_get::<Amount, _>("total")?,
            payment_method,
            paid: row.try_get("paid")?,
            amount_paid_online: row.try_get::<Amount, _>("amount_paid_online")?,
            amount_due_on_delivery: row.try_get::<Amount, _>("amount_due_on_delivery")?,
            payment_reference: row.try_get("payment_reference")?,
            paid_at: row.try_get("paid_at")?,
            status,
            delivery_distance: row.try_get("delivery_distance")?,
            delivery_duration: row.try_get("delivery_duration")?,
            delivery_time: row.try_get("delivery_time")?,
            selected_branch_id: row.try_get("selected_branch_id")?,
            address: row.try_get("address")?,
            apartment_flat: row.try_get("apartment_flat")?,
            label: row.try_get("label")?,
            rider_code: row.try_get("rider_code")?,
            feedback_rating,
            feedback_comment: row.try_get("feedback_comment")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Inserts a new order with `pending` status. Fails if an order with the same `order_id` already exists.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SqliteDatabaseError> {
    let items = serde_json::to_string(&order.items).map_err(|e| SqliteDatabaseError::EncodingError(e.to_string()))?;
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                items,
                subtotal,
                service_charge,
                delivery_fee,
                total,
                payment_method,
                amount_paid_online,
                amount_due_on_delivery,
                delivery_distance,
                delivery_duration,
                delivery_time,
                selected_branch_id,
                address,
                apartment_flat,
                label,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.customer_id)
    .bind(items)
    .bind(order.subtotal)
    .bind(order.service_charge)
    .bind(order.delivery_fee)
    .bind(order.total)
    .bind(order.payment_method.as_str())
    .bind(order.amount_paid_online)
    .bind(order.amount_due_on_delivery)
    .bind(order.delivery_distance)
    .bind(order.delivery_duration)
    .bind(order.delivery_time)
    .bind(order.selected_branch_id)
    .bind(order.address)
    .bind(order.apartment_flat)
    .bind(order.label)
    .bind(order.created_at)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order [{}] inserted with id {}", order.order_id, order.id);
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if !query.statuses.is_empty() {
        // Statuses come from a closed enum, so inlining them is safe
        let statuses = query.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Writes `new_status` if, and only if, the current status is `expected`.
pub async fn compare_and_set_status(
    order_id: &OrderId,
    expected: OrderStatusType,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE order_id = $3 AND status = $4 RETURNING *",
    )
    .bind(new_status.as_str())
    .bind(Utc::now())
    .bind(order_id.as_str())
    .bind(expected.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Sets the rider code if the order has none. Returns true if this call wrote it.
pub async fn set_rider_code_if_absent(
    order_id: &OrderId,
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET rider_code = $1, updated_at = $2 WHERE order_id = $3 AND (rider_code IS NULL OR rider_code = \
         '')",
    )
    .bind(code)
    .bind(Utc::now())
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Flips `paid` and records the settlement, if the order is not already paid.
pub async fn mark_order_paid(
    order_id: &OrderId,
    settlement: &PaymentSettlement,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"UPDATE orders SET paid = 1, payment_reference = $1, paid_at = $2, updated_at = $3
           WHERE order_id = $4 AND paid = 0
           RETURNING *"#,
    )
    .bind(settlement.reference.as_str())
    .bind(settlement.paid_at)
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Stores feedback if the order is delivered and has not been rated yet.
pub async fn save_feedback(
    order_id: &OrderId,
    feedback: &Feedback,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"UPDATE orders SET feedback_rating = $1, feedback_comment = $2, updated_at = $3
           WHERE order_id = $4 AND status = 'delivered' AND feedback_rating IS NULL
           RETURNING *"#,
    )
    .bind(i64::from(feedback.rating))
    .bind(feedback.comment.as_deref())
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
