use std::fmt::Display;

use chrono::{DateTime, Utc};
use fdg_engine::{
    db_types::OrderStatusType,
    engine_api::state_machine::Transition,
    order_objects::OrderQueryFilter,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Query parameters for `GET /api/quote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteParams {
    pub branch_id: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// Query parameters for the operator order search.
///
/// `status` is a comma-separated list of statuses, e.g. `?status=pending,confirmed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderSearchParams {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

impl TryFrom<OrderSearchParams> for OrderQueryFilter {
    type Error = ServerError;

    fn try_from(params: OrderSearchParams) -> Result<Self, Self::Error> {
        let mut filter = OrderQueryFilter::default();
        if let Some(cid) = params.customer_id {
            filter = filter.with_customer_id(cid);
        }
        for s in params.status.iter().flat_map(|s| s.split(',')).map(str::trim).filter(|s| !s.is_empty()) {
            let status = s
                .parse::<OrderStatusType>()
                .map_err(|_| ServerError::InvalidRequestPath(format!("'{s}' is not a valid order status")))?;
            filter = filter.with_status(status);
        }
        if let Some(since) = params.since {
            filter = filter.since(since);
        }
        if let Some(until) = params.until {
            filter = filter.until(until);
        }
        Ok(filter)
    }
}

/// Body of a cancellation request. The body is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelParams {
    /// The status the client last saw. Repeated submissions with the same observed status are treated as duplicates.
    #[serde(default)]
    pub expected_status: Option<OrderStatusType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionParams {
    pub transition: Transition,
    #[serde(default)]
    pub expected_status: Option<OrderStatusType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequestParams {
    pub payer_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderCodeParams {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderCodeCheck {
    pub valid: bool,
}
