use std::time::Duration;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    engine_api::{
        branches::BranchDirectory,
        economics::{FeeQuote, FeeSchedule},
        errors::OrderFlowError,
        fallback::{ResolveWithFallback, Resolution},
    },
    traits::{DistanceInfo, DistanceResolver},
};

pub const ESTIMATED_FEE_WARNING: &str = "using estimated delivery fee";
pub const DEFAULT_DISTANCE_TIMEOUT: Duration = Duration::from_secs(5);

/// A delivery fee quote, together with the route information it was based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryQuote {
    #[serde(flatten)]
    pub fee: FeeQuote,
    pub distance_meters: u64,
    pub distance_text: String,
    pub duration_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DeliveryQuote {
    fn without_route(fee: FeeQuote) -> Self {
        Self { fee, distance_meters: 0, distance_text: String::new(), duration_text: String::new(), warning: None }
    }
}

/// `DeliveryQuoteApi` prices deliveries from a branch to a customer address.
///
/// The distance service is called under a resolve-with-fallback policy. If it fails or is too slow, the conservative
/// fallback fee is quoted along with a soft warning, and the order can still be placed.
pub struct DeliveryQuoteApi<R> {
    resolver: R,
    branches: BranchDirectory,
    schedule: FeeSchedule,
    policy: ResolveWithFallback<(FeeQuote, DistanceInfo)>,
}

impl<R> DeliveryQuoteApi<R> {
    pub fn new(resolver: R, branches: BranchDirectory, schedule: FeeSchedule, timeout: Duration) -> Self {
        let policy = ResolveWithFallback::new(timeout, (schedule.fallback_quote(), DistanceInfo::default()));
        Self { resolver, branches, schedule, policy }
    }

    pub fn branches(&self) -> &BranchDirectory {
        &self.branches
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }
}

impl<R> DeliveryQuoteApi<R>
where R: DistanceResolver
{
    /// Quotes the delivery fee from `branch_id` to `address`.
    ///
    /// Without an address the provisional placeholder is returned. A paused branch is never deliverable, and the
    /// distance service is not consulted.
    pub async fn quote(&self, branch_id: &str, address: Option<&str>) -> Result<DeliveryQuote, OrderFlowError> {
        let branch = self
            .branches
            .get(branch_id)
            .ok_or_else(|| OrderFlowError::InvalidOrder(format!("Unknown branch '{branch_id}'")))?;
        if branch.paused {
            debug!("🔄️🚚️ Branch {branch_id} is paused. Deliveries are unavailable");
            return Ok(DeliveryQuote::without_route(FeeQuote::unserviceable()));
        }
        let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) else {
            return Ok(DeliveryQuote::without_route(self.schedule.placeholder_quote()));
        };
        let lookup = async {
            let info = self.resolver.resolve_distance(&branch.address, address).await?;
            // A resolved address right next to the branch still counts as a real distance
            let fee = self.schedule.compute_fee(info.distance_meters.max(1), true);
            Ok::<_, OrderFlowError>((fee, info))
        };
        let quote = match self.policy.resolve(lookup).await {
            Resolution::Resolved((fee, info)) => {
                debug!("🔄️🚚️ {branch_id} → '{address}' is {} ({}). Fee {}", info.distance_text, info.duration_text, fee.fee);
                DeliveryQuote {
                    fee,
                    distance_meters: info.distance_meters,
                    distance_text: info.distance_text,
                    duration_text: info.duration_text,
                    warning: None,
                }
            },
            Resolution::Fallback { value: (fee, _), reason } => {
                warn!("🔄️🚚️ Could not price delivery from {branch_id} to '{address}'. {reason}");
                let mut quote = DeliveryQuote::without_route(fee);
                quote.warning = Some(ESTIMATED_FEE_WARNING.to_string());
                quote
            },
        };
        Ok(quote)
    }
}
