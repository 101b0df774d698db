//! Delivery economics: the fee calculator, the hard distance cap and the payment reconciler.
//!
//! Everything in this module is pure. It is used once at placement to fix the monetary fields of an order, and can be
//! re-run against a persisted order at any time to check that its totals still add up.
use fdg_common::{Amount, AmountOverflow};
use serde::{Deserialize, Serialize};

use crate::{db_types::PaymentMethod, helpers::parse_distance_km};

pub const DEFAULT_SERVICE_CHARGE: Amount = Amount::new(200);
pub const DEFAULT_PLACEHOLDER_FEE: Amount = Amount::new(800);
pub const DEFAULT_FALLBACK_FEE: Amount = Amount::new(2000);
pub const DEFAULT_HARD_CAP_KM: f64 = 18.0;

/// How a delivery fee was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBasis {
    /// No address has been resolved yet. Display only, never persisted.
    Placeholder,
    /// Computed from a resolved distance.
    Distance,
    /// The distance service was unavailable and the conservative fallback fee applies.
    Fallback,
    /// Outside the serviceable area, or the branch is not taking deliveries.
    Unserviceable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub fee: Amount,
    pub deliverable: bool,
    pub basis: FeeBasis,
}

impl FeeQuote {
    pub fn unserviceable() -> Self {
        Self { fee: Amount::zero(), deliverable: false, basis: FeeBasis::Unserviceable }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    pub placeholder_fee: Amount,
    pub fallback_fee: Amount,
    pub base_fee: Amount,
    pub base_distance_meters: u64,
    pub fee_per_km: Amount,
    pub service_radius_meters: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            placeholder_fee: DEFAULT_PLACEHOLDER_FEE,
            fallback_fee: DEFAULT_FALLBACK_FEE,
            base_fee: Amount::new(500),
            base_distance_meters: 5_000,
            fee_per_km: Amount::new(100),
            service_radius_meters: 15_000,
        }
    }
}

impl FeeSchedule {
    /// Computes the delivery fee for a resolved distance.
    ///
    /// * A branch that is not deliverable always yields `deliverable = false` with a zero fee.
    /// * A zero distance means no address has been resolved, and the provisional placeholder fee is returned.
    /// * Beyond the serviceable radius the order is not deliverable.
    /// * Otherwise the fee is the base fee, plus `fee_per_km` for every started kilometre beyond the base distance.
    pub fn compute_fee(&self, distance_meters: u64, is_deliverable: bool) -> FeeQuote {
        if !is_deliverable {
            return FeeQuote::unserviceable();
        }
        if distance_meters == 0 {
            return self.placeholder_quote();
        }
        if distance_meters > self.service_radius_meters {
            return FeeQuote::unserviceable();
        }
        let extra_meters = distance_meters.saturating_sub(self.base_distance_meters);
        let started_km = i64::try_from(extra_meters.div_ceil(1000)).unwrap_or(i64::MAX);
        let fee = self.base_fee + self.fee_per_km * started_km;
        FeeQuote { fee, deliverable: true, basis: FeeBasis::Distance }
    }

    pub fn placeholder_quote(&self) -> FeeQuote {
        FeeQuote { fee: self.placeholder_fee, deliverable: true, basis: FeeBasis::Placeholder }
    }

    pub fn fallback_quote(&self) -> FeeQuote {
        FeeQuote { fee: self.fallback_fee, deliverable: true, basis: FeeBasis::Fallback }
    }
}

/// True if the distance described by `distance_text` is strictly greater than `cap_km`.
///
/// Text that cannot be parsed counts as zero and never trips the cap.
pub fn exceeds_hard_cap(distance_text: &str, cap_km: f64) -> bool {
    parse_distance_km(distance_text) > cap_km
}

/// The split of an order total between what is charged online now, and what the rider collects on delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub amount_paid_online: Amount,
    pub amount_due_on_delivery: Amount,
    pub total: Amount,
}

/// Splits an order into its online and on-delivery portions.
///
/// For `cash` orders the food and service charge are paid online and the rider collects the delivery fee. For every
/// other method the whole total is paid online.
pub fn reconcile(
    subtotal: Amount,
    delivery_fee: Amount,
    service_charge: Amount,
    payment_method: PaymentMethod,
) -> Result<PaymentSplit, AmountOverflow> {
    let before_delivery = subtotal.checked_add(service_charge)?;
    let total = before_delivery.checked_add(delivery_fee)?;
    let split = match payment_method {
        PaymentMethod::Cash => {
            PaymentSplit { amount_paid_online: before_delivery, amount_due_on_delivery: delivery_fee, total }
        },
        PaymentMethod::Card | PaymentMethod::Transfer | PaymentMethod::Wallet => {
            PaymentSplit { amount_paid_online: total, amount_due_on_delivery: Amount::zero(), total }
        },
    };
    Ok(split)
}
