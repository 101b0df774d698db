use std::{env, fmt::Display, str::FromStr, time::Duration};

use fdg_common::{helpers::parse_boolean_flag, Amount, Secret};
use fdg_engine::{
    engine_api::{
        branches::BranchDirectory,
        economics::{FeeSchedule, DEFAULT_HARD_CAP_KM},
        order_flow_api::DEFAULT_PREP_TIME_MINUTES,
        quote_api::DEFAULT_DISTANCE_TIMEOUT,
    },
    OrderSettings,
};
use log::*;
use maps_tools::MapsConfig;

const DEFAULT_FDG_HOST: &str = "127.0.0.1";
const DEFAULT_FDG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/fdg_store.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Delivery origins. Paused branches are included, flagged as such.
    pub branches: BranchDirectory,
    pub fee_schedule: FeeSchedule,
    pub order_settings: OrderSettings,
    /// How long a delivery quote waits for the distance service before falling back to the estimated fee
    pub distance_timeout: Duration,
    pub maps_config: MapsConfig,
    pub payment_webhook: PaymentWebhookConfig,
}

#[derive(Clone, Debug, Default)]
pub struct PaymentWebhookConfig {
    /// Shared secret used to sign payment gateway callbacks
    pub hmac_secret: Secret<String>,
    /// If false, callback signatures are not checked. **DANGER**
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FDG_HOST.to_string(),
            port: DEFAULT_FDG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            branches: BranchDirectory::default(),
            fee_schedule: FeeSchedule::default(),
            order_settings: OrderSettings::default(),
            distance_timeout: DEFAULT_DISTANCE_TIMEOUT,
            maps_config: MapsConfig::default(),
            payment_webhook: PaymentWebhookConfig { hmac_secret: Secret::default(), hmac_checks: true },
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FDG_HOST").ok().unwrap_or_else(|| DEFAULT_FDG_HOST.into());
        let port = env_or_default("FDG_PORT", DEFAULT_FDG_PORT);
        let database_url = env::var("FDG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ FDG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let branches = configure_branches();
        let fee_schedule = configure_fee_schedule();
        let order_settings = OrderSettings {
            service_charge: Amount::from(env_or_default("FDG_SERVICE_CHARGE", 200i64)),
            hard_cap_km: env_or_default("FDG_HARD_CAP_KM", DEFAULT_HARD_CAP_KM),
            prep_time: chrono::Duration::minutes(env_or_default("FDG_PREP_TIME_MINUTES", DEFAULT_PREP_TIME_MINUTES)),
        };
        let default_timeout_ms = u64::try_from(DEFAULT_DISTANCE_TIMEOUT.as_millis()).unwrap_or(5_000);
        let distance_timeout = Duration::from_millis(env_or_default("FDG_DISTANCE_TIMEOUT_MS", default_timeout_ms));
        let maps_config = MapsConfig::new_from_env_or_default();
        let payment_webhook = PaymentWebhookConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            branches,
            fee_schedule,
            order_settings,
            distance_timeout,
            maps_config,
            payment_webhook,
        }
    }
}

impl PaymentWebhookConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("FDG_PAYMENT_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ FDG_PAYMENT_WEBHOOK_SECRET is not set. Payment callbacks cannot be verified and will be rejected."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("FDG_PAYMENT_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Payment callback signature checks are DISABLED. Anyone can mark orders as paid. 🚨️");
        }
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}

fn configure_branches() -> BranchDirectory {
    let definition = env::var("FDG_BRANCHES").unwrap_or_default();
    let branches = BranchDirectory::parse(&definition).unwrap_or_else(|e| {
        error!("🪛️ FDG_BRANCHES is invalid. {e}. No branches will be available.");
        BranchDirectory::default()
    });
    if branches.is_empty() {
        warn!("🪛️ No branches are configured. Set FDG_BRANCHES to `id=address;id=address`.");
    }
    let paused = env::var("FDG_PAUSED_BRANCHES")
        .map(|s| s.split(',').map(|id| id.trim().to_string()).filter(|id| !id.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default();
    if !paused.is_empty() {
        info!("🪛️ Deliveries are paused for: {}", paused.join(", "));
    }
    branches.pause(&paused)
}

fn configure_fee_schedule() -> FeeSchedule {
    let defaults = FeeSchedule::default();
    let km_to_meters = |km: f64| (km.max(0.0) * 1000.0).round() as u64;
    FeeSchedule {
        placeholder_fee: Amount::from(env_or_default("FDG_PLACEHOLDER_FEE", defaults.placeholder_fee.value())),
        fallback_fee: Amount::from(env_or_default("FDG_FALLBACK_FEE", defaults.fallback_fee.value())),
        base_fee: Amount::from(env_or_default("FDG_BASE_FEE", defaults.base_fee.value())),
        base_distance_meters: km_to_meters(env_or_default(
            "FDG_BASE_DISTANCE_KM",
            defaults.base_distance_meters as f64 / 1000.0,
        )),
        fee_per_km: Amount::from(env_or_default("FDG_FEE_PER_KM", defaults.fee_per_km.value())),
        service_radius_meters: km_to_meters(env_or_default(
            "FDG_SERVICE_RADIUS_KM",
            defaults.service_radius_meters as f64 / 1000.0,
        )),
    }
}

/// Reads and parses `name`, falling back to `default` (with a warning) if the value is invalid.
fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}
