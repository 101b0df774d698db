//! A single retry-free "resolve-with-fallback" policy for calls to external services.
//!
//! The policy wraps one call site. The call is given a bounded amount of time. If it fails or times out, the configured
//! fallback value is used instead and the reason is reported to the caller so that it can surface a soft warning.
use std::{fmt::Display, future::Future, time::Duration};

use log::*;

#[derive(Debug, Clone)]
pub struct ResolveWithFallback<T> {
    timeout: Duration,
    fallback: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Resolved(T),
    Fallback { value: T, reason: String },
}

impl<T> Resolution<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Resolution::Resolved(v) => v,
            Resolution::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Resolution::Resolved(v) => v,
            Resolution::Fallback { value, .. } => value,
        }
    }
}

impl<T: Clone> ResolveWithFallback<T> {
    pub fn new(timeout: Duration, fallback: T) -> Self {
        Self { timeout, fallback }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn fallback(&self) -> &T {
        &self.fallback
    }

    /// Runs `fut` under the policy.
    pub async fn resolve<F, E>(&self, fut: F) -> Resolution<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Resolution::Resolved(value),
            Ok(Err(e)) => {
                warn!("🔄️ External call failed, using the fallback value. {e}");
                Resolution::Fallback { value: self.fallback.clone(), reason: e.to_string() }
            },
            Err(_) => {
                warn!("🔄️ External call did not complete within {}ms, using the fallback value", self.timeout.as_millis());
                let reason = format!("timed out after {}ms", self.timeout.as_millis());
                Resolution::Fallback { value: self.fallback.clone(), reason }
            },
        }
    }
}
