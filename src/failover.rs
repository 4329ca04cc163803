//! Ordered Failover
//!
//! One loop for every prioritized provider list in the crate: sheet
//! strategies and language-model identifiers. Providers are tried in order;
//! the first usable result wins, failures are logged and kept for the caller.

use crate::error::Result;
use std::future::Future;
use tracing::{info, warn};

/// A provider that failed or produced an unusable result
#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttempt {
    pub provider: String,
    pub reason: String,
}

/// Winning result of a failover run
#[derive(Debug)]
pub struct Success<T> {
    pub provider: String,
    pub value: T,
    pub failures: Vec<FailedAttempt>,
}

/// Every provider failed
#[derive(Debug, Default)]
pub struct Exhausted {
    pub failures: Vec<FailedAttempt>,
}

impl Exhausted {
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            return "no providers configured".to_string();
        }
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.provider, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Try `call` on each provider in order.
///
/// * `label` - display name of a provider, used in logs and failure records
/// * `usable` - rejects successful-but-useless results (e.g. empty tables);
///   a rejected result counts as a failure and the loop moves on
pub async fn first_success<'a, P, T, F, Fut>(
    providers: &'a [P],
    label: impl Fn(&P) -> String,
    mut call: F,
    usable: impl Fn(&T) -> bool,
) -> std::result::Result<Success<T>, Exhausted>
where
    F: FnMut(&'a P) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failures = Vec::new();

    for provider in providers {
        let name = label(provider);
        match call(provider).await {
            Ok(value) if usable(&value) => {
                info!(provider = %name, "Provider succeeded");
                return Ok(Success {
                    provider: name,
                    value,
                    failures,
                });
            }
            Ok(_) => {
                warn!(provider = %name, "Provider returned an empty result");
                failures.push(FailedAttempt {
                    provider: name,
                    reason: "empty result".to_string(),
                });
            }
            Err(e) => {
                warn!(provider = %name, error = %e, "Provider failed");
                failures.push(FailedAttempt {
                    provider: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    Err(Exhausted { failures })
}
