//! Bounded polling for engine state that converges asynchronously.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// How often and how many times to re-read a resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollPolicy {
    /// Re-reads after the initial observation
    pub attempts: u32,
    /// Sleep before each re-read
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// No sleeping between re-reads.
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }
}

/// Result of a polling run. Both variants carry the last observed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Exhausted(T),
}

impl<T> PollOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            PollOutcome::Ready(v) | PollOutcome::Exhausted(v) => v,
        }
    }
}

/// Check `initial`, then re-fetch up to `policy.attempts` times until
/// `ready` holds. Fetch errors abort the run.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: &PollPolicy,
    initial: T,
    mut refetch: F,
    ready: P,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let mut current = initial;
    if ready(&current) {
        return Ok(PollOutcome::Ready(current));
    }

    for attempt in 0..policy.attempts {
        log::debug!(
            "not ready (attempt {}/{}), retrying in {:?}",
            attempt + 1,
            policy.attempts,
            policy.interval
        );
        if !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
        current = refetch().await?;
        if ready(&current) {
            return Ok(PollOutcome::Ready(current));
        }
    }

    Ok(PollOutcome::Exhausted(current))
}
