use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::data_source::SourceError;
use crate::provider_policy::ProviderPolicy;
use crate::ProviderId;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Client-side request budget for one provider.
///
/// An exhausted budget fails fast with `RATE_LIMITED` instead of spending a
/// request the provider would reject anyway.
#[derive(Clone)]
pub struct RateBudget {
    provider_id: ProviderId,
    limiter: Arc<DirectRateLimiter>,
}

impl std::fmt::Debug for RateBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateBudget")
            .field("provider_id", &self.provider_id)
            .finish_non_exhaustive()
    }
}

impl RateBudget {
    pub fn new(provider_id: ProviderId, quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            provider_id,
            limiter: Arc::new(RateLimiter::direct(quota_from_window(
                quota_window,
                quota_limit,
            ))),
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(policy.provider_id, policy.quota_window, policy.quota_limit)
    }

    pub const fn provider_id(&self) -> ProviderId {
        self.provider_id
    }

    pub fn acquire(&self) -> Result<(), SourceError> {
        self.limiter.check().map_err(|_| {
            SourceError::rate_limited(
                self.provider_id,
                format!("client-side request budget for '{}' exhausted", self.provider_id),
            )
        })
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let burst = NonZeroU32::new(quota_limit.max(1)).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
