use std::time::Duration;

use crate::ProviderId;

/// Published request quota of a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
}

impl ProviderPolicy {
    /// Free tier: 5 requests per minute.
    pub fn alphavantage_default() -> Self {
        Self {
            provider_id: ProviderId::Alphavantage,
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
        }
    }

    pub fn fred_default() -> Self {
        Self {
            provider_id: ProviderId::Fred,
            quota_window: Duration::from_secs(60),
            quota_limit: 120,
        }
    }

    pub fn nasdaq_default() -> Self {
        Self {
            provider_id: ProviderId::Nasdaq,
            quota_window: Duration::from_secs(10),
            quota_limit: 300,
        }
    }

    /// Yahoo publishes no quota for the chart endpoint.
    pub fn default_for(provider_id: ProviderId) -> Option<Self> {
        match provider_id {
            ProviderId::Alphavantage => Some(Self::alphavantage_default()),
            ProviderId::Fred => Some(Self::fred_default()),
            ProviderId::Nasdaq => Some(Self::nasdaq_default()),
            ProviderId::Yahoo => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphavantage_policy_matches_free_tier() {
        let policy = ProviderPolicy::alphavantage_default();

        assert_eq!(policy.provider_id, ProviderId::Alphavantage);
        assert_eq!(policy.quota_window, Duration::from_secs(60));
        assert_eq!(policy.quota_limit, 5);
    }

    #[test]
    fn yahoo_has_no_policy() {
        assert!(ProviderPolicy::default_for(ProviderId::Yahoo).is_none());
        assert!(ProviderPolicy::default_for(ProviderId::Fred).is_some());
    }
}
