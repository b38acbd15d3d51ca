use serde::Serialize;

use crashwatch_core::{Aggregator, CacheMode, CrashRiskBreakdown, IndicatorKey};

use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RiskOutput<'a> {
    #[serde(flatten)]
    breakdown: &'a CrashRiskBreakdown,
    degraded_indicators: Vec<IndicatorKey>,
}

pub async fn run(aggregator: &Aggregator, pretty: bool) -> Result<(), CliError> {
    let indicators = aggregator.indicators(CacheMode::Use).await;
    let breakdown = aggregator.scorer().score(&indicators);

    output::render(
        &RiskOutput {
            breakdown: &breakdown,
            degraded_indicators: indicators.degraded_keys(),
        },
        pretty,
    )
}
