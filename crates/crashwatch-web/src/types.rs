//! Wire shapes served by the HTTP boundary.

use std::collections::BTreeMap;

use serde::Serialize;

use crashwatch_core::{
    CrashRiskBreakdown, IndicatorKey, IndicatorReading, Quote, RiskLevel, Status,
};

/// `GET /api/indicators/:key` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorResponse {
    pub value: f64,
    pub status: Status,
    pub historical_avg: f64,
    pub warning_level: f64,
    pub danger_level: f64,
    pub timestamp: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&IndicatorReading> for IndicatorResponse {
    fn from(reading: &IndicatorReading) -> Self {
        Self {
            value: reading.value(),
            status: reading.status(),
            historical_avg: reading.historical_average(),
            warning_level: reading.warning_level(),
            danger_level: reading.danger_level(),
            timestamp: reading.timestamp().format_rfc3339(),
            description: reading.description().to_owned(),
            error: reading.source_error().map(str::to_owned),
        }
    }
}

/// `GET /api/quotes/:instrument` success body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub value: f64,
    pub change: f64,
    pub change_percent: f64,
    pub timestamp: String,
}

impl From<&Quote> for QuoteResponse {
    fn from(quote: &Quote) -> Self {
        Self {
            value: quote.value,
            change: quote.change,
            change_percent: quote.change_percent,
            timestamp: quote.timestamp.format_rfc3339(),
        }
    }
}

/// Quote failure body; numeric fields are zeroed so clients keep one shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteErrorResponse {
    pub error: String,
    pub value: f64,
    pub change: f64,
    pub change_percent: f64,
    pub timestamp: String,
}

/// Per-indicator line of the crash-risk view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorStatus {
    pub value: f64,
    pub status: Status,
    pub sub_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/crash-risk` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashRiskResponse {
    pub total_score: u8,
    pub risk_level: RiskLevel,
    pub active_warnings: usize,
    pub critical_warnings: usize,
    pub weights: BTreeMap<IndicatorKey, f64>,
    pub indicators: BTreeMap<IndicatorKey, IndicatorStatus>,
    pub cycle_id: String,
    pub timestamp: String,
}

impl CrashRiskResponse {
    pub fn new<'a>(
        breakdown: &CrashRiskBreakdown,
        readings: impl IntoIterator<Item = &'a IndicatorReading>,
        cycle_id: String,
        timestamp: String,
    ) -> Self {
        let indicators = readings
            .into_iter()
            .map(|reading| {
                let line = IndicatorStatus {
                    value: reading.value(),
                    status: reading.status(),
                    sub_score: breakdown
                        .components
                        .get(&reading.key())
                        .copied()
                        .unwrap_or(0.0),
                    error: reading.source_error().map(str::to_owned),
                };
                (reading.key(), line)
            })
            .collect();

        Self {
            total_score: breakdown.total_score,
            risk_level: breakdown.risk_level,
            active_warnings: breakdown.active_warnings,
            critical_warnings: breakdown.critical_warnings,
            weights: breakdown.weights.clone(),
            indicators,
            cycle_id,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub providers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
