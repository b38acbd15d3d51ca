//! Route handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crashwatch_core::{IndicatorKey, Instrument, MarketSnapshot};

use crate::error::WebError;
use crate::server::AppState;
use crate::types::{CrashRiskResponse, HealthResponse, IndicatorResponse, QuoteResponse};

/// `GET /api/indicators/:key`. Degraded readings still answer 200.
pub async fn get_indicator(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<IndicatorResponse>, WebError> {
    let key = key.parse::<IndicatorKey>()?;
    let reading = state.poller.aggregator().indicator(key).await;
    Ok(Json(IndicatorResponse::from(&reading)))
}

/// `GET /api/quotes/:instrument`.
pub async fn get_quote(
    State(state): State<AppState>,
    Path(instrument): Path<String>,
) -> Result<Json<QuoteResponse>, WebError> {
    let instrument = instrument.parse::<Instrument>()?;
    let quote = state
        .poller
        .aggregator()
        .quote(instrument)
        .await
        .map_err(WebError::Quote)?;
    Ok(Json(QuoteResponse::from(&quote)))
}

/// `GET /api/crash-risk`.
pub async fn get_crash_risk(State(state): State<AppState>) -> Json<CrashRiskResponse> {
    let snapshot = current_snapshot(&state).await;
    Json(CrashRiskResponse::new(
        &snapshot.crash_risk,
        snapshot.indicators.iter(),
        snapshot.cycle_id.to_string(),
        snapshot.taken_at.format_rfc3339(),
    ))
}

/// `GET /api/snapshot`.
pub async fn get_snapshot(State(state): State<AppState>) -> Json<MarketSnapshot> {
    let snapshot = current_snapshot(&state).await;
    Json(MarketSnapshot::clone(&snapshot))
}

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers = state
        .poller
        .aggregator()
        .providers()
        .into_iter()
        .map(|provider| provider.to_string())
        .collect();

    Json(HealthResponse {
        status: "ok",
        providers,
        last_cycle_id: state
            .poller
            .latest()
            .map(|snapshot| snapshot.cycle_id.to_string()),
    })
}

/// Latest published snapshot, or a fresh cycle when none exists yet.
async fn current_snapshot(state: &AppState) -> Arc<MarketSnapshot> {
    match state.poller.latest() {
        Some(snapshot) => snapshot,
        None => state.poller.poll_once().await,
    }
}
