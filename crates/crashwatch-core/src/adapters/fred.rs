use std::sync::Arc;

use serde::Deserialize;

use super::{get_marked_json, normalize_key, ErrorMarked};
use crate::data_source::{
    CapabilitySet, DataSource, Observation, SeriesRequest, SourceError, SourceErrorKind,
    SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::throttling::RateBudget;
use crate::{Instrument, ProviderId, Quote};

pub const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Observations fetched per request; enough to skip a run of missing values.
const OBSERVATION_LIMIT: u32 = 10;

/// St. Louis Fed FRED adapter for macro series.
#[derive(Clone)]
pub struct FredAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl FredAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key: normalize_key(api_key),
            base_url: String::from(FRED_BASE_URL),
            rate_budget: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_rate_budget(mut self, rate_budget: RateBudget) -> Self {
        self.rate_budget = Some(rate_budget);
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn observations_url(&self, series_id: &str, api_key: &str) -> String {
        format!(
            "{}?series_id={}&api_key={}&file_type=json&sort_order=desc&limit={OBSERVATION_LIMIT}",
            self.base_url,
            urlencoding::encode(series_id),
            urlencoding::encode(api_key),
        )
    }

    async fn fetch_series(&self, req: SeriesRequest) -> Result<Observation, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::missing_credentials(ProviderId::Fred))?;
        if let Some(budget) = &self.rate_budget {
            budget.acquire()?;
        }

        let request = HttpRequest::get(self.observations_url(&req.series_id, api_key));
        let payload: FredObservationsResponse =
            get_marked_json(self.http_client.as_ref(), ProviderId::Fred, request).await?;

        latest_observation(&req.series_id, payload)
    }
}

impl DataSource for FredAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Fred
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::series_only()
    }

    fn series<'a>(&'a self, req: SeriesRequest) -> SourceFuture<'a, Observation> {
        Box::pin(self.fetch_series(req))
    }

    fn quote<'a>(&'a self, instrument: Instrument) -> SourceFuture<'a, Quote> {
        Box::pin(async move {
            Err(SourceError::unsupported_instrument(
                ProviderId::Fred,
                instrument,
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FredObservationsResponse {
    #[serde(default)]
    observations: Vec<FredObservation>,
    error_code: Option<u16>,
    error_message: Option<String>,
}

impl ErrorMarked for FredObservationsResponse {
    fn has_error_marker(&self) -> bool {
        self.error_code.is_some() || self.error_message.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FredObservation {
    date: String,
    /// Numeric string, or `"."` for a missing observation.
    value: String,
}

fn latest_observation(
    series_id: &str,
    payload: FredObservationsResponse,
) -> Result<Observation, SourceError> {
    if payload.has_error_marker() {
        let message = format!(
            "FRED error {}: {}",
            payload
                .error_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| String::from("?")),
            payload.error_message.as_deref().unwrap_or("unspecified"),
        );
        let rejects_key = payload
            .error_message
            .as_deref()
            .is_some_and(|text| text.contains("api_key"));
        return Err(match payload.error_code {
            Some(429) => SourceError::rate_limited(ProviderId::Fred, message),
            _ if rejects_key => {
                SourceError::new(SourceErrorKind::MissingCredentials, ProviderId::Fred, message)
            }
            _ => SourceError::invalid_response(ProviderId::Fred, message),
        });
    }

    payload
        .observations
        .into_iter()
        .filter_map(|observation| {
            let value = observation.value.trim().parse::<f64>().ok()?;
            value
                .is_finite()
                .then_some((observation.date, value))
        })
        .max_by(|left, right| left.0.cmp(&right.0))
        .map(|(date, value)| Observation {
            series_id: series_id.to_owned(),
            date,
            value,
            source: ProviderId::Fred,
        })
        .ok_or_else(|| {
            SourceError::invalid_response(
                ProviderId::Fred,
                format!("FRED series '{series_id}' has no numeric observation"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{FixtureHttpClient, HttpResponse};

    fn adapter(client: FixtureHttpClient, key: Option<&str>) -> FredAdapter {
        FredAdapter::new(Arc::new(client), key.map(str::to_owned))
    }

    #[tokio::test]
    async fn returns_most_recent_numeric_observation() {
        let client = FixtureHttpClient::new().respond_json(
            "series_id=T10Y2Y",
            r#"{"observations":[
                {"date":"2024-03-08","value":"."},
                {"date":"2024-03-07","value":"0.21"},
                {"date":"2024-03-06","value":"0.18"}
            ]}"#,
        );
        let fred = adapter(client.clone(), Some("fred-key"));

        let observation = fred
            .series(SeriesRequest::new("T10Y2Y").expect("valid id"))
            .await
            .expect("observation");

        assert_eq!(observation.value, 0.21);
        assert_eq!(observation.date, "2024-03-07");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.contains("api_key=fred-key"));
        assert!(requests[0].url.contains("file_type=json"));
        assert!(requests[0].url.contains("sort_order=desc"));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = FixtureHttpClient::new();
        let fred = adapter(client.clone(), None);

        let error = fred
            .series(SeriesRequest::new("GDP").expect("valid id"))
            .await
            .expect_err("no key");

        assert_eq!(error.code(), "MISSING_CREDENTIALS");
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn payload_error_marker_is_a_provider_error() {
        let client = FixtureHttpClient::new().respond_json(
            "series_id=GDP",
            r#"{"error_code":400,"error_message":"Bad Request. The series does not exist."}"#,
        );
        let error = adapter(client, Some("k"))
            .series(SeriesRequest::new("GDP").expect("valid id"))
            .await
            .expect_err("marker");

        assert_eq!(error.code(), "INVALID_RESPONSE");
        assert!(error.message().contains("series does not exist"));
    }

    #[tokio::test]
    async fn payload_rate_limit_marker_is_retryable() {
        let client = FixtureHttpClient::new().respond_json(
            "series_id=GDP",
            r#"{"error_code":429,"error_message":"Too Many Requests."}"#,
        );
        let error = adapter(client, Some("k"))
            .series(SeriesRequest::new("GDP").expect("valid id"))
            .await
            .expect_err("marker");

        assert_eq!(error.code(), "RATE_LIMITED");
        assert!(error.retryable());
    }

    #[tokio::test]
    async fn rejected_key_on_http_400_is_missing_credentials() {
        let client = FixtureHttpClient::new().respond(
            "series_id=GDP",
            HttpResponse::json(
                400,
                r#"{"error_code":400,"error_message":"Bad Request.  The value for variable api_key is not registered."}"#,
            ),
        );
        let error = adapter(client.clone(), Some("stale"))
            .series(SeriesRequest::new("GDP").expect("valid id"))
            .await
            .expect_err("rejected key");

        assert_eq!(error.code(), "MISSING_CREDENTIALS");
        assert!(!error.retryable());
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn client_error_without_marker_is_transport_failure() {
        let client = FixtureHttpClient::new()
            .respond("series_id=GDP", HttpResponse::json(404, r#"{"observations":[]}"#));
        let error = adapter(client, Some("k"))
            .series(SeriesRequest::new("GDP").expect("valid id"))
            .await
            .expect_err("404");

        assert_eq!(error.code(), "NETWORK_ERROR");
    }

    #[tokio::test]
    async fn only_missing_values_is_invalid_response() {
        let client = FixtureHttpClient::new().respond_json(
            "series_id=GDP",
            r#"{"observations":[{"date":"2024-01-01","value":"."}]}"#,
        );
        let error = adapter(client, Some("k"))
            .series(SeriesRequest::new("GDP").expect("valid id"))
            .await
            .expect_err("no numeric value");

        assert_eq!(error.code(), "INVALID_RESPONSE");
    }

    #[tokio::test]
    async fn html_error_page_is_transport_failure() {
        let client = FixtureHttpClient::new()
            .respond("series_id=GDP", HttpResponse::text(200, "<html>maintenance</html>"));
        let error = adapter(client, Some("k"))
            .series(SeriesRequest::new("GDP").expect("valid id"))
            .await
            .expect_err("html");

        assert_eq!(error.code(), "NETWORK_ERROR");
    }

    #[tokio::test]
    async fn quotes_are_unsupported() {
        let error = adapter(FixtureHttpClient::new(), Some("k"))
            .quote(Instrument::Gold)
            .await
            .expect_err("fred has no quotes");
        assert_eq!(error.code(), "UNSUPPORTED_INSTRUMENT");
    }
}
