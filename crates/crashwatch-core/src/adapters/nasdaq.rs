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

pub const NASDAQ_BASE_URL: &str = "https://data.nasdaq.com/api/v3/datasets";

const ROW_LIMIT: u32 = 5;

/// Nasdaq Data Link dataset adapter.
///
/// Dataset codes take the `DATABASE/DATASET` form, e.g.
/// `MULTPL/SHILLER_PE_RATIO_MONTH`. An API key is optional; anonymous calls
/// get a smaller quota.
#[derive(Clone)]
pub struct NasdaqDataLinkAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl NasdaqDataLinkAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key: normalize_key(api_key),
            base_url: String::from(NASDAQ_BASE_URL),
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

    fn dataset_url(&self, dataset_code: &str) -> String {
        let mut url = format!("{}/{dataset_code}.json?rows={ROW_LIMIT}", self.base_url);
        if let Some(api_key) = &self.api_key {
            url.push_str("&api_key=");
            url.push_str(&urlencoding::encode(api_key));
        }
        url
    }

    async fn fetch_series(&self, req: SeriesRequest) -> Result<Observation, SourceError> {
        if let Some(budget) = &self.rate_budget {
            budget.acquire()?;
        }

        let request = HttpRequest::get(self.dataset_url(&req.series_id));
        let payload: NasdaqDatasetResponse =
            get_marked_json(self.http_client.as_ref(), ProviderId::Nasdaq, request).await?;

        latest_row(&req.series_id, payload)
    }
}

impl DataSource for NasdaqDataLinkAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Nasdaq
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
                ProviderId::Nasdaq,
                instrument,
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct NasdaqDatasetResponse {
    dataset: Option<NasdaqDataset>,
    quandl_error: Option<NasdaqError>,
}

impl ErrorMarked for NasdaqDatasetResponse {
    fn has_error_marker(&self) -> bool {
        self.quandl_error.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct NasdaqDataset {
    /// `[date, value]` rows, newest first.
    #[serde(default)]
    data: Vec<(String, Option<f64>)>,
}

#[derive(Debug, Clone, Deserialize)]
struct NasdaqError {
    code: String,
    message: String,
}

fn latest_row(
    dataset_code: &str,
    payload: NasdaqDatasetResponse,
) -> Result<Observation, SourceError> {
    if let Some(error) = payload.quandl_error {
        let message = format!("Nasdaq Data Link error {}: {}", error.code, error.message);
        // QEL: limit exceeded, QEA: authentication, QEP: permission.
        return Err(if error.code.starts_with("QEL") {
            SourceError::rate_limited(ProviderId::Nasdaq, message)
        } else if error.code.starts_with("QEA") || error.code.starts_with("QEP") {
            SourceError::new(SourceErrorKind::MissingCredentials, ProviderId::Nasdaq, message)
        } else {
            SourceError::invalid_response(ProviderId::Nasdaq, message)
        });
    }

    let dataset = payload.dataset.ok_or_else(|| {
        SourceError::invalid_response(
            ProviderId::Nasdaq,
            format!("Nasdaq Data Link payload for '{dataset_code}' has no dataset"),
        )
    })?;

    dataset
        .data
        .into_iter()
        .find_map(|(date, value)| {
            value
                .filter(|value| value.is_finite())
                .map(|value| (date, value))
        })
        .map(|(date, value)| Observation {
            series_id: dataset_code.to_owned(),
            date,
            value,
            source: ProviderId::Nasdaq,
        })
        .ok_or_else(|| {
            SourceError::invalid_response(
                ProviderId::Nasdaq,
                format!("dataset '{dataset_code}' has no numeric row"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::series;
    use crate::http_client::{FixtureHttpClient, HttpResponse};

    fn request() -> SeriesRequest {
        SeriesRequest::new(series::SHILLER_CAPE).expect("valid id")
    }

    #[tokio::test]
    async fn reads_newest_row_and_skips_nulls() {
        let client = FixtureHttpClient::new().respond_json(
            "SHILLER_PE_RATIO_MONTH.json",
            r#"{"dataset":{"column_names":["Date","Value"],"data":[
                ["2024-03-01",null],
                ["2024-02-01",34.1],
                ["2024-01-01",33.2]
            ]}}"#,
        );
        let adapter = NasdaqDataLinkAdapter::new(Arc::new(client.clone()), None);

        let observation = adapter.series(request()).await.expect("observation");

        assert_eq!(observation.value, 34.1);
        assert_eq!(observation.date, "2024-02-01");
        assert!(!client.requests()[0].url.contains("api_key"));
    }

    #[tokio::test]
    async fn appends_key_when_configured() {
        let client = FixtureHttpClient::new().respond_json(
            "MULTPL",
            r#"{"dataset":{"data":[["2024-02-01",34.1]]}}"#,
        );
        let adapter =
            NasdaqDataLinkAdapter::new(Arc::new(client.clone()), Some(String::from("ndl")));

        adapter.series(request()).await.expect("observation");
        assert!(client.requests()[0].url.ends_with("&api_key=ndl"));
    }

    #[tokio::test]
    async fn limit_error_code_is_rate_limited() {
        let client = FixtureHttpClient::new().respond_json(
            "MULTPL",
            r#"{"quandl_error":{"code":"QELx01","message":"You have exceeded the API speed limit."}}"#,
        );
        let error = NasdaqDataLinkAdapter::new(Arc::new(client), None)
            .series(request())
            .await
            .expect_err("limit");
        assert_eq!(error.code(), "RATE_LIMITED");
    }

    #[tokio::test]
    async fn auth_error_code_is_missing_credentials() {
        let client = FixtureHttpClient::new().respond_json(
            "MULTPL",
            r#"{"quandl_error":{"code":"QEAx01","message":"Incorrect authentication credentials."}}"#,
        );
        let error = NasdaqDataLinkAdapter::new(Arc::new(client), Some(String::from("bad")))
            .series(request())
            .await
            .expect_err("auth");
        assert_eq!(error.code(), "MISSING_CREDENTIALS");
    }

    #[tokio::test]
    async fn auth_marker_on_http_403_is_missing_credentials() {
        let client = FixtureHttpClient::new().respond(
            "MULTPL",
            HttpResponse::json(
                403,
                r#"{"quandl_error":{"code":"QEPx04","message":"You do not have permission to view this dataset."}}"#,
            ),
        );
        let error = NasdaqDataLinkAdapter::new(Arc::new(client), None)
            .series(request())
            .await
            .expect_err("forbidden");
        assert_eq!(error.code(), "MISSING_CREDENTIALS");
        assert!(!error.retryable());
    }
}
