use std::sync::Arc;

use serde::Deserialize;

use super::get_json;
use crate::data_source::{
    build_quote, CapabilitySet, DataSource, Endpoint, Observation, SeriesRequest, SourceError,
    SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::throttling::RateBudget;
use crate::{Instrument, ProviderId, Quote, UtcDateTime};

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart symbol for an instrument.
pub const fn yahoo_symbol(instrument: Instrument) -> &'static str {
    match instrument {
        Instrument::Sp500 => "^GSPC",
        Instrument::Nasdaq => "^IXIC",
        Instrument::Bitcoin => "BTC-USD",
        Instrument::Gold => "GC=F",
        Instrument::Vix => "^VIX",
    }
}

/// Yahoo Finance chart adapter; needs no API key.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(YAHOO_BASE_URL),
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

    fn chart_url(&self, symbol: &str) -> String {
        format!(
            "{}/{}?interval=1d&range=5d",
            self.base_url,
            urlencoding::encode(symbol)
        )
    }

    async fn fetch_quote(&self, instrument: Instrument) -> Result<Quote, SourceError> {
        if let Some(budget) = &self.rate_budget {
            budget.acquire()?;
        }

        let request = HttpRequest::get(self.chart_url(yahoo_symbol(instrument)))
            .with_header("referer", "https://finance.yahoo.com/");
        let payload: YahooChartResponse =
            get_json(self.http_client.as_ref(), ProviderId::Yahoo, request).await?;

        quote_from_chart(instrument, payload)
    }
}

impl DataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::quote_only()
    }

    fn series<'a>(&'a self, _req: SeriesRequest) -> SourceFuture<'a, Observation> {
        Box::pin(async move {
            Err(SourceError::unsupported_endpoint(
                ProviderId::Yahoo,
                Endpoint::Series,
            ))
        })
    }

    fn quote<'a>(&'a self, instrument: Instrument) -> SourceFuture<'a, Quote> {
        Box::pin(self.fetch_quote(instrument))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    meta: YahooChartMeta,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_time: Option<i64>,
}

fn quote_from_chart(
    instrument: Instrument,
    payload: YahooChartResponse,
) -> Result<Quote, SourceError> {
    let provider = ProviderId::Yahoo;

    if let Some(error) = payload.chart.error {
        let message = format!(
            "yahoo chart error {}: {}",
            error.code,
            error.description.as_deref().unwrap_or("unspecified")
        );
        return Err(match error.code.as_str() {
            "Not Found" => SourceError::unsupported_instrument(provider, instrument),
            "Too Many Requests" => SourceError::rate_limited(provider, message),
            _ => SourceError::invalid_response(provider, message),
        });
    }

    let meta = payload
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|result| result.meta)
        .ok_or_else(|| {
            SourceError::invalid_response(provider, "yahoo chart payload has no result")
        })?;

    let price = meta.regular_market_price.ok_or_else(|| {
        SourceError::invalid_response(provider, "yahoo chart meta missing regularMarketPrice")
    })?;

    let (change, change_percent) = meta
        .chart_previous_close
        .or(meta.previous_close)
        .filter(|previous| previous.is_finite() && *previous != 0.0)
        .map(|previous| {
            let change = price - previous;
            (change, change / previous * 100.0)
        })
        .unwrap_or((0.0, 0.0));

    let timestamp = meta
        .regular_market_time
        .and_then(|seconds| UtcDateTime::from_unix_seconds(seconds).ok())
        .unwrap_or_else(UtcDateTime::now);

    build_quote(provider, instrument, price, change, change_percent, timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{FixtureHttpClient, HttpResponse};

    const VIX_CHART: &str = r#"{"chart":{"result":[{"meta":{
        "symbol":"^VIX",
        "regularMarketPrice":26.42,
        "chartPreviousClose":25.32,
        "regularMarketTime":1709841600
    }}],"error":null}}"#;

    #[tokio::test]
    async fn computes_change_from_previous_close() {
        let client = FixtureHttpClient::new().respond_json("%5EVIX", VIX_CHART);
        let adapter = YahooAdapter::new(Arc::new(client.clone()));

        let quote = adapter.quote(Instrument::Vix).await.expect("quote");

        assert_eq!(quote.value, 26.42);
        assert!((quote.change - 1.1).abs() < 1e-9);
        assert!((quote.change_percent - 1.1 / 25.32 * 100.0).abs() < 1e-9);
        assert_eq!(quote.timestamp.format_rfc3339(), "2024-03-07T20:00:00Z");
        assert!(client.requests()[0]
            .url
            .ends_with("/%5EVIX?interval=1d&range=5d"));
    }

    #[tokio::test]
    async fn not_found_error_is_unsupported_instrument() {
        let client = FixtureHttpClient::new().respond_json(
            "GC%3DF",
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        );

        let error = YahooAdapter::new(Arc::new(client))
            .quote(Instrument::Gold)
            .await
            .expect_err("not found");
        assert_eq!(error.code(), "UNSUPPORTED_INSTRUMENT");
    }

    #[tokio::test]
    async fn missing_price_is_invalid_response() {
        let client = FixtureHttpClient::new()
            .respond_json("BTC-USD", r#"{"chart":{"result":[{"meta":{}}],"error":null}}"#);

        let error = YahooAdapter::new(Arc::new(client))
            .quote(Instrument::Bitcoin)
            .await
            .expect_err("no price");
        assert_eq!(error.code(), "INVALID_RESPONSE");
    }

    #[tokio::test]
    async fn server_error_is_transport_failure() {
        let client =
            FixtureHttpClient::new().respond("%5EIXIC", HttpResponse::json(502, "{}"));

        let error = YahooAdapter::new(Arc::new(client))
            .quote(Instrument::Nasdaq)
            .await
            .expect_err("502");
        assert_eq!(error.code(), "NETWORK_ERROR");
        assert!(error.retryable());
    }

    #[test]
    fn every_instrument_has_a_chart_symbol() {
        for instrument in Instrument::ALL {
            assert!(!yahoo_symbol(instrument).is_empty());
        }
    }
}
