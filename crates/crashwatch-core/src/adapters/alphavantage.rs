use std::sync::Arc;

use serde::Deserialize;

use super::{get_json, normalize_key, parse_number};
use crate::data_source::{
    build_quote, CapabilitySet, DataSource, Endpoint, Observation, SeriesRequest, SourceError,
    SourceErrorKind, SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest};
use crate::throttling::RateBudget;
use crate::{Instrument, ProviderId, Quote, UtcDateTime};

pub const ALPHAVANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

/// S&P 500 index points per SPY share. Alpha Vantage serves no index quotes,
/// so the index level is derived from the ETF.
pub const SPY_TO_SPX_RATIO: f64 = 10.0;

/// Alpha Vantage adapter for equity and crypto quotes.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl AlphaVantageAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key: normalize_key(api_key),
            base_url: String::from(ALPHAVANTAGE_BASE_URL),
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

    pub const fn supports(instrument: Instrument) -> bool {
        matches!(instrument, Instrument::Sp500 | Instrument::Bitcoin)
    }

    fn query_url(&self, params: &str, api_key: &str) -> String {
        format!(
            "{}?{params}&apikey={}",
            self.base_url,
            urlencoding::encode(api_key)
        )
    }

    async fn fetch_quote(&self, instrument: Instrument) -> Result<Quote, SourceError> {
        if !Self::supports(instrument) {
            return Err(SourceError::unsupported_instrument(
                ProviderId::Alphavantage,
                instrument,
            ));
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::missing_credentials(ProviderId::Alphavantage))?;
        if let Some(budget) = &self.rate_budget {
            budget.acquire()?;
        }

        match instrument {
            Instrument::Bitcoin => self.fetch_exchange_rate(instrument, api_key).await,
            _ => self.fetch_global_quote(instrument, api_key).await,
        }
    }

    async fn fetch_global_quote(
        &self,
        instrument: Instrument,
        api_key: &str,
    ) -> Result<Quote, SourceError> {
        let request =
            HttpRequest::get(self.query_url("function=GLOBAL_QUOTE&symbol=SPY", api_key));
        let payload: AlphaVantageQuoteResponse =
            get_json(self.http_client.as_ref(), ProviderId::Alphavantage, request).await?;

        payload.markers.check()?;
        let quote = payload
            .quote
            .filter(|quote| quote.price.is_some())
            .ok_or_else(|| {
                SourceError::invalid_response(
                    ProviderId::Alphavantage,
                    "alphavantage returned an empty Global Quote",
                )
            })?;

        let provider = ProviderId::Alphavantage;
        let price = parse_number(provider, "05. price", quote.price.as_deref())?;
        let change = parse_number(provider, "09. change", quote.change.as_deref())?;
        let change_percent =
            parse_number(provider, "10. change percent", quote.change_percent.as_deref())?;

        build_quote(
            provider,
            instrument,
            price * SPY_TO_SPX_RATIO,
            change * SPY_TO_SPX_RATIO,
            change_percent,
            UtcDateTime::now(),
        )
    }

    async fn fetch_exchange_rate(
        &self,
        instrument: Instrument,
        api_key: &str,
    ) -> Result<Quote, SourceError> {
        let request = HttpRequest::get(self.query_url(
            "function=CURRENCY_EXCHANGE_RATE&from_currency=BTC&to_currency=USD",
            api_key,
        ));
        let payload: AlphaVantageExchangeRateResponse =
            get_json(self.http_client.as_ref(), ProviderId::Alphavantage, request).await?;

        payload.markers.check()?;
        let rate = payload.rate.ok_or_else(|| {
            SourceError::invalid_response(
                ProviderId::Alphavantage,
                "alphavantage returned no exchange rate",
            )
        })?;

        let value = parse_number(
            ProviderId::Alphavantage,
            "5. Exchange Rate",
            rate.exchange_rate.as_deref(),
        )?;

        // The exchange-rate endpoint carries no daily change.
        build_quote(
            ProviderId::Alphavantage,
            instrument,
            value,
            0.0,
            0.0,
            UtcDateTime::now(),
        )
    }
}

impl DataSource for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::quote_only()
    }

    fn series<'a>(&'a self, _req: SeriesRequest) -> SourceFuture<'a, Observation> {
        Box::pin(async move {
            Err(SourceError::unsupported_endpoint(
                ProviderId::Alphavantage,
                Endpoint::Series,
            ))
        })
    }

    fn quote<'a>(&'a self, instrument: Instrument) -> SourceFuture<'a, Quote> {
        Box::pin(self.fetch_quote(instrument))
    }
}

/// Error and throttle notices Alpha Vantage embeds in HTTP 200 bodies.
#[derive(Debug, Clone, Default, Deserialize)]
struct AlphaVantageMarkers {
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

impl AlphaVantageMarkers {
    fn check(&self) -> Result<(), SourceError> {
        let provider = ProviderId::Alphavantage;
        if let Some(notice) = self.note.as_ref().or(self.information.as_ref()) {
            return Err(if mentions_api_key(notice) {
                SourceError::new(SourceErrorKind::MissingCredentials, provider, notice.clone())
            } else {
                SourceError::rate_limited(provider, notice.clone())
            });
        }
        if let Some(message) = &self.error_message {
            return Err(if mentions_api_key(message) {
                SourceError::new(SourceErrorKind::MissingCredentials, provider, message.clone())
            } else {
                SourceError::invalid_response(provider, message.clone())
            });
        }
        Ok(())
    }
}

/// Key problems are reported as `the parameter apikey is invalid or missing`.
fn mentions_api_key(text: &str) -> bool {
    text.to_ascii_lowercase().contains("apikey")
}

#[derive(Debug, Clone, Deserialize)]
struct AlphaVantageQuoteResponse {
    #[serde(rename = "Global Quote")]
    quote: Option<AlphaVantageQuoteData>,
    #[serde(flatten)]
    markers: AlphaVantageMarkers,
}

#[derive(Debug, Clone, Deserialize)]
struct AlphaVantageQuoteData {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AlphaVantageExchangeRateResponse {
    #[serde(rename = "Realtime Currency Exchange Rate")]
    rate: Option<AlphaVantageExchangeRate>,
    #[serde(flatten)]
    markers: AlphaVantageMarkers,
}

#[derive(Debug, Clone, Deserialize)]
struct AlphaVantageExchangeRate {
    #[serde(rename = "5. Exchange Rate")]
    exchange_rate: Option<String>,
}
