//! Data source trait and request/response types.
//!
//! This module defines the adapter contract (`DataSource`) that every
//! provider implements, along with the error type adapters fail with.
//!
//! # Endpoints
//!
//! | Endpoint | Request | Response | Description |
//! |----------|---------|----------|-------------|
//! | Series | [`SeriesRequest`] | [`Observation`] | Latest observation of a time series |
//! | Quote | [`Instrument`] | [`Quote`] | Latest price for an instrument |
//!
//! # Example
//!
//! ```rust,ignore
//! use crashwatch_core::{DataSource, FredAdapter, SeriesRequest, SourceError};
//!
//! async fn latest_spread(adapter: &FredAdapter) -> Result<f64, SourceError> {
//!     let request = SeriesRequest::new("T10Y2Y").expect("non-empty series id");
//!     let observation = adapter.series(request).await?;
//!     Ok(observation.value)
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Instrument, ProviderId, Quote, UtcDateTime, ValidationError};

/// Boxed future returned by [`DataSource`] methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Data endpoint type used for capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Series,
    Quote,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Series => "series",
            Self::Quote => "quote",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub series: bool,
    pub quote: bool,
}

impl CapabilitySet {
    pub const fn new(series: bool, quote: bool) -> Self {
        Self { series, quote }
    }

    pub const fn series_only() -> Self {
        Self::new(true, false)
    }

    pub const fn quote_only() -> Self {
        Self::new(false, true)
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Series => self.series,
            Endpoint::Quote => self.quote,
        }
    }
}

/// Revalidation class of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceClass {
    /// Market prices, revalidated every minute.
    Quote,
    /// Macro and valuation series, revalidated hourly.
    Macro,
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceErrorKind {
    MissingCredentials,
    RateLimited,
    InvalidResponse,
    ZeroValue,
    Network,
    UnsupportedInstrument,
}

impl SourceErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::RateLimited => "RATE_LIMITED",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::ZeroValue => "ZERO_VALUE",
            Self::Network => "NETWORK_ERROR",
            Self::UnsupportedInstrument => "UNSUPPORTED_INSTRUMENT",
        }
    }

    /// Transient failures worth another attempt.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimited)
    }
}

/// Structured source error used by aggregation fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    provider: ProviderId,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            kind,
            provider,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }

    pub fn missing_credentials(provider: ProviderId) -> Self {
        Self::new(
            SourceErrorKind::MissingCredentials,
            provider,
            format!("no API key configured for '{provider}'"),
        )
    }

    pub fn rate_limited(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, provider, message)
    }

    pub fn invalid_response(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidResponse, provider, message)
    }

    pub fn zero_value(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::ZeroValue, provider, message)
    }

    pub fn network(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Network, provider, message)
    }

    pub fn timeout(provider: ProviderId, after: Duration) -> Self {
        Self::network(
            provider,
            format!("request timed out after {} ms", after.as_millis()),
        )
    }

    pub fn unsupported_instrument(provider: ProviderId, instrument: Instrument) -> Self {
        Self::new(
            SourceErrorKind::UnsupportedInstrument,
            provider,
            format!("instrument '{instrument}' is not served by '{provider}'"),
        )
    }

    pub fn unsupported_endpoint(provider: ProviderId, endpoint: Endpoint) -> Self {
        Self::new(
            SourceErrorKind::UnsupportedInstrument,
            provider,
            format!("endpoint '{endpoint}' is not supported by '{provider}'"),
        )
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub const fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn is_transport(&self) -> bool {
        matches!(self.kind, SourceErrorKind::Network)
    }

    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// `CODE: message` form carried in reading `sourceError` fields.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.code(), self.message)
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.message, self.code(), self.provider)
    }
}

impl std::error::Error for SourceError {}

/// Request payload for series endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub series_id: String,
}

impl SeriesRequest {
    pub fn new(series_id: impl Into<String>) -> Result<Self, ValidationError> {
        let series_id = series_id.into();
        if series_id.trim().is_empty() {
            return Err(ValidationError::EmptySeriesId);
        }
        Ok(Self {
            series_id: series_id.trim().to_owned(),
        })
    }
}

/// Most recent usable point of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub series_id: String,
    pub date: String,
    pub value: f64,
    pub source: ProviderId,
}

/// Source adapter contract.
///
/// Adapters validate transport and payload, parse into typed structs and
/// return one normalized value. They never retry; retry and fallback belong
/// to the aggregator.
///
/// # Required Methods
///
/// | Method | Description |
/// |--------|-------------|
/// | [`id`](DataSource::id) | Unique provider identifier |
/// | [`capabilities`](DataSource::capabilities) | Supported endpoints |
/// | [`series`](DataSource::series) | Fetch the latest series observation |
/// | [`quote`](DataSource::quote) | Fetch an instrument quote |
pub trait DataSource: Send + Sync {
    /// Returns the unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Returns the set of supported endpoints.
    fn capabilities(&self) -> CapabilitySet;

    /// Fetches the latest numeric observation of a series.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if:
    /// - No API key is configured
    /// - The transport fails, times out or answers with a non-JSON body
    /// - The payload carries a provider error marker or no usable value
    fn series<'a>(&'a self, req: SeriesRequest) -> SourceFuture<'a, Observation>;

    /// Fetches the latest quote for an instrument.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] for the same cases as [`series`](DataSource::series),
    /// plus `UNSUPPORTED_INSTRUMENT` and `ZERO_VALUE`.
    fn quote<'a>(&'a self, instrument: Instrument) -> SourceFuture<'a, Quote>;
}

/// Converts a quote validation failure into the matching source error.
pub(crate) fn quote_validation_error(provider: ProviderId, error: ValidationError) -> SourceError {
    match error {
        ValidationError::ZeroValue { field } => {
            SourceError::zero_value(provider, format!("provider returned zero for '{field}'"))
        }
        other => SourceError::invalid_response(provider, other.to_string()),
    }
}

/// Builds a validated quote or the matching source error.
pub(crate) fn build_quote(
    provider: ProviderId,
    instrument: Instrument,
    value: f64,
    change: f64,
    change_percent: f64,
    timestamp: UtcDateTime,
) -> Result<Quote, SourceError> {
    Quote::new(instrument, value, change, change_percent, timestamp, provider)
        .map_err(|error| quote_validation_error(provider, error))
}
