//! Aggregation and cache layer.
//!
//! The [`Aggregator`] fans out to provider adapters, bounds every attempt with
//! a timeout, retries transient failures, and turns anything that still fails
//! into a fallback reading. Indicator calls never return an error; quote calls
//! do, after trying the instrument's alternate provider.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::env;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::{AlphaVantageAdapter, FredAdapter, NasdaqDataLinkAdapter, YahooAdapter};
use crate::cache::{CacheMode, CacheStore, RevalidationWindows};
use crate::catalog::{quote_route, Derivation, IndicatorDefinition, CATALOG};
use crate::data_source::{DataSource, SeriesRequest, SourceError, SourceErrorKind, SourceFuture};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::provider_policy::ProviderPolicy;
use crate::retry::{retry, RetryConfig};
use crate::scoring::{CompositeScorer, CrashRiskBreakdown, IndicatorSet};
use crate::throttling::RateBudget;
use crate::{IndicatorKey, IndicatorReading, Instrument, ProviderId, Quote, UtcDateTime};

/// Series values fetched for one cycle, keyed by provider and series id.
type SeriesValues = HashMap<(ProviderId, &'static str), Result<f64, SourceError>>;

/// Timeouts, revalidation windows and retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Per-attempt bound for quote calls.
    pub quote_timeout: Duration,
    /// Per-attempt bound for macro series calls.
    pub macro_timeout: Duration,
    pub windows: RevalidationWindows,
    pub retry: RetryConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            quote_timeout: Duration::from_secs(5),
            macro_timeout: Duration::from_secs(10),
            windows: RevalidationWindows::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Result of quoting one instrument inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QuoteOutcome {
    Ok(Quote),
    Failed(QuoteFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteFailure {
    pub code: String,
    pub provider: ProviderId,
    pub message: String,
}

impl QuoteOutcome {
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Ok(quote) => Some(quote),
            Self::Failed(_) => None,
        }
    }
}

impl From<Result<Quote, SourceError>> for QuoteOutcome {
    fn from(result: Result<Quote, SourceError>) -> Self {
        match result {
            Ok(quote) => Self::Ok(quote),
            Err(error) => Self::Failed(QuoteFailure {
                code: error.code().to_owned(),
                provider: error.provider(),
                message: error.message().to_owned(),
            }),
        }
    }
}

/// One poll cycle's immutable result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub cycle_id: Uuid,
    pub taken_at: UtcDateTime,
    pub indicators: IndicatorSet,
    pub quotes: BTreeMap<Instrument, QuoteOutcome>,
    pub crash_risk: CrashRiskBreakdown,
}

impl MarketSnapshot {
    pub fn degraded_indicators(&self) -> Vec<IndicatorKey> {
        self.indicators.degraded_keys()
    }

    pub fn failed_quotes(&self) -> Vec<Instrument> {
        self.quotes
            .iter()
            .filter(|(_, outcome)| outcome.quote().is_none())
            .map(|(instrument, _)| *instrument)
            .collect()
    }
}

/// Adapter registry, revalidation cache and fallback engine.
#[derive(Clone)]
pub struct Aggregator {
    adapters: Arc<HashMap<ProviderId, Arc<dyn DataSource>>>,
    config: AggregatorConfig,
    scorer: CompositeScorer,
    readings: CacheStore<IndicatorKey, IndicatorReading>,
    quotes: CacheStore<Instrument, Quote>,
}

impl Aggregator {
    pub fn new(adapters: Vec<Arc<dyn DataSource>>, config: AggregatorConfig) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();

        Self {
            adapters: Arc::new(adapters),
            config,
            scorer: CompositeScorer::default(),
            readings: CacheStore::new(),
            quotes: CacheStore::new(),
        }
    }

    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::new()
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn scorer(&self) -> CompositeScorer {
        self.scorer
    }

    pub fn providers(&self) -> Vec<ProviderId> {
        let mut providers = self.adapters.keys().copied().collect::<Vec<_>>();
        providers.sort();
        providers
    }

    /// Current reading for `key`; a fallback when every attempt failed.
    pub async fn indicator(&self, key: IndicatorKey) -> IndicatorReading {
        self.indicator_with_mode(key, CacheMode::Use).await
    }

    pub async fn indicator_with_mode(&self, key: IndicatorKey, mode: CacheMode) -> IndicatorReading {
        if mode.reads() {
            if let Some(reading) = self.readings.get(&key).await {
                return reading;
            }
        }

        let definition = key.definition();
        let result = self.fetch_raw(definition, mode).await;
        let reading = self.settle(definition, result);
        self.store_reading(definition, &reading, mode).await;
        reading
    }

    /// All six readings, fetched concurrently.
    ///
    /// A series shared by several indicators is requested once.
    pub async fn indicators(&self, mode: CacheMode) -> IndicatorSet {
        let quoted = CATALOG
            .iter()
            .filter(|definition| definition.derivation.quote_instrument().is_some())
            .map(|definition| self.indicator_with_mode(definition.key, mode));

        let (mut readings, quoted) =
            tokio::join!(self.series_readings(mode), join_all(quoted));
        readings.extend(quoted);
        IndicatorSet::from_partial(readings, UtcDateTime::now())
    }

    /// Latest quote; errors surface to the caller once the route is exhausted.
    pub async fn quote(&self, instrument: Instrument) -> Result<Quote, SourceError> {
        self.quote_with_mode(instrument, CacheMode::Use).await
    }

    pub async fn quote_with_mode(
        &self,
        instrument: Instrument,
        mode: CacheMode,
    ) -> Result<Quote, SourceError> {
        if mode.reads() {
            if let Some(quote) = self.quotes.get(&instrument).await {
                return Ok(quote);
            }
        }

        let route = quote_route(instrument);
        let mut last_error: Option<SourceError> = None;

        for provider in route.chain() {
            match self.quote_from(provider, instrument).await {
                Ok(quote) => {
                    if let Some(error) = &last_error {
                        tracing::info!(
                            instrument = %instrument,
                            provider = %provider,
                            failed_code = error.code(),
                            "quote served by alternate provider"
                        );
                    }
                    if mode.writes() {
                        self.quotes
                            .put(instrument, quote.clone(), self.config.windows.quotes)
                            .await;
                    }
                    return Ok(quote);
                }
                Err(error) => {
                    tracing::warn!(
                        instrument = %instrument,
                        provider = %provider,
                        code = error.code(),
                        message = error.message(),
                        "quote attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SourceError::unsupported_instrument(route.primary, instrument)))
    }

    /// Runs one full poll cycle.
    ///
    /// Quotes and series-derived indicators are fetched concurrently; readings
    /// derived from quotes reuse the cycle's quote outcome.
    pub async fn snapshot(&self, mode: CacheMode) -> MarketSnapshot {
        let taken_at = UtcDateTime::now();

        let quote_fetches = Instrument::ALL.into_iter().map(|instrument| async move {
            (instrument, self.quote_with_mode(instrument, mode).await)
        });

        let (quote_results, mut readings) =
            tokio::join!(join_all(quote_fetches), self.series_readings(mode));
        let quote_results = quote_results.into_iter().collect::<BTreeMap<_, _>>();

        for definition in &CATALOG {
            let Some(instrument) = definition.derivation.quote_instrument() else {
                continue;
            };
            let reading = match self.cached_reading(definition.key, mode).await {
                Some(reading) => reading,
                None => {
                    let result = quote_results
                        .get(&instrument)
                        .cloned()
                        .unwrap_or_else(|| {
                            Err(SourceError::unsupported_instrument(
                                quote_route(instrument).primary,
                                instrument,
                            ))
                        })
                        .map(|quote| quote.value);
                    let reading = self.settle(definition, result);
                    self.store_reading(definition, &reading, mode).await;
                    reading
                }
            };
            readings.push(reading);
        }

        let indicators = IndicatorSet::from_partial(readings, taken_at);
        let crash_risk = self.scorer.score(&indicators);
        let quotes = quote_results
            .into_iter()
            .map(|(instrument, result)| (instrument, QuoteOutcome::from(result)))
            .collect::<BTreeMap<_, _>>();

        let snapshot = MarketSnapshot {
            cycle_id: Uuid::new_v4(),
            taken_at,
            indicators,
            quotes,
            crash_risk,
        };

        tracing::info!(
            cycle_id = %snapshot.cycle_id,
            total_score = snapshot.crash_risk.total_score,
            risk_level = %snapshot.crash_risk.risk_level,
            degraded_indicators = snapshot.degraded_indicators().len(),
            failed_quotes = snapshot.failed_quotes().len(),
            "poll cycle complete"
        );

        snapshot
    }

    pub async fn clear_cache(&self) {
        self.readings.clear().await;
        self.quotes.clear().await;
    }

    /// Readings for every series-derived indicator, sharing fetches by series id.
    async fn series_readings(&self, mode: CacheMode) -> Vec<IndicatorReading> {
        let mut readings = Vec::new();
        let mut pending = Vec::new();
        for definition in CATALOG
            .iter()
            .filter(|definition| definition.derivation.quote_instrument().is_none())
        {
            match self.cached_reading(definition.key, mode).await {
                Some(reading) => readings.push(reading),
                None => pending.push(definition),
            }
        }

        let series = self
            .fetch_series(
                pending
                    .iter()
                    .flat_map(|definition| definition.derivation.series_ids()),
            )
            .await;

        for definition in pending {
            let result = derive(definition, &series);
            let reading = self.settle(definition, result);
            self.store_reading(definition, &reading, mode).await;
            readings.push(reading);
        }
        readings
    }

    /// Fetches each distinct series once, concurrently.
    async fn fetch_series(
        &self,
        wanted: impl IntoIterator<Item = (ProviderId, &'static str)>,
    ) -> SeriesValues {
        let distinct = wanted.into_iter().collect::<BTreeSet<_>>();
        join_all(distinct.into_iter().map(|(provider, series_id)| async move {
            (
                (provider, series_id),
                self.series_value(provider, series_id).await,
            )
        }))
        .await
        .into_iter()
        .collect()
    }

    async fn cached_reading(&self, key: IndicatorKey, mode: CacheMode) -> Option<IndicatorReading> {
        if !mode.reads() {
            return None;
        }
        self.readings.get(&key).await
    }

    async fn store_reading(
        &self,
        definition: &IndicatorDefinition,
        reading: &IndicatorReading,
        mode: CacheMode,
    ) {
        if !mode.writes() {
            return;
        }
        let window = self
            .config
            .windows
            .for_entry(definition.source_class(), reading.is_fallback());
        self.readings.put(definition.key, reading.clone(), window).await;
    }

    /// Normalizes a raw value, or logs the failure and falls back.
    fn settle(
        &self,
        definition: &IndicatorDefinition,
        result: Result<f64, SourceError>,
    ) -> IndicatorReading {
        let as_of = UtcDateTime::now();
        match result {
            Ok(raw) => definition.normalize(raw, as_of),
            Err(error) => {
                tracing::warn!(
                    indicator = %definition.key,
                    provider = %error.provider(),
                    code = error.code(),
                    message = error.message(),
                    "indicator fetch failed, serving fallback"
                );
                definition.fallback(error.summary(), as_of)
            }
        }
    }

    async fn fetch_raw(
        &self,
        definition: &IndicatorDefinition,
        mode: CacheMode,
    ) -> Result<f64, SourceError> {
        match definition.derivation.quote_instrument() {
            Some(instrument) => {
                let raw = self.quote_with_mode(instrument, mode).await?.value;
                finite(definition, raw)
            }
            None => {
                let series = self.fetch_series(definition.derivation.series_ids()).await;
                derive(definition, &series)
            }
        }
    }

    async fn series_value(&self, provider: ProviderId, series_id: &str) -> Result<f64, SourceError> {
        let adapter = self.adapter(provider)?;
        let request = SeriesRequest::new(series_id)
            .map_err(|error| SourceError::invalid_response(provider, error.to_string()))?;
        let timeout = self.config.macro_timeout;

        let observation = retry(&self.config.retry, |_| {
            let adapter = Arc::clone(&adapter);
            let request = request.clone();
            async move { bounded(provider, timeout, adapter.series(request)).await }
        })
        .await?;

        Ok(observation.value)
    }

    async fn quote_from(
        &self,
        provider: ProviderId,
        instrument: Instrument,
    ) -> Result<Quote, SourceError> {
        let adapter = self.adapter(provider)?;
        let timeout = self.config.quote_timeout;

        retry(&self.config.retry, |_| {
            let adapter = Arc::clone(&adapter);
            async move { bounded(provider, timeout, adapter.quote(instrument)).await }
        })
        .await
    }

    fn adapter(&self, provider: ProviderId) -> Result<Arc<dyn DataSource>, SourceError> {
        self.adapters.get(&provider).cloned().ok_or_else(|| {
            SourceError::new(
                SourceErrorKind::MissingCredentials,
                provider,
                format!("source adapter '{provider}' is not registered"),
            )
        })
    }
}

/// Bounds one adapter attempt; an elapsed timeout is a transport failure.
async fn bounded<T>(
    provider: ProviderId,
    timeout: Duration,
    attempt: SourceFuture<'_, T>,
) -> Result<T, SourceError> {
    tokio::time::timeout(timeout, attempt)
        .await
        .unwrap_or_else(|_| Err(SourceError::timeout(provider, timeout)))
}

/// Raw value of a series-derived indicator from already fetched series.
fn derive(definition: &IndicatorDefinition, series: &SeriesValues) -> Result<f64, SourceError> {
    let value = |provider: ProviderId, series_id: &'static str| {
        series.get(&(provider, series_id)).cloned().unwrap_or_else(|| {
            Err(SourceError::invalid_response(
                provider,
                format!("series '{series_id}' was not fetched"),
            ))
        })
    };

    let raw = match definition.derivation {
        Derivation::Series {
            provider,
            series_id,
        } => value(provider, series_id)?,
        Derivation::SeriesRatio {
            provider,
            numerator,
            denominator,
            scale,
        } => ratio(
            provider,
            value(provider, numerator)?,
            value(provider, denominator)?,
            scale,
        )?,
        Derivation::Quote(instrument) => {
            return Err(SourceError::unsupported_instrument(
                definition.derivation.provider(),
                instrument,
            ))
        }
    };
    finite(definition, raw)
}

fn finite(definition: &IndicatorDefinition, raw: f64) -> Result<f64, SourceError> {
    if raw.is_finite() {
        Ok(raw)
    } else {
        Err(SourceError::invalid_response(
            definition.derivation.provider(),
            format!("derived value for '{}' is not finite", definition.key),
        ))
    }
}

fn ratio(
    provider: ProviderId,
    numerator: f64,
    denominator: f64,
    scale: f64,
) -> Result<f64, SourceError> {
    if denominator == 0.0 {
        return Err(SourceError::zero_value(provider, "ratio denominator is zero"));
    }
    let value = numerator / denominator * scale;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SourceError::invalid_response(
            provider,
            format!("ratio {numerator} / {denominator} is not finite"),
        ))
    }
}

/// Builder for an [`Aggregator`] wired to the four provider adapters.
///
/// # Environment Variables
///
/// | Provider | Primary Env Var | Fallback Env Var |
/// |----------|----------------|------------------|
/// | FRED | `CRASHWATCH_FRED_API_KEY` | `FRED_API_KEY` |
/// | Alpha Vantage | `CRASHWATCH_ALPHAVANTAGE_API_KEY` | `ALPHAVANTAGE_API_KEY` |
/// | Nasdaq Data Link | `CRASHWATCH_NASDAQ_API_KEY` | `NASDAQ_DATA_LINK_API_KEY` |
/// | Yahoo | (no key required) | - |
///
/// # Example
///
/// ```rust,ignore
/// use crashwatch_core::{AggregatorBuilder, CacheMode};
///
/// let aggregator = AggregatorBuilder::new().with_real_clients().build();
/// let snapshot = aggregator.snapshot(CacheMode::Use).await;
/// println!("crash risk: {}", snapshot.crash_risk.total_score);
/// ```
pub struct AggregatorBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    fred_api_key: Option<String>,
    alphavantage_api_key: Option<String>,
    nasdaq_api_key: Option<String>,
    config: AggregatorConfig,
    rate_budgets: bool,
}

impl Default for AggregatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregatorBuilder {
    pub fn new() -> Self {
        Self {
            http_client: None,
            fred_api_key: None,
            alphavantage_api_key: None,
            nasdaq_api_key: None,
            config: AggregatorConfig::default(),
            rate_budgets: true,
        }
    }

    /// Uses reqwest transport and reads API keys from the environment.
    pub fn with_real_clients(mut self) -> Self {
        self.http_client = Some(Arc::new(ReqwestHttpClient::new()));
        self.fred_api_key = env_key("CRASHWATCH_FRED_API_KEY", "FRED_API_KEY");
        self.alphavantage_api_key =
            env_key("CRASHWATCH_ALPHAVANTAGE_API_KEY", "ALPHAVANTAGE_API_KEY");
        self.nasdaq_api_key = env_key("CRASHWATCH_NASDAQ_API_KEY", "NASDAQ_DATA_LINK_API_KEY");
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_fred_key(mut self, key: impl Into<String>) -> Self {
        self.fred_api_key = Some(key.into());
        self
    }

    pub fn with_alphavantage_key(mut self, key: impl Into<String>) -> Self {
        self.alphavantage_api_key = Some(key.into());
        self
    }

    pub fn with_nasdaq_key(mut self, key: impl Into<String>) -> Self {
        self.nasdaq_api_key = Some(key.into());
        self
    }

    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables client-side provider quotas (on by default).
    pub fn with_rate_budgets(mut self, enabled: bool) -> Self {
        self.rate_budgets = enabled;
        self
    }

    pub fn build(self) -> Aggregator {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let budget = |provider| {
            ProviderPolicy::default_for(provider)
                .filter(|_| self.rate_budgets)
                .map(|policy| RateBudget::from_policy(&policy))
        };

        let mut fred = FredAdapter::new(Arc::clone(&http_client), self.fred_api_key.clone());
        if let Some(budget) = budget(ProviderId::Fred) {
            fred = fred.with_rate_budget(budget);
        }
        let mut nasdaq =
            NasdaqDataLinkAdapter::new(Arc::clone(&http_client), self.nasdaq_api_key.clone());
        if let Some(budget) = budget(ProviderId::Nasdaq) {
            nasdaq = nasdaq.with_rate_budget(budget);
        }
        let mut alphavantage = AlphaVantageAdapter::new(
            Arc::clone(&http_client),
            self.alphavantage_api_key.clone(),
        );
        if let Some(budget) = budget(ProviderId::Alphavantage) {
            alphavantage = alphavantage.with_rate_budget(budget);
        }
        let yahoo = YahooAdapter::new(Arc::clone(&http_client));

        Aggregator::new(
            vec![
                Arc::new(fred),
                Arc::new(nasdaq),
                Arc::new(alphavantage),
                Arc::new(yahoo),
            ],
            self.config.clone(),
        )
    }
}

fn env_key(primary: &str, fallback: &str) -> Option<String> {
    env::var(primary)
        .or_else(|_| env::var(fallback))
        .ok()
        .filter(|value| !value.trim().is_empty())
}
