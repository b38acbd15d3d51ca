//! # Crashwatch Core
//!
//! Indicator aggregation and composite crash-risk scoring.
//!
//! ## Overview
//!
//! This crate turns heterogeneous provider responses into one comparable
//! market-risk picture:
//!
//! - **Provider adapters** for FRED, Nasdaq Data Link, Alpha Vantage and Yahoo Finance
//! - **Indicator catalogue** holding thresholds, fallbacks, score curves and weights
//! - **Status classification** with direction-aware, tie-to-worse thresholds
//! - **Aggregation** with per-attempt timeouts, capped retries, fallbacks and revalidation windows
//! - **Composite scoring** into a 0..100 score and a discrete risk level
//! - **Polling** that publishes immutable snapshots to subscribers
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (FRED, Nasdaq Data Link, Alpha Vantage, Yahoo) |
//! | [`aggregator`] | Fan-out, fallback and snapshot assembly |
//! | [`cache`] | Revalidation cache and cache modes |
//! | [`catalog`] | Declarative indicator table and quote routes |
//! | [`classifier`] | Safe / warning / danger classification |
//! | [`data_source`] | Data source trait and error type |
//! | [`domain`] | Domain models (IndicatorReading, Quote, UtcDateTime) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`poller`] | Interval polling and snapshot publication |
//! | [`provider_policy`] | Provider request quotas |
//! | [`retry`] | Backoff and retry helper |
//! | [`scoring`] | Score curves and composite breakdown |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Client-side rate budgets |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crashwatch_core::{AggregatorBuilder, CacheMode, IndicatorKey};
//!
//! #[tokio::main]
//! async fn main() {
//!     let aggregator = AggregatorBuilder::new().with_real_clients().build();
//!
//!     let cape = aggregator.indicator(IndicatorKey::Cape).await;
//!     println!("CAPE {} ({})", cape.value(), cape.status());
//!
//!     let snapshot = aggregator.snapshot(CacheMode::Use).await;
//!     println!(
//!         "crash risk {} ({})",
//!         snapshot.crash_risk.total_score, snapshot.crash_risk.risk_level
//!     );
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Web      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ DashboardPoller │────▶│ Composite Scorer │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Aggregator    │────▶│ Revalidation     │
//! │ (retry/timeout) │     │ Cache            │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Data Source     │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest/fixture)│
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Adapters fail with a [`SourceError`] carrying a stable code. Indicator
//! failures become fallback readings with `sourceError` set; quote failures
//! are returned to the caller.
//!
//! ```rust
//! use crashwatch_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited | SourceErrorKind::Network => "transient",
//!         SourceErrorKind::MissingCredentials => "configure an API key",
//!         _ => "provider returned unusable data",
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys are read from environment variables only and never logged

pub mod adapters;
pub mod aggregator;
pub mod cache;
pub mod catalog;
pub mod classifier;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod poller;
pub mod provider_policy;
pub mod retry;
pub mod scoring;
pub mod source;
pub mod throttling;

// Adapter implementations
pub use adapters::{
    yahoo_symbol, AlphaVantageAdapter, FredAdapter, NasdaqDataLinkAdapter, YahooAdapter,
    SPY_TO_SPX_RATIO,
};

// Aggregation
pub use aggregator::{
    Aggregator, AggregatorBuilder, AggregatorConfig, MarketSnapshot, QuoteFailure, QuoteOutcome,
};

// Caching
pub use cache::{CacheMode, CacheStore, RevalidationWindows};

// Indicator catalogue
pub use catalog::{
    definition, normalize, quote_route, validate_catalog, Derivation, IndicatorDefinition,
    QuoteRoute, CATALOG,
};

pub use classifier::classify;

// Data source trait and types
pub use data_source::{
    CapabilitySet, DataSource, Endpoint, Observation, SeriesRequest, SourceClass, SourceError,
    SourceErrorKind, SourceFuture,
};

// Domain models
pub use domain::{
    Direction, IndicatorKey, IndicatorReading, Instrument, Quote, Status, Thresholds, Unit,
    UtcDateTime,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    FixtureHttpClient, HttpClient, HttpError, HttpFuture, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};

// Polling
pub use poller::{DashboardPoller, SnapshotReceiver};

// Provider policies
pub use provider_policy::ProviderPolicy;

// Retry logic
pub use retry::{retry, Backoff, RetryConfig};

// Scoring
pub use scoring::{
    score, CompositeScorer, CrashRiskBreakdown, IndicatorSet, RiskLevel, ScoreCurve,
};

// Source identifiers
pub use source::ProviderId;

// Throttling
pub use throttling::RateBudget;
