use std::sync::Arc;

use crashwatch_core::{
    AlphaVantageAdapter, DataSource, Endpoint, FixtureHttpClient, FredAdapter, HttpResponse,
    Instrument, NasdaqDataLinkAdapter, ProviderId, SeriesRequest, SourceErrorKind, YahooAdapter,
};

const FRED_SPREAD: &str = r#"{"observations":[
    {"date":"2024-03-07","value":"0.21"},
    {"date":"2024-03-06","value":"0.18"}
]}"#;

const NASDAQ_CAPE: &str = r#"{"dataset":{"column_names":["Date","Value"],"data":[
    ["2024-03-01",34.12],
    ["2024-02-01",33.87]
]}}"#;

const SPY_QUOTE: &str = r#"{"Global Quote":{
    "01. symbol":"SPY",
    "05. price":"512.8500",
    "09. change":"-1.2500",
    "10. change percent":"-0.2431%"
}}"#;

const BTC_RATE: &str =
    r#"{"Realtime Currency Exchange Rate":{"5. Exchange Rate":"67012.45000000"}}"#;

const GOLD_CHART: &str = r#"{"chart":{"result":[{"meta":{
    "symbol":"GC=F",
    "regularMarketPrice":2178.4,
    "chartPreviousClose":2160.1,
    "regularMarketTime":1709841600
}}],"error":null}}"#;

#[derive(Clone)]
struct ProviderCase {
    id: ProviderId,
    source: Arc<dyn DataSource>,
    series_id: Option<&'static str>,
    instrument: Option<Instrument>,
}

fn scripted_client() -> FixtureHttpClient {
    FixtureHttpClient::new()
        .respond_json("series_id=T10Y2Y", FRED_SPREAD)
        .respond_json("SHILLER_PE_RATIO_MONTH", NASDAQ_CAPE)
        .respond_json("GLOBAL_QUOTE", SPY_QUOTE)
        .respond_json("CURRENCY_EXCHANGE_RATE", BTC_RATE)
        .respond_json("GC%3DF", GOLD_CHART)
}

fn provider_cases(client: &FixtureHttpClient) -> Vec<ProviderCase> {
    let http = Arc::new(client.clone());
    vec![
        ProviderCase {
            id: ProviderId::Fred,
            source: Arc::new(FredAdapter::new(http.clone(), Some(String::from("fred-key")))),
            series_id: Some("T10Y2Y"),
            instrument: None,
        },
        ProviderCase {
            id: ProviderId::Nasdaq,
            source: Arc::new(NasdaqDataLinkAdapter::new(http.clone(), None)),
            series_id: Some("MULTPL/SHILLER_PE_RATIO_MONTH"),
            instrument: None,
        },
        ProviderCase {
            id: ProviderId::Alphavantage,
            source: Arc::new(AlphaVantageAdapter::new(
                http.clone(),
                Some(String::from("av-key")),
            )),
            series_id: None,
            instrument: Some(Instrument::Sp500),
        },
        ProviderCase {
            id: ProviderId::Yahoo,
            source: Arc::new(YahooAdapter::new(http)),
            series_id: None,
            instrument: Some(Instrument::Gold),
        },
    ]
}

#[test]
fn capabilities_match_served_endpoints() {
    let client = scripted_client();
    for case in provider_cases(&client) {
        assert_eq!(case.source.id(), case.id);
        let capabilities = case.source.capabilities();
        assert_eq!(
            capabilities.supports(Endpoint::Series),
            case.series_id.is_some(),
            "provider '{}': series capability",
            case.id
        );
        assert_eq!(
            capabilities.supports(Endpoint::Quote),
            case.instrument.is_some(),
            "provider '{}': quote capability",
            case.id
        );
    }
}

#[tokio::test]
async fn series_providers_return_latest_numeric_observation() {
    let client = scripted_client();
    for case in provider_cases(&client) {
        let Some(series_id) = case.series_id else {
            continue;
        };
        let observation = case
            .source
            .series(SeriesRequest::new(series_id).expect("valid series id"))
            .await
            .unwrap_or_else(|error| panic!("provider '{}' series failed: {error}", case.id));

        assert_eq!(observation.source, case.id, "provider '{}': source", case.id);
        assert!(
            observation.value.is_finite(),
            "provider '{}': value must be finite",
            case.id
        );
        assert!(
            observation.date.starts_with("2024-03"),
            "provider '{}': newest date expected, got {}",
            case.id,
            observation.date
        );
    }
}

#[tokio::test]
async fn quote_providers_return_non_zero_quotes() {
    let client = scripted_client();
    for case in provider_cases(&client) {
        let Some(instrument) = case.instrument else {
            continue;
        };
        let quote = case
            .source
            .quote(instrument)
            .await
            .unwrap_or_else(|error| panic!("provider '{}' quote failed: {error}", case.id));

        assert_eq!(quote.instrument, instrument, "provider '{}': instrument", case.id);
        assert_eq!(quote.source, case.id, "provider '{}': source", case.id);
        assert!(quote.value > 0.0, "provider '{}': positive value", case.id);
        assert!(quote.change_percent.is_finite());
    }
}

#[tokio::test]
async fn unserved_endpoints_fail_without_network_calls() {
    let client = FixtureHttpClient::new();
    for case in provider_cases(&client) {
        if case.series_id.is_none() {
            let error = case
                .source
                .series(SeriesRequest::new("T10Y2Y").expect("valid series id"))
                .await
                .expect_err("series must be refused");
            assert_eq!(error.provider(), case.id);
            assert_eq!(
                error.kind(),
                SourceErrorKind::UnsupportedInstrument,
                "provider '{}': series refusal code",
                case.id
            );
            assert!(!error.retryable());
        }
        if case.instrument.is_none() {
            let error = case
                .source
                .quote(Instrument::Vix)
                .await
                .expect_err("quote must be refused");
            assert_eq!(
                error.kind(),
                SourceErrorKind::UnsupportedInstrument,
                "provider '{}': quote refusal code",
                case.id
            );
        }
    }
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn keyed_providers_report_missing_credentials_before_any_request() {
    let client = FixtureHttpClient::new();
    let http = Arc::new(client.clone());

    let fred_error = FredAdapter::new(http.clone(), None)
        .series(SeriesRequest::new("GDP").expect("valid series id"))
        .await
        .expect_err("no key");
    let av_error = AlphaVantageAdapter::new(http, None)
        .quote(Instrument::Bitcoin)
        .await
        .expect_err("no key");

    assert_eq!(fred_error.code(), "MISSING_CREDENTIALS");
    assert_eq!(av_error.code(), "MISSING_CREDENTIALS");
    assert!(!fred_error.retryable());
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn transport_failures_share_codes_across_providers() {
    let client = FixtureHttpClient::new()
        .respond("series_id=T10Y2Y", HttpResponse::json(429, "{}"))
        .respond("SHILLER_PE_RATIO_MONTH", HttpResponse::text(200, "<html>"))
        .respond("GLOBAL_QUOTE", HttpResponse::json(503, "{}"))
        .fail("GC%3DF", "connection reset by peer");
    let cases = provider_cases(&client);

    let mut codes = Vec::new();
    for case in &cases {
        let code = match (case.series_id, case.instrument) {
            (Some(series_id), _) => case
                .source
                .series(SeriesRequest::new(series_id).expect("valid series id"))
                .await
                .expect_err("scripted failure")
                .code(),
            (None, Some(instrument)) => case
                .source
                .quote(instrument)
                .await
                .expect_err("scripted failure")
                .code(),
            (None, None) => continue,
        };
        codes.push((case.id, code));
    }

    assert_eq!(
        codes,
        vec![
            (ProviderId::Fred, "RATE_LIMITED"),
            (ProviderId::Nasdaq, "NETWORK_ERROR"),
            (ProviderId::Alphavantage, "NETWORK_ERROR"),
            (ProviderId::Yahoo, "NETWORK_ERROR"),
        ]
    );
}
