mod alphavantage;
mod fred;
mod nasdaq;
mod yahoo;

pub use alphavantage::{AlphaVantageAdapter, ALPHAVANTAGE_BASE_URL, SPY_TO_SPX_RATIO};
pub use fred::{FredAdapter, FRED_BASE_URL};
pub use nasdaq::{NasdaqDataLinkAdapter, NASDAQ_BASE_URL};
pub use yahoo::{yahoo_symbol, YahooAdapter, YAHOO_BASE_URL};

use serde::de::DeserializeOwned;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::ProviderId;

const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Payloads that can carry a provider error in the body.
pub(crate) trait ErrorMarked {
    fn has_error_marker(&self) -> bool;
}

/// Executes `request` and parses a JSON body after transport checks.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<T, SourceError> {
    let response = execute(client, provider, request).await?;
    check_transport(provider, &response)?;
    parse_json(provider, &response)
}

/// Like [`get_json`], but a 4xx JSON body carrying the provider's error marker
/// is returned for marker mapping instead of failing as a transport error.
pub(crate) async fn get_marked_json<T: DeserializeOwned + ErrorMarked>(
    client: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<T, SourceError> {
    let response = execute(client, provider, request).await?;
    if is_marked_rejection(&response) {
        if let Ok(payload) = parse_json::<T>(provider, &response) {
            if payload.has_error_marker() {
                return Ok(payload);
            }
        }
    }
    check_transport(provider, &response)?;
    parse_json(provider, &response)
}

async fn execute(
    client: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    client
        .execute(request.with_timeout_ms(REQUEST_TIMEOUT_MS))
        .await
        .map_err(|error| {
            SourceError::network(provider, format!("{provider} transport error: {}", error.message()))
        })
}

/// 4xx other than 429, with a JSON body.
fn is_marked_rejection(response: &HttpResponse) -> bool {
    (400..500).contains(&response.status) && response.status != 429 && response.is_json()
}

fn parse_json<T: DeserializeOwned>(
    provider: ProviderId,
    response: &HttpResponse,
) -> Result<T, SourceError> {
    serde_json::from_str(&response.body).map_err(|error| {
        SourceError::invalid_response(provider, format!("malformed {provider} payload: {error}"))
    })
}

/// HTTP 429 is a rate limit; any other non-2xx status or non-JSON body is a transport failure.
pub(crate) fn check_transport(
    provider: ProviderId,
    response: &HttpResponse,
) -> Result<(), SourceError> {
    if response.status == 429 {
        return Err(SourceError::rate_limited(
            provider,
            format!("{provider} returned HTTP 429"),
        ));
    }
    if !response.is_success() {
        return Err(SourceError::network(
            provider,
            format!("{provider} upstream returned status {}", response.status),
        ));
    }
    if !response.is_json() {
        return Err(SourceError::network(
            provider,
            format!(
                "{provider} returned non-JSON content-type '{}'",
                response.content_type.as_deref().unwrap_or("<none>")
            ),
        ));
    }
    Ok(())
}

/// Parses a provider number string such as `"4783.45"` or `"-0.42%"`.
pub(crate) fn parse_number(
    provider: ProviderId,
    field: &str,
    raw: Option<&str>,
) -> Result<f64, SourceError> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty()).ok_or_else(|| {
        SourceError::invalid_response(provider, format!("{provider} payload missing '{field}'"))
    })?;

    raw.trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            SourceError::invalid_response(
                provider,
                format!("{provider} field '{field}' is not a number: '{raw}'"),
            )
        })
}

/// Treats blank keys as absent.
pub(crate) fn normalize_key(api_key: Option<String>) -> Option<String> {
    api_key
        .map(|key| key.trim().to_owned())
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_rate_limited_and_other_failures_are_transport() {
        let provider = ProviderId::Fred;

        let limited = check_transport(provider, &HttpResponse::json(429, "{}"))
            .expect_err("429 must fail");
        assert_eq!(limited.code(), "RATE_LIMITED");

        let server = check_transport(provider, &HttpResponse::json(503, "{}"))
            .expect_err("503 must fail");
        assert_eq!(server.code(), "NETWORK_ERROR");

        let html = check_transport(provider, &HttpResponse::text(200, "<html></html>"))
            .expect_err("html must fail");
        assert_eq!(html.code(), "NETWORK_ERROR");

        assert!(check_transport(provider, &HttpResponse::ok_json("{}")).is_ok());
    }

    #[test]
    fn only_json_client_errors_are_marker_candidates() {
        assert!(is_marked_rejection(&HttpResponse::json(400, "{}")));
        assert!(is_marked_rejection(&HttpResponse::json(403, "{}")));
        assert!(!is_marked_rejection(&HttpResponse::json(429, "{}")));
        assert!(!is_marked_rejection(&HttpResponse::json(503, "{}")));
        assert!(!is_marked_rejection(&HttpResponse::text(400, "<html>")));
    }

    #[test]
    fn parses_percent_suffixed_numbers() {
        let provider = ProviderId::Alphavantage;
        assert_eq!(parse_number(provider, "pct", Some(" -0.4200% ")), Ok(-0.42));
        assert!(parse_number(provider, "pct", Some("n/a")).is_err());
        assert!(parse_number(provider, "pct", Some("")).is_err());
        assert!(parse_number(provider, "pct", None).is_err());
    }

    #[test]
    fn blank_keys_are_absent() {
        assert_eq!(normalize_key(Some(String::from("  "))), None);
        assert_eq!(normalize_key(Some(String::from(" k "))), Some(String::from("k")));
    }
}
