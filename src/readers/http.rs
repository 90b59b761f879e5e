use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{FetchErrorKind, Result};

/// Longest error body kept in a `HttpStatus` failure
const MAX_ERROR_BODY: usize = 512;

pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("aq-etl/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Send a request and decode its JSON body, mapping every failure to a fetch error kind.
///
/// URLs are stripped from network errors since query strings may carry an API key.
pub async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> std::result::Result<T, FetchErrorKind> {
    let response = request
        .send()
        .await
        .map_err(|e| FetchErrorKind::Network(e.without_url()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchErrorKind::HttpStatus {
            status: status.as_u16(),
            body: truncate(&body),
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| FetchErrorKind::Network(e.without_url()))?;
    parse_json(&text)
}

pub fn parse_json<T: DeserializeOwned>(text: &str) -> std::result::Result<T, FetchErrorKind> {
    serde_json::from_str(text).map_err(|e| FetchErrorKind::MalformedResponse(e.to_string()))
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        value: f64,
    }

    #[test]
    fn test_parse_json_reports_malformed_body() {
        let ok: Payload = parse_json(r#"{"value": 1.5}"#).unwrap();
        assert_eq!(ok.value, 1.5);

        let err = parse_json::<Payload>(r#"{"other": 1}"#).unwrap_err();
        assert!(matches!(err, FetchErrorKind::MalformedResponse(_)));

        let err = parse_json::<Payload>("<html>").unwrap_err();
        assert!(matches!(err, FetchErrorKind::MalformedResponse(_)));
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "x".repeat(2000);
        let truncated = truncate(&long);
        assert!(truncated.chars().count() <= MAX_ERROR_BODY + 1);
        assert_eq!(truncate("  short  "), "short");
    }
}
