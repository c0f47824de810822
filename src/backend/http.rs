// backend/http.rs

use crate::config::Config;
use crate::error::{BackendError, Error};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const LOG_BODY_LIMIT: usize = 4000;

pub(crate) fn client(config: &Config) -> Result<Client, Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| Error::Config(format!("HTTP client build failed: {}", e)))
}

/// Sends the request and returns the body of a successful response.
/// Non-success statuses become the matching [`BackendError`].
pub(crate) async fn send(client: &Client, builder: RequestBuilder) -> Result<String, BackendError> {
    let request = builder.build()?;
    log_request(&request);
    let method = request.method().clone();
    let url = request.url().clone();

    let resp = client.execute(request).await?;
    let status = resp.status();
    let text = resp.text().await?;
    tracing::debug!(%method, %url, status = status.as_u16(), body = %truncate(&text, LOG_BODY_LIMIT), "http response");

    if status.is_success() {
        Ok(text)
    } else {
        Err(status_error(status, &text))
    }
}

pub(crate) fn decode<T: DeserializeOwned>(text: &str) -> Result<T, BackendError> {
    serde_json::from_str(text).map_err(|e| BackendError::Decode(e.to_string()))
}

fn status_error(status: StatusCode, body: &str) -> BackendError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        _ => BackendError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

// Hosted services disagree on where the human-readable text lives.
fn error_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| v.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn log_request(request: &reqwest::Request) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let headers: Vec<String> = request
        .headers()
        .iter()
        .map(|(k, v)| {
            let raw = v.to_str().unwrap_or("<binary>");
            let shown = if k == reqwest::header::AUTHORIZATION {
                mask_bearer(raw)
            } else if k.as_str().eq_ignore_ascii_case("apikey") {
                mask_token(raw)
            } else {
                raw.to_string()
            };
            format!("{}: {}", k, shown)
        })
        .collect();
    let body = request
        .body()
        .and_then(|b| b.as_bytes())
        .map(|b| truncate(&String::from_utf8_lossy(b), LOG_BODY_LIMIT))
        .unwrap_or_default();
    tracing::debug!(
        method = %request.method(),
        url = %request.url(),
        headers = ?headers,
        %body,
        "http request"
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

fn mask_bearer(v: &str) -> String {
    match v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")) {
        Some(token) => format!("Bearer {}", mask_token(token)),
        None => "*****".to_string(),
    }
}

pub(crate) fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 10 {
        return "*****".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
