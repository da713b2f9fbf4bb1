//! Response handling shared by the REST adapters.

use chrono::{DateTime, Utc};
use dca::{ExchangeError, ExchangeResult};
use reqwest::header::HeaderMap;
use reqwest::RequestBuilder;
use rust_decimal::Decimal;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};

/// Sends the request and decodes a 2xx JSON body into `T`.
pub async fn send<T: DeserializeOwned>(request: RequestBuilder) -> ExchangeResult<T> {
    let (_, body) = fetch(request).await?;
    decode(&body)
}

/// Like [`send`], also handing back the `cursor` response header of a
/// paginated listing.
pub async fn send_paged<T: DeserializeOwned>(
    request: RequestBuilder,
    cursor: &str,
) -> ExchangeResult<(T, Option<String>)> {
    let (headers, body) = fetch(request).await?;
    let next = headers
        .get(cursor)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Ok((decode(&body)?, next))
}

async fn fetch(request: RequestBuilder) -> ExchangeResult<(HeaderMap, String)> {
    let response = request
        .send()
        .await
        .map_err(|e| ExchangeError::Transport(e.to_string()))?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .map_err(|e| ExchangeError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(ExchangeError::Rejected(error_message(status.as_u16(), &body)));
    }

    Ok((headers, body))
}

pub fn decode<T: DeserializeOwned>(body: &str) -> ExchangeResult<T> {
    serde_json::from_str(body).map_err(|e| ExchangeError::Decode(e.to_string()))
}

/// Pulls the venue's own message out of an error body when there is one.
pub fn error_message(status: u16, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "reason"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                if !msg.is_empty() {
                    return format!("{} ({})", msg, status);
                }
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("{} ({})", body, status)
    }
}

/// Float to decimal through its shortest printed form, for handing venue
/// prices to a [`LimitPricer`](dca::LimitPricer).
pub fn decimal(value: f64) -> Decimal {
    value.to_string().parse().unwrap_or_default()
}

/// Coinbase and Gemini send most numbers as strings, FTX sends them bare.
pub fn flexible_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.trim().is_empty() => Ok(0.0),
        Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// Accepts RFC 3339 as well as the `2017-06-15 02:33:27.937296+00` form
/// older Coinbase endpoints return.
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Nullable timestamp. Unparseable values are treated as absent.
pub fn optional_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_time))
}
