//! Response decoding.
//!
//! Turns a fully read [`RawResponse`] into either a [`Response`] carrying an
//! [`Outcome`] or a classified [`Error`]. Decoding never retries anything.

use crate::response::{Outcome, Response};
use crate::transport::RawResponse;
use crate::{Error, Result};
use encoding_rs::{Encoding, UTF_8};
use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use http::HeaderMap;
use std::time::Duration;

/// Decodes the final response of a logical call.
///
/// Status codes of 300 and above become [`Error::Http`], carrying the
/// server's reason phrase or, failing that, the canonical one. A blank body on a
/// success status is [`Outcome::NoContent`]; anything else must parse as JSON.
///
/// # Examples
///
/// ```
/// use ratewise::decode::decode;
/// use ratewise::{Outcome, RawResponse};
/// use http::{HeaderMap, StatusCode};
/// use std::time::Duration;
///
/// let raw = RawResponse {
///     status: StatusCode::OK,
///     reason: None,
///     headers: HeaderMap::new(),
///     body: r#"{"key":"PROJ-1"}"#.into(),
/// };
///
/// let response = decode(raw, 1, Duration::ZERO).unwrap();
/// assert_eq!(response.data, Outcome::Document(serde_json::json!({"key": "PROJ-1"})));
/// ```
pub fn decode(raw: RawResponse, attempts: u32, latency: Duration) -> Result<Response> {
    let RawResponse {
        status,
        reason,
        headers,
        body,
    } = raw;

    let (text, _, _) = charset(&headers).decode(&body);
    let text = text.into_owned();

    if status.as_u16() >= 300 {
        if status.is_client_error() {
            tracing::error!(status = status.as_u16(), response = %text, "Client error (4xx)");
        } else if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), response = %text, "Server error (5xx)");
        }

        return Err(Error::Http {
            status,
            reason: reason
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default(),
            raw_response: text,
            headers,
        });
    }

    if text.trim().is_empty() {
        return Ok(Response::new(
            Outcome::NoContent,
            text,
            status,
            headers,
            latency,
            attempts,
        ));
    }

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(document) => Ok(Response::new(
            Outcome::Document(document),
            text,
            status,
            headers,
            latency,
            attempts,
        )),
        Err(e) => {
            tracing::error!(
                error = %e,
                raw_response = %text,
                "Failed to deserialize response"
            );

            Err(Error::Deserialization {
                raw_response: text,
                serde_error: e.to_string(),
                status,
            })
        }
    }
}

/// Picks the character encoding of a response body.
///
/// A `Content-Encoding` value naming a character set wins, then the `charset`
/// parameter of `Content-Type`, then UTF-8. Compression codings such as
/// `gzip` are not character sets and are skipped.
pub fn charset(headers: &HeaderMap) -> &'static Encoding {
    let from_content_encoding = headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()));

    from_content_encoding
        .or_else(|| {
            headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .and_then(content_type_charset)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or(UTF_8)
}

fn content_type_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}
