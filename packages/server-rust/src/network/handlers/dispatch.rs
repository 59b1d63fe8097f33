//! `POST /<namespace>/<operation>`: hands the request to the dispatch
//! pipeline and writes the resulting envelope as the response body.
//!
//! The HTTP status is always 200; the outcome lives in `statusCode`.

use aviary_core::Envelope;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Uri};
use axum::Json;
use serde_json::{Map, Value};
use tower::ServiceExt;
use tracing::debug;

use super::AppState;
use crate::service::Call;

/// Dispatches by request path. The query string is ignored.
///
/// An empty body is passed to the operation as `null`. A form-encoded body
/// becomes an object of string fields. Any other body is parsed as JSON; if
/// that fails it never reaches an operation and yields an `Unknown` envelope.
pub async fn dispatch_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Envelope> {
    let _guard = state.shutdown.in_flight_guard();
    let ctx = state.request_context(&headers);

    let body = match parse_body(content_type(&headers), &body) {
        Ok(body) => body,
        Err(err) => {
            debug!(path = uri.path(), error = %err, "rejecting malformed request body");
            return Json(Envelope::unknown(err.to_string()));
        }
    };

    let call = Call::new(uri.path(), body, ctx);
    let envelope = state
        .pipeline
        .clone()
        .oneshot(call)
        .await
        .unwrap_or_else(|never| match never {});
    Json(envelope)
}

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Media type without parameters, lowercased.
fn content_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let media_type = value.split(';').next().unwrap_or_default().trim();
    Some(media_type.to_ascii_lowercase())
}

fn parse_body(content_type: Option<String>, raw: &[u8]) -> Result<Value, serde_json::Error> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    if content_type.as_deref() == Some(FORM_URLENCODED) {
        return Ok(parse_form(raw));
    }
    serde_json::from_slice(raw)
}

/// Decodes `a=1&b=2` into `{"a":"1","b":"2"}`. A repeated key collects its
/// values into an array in arrival order.
fn parse_form(raw: &[u8]) -> Value {
    let mut fields = Map::new();
    for (key, value) in url::form_urlencoded::parse(raw) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(key.as_ref()) {
            None => {
                fields.insert(key.into_owned(), value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    Value::Object(fields)
}
