// src/http/log_relay.rs
//! `POST /log`: client log batches re-emitted as tracing events

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Deserialize)]
pub struct LogBatch {
    #[serde(default)]
    pub events: Vec<LogEvent>,
}

#[derive(Debug, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    pub ts: Value,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub extra: Value,
    #[serde(default)]
    pub ctx: Value,
}

fn default_level() -> String {
    "info".into()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn emit(event: &LogEvent) {
    let (ts, extra, ctx, message) = (&event.ts, &event.extra, &event.ctx, event.message.as_str());
    match event.level.to_ascii_lowercase().as_str() {
        "error" | "fatal" => error!(target: "client", %ts, %extra, %ctx, "{message}"),
        "warn" | "warning" => warn!(target: "client", %ts, %extra, %ctx, "{message}"),
        "debug" => debug!(target: "client", %ts, %extra, %ctx, "{message}"),
        "trace" => trace!(target: "client", %ts, %extra, %ctx, "{message}"),
        _ => info!(target: "client", %ts, %extra, %ctx, "{message}"),
    }
}

pub async fn relay(method: Method, headers: HeaderMap, body: Bytes) -> Response {
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "POST")],
            Json(json!({ "error": "method not allowed" })),
        )
            .into_response();
    }
    if !is_json(&headers) {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({ "error": "expected application/json" })),
        )
            .into_response();
    }

    match serde_json::from_slice::<LogBatch>(&body) {
        Ok(batch) => {
            batch.events.iter().for_each(emit);
            (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
        }
        Err(err) => {
            warn!(error = %err, "rejected log batch");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
