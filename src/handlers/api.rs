//! REST handlers: health check, TwiML webhook and outbound call placement.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::telephony::{CallRecord, CallRequest};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Path of the media-stream WebSocket endpoint.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_calls: usize,
}

/// Health check handler
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        active_calls: state.active_calls(),
    })
}

/// TwiML webhook for answered calls.
///
/// Connects the call's audio to the media-stream endpoint on this server.
/// The host comes from the configured public URL, falling back to the
/// request's `Host` header.
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let stream_url = media_stream_url(state.config.public_url.as_deref(), &headers)?;
    info!(%stream_url, "Incoming call, connecting media stream");

    Ok((
        [(header::CONTENT_TYPE, "text/xml")],
        twiml_connect(&stream_url),
    ))
}

/// Outbound call request body. Missing numbers fall back to configuration.
#[derive(Debug, Default, Deserialize)]
pub struct PlaceCallRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

/// Place an outbound call that is bridged to the AI assistant once answered.
pub async fn place_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlaceCallRequest>,
) -> AppResult<Json<CallRecord>> {
    let config = &state.config;

    let to = request
        .to
        .or_else(|| config.default_to_number.clone())
        .ok_or_else(|| {
            AppError::BadRequest("No destination number given and TO_PHONE_NUMBER is not set".into())
        })?;
    let from = request
        .from
        .or_else(|| config.twilio_phone_number.clone())
        .ok_or_else(|| {
            AppError::BadRequest("No caller number given and TWILIO_PHONE_NUMBER is not set".into())
        })?;
    let url = config
        .incoming_call_url()
        .ok_or_else(|| AppError::NotConfigured("PUBLIC_URL is not configured".into()))?;

    let client = config.twilio_client()?;
    let record = client.place_call(&CallRequest { to, from, url }).await?;

    Ok(Json(record))
}

/// Resolve the `wss://` (or `ws://` for plain-http deployments) stream URL.
fn media_stream_url(public_url: Option<&str>, headers: &HeaderMap) -> AppResult<String> {
    if let Some(public_url) = public_url {
        let parsed = url::Url::parse(public_url)
            .map_err(|e| AppError::NotConfigured(format!("Invalid PUBLIC_URL: {e}")))?;
        let scheme = if parsed.scheme() == "http" { "ws" } else { "wss" };
        let host = parsed
            .host_str()
            .ok_or_else(|| AppError::NotConfigured("PUBLIC_URL has no host".into()))?;
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        return Ok(format!("{scheme}://{authority}{MEDIA_STREAM_PATH}"));
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|host| !host.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing Host header".into()))?;

    Ok(format!("wss://{host}{MEDIA_STREAM_PATH}"))
}

fn twiml_connect(stream_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Say>Please wait while we connect your call to the AI voice assistant.</Say>
    <Pause length="1"/>
    <Say>OK, you can start talking!</Say>
    <Connect>
        <Stream url="{}" />
    </Connect>
</Response>"#,
        xml_escape(stream_url)
    )
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_stream_url_from_public_url() {
        let headers = HeaderMap::new();
        assert_eq!(
            media_stream_url(Some("https://relay.example.com"), &headers).unwrap(),
            "wss://relay.example.com/media-stream"
        );
        assert_eq!(
            media_stream_url(Some("http://localhost:5050"), &headers).unwrap(),
            "ws://localhost:5050/media-stream"
        );
    }

    #[test]
    fn test_stream_url_from_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("abc.ngrok.app"));
        assert_eq!(
            media_stream_url(None, &headers).unwrap(),
            "wss://abc.ngrok.app/media-stream"
        );

        assert!(media_stream_url(None, &HeaderMap::new()).is_err());
    }

    #[test]
    fn test_twiml_escapes_url() {
        let twiml = twiml_connect("wss://a.example.com/media-stream?x=1&y=2");
        assert!(twiml.contains(r#"<Stream url="wss://a.example.com/media-stream?x=1&amp;y=2" />"#));
        assert!(twiml.contains("<Connect>"));
    }
}
