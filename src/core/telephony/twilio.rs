//! Outbound call placement through the Twilio REST API.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base}/2010-04-01/Accounts/{AccountSid}/Calls.json`
//! - Authentication: HTTP basic auth with account SID and auth token
//! - Body: form-encoded `To`, `From`, `Url` (the TwiML webhook)

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use zeroize::Zeroize;

/// Twilio REST API base URL.
pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Errors returned by [`TwilioClient`].
#[derive(Debug, Error)]
pub enum TwilioError {
    /// Account SID or auth token not configured
    #[error("Missing Twilio credentials: {0}")]
    MissingCredentials(String),

    /// Request parameters rejected before sending
    #[error("Invalid call request: {0}")]
    InvalidRequest(String),

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the API
    #[error("Twilio API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },
}

/// Parameters of an outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Destination number (E.164)
    pub to: String,
    /// Caller ID, must be a number owned by the account
    pub from: String,
    /// Webhook returning the TwiML that connects the media stream
    pub url: String,
}

impl CallRequest {
    fn validate(&self) -> Result<(), TwilioError> {
        if self.to.trim().is_empty() {
            return Err(TwilioError::InvalidRequest(
                "destination number is required".to_string(),
            ));
        }
        if self.from.trim().is_empty() {
            return Err(TwilioError::InvalidRequest(
                "caller number is required".to_string(),
            ));
        }
        match url::Url::parse(&self.url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
            _ => Err(TwilioError::InvalidRequest(format!(
                "webhook URL must be an http(s) URL, got '{}'",
                self.url
            ))),
        }
    }
}

/// Subset of the call resource returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Minimal Twilio REST client.
pub struct TwilioClient {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    /// Create a client against the public API.
    pub fn new(account_sid: &str, auth_token: &str) -> Result<Self, TwilioError> {
        Self::with_base_url(account_sid, auth_token, TWILIO_API_BASE)
    }

    /// Create a client against a custom API base (used by tests).
    pub fn with_base_url(
        account_sid: &str,
        auth_token: &str,
        base_url: &str,
    ) -> Result<Self, TwilioError> {
        if account_sid.is_empty() {
            return Err(TwilioError::MissingCredentials(
                "TWILIO_ACCOUNT_SID is not set".to_string(),
            ));
        }
        if auth_token.is_empty() {
            return Err(TwilioError::MissingCredentials(
                "TWILIO_AUTH_TOKEN is not set".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.base_url, self.account_sid
        )
    }

    /// Place an outbound call whose media is driven by `request.url`.
    pub async fn place_call(&self, request: &CallRequest) -> Result<CallRecord, TwilioError> {
        request.validate()?;

        debug!(to = %request.to, from = %request.from, url = %request.url, "Placing call");

        let response = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", request.to.as_str()),
                ("From", request.from.as_str()),
                ("Url", request.url.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();
            let (code, message) = match parsed {
                Some(err) => (err.code, err.message.unwrap_or(body)),
                None => (None, body),
            };
            return Err(TwilioError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let record: CallRecord = response.json().await?;
        info!(sid = %record.sid, status = ?record.status, "Call placed");
        Ok(record)
    }
}

impl Drop for TwilioClient {
    fn drop(&mut self) {
        self.auth_token.zeroize();
    }
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}
