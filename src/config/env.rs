//! Environment variable loading.
//!
//! Reads every supported variable once. Empty values count as unset so a
//! blank line in `.env` never overrides a default.

use std::env;
use std::str::FromStr;

/// Raw values read from the process environment.
#[derive(Debug, Clone, Default)]
pub(super) struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,

    pub openai_api_key: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: Option<String>,
    pub default_to_number: Option<String>,
    pub twilio_api_base: Option<String>,

    pub realtime_model: Option<String>,
    pub realtime_url: Option<String>,
    pub voice: Option<String>,
    pub system_message: Option<String>,
    pub temperature: Option<f32>,
    pub audio_format: Option<String>,
    pub settle_delay_ms: Option<u64>,
    pub mark_name: Option<String>,
}

impl EnvConfig {
    /// Read the environment.
    ///
    /// # Errors
    /// Returns an error if a numeric variable does not parse.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            host: var("HOST"),
            port: parse_var("PORT")?,
            public_url: var("PUBLIC_URL"),
            tls_cert_path: var("TLS_CERT_PATH"),
            tls_key_path: var("TLS_KEY_PATH"),

            openai_api_key: var("OPENAI_API_KEY"),
            twilio_account_sid: var("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: var("TWILIO_AUTH_TOKEN"),
            twilio_phone_number: var("TWILIO_PHONE_NUMBER"),
            default_to_number: var("TO_PHONE_NUMBER"),
            twilio_api_base: var("TWILIO_API_BASE"),

            realtime_model: var("OPENAI_REALTIME_MODEL"),
            realtime_url: var("OPENAI_REALTIME_URL"),
            voice: var("OPENAI_VOICE"),
            system_message: var("SYSTEM_MESSAGE"),
            temperature: parse_var("OPENAI_TEMPERATURE")?,
            audio_format: var("REALTIME_AUDIO_FORMAT"),
            settle_delay_ms: parse_var("SESSION_SETTLE_DELAY_MS")?,
            mark_name: var("MARK_NAME"),
        })
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} value '{raw}': {e}").into()),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_blank_values_are_unset() {
        unsafe {
            env::set_var("OPENAI_VOICE", "  ");
            env::set_var("PORT", "6060");
        }

        let config = EnvConfig::load().unwrap();
        assert_eq!(config.voice, None);
        assert_eq!(config.port, Some(6060));

        unsafe {
            env::remove_var("OPENAI_VOICE");
            env::remove_var("PORT");
        }
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_an_error() {
        unsafe {
            env::set_var("SESSION_SETTLE_DELAY_MS", "soon");
        }

        let err = EnvConfig::load().unwrap_err();
        assert!(err.to_string().contains("SESSION_SETTLE_DELAY_MS"));

        unsafe {
            env::remove_var("SESSION_SETTLE_DELAY_MS");
        }
    }
}
