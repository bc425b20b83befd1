//! Configuration module for the voice relay server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//! Configuration is resolved once at startup; each call receives a ready-made
//! [`RealtimeConfig`] and never consults the environment itself.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voice_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod validation;
mod yaml;

pub use validation::{MAX_TEMPERATURE, MIN_TEMPERATURE};

use crate::core::realtime::{
    DEFAULT_SETTLE_DELAY_MS, DEFAULT_TEMPERATURE, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel,
    OpenAIRealtimeVoice, RealtimeConfig, TurnDetectionConfig,
};
use crate::core::relay::DEFAULT_MARK_NAME;
use crate::core::telephony::{TWILIO_API_BASE, TwilioClient, TwilioError};

/// Default bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5050;

/// Default assistant instructions.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful and friendly AI assistant \
talking to a caller over the phone. Keep your answers short and conversational, \
and stop talking as soon as the caller interrupts.";

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the relay, including:
/// - Server settings (host, port, public URL, TLS)
/// - Provider credentials (OpenAI, Twilio)
/// - Realtime session settings (model, voice, instructions, audio format)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL (e.g. `https://relay.example.com`)
    pub public_url: Option<String>,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Provider credentials
    /// OpenAI API key for the Realtime API
    pub openai_api_key: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    /// Caller ID used for outbound calls
    pub twilio_phone_number: Option<String>,
    /// Destination used when an outbound call names no number
    pub default_to_number: Option<String>,
    /// REST API base override (defaults to the public Twilio API)
    pub twilio_api_base: Option<String>,

    // Realtime session settings
    pub realtime_model: String,
    /// WebSocket endpoint override
    pub realtime_url: Option<String>,
    pub voice: String,
    pub system_message: String,
    pub temperature: f32,
    /// Audio encoding on both legs (`g711_ulaw` for phone calls)
    pub audio_format: String,
    /// Delay between AI socket open and `session.update` (ms)
    pub settle_delay_ms: u64,
    /// Name attached to every outbound mark frame
    pub mark_name: String,
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut token) = self.twilio_auth_token {
            token.zeroize();
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_url: None,
            tls: None,
            openai_api_key: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_phone_number: None,
            default_to_number: None,
            twilio_api_base: None,
            realtime_model: OpenAIRealtimeModel::default().as_str().to_string(),
            realtime_url: None,
            voice: OpenAIRealtimeVoice::default().as_str().to_string(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            audio_format: OpenAIRealtimeAudioFormat::default().as_str().to_string(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            mark_name: DEFAULT_MARK_NAME.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults
    ///
    /// The .env file is loaded in main.rs before this is called, so actual
    /// environment variables override .env values.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        merge::merge_config(None)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        merge::merge_config(Some(yaml_config))
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Session configuration handed to every call.
    ///
    /// # Returns
    /// * `Result<RealtimeConfig, String>` - The config, or an error message
    ///   when the OpenAI API key is missing
    pub fn realtime_config(&self) -> Result<RealtimeConfig, String> {
        let api_key = self
            .openai_api_key
            .as_ref()
            .cloned()
            .ok_or_else(|| "OpenAI API key not configured in server environment".to_string())?;

        Ok(RealtimeConfig {
            api_key,
            url: self.realtime_url.clone(),
            model: self.realtime_model.clone(),
            voice: Some(self.voice.clone()),
            instructions: Some(self.system_message.clone()),
            temperature: Some(self.temperature),
            input_audio_format: Some(self.audio_format.clone()),
            output_audio_format: Some(self.audio_format.clone()),
            turn_detection: Some(TurnDetectionConfig::default()),
            modalities: None,
            settle_delay_ms: Some(self.settle_delay_ms),
        })
    }

    /// Build a REST client for outbound calls.
    pub fn twilio_client(&self) -> Result<TwilioClient, TwilioError> {
        TwilioClient::with_base_url(
            self.twilio_account_sid.as_deref().unwrap_or_default(),
            self.twilio_auth_token.as_deref().unwrap_or_default(),
            self.twilio_api_base.as_deref().unwrap_or(TWILIO_API_BASE),
        )
    }

    /// URL of the TwiML webhook, if a public URL is configured.
    pub fn incoming_call_url(&self) -> Option<String> {
        self.public_url
            .as_ref()
            .map(|base| format!("{}/incoming-call", base.trim_end_matches('/')))
    }
}
