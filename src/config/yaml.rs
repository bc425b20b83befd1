use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5050
///   public_url: "https://relay.example.com"
///   tls:
///     cert_path: "/etc/relay/cert.pem"
///     key_path: "/etc/relay/key.pem"
///
/// providers:
///   openai_api_key: "sk-..."
///   twilio_account_sid: "AC..."
///   twilio_auth_token: "your-auth-token"
///   twilio_phone_number: "+15550001111"
///   default_to_number: "+15552223333"
///
/// realtime:
///   model: "gpt-4o-realtime-preview-2024-10-01"
///   voice: "alloy"
///   instructions: "You are a helpful phone assistant."
///   temperature: 0.8
///   audio_format: "g711_ulaw"
///   settle_delay_ms: 250
///   mark_name: "responsePart"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub realtime: Option<RealtimeYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Externally reachable base URL, used for TwiML and outbound calls
    pub public_url: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Provider credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    /// OpenAI API key for the Realtime API
    pub openai_api_key: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    /// Caller ID for outbound calls
    pub twilio_phone_number: Option<String>,
    /// Destination used when `call` is given no number
    pub default_to_number: Option<String>,
    /// REST API base override
    pub twilio_api_base: Option<String>,
}

/// Realtime session settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub model: Option<String>,
    pub url: Option<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    pub temperature: Option<f32>,
    pub audio_format: Option<String>,
    pub settle_delay_ms: Option<u64>,
    pub mark_name: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
