//! Merging YAML and environment configurations.
//!
//! YAML values win over environment values, which win over defaults.

use super::env::EnvConfig;
use super::validation;
use super::yaml::YamlConfig;
use super::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SYSTEM_MESSAGE, ServerConfig};
use crate::core::realtime::{
    DEFAULT_SETTLE_DELAY_MS, DEFAULT_TEMPERATURE, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel,
    OpenAIRealtimeVoice,
};
use crate::core::relay::DEFAULT_MARK_NAME;

/// Build the final configuration from the environment and optional YAML.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let env = EnvConfig::load()?;
    let yaml = yaml.unwrap_or_default();

    let server = yaml.server.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let realtime = yaml.realtime.unwrap_or_default();

    let tls = match server.tls {
        Some(tls_yaml) if tls_yaml.enabled == Some(false) => None,
        Some(tls_yaml) => validation::validate_tls(
            tls_yaml.cert_path.or(env.tls_cert_path),
            tls_yaml.key_path.or(env.tls_key_path),
        )?,
        None => validation::validate_tls(env.tls_cert_path, env.tls_key_path)?,
    };

    let public_url = server
        .public_url
        .or(env.public_url)
        .map(|url| url.trim_end_matches('/').to_string());
    validation::validate_public_url(&public_url)?;

    let temperature = realtime
        .temperature
        .or(env.temperature)
        .unwrap_or(DEFAULT_TEMPERATURE);
    validation::validate_temperature(temperature)?;

    let mark_name = realtime
        .mark_name
        .or(env.mark_name)
        .unwrap_or_else(|| DEFAULT_MARK_NAME.to_string());
    validation::validate_mark_name(&mark_name)?;

    Ok(ServerConfig {
        host: server
            .host
            .or(env.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: server.port.or(env.port).unwrap_or(DEFAULT_PORT),
        public_url,
        tls,

        openai_api_key: providers.openai_api_key.or(env.openai_api_key),
        twilio_account_sid: providers.twilio_account_sid.or(env.twilio_account_sid),
        twilio_auth_token: providers.twilio_auth_token.or(env.twilio_auth_token),
        twilio_phone_number: providers.twilio_phone_number.or(env.twilio_phone_number),
        default_to_number: providers.default_to_number.or(env.default_to_number),
        twilio_api_base: providers.twilio_api_base.or(env.twilio_api_base),

        realtime_model: realtime
            .model
            .or(env.realtime_model)
            .unwrap_or_else(|| OpenAIRealtimeModel::default().as_str().to_string()),
        realtime_url: realtime.url.or(env.realtime_url),
        voice: realtime
            .voice
            .or(env.voice)
            .unwrap_or_else(|| OpenAIRealtimeVoice::default().as_str().to_string()),
        system_message: realtime
            .instructions
            .or(env.system_message)
            .unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE.to_string()),
        temperature,
        audio_format: realtime
            .audio_format
            .or(env.audio_format)
            .unwrap_or_else(|| OpenAIRealtimeAudioFormat::default().as_str().to_string()),
        settle_delay_ms: realtime
            .settle_delay_ms
            .or(env.settle_delay_ms)
            .unwrap_or(DEFAULT_SETTLE_DELAY_MS),
        mark_name,
    })
}
