//! OpenAI Realtime API module.
//!
//! This module provides the AI leg of a relayed phone call using OpenAI's
//! Realtime API.
//!
//! # Features
//!
//! - Bidirectional audio streaming with opaque base64 payloads
//! - One-shot session configuration after a settling delay
//! - Server-side Voice Activity Detection (VAD) for barge-in
//! - Response truncation on interruption
//!
//! # Supported Models
//!
//! - `gpt-4o-realtime-preview` - GPT-4o Realtime Preview
//! - `gpt-4o-realtime-preview-2024-10-01` - October 2024 version (default)
//! - `gpt-4o-realtime-preview-2024-12-17` - December 2024 version
//! - `gpt-4o-mini-realtime-preview` - Mini model for lower latency
//!
//! # Supported Voices
//!
//! alloy, ash, ballad, coral, echo, sage, shimmer, verse
//!
//! # Audio Format
//!
//! Phone calls use G.711 u-law at 8kHz on both legs. PCM 16-bit at 24kHz and
//! G.711 a-law are also accepted by the API.

mod client;
mod config;
mod messages;

pub use client::{OpenAIRealtime, SessionCommand, SessionHandle};
pub use config::{
    Modality, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel,
    OpenAIRealtimeVoice,
};
pub use messages::{
    ApiError, ClientEvent, RateLimit, Response, ServerEvent, Session, SessionConfig,
    TurnDetection,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::base::{ConnectionState, RealtimeConfig};

    #[tokio::test]
    async fn test_openai_realtime_with_config() {
        let config = RealtimeConfig {
            api_key: "test_key".to_string(),
            model: "gpt-4o-mini-realtime-preview".to_string(),
            voice: Some("shimmer".to_string()),
            instructions: Some("Test instructions".to_string()),
            ..Default::default()
        };

        let realtime = OpenAIRealtime::new(config).unwrap();
        assert_eq!(
            realtime.model(),
            OpenAIRealtimeModel::Gpt4oMiniRealtimePreview
        );
        assert_eq!(realtime.voice(), OpenAIRealtimeVoice::Shimmer);
        assert_eq!(
            realtime.audio_format(),
            OpenAIRealtimeAudioFormat::G711Ulaw
        );
        assert!(!realtime.is_ready());
        assert!(realtime.handle().is_none());
        assert_eq!(
            realtime.connection_state().await,
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_realtime_url() {
        assert_eq!(OPENAI_REALTIME_URL, "wss://api.openai.com/v1/realtime");
    }
}
