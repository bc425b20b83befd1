//! Base types for the realtime AI speech session.
//!
//! This module defines the error type, the per-session configuration and the
//! connection state shared by the realtime client and the relay bridge.
//!
//! # Audio Format
//!
//! Phone-call media streams carry G.711 u-law at 8kHz, so sessions default to
//! `g711_ulaw` on both legs. Frames are never transcoded by the relay.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default delay between socket open and the `session.update` message.
///
/// Gives the provider time to finish its own session setup before the
/// configuration arrives.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 250;

/// Default sampling temperature for generated responses.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The socket failed while sending
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Configuration for one realtime AI session.
///
/// Resolved once from the server configuration and handed to every call, so
/// the relay itself never consults the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// WebSocket endpoint override (defaults to the OpenAI Realtime URL)
    #[serde(default)]
    pub url: Option<String>,

    /// Model to use (e.g., "gpt-4o-realtime-preview")
    #[serde(default)]
    pub model: String,

    /// Voice ID for synthesized speech
    #[serde(default)]
    pub voice: Option<String>,

    /// System instructions for the assistant
    #[serde(default)]
    pub instructions: Option<String>,

    /// Temperature for response generation
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Input audio format
    #[serde(default)]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(default)]
    pub output_audio_format: Option<String>,

    /// Turn detection configuration
    #[serde(default)]
    pub turn_detection: Option<TurnDetectionConfig>,

    /// Response modalities (text, audio, or both)
    #[serde(default)]
    pub modalities: Option<Vec<String>>,

    /// Delay before the session configuration is sent (ms)
    #[serde(default)]
    pub settle_delay_ms: Option<u64>,
}

impl RealtimeConfig {
    /// Settling delay before `session.update`, falling back to the default.
    pub fn settle_delay_ms(&self) -> u64 {
        self.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS)
    }
}

/// Configuration for turn detection (VAD).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetectionConfig {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold (0.0 to 1.0)
        #[serde(default)]
        threshold: Option<f32>,
        /// Amount of audio to include before voice detection (ms)
        #[serde(default)]
        prefix_padding_ms: Option<u32>,
        /// Silence duration before end of turn (ms)
        #[serde(default)]
        silence_duration_ms: Option<u32>,
    },
    /// No automatic turn detection
    #[serde(rename = "none")]
    None,
}

impl Default for TurnDetectionConfig {
    fn default() -> Self {
        TurnDetectionConfig::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
        }
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection state for the realtime session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the provider
    #[default]
    Disconnected,
    /// Currently connecting
    Connecting,
    /// Connected and streaming
    Connected,
    /// Connection closed by either side
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}
