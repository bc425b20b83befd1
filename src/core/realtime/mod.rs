//! Realtime AI speech session module.
//!
//! This module provides the client for the AI leg of a relayed call: a
//! full-duplex conversational endpoint that accepts caller audio and emits
//! synthesized speech plus control events.
//!
//! # Supported Providers
//!
//! - **OpenAI Realtime API** - Full duplex audio with GPT-4o
//!
//! # Architecture
//!
//! - [`OpenAIRealtime`] owns the socket and its writer/reader tasks
//! - [`SessionHandle`] is the cloneable sending side given to the relay
//! - Inbound frames are parsed into [`ServerEvent`] and delivered on a channel
//!
//! # Example
//!
//! ```rust,ignore
//! use voice_relay::core::realtime::{OpenAIRealtime, RealtimeConfig};
//!
//! let config = RealtimeConfig {
//!     api_key: "sk-...".to_string(),
//!     voice: Some("alloy".to_string()),
//!     ..Default::default()
//! };
//!
//! let mut realtime = OpenAIRealtime::new(config)?;
//! let events = realtime.connect().await?;
//! ```

mod base;
pub mod openai;

pub use base::{
    ConnectionState, DEFAULT_SETTLE_DELAY_MS, DEFAULT_TEMPERATURE, RealtimeConfig, RealtimeError,
    RealtimeResult, TurnDetectionConfig,
};
pub use openai::{
    ClientEvent, Modality, OPENAI_REALTIME_URL, OpenAIRealtime, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeModel, OpenAIRealtimeVoice, ServerEvent, SessionCommand, SessionConfig,
    SessionHandle,
};
