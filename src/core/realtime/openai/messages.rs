//! OpenAI Realtime API WebSocket message types.
//!
//! This module defines the client and server events the relay exchanges with
//! the OpenAI Realtime API. All events are JSON-encoded and sent over WebSocket.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - session.update - Configure the session once after connect
//! - input_audio_buffer.append - Forward caller audio
//! - conversation.item.truncate - Cut an interrupted assistant item
//!
//! Server events (received from server):
//! - response.audio.delta - Synthesized audio chunk for the caller
//! - input_audio_buffer.speech_started - Caller started speaking
//! - everything else is decoded for logging only

use serde::{Deserialize, Serialize};

/// Server event types decoded into a dedicated [`ServerEvent`] variant.
///
/// Any other `type` is surfaced as [`ServerEvent::Other`].
const HANDLED_EVENT_TYPES: &[&str] = &[
    "error",
    "session.created",
    "session.updated",
    "input_audio_buffer.speech_started",
    "input_audio_buffer.speech_stopped",
    "input_audio_buffer.committed",
    "conversation.item.truncated",
    "response.audio.delta",
    "response.audio.done",
    "response.audio_transcript.done",
    "response.done",
    "rate_limits.updated",
];

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration for OpenAI Realtime API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data, forwarded as received
        audio: String,
    },

    /// Truncate a conversation item
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        /// Item ID
        item_id: String,
        /// Content index
        content_index: u32,
        /// Audio end in ms
        audio_end_ms: u64,
    },
}

impl ClientEvent {
    /// Create an audio append event from an already-encoded payload.
    pub fn audio_append(payload: impl Into<String>) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: payload.into(),
        }
    }

    /// Create a truncate event for the first content part of an item.
    pub fn truncate(item_id: impl Into<String>, audio_end_ms: u64) -> Self {
        ClientEvent::ConversationItemTruncate {
            item_id: item_id.into(),
            content_index: 0,
            audio_end_ms,
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received from the OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: Session,
    },

    /// Session updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        /// Session information
        session: Session,
    },

    /// Speech started (VAD detected speech)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Audio start timestamp in ms
        #[serde(default)]
        audio_start_ms: Option<u64>,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Speech stopped (VAD detected silence)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        /// Audio end timestamp in ms
        #[serde(default)]
        audio_end_ms: Option<u64>,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Audio buffer committed
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {
        /// New item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Conversation item truncated
    #[serde(rename = "conversation.item.truncated")]
    ConversationItemTruncated {
        /// Item ID
        item_id: String,
        /// Audio end in ms
        #[serde(default)]
        audio_end_ms: Option<u64>,
    },

    /// Audio delta (audio data chunk)
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Item ID
        item_id: String,
        /// Base64-encoded audio delta
        delta: String,
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
    },

    /// Audio done
    #[serde(rename = "response.audio.done")]
    AudioDone {
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Audio transcript done
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
        /// Full transcript
        #[serde(default)]
        transcript: String,
    },

    /// Response done
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response information
        response: Response,
    },

    /// Rate limits updated
    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated {
        /// Rate limit information
        #[serde(default)]
        rate_limits: Vec<RateLimit>,
    },

    /// Any event type the relay does not act on
    #[serde(skip)]
    Other {
        /// The raw `type` field
        event_type: String,
    },
}

/// Minimal view used to route a frame before full decoding.
#[derive(Deserialize)]
struct EventEnvelope<'a> {
    #[serde(rename = "type", borrow)]
    event_type: std::borrow::Cow<'a, str>,
}

impl ServerEvent {
    /// Parse a server frame.
    ///
    /// Frames with an unrecognised `type` decode to [`ServerEvent::Other`];
    /// frames that are not JSON, lack a `type`, or have a recognised type
    /// with a malformed body are errors.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let envelope: EventEnvelope<'_> = serde_json::from_str(text)?;
        if HANDLED_EVENT_TYPES.contains(&envelope.event_type.as_ref()) {
            serde_json::from_str(text)
        } else {
            Ok(ServerEvent::Other {
                event_type: envelope.event_type.into_owned(),
            })
        }
    }

    /// The wire `type` of this event.
    pub fn event_type(&self) -> &str {
        match self {
            ServerEvent::Error { .. } => "error",
            ServerEvent::SessionCreated { .. } => "session.created",
            ServerEvent::SessionUpdated { .. } => "session.updated",
            ServerEvent::SpeechStarted { .. } => "input_audio_buffer.speech_started",
            ServerEvent::SpeechStopped { .. } => "input_audio_buffer.speech_stopped",
            ServerEvent::InputAudioBufferCommitted { .. } => "input_audio_buffer.committed",
            ServerEvent::ConversationItemTruncated { .. } => "conversation.item.truncated",
            ServerEvent::AudioDelta { .. } => "response.audio.delta",
            ServerEvent::AudioDone { .. } => "response.audio.done",
            ServerEvent::AudioTranscriptDone { .. } => "response.audio_transcript.done",
            ServerEvent::ResponseDone { .. } => "response.done",
            ServerEvent::RateLimitsUpdated { .. } => "rate_limits.updated",
            ServerEvent::Other { event_type } => event_type,
        }
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// API error information.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// Session information.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    /// Session ID
    #[serde(default)]
    pub id: Option<String>,
    /// Model used
    #[serde(default)]
    pub model: Option<String>,
    /// Voice
    #[serde(default)]
    pub voice: Option<String>,
}

/// Response information.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    /// Response ID
    #[serde(default)]
    pub id: Option<String>,
    /// Response status
    #[serde(default)]
    pub status: Option<String>,
}

/// Rate limit information.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateLimit {
    /// Rate limit name
    pub name: String,
    /// Limit value
    #[serde(default)]
    pub limit: u64,
    /// Remaining value
    #[serde(default)]
    pub remaining: u64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audio_append_wire_format() {
        let event = ClientEvent::audio_append("AAEC");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "input_audio_buffer.append", "audio": "AAEC"})
        );
    }

    #[test]
    fn test_truncate_wire_format() {
        let event = ClientEvent::truncate("item_1", 350);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "conversation.item.truncate",
                "item_id": "item_1",
                "content_index": 0,
                "audio_end_ms": 350
            })
        );
    }

    #[test]
    fn test_session_update_wire_format() {
        let event = ClientEvent::SessionUpdate {
            session: SessionConfig {
                turn_detection: Some(TurnDetection::ServerVad {
                    threshold: None,
                    prefix_padding_ms: None,
                    silence_duration_ms: None,
                }),
                input_audio_format: Some("g711_ulaw".to_string()),
                output_audio_format: Some("g711_ulaw".to_string()),
                voice: Some("alloy".to_string()),
                instructions: Some("Be brief.".to_string()),
                modalities: Some(vec!["text".to_string(), "audio".to_string()]),
                temperature: Some(0.8),
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "session.update");
        assert_eq!(value["session"]["turn_detection"], json!({"type": "server_vad"}));
        assert_eq!(value["session"]["input_audio_format"], "g711_ulaw");
        assert_eq!(value["session"]["output_audio_format"], "g711_ulaw");
        assert_eq!(value["session"]["voice"], "alloy");
        assert_eq!(value["session"]["instructions"], "Be brief.");
        assert_eq!(value["session"]["modalities"], json!(["text", "audio"]));
        assert!(value["session"]["temperature"].is_number());
    }

    #[test]
    fn test_parse_audio_delta() {
        let event = ServerEvent::parse(
            r#"{"type":"response.audio.delta","item_id":"r1","delta":"UklGRg==","response_id":"resp_1"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ServerEvent::AudioDelta {
                item_id: "r1".to_string(),
                delta: "UklGRg==".to_string(),
                response_id: Some("resp_1".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_bare_speech_started() {
        let event = ServerEvent::parse(r#"{"type":"input_audio_buffer.speech_started"}"#).unwrap();
        assert!(matches!(event, ServerEvent::SpeechStarted { .. }));
    }

    #[test]
    fn test_parse_unknown_type_is_other() {
        let event =
            ServerEvent::parse(r#"{"type":"response.content_part.added","part":{}}"#).unwrap();
        assert_eq!(event.event_type(), "response.content_part.added");
        assert!(matches!(event, ServerEvent::Other { .. }));
    }

    #[test]
    fn test_parse_malformed_frames() {
        assert!(ServerEvent::parse("not json").is_err());
        assert!(ServerEvent::parse(r#"{"item_id":"r1"}"#).is_err());
        // Recognised type with a missing required field
        assert!(ServerEvent::parse(r#"{"type":"response.audio.delta","item_id":"r1"}"#).is_err());
    }

    #[test]
    fn test_parse_error_event() {
        let event = ServerEvent::parse(
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#,
        )
        .unwrap();
        match event {
            ServerEvent::Error { error } => {
                assert_eq!(error.error_type, "invalid_request_error");
                assert_eq!(error.message, "bad");
            }
            other => panic!("Wrong event type: {other:?}"),
        }
    }
}
