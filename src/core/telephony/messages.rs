//! Media-stream WebSocket protocol messages.
//!
//! The telephony leg sends one JSON frame per WebSocket message, tagged by
//! `event`. Field names are camelCase on the wire and must match exactly.

use serde::{Deserialize, Deserializer, Serialize};

/// Inbound `event` values decoded into a full [`MediaStreamEvent`].
const HANDLED_EVENTS: &[&str] = &["connected", "start", "media", "mark", "stop", "dtmf"];

// =============================================================================
// Inbound Events
// =============================================================================

/// Frames received from the telephony leg.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MediaStreamEvent {
    /// Socket handshake acknowledgement
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },

    /// Stream start, carries the stream identifier
    Start {
        start: StartMetadata,
        #[serde(default, rename = "streamSid")]
        stream_sid: Option<String>,
    },

    /// Caller audio chunk
    Media { media: MediaPayload },

    /// Playback acknowledgement for a previously sent mark
    Mark { mark: MarkLabel },

    /// Stream ended
    Stop {
        #[serde(default, rename = "streamSid")]
        stream_sid: Option<String>,
    },

    /// Keypad digit
    Dtmf { dtmf: DtmfDigit },

    /// Any `event` value not listed above
    #[serde(skip)]
    Unknown { event: String },
}

/// Metadata of the `start` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
}

/// Body of an inbound `media` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaPayload {
    /// Base64 audio, forwarded untouched
    pub payload: String,
    /// Milliseconds since stream start
    #[serde(default, deserialize_with = "timestamp_from_any")]
    pub timestamp: u64,
    #[serde(default)]
    pub track: Option<String>,
}

/// Mark name, echoed back by the telephony leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkLabel {
    pub name: String,
}

/// Keypad digit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DtmfDigit {
    pub digit: String,
}

/// The provider sends timestamps as strings; accept integers too.
fn timestamp_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timestamp {
        Int(u64),
        Str(String),
    }

    match Timestamp::deserialize(deserializer)? {
        Timestamp::Int(value) => Ok(value),
        Timestamp::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
struct EventEnvelope<'a> {
    #[serde(borrow)]
    event: std::borrow::Cow<'a, str>,
}

impl MediaStreamEvent {
    /// Parse an inbound frame.
    ///
    /// Unrecognised `event` values become [`MediaStreamEvent::Unknown`];
    /// frames that are not JSON, lack `event`, or carry a malformed body for
    /// a recognised event are errors.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let envelope: EventEnvelope<'_> = serde_json::from_str(text)?;
        if HANDLED_EVENTS.contains(&envelope.event.as_ref()) {
            serde_json::from_str(text)
        } else {
            Ok(MediaStreamEvent::Unknown {
                event: envelope.event.into_owned(),
            })
        }
    }

    /// The wire `event` of this frame.
    pub fn event_name(&self) -> &str {
        match self {
            MediaStreamEvent::Connected { .. } => "connected",
            MediaStreamEvent::Start { .. } => "start",
            MediaStreamEvent::Media { .. } => "media",
            MediaStreamEvent::Mark { .. } => "mark",
            MediaStreamEvent::Stop { .. } => "stop",
            MediaStreamEvent::Dtmf { .. } => "dtmf",
            MediaStreamEvent::Unknown { event } => event,
        }
    }
}

// =============================================================================
// Outbound Frames
// =============================================================================

/// Frames sent to the telephony leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundFrame {
    /// Assistant audio chunk for playback
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Playback progress token, echoed back once the audio before it played
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkLabel,
    },

    /// Discard buffered playback audio
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

/// Body of an outbound `media` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl OutboundFrame {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        OutboundFrame::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }

    pub fn mark(stream_sid: impl Into<String>, name: impl Into<String>) -> Self {
        OutboundFrame::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkLabel { name: name.into() },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        OutboundFrame::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}

// =============================================================================
// Socket Plumbing
// =============================================================================

/// Routes accepted by the telephony sender task.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaStreamRoute {
    /// Serialize and send a frame
    Outgoing(OutboundFrame),
    /// Close the socket
    Close,
}

/// Transport-neutral view of one inbound WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A text frame to parse
    Text(String),
    /// Ping, pong or binary traffic with no meaning to the relay
    Ignored,
    /// The peer closed the socket
    Closed,
}

// =============================================================================
// Tests
// =============================================================================
