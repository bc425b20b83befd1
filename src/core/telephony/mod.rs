//! Telephony leg of a relayed call.
//!
//! - [`messages`]: the media-stream WebSocket protocol (inbound control and
//!   media frames, outbound media/mark/clear frames)
//! - [`twilio`]: outbound call placement over the REST API

pub mod messages;
pub mod twilio;

pub use messages::{
    InboundFrame, MarkLabel, MediaPayload, MediaStreamEvent, MediaStreamRoute, OutboundFrame,
    StartMetadata,
};
pub use twilio::{CallRecord, CallRequest, TWILIO_API_BASE, TwilioClient, TwilioError};
