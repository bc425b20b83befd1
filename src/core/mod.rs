pub mod realtime;
pub mod relay;
pub mod telephony;

// Re-export commonly used types for convenience
pub use realtime::{
    ClientEvent, OpenAIRealtime, RealtimeConfig, RealtimeError, RealtimeResult, ServerEvent,
    SessionCommand, SessionHandle,
};
pub use relay::{CallState, CallStats, InterruptionController, RelayBridge};
pub use telephony::{
    CallRecord, CallRequest, InboundFrame, MediaStreamEvent, MediaStreamRoute, OutboundFrame,
    TwilioClient, TwilioError,
};
