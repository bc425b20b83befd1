//! Call relay core.
//!
//! Pumps audio between the telephony media stream and the realtime AI
//! session for one call, tracks playback acknowledgements, and handles
//! barge-in by truncating the assistant's in-flight response.

mod bridge;
mod interruption;
mod state;

pub use bridge::{BridgeFlow, DEFAULT_MARK_NAME, RelayBridge};
pub use interruption::{InterruptionController, InterruptionPlan};
pub use state::{CallState, CallStats};
