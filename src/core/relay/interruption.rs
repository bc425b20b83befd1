//! Barge-in handling.
//!
//! When the caller starts speaking while assistant audio is still queued for
//! playback, the in-flight response is truncated at the point the caller
//! actually heard and the telephony playback buffer is cleared.

use tracing::debug;

use super::state::CallState;
use crate::core::realtime::ClientEvent;
use crate::core::telephony::OutboundFrame;

/// Instructions produced by one interruption.
#[derive(Debug, Clone, PartialEq)]
pub struct InterruptionPlan {
    /// `conversation.item.truncate` for the AI session
    pub truncate: Option<ClientEvent>,
    /// `clear` for the telephony leg
    pub clear: Option<OutboundFrame>,
    /// Milliseconds of the response played before the interruption
    pub audio_end_ms: u64,
}

/// Decides what to cut when the caller talks over the assistant.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterruptionController;

impl InterruptionController {
    pub fn new() -> Self {
        Self
    }

    /// Handle `input_audio_buffer.speech_started`.
    ///
    /// Returns `None`, leaving the state untouched, unless a response is
    /// partially delivered. Otherwise the response window is closed and the
    /// truncate/clear instructions are returned for the caller to send.
    pub fn on_speech_started(&self, state: &mut CallState) -> Option<InterruptionPlan> {
        if !state.has_response_in_flight() {
            debug!(
                pending_marks = state.pending_marks(),
                "Speech started with no response in flight"
            );
            return None;
        }

        let response_start = state.response_start()?;
        let audio_end_ms = state.media_clock().saturating_sub(response_start);
        let stream_sid = state.stream_sid().map(str::to_owned);

        let truncate = state
            .end_response()
            .map(|item_id| ClientEvent::truncate(item_id, audio_end_ms));
        let clear = stream_sid.map(OutboundFrame::clear);

        debug!(audio_end_ms, "Interrupting assistant response");

        Some(InterruptionPlan {
            truncate,
            clear,
            audio_end_ms,
        })
    }
}
