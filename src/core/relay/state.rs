//! Per-call relay state.
//!
//! One [`CallState`] exists per call and is owned by its bridge. Every
//! mutation goes through the methods below so the response-window fields
//! always move together.

use std::collections::VecDeque;

use serde::Serialize;

/// Mutable record of one relayed call.
///
/// `response_start` is set exactly while assistant audio is being streamed
/// to the caller, and `mark_queue` is non-empty only while some of that
/// audio has not been acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallState {
    stream_sid: Option<String>,
    media_clock: u64,
    mark_queue: VecDeque<String>,
    last_assistant_item: Option<String>,
    response_start: Option<u64>,
    truncated_item: Option<String>,
}

impl CallState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream identifier assigned by the telephony leg.
    pub fn stream_sid(&self) -> Option<&str> {
        self.stream_sid.as_deref()
    }

    /// Latest inbound audio timestamp (ms).
    pub fn media_clock(&self) -> u64 {
        self.media_clock
    }

    /// Number of marks sent but not yet acknowledged.
    pub fn pending_marks(&self) -> usize {
        self.mark_queue.len()
    }

    /// Item id of the assistant response currently streaming.
    pub fn last_assistant_item(&self) -> Option<&str> {
        self.last_assistant_item.as_deref()
    }

    /// Media clock captured at the first chunk of the current response.
    pub fn response_start(&self) -> Option<u64> {
        self.response_start
    }

    /// Item most recently cut short by an interruption.
    pub fn truncated_item(&self) -> Option<&str> {
        self.truncated_item.as_deref()
    }

    /// Whether an assistant response is partially delivered.
    pub fn has_response_in_flight(&self) -> bool {
        !self.mark_queue.is_empty() && self.response_start.is_some()
    }

    /// Start (or restart) a stream. Everything but the new sid is cleared.
    pub fn reset_for_stream(&mut self, stream_sid: impl Into<String>) {
        *self = Self {
            stream_sid: Some(stream_sid.into()),
            ..Self::default()
        };
    }

    /// Advance the media clock. Older timestamps leave it unchanged.
    pub fn observe_media(&mut self, timestamp: u64) {
        self.media_clock = self.media_clock.max(timestamp);
    }

    /// Record one assistant audio chunk sent for playback.
    ///
    /// Opens a response window on the first chunk of each item and queues
    /// `mark` as the acknowledgement token for this chunk. Marks still
    /// outstanding for an earlier item stay queued; that audio has not
    /// played yet.
    pub fn record_assistant_audio(&mut self, item_id: &str, mark: impl Into<String>) {
        if self.last_assistant_item.as_deref() != Some(item_id) {
            self.response_start = Some(self.media_clock);
            self.last_assistant_item = Some(item_id.to_string());
        } else if self.response_start.is_none() {
            self.response_start = Some(self.media_clock);
        }
        self.truncated_item = None;
        self.mark_queue.push_back(mark.into());
    }

    /// Pop the oldest outstanding mark.
    pub fn acknowledge_mark(&mut self) -> Option<String> {
        self.mark_queue.pop_front()
    }

    /// Whether late audio for `item_id` belongs to a truncated response.
    pub fn is_truncated(&self, item_id: &str) -> bool {
        self.truncated_item.as_deref() == Some(item_id)
    }

    /// Close the current response window and return the item it covered.
    pub(crate) fn end_response(&mut self) -> Option<String> {
        self.mark_queue.clear();
        self.response_start = None;
        let item = self.last_assistant_item.take();
        self.truncated_item = item.clone();
        item
    }
}

/// Counters logged when a call ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallStats {
    /// Caller audio frames sent to the AI session
    pub frames_forwarded: u64,
    /// Caller audio frames dropped because the AI session was closed
    pub frames_dropped: u64,
    /// Assistant audio chunks sent to the caller
    pub deltas_relayed: u64,
    /// Assistant audio chunks dropped (no stream yet, or truncated item)
    pub deltas_dropped: u64,
    /// Marks echoed back by the telephony leg
    pub marks_acknowledged: u64,
    /// Barge-ins that truncated a response
    pub interruptions: u64,
    /// Inbound frames that failed to parse
    pub malformed_frames: u64,
}
