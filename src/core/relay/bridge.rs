//! Relay bridge between the telephony media stream and the AI session.
//!
//! A [`RelayBridge`] serves exactly one call. Both event sources are drained
//! by a single `select!` loop in [`RelayBridge::run`], so handlers never
//! interleave and the call state needs no lock.

use futures::{Stream, StreamExt};
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::interruption::InterruptionController;
use super::state::{CallState, CallStats};
use crate::core::realtime::{ClientEvent, ServerEvent, SessionHandle};
use crate::core::telephony::{InboundFrame, MediaStreamEvent, MediaStreamRoute, OutboundFrame};

/// Default mark name attached to every assistant audio chunk.
pub const DEFAULT_MARK_NAME: &str = "responsePart";

/// Whether the bridge should keep processing after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeFlow {
    Continue,
    Stop,
}

/// Per-call relay between the two legs.
pub struct RelayBridge {
    state: CallState,
    controller: InterruptionController,
    mark_name: String,
    telephony_tx: mpsc::Sender<MediaStreamRoute>,
    session: SessionHandle,
    stats: CallStats,
    closed: bool,
}

impl RelayBridge {
    /// Create a bridge writing telephony frames to `telephony_tx` and AI
    /// events to `session`.
    pub fn new(
        mark_name: impl Into<String>,
        telephony_tx: mpsc::Sender<MediaStreamRoute>,
        session: SessionHandle,
    ) -> Self {
        Self {
            state: CallState::new(),
            controller: InterruptionController::new(),
            mark_name: mark_name.into(),
            telephony_tx,
            session,
            stats: CallStats::default(),
            closed: false,
        }
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    pub fn stats(&self) -> CallStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drive the call until either leg closes or the stream stops, then tear
    /// down both legs.
    pub async fn run<S>(
        mut self,
        mut telephony: S,
        mut ai_events: mpsc::Receiver<ServerEvent>,
    ) -> CallStats
    where
        S: Stream<Item = InboundFrame> + Unpin,
    {
        loop {
            select! {
                frame = telephony.next() => match frame {
                    Some(InboundFrame::Text(text)) => {
                        if self.handle_telephony_text(&text).await == BridgeFlow::Stop {
                            break;
                        }
                    }
                    Some(InboundFrame::Ignored) => {}
                    Some(InboundFrame::Closed) | None => {
                        info!("Telephony socket closed");
                        break;
                    }
                },
                event = ai_events.recv() => match event {
                    Some(event) => {
                        if self.on_ai_event(event).await == BridgeFlow::Stop {
                            break;
                        }
                    }
                    None => {
                        info!("AI session closed");
                        break;
                    }
                },
            }
        }

        self.teardown().await;
        self.stats
    }

    /// Parse and dispatch one telephony text frame. Malformed frames are
    /// logged and skipped.
    pub async fn handle_telephony_text(&mut self, text: &str) -> BridgeFlow {
        match MediaStreamEvent::parse(text) {
            Ok(event) => self.on_telephony_event(event).await,
            Err(e) => {
                self.stats.malformed_frames += 1;
                warn!(error = %e, raw = %text, "Malformed telephony frame, dropping");
                BridgeFlow::Continue
            }
        }
    }

    pub async fn on_telephony_event(&mut self, event: MediaStreamEvent) -> BridgeFlow {
        match event {
            MediaStreamEvent::Connected { protocol } => {
                debug!(?protocol, "Telephony stream connected");
            }
            MediaStreamEvent::Start { start, .. } => {
                tracing::Span::current().record("stream_sid", start.stream_sid.as_str());
                info!(
                    stream_sid = %start.stream_sid,
                    call_sid = ?start.call_sid,
                    "Incoming stream started"
                );
                self.state.reset_for_stream(start.stream_sid);
            }
            MediaStreamEvent::Media { media } => {
                self.state.observe_media(media.timestamp);
                self.forward_caller_audio(media.payload).await;
            }
            MediaStreamEvent::Mark { mark } => {
                if self.state.acknowledge_mark().is_some() {
                    self.stats.marks_acknowledged += 1;
                } else {
                    debug!(name = %mark.name, "Mark received with empty queue, ignoring");
                }
            }
            MediaStreamEvent::Stop { .. } => {
                info!("Telephony stream stopped");
                return BridgeFlow::Stop;
            }
            MediaStreamEvent::Dtmf { dtmf } => {
                info!(digit = %dtmf.digit, "DTMF received");
            }
            MediaStreamEvent::Unknown { event } => {
                debug!(%event, "Ignoring telephony event");
            }
        }
        BridgeFlow::Continue
    }

    pub async fn on_ai_event(&mut self, event: ServerEvent) -> BridgeFlow {
        match event {
            ServerEvent::AudioDelta { item_id, delta, .. } => {
                self.relay_assistant_audio(item_id, delta).await;
            }
            ServerEvent::SpeechStarted { .. } => {
                debug!(media_clock = self.state.media_clock(), "Caller speech started");
                self.interrupt().await;
            }
            ServerEvent::Error { error } => {
                error!(
                    error_type = %error.error_type,
                    code = ?error.code,
                    "AI session error: {}",
                    error.message
                );
            }
            ServerEvent::SessionCreated { session } | ServerEvent::SessionUpdated { session } => {
                info!(session_id = ?session.id, voice = ?session.voice, "AI session configured");
            }
            ServerEvent::AudioTranscriptDone { item_id, transcript } => {
                info!(?item_id, %transcript, "Assistant transcript");
            }
            ServerEvent::ConversationItemTruncated {
                item_id,
                audio_end_ms,
            } => {
                debug!(%item_id, ?audio_end_ms, "Assistant item truncated");
            }
            other => {
                debug!(event_type = other.event_type(), "AI event");
            }
        }
        BridgeFlow::Continue
    }

    /// Close both legs. Calling this more than once does nothing.
    pub async fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // Neither close waits for queue space; a stalled leg is aborted by
        // its owner after the bridge returns
        self.session.close();
        if let Err(mpsc::error::TrySendError::Full(_)) =
            self.telephony_tx.try_send(MediaStreamRoute::Close)
        {
            warn!("Telephony queue full, close left to the socket owner");
        }

        info!(
            frames_forwarded = self.stats.frames_forwarded,
            frames_dropped = self.stats.frames_dropped,
            deltas_relayed = self.stats.deltas_relayed,
            deltas_dropped = self.stats.deltas_dropped,
            marks_acknowledged = self.stats.marks_acknowledged,
            interruptions = self.stats.interruptions,
            malformed_frames = self.stats.malformed_frames,
            "Call relay finished"
        );
    }

    async fn forward_caller_audio(&mut self, payload: String) {
        if !self.session.is_open() {
            self.stats.frames_dropped += 1;
            debug!("AI session closed, dropping caller audio");
            return;
        }

        match self.session.send(ClientEvent::audio_append(payload)).await {
            Ok(()) => self.stats.frames_forwarded += 1,
            Err(e) => {
                self.stats.frames_dropped += 1;
                debug!("Dropping caller audio: {}", e);
            }
        }
    }

    async fn relay_assistant_audio(&mut self, item_id: String, delta: String) {
        let Some(stream_sid) = self.state.stream_sid().map(str::to_owned) else {
            self.stats.deltas_dropped += 1;
            warn!(%item_id, "Assistant audio before stream start, dropping");
            return;
        };

        if self.state.is_truncated(&item_id) {
            self.stats.deltas_dropped += 1;
            debug!(%item_id, "Dropping late audio for truncated item");
            return;
        }

        self.send_telephony(OutboundFrame::media(stream_sid.as_str(), delta))
            .await;
        self.state
            .record_assistant_audio(&item_id, self.mark_name.as_str());
        self.send_telephony(OutboundFrame::mark(stream_sid, self.mark_name.as_str()))
            .await;
        self.stats.deltas_relayed += 1;
    }

    async fn interrupt(&mut self) {
        let Some(plan) = self.controller.on_speech_started(&mut self.state) else {
            return;
        };
        self.stats.interruptions += 1;
        info!(audio_end_ms = plan.audio_end_ms, "Caller interrupted assistant");

        if let Some(truncate) = plan.truncate
            && let Err(e) = self.session.send(truncate).await
        {
            warn!("Failed to send truncate: {}", e);
        }
        if let Some(clear) = plan.clear {
            self.send_telephony(clear).await;
        }
    }

    async fn send_telephony(&self, frame: OutboundFrame) {
        if self
            .telephony_tx
            .send(MediaStreamRoute::Outgoing(frame))
            .await
            .is_err()
        {
            debug!("Telephony sender closed, dropping frame");
        }
    }
}
