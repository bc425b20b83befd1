//! Relay bridge behavior tests
//!
//! These tests drive a [`RelayBridge`] through in-memory channels standing in
//! for the two sockets and check:
//! - Caller audio ordering
//! - Mark pairing for assistant audio
//! - Interruption math and gating
//! - Stream restart resets
//! - Teardown of both legs

use futures::channel::mpsc as futures_mpsc;
use tokio::sync::mpsc;
use voice_relay::core::realtime::{ClientEvent, ServerEvent, SessionCommand, SessionHandle};
use voice_relay::core::relay::{BridgeFlow, DEFAULT_MARK_NAME, RelayBridge};
use voice_relay::core::telephony::{InboundFrame, MediaStreamRoute, OutboundFrame};

struct Harness {
    bridge: RelayBridge,
    telephony_rx: mpsc::Receiver<MediaStreamRoute>,
    session_rx: mpsc::Receiver<SessionCommand>,
}

fn harness() -> Harness {
    let (telephony_tx, telephony_rx) = mpsc::channel(256);
    let (session_tx, session_rx) = mpsc::channel(256);
    Harness {
        bridge: RelayBridge::new(DEFAULT_MARK_NAME, telephony_tx, SessionHandle::new(session_tx)),
        telephony_rx,
        session_rx,
    }
}

fn start_frame(stream_sid: &str) -> String {
    format!(r#"{{"event":"start","start":{{"streamSid":"{stream_sid}","callSid":"CA1"}},"streamSid":"{stream_sid}"}}"#)
}

fn media_frame(payload: &str, timestamp: u64) -> String {
    format!(r#"{{"event":"media","media":{{"payload":"{payload}","timestamp":"{timestamp}"}}}}"#)
}

fn mark_frame() -> String {
    r#"{"event":"mark","mark":{"name":"responsePart"}}"#.to_string()
}

fn audio_delta(item_id: &str, delta: &str) -> ServerEvent {
    ServerEvent::AudioDelta {
        item_id: item_id.to_string(),
        delta: delta.to_string(),
        response_id: None,
    }
}

fn speech_started() -> ServerEvent {
    ServerEvent::SpeechStarted {
        audio_start_ms: None,
        item_id: None,
    }
}

fn drain<T>(rx: &mut mpsc::Receiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}

fn truncates(commands: &[SessionCommand]) -> Vec<(String, u64)> {
    commands
        .iter()
        .filter_map(|command| match command {
            SessionCommand::Send(ClientEvent::ConversationItemTruncate {
                item_id,
                audio_end_ms,
                ..
            }) => Some((item_id.clone(), *audio_end_ms)),
            _ => None,
        })
        .collect()
}

fn clears(routes: &[MediaStreamRoute]) -> usize {
    routes
        .iter()
        .filter(|route| matches!(route, MediaStreamRoute::Outgoing(OutboundFrame::Clear { .. })))
        .count()
}

// =============================================================================
// Caller audio
// =============================================================================

#[tokio::test]
async fn test_caller_audio_forwarded_in_order() {
    let Harness {
        bridge,
        telephony_rx: _telephony_rx,
        mut session_rx,
    } = harness();

    let (frame_tx, frame_rx) = futures_mpsc::unbounded();
    frame_tx
        .unbounded_send(InboundFrame::Text(start_frame("MZ1")))
        .unwrap();
    for (i, timestamp) in [20u64, 40, 60, 80, 100].into_iter().enumerate() {
        frame_tx
            .unbounded_send(InboundFrame::Text(media_frame(&format!("chunk{i}"), timestamp)))
            .unwrap();
    }
    drop(frame_tx);

    // Keep the AI leg open so the telephony leg is what ends the call
    let (_ai_tx, ai_rx) = mpsc::channel::<ServerEvent>(8);
    let stats = bridge.run(frame_rx, ai_rx).await;

    let appended: Vec<String> = drain(&mut session_rx)
        .into_iter()
        .filter_map(|command| match command {
            SessionCommand::Send(ClientEvent::InputAudioBufferAppend { audio }) => Some(audio),
            _ => None,
        })
        .collect();

    assert_eq!(
        appended,
        vec!["chunk0", "chunk1", "chunk2", "chunk3", "chunk4"]
    );
    assert_eq!(stats.frames_forwarded, 5);
    assert_eq!(stats.frames_dropped, 0);
}

#[tokio::test]
async fn test_payload_forwarded_unmodified() {
    let mut h = harness();
    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge
        .handle_telephony_text(&media_frame("/v7+fn9+f39/f3+A", 0))
        .await;

    assert_eq!(
        drain(&mut h.session_rx),
        vec![SessionCommand::Send(ClientEvent::audio_append(
            "/v7+fn9+f39/f3+A"
        ))]
    );
}

// =============================================================================
// Assistant audio and marks
// =============================================================================

#[tokio::test]
async fn test_every_delta_paired_with_one_mark() {
    let mut h = harness();
    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;

    for n in 1..=3 {
        h.bridge.on_ai_event(audio_delta("r1", "AAAA")).await;
        assert_eq!(h.bridge.state().pending_marks(), n);
    }

    let routes = drain(&mut h.telephony_rx);
    assert_eq!(
        routes,
        vec![
            MediaStreamRoute::Outgoing(OutboundFrame::media("MZ1", "AAAA")),
            MediaStreamRoute::Outgoing(OutboundFrame::mark("MZ1", DEFAULT_MARK_NAME)),
            MediaStreamRoute::Outgoing(OutboundFrame::media("MZ1", "AAAA")),
            MediaStreamRoute::Outgoing(OutboundFrame::mark("MZ1", DEFAULT_MARK_NAME)),
            MediaStreamRoute::Outgoing(OutboundFrame::media("MZ1", "AAAA")),
            MediaStreamRoute::Outgoing(OutboundFrame::mark("MZ1", DEFAULT_MARK_NAME)),
        ]
    );
    assert_eq!(h.bridge.stats().deltas_relayed, 3);
}

#[tokio::test]
async fn test_mark_acknowledgements_drain_queue() {
    let mut h = harness();
    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge.on_ai_event(audio_delta("r1", "AAAA")).await;
    h.bridge.on_ai_event(audio_delta("r1", "BBBB")).await;

    h.bridge.handle_telephony_text(&mark_frame()).await;
    assert_eq!(h.bridge.state().pending_marks(), 1);
    h.bridge.handle_telephony_text(&mark_frame()).await;
    assert_eq!(h.bridge.state().pending_marks(), 0);

    // Extra acknowledgements are ignored
    h.bridge.handle_telephony_text(&mark_frame()).await;
    assert_eq!(h.bridge.state().pending_marks(), 0);
    assert_eq!(h.bridge.stats().marks_acknowledged, 2);
}

#[tokio::test]
async fn test_custom_mark_name() {
    let (telephony_tx, mut telephony_rx) = mpsc::channel(16);
    let (session_tx, _session_rx) = mpsc::channel(16);
    let mut bridge = RelayBridge::new("chunk", telephony_tx, SessionHandle::new(session_tx));

    bridge.handle_telephony_text(&start_frame("MZ9")).await;
    bridge.on_ai_event(audio_delta("r1", "AAAA")).await;

    let routes = drain(&mut telephony_rx);
    assert_eq!(
        routes.last(),
        Some(&MediaStreamRoute::Outgoing(OutboundFrame::mark("MZ9", "chunk")))
    );
}

// =============================================================================
// Interruption
// =============================================================================

#[tokio::test]
async fn test_interruption_uses_elapsed_media_time() {
    let mut h = harness();
    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge.handle_telephony_text(&media_frame("AA", 1000)).await;
    h.bridge.on_ai_event(audio_delta("r7", "AAAA")).await;
    assert_eq!(h.bridge.state().response_start(), Some(1000));

    h.bridge.handle_telephony_text(&media_frame("AA", 1350)).await;
    h.bridge.on_ai_event(speech_started()).await;

    let commands = drain(&mut h.session_rx);
    assert_eq!(truncates(&commands), vec![("r7".to_string(), 350)]);
    assert_eq!(clears(&drain(&mut h.telephony_rx)), 1);
}

#[tokio::test]
async fn test_interruption_measured_from_current_response() {
    let mut h = harness();
    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge.handle_telephony_text(&media_frame("AA", 1000)).await;

    // First response plays to the end
    h.bridge.on_ai_event(audio_delta("resp_a", "AAAA")).await;
    h.bridge.handle_telephony_text(&mark_frame()).await;
    assert_eq!(h.bridge.state().pending_marks(), 0);

    h.bridge.handle_telephony_text(&media_frame("AA", 5000)).await;
    h.bridge.on_ai_event(audio_delta("resp_b", "BBBB")).await;
    assert_eq!(h.bridge.state().response_start(), Some(5000));
    assert_eq!(h.bridge.state().last_assistant_item(), Some("resp_b"));

    h.bridge.handle_telephony_text(&media_frame("AA", 5300)).await;
    h.bridge.on_ai_event(speech_started()).await;

    assert_eq!(
        truncates(&drain(&mut h.session_rx)),
        vec![("resp_b".to_string(), 300)]
    );
    assert_eq!(clears(&drain(&mut h.telephony_rx)), 1);
}

#[tokio::test]
async fn test_speech_without_response_in_flight_is_noop() {
    let mut h = harness();
    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge.handle_telephony_text(&media_frame("AA", 500)).await;
    h.bridge.on_ai_event(speech_started()).await;

    assert!(truncates(&drain(&mut h.session_rx)).is_empty());
    assert_eq!(clears(&drain(&mut h.telephony_rx)), 0);
    assert_eq!(h.bridge.stats().interruptions, 0);
}

#[tokio::test]
async fn test_speech_after_playback_acknowledged_is_noop() {
    let mut h = harness();
    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge.on_ai_event(audio_delta("r1", "AAAA")).await;
    h.bridge.handle_telephony_text(&mark_frame()).await;

    drain(&mut h.telephony_rx);
    h.bridge.on_ai_event(speech_started()).await;

    assert!(truncates(&drain(&mut h.session_rx)).is_empty());
    assert_eq!(clears(&drain(&mut h.telephony_rx)), 0);
}

#[tokio::test]
async fn test_call_scenario_with_barge_in() {
    let mut h = harness();

    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge.handle_telephony_text(&media_frame("AA", 0)).await;
    h.bridge.on_ai_event(audio_delta("r1", "AAAA")).await;
    h.bridge.on_ai_event(audio_delta("r1", "BBBB")).await;

    assert_eq!(h.bridge.state().pending_marks(), 2);
    assert_eq!(h.bridge.state().response_start(), Some(0));

    h.bridge.handle_telephony_text(&media_frame("AA", 420)).await;
    assert_eq!(h.bridge.state().media_clock(), 420);

    drain(&mut h.telephony_rx);
    h.bridge.on_ai_event(speech_started()).await;

    assert_eq!(
        truncates(&drain(&mut h.session_rx)),
        vec![("r1".to_string(), 420)]
    );
    assert_eq!(
        drain(&mut h.telephony_rx),
        vec![MediaStreamRoute::Outgoing(OutboundFrame::clear("MZ1"))]
    );
    assert_eq!(h.bridge.state().pending_marks(), 0);
    assert_eq!(h.bridge.state().last_assistant_item(), None);
    assert_eq!(h.bridge.state().response_start(), None);
    assert_eq!(h.bridge.stats().interruptions, 1);
}

#[tokio::test]
async fn test_late_deltas_after_truncate_are_suppressed() {
    let mut h = harness();
    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge.on_ai_event(audio_delta("r1", "AAAA")).await;
    h.bridge.on_ai_event(speech_started()).await;
    drain(&mut h.telephony_rx);

    h.bridge.on_ai_event(audio_delta("r1", "LATE")).await;
    assert!(drain(&mut h.telephony_rx).is_empty());
    assert_eq!(h.bridge.stats().deltas_dropped, 1);

    // The next response plays normally
    h.bridge.on_ai_event(audio_delta("r2", "NEXT")).await;
    assert_eq!(drain(&mut h.telephony_rx).len(), 2);
    assert_eq!(h.bridge.state().last_assistant_item(), Some("r2"));
}

// =============================================================================
// Stream lifecycle
// =============================================================================

#[tokio::test]
async fn test_start_resets_call_state() {
    let mut h = harness();
    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge.handle_telephony_text(&media_frame("AA", 900)).await;
    h.bridge.on_ai_event(audio_delta("r1", "AAAA")).await;
    h.bridge.on_ai_event(audio_delta("r1", "BBBB")).await;

    h.bridge.handle_telephony_text(&start_frame("MZ2")).await;

    let state = h.bridge.state();
    assert_eq!(state.stream_sid(), Some("MZ2"));
    assert_eq!(state.media_clock(), 0);
    assert_eq!(state.pending_marks(), 0);
    assert_eq!(state.response_start(), None);
    assert_eq!(state.last_assistant_item(), None);
}

#[tokio::test]
async fn test_malformed_and_unknown_frames_are_skipped() {
    let mut h = harness();
    for text in [
        "not json",
        r#"{"event":"media","media":{}}"#,
        r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#,
        r#"{"event":"something_new","data":1}"#,
    ] {
        assert_eq!(
            h.bridge.handle_telephony_text(text).await,
            BridgeFlow::Continue
        );
    }
    assert_eq!(h.bridge.stats().malformed_frames, 2);

    h.bridge.handle_telephony_text(&start_frame("MZ1")).await;
    h.bridge.handle_telephony_text(&media_frame("AA", 20)).await;
    assert_eq!(h.bridge.stats().frames_forwarded, 1);
}

#[tokio::test]
async fn test_stop_closes_ai_session() {
    let Harness {
        bridge,
        mut telephony_rx,
        mut session_rx,
    } = harness();

    let (frame_tx, frame_rx) = futures_mpsc::unbounded();
    frame_tx
        .unbounded_send(InboundFrame::Text(start_frame("MZ1")))
        .unwrap();
    frame_tx
        .unbounded_send(InboundFrame::Text(r#"{"event":"stop","streamSid":"MZ1"}"#.to_string()))
        .unwrap();

    let (_ai_tx, ai_rx) = mpsc::channel::<ServerEvent>(8);
    bridge.run(frame_rx, ai_rx).await;

    assert_eq!(drain(&mut session_rx), vec![SessionCommand::Close]);
    assert_eq!(drain(&mut telephony_rx), vec![MediaStreamRoute::Close]);
}

#[tokio::test]
async fn test_ai_close_closes_telephony() {
    let Harness {
        bridge,
        mut telephony_rx,
        mut session_rx,
    } = harness();

    // Telephony leg stays open; the AI leg ends the call
    let (_frame_tx, frame_rx) = futures_mpsc::unbounded::<InboundFrame>();
    let (ai_tx, ai_rx) = mpsc::channel::<ServerEvent>(8);
    drop(ai_tx);

    bridge.run(frame_rx, ai_rx).await;

    assert_eq!(drain(&mut telephony_rx), vec![MediaStreamRoute::Close]);
    assert_eq!(drain(&mut session_rx), vec![SessionCommand::Close]);
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let mut h = harness();
    h.bridge.teardown().await;
    h.bridge.teardown().await;
    assert!(h.bridge.is_closed());

    assert_eq!(drain(&mut h.telephony_rx), vec![MediaStreamRoute::Close]);
    assert_eq!(drain(&mut h.session_rx), vec![SessionCommand::Close]);
}

#[tokio::test]
async fn test_teardown_with_stalled_legs_returns() {
    let (telephony_tx, mut telephony_rx) = mpsc::channel(1);
    let (session_tx, mut session_rx) = mpsc::channel(1);
    let session = SessionHandle::new(session_tx);
    let mut bridge = RelayBridge::new(DEFAULT_MARK_NAME, telephony_tx.clone(), session.clone());

    // Neither queue is drained, as when both writers are stuck on a socket
    telephony_tx
        .send(MediaStreamRoute::Outgoing(OutboundFrame::clear("MZ1")))
        .await
        .unwrap();
    session
        .send(ClientEvent::audio_append("AA=="))
        .await
        .unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(1), bridge.teardown())
        .await
        .expect("teardown must not wait for queue space");

    assert!(bridge.is_closed());
    assert!(!session.is_open());
    assert_eq!(drain(&mut telephony_rx).len(), 1);
    assert_eq!(drain(&mut session_rx).len(), 1);
}

#[tokio::test]
async fn test_teardown_after_both_legs_gone() {
    let Harness {
        mut bridge,
        telephony_rx,
        session_rx,
    } = harness();
    drop(telephony_rx);
    drop(session_rx);

    bridge.teardown().await;
    bridge.teardown().await;
    assert!(bridge.is_closed());
}
