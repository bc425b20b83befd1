//! Media-stream WebSocket handler
//!
//! Each connection is one phone call. The handler opens the AI session,
//! spawns the telephony sender task and hands both legs to a
//! [`RelayBridge`], which runs until either side closes.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::realtime::OpenAIRealtime;
use crate::core::relay::RelayBridge;
use crate::core::telephony::{InboundFrame, MediaStreamRoute};
use crate::state::AppState;

/// Channel buffer for outbound telephony frames
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// How long the sender task gets to flush the close frame
const SENDER_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Media-stream WebSocket handler
///
/// Upgrades the HTTP connection and relays the call inside a `call` span
/// carrying a fresh call id.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let call_id = Uuid::new_v4();
    info!(%call_id, "Media stream WebSocket upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| {
            let span = info_span!("call", %call_id, stream_sid = tracing::field::Empty);
            handle_media_stream(socket, state).instrument(span)
        })
}

/// Relay one call from upgrade to teardown.
async fn handle_media_stream(mut socket: WebSocket, app_state: Arc<AppState>) {
    let _active = app_state.begin_call();
    info!("Media stream connected");

    let realtime_config = match app_state.config.realtime_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Cannot start AI session: {}", e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let mut realtime = match OpenAIRealtime::new(realtime_config) {
        Ok(realtime) => realtime,
        Err(e) => {
            error!("Invalid AI session configuration: {}", e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let ai_events = match realtime.connect().await {
        Ok(events) => events,
        Err(e) => {
            error!("Failed to connect AI session: {}", e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let Some(session) = realtime.handle() else {
        error!("AI session connected without a handle");
        realtime.disconnect().await;
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let (mut sender, receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<MediaStreamRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing frames
    let sender_task = tokio::spawn(
        async move {
            while let Some(route) = message_rx.recv().await {
                let should_close = matches!(route, MediaStreamRoute::Close);

                let result = match route {
                    MediaStreamRoute::Outgoing(frame) => match serde_json::to_string(&frame) {
                        Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                        Err(e) => {
                            error!("Failed to serialize outbound frame: {}", e);
                            continue;
                        }
                    },
                    MediaStreamRoute::Close => {
                        info!("Closing media stream WebSocket");
                        sender.send(Message::Close(None)).await
                    }
                };

                if let Err(e) = result {
                    // The telephony side commonly hangs up first
                    info!("Media stream send failed: {}", e);
                    break;
                }

                if should_close {
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let inbound = receiver.map(|msg| match msg {
        Ok(Message::Text(text)) => InboundFrame::Text(text.as_str().to_owned()),
        Ok(Message::Close(_)) => InboundFrame::Closed,
        Ok(_) => InboundFrame::Ignored,
        Err(e) => {
            warn!("Media stream WebSocket error: {}", e);
            InboundFrame::Closed
        }
    });

    let bridge = RelayBridge::new(app_state.config.mark_name.clone(), message_tx, session);
    let stats = bridge.run(inbound, ai_events).await;

    // Cleanup
    let sender_abort = sender_task.abort_handle();
    if tokio::time::timeout(SENDER_SHUTDOWN_GRACE, sender_task)
        .await
        .is_err()
    {
        warn!("Media stream sender did not finish, aborting");
        sender_abort.abort();
    }
    realtime.disconnect().await;

    info!(
        interruptions = stats.interruptions,
        deltas_relayed = stats.deltas_relayed,
        "Media stream terminated"
    );
}
