//! OpenAI Realtime API client implementation.
//!
//! This module provides the session client the relay uses for the AI leg of a
//! call: it opens the WebSocket, schedules the one-shot session configuration,
//! forwards client events, and surfaces parsed server events on a channel.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: base64 payloads, forwarded without decoding
//!
//! # Example
//!
//! ```rust,ignore
//! use voice_relay::core::realtime::{OpenAIRealtime, RealtimeConfig};
//!
//! let mut realtime = OpenAIRealtime::new(RealtimeConfig {
//!     api_key: "sk-...".to_string(),
//!     ..Default::default()
//! })?;
//! let mut events = realtime.connect().await?;
//! let session = realtime.handle().expect("connected");
//!
//! session.send(ClientEvent::audio_append(payload)).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.event_type());
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use http::HeaderValue;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

use super::config::{
    Modality, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel,
    OpenAIRealtimeVoice,
};
use super::messages::{ClientEvent, ServerEvent, SessionConfig, TurnDetection};
use crate::core::realtime::base::{
    ConnectionState, DEFAULT_TEMPERATURE, RealtimeConfig, RealtimeError, RealtimeResult,
    TurnDetectionConfig,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// How long `disconnect` waits for the writer to flush its close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

// =============================================================================
// Session Handle
// =============================================================================

/// Commands accepted by the session writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Serialize and send a client event
    Send(ClientEvent),
    /// Send a close frame and stop writing
    Close,
}

/// Cloneable sending side of a realtime session.
///
/// Sends are queued to the writer task; the caller never waits for the
/// frame to reach the network.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    connected: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Wrap a command channel. The handle reports open until the receiver
    /// is dropped.
    pub fn new(tx: mpsc::Sender<SessionCommand>) -> Self {
        Self::with_flag(tx, Arc::new(AtomicBool::new(true)))
    }

    fn with_flag(tx: mpsc::Sender<SessionCommand>, connected: Arc<AtomicBool>) -> Self {
        Self { tx, connected }
    }

    /// Whether the underlying socket is still accepting events.
    pub fn is_open(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    /// Queue a client event for the socket.
    pub async fn send(&self, event: ClientEvent) -> RealtimeResult<()> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        self.tx
            .send(SessionCommand::Send(event))
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }

    /// Ask the writer to close the socket without waiting for queue space.
    ///
    /// The handle reports closed afterwards. If the queue is full the close
    /// command is dropped and the owner's `disconnect` aborts the writer.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        match self.tx.try_send(SessionCommand::Close) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Session queue full, close left to disconnect");
            }
        }
    }
}

// =============================================================================
// OpenAI Realtime Client
// =============================================================================

/// OpenAI Realtime API client.
///
/// The socket is split between a writer task, which drains
/// [`SessionCommand`]s, and a reader task, which parses frames into
/// [`ServerEvent`]s. Keeping them apart means a slow event consumer never
/// stalls outbound audio.
pub struct OpenAIRealtime {
    /// Configuration
    config: RealtimeConfig,
    /// Parsed model
    model: OpenAIRealtimeModel,
    /// Parsed voice
    voice: OpenAIRealtimeVoice,
    /// Audio format
    audio_format: OpenAIRealtimeAudioFormat,
    /// Connection state
    state: Arc<RwLock<ConnectionState>>,
    /// Connected flag for fast checks (shared with the socket tasks)
    connected: Arc<AtomicBool>,
    /// Session ID reported by `session.created`
    session_id: Arc<RwLock<Option<String>>>,
    /// Sending side handed to the relay
    handle: Option<SessionHandle>,
    /// Socket tasks
    writer_handle: Option<JoinHandle<RealtimeResult<()>>>,
    reader_handle: Option<JoinHandle<()>>,
    init_handle: Option<JoinHandle<()>>,
}

impl OpenAIRealtime {
    /// Create a client from configuration. Does not connect.
    pub fn new(config: RealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let model = if config.model.is_empty() {
            OpenAIRealtimeModel::default()
        } else {
            OpenAIRealtimeModel::from_str_or_default(&config.model)
        };

        let voice = config
            .voice
            .as_deref()
            .map(OpenAIRealtimeVoice::from_str_or_default)
            .unwrap_or_default();

        let audio_format = config
            .input_audio_format
            .as_deref()
            .map(OpenAIRealtimeAudioFormat::from_str_or_default)
            .unwrap_or_default();

        Ok(Self {
            config,
            model,
            voice,
            audio_format,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            connected: Arc::new(AtomicBool::new(false)),
            session_id: Arc::new(RwLock::new(None)),
            handle: None,
            writer_handle: None,
            reader_handle: None,
            init_handle: None,
        })
    }

    /// Get the configured model.
    pub fn model(&self) -> OpenAIRealtimeModel {
        self.model
    }

    /// Get the configured voice.
    pub fn voice(&self) -> OpenAIRealtimeVoice {
        self.voice
    }

    /// Get the configured audio format.
    pub fn audio_format(&self) -> OpenAIRealtimeAudioFormat {
        self.audio_format
    }

    /// Get the session ID if the provider reported one.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    /// Current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Whether the socket is connected.
    pub fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Sending side of the session, available once connected.
    pub fn handle(&self) -> Option<SessionHandle> {
        self.handle.clone()
    }

    /// Build the WebSocket URL with model parameter.
    pub fn build_ws_url(&self) -> String {
        let base = self.config.url.as_deref().unwrap_or(OPENAI_REALTIME_URL);
        format!("{}?model={}", base, self.model.as_str())
    }

    /// Build the one-shot session configuration.
    pub fn build_session_config(&self) -> SessionConfig {
        let output_format = self
            .config
            .output_audio_format
            .as_deref()
            .map(OpenAIRealtimeAudioFormat::from_str_or_default)
            .unwrap_or(self.audio_format);

        let turn_detection = match self.config.turn_detection.clone().unwrap_or_default() {
            TurnDetectionConfig::ServerVad {
                threshold,
                prefix_padding_ms,
                silence_duration_ms,
            } => TurnDetection::ServerVad {
                threshold,
                prefix_padding_ms,
                silence_duration_ms,
            },
            TurnDetectionConfig::None => TurnDetection::None {},
        };

        let modalities = self.config.modalities.clone().unwrap_or_else(|| {
            vec![
                Modality::Text.as_str().to_string(),
                Modality::Audio.as_str().to_string(),
            ]
        });

        SessionConfig {
            turn_detection: Some(turn_detection),
            input_audio_format: Some(self.audio_format.as_str().to_string()),
            output_audio_format: Some(output_format.as_str().to_string()),
            voice: Some(self.voice.as_str().to_string()),
            instructions: self.config.instructions.clone(),
            modalities: Some(modalities),
            temperature: Some(self.config.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
        }
    }

    /// Open the socket and start the writer, reader and session-init tasks.
    ///
    /// Returns the receiver of parsed server events. The receiver yields
    /// `None` once the provider closes the socket.
    pub async fn connect(&mut self) -> RealtimeResult<mpsc::Receiver<ServerEvent>> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(RealtimeError::ConnectionFailed(
                "session is already connected".to_string(),
            ));
        }

        *self.state.write().await = ConnectionState::Connecting;

        let url = self.build_ws_url();
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| RealtimeError::AuthenticationFailed(e.to_string()))?;
        request.headers_mut().insert(http::header::AUTHORIZATION, bearer);
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (ws_stream, _response) = match tokio_tungstenite::connect_async(request).await {
            Ok(connected) => connected,
            Err(e) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(RealtimeError::ConnectionFailed(e.to_string()));
            }
        };

        tracing::info!(
            model = %self.model,
            voice = %self.voice,
            audio_format = %self.audio_format,
            sample_rate = self.audio_format.sample_rate(),
            "Connected to OpenAI Realtime API"
        );

        let (ws_sink, mut ws_stream) = ws_stream.split();
        let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(WS_CHANNEL_CAPACITY);

        self.connected.store(true, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Connected;

        // Writer: drains queued commands into the socket
        let connected = self.connected.clone();
        let writer = tokio::spawn(async move {
            let result = run_writer(ws_sink, command_rx).await;
            connected.store(false, Ordering::SeqCst);
            if let Err(e) = &result {
                tracing::error!("OpenAI Realtime writer failed: {}", e);
            }
            tracing::debug!("OpenAI Realtime writer task ended");
            result
        });

        // Reader: parses frames and hands them to the relay
        let connected = self.connected.clone();
        let state = self.state.clone();
        let session_id = self.session_id.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => match ServerEvent::parse(text.as_str()) {
                        Ok(event) => {
                            if let ServerEvent::SessionCreated { session } = &event {
                                tracing::info!(
                                    session_id = ?session.id,
                                    "OpenAI Realtime session created"
                                );
                                *session_id.write().await = session.id.clone();
                            }
                            if event_tx.send(event).await.is_err() {
                                tracing::debug!("Event receiver dropped, stopping reader");
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                raw = %text.as_str(),
                                "Failed to parse server event, dropping frame"
                            );
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        tracing::info!(?frame, "WebSocket closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            connected.store(false, Ordering::SeqCst);
            *state.write().await = ConnectionState::Closed;
            tracing::info!("OpenAI Realtime connection task ended");
        });

        let handle = SessionHandle::with_flag(command_tx, self.connected.clone());

        // Session initializer: one configuration message after a settling delay
        let init = {
            let handle = handle.clone();
            let session = self.build_session_config();
            let delay = Duration::from_millis(self.config.settle_delay_ms());
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                match handle.send(ClientEvent::SessionUpdate { session }).await {
                    Ok(()) => tracing::info!("Session configuration sent"),
                    Err(e) => tracing::warn!(
                        "Session configuration not sent ({}), continuing with provider defaults",
                        e
                    ),
                }
            })
        };

        self.handle = Some(handle);
        self.writer_handle = Some(writer);
        self.reader_handle = Some(reader);
        self.init_handle = Some(init);

        Ok(event_rx)
    }

    /// Close the socket and stop all session tasks. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(init) = self.init_handle.take() {
            init.abort();
        }

        if let Some(handle) = self.handle.take() {
            handle.close();
        }

        if let Some(writer) = self.writer_handle.take() {
            let abort = writer.abort_handle();
            match tokio::time::timeout(CLOSE_GRACE, writer).await {
                Ok(Ok(Err(e))) => tracing::debug!("Writer ended with error: {}", e),
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!("Writer did not finish within grace period, aborting");
                    abort.abort();
                }
            }
        }

        if let Some(reader) = self.reader_handle.take() {
            reader.abort();
        }

        self.connected.store(false, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Disconnected;
        *self.session_id.write().await = None;

        tracing::info!("Disconnected from OpenAI Realtime API");
    }
}

/// Drain session commands into the socket sink.
///
/// Returns `Ok` once a close frame is sent or the command channel ends, and
/// `WebSocketError` when the sink rejects a frame.
async fn run_writer<S>(
    mut sink: S,
    mut commands: mpsc::Receiver<SessionCommand>,
) -> RealtimeResult<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(command) = commands.recv().await {
        match command {
            SessionCommand::Send(event) => {
                let json = match serde_json::to_string(&event) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::error!("Failed to serialize client event: {}", e);
                        continue;
                    }
                };
                sink.send(Message::Text(json.into()))
                    .await
                    .map_err(|e| RealtimeError::WebSocketError(e.to_string()))?;
            }
            SessionCommand::Close => {
                tracing::debug!("Closing OpenAI Realtime socket");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
