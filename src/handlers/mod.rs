//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check, TwiML webhook and outbound call placement
//! - `media_stream` - Phone-call media stream WebSocket

pub mod api;
pub mod media_stream;

// Re-export commonly used handlers for convenient access
pub use media_stream::media_stream_handler;
