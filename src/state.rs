//! Shared application state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ServerConfig;

/// State shared by every request handler.
///
/// Holds only process-wide values; everything about an individual call
/// lives in that call's relay bridge.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    active_calls: AtomicUsize,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            active_calls: AtomicUsize::new(0),
        })
    }

    /// Number of media streams currently relayed.
    pub fn active_calls(&self) -> usize {
        self.active_calls.load(Ordering::Relaxed)
    }

    /// Count a call as active until the returned guard is dropped.
    pub fn begin_call(self: &Arc<Self>) -> ActiveCallGuard {
        self.active_calls.fetch_add(1, Ordering::Relaxed);
        ActiveCallGuard {
            state: Arc::clone(self),
        }
    }
}

/// Decrements the active call count on drop.
#[derive(Debug)]
pub struct ActiveCallGuard {
    state: Arc<AppState>,
}

impl Drop for ActiveCallGuard {
    fn drop(&mut self) {
        self.state.active_calls.fetch_sub(1, Ordering::Relaxed);
    }
}
