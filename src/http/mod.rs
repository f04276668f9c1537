// src/http/mod.rs
//! HTTP surface of the relay server
//!
//! Two unrelated endpoints share one router: `/log` forwards client log
//! batches into tracing, `/transcribe` proxies audio to a speech-to-text API.

pub mod log_relay;
pub mod transcribe;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::any;
use axum::Router;

use crate::config::ServerConfig;
use crate::consts::MAX_UPLOAD_BYTES;

pub use transcribe::{AudioUpload, TranscribeError, Transcriber, WhisperTranscriber};

#[derive(Clone)]
pub struct AppState {
    pub transcriber: Arc<dyn Transcriber>,
    /// Request body cap; larger uploads are answered with 413
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// State backed by the real downstream service
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(Arc::new(WhisperTranscriber::from_config(config)))
    }
}

/// Both endpoints accept every method and answer the wrong ones themselves
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    Router::new()
        .route("/log", any(log_relay::relay))
        .route("/transcribe", any(transcribe::transcribe))
        .layer(body_limit)
        .with_state(state)
}
