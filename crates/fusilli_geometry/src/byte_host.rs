//! HTTP host for out-of-band buffer bytes.
//!
//! Meshes and images above the inline threshold would bloat CBOR messages,
//! so their bytes are published here instead: each blob gets an integer tag,
//! clients fetch `http://host:port/<tag>` themselves, and the scene only
//! ever carries the URI string.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::Bytes;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::GeometryError;

#[derive(Default)]
struct HostState {
    buffers: HashMap<u64, Bytes>,
    next_tag: u64,
}

type SharedState = Arc<Mutex<HostState>>;

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, HostState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A background HTTP server mapping integer tags to byte blobs.
pub struct ByteHost {
    url: String,
    state: SharedState,
    task: tokio::task::JoinHandle<()>,
}

impl ByteHost {
    /// Bind the host and start serving. Use port `0` to let the OS pick.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Io`] if the listener cannot bind.
    pub async fn bind(addr: &str) -> Result<Self, GeometryError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let url = format!("http://{local_addr}");
        info!(%url, "byte host listening");

        let state: SharedState = Arc::default();
        let router = Router::new()
            .route("/{tag}", get(serve_buffer))
            .with_state(Arc::clone(&state));
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                error!(%err, "byte host stopped");
            }
        });

        Ok(Self { url, state, task })
    }

    /// The base URL clients reach this host at.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Publish a blob and return the URL it is served at.
    pub fn publish(&self, bytes: impl Into<Bytes>) -> String {
        let mut state = lock(&self.state);
        let tag = state.next_tag;
        state.next_tag += 1;
        state.buffers.insert(tag, bytes.into());
        let url = format!("{}/{tag}", self.url);
        debug!(%url, "published buffer");
        url
    }

    /// Look a published blob back up by the URL [`publish`](Self::publish)
    /// returned.
    #[must_use]
    pub fn buffer_for(&self, url: &str) -> Option<Bytes> {
        let tag: u64 = url.strip_prefix(&self.url)?.strip_prefix('/')?.parse().ok()?;
        lock(&self.state).buffers.get(&tag).cloned()
    }

    /// Stop serving. Published URLs go dead immediately.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ByteHost {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_buffer(State(state): State<SharedState>, Path(tag): Path<u64>) -> Response {
    match lock(&state).buffers.get(&tag).cloned() {
        Some(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
