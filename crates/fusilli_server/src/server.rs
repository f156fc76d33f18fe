//! Server runtime: configuration, the accept loop, and scene ownership.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::connection::{handle_connection, lock};
use crate::error::SceneError;
use crate::scene::Scene;

/// Default WebSocket bind address.
pub const DEFAULT_BIND: &str = "0.0.0.0:50000";

/// The environment variable used to override the bind address.
pub const BIND_ENV: &str = "FUSILLI_BIND";

/// Configuration for a scene server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the WebSocket listener binds to.
    pub bind: String,
    /// Optional path receiving one JSON line per outbound logical message.
    pub message_log: Option<std::path::PathBuf>,
}

impl ServerConfig {
    /// Create a config using the address from the `FUSILLI_BIND` environment
    /// variable, falling back to [`DEFAULT_BIND`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind: std::env::var(BIND_ENV).unwrap_or_else(|_| DEFAULT_BIND.to_string()),
            message_log: None,
        }
    }

    /// Override the bind address.
    #[must_use]
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Log every outbound logical message to a JSON-lines file.
    #[must_use]
    pub fn with_message_log(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.message_log = Some(path.into());
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Triggers server shutdown from anywhere (another task, a signal handler).
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    /// Stop the accept loop. In-flight connections are dropped with it.
    pub fn shutdown(&self) {
        self.notify.notify_one();
    }
}

/// A NOODLES scene server: one scene, one WebSocket listener.
pub struct Server {
    scene: Arc<Mutex<Scene>>,
    config: ServerConfig,
    shutdown: Arc<Notify>,
}

impl Server {
    /// Build a server from config.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Io`] if the message log cannot be created.
    pub fn new(config: ServerConfig) -> Result<Self, SceneError> {
        let scene = match &config.message_log {
            Some(path) => Scene::with_message_log(path)?,
            None => Scene::new(),
        };
        Ok(Self {
            scene: Arc::new(Mutex::new(scene)),
            config,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Build a server and populate its starting state before any client can
    /// connect — components, registered methods, behavior overrides.
    ///
    /// # Errors
    ///
    /// Propagates any error from `setup` alongside [`Server::new`] failures.
    pub fn with_starting_state(
        config: ServerConfig,
        setup: impl FnOnce(&mut Scene) -> Result<(), SceneError>,
    ) -> Result<Self, SceneError> {
        let server = Self::new(config)?;
        setup(&mut server.scene())?;
        Ok(server)
    }

    /// Exclusive access to the scene for the embedding application. All
    /// scene-affecting calls serialize through this lock.
    #[must_use]
    pub fn scene(&self) -> MutexGuard<'_, Scene> {
        lock(&self.scene)
    }

    /// A shared handle to the scene, for spawned tasks.
    #[must_use]
    pub fn scene_handle(&self) -> Arc<Mutex<Scene>> {
        Arc::clone(&self.scene)
    }

    /// A handle that stops [`run`](Self::run) when triggered.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            notify: Arc::clone(&self.shutdown),
        }
    }

    /// Accept and serve client connections until shut down.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Io`] if the listener cannot bind.
    pub async fn run(&self) -> Result<(), SceneError> {
        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(addr = %self.config.bind, "scene server listening");
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("scene server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(handle_connection(self.scene_handle(), stream, peer));
                    }
                    Err(error) => warn!(%error, "failed to accept connection"),
                },
            }
        }
    }
}
