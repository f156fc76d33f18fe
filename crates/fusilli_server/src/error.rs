//! Scene-engine error types.

use fusilli_net::NetError;
use fusilli_types::{AnyId, ComponentKind, ValidationError};

/// Errors surfaced to server-side callers of the scene engine.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// A component failed validation; nothing was mutated or broadcast.
    #[error("invalid attributes: {0}")]
    InvalidAttributes(#[from] ValidationError),

    /// No such component in the scene.
    #[error("no {} component {} in scene", .0.kind, .0.id)]
    NotFound(AnyId),

    /// The kind has no update message in the protocol.
    #[error("{0} components cannot be updated")]
    Unupdatable(ComponentKind),

    /// Signals can only target entities, tables, and plots.
    #[error("cannot invoke a signal on a {0} component")]
    InvalidTarget(ComponentKind),

    /// Wire encoding failed.
    #[error(transparent)]
    Net(#[from] NetError),

    /// Message-log or listener I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Message-log JSON rendering failed.
    #[error("message log error: {0}")]
    Json(#[from] serde_json::Error),
}
