//! Geometry helper error types.

use fusilli_server::SceneError;

/// Errors from the geometry authoring helpers and the byte host.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// The patch input had no vertices.
    #[error("patch input has no vertices")]
    EmptyVertices,

    /// The entity has no render representation to work with.
    #[error("entity is not renderable")]
    NotRenderable,

    /// The entity's instance buffer is hosted out-of-band and cannot be
    /// extended in place.
    #[error("instance buffer is not inline")]
    InstanceBufferNotInline,

    /// Component creation or update failed in the scene engine.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The byte host listener failed.
    #[error("byte host io error: {0}")]
    Io(#[from] std::io::Error),
}
