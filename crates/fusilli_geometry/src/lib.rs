//! # fusilli_geometry
//!
//! Geometry authoring on top of the scene engine's public creation API.
//!
//! This crate provides:
//!
//! - [`objects`] — per-vertex input types for patch construction.
//! - [`creation`] — interleaved buffer packing, attribute layout, instance
//!   matrices, and entity builders.
//! - [`normals`] — vertex normal generation from triangle faces.
//! - [`byte_host`] — the HTTP host serving large buffers out-of-band.

pub mod byte_host;
pub mod creation;
pub mod error;
pub mod normals;
pub mod objects;

pub use byte_host::ByteHost;
pub use creation::{
    INLINE_LIMIT, add_instances, build_entity, build_geometry_patch, build_instance_buffer,
    create_instances, index_format_for, update_entity,
};
pub use error::GeometryError;
pub use normals::calculate_normals;
pub use objects::GeometryPatchInput;
