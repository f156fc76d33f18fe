//! # fusilli_types
//!
//! The NOODLES component schema — typed identifiers, the thirteen component
//! kinds, nested wire records, and construction-time validation.
//!
//! This crate provides:
//!
//! - [`Id`], [`AnyId`], and one typed identifier per kind — `(slot, gen)`
//!   pairs that never compare equal across kinds.
//! - [`Component`] — the sum type over all component kinds, plus the
//!   [`ComponentType`] marker tying each struct to its identifier type.
//! - [`VisitRefs`] — static visitation of embedded component references.
//! - [`ValidationError`] — construction and update validation failures.

pub mod common;
pub mod components;
pub mod error;
pub mod id;
pub mod refs;

pub use common::{
    Attribute, AttributeFormat, AttributeSemantic, BoundingBox, BufferViewType, ColumnType,
    DirectionalLight, GeometryPatch, Index, IndexFormat, InstanceSource, InvocationContext,
    MagFilter, Mat3, Mat4, MethodArg, MinFilter, PbrInfo, PointLight, PrimitiveType,
    RenderRepresentation, Rgb, Rgba, SamplerMode, Selection, SelectionRange, SpotLight,
    TableColumnInfo, TableInitData, TableValue, TextRepresentation, TextureRef, Vec3, Vec4,
    WebRepresentation,
};
pub use components::{
    Buffer, BufferView, Component, ComponentType, Entity, Geometry, Image, Light, Material,
    Method, Plot, Sampler, Signal, Table, Texture,
};
pub use error::ValidationError;
pub use id::{
    AnyId, BufferId, BufferViewId, ComponentKind, EntityId, GeometryId, Id, ImageId, LightId,
    MaterialId, MethodId, PlotId, SamplerId, SignalId, TableId, TextureId,
};
pub use refs::VisitRefs;
