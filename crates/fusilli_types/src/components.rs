//! The thirteen concrete component kinds and the [`Component`] sum type.
//!
//! Each kind is a plain serde struct whose wire map is its non-null public
//! fields. One-of groups (`Light`, `Plot`, `Buffer`, `Image`) validate at
//! construction and again on update.

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::common::{
    BoundingBox, BufferViewType, GeometryPatch, MagFilter, Mat4, MethodArg, MinFilter, PbrInfo,
    PointLight, Rgb, SpotLight, TextRepresentation, TextureRef, Vec3, WebRepresentation,
    DirectionalLight, RenderRepresentation, SamplerMode,
};
use crate::error::ValidationError;
use crate::id::{
    AnyId, BufferId, BufferViewId, ComponentKind, EntityId, GeometryId, Id, ImageId, LightId,
    MaterialId, MethodId, PlotId, SamplerId, SignalId, TableId, TextureId,
};
use crate::refs::VisitRefs;

/// A method clients may invoke on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub id: MethodId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_doc: Option<String>,
    #[serde(default)]
    pub arg_doc: Vec<MethodArg>,
}

impl Method {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    #[must_use]
    pub fn with_args(mut self, arg_doc: Vec<MethodArg>) -> Self {
        self.arg_doc = arg_doc;
        self
    }
}

impl VisitRefs for Method {
    fn visit_refs(&self, _visit: &mut dyn FnMut(AnyId)) {}
}

/// A signal the server may raise on a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg_doc: Option<Vec<MethodArg>>,
}

impl Signal {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl VisitRefs for Signal {
    fn visit_refs(&self, _visit: &mut dyn FnMut(AnyId)) {}
}

/// A node in the scene graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Mat4>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_rep: Option<TextRepresentation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_rep: Option<WebRepresentation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_rep: Option<RenderRepresentation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lights: Option<Vec<LightId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plots: Option<Vec<PlotId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods_list: Option<Vec<MethodId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals_list: Option<Vec<SignalId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influence: Option<BoundingBox>,
}

impl Entity {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl VisitRefs for Entity {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.parent.visit_refs(visit);
        self.render_rep.visit_refs(visit);
        self.lights.visit_refs(visit);
        self.tables.visit_refs(visit);
        self.plots.visit_refs(visit);
        self.methods_list.visit_refs(visit);
        self.signals_list.visit_refs(visit);
    }
}

/// A plot over a table, either inline ("simple") or hosted at a URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub id: PlotId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simple_plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods_list: Option<Vec<MethodId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals_list: Option<Vec<SignalId>>,
}

impl Plot {
    #[must_use]
    pub fn simple(definition: impl Into<String>) -> Self {
        Self {
            simple_plot: Some(definition.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url_plot: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        exactly_one(
            "Plot",
            "simple_plot, url_plot",
            &[self.simple_plot.is_some(), self.url_plot.is_some()],
        )
    }
}

impl VisitRefs for Plot {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.table.visit_refs(visit);
        self.methods_list.visit_refs(visit);
        self.signals_list.visit_refs(visit);
    }
}

/// A blob of bytes, carried inline or hosted out-of-band at a URI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buffer {
    pub id: BufferId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_bytes: Option<ByteBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri_bytes: Option<String>,
}

impl Buffer {
    /// A buffer carrying its bytes inline.
    #[must_use]
    pub fn inline(bytes: Vec<u8>) -> Self {
        Self {
            size: bytes.len() as u64,
            inline_bytes: Some(ByteBuf::from(bytes)),
            ..Self::default()
        }
    }

    /// A buffer whose bytes are fetched out-of-band.
    #[must_use]
    pub fn from_uri(uri: impl Into<String>, size: u64) -> Self {
        Self {
            size,
            uri_bytes: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        exactly_one(
            "Buffer",
            "inline_bytes, uri_bytes",
            &[self.inline_bytes.is_some(), self.uri_bytes.is_some()],
        )
    }
}

impl VisitRefs for Buffer {
    fn visit_refs(&self, _visit: &mut dyn FnMut(AnyId)) {}
}

/// A typed window into a buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferView {
    pub id: BufferViewId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source_buffer: BufferId,
    #[serde(rename = "type")]
    pub view_type: BufferViewType,
    pub offset: u64,
    pub length: u64,
}

impl BufferView {
    #[must_use]
    pub fn new(source_buffer: BufferId, offset: u64, length: u64) -> Self {
        Self {
            source_buffer,
            offset,
            length,
            ..Self::default()
        }
    }
}

impl VisitRefs for BufferView {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.source_buffer.visit_refs(visit);
    }
}

/// Surface appearance parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pbr_info: PbrInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_texture: Option<TextureRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occlusion_texture: Option<TextureRef>,
    pub occlusion_texture_factor: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_texture: Option<TextureRef>,
    pub emissive_factor: Vec3,
    pub use_alpha: bool,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            id: MaterialId::default(),
            name: None,
            pbr_info: PbrInfo::default(),
            normal_texture: None,
            occlusion_texture: None,
            occlusion_texture_factor: 1.0,
            emissive_texture: None,
            emissive_factor: [1.0, 1.0, 1.0],
            use_alpha: false,
            alpha_cutoff: 0.5,
            double_sided: false,
        }
    }
}

impl VisitRefs for Material {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.pbr_info.visit_refs(visit);
        self.normal_texture.visit_refs(visit);
        self.occlusion_texture.visit_refs(visit);
        self.emissive_texture.visit_refs(visit);
    }
}

/// Image data, sourced from a buffer or fetched from a URI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_source: Option<BufferId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri_source: Option<String>,
}

impl Image {
    #[must_use]
    pub fn from_buffer(buffer: BufferId) -> Self {
        Self {
            buffer_source: Some(buffer),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri_source: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        exactly_one(
            "Image",
            "buffer_source, uri_source",
            &[self.buffer_source.is_some(), self.uri_source.is_some()],
        )
    }
}

impl VisitRefs for Image {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.buffer_source.visit_refs(visit);
    }
}

/// An image plus the sampler used to read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub id: TextureId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub image: ImageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<SamplerId>,
}

impl Texture {
    #[must_use]
    pub fn new(image: ImageId) -> Self {
        Self {
            image,
            ..Self::default()
        }
    }
}

impl VisitRefs for Texture {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.image.visit_refs(visit);
        self.sampler.visit_refs(visit);
    }
}

/// Texture filtering and wrapping parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sampler {
    pub id: SamplerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mag_filter: MagFilter,
    pub min_filter: MinFilter,
    pub wrap_s: SamplerMode,
    pub wrap_t: SamplerMode,
}

impl VisitRefs for Sampler {
    fn visit_refs(&self, _visit: &mut dyn FnMut(AnyId)) {}
}

/// A light source; exactly one variant must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub id: LightId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub color: Rgb,
    pub intensity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<PointLight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot: Option<SpotLight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directional: Option<DirectionalLight>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            id: LightId::default(),
            name: None,
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            point: None,
            spot: None,
            directional: None,
        }
    }
}

impl Light {
    #[must_use]
    pub fn point() -> Self {
        Self {
            point: Some(PointLight::default()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn spot() -> Self {
        Self {
            spot: Some(SpotLight::default()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn directional() -> Self {
        Self {
            directional: Some(DirectionalLight::default()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        exactly_one(
            "Light",
            "point, spot, directional",
            &[
                self.point.is_some(),
                self.spot.is_some(),
                self.directional.is_some(),
            ],
        )
    }
}

impl VisitRefs for Light {
    fn visit_refs(&self, _visit: &mut dyn FnMut(AnyId)) {}
}

/// Mesh geometry as a list of primitive patches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub id: GeometryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub patches: Vec<GeometryPatch>,
}

impl Geometry {
    #[must_use]
    pub fn new(patches: Vec<GeometryPatch>) -> Self {
        Self {
            patches,
            ..Self::default()
        }
    }
}

impl VisitRefs for Geometry {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.patches.visit_refs(visit);
    }
}

/// A tabular data source. Contents live in a behavior override, never here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods_list: Option<Vec<MethodId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals_list: Option<Vec<SignalId>>,
}

impl Table {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl VisitRefs for Table {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.methods_list.visit_refs(visit);
        self.signals_list.visit_refs(visit);
    }
}

fn exactly_one(
    kind: &'static str,
    fields: &'static str,
    set: &[bool],
) -> Result<(), ValidationError> {
    if set.iter().filter(|present| **present).count() == 1 {
        Ok(())
    } else {
        Err(ValidationError::ExclusiveFields { kind, fields })
    }
}

/// Marker trait tying a component struct to its identifier type and kind.
pub trait ComponentType: Into<Component> + Sized {
    type Id: Copy + Into<AnyId> + From<Id>;
    const KIND: ComponentKind;

    fn typed_id(id: Id) -> Self::Id {
        Self::Id::from(id)
    }

    fn from_component(component: &Component) -> Option<&Self>;
    fn from_component_mut(component: &mut Component) -> Option<&mut Self>;
}

macro_rules! component_enum {
    ($($kind:ident => $ty:ident / $id_ty:ident),+ $(,)?) => {
        /// A scene component of any kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Component {
            $($kind($ty),)+
        }

        impl Component {
            /// The kind of this component.
            #[must_use]
            pub fn kind(&self) -> ComponentKind {
                match self {
                    $(Component::$kind(_) => ComponentKind::$kind,)+
                }
            }

            /// The kind-tagged identifier of this component.
            #[must_use]
            pub fn id(&self) -> AnyId {
                match self {
                    $(Component::$kind(c) => c.id.into(),)+
                }
            }

            /// Overwrite the raw identifier. Only the scene engine does this,
            /// immediately after allocation.
            pub fn set_id(&mut self, id: Id) {
                match self {
                    $(Component::$kind(c) => c.id = $id_ty(id),)+
                }
            }
        }

        impl VisitRefs for Component {
            fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
                match self {
                    $(Component::$kind(c) => c.visit_refs(visit),)+
                }
            }
        }

        $(
            impl From<$ty> for Component {
                fn from(component: $ty) -> Self {
                    Component::$kind(component)
                }
            }

            impl ComponentType for $ty {
                type Id = $id_ty;
                const KIND: ComponentKind = ComponentKind::$kind;

                fn from_component(component: &Component) -> Option<&Self> {
                    match component {
                        Component::$kind(c) => Some(c),
                        _ => None,
                    }
                }

                fn from_component_mut(component: &mut Component) -> Option<&mut Self> {
                    match component {
                        Component::$kind(c) => Some(c),
                        _ => None,
                    }
                }
            }
        )+
    };
}

component_enum! {
    Method => Method / MethodId,
    Signal => Signal / SignalId,
    Entity => Entity / EntityId,
    Plot => Plot / PlotId,
    Buffer => Buffer / BufferId,
    BufferView => BufferView / BufferViewId,
    Material => Material / MaterialId,
    Image => Image / ImageId,
    Texture => Texture / TextureId,
    Sampler => Sampler / SamplerId,
    Light => Light / LightId,
    Geometry => Geometry / GeometryId,
    Table => Table / TableId,
}

impl Component {
    /// The component's informational name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Component::Method(c) => Some(&c.name),
            Component::Signal(c) => Some(&c.name),
            Component::Entity(c) => c.name.as_deref(),
            Component::Plot(c) => c.name.as_deref(),
            Component::Buffer(c) => c.name.as_deref(),
            Component::BufferView(c) => c.name.as_deref(),
            Component::Material(c) => c.name.as_deref(),
            Component::Image(c) => c.name.as_deref(),
            Component::Texture(c) => c.name.as_deref(),
            Component::Sampler(c) => c.name.as_deref(),
            Component::Light(c) => c.name.as_deref(),
            Component::Geometry(c) => c.name.as_deref(),
            Component::Table(c) => c.name.as_deref(),
        }
    }

    /// Re-run the kind's construction-time validation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Component::Plot(c) => c.validate(),
            Component::Buffer(c) => c.validate(),
            Component::Image(c) => c.validate(),
            Component::Light(c) => c.validate(),
            _ => Ok(()),
        }
    }
}
