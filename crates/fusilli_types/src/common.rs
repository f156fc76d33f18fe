//! Shared wire definitions: enumerations and nested records.
//!
//! Field sets and default values follow the NOODLES message schema. Optional
//! fields are skipped when absent so wire maps only carry present data;
//! fields with schema defaults are plain values initialised by `Default`.

use std::f32::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{AnyId, BufferViewId, EntityId, GeometryId, PlotId, TableId, TextureId};
use crate::refs::VisitRefs;

pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];
pub type Mat3 = [f32; 9];
pub type Mat4 = [f32; 16];

pub type Rgb = Vec3;
pub type Rgba = Vec4;

/// Row-major 3×3 identity, the default texture-coordinate transform.
pub const MAT3_IDENTITY: Mat3 = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

// ── Enumerations ────────────────────────────────────────────────────────────

/// What a vertex attribute means to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeSemantic {
    Position,
    Normal,
    Tangent,
    Texture,
    Color,
}

/// Packed format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeFormat {
    U8,
    U16,
    U32,
    #[serde(rename = "U8VEC4")]
    U8Vec4,
    #[serde(rename = "U16VEC2")]
    U16Vec2,
    #[serde(rename = "VEC2")]
    Vec2,
    #[serde(rename = "VEC3")]
    Vec3,
    #[serde(rename = "VEC4")]
    Vec4,
    #[serde(rename = "MAT3")]
    Mat3,
    #[serde(rename = "MAT4")]
    Mat4,
}

impl AttributeFormat {
    /// Packed size of one element, in bytes.
    #[must_use]
    pub const fn size_bytes(self) -> u32 {
        match self {
            AttributeFormat::U8 => 1,
            AttributeFormat::U16 => 2,
            AttributeFormat::U32 | AttributeFormat::U8Vec4 | AttributeFormat::U16Vec2 => 4,
            AttributeFormat::Vec2 => 8,
            AttributeFormat::Vec3 => 12,
            AttributeFormat::Vec4 => 16,
            AttributeFormat::Mat3 => 36,
            AttributeFormat::Mat4 => 64,
        }
    }
}

/// Packed format of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexFormat {
    U8,
    U16,
    U32,
}

impl IndexFormat {
    /// Packed size of one index, in bytes.
    #[must_use]
    pub const fn size_bytes(self) -> u32 {
        match self {
            IndexFormat::U8 => 1,
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// How a geometry patch's vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimitiveType {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
}

/// Declared type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    Text,
    Real,
    Integer,
}

/// What a buffer view's bytes hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BufferViewType {
    #[default]
    #[serde(rename = "UNK")]
    Unknown,
    Geometry,
    Image,
}

/// Texture wrap mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SamplerMode {
    ClampToEdge,
    MirroredRepeat,
    #[default]
    Repeat,
}

/// Texture magnification filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MagFilter {
    Nearest,
    #[default]
    Linear,
}

/// Texture minification filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MinFilter {
    Nearest,
    Linear,
    #[default]
    LinearMipmapLinear,
}

// ── Method and signal documentation ─────────────────────────────────────────

/// Documentation for one argument of a method or signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodArg {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_hint: Option<String>,
}

impl MethodArg {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            editor_hint: None,
        }
    }
}

// ── Table structures ────────────────────────────────────────────────────────

/// A half-open range of table row keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub key_from_inclusive: i64,
    pub key_to_exclusive: i64,
}

/// A named selection over table rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_ranges: Option<Vec<SelectionRange>>,
}

/// Name and declared type of one table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// One cell of a table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl TableValue {
    const fn type_label(&self) -> &'static str {
        match self {
            TableValue::Integer(_) => "integer",
            TableValue::Real(_) => "float",
            TableValue::Text(_) => "text",
        }
    }

    const fn matches(&self, column_type: ColumnType) -> bool {
        matches!(
            (self, column_type),
            (TableValue::Text(_), ColumnType::Text)
                | (TableValue::Real(_), ColumnType::Real)
                | (TableValue::Integer(_), ColumnType::Integer)
        )
    }
}

/// Initial contents handed to a table behavior override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInitData {
    pub columns: Vec<TableColumnInfo>,
    pub keys: Vec<i64>,
    pub data: Vec<Vec<TableValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selections: Option<Vec<Selection>>,
}

impl TableInitData {
    /// Check every row against the declared column types.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (row_index, row) in self.data.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(ValidationError::RowLength {
                    row: row_index,
                    expected: self.columns.len(),
                    found: row.len(),
                });
            }
            for (column, cell) in self.columns.iter().zip(row) {
                if !cell.matches(column.column_type) {
                    return Err(ValidationError::ColumnTypeMismatch {
                        column: column.name.clone(),
                        expected: column.column_type,
                        row: row_index,
                        found: cell.type_label(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ── Entity representations ──────────────────────────────────────────────────

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

/// An entity rendered as a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRepresentation {
    pub txt: String,
    pub font: String,
    pub height: f32,
    pub width: f32,
}

impl TextRepresentation {
    #[must_use]
    pub fn new(txt: impl Into<String>) -> Self {
        Self {
            txt: txt.into(),
            font: "Arial".to_string(),
            height: 0.25,
            width: -1.0,
        }
    }
}

/// An entity rendered as an embedded web view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebRepresentation {
    pub source: String,
    pub height: f32,
    pub width: f32,
}

impl WebRepresentation {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            height: 0.5,
            width: 0.5,
        }
    }
}

/// Per-instance transform matrices for a rendered entity, stored in a
/// buffer view of 4×4 rows (position, color, rotation, scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSource {
    pub view: BufferViewId,
    pub stride: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb: Option<BoundingBox>,
}

impl VisitRefs for InstanceSource {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.view.visit_refs(visit);
    }
}

/// An entity rendered as mesh geometry, optionally instanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRepresentation {
    pub mesh: GeometryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<InstanceSource>,
}

impl VisitRefs for RenderRepresentation {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.mesh.visit_refs(visit);
        self.instances.visit_refs(visit);
    }
}

// ── Material structures ─────────────────────────────────────────────────────

/// A reference to a texture plus its coordinate transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureRef {
    pub texture: TextureId,
    pub transform: Mat3,
    pub texture_coord_slot: u32,
}

impl TextureRef {
    #[must_use]
    pub fn new(texture: TextureId) -> Self {
        Self {
            texture,
            transform: MAT3_IDENTITY,
            texture_coord_slot: 0,
        }
    }
}

impl VisitRefs for TextureRef {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.texture.visit_refs(visit);
    }
}

/// Physically-based rendering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PbrInfo {
    pub base_color: Rgba,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureRef>,
    pub metallic: f32,
    pub roughness: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metal_rough_texture: Option<TextureRef>,
}

impl Default for PbrInfo {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            metallic: 1.0,
            roughness: 1.0,
            metal_rough_texture: None,
        }
    }
}

impl VisitRefs for PbrInfo {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.base_color_texture.visit_refs(visit);
        self.metal_rough_texture.visit_refs(visit);
    }
}

// ── Light variants ──────────────────────────────────────────────────────────

/// A point light. A negative range means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub range: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self { range: -1.0 }
    }
}

/// A spot light with inner/outer cone angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub range: f32,
    pub inner_cone_angle_rad: f32,
    pub outer_cone_angle_rad: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            range: -1.0,
            inner_cone_angle_rad: 0.0,
            outer_cone_angle_rad: FRAC_PI_4,
        }
    }
}

/// A directional light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub range: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self { range: -1.0 }
    }
}

// ── Geometry structures ─────────────────────────────────────────────────────

/// One vertex attribute within a geometry patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub view: BufferViewId,
    pub semantic: AttributeSemantic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
    pub offset: u32,
    pub stride: u32,
    pub format: AttributeFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_value: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_value: Option<Vec<f32>>,
    pub normalized: bool,
}

impl VisitRefs for Attribute {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.view.visit_refs(visit);
    }
}

/// Where a geometry patch's indices live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub view: BufferViewId,
    pub count: u32,
    pub offset: u32,
    pub stride: u32,
    pub format: IndexFormat,
}

impl VisitRefs for Index {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.view.visit_refs(visit);
    }
}

/// One primitive batch within a geometry component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryPatch {
    pub attributes: Vec<Attribute>,
    pub vertex_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<Index>,
    #[serde(rename = "type")]
    pub primitive: PrimitiveType,
    pub material: crate::id::MaterialId,
}

impl VisitRefs for GeometryPatch {
    fn visit_refs(&self, visit: &mut dyn FnMut(AnyId)) {
        self.attributes.visit_refs(visit);
        self.indices.visit_refs(visit);
        self.material.visit_refs(visit);
    }
}

// ── Invocation context ──────────────────────────────────────────────────────

/// The component a signal or method invocation is scoped to.
///
/// The wire form is a single-key map (`{"entity": [slot, gen]}` and so on);
/// the exactly-one-of rule is enforced by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InvocationContext {
    #[serde(rename = "entity")]
    Entity(EntityId),
    #[serde(rename = "table")]
    Table(TableId),
    #[serde(rename = "plot")]
    Plot(PlotId),
}

impl InvocationContext {
    /// The identifier this context points at, with its kind.
    #[must_use]
    pub fn target(&self) -> AnyId {
        match self {
            InvocationContext::Entity(id) => (*id).into(),
            InvocationContext::Table(id) => (*id).into(),
            InvocationContext::Plot(id) => (*id).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sizes() {
        assert_eq!(AttributeFormat::U8.size_bytes(), 1);
        assert_eq!(AttributeFormat::U16Vec2.size_bytes(), 4);
        assert_eq!(AttributeFormat::Vec3.size_bytes(), 12);
        assert_eq!(AttributeFormat::Mat4.size_bytes(), 64);
        assert_eq!(IndexFormat::U32.size_bytes(), 4);
    }

    #[test]
    fn test_enum_wire_names() {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&AttributeFormat::U16Vec2, &mut bytes).unwrap();
        let value: ciborium::Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(value, ciborium::Value::Text("U16VEC2".into()));

        bytes.clear();
        ciborium::ser::into_writer(&MinFilter::LinearMipmapLinear, &mut bytes).unwrap();
        let value: ciborium::Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(value, ciborium::Value::Text("LINEAR_MIPMAP_LINEAR".into()));

        bytes.clear();
        ciborium::ser::into_writer(&BufferViewType::Unknown, &mut bytes).unwrap();
        let value: ciborium::Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(value, ciborium::Value::Text("UNK".into()));
    }

    #[test]
    fn test_invocation_context_wire_form() {
        let context = InvocationContext::Entity(EntityId::new(1, 0));
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&context, &mut bytes).unwrap();
        let value: ciborium::Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        let ciborium::Value::Map(entries) = value else {
            panic!("expected a map");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, ciborium::Value::Text("entity".into()));
    }

    #[test]
    fn test_table_init_data_validates_column_types() {
        let data = TableInitData {
            columns: vec![
                TableColumnInfo {
                    name: "label".into(),
                    column_type: ColumnType::Text,
                },
                TableColumnInfo {
                    name: "value".into(),
                    column_type: ColumnType::Real,
                },
            ],
            keys: vec![0],
            data: vec![vec![TableValue::Text("a".into()), TableValue::Real(1.5)]],
            selections: None,
        };
        assert!(data.validate().is_ok());

        let mismatched = TableInitData {
            data: vec![vec![TableValue::Real(1.5), TableValue::Real(1.5)]],
            ..data.clone()
        };
        assert!(matches!(
            mismatched.validate(),
            Err(ValidationError::ColumnTypeMismatch { row: 0, .. })
        ));

        let short = TableInitData {
            data: vec![vec![TableValue::Text("a".into())]],
            ..data
        };
        assert!(matches!(
            short.validate(),
            Err(ValidationError::RowLength { expected: 2, found: 1, .. })
        ));
    }
}
