//! Input types for geometry authoring.

use fusilli_types::{MaterialId, PrimitiveType, Vec3, Vec4};

/// Per-vertex source data for one geometry patch.
///
/// `vertices` and `indices` are required; the remaining channels are packed
/// into the vertex buffer only when present. Colors may be given either in
/// `[0, 1]` or `[0, 255]` scale — the helpers normalise before packing.
#[derive(Debug, Clone)]
pub struct GeometryPatchInput {
    pub vertices: Vec<Vec3>,
    /// Index groups, one per primitive (triangles, lines, …).
    pub indices: Vec<Vec<u32>>,
    pub primitive: PrimitiveType,
    pub material: MaterialId,
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec3>>,
    pub textures: Option<Vec<[f32; 2]>>,
    pub colors: Option<Vec<Vec4>>,
}

impl GeometryPatchInput {
    /// A triangle mesh with only positions and indices.
    #[must_use]
    pub fn triangles(vertices: Vec<Vec3>, indices: Vec<Vec<u32>>, material: MaterialId) -> Self {
        Self {
            vertices,
            indices,
            primitive: PrimitiveType::Triangles,
            material,
            normals: None,
            tangents: None,
            textures: None,
            colors: None,
        }
    }

    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    #[must_use]
    pub fn with_textures(mut self, textures: Vec<[f32; 2]>) -> Self {
        self.textures = Some(textures);
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: Vec<Vec4>) -> Self {
        self.colors = Some(colors);
        self
    }
}
