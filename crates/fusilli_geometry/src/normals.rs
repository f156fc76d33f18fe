//! Vertex normal generation.

use glam::Vec3 as GlamVec3;
use tracing::debug;

use fusilli_types::Vec3;

/// Generate per-vertex normals from triangle faces.
///
/// Each face normal is accumulated onto its three vertices and the sums are
/// normalised, giving area-weighted smooth normals. Vertices that belong to
/// no triangle get a zero normal.
#[must_use]
pub fn calculate_normals(vertices: &[Vec3], triangles: &[Vec<u32>]) -> Vec<Vec3> {
    debug!(vertices = vertices.len(), "generating normals");
    let mut accumulated = vec![GlamVec3::ZERO; vertices.len()];
    for triangle in triangles {
        let [Some(a), Some(b), Some(c)] = [
            triangle.first().copied(),
            triangle.get(1).copied(),
            triangle.get(2).copied(),
        ] else {
            continue;
        };
        let (a, b, c) = (a as usize, b as usize, c as usize);
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let pa = GlamVec3::from(vertices[a]);
        let pb = GlamVec3::from(vertices[b]);
        let pc = GlamVec3::from(vertices[c]);
        let face_normal = (pb - pa).cross(pc - pa);
        accumulated[a] += face_normal;
        accumulated[b] += face_normal;
        accumulated[c] += face_normal;
    }
    accumulated
        .into_iter()
        .map(|normal| normal.normalize_or_zero().to_array())
        .collect()
}
