//! Building geometry components from vertex data.
//!
//! These helpers sit on top of the scene engine's public creation API: they
//! interleave vertex channels into a packed buffer, lay out attributes with
//! computed offsets and stride, pick an index format wide enough for the
//! vertex count, and create the buffer/view/patch chain. Buffers above the
//! inline threshold are published through the [`ByteHost`] and referenced by
//! URI instead of travelling inside CBOR messages.

use tracing::{debug, warn};

use fusilli_server::Scene;
use fusilli_types::{
    Attribute, AttributeFormat, AttributeSemantic, Buffer, BufferId, BufferView, BufferViewId,
    BufferViewType, Entity, EntityId, Geometry, GeometryId, GeometryPatch, Index, IndexFormat,
    InstanceSource, Mat4, RenderRepresentation, Vec3, Vec4,
};

use crate::byte_host::ByteHost;
use crate::error::GeometryError;
use crate::normals::calculate_normals;
use crate::objects::GeometryPatchInput;

/// Buffers larger than this many bytes are hosted out-of-band.
pub const INLINE_LIMIT: usize = 10_000;

const DEFAULT_POSITION: Vec4 = [0.0, 0.0, 0.0, 1.0];
const DEFAULT_COLOR: Vec4 = [1.0, 1.0, 1.0, 1.0];
const DEFAULT_ROTATION: Vec4 = [0.0, 0.0, 0.0, 1.0];
const DEFAULT_SCALE: Vec4 = [1.0, 1.0, 1.0, 1.0];

/// The narrowest index format that can address this many vertices.
#[must_use]
pub fn index_format_for(vertex_count: usize) -> IndexFormat {
    if vertex_count < 256 {
        IndexFormat::U8
    } else if vertex_count < 65_536 {
        IndexFormat::U16
    } else {
        IndexFormat::U32
    }
}

struct AttributeLayout {
    semantic: AttributeSemantic,
    format: AttributeFormat,
    normalized: bool,
    offset: u32,
    stride: u32,
}

/// One layout entry per channel present in the input, with offsets assigned
/// in packing order and a shared stride.
fn layout_attributes(input: &GeometryPatchInput) -> Vec<AttributeLayout> {
    let mut layouts = Vec::new();
    let mut push = |semantic, format, normalized| {
        layouts.push(AttributeLayout {
            semantic,
            format,
            normalized,
            offset: 0,
            stride: 0,
        });
    };

    push(AttributeSemantic::Position, AttributeFormat::Vec3, false);
    if input.normals.is_some() {
        push(AttributeSemantic::Normal, AttributeFormat::Vec3, false);
    }
    if input.tangents.is_some() {
        push(AttributeSemantic::Tangent, AttributeFormat::Vec3, false);
    }
    if input.textures.is_some() {
        push(AttributeSemantic::Texture, AttributeFormat::U16Vec2, true);
    }
    if input.colors.is_some() {
        push(AttributeSemantic::Color, AttributeFormat::U8Vec4, true);
    }

    let mut offset = 0;
    for layout in &mut layouts {
        layout.offset = offset;
        offset += layout.format.size_bytes();
    }
    for layout in &mut layouts {
        layout.stride = offset;
    }
    layouts
}

fn push_f32s(bytes: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
}

fn unit_to_u16(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16
}

fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * f32::from(u8::MAX)).round() as u8
}

/// Interleave all present channels, vertex by vertex.
fn pack_vertices(input: &GeometryPatchInput) -> Vec<u8> {
    let mut bytes = Vec::new();
    for vertex in 0..input.vertices.len() {
        push_f32s(&mut bytes, &input.vertices[vertex]);
        if let Some(normals) = &input.normals {
            push_f32s(&mut bytes, &normals[vertex]);
        }
        if let Some(tangents) = &input.tangents {
            push_f32s(&mut bytes, &tangents[vertex]);
        }
        if let Some(textures) = &input.textures {
            for component in textures[vertex] {
                bytes.extend_from_slice(&unit_to_u16(component).to_le_bytes());
            }
        }
        if let Some(colors) = &input.colors {
            for component in colors[vertex] {
                bytes.push(unit_to_u8(component));
            }
        }
    }
    bytes
}

fn pack_indices(bytes: &mut Vec<u8>, indices: &[Vec<u32>], format: IndexFormat) -> u32 {
    let mut count = 0;
    for group in indices {
        for index in group {
            match format {
                IndexFormat::U8 => bytes.push(*index as u8),
                IndexFormat::U16 => bytes.extend_from_slice(&(*index as u16).to_le_bytes()),
                IndexFormat::U32 => bytes.extend_from_slice(&index.to_le_bytes()),
            }
            count += 1;
        }
    }
    count
}

/// Create the buffer component for packed bytes: inline below the threshold,
/// published through the byte host above it.
fn create_packed_buffer(
    scene: &mut Scene,
    name: Option<&str>,
    bytes: Vec<u8>,
    byte_host: Option<&ByteHost>,
) -> Result<(BufferId, u64), GeometryError> {
    let size = bytes.len() as u64;
    let mut buffer = if bytes.len() > INLINE_LIMIT {
        if let Some(host) = byte_host {
            debug!(size, "large mesh, publishing bytes out-of-band");
            Buffer::from_uri(host.publish(bytes), size)
        } else {
            warn!(size, "large mesh but no byte host supplied, inlining");
            Buffer::inline(bytes)
        }
    } else {
        Buffer::inline(bytes)
    };
    buffer.name = name.map(str::to_string);
    let id = scene.create(buffer)?;
    Ok((id, size))
}

/// Build a geometry patch and its backing buffer and view.
///
/// Missing normals are generated from the triangle faces unless
/// `generate_normals` is false.
///
/// # Errors
///
/// Returns [`GeometryError::EmptyVertices`] for an empty mesh, and
/// propagates scene errors from component creation.
pub fn build_geometry_patch(
    scene: &mut Scene,
    name: Option<&str>,
    mut input: GeometryPatchInput,
    byte_host: Option<&ByteHost>,
    generate_normals: bool,
) -> Result<GeometryPatch, GeometryError> {
    if input.vertices.is_empty() {
        return Err(GeometryError::EmptyVertices);
    }
    let vertex_count = input.vertices.len();
    let index_format = index_format_for(vertex_count);

    if input.normals.is_none() && generate_normals {
        input.normals = Some(calculate_normals(&input.vertices, &input.indices));
    }

    // Accept 0-255 colors and bring them down to unit scale.
    if let Some(colors) = &mut input.colors {
        if colors.iter().flatten().any(|component| *component > 1.0) {
            for color in colors.iter_mut() {
                for component in color.iter_mut() {
                    *component /= 255.0;
                }
            }
        }
    }

    let layouts = layout_attributes(&input);
    let mut bytes = pack_vertices(&input);
    let index_offset = bytes.len() as u32;
    let index_count = pack_indices(&mut bytes, &input.indices, index_format);

    let (buffer, size) = create_packed_buffer(scene, name, bytes, byte_host)?;
    let view = scene.create(BufferView {
        name: name.map(str::to_string),
        view_type: BufferViewType::Geometry,
        ..BufferView::new(buffer, 0, size)
    })?;

    let attributes = layouts
        .into_iter()
        .map(|layout| Attribute {
            view,
            semantic: layout.semantic,
            channel: None,
            offset: layout.offset,
            stride: layout.stride,
            format: layout.format,
            minimum_value: None,
            maximum_value: None,
            normalized: layout.normalized,
        })
        .collect();

    let indices = (index_count > 0).then_some(Index {
        view,
        count: index_count,
        offset: index_offset,
        stride: 0,
        format: index_format,
    });

    Ok(GeometryPatch {
        attributes,
        vertex_count: vertex_count as u64,
        indices,
        primitive: input.primitive,
        material: input.material,
    })
}

// ── Instances ───────────────────────────────────────────────────────────────

fn padded(value: Vec3, pad: f32) -> Vec4 {
    [value[0], value[1], value[2], pad]
}

/// Build instance matrices from per-instance positions, colors, rotations,
/// and scales. Shorter lists are padded with defaults; with no input at all,
/// one default instance is produced.
#[must_use]
pub fn create_instances(
    positions: &[Vec3],
    colors: &[Vec4],
    rotations: &[Vec4],
    scales: &[Vec3],
) -> Vec<Mat4> {
    let count = positions
        .len()
        .max(colors.len())
        .max(rotations.len())
        .max(scales.len())
        .max(1);

    let mut instances = Vec::with_capacity(count);
    for i in 0..count {
        let position = positions
            .get(i)
            .map_or(DEFAULT_POSITION, |p| padded(*p, 1.0));
        let color = colors.get(i).copied().unwrap_or(DEFAULT_COLOR);
        let rotation = rotations.get(i).copied().unwrap_or(DEFAULT_ROTATION);
        let scale = scales.get(i).map_or(DEFAULT_SCALE, |s| padded(*s, 1.0));
        let mut matrix = [0.0; 16];
        matrix[..4].copy_from_slice(&position);
        matrix[4..8].copy_from_slice(&color);
        matrix[8..12].copy_from_slice(&rotation);
        matrix[12..].copy_from_slice(&scale);
        instances.push(matrix);
    }
    instances
}

/// Create an inline buffer holding instance matrices.
///
/// # Errors
///
/// Propagates scene errors from buffer creation.
pub fn build_instance_buffer(
    scene: &mut Scene,
    name: Option<&str>,
    instances: &[Mat4],
) -> Result<BufferId, GeometryError> {
    let mut bytes = Vec::with_capacity(instances.len() * 64);
    for matrix in instances {
        push_f32s(&mut bytes, matrix);
    }
    let mut buffer = Buffer::inline(bytes);
    buffer.name = name.map(|n| format!("Instance buffer for {n}"));
    Ok(scene.create(buffer)?)
}

fn build_instance_source(
    scene: &mut Scene,
    name: Option<&str>,
    instances: &[Mat4],
) -> Result<InstanceSource, GeometryError> {
    let buffer = build_instance_buffer(scene, name, instances)?;
    let size = scene.get::<Buffer>(buffer)?.size;
    let view = scene.create(BufferView {
        name: name.map(|n| format!("Instance view for {n}")),
        ..BufferView::new(buffer, 0, size)
    })?;
    Ok(InstanceSource {
        view,
        stride: 0,
        bb: None,
    })
}

/// Create an entity rendering a geometry, optionally instanced.
///
/// # Errors
///
/// Propagates scene errors from component creation.
pub fn build_entity(
    scene: &mut Scene,
    geometry: GeometryId,
    instances: Option<&[Mat4]>,
) -> Result<EntityId, GeometryError> {
    let name = scene.get::<Geometry>(geometry)?.name.clone();
    let instance_source = match instances {
        Some(instances) => Some(build_instance_source(scene, name.as_deref(), instances)?),
        None => None,
    };
    Ok(scene.create(Entity {
        name,
        render_rep: Some(RenderRepresentation {
            mesh: geometry,
            instances: instance_source,
        }),
        ..Entity::default()
    })?)
}

/// Swap an entity's geometry and/or instances, then delete whatever the new
/// representation superseded.
///
/// # Errors
///
/// Returns [`GeometryError::NotRenderable`] if the entity has no render
/// representation.
pub fn update_entity(
    scene: &mut Scene,
    entity: EntityId,
    geometry: Option<GeometryId>,
    instances: Option<&[Mat4]>,
) -> Result<(), GeometryError> {
    let current = scene.get::<Entity>(entity)?;
    let name = current.name.clone();
    let old_rep = current
        .render_rep
        .clone()
        .ok_or(GeometryError::NotRenderable)?;

    let mesh = geometry.unwrap_or(old_rep.mesh);
    let instance_source = match instances {
        Some(instances) => Some(build_instance_source(scene, name.as_deref(), instances)?),
        None => old_rep.instances.clone(),
    };

    scene.get_mut::<Entity>(entity)?.render_rep = Some(RenderRepresentation {
        mesh,
        instances: instance_source,
    });
    scene.update(entity)?;

    // Retire whatever the new representation replaced. Deletions cascade
    // once the updated entity no longer holds the references.
    if instances.is_some() {
        if let Some(old_instances) = old_rep.instances {
            let old_view: BufferViewId = old_instances.view;
            let old_buffer = scene.get::<BufferView>(old_view)?.source_buffer;
            scene.delete(old_buffer)?;
            scene.delete(old_view)?;
        }
    } else if geometry.is_some() {
        scene.delete(old_rep.mesh)?;
    }
    Ok(())
}

/// Append instances to an entity's existing inline instance buffer.
///
/// # Errors
///
/// Returns [`GeometryError::NotRenderable`] for entities without instanced
/// geometry and [`GeometryError::InstanceBufferNotInline`] when the existing
/// instances are hosted out-of-band.
pub fn add_instances(
    scene: &mut Scene,
    entity: EntityId,
    additional: &[Mat4],
) -> Result<(), GeometryError> {
    let rep = scene
        .get::<Entity>(entity)?
        .render_rep
        .clone()
        .ok_or(GeometryError::NotRenderable)?;
    let source = rep.instances.ok_or(GeometryError::NotRenderable)?;
    let buffer_id = scene.get::<BufferView>(source.view)?.source_buffer;
    let buffer = scene.get::<Buffer>(buffer_id)?;
    let bytes = buffer
        .inline_bytes
        .as_ref()
        .ok_or(GeometryError::InstanceBufferNotInline)?;

    let floats: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    let mut combined: Vec<Mat4> = floats
        .chunks_exact(16)
        .map(|chunk| {
            let mut matrix = [0.0; 16];
            matrix.copy_from_slice(chunk);
            matrix
        })
        .collect();
    combined.extend_from_slice(additional);

    update_entity(scene, entity, None, Some(&combined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusilli_types::{ComponentKind, Material};

    fn quad_input(scene: &mut Scene) -> GeometryPatchInput {
        let material = scene.create(Material::default()).unwrap();
        GeometryPatchInput::triangles(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![vec![0, 1, 2], vec![0, 2, 3]],
            material,
        )
    }

    #[test]
    fn test_index_format_selection() {
        assert_eq!(index_format_for(255), IndexFormat::U8);
        assert_eq!(index_format_for(256), IndexFormat::U16);
        assert_eq!(index_format_for(65_535), IndexFormat::U16);
        assert_eq!(index_format_for(65_536), IndexFormat::U32);
    }

    #[test]
    fn test_patch_layout_offsets_and_stride() {
        let mut scene = Scene::new();
        let input = quad_input(&mut scene)
            .with_textures(vec![[0.0, 0.0]; 4])
            .with_colors(vec![[1.0, 0.0, 0.0, 1.0]; 4]);
        let patch = build_geometry_patch(&mut scene, Some("quad"), input, None, true).unwrap();

        // POSITION, generated NORMAL, TEXTURE, COLOR.
        let semantics: Vec<_> = patch
            .attributes
            .iter()
            .map(|attribute| attribute.semantic)
            .collect();
        assert_eq!(
            semantics,
            vec![
                AttributeSemantic::Position,
                AttributeSemantic::Normal,
                AttributeSemantic::Texture,
                AttributeSemantic::Color,
            ]
        );
        let offsets: Vec<_> = patch
            .attributes
            .iter()
            .map(|attribute| attribute.offset)
            .collect();
        assert_eq!(offsets, vec![0, 12, 24, 28]);
        assert!(patch.attributes.iter().all(|attribute| attribute.stride == 32));

        let indices = patch.indices.unwrap();
        assert_eq!(indices.count, 6);
        assert_eq!(indices.format, IndexFormat::U8);
        // Vertex data precedes index data in the packed buffer.
        assert_eq!(indices.offset, 4 * 32);
        assert_eq!(patch.vertex_count, 4);
    }

    #[test]
    fn test_small_mesh_stays_inline() {
        let mut scene = Scene::new();
        let input = quad_input(&mut scene);
        let patch = build_geometry_patch(&mut scene, Some("quad"), input, None, false).unwrap();
        let view = scene.get::<BufferView>(patch.attributes[0].view).unwrap();
        let buffer = scene.get::<Buffer>(view.source_buffer).unwrap();
        assert!(buffer.inline_bytes.is_some());
        assert_eq!(buffer.uri_bytes, None);
        // Positions only, no generated normals: 4 vertices * 12 bytes + 6 indices.
        assert_eq!(buffer.size, 4 * 12 + 6);
    }

    #[test]
    fn test_empty_vertices_rejected() {
        let mut scene = Scene::new();
        let material = scene.create(Material::default()).unwrap();
        let input = GeometryPatchInput::triangles(vec![], vec![], material);
        assert!(matches!(
            build_geometry_patch(&mut scene, None, input, None, true),
            Err(GeometryError::EmptyVertices)
        ));
    }

    #[test]
    fn test_create_instances_pads_and_defaults() {
        let instances = create_instances(&[], &[], &[], &[]);
        assert_eq!(instances.len(), 1);
        assert_eq!(&instances[0][..4], &[0.0, 0.0, 0.0, 1.0]);

        let instances = create_instances(&[[1.0, 2.0, 3.0]], &[], &[], &[]);
        assert_eq!(&instances[0][..4], &[1.0, 2.0, 3.0, 1.0]);
        assert_eq!(&instances[0][4..8], &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(&instances[0][12..], &[1.0, 1.0, 1.0, 1.0]);

        // The longest channel sets the instance count.
        let instances = create_instances(&[[0.0; 3]], &[[0.5; 4]; 3], &[], &[]);
        assert_eq!(instances.len(), 3);
    }

    #[test]
    fn test_build_entity_with_instances() {
        let mut scene = Scene::new();
        let input = quad_input(&mut scene);
        let patch = build_geometry_patch(&mut scene, Some("quad"), input, None, true).unwrap();
        let geometry = scene
            .create(fusilli_types::Geometry {
                name: Some("quad".into()),
                ..fusilli_types::Geometry::new(vec![patch])
            })
            .unwrap();

        let instances = create_instances(&[[0.0; 3], [1.0, 0.0, 0.0]], &[], &[], &[]);
        let entity = build_entity(&mut scene, geometry, Some(&instances)).unwrap();

        let rep = scene
            .get::<Entity>(entity)
            .unwrap()
            .render_rep
            .clone()
            .unwrap();
        assert_eq!(rep.mesh, geometry);
        let view = scene
            .get::<BufferView>(rep.instances.unwrap().view)
            .unwrap();
        let buffer = scene.get::<Buffer>(view.source_buffer).unwrap();
        // Two instances, 64 bytes each.
        assert_eq!(buffer.size, 128);
    }

    #[test]
    fn test_update_entity_replaces_and_cleans_up_instances() {
        let mut scene = Scene::new();
        let input = quad_input(&mut scene);
        let patch = build_geometry_patch(&mut scene, None, input, None, true).unwrap();
        let geometry = scene.create(fusilli_types::Geometry::new(vec![patch])).unwrap();
        let entity =
            build_entity(&mut scene, geometry, Some(&create_instances(&[], &[], &[], &[])))
                .unwrap();

        let old_view = scene
            .get::<Entity>(entity)
            .unwrap()
            .render_rep
            .clone()
            .unwrap()
            .instances
            .unwrap()
            .view;

        let replacement = create_instances(&[[5.0, 0.0, 0.0]], &[], &[], &[]);
        update_entity(&mut scene, entity, None, Some(&replacement)).unwrap();

        // The superseded instance view and buffer are gone.
        assert!(scene.get::<BufferView>(old_view).is_err());
        // Two buffers ever created for instances, one remains (plus the mesh buffer).
        assert_eq!(scene.ids_by_kind(ComponentKind::BufferView).len(), 2);
    }

    #[test]
    fn test_add_instances_extends_buffer() {
        let mut scene = Scene::new();
        let input = quad_input(&mut scene);
        let patch = build_geometry_patch(&mut scene, None, input, None, true).unwrap();
        let geometry = scene.create(fusilli_types::Geometry::new(vec![patch])).unwrap();
        let entity = build_entity(
            &mut scene,
            geometry,
            Some(&create_instances(&[[0.0; 3]], &[], &[], &[])),
        )
        .unwrap();

        add_instances(
            &mut scene,
            entity,
            &create_instances(&[[9.0, 0.0, 0.0]], &[], &[], &[]),
        )
        .unwrap();

        let rep = scene
            .get::<Entity>(entity)
            .unwrap()
            .render_rep
            .clone()
            .unwrap();
        let view = scene
            .get::<BufferView>(rep.instances.unwrap().view)
            .unwrap();
        let buffer = scene.get::<Buffer>(view.source_buffer).unwrap();
        assert_eq!(buffer.size, 2 * 64);
    }
}
