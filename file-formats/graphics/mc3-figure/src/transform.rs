//! Hierarchical bone composition and vertex application.
//!
//! This is the hot path of the pipeline: it runs once per posture change
//! over every vertex. The caller supplies the world-matrix scratch buffer
//! so repeated poses reuse one allocation; the inner loops allocate
//! nothing.

use crate::math::Mat3x4;
use crate::model::ModelBone;

/// Compose world matrices over the bone hierarchy and apply them to the
/// vertex and normal buffers.
///
/// For each bone in declaration order (parents precede children):
/// `world = bind` for roots, `world = world[parent] ∘ bind` otherwise;
/// when an override matrix exists for the bone index it is post-multiplied
/// before children or vertices consume the result. Each bone then
/// transforms its contiguous run of owned vertices (affine) and normals
/// (linear).
///
/// Buffer lengths must match the bone table's vertex ownership; the MBAC
/// decoder guarantees this for decoded models.
pub fn apply_pose(
    bones: &[ModelBone],
    overrides: Option<&[Mat3x4]>,
    world: &mut Vec<Mat3x4>,
    src_vertices: &[i16],
    dst_vertices: &mut [i16],
    src_normals: Option<&[i8]>,
    mut dst_normals: Option<&mut [i8]>,
) {
    debug_assert_eq!(src_vertices.len(), dst_vertices.len());

    world.clear();
    world.reserve(bones.len());

    let mut base = 0usize;
    for (i, bone) in bones.iter().enumerate() {
        let mut matrix = if bone.parent < 0 {
            bone.matrix
        } else {
            world[bone.parent as usize].mul(&bone.matrix)
        };
        if let Some(overrides) = overrides {
            // an override table shorter than the skeleton leaves the tail
            // bones in pure bind pose
            if let Some(over) = overrides.get(i) {
                matrix = matrix.mul(over);
            }
        }
        world.push(matrix);

        let start = base * 3;
        let end = start + bone.vertex_count * 3;
        for v in (start..end).step_by(3) {
            let (x, y, z) = matrix.transform_point(
                i32::from(src_vertices[v]),
                i32::from(src_vertices[v + 1]),
                i32::from(src_vertices[v + 2]),
            );
            dst_vertices[v] = x as i16;
            dst_vertices[v + 1] = y as i16;
            dst_vertices[v + 2] = z as i16;
        }
        if let (Some(src), Some(dst)) = (src_normals, dst_normals.as_deref_mut()) {
            for v in (start..end).step_by(3) {
                let (x, y, z) = matrix.transform_direction(
                    i32::from(src[v]),
                    i32::from(src[v + 1]),
                    i32::from(src[v + 2]),
                );
                dst[v] = x as i8;
                dst[v + 1] = y as i8;
                dst[v + 2] = z as i8;
            }
        }
        base += bone.vertex_count;
    }
}
