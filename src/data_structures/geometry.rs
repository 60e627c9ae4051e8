//! Per-vertex normal and tangent generation.
//!
//! Both generators walk the triangles of a mesh, compute a per-face vector,
//! accumulate it onto the three corner vertices and renormalise at the end.
//! They run once when a mesh is built and again after every skinning update,
//! since moved positions invalidate the old vectors.

use cgmath::InnerSpace;

const DEGENERATE_EPSILON: f32 = 1e-12;

/// Iterates over the triangles of a mesh as index triples.
///
/// Indexed meshes use `indices` in chunks of three; otherwise consecutive
/// vertices form the triangles. Trailing indices that don't complete a
/// triangle are ignored.
fn triangles(vertex_count: usize, indices: &[u32]) -> Vec<[usize; 3]> {
    if indices.is_empty() {
        (0..vertex_count / 3)
            .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
            .collect()
    } else {
        indices
            .chunks_exact(3)
            .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
            .collect()
    }
}

fn normalize_or_zero(v: cgmath::Vector3<f32>) -> cgmath::Vector3<f32> {
    if v.magnitude2() > DEGENERATE_EPSILON {
        v.normalize()
    } else {
        cgmath::Vector3::new(0.0, 0.0, 0.0)
    }
}

/// Smooth vertex normals from triangle adjacency.
pub fn generate_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); positions.len()];

    for [a, b, c] in triangles(positions.len(), indices) {
        let pos0: cgmath::Vector3<_> = positions[a].into();
        let pos1: cgmath::Vector3<_> = positions[b].into();
        let pos2: cgmath::Vector3<_> = positions[c].into();

        let face = normalize_or_zero((pos1 - pos0).cross(pos2 - pos0));

        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    normals
        .into_iter()
        .map(|n| normalize_or_zero(n).into())
        .collect()
}

/// Vertex tangents aligned with the U direction of the texture coordinates.
///
/// Triangles whose UVs are degenerate (zero area in texture space) contribute
/// nothing, so a vertex touched only by such triangles ends up with a zero
/// tangent.
pub fn generate_tangents(
    positions: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    indices: &[u32],
) -> Vec<[f32; 3]> {
    let mut tangents = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); positions.len()];

    for [a, b, c] in triangles(positions.len(), indices) {
        let pos0: cgmath::Vector3<_> = positions[a].into();
        let pos1: cgmath::Vector3<_> = positions[b].into();
        let pos2: cgmath::Vector3<_> = positions[c].into();

        let uv0: cgmath::Vector2<_> = tex_coords[a].into();
        let uv1: cgmath::Vector2<_> = tex_coords[b].into();
        let uv2: cgmath::Vector2<_> = tex_coords[c].into();

        // Edges of the triangle in object and in texture space
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        // for T.
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) / det;

        tangents[a] += tangent;
        tangents[b] += tangent;
        tangents[c] += tangent;
    }

    tangents
        .into_iter()
        .map(|t| normalize_or_zero(t).into())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two triangles forming a unit square in the XY plane, facing +Z.
    fn square() -> (Vec<[f32; 3]>, Vec<[f32; 2]>, Vec<u32>) {
        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let tex_coords = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let indices = vec![0, 1, 2, 0, 2, 3];
        (positions, tex_coords, indices)
    }

    #[test]
    fn flat_square_has_unit_z_normals() {
        let (positions, _, indices) = square();
        for n in generate_normals(&positions, &indices) {
            assert_eq!(n, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn non_indexed_mesh_uses_consecutive_triangles() {
        let positions = vec![[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let normals = generate_normals(&positions, &[]);
        assert_eq!(normals, vec![[0.0, 1.0, 0.0]; 3]);
    }

    #[test]
    fn tangent_follows_u_axis() {
        let (positions, tex_coords, indices) = square();
        for t in generate_tangents(&positions, &tex_coords, &indices) {
            assert_eq!(t, [1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn degenerate_input_yields_zero_vectors() {
        let positions = vec![[0.0; 3]; 3];
        let tex_coords = vec![[0.0; 2]; 3];
        assert_eq!(generate_normals(&positions, &[0, 1, 2]), vec![[0.0; 3]; 3]);
        assert_eq!(
            generate_tangents(&positions, &tex_coords, &[0, 1, 2]),
            vec![[0.0; 3]; 3]
        );
    }
}
