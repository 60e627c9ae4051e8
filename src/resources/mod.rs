//! Procedurally generated meshes and textures.
//!
//! Nothing here touches the file system. Callers that load height data or
//! images themselves pass the raw values in.

use crate::{
    config::MeshConfig,
    data_structures::{skinned_mesh::MeshGeometry, vertex::QuadVertex},
};

/// Texture repeats per height map cell.
pub const HEIGHT_MAP_TEX_SCALE: f32 = 1.0 / 16.0;

/// A [-1, 1] quad as a triangle strip, texture origin in the top left.
pub fn generate_quad() -> [QuadVertex; 4] {
    [
        QuadVertex {
            position: [-1.0, -1.0, 0.0],
            tex_coords: [0.0, 1.0],
        },
        QuadVertex {
            position: [-1.0, 1.0, 0.0],
            tex_coords: [0.0, 0.0],
        },
        QuadVertex {
            position: [1.0, -1.0, 0.0],
            tex_coords: [1.0, 1.0],
        },
        QuadVertex {
            position: [1.0, 1.0, 0.0],
            tex_coords: [1.0, 0.0],
        },
    ]
}

/// A single triangle facing +Z.
pub fn generate_triangle(config: MeshConfig) -> MeshGeometry {
    MeshGeometry::new(
        vec![[0.0, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]],
        vec![[0.5, 0.0], [0.0, 1.0], [1.0, 1.0]],
        Vec::new(),
        config,
    )
}

/// A `width` x `depth` grid of vertices with the given heights.
///
/// `heights` is row major (one row per z). Each vertex sits at
/// `(x * scale[0], height * scale[1], z * scale[2])`.
pub fn generate_height_map(
    width: usize,
    depth: usize,
    scale: [f32; 3],
    heights: &[u8],
    config: MeshConfig,
) -> anyhow::Result<MeshGeometry> {
    anyhow::ensure!(
        width >= 2 && depth >= 2,
        "a height map needs at least 2x2 vertices, got {}x{}",
        width,
        depth
    );
    anyhow::ensure!(
        heights.len() == width * depth,
        "expected {} height values for a {}x{} map, got {}",
        width * depth,
        width,
        depth,
        heights.len()
    );

    let mut positions = Vec::with_capacity(width * depth);
    let mut tex_coords = Vec::with_capacity(width * depth);
    for z in 0..depth {
        for x in 0..width {
            let height = heights[z * width + x] as f32;
            positions.push([x as f32 * scale[0], height * scale[1], z as f32 * scale[2]]);
            tex_coords.push([x as f32 * HEIGHT_MAP_TEX_SCALE, z as f32 * HEIGHT_MAP_TEX_SCALE]);
        }
    }

    let index = |x: usize, z: usize| (z * width + x) as u32;
    let mut indices = Vec::with_capacity((width - 1) * (depth - 1) * 6);
    for z in 0..depth - 1 {
        for x in 0..width - 1 {
            let a = index(x, z);
            let b = index(x + 1, z);
            let c = index(x + 1, z + 1);
            let d = index(x, z + 1);
            indices.extend_from_slice(&[a, d, b, b, d, c]);
        }
    }

    Ok(MeshGeometry::new(positions, tex_coords, indices, config))
}

/// A `size` x `size` texture of alternating light and dark squares.
pub fn checkerboard_texture(size: u32, cells: u32) -> image::RgbaImage {
    let cell = (size / cells.max(1)).max(1);
    image::RgbaImage::from_fn(size, size, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            image::Rgba([200, 200, 200, 255])
        } else {
            image::Rgba([60, 60, 60, 255])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_spans_clip_space() {
        let quad = generate_quad();
        let xs: Vec<_> = quad.iter().map(|v| v.position[0]).collect();
        assert_eq!(xs, vec![-1.0, -1.0, 1.0, 1.0]);
        assert_eq!(quad[1].tex_coords, [0.0, 0.0]);
    }

    #[test]
    fn triangle_faces_camera() {
        let triangle = generate_triangle(MeshConfig::default());
        assert_eq!(triangle.normals, vec![[0.0, 0.0, 1.0]; 3]);
    }

    #[test]
    fn flat_height_map_points_up() {
        let map = generate_height_map(3, 4, [1.0, 1.0, 1.0], &[0; 12], MeshConfig::default()).unwrap();
        assert_eq!(map.vertex_count(), 12);
        assert_eq!(map.indices.len(), 2 * 3 * 6);
        for n in &map.normals {
            assert_eq!(*n, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn height_map_rejects_wrong_sample_count() {
        assert!(generate_height_map(3, 3, [1.0; 3], &[0; 8], MeshConfig::default()).is_err());
        assert!(generate_height_map(1, 3, [1.0; 3], &[0; 3], MeshConfig::default()).is_err());
    }

    #[test]
    fn checkerboard_alternates() {
        let img = checkerboard_texture(4, 2);
        assert_ne!(img.get_pixel(0, 0), img.get_pixel(2, 0));
        assert_eq!(img.get_pixel(0, 0), img.get_pixel(2, 2));
    }
}
