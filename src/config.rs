//! Runtime configuration of the renderer and of skinned meshes.
//!
//! Both types are plain values with `Default` implementations and `with_*`
//! builders, set up once during `on_init` or when a mesh is constructed.

/// Number of blur iterations (each one horizontal plus one vertical pass).
pub const POST_PASSES: usize = 10;

/// Settings of the scene + post-process renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererConfig {
    /// Blur iterations per frame. Zero presents the unblurred scene.
    pub post_passes: usize,
    pub clear_colour: wgpu::Color,
    /// Vertical field of view of the scene projection, in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            post_passes: POST_PASSES,
            clear_colour: wgpu::Color {
                r: 0.2,
                g: 0.2,
                b: 0.2,
                a: 1.0,
            },
            fovy: 45.0,
            znear: 1.0,
            zfar: 10000.0,
        }
    }
}

impl RendererConfig {
    pub fn with_post_passes(mut self, post_passes: usize) -> Self {
        self.post_passes = post_passes;
        self
    }

    pub fn with_clear_colour(mut self, clear_colour: wgpu::Color) -> Self {
        self.clear_colour = clear_colour;
        self
    }

    pub fn with_fovy(mut self, fovy: f32) -> Self {
        self.fovy = fovy;
        self
    }

    /// Sets both clip planes. `znear` must be positive and below `zfar`.
    pub fn with_clip_planes(mut self, znear: f32, zfar: f32) -> Self {
        if znear <= 0.0 || zfar <= znear {
            log::warn!(
                "Ignoring invalid clip planes near={} far={}, keeping {}..{}",
                znear,
                zfar,
                self.znear,
                self.zfar
            );
            return self;
        }
        self.znear = znear;
        self.zfar = zfar;
        self
    }
}

/// What a skinned mesh regenerates after each skinning update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshConfig {
    pub generate_normals: bool,
    pub generate_tangents: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            generate_normals: true,
            generate_tangents: true,
        }
    }
}

impl MeshConfig {
    /// Positions only. Normals and tangents keep whatever they were built with.
    pub fn positions_only() -> Self {
        Self {
            generate_normals: false,
            generate_tangents: false,
        }
    }

    pub fn with_normals(mut self, generate_normals: bool) -> Self {
        self.generate_normals = generate_normals;
        self
    }

    pub fn with_tangents(mut self, generate_tangents: bool) -> Self {
        self.generate_tangents = generate_tangents;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_renderer_matches_post_passes() {
        let config = RendererConfig::default();
        assert_eq!(config.post_passes, POST_PASSES);
        assert_eq!(config.znear, 1.0);
        assert_eq!(config.zfar, 10000.0);
    }

    #[test]
    fn invalid_clip_planes_are_ignored() {
        let config = RendererConfig::default().with_clip_planes(5.0, 2.0);
        assert_eq!((config.znear, config.zfar), (1.0, 10000.0));

        let config = RendererConfig::default().with_clip_planes(0.1, 500.0);
        assert_eq!((config.znear, config.zfar), (0.1, 500.0));
    }

    #[test]
    fn mesh_config_builders() {
        let config = MeshConfig::positions_only().with_normals(true);
        assert!(config.generate_normals);
        assert!(!config.generate_tangents);
    }
}
