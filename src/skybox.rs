//! Cube-mapped sky drawn behind the scene.
//!
//! The sky is a single full-screen triangle on the far plane. Its fragment
//! shader turns each pixel back into a view direction with the inverse of the
//! rotation-only view-projection in [`SkyUniform`] and samples the cube map
//! along it. Camera translation is ignored, so the sky never gets closer.

use cgmath::{Matrix4, Point3, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, Projection, uniform_layout},
    data_structures::texture::{Texture, cube_layout},
    pipelines::sky::mk_sky_pipeline,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkyUniform {
    pub inv_view_proj: [[f32; 4]; 4],
}

impl SkyUniform {
    /// Returns `None` if the projection is singular.
    pub fn new(camera: &Camera, projection: &Projection) -> Option<Self> {
        let rotation = Matrix4::look_to_rh(Point3::new(0.0, 0.0, 0.0), camera.forward(), Vector3::unit_y());
        let inv_view_proj = (projection.calc_matrix() * rotation).invert()?;
        Some(Self {
            inv_view_proj: inv_view_proj.into(),
        })
    }
}

/// Cube map, its uniform and the pipeline drawing it.
#[derive(Debug)]
pub struct Skybox {
    #[allow(unused)]
    cube: Texture,
    cube_group: wgpu::BindGroup,
    uniform: SkyUniform,
    buffer: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl Skybox {
    /// Uploads `faces` (+X, -X, +Y, -Y, +Z, -Z) and builds the sky pipeline.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[image::RgbaImage; 6],
    ) -> anyhow::Result<Self> {
        let cube = Texture::create_cube(device, queue, faces, "Sky Cube")?;
        let cube_layout = cube_layout(device);
        let cube_group = cube
            .bind_group(device, &cube_layout, "sky_cube_bind_group")
            .ok_or_else(|| anyhow::anyhow!("sky cube has no sampler"))?;

        let uniform = SkyUniform {
            inv_view_proj: Matrix4::identity().into(),
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sky_layout = uniform_layout(device, "sky_bind_group_layout");
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &sky_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("sky_bind_group"),
        });

        let pipeline = mk_sky_pipeline(device, &cube_layout, &sky_layout);

        Ok(Self {
            cube,
            cube_group,
            uniform,
            buffer,
            uniform_group,
            pipeline,
        })
    }

    pub fn uniform(&self) -> &SkyUniform {
        &self.uniform
    }

    /// Follows the camera's orientation. A singular projection keeps the last uniform.
    pub fn write(&mut self, queue: &wgpu::Queue, camera: &Camera, projection: &Projection) {
        match SkyUniform::new(camera, projection) {
            Some(uniform) => {
                self.uniform = uniform;
                queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
            }
            None => log::warn!("Sky projection is not invertible, keeping the previous one"),
        }
    }

    /// Draws the sky. Leaves its own pipeline bound.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.cube_group, &[]);
        render_pass.set_bind_group(1, &self.uniform_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, InnerSpace, Vector4};

    use super::*;

    fn view_direction(uniform: &SkyUniform, ndc: [f32; 2]) -> Vector3<f32> {
        let inv = Matrix4::from(uniform.inv_view_proj);
        let world = inv * Vector4::new(ndc[0], ndc[1], 1.0, 1.0);
        (world.truncate() / world.w).normalize()
    }

    #[test]
    fn screen_centre_looks_forward() {
        let camera = Camera::new((0.0, 30.0, 20.0), Deg(-90.0), Deg(-40.0));
        let projection = Projection::new(800, 600, Deg(45.0), 1.0, 10000.0);
        let uniform = SkyUniform::new(&camera, &projection).unwrap();

        let direction = view_direction(&uniform, [0.0, 0.0]);
        assert!((direction - camera.forward()).magnitude() < 1e-3);
    }

    #[test]
    fn camera_position_is_ignored() {
        let projection = Projection::new(800, 600, Deg(45.0), 1.0, 10000.0);
        let near = Camera::new((0.0, 0.0, 0.0), Deg(30.0), Deg(10.0));
        let far = Camera::new((500.0, -20.0, 3.0), Deg(30.0), Deg(10.0));
        assert_eq!(
            SkyUniform::new(&near, &projection),
            SkyUniform::new(&far, &projection)
        );
    }
}
