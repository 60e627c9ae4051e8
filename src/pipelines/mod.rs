//! Render pipelines of the three frame stages: scene, blur and present.
//! The optional sky pipeline lives next to them in [`sky`].

pub mod basic;
pub mod post;
pub mod sky;

/// All pipelines a [`crate::render::SceneRenderer`] switches between.
#[derive(Debug)]
pub struct Pipelines {
    pub scene: wgpu::RenderPipeline,
    pub blur: wgpu::RenderPipeline,
    pub present: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        texture_bind_group_layout: &wgpu::BindGroupLayout,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        post_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            scene: basic::mk_scene_pipeline(
                device,
                texture_bind_group_layout,
                camera_bind_group_layout,
            ),
            blur: post::mk_blur_pipeline(device, texture_bind_group_layout, post_bind_group_layout),
            present: post::mk_present_pipeline(
                device,
                surface_format,
                texture_bind_group_layout,
                post_bind_group_layout,
            ),
        }
    }
}
