//! Pipelines of the full-screen passes.
//!
//! Neither pipeline has a depth/stencil state, so the blur and present passes
//! run with depth testing off while the scene pipeline keeps it on.

use crate::{
    data_structures::{
        texture::Texture,
        vertex::{QuadVertex, Vertex},
    },
    pipelines::basic::mk_render_pipeline,
};

fn mk_quad_pipeline(
    device: &wgpu::Device,
    label: &str,
    texture_bind_group_layout: &wgpu::BindGroupLayout,
    post_bind_group_layout: &wgpu::BindGroupLayout,
    color_format: wgpu::TextureFormat,
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[texture_bind_group_layout, post_bind_group_layout],
        immediate_size: 0,
    });
    mk_render_pipeline(
        device,
        &layout,
        color_format,
        Some(wgpu::BlendState::REPLACE),
        None,
        &[QuadVertex::desc()],
        wgpu::PrimitiveTopology::TriangleStrip,
        shader,
    )
}

/// Reads one colour buffer, writes the other.
pub fn mk_blur_pipeline(
    device: &wgpu::Device,
    texture_bind_group_layout: &wgpu::BindGroupLayout,
    post_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    mk_quad_pipeline(
        device,
        "Blur Pipeline Layout",
        texture_bind_group_layout,
        post_bind_group_layout,
        Texture::COLOUR_FORMAT,
        wgpu::ShaderModuleDescriptor {
            label: Some("Blur Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blur.wgsl").into()),
        },
    )
}

/// Draws the final colour buffer onto the surface.
pub fn mk_present_pipeline(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    texture_bind_group_layout: &wgpu::BindGroupLayout,
    post_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    mk_quad_pipeline(
        device,
        "Present Pipeline Layout",
        texture_bind_group_layout,
        post_bind_group_layout,
        surface_format,
        wgpu::ShaderModuleDescriptor {
            label: Some("Present Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("present.wgsl").into()),
        },
    )
}
