use crate::{
    data_structures::texture::Texture,
    pipelines::basic::{depth_test, mk_render_pipeline},
};

/// Draws the cube map behind everything else in the scene pass.
///
/// The sky sits exactly on the far plane, so it tests with `LessEqual` and
/// never writes depth.
pub fn mk_sky_pipeline(
    device: &wgpu::Device,
    cube_bind_group_layout: &wgpu::BindGroupLayout,
    sky_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Sky Pipeline Layout"),
        bind_group_layouts: &[cube_bind_group_layout, sky_bind_group_layout],
        immediate_size: 0,
    });
    mk_render_pipeline(
        device,
        &layout,
        Texture::COLOUR_FORMAT,
        Some(wgpu::BlendState::REPLACE),
        Some(wgpu::DepthStencilState {
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            ..depth_test(Texture::DEPTH_STENCIL_FORMAT)
        }),
        &[],
        wgpu::PrimitiveTopology::TriangleList,
        wgpu::ShaderModuleDescriptor {
            label: Some("Sky Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sky.wgsl").into()),
        },
    )
}
