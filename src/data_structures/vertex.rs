//! Vertex buffer layouts.
//!
//! Mesh attributes are kept in separate streams (one GPU buffer per CPU array)
//! so that a skinning update can overwrite each of them independently.

/// Describes how the bytes of a vertex buffer map onto shader locations.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Slot indices of the per-vertex attribute streams in the scene pipeline.
pub mod slot {
    pub const POSITION: u32 = 0;
    pub const TEX_COORD: u32 = 1;
    pub const NORMAL: u32 = 2;
    pub const TANGENT: u32 = 3;
    pub const TRANSFORM: u32 = 4;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Position(pub [f32; 3]);

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexCoord(pub [f32; 2]);

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Normal(pub [f32; 3]);

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Tangent(pub [f32; 3]);

fn single_attribute(
    stride: usize,
    attributes: &'static [wgpu::VertexAttribute],
) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: stride as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

impl Vertex for Position {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
            wgpu::vertex_attr_array![0 => Float32x3];
        single_attribute(std::mem::size_of::<Self>(), &ATTRIBUTES)
    }
}

impl Vertex for TexCoord {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
            wgpu::vertex_attr_array![1 => Float32x2];
        single_attribute(std::mem::size_of::<Self>(), &ATTRIBUTES)
    }
}

impl Vertex for Normal {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
            wgpu::vertex_attr_array![2 => Float32x3];
        single_attribute(std::mem::size_of::<Self>(), &ATTRIBUTES)
    }
}

impl Vertex for Tangent {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
            wgpu::vertex_attr_array![3 => Float32x3];
        single_attribute(std::mem::size_of::<Self>(), &ATTRIBUTES)
    }
}

/// Interleaved vertex of the full-screen quad used by the 2D passes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for QuadVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}
