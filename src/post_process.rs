//! Separable blur over two ping-pong colour buffers.
//!
//! The scene is drawn into buffer 0. Every blur iteration then runs two
//! full-screen passes:
//!
//! - horizontal: sample buffer 0, write buffer 1
//! - vertical: sample buffer 1, write buffer 0
//!
//! so the result always ends up back in buffer 0, which the present pass
//! draws to the surface. The pass order is a pure function of the iteration
//! count, see [`blur_schedule`].

use wgpu::util::DeviceExt;

use crate::{
    camera::{orthographic_quad, uniform_layout},
    data_structures::texture::Texture,
    resources::generate_quad,
};

/// Direction a single blur pass samples along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurAxis {
    Horizontal,
    Vertical,
}

impl BlurAxis {
    pub fn is_vertical(self) -> bool {
        matches!(self, BlurAxis::Vertical)
    }
}

/// One full-screen draw of the blur chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurPass {
    pub iteration: usize,
    pub axis: BlurAxis,
    /// Colour buffer sampled by the pass.
    pub source: usize,
    /// Colour buffer written by the pass.
    pub target: usize,
}

/// The passes of `iterations` blur iterations, in execution order.
pub fn blur_schedule(iterations: usize) -> Vec<BlurPass> {
    (0..iterations)
        .flat_map(|iteration| {
            [
                BlurPass {
                    iteration,
                    axis: BlurAxis::Horizontal,
                    source: 0,
                    target: 1,
                },
                BlurPass {
                    iteration,
                    axis: BlurAxis::Vertical,
                    source: 1,
                    target: 0,
                },
            ]
        })
        .collect()
}

/// Two slots of the same kind and which of them holds the latest result.
#[derive(Clone, Debug, PartialEq)]
pub struct PingPong<T> {
    slots: [T; 2],
    current: usize,
}

impl<T> PingPong<T> {
    /// Slot 0 starts out as current.
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
            current: 0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    pub fn other(&self) -> &T {
        &self.slots[1 - self.current]
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.slots.get(idx)
    }

    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Records that `pass` wrote its target.
    pub fn apply(&mut self, pass: &BlurPass) {
        if pass.source != self.current {
            log::warn!(
                "Blur pass {:?} reads buffer {} but buffer {} holds the latest image",
                pass.axis,
                pass.source,
                self.current
            );
        }
        self.current = pass.target;
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PingPong<U> {
        PingPong {
            slots: [f(&self.slots[0]), f(&self.slots[1])],
            current: self.current,
        }
    }
}

impl<T> std::ops::Index<usize> for PingPong<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        &self.slots[idx]
    }
}

/// Uniform of the blur and present shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Size of one texel in texture coordinates.
    pub pixel_size: [f32; 2],
    pub is_vertical: u32,
    _padding: u32,
}

impl PostUniform {
    pub fn new(axis: BlurAxis, width: u32, height: u32) -> Self {
        Self {
            view_proj: orthographic_quad().into(),
            pixel_size: pixel_size(width, height),
            is_vertical: axis.is_vertical() as u32,
            _padding: 0,
        }
    }
}

pub fn pixel_size(width: u32, height: u32) -> [f32; 2] {
    [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32]
}

/// The off-screen targets: two colour buffers and a depth/stencil buffer.
#[derive(Debug)]
pub struct ColourBuffers {
    pub colour: PingPong<Texture>,
    /// Bind groups sampling `colour[0]` and `colour[1]`.
    pub bind_groups: PingPong<wgpu::BindGroup>,
    pub depth: Texture,
    pub size: [u32; 2],
}

impl ColourBuffers {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, size: [u32; 2]) -> anyhow::Result<Self> {
        let colour = PingPong::new(
            Texture::create_colour_target(device, size, "Colour Buffer 0"),
            Texture::create_colour_target(device, size, "Colour Buffer 1"),
        );
        let first = colour[0]
            .bind_group(device, layout, "colour_bind_group_0")
            .ok_or_else(|| anyhow::anyhow!("colour buffer 0 has no sampler"))?;
        let second = colour[1]
            .bind_group(device, layout, "colour_bind_group_1")
            .ok_or_else(|| anyhow::anyhow!("colour buffer 1 has no sampler"))?;
        let depth = Texture::create_depth_stencil_texture(device, size, "Depth Stencil Buffer");
        Ok(Self {
            colour,
            bind_groups: PingPong::new(first, second),
            depth,
            size,
        })
    }
}

/// Everything the blur and present passes bind besides the colour buffers.
///
/// The colour buffers themselves are bound through the shared texture layout
/// of [`crate::context::Context`].
#[derive(Debug)]
pub struct PostResources {
    pub quad: wgpu::Buffer,
    pub quad_vertices: u32,
    /// Horizontal (0) and vertical (1) blur uniforms.
    pub uniforms: [wgpu::Buffer; 2],
    pub uniform_groups: [wgpu::BindGroup; 2],
    pub uniform_layout: wgpu::BindGroupLayout,
}

impl PostResources {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let vertices = generate_quad();
        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Full Screen Quad"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_layout = uniform_layout(device, "post_bind_group_layout");

        let make_uniform = |axis: BlurAxis, label: &str| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&[PostUniform::new(axis, width, height)]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
                label: Some(label),
            });
            (buffer, group)
        };
        let (horizontal, horizontal_group) = make_uniform(BlurAxis::Horizontal, "Horizontal Blur Uniform");
        let (vertical, vertical_group) = make_uniform(BlurAxis::Vertical, "Vertical Blur Uniform");

        Self {
            quad,
            quad_vertices: vertices.len() as u32,
            uniforms: [horizontal, vertical],
            uniform_groups: [horizontal_group, vertical_group],
            uniform_layout,
        }
    }

    /// The uniform bind group of `axis`.
    pub fn uniform_group(&self, axis: BlurAxis) -> &wgpu::BindGroup {
        &self.uniform_groups[axis.is_vertical() as usize]
    }

    /// Rewrites both uniforms for a new target size.
    pub fn write(&self, queue: &wgpu::Queue, width: u32, height: u32) {
        for axis in [BlurAxis::Horizontal, BlurAxis::Vertical] {
            queue.write_buffer(
                &self.uniforms[axis.is_vertical() as usize],
                0,
                bytemuck::cast_slice(&[PostUniform::new(axis, width, height)]),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_iterations_alternate_buffers() {
        let targets: Vec<_> = blur_schedule(2)
            .iter()
            .map(|p| (p.source, p.target, p.axis))
            .collect();
        assert_eq!(
            targets,
            vec![
                (0, 1, BlurAxis::Horizontal),
                (1, 0, BlurAxis::Vertical),
                (0, 1, BlurAxis::Horizontal),
                (1, 0, BlurAxis::Vertical),
            ]
        );
    }

    #[test]
    fn no_iterations_means_no_passes() {
        assert!(blur_schedule(0).is_empty());
    }

    #[test]
    fn ping_pong_returns_to_first_buffer() {
        for iterations in 0..7 {
            let mut buffers = PingPong::new("a", "b");
            for pass in blur_schedule(iterations) {
                buffers.apply(&pass);
            }
            assert_eq!(buffers.current_index(), 0);
            assert_eq!(*buffers.current(), "a");
        }
    }

    #[test]
    fn swap_and_map_keep_current() {
        let mut buffers = PingPong::new(1, 2);
        buffers.swap();
        assert_eq!(*buffers.current(), 2);
        assert_eq!(*buffers.other(), 1);
        let doubled = buffers.map(|v| v * 2);
        assert_eq!(*doubled.current(), 4);
    }

    #[test]
    fn post_uniform_layout() {
        assert_eq!(std::mem::size_of::<PostUniform>(), 80);
        let uniform = PostUniform::new(BlurAxis::Vertical, 800, 400);
        assert_eq!(uniform.pixel_size, [1.0 / 800.0, 1.0 / 400.0]);
        assert_eq!(uniform.is_vertical, 1);
        assert_eq!(PostUniform::new(BlurAxis::Horizontal, 1, 1).is_vertical, 0);
    }
}
