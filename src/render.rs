//! Frame composition: scene pass, blur chain and present pass.
//!
//! Flows describe what to draw with a [`Render`] tree. The [`SceneRenderer`]
//! draws that tree into an off-screen colour buffer, blurs it and finally
//! copies the result onto the window surface.
//!
//! # Key types
//!
//! - [`Render<'a>`] is what a flow hands in each frame
//! - [`StageContext<'a>`] carries the bindings shared by every draw of a pass
//! - [`FrameStage`] / [`FrameState`] track where in a frame the renderer is
//! - [`RenderContext<'a>`] is the slice of the GPU context a frame needs
//! - [`SceneRenderer`] owns the off-screen targets and pipelines

use std::iter;

use instant::Duration;
use log::{debug, error, warn};

use crate::{
    camera::CameraResources,
    config::RendererConfig,
    context::Context,
    data_structures::{
        skinned_mesh::{MeshNode, SkinnedMesh},
        texture::{Texture, is_render_target_format},
    },
    error::{FrameError, InitError},
    pipelines::Pipelines,
    post_process::{ColourBuffers, PingPong, PostResources, blur_schedule},
    resources::checkerboard_texture,
    skybox::Skybox,
};

/// Bindings shared by all draws of the scene pass.
pub struct StageContext<'a> {
    pub camera: &'a wgpu::BindGroup,
    /// Bound for geometry that has no texture of its own.
    pub texture: &'a wgpu::BindGroup,
    /// The stage the pass belongs to. Geometry only draws in
    /// [`FrameStage::SceneDrawn`].
    pub stage: FrameStage,
}

/// Specifies what a flow wants drawn this frame.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Node(MeshNode)` renders a node tree, children first
/// - `Nodes(Vec<MeshNode>)` renders several trees in order
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
/// - `Custom(...)` invokes a user-defined closure inside the scene pass
pub enum Render<'a> {
    None,
    Node(&'a MeshNode),
    Nodes(Vec<&'a MeshNode>),
    Composed(Vec<Render<'a>>),
    Custom(Box<dyn 'a + FnOnce(&StageContext<'_>, &mut wgpu::RenderPass<'_>)>),
}

impl<'a> Render<'a> {
    pub fn draw(self, stage: &StageContext<'_>, render_pass: &mut wgpu::RenderPass<'_>) {
        match self {
            Render::None => (),
            Render::Node(node) => node.draw(stage, render_pass),
            Render::Nodes(nodes) => nodes
                .into_iter()
                .for_each(|node| node.draw(stage, render_pass)),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.draw(stage, render_pass)),
            Render::Custom(f) => f(stage, render_pass),
        }
    }

    /// Number of mesh geometries this render would draw. Custom closures count as zero.
    pub fn drawable_count(&self) -> usize {
        match self {
            Render::None | Render::Custom(_) => 0,
            Render::Node(node) => node.collect_drawables().len(),
            Render::Nodes(nodes) => nodes.iter().map(|n| n.collect_drawables().len()).sum(),
            Render::Composed(renders) => renders.iter().map(Render::drawable_count).sum(),
        }
    }
}

impl<'a> From<&'a MeshNode> for Render<'a> {
    fn from(node: &'a MeshNode) -> Self {
        Render::Node(node)
    }
}

impl<'a> From<&'a SkinnedMesh> for Render<'a> {
    fn from(mesh: &'a SkinnedMesh) -> Self {
        Render::Node(&mesh.root)
    }
}

/// Where the renderer is within the current frame.
///
/// A frame walks `Idle -> SceneDrawn -> Blurred(1) .. Blurred(n) -> Presented
/// -> Idle`, where `n` is the number of blur iterations. With zero
/// iterations the scene goes straight to `Presented`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStage {
    Idle,
    SceneDrawn,
    /// Number of completed blur iterations.
    Blurred(usize),
    Presented,
}

impl FrameStage {
    /// Whether mesh geometry may be drawn in a pass of this stage.
    pub fn draws_geometry(self) -> bool {
        self == FrameStage::SceneDrawn
    }
}

/// Readiness flag plus the [`FrameStage`] state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameState {
    ready: bool,
    stage: FrameStage,
    passes: usize,
}

impl FrameState {
    pub fn new(ready: bool, passes: usize) -> Self {
        Self {
            ready,
            stage: FrameStage::Idle,
            passes,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Starts a frame with `passes` blur iterations.
    ///
    /// Fails with [`FrameError::NotReady`] if initialization failed and with
    /// [`FrameError::OutOfOrder`] if the previous frame never finished.
    pub fn begin(&mut self, passes: usize) -> Result<(), FrameError> {
        if !self.ready {
            return Err(FrameError::NotReady);
        }
        if self.stage != FrameStage::Idle {
            return Err(FrameError::OutOfOrder {
                from: self.stage,
                to: FrameStage::SceneDrawn,
            });
        }
        self.passes = passes;
        Ok(())
    }

    fn allows(&self, to: FrameStage) -> bool {
        match (self.stage, to) {
            (FrameStage::Idle, FrameStage::SceneDrawn) => true,
            (FrameStage::SceneDrawn, FrameStage::Blurred(1)) => self.passes >= 1,
            (FrameStage::SceneDrawn, FrameStage::Presented) => self.passes == 0,
            (FrameStage::Blurred(k), FrameStage::Blurred(next)) => next == k + 1 && next <= self.passes,
            (FrameStage::Blurred(k), FrameStage::Presented) => k == self.passes,
            (FrameStage::Presented, FrameStage::Idle) => true,
            _ => false,
        }
    }

    /// Moves to `to` if that is the next legal stage.
    pub fn advance(&mut self, to: FrameStage) -> Result<(), FrameError> {
        if !self.ready {
            return Err(FrameError::NotReady);
        }
        if !self.allows(to) {
            return Err(FrameError::OutOfOrder {
                from: self.stage,
                to,
            });
        }
        self.stage = to;
        Ok(())
    }

    /// Abandons the current frame.
    pub fn reset(&mut self) {
        self.stage = FrameStage::Idle;
    }

    pub(crate) fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}

/// Checks that off-screen targets of `width` x `height` can be created.
pub fn validate_targets(
    width: u32,
    height: u32,
    max_dimension: u32,
    features: wgpu::Features,
) -> Result<(), InitError> {
    if width == 0 || height == 0 {
        return Err(InitError::ZeroSizedTarget);
    }
    if width > max_dimension || height > max_dimension {
        return Err(InitError::TargetTooLarge {
            width,
            height,
            max: max_dimension,
        });
    }
    if !is_render_target_format(Texture::COLOUR_FORMAT, features) {
        return Err(InitError::UnsupportedFormat(Texture::COLOUR_FORMAT));
    }
    let depth_usages = Texture::DEPTH_STENCIL_FORMAT
        .guaranteed_format_features(features)
        .allowed_usages;
    if !depth_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
        return Err(InitError::UnsupportedFormat(Texture::DEPTH_STENCIL_FORMAT));
    }
    Ok(())
}

/// Runs `f` inside a validation error scope.
///
/// Anything the device rejects while `f` runs comes back as
/// [`InitError::Pipeline`] instead of reaching the uncaptured error handler.
pub async fn capture_validation<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> Result<T, InitError> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match scope.pop().await {
        None => Ok(value),
        Some(e) => Err(InitError::Pipeline(e)),
    }
}

/// The parts of a [`Context`] a frame is drawn with.
///
/// Built from a window [`Context`] for on-screen frames. Off-screen users
/// fill it in directly and draw with [`SceneRenderer::render_to_view`].
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Format of the view the present pass writes.
    pub target_format: wgpu::TextureFormat,
    /// [width, height] of the off-screen targets.
    pub size: [u32; 2],
    pub texture_layout: &'a wgpu::BindGroupLayout,
    pub camera: &'a CameraResources,
    pub skybox: Option<&'a Skybox>,
    pub config: RendererConfig,
}

impl<'a> From<&'a Context> for RenderContext<'a> {
    fn from(ctx: &'a Context) -> Self {
        Self {
            device: &ctx.device,
            queue: &ctx.queue,
            target_format: ctx.config.format,
            size: [ctx.config.width, ctx.config.height],
            texture_layout: &ctx.texture_layout,
            camera: &ctx.camera,
            skybox: ctx.skybox.as_ref(),
            config: ctx.render_config,
        }
    }
}

#[derive(Debug)]
struct RenderTargets {
    pipelines: Pipelines,
    post: PostResources,
    buffers: ColourBuffers,
    #[allow(unused)]
    scene_texture: Texture,
    scene_texture_group: wgpu::BindGroup,
}

impl RenderTargets {
    async fn new(ctx: RenderContext<'_>) -> Result<Self, InitError> {
        let [width, height] = ctx.size;
        validate_targets(
            width,
            height,
            ctx.device.limits().max_texture_dimension_2d,
            ctx.device.features(),
        )?;

        let post = PostResources::new(ctx.device, width, height);
        let buffers = ColourBuffers::new(ctx.device, ctx.texture_layout, ctx.size)
            .map_err(InitError::Texture)?;

        let checkerboard = image::DynamicImage::ImageRgba8(checkerboard_texture(64, 8));
        let scene_texture = Texture::from_image(ctx.device, ctx.queue, &checkerboard, Some("Scene Texture"))
            .map_err(InitError::Texture)?;
        let scene_texture_group = scene_texture
            .bind_group(ctx.device, ctx.texture_layout, "scene_texture_bind_group")
            .ok_or_else(|| InitError::Texture(anyhow::anyhow!("scene texture has no sampler")))?;

        let pipelines = capture_validation(ctx.device, || {
            Pipelines::new(
                ctx.device,
                ctx.target_format,
                ctx.texture_layout,
                &ctx.camera.bind_group_layout,
                &post.uniform_layout,
            )
        })
        .await?;

        Ok(Self {
            pipelines,
            post,
            buffers,
            scene_texture,
            scene_texture_group,
        })
    }
}

/// Draws the scene off-screen, blurs it and presents it.
///
/// Construction never fails outright: if any target or pipeline can't be
/// created the renderer stays "not ready", the reason is kept in
/// [`init_error`](Self::init_error) and every frame fails with
/// [`FrameError::NotReady`].
#[derive(Debug)]
pub struct SceneRenderer {
    state: FrameState,
    targets: Option<RenderTargets>,
    init_error: Option<InitError>,
    elapsed: Duration,
}

impl SceneRenderer {
    pub async fn new(ctx: RenderContext<'_>) -> Self {
        let passes = ctx.config.post_passes;
        match RenderTargets::new(ctx).await {
            Ok(targets) => Self {
                state: FrameState::new(true, passes),
                targets: Some(targets),
                init_error: None,
                elapsed: Duration::ZERO,
            },
            Err(e) => {
                error!("Scene renderer failed to initialize: {}", e);
                Self {
                    state: FrameState::new(false, passes),
                    targets: None,
                    init_error: Some(e),
                    elapsed: Duration::ZERO,
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready() && self.targets.is_some()
    }

    pub fn init_error(&self) -> Option<&InitError> {
        self.init_error.as_ref()
    }

    pub fn stage(&self) -> FrameStage {
        self.state.stage()
    }

    /// Scene time accumulated by [`update_scene`](Self::update_scene).
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Rebuilds view and projection from the camera and uploads them, along
    /// with the sky orientation.
    pub fn update_scene(&mut self, ctx: &mut Context, dt: Duration) {
        self.elapsed += dt;
        let config = ctx.render_config;
        let projection = &mut ctx.camera.projection;
        projection.fovy = cgmath::Deg(config.fovy).into();
        projection.znear = config.znear;
        projection.zfar = config.zfar;
        ctx.camera.write(&ctx.queue);
        if let Some(skybox) = ctx.skybox.as_mut() {
            skybox.write(&ctx.queue, &ctx.camera.camera, &ctx.camera.projection);
        }
    }

    /// Renders one frame onto the window surface: scene, blur chain, present.
    pub fn render_frame(&mut self, ctx: &Context, render: Render<'_>) -> Result<(), FrameError> {
        if !self.is_ready() {
            return Err(FrameError::NotReady);
        }
        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.render_to_view(ctx.into(), &view, render)?;
        output.present();
        Ok(())
    }

    /// Renders one frame into `view` and submits it.
    ///
    /// Returns the colour buffer the present pass read from. On error the
    /// frame is abandoned and the renderer is back at [`FrameStage::Idle`].
    pub fn render_to_view(
        &mut self,
        ctx: RenderContext<'_>,
        view: &wgpu::TextureView,
        render: Render<'_>,
    ) -> Result<usize, FrameError> {
        self.state.begin(ctx.config.post_passes)?;
        let result = self.record_frame(ctx, view, render);
        if result.is_err() {
            self.state.reset();
        }
        result
    }

    fn record_frame(
        &mut self,
        ctx: RenderContext<'_>,
        view: &wgpu::TextureView,
        render: Render<'_>,
    ) -> Result<usize, FrameError> {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.draw_scene(ctx, &mut encoder, render)?;
        let source = self.draw_post_process(ctx, &mut encoder)?;
        self.present(ctx, &mut encoder, view, source)?;

        ctx.queue.submit(iter::once(encoder.finish()));
        self.state.advance(FrameStage::Idle)?;
        Ok(source)
    }

    fn targets(&self) -> Result<&RenderTargets, FrameError> {
        self.targets.as_ref().ok_or(FrameError::NotReady)
    }

    /// Draws the sky, then `render` into colour buffer 0 with depth testing.
    pub fn draw_scene(
        &mut self,
        ctx: RenderContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        render: Render<'_>,
    ) -> Result<(), FrameError> {
        self.state.advance(FrameStage::SceneDrawn)?;
        let targets = self.targets()?;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.buffers.colour[0].view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.config.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.buffers.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });

        if let Some(skybox) = ctx.skybox {
            skybox.draw(&mut render_pass);
        }
        render_pass.set_pipeline(&targets.pipelines.scene);
        let stage = StageContext {
            camera: &ctx.camera.bind_group,
            texture: &targets.scene_texture_group,
            stage: FrameStage::SceneDrawn,
        };
        render.draw(&stage, &mut render_pass);
        Ok(())
    }

    /// Runs the blur chain and returns the colour buffer holding the result.
    pub fn draw_post_process(
        &mut self,
        ctx: RenderContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<usize, FrameError> {
        let passes = self.state.passes();
        let schedule = blur_schedule(passes);
        let targets = self.targets.as_ref().ok_or(FrameError::NotReady)?;
        targets
            .post
            .write(ctx.queue, targets.buffers.size[0], targets.buffers.size[1]);

        let mut latest = PingPong::new(0usize, 1usize);
        for pass in &schedule {
            debug!(
                "Blur iteration {} {:?}: buffer {} -> {}",
                pass.iteration, pass.axis, pass.source, pass.target
            );
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blur Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.buffers.colour[pass.target].view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            render_pass.set_pipeline(&targets.pipelines.blur);
            render_pass.set_bind_group(0, &targets.buffers.bind_groups[pass.source], &[]);
            render_pass.set_bind_group(1, targets.post.uniform_group(pass.axis), &[]);
            render_pass.set_vertex_buffer(0, targets.post.quad.slice(..));
            render_pass.draw(0..targets.post.quad_vertices, 0..1);
            drop(render_pass);

            latest.apply(pass);
            if pass.axis.is_vertical() {
                self.state.advance(FrameStage::Blurred(pass.iteration + 1))?;
            }
        }
        Ok(*latest.current())
    }

    /// Draws colour buffer `source` onto `view`.
    pub fn present(
        &mut self,
        ctx: RenderContext<'_>,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        source: usize,
    ) -> Result<(), FrameError> {
        self.state.advance(FrameStage::Presented)?;
        let targets = self.targets()?;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Present Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.config.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });
        render_pass.set_pipeline(&targets.pipelines.present);
        render_pass.set_bind_group(0, &targets.buffers.bind_groups[source], &[]);
        // The horizontal uniform carries the same orthographic projection.
        render_pass.set_bind_group(1, &targets.post.uniform_groups[0], &[]);
        render_pass.set_vertex_buffer(0, targets.post.quad.slice(..));
        render_pass.draw(0..targets.post.quad_vertices, 0..1);
        Ok(())
    }

    /// Recreates the colour and depth buffers at `ctx.size`.
    pub fn resize(&mut self, ctx: RenderContext<'_>) {
        let [width, height] = ctx.size;
        if width == 0 || height == 0 {
            warn!("Ignoring resize of the render targets to {}x{}", width, height);
            return;
        }
        let Some(targets) = self.targets.as_mut() else {
            return;
        };
        let rebuilt = validate_targets(
            width,
            height,
            ctx.device.limits().max_texture_dimension_2d,
            ctx.device.features(),
        )
        .and_then(|_| {
            ColourBuffers::new(ctx.device, ctx.texture_layout, [width, height])
                .map_err(InitError::Texture)
        });
        match rebuilt {
            Ok(buffers) => {
                targets.buffers = buffers;
                targets.post.write(ctx.queue, width, height);
                self.state.set_ready(true);
                self.init_error = None;
            }
            Err(e) => {
                error!("Render targets could not be resized: {}", e);
                self.state.set_ready(false);
                self.init_error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(state: &mut FrameState, passes: usize) -> Result<(), FrameError> {
        state.begin(passes)?;
        state.advance(FrameStage::SceneDrawn)?;
        for k in 1..=passes {
            state.advance(FrameStage::Blurred(k))?;
        }
        state.advance(FrameStage::Presented)?;
        state.advance(FrameStage::Idle)
    }

    #[test]
    fn full_frame_returns_to_idle() {
        let mut state = FrameState::new(true, 0);
        for passes in [0, 1, 10] {
            run_frame(&mut state, passes).unwrap();
            assert_eq!(state.stage(), FrameStage::Idle);
        }
    }

    #[test]
    fn skipping_the_blur_is_out_of_order() {
        let mut state = FrameState::new(true, 2);
        state.begin(2).unwrap();
        state.advance(FrameStage::SceneDrawn).unwrap();
        state.advance(FrameStage::Blurred(1)).unwrap();
        assert!(matches!(
            state.advance(FrameStage::Presented),
            Err(FrameError::OutOfOrder {
                from: FrameStage::Blurred(1),
                to: FrameStage::Presented
            })
        ));
    }

    #[test]
    fn unfinished_frame_blocks_the_next() {
        let mut state = FrameState::new(true, 1);
        state.begin(1).unwrap();
        state.advance(FrameStage::SceneDrawn).unwrap();
        assert!(matches!(state.begin(1), Err(FrameError::OutOfOrder { .. })));
        state.reset();
        assert!(state.begin(1).is_ok());
    }

    #[test]
    fn geometry_draws_only_in_the_scene_pass() {
        assert!(FrameStage::SceneDrawn.draws_geometry());
        for stage in [
            FrameStage::Idle,
            FrameStage::Blurred(1),
            FrameStage::Presented,
        ] {
            assert!(!stage.draws_geometry());
        }
    }

    #[test]
    fn pipeline_errors_name_the_cause() {
        let e = InitError::Pipeline(wgpu::Error::Validation {
            source: Box::new(std::fmt::Error),
            description: "entry point vs_main not found".to_owned(),
        });
        assert!(e.to_string().contains("entry point vs_main not found"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn target_validation() {
        let features = wgpu::Features::empty();
        assert!(validate_targets(800, 600, 8192, features).is_ok());
        assert!(matches!(
            validate_targets(0, 600, 8192, features),
            Err(InitError::ZeroSizedTarget)
        ));
        assert!(matches!(
            validate_targets(9000, 600, 8192, features),
            Err(InitError::TargetTooLarge { width: 9000, .. })
        ));
    }

    #[test]
    fn render_counts_drawables() {
        let mut root = MeshNode::new();
        root.add_child(MeshNode::with_geometry(
            crate::data_structures::skinned_mesh::MeshGeometry::with_vertex_count(3, vec![]),
        ));
        let other = MeshNode::with_geometry(
            crate::data_structures::skinned_mesh::MeshGeometry::with_vertex_count(3, vec![]),
        );
        let render = Render::Composed(vec![Render::from(&root), Render::Nodes(vec![&other]), Render::None]);
        assert_eq!(render.drawable_count(), 2);
    }
}
