use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, Projection},
    config::RendererConfig,
    data_structures::texture::texture_layout,
    skybox::Skybox,
};

/// GPU device, window surface and the state shared by every flow.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    /// Layout of every texture + sampler bind group (group 0).
    pub texture_layout: wgpu::BindGroupLayout,
    pub render_config: RendererConfig,
    /// Drawn behind the scene when set, typically from `GraphicsFlow::on_init`.
    pub skybox: Option<Skybox>,
}

impl Context {
    pub async fn new(window: Arc<Window>, render_config: RendererConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colour and expect an Srgb surface
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("no supported surface formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // right/left, height, forward/backward - yaw - pitch
        let camera = Camera::new((0.0, 30.0, 20.0), cgmath::Deg(-90.0), cgmath::Deg(-40.0));
        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(render_config.fovy),
            render_config.znear,
            render_config.zfar,
        );
        let camera = CameraResources::new(&device, camera, projection);
        let texture_layout = texture_layout(&device);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            camera,
            texture_layout,
            render_config,
            skybox: None,
        })
    }

    /// Reconfigures the surface. Returns `false` and leaves everything untouched for a zero size.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            log::warn!("Ignoring surface resize to {}x{}", width, height);
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.camera.projection.resize(width, height);
        self.surface.configure(&self.device, &self.config);
        true
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

/// The parts of the [`Context`] flows need while they are constructed.
///
/// Device and queue are reference counted internally, so cloning them is cheap.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub texture_layout: wgpu::BindGroupLayout,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            config: ctx.config.clone(),
            texture_layout: ctx.texture_layout.clone(),
        }
    }
}
