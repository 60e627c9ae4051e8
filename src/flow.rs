//! Flow control and application event loop.
//!
//! A "flow" owns part of the scene: it reacts to window input, advances its
//! simulation (skinning, physics) and hands a [`Render`] to the engine each
//! frame. The engine owns the GPU [`Context`] and the [`SceneRenderer`] that
//! turns those renders into a blurred frame.
//!
//! # Lifecycle
//!
//! Each frame:
//! 1. Distribute window events to all flows (`on_window_events`)
//! 2. Advance the flows (`on_update`)
//! 3. Upload camera and projection (`SceneRenderer::update_scene`)
//! 4. Let every flow rewrite its dirty vertex buffers (`write_to_buffers`)
//! 5. Collect the flows' renders and draw scene, blur chain and present

use std::{fmt::Debug, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::RendererConfig,
    context::{Context, InitContext},
    error::FrameError,
    render::{Render, SceneRenderer},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Anything that keeps CPU-side vertex data mirrored in GPU buffers.
pub trait BufferWriter {
    /// Writes all data changed since the last call to its GPU buffers.
    fn write_to_buffers(&mut self, queue: &wgpu::Queue);
}

impl<T: BufferWriter> BufferWriter for Vec<T> {
    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.iter_mut().for_each(|w| w.write_to_buffers(queue));
    }
}

/// Trait for implementing a part of the scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after all flows were constructed
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame, before any buffer is written
/// 4. `write_to_buffers()` uploads whatever `on_update()` changed
/// 5. `on_render()` is called each frame and specifies how to render `self`
pub trait GraphicsFlow: BufferWriter {
    /// The only place to modify the Context, e.g. the camera start position
    /// or the [`RendererConfig`].
    fn on_init(&mut self, ctx: &mut Context);

    /// Called every frame with the elapsed time `dt`.
    fn on_update(&mut self, ctx: &Context, dt: Duration);

    fn on_window_events(&mut self, _ctx: &Context, _event: &WindowEvent) {}

    /// Return renderable objects for this flow.
    fn on_render(&self) -> Render<'_>;
}

impl Debug for dyn GraphicsFlow + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// A flow constructor.
///
/// Takes an [`InitContext`] and asynchronously returns a boxed
/// [`GraphicsFlow`], so flows can create their GPU buffers up front.
pub type FlowConstructor =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow>>>>>;

/// GPU context plus the renderer drawing into it.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    renderer: SceneRenderer,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: RendererConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        let renderer = SceneRenderer::new((&ctx).into()).await;
        Ok(Self {
            ctx,
            renderer,
            is_surface_configured: true,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.renderer.resize((&self.ctx).into());
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, flows: &mut [Box<dyn GraphicsFlow>], dt: Duration) -> Result<(), FrameError> {
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }

        flows.iter_mut().for_each(|f| f.on_update(&self.ctx, dt));
        self.renderer.update_scene(&mut self.ctx, dt);
        flows
            .iter_mut()
            .for_each(|f| f.write_to_buffers(&self.ctx.queue));

        let render = Render::Composed(flows.iter().map(|f| f.on_render()).collect());
        self.renderer.render_frame(&self.ctx, render)
    }
}

async fn initialize(
    window: Arc<Window>,
    config: RendererConfig,
    constructors: Vec<FlowConstructor>,
) -> anyhow::Result<(AppState, Vec<Box<dyn GraphicsFlow>>)> {
    let app_state = AppState::new(window, config).await?;
    if let Some(e) = app_state.renderer.init_error() {
        anyhow::bail!("the scene renderer is not ready: {}", e);
    }

    let mut flows = Vec::with_capacity(constructors.len());
    for constructor in constructors {
        // InitContext only clones the internal Arcs of device and queue
        flows.push(constructor((&app_state.ctx).into()).await);
    }
    Ok((app_state, flows))
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized {
        state: AppState,
        flows: Vec<Box<dyn GraphicsFlow>>,
    },
    #[allow(dead_code)]
    Failed(anyhow::Error),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    config: RendererConfig,
    state: Option<AppState>,
    graphics_flows: Vec<Box<dyn GraphicsFlow>>,
    // Taken on the first `resumed`
    constructors: Option<Vec<FlowConstructor>>,
    init_error: Option<anyhow::Error>,
    last_time: Instant,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        constructors: Vec<FlowConstructor>,
        config: RendererConfig,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            init_error: None,
            last_time: Instant::now(),
        })
    }

    fn on_initialized(&mut self, mut state: AppState, flows: Vec<Box<dyn GraphicsFlow>>) {
        self.graphics_flows = flows;
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);
        self.graphics_flows
            .iter_mut()
            .for_each(|flow| flow.on_init(&mut state.ctx));
        state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(state);
    }

    fn on_failed(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        log::error!("Initialization failed, no frame will be rendered: {:#}", e);
        self.init_error = Some(e);
        event_loop.exit();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("skinpost-ngin");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.on_failed(event_loop, e.into()),
        };

        let init_future = initialize(window, self.config, constructors);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((state, flows)) => self.on_initialized(state, flows),
                Err(e) => self.on_failed(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => FlowEvent::Failed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop closed before initialization finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized { state, flows } => self.on_initialized(state, flows),
            FlowEvent::Failed(e) => self.on_failed(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        self.graphics_flows
            .iter_mut()
            .for_each(|f| f.on_window_events(&state.ctx, &event));

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                match state.render(&mut self.graphics_flows, dt) {
                    Ok(()) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(FrameError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(FrameError::NotReady) => {
                        log::warn!("Skipping frame, the renderer is not ready");
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Runs the event loop until the window is closed.
///
/// Fails if the GPU context or the renderer could not be initialized. In
/// that case no frame is ever rendered.
pub fn run(constructors: Vec<FlowConstructor>, config: RendererConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, constructors, config)?;
    event_loop.run_app(&mut app)?;

    match app.init_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
