//! The viewer: window, input and frame loop around a built scene.
//!
//! Each frame the loop polls input, moves the camera, walks the scene into a
//! [`FrameRecorder`] and replays the recorded draws with the [`ScenePipeline`].
//! Frame timing lives in a [`FrameClock`] owned by the loop.
//!
//! # Controls
//!
//! - `1` captures the cursor, `2` releases it
//! - while captured: mouse to look, `W`/`S`/`A`/`D` to move, `E`/`Q` up and down
//! - `Escape` closes the window

use std::{iter, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use cgmath::{Deg, Point3};
use clap::Parser;
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::{
    camera::{Camera, CameraController},
    context::{Context, InitContext},
    data_structures::{scene_graph::Scene, texture::Texture},
    pipelines::scene::ScenePipeline,
    render::{FrameRecorder, draw_scene},
    resources,
};

/// Everything the viewer can be configured with.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub asset: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub start_position: Point3<f32>,
    /// Camera speed in units per second.
    pub move_speed: f32,
    /// Radians per pixel of mouse motion.
    pub mouse_sensitivity: f32,
    pub clear_colour: wgpu::Color,
    /// How often the window title shows a new frame rate.
    pub title_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            asset: PathBuf::new(),
            width: 1280,
            height: 720,
            fovy: camera.fovy,
            znear: camera.znear,
            zfar: camera.zfar,
            start_position: camera.position,
            move_speed: 1.5,
            mouse_sensitivity: 0.005,
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            title_interval: Duration::from_millis(500),
        }
    }
}

impl ViewerConfig {
    pub fn new(asset: impl Into<PathBuf>) -> Self {
        Self {
            asset: asset.into(),
            ..Default::default()
        }
    }

    fn camera(&self) -> Camera {
        Camera {
            position: self.start_position,
            fovy: self.fovy,
            znear: self.znear,
            zfar: self.zfar,
            aspect: self.width as f32 / self.height.max(1) as f32,
            ..Default::default()
        }
    }
}

/// Command line of the `scene-viewer` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "scene-viewer",
    about = "Fly through a glTF or OBJ asset",
    long_about = "Loads a glTF (.gltf, .glb) or Wavefront (.obj) asset and renders it.\n\n\
        Press 1 to capture the cursor and 2 to release it. While captured, move \
        the mouse to look around, W/S/A/D to move and E/Q to go up and down."
)]
pub struct ViewerArgs {
    /// Asset file to load.
    pub asset: PathBuf,

    /// Initial window width in pixels.
    #[arg(long, default_value_t = 1280, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value_t = 720, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,

    /// Vertical field of view in degrees.
    #[arg(long, default_value_t = 45.0, value_parser = positive)]
    pub fov: f32,

    /// Near clip distance.
    #[arg(long, default_value_t = 0.1, value_parser = positive)]
    pub near: f32,

    /// Far clip distance.
    #[arg(long, default_value_t = 100.0, value_parser = positive)]
    pub far: f32,

    /// Camera speed in units per second.
    #[arg(long, default_value_t = 1.5, value_parser = positive)]
    pub speed: f32,

    /// Mouse sensitivity in radians per pixel.
    #[arg(long, default_value_t = 0.005, value_parser = positive)]
    pub sensitivity: f32,
}

fn positive(value: &str) -> Result<f32, String> {
    let parsed: f32 = value.parse().map_err(|e| format!("{e}"))?;
    if parsed.is_finite() && parsed > 0.0 {
        Ok(parsed)
    } else {
        Err(format!("{value} is not a positive number"))
    }
}

impl ViewerArgs {
    pub fn into_config(self) -> anyhow::Result<ViewerConfig> {
        if self.near >= self.far {
            anyhow::bail!(
                "The near clip distance {} must be smaller than the far clip distance {}",
                self.near,
                self.far
            );
        }
        if self.fov >= 180.0 {
            anyhow::bail!("A field of view of {} degrees is not a perspective", self.fov);
        }
        Ok(ViewerConfig {
            width: self.width,
            height: self.height,
            fovy: Deg(self.fov),
            znear: self.near,
            zfar: self.far,
            move_speed: self.speed,
            mouse_sensitivity: self.sensitivity,
            ..ViewerConfig::new(self.asset)
        })
    }
}

/// Result of one [`FrameClock::tick`].
#[derive(Clone, Debug, PartialEq)]
pub struct FrameTick {
    pub dt: Duration,
    /// New window title, only set once per title interval.
    pub title: Option<String>,
}

/// Frame timing of the loop: time since the last frame and a throttled fps title.
#[derive(Clone, Debug)]
pub struct FrameClock {
    last_frame: Instant,
    last_title: Instant,
    interval: Duration,
}

impl FrameClock {
    pub fn new(start: Instant, interval: Duration) -> Self {
        Self {
            last_frame: start,
            last_title: start,
            interval,
        }
    }

    pub fn tick(&mut self, now: Instant) -> FrameTick {
        let dt = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;

        let mut title = None;
        if now.saturating_duration_since(self.last_title) >= self.interval {
            self.last_title = now;
            let fps = if dt.is_zero() {
                0
            } else {
                (1.0 / dt.as_secs_f64()).round() as u64
            };
            title = Some(format!("fps: {}", fps));
        }
        FrameTick { dt, title }
    }
}

struct ViewerState {
    ctx: Context,
    init: InitContext,
    scene: Scene<InitContext>,
    pipeline: ScenePipeline,
    camera: Camera,
    controller: CameraController,
    clock: FrameClock,
    is_surface_configured: bool,
}

impl ViewerState {
    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.camera.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    fn set_captured(&mut self, captured: bool) {
        let window = self.ctx.window();
        if captured {
            let grabbed = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grabbed {
                log::warn!("Cannot grab the cursor: {}", e);
            }
        } else if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("Cannot release the cursor: {}", e);
        }
        window.set_cursor_visible(!captured);
        self.controller.set_captured(captured);
    }

    fn render(&mut self, clear_colour: wgpu::Color) -> Result<(), wgpu::SurfaceError> {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut recorder = FrameRecorder::new();
        draw_scene(&self.camera, &self.scene, &mut recorder);
        let commands = recorder.into_commands();
        let frame = self.pipeline.prepare(&self.init, &commands);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.pipeline.encode(&mut render_pass, &commands, &frame);
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// The winit application. Builds the scene once the window exists.
pub struct Viewer {
    config: ViewerConfig,
    async_runtime: tokio::runtime::Runtime,
    state: Option<ViewerState>,
    error: Option<anyhow::Error>,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("Cannot start the async runtime")?;
        Ok(Self {
            config,
            async_runtime,
            state: None,
            error: None,
        })
    }

    /// The error that stopped the viewer, if any.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    fn init(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<ViewerState> {
        let window_attributes = Window::default_attributes()
            .with_title(format!("{}", self.config.asset.display()))
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Cannot create the viewer window")?,
        );

        let ctx = self.async_runtime.block_on(Context::new(window))?;
        // The clone leverages the internal Arcs of Device and Queue and thus only clones the ref
        let init = InitContext::from(&ctx);
        let scene = resources::build(&self.config.asset, &init)
            .with_context(|| format!("Cannot build a scene from {:?}", self.config.asset))?;
        let pipeline = ScenePipeline::new(
            &init.device,
            &init.queue,
            ctx.config.format,
            Some(Texture::DEPTH_FORMAT),
        );

        let mut state = ViewerState {
            camera: self.config.camera(),
            controller: CameraController::new(self.config.move_speed, self.config.mouse_sensitivity),
            clock: FrameClock::new(Instant::now(), self.config.title_interval),
            is_surface_configured: false,
            ctx,
            init,
            scene,
            pipeline,
        };
        let size = state.ctx.window().inner_size();
        state.resize(size.width, size.height);
        Ok(state)
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => {
                state.ctx.window().request_redraw();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("{:#}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            state.controller.handle_mouse(dx, dy);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                let pressed = key_state == ElementState::Pressed;
                match (code, pressed) {
                    (KeyCode::Escape, true) => event_loop.exit(),
                    (KeyCode::Digit1, true) => state.set_captured(true),
                    (KeyCode::Digit2, true) => state.set_captured(false),
                    _ => {
                        state.controller.handle_key(code, pressed);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                state.ctx.window().request_redraw();
                let tick = state.clock.tick(Instant::now());
                state.controller.update(&mut state.camera, tick.dt);

                match state.render(self.config.clear_colour) {
                    Ok(()) => {
                        if let Some(title) = tick.title {
                            state.ctx.window().set_title(&title);
                        }
                    }
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window().inner_size();
                        state.resize(size.width, size.height);
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

/// Opens a window on `config.asset` and runs until it is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut viewer = Viewer::new(config)?;
    event_loop.run_app(&mut viewer)?;

    match viewer.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
