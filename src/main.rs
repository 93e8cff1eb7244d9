use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, anyhow};
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use terrain3d::config::AppConfig;
use terrain3d::logging;
use terrain3d::renderer::{Camera, DrawOutcome, GpuState, LightingUploader, TerrainRenderer, WgpuBuffer};
use terrain3d::ui::{FrameStats, UiActions, UiState, apply_theme, draw_help_overlay, draw_side_panel};

#[derive(Default)]
struct InputState {
    forward: f32,
    right: f32,
    up: f32,
    mouse_captured: bool,
    mouse_delta: Vec2,
}

struct App {
    config: AppConfig,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    terrain: Option<TerrainRenderer<WgpuBuffer>>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    camera: Camera,
    ui_state: UiState,
    input: InputState,
    stats: FrameStats,
    last_error: Option<String>,

    last_frame: Instant,
    frame_count: u32,
    fps_timer: Instant,

    /// Set when the app must stop; returned from `main`.
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let mut camera = Camera::default();
        apply_camera_config(&mut camera, &config);

        Self {
            ui_state: UiState::from_config(&config),
            config,

            window: None,
            gpu: None,
            terrain: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            camera,
            input: InputState::default(),
            stats: FrameStats::default(),
            last_error: None,

            last_frame: Instant::now(),
            frame_count: 0,
            fps_timer: Instant::now(),

            fatal: None,
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> anyhow::Result<()> {
        let mut gpu = pollster::block_on(GpuState::new(window.clone(), self.config.render.vsync))
            .context("failed to initialise the GPU")?;

        let projection = self.config.render.projection(gpu.aspect());
        let mut terrain = TerrainRenderer::new(&mut gpu.backend, projection)
            .context("failed to create the light marker buffer")?;
        terrain.set_lighting(LightingUploader::with_max_lights(self.config.render.max_lights));
        self.stats.light_limit = terrain.light_limit();

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.backend.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.terrain = Some(terrain);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);
        Ok(())
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.frame_count += 1;
        let elapsed = self.fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            self.stats.fps = self.frame_count as f32 / elapsed;
            self.frame_count = 0;
            self.fps_timer = Instant::now();
        }

        self.camera
            .process_keyboard(self.input.forward, self.input.right, self.input.up, dt);
        if self.input.mouse_captured {
            self.camera.process_mouse_movement(self.input.mouse_delta);
        }
        self.input.mouse_delta = Vec2::ZERO;

        let (Some(gpu), Some(terrain)) = (&mut self.gpu, &mut self.terrain) else {
            return;
        };
        if let Some(params) = self.ui_state.take_regenerate_request() {
            match terrain.generate(&mut gpu.backend, &params) {
                Ok(_) => self.last_error = None,
                Err(error) => {
                    tracing::error!(%error, "terrain regeneration failed, keeping the previous mesh");
                    self.last_error = Some(error.to_string());
                }
            }
        }
        self.stats.ready = terrain.is_ready();
        self.stats.vertex_count = terrain.vertex_count();
        self.stats.height_range = terrain.height_range();
    }

    fn render(&mut self) {
        let (Some(window), Some(egui_state)) = (&self.window, &mut self.egui_state) else {
            return;
        };

        let raw_input = egui_state.take_egui_input(window);
        let camera_pos = self.camera.position;
        let camera_speed = self.camera.move_speed;
        let stats = self.stats;
        let last_error = self.last_error.clone();

        let mut ui_actions = UiActions::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_side_panel(ctx, &mut self.ui_state, &stats, last_error.as_deref());
            draw_help_overlay(ctx, camera_pos, camera_speed);
        });

        self.handle_ui_actions(ui_actions);

        let (Some(gpu), Some(terrain)) = (&mut self.gpu, &mut self.terrain) else {
            return;
        };
        let (Some(window), Some(egui_state), Some(egui_renderer)) =
            (&self.window, &mut self.egui_state, &mut self.egui_renderer)
        else {
            return;
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.size);
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => return,
            Err(error) => {
                self.fatal = Some(anyhow!("surface error: {error}"));
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let camera_view = self.camera.view();
        let lights = &self.ui_state.lights;
        self.stats.lights_uploaded = match terrain.draw_terrain(
            &mut gpu.backend,
            self.ui_state.render_mode,
            &camera_view,
            lights,
        ) {
            DrawOutcome::Drawn { lights, .. } => lights,
            DrawOutcome::NotReady => 0,
        };
        if self.ui_state.show_markers {
            terrain.draw_markers(&mut gpu.backend, &camera_view, lights);
        }

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.backend.device, &gpu.backend.queue, id, &delta);
        }

        let mut encoder = gpu
            .backend
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.backend.device,
            &gpu.backend.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        gpu.render_scene(&view, &mut encoder);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.backend.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        window.request_redraw();
    }

    fn handle_ui_actions(&mut self, actions: UiActions) {
        if let (Some(enabled), Some(gpu)) = (actions.set_vsync, &mut self.gpu) {
            gpu.set_vsync(enabled);
        }

        if let Some(mode) = actions.set_camera_mode {
            self.camera.set_mode(mode);
        }

        if actions.reset_camera {
            self.camera = Camera::default();
            apply_camera_config(&mut self.camera, &self.config);
            self.ui_state.camera_mode = self.camera.mode;
        }
    }

    fn release_cursor(&mut self) {
        self.input.mouse_captured = false;
        if let Some(window) = &self.window {
            let _ = window.set_cursor_grab(winit::window::CursorGrabMode::None);
            window.set_cursor_visible(true);
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        let value = if pressed { 1.0 } else { 0.0 };

        match key {
            KeyCode::KeyW => self.input.forward = value,
            KeyCode::KeyS => self.input.forward = -value,
            KeyCode::KeyA => self.input.right = -value,
            KeyCode::KeyD => self.input.right = value,
            KeyCode::Space => self.input.up = value,
            KeyCode::ShiftLeft => self.input.up = -value,
            KeyCode::KeyR if pressed => self.ui_state.request_regenerate(),
            KeyCode::Escape if pressed => self.release_cursor(),
            _ => {}
        }
    }
}

fn apply_camera_config(camera: &mut Camera, config: &AppConfig) {
    camera.fov = config.camera.fov_degrees.to_radians();
    camera.look_at(config.camera.position, config.camera.target);
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("Terrain 3D")
            .with_inner_size(PhysicalSize::new(1600, 900));

        let result = event_loop
            .create_window(window_attrs)
            .context("failed to create the window")
            .and_then(|window| self.init_gpu(Arc::new(window)));

        if let Err(error) = result {
            self.fatal = Some(error);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let (Some(egui_state), Some(window)) = (&mut self.egui_state, &self.window) {
            if egui_state.on_window_event(window, &event).consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                    if self.config.render.aspect.is_none() {
                        if let Some(terrain) = &mut self.terrain {
                            terrain.set_aspect(gpu.aspect());
                        }
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.handle_key(key, event.state == ElementState::Pressed);
                }
            }

            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                if state == ElementState::Pressed {
                    self.input.mouse_captured = true;
                    if let Some(window) = &self.window {
                        let _ = window.set_cursor_grab(winit::window::CursorGrabMode::Confined);
                        window.set_cursor_visible(false);
                    }
                } else {
                    self.release_cursor();
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.camera.process_scroll(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.update();
                self.render();
                if self.fatal.is_some() {
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: winit::event::DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.input.mouse_captured {
                self.input.mouse_delta.x += delta.0 as f32;
                self.input.mouse_delta.y += delta.1 as f32;
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let cwd = std::env::current_dir().context("cannot read the working directory")?;
    let config_path = AppConfig::locate(std::env::args().skip(1), &cwd);
    let config = AppConfig::load_or_default(config_path.as_deref())?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
