// SPDX-License-Identifier: MIT OR Apache-2.0
//! Window, GPU setup and the event loop.

use crate::config::{ConfigError, DrawingConfig, RendererConfig};
use crate::cube_drawing::CubeDrawing;
use crate::drawing::{Drawing, DrawingError, DrawingRunner};
use crate::metrics::WindowMetrics;
use crate::renderer::{self, SceneRenderer, MSAA_SAMPLES};
use crate::stats::FrameStats;
use egui_wgpu::wgpu;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Window creation failed
    #[error("Failed to create window: {0}")]
    WindowCreation(String),

    /// Renderer initialization failed
    #[error("Failed to initialize renderer: {0}")]
    RendererInit(String),

    /// Event loop error
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// The drawing failed
    #[error("Drawing error: {0}")]
    Drawing(#[from] DrawingError),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Pick a composite alpha mode, preferring a blending one for transparent surfaces
fn choose_alpha_mode(supported: &[wgpu::CompositeAlphaMode], transparent: bool) -> wgpu::CompositeAlphaMode {
    let preferred: &[wgpu::CompositeAlphaMode] = if transparent {
        &[
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
    } else {
        &[wgpu::CompositeAlphaMode::Opaque]
    };
    preferred
        .iter()
        .copied()
        .find(|mode| supported.contains(mode))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Graphics state for wgpu rendering
struct GraphicsState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_renderer: egui_wgpu::Renderer,
    scene_renderer: SceneRenderer,
}

impl GraphicsState {
    fn new(window: Arc<Window>, renderer: &RendererConfig, size: [u32; 2]) -> Result<Self> {

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| AppError::RendererInit(format!("surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| AppError::RendererInit("no suitable GPU adapter".to_string()))?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Vignette Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .map_err(|e| AppError::RendererInit(format!("device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| AppError::RendererInit("surface reports no formats".to_string()))?;

        let alpha_mode = choose_alpha_mode(&surface_caps.alpha_modes, renderer.alpha);
        if renderer.alpha && alpha_mode == wgpu::CompositeAlphaMode::Opaque {
            tracing::warn!("Transparent surface requested but not supported");
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size[0].max(1),
            height: size[1].max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sample_count = if renderer.antialias {
            let flags = adapter.get_texture_format_features(surface_format).flags;
            if flags.sample_count_supported(MSAA_SAMPLES) {
                MSAA_SAMPLES
            } else {
                tracing::warn!("{}x MSAA unsupported for {:?}, anti-aliasing disabled", MSAA_SAMPLES, surface_format);
                1
            }
        } else {
            1
        };

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);
        let scene_renderer = SceneRenderer::new(&device, surface_format, [config.width, config.height], sample_count);

        tracing::info!(
            "Surface {:?} {}x{}, {} sample(s), alpha {:?}",
            surface_format,
            config.width,
            config.height,
            sample_count,
            alpha_mode
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            egui_renderer,
            scene_renderer,
        })
    }

    fn resize(&mut self, size: [u32; 2]) {
        if size[0] > 0 && size[1] > 0 {
            self.config.width = size[0];
            self.config.height = size[1];
            self.surface.configure(&self.device, &self.config);
            self.scene_renderer.resize(&self.device, size);
        }
    }

    fn render(
        &mut self,
        egui_ctx: &egui::Context,
        full_output: egui::FullOutput,
        runner: &DrawingRunner<CubeDrawing>,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Vignette Encoder"),
        });

        let ctx = runner.context();
        let premultiplied = self.config.alpha_mode == wgpu::CompositeAlphaMode::PreMultiplied;
        let clear = renderer::clear_color(ctx.renderer(), self.scene_renderer.is_srgb(), premultiplied);
        self.scene_renderer
            .render(&self.device, &self.queue, &mut encoder, &view, ctx, clear);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Egui Render Pass"),
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
                })
                .forget_lifetime();

            self.egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        Ok(())
    }
}

/// Running state of the application
struct AppRunning {
    window: Arc<Window>,
    graphics: GraphicsState,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    runner: DrawingRunner<CubeDrawing>,
    stats: FrameStats,
    last_frame: Instant,
}

impl AppRunning {
    /// Device pixels per logical point
    fn pixel_ratio(&self) -> f32 {
        self.runner
            .context()
            .renderer()
            .pixel_ratio
            .unwrap_or(self.window.scale_factor() as f32)
    }

    fn logical_size(&self) -> (f32, f32) {
        let size = self.window.inner_size();
        let scale = self.window.scale_factor() as f32;
        (size.width as f32 / scale, size.height as f32 / scale)
    }

    fn apply_pixel_ratio(&self) {
        let native = self.window.scale_factor() as f32;
        self.egui_ctx.set_zoom_factor(self.pixel_ratio() / native);
    }

    /// Drawing buffer size for the current metrics
    fn buffer_size(&self) -> [u32; 2] {
        let ctx = self.runner.context();
        ctx.renderer().buffer_size(&ctx.metrics)
    }

    fn handle_resize(&mut self) -> Result<()> {
        self.apply_pixel_ratio();
        let (width, height) = self.logical_size();
        let ratio = self.pixel_ratio();
        self.runner.resize(width, height, ratio)?;

        let size = self.buffer_size();
        tracing::debug!("Drawing buffer {}x{}", size[0], size[1]);
        self.graphics.resize(size);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.stats.record(delta_time);

        self.runner.frame(delta_time)?;

        let show_stats = self.runner.context().renderer().show_stats;
        let timeline = self.runner.drawing().timeline();

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.runner.ui(ctx);
            if show_stats {
                let guard = timeline.as_ref().map(|handle| handle.lock());
                self.stats.show(ctx, &self.runner.context().camera, guard.as_deref());
            }
        });

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output.clone());

        match self.graphics.render(&self.egui_ctx, full_output, &self.runner) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("Surface lost, reconfiguring");
                let size = self.buffer_size();
                self.graphics.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("Out of GPU memory!");
                event_loop.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("Surface timeout");
            }
        }

        self.window.request_redraw();
        Ok(())
    }
}

/// The Vignette application
pub struct VignetteApp {
    config: DrawingConfig,
    running: Option<AppRunning>,
    error: Option<AppError>,
}

impl VignetteApp {
    /// Create an application for `config`
    pub fn new(config: DrawingConfig) -> Self {
        Self {
            config,
            running: None,
            error: None,
        }
    }

    /// Run the application until the window closes
    pub fn run(config: DrawingConfig) -> Result<()> {
        config.validate()?;

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = VignetteApp::new(config);
        event_loop.run_app(&mut app)?;

        match app.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<AppRunning> {
        let renderer = &self.config.renderer;
        let [width, height] = renderer.initial_window_size();

        tracing::info!("Creating window '{}'...", renderer.canvas_id);

        let window_attrs = Window::default_attributes()
            .with_title(renderer.canvas_id.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height))
            .with_resizable(!renderer.is_fixed_size())
            .with_transparent(renderer.alpha);

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| AppError::WindowCreation(e.to_string()))?,
        );

        let scale = window.scale_factor() as f32;
        let physical = window.inner_size();
        let pixel_ratio = renderer.pixel_ratio.unwrap_or(scale);
        let metrics = WindowMetrics::new(
            physical.width as f32 / scale,
            physical.height as f32 / scale,
            pixel_ratio,
        );

        tracing::info!("Initializing graphics...");
        let graphics = GraphicsState::new(window.clone(), renderer, renderer.buffer_size(&metrics))?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2 * 1024),
        );

        let mut runner = DrawingRunner::new(self.config.clone(), metrics, CubeDrawing::new())?;
        runner.initialize()?;

        let running = AppRunning {
            window,
            graphics,
            egui_ctx,
            egui_state,
            runner,
            stats: FrameStats::new(),
            last_frame: Instant::now(),
        };
        running.apply_pixel_ratio();

        tracing::info!("Window size: {:?}", running.window.inner_size());
        Ok(running)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AppError) {
        tracing::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for VignetteApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        let response = running.egui_state.on_window_event(&running.window, &event);
        if response.consumed {
            return;
        }

        let result = match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting...");
                event_loop.exit();
                Ok(())
            }
            WindowEvent::Resized(new_size) => {
                tracing::debug!("Window resized to {:?}", new_size);
                let result = running.handle_resize();
                running.window.request_redraw();
                result
            }
            WindowEvent::ScaleFactorChanged { .. } => running.handle_resize(),
            WindowEvent::RedrawRequested => running.redraw(event_loop),
            _ => Ok(()),
        };

        if let Err(error) = result {
            self.fail(event_loop, error);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::CompositeAlphaMode;

    #[test]
    fn test_alpha_mode_prefers_premultiplied() {
        let supported = [
            CompositeAlphaMode::Opaque,
            CompositeAlphaMode::PostMultiplied,
            CompositeAlphaMode::PreMultiplied,
        ];
        assert_eq!(choose_alpha_mode(&supported, true), CompositeAlphaMode::PreMultiplied);
        assert_eq!(choose_alpha_mode(&supported, false), CompositeAlphaMode::Opaque);
    }

    #[test]
    fn test_alpha_mode_falls_back() {
        let supported = [CompositeAlphaMode::Inherit];
        assert_eq!(choose_alpha_mode(&supported, true), CompositeAlphaMode::Inherit);
        assert_eq!(choose_alpha_mode(&[], false), CompositeAlphaMode::Auto);
    }

    #[test]
    fn test_app_starts_without_window() {
        let app = VignetteApp::new(DrawingConfig::default());
        assert!(app.running.is_none());
        assert!(app.error.is_none());
    }
}
