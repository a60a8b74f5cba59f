//! Application runner and event loop.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trigon_gpu::RenderContext;
use trigon_platform::{raw_handles, PlatformError};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::AppConfig;
use crate::shaders::ShaderSet;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. Later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

/// Open the window, build the render context, run until the window closes,
/// then tear everything down.
///
/// The first setup error stops the event loop and is returned after the
/// resources created so far have been released.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    init_logging();

    info!("{} starting...", config.app_name);

    let shaders = ShaderSet::load(&config.vertex_shader, &config.fragment_shader)?;

    let event_loop = EventLoop::new()
        .map_err(|e| PlatformError::EventLoop(e.to_string()))
        .context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut runner = AppRunner {
        config,
        shaders,
        state: None,
        error: None,
    };

    event_loop
        .run_app(&mut runner)
        .map_err(|e| PlatformError::EventLoop(e.to_string()))
        .context("Event loop failed")?;

    // Covers loop exits that skipped CloseRequested
    if let Some(state) = runner.state.take() {
        state.teardown();
    }

    match runner.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner {
    config: AppConfig,
    shaders: ShaderSet,
    state: Option<AppState>,
    error: Option<anyhow::Error>,
}

/// Live window and the context rendering into it.
struct AppState {
    // Declared first so it drops before the window its surface refers to
    context: RenderContext,
    window: Window,
}

impl AppState {
    fn teardown(mut self) {
        info!("Tearing down render context");
        self.context.teardown();
        drop(self.context);
        drop(self.window);
        info!("Cleanup complete");
    }
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.error.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready");
            }
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(state) = self.state.take() {
                    state.teardown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                // The swapchain keeps its initial extent.
                tracing::debug!("Ignoring resize to {}x{}", size.width, size.height);
            }
            _ => {}
        }
    }
}

impl AppRunner {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        info!("Creating window");
        let window = event_loop
            .create_window(self.config.platform_config().window_attributes())
            .map_err(|e| PlatformError::WindowCreation(e.to_string()))
            .context("Failed to create window")?;

        info!("Initializing render context");
        let (display, window_handle) = raw_handles(&window).context("Failed to get window handles")?;
        // SAFETY: the window is stored next to the context and dropped after it.
        let context = unsafe {
            RenderContext::new(
                &self.config.render_config(),
                display,
                window_handle,
                &self.shaders.vertex,
                &self.shaders.fragment,
            )
        }
        .context("Failed to initialize render context")?;

        if let Some(selection) = context.selection() {
            info!("GPU: {}", selection.properties.summary());
        }

        Ok(AppState { context, window })
    }
}
