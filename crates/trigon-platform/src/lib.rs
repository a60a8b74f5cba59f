//! Windowing for trigon.
//!
//! Builds window attributes from configuration and exposes the raw handles
//! the GPU layer needs for surface creation.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use thiserror::Error;
use winit::dpi::LogicalSize;
use winit::window::{Window, WindowAttributes};

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
    #[error("Window handle unavailable: {0}")]
    Handle(#[from] raw_window_handle::HandleError),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Triangle".to_string(),
            width: 800,
            height: 600,
            // The swapchain is never re-created
            resizable: false,
        }
    }
}

impl PlatformConfig {
    /// Window attributes for this configuration.
    pub fn window_attributes(&self) -> WindowAttributes {
        Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_resizable(self.resizable)
    }
}

/// Get raw handles from a window for Vulkan surface creation.
pub fn raw_handles(window: &Window) -> Result<(RawDisplayHandle, RawWindowHandle)> {
    let display = window.display_handle()?.as_raw();
    let window = window.window_handle()?.as_raw();
    Ok((display, window))
}
