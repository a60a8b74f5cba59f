//! Window surface creation.
//!
//! The window itself belongs to the platform layer; only its raw handles are
//! consumed here.

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::capabilities::VulkanProbe;
use crate::error::{GpuError, Result};
use crate::lifecycle::ResourceKind;

/// A presentable surface bound to a window.
pub struct Surface {
    /// The Vulkan surface handle.
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader.
    pub loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Create a surface for the window behind the raw handles.
    ///
    /// # Safety
    /// The instance must be valid and must have been created with the
    /// extensions `ash_window` requires for `display`. The window must
    /// outlive the surface.
    pub unsafe fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<Self> {
        // SAFETY: guaranteed by the caller.
        let surface = unsafe { ash_window::create_surface(entry, instance, display, window, None) }
            .map_err(|result| match result {
                vk::Result::ERROR_EXTENSION_NOT_PRESENT => GpuError::SurfaceCreation(format!(
                    "unsupported window system ({result})"
                )),
                result => GpuError::Creation {
                    resource: ResourceKind::Surface,
                    result,
                },
            })?;

        let loader = ash::khr::surface::Instance::new(entry, instance);
        tracing::debug!("Created window surface");

        Ok(Self { surface, loader })
    }

    /// A capability probe against this surface.
    ///
    /// # Safety
    /// The instance must be the one this surface was created from.
    pub unsafe fn probe<'a>(&'a self, instance: &'a ash::Instance) -> VulkanProbe<'a> {
        // SAFETY: guaranteed by the caller.
        unsafe { VulkanProbe::new(instance, &self.loader, self.surface) }
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// No swapchain may still reference the surface.
    pub unsafe fn destroy(&self) {
        // SAFETY: guaranteed by the caller.
        unsafe { self.loader.destroy_surface(self.surface, None) };
    }
}
