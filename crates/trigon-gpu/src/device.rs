//! Logical device creation.

use ash::vk;
use std::ffi::{c_char, CStr};

use crate::error::{GpuError, Result};
use crate::lifecycle::ResourceKind;
use crate::queue::QueueFamilies;
use crate::selector::DeviceSelection;

/// The logical device and the queues retrieved from it.
///
/// Queue handles are owned by the device and share its lifetime.
pub struct LogicalDevice {
    pub device: ash::Device,
    pub families: QueueFamilies,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

impl LogicalDevice {
    /// Create the logical device for a selected GPU.
    ///
    /// One queue is requested from each distinct family; a shared
    /// graphics/present family yields a single request.
    ///
    /// # Safety
    /// The instance must be valid and `selection` must come from it.
    pub unsafe fn new(
        instance: &ash::Instance,
        selection: &DeviceSelection,
        extensions: &[&CStr],
    ) -> Result<Self> {
        let families = selection.families;

        let queue_priority = 1.0_f32;
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(std::slice::from_ref(&queue_priority))
            })
            .collect();

        let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        // SAFETY: the physical device was enumerated from this instance.
        let device = unsafe { instance.create_device(selection.device, &create_info, None) }
            .map_err(GpuError::creation(ResourceKind::Device))?;

        // SAFETY: both families were requested with one queue each.
        let (graphics_queue, present_queue) = unsafe {
            (
                device.get_device_queue(families.graphics, 0),
                device.get_device_queue(families.present, 0),
            )
        };

        tracing::debug!(
            "Created logical device ({} queue families, {} extensions)",
            queue_create_infos.len(),
            extension_names.len()
        );

        Ok(Self {
            device,
            families,
            graphics_queue,
            present_queue,
        })
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        // SAFETY: the device is live for as long as self.
        unsafe { self.device.device_wait_idle() }.map_err(GpuError::query("vkDeviceWaitIdle"))
    }

    /// Destroy the device.
    ///
    /// # Safety
    /// Every object created from the device must already be destroyed.
    pub unsafe fn destroy(&self) {
        // SAFETY: guaranteed by the caller.
        unsafe { self.device.destroy_device(None) };
    }
}
