//! GPU capability detection.
//!
//! [`DeviceProbe`] is the read-only query surface that queue resolution and
//! device selection are written against. [`VulkanProbe`] answers it from the
//! driver; nothing is cached, so every call re-queries.

use ash::vk;
use std::ffi::CStr;

use crate::error::{GpuError, Result};

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Descriptive properties of a physical device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    /// Device name
    pub device_name: String,
    /// GPU vendor
    pub vendor: GpuVendor,
    /// Discrete, integrated, virtual, ...
    pub device_type: vk::PhysicalDeviceType,
    /// Vulkan API version
    pub api_version: u32,
    /// Driver version
    pub driver_version: u32,
    pub supports_geometry_shader: bool,
}

impl DeviceProperties {
    /// Get a human-readable summary of the device.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{}",
            self.device_name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }
}

/// Surface capabilities, formats and present modes for one device + surface pair.
#[derive(Debug, Clone, Default)]
pub struct SwapchainSupportDetails {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats, in driver order.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes, in driver order.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// A swapchain can be built only if at least one format and one present mode exist.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Read-only capability queries against physical devices.
pub trait DeviceProbe {
    /// Basic device properties and features.
    fn properties(&self, device: vk::PhysicalDevice) -> DeviceProperties;

    /// Queue families in index order.
    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;

    /// Whether `family` on `device` can present to the probed surface.
    fn supports_present(&self, device: vk::PhysicalDevice, family: u32) -> Result<bool>;

    /// Names of the device-level extensions the driver exposes.
    fn device_extensions(&self, device: vk::PhysicalDevice) -> Result<Vec<String>>;

    /// Swapchain support of `device` for the probed surface.
    fn swapchain_support(&self, device: vk::PhysicalDevice) -> Result<SwapchainSupportDetails>;
}

/// [`DeviceProbe`] backed by a live instance and surface.
pub struct VulkanProbe<'a> {
    instance: &'a ash::Instance,
    surface_loader: &'a ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
}

impl<'a> VulkanProbe<'a> {
    /// Create a probe for `surface`.
    ///
    /// # Safety
    /// The instance, loader and surface must be valid for the probe's lifetime.
    pub unsafe fn new(
        instance: &'a ash::Instance,
        surface_loader: &'a ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Self {
        Self {
            instance,
            surface_loader,
            surface,
        }
    }
}

impl DeviceProbe for VulkanProbe<'_> {
    fn properties(&self, device: vk::PhysicalDevice) -> DeviceProperties {
        // SAFETY: the instance is valid and `device` was enumerated from it.
        let (properties, features) = unsafe {
            (
                self.instance.get_physical_device_properties(device),
                self.instance.get_physical_device_features(device),
            )
        };

        // SAFETY: the driver NUL-terminates device_name.
        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        let props = DeviceProperties {
            device_name,
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_type: properties.device_type,
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            supports_geometry_shader: features.geometry_shader == vk::TRUE,
        };
        tracing::debug!(
            "Device properties: {} (vendor 0x{:04x}, geometry shader: {})",
            props.summary(),
            properties.vendor_id,
            props.supports_geometry_shader
        );
        props
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        // SAFETY: the instance is valid and `device` was enumerated from it.
        let families = unsafe {
            self.instance
                .get_physical_device_queue_family_properties(device)
        };
        for (i, family) in families.iter().enumerate() {
            tracing::debug!(
                "Queue family {i}: count {} flags {:?}",
                family.queue_count,
                family.queue_flags
            );
        }
        families
    }

    fn supports_present(&self, device: vk::PhysicalDevice, family: u32) -> Result<bool> {
        // SAFETY: device, family index and surface all belong to this instance.
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(device, family, self.surface)
        }
        .map_err(GpuError::query("vkGetPhysicalDeviceSurfaceSupportKHR"))
    }

    fn device_extensions(&self, device: vk::PhysicalDevice) -> Result<Vec<String>> {
        // SAFETY: the instance is valid and `device` was enumerated from it.
        let extensions = unsafe { self.instance.enumerate_device_extension_properties(device) }
            .map_err(GpuError::query("vkEnumerateDeviceExtensionProperties"))?;

        let names: Vec<String> = extensions
            .iter()
            .map(|ext| {
                // SAFETY: the driver NUL-terminates extension_name.
                unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        tracing::debug!("Device extensions: {}", names.join(" "));
        Ok(names)
    }

    fn swapchain_support(&self, device: vk::PhysicalDevice) -> Result<SwapchainSupportDetails> {
        // SAFETY: device and surface belong to this instance.
        let details = unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(device, self.surface)
                .map_err(GpuError::query("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?;

            let formats = self
                .surface_loader
                .get_physical_device_surface_formats(device, self.surface)
                .map_err(GpuError::query("vkGetPhysicalDeviceSurfaceFormatsKHR"))?;

            let present_modes = self
                .surface_loader
                .get_physical_device_surface_present_modes(device, self.surface)
                .map_err(GpuError::query("vkGetPhysicalDeviceSurfacePresentModesKHR"))?;

            SwapchainSupportDetails {
                capabilities,
                formats,
                present_modes,
            }
        };
        tracing::debug!(
            "Swapchain support: {} formats, {} present modes",
            details.formats.len(),
            details.present_modes.len()
        );
        Ok(details)
    }
}

/// In-memory probe for exercising resolution and selection without a driver.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use ash::vk::Handle;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// One fake physical device.
    #[derive(Clone, Default)]
    pub struct MockDevice {
        pub name: String,
        pub families: Vec<vk::QueueFamilyProperties>,
        /// Families able to present.
        pub present_families: Vec<u32>,
        pub extensions: Vec<String>,
        pub support: SwapchainSupportDetails,
        /// Make the present-support query fail.
        pub fail_present_query: bool,
    }

    impl MockDevice {
        /// A device with one graphics+present family, the swapchain extension and
        /// a usable surface.
        pub fn suitable(name: &str) -> Self {
            Self {
                name: name.to_string(),
                families: vec![family(vk::QueueFlags::GRAPHICS, 1)],
                present_families: vec![0],
                extensions: vec!["VK_KHR_swapchain".to_string()],
                support: SwapchainSupportDetails {
                    capabilities: vk::SurfaceCapabilitiesKHR::default(),
                    formats: vec![vk::SurfaceFormatKHR {
                        format: vk::Format::B8G8R8A8_UNORM,
                        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                    }],
                    present_modes: vec![vk::PresentModeKHR::FIFO],
                },
                fail_present_query: false,
            }
        }
    }

    pub fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    /// Probe over a list of fake devices, handles `1..=n` in list order.
    #[derive(Default)]
    pub struct MockProbe {
        devices: HashMap<u64, MockDevice>,
        order: Vec<vk::PhysicalDevice>,
        /// Every (device, family) present query issued, in order.
        pub present_queries: RefCell<Vec<(u64, u32)>>,
        /// Devices whose swapchain support was queried.
        pub support_queries: RefCell<Vec<u64>>,
    }

    impl MockProbe {
        pub fn new(devices: Vec<MockDevice>) -> Self {
            let mut probe = Self::default();
            for (i, device) in devices.into_iter().enumerate() {
                let raw = i as u64 + 1;
                probe.order.push(vk::PhysicalDevice::from_raw(raw));
                probe.devices.insert(raw, device);
            }
            probe
        }

        /// Handles in enumeration order.
        pub fn handles(&self) -> Vec<vk::PhysicalDevice> {
            self.order.clone()
        }

        fn get(&self, device: vk::PhysicalDevice) -> &MockDevice {
            &self.devices[&device.as_raw()]
        }
    }

    impl DeviceProbe for MockProbe {
        fn properties(&self, device: vk::PhysicalDevice) -> DeviceProperties {
            DeviceProperties {
                device_name: self.get(device).name.clone(),
                vendor: GpuVendor::Other(0),
                device_type: vk::PhysicalDeviceType::OTHER,
                api_version: vk::API_VERSION_1_0,
                driver_version: 0,
                supports_geometry_shader: false,
            }
        }

        fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
            self.get(device).families.clone()
        }

        fn supports_present(&self, device: vk::PhysicalDevice, family: u32) -> Result<bool> {
            self.present_queries
                .borrow_mut()
                .push((device.as_raw(), family));
            let mock = self.get(device);
            if mock.fail_present_query {
                return Err(GpuError::Query {
                    query: "vkGetPhysicalDeviceSurfaceSupportKHR",
                    result: vk::Result::ERROR_SURFACE_LOST_KHR,
                });
            }
            Ok(mock.present_families.contains(&family))
        }

        fn device_extensions(&self, device: vk::PhysicalDevice) -> Result<Vec<String>> {
            Ok(self.get(device).extensions.clone())
        }

        fn swapchain_support(
            &self,
            device: vk::PhysicalDevice,
        ) -> Result<SwapchainSupportDetails> {
            self.support_queries.borrow_mut().push(device.as_raw());
            Ok(self.get(device).support.clone())
        }
    }
}
