//! Physical device selection.

use ash::vk;
use std::ffi::CStr;

use crate::capabilities::{DeviceProbe, DeviceProperties};
use crate::error::{GpuError, Result};
use crate::queue::{QueueFamilies, QueueFamilyIndices};

/// The chosen physical device and the queue families resolved on it.
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub device: vk::PhysicalDevice,
    pub families: QueueFamilies,
    pub properties: DeviceProperties,
}

/// Why a candidate device was passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No graphics family, no present family, or neither.
    IncompleteQueueFamilies(QueueFamilyIndices),
    /// Required extensions the device does not expose.
    MissingExtensions(Vec<String>),
    /// No surface formats or no present modes for the surface.
    InadequateSwapchain { formats: usize, present_modes: usize },
}

/// Required extension names absent from `available`.
///
/// Matching is exact and case-sensitive.
pub fn missing_extensions(required: &[&CStr], available: &[String]) -> Vec<String> {
    required
        .iter()
        .map(|name| name.to_string_lossy())
        .filter(|name| !available.iter().any(|ext| ext.as_str() == &**name))
        .map(|name| name.into_owned())
        .collect()
}

/// Evaluate the suitability predicate for one device.
///
/// Checks queue families, then extensions, then swapchain support; the
/// swapchain is only queried once the extensions are known to be present.
pub fn check_device<P: DeviceProbe + ?Sized>(
    probe: &P,
    device: vk::PhysicalDevice,
    required_extensions: &[&CStr],
) -> Result<std::result::Result<QueueFamilies, Rejection>> {
    let indices = QueueFamilyIndices::find(probe, device)?;
    let Some(families) = QueueFamilies::from_indices(indices) else {
        return Ok(Err(Rejection::IncompleteQueueFamilies(indices)));
    };

    if !required_extensions.is_empty() {
        let available = probe.device_extensions(device)?;
        let missing = missing_extensions(required_extensions, &available);
        if !missing.is_empty() {
            return Ok(Err(Rejection::MissingExtensions(missing)));
        }
    }

    let support = probe.swapchain_support(device)?;
    if !support.is_adequate() {
        return Ok(Err(Rejection::InadequateSwapchain {
            formats: support.formats.len(),
            present_modes: support.present_modes.len(),
        }));
    }

    Ok(Ok(families))
}

/// Pick the first device in `devices` that satisfies every requirement.
///
/// This is a first-match policy, not a ranking: later devices are never
/// examined once one passes.
pub fn select_physical_device<P: DeviceProbe + ?Sized>(
    probe: &P,
    devices: &[vk::PhysicalDevice],
    required_extensions: &[&CStr],
) -> Result<DeviceSelection> {
    if devices.is_empty() {
        return Err(GpuError::NoDevices);
    }
    tracing::debug!("Found {} physical device(s)", devices.len());

    for &device in devices {
        let properties = probe.properties(device);
        match check_device(probe, device, required_extensions)? {
            Ok(families) => {
                tracing::info!("Selected GPU: {}", properties.summary());
                return Ok(DeviceSelection {
                    device,
                    families,
                    properties,
                });
            }
            Err(rejection) => {
                tracing::info!("Skipping {}: {:?}", properties.device_name, rejection);
            }
        }
    }

    Err(GpuError::NoSuitableDevice)
}
