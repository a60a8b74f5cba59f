//! Vulkan instance creation.

use ash::vk;
use raw_window_handle::RawDisplayHandle;
use std::ffi::{c_char, CStr, CString};

use crate::debug::messenger_create_info;
use crate::error::{GpuError, Result};
use crate::lifecycle::ResourceKind;

/// Standard Khronos validation layer.
pub const KHRONOS_VALIDATION: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Validation layers to enable in debug builds.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![KHRONOS_VALIDATION]
}

/// Device extensions every selected GPU must expose.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![ash::khr::swapchain::NAME]
}

/// Owned UTF-8 copies of `names`.
pub fn owned_names(names: &[&CStr]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

/// Instance extensions needed to present to `display`, plus debug utils when
/// requested.
pub fn required_instance_extensions(
    display: RawDisplayHandle,
    debug_utils: bool,
) -> Result<Vec<*const c_char>> {
    let mut extensions = ash_window::enumerate_required_extensions(display)
        .map_err(GpuError::query("vkEnumerateRequiredExtensions"))?
        .to_vec();

    if debug_utils {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    extensions.push(ash::khr::portability_enumeration::NAME.as_ptr());

    Ok(extensions)
}

/// Names in `requested` that are not among the installed instance layers.
pub fn missing_layers(requested: &[&CStr], available: &[vk::LayerProperties]) -> Vec<String> {
    requested
        .iter()
        .filter(|layer| {
            !available.iter().any(|props| {
                // SAFETY: the loader NUL-terminates layer_name.
                let name = unsafe { CStr::from_ptr(props.layer_name.as_ptr()) };
                name == **layer
            })
        })
        .map(|layer| layer.to_string_lossy().into_owned())
        .collect()
}

/// Create a Vulkan instance.
///
/// When `validation_layers` is non-empty every listed layer must be
/// installed. If debug utils is also supported it is enabled, and the
/// messenger create-info is chained in so instance creation and destruction
/// are covered too. The returned flag says whether debug utils was enabled.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    display: RawDisplayHandle,
    validation_layers: &[&CStr],
) -> Result<(ash::Instance, bool)> {
    let enable_validation = !validation_layers.is_empty();

    if enable_validation {
        // SAFETY: the entry is valid per the caller.
        let available = unsafe { entry.enumerate_instance_layer_properties() }
            .map_err(GpuError::query("vkEnumerateInstanceLayerProperties"))?;
        for props in &available {
            // SAFETY: the loader NUL-terminates layer_name.
            let name = unsafe { CStr::from_ptr(props.layer_name.as_ptr()) };
            tracing::debug!("Available layer: {}", name.to_string_lossy());
        }
        let missing = missing_layers(validation_layers, &available);
        if !missing.is_empty() {
            return Err(GpuError::ValidationLayersUnavailable(missing));
        }
    }

    // SAFETY: the entry is valid per the caller.
    let supported = unsafe { entry.enumerate_instance_extension_properties(None) }
        .map_err(GpuError::query("vkEnumerateInstanceExtensionProperties"))?;
    let mut has_debug_utils = false;
    for ext in &supported {
        // SAFETY: the loader NUL-terminates extension_name.
        let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
        tracing::debug!("Instance extension supported: {}", name.to_string_lossy());
        has_debug_utils |= name == ash::ext::debug_utils::NAME;
    }

    let debug_utils = enable_validation && has_debug_utils;
    if enable_validation && !has_debug_utils {
        tracing::warn!("VK_EXT_debug_utils not supported, validation output will not be captured");
    }

    let app_name =
        CString::new(app_name).map_err(|_| GpuError::InvalidName(app_name.to_string()))?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 1, 0, 0))
        .engine_name(c"trigon")
        .engine_version(vk::make_api_version(0, 1, 0, 0))
        .api_version(vk::API_VERSION_1_0);

    let extension_names = required_instance_extensions(display, debug_utils)?;
    for &ext in &extension_names {
        // SAFETY: every entry points at a static NUL-terminated name.
        let name = unsafe { CStr::from_ptr(ext) };
        tracing::debug!("Instance extension required: {}", name.to_string_lossy());
    }

    let layer_names: Vec<*const c_char> = validation_layers.iter().map(|l| l.as_ptr()).collect();

    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let mut debug_info = messenger_create_info();
    let mut create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);
    if debug_utils {
        create_info = create_info.push_next(&mut debug_info);
    }

    // SAFETY: every pointer in create_info outlives this call.
    let instance = unsafe { entry.create_instance(&create_info, None) }
        .map_err(GpuError::creation(ResourceKind::Instance))?;

    tracing::debug!(
        "Created Vulkan instance ({} extensions, {} layers)",
        extension_names.len(),
        layer_names.len()
    );
    Ok((instance, debug_utils))
}
