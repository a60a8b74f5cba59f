//! Validation-layer debug messenger.
//!
//! The messenger entry points belong to `VK_EXT_debug_utils` and are looked up
//! by name at runtime. A missing entry point is an absent capability, not an
//! error, unless the messenger was explicitly required.

use ash::vk;
use std::ffi::{c_void, CStr};

use crate::error::{GpuError, Result};
use crate::lifecycle::ResourceKind;

const CREATE_FN: &CStr = c"vkCreateDebugUtilsMessengerEXT";
const DESTROY_FN: &CStr = c"vkDestroyDebugUtilsMessengerEXT";

/// Whether a debug messenger should be installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugHookPolicy {
    /// Never install one.
    Disabled,
    /// Install one if the driver exposes the entry points.
    Optional,
    /// Fail setup if the entry points are missing.
    Required,
}

impl DebugHookPolicy {
    /// Policy for the given validation switch and requirement flag.
    pub fn from_flags(enable_validation: bool, require: bool) -> Self {
        match (enable_validation, require) {
            (false, _) => Self::Disabled,
            (true, false) => Self::Optional,
            (true, true) => Self::Required,
        }
    }

    /// Whether the messenger entry points should be looked up at all.
    ///
    /// Commands of an extension that was not enabled on the instance are
    /// never queried.
    pub fn should_look_up(self, extension_enabled: bool) -> bool {
        self != Self::Disabled && extension_enabled
    }

    /// Decide whether to create the messenger given whether it is available.
    pub fn resolve(self, available: bool) -> Result<bool> {
        match (self, available) {
            (Self::Disabled, _) => Ok(false),
            (_, true) => Ok(true),
            (Self::Optional, false) => {
                tracing::warn!("Debug messenger unavailable, continuing without it");
                Ok(false)
            }
            (Self::Required, false) => Err(GpuError::DebugHookUnavailable),
        }
    }
}

/// Loaded `VK_EXT_debug_utils` instance functions.
pub struct DebugUtilsFns {
    loader: ash::ext::debug_utils::Instance,
}

impl DebugUtilsFns {
    /// Look up the messenger entry points by name.
    ///
    /// Returns `None` unless both create and destroy resolve.
    ///
    /// # Safety
    /// The instance must be valid and created from `entry`.
    pub unsafe fn lookup(entry: &ash::Entry, instance: &ash::Instance) -> Option<Self> {
        for name in [CREATE_FN, DESTROY_FN] {
            // SAFETY: caller guarantees the instance handle is live.
            let found = unsafe { entry.get_instance_proc_addr(instance.handle(), name.as_ptr()) };
            if found.is_none() {
                tracing::debug!("Did not find function {}", name.to_string_lossy());
                return None;
            }
        }
        Some(Self {
            loader: ash::ext::debug_utils::Instance::new(entry, instance),
        })
    }
}

/// An installed debug messenger and the functions needed to remove it.
pub struct DebugHook {
    fns: DebugUtilsFns,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugHook {
    /// Install a messenger routing validation messages to `tracing`.
    ///
    /// # Safety
    /// The instance the functions were loaded from must be valid.
    pub unsafe fn install(fns: DebugUtilsFns) -> Result<Self> {
        let info = messenger_create_info();
        // SAFETY: the loader's instance is valid per the caller.
        let messenger = unsafe { fns.loader.create_debug_utils_messenger(&info, None) }
            .map_err(GpuError::creation(ResourceKind::DebugMessenger))?;
        tracing::debug!("Installed debug messenger");
        Ok(Self { fns, messenger })
    }

    /// Remove the messenger.
    ///
    /// # Safety
    /// Must run before the instance is destroyed.
    pub unsafe fn destroy(self) {
        // SAFETY: guaranteed by the caller.
        unsafe {
            self.fns
                .loader
                .destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

/// Create-info shared by the messenger and the instance `p_next` chain.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _msg_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    // SAFETY: the driver passes either null or a valid callback struct.
    let message = match unsafe { callback_data.as_ref() } {
        Some(data) if !data.p_message.is_null() => {
            // SAFETY: p_message is a NUL-terminated string owned by the driver.
            unsafe { CStr::from_ptr(data.p_message) }.to_string_lossy()
        }
        _ => "<empty validation message>".into(),
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!("Validation layer: {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!("Validation layer: {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        tracing::info!("Validation layer: {message}");
    } else {
        tracing::trace!("Validation layer: {message}");
    }

    vk::FALSE
}
