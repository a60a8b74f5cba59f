//! GPU error types.

use ash::vk;
use thiserror::Error;

use crate::lifecycle::ResourceKind;

/// Errors raised while setting up or tearing down the rendering context.
///
/// Every variant is fatal for the setup attempt; nothing here is retried.
#[derive(Error, Debug)]
pub enum GpuError {
    /// The Vulkan loader library could not be loaded.
    #[error("Failed to load Vulkan: {0}")]
    Loader(String),

    /// Enumeration returned no physical devices at all.
    #[error("Found no GPU with Vulkan support")]
    NoDevices,

    /// Devices exist but none passed the suitability checks.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// A driver creation call returned a non-success code.
    #[error("Failed to create {resource}: {result}")]
    Creation {
        resource: ResourceKind,
        result: vk::Result,
    },

    /// A capability query failed instead of returning a result.
    #[error("Query {query} failed: {result}")]
    Query {
        query: &'static str,
        result: vk::Result,
    },

    /// Validation was requested but some layers are not installed.
    #[error("Validation layers requested are not available: {}", .0.join(", "))]
    ValidationLayersUnavailable(Vec<String>),

    /// The debug messenger is required but its entry points are missing.
    #[error("Debug messenger required but VK_EXT_debug_utils functions are unavailable")]
    DebugHookUnavailable,

    /// Surface creation failed before reaching the driver.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// A configured name cannot be passed to the driver.
    #[error("Name contains an interior NUL byte: {0:?}")]
    InvalidName(String),

    /// Shader bytecode could not be turned into SPIR-V words.
    #[error("Invalid shader bytecode: {0}")]
    InvalidShader(String),
}

impl GpuError {
    /// Build a `map_err` adapter for a failed creation call.
    pub fn creation(resource: ResourceKind) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Creation { resource, result }
    }

    /// Build a `map_err` adapter for a failed capability query.
    pub fn query(query: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Query { query, result }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
