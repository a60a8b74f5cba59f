//! Vulkan device and swapchain negotiation for the trigon renderer.
//!
//! This crate provides:
//! - Instance creation with optional validation and a debug messenger
//! - GPU capability probing and first-match device selection
//! - Queue family resolution and logical device creation
//! - Swapchain parameter negotiation and creation
//! - A [`RenderContext`] that builds all of the above in order and tears it
//!   down in reverse

pub mod capabilities;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod pipeline;
pub mod queue;
pub mod selector;
pub mod surface;
pub mod swapchain;

pub use capabilities::{DeviceProbe, DeviceProperties, GpuVendor, SwapchainSupportDetails, VulkanProbe};
pub use context::{RenderConfig, RenderContext};
pub use debug::DebugHookPolicy;
pub use device::LogicalDevice;
pub use error::{GpuError, Result};
pub use lifecycle::{teardown_plan, ResourceKind, Stage};
pub use queue::{QueueFamilies, QueueFamilyIndices};
pub use selector::{select_physical_device, DeviceSelection, Rejection};
pub use swapchain::{Swapchain, SwapchainConfig};
