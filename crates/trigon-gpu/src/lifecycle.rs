//! Setup stages and the resource dependency chain.
//!
//! Resources are created strictly along [`ResourceKind::CREATION_ORDER`] and
//! destroyed along its exact reverse. A resource that was never created is
//! never handed to a destroy call.

use std::fmt;

/// Progress of a [`RenderContext`](crate::RenderContext) through setup.
///
/// Stages only move forward. A failed step leaves the context at the last
/// stage that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Uninitialized,
    Instance,
    /// Reached whether or not a debug messenger was actually installed.
    DebugHook,
    Surface,
    PhysicalDeviceSelected,
    LogicalDevice,
    Swapchain,
    ImageViews,
    RenderPass,
    PipelineLayout,
    Ready,
}

impl Stage {
    /// The stage that follows this one, or `None` once ready.
    pub fn next(self) -> Option<Self> {
        let next = match self {
            Self::Uninitialized => Self::Instance,
            Self::Instance => Self::DebugHook,
            Self::DebugHook => Self::Surface,
            Self::Surface => Self::PhysicalDeviceSelected,
            Self::PhysicalDeviceSelected => Self::LogicalDevice,
            Self::LogicalDevice => Self::Swapchain,
            Self::Swapchain => Self::ImageViews,
            Self::ImageViews => Self::RenderPass,
            Self::RenderPass => Self::PipelineLayout,
            Self::PipelineLayout => Self::Ready,
            Self::Ready => return None,
        };
        Some(next)
    }
}

/// A driver object owned by the rendering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Instance,
    DebugMessenger,
    Surface,
    Device,
    Swapchain,
    ImageViews,
    RenderPass,
    /// Transient: lives only while the pipeline layout step runs.
    ShaderModule,
    PipelineLayout,
}

impl ResourceKind {
    /// Owned resources in the order they are created.
    ///
    /// The physical device is selected, not created, so it has no entry.
    /// Shader modules are destroyed inside the step that creates them.
    pub const CREATION_ORDER: [Self; 8] = [
        Self::Instance,
        Self::DebugMessenger,
        Self::Surface,
        Self::Device,
        Self::Swapchain,
        Self::ImageViews,
        Self::RenderPass,
        Self::PipelineLayout,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Instance => "Vulkan instance",
            Self::DebugMessenger => "debug messenger",
            Self::Surface => "window surface",
            Self::Device => "logical device",
            Self::Swapchain => "swapchain",
            Self::ImageViews => "swapchain image view",
            Self::RenderPass => "render pass",
            Self::ShaderModule => "shader module",
            Self::PipelineLayout => "pipeline layout",
        };
        f.write_str(name)
    }
}

/// Order in which the `live` resources must be destroyed.
///
/// Walks the creation order backwards and keeps only resources that are
/// actually live.
pub fn teardown_plan(live: &[ResourceKind]) -> Vec<ResourceKind> {
    ResourceKind::CREATION_ORDER
        .iter()
        .rev()
        .copied()
        .filter(|kind| live.contains(kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_linearly() {
        let mut stage = Stage::Uninitialized;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            visited.push(stage);
        }
        assert_eq!(stage, Stage::Ready);
        assert_eq!(visited.len(), 11);
    }

    #[test]
    fn instance_only_teardown() {
        let plan = teardown_plan(&[ResourceKind::Instance]);
        assert_eq!(plan, vec![ResourceKind::Instance]);
    }

    #[test]
    fn full_teardown_is_reverse_creation() {
        let plan = teardown_plan(&ResourceKind::CREATION_ORDER);
        let mut expected = ResourceKind::CREATION_ORDER.to_vec();
        expected.reverse();
        assert_eq!(plan, expected);
        assert_eq!(plan.first(), Some(&ResourceKind::PipelineLayout));
        assert_eq!(plan.last(), Some(&ResourceKind::Instance));
    }

    #[test]
    fn skipped_debug_messenger_is_not_destroyed() {
        let live = [
            ResourceKind::Instance,
            ResourceKind::Surface,
            ResourceKind::Device,
            ResourceKind::Swapchain,
        ];
        let plan = teardown_plan(&live);
        assert_eq!(
            plan,
            vec![
                ResourceKind::Swapchain,
                ResourceKind::Device,
                ResourceKind::Surface,
                ResourceKind::Instance,
            ]
        );
    }

    #[test]
    fn live_order_does_not_matter() {
        let plan = teardown_plan(&[ResourceKind::Instance, ResourceKind::Surface]);
        let shuffled = teardown_plan(&[ResourceKind::Surface, ResourceKind::Instance]);
        assert_eq!(plan, shuffled);
    }

    #[test]
    fn shader_modules_never_reach_teardown() {
        assert!(teardown_plan(&[ResourceKind::ShaderModule]).is_empty());
    }
}
