//! Swapchain negotiation and creation.

use ash::vk;

use crate::capabilities::SwapchainSupportDetails;
use crate::error::{GpuError, Result};
use crate::lifecycle::ResourceKind;
use crate::queue::QueueFamilies;

/// Preferred surface format: 8-bit BGRA, sRGB non-linear color space.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Select the surface format.
///
/// A lone `UNDEFINED` entry means the surface imposes no constraint, so the
/// preferred format is used as is. Otherwise the preferred format is used if
/// listed, falling back to the first entry.
pub fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    match available {
        [] => PREFERRED_SURFACE_FORMAT,
        [only] if only.format == vk::Format::UNDEFINED => PREFERRED_SURFACE_FORMAT,
        [first, ..] => available
            .iter()
            .copied()
            .find(|f| *f == PREFERRED_SURFACE_FORMAT)
            .unwrap_or(*first),
    }
}

/// Select the present mode: mailbox, then immediate, then FIFO.
pub fn choose_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    // FIFO is always supported
    let mut best = vk::PresentModeKHR::FIFO;
    for &mode in available {
        if mode == vk::PresentModeKHR::MAILBOX {
            return mode;
        }
        if mode == vk::PresentModeKHR::IMMEDIATE {
            best = mode;
        }
    }
    best
}

/// Calculate swapchain extent.
///
/// A current extent of `u32::MAX` lets the application pick; anything else
/// is dictated by the surface.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    requested: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: requested.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: requested.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Number of swapchain images to request.
///
/// An unbounded surface (`max_image_count == 0`) gets one more than the
/// minimum, a bounded one gets its maximum.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    if capabilities.max_image_count == 0 {
        capabilities.min_image_count + 1
    } else {
        capabilities.max_image_count
    }
}

/// Negotiated swapchain parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainConfig {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainConfig {
    /// Pick every parameter from freshly queried support details.
    pub fn negotiate(support: &SwapchainSupportDetails, requested: vk::Extent2D) -> Self {
        let config = Self {
            surface_format: choose_surface_format(&support.formats),
            present_mode: choose_present_mode(&support.present_modes),
            extent: choose_extent(&support.capabilities, requested),
            image_count: choose_image_count(&support.capabilities),
            pre_transform: support.capabilities.current_transform,
        };
        tracing::debug!(
            "Swapchain config: {:?} / {:?}, {:?}, {}x{}, {} images",
            config.surface_format.format,
            config.surface_format.color_space,
            config.present_mode,
            config.extent.width,
            config.extent.height,
            config.image_count
        );
        config
    }
}

/// Swapchain wrapper.
///
/// Image views are owned by the rendering context, not by this struct.
pub struct Swapchain {
    pub loader: ash::khr::swapchain::Device,
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub config: SwapchainConfig,
}

impl Swapchain {
    /// Create a new swapchain and fetch its images.
    ///
    /// # Safety
    /// All handles must be valid and `surface` must not already back a swapchain.
    pub unsafe fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        surface: vk::SurfaceKHR,
        families: QueueFamilies,
        config: SwapchainConfig,
    ) -> Result<Self> {
        let loader = ash::khr::swapchain::Device::new(instance, device);

        let (sharing_mode, family_indices) = families.sharing();
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(config.image_count)
            .image_format(config.surface_format.format)
            .image_color_space(config.surface_format.color_space)
            .image_extent(config.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&family_indices)
            .pre_transform(config.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(config.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        // SAFETY: the caller guarantees the device and surface are valid.
        let swapchain = unsafe { loader.create_swapchain(&create_info, None) }
            .map_err(GpuError::creation(ResourceKind::Swapchain))?;

        // SAFETY: the swapchain was just created from this loader.
        let images = match unsafe { loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(result) => {
                // SAFETY: nothing else references the new swapchain yet.
                unsafe { loader.destroy_swapchain(swapchain, None) };
                return Err(GpuError::query("vkGetSwapchainImagesKHR")(result));
            }
        };
        tracing::debug!("Created swapchain with {} images", images.len());

        Ok(Self {
            loader,
            swapchain,
            images,
            config,
        })
    }

    /// Destroy the swapchain.
    ///
    /// # Safety
    /// Every view of its images must already be destroyed.
    pub unsafe fn destroy(&self) {
        // SAFETY: guaranteed by the caller.
        unsafe { self.loader.destroy_swapchain(self.swapchain, None) };
    }
}

/// Create one 2D color view per image, pushing each into `views` as it is made.
///
/// On failure `views` keeps the views created so far so they can still be
/// destroyed.
///
/// # Safety
/// The device must be valid and own `images`.
pub unsafe fn create_image_views(
    device: &ash::Device,
    images: &[vk::Image],
    format: vk::Format,
    views: &mut Vec<vk::ImageView>,
) -> Result<()> {
    views.reserve(images.len());
    for &image in images {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        // SAFETY: the caller guarantees the device owns `image`.
        let view = unsafe { device.create_image_view(&view_info, None) }
            .map_err(GpuError::creation(ResourceKind::ImageViews))?;
        views.push(view);
        tracing::debug!("Created image view {}", views.len() - 1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn free_caps(min: (u32, u32), max: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: min.0,
                height: min.1,
            },
            max_image_extent: vk::Extent2D {
                width: max.0,
                height: max.1,
            },
            ..Default::default()
        }
    }

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn single_preferred_format_is_kept() {
        let formats = [PREFERRED_SURFACE_FORMAT];
        assert_eq!(choose_surface_format(&formats), PREFERRED_SURFACE_FORMAT);
    }

    #[test]
    fn preferred_format_found_anywhere() {
        let formats = [
            format(vk::Format::R8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            PREFERRED_SURFACE_FORMAT,
        ];
        assert_eq!(choose_surface_format(&formats), PREFERRED_SURFACE_FORMAT);
    }

    #[test]
    fn first_format_is_fallback() {
        let first = format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        let formats = [
            first,
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];
        assert_eq!(choose_surface_format(&formats), first);
    }

    #[test]
    fn undefined_format_means_unconstrained() {
        let formats = [format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
        assert_eq!(choose_surface_format(&formats), PREFERRED_SURFACE_FORMAT);
    }

    #[test]
    fn undefined_among_others_is_not_a_wildcard() {
        let first = format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        let formats = [
            first,
            format(vk::Format::R8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats), first);
    }

    #[test]
    fn present_mode_priority() {
        use vk::PresentModeKHR as M;
        assert_eq!(choose_present_mode(&[M::FIFO, M::IMMEDIATE, M::MAILBOX]), M::MAILBOX);
        assert_eq!(choose_present_mode(&[M::FIFO, M::IMMEDIATE]), M::IMMEDIATE);
        assert_eq!(choose_present_mode(&[M::FIFO]), M::FIFO);
        assert_eq!(choose_present_mode(&[M::MAILBOX, M::IMMEDIATE]), M::MAILBOX);
        assert_eq!(choose_present_mode(&[M::FIFO_RELAXED]), M::FIFO);
    }

    #[test]
    fn free_extent_within_bounds_is_unclamped() {
        let caps = free_caps((100, 100), (2000, 2000));
        assert_eq!(choose_extent(&caps, extent(800, 600)), extent(800, 600));
    }

    #[test]
    fn free_extent_is_clamped() {
        let caps = free_caps((100, 100), (2000, 2000));
        assert_eq!(choose_extent(&caps, extent(50, 50)), extent(100, 100));
        assert_eq!(choose_extent(&caps, extent(4000, 50)), extent(2000, 100));
    }

    #[test]
    fn fixed_extent_is_verbatim() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: extent(1280, 720),
            ..free_caps((100, 100), (2000, 2000))
        };
        assert_eq!(choose_extent(&caps, extent(800, 600)), extent(1280, 720));
        assert_eq!(choose_extent(&caps, extent(5, 5)), extent(1280, 720));
    }

    #[test]
    fn image_count_policy() {
        let unbounded = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&unbounded), 3);

        let bounded = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&bounded), 8);
    }

    #[test]
    fn negotiate_combines_choices() {
        let support = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..free_caps((1, 1), (4096, 4096))
            },
            formats: vec![PREFERRED_SURFACE_FORMAT],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        };
        let config = SwapchainConfig::negotiate(&support, extent(800, 600));
        assert_eq!(config.surface_format, PREFERRED_SURFACE_FORMAT);
        assert_eq!(config.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(config.extent, extent(800, 600));
        assert_eq!(config.image_count, 3);
        assert_eq!(config.pre_transform, vk::SurfaceTransformFlagsKHR::IDENTITY);
    }
}
