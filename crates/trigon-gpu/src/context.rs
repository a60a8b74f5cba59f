//! Rendering context lifecycle.
//!
//! [`RenderContext`] owns every driver object from the instance up to the
//! pipeline layout. Each object is held as an `Option`, so the context always
//! knows exactly what is live and tears down only that.

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::{CStr, CString};

use crate::capabilities::DeviceProbe;
use crate::debug::{DebugHook, DebugHookPolicy, DebugUtilsFns};
use crate::device::LogicalDevice;
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, owned_names, required_device_extensions, validation_layers};
use crate::lifecycle::{teardown_plan, ResourceKind, Stage};
use crate::pipeline::{create_pipeline_layout, create_render_pass};
use crate::selector::{select_physical_device, DeviceSelection};
use crate::surface::Surface;
use crate::swapchain::{create_image_views, Swapchain, SwapchainConfig};

/// Settings for building a [`RenderContext`].
#[derive(Debug, Clone)]
pub struct RenderConfig {
    app_name: String,
    extent: vk::Extent2D,
    enable_validation: bool,
    require_debug_hook: bool,
    validation_layers: Vec<String>,
    device_extensions: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            app_name: "trigon".to_string(),
            extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            enable_validation: cfg!(debug_assertions),
            require_debug_hook: false,
            validation_layers: owned_names(&validation_layers()),
            device_extensions: owned_names(&required_device_extensions()),
        }
    }
}

impl RenderConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Set the extent requested when the surface lets the application choose.
    pub fn extent(mut self, width: u32, height: u32) -> Self {
        self.extent = vk::Extent2D { width, height };
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Fail setup if validation is on but no debug messenger can be installed.
    pub fn require_debug_hook(mut self, require: bool) -> Self {
        self.require_debug_hook = require;
        self
    }

    /// Replace the validation layers enabled with validation.
    pub fn validation_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validation_layers = layers.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the device extensions every candidate GPU must expose.
    pub fn device_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Requested extent.
    pub fn requested_extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Validation layer names enabled with validation.
    pub fn validation_layer_names(&self) -> &[String] {
        &self.validation_layers
    }

    /// Device extension names every candidate GPU must expose.
    pub fn device_extension_names(&self) -> &[String] {
        &self.device_extensions
    }

    /// Debug messenger policy implied by the validation flags.
    pub fn debug_hook_policy(&self) -> DebugHookPolicy {
        DebugHookPolicy::from_flags(self.enable_validation, self.require_debug_hook)
    }

    /// Layers to enable; empty when validation is off.
    fn enabled_layers(&self) -> Result<Vec<CString>> {
        if !self.enable_validation {
            return Ok(Vec::new());
        }
        to_c_strings(&self.validation_layers)
    }
}

fn to_c_strings(names: &[String]) -> Result<Vec<CString>> {
    names
        .iter()
        .map(|name| CString::new(name.as_str()).map_err(|_| GpuError::InvalidName(name.clone())))
        .collect()
}

/// Vulkan objects needed to render into a window, built in dependency order.
pub struct RenderContext {
    stage: Stage,
    // Keeps the loader library mapped while any object is live
    entry: ash::Entry,
    instance: Option<ash::Instance>,
    debug: Option<DebugHook>,
    surface: Option<Surface>,
    selection: Option<DeviceSelection>,
    device: Option<LogicalDevice>,
    swapchain: Option<Swapchain>,
    image_views: Vec<vk::ImageView>,
    render_pass: Option<vk::RenderPass>,
    pipeline_layout: Option<vk::PipelineLayout>,
}

impl RenderContext {
    /// Load Vulkan and build every object up to the pipeline layout.
    ///
    /// On failure the objects created so far are destroyed in reverse order
    /// before the error is returned.
    ///
    /// # Safety
    /// The handles must refer to a live window that outlives the context.
    pub unsafe fn new(
        config: &RenderConfig,
        display: RawDisplayHandle,
        window: RawWindowHandle,
        vertex_shader: &[u8],
        fragment_shader: &[u8],
    ) -> Result<Self> {
        // SAFETY: the loader is only used through this context.
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loader(e.to_string()))?;
        let mut context = Self::empty(entry);

        // Dropping `context` on error runs the teardown.
        // SAFETY: window lifetime is guaranteed by the caller.
        unsafe { context.init(config, display, window, vertex_shader, fragment_shader) }?;
        Ok(context)
    }

    fn empty(entry: ash::Entry) -> Self {
        Self {
            stage: Stage::Uninitialized,
            entry,
            instance: None,
            debug: None,
            surface: None,
            selection: None,
            device: None,
            swapchain: None,
            image_views: Vec::new(),
            render_pass: None,
            pipeline_layout: None,
        }
    }

    unsafe fn init(
        &mut self,
        config: &RenderConfig,
        display: RawDisplayHandle,
        window: RawWindowHandle,
        vertex_shader: &[u8],
        fragment_shader: &[u8],
    ) -> Result<()> {
        let layers = config.enabled_layers()?;
        let layers: Vec<&CStr> = layers.iter().map(CString::as_c_str).collect();
        let extensions = to_c_strings(&config.device_extensions)?;
        let extensions: Vec<&CStr> = extensions.iter().map(CString::as_c_str).collect();

        // SAFETY: the entry holds a loaded Vulkan library.
        let (instance, debug_utils) =
            unsafe { create_instance(&self.entry, &config.app_name, display, &layers) }?;
        let instance = &*self.instance.insert(instance);
        advance(&mut self.stage, Stage::Instance);

        let policy = config.debug_hook_policy();
        let fns = if policy.should_look_up(debug_utils) {
            // SAFETY: the instance was created from this entry with debug utils enabled.
            unsafe { DebugUtilsFns::lookup(&self.entry, instance) }
        } else {
            None
        };
        if let (true, Some(fns)) = (policy.resolve(fns.is_some())?, fns) {
            // SAFETY: the functions were loaded from the live instance.
            self.debug = Some(unsafe { DebugHook::install(fns) }?);
        }
        advance(&mut self.stage, Stage::DebugHook);

        // SAFETY: the caller guarantees the window outlives the surface.
        let surface = unsafe { Surface::new(&self.entry, instance, display, window) }?;
        let surface = &*self.surface.insert(surface);
        advance(&mut self.stage, Stage::Surface);

        // SAFETY: the instance is live.
        let devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(GpuError::query("vkEnumeratePhysicalDevices"))?;
        // SAFETY: the surface was created from this instance.
        let probe = unsafe { surface.probe(instance) };
        let selection = select_physical_device(&probe, &devices, &extensions)?;
        let selection = &*self.selection.insert(selection);
        advance(&mut self.stage, Stage::PhysicalDeviceSelected);

        // SAFETY: the selection was enumerated from this instance.
        let device = unsafe { LogicalDevice::new(instance, selection, &extensions) }?;
        let device = &*self.device.insert(device);
        advance(&mut self.stage, Stage::LogicalDevice);

        // Capabilities are re-queried now that the device exists.
        let support = probe.swapchain_support(selection.device)?;
        let swapchain_config = SwapchainConfig::negotiate(&support, config.extent);
        // SAFETY: instance, device and surface are live and the surface is unused.
        let swapchain = unsafe {
            Swapchain::new(
                instance,
                &device.device,
                surface.surface,
                selection.families,
                swapchain_config,
            )
        }?;
        let swapchain = &*self.swapchain.insert(swapchain);
        tracing::info!(
            "Swapchain ready: {}x{}, {:?}, {:?}, {} images",
            swapchain_config.extent.width,
            swapchain_config.extent.height,
            swapchain_config.surface_format.format,
            swapchain_config.present_mode,
            swapchain.images.len()
        );
        advance(&mut self.stage, Stage::Swapchain);

        let format = swapchain_config.surface_format.format;
        // SAFETY: the images belong to the swapchain created on this device.
        unsafe { create_image_views(&device.device, &swapchain.images, format, &mut self.image_views) }?;
        advance(&mut self.stage, Stage::ImageViews);

        // SAFETY: the device is live.
        self.render_pass = Some(unsafe { create_render_pass(&device.device, format) }?);
        advance(&mut self.stage, Stage::RenderPass);

        // SAFETY: the device is live.
        let layout = unsafe { create_pipeline_layout(&device.device, vertex_shader, fragment_shader) }?;
        self.pipeline_layout = Some(layout);
        advance(&mut self.stage, Stage::PipelineLayout);

        advance(&mut self.stage, Stage::Ready);
        tracing::info!("Render context ready");
        Ok(())
    }

    /// The last setup stage that completed.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether a debug messenger is installed.
    pub fn has_debug_hook(&self) -> bool {
        self.debug.is_some()
    }

    pub fn selection(&self) -> Option<&DeviceSelection> {
        self.selection.as_ref()
    }

    pub fn device(&self) -> Option<&LogicalDevice> {
        self.device.as_ref()
    }

    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn render_pass(&self) -> Option<vk::RenderPass> {
        self.render_pass
    }

    pub fn pipeline_layout(&self) -> Option<vk::PipelineLayout> {
        self.pipeline_layout
    }

    /// Owned resources that currently exist, in creation order.
    pub fn live_resources(&self) -> Vec<ResourceKind> {
        ResourceKind::CREATION_ORDER
            .into_iter()
            .filter(|&kind| self.is_live(kind))
            .collect()
    }

    fn is_live(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Instance => self.instance.is_some(),
            ResourceKind::DebugMessenger => self.debug.is_some(),
            ResourceKind::Surface => self.surface.is_some(),
            ResourceKind::Device => self.device.is_some(),
            ResourceKind::Swapchain => self.swapchain.is_some(),
            ResourceKind::ImageViews => !self.image_views.is_empty(),
            ResourceKind::RenderPass => self.render_pass.is_some(),
            ResourceKind::PipelineLayout => self.pipeline_layout.is_some(),
            ResourceKind::ShaderModule => false,
        }
    }

    /// Destroy every live resource in reverse creation order.
    ///
    /// Safe to call more than once; later calls find nothing live.
    pub fn teardown(&mut self) {
        let plan = teardown_plan(&self.live_resources());
        if plan.is_empty() {
            return;
        }
        tracing::debug!("Tearing down {:?}", plan);

        if let Some(device) = &self.device {
            if let Err(e) = device.wait_idle() {
                tracing::warn!("Device did not go idle before teardown: {e}");
            }
        }

        for kind in plan {
            // SAFETY: the plan destroys dependents before their parents.
            unsafe { self.destroy(kind) };
        }
        self.selection = None;
        self.stage = Stage::Uninitialized;
    }

    unsafe fn destroy(&mut self, kind: ResourceKind) {
        // SAFETY: every handle below was created by this context and nothing
        // created after it is still live.
        unsafe {
            match kind {
                ResourceKind::PipelineLayout => {
                    if let (Some(layout), Some(device)) = (self.pipeline_layout.take(), &self.device) {
                        device.device.destroy_pipeline_layout(layout, None);
                    }
                }
                ResourceKind::RenderPass => {
                    if let (Some(render_pass), Some(device)) = (self.render_pass.take(), &self.device) {
                        device.device.destroy_render_pass(render_pass, None);
                    }
                }
                ResourceKind::ImageViews => {
                    let views = std::mem::take(&mut self.image_views);
                    if let Some(device) = &self.device {
                        for view in views {
                            device.device.destroy_image_view(view, None);
                        }
                    }
                }
                ResourceKind::Swapchain => {
                    if let Some(swapchain) = self.swapchain.take() {
                        swapchain.destroy();
                    }
                }
                ResourceKind::Device => {
                    if let Some(device) = self.device.take() {
                        device.destroy();
                    }
                }
                ResourceKind::Surface => {
                    if let Some(surface) = self.surface.take() {
                        surface.destroy();
                    }
                }
                ResourceKind::DebugMessenger => {
                    if let Some(debug) = self.debug.take() {
                        debug.destroy();
                    }
                }
                ResourceKind::Instance => {
                    if let Some(instance) = self.instance.take() {
                        instance.destroy_instance(None);
                    }
                }
                // Destroyed by the step that creates them
                ResourceKind::ShaderModule => {}
            }
        }
        tracing::debug!("Destroyed {kind}");
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn advance(stage: &mut Stage, to: Stage) {
    debug_assert_eq!(stage.next(), Some(to));
    *stage = to;
    tracing::debug!("Reached stage {:?}", to);
}
