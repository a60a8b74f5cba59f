//! Application configuration.

use std::path::PathBuf;

use trigon_gpu::RenderConfig;
use trigon_platform::PlatformConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title and Vulkan application name.
    pub app_name: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub enable_validation: bool,
    /// Fail instead of warning when validation is on but no debug messenger
    /// can be installed.
    pub require_debug_hook: bool,
    /// Layers enabled when validation is on.
    pub validation_layers: Vec<String>,
    /// Device extensions every candidate GPU must expose.
    pub device_extensions: Vec<String>,
    /// Compiled SPIR-V vertex shader.
    pub vertex_shader: PathBuf,
    /// Compiled SPIR-V fragment shader.
    pub fragment_shader: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let render = RenderConfig::default();
        Self {
            app_name: "Vulkan Triangle".to_string(),
            width: 800,
            height: 600,
            enable_validation: cfg!(debug_assertions),
            require_debug_hook: false,
            validation_layers: render.validation_layer_names().to_vec(),
            device_extensions: render.device_extension_names().to_vec(),
            vertex_shader: PathBuf::from("shaders/vert.spv"),
            fragment_shader: PathBuf::from("shaders/frag.spv"),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.enable_validation = validation;
        self
    }

    /// Require the debug messenger whenever validation is on.
    pub fn with_required_debug_hook(mut self, require: bool) -> Self {
        self.require_debug_hook = require;
        self
    }

    /// Replace the validation layer list.
    pub fn with_validation_layers(mut self, layers: Vec<String>) -> Self {
        self.validation_layers = layers;
        self
    }

    /// Replace the required device extension list.
    pub fn with_device_extensions(mut self, extensions: Vec<String>) -> Self {
        self.device_extensions = extensions;
        self
    }

    /// Set the SPIR-V shader paths.
    pub fn with_shaders(mut self, vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        self.vertex_shader = vertex.into();
        self.fragment_shader = fragment.into();
        self
    }

    /// Window settings.
    pub fn platform_config(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.app_name.clone(),
            width: self.width,
            height: self.height,
            ..Default::default()
        }
    }

    /// GPU context settings.
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig::new()
            .app_name(self.app_name.clone())
            .extent(self.width, self.height)
            .validation(self.enable_validation)
            .require_debug_hook(self.require_debug_hook)
            .validation_layers(self.validation_layers.iter().cloned())
            .device_extensions(self.device_extensions.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigon_gpu::DebugHookPolicy;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.app_name, "Vulkan Triangle");
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.enable_validation, cfg!(debug_assertions));
        assert!(!config.require_debug_hook);
        assert_eq!(config.validation_layers, vec!["VK_LAYER_KHRONOS_validation"]);
        assert_eq!(config.device_extensions, vec!["VK_KHR_swapchain"]);
    }

    #[test]
    fn default_names_match_render_defaults() {
        let config = AppConfig::default();
        let render = config.render_config();
        assert_eq!(render.validation_layer_names(), RenderConfig::default().validation_layer_names());
        assert_eq!(render.device_extension_names(), RenderConfig::default().device_extension_names());
    }

    #[test]
    fn window_is_sized_from_config() {
        let platform = AppConfig::new("demo").with_size(1024, 768).platform_config();
        assert_eq!(platform.title, "demo");
        assert_eq!((platform.width, platform.height), (1024, 768));
        assert!(!platform.resizable);
    }

    #[test]
    fn render_config_carries_extent_and_policy() {
        let render = AppConfig::default()
            .with_size(320, 200)
            .with_validation(true)
            .with_required_debug_hook(true)
            .render_config();
        let extent = render.requested_extent();
        assert_eq!((extent.width, extent.height), (320, 200));
        assert_eq!(render.debug_hook_policy(), DebugHookPolicy::Required);
    }

    #[test]
    fn validation_off_disables_debug_hook() {
        let render = AppConfig::default()
            .with_validation(false)
            .with_required_debug_hook(true)
            .render_config();
        assert_eq!(render.debug_hook_policy(), DebugHookPolicy::Disabled);
    }
}
