//! Vulkan Triangle
//!
//! Opens a window and builds everything a triangle renderer needs: instance,
//! debug messenger, surface, device, swapchain, image views, render pass and
//! pipeline layout. Closing the window tears it all down again.
//!
//! ## Usage
//!
//! ```bash
//! glslc shaders/shader.vert -o shaders/vert.spv
//! glslc shaders/shader.frag -o shaders/frag.spv
//! cargo run -p trigon-triangle -- [OPTIONS]
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use std::path::Path;
use std::process::ExitCode;

use trigon_app::{init_logging, run, AppConfig};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return ExitCode::SUCCESS;
    }

    init_logging();

    let config = match parse_args(default_config(), &args) {
        Ok(config) => config,
        Err(message) => {
            tracing::error!("{message}");
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Defaults with shader paths resolved against this package.
fn default_config() -> AppConfig {
    let shaders = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
    AppConfig::default().with_shaders(shaders.join("vert.spv"), shaders.join("frag.spv"))
}

fn parse_args(mut config: AppConfig, args: &[String]) -> Result<AppConfig, String> {
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .cloned()
                .ok_or_else(|| format!("Missing value for {name}"))
        };
        match arg.as_str() {
            "--width" => config.width = parse_dimension("--width", &value("--width")?)?,
            "--height" => config.height = parse_dimension("--height", &value("--height")?)?,
            "--vert" => config.vertex_shader = value("--vert")?.into(),
            "--frag" => config.fragment_shader = value("--frag")?.into(),
            "--validation" => config.enable_validation = true,
            "--no-validation" => config.enable_validation = false,
            "--require-debug-hook" => config.require_debug_hook = true,
            other => return Err(format!("Unknown option: {other}")),
        }
    }
    Ok(config)
}

fn parse_dimension(name: &str, value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(0) | Err(_) => Err(format!("Invalid value for {name}: {value}")),
        Ok(v) => Ok(v),
    }
}

fn print_help() {
    eprintln!(
        "Vulkan Triangle

USAGE:
    cargo run -p trigon-triangle -- [OPTIONS]

OPTIONS:
    --width <N>             Window width (default: 800)
    --height <N>            Window height (default: 600)
    --vert <PATH>           SPIR-V vertex shader (default: shaders/vert.spv)
    --frag <PATH>           SPIR-V fragment shader (default: shaders/frag.spv)
    --validation            Enable validation layers (default in debug builds)
    --no-validation         Disable validation layers
    --require-debug-hook    Fail if validation is on but no debug messenger can be installed
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn no_args_keeps_defaults() {
        let config = parse_args(AppConfig::default(), &[]).unwrap();
        assert_eq!((config.width, config.height), (800, 600));
    }

    #[test]
    fn options_override_config() {
        let config = parse_args(
            AppConfig::default(),
            &args(&["--width", "1024", "--vert", "a.spv", "--no-validation", "--require-debug-hook"]),
        )
        .unwrap();
        assert_eq!(config.width, 1024);
        assert_eq!(config.vertex_shader, Path::new("a.spv"));
        assert!(!config.enable_validation);
        assert!(config.require_debug_hook);
    }

    #[test]
    fn bad_options_are_reported() {
        assert!(parse_args(AppConfig::default(), &args(&["--height"])).is_err());
        assert!(parse_args(AppConfig::default(), &args(&["--height", "0"])).is_err());
        assert!(parse_args(AppConfig::default(), &args(&["--bogus"])).is_err());
    }

    #[test]
    fn shader_defaults_live_in_package() {
        let config = default_config();
        assert!(config.vertex_shader.ends_with("shaders/vert.spv"));
        assert!(config.fragment_shader.ends_with("shaders/frag.spv"));
    }
}
