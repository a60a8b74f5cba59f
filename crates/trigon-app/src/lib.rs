//! Application layer for trigon.
//!
//! [`run`] drives the whole program in four phases: open the window, build
//! the render context, run the event loop until the window closes, and tear
//! the context down.
//!
//! # Example
//!
//! ```no_run
//! use trigon_app::{run, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run(AppConfig::default().with_shaders("shaders/vert.spv", "shaders/frag.spv"))
//! }
//! ```

mod config;
mod runner;
mod shaders;

pub use config::AppConfig;
pub use runner::{init_logging, run};
pub use shaders::ShaderSet;
