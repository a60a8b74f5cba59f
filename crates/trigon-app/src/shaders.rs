//! SPIR-V shader loading.

use anyhow::Context;
use std::path::Path;

/// Raw bytecode of the vertex and fragment shaders.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

impl ShaderSet {
    /// Read both shader files.
    ///
    /// The bytes are not validated here; malformed SPIR-V is rejected when
    /// the shader modules are built.
    pub fn load(vertex: &Path, fragment: &Path) -> anyhow::Result<Self> {
        let vertex_bytes = std::fs::read(vertex)
            .with_context(|| format!("Failed to read vertex shader {}", vertex.display()))?;
        let fragment_bytes = std::fs::read(fragment)
            .with_context(|| format!("Failed to read fragment shader {}", fragment.display()))?;

        tracing::debug!(
            "Loaded shaders: {} ({} bytes), {} ({} bytes)",
            vertex.display(),
            vertex_bytes.len(),
            fragment.display(),
            fragment_bytes.len()
        );

        Ok(Self {
            vertex: vertex_bytes,
            fragment: fragment_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("trigon-{}-{name}", std::process::id()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn loads_both_files() {
        let vertex = scratch_file("load.vert.spv", &[1, 2, 3, 4]);
        let fragment = scratch_file("load.frag.spv", &[5, 6, 7, 8, 9, 10, 11, 12]);

        let shaders = ShaderSet::load(&vertex, &fragment).unwrap();
        assert_eq!(shaders.vertex, vec![1, 2, 3, 4]);
        assert_eq!(shaders.fragment.len(), 8);

        std::fs::remove_file(vertex).unwrap();
        std::fs::remove_file(fragment).unwrap();
    }

    #[test]
    fn missing_file_names_the_stage_and_path() {
        let vertex = scratch_file("missing.vert.spv", &[0; 4]);
        let fragment = std::env::temp_dir().join("trigon-does-not-exist.frag.spv");

        let err = ShaderSet::load(&vertex, &fragment).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("fragment shader"), "{message}");
        assert!(message.contains("trigon-does-not-exist.frag.spv"), "{message}");

        std::fs::remove_file(vertex).unwrap();
    }
}
