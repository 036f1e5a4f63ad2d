//! Resource loading collaborator.
//!
//! Hosts fetch chip cores and audio modules differently (HTTP in a browser,
//! the filesystem on desktop). The core only depends on this trait.

use std::path::PathBuf;

use crate::error::{CommonError, Result};

/// Loaded module bytes together with where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    /// Location the module was loaded from.
    pub url: String,
    /// Raw module bytes.
    pub bytes: Vec<u8>,
}

/// Source of binary resources.
pub trait ResourceLoader {
    /// Loads a WebAssembly binary.
    fn load_wasm(&self, url: &str) -> Result<Vec<u8>>;

    /// Loads an auxiliary module.
    fn load_module(&self, url: &str) -> Result<ModuleHandle>;
}

/// Loader resolving URLs as paths below a root directory.
#[derive(Debug, Clone)]
pub struct FsResourceLoader {
    root: PathBuf,
}

impl FsResourceLoader {
    /// Creates a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.root.join(url.trim_start_matches('/'));
        std::fs::read(&path).map_err(|source| CommonError::Resource {
            url: url.to_string(),
            source,
        })
    }
}

impl ResourceLoader for FsResourceLoader {
    fn load_wasm(&self, url: &str) -> Result<Vec<u8>> {
        self.read(url)
    }

    fn load_module(&self, url: &str) -> Result<ModuleHandle> {
        Ok(ModuleHandle {
            url: url.to_string(),
            bytes: self.read(url)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("core.wasm"), b"\0asm").unwrap();
        let loader = FsResourceLoader::new(dir.path());

        assert_eq!(loader.load_wasm("/core.wasm").unwrap(), b"\0asm");
        let module = loader.load_module("core.wasm").unwrap();
        assert_eq!(module.url, "core.wasm");
        assert!(matches!(
            loader.load_wasm("missing.wasm"),
            Err(CommonError::Resource { .. })
        ));
    }
}
