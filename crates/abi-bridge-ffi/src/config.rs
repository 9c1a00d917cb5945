//! Resolver configuration, read from RON.
//!
//! ```ron
//! (
//!     libraries: ["libstdc++.so.6"],
//!     aliases: { "__cxa_free_exception": "my_free_exception" },
//!     search_default: true,
//!     builtins: true,
//! )
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FfiConfig {
    /// Shared libraries to load and search, in order
    pub libraries: Vec<PathBuf>,
    /// Native name -> replacement native name, applied after stripping `@`
    pub aliases: HashMap<String, String>,
    /// Fall back to the process's default symbol namespace
    pub search_default: bool,
    /// Register the bundled support routines (currently `getNullPointer`)
    pub builtins: bool,
}

impl Default for FfiConfig {
    fn default() -> Self {
        FfiConfig {
            libraries: Vec::new(),
            aliases: HashMap::new(),
            search_default: true,
            builtins: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

impl FfiConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&source)
    }
}
