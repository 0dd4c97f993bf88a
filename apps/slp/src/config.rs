//! # Ledger Configuration
//!
//! TOML file with pipeline parameters and the reference embedding backend:
//!
//! ```toml
//! [params]
//! embedding_version = "toy-hash-dim64"
//! k = 8
//! p = 4
//! tau = 0.6
//! delta = 0.1
//!
//! [params.novelty]
//! k = 8
//! r = 0.3
//! alpha = 1.0
//! beta = 1.0
//!
//! [embedding]
//! dim = 64
//! seed = 0
//! ```
//!
//! Every key is optional. A missing file means all defaults.

use serde::{Deserialize, Serialize};
use slp_core::{CoreParams, HashEmbedder, SlpError};
use std::path::Path;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Reference backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dim: usize,
    pub seed: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dim: 64, seed: 0 }
    }
}

/// Everything a command needs to run the pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub params: CoreParams,
    pub embedding: EmbeddingConfig,
}

impl LedgerConfig {
    /// Load from `path`, or defaults when no path is given or the file is absent.
    pub fn load(path: Option<&Path>) -> Result<Self, SlpError> {
        let config = match path {
            Some(path) if path.exists() => {
                let size = std::fs::metadata(path)
                    .map_err(|e| SlpError::IoError(format!("Cannot read config metadata: {}", e)))?
                    .len();
                if size > MAX_CONFIG_FILE_SIZE {
                    return Err(SlpError::InvalidInput(format!(
                        "Config file size {} bytes exceeds maximum {} bytes",
                        size, MAX_CONFIG_FILE_SIZE
                    )));
                }
                let content = std::fs::read_to_string(path)
                    .map_err(|e| SlpError::IoError(format!("Read config: {}", e)))?;
                Self::from_toml(&content)?
            }
            Some(path) => {
                tracing::debug!("Config file {:?} not found, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, SlpError> {
        toml::from_str(content)
            .map_err(|e| SlpError::InvalidInput(format!("Invalid config: {}", e)))
    }

    /// Check params and that they select the configured backend's version.
    pub fn validate(&self) -> Result<(), SlpError> {
        self.params.validate()?;
        let embedder = self.build_embedder()?;
        let backend_version = slp_core::Embedder::version(&embedder).name();
        if backend_version != self.params.embedding_version {
            return Err(SlpError::InvalidInput(format!(
                "params.embedding_version is {} but [embedding] produces {}",
                self.params.embedding_version, backend_version
            )));
        }
        Ok(())
    }

    /// Build the reference backend described by `[embedding]`.
    pub fn build_embedder(&self) -> Result<HashEmbedder, SlpError> {
        HashEmbedder::new(self.embedding.dim, self.embedding.seed)
    }
}
