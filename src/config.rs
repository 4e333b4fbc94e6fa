//! Runtime configuration for a stencil store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default maximum composition depth enforced by the materialization engine.
pub const DEFAULT_MAX_EMBED_DEPTH: usize = 5;

/// Configuration consumed when opening a [`crate::SchemaComposer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StencilConfig {
    /// Directory holding the sled database.
    pub storage_path: PathBuf,
    /// Maximum number of blueprint levels a composition chain may span.
    #[serde(default = "default_max_embed_depth")]
    pub max_embed_depth: usize,
}

fn default_max_embed_depth() -> usize {
    DEFAULT_MAX_EMBED_DEPTH
}

impl StencilConfig {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            max_embed_depth: DEFAULT_MAX_EMBED_DEPTH,
        }
    }

    pub fn with_max_embed_depth(mut self, depth: usize) -> Self {
        self.max_embed_depth = depth;
        self
    }
}
