//! Preview cache configuration.

use poolview_core::{PoolViewError, Result};
use poolview_render::RenderSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the preview cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Settings for the default transform pipeline.
    pub render: RenderSettings,

    /// Run the transform pipeline on tokio's blocking pool instead of the
    /// calling task.
    pub render_on_blocking_pool: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            render: RenderSettings::default(),
            render_on_blocking_pool: true,
        }
    }
}

impl PreviewConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PoolViewError::Config(format!("Failed to parse preview config: {e}")))
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PoolViewError::Config(format!("Failed to serialize preview config: {e}")))
    }
}
