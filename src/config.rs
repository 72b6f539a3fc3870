//! Engine configuration
//!
//! Most tolerances scale with the scan resolution. Fields left unset fall
//! back to a DPI-derived default.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dpi: f64,
    /// Radius used when matching a junction trace's endpoints to netted elements
    pub junction_tolerance_px: f64,
    pub side_match_tolerance_px: Option<f64>,
    pub simplify_epsilon_px: f64,
    pub path_search_radius_px: Option<f64>,
    pub manual_via_radius_px: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dpi: 600.0,
            junction_tolerance_px: 5.0,
            side_match_tolerance_px: None,
            simplify_epsilon_px: 1.5,
            path_search_radius_px: None,
            manual_via_radius_px: None,
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        anyhow::ensure!(config.dpi > 0.0, "dpi must be positive, got {}", config.dpi);
        Ok(config)
    }

    pub fn side_match_tolerance(&self) -> f64 {
        self.side_match_tolerance_px
            .unwrap_or_else(|| (0.02 * self.dpi).max(8.0))
    }

    pub fn path_search_radius(&self) -> f64 {
        self.path_search_radius_px
            .unwrap_or_else(|| (0.02 * self.dpi).max(10.0))
    }

    pub fn manual_via_radius(&self) -> f64 {
        self.manual_via_radius_px
            .unwrap_or_else(|| (0.01 * self.dpi).max(4.0))
    }
}
