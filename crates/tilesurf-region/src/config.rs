//! Tile service configuration.
//!
//! Loaded from YAML; every field has a default so an empty document is a
//! valid configuration:
//!
//! ```yaml
//! base_url: https://cyberjapandata.gsi.go.jp/xyz
//! tile_size: 256
//! max_zoom: 18
//! timeout_secs: 60
//! threads: 0
//! ```

use crate::{Result, MAX_ZOOM};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root URL of the GSI (Geospatial Information Authority of Japan) XYZ tiles.
pub const DEFAULT_BASE_URL: &str = "https://cyberjapandata.gsi.go.jp/xyz";

/// Edge length of one tile in samples.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Default per-request HTTP timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings for talking to a tile service and assembling regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service root; tiles live at `{base_url}/{tile_type}/{z}/{x}/{y}.{ext}`.
    pub base_url: String,
    /// Edge length of every tile in samples.
    pub tile_size: usize,
    /// Finest zoom the service provides.
    pub max_zoom: u8,
    /// Per-request timeout. A timed-out tile is treated like a missing one.
    pub timeout_secs: u64,
    /// Fetch worker threads (0 = one per CPU).
    pub threads: usize,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            max_zoom: MAX_ZOOM,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            threads: 0,
            user_agent: concat!("tilesurf/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ServiceConfig {
    /// Parse a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
