//! Slippy-map tile addressing.
//!
//! Uses the XYZ tile naming convention shared by most web tile services:
//! - `z` is the zoom level (0-18)
//! - `x` is the column (0 to 2^z - 1, from west to east)
//! - `y` is the row (0 to 2^z - 1, from north to south)
//!
//! Every increase of one zoom level splits a tile into a 2x2 block, so tile
//! `(z, x, y)` covers exactly the tiles `x*2..=x*2+1, y*2..=y*2+1` at `z + 1`.

use crate::{RegionError, Result};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Minimum valid zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum zoom level served by the tile service.
pub const MAX_ZOOM: u8 = 18;

/// Web Mercator latitude limit (arctan(sinh(pi))).
const MAX_LATITUDE: f64 = 85.0511;

/// XYZ tile coordinates (z, x, y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Zoom level.
    pub z: u8,
    /// X coordinate (column, 0 at 180°W, increases eastward).
    pub x: u32,
    /// Y coordinate (row, 0 at ~85.05°N, increases southward).
    pub y: u32,
}

impl TileCoord {
    /// Create a new tile coordinate.
    ///
    /// The coordinate is not range-checked; see [`TileCoord::is_valid`].
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Whether `x` and `y` lie inside the `2^z x 2^z` grid of this zoom.
    pub fn is_valid(&self) -> bool {
        if self.z > 31 {
            return false;
        }
        let tiles_per_side = 1u64 << self.z;
        u64::from(self.x) < tiles_per_side && u64::from(self.y) < tiles_per_side
    }

    /// Convert latitude/longitude to the tile containing it.
    ///
    /// - x = floor((lon + 180) / 360 * 2^z)
    /// - y = floor((1 - ln(tan(lat) + sec(lat)) / π) / 2 * 2^z)
    ///
    /// Latitude is clamped to the Web Mercator range.
    pub fn from_lat_lon(lat: f64, lon: f64, z: u8) -> Result<Self> {
        if z > MAX_ZOOM {
            return Err(RegionError::InvalidZoomLevel(z));
        }

        let lat_clamped = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let n = (1u32 << z) as f64;

        let x = ((lon + 180.0) / 360.0 * n).floor();
        let lat_rad = lat_clamped.to_radians();
        let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

        // Exactly ±180° lands one past the last column
        let max_coord = ((1u32 << z) - 1) as f64;
        let x = x.clamp(0.0, max_coord) as u32;
        let y = y.clamp(0.0, max_coord) as u32;

        Ok(Self { z, x, y })
    }

    /// Get the bounding box for this tile.
    ///
    /// Returns (min_lat, max_lat, min_lon, max_lon).
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let n = (1u64 << self.z) as f64;

        let min_lon = self.x as f64 / n * 360.0 - 180.0;
        let max_lon = (self.x + 1) as f64 / n * 360.0 - 180.0;

        let max_lat = (PI * (1.0 - 2.0 * self.y as f64 / n)).sinh().atan().to_degrees();
        let min_lat = (PI * (1.0 - 2.0 * (self.y + 1) as f64 / n))
            .sinh()
            .atan()
            .to_degrees();

        (min_lat, max_lat, min_lon, max_lon)
    }

    /// The tile URL under an XYZ service root.
    ///
    /// `{base_url}/{tile_type}/{z}/{x}/{y}.{ext}`
    pub fn url(&self, base_url: &str, tile_type: &str, ext: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}.{}",
            base_url.trim_end_matches('/'),
            tile_type,
            self.z,
            self.x,
            self.y,
            ext
        )
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

impl FromStr for TileCoord {
    type Err = RegionError;

    /// Parse a `z/x/y` string.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RegionError::InvalidTileSpec(s.to_string());
        let mut parts = s.trim().split('/');
        let z = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let x = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let y = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self { z, x, y })
    }
}
