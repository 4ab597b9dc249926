//! Region descriptors and their resolution into tile matrices.

use crate::{RegionError, Result, TileCoord, TileFormat};
use tracing::{debug, warn};

/// A rectangle of tiles requested by its two corner tiles.
///
/// The corners may be given at different zoom levels; the region is always
/// resolved at a single target zoom no coarser than either corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDescriptor {
    from: TileCoord,
    to: Option<TileCoord>,
    zoom: Option<u8>,
    tile_type: String,
    format: TileFormat,
}

impl RegionDescriptor {
    /// Describe the single tile `from`.
    pub fn new(from: TileCoord, tile_type: impl Into<String>, format: TileFormat) -> Self {
        Self {
            from,
            to: None,
            zoom: None,
            tile_type: tile_type.into(),
            format,
        }
    }

    /// Describe a region from a file extension string.
    ///
    /// Fails with [`RegionError::UnsupportedFormat`] for anything other than
    /// `png`, `jpg` or `txt`.
    pub fn with_extension(from: TileCoord, tile_type: impl Into<String>, ext: &str) -> Result<Self> {
        Ok(Self::new(from, tile_type, ext.parse()?))
    }

    /// Describe the tiles covering a lat/lon bounding box at `zoom`.
    pub fn from_bounds(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
        zoom: u8,
        tile_type: impl Into<String>,
        format: TileFormat,
    ) -> Result<Self> {
        let from = TileCoord::from_lat_lon(max_lat, min_lon, zoom)?;
        let to = TileCoord::from_lat_lon(min_lat, max_lon, zoom)?;
        Ok(Self::new(from, tile_type, format).with_to(to))
    }

    /// Set the bottom-right corner tile.
    pub fn with_to(mut self, to: TileCoord) -> Self {
        self.to = Some(to);
        self
    }

    /// Set the target zoom.
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Top-left corner tile.
    pub fn from_tile(&self) -> TileCoord {
        self.from
    }

    /// Bottom-right corner tile (the top-left one when omitted).
    pub fn to_tile(&self) -> TileCoord {
        self.to.unwrap_or(self.from)
    }

    /// Target zoom (the top-left tile's zoom when omitted).
    pub fn zoom(&self) -> u8 {
        self.zoom.unwrap_or(self.from.z)
    }

    /// Tile layer name, e.g. `std` or `dem`.
    pub fn tile_type(&self) -> &str {
        &self.tile_type
    }

    /// Tile file format.
    pub fn format(&self) -> TileFormat {
        self.format
    }

    /// Resolve the descriptor to the tiles it covers.
    pub fn resolve(&self, max_zoom: u8) -> Result<TileMatrix> {
        resolve(self.from_tile(), self.to_tile(), self.zoom(), max_zoom)
    }
}

/// Row-major grid of tiles at one zoom level.
///
/// Rows run north to south (`y` ascending), columns west to east
/// (`x` ascending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMatrix {
    zoom: u8,
    origin_x: u32,
    origin_y: u32,
    columns: usize,
    rows: usize,
}

impl TileMatrix {
    /// Zoom level of every tile in the matrix.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Number of tile rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of tile columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.rows * self.columns
    }

    /// Always false for a resolved matrix.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tile at a matrix position.
    pub fn get(&self, row: usize, column: usize) -> Option<TileCoord> {
        (row < self.rows && column < self.columns).then(|| {
            TileCoord::new(
                self.zoom,
                self.origin_x + column as u32,
                self.origin_y + row as u32,
            )
        })
    }

    /// Iterate over all tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..self.rows).flat_map(move |row| self.row(row))
    }

    /// Iterate over the tiles of one row, west to east.
    pub fn row(&self, row: usize) -> impl Iterator<Item = TileCoord> + '_ {
        let y = self.origin_y + row as u32;
        (0..self.columns).map(move |column| TileCoord::new(self.zoom, self.origin_x + column as u32, y))
    }

    /// The matrix as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<TileCoord>> {
        (0..self.rows).map(|row| self.row(row).collect()).collect()
    }
}

/// Map a region given by two corner tiles onto the tiles at `zoom`.
///
/// Both corners must be at or coarser than `zoom`, and `zoom` must not
/// exceed `max_zoom`. The top-left tile scales to the first fine tile it
/// covers, the bottom-right tile to the last fine tile it covers.
pub fn resolve(from: TileCoord, to: TileCoord, zoom: u8, max_zoom: u8) -> Result<TileMatrix> {
    if zoom > max_zoom {
        return Err(RegionError::ZoomAboveMax { zoom, max_zoom });
    }
    for corner in [from, to] {
        if corner.z > zoom {
            return Err(RegionError::ZoomCoarserThanCorner { zoom, corner });
        }
        if !corner.is_valid() {
            warn!(tile = %corner, "Corner tile lies outside the tile grid of its zoom");
        }
    }

    let overflow = |tile: TileCoord| RegionError::InvalidTile { tile, zoom };

    let from_scale = scale_factor(from.z, zoom).ok_or_else(|| overflow(from))?;
    let x1 = from.x.checked_mul(from_scale).ok_or_else(|| overflow(from))?;
    let y1 = from.y.checked_mul(from_scale).ok_or_else(|| overflow(from))?;

    // One past the corner, scaled, minus one: the last fine tile it covers
    let to_scale = scale_factor(to.z, zoom).ok_or_else(|| overflow(to))?;
    let last_covered = |v: u32| {
        v.checked_add(1)
            .and_then(|v| v.checked_mul(to_scale))
            .map(|v| v - 1)
            .ok_or_else(|| overflow(to))
    };
    let x2 = last_covered(to.x)?;
    let y2 = last_covered(to.y)?;

    if x2 < x1 || y2 < y1 {
        return Err(RegionError::EmptyRegion { from, to, zoom });
    }

    let matrix = TileMatrix {
        zoom,
        origin_x: x1,
        origin_y: y1,
        columns: (x2 - x1) as usize + 1,
        rows: (y2 - y1) as usize + 1,
    };
    debug!(
        zoom,
        x1, y1, x2, y2,
        tiles = matrix.len(),
        "Resolved region"
    );
    Ok(matrix)
}

/// `2^(zoom - corner_zoom)`, or `None` if it does not fit in a `u32`.
fn scale_factor(corner_zoom: u8, zoom: u8) -> Option<u32> {
    1u32.checked_shl(u32::from(zoom - corner_zoom))
}
