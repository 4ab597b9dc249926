//! # tilesurf-region
//!
//! Stitch XYZ map tiles into one numeric surface and estimate its gradient.
//!
//! This crate provides:
//! - Tile-coordinate algebra: a rectangle given by two corner tiles, possibly
//!   at coarser zoom levels, resolved to the exact tiles at a target zoom
//! - Region assembly: parallel per-tile fetch, decode of PNG/JPEG imagery or
//!   comma-separated elevation text, zero-fill of tiles that cannot be
//!   fetched, and stacking into one contiguous array
//! - A triangulated gradient estimator over the assembled surface
//!
//! ## Tile Service
//!
//! Tiles are addressed as `{base_url}/{tile_type}/{z}/{x}/{y}.{ext}`. The
//! default service is the GSI tile server
//! (`https://cyberjapandata.gsi.go.jp/xyz`), where `std` is the standard
//! map (PNG) and `dem` the elevation grid (TXT, `e` marks sea/no-data).
//!
//! ## Examples
//!
//! ```no_run
//! use tilesurf_region::{build_region, AssembleOptions, HttpTileSource, RegionDescriptor, TileCoord, TileFormat};
//!
//! let source = HttpTileSource::new()?;
//! let region = RegionDescriptor::new(TileCoord::new(14, 14552, 6451), "dem", TileFormat::Txt)
//!     .with_to(TileCoord::new(14, 14553, 6451));
//!
//! let region = build_region(&region, &source, &AssembleOptions::default())?;
//! let surface = region.surface();
//! println!("shape: {:?}", surface.shape());
//!
//! let slope = surface.gradient_magnitude(100.5, 80.25)?;
//! let aspect = surface.gradient_direction(100.5, 80.25)?;
//! println!("slope {slope:.2} m/sample, direction {aspect:.3} rad");
//! # Ok::<(), tilesurf_region::RegionError>(())
//! ```

mod assemble;
mod config;
mod coord;
mod error;
mod format;
mod resolve;
mod source;
mod surface;

pub use assemble::{
    assemble, fetch_cells, stack_cells, AssembleOptions, AssemblyReport, CancelToken, TileFallback,
};
pub use config::{ServiceConfig, DEFAULT_BASE_URL, DEFAULT_TILE_SIZE, DEFAULT_TIMEOUT_SECS};
pub use coord::{TileCoord, MAX_ZOOM, MIN_ZOOM};
pub use error::{FetchError, RegionError};
pub use format::{
    decode_image, parse_elevation_text, parse_elevation_token, resolve_no_data, Cell, TileFormat,
    NO_DATA_ELEVATION, NO_DATA_TOKEN,
};
pub use resolve::{resolve, RegionDescriptor, TileMatrix};
pub use source::{DirectoryTileSource, DownloadStats, HttpTileSource, TileRequest, TileSource};
pub use surface::{Gradient, Surface};

/// Result type for region operations.
pub type Result<T> = std::result::Result<T, RegionError>;

/// An assembled region: the tiles it covers and the surface built from them.
#[derive(Debug, Clone)]
pub struct Region {
    descriptor: RegionDescriptor,
    matrix: TileMatrix,
    surface: Surface,
    report: AssemblyReport,
}

impl Region {
    /// The request this region was built from.
    pub fn descriptor(&self) -> &RegionDescriptor {
        &self.descriptor
    }

    /// Tiles covered, at the target zoom.
    pub fn matrix(&self) -> &TileMatrix {
        &self.matrix
    }

    /// The assembled surface.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Per-tile fetch outcome.
    pub fn report(&self) -> &AssemblyReport {
        &self.report
    }

    /// Consume the region, keeping only the surface.
    pub fn into_surface(self) -> Surface {
        self.surface
    }
}

/// Resolve, fetch and stack a region.
///
/// Configuration errors are returned before any tile is fetched. Tiles that
/// cannot be fetched or decoded are zero-filled and listed in the report.
pub fn build_region(
    descriptor: &RegionDescriptor,
    source: &dyn TileSource,
    options: &AssembleOptions,
) -> Result<Region> {
    let matrix = descriptor.resolve(options.max_zoom)?;
    let (surface, report) = assemble(
        &matrix,
        descriptor.tile_type(),
        descriptor.format(),
        source,
        options,
    )?;

    Ok(Region {
        descriptor: descriptor.clone(),
        matrix,
        surface,
        report,
    })
}
