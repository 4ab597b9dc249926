//! Fetching a tile matrix and stacking it into one surface.
//!
//! Assembly runs in two phases:
//! 1. **Fetch**: one task per tile on a rayon pool. Each task yields an
//!    explicit `Result<Cell, FetchError>`; results come back in matrix order
//!    regardless of completion order.
//! 2. **Stack**: failed cells become zero-filled cells of the canonical
//!    shape, each row is concatenated west to east, and rows are stacked
//!    north to south.
//!
//! A fetch failure never aborts assembly. Cancellation does.

use crate::{
    Cell, FetchError, RegionError, Result, ServiceConfig, Surface, TileCoord, TileFormat,
    TileMatrix, TileRequest, TileSource, MAX_ZOOM,
};
use ndarray::{concatenate, Array3, Axis};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tilesurf_metrics::{metric_defs, metrics};
use tracing::{debug, info, warn};

/// Shared flag to abort an in-progress assembly.
///
/// Clones share the flag. Tiles not yet fetched when the flag is raised are
/// skipped, and assembly returns [`RegionError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Settings for building a region.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Edge length of each tile in samples.
    pub tile_size: usize,
    /// Finest zoom a region may be resolved to.
    pub max_zoom: u8,
    /// Fetch worker threads (0 = rayon default).
    pub threads: usize,
    /// Cancellation flag checked before each fetch and before stacking.
    pub cancel: CancelToken,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

impl AssembleOptions {
    /// Options matching a service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            tile_size: config.tile_size,
            max_zoom: config.max_zoom.min(MAX_ZOOM),
            threads: config.threads,
            cancel: CancelToken::new(),
        }
    }

    /// Set the tile size.
    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Set the number of fetch threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Use an existing cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A tile that was replaced by zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFallback {
    /// The tile.
    pub tile: TileCoord,
    /// Row of the tile in the matrix.
    pub row: usize,
    /// Column of the tile in the matrix.
    pub column: usize,
    /// Why it could not be used.
    pub reason: String,
}

/// Outcome of assembling one region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Tiles in the region.
    pub tiles: usize,
    /// Tiles fetched and decoded successfully.
    pub fetched: usize,
    /// Tiles replaced by zero-filled cells, in matrix order.
    pub fallbacks: Vec<TileFallback>,
}

impl AssemblyReport {
    /// Whether every tile was fetched successfully.
    pub fn is_complete(&self) -> bool {
        self.fallbacks.is_empty()
    }
}

/// Fetch every tile of `matrix`, then stack the cells into a surface.
pub fn assemble(
    matrix: &TileMatrix,
    tile_type: &str,
    format: TileFormat,
    source: &dyn TileSource,
    options: &AssembleOptions,
) -> Result<(Surface, AssemblyReport)> {
    let started = Instant::now();
    let cells = fetch_cells(matrix, tile_type, format, source, options)?;

    if options.cancel.is_cancelled() {
        return Err(RegionError::Cancelled);
    }

    let (data, report) = stack_cells(matrix, format, options.tile_size, cells)?;

    metrics::histogram!(metric_defs::REGION_TILES.name).record(matrix.len() as f64);
    metrics::histogram!(metric_defs::REGION_ASSEMBLY_TIME.name)
        .record(started.elapsed().as_secs_f64() * 1000.0);
    info!(
        tiles = report.tiles,
        fallbacks = report.fallbacks.len(),
        shape = ?data.dim(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Assembled region"
    );

    Ok((Surface::from_array(data), report))
}

/// Fetch and decode every tile of `matrix` in parallel.
///
/// The returned cells are in row-major matrix order.
pub fn fetch_cells(
    matrix: &TileMatrix,
    tile_type: &str,
    format: TileFormat,
    source: &dyn TileSource,
    options: &AssembleOptions,
) -> Result<Vec<std::result::Result<Cell, FetchError>>> {
    let tiles: Vec<TileCoord> = matrix.tiles().collect();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .thread_name(|i| format!("tile-fetch-{}", i))
        .build()?;

    debug!(
        tiles = tiles.len(),
        threads = pool.current_num_threads(),
        tile_type,
        %format,
        "Fetching region tiles"
    );

    let cells: Vec<std::result::Result<Cell, FetchError>> = pool.install(|| {
        tiles
            .par_iter()
            .map(|&coord| {
                let request = TileRequest {
                    coord,
                    tile_type,
                    format,
                };
                fetch_cell(source, &request, options)
            })
            .collect()
    });
    Ok(cells)
}

/// Fetch and decode one tile.
fn fetch_cell(
    source: &dyn TileSource,
    request: &TileRequest<'_>,
    options: &AssembleOptions,
) -> std::result::Result<Cell, FetchError> {
    if options.cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    let bytes = source.fetch(request)?;
    let cell = request.format.decode(&bytes, options.tile_size)?;
    debug!(tile = %request.coord, bytes = bytes.len(), "Fetched tile");
    Ok(cell)
}

/// Reduce per-tile results into one array.
///
/// `cells` must be in row-major matrix order, one entry per tile. Failed
/// entries are replaced by the canonical zero cell for `format`.
pub fn stack_cells(
    matrix: &TileMatrix,
    format: TileFormat,
    tile_size: usize,
    cells: Vec<std::result::Result<Cell, FetchError>>,
) -> Result<(Array3<f64>, AssemblyReport)> {
    let mut report = AssemblyReport {
        tiles: matrix.len(),
        ..AssemblyReport::default()
    };

    let label = format.extension();
    let mut resolved = Vec::with_capacity(cells.len());
    for ((index, tile), result) in matrix.tiles().enumerate().zip(cells) {
        match result {
            Ok(cell) => {
                report.fetched += 1;
                metrics::counter!(metric_defs::TILE_FETCHED.name, "format" => label).increment(1);
                resolved.push(cell);
            }
            Err(e) => {
                warn!(tile = %tile, error = %e, "Tile unavailable, substituting zeros");
                metrics::counter!(
                    metric_defs::TILE_FALLBACKS.name,
                    "format" => label,
                    "reason" => e.reason()
                )
                .increment(1);
                report.fallbacks.push(TileFallback {
                    tile,
                    row: index / matrix.columns(),
                    column: index % matrix.columns(),
                    reason: e.to_string(),
                });
                resolved.push(format.zero_cell(tile_size));
            }
        }
    }

    let rows = resolved
        .chunks(matrix.columns())
        .map(|row| {
            let views: Vec<_> = row.iter().map(|cell| cell.view()).collect();
            concatenate(Axis(1), &views)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let views: Vec<_> = rows.iter().map(|row| row.view()).collect();
    let data = concatenate(Axis(0), &views)?;

    Ok((data, report))
}
