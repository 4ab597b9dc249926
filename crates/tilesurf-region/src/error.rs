//! Error types for the region crate.

use crate::TileCoord;
use thiserror::Error;

/// Errors that abort region construction or a single surface query.
///
/// Per-tile fetch failures are not part of this enum; they are reported as
/// [`FetchError`] and absorbed by the assembler.
#[derive(Debug, Error)]
pub enum RegionError {
    /// Target zoom is finer than the tile service supports.
    #[error("Zoom level {zoom} exceeds the maximum zoom {max_zoom}")]
    ZoomAboveMax {
        /// Requested target zoom.
        zoom: u8,
        /// Configured maximum zoom.
        max_zoom: u8,
    },

    /// Target zoom is coarser than one of the corner tiles.
    #[error("Target zoom {zoom} is coarser than corner tile {corner} (zoom {})", .corner.z)]
    ZoomCoarserThanCorner {
        /// Requested target zoom.
        zoom: u8,
        /// The corner tile whose zoom is finer than the target.
        corner: TileCoord,
    },

    /// The bottom-right corner lies left of or above the top-left corner.
    #[error("Region from {from} to {to} at zoom {zoom} covers no tiles")]
    EmptyRegion {
        /// Top-left corner tile.
        from: TileCoord,
        /// Bottom-right corner tile.
        to: TileCoord,
        /// Target zoom.
        zoom: u8,
    },

    /// Tile index arithmetic overflowed.
    #[error("Tile {tile} cannot be scaled to zoom {zoom}")]
    InvalidTile {
        /// The offending tile.
        tile: TileCoord,
        /// Target zoom.
        zoom: u8,
    },

    /// Invalid zoom level for a lat/lon conversion.
    #[error("Invalid zoom level {0} (must be 0-18)")]
    InvalidZoomLevel(u8),

    /// A `z/x/y` tile string could not be parsed.
    #[error("Invalid tile specification '{0}' (expected z/x/y)")]
    InvalidTileSpec(String),

    /// Unsupported tile file extension.
    #[error("Unsupported tile format '{0}' (only png, jpg and txt are supported)")]
    UnsupportedFormat(String),

    /// Query point has no `+1` neighbor in one of the axes.
    #[error("Point ({x}, {y}) is outside the gradient domain of a {width}x{height} surface")]
    OutOfBounds {
        /// Requested column coordinate.
        x: f64,
        /// Requested row coordinate.
        y: f64,
        /// Surface width in samples.
        width: usize,
        /// Surface height in samples.
        height: usize,
    },

    /// Channel index does not exist on the surface.
    #[error("Channel {channel} out of range (surface has {channels})")]
    ChannelOutOfRange {
        /// Requested channel.
        channel: usize,
        /// Number of channels on the surface.
        channels: usize,
    },

    /// Tile cells could not be stacked into one array.
    #[error("Cannot stack tiles: {0}")]
    Stack(#[from] ndarray::ShapeError),

    /// Region construction was cancelled.
    #[error("Region assembly cancelled")]
    Cancelled,

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Worker pool could not be constructed.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Reasons a single tile could not be turned into a cell.
///
/// These never escape [`build_region`](crate::build_region): the tile is
/// replaced by a zero-filled cell instead.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Tile not available from the source.
    #[error("Tile not found")]
    NotFound,

    /// Image bytes could not be decoded.
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// Elevation text could not be parsed.
    #[error("Elevation parse error at row {row}, column {column}: '{token}'")]
    Parse {
        /// Zero-based row of the bad token.
        row: usize,
        /// Zero-based column of the bad token.
        column: usize,
        /// The token as read.
        token: String,
    },

    /// Decoded content does not have the canonical tile shape.
    #[error("Tile shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        /// Canonical shape.
        expected: Vec<usize>,
        /// Shape that was decoded.
        actual: Vec<usize>,
    },

    /// Fetch skipped because the region was cancelled.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Http(_) => "http",
            FetchError::Status(_) => "status",
            FetchError::NotFound => "not_found",
            FetchError::Decode(_) => "decode",
            FetchError::Parse { .. } => "parse",
            FetchError::ShapeMismatch { .. } => "shape",
            FetchError::Cancelled => "cancelled",
        }
    }
}
