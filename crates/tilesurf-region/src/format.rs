//! Tile formats and their decoding into numeric cells.
//!
//! Every tile decodes to a [`Cell`]: a `rows x columns x channels` array of
//! `f64`. Image tiles carry three channels (RGB), elevation text tiles one.

use crate::{FetchError, RegionError};
use ndarray::Array3;
use std::fmt;
use std::str::FromStr;

/// Decoded numeric content of one tile.
pub type Cell = Array3<f64>;

/// Token the elevation service uses for "no data" (sea surface).
pub const NO_DATA_TOKEN: &str = "e";

/// Elevation assigned to no-data samples.
pub const NO_DATA_ELEVATION: f64 = 0.0;

/// Supported tile file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
    /// PNG image tile.
    Png,
    /// JPEG image tile.
    Jpg,
    /// Comma-separated elevation grid.
    Txt,
}

impl TileFormat {
    /// File extension used in tile URLs.
    pub const fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpg => "jpg",
            TileFormat::Txt => "txt",
        }
    }

    /// Whether the format decodes to an RGB image.
    pub const fn is_image(&self) -> bool {
        matches!(self, TileFormat::Png | TileFormat::Jpg)
    }

    /// Number of channels in a decoded cell.
    pub const fn channels(&self) -> usize {
        if self.is_image() {
            3
        } else {
            1
        }
    }

    /// Canonical `(rows, columns, channels)` shape of one cell.
    pub const fn cell_dim(&self, tile_size: usize) -> (usize, usize, usize) {
        (tile_size, tile_size, self.channels())
    }

    /// Zero-filled cell substituted for a tile that could not be fetched.
    pub fn zero_cell(&self, tile_size: usize) -> Cell {
        Cell::zeros(self.cell_dim(tile_size))
    }

    /// Decode raw tile bytes and check the result has the canonical shape.
    pub fn decode(&self, bytes: &[u8], tile_size: usize) -> Result<Cell, FetchError> {
        let cell = match self {
            TileFormat::Png | TileFormat::Jpg => decode_image(bytes)?,
            TileFormat::Txt => parse_elevation_text(&String::from_utf8_lossy(bytes))?,
        };
        check_shape(cell, self.cell_dim(tile_size))
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TileFormat {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(TileFormat::Png),
            "jpg" => Ok(TileFormat::Jpg),
            "txt" => Ok(TileFormat::Txt),
            other => Err(RegionError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Decode PNG/JPEG bytes to a `H x W x 3` cell. Alpha is dropped.
pub fn decode_image(bytes: &[u8]) -> Result<Cell, FetchError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    let shape = (height as usize, width as usize, 3);
    let samples: Vec<f64> = rgb.into_raw().into_iter().map(f64::from).collect();
    let len = samples.len();
    Cell::from_shape_vec(shape, samples).map_err(|_| FetchError::ShapeMismatch {
        expected: vec![shape.0, shape.1, shape.2],
        actual: vec![len],
    })
}

/// Resolve the no-data sentinel.
///
/// Returns the substituted elevation for [`NO_DATA_TOKEN`], `None` for any
/// other token.
pub fn resolve_no_data(token: &str) -> Option<f64> {
    (token == NO_DATA_TOKEN).then_some(NO_DATA_ELEVATION)
}

/// Parse one elevation token, applying the no-data step first.
pub fn parse_elevation_token(token: &str) -> Option<f64> {
    let token = token.trim();
    resolve_no_data(token).or_else(|| token.parse().ok())
}

/// Parse a newline-delimited, comma-separated elevation grid to `H x W x 1`.
///
/// Blank lines are skipped. Every row must have the same number of tokens.
pub fn parse_elevation_text(text: &str) -> Result<Cell, FetchError> {
    let mut samples = Vec::new();
    let mut rows = 0;
    let mut columns = None;

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let mut count = 0;
        for (column, token) in line.split(',').enumerate() {
            let value = parse_elevation_token(token).ok_or_else(|| FetchError::Parse {
                row: rows,
                column,
                token: token.to_string(),
            })?;
            samples.push(value);
            count += 1;
        }

        match columns {
            None => columns = Some(count),
            Some(expected) if expected != count => {
                return Err(FetchError::ShapeMismatch {
                    expected: vec![rows + 1, expected],
                    actual: vec![rows + 1, count],
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let columns = columns.unwrap_or(0);
    let len = samples.len();
    Cell::from_shape_vec((rows, columns, 1), samples).map_err(|_| FetchError::ShapeMismatch {
        expected: vec![rows, columns, 1],
        actual: vec![len],
    })
}

/// Reject a decoded cell whose shape differs from the canonical one.
fn check_shape(cell: Cell, expected: (usize, usize, usize)) -> Result<Cell, FetchError> {
    if cell.dim() == expected {
        Ok(cell)
    } else {
        let (h, w, c) = cell.dim();
        Err(FetchError::ShapeMismatch {
            expected: vec![expected.0, expected.1, expected.2],
            actual: vec![h, w, c],
        })
    }
}
