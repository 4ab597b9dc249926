//! Assembled surfaces and the triangulated gradient estimator.
//!
//! A [`Surface`] is a `rows x columns x channels` grid of samples. Point
//! queries use continuous coordinates: `x` runs along columns, `y` along
//! rows, and integer coordinates land exactly on samples.
//!
//! ## Gradient model
//!
//! Each unit cell with corners `(fx, fy)` and `(fx + 1, fy + 1)` is split
//! along its main diagonal into two triangles. The surface is flat within
//! each triangle, so the gradient is constant inside a triangle and jumps
//! across the diagonal:
//!
//! ```text
//!  (fx,fy) ──── (fx+1,fy)
//!     │ ╲   upper   │
//!     │   ╲         │
//!     │ lower ╲     │
//!  (fx,fy+1) ── (fx+1,fy+1)
//! ```
//!
//! - lower-left (`dx + dy < 1`): forward differences from `(fx, fy)`
//! - upper-right (`dx + dy >= 1`): backward differences from `(fx+1, fy+1)`
//!
//! Points exactly on the diagonal belong to the upper-right triangle.

use crate::{RegionError, Result};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use std::f64::consts::PI;

/// Gradient of a surface at a point, in value units per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    /// Change along `x` (columns, west to east).
    pub gx: f64,
    /// Change along `y` (rows, north to south).
    pub gy: f64,
}

impl Gradient {
    /// Euclidean length `sqrt(gx² + gy²)`.
    pub fn magnitude(&self) -> f64 {
        self.gx.hypot(self.gy)
    }

    /// Angle `atan2(gy, gx)` in radians, in `(-π, π]`.
    pub fn direction(&self) -> f64 {
        let angle = self.gy.atan2(self.gx);
        // atan2(-0.0, negative) yields -π
        if angle == -PI {
            PI
        } else {
            angle
        }
    }
}

impl From<Gradient> for (f64, f64) {
    fn from(g: Gradient) -> Self {
        (g.gx, g.gy)
    }
}

/// Which triangle of a unit cell a point falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Triangle {
    LowerLeft,
    UpperRight,
}

/// A located query point: the top-left sample of its unit cell and triangle.
#[derive(Debug, Clone, Copy)]
struct CellPoint {
    column: usize,
    row: usize,
    triangle: Triangle,
}

/// Contiguous grid of samples assembled from a region's tiles.
///
/// Immutable once built; every query borrows it read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    /// Samples indexed `[row, column, channel]`.
    data: Array3<f64>,
}

impl Surface {
    /// Wrap an existing `rows x columns x channels` array.
    pub fn from_array(data: Array3<f64>) -> Self {
        Self { data }
    }

    /// Wrap a single-channel `rows x columns` grid.
    pub fn from_grid(grid: Array2<f64>) -> Self {
        Self {
            data: grid.insert_axis(Axis(2)),
        }
    }

    /// The backing samples, indexed `[row, column, channel]`.
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Consume the surface, returning its samples.
    pub fn into_data(self) -> Array3<f64> {
        self.data
    }

    /// Shape as `[rows, columns]` for single-channel surfaces and
    /// `[rows, columns, channels]` otherwise.
    pub fn shape(&self) -> Vec<usize> {
        let (rows, columns, channels) = self.data.dim();
        if channels == 1 {
            vec![rows, columns]
        } else {
            vec![rows, columns, channels]
        }
    }

    /// Number of sample columns (`shape_x`).
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    /// Number of sample rows (`shape_y`).
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Number of channels (1 for elevation, 3 for RGB imagery).
    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// Sample at an integer position.
    pub fn value(&self, column: usize, row: usize, channel: usize) -> Option<f64> {
        self.data.get([row, column, channel]).copied()
    }

    /// A single channel as a `rows x columns` view.
    pub fn channel(&self, channel: usize) -> Result<ArrayView2<'_, f64>> {
        self.check_channel(channel)?;
        Ok(self.data.index_axis(Axis(2), channel))
    }

    /// Gradient of channel 0 at `(x, y)`.
    pub fn gradient(&self, x: f64, y: f64) -> Result<Gradient> {
        self.channel_gradient(0, x, y)
    }

    /// Gradient magnitude of channel 0 at `(x, y)`.
    pub fn gradient_magnitude(&self, x: f64, y: f64) -> Result<f64> {
        Ok(self.gradient(x, y)?.magnitude())
    }

    /// Gradient direction of channel 0 at `(x, y)`, in radians.
    pub fn gradient_direction(&self, x: f64, y: f64) -> Result<f64> {
        Ok(self.gradient(x, y)?.direction())
    }

    /// Gradient of one channel at `(x, y)`.
    pub fn channel_gradient(&self, channel: usize, x: f64, y: f64) -> Result<Gradient> {
        self.check_channel(channel)?;
        let point = self.locate(x, y)?;
        Ok(self.triangle_gradient(point, channel))
    }

    /// Gradient of every channel at `(x, y)`, in channel order.
    pub fn gradients(&self, x: f64, y: f64) -> Result<Vec<Gradient>> {
        let point = self.locate(x, y)?;
        Ok((0..self.channels())
            .map(|channel| self.triangle_gradient(point, channel))
            .collect())
    }

    fn check_channel(&self, channel: usize) -> Result<()> {
        if channel < self.channels() {
            Ok(())
        } else {
            Err(RegionError::ChannelOutOfRange {
                channel,
                channels: self.channels(),
            })
        }
    }

    /// Find the unit cell and triangle containing `(x, y)`.
    ///
    /// The cell's `+1` neighbors must exist in both axes.
    fn locate(&self, x: f64, y: f64) -> Result<CellPoint> {
        let out_of_bounds = || RegionError::OutOfBounds {
            x,
            y,
            width: self.width(),
            height: self.height(),
        };

        if !x.is_finite() || !y.is_finite() {
            return Err(out_of_bounds());
        }

        let fx = x.floor();
        let fy = y.floor();
        let max_fx = self.width() as f64 - 2.0;
        let max_fy = self.height() as f64 - 2.0;
        if fx < 0.0 || fy < 0.0 || fx > max_fx || fy > max_fy {
            return Err(out_of_bounds());
        }

        let triangle = if (x - fx) + (y - fy) < 1.0 {
            Triangle::LowerLeft
        } else {
            Triangle::UpperRight
        };

        Ok(CellPoint {
            column: fx as usize,
            row: fy as usize,
            triangle,
        })
    }

    fn triangle_gradient(&self, point: CellPoint, channel: usize) -> Gradient {
        let (c, r) = (point.column, point.row);
        let s = |row: usize, column: usize| self.data[[row, column, channel]];

        match point.triangle {
            Triangle::LowerLeft => Gradient {
                gx: s(r, c + 1) - s(r, c),
                gy: s(r + 1, c) - s(r, c),
            },
            Triangle::UpperRight => Gradient {
                gx: s(r + 1, c + 1) - s(r + 1, c),
                gy: s(r + 1, c + 1) - s(r, c + 1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// 3x3 grid where every corner of the (0,0) cell differs.
    ///
    /// ```text
    /// 0  1  5
    /// 2  7  9
    /// 4  8  3
    /// ```
    fn asymmetric() -> Surface {
        Surface::from_grid(array![[0.0, 1.0, 5.0], [2.0, 7.0, 9.0], [4.0, 8.0, 3.0]])
    }

    #[test]
    fn test_shape() {
        let surface = asymmetric();
        assert_eq!(surface.shape(), vec![3, 3]);
        assert_eq!((surface.width(), surface.height(), surface.channels()), (3, 3, 1));

        let rgb = Surface::from_array(Array3::zeros((2, 4, 3)));
        assert_eq!(rgb.shape(), vec![2, 4, 3]);
        assert_eq!((rgb.width(), rgb.height()), (4, 2));
    }

    #[test]
    fn test_constant_surface_has_zero_gradient() {
        let surface = Surface::from_grid(Array2::from_elem((5, 6), 42.0));
        for &(x, y) in &[(0.0, 0.0), (0.25, 0.25), (0.9, 0.9), (3.5, 2.5), (4.99, 3.99), (2.0, 1.0)] {
            let g = surface.gradient(x, y).unwrap();
            assert_eq!((g.gx, g.gy), (0.0, 0.0), "at ({x}, {y})");
        }
    }

    #[test]
    fn test_lower_left_triangle() {
        let g = asymmetric().gradient(0.2, 0.3).unwrap();
        // gx = S[0][1] - S[0][0], gy = S[1][0] - S[0][0]
        assert_eq!((g.gx, g.gy), (1.0, 2.0));
    }

    #[test]
    fn test_upper_right_triangle() {
        let g = asymmetric().gradient(0.8, 0.7).unwrap();
        // gx = S[1][1] - S[1][0], gy = S[1][1] - S[0][1]
        assert_eq!((g.gx, g.gy), (5.0, 6.0));
    }

    #[test]
    fn test_diagonal_tie_uses_upper_right() {
        let surface = asymmetric();
        for &(x, y) in &[(0.5, 0.5), (0.25, 0.75), (0.875, 0.125)] {
            let g = surface.gradient(x, y).unwrap();
            assert_eq!(g, Gradient { gx: 5.0, gy: 6.0 }, "at ({x}, {y})");
        }
        // (1, 0) is the top-left corner of the next cell over, not a tie
        assert_eq!(surface.gradient(1.0, 0.0).unwrap(), Gradient { gx: 4.0, gy: 6.0 });
    }

    #[test]
    fn test_gradient_discontinuous_across_diagonal() {
        let surface = asymmetric();
        let below = surface.gradient(0.5, 0.4999).unwrap();
        let on = surface.gradient(0.5, 0.5).unwrap();
        assert_ne!(below, on);
        assert_eq!(on, surface.gradient(0.5, 0.5001).unwrap());
    }

    #[test]
    fn test_interior_cell() {
        let g = asymmetric().gradient(1.5, 1.6).unwrap();
        // Upper-right of cell (1,1): gx = S[2][2] - S[2][1], gy = S[2][2] - S[1][2]
        assert_eq!((g.gx, g.gy), (-5.0, -6.0));
    }

    #[test]
    fn test_magnitude_and_direction() {
        let surface = asymmetric();
        for &(x, y) in &[(0.2, 0.3), (0.8, 0.7), (1.5, 1.6), (1.1, 0.2)] {
            let (gx, gy): (f64, f64) = surface.gradient(x, y).unwrap().into();
            assert_relative_eq!(
                surface.gradient_magnitude(x, y).unwrap(),
                (gx * gx + gy * gy).sqrt()
            );
            assert_relative_eq!(surface.gradient_direction(x, y).unwrap(), gy.atan2(gx));
        }
        assert_relative_eq!(surface.gradient_magnitude(0.2, 0.3).unwrap(), 5.0_f64.sqrt());
    }

    #[test]
    fn test_direction_range() {
        assert_relative_eq!(Gradient { gx: -1.0, gy: -0.0 }.direction(), PI);
        assert_relative_eq!(Gradient { gx: -1.0, gy: 0.0 }.direction(), PI);
        assert_relative_eq!(Gradient { gx: 0.0, gy: -1.0 }.direction(), -PI / 2.0);
        assert_eq!(Gradient { gx: 0.0, gy: 0.0 }.direction(), 0.0);
    }

    #[test]
    fn test_no_right_neighbor_is_out_of_bounds() {
        let surface = asymmetric();
        // fx = shape_x - 1
        assert!(matches!(
            surface.gradient(2.0, 0.5),
            Err(RegionError::OutOfBounds { width: 3, height: 3, .. })
        ));
        assert!(matches!(surface.gradient(2.5, 0.5), Err(RegionError::OutOfBounds { .. })));
        // fy = shape_y - 1
        assert!(matches!(surface.gradient(0.5, 2.0), Err(RegionError::OutOfBounds { .. })));
        // Just inside the last cell
        assert!(surface.gradient(1.999, 1.999).is_ok());
    }

    #[test]
    fn test_negative_and_non_finite_out_of_bounds() {
        let surface = asymmetric();
        for &(x, y) in &[(-0.1, 0.5), (0.5, -0.1), (f64::NAN, 0.5), (0.5, f64::INFINITY)] {
            assert!(
                matches!(surface.gradient(x, y), Err(RegionError::OutOfBounds { .. })),
                "({x}, {y}) should be out of bounds"
            );
        }
    }

    #[test]
    fn test_surface_reusable_after_bounds_error() {
        let surface = asymmetric();
        assert!(surface.gradient(10.0, 10.0).is_err());
        assert_eq!(surface.gradient(0.2, 0.3).unwrap(), Gradient { gx: 1.0, gy: 2.0 });
    }

    #[test]
    fn test_single_column_surface_has_no_gradient_domain() {
        let surface = Surface::from_grid(Array2::zeros((4, 1)));
        assert!(matches!(surface.gradient(0.0, 0.0), Err(RegionError::OutOfBounds { .. })));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut data = Array3::zeros((2, 2, 3));
        // Channel 0 rises east, channel 1 rises south, channel 2 is flat
        data[[0, 1, 0]] = 10.0;
        data[[1, 1, 0]] = 10.0;
        data[[1, 0, 1]] = 4.0;
        data[[1, 1, 1]] = 4.0;
        data.index_axis_mut(Axis(2), 2).fill(100.0);
        let surface = Surface::from_array(data);

        let all = surface.gradients(0.3, 0.3).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], Gradient { gx: 10.0, gy: 0.0 });
        assert_eq!(all[1], Gradient { gx: 0.0, gy: 4.0 });
        assert_eq!(all[2], Gradient { gx: 0.0, gy: 0.0 });

        assert_eq!(surface.channel_gradient(1, 0.7, 0.7).unwrap(), all[1]);
        assert_eq!(surface.gradient(0.3, 0.3).unwrap(), all[0]);
        assert_eq!(surface.channel(1).unwrap()[[1, 0]], 4.0);
    }

    #[test]
    fn test_channel_out_of_range() {
        assert!(matches!(
            asymmetric().channel_gradient(1, 0.5, 0.5),
            Err(RegionError::ChannelOutOfRange { channel: 1, channels: 1 })
        ));
    }

    #[test]
    fn test_value() {
        let surface = asymmetric();
        assert_eq!(surface.value(2, 0, 0), Some(5.0));
        assert_eq!(surface.value(0, 2, 0), Some(4.0));
        assert_eq!(surface.value(3, 0, 0), None);
    }
}
