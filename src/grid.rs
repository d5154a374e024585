//! Raster grid for infill and support.
//!
//! The regioner hands the pather *ranges*: per raster line, the intervals
//! that lie inside the region to fill. [`Grid`] owns the raster line
//! coordinates; [`Grid::paths_from_ranges`] turns ranges into open paths
//! along the requested axis, serpentining so consecutive lines alternate
//! direction and the print head never sweeps back across the part.

use crate::geometry::{OpenPath, Point2};
use serde::{Deserialize, Serialize};

/// A closed interval on one raster line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarRange {
    pub min: f64,
    pub max: f64,
}

impl ScalarRange {
    /// Create a range; `min` and `max` are not reordered.
    #[inline]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Interval length.
    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Per-line fill intervals for one region, both raster orientations.
///
/// `x_rays[i]` holds the x intervals on the line `y = grid.y_values()[i]`
/// (deposition runs along X); `y_rays[i]` holds the y intervals on the line
/// `x = grid.x_values()[i]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridRanges {
    pub x_rays: Vec<Vec<ScalarRange>>,
    pub y_rays: Vec<Vec<ScalarRange>>,
}

impl GridRanges {
    /// Check that no line carries any interval.
    pub fn is_empty(&self) -> bool {
        self.x_rays.iter().all(Vec::is_empty) && self.y_rays.iter().all(Vec::is_empty)
    }
}

/// Raster line coordinates shared by every layer of a print.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    x_values: Vec<f64>,
    y_values: Vec<f64>,
}

impl Grid {
    /// Create a grid from explicit line coordinates.
    pub fn new(x_values: Vec<f64>, y_values: Vec<f64>) -> Self {
        Self { x_values, y_values }
    }

    /// Create a uniform grid covering `[min, max]` at `spacing`.
    pub fn uniform(min: Point2, max: Point2, spacing: f64) -> Self {
        assert!(spacing > 0.0, "grid spacing must be positive");
        let axis = |lo: f64, hi: f64| {
            let mut values = Vec::new();
            let mut v = lo;
            while v <= hi {
                values.push(v);
                v += spacing;
            }
            values
        };
        Self {
            x_values: axis(min.x, max.x),
            y_values: axis(min.y, max.y),
        }
    }

    /// Column coordinates (lines running along Y).
    #[inline]
    pub fn x_values(&self) -> &[f64] {
        &self.x_values
    }

    /// Row coordinates (lines running along X).
    #[inline]
    pub fn y_values(&self) -> &[f64] {
        &self.y_values
    }

    /// Rasterize `ranges` into open paths.
    ///
    /// `direction == true` deposits along X (using `x_rays`), `false` along Y
    /// (using `y_rays`). Alternate emitted lines are reversed so travel
    /// between lines stays short.
    pub fn paths_from_ranges(
        &self,
        ranges: &GridRanges,
        direction: bool,
        out: &mut Vec<OpenPath>,
    ) {
        let mut flip = false;
        if direction {
            for (i, line) in ranges.x_rays.iter().enumerate() {
                let Some(&y) = self.y_values.get(i) else { break };
                for range in line {
                    let (from, to) = if flip {
                        (range.max, range.min)
                    } else {
                        (range.min, range.max)
                    };
                    out.push(OpenPath::from_points([
                        Point2::new(from, y),
                        Point2::new(to, y),
                    ]));
                    flip = !flip;
                }
            }
        } else {
            for (i, line) in ranges.y_rays.iter().enumerate() {
                let Some(&x) = self.x_values.get(i) else { break };
                for range in line {
                    let (from, to) = if flip {
                        (range.max, range.min)
                    } else {
                        (range.min, range.max)
                    };
                    out.push(OpenPath::from_points([
                        Point2::new(x, from),
                        Point2::new(x, to),
                    ]));
                    flip = !flip;
                }
            }
        }
    }
}
