//! Regioner-facing input types.
//!
//! The regioner (outline extraction, inset offsetting, infill area
//! computation) is upstream of this crate; the pather consumes its output in
//! the form below. Everything derives serde so a skeleton can be captured to
//! a file and replayed through the CLI.

use crate::geometry::{Loop, OpenPath};
use crate::grid::GridRanges;
use serde::{Deserialize, Serialize};

/// The per-layer geometric decomposition produced by the regioner.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayerRegions {
    /// Slice index this layer belongs to.
    pub index: usize,
    /// Model outline loops.
    pub outline_loops: Vec<Loop>,
    /// Support region outline loops.
    pub support_loops: Vec<Loop>,
    /// Nested shell loops per depth, outermost depth first.
    pub inset_loops: Vec<Vec<Loop>>,
    /// Open shell paths per depth for regions too narrow to close.
    pub spur_paths: Vec<Vec<OpenPath>>,
    /// Infill raster ranges.
    pub infill: GridRanges,
    /// Support raster ranges.
    pub support: GridRanges,
}

impl LayerRegions {
    /// Create empty regions for slice `index`.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// The innermost non-empty shell ring.
    ///
    /// These loops bound the region interior; when no infill will be printed
    /// inside them they double as travel boundaries.
    pub fn interior_loops(&self) -> &[Loop] {
        self.inset_loops
            .iter()
            .rev()
            .find(|depth| !depth.is_empty())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// All layers of a print, in slice order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Skeleton {
    pub layers: Vec<LayerRegions>,
}

impl Skeleton {
    /// Create an empty skeleton.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check for emptiness.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;

    fn square(size: f64) -> Loop {
        Loop::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ])
    }

    #[test]
    fn test_interior_loops_pick_innermost() {
        let mut regions = LayerRegions::new(0);
        assert!(regions.interior_loops().is_empty());

        regions.inset_loops = vec![vec![square(10.0)], vec![square(9.0)], Vec::new()];
        let interior = regions.interior_loops();
        assert_eq!(interior.len(), 1);
        assert_eq!(interior[0], square(9.0));
    }
}
