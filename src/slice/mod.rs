//! Layer measure and mesh segmenter.
//!
//! The [`LayerMeasure`] maps slice indices to z positions, thicknesses and
//! bead widths; the [`Segmenter`] buckets mesh triangles by the slice
//! indices they straddle, producing the [`SliceTable`] the downstream
//! regioner consumes.

use crate::geometry::Point3;
use serde::{Deserialize, Serialize};

/// Triangle ids belonging to one slice.
pub type TriangleIndices = Vec<usize>;

/// Per-slice triangle buckets, indexed by slice number.
pub type SliceTable = Vec<TriangleIndices>;

/// A mesh triangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Triangle3 {
    pub a: Point3,
    pub b: Point3,
    pub c: Point3,
}

impl Triangle3 {
    /// Create a triangle.
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self { a, b, c }
    }

    /// Vertices sorted by ascending z.
    pub fn z_sorted(&self) -> (Point3, Point3, Point3) {
        let mut v = [self.a, self.b, self.c];
        v.sort_by(|p, q| p.z.partial_cmp(&q.z).expect("non-finite triangle z"));
        (v[0], v[1], v[2])
    }
}

/// Axis-aligned bounds of a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub min: Point3,
    pub max: Point3,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }
}

impl Limits {
    /// Grow the bounds to contain `p`.
    pub fn grow(&mut self, p: Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }
}

/// Maps slice indices to z position, thickness and bead width.
///
/// The mapping is affine and strictly monotonic in the index: slice `i` sits
/// at `first_slice_z + i * layer_height`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerMeasure {
    first_slice_z: f64,
    layer_height: f64,
    /// Bead width as a multiple of layer height.
    width_ratio: f64,
}

impl LayerMeasure {
    /// Create a measure. `layer_height` must be positive and finite.
    pub fn new(first_slice_z: f64, layer_height: f64, width_ratio: f64) -> Self {
        assert!(
            layer_height.is_finite() && layer_height > 0.0,
            "layer height must be positive"
        );
        Self {
            first_slice_z,
            layer_height,
            width_ratio,
        }
    }

    /// The index of the nearest slice plane at or above `z`.
    pub fn z_to_layer_above(&self, z: f64) -> usize {
        let idx = ((z - self.first_slice_z) / self.layer_height).ceil();
        if idx <= 0.0 {
            0
        } else {
            idx as usize
        }
    }

    /// Z position of slice `index`.
    #[inline]
    pub fn layer_position(&self, index: usize) -> f64 {
        self.first_slice_z + index as f64 * self.layer_height
    }

    /// Thickness of slice `index`.
    #[inline]
    pub fn layer_thickness(&self, _index: usize) -> f64 {
        self.layer_height
    }

    /// Bead width of slice `index`.
    #[inline]
    pub fn layer_width(&self, index: usize) -> f64 {
        self.layer_thickness(index) * self.width_ratio
    }
}

/// Buckets mesh triangles by the slice indices they straddle.
#[derive(Clone, Debug)]
pub struct Segmenter {
    measure: LayerMeasure,
    table: SliceTable,
    triangles: Vec<Triangle3>,
    limits: Limits,
}

impl Segmenter {
    /// Create a segmenter over the given measure.
    pub fn new(measure: LayerMeasure) -> Self {
        Self {
            measure,
            table: SliceTable::new(),
            triangles: Vec::new(),
            limits: Limits::default(),
        }
    }

    /// The slice table built so far.
    pub fn read_slice_table(&self) -> &SliceTable {
        &self.table
    }

    /// The layer measure this segmenter buckets against.
    pub fn read_layer_measure(&self) -> &LayerMeasure {
        &self.measure
    }

    /// All triangles ingested so far, in id order.
    pub fn read_all_triangles(&self) -> &[Triangle3] {
        &self.triangles
    }

    /// Mesh bounds accumulated over all ingested triangles.
    pub fn read_limits(&self) -> &Limits {
        &self.limits
    }

    /// Ingest a whole mesh, bucketing every triangle.
    pub fn tablaturize(&mut self, mesh: &[Triangle3]) {
        log::info!("segmenting {} triangles", mesh.len());
        for &triangle in mesh {
            self.insert_triangle(triangle);
        }
    }

    /// Ingest one triangle, growing the table on demand.
    pub fn insert_triangle(&mut self, triangle: Triangle3) {
        let id = self.triangles.len();
        self.triangles.push(triangle);
        for v in [triangle.a, triangle.b, triangle.c] {
            self.limits.grow(v);
        }

        let (a, _, c) = triangle.z_sorted();

        let mut min_slice = self.measure.z_to_layer_above(a.z);
        if min_slice > 0 {
            min_slice -= 1;
        }
        let mut max_slice = self.measure.z_to_layer_above(c.z);
        if max_slice - min_slice > 1 {
            max_slice -= 1;
        }

        if max_slice >= self.table.len() {
            self.table.resize(max_slice + 1, TriangleIndices::new());
        }
        for slice in &mut self.table[min_slice..=max_slice] {
            slice.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(z0: f64, z1: f64, z2: f64) -> Triangle3 {
        Triangle3::new(
            Point3::new(0.0, 0.0, z0),
            Point3::new(1.0, 0.0, z1),
            Point3::new(0.0, 1.0, z2),
        )
    }

    #[test]
    fn test_z_to_layer_above() {
        let m = LayerMeasure::new(0.2, 0.3, 1.7);
        assert_eq!(m.z_to_layer_above(0.2), 0);
        assert_eq!(m.z_to_layer_above(0.21), 1);
        assert_eq!(m.z_to_layer_above(0.5), 1);
        assert_eq!(m.z_to_layer_above(0.51), 2);
        // Below the first slice clamps to zero.
        assert_eq!(m.z_to_layer_above(-1.0), 0);
    }

    #[test]
    fn test_layer_positions_monotonic() {
        let m = LayerMeasure::new(0.2, 0.3, 1.7);
        for i in 1..20 {
            assert!(m.layer_position(i) > m.layer_position(i - 1));
        }
        assert!((m.layer_position(0) - 0.2).abs() < 1e-12);
        assert!((m.layer_thickness(3) - 0.3).abs() < 1e-12);
        assert!((m.layer_width(3) - 0.51).abs() < 1e-12);
    }

    #[test]
    fn test_flat_triangle_lands_in_one_slice() {
        let m = LayerMeasure::new(0.0, 0.3, 1.7);
        let mut seg = Segmenter::new(m);
        seg.insert_triangle(tri(0.1, 0.1, 0.1));

        let table = seg.read_slice_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0], vec![0]);
        assert_eq!(table[1], vec![0]);
    }

    #[test]
    fn test_tall_triangle_spans_slices() {
        let m = LayerMeasure::new(0.0, 0.3, 1.7);
        let mut seg = Segmenter::new(m);
        // Spans z 0.1 .. 1.0: layer above bottom = 1 -> min 0,
        // layer above top = 4, span > 1 so max = 3.
        seg.insert_triangle(tri(0.1, 0.5, 1.0));

        let table = seg.read_slice_table();
        assert_eq!(table.len(), 4);
        for slice in table.iter() {
            assert_eq!(slice.as_slice(), &[0]);
        }
    }

    #[test]
    fn test_table_grows_on_demand() {
        let m = LayerMeasure::new(0.0, 0.3, 1.7);
        let mut seg = Segmenter::new(m);
        seg.insert_triangle(tri(0.0, 0.05, 0.1));
        let low_len = seg.read_slice_table().len();

        seg.insert_triangle(tri(2.9, 2.95, 3.0));
        let table = seg.read_slice_table();
        assert!(table.len() > low_len);
        // Slices between the two triangles stay empty.
        assert!(table[4].is_empty());
    }

    #[test]
    fn test_limits_track_mesh_bounds() {
        let m = LayerMeasure::new(0.0, 0.3, 1.7);
        let mut seg = Segmenter::new(m);
        seg.tablaturize(&[tri(0.0, 0.5, 1.0), tri(0.2, 0.2, 2.0)]);

        let limits = seg.read_limits();
        assert!((limits.min.z - 0.0).abs() < 1e-12);
        assert!((limits.max.z - 2.0).abs() < 1e-12);
        assert_eq!(seg.read_all_triangles().len(), 2);
    }
}
