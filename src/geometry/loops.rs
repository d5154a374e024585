//! Closed loops and directed loop views.
//!
//! A [`Loop`] is a closed polygon of at least three distinct vertices. The
//! pather never traverses a loop directly; it builds a [`LoopPath`] view that
//! fixes a start vertex and a winding direction, and iterates like an open
//! path while still reporting itself closed.

use super::{Point2, Segment};
use serde::{Deserialize, Serialize};

/// A closed polygon of at least three distinct vertices.
///
/// The closing edge from the last vertex back to the first is implicit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    points: Vec<Point2>,
}

impl Loop {
    /// Create a loop from a vertex list.
    ///
    /// Consecutive duplicate vertices (and a duplicated closing vertex) are
    /// dropped. Fewer than three distinct vertices is an invariant violation.
    pub fn new(points: Vec<Point2>) -> Self {
        let mut distinct: Vec<Point2> = Vec::with_capacity(points.len());
        for p in points {
            if distinct.last() != Some(&p) {
                distinct.push(p);
            }
        }
        if distinct.len() > 1 && distinct.first() == distinct.last() {
            distinct.pop();
        }
        assert!(
            distinct.len() >= 3,
            "loop requires at least 3 distinct vertices, got {}",
            distinct.len()
        );
        Self { points: distinct }
    }

    /// Vertices in storage order.
    #[inline]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// A loop is never empty; this exists for container symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Twice the signed area; positive for counter-clockwise storage order.
    pub fn signed_area_doubled(&self) -> f64 {
        let mut sum = 0.0;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            sum += a.cross(&b);
        }
        sum
    }

    /// Check whether the storage order is counter-clockwise.
    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area_doubled() > 0.0
    }

    /// Vertex centroid (not the area centroid; used for entry sampling).
    pub fn centroid(&self) -> Point2 {
        let mut c = Point2::default();
        for p in &self.points {
            c += *p;
        }
        c * (1.0 / self.points.len() as f64)
    }

    /// All edges, including the closing edge.
    pub fn segments(&self) -> Vec<Segment> {
        let n = self.points.len();
        (0..n)
            .map(|i| Segment::new(self.points[i], self.points[(i + 1) % n]))
            .collect()
    }

    /// Total boundary length.
    pub fn perimeter(&self) -> f64 {
        self.segments().iter().map(Segment::length).sum()
    }

    /// Clockwise traversal starting at vertex 0.
    pub fn clockwise(&self) -> LoopPath<'_> {
        LoopPath::new(self, 0, self.is_counter_clockwise())
    }

    /// Counter-clockwise traversal starting at vertex 0.
    pub fn counter_clockwise(&self) -> LoopPath<'_> {
        LoopPath::new(self, 0, !self.is_counter_clockwise())
    }

    /// Offset every vertex outward by `distance` along its miter normal.
    ///
    /// Suitable only for the small outsets the pather applies to support
    /// boundaries; no self-intersection cleanup is performed.
    pub fn offset(&self, distance: f64) -> Loop {
        let n = self.points.len();
        // Outward is to the right of travel for CCW storage order.
        let outward_sign = if self.is_counter_clockwise() { 1.0 } else { -1.0 };
        let mut offset_points = Vec::with_capacity(n);
        for i in 0..n {
            let prev = self.points[(i + n - 1) % n];
            let curr = self.points[i];
            let next = self.points[(i + 1) % n];

            let d_in = (curr - prev).normalized().unwrap_or_default();
            let d_out = (next - curr).normalized().unwrap_or_default();
            // Edge normals pointing out of the polygon.
            let n_in = Point2::new(d_in.y, -d_in.x) * outward_sign;
            let n_out = Point2::new(d_out.y, -d_out.x) * outward_sign;
            let miter = (n_in + n_out)
                .normalized()
                .unwrap_or(Point2::new(n_out.y, -n_out.x));

            offset_points.push(curr + miter * distance);
        }
        Loop {
            points: offset_points,
        }
    }

    /// Sample up to `count` entry vertices at evenly spaced polar angles
    /// around the centroid.
    ///
    /// Every returned value is an actual vertex index, deduplicated, so small
    /// loops simply yield all their vertices.
    pub fn entry_points(&self, count: usize) -> Vec<usize> {
        let n = self.points.len();
        if n <= count {
            return (0..n).collect();
        }

        let centroid = self.centroid();
        let mut entries: Vec<usize> = Vec::with_capacity(count);
        for k in 0..count {
            let target = 2.0 * std::f64::consts::PI * k as f64 / count as f64;
            let best = (0..n)
                .min_by(|&i, &j| {
                    let ai = angle_distance(self.points[i] - centroid, target);
                    let aj = angle_distance(self.points[j] - centroid, target);
                    ai.partial_cmp(&aj).unwrap().then(i.cmp(&j))
                })
                .unwrap_or(0);
            if !entries.contains(&best) {
                entries.push(best);
            }
        }
        entries
    }
}

fn angle_distance(v: Point2, target: f64) -> f64 {
    let angle = v.y.atan2(v.x);
    let mut delta = (angle - target).abs();
    if delta > std::f64::consts::PI {
        delta = 2.0 * std::f64::consts::PI - delta;
    }
    delta
}

/// A directed view over a [`Loop`] with a chosen start vertex.
///
/// Iterates the full vertex cycle as an open run; [`LoopPath::to_open_path`]
/// appends the start vertex again so the materialized path closes.
#[derive(Clone, Copy, Debug)]
pub struct LoopPath<'a> {
    source: &'a Loop,
    start: usize,
    /// Traverse the storage order backwards.
    reverse: bool,
}

impl<'a> LoopPath<'a> {
    /// Create a view starting at vertex `start`.
    pub fn new(source: &'a Loop, start: usize, reverse: bool) -> Self {
        assert!(start < source.len(), "loop entry index out of range");
        Self {
            source,
            start,
            reverse,
        }
    }

    /// The underlying loop.
    #[inline]
    pub fn source(&self) -> &'a Loop {
        self.source
    }

    /// This view always describes a closed path.
    #[inline]
    pub fn is_closed(&self) -> bool {
        true
    }

    /// The entry (and exit) vertex.
    #[inline]
    pub fn entry(&self) -> Point2 {
        self.source.points()[self.start]
    }

    /// Heading of the first traversed edge.
    pub fn entry_heading(&self) -> Option<Point2> {
        let pts = self.vertices();
        (pts[1] - pts[0]).normalized()
    }

    /// The full vertex cycle in traversal order, starting at the entry.
    pub fn vertices(&self) -> Vec<Point2> {
        let pts = self.source.points();
        let n = pts.len();
        let mut out = Vec::with_capacity(n);
        for k in 0..n {
            let i = if self.reverse {
                (self.start + n - k % n) % n
            } else {
                (self.start + k) % n
            };
            out.push(pts[i]);
        }
        out
    }

    /// Materialize as an open vertex run with the entry repeated at the end.
    pub fn to_closed_points(&self) -> Vec<Point2> {
        let mut pts = self.vertices();
        pts.push(self.entry());
        pts
    }
}
