//! Line segment between two points.

use super::Point2;
use serde::{Deserialize, Serialize};

/// An ordered pair of endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Point2,
    pub b: Point2,
}

impl Segment {
    /// Create a new segment from `a` to `b`.
    #[inline]
    pub fn new(a: Point2, b: Point2) -> Self {
        Self { a, b }
    }

    /// Segment length.
    #[inline]
    pub fn length(&self) -> f64 {
        self.a.distance(&self.b)
    }

    /// Direction vector (not normalized).
    #[inline]
    pub fn direction(&self) -> Point2 {
        self.b - self.a
    }

    /// Check if two segments properly intersect.
    ///
    /// Shared endpoints count as an intersection only when the segments
    /// actually cross; touching collinear ends do not.
    pub fn intersects(&self, other: &Segment) -> bool {
        let d1 = self.direction();
        let d2 = other.direction();

        let denom = d1.cross(&d2);
        if denom == 0.0 {
            // Parallel or collinear: overlap counts as a crossing.
            if (other.a - self.a).cross(&d1) != 0.0 {
                return false;
            }
            let len_sq = d1.magnitude_squared();
            if len_sq == 0.0 {
                return false;
            }
            let t0 = (other.a - self.a).dot(&d1) / len_sq;
            let t1 = (other.b - self.a).dot(&d1) / len_sq;
            let (lo, hi) = if t0 < t1 { (t0, t1) } else { (t1, t0) };
            return lo < 1.0 && hi > 0.0;
        }

        let t = (other.a - self.a).cross(&d2) / denom;
        let u = (other.a - self.a).cross(&d1) / denom;
        t > 0.0 && t < 1.0 && u > 0.0 && u < 1.0
    }
}
