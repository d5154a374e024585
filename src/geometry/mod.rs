//! Geometry primitives for the toolpath pipeline.
//!
//! This module provides the fundamental geometric types used throughout path
//! generation and G-code emission:
//! - [`Point2`] and [`Point3`] - 2D and 3D points with `f64` coordinates
//! - [`Segment`] - line segment between two points
//! - [`Loop`] - closed polygon of at least three distinct vertices
//! - [`LoopPath`] - directed view over a loop with a chosen entry vertex
//! - [`OpenPath`] - open point run with appends at either end
//!
//! All coordinates are millimeters in `f64`. The emitter rounds to three
//! decimals at output time; nothing in the pipeline quantizes earlier.

mod loops;
mod open_path;
mod point;
mod segment;

pub use loops::{Loop, LoopPath};
pub use open_path::OpenPath;
pub use point::{Point2, Point3};
pub use segment::Segment;

/// Angle in radians between two headings, in `[0, π]`.
///
/// Either heading may be a zero vector, in which case the angle is zero (no
/// turn information is available).
pub fn heading_angle(from: Point2, to: Point2) -> f64 {
    let (Some(a), Some(b)) = (from.normalized(), to.normalized()) else {
        return 0.0;
    };
    a.dot(&b).clamp(-1.0, 1.0).acos()
}
