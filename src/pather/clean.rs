//! Post-optimization cleanup.
//!
//! [`clean_paths`] fuses consecutive inset/connection runs whose ends sit
//! within the coarseness threshold, so a shell interrupted by short travel
//! bridges prints as one continuous extrusion. [`smooth_collection`] then
//! strips near-collinear vertices, weighting the removal test by heading
//! change so corners survive.

use crate::geometry::{heading_angle, OpenPath, Point2};
use crate::pather::label::{LabeledOpenPath, LabeledOpenPaths, PathLabel};
use std::f64::consts::PI;

fn join_eligible(label: &PathLabel) -> bool {
    label.is_connection() || label.is_inset()
}

/// Join adjacent runs.
///
/// Consecutive pairs merge when the gap between `current`'s end and `next`'s
/// start is within `coarseness`, both labels are inset or connection, and
/// neither side is an already-closed inset. The merged path takes `next`'s
/// position and inherits `current`'s label when `current` is an inset.
/// One pass reaches the fixpoint: the function is idempotent.
pub fn clean_paths(paths: &mut LabeledOpenPaths, coarseness: f64) {
    let threshold = coarseness * coarseness;
    let mut removals: Vec<usize> = Vec::new();

    for i in 0..paths.len().saturating_sub(1) {
        let current = &paths[i];
        let next = &paths[i + 1];

        let (Some(end), Some(start)) = (current.path.last(), next.path.first()) else {
            continue;
        };
        if end.distance_squared(&start) > threshold {
            continue;
        }
        if !join_eligible(&current.label) || !join_eligible(&next.label) {
            continue;
        }
        if current.path.is_closed() || next.path.is_closed() {
            continue;
        }

        let mut merged = paths[i].path.clone();
        merged.extend_with(&paths[i + 1].path);
        let label = if paths[i].label.is_inset() {
            paths[i].label
        } else {
            paths[i + 1].label
        };
        paths[i + 1] = LabeledOpenPath::new(merged, label);
        removals.push(i);
    }

    for &i in removals.iter().rev() {
        paths.remove(i);
    }
}

fn removable(a: Point2, b: Point2, c: Point2, coarseness: f64, direction_weight: f64) -> bool {
    let chord = c - a;
    let deviation = if chord.magnitude_squared() == 0.0 {
        (b - a).magnitude()
    } else {
        chord.cross(&(b - a)).abs() / chord.magnitude()
    };
    let turn = heading_angle(b - a, c - b);
    deviation * (1.0 + direction_weight * turn / PI) < coarseness
}

fn smooth_path(path: &OpenPath, coarseness: f64, direction_weight: f64) -> OpenPath {
    let mut kept: Vec<Point2> = path.iter().copied().collect();
    if kept.len() < 3 {
        return path.clone();
    }

    // Sweep until a full pass removes nothing, so repeated smoothing is a
    // no-op.
    loop {
        let mut changed = false;
        let mut next: Vec<Point2> = Vec::with_capacity(kept.len());
        next.push(kept[0]);
        for i in 1..kept.len() - 1 {
            let a = *next.last().expect("seeded with first point");
            let b = kept[i];
            let c = kept[i + 1];
            if removable(a, b, c, coarseness, direction_weight) {
                changed = true;
            } else {
                next.push(b);
            }
        }
        next.push(*kept.last().expect("len >= 3"));
        kept = next;
        if !changed || kept.len() < 3 {
            break;
        }
    }

    OpenPath::from_points(kept)
}

/// Strip near-collinear vertices from every path in the collection.
///
/// A vertex is removed when its deviation from the surrounding chord, scaled
/// up by the heading change at the vertex (weighted by `direction_weight`),
/// stays below `coarseness`. Endpoints always survive.
pub fn smooth_collection(paths: &mut LabeledOpenPaths, coarseness: f64, direction_weight: f64) {
    for labeled in paths.iter_mut() {
        labeled.path = smooth_path(&labeled.path, coarseness, direction_weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pather::label::{PathKind, PathOwner};

    fn path(points: &[(f64, f64)]) -> OpenPath {
        OpenPath::from_points(points.iter().map(|&(x, y)| Point2::new(x, y)))
    }

    fn inset(points: &[(f64, f64)]) -> LabeledOpenPath {
        LabeledOpenPath::new(path(points), PathLabel::inset(PathOwner::Model, 0))
    }

    fn connection(points: &[(f64, f64)]) -> LabeledOpenPath {
        LabeledOpenPath::new(
            path(points),
            PathLabel::new(PathKind::Connection, PathOwner::Model, 0),
        )
    }

    fn infill(points: &[(f64, f64)]) -> LabeledOpenPath {
        LabeledOpenPath::new(
            path(points),
            PathLabel::new(PathKind::Infill, PathOwner::Model, 0),
        )
    }

    #[test]
    fn test_join_inset_connection_inset() {
        let mut paths = vec![
            inset(&[(0.0, 0.0), (1.0, 0.0)]),
            connection(&[(1.0, 0.0), (1.1, 0.0)]),
            inset(&[(1.1, 0.0), (2.0, 0.0)]),
        ];
        clean_paths(&mut paths, 0.2);

        assert_eq!(paths.len(), 1);
        assert!(paths[0].label.is_inset());
        assert_eq!(paths[0].path.len(), 4);
        assert_eq!(paths[0].path.first(), Some(Point2::new(0.0, 0.0)));
        assert_eq!(paths[0].path.last(), Some(Point2::new(2.0, 0.0)));
    }

    #[test]
    fn test_no_join_over_wide_gap() {
        let mut paths = vec![
            inset(&[(0.0, 0.0), (1.0, 0.0)]),
            inset(&[(5.0, 0.0), (6.0, 0.0)]),
        ];
        clean_paths(&mut paths, 0.2);
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_no_join_for_infill() {
        let mut paths = vec![
            infill(&[(0.0, 0.0), (1.0, 0.0)]),
            infill(&[(1.0, 0.0), (2.0, 0.0)]),
        ];
        clean_paths(&mut paths, 0.2);
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_closed_inset_never_joins() {
        let mut paths = vec![
            inset(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            inset(&[(0.0, 0.0), (-1.0, 0.0)]),
        ];
        clean_paths(&mut paths, 0.2);
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_clean_paths_idempotent() {
        let mut paths = vec![
            inset(&[(0.0, 0.0), (1.0, 0.0)]),
            connection(&[(1.0, 0.0), (1.1, 0.0)]),
            inset(&[(1.1, 0.0), (2.0, 0.0)]),
            infill(&[(2.05, 0.0), (3.0, 0.0)]),
        ];
        clean_paths(&mut paths, 0.2);
        let once = paths.clone();
        clean_paths(&mut paths, 0.2);
        assert_eq!(paths, once);
    }

    #[test]
    fn test_smooth_removes_collinear_vertices() {
        let mut paths = vec![infill(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
        ])];
        smooth_collection(&mut paths, 0.01, 1.0);

        let pts: Vec<Point2> = paths[0].path.iter().copied().collect();
        assert_eq!(
            pts,
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(3.0, 0.0),
                Point2::new(3.0, 3.0),
            ]
        );
    }

    #[test]
    fn test_smooth_keeps_real_corners() {
        let original = vec![infill(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (2.0, 1.0)])];
        let mut paths = original.clone();
        smooth_collection(&mut paths, 0.05, 1.0);
        assert_eq!(paths, original);
    }

    #[test]
    fn test_smooth_idempotent() {
        let mut paths = vec![infill(&[
            (0.0, 0.0),
            (0.5, 0.004),
            (1.0, 0.0),
            (1.5, 0.006),
            (2.0, 0.0),
            (2.0, 2.0),
        ])];
        smooth_collection(&mut paths, 0.05, 1.0);
        let once = paths.clone();
        smooth_collection(&mut paths, 0.05, 1.0);
        assert_eq!(paths, once);
    }
}
