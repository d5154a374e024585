//! Nearest-endpoint fallback strategy.
//!
//! No endpoint graph: loops are materialized at install time and every step
//! simply picks the unplaced path whose nearest endpoint is closest to the
//! current position, inside the highest remaining label-priority band. An
//! open path is reversed when its far endpoint is the closer one and the
//! reversed approach does not introduce a boundary crossing.

use super::{boundary_segments, crosses_boundary, label_priority};
use crate::geometry::{Loop, OpenPath, Point2, Segment};
use crate::pather::label::{LabeledOpenPath, PathLabel};
use crate::pather::LabeledOpenPaths;
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct Candidate {
    path: OpenPath,
    label: PathLabel,
    priority: i64,
    closed: bool,
}

/// Nearest-endpoint ordering strategy.
#[derive(Debug, Default)]
pub struct GreedyOptimizer {
    boundaries: Vec<Segment>,
    candidates: Vec<Candidate>,
}

impl GreedyOptimizer {
    /// Create an empty strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register travel no-cross loops.
    pub fn add_boundaries(&mut self, loops: &[Loop]) {
        boundary_segments(loops, &mut self.boundaries);
    }

    /// Install open paths under one label.
    pub fn add_open_paths(&mut self, paths: &[OpenPath], label: PathLabel) {
        for path in paths {
            if path.len() < 2 {
                continue;
            }
            self.candidates.push(Candidate {
                path: path.clone(),
                priority: label_priority(&label),
                label,
                closed: false,
            });
        }
    }

    /// Install loops under one label, materialized counter-clockwise from
    /// their first stored vertex.
    pub fn add_loops(&mut self, loops: &[Loop], label: PathLabel) {
        for l in loops {
            self.candidates.push(Candidate {
                path: OpenPath::from_points(l.counter_clockwise().to_closed_points()),
                priority: label_priority(&label),
                label,
                closed: true,
            });
        }
    }

    /// Drop registered boundaries.
    pub fn clear_boundaries(&mut self) {
        self.boundaries.clear();
    }

    /// Drop installed paths.
    pub fn clear_paths(&mut self) {
        self.candidates.clear();
    }

    /// Order everything installed so far into `out`.
    ///
    /// On error `out` is untouched.
    pub fn optimize(&mut self, out: &mut LabeledOpenPaths) -> Result<()> {
        if self.candidates.iter().any(|c| !c.path.is_finite()) {
            return Err(Error::Geometry(
                "non-finite coordinate in optimizer input".into(),
            ));
        }

        let mut staging: LabeledOpenPaths = Vec::with_capacity(self.candidates.len());
        let mut remaining: Vec<usize> = (0..self.candidates.len()).collect();
        let mut current_pos = Point2::default();

        while !remaining.is_empty() {
            let top_priority = remaining
                .iter()
                .map(|&i| self.candidates[i].priority)
                .max()
                .expect("remaining is non-empty");

            let mut best: Option<(f64, usize)> = None;
            for (slot, &idx) in remaining.iter().enumerate() {
                let candidate = &self.candidates[idx];
                if candidate.priority != top_priority {
                    continue;
                }
                let start = candidate.path.first().expect("candidate has points");
                let end = candidate.path.last().expect("candidate has points");
                let near = current_pos.distance(&start).min(current_pos.distance(&end));
                let improves = match &best {
                    Some((best_dist, _)) => near < *best_dist,
                    None => true,
                };
                if improves {
                    best = Some((near, slot));
                }
            }

            let (_, slot) = best.expect("priority band has a candidate");
            let idx = remaining.remove(slot);
            let candidate = &self.candidates[idx];
            let mut path = candidate.path.clone();

            if !candidate.closed {
                let start = path.first().expect("candidate has points");
                let end = path.last().expect("candidate has points");
                let far_is_closer = current_pos.distance(&end) < current_pos.distance(&start);
                if far_is_closer && !crosses_boundary(&self.boundaries, current_pos, end) {
                    path.reverse();
                }
            }

            current_pos = path.last().expect("candidate has points");
            staging.push(LabeledOpenPath::new(path, candidate.label));
        }

        out.extend(staging);
        Ok(())
    }
}
