//! Endpoint-graph ordering strategy.
//!
//! Nodes are path endpoints: both ends of every open path and a fixed
//! angular sampling of entry vertices for every loop. Deposition edges run
//! along the paths; travel edges connect endpoints of different paths at
//! Euclidean cost, penalized heavily when the straight leg crosses a
//! registered boundary. The walk is greedy nearest-next inside the highest
//! remaining label-priority band, with heading continuity folded into the
//! travel cost.

use super::{boundary_segments, crosses_boundary, label_priority};
use crate::geometry::{heading_angle, Loop, LoopPath, OpenPath, Point2, Segment};
use crate::pather::label::{LabeledOpenPath, PathKind, PathLabel};
use crate::pather::LabeledOpenPaths;
use crate::{Error, Result};

/// Number of angularly sampled entry vertices per loop.
pub const LOOP_ENTRY_SAMPLES: usize = 8;

/// Travel cost added when the leg crosses a boundary. Larger than any
/// plausible in-bed travel distance, so crossing legs lose to any detour.
const BOUNDARY_CROSSING_PENALTY: f64 = 1.0e6;

#[derive(Debug, Clone)]
enum CandidateBody {
    Open(OpenPath),
    Closed(Loop),
}

#[derive(Debug, Clone)]
struct Candidate {
    body: CandidateBody,
    label: PathLabel,
    priority: i64,
}

/// One way of entering a candidate.
#[derive(Debug, Clone, Copy)]
enum Entry {
    Forward,
    Reversed,
    LoopEntry { start: usize, reverse: bool },
}

impl Candidate {
    fn is_finite(&self) -> bool {
        match &self.body {
            CandidateBody::Open(path) => path.is_finite(),
            CandidateBody::Closed(l) => l.points().iter().all(Point2::is_finite),
        }
    }

    /// Enumerate entries with their entry point and initial heading.
    fn entries(&self) -> Vec<(Entry, Point2, Option<Point2>)> {
        match &self.body {
            CandidateBody::Open(path) => {
                let first = path.first().expect("open candidate has points");
                let last = path.last().expect("open candidate has points");
                let forward_heading = (path[1] - first).normalized();
                let reversed_heading = (path[path.len() - 2] - last).normalized();
                vec![
                    (Entry::Forward, first, forward_heading),
                    (Entry::Reversed, last, reversed_heading),
                ]
            }
            CandidateBody::Closed(l) => {
                let mut entries = Vec::with_capacity(LOOP_ENTRY_SAMPLES * 2);
                for start in l.entry_points(LOOP_ENTRY_SAMPLES) {
                    for reverse in [false, true] {
                        let view = LoopPath::new(l, start, reverse);
                        entries.push((
                            Entry::LoopEntry { start, reverse },
                            view.entry(),
                            view.entry_heading(),
                        ));
                    }
                }
                entries
            }
        }
    }

    fn materialize(&self, entry: Entry) -> OpenPath {
        match (&self.body, entry) {
            (CandidateBody::Open(path), Entry::Forward) => path.clone(),
            (CandidateBody::Open(path), Entry::Reversed) => {
                let mut reversed = path.clone();
                reversed.reverse();
                reversed
            }
            (CandidateBody::Closed(l), Entry::LoopEntry { start, reverse }) => {
                OpenPath::from_points(LoopPath::new(l, start, reverse).to_closed_points())
            }
            _ => unreachable!("entry kind does not match candidate body"),
        }
    }
}

/// Endpoint-graph ordering strategy.
#[derive(Debug, Default)]
pub struct GraphOptimizer {
    direction_weight: f64,
    /// Maximum gap a synthetic connection may bridge.
    connection_limit: f64,
    boundaries: Vec<Segment>,
    candidates: Vec<Candidate>,
}

impl GraphOptimizer {
    /// Create a strategy with the given heading weight and connection gap
    /// limit (the cleaner's coarseness).
    pub fn new(direction_weight: f64, connection_limit: f64) -> Self {
        Self {
            direction_weight,
            connection_limit,
            boundaries: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Register travel no-cross loops.
    pub fn add_boundaries(&mut self, loops: &[Loop]) {
        boundary_segments(loops, &mut self.boundaries);
    }

    /// Install open paths under one label. Paths with fewer than two points
    /// carry no deposition and are dropped.
    pub fn add_open_paths(&mut self, paths: &[OpenPath], label: PathLabel) {
        for path in paths {
            if path.len() < 2 {
                continue;
            }
            self.candidates.push(Candidate {
                body: CandidateBody::Open(path.clone()),
                priority: label_priority(&label),
                label,
            });
        }
    }

    /// Install loops under one label.
    pub fn add_loops(&mut self, loops: &[Loop], label: PathLabel) {
        for l in loops {
            self.candidates.push(Candidate {
                body: CandidateBody::Closed(l.clone()),
                priority: label_priority(&label),
                label,
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

    /// Walk the endpoint graph and append the ordered result to `out`.
    ///
    /// On error `out` is untouched.
    pub fn optimize(&mut self, out: &mut LabeledOpenPaths) -> Result<()> {
        if self.candidates.iter().any(|c| !c.is_finite()) {
            return Err(Error::Geometry(
                "non-finite coordinate in optimizer input".into(),
            ));
        }

        let mut staging: LabeledOpenPaths = Vec::with_capacity(self.candidates.len());
        let mut remaining: Vec<usize> = (0..self.candidates.len()).collect();
        let mut current_pos = Point2::default();
        let mut current_heading: Option<Point2> = None;

        while !remaining.is_empty() {
            let top_priority = remaining
                .iter()
                .map(|&i| self.candidates[i].priority)
                .max()
                .expect("remaining is non-empty");

            let mut best: Option<(f64, usize, Entry)> = None;
            for (slot, &idx) in remaining.iter().enumerate() {
                let candidate = &self.candidates[idx];
                if candidate.priority != top_priority {
                    continue;
                }
                for (entry, entry_point, entry_heading) in candidate.entries() {
                    let mut cost = current_pos.distance(&entry_point);
                    if crosses_boundary(&self.boundaries, current_pos, entry_point) {
                        cost += BOUNDARY_CROSSING_PENALTY;
                    }
                    if let (Some(heading), Some(entry_heading)) = (current_heading, entry_heading)
                    {
                        cost += self.direction_weight * heading_angle(heading, entry_heading);
                    }
                    let improves = match &best {
                        Some((best_cost, _, _)) => cost < *best_cost,
                        None => true,
                    };
                    if improves {
                        best = Some((cost, slot, entry));
                    }
                }
            }

            let (_, slot, entry) = best.expect("priority band has a candidate");
            let idx = remaining.remove(slot);
            let candidate = &self.candidates[idx];
            let path = candidate.materialize(entry);
            let entry_point = path.first().expect("materialized path has points");

            let connection = staging
                .last()
                .and_then(|previous| self.connection_for(previous, entry_point, candidate.label));
            if let Some(connection) = connection {
                staging.push(connection);
            }

            current_pos = path.last().expect("materialized path has points");
            current_heading = exit_heading(&path).or(current_heading);
            staging.push(LabeledOpenPath::new(path, candidate.label));
        }

        out.extend(staging);
        Ok(())
    }

    /// Synthetic connection bridging to `entry_point`, when the cleaner
    /// would be allowed to fuse it: both sides insets, the gap within the
    /// join limit, and the leg clear of boundaries.
    fn connection_for(
        &self,
        previous: &LabeledOpenPath,
        entry_point: Point2,
        next_label: PathLabel,
    ) -> Option<LabeledOpenPath> {
        let exit = previous.path.last()?;
        if exit == entry_point {
            return None;
        }
        if !previous.label.is_inset() || !next_label.is_inset() {
            return None;
        }
        if exit.distance(&entry_point) > self.connection_limit {
            return None;
        }
        if crosses_boundary(&self.boundaries, exit, entry_point) {
            return None;
        }
        Some(LabeledOpenPath::new(
            OpenPath::from_points([exit, entry_point]),
            PathLabel::new(PathKind::Connection, next_label.owner, 0),
        ))
    }
}

/// Heading of the last segment with distinct endpoints.
fn exit_heading(path: &OpenPath) -> Option<Point2> {
    let points: Vec<Point2> = path.iter().copied().collect();
    for window in points.windows(2).rev() {
        if let Some(heading) = (window[1] - window[0]).normalized() {
            return Some(heading);
        }
    }
    None
}
