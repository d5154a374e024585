//! Path ordering.
//!
//! The optimizer receives the layer's unordered deposition paths plus a set
//! of boundary loops (travel no-cross hints) and produces one ordered,
//! labeled sequence. Two strategies share a uniform surface through the
//! [`PathOptimizer`] tagged variant; selection happens once, from
//! configuration, and is immutable for the run.

mod graph;
mod greedy;

pub use graph::GraphOptimizer;
pub use greedy::GreedyOptimizer;

use crate::config::PrintConfig;
use crate::geometry::{Loop, OpenPath, Point2, Segment};
use crate::pather::label::{PathKind, PathLabel, PathOwner, INFILL_LABEL_VALUE};
use crate::pather::LabeledOpenPaths;
use crate::Result;

/// Deposition precedence. Higher values print earlier: outlines, then insets
/// outer to inner, then infill and spurs, then support.
pub(crate) fn label_priority(label: &PathLabel) -> i64 {
    if label.owner == PathOwner::Support {
        return 0;
    }
    match label.kind {
        PathKind::Outline => 1_000_000,
        PathKind::Inset if label.shell < INFILL_LABEL_VALUE => 900_000 - i64::from(label.shell),
        PathKind::Inset | PathKind::Infill | PathKind::Connection => 100_000,
        PathKind::Invalid => -1,
    }
}

/// Check whether the travel leg `from -> to` crosses any boundary segment.
pub(crate) fn crosses_boundary(boundaries: &[Segment], from: Point2, to: Point2) -> bool {
    if from == to {
        return false;
    }
    let leg = Segment::new(from, to);
    boundaries.iter().any(|b| leg.intersects(b))
}

/// Flatten boundary loops into their edge segments.
pub(crate) fn boundary_segments(loops: &[Loop], out: &mut Vec<Segment>) {
    for l in loops {
        out.extend(l.segments());
    }
}

/// The configured ordering strategy.
#[derive(Debug)]
pub enum PathOptimizer {
    /// Nearest-endpoint fallback.
    Greedy(GreedyOptimizer),
    /// Endpoint-graph walk with boundary and heading awareness.
    Graph(GraphOptimizer),
}

impl PathOptimizer {
    /// Build the strategy selected by `config.do_graph_optimization`.
    pub fn from_config(config: &PrintConfig) -> Self {
        if config.do_graph_optimization {
            Self::Graph(GraphOptimizer::new(
                config.direction_weight,
                config.coarseness,
            ))
        } else {
            Self::Greedy(GreedyOptimizer::new())
        }
    }

    /// Register travel no-cross loops.
    pub fn add_boundaries(&mut self, loops: &[Loop]) {
        match self {
            Self::Greedy(inner) => inner.add_boundaries(loops),
            Self::Graph(inner) => inner.add_boundaries(loops),
        }
    }

    /// Install open paths under one label.
    pub fn add_open_paths(&mut self, paths: &[OpenPath], label: PathLabel) {
        match self {
            Self::Greedy(inner) => inner.add_open_paths(paths, label),
            Self::Graph(inner) => inner.add_open_paths(paths, label),
        }
    }

    /// Install loops under one label.
    pub fn add_loops(&mut self, loops: &[Loop], label: PathLabel) {
        match self {
            Self::Greedy(inner) => inner.add_loops(loops, label),
            Self::Graph(inner) => inner.add_loops(loops, label),
        }
    }

    /// Order everything installed so far into `out`.
    ///
    /// On failure `out` is left untouched.
    pub fn optimize(&mut self, out: &mut LabeledOpenPaths) -> Result<()> {
        match self {
            Self::Greedy(inner) => inner.optimize(out),
            Self::Graph(inner) => inner.optimize(out),
        }
    }

    /// Drop registered boundaries.
    pub fn clear_boundaries(&mut self) {
        match self {
            Self::Greedy(inner) => inner.clear_boundaries(),
            Self::Graph(inner) => inner.clear_boundaries(),
        }
    }

    /// Drop installed paths.
    pub fn clear_paths(&mut self) {
        match self {
            Self::Greedy(inner) => inner.clear_paths(),
            Self::Graph(inner) => inner.clear_paths(),
        }
    }

    /// Reset for the next layer.
    pub fn clear(&mut self) {
        self.clear_boundaries();
        self.clear_paths();
    }
}
