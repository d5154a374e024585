//! Per-layer path generation.
//!
//! The pather walks the skeleton layer by layer, stages each layer's
//! geometry into the configured [`PathOptimizer`], and collects the ordered,
//! labeled result into [`LayerPaths`] for the gcoder. Outline traces bypass
//! the optimizer; everything else (insets, spurs, infill, support) is
//! ordered by it, then fused and smoothed.

mod clean;
pub mod label;
pub mod optimizer;

pub use clean::{clean_paths, smooth_collection};
pub use label::{
    LabeledOpenPath, LabeledOpenPaths, PathKind, PathLabel, PathOwner, INFILL_LABEL_VALUE,
    INSET_LABEL_VALUE,
};
pub use optimizer::{GraphOptimizer, GreedyOptimizer, PathOptimizer};

use crate::config::PrintConfig;
use crate::geometry::{Loop, OpenPath};
use crate::grid::Grid;
use crate::progress::ProgressSink;
use crate::skeleton::Skeleton;
use crate::slice::LayerMeasure;

/// Outset applied to support loops before registering them as boundaries,
/// so travel hugging a support region does not graze its outline.
pub const SUPPORT_BOUNDARY_OUTSET: f64 = 0.01;

/// One extruder's ordered paths within a layer.
#[derive(Clone, Debug, Default)]
pub struct ExtruderLayer {
    /// Index into the configured extruder list.
    pub extruder_id: usize,
    /// Ordered, labeled paths for this extruder.
    pub paths: LabeledOpenPaths,
}

impl ExtruderLayer {
    /// Create an empty extruder sub-layer.
    pub fn new(extruder_id: usize) -> Self {
        Self {
            extruder_id,
            paths: LabeledOpenPaths::new(),
        }
    }

    /// Model outline traces. Reporting only; emission walks `paths`.
    pub fn outline_paths(&self) -> impl Iterator<Item = &LabeledOpenPath> {
        self.paths
            .iter()
            .filter(|p| p.label.kind == PathKind::Outline && p.label.owner == PathOwner::Model)
    }

    /// Model inset paths (shells and spurs). Reporting only.
    pub fn inset_paths(&self) -> impl Iterator<Item = &LabeledOpenPath> {
        self.paths
            .iter()
            .filter(|p| p.label.is_inset() && p.label.owner == PathOwner::Model)
    }

    /// Model infill paths. Reporting only.
    pub fn infill_paths(&self) -> impl Iterator<Item = &LabeledOpenPath> {
        self.paths
            .iter()
            .filter(|p| p.label.kind == PathKind::Infill && p.label.owner == PathOwner::Model)
    }

    /// Support-owned paths. Reporting only.
    pub fn support_paths(&self) -> impl Iterator<Item = &LabeledOpenPath> {
        self.paths
            .iter()
            .filter(|p| p.label.owner == PathOwner::Support)
    }
}

/// One printed layer.
#[derive(Clone, Debug, Default)]
pub struct Layer {
    /// Base z of the layer (mm).
    pub z: f64,
    /// Layer thickness (mm).
    pub layer_height: f64,
    /// Bead width (mm).
    pub layer_w: f64,
    /// Slice index in the layer measure this layer was built from.
    pub measure_id: usize,
    /// Per-extruder sub-layers.
    pub extruders: Vec<ExtruderLayer>,
}

impl Layer {
    /// Create a layer with no extruder sub-layers yet.
    pub fn new(z: f64, layer_height: f64, layer_w: f64, measure_id: usize) -> Self {
        Self {
            z,
            layer_height,
            layer_w,
            measure_id,
            extruders: Vec::new(),
        }
    }

    /// Total number of stored path points across all extruders.
    pub fn point_count(&self) -> usize {
        self.extruders
            .iter()
            .flat_map(|e| e.paths.iter())
            .map(|p| p.path.len())
            .sum()
    }
}

/// The pather's product: layers in strictly ascending z order.
#[derive(Clone, Debug, Default)]
pub struct LayerPaths {
    pub layers: Vec<Layer>,
}

impl LayerPaths {
    /// Create an empty container.
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

/// Per-layer driver from skeleton regions to ordered labeled paths.
#[derive(Debug)]
pub struct Pather {
    config: PrintConfig,
    optimizer: PathOptimizer,
}

impl Pather {
    /// Create a pather; the optimizer strategy is fixed here for the run.
    pub fn new(config: &PrintConfig) -> Self {
        Self {
            config: config.clone(),
            optimizer: PathOptimizer::from_config(config),
        }
    }

    /// Generate paths for every skeleton layer inside `[first_idx, last_idx]`
    /// (negative bounds are unbounded), appending one [`Layer`] per processed
    /// slice to `layerpaths`.
    ///
    /// An optimizer failure is confined to its layer: the layer comes out
    /// empty and the run continues. Cancellation through `progress` is
    /// honored between layers.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_paths(
        &mut self,
        skeleton: &Skeleton,
        layer_measure: &LayerMeasure,
        grid: &Grid,
        layerpaths: &mut LayerPaths,
        first_idx: i32,
        last_idx: i32,
        progress: &mut dyn ProgressSink,
    ) {
        let first = if first_idx < 0 { 0 } else { first_idx as usize };
        let last = if last_idx < 0 {
            usize::MAX
        } else {
            last_idx as usize
        };

        let mut direction = false;
        progress.init_progress("path generation", skeleton.len());

        for regions in &skeleton.layers {
            progress.tick();
            let index = regions.index;
            if index < first {
                continue;
            }
            if index > last {
                break;
            }

            let hold_direction = self.config.do_raft
                && self.config.raft_aligned
                && index > 1
                && index < self.config.raft_layers;
            if !hold_direction {
                direction = !direction;
            }

            let layer = Layer::new(
                layer_measure.layer_position(index),
                layer_measure.layer_thickness(index),
                layer_measure.layer_width(index),
                index,
            );
            layerpaths.layers.push(layer);
            let layer = layerpaths.layers.last_mut().expect("just pushed");
            layer
                .extruders
                .push(ExtruderLayer::new(self.config.default_extruder));
            let extruder_layer = layer.extruders.last_mut().expect("just pushed");

            if self.config.do_outlines {
                trace_outlines(
                    &regions.outline_loops,
                    PathOwner::Model,
                    &mut extruder_layer.paths,
                );
                trace_outlines(
                    &regions.support_loops,
                    PathOwner::Support,
                    &mut extruder_layer.paths,
                );
            }

            self.optimizer.clear();
            self.optimizer.add_boundaries(&regions.outline_loops);
            if !self.config.fills_interiors() {
                // Nothing will print inside the shells, so travel must keep
                // out of the interiors too.
                self.optimizer.add_boundaries(regions.interior_loops());
            }

            if self.config.do_raft || self.config.do_support {
                let outset: Vec<Loop> = regions
                    .support_loops
                    .iter()
                    .map(|l| l.offset(SUPPORT_BOUNDARY_OUTSET))
                    .collect();
                self.optimizer.add_boundaries(&outset);

                let mut support_paths = Vec::new();
                grid.paths_from_ranges(&regions.support, direction, &mut support_paths);
                self.optimizer.add_open_paths(
                    &support_paths,
                    PathLabel::new(PathKind::Infill, PathOwner::Support, 0),
                );
            }

            if self.config.do_insets {
                for (depth, loops) in regions.inset_loops.iter().enumerate() {
                    self.optimizer
                        .add_loops(loops, PathLabel::inset(PathOwner::Model, depth as i32));
                }
                for (depth, spurs) in regions.spur_paths.iter().enumerate() {
                    self.optimizer
                        .add_open_paths(spurs, PathLabel::spur(PathOwner::Model, depth as i32));
                }
            }

            if self.config.do_infills {
                let mut infill_paths = Vec::new();
                grid.paths_from_ranges(&regions.infill, direction, &mut infill_paths);
                self.optimizer.add_open_paths(
                    &infill_paths,
                    PathLabel::new(PathKind::Infill, PathOwner::Model, INFILL_LABEL_VALUE),
                );
            }

            let mut result = LabeledOpenPaths::new();
            match self.optimizer.optimize(&mut result) {
                Ok(()) => {
                    clean_paths(&mut result, self.config.coarseness);
                    smooth_collection(
                        &mut result,
                        self.config.coarseness,
                        self.config.direction_weight,
                    );
                    extruder_layer.paths.extend(result);
                }
                Err(err) => {
                    log::error!("slice {index}: path optimization failed: {err}");
                    extruder_layer.paths.clear();
                }
            }

            if progress.is_cancelled() {
                log::warn!("path generation cancelled after slice {index}");
                break;
            }
        }
    }
}

fn trace_outlines(loops: &[Loop], owner: PathOwner, out: &mut LabeledOpenPaths) {
    for l in loops {
        out.push(LabeledOpenPath::new(
            OpenPath::from_points(l.counter_clockwise().to_closed_points()),
            PathLabel::new(PathKind::Outline, owner, 0),
        ));
    }
}
