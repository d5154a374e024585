//! # toolpath
//!
//! A toolpath generation core for fused-filament 3D printers.
//!
//! This library turns per-layer region geometry into machine directives:
//! - Mesh segmentation into per-slice triangle buckets
//! - Path generation: ordering outlines, shells, spurs, infill and support
//!   with travel-minimizing optimization
//! - G-code emission through a single-head gantry state machine with
//!   retract/prime handling and extrusion cross-section accounting
//!
//! ## Example
//!
//! ```rust,ignore
//! use toolpath::{GCoder, LayerPaths, Pather, PrintConfig};
//!
//! let config = PrintConfig::default();
//! let mut pather = Pather::new(&config);
//! let mut layerpaths = LayerPaths::new();
//! pather.generate_paths(&skeleton, &measure, &grid, &mut layerpaths, -1, -1, &mut progress);
//!
//! let mut gcoder = GCoder::new(&config);
//! gcoder.write_gcode_file(&layerpaths, &measure, &mut out, "model.stl")?;
//! ```

pub mod config;
pub mod gcode;
pub mod geometry;
pub mod grid;
pub mod pather;
pub mod progress;
pub mod skeleton;
pub mod slice;

// Re-export commonly used types
pub use config::{Extruder, Extrusion, PrintConfig};
pub use gcode::{GCoder, Gantry, MotionTarget};
pub use geometry::{Loop, LoopPath, OpenPath, Point2, Point3, Segment};
pub use grid::{Grid, GridRanges, ScalarRange};
pub use pather::{
    clean_paths, smooth_collection, ExtruderLayer, GraphOptimizer, GreedyOptimizer,
    LabeledOpenPath, LabeledOpenPaths, Layer, LayerPaths, PathKind, PathLabel, PathOptimizer,
    PathOwner, Pather, INFILL_LABEL_VALUE, INSET_LABEL_VALUE,
};
pub use progress::{LogProgress, NullProgress, ProgressSink};
pub use skeleton::{LayerRegions, Skeleton};
pub use slice::{LayerMeasure, Limits, Segmenter, SliceTable, Triangle3, TriangleIndices};

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pathing and emission operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to find extrusion profile {0}")]
    ProfileNotFound(String),

    #[error("failed to read gcode {kind} file [{path}]: {source}")]
    TemplateIo {
        kind: String,
        path: String,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid geometry: {0}")]
    Geometry(String),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
