//! Path labels.
//!
//! Every path the pather emits carries a [`PathLabel`] naming what kind of
//! deposition it is, who owns it (model or support) and which shell it
//! belongs to. The gcoder switches on the label to pick extrusion profiles;
//! the optimizer ranks labels to decide print order.

use crate::geometry::OpenPath;
use serde::{Deserialize, Serialize};

/// Base shell value for nested insets; depth `d` gets `INSET_LABEL_VALUE + d`.
pub const INSET_LABEL_VALUE: i32 = 10;

/// Shell value for infill, distinct from any inset shell. Spur shells number
/// upward from `INFILL_LABEL_VALUE + 1`.
pub const INFILL_LABEL_VALUE: i32 = 100;

/// What kind of deposition a path is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathKind {
    /// Outermost trace of a region.
    Outline,
    /// Shell offset inward from the outline.
    Inset,
    /// Raster fill of a region interior.
    Infill,
    /// Synthetic travel bridge the cleaner may fuse into its neighbors.
    Connection,
    /// Not a printable path.
    #[default]
    Invalid,
}

/// Who a path belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathOwner {
    /// Part geometry.
    Model,
    /// Sacrificial support geometry.
    Support,
    /// No owner.
    #[default]
    Invalid,
}

/// A `(kind, owner, shell)` triple attached to every emitted path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathLabel {
    pub kind: PathKind,
    pub owner: PathOwner,
    pub shell: i32,
}

impl PathLabel {
    /// Create a label.
    pub const fn new(kind: PathKind, owner: PathOwner, shell: i32) -> Self {
        Self { kind, owner, shell }
    }

    /// Label for an inset at `depth` (0 = outermost).
    pub const fn inset(owner: PathOwner, depth: i32) -> Self {
        Self::new(PathKind::Inset, owner, INSET_LABEL_VALUE + depth)
    }

    /// Label for a spur at `depth`. Spur shells sit in the infill band so
    /// they order after every closed inset.
    pub const fn spur(owner: PathOwner, depth: i32) -> Self {
        Self::new(PathKind::Inset, owner, INFILL_LABEL_VALUE + 1 + depth)
    }

    /// Check for the synthetic connection kind.
    #[inline]
    pub fn is_connection(&self) -> bool {
        self.kind == PathKind::Connection
    }

    /// Check for the inset kind (closed shells and spurs alike).
    #[inline]
    pub fn is_inset(&self) -> bool {
        self.kind == PathKind::Inset
    }

    /// Check for a valid, printable label.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.kind != PathKind::Invalid && self.owner != PathOwner::Invalid
    }
}

/// An open path with its label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledOpenPath {
    pub path: OpenPath,
    pub label: PathLabel,
}

impl LabeledOpenPath {
    /// Create a labeled path.
    pub fn new(path: OpenPath, label: PathLabel) -> Self {
        Self { path, label }
    }
}

/// An ordered run of labeled paths, as produced by the optimizer.
pub type LabeledOpenPaths = Vec<LabeledOpenPath>;
