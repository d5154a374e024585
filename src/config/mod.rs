//! Print configuration types.
//!
//! [`PrintConfig`] carries every option the pather and gcoder recognize,
//! along with the extruder descriptors and the named extrusion profiles they
//! select from. Configurations deserialize from JSON; [`PrintConfig::validate`]
//! is the single gate that rejects unusable values before a run starts.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::PathBuf;

/// A named set of kinematic and flow parameters.
///
/// Profiles are selected per path category and per layer (the first layer
/// substitutes its own profile). `feedrate` as stored is unscaled; lookups
/// through [`PrintConfig::scaled_profile`] apply the global scaling factor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extrusion {
    /// Deposition feedrate (mm/min, pre-scaling).
    pub feedrate: f64,
    /// Filament pull-back distance on retract (mm of feedstock).
    pub retract_distance: f64,
    /// Feedrate for the retract move (mm/min).
    pub retract_rate: f64,
    /// Extra filament pushed on top of the retract distance when restarting.
    pub restart_extra_distance: f64,
    /// Feedrate for the restart move (mm/min).
    pub restart_extra_rate: f64,
    /// Lead-in distance before a path's first segment (mm).
    pub lead_in: f64,
    /// Lead-out distance past a path's last segment (mm).
    pub lead_out: f64,
}

impl Default for Extrusion {
    fn default() -> Self {
        Self {
            feedrate: 1800.0,
            retract_distance: 1.0,
            retract_rate: 1800.0,
            restart_extra_distance: 0.0,
            restart_extra_rate: 1800.0,
            lead_in: 0.0,
            lead_out: 0.0,
        }
    }
}

impl Extrusion {
    /// Cross-section area of a deposited bead of height `h` and width `w`:
    /// two semicircles joined by a rectangle.
    pub fn cross_section_area(height: f64, width: f64) -> f64 {
        let radius = height / 2.0;
        PI * radius * radius + height * (width - height)
    }
}

/// An immutable extruder descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extruder {
    /// Index into the configured extruder list.
    pub id: usize,
    /// Machine tool index used for `T` codes.
    pub code: u32,
    /// Feedstock diameter (mm).
    pub feed_diameter: f64,
    /// Firmware meters deposition volume itself; lead-in/out is suppressed.
    pub volumetric: bool,
    /// Profile name used for every category on the first layer.
    pub first_layer_extrusion_profile: String,
    /// Profile name for outline paths.
    pub outlines_extrusion_profile: String,
    /// Profile name for inset paths.
    pub insets_extrusion_profile: String,
    /// Profile name for infill paths.
    pub infills_extrusion_profile: String,
}

impl Default for Extruder {
    fn default() -> Self {
        Self {
            id: 0,
            code: 0,
            feed_diameter: 1.75,
            volumetric: false,
            first_layer_extrusion_profile: "firstlayer".into(),
            outlines_extrusion_profile: "outlines".into(),
            insets_extrusion_profile: "insets".into(),
            infills_extrusion_profile: "infill".into(),
        }
    }
}

impl Extruder {
    /// Whether the machine meters volume itself (no lead-in/out).
    #[inline]
    pub fn is_volumetric(&self) -> bool {
        self.volumetric
    }

    /// Cross-section area of the cylindrical feedstock.
    #[inline]
    pub fn feed_cross_section_area(&self) -> f64 {
        let radius = self.feed_diameter / 2.0;
        PI * radius * radius
    }

    /// Reject unusable descriptors.
    pub fn validate(&self) -> Result<()> {
        if !self.feed_diameter.is_finite() || self.feed_diameter <= 0.0 {
            return Err(Error::Config(format!(
                "extruder {} feed diameter must be positive and finite",
                self.id
            )));
        }
        Ok(())
    }
}

/// Full configuration for a pathing + emission run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    // === Category gates ===
    /// Emit outline traces.
    pub do_outlines: bool,
    /// Emit shell insets.
    pub do_insets: bool,
    /// Emit infill rasters.
    pub do_infills: bool,
    /// Emit support rasters.
    pub do_support: bool,

    // === First layer / machine rituals ===
    /// Emit the first-layer prime anchor sequence.
    pub do_anchor: bool,
    /// Emit fan on/off commands around `fan_layer`.
    pub do_fan_command: bool,
    /// Layer at which the fan turns on.
    pub fan_layer: usize,
    /// Emit `M70` layer messages to the printer display.
    pub do_print_layer_messages: bool,
    /// Emit `M73` progress percent lines.
    pub do_print_progress: bool,

    // === Pathing ===
    /// Select the graph optimizer over the greedy fallback.
    pub do_graph_optimization: bool,
    /// Print a raft under the model.
    pub do_raft: bool,
    /// Number of raft layers.
    pub raft_layers: usize,
    /// Lock infill direction across non-base raft layers.
    pub raft_aligned: bool,
    /// Join/smooth threshold (mm).
    pub coarseness: f64,
    /// Weight of heading continuity in optimization and smoothing.
    pub direction_weight: f64,
    /// Sparse infill density in `[0, 1]`.
    pub infill_density: f64,
    /// Number of solid roof layers.
    pub roof_layer_count: usize,
    /// Number of solid floor layers.
    pub floor_layer_count: usize,

    // === Kinematics ===
    /// Global feedrate multiplier applied on every profile lookup.
    pub scaling_factor: f64,
    /// Travel feedrate in the layer plane (mm/min, pre-scaling).
    pub rapid_move_feed_rate_xy: f64,
    /// Z-axis feedrate (mm/min, pre-scaling).
    pub rapid_move_feed_rate_z: f64,

    // === Anchor ===
    /// Anchor start X (mm).
    pub starting_x: f64,
    /// Anchor start Y (mm).
    pub starting_y: f64,

    // === Extruders ===
    /// Tool used when a layer does not name one.
    pub default_extruder: usize,
    /// Extruder descriptors.
    pub extruders: Vec<Extruder>,
    /// Named extrusion profiles.
    pub extrusion_profiles: BTreeMap<String, Extrusion>,

    // === Template files ===
    /// File included verbatim before the first slice.
    pub header: Option<PathBuf>,
    /// File included verbatim after the last slice.
    pub footer: Option<PathBuf>,
}

impl Default for PrintConfig {
    fn default() -> Self {
        let mut extrusion_profiles = BTreeMap::new();
        extrusion_profiles.insert("firstlayer".to_string(), Extrusion {
            feedrate: 900.0,
            ..Extrusion::default()
        });
        extrusion_profiles.insert("outlines".to_string(), Extrusion {
            feedrate: 1200.0,
            ..Extrusion::default()
        });
        extrusion_profiles.insert("insets".to_string(), Extrusion {
            feedrate: 1800.0,
            ..Extrusion::default()
        });
        extrusion_profiles.insert("infill".to_string(), Extrusion {
            feedrate: 2400.0,
            ..Extrusion::default()
        });

        Self {
            do_outlines: false,
            do_insets: true,
            do_infills: true,
            do_support: false,
            do_anchor: true,
            do_fan_command: false,
            fan_layer: 1,
            do_print_layer_messages: false,
            do_print_progress: false,
            do_graph_optimization: true,
            do_raft: false,
            raft_layers: 0,
            raft_aligned: true,
            coarseness: 0.05,
            direction_weight: 1.0,
            infill_density: 0.1,
            roof_layer_count: 5,
            floor_layer_count: 5,
            scaling_factor: 1.0,
            rapid_move_feed_rate_xy: 6000.0,
            rapid_move_feed_rate_z: 1400.0,
            starting_x: -110.4,
            starting_y: -74.0,
            default_extruder: 0,
            extruders: vec![Extruder::default()],
            extrusion_profiles,
            header: None,
            footer: None,
        }
    }
}

impl PrintConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.extruders.is_empty() {
            return Err(Error::Config("at least one extruder is required".into()));
        }
        if self.default_extruder >= self.extruders.len() {
            return Err(Error::Config(format!(
                "default extruder {} out of range ({} configured)",
                self.default_extruder,
                self.extruders.len()
            )));
        }
        for extruder in &self.extruders {
            extruder.validate()?;
            for name in [
                &extruder.first_layer_extrusion_profile,
                &extruder.outlines_extrusion_profile,
                &extruder.insets_extrusion_profile,
                &extruder.infills_extrusion_profile,
            ] {
                if !self.extrusion_profiles.contains_key(name) {
                    return Err(Error::ProfileNotFound(name.clone()));
                }
            }
        }
        if !self.scaling_factor.is_finite() || self.scaling_factor <= 0.0 {
            return Err(Error::Config("scaling factor must be positive".into()));
        }
        if !self.coarseness.is_finite() || self.coarseness < 0.0 {
            return Err(Error::Config("coarseness must be non-negative".into()));
        }
        if !self.direction_weight.is_finite() || self.direction_weight < 0.0 {
            return Err(Error::Config("direction weight must be non-negative".into()));
        }
        Ok(())
    }

    /// Look up a profile by name, with `feedrate` post-scaled by the global
    /// scaling factor. Lookups never return an unscaled feedrate.
    pub fn scaled_profile(&self, name: &str) -> Result<Extrusion> {
        let mut profile = self
            .extrusion_profiles
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))?;
        profile.feedrate *= self.scaling_factor;
        Ok(profile)
    }

    /// Whether any deposition will fill region interiors.
    ///
    /// When nothing fills the interior, the pather registers the interior
    /// shell loops as travel boundaries instead.
    pub fn fills_interiors(&self) -> bool {
        (self.do_infills && self.infill_density > 0.0)
            || self.roof_layer_count > 0
            || self.floor_layer_count > 0
    }
}
