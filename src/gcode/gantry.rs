//! Gantry state machine.
//!
//! The [`Gantry`] is the single mutable model of the machine: position,
//! feedrate, tool selection, filament position and retract state. Every
//! motion command goes through it, so the tracked state and the emitted
//! text can never disagree. State mutation and the corresponding output
//! line form one transaction; callers must not interleave.

use crate::config::{Extruder, Extrusion};
use crate::Result;
use std::io::Write;

/// Requested axes for one `G1` line. `None` leaves the axis out of the
/// command and out of the state update.
#[derive(Clone, Copy, Debug, Default)]
pub struct MotionTarget {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub e: Option<f64>,
    pub feedrate: Option<f64>,
}

/// Retraction state of the filament drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FilamentState {
    /// Filament pulled back; travel is safe.
    Retracted,
    /// Filament at the nozzle; moves deposit.
    Primed,
}

/// Single-head motion controller.
#[derive(Debug)]
pub struct Gantry {
    x: f64,
    y: f64,
    z: f64,
    feedrate: f64,
    e: f64,
    current_extruder_code: u32,
    filament: FilamentState,
    temperature: f64,
    initialized: bool,
}

impl Gantry {
    /// Construct in the cold, uninitialized pose.
    pub fn new() -> Self {
        Self {
            x: f64::NAN,
            y: f64::NAN,
            z: f64::NAN,
            feedrate: 0.0,
            e: 0.0,
            current_extruder_code: 0,
            filament: FilamentState::Primed,
            temperature: 0.0,
            initialized: false,
        }
    }

    /// Move the tracked pose to the configured start coordinates. Must run
    /// before any emission.
    pub fn init_to_start(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.z = 0.0;
        self.e = 0.0;
        self.filament = FilamentState::Primed;
        self.initialized = true;
    }

    /// Current planar position.
    pub fn position(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Cumulative commanded filament advance.
    pub fn e(&self) -> f64 {
        self.e
    }

    /// Whether the filament is currently retracted.
    pub fn is_retracted(&self) -> bool {
        self.filament == FilamentState::Retracted
    }

    /// Select the machine tool for subsequent commands.
    pub fn set_current_extruder_code(&mut self, code: u32) {
        self.current_extruder_code = code;
    }

    /// The selected machine tool.
    pub fn current_extruder_code(&self) -> u32 {
        self.current_extruder_code
    }

    /// Record the nozzle temperature the stream has been set to.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = temperature;
    }

    /// Last recorded nozzle temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Emit a `G1` carrying exactly the requested axes, then update the
    /// tracked state to match. Axes equal to the tracked value are elided;
    /// a command with nothing left to say emits nothing.
    pub fn g1_motion<W: Write>(
        &mut self,
        out: &mut W,
        target: MotionTarget,
        comment: &str,
    ) -> Result<()> {
        assert!(self.initialized, "gantry used before init_to_start");

        let mut line = String::from("G1");

        if let Some(x) = target.x {
            if x != self.x {
                line.push_str(&format!(" X{x:.3}"));
                self.x = x;
            }
        }
        if let Some(y) = target.y {
            if y != self.y {
                line.push_str(&format!(" Y{y:.3}"));
                self.y = y;
            }
        }
        if let Some(z) = target.z {
            if z != self.z {
                line.push_str(&format!(" Z{z:.3}"));
                self.z = z;
            }
        }
        if let Some(feedrate) = target.feedrate {
            if feedrate != self.feedrate {
                line.push_str(&format!(" F{feedrate:.3}"));
                self.feedrate = feedrate;
            }
        }
        if let Some(e) = target.e {
            if e != self.e {
                line.push_str(&format!(" E{e:.3}"));
                self.e = e;
            }
        }

        if line.len() == 2 {
            return Ok(());
        }
        if !comment.is_empty() {
            line.push_str(&format!(" ({comment})"));
        }
        writeln!(out, "{line}")?;
        Ok(())
    }

    /// Coordinated planar move. While primed, filament advance is derived
    /// from the travel distance and the bead cross-section `(h, w)`; while
    /// retracted the move is a pure travel.
    #[allow(clippy::too_many_arguments)]
    pub fn g1<W: Write>(
        &mut self,
        out: &mut W,
        extruder: &Extruder,
        x: f64,
        y: f64,
        z: f64,
        feedrate: f64,
        h: f64,
        w: f64,
        comment: &str,
    ) -> Result<()> {
        let e = if self.filament == FilamentState::Primed {
            let distance = ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt();
            let delta =
                distance * Extrusion::cross_section_area(h, w) / extruder.feed_cross_section_area();
            Some(self.e + delta)
        } else {
            None
        };
        self.g1_motion(
            out,
            MotionTarget {
                x: Some(x),
                y: Some(y),
                z: Some(z),
                e,
                feedrate: Some(feedrate),
            },
            comment,
        )
    }

    /// Z-only move at the given feedrate.
    pub fn move_z<W: Write>(&mut self, out: &mut W, z: f64, feedrate: f64) -> Result<()> {
        self.g1_motion(
            out,
            MotionTarget {
                z: Some(z),
                feedrate: Some(feedrate),
                ..MotionTarget::default()
            },
            "move Z",
        )
    }

    /// Retract ("snort"): pull the filament back so travel does not ooze.
    /// A no-op when already retracted. Never moves x/y/z.
    pub fn snort<W: Write>(&mut self, out: &mut W, extrusion: &Extrusion) -> Result<()> {
        if self.filament == FilamentState::Retracted {
            return Ok(());
        }
        let e = self.e - extrusion.retract_distance;
        self.g1_motion(
            out,
            MotionTarget {
                e: Some(e),
                feedrate: Some(extrusion.retract_rate),
                ..MotionTarget::default()
            },
            "snort",
        )?;
        self.filament = FilamentState::Retracted;
        Ok(())
    }

    /// Prime ("squirt"): push the filament back to the nozzle, plus any
    /// configured restart extra. A no-op when already primed.
    pub fn squirt<W: Write>(&mut self, out: &mut W, extrusion: &Extrusion) -> Result<()> {
        if self.filament == FilamentState::Primed {
            return Ok(());
        }
        let e = self.e + extrusion.retract_distance + extrusion.restart_extra_distance;
        self.g1_motion(
            out,
            MotionTarget {
                e: Some(e),
                feedrate: Some(extrusion.restart_extra_rate),
                ..MotionTarget::default()
            },
            "squirt",
        )?;
        self.filament = FilamentState::Primed;
        Ok(())
    }
}

impl Default for Gantry {
    fn default() -> Self {
        Self::new()
    }
}
