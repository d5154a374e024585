//! G-code emission.
//!
//! [`GCoder`] turns a [`LayerPaths`] tree into a G-code stream: file header
//! and footer framing, per-slice comments and rituals (layer messages, fan
//! control, the first-layer anchor), and the per-path emission protocol of
//! retract, travel, prime, deposit, retract. All machine state lives in the
//! [`Gantry`]; the emitter never writes a motion line behind its back.
//!
//! Emitted commands: `G1`, `M70` (display), `M73` (progress), `M126`/`M127`
//! (fan on/off). Coordinates, feedrates and filament positions are written
//! with three decimals.

mod gantry;

pub use gantry::{Gantry, MotionTarget};

use crate::config::{Extruder, Extrusion, PrintConfig};
use crate::geometry::Point2;
use crate::pather::{LabeledOpenPath, Layer, LayerPaths, PathKind, PathLabel};
use crate::slice::LayerMeasure;
use crate::{Error, Result, VERSION};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Replace parentheses in interpolated text so emitted comments always stay
/// balanced.
fn comment_safe(text: &str) -> String {
    text.replace('(', "{").replace(')', "}")
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// G-code emitter over a gantry state machine.
#[derive(Debug)]
pub struct GCoder {
    config: PrintConfig,
    gantry: Gantry,
    progress_total: usize,
    progress_current: usize,
    progress_percent: usize,
}

impl GCoder {
    /// Create an emitter; the gantry is initialized to the configured start
    /// coordinates before any emission.
    pub fn new(config: &PrintConfig) -> Self {
        let mut gantry = Gantry::new();
        gantry.init_to_start(config.starting_x, config.starting_y);
        Self {
            config: config.clone(),
            gantry,
            progress_total: 0,
            progress_current: 0,
            progress_percent: 0,
        }
    }

    /// Read access to the gantry, for callers that want to inspect final
    /// machine state after a run.
    pub fn gantry(&self) -> &Gantry {
        &self.gantry
    }

    /// Emit the whole file for every layer.
    pub fn write_gcode_file<W: Write>(
        &mut self,
        layerpaths: &LayerPaths,
        layer_measure: &LayerMeasure,
        out: &mut W,
        title: &str,
    ) -> Result<()> {
        self.write_gcode_file_range(layerpaths, layer_measure, out, title, 0, layerpaths.len())
    }

    /// Emit the file frame plus the layers in `[begin, end)`.
    pub fn write_gcode_file_range<W: Write>(
        &mut self,
        layerpaths: &LayerPaths,
        _layer_measure: &LayerMeasure,
        out: &mut W,
        title: &str,
        begin: usize,
        end: usize,
    ) -> Result<()> {
        let end = end.min(layerpaths.len());
        let begin = begin.min(end);

        self.write_start_gcode(out, title)?;

        let layers = &layerpaths.layers[begin..end];
        self.progress_total = layers.iter().map(Layer::point_count).sum();
        self.progress_current = 0;
        self.progress_percent = 0;

        for (layer_sequence, layer) in layers.iter().enumerate() {
            if self.config.do_anchor && layer_sequence == 0 {
                self.write_anchor(out, layer)?;
            }
            self.write_slice(out, layer, layer_sequence)?;
        }

        if self.config.do_fan_command {
            writeln!(
                out,
                "M127 T{} (Turn off the fan)",
                self.config.default_extruder
            )?;
        }

        self.write_end_gcode(out)?;
        Ok(())
    }

    /// Header comment block plus the optional user header file.
    fn write_start_gcode<W: Write>(&mut self, out: &mut W, title: &str) -> Result<()> {
        writeln!(out)?;
        writeln!(
            out,
            "(This file contains digital fabrication directives in gcode format)"
        )?;
        writeln!(out, "(for your 3D printer)")?;
        writeln!(out, "(* Generated by toolpath {VERSION})")?;
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        writeln!(out, "(* generated at unix time {epoch})")?;
        writeln!(out, "(* {})", comment_safe(title))?;
        let extruder_count = self.config.extruders.len();
        writeln!(
            out,
            "(* {extruder_count} extruder{})",
            plural(extruder_count)
        )?;
        writeln!(out, "(* Extrude infills: {})", self.config.do_infills)?;
        writeln!(out, "(* Extrude insets: {})", self.config.do_insets)?;
        writeln!(out, "(* Extrude outlines: {})", self.config.do_outlines)?;
        writeln!(out)?;

        if let Some(path) = self.config.header.clone() {
            self.include_template(out, &path, "header")?;
        }
        Ok(())
    }

    /// Optional user footer file.
    fn write_end_gcode<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if let Some(path) = self.config.footer.clone() {
            self.include_template(out, &path, "footer")?;
        }
        Ok(())
    }

    /// Copy a header/footer file verbatim, bracketed by begin/end comments.
    fn include_template<W: Write>(&mut self, out: &mut W, path: &Path, kind: &str) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|source| Error::TemplateIo {
            kind: kind.to_string(),
            path: path.display().to_string(),
            source,
        })?;

        writeln!(out, "({kind} [{}] begin)", path.display())?;
        out.write_all(content.as_bytes())?;
        if !content.ends_with('\n') {
            writeln!(out)?;
        }
        writeln!(out, "({kind} [{}] end)", path.display())?;
        writeln!(out)?;
        Ok(())
    }

    /// First-layer prime anchor: retract, travel to the configured start
    /// coordinate, prime, then deposit a double-width bead to the first
    /// path's start point.
    fn write_anchor<W: Write>(&mut self, out: &mut W, layer: &Layer) -> Result<()> {
        let Some(extruder_layer) = layer.extruders.first() else {
            return Ok(());
        };
        let extruder = self.extruder(extruder_layer.extruder_id)?.clone();
        let extrusion = self
            .config
            .scaled_profile(&extruder.first_layer_extrusion_profile)?;
        self.gantry.set_current_extruder_code(extruder.code);

        let start_point = extruder_layer
            .paths
            .first()
            .and_then(|p| p.path.first())
            .unwrap_or_default();

        let z = layer.z + layer.layer_height;
        let h = layer.layer_height;
        let w = layer.layer_w * 2.0;

        self.gantry.snort(out, &extrusion)?;
        self.gantry.g1(
            out,
            &extruder,
            self.config.starting_x,
            self.config.starting_y,
            z,
            extrusion.feedrate,
            h,
            w,
            "Anchor Start",
        )?;
        self.gantry.squirt(out, &extrusion)?;
        self.gantry.g1(
            out,
            &extruder,
            start_point.x,
            start_point.y,
            z,
            extrusion.feedrate,
            h,
            w,
            "Anchor End",
        )?;
        Ok(())
    }

    /// Emit one slice: framing comments, per-layer rituals, then every path
    /// of every extruder sub-layer in stored order.
    fn write_slice<W: Write>(
        &mut self,
        out: &mut W,
        layer: &Layer,
        layer_sequence: usize,
    ) -> Result<()> {
        let extruder_count = layer.extruders.len();
        writeln!(
            out,
            "(Slice {layer_sequence}, {extruder_count} Extruder{})",
            plural(extruder_count)
        )?;
        writeln!(out, "(Layer Height: {:.3})", layer.layer_height)?;
        writeln!(out, "(Layer Width: {:.3})", layer.layer_w)?;

        if self.config.do_print_layer_messages {
            writeln!(out, "M70 P20 (Layer: {layer_sequence})")?;
        }
        if self.config.do_fan_command && layer_sequence == self.config.fan_layer {
            writeln!(
                out,
                "M126 T{} (Turn on the fan)",
                self.config.default_extruder
            )?;
        }

        for extruder_layer in &layer.extruders {
            let extruder = self.extruder(extruder_layer.extruder_id)?.clone();
            self.gantry.set_current_extruder_code(extruder.code);

            let z = layer.z + layer.layer_height;
            let h = layer.layer_height;
            let w = layer.layer_w;
            let z_feedrate = self.config.scaling_factor * self.config.rapid_move_feed_rate_z;
            self.gantry.move_z(out, z, z_feedrate)?;

            if self.config.do_outlines {
                writeln!(out, "(outlines: {})", extruder_layer.outline_paths().count())?;
            }
            if self.config.do_insets {
                writeln!(out, "(insets: {})", extruder_layer.inset_paths().count())?;
            }
            if self.config.do_infills {
                writeln!(out, "(infills: {})", extruder_layer.infill_paths().count())?;
            }
            if self.config.do_support {
                writeln!(out, "(support: {})", extruder_layer.support_paths().count())?;
            }

            self.write_paths(
                out,
                z,
                h,
                w,
                layer_sequence,
                &extruder,
                &extruder_layer.paths,
            )?;
        }
        Ok(())
    }

    /// Emit every labeled path in stored order. A missing extrusion profile
    /// skips the affected path and the run continues; I/O errors abort.
    #[allow(clippy::too_many_arguments)]
    fn write_paths<W: Write>(
        &mut self,
        out: &mut W,
        z: f64,
        h: f64,
        w: f64,
        layer_sequence: usize,
        extruder: &Extruder,
        paths: &[LabeledOpenPath],
    ) -> Result<()> {
        for labeled in paths {
            let extrusion = match self.profile_for_label(extruder, &labeled.label, layer_sequence)
            {
                Ok(extrusion) => extrusion,
                Err(err @ Error::ProfileNotFound(_)) => {
                    log::error!(
                        "slice {layer_sequence}, extruder {}: {err}; skipping path",
                        extruder.id
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };
            self.write_path(out, z, h, w, extruder, &extrusion, labeled)?;
        }
        Ok(())
    }

    /// Emit one path: retract, travel to the (lead-in adjusted) entry,
    /// prime, deposit every stored segment, overshoot the lead-out, retract.
    #[allow(clippy::too_many_arguments)]
    fn write_path<W: Write>(
        &mut self,
        out: &mut W,
        z: f64,
        h: f64,
        w: f64,
        extruder: &Extruder,
        extrusion: &Extrusion,
        labeled: &LabeledOpenPath,
    ) -> Result<()> {
        let path = &labeled.path;
        if path.len() < 2 {
            return Ok(());
        }

        let first = path.first().expect("len checked");
        let second = path[1];
        let last = path.last().expect("len checked");
        let before_last = path[path.len() - 2];

        self.gantry.snort(out, extrusion)?;

        let entry = if extruder.is_volumetric() {
            first
        } else {
            match (second - first).normalized() {
                Some(direction) => first - direction * extrusion.lead_in,
                None => first,
            }
        };
        let travel_feedrate = self.config.scaling_factor * self.config.rapid_move_feed_rate_xy;
        self.gantry
            .g1(out, extruder, entry.x, entry.y, z, travel_feedrate, h, w, "move")?;

        self.gantry.squirt(out, extrusion)?;

        for point in path.iter() {
            self.gantry.g1(
                out,
                extruder,
                point.x,
                point.y,
                z,
                extrusion.feedrate,
                h,
                w,
                "",
            )?;
            self.tick_progress(out)?;
        }

        if !extruder.is_volumetric() && extrusion.lead_out > 0.0 {
            if let Some(direction) = (last - before_last).normalized() {
                let overshoot: Point2 = last + direction * extrusion.lead_out;
                self.gantry.g1(
                    out,
                    extruder,
                    overshoot.x,
                    overshoot.y,
                    z,
                    extrusion.feedrate,
                    h,
                    w,
                    "lead out",
                )?;
            }
        }

        self.gantry.snort(out, extrusion)?;
        Ok(())
    }

    /// `M73` percent line, emitted only when the integer percent changes.
    fn tick_progress<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if !self.config.do_print_progress || self.progress_total == 0 {
            return Ok(());
        }
        self.progress_current += 1;
        let percent = self.progress_current * 100 / self.progress_total;
        if percent != self.progress_percent {
            writeln!(
                out,
                "M73 P{percent} (progress ({percent}%): {}/{})",
                self.progress_current, self.progress_total
            )?;
            self.progress_percent = percent;
        }
        Ok(())
    }

    /// Profile for a path label, substituting the first-layer profile on
    /// slice 0. The returned feedrate is already scaled.
    fn profile_for_label(
        &self,
        extruder: &Extruder,
        label: &PathLabel,
        layer_sequence: usize,
    ) -> Result<Extrusion> {
        let name = if layer_sequence == 0 {
            &extruder.first_layer_extrusion_profile
        } else {
            match label.kind {
                PathKind::Outline => &extruder.outlines_extrusion_profile,
                PathKind::Inset | PathKind::Connection | PathKind::Invalid => {
                    &extruder.insets_extrusion_profile
                }
                PathKind::Infill => &extruder.infills_extrusion_profile,
            }
        };
        self.config.scaled_profile(name)
    }

    fn extruder(&self, id: usize) -> Result<&Extruder> {
        self.config
            .extruders
            .get(id)
            .ok_or_else(|| Error::Config(format!("unknown extruder id {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::OpenPath;
    use crate::pather::{ExtruderLayer, LabeledOpenPath, PathOwner};

    fn unit_square_path() -> OpenPath {
        OpenPath::from_points([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 0.0),
        ])
    }

    fn single_layer(paths: Vec<LabeledOpenPath>) -> LayerPaths {
        let mut layer = Layer::new(0.0, 0.3, 0.5, 0);
        let mut extruder_layer = ExtruderLayer::new(0);
        extruder_layer.paths = paths;
        layer.extruders.push(extruder_layer);
        LayerPaths {
            layers: vec![layer],
        }
    }

    fn outline_label() -> PathLabel {
        PathLabel::new(PathKind::Outline, PathOwner::Model, 0)
    }

    fn measure() -> LayerMeasure {
        LayerMeasure::new(0.0, 0.3, 1.67)
    }

    fn emit(config: &PrintConfig, layerpaths: &LayerPaths, title: &str) -> String {
        let mut gcoder = GCoder::new(config);
        let mut buf = Vec::new();
        gcoder
            .write_gcode_file(layerpaths, &measure(), &mut buf, title)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_empty_pipeline_emits_frame_only() {
        let config = PrintConfig {
            do_anchor: false,
            ..PrintConfig::default()
        };
        let text = emit(&config, &LayerPaths::new(), "t");

        assert!(text.contains("(* t)"));
        assert!(text.contains("(* Generated by toolpath"));
        assert!(!text.contains("G1"));
        assert!(!text.contains("Slice"));
    }

    #[test]
    fn test_square_outline_extrusion() {
        let mut config = PrintConfig {
            do_anchor: false,
            do_outlines: true,
            do_insets: false,
            do_infills: false,
            ..PrintConfig::default()
        };
        config.extruders[0].volumetric = true;

        let layerpaths = single_layer(vec![LabeledOpenPath::new(
            unit_square_path(),
            outline_label(),
        )]);
        let text = emit(&config, &layerpaths, "square");

        // Four unit segments at h=0.3, w=0.5 with the first-layer profile.
        let area = Extrusion::cross_section_area(0.3, 0.5);
        let feed_area = config.extruders[0].feed_cross_section_area();
        let per_segment = area / feed_area;

        // Retract before travel, then prime back, then four deposition
        // moves, then final retract.
        let e_values: Vec<f64> = text
            .lines()
            .filter(|l| l.starts_with("G1"))
            .filter_map(|l| {
                l.split_whitespace()
                    .find(|tok| tok.starts_with('E'))
                    .map(|tok| tok[1..].parse::<f64>().unwrap())
            })
            .collect();

        let total = 4.0 * per_segment;
        let last_primed = e_values[e_values.len() - 2];
        assert!(
            (last_primed - total).abs() < 2e-3,
            "expected cumulative E near {total}, got {last_primed}"
        );
        // Final retract pulls back below the deposited total.
        assert!(e_values[e_values.len() - 1] < last_primed);
    }

    #[test]
    fn test_slice_frame_and_rituals() {
        let config = PrintConfig {
            do_anchor: false,
            do_print_layer_messages: true,
            do_fan_command: true,
            fan_layer: 0,
            ..PrintConfig::default()
        };
        let layerpaths = single_layer(Vec::new());
        let text = emit(&config, &layerpaths, "t");

        assert!(text.contains("(Slice 0, 1 Extruder)"));
        assert!(text.contains("(Layer Height: 0.300)"));
        assert!(text.contains("(Layer Width: 0.500)"));
        assert!(text.contains("M70 P20 (Layer: 0)"));
        assert!(text.contains("M126 T0 (Turn on the fan)"));
        assert!(text.contains("M127 T0 (Turn off the fan)"));
    }

    #[test]
    fn test_gantry_retracted_between_paths() {
        let mut config = PrintConfig {
            do_anchor: false,
            do_outlines: true,
            ..PrintConfig::default()
        };
        config.extruders[0].volumetric = true;

        let layerpaths = single_layer(vec![
            LabeledOpenPath::new(unit_square_path(), outline_label()),
            LabeledOpenPath::new(
                OpenPath::from_points([Point2::new(3.0, 0.0), Point2::new(4.0, 0.0)]),
                outline_label(),
            ),
        ]);

        let mut gcoder = GCoder::new(&config);
        let mut buf = Vec::new();
        gcoder
            .write_gcode_file(&layerpaths, &measure(), &mut buf, "t")
            .unwrap();
        assert!(gcoder.gantry().is_retracted());
    }

    #[test]
    fn test_missing_profile_skips_category_not_run() {
        let mut config = PrintConfig {
            do_anchor: false,
            do_outlines: true,
            ..PrintConfig::default()
        };
        // Outline profile missing; the square outline path is skipped but
        // the file still frames correctly.
        config.extruders[0].outlines_extrusion_profile = "ghost".into();

        let mut layerpaths = single_layer(vec![LabeledOpenPath::new(
            unit_square_path(),
            outline_label(),
        )]);
        // Second layer so slice 1 uses the per-category (missing) profile.
        layerpaths.layers.push(layerpaths.layers[0].clone());
        layerpaths.layers[1].z = 0.3;

        let mut gcoder = GCoder::new(&config);
        let mut buf = Vec::new();
        gcoder
            .write_gcode_file(&layerpaths, &measure(), &mut buf, "t")
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("(Slice 1, 1 Extruder)"));
    }

    #[test]
    fn test_lead_in_offsets_travel_target() {
        let mut config = PrintConfig {
            do_anchor: false,
            do_outlines: true,
            ..PrintConfig::default()
        };
        // Non-volumetric with an explicit lead-in on the first-layer profile.
        config
            .extrusion_profiles
            .get_mut("firstlayer")
            .unwrap()
            .lead_in = 0.25;

        let path = OpenPath::from_points([Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)]);
        let layerpaths = single_layer(vec![LabeledOpenPath::new(path, outline_label())]);
        let text = emit(&config, &layerpaths, "t");

        // Entry is pulled back along the first segment: 1.0 - 0.25.
        assert!(text.contains("X0.750"), "missing lead-in travel: {text}");
    }

    #[test]
    fn test_anchor_sequence() {
        let mut config = PrintConfig {
            do_anchor: true,
            do_outlines: true,
            starting_x: -10.0,
            starting_y: -10.0,
            ..PrintConfig::default()
        };
        config.extruders[0].volumetric = true;

        let layerpaths = single_layer(vec![LabeledOpenPath::new(
            unit_square_path(),
            outline_label(),
        )]);
        let text = emit(&config, &layerpaths, "t");

        let anchor_start = text.find("(Anchor Start)").expect("anchor start emitted");
        let anchor_end = text.find("(Anchor End)").expect("anchor end emitted");
        assert!(anchor_start < anchor_end);

        // The anchor end bead lands on the first path's start point.
        let end_line = text
            .lines()
            .find(|l| l.contains("(Anchor End)"))
            .unwrap();
        assert!(end_line.contains("X0.000"));
        assert!(end_line.contains("Y0.000"));
    }

    #[test]
    fn test_progress_percent_boundaries() {
        // 200 stored points must produce exactly P1..P100, one line each.
        let mut config = PrintConfig {
            do_anchor: false,
            do_outlines: true,
            do_print_progress: true,
            ..PrintConfig::default()
        };
        config.extruders[0].volumetric = true;

        let mut paths = Vec::new();
        for i in 0..100 {
            let y = i as f64;
            paths.push(LabeledOpenPath::new(
                OpenPath::from_points([Point2::new(0.0, y), Point2::new(5.0, y)]),
                outline_label(),
            ));
        }
        let layerpaths = single_layer(paths);
        let text = emit(&config, &layerpaths, "t");

        let percents: Vec<usize> = text
            .lines()
            .filter(|l| l.starts_with("M73 P"))
            .map(|l| {
                l.trim_start_matches("M73 P")
                    .split_whitespace()
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap()
            })
            .collect();

        assert_eq!(percents.len(), 100);
        assert_eq!(percents.first(), Some(&1));
        assert_eq!(percents.last(), Some(&100));
        let mut sorted = percents.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), 100);
    }

    #[test]
    fn test_comment_safe() {
        assert_eq!(comment_safe("a(b)c"), "a{b}c");
        assert_eq!(comment_safe("plain"), "plain");
    }
}
