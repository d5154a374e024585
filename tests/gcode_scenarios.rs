//! End-to-end scenarios through the pather and gcoder.

use std::fs;
use std::path::PathBuf;
use toolpath::progress::NullProgress;
use toolpath::{
    Error, GCoder, Grid, GridRanges, LabeledOpenPath, Layer, LayerMeasure, LayerPaths,
    LayerRegions, Loop, OpenPath, PathKind, PathLabel, PathOwner, Pather, Point2, PrintConfig,
    ScalarRange, Skeleton, INFILL_LABEL_VALUE,
};

fn square(x: f64, y: f64, size: f64) -> Loop {
    Loop::new(vec![
        Point2::new(x, y),
        Point2::new(x + size, y),
        Point2::new(x + size, y + size),
        Point2::new(x, y + size),
    ])
}

fn measure() -> LayerMeasure {
    LayerMeasure::new(0.0, 0.3, 5.0 / 3.0)
}

fn emit(config: &PrintConfig, layerpaths: &LayerPaths, title: &str) -> String {
    let mut gcoder = GCoder::new(config);
    let mut buf = Vec::new();
    gcoder
        .write_gcode_file(layerpaths, &measure(), &mut buf, title)
        .unwrap();
    String::from_utf8(buf).unwrap()
}

fn run_pipeline(config: &PrintConfig, skeleton: &Skeleton, grid: &Grid) -> LayerPaths {
    let mut pather = Pather::new(config);
    let mut layerpaths = LayerPaths::new();
    pather.generate_paths(
        skeleton,
        &measure(),
        grid,
        &mut layerpaths,
        -1,
        -1,
        &mut NullProgress,
    );
    layerpaths
}

#[test]
fn empty_pipeline_emits_only_the_frame() {
    let config = PrintConfig {
        do_anchor: false,
        do_print_progress: false,
        do_fan_command: false,
        ..PrintConfig::default()
    };

    let text = emit(&config, &LayerPaths::new(), "t");

    assert!(text.contains("(* t)"));
    assert!(text.contains("(* Generated by toolpath"));
    assert!(text.contains("(* 1 extruder)"));
    assert!(!text.contains("G1"));
    assert!(!text.contains("M73"));
    assert!(!text.contains("M127"));
    assert!(!text.contains("(footer"));
}

#[test]
fn unit_square_outline_first_layer() {
    let mut config = PrintConfig {
        do_anchor: false,
        do_outlines: true,
        do_insets: false,
        do_infills: false,
        scaling_factor: 1.0,
        ..PrintConfig::default()
    };
    config.extruders[0].volumetric = true;
    config
        .extrusion_profiles
        .get_mut("firstlayer")
        .unwrap()
        .feedrate = 900.0;

    // h = 0.3, w = 0.5 via the measure's width ratio.
    let mut layer = Layer::new(0.0, 0.3, 0.5, 0);
    let mut extruder_layer = toolpath::ExtruderLayer::new(0);
    extruder_layer.paths.push(LabeledOpenPath::new(
        OpenPath::from_points([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 0.0),
        ]),
        PathLabel::new(PathKind::Outline, PathOwner::Model, 0),
    ));
    layer.extruders.push(extruder_layer);
    let layerpaths = LayerPaths {
        layers: vec![layer],
    };

    let text = emit(&config, &layerpaths, "square");

    // First-layer profile feedrate appears on deposition moves.
    assert!(text.contains("F900.000"), "missing profile feedrate:\n{text}");

    // Each unit segment advances E by A(h, w) / feed area.
    let area = std::f64::consts::PI * 0.15 * 0.15 + 0.3 * 0.2;
    let feed_area = std::f64::consts::PI * (1.75f64 / 2.0).powi(2);
    let per_segment = area / feed_area;

    let e_values: Vec<f64> = text
        .lines()
        .filter(|l| l.starts_with("G1"))
        .filter_map(|l| {
            l.split_whitespace()
                .find(|tok| tok.starts_with('E'))
                .map(|tok| tok[1..].parse::<f64>().unwrap())
        })
        .collect();

    // retract, prime, four segments, final retract
    assert!(e_values.len() >= 6, "unexpected E sequence: {e_values:?}");
    let deposited = e_values[e_values.len() - 2];
    assert!(
        (deposited - 4.0 * per_segment).abs() < 2e-3,
        "expected E near {}, got {deposited}",
        4.0 * per_segment
    );
}

#[test]
fn raft_aligned_direction_lock_over_five_layers() {
    let mut config = PrintConfig {
        do_outlines: false,
        do_insets: false,
        do_anchor: false,
        do_raft: true,
        raft_layers: 3,
        raft_aligned: true,
        ..PrintConfig::default()
    };
    config.infill_density = 0.2;

    let grid = Grid::new(vec![2.5], vec![2.5]);
    let mut skeleton = Skeleton::new();
    for index in 0..5 {
        let mut regions = LayerRegions::new(index);
        regions.outline_loops = vec![square(0.0, 0.0, 5.0)];
        regions.infill = GridRanges {
            x_rays: vec![vec![ScalarRange::new(0.0, 5.0)]],
            y_rays: vec![vec![ScalarRange::new(0.0, 5.0)]],
        };
        skeleton.layers.push(regions);
    }

    let layerpaths = run_pipeline(&config, &skeleton, &grid);
    assert_eq!(layerpaths.len(), 5);

    let along_x: Vec<bool> = layerpaths
        .layers
        .iter()
        .map(|layer| {
            let infill: Vec<&LabeledOpenPath> = layer.extruders[0]
                .paths
                .iter()
                .filter(|p| p.label.kind == PathKind::Infill)
                .collect();
            assert_eq!(infill.len(), 1);
            let first = infill[0].path.first().unwrap();
            let last = infill[0].path.last().unwrap();
            (first.y - last.y).abs() < 1e-12
        })
        .collect();

    // Flip on every layer except raft-aligned layer 2, which holds layer
    // 1's direction.
    assert_eq!(along_x, vec![true, false, false, true, false]);
}

#[test]
fn optimizer_orders_outline_insets_infill() {
    let config = PrintConfig {
        do_anchor: false,
        do_outlines: true,
        do_graph_optimization: true,
        ..PrintConfig::default()
    };

    let grid = Grid::new(vec![2.5], vec![2.5]);
    let mut skeleton = Skeleton::new();
    let mut regions = LayerRegions::new(0);
    regions.outline_loops = vec![square(0.0, 0.0, 5.0)];
    regions.inset_loops = vec![vec![square(0.3, 0.3, 4.4)], vec![square(0.6, 0.6, 3.8)]];
    regions.infill = GridRanges {
        x_rays: vec![vec![ScalarRange::new(1.0, 4.0)]],
        y_rays: vec![vec![ScalarRange::new(1.0, 4.0)]],
    };
    skeleton.layers.push(regions);

    let layerpaths = run_pipeline(&config, &skeleton, &grid);
    let kinds: Vec<(PathKind, i32)> = layerpaths.layers[0].extruders[0]
        .paths
        .iter()
        .filter(|p| !p.label.is_connection())
        .map(|p| (p.label.kind, p.label.shell))
        .collect();

    assert_eq!(
        kinds,
        vec![
            (PathKind::Outline, 0),
            (PathKind::Inset, 10),
            (PathKind::Inset, 11),
            (PathKind::Infill, INFILL_LABEL_VALUE),
        ]
    );
}

#[test]
fn progress_percent_ticks_every_boundary_once() {
    let mut config = PrintConfig {
        do_anchor: false,
        do_outlines: true,
        do_print_progress: true,
        ..PrintConfig::default()
    };
    config.extruders[0].volumetric = true;

    // 100 two-point paths: 200 stored points.
    let mut layer = Layer::new(0.0, 0.3, 0.5, 0);
    let mut extruder_layer = toolpath::ExtruderLayer::new(0);
    for i in 0..100 {
        extruder_layer.paths.push(LabeledOpenPath::new(
            OpenPath::from_points([Point2::new(0.0, i as f64), Point2::new(5.0, i as f64)]),
            PathLabel::new(PathKind::Outline, PathOwner::Model, 0),
        ));
    }
    layer.extruders.push(extruder_layer);
    let layerpaths = LayerPaths {
        layers: vec![layer],
    };

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
    assert_eq!(percents, (1..=100).collect::<Vec<usize>>());
}

#[test]
fn header_file_included_verbatim() {
    let header_path: PathBuf =
        std::env::temp_dir().join(format!("toolpath-header-{}.gcode", std::process::id()));
    fs::write(&header_path, "; HELLO\n").unwrap();

    let config = PrintConfig {
        do_anchor: false,
        header: Some(header_path.clone()),
        ..PrintConfig::default()
    };

    let text = emit(&config, &LayerPaths::new(), "t");
    fs::remove_file(&header_path).unwrap();

    let expected = format!(
        "(header [{p}] begin)\n; HELLO\n(header [{p}] end)\n\n",
        p = header_path.display()
    );
    assert!(text.contains(&expected), "missing header block:\n{text}");

    // The generator line precedes the include.
    let generator_at = text.find("(* Generated by").unwrap();
    let header_at = text.find("(header [").unwrap();
    assert!(generator_at < header_at);
}

#[test]
fn missing_header_file_fails_with_path() {
    let config = PrintConfig {
        header: Some(PathBuf::from("/nonexistent/start.gcode")),
        ..PrintConfig::default()
    };

    let mut gcoder = GCoder::new(&config);
    let mut buf = Vec::new();
    let err = gcoder
        .write_gcode_file(&LayerPaths::new(), &measure(), &mut buf, "t")
        .unwrap_err();

    match err {
        Error::TemplateIo { kind, path, .. } => {
            assert_eq!(kind, "header");
            assert!(path.contains("/nonexistent/start.gcode"));
        }
        other => panic!("expected TemplateIo, got {other:?}"),
    }
}

#[test]
fn pipeline_z_strictly_increases_in_emitted_order() {
    let config = PrintConfig {
        do_anchor: false,
        do_outlines: true,
        ..PrintConfig::default()
    };

    let grid = Grid::new(vec![2.5], vec![2.5]);
    let mut skeleton = Skeleton::new();
    for index in 0..4 {
        let mut regions = LayerRegions::new(index);
        regions.outline_loops = vec![square(0.0, 0.0, 5.0)];
        skeleton.layers.push(regions);
    }

    let layerpaths = run_pipeline(&config, &skeleton, &grid);
    let text = emit(&config, &layerpaths, "t");

    let z_values: Vec<f64> = text
        .lines()
        .filter(|l| l.contains("(move Z)"))
        .map(|l| {
            l.split_whitespace()
                .find(|tok| tok.starts_with('Z'))
                .unwrap()[1..]
                .parse()
                .unwrap()
        })
        .collect();

    assert_eq!(z_values.len(), 4);
    for pair in z_values.windows(2) {
        assert!(pair[1] > pair[0]);
    }
}

#[test]
fn layer_with_no_enabled_categories_emits_comment_only() {
    let config = PrintConfig {
        do_anchor: false,
        do_outlines: false,
        do_insets: false,
        do_infills: false,
        do_support: false,
        ..PrintConfig::default()
    };

    let grid = Grid::new(vec![2.5], vec![2.5]);
    let mut skeleton = Skeleton::new();
    let mut regions = LayerRegions::new(0);
    regions.outline_loops = vec![square(0.0, 0.0, 5.0)];
    regions.inset_loops = vec![vec![square(0.3, 0.3, 4.4)]];
    skeleton.layers.push(regions);

    let layerpaths = run_pipeline(&config, &skeleton, &grid);
    let text = emit(&config, &layerpaths, "t");

    assert!(text.contains("(Slice 0, 1 Extruder)"));
    // Only the Z move; no planar deposition.
    let motion_lines: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with("G1") && !l.contains("(move Z)"))
        .collect();
    assert!(motion_lines.is_empty(), "unexpected motion: {motion_lines:?}");
}
