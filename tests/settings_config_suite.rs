use clap::Parser;
use minkowski_grid::color::{CUSTOM_SCHEME_NAME, Rgb, named_scheme};
use minkowski_grid::config::{Config, RendererMode};
use minkowski_grid::debounce::RANDOMIZE_WINDOW;
use minkowski_grid::randomize::RandomDimensions;
use minkowski_grid::field::{GridSize, PatternId, ShapeExponent};
use minkowski_grid::grid::{GridRenderer, PatternParams};
use minkowski_grid::settings::{ExportedSettings, SettingsError};
use minkowski_grid::sink::{FrameSink, RawVideoSink};
use minkowski_grid::style::RenderStyle;
use std::time::Instant;

fn parse_args(args: &[&str]) -> Result<Config, clap::Error> {
    Config::try_parse_from(std::iter::once("minkowski-grid").chain(args.iter().copied()))
}

// ── Settings text ───────────────────────────────────────────────────────────

#[test]
fn settings_text_reads_back() {
    let settings = ExportedSettings {
        p: ShapeExponent::Infinite,
        grid_size: GridSize::new(70).unwrap(),
        pattern: PatternId::Voronoi,
        render_style: RenderStyle::PixelScanlines,
        color_scheme: named_scheme("Sunset").unwrap(),
        audio_enabled: true,
        cycle_colors: false,
    };
    let text = settings.to_text();
    assert!(text.starts_with("# minkowski_grid settings v1\n"));
    assert!(text.contains("render_style=pixel-scanlines\n"));
    assert!(text.contains("color_scheme.primary=#ff6b6b\n"));
    assert_eq!(ExportedSettings::parse(&text).unwrap(), settings);
}

#[test]
fn parse_keeps_defaults_and_ignores_unknown_keys() {
    let s = ExportedSettings::parse("# hand written\n\npattern = spiral\nzoom=3\n").unwrap();
    assert_eq!(s.pattern, PatternId::Spiral);
    assert_eq!(s.grid_size, GridSize::default());
    assert_eq!(s.color_scheme.name, "Matrix");
}

#[test]
fn parse_reports_the_offending_line() {
    let err = ExportedSettings::parse("pattern=wave\ngrid_size=45\n").unwrap_err();
    assert!(matches!(err, SettingsError::Parse { line: 2, .. }), "{err}");

    let err = ExportedSettings::parse("p=2\nthis line has no separator\n").unwrap_err();
    assert!(matches!(err, SettingsError::Parse { line: 2, .. }));

    let err = ExportedSettings::parse("audio_enabled=maybe").unwrap_err();
    assert!(matches!(err, SettingsError::Parse { line: 1, .. }));

    let err = ExportedSettings::parse("\n\ncolor_scheme.name=Plaid\n").unwrap_err();
    assert!(err.to_string().contains("line 3"), "{err}");
}

#[test]
fn explicit_colors_build_a_custom_scheme() {
    let s = ExportedSettings::parse("color_scheme.primary=#112233\ncolor_scheme.secondary=#445566\n").unwrap();
    assert_eq!(s.color_scheme.name, CUSTOM_SCHEME_NAME);
    assert_eq!(s.color_scheme.primary, Rgb::new(0x11, 0x22, 0x33));

    let err = ExportedSettings::parse("color_scheme.primary=#1122\n").unwrap_err();
    assert!(matches!(err, SettingsError::Parse { line: 1, .. }));
}

#[test]
fn save_then_load_through_the_filesystem() {
    let dir = std::env::temp_dir().join(format!("minkowski-grid-test-{}", std::process::id()));
    let path = dir.join("nested").join("settings.txt");
    let settings = ExportedSettings {
        pattern: PatternId::Kaleidoscope,
        cycle_colors: true,
        ..ExportedSettings::default()
    };
    settings.save(&path).unwrap();
    assert!(!path.with_extension("tmp").exists());
    assert_eq!(ExportedSettings::load(&path).unwrap(), settings);
    std::fs::remove_dir_all(&dir).unwrap();

    let err = ExportedSettings::load(&path).unwrap_err();
    assert!(matches!(&err, SettingsError::Io { path: p, .. } if p == &path));
    let source = std::error::Error::source(&err).expect("io error kept as source");
    assert_eq!(
        source.downcast_ref::<std::io::Error>().map(|e| e.kind()),
        Some(std::io::ErrorKind::NotFound)
    );
}

#[test]
fn renderer_exports_and_applies_settings() {
    let mut grid = GridRenderer::new(PatternParams::default(), Instant::now(), Some(2));
    grid.set_pattern(PatternId::Maze);
    grid.set_shape_exponent(3.5).unwrap();
    grid.set_named_scheme("fire").unwrap();
    let exported = grid.export_settings();
    assert_eq!(exported.pattern, PatternId::Maze);
    assert_eq!(exported.p, ShapeExponent::Finite(3.5));
    assert_eq!(exported.color_scheme.name, "Fire");

    let mut other = GridRenderer::new(PatternParams::default(), Instant::now(), Some(3));
    other.apply_settings(&exported);
    assert_eq!(other.export_settings(), exported);
}

#[test]
fn rejected_setters_leave_parameters_alone() {
    let mut grid = GridRenderer::new(PatternParams::default(), Instant::now(), None);
    let before = grid.params().clone();
    assert!(grid.set_shape_exponent(0.5).is_err());
    assert!(grid.set_grid_size(55).is_err());
    assert!(grid.set_pattern_by_name("plasma").is_err());
    assert!(grid.set_style_by_name("oil-paint").is_err());
    assert!(grid.set_named_scheme("Plaid").is_err());
    assert!(grid.set_custom_colors("#00ff00", "#zzzzzz").is_err());
    assert_eq!(grid.params(), &before);
}

// ── Command line ────────────────────────────────────────────────────────────

#[test]
fn defaults_match_the_initial_parameters() {
    let cfg = parse_args(&[]).unwrap();
    assert_eq!(cfg.initial_params(), PatternParams::default());
    assert_eq!(cfg.renderer, RendererMode::HalfBlock);
    assert!(cfg.sync_updates);
}

#[test]
fn flags_parse_into_parameters() {
    let cfg = parse_args(&[
        "--pattern",
        "mandelbrot",
        "--p",
        "inf",
        "--grid-size",
        "30",
        "--style",
        "pixel_dithering",
        "--scheme",
        "ocean",
        "--renderer",
        "hires",
        "--fullscreen",
        "--seed",
        "99",
    ])
    .unwrap();
    let params = cfg.initial_params();
    assert_eq!(params.pattern, PatternId::Mandelbrot);
    assert_eq!(params.p, ShapeExponent::Infinite);
    assert_eq!(params.grid_size.get(), 30);
    assert_eq!(params.style, RenderStyle::PixelDithering);
    assert_eq!(params.scheme.name, "Ocean");
    assert!(params.fullscreen);
    assert_eq!(cfg.renderer, RendererMode::Braille);
    assert_eq!(cfg.seed, Some(99));
}

#[test]
fn randomize_dimensions_default_to_everything() {
    let cfg = parse_args(&[]).unwrap();
    assert_eq!(cfg.random_dimensions(), RandomDimensions::default());
    assert!(!cfg.randomize_on_start);
    assert!(parse_args(&["--randomize-on-start"]).unwrap().randomize_on_start);
}

#[test]
fn randomize_dimensions_limit_what_randomize_touches() {
    let cfg = parse_args(&["--randomize-dims", "pattern,style", "--grid-size", "70", "--p", "inf"]).unwrap();
    let dims = cfg.random_dimensions();
    assert_eq!(
        dims,
        RandomDimensions {
            grid_size: false,
            pattern: true,
            shape_exponent: false,
            style: true,
            scheme: false,
        }
    );

    let t0 = Instant::now();
    let mut grid = GridRenderer::new(cfg.initial_params(), t0, Some(4));
    grid.set_random_dimensions(dims);
    let before = grid.params().clone();
    grid.request_randomize(t0);
    assert!(grid.tick(t0 + RANDOMIZE_WINDOW, None).randomized);
    assert_eq!(grid.params().grid_size, before.grid_size);
    assert_eq!(grid.params().p, ShapeExponent::Infinite);
    assert_eq!(grid.params().scheme, before.scheme);

    let cfg = parse_args(&["--randomize-dims", "grid-size", "--randomize-dims", "shape"]).unwrap();
    assert!(cfg.random_dimensions().grid_size && cfg.random_dimensions().shape_exponent);
    assert!(!cfg.random_dimensions().pattern);
    assert!(parse_args(&["--randomize-dims", "zoom"]).is_err());
}

#[test]
fn pattern_accepts_numeric_ids() {
    let cfg = parse_args(&["--pattern", "12"]).unwrap();
    assert_eq!(cfg.pattern, PatternId::Kaleidoscope);
}

#[test]
fn custom_colors_need_both_ends() {
    assert!(parse_args(&["--primary", "#ff0000"]).is_err());
    assert!(parse_args(&["--primary", "#ff0000", "--secondary", "blue"]).is_err());

    let cfg = parse_args(&["--primary", "#ff0000", "--secondary", "#0000ff"]).unwrap();
    let scheme = cfg.color_scheme();
    assert!(scheme.is_custom());
    assert_eq!(scheme.secondary, Rgb::new(0, 0, 255));
}

#[test]
fn invalid_values_are_rejected_at_parse_time() {
    let cases: [&[&str]; 7] = [
        &["--grid-size", "45"],
        &["--p", "0.5"],
        &["--p", "twelve"],
        &["--style", "oil-paint"],
        &["--scheme", "Plaid"],
        &["--pattern", "13"],
        &["--renderer", "sixel"],
    ];
    for args in cases {
        assert!(parse_args(args).is_err(), "{args:?} accepted");
    }
}

// ── Recording sink ──────────────────────────────────────────────────────────

#[test]
fn raw_sink_skips_frames_of_a_different_size() {
    let mut sink = RawVideoSink::new(Vec::new());
    sink.accept(2, 2, &[1u8; 16]).unwrap();
    sink.accept(3, 2, &[2u8; 24]).unwrap();
    sink.accept(2, 2, &[3u8; 16]).unwrap();
    assert!(sink.accept(2, 2, &[0u8; 15]).is_err());
    sink.finish().unwrap();

    assert_eq!(sink.frame_size(), Some((2, 2)));
    assert_eq!(sink.frames_written(), 2);
    assert_eq!(sink.frames_skipped(), 1);
    let bytes = sink.into_inner();
    assert_eq!(bytes.len(), 32);
    assert_eq!(bytes[16], 3);
}
