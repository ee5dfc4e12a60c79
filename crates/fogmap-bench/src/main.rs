//! fogmap-bench: CLI tool for reveal parameter experimentation and diagnostics.
//!
//! Feeds a GPS track (a JSON array of fixes or a synthetic walk) into a
//! [`FogPipeline`], drives a simulated camera through a sequence of pans
//! and zooms, and reports how many frames were rebuilt versus translated
//! together with per-stage diagnostics. Useful for:
//!
//! - Tuning the pan/zoom thresholds and overscan against a camera path
//! - Measuring per-stage durations on long tracks
//! - Comparing the stroke-mask and polygon compositors
//! - Producing PNG/SVG snapshots of the final frame
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin fogmap-bench -- [OPTIONS]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod track;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use fogmap_core::diagnostics::FrameDiagnostics;
use fogmap_core::{FogConfig, FogPipeline, Frame, GeoPoint, GeometryStyle, MapRegion};
use fogmap_render::{Compositor, CompositorKind, SvgMetadata, apply_fog, to_svg};
use image::{Rgba, RgbaImage};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::track::SyntheticWalk;

/// Fog colour for PNG output.
const FOG: Rgba<u8> = Rgba([28, 32, 48, 240]);

/// Reveal parameter experimentation and diagnostics for fogmap.
///
/// Runs the reveal pipeline over a track while a simulated camera pans
/// and zooms, and prints per-rebuild timing and count diagnostics.
#[derive(Parser)]
#[command(name = "fogmap-bench", version)]
struct Cli {
    /// JSON array of fixes (`latitude`, `longitude`, `timestamp`,
    /// optional `accuracy`). A synthetic walk is used when absent.
    #[arg(long)]
    track: Option<PathBuf>,

    /// Number of synthetic fixes.
    #[arg(long, default_value_t = 2_000)]
    fixes: usize,

    /// Synthetic walk origin latitude.
    #[arg(long, default_value_t = 47.37, allow_hyphen_values = true)]
    origin_lat: f64,

    /// Synthetic walk origin longitude.
    #[arg(long, default_value_t = 8.54, allow_hyphen_values = true)]
    origin_lon: f64,

    /// Synthetic step between fixes in metres.
    #[arg(long, default_value_t = 15.0)]
    step_meters: f64,

    /// Insert a synthetic teleport every N fixes (0 disables).
    #[arg(long, default_value_t = 500)]
    teleport_every: usize,

    /// Reveal radius in metres.
    #[arg(long, default_value_t = FogConfig::DEFAULT_REVEAL_RADIUS_METERS)]
    radius: f64,

    /// Teleport threshold in metres.
    #[arg(long, default_value_t = FogConfig::DEFAULT_MAX_SEGMENT_METERS)]
    max_segment: f64,

    /// Maximum time gap between connected fixes in milliseconds.
    #[arg(long)]
    max_time_gap_ms: Option<i64>,

    /// Reject fixes with a worse reported accuracy (metres).
    #[arg(long)]
    max_fix_accuracy: Option<f64>,

    /// Culling margin as a fraction of the viewport span.
    #[arg(long, default_value_t = FogConfig::DEFAULT_OVERSCAN)]
    overscan: f64,

    /// Minimum on-screen gap between kept fixes in pixels.
    #[arg(long, default_value_t = FogConfig::DEFAULT_MIN_PIXEL_GAP)]
    min_pixel_gap: f64,

    /// Per-frame point cap.
    #[arg(long, default_value_t = FogConfig::DEFAULT_MAX_POINTS_PER_FRAME)]
    max_points: usize,

    /// Simplification tolerance as a fraction of the on-screen radius.
    #[arg(long, default_value_t = FogConfig::DEFAULT_SIMPLIFY_FRACTION)]
    simplify_fraction: f64,

    /// Relative zoom change that forces a rebuild.
    #[arg(long, default_value_t = FogConfig::DEFAULT_ZOOM_THRESHOLD)]
    zoom_threshold: f64,

    /// Pan distance, as a fraction of the overscan margin, that forces a
    /// rebuild.
    #[arg(long, default_value_t = FogConfig::DEFAULT_PAN_FRACTION)]
    pan_fraction: f64,

    /// Geometry style emitted by the pipeline.
    #[arg(long, value_enum, default_value_t = Style::Strokes)]
    geometry: Style,

    /// Sides per disc when polygonising.
    #[arg(long, default_value_t = FogConfig::DEFAULT_DISC_SEGMENTS)]
    disc_segments: usize,

    /// Base config as a JSON file. Flags given explicitly override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 800, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 600, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    height: u32,

    /// Initial viewport width on the ground in metres.
    #[arg(long, default_value_t = 3_000.0)]
    span_meters: f64,

    /// Number of simulated camera frames.
    #[arg(long, default_value_t = 240)]
    frames: usize,

    /// Pan per frame in pixels (eastward).
    #[arg(long, default_value_t = 6.0, allow_hyphen_values = true)]
    pan_step: f64,

    /// Zoom every N frames (0 disables).
    #[arg(long, default_value_t = 60)]
    zoom_every: usize,

    /// Span multiplier applied on each zoom.
    #[arg(long, default_value_t = 0.8)]
    zoom_factor: f64,

    /// Hold back the last N fixes and record one per frame.
    #[arg(long, default_value_t = 0)]
    live_fixes: usize,

    /// Compositor used for PNG output.
    #[arg(long, value_enum, default_value_t = CompositorChoice::StrokeMask)]
    compositor: CompositorChoice,

    /// Write the final frame, fog over a grid basemap, as PNG.
    #[arg(long)]
    png: Option<PathBuf>,

    /// Write the final geometry as SVG.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

/// Geometry style selection.
#[derive(Clone, Copy, ValueEnum)]
enum Style {
    /// Discs plus round-capped polylines.
    Strokes,
    /// Convex rings.
    Polygon,
}

/// Compositor selection.
#[derive(Clone, Copy, ValueEnum)]
enum CompositorChoice {
    /// Anti-aliased discs and strokes drawn into the mask.
    StrokeMask,
    /// World rectangle minus the union of reveal rings.
    Polygon,
}

impl From<CompositorChoice> for CompositorKind {
    fn from(choice: CompositorChoice) -> Self {
        match choice {
            CompositorChoice::StrokeMask => Self::StrokeMask,
            CompositorChoice::Polygon => Self::Polygon,
        }
    }
}

/// Build a [`FogConfig`] from CLI arguments.
///
/// Starts from `--config` when given (otherwise the defaults) and applies
/// every flag that was passed explicitly on the command line.
fn config_from_cli(cli: &Cli, matches: &ArgMatches) -> Result<FogConfig, String> {
    let mut config = match cli.config {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("Error parsing {}: {e}", path.display()))?
        }
        None => FogConfig::default(),
    };
    let explicit = |id: &str| {
        cli.config.is_none() || matches.value_source(id) == Some(ValueSource::CommandLine)
    };

    if explicit("radius") {
        config.reveal_radius_meters = cli.radius;
    }
    if explicit("max_segment") {
        config.max_segment_meters = cli.max_segment;
    }
    if cli.max_time_gap_ms.is_some() {
        config.max_time_gap_ms = cli.max_time_gap_ms;
    }
    if cli.max_fix_accuracy.is_some() {
        config.max_fix_accuracy_meters = cli.max_fix_accuracy;
    }
    if explicit("overscan") {
        config.overscan = cli.overscan;
    }
    if explicit("min_pixel_gap") {
        config.min_pixel_gap = cli.min_pixel_gap;
    }
    if explicit("max_points") {
        config.max_points_per_frame = cli.max_points;
    }
    if explicit("simplify_fraction") {
        config.simplify_fraction = cli.simplify_fraction;
    }
    if explicit("zoom_threshold") {
        config.zoom_threshold = cli.zoom_threshold;
    }
    if explicit("pan_fraction") {
        config.pan_fraction = cli.pan_fraction;
    }
    if explicit("geometry") {
        config.geometry = match cli.geometry {
            Style::Strokes => GeometryStyle::Strokes,
            Style::Polygon => GeometryStyle::Polygon,
        };
    }
    if explicit("disc_segments") {
        config.disc_segments = cli.disc_segments;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Frame outcome counts over a simulation.
#[derive(Debug, Default)]
struct Tally {
    rebuilt: usize,
    translated: usize,
    skipped: usize,
    rejected_fixes: usize,
}

/// Step the camera: a steady pan east with a zoom every `zoom_every`
/// frames.
fn advance_camera(region: &mut MapRegion, cli: &Cli, frame: usize) {
    if cli.zoom_every > 0 && frame % cli.zoom_every == 0 {
        region.latitude_delta *= cli.zoom_factor;
        region.longitude_delta *= cli.zoom_factor;
    }
    region.center_longitude += cli.pan_step / region.pixel_width * region.longitude_delta;
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    let config = match config_from_cli(&cli, &matches) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let points = match cli.track {
        Some(ref path) => match track::load(path) {
            Ok(points) => points,
            Err(msg) => {
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
        },
        None => SyntheticWalk {
            origin_latitude: cli.origin_lat,
            origin_longitude: cli.origin_lon,
            fixes: cli.fixes,
            step_meters: cli.step_meters,
            teleport_every: cli.teleport_every,
            teleport_meters: config.max_segment_meters * 4.0,
        }
        .generate(),
    };
    if points.is_empty() {
        eprintln!("Track is empty");
        return ExitCode::FAILURE;
    }

    eprintln!("Track: {} fixes", points.len());
    eprintln!("Config: {config:#?}");
    eprintln!("Frames: {}", cli.frames);
    eprintln!();

    let (tally, diagnostics, last) = match simulate(&cli, config.clone(), &points) {
        Ok(result) => result,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else if let Some(d) = diagnostics.last() {
        println!("{}", d.report());
    }
    print_summary(&tally, &diagnostics);

    if let Err(msg) = write_outputs(&cli, &config, &last) {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Final pipeline state needed for output.
struct LastFrame {
    pipeline: FogPipeline,
    offset: (f64, f64),
}

/// Run the camera simulation.
fn simulate(
    cli: &Cli,
    config: FogConfig,
    points: &[GeoPoint],
) -> Result<(Tally, Vec<FrameDiagnostics>, LastFrame), String> {
    let mut pipeline = FogPipeline::new(config).map_err(|e| e.to_string())?;
    let held_back = cli.live_fixes.min(points.len());
    let (history, live) = points.split_at(points.len() - held_back);

    let mut tally = Tally {
        rejected_fixes: pipeline.replace_path(history.iter().copied()),
        ..Tally::default()
    };
    let mut camera = track::initial_region(points, cli.span_meters, cli.width, cli.height);

    let mut diagnostics = Vec::new();
    let mut offset = (0.0, 0.0);
    let mut live = live.iter();
    for frame in 0..cli.frames.max(1) {
        if frame > 0 {
            advance_camera(&mut camera, cli, frame);
        }
        if let Some(fix) = live.next()
            && let Err(e) = pipeline.record_fix(*fix)
        {
            tally.rejected_fixes += 1;
            tracing::debug!(frame, error = %e, "fix rejected");
        }
        let outcome = pipeline.update_region(camera);
        match outcome {
            Frame::Rebuilt { generation, reason } => {
                tally.rebuilt += 1;
                offset = (0.0, 0.0);
                info!(frame, generation, %reason, "rebuilt");
                if let Some(d) = pipeline.last_diagnostics() {
                    diagnostics.push(d.clone());
                }
                // The simulated compositor presents immediately.
                pipeline.release_retired();
            }
            Frame::Translated { dx, dy } => {
                tally.translated += 1;
                offset = (dx, dy);
            }
            Frame::Skipped => tally.skipped += 1,
        }
    }

    Ok((tally, diagnostics, LastFrame { pipeline, offset }))
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&FrameDiagnostics) -> std::time::Duration;

/// Print frame counts and per-stage means across rebuilds.
#[allow(clippy::cast_precision_loss)]
fn print_summary(tally: &Tally, all_diagnostics: &[FrameDiagnostics]) {
    println!();
    println!("Simulation summary\n{}", "=".repeat(60));
    println!(
        "Frames: {} rebuilt, {} translated, {} skipped",
        tally.rebuilt, tally.translated, tally.skipped
    );
    if tally.rejected_fixes > 0 {
        println!("Rejected fixes: {}", tally.rejected_fixes);
    }

    if all_diagnostics.is_empty() {
        println!("Warning: no rebuilds to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();
    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    println!("Rebuild duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Connection", |d| d.connection.duration),
        ("Cull", |d| d.cull.duration),
        ("Density", |d| d.density.duration),
        ("Cap", |d| d.cap.duration),
        ("Projection", |d| d.projection.duration),
        ("Simplification", |d| d.simplification.duration),
        ("Assembly", |d| d.assembly.duration),
    ];
    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

/// A light grid standing in for map tiles.
fn grid_basemap(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if x % 64 == 0 || y % 64 == 0 {
            Rgba([190, 180, 160, 255])
        } else {
            Rgba([238, 232, 215, 255])
        }
    })
}

fn write_outputs(cli: &Cli, config: &FogConfig, last: &LastFrame) -> Result<(), String> {
    let Some(current) = last.pipeline.current() else {
        if cli.png.is_some() || cli.svg.is_some() {
            eprintln!("No geometry was built; skipping output");
        }
        return Ok(());
    };
    let geometry = current.value();

    if let Some(ref png_path) = cli.png {
        let compositor = CompositorKind::from(cli.compositor);
        let mask = compositor
            .reveal_mask(geometry, cli.width, cli.height)
            .map_err(|e| format!("Error rendering mask: {e}"))?;
        let frame = apply_fog(&grid_basemap(cli.width, cli.height), &mask, FOG, last.offset);
        frame
            .save(png_path)
            .map_err(|e| format!("Error writing PNG to {}: {e}", png_path.display()))?;
        eprintln!("PNG written to {}", png_path.display());
    }

    if let Some(ref svg_path) = cli.svg {
        let config_json = serde_json::to_string(config)
            .map_err(|e| format!("Error serializing config: {e}"))?;
        let desc = format!(
            "radius {} m, generation {}, offset ({:.1}, {:.1})",
            config.reveal_radius_meters,
            current.id(),
            last.offset.0,
            last.offset.1,
        );
        let metadata = SvgMetadata {
            title: Some("fogmap-bench"),
            description: Some(&desc),
            config_json: Some(&config_json),
        };
        let svg = to_svg(geometry, &metadata);
        std::fs::write(svg_path, &svg)
            .map_err(|e| format!("Error writing SVG to {}: {e}", svg_path.display()))?;
        eprintln!("SVG written to {} ({} bytes)", svg_path.display(), svg.len());
    }

    Ok(())
}
