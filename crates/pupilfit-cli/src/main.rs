//! pupilfit CLI: track a pupil (and optional reference marker) through a frame sequence.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use pupilfit::{
    Aoi, DetectionParameters, DetectionVariables, FrameDetection, Outcome, Tracker,
    TrackerOutput,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "pupilfit")]
#[command(about = "Detect and track elliptical features (pupil, reference marker) in frame sequences")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track through an ordered list of frames.
    Track(CliTrackArgs),

    /// Print default detection parameters as JSON.
    DefaultParams {
        /// Print the reference-marker defaults instead.
        #[arg(long)]
        marker: bool,
    },
}

#[derive(Debug, Clone, Args)]
struct CliTrackArgs {
    /// Frame images, in processing order.
    #[arg(long, num_args = 1.., required = true)]
    frames: Vec<PathBuf>,

    /// Primary-feature area of interest as x,y,width,height.
    #[arg(long)]
    aoi: Aoi,

    /// Reference-marker area of interest as x,y,width,height.
    #[arg(long)]
    marker_aoi: Option<Aoi>,

    /// Primary-feature parameters (JSON); defaults when omitted.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Reference-marker parameters (JSON); marker defaults when omitted.
    #[arg(long)]
    marker_params: Option<PathBuf>,

    /// Path to write per-frame results (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Path to write per-frame diagnostics including edge segments (JSON).
    #[arg(long)]
    debug_json: Option<PathBuf>,
}

/// Per-object result of one frame.
#[derive(serde::Serialize)]
struct ObjectRecord<'a> {
    outcome: &'a Outcome,
    state: &'a DetectionVariables,
}

impl<'a> From<&'a FrameDetection> for ObjectRecord<'a> {
    fn from(d: &'a FrameDetection) -> Self {
        Self {
            outcome: &d.outcome,
            state: &d.state,
        }
    }
}

#[derive(serde::Serialize)]
struct FrameRecord<'a> {
    index: usize,
    path: String,
    primary: ObjectRecord<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<ObjectRecord<'a>>,
}

#[derive(serde::Serialize)]
struct TrackReport<'a> {
    aoi: Aoi,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker_aoi: Option<Aoi>,
    frames: Vec<FrameRecord<'a>>,
    detected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker_detected: Option<usize>,
}

#[derive(serde::Serialize)]
struct DebugFrame<'a> {
    index: usize,
    path: String,
    #[serde(flatten)]
    output: &'a TrackerOutput,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track(args) => run_track(&args),
        Commands::DefaultParams { marker } => run_default_params(marker),
    }
}

// ── default-params ─────────────────────────────────────────────────────

fn run_default_params(marker: bool) -> CliResult<()> {
    let params = if marker {
        DetectionParameters::marker()
    } else {
        DetectionParameters::default()
    };
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

// ── track ──────────────────────────────────────────────────────────────

fn load_params(
    path: Option<&Path>,
    fallback: DetectionParameters,
) -> CliResult<DetectionParameters> {
    match path {
        Some(p) => {
            tracing::info!("Loading parameters: {}", p.display());
            DetectionParameters::from_json_file(p).map_err(|e| -> CliError {
                format!("Failed to load parameters {}: {}", p.display(), e).into()
            })
        }
        None => Ok(fallback),
    }
}

fn build_tracker(args: &CliTrackArgs) -> CliResult<Tracker> {
    let params = load_params(args.params.as_deref(), DetectionParameters::default())?;
    let mut tracker = Tracker::with_params(params, args.aoi)?;
    if let Some(marker_aoi) = args.marker_aoi {
        let marker_params =
            load_params(args.marker_params.as_deref(), DetectionParameters::marker())?;
        tracker = tracker.with_marker(marker_params, marker_aoi)?;
    } else if args.marker_params.is_some() {
        tracing::warn!("--marker-params ignored without --marker-aoi");
    }
    Ok(tracker)
}

fn run_track(args: &CliTrackArgs) -> CliResult<()> {
    let mut tracker = build_tracker(args)?;
    tracing::info!(
        "Tracking {} frames (aoi {}{})",
        args.frames.len(),
        args.aoi,
        args.marker_aoi
            .map(|a| format!(", marker aoi {}", a))
            .unwrap_or_default()
    );

    let mut outputs = Vec::with_capacity(args.frames.len());
    for (index, path) in args.frames.iter().enumerate() {
        let img = image::open(path).map_err(|e| -> CliError {
            format!("Failed to open frame {}: {}", path.display(), e).into()
        })?;
        let gray = img.to_luma8();
        let out = tracker.process(&gray).map_err(|e| -> CliError {
            format!("Frame {} ({}): {}", index, path.display(), e).into()
        })?;
        tracing::debug!(
            "Frame {}: primary {}",
            index,
            describe(&out.primary.outcome)
        );
        outputs.push(out);
    }

    let path_of = |i: usize| args.frames[i].display().to_string();
    let frames: Vec<FrameRecord<'_>> = outputs
        .iter()
        .enumerate()
        .map(|(index, out)| FrameRecord {
            index,
            path: path_of(index),
            primary: (&out.primary).into(),
            marker: out.marker.as_ref().map(Into::into),
        })
        .collect();

    let detected = outputs
        .iter()
        .filter(|o| o.primary.outcome.is_detected())
        .count();
    let marker_detected = args.marker_aoi.map(|_| {
        outputs
            .iter()
            .filter(|o| o.marker.as_ref().is_some_and(|m| m.outcome.is_detected()))
            .count()
    });
    tracing::info!("Primary detected in {}/{} frames", detected, outputs.len());
    if let Some(n) = marker_detected {
        tracing::info!("Marker detected in {}/{} frames", n, outputs.len());
    }

    let report = TrackReport {
        aoi: args.aoi,
        marker_aoi: args.marker_aoi,
        frames,
        detected,
        marker_detected,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());

    if let Some(debug_path) = &args.debug_json {
        let dump: Vec<DebugFrame<'_>> = outputs
            .iter()
            .enumerate()
            .map(|(index, output)| DebugFrame {
                index,
                path: path_of(index),
                output,
            })
            .collect();
        let debug_json = serde_json::to_string_pretty(&dump)?;
        std::fs::write(debug_path, &debug_json)?;
        tracing::info!("Debug dump written to {}", debug_path.display());
    }

    Ok(())
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Detected(c) => format!(
            "center=({:.2}, {:.2}) circumference={:.1} aspect_ratio={:.3} fit_error={:.3}",
            c.x_pos, c.y_pos, c.circumference, c.aspect_ratio, c.fit_error
        ),
        Outcome::NotDetected { reason } => format!("not detected ({})", reason),
    }
}
