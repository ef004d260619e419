//! posedit: command-line driver for the pose keypoint editor.
//!
//! Runs the same session as the browser app, with scripted edits instead
//! of pointer drags:
//!
//! - `inspect` prints what a pose JSON file contains and what would be
//!   drawn
//! - `svg` writes a skeleton preview of a pose JSON file
//! - `run` detects a pose in an image, applies `--edit` moves, renders the
//!   result and writes it into an output directory
//!
//! # Usage
//!
//! ```text
//! posedit run photo.jpg --server http://127.0.0.1:7860 \
//!     --edit body:9=210,340 --edit left_hand:8=200,330 --out layers/
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod edit;
mod http;
mod scene;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use posedit_core::{
    Dimensions, KeypointGraph, Placement, PoseDocument, Session, SessionConfig, SessionError,
    Side, SourceImage, Stage,
};
use posedit_export::{
    ExportError, SvgMetadata, from_openpose_json, to_openpose_json, to_skeleton_svg,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::edit::EditSpec;
use crate::http::{Backend, HttpError};
use crate::scene::{DirectoryScene, DirectorySceneError};

/// Correct detected human-pose keypoints and re-render them.
#[derive(Parser)]
#[command(name = "posedit", version)]
struct Cli {
    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a pose JSON file.
    Inspect {
        /// OpenPose-style JSON file.
        pose: PathBuf,
        #[command(flatten)]
        canvas: CanvasArgs,
    },

    /// Write an SVG skeleton preview of a pose JSON file.
    Svg {
        /// OpenPose-style JSON file.
        pose: PathBuf,
        #[command(flatten)]
        canvas: CanvasArgs,
        /// Output path.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Detect, edit, render and apply.
    Run(RunArgs),
}

/// Image size for files that carry no canvas size.
#[derive(clap::Args)]
struct CanvasArgs {
    /// Source image width in pixels.
    #[arg(long, requires = "height")]
    width: Option<u32>,
    /// Source image height in pixels.
    #[arg(long, requires = "width")]
    height: Option<u32>,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Source image (PNG, JPEG, BMP, WebP).
    image: PathBuf,

    /// Base URL of the pose backend.
    #[arg(long, default_value = "http://127.0.0.1:7860")]
    server: String,

    /// Request timeout in seconds; 0 waits forever.
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// Move a keypoint before rendering, as ID=X,Y in source pixels
    /// (e.g. `body:9=210,340`). Repeatable; applied in order.
    #[arg(long = "edit", value_name = "ID=X,Y")]
    edits: Vec<EditSpec>,

    /// Also write the edited pose as JSON.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Directory receiving the rendered layer and its sidecar.
    #[arg(long, default_value = "posedit-out")]
    out: PathBuf,

    /// Detection processor name.
    #[arg(long, default_value = SessionConfig::DEFAULT_PROCESSOR)]
    processor: String,

    /// Detection confidence threshold.
    #[arg(long, default_value_t = posedit_core::DetectorParams::DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Full session config as a JSON string.
    ///
    /// When provided, `--processor` and `--threshold` are ignored.
    #[arg(long)]
    config_json: Option<String>,
}

/// Errors from the `run` command.
#[derive(Debug, thiserror::Error)]
enum RunError {
    /// `--config-json` did not parse.
    #[error("Error parsing --config-json: {0}")]
    Config(#[from] serde_json::Error),

    /// A file could not be read or written.
    #[error("{path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The HTTP client could not be built.
    #[error(transparent)]
    Backend(#[from] HttpError),

    /// The output directory could not be prepared.
    #[error(transparent)]
    Scene(#[from] DirectorySceneError),

    /// The session rejected an input or a step failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The edited pose could not be exported.
    #[error("exporting pose: {0}")]
    Export(#[from] ExportError),

    /// Export was requested but the session holds no document.
    #[error("no pose to export in the {0} stage")]
    NoDocument(Stage),
}

/// Build a [`SessionConfig`] from the `run` arguments.
///
/// `--config-json` wins over the individual flags.
fn config_from_args(args: &RunArgs) -> Result<SessionConfig, RunError> {
    if let Some(ref json) = args.config_json {
        return Ok(serde_json::from_str(json)?);
    }
    let mut config = SessionConfig {
        processor: args.processor.clone(),
        ..SessionConfig::default()
    };
    config.detector.threshold = args.threshold;
    config.render.threshold = args.threshold;
    Ok(config)
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Inspect { pose, canvas } => inspect(&pose, &canvas),
        Command::Svg {
            pose,
            canvas,
            output,
        } => write_svg(&pose, &canvas, &output),
        Command::Run(args) => run(&args).map_err(|e| e.to_string()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// Read a pose file and decide the source size it lives in.
fn load_graph(path: &Path, canvas: &CanvasArgs) -> Result<KeypointGraph, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let document: PoseDocument =
        from_openpose_json(&text).map_err(|e| format!("{}: {e}", path.display()))?;
    let source = match (canvas.width, canvas.height) {
        (Some(w), Some(h)) => Dimensions::new(w, h),
        _ => document.canvas.ok_or_else(|| {
            format!(
                "{} has no canvas size; pass --width and --height",
                path.display()
            )
        })?,
    };
    if source.is_degenerate() {
        return Err(format!("invalid source size {source}"));
    }
    Ok(KeypointGraph::new(document, source))
}

fn inspect(path: &Path, canvas: &CanvasArgs) -> Result<(), String> {
    let graph = load_graph(path, canvas)?;
    let document = graph.document();
    println!("File:      {}", path.display());
    println!("Canvas:    {}", graph.source_dimensions());
    println!("People:    {}", document.people.len());
    println!("Keypoints: {}", graph.keypoint_count());
    println!("Visible:   {}", graph.visible_keypoints().len());
    println!("Edges:     {}", graph.visible_edges().len());
    for side in Side::ALL {
        println!(
            "{:<10} {}",
            format!("{side} hand:"),
            if graph.wrist_hand_link_eligible(side) {
                "linked to wrist"
            } else {
                "not linked"
            }
        );
    }
    Ok(())
}

fn write_svg(path: &Path, canvas: &CanvasArgs, output: &Path) -> Result<(), String> {
    let graph = load_graph(path, canvas)?;
    let title = path.file_stem().and_then(|s| s.to_str());
    let svg = to_skeleton_svg(
        &graph,
        &SvgMetadata {
            title,
            description: None,
        },
    );
    std::fs::write(output, &svg)
        .map_err(|e| format!("Error writing SVG to {}: {e}", output.display()))?;
    eprintln!("SVG written to {} ({} bytes)", output.display(), svg.len());
    Ok(())
}

fn run(args: &RunArgs) -> Result<(), RunError> {
    let config = config_from_args(args)?;
    let bytes = std::fs::read(&args.image).map_err(|source| RunError::Io {
        path: args.image.clone(),
        source,
    })?;
    let source = SourceImage::new(bytes, Placement::default())?;
    tracing::info!(image = %args.image.display(), size = %source.dimensions(), "source loaded");

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let backend = Backend::new(&args.server, timeout)?;
    let mut scene = DirectoryScene::open(&args.out)?;

    let mut session = Session::new(config, source)?;
    drive(&mut session, &backend, &mut scene, args)?;

    for path in scene.written() {
        println!("{}", path.display());
    }
    Ok(())
}

/// Take `session` from extraction to a placed layer.
fn drive(
    session: &mut Session,
    backend: &Backend,
    scene: &mut DirectoryScene,
    args: &RunArgs,
) -> Result<(), RunError> {
    let ticket = session.begin_extract()?;
    session.complete_extract(ticket.generation, backend.detect(&ticket.request))?;

    if let Some(surface) = session.surface_mut() {
        let skipped = edit::apply_edits(surface, &args.edits);
        if !skipped.is_empty() {
            tracing::warn!(count = skipped.len(), "some edits named hidden keypoints");
        }
    }

    if let Some(ref export) = args.export {
        let document = session
            .current_document()
            .ok_or_else(|| RunError::NoDocument(session.stage()))?;
        let json = to_openpose_json(document, Some(session.source().dimensions()))?;
        std::fs::write(export, json).map_err(|source| RunError::Io {
            path: export.clone(),
            source,
        })?;
        tracing::info!(path = %export.display(), "pose exported");
    }

    let ticket = session.request_apply()?;
    session.complete_render(ticket.generation, backend.render(&ticket.request))?;
    let completion = session.apply(scene)?;
    tracing::info!(node = %completion.node, "done");
    Ok(())
}
