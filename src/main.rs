//! Gazemark CLI
//!
//! Landmark-driven eye and posture annotation for recorded video sessions.

use clap::{Parser, Subcommand};
use gazemark::{
    agreement_scores, config::SessionConfig, core::ReportBuilder, BlinkPolicy, PerFrameLabel,
    RecordedFrames, SessionOrchestrator, VERSION,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gazemark")]
#[command(version = VERSION)]
#[command(about = "Landmark-driven eye and posture annotation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate a recorded landmark sequence
    Annotate {
        /// Input JSON file with the recorded frame sequence
        #[arg(long, short)]
        input: PathBuf,

        /// Ground-truth label file for agreement scoring
        #[arg(long)]
        ground_truth: Option<PathBuf>,

        /// Blink detection policy override
        #[arg(long, value_enum)]
        policy: Option<BlinkPolicy>,

        /// Write the report here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Run the HTTP annotation server
    Serve {
        /// Port to listen on (0 for random)
        #[arg(long, default_value = "8700")]
        port: u16,
    },

    /// Show configuration
    Config,
}

/// Recorded landmark sequence document, the same shape the HTTP endpoint
/// accepts minus the inline ground truth.
#[derive(Deserialize)]
struct RecordedInput {
    #[serde(default)]
    source_name: Option<String>,
    fps: f64,
    frame_width: f64,
    frame_height: f64,
    frames: Vec<gazemark::FrameRecord>,
}

/// Ground-truth file shape: a frame-indexed label map under
/// `labels_per_frame`.
#[derive(Deserialize)]
struct GroundTruthFile {
    labels_per_frame: BTreeMap<u64, PerFrameLabel>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Annotate {
            input,
            ground_truth,
            policy,
            output,
        } => {
            cmd_annotate(&input, ground_truth.as_deref(), policy, output.as_deref());
        }
        Commands::Serve { port } => {
            cmd_serve(port);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn load_session_config(policy: Option<BlinkPolicy>) -> SessionConfig {
    let mut config = match SessionConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: could not load configuration: {e}");
            SessionConfig::default()
        }
    };
    if let Some(policy) = policy {
        config.eye.policy = policy;
    }
    config
}

fn cmd_annotate(
    input: &Path,
    ground_truth: Option<&Path>,
    policy: Option<BlinkPolicy>,
    output: Option<&Path>,
) {
    let config = load_session_config(policy);

    let content = match std::fs::read_to_string(input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {e}", input.display());
            std::process::exit(1);
        }
    };
    let document: RecordedInput = match serde_json::from_str(&content) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error parsing {}: {e}", input.display());
            std::process::exit(1);
        }
    };

    let ground_truth_labels = ground_truth.map(|path| {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                std::process::exit(1);
            }
        };
        match serde_json::from_str::<GroundTruthFile>(&content) {
            Ok(file) => file.labels_per_frame,
            Err(e) => {
                eprintln!("Error parsing {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    });

    let mut cursor = match RecordedFrames::from_records(
        &document.frames,
        document.frame_width,
        document.frame_height,
        document.fps,
    ) {
        Ok(cursor) => cursor,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let source_name = document
        .source_name
        .unwrap_or_else(|| input.display().to_string());

    let orchestrator = SessionOrchestrator::new(&config, document.fps);
    let outcome = match orchestrator.run(&mut cursor) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Session failed: {e}");
            std::process::exit(1);
        }
    };

    let agreement = match &ground_truth_labels {
        Some(labels) => match agreement_scores(labels, &outcome.labels) {
            Ok(agreement) => agreement,
            Err(e) => {
                eprintln!("Evaluation failed: {e}");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let report = ReportBuilder::new().build_json(&source_name, outcome, agreement);

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &report) {
                eprintln!("Error writing {}: {e}", path.display());
                std::process::exit(1);
            }
            println!("Report written to {}", path.display());
        }
        None => println!("{report}"),
    }
}

#[cfg(feature = "server")]
fn cmd_serve(port: u16) {
    use gazemark::server::{run, ServerConfig};

    let session_config = load_session_config(None);
    let server_config = ServerConfig::new(port, session_config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error creating runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        let (addr, shutdown_tx) = match run(server_config).await {
            Ok(handles) => handles,
            Err(e) => {
                eprintln!("Error starting server: {e}");
                std::process::exit(1);
            }
        };

        println!("Gazemark v{VERSION}");
        println!("Annotation server listening on http://{addr}");
        println!("Press Ctrl+C to stop");

        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Error waiting for shutdown signal: {e}");
        }
        let _ = shutdown_tx.send(());
    });
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_port: u16) {
    eprintln!("Error: this build does not include the annotation server.");
    eprintln!("Rebuild with `--features server` to enable `gazemark serve`.");
    std::process::exit(1);
}

fn cmd_config() {
    let config = load_session_config(None);

    println!("Gazemark v{VERSION}");
    println!();
    println!("Configuration file: {}", SessionConfig::config_path().display());
    println!();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing configuration: {e}");
            std::process::exit(1);
        }
    }
}
