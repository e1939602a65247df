//! EMVS Replay
//!
//! Replays a recorded event stream and pose stream through the mapper and
//! writes the fused world map as JSON.
//!
//! Usage:
//!   emvs --events events.jsonl --poses poses.jsonl [--config emvs.json] [--output map.json]

mod app;
mod errors;

use clap::Parser;
use std::path::PathBuf;

/// EMVS - event-based multi-view stereo mapping
#[derive(Parser, Debug)]
#[command(name = "emvs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON engine configuration (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-lines event stream
    #[arg(short, long)]
    events: PathBuf,

    /// JSON-lines pose stream
    #[arg(short, long)]
    poses: PathBuf,

    /// Where to write the world map
    #[arg(short, long, default_value = "map.json")]
    output: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let options = app::ReplayOptions {
        config: args.config,
        events: args.events,
        poses: args.poses,
        output: args.output,
    };

    if let Err(e) = app::run(&options) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
