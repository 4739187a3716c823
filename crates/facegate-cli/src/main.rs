use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use facegate_client::ClientConfig;
use facegate_core::CapturePolicy;
use tracing_subscriber::EnvFilter;

mod login;
mod register;
mod terminal;
mod track;

#[derive(Parser)]
#[command(name = "facegate", version, about = "Liveness-gated face login client")]
struct Cli {
    /// TOML config file (default: $FACEGATE_CONFIG, if set)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL, e.g. http://127.0.0.1:5000
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct CameraArgs {
    /// Directory of stills played back as the camera feed
    #[arg(long)]
    camera: PathBuf,

    /// Playback rate of the camera feed
    #[arg(long)]
    fps: Option<f32>,

    /// Write the latest frame with its mesh overlay to this PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Stream frames to the landmark service and draw the mesh
    Track {
        #[command(flatten)]
        camera: CameraArgs,

        /// Stop after this many seconds (default: run until Ctrl-C)
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Log in; each line on stdin presses the login button
    Login {
        #[command(flatten)]
        camera: CameraArgs,

        #[arg(long)]
        username: String,

        /// blink-gated or render-only
        #[arg(long, default_value = "blink-gated")]
        policy: CapturePolicy,

        /// Ask the server for a liveness challenge (blink or head turn)
        #[arg(long)]
        challenge: bool,
    },
    /// Enroll a face; each line on stdin captures one of five samples
    Register {
        #[command(flatten)]
        camera: CameraArgs,

        #[arg(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    tracing::debug!(server = %config.server_url, "configuration loaded");

    match cli.command {
        Command::Track { camera, seconds } => track::run(&config, &camera, seconds).await,
        Command::Login {
            camera,
            username,
            policy,
            challenge,
        } => login::run(&config, &camera, &username, policy, challenge).await,
        Command::Register { camera, username } => register::run(&config, &camera, &username).await,
    }
}
