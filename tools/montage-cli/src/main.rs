//! Montage CLI: validate, plan, and render timeline projects.
//!
//! Usage:
//!   montage render <STATE> -o <OUT>   Render a project to video
//!   montage plan <STATE>              Print the composition plan as JSON
//!   montage validate <STATE>          Validate a project and its references
//!   montage check                     Check that ffmpeg/ffprobe are usable
//!   montage config                    Show or save the configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use montage_project_model::OutputSettings;

mod commands;

#[derive(Parser)]
#[command(
    name = "montage",
    about = "Timeline composition and rendering on top of ffmpeg",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/montage/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Project state plus the media manifest that resolves its ids.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Path to the project state JSON
    pub state: PathBuf,

    /// Media manifest mapping source and asset ids to stored files
    #[arg(short, long)]
    pub media: Option<PathBuf>,

    /// Root that stored references resolve against (defaults to the manifest directory)
    #[arg(long)]
    pub media_root: Option<PathBuf>,
}

/// Output settings overriding the project's own.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output width
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height
    #[arg(long)]
    pub height: Option<u32>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<f64>,

    /// Video bitrate, e.g. 8M
    #[arg(long)]
    pub bitrate: Option<String>,

    /// Platform preset: tiktok|instagram|reels|facebook|youtube_shorts|youtube
    #[arg(long)]
    pub preset: Option<String>,
}

impl OutputArgs {
    pub fn settings(&self) -> OutputSettings {
        OutputSettings {
            width: self.width,
            height: self.height,
            fps: self.fps,
            bitrate: self.bitrate.clone(),
            preset: self.preset.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render a project to a video file
    Render {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        settings: OutputArgs,

        /// Write a parity trace next to the output
        #[arg(long)]
        trace: bool,

        /// Parent directory for the temporary working directory
        #[arg(long)]
        temp_root: Option<PathBuf>,
    },

    /// Print the composition plan without rendering
    Plan {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        settings: OutputArgs,
    },

    /// Validate a project and its media references
    Validate {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Check that the media backend is usable
    Check,

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => montage_common::AppConfig::load_from(path)?,
        None => montage_common::AppConfig::load(),
    };

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    montage_common::logging::init_logging(&config.logging);
    tracing::debug!(?config, "Loaded configuration");

    match cli.command {
        Commands::Render {
            project,
            output,
            settings,
            trace,
            temp_root,
        } => commands::render::run(project, output, settings, trace, temp_root, config).await,
        Commands::Plan { project, settings } => commands::plan::run(project, settings, config),
        Commands::Validate { project } => commands::validate::run(project),
        Commands::Check => commands::check::run(&config),
        Commands::Config { save } => commands::config::run(&config, save),
    }
}
