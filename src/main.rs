use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use pinget::config::{get_config, load_config};
use pinget::{Config, Passthrough, PinDownloader, PinError};

#[derive(Parser)]
#[command(name = "pinget", version, about = "Download videos from Pinterest pins")]
struct Cli {
    /// Config file (default: ~/.config/pinget/config.yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Send requests without browser headers or delays
    #[arg(long, global = true)]
    no_shaping: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a link is a Pinterest link
    Check { url: String },
    /// Show pin metadata without downloading
    Info { url: String },
    /// Download the video of a pin
    Download {
        url: String,
        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Remove downloads older than this many hours before starting
        #[arg(long)]
        keep_for: Option<u64>,
    },
    /// Remove old downloads
    Sweep {
        #[arg(long)]
        hours: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pinget=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match read_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, config, cli.no_shaping).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error ({} stage): {}", e.stage(), e);
            ExitCode::FAILURE
        }
    }
}

fn read_config(path: Option<&std::path::Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => load_config(path),
        None => get_config(),
    }
}

async fn run(command: Command, mut config: Config, no_shaping: bool) -> Result<(), PinError> {
    if let Command::Download {
        output_dir: Some(dir),
        ..
    } = &command
    {
        config.output_dir = dir.to_string_lossy().to_string();
    }

    let mut downloader = PinDownloader::new(config);
    if no_shaping {
        downloader = downloader.with_shaper(Passthrough);
    }

    match command {
        // ============ LINK CHECK ============
        Command::Check { url } => {
            let accepted = PinDownloader::is_accepted_link(&url);
            println!("{}", if accepted { "accepted" } else { "rejected" });
            if !accepted {
                return Err(PinError::InvalidLink(url));
            }
        }

        // ============ INFO ============
        Command::Info { url } => {
            let info = downloader.get_video_info(&url).await?;
            print_json(&info);
        }

        // ============ DOWNLOAD ============
        Command::Download { url, keep_for, .. } => {
            let hours = keep_for.unwrap_or(downloader.config().max_file_age_hours);
            downloader.sweep_older_than(hours);

            let result = downloader.download_video(&url).await?;
            print_json(&result);
        }

        // ============ SWEEP ============
        Command::Sweep { hours } => {
            let hours = hours.unwrap_or(downloader.config().max_file_age_hours);
            let removed = downloader.sweep_older_than(hours);
            println!("{}", removed);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}
