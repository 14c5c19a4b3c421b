use clap::{Parser, Subcommand};
use ecogate_core::Threshold;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ecogate", version, about = "Eco-aware task runner")]
struct Cli {
    /// Force computation regardless of eco damage
    #[arg(long)]
    force: bool,

    /// Custom eco-damage threshold (0-1)
    #[arg(long)]
    threshold: Option<Threshold>,

    /// Plot eco-damage history
    #[arg(long)]
    plot: bool,

    /// Wait until eco damage is low before running
    #[arg(long)]
    wait: bool,

    /// Seconds between checks while waiting
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Give up waiting after this many seconds
    #[arg(long, value_name = "SECS")]
    max_wait: Option<u64>,

    /// Decision log location
    #[arg(long, value_name = "PATH")]
    log_path: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Some(Commands::Config { action }) => commands::config::run(action),
        None => {
            let overrides = commands::Overrides {
                threshold: cli.threshold,
                interval_secs: cli.interval,
                max_wait_secs: cli.max_wait,
                log_path: cli.log_path,
                json: cli.json,
            };
            if cli.plot {
                commands::plot::run(&overrides)
            } else if cli.wait {
                commands::decide::wait(&overrides)
            } else {
                commands::decide::once(cli.force, &overrides)
            }
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
