//! Parley CLI, the main entry point.
//!
//! Commands:
//! - `talk`    Run the two-agent conversation until Ctrl+C (default)
//! - `config`  Show the effective configuration or its path
//! - `doctor`  Check configuration and backend reachability

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Two AI agents in an endless, streamed conversation",
    version,
    author,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    // `parley [HOST]` with no subcommand runs `talk`
    #[command(flatten)]
    talk: TalkArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Read configuration from this file instead of ~/.parley/config.toml
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Where the generation backend lives, from the command line.
#[derive(clap::Args, Default)]
pub struct TargetArgs {
    /// Backend host; the endpoint becomes https://<HOST>/api/generate
    host: Option<String>,

    /// Full generate endpoint URL (wins over HOST)
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(clap::Args, Default)]
pub struct TalkArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Override the model identifier
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the conversation until interrupted
    Talk(TalkArgs),

    /// Configuration management
    Config {
        /// Print the config file path instead of its contents
        #[arg(long)]
        path: bool,
    },

    /// Diagnose configuration and backend health
    Doctor {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let config_path = cli
        .config
        .unwrap_or_else(|| parley_config::AppConfig::config_dir().join("config.toml"));

    let command = cli.command.unwrap_or(Commands::Talk(cli.talk));
    let result = match command {
        Commands::Talk(args) => commands::talk::run(&config_path, args).await,
        Commands::Config { path } => commands::config_cmd::run(&config_path, path),
        Commands::Doctor { target } => commands::doctor::run(&config_path, target).await,
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so they never interleave with the conversation on stdout.
fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
