//! rack CLI - command-line host for a linear plugin chain.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rack")]
#[command(author, version, about = "Linear plugin chain host", long_about = None)]
struct Cli {
    /// Host config file (defaults to the user config location)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a WAV file through a chain
    Process(commands::process::ProcessArgs),

    /// Run live duplex processing with an interactive prompt
    Realtime(commands::realtime::RealtimeArgs),

    /// Print the connection set synthesized for a chain
    Graph(commands::graph::GraphArgs),

    /// List registered plugins and their parameters
    Plugins(commands::plugins::PluginsArgs),

    /// List audio devices
    Devices(commands::devices::DevicesArgs),

    /// Inspect or create the host config file
    Config(commands::config::ConfigArgs),
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Process(args) => commands::process::run(args, config),
        Commands::Realtime(args) => commands::realtime::run(args, config),
        Commands::Graph(args) => commands::graph::run(args, config),
        Commands::Plugins(args) => commands::plugins::run(args, config),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Config(args) => commands::config::run(args, config),
    }
}
