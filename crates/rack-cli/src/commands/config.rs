//! Host config file command.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Subcommand};
use rack_config::{HostConfig, default_config_path};

use super::common::load_config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Print the effective config as TOML
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let path: PathBuf = config_path.map_or_else(default_config_path, Path::to_path_buf);

    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Path => {
            let state = if path.exists() { "" } else { " (not created)" };
            println!("{}{state}", path.display());
        }

        ConfigCommand::Show => {
            let config = load_config(config_path)?;
            if !path.exists() {
                println!("# {} not found, showing defaults", path.display());
            }
            print!("{}", config.to_toml()?);
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            HostConfig::default()
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote default config");
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
