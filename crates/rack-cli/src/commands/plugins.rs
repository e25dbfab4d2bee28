//! Plugin listing and information command.

#![allow(clippy::print_literal)] // Table headers use literal strings

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::{Args, Subcommand};

use super::common::{build_registry, load_config};

#[derive(Args)]
pub struct PluginsArgs {
    #[command(subcommand)]
    command: Option<PluginsCommand>,

    /// Extra plugin manifest directory to scan (repeatable)
    #[arg(long, global = true, value_name = "DIR")]
    scan: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum PluginsCommand {
    /// List every registered plugin
    List {
        /// Only this category (case-insensitive)
        #[arg(long)]
        category: Option<String>,
    },

    /// Show parameters and editor info for one plugin
    Info {
        /// Plugin id (e.g. "lowpass" or "manifest:warm")
        id: String,
    },
}

pub fn run(args: PluginsArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = build_registry(&config, &args.scan)?;

    match args.command.unwrap_or(PluginsCommand::List { category: None }) {
        PluginsCommand::List { category } => {
            println!("Available Plugins");
            println!("=================");
            println!();
            let descriptors: Vec<_> = match &category {
                Some(category) => registry.in_category(category).collect(),
                None => registry.descriptors().collect(),
            };
            for d in &descriptors {
                println!("  {:18} {:10} {:9} {}", d.uid, d.category, d.format, d.name);
            }
            println!();
            println!("{} plugin(s). Use 'rack plugins info <id>' for parameters.", descriptors.len());
        }

        PluginsCommand::Info { id } => {
            let descriptor = registry
                .get(&id)
                .ok_or_else(|| anyhow!("Unknown plugin: {id}"))?;
            let params = registry.params(&id).unwrap_or_default();

            println!("{}", descriptor.name);
            println!("{}", "=".repeat(descriptor.name.len()));
            println!();
            println!("{}", descriptor.description);
            println!();
            println!("  id:       {}", descriptor.uid);
            println!("  format:   {}", descriptor.format);
            println!("  category: {}", descriptor.category);
            if let Some(location) = &descriptor.location {
                println!("  file:     {}", location.display());
            }
            println!("  editor:   {}", if params.is_empty() { "no" } else { "yes" });
            println!();

            if params.is_empty() {
                println!("No parameters.");
            } else {
                let presets = registry.presets(&id);
                println!("Parameters:");
                println!();
                println!("  {:10}  {:14}  {:12}  {}", "Key", "Name", "Default", "Range");
                println!("  {:10}  {:14}  {:12}  {}", "---", "----", "-------", "-----");
                for p in &params {
                    let default = presets
                        .and_then(|presets| presets.get(p.key).copied())
                        .unwrap_or(p.default);
                    println!(
                        "  {:10}  {:14}  {:12}  {} .. {}",
                        p.key,
                        p.name,
                        p.format_value(default),
                        p.format_value(p.min),
                        p.format_value(p.max)
                    );
                }
                println!();
                let example: Vec<String> = params
                    .iter()
                    .take(2)
                    .map(|p| format!("{}={}", p.key, p.default))
                    .collect();
                println!("Example:");
                println!(
                    "  rack process in.wav out.wav --chain \"{}:{}\"",
                    descriptor.uid,
                    example.join(",")
                );
            }
        }
    }

    Ok(())
}
