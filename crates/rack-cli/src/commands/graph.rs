//! Connection-set inspection command.

use std::path::Path;

use clap::Args;
use rack_core::{ChainController, ChainSnapshot, Connection, NodeId};
use serde::Serialize;

use super::common::{ChainArgs, build_chain, build_registry, describe_connections, load_config, node_labels, print_chain};

#[derive(Args)]
pub struct GraphArgs {
    #[command(flatten)]
    chain: ChainArgs,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct NodeReport {
    id: NodeId,
    label: String,
}

/// Everything `rack graph --json` prints.
#[derive(Serialize)]
struct GraphReport {
    chain: ChainSnapshot,
    nodes: Vec<NodeReport>,
    connections: Vec<Connection>,
}

impl GraphReport {
    fn new(chain: &ChainController) -> Self {
        Self {
            chain: chain.snapshot(),
            nodes: node_labels(chain)
                .into_iter()
                .map(|(id, label)| NodeReport { id, label })
                .collect(),
            connections: chain.connections(),
        }
    }
}

pub fn run(args: GraphArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = build_registry(&config, &args.chain.scan)?;
    let chain = build_chain(
        &registry,
        &args.chain,
        &config,
        config.audio.sample_rate as f32,
        config.audio.block_size,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&GraphReport::new(&chain))?);
        return Ok(());
    }

    print_chain(&chain);
    println!();
    let lines = describe_connections(&chain);
    println!("Connections ({}):", lines.len());
    for line in lines {
        println!("  {line}");
    }
    Ok(())
}
