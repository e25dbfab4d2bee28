//! Shared CLI helpers: config loading, chain specs, chain construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::Args;
use rack_config::HostConfig;
use rack_core::{ChainController, Connection, InsertPosition, NodeId, Port, RoutingMode};
use rack_registry::PluginRegistry;

/// Chain options shared by `process`, `realtime` and `graph`.
#[derive(Args, Debug, Default, Clone)]
pub struct ChainArgs {
    /// Chain specification (e.g., "gain:gain_db=-3|lowpass:cutoff=800")
    #[arg(short, long, value_name = "SPEC")]
    pub chain: Option<String>,

    /// Bypass the entry at this index (repeatable)
    #[arg(long, value_name = "INDEX")]
    pub bypass: Vec<usize>,

    /// Feed input channel 0 to both channels of the chain
    #[arg(long)]
    pub mono: bool,

    /// Master gain in dB
    #[arg(long, value_name = "DB", allow_hyphen_values = true)]
    pub gain_db: Option<f32>,

    /// Extra plugin manifest directory to scan (repeatable)
    #[arg(long, value_name = "DIR")]
    pub scan: Vec<PathBuf>,
}

impl ChainArgs {
    /// `--mono` wins over the config file.
    pub fn routing_mode(&self, config: &HostConfig) -> RoutingMode {
        RoutingMode::from_mono(self.mono || config.routing.mono)
    }

    /// `--gain-db` wins over the config file.
    pub fn gain_db(&self, config: &HostConfig) -> f32 {
        self.gain_db.unwrap_or(config.master.gain_db)
    }
}

/// One plugin of a chain spec: registry uid plus parameter overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSpec {
    /// Registry uid (`gain`, `manifest:warm`, ...).
    pub uid: String,
    /// Parameter values by key, in spec order.
    pub params: Vec<(String, f32)>,
}

/// Parse `"uid:key=value,key=value|uid|..."`.
///
/// The parameter list follows the last `:`. A uid may itself contain `:`
/// (`manifest:warm:cutoff=900`) as long as the part after its last `:` has
/// no `=`.
pub fn parse_chain(spec: &str) -> anyhow::Result<Vec<PluginSpec>> {
    spec.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_plugin_spec)
        .collect()
}

/// Parse one `uid[:key=value,...]` item.
pub fn parse_plugin_spec(spec: &str) -> anyhow::Result<PluginSpec> {
    let (uid, params) = match spec.rsplit_once(':') {
        Some((uid, params)) if params.contains('=') => (uid, parse_params(params)?),
        _ => (spec, Vec::new()),
    };
    let uid = uid.trim();
    if uid.is_empty() {
        bail!("empty plugin id in '{spec}'");
    }
    Ok(PluginSpec {
        uid: uid.to_string(),
        params,
    })
}

fn parse_params(params: &str) -> anyhow::Result<Vec<(String, f32)>> {
    params
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|param| {
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| anyhow!("invalid parameter '{param}' (expected key=value)"))?;
            let value: f32 = value
                .trim()
                .parse()
                .with_context(|| format!("invalid value for parameter '{}'", key.trim()))?;
            Ok((key.trim().to_string(), value))
        })
        .collect()
}

/// Load the config from `path`, or from the default location.
///
/// An explicit path must exist; the default location may be missing.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<HostConfig> {
    match path {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => HostConfig::load_default().context("failed to load default config"),
    }
}

/// Registry with built-ins, config search paths, and `extra` directories.
///
/// Config search paths that do not exist are skipped; `extra` directories
/// must exist.
pub fn build_registry(config: &HostConfig, extra: &[PathBuf]) -> anyhow::Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    let mut report = registry.scan_all(&config.plugins.resolved_search_paths());
    for dir in extra {
        let found = registry
            .scan(dir)
            .with_context(|| format!("failed to scan {}", dir.display()))?;
        report.discovered.extend(found.discovered);
        report.failed.extend(found.failed);
    }
    if !report.failed.is_empty() {
        tracing::warn!(
            skipped = report.failed.len(),
            "some plugin manifests could not be loaded"
        );
    }
    Ok(registry)
}

/// Instantiate `plugin` from the registry and insert it at `position`.
///
/// Parameter keys are checked before anything is inserted, so a bad spec
/// leaves the chain untouched. Returns the entry index.
pub fn add_plugin(
    chain: &mut ChainController,
    registry: &PluginRegistry,
    plugin: &PluginSpec,
    position: InsertPosition,
) -> anyhow::Result<usize> {
    let descriptor = registry
        .get(&plugin.uid)
        .ok_or_else(|| anyhow!("unknown plugin '{}' (see `rack plugins list`)", plugin.uid))?;
    let known = registry.params(&plugin.uid).unwrap_or_default();
    for (key, _) in &plugin.params {
        if !known.iter().any(|p| p.key == key) {
            bail!("plugin '{}' has no parameter '{key}'", plugin.uid);
        }
    }

    let index = chain.insert_plugin(registry, descriptor, position)?;
    for (key, value) in &plugin.params {
        let applied = chain.set_param(index, key, *value)?;
        tracing::debug!(index, key = %key, value = applied, "parameter set");
    }
    Ok(index)
}

/// Build a chain from the merged flags and config.
pub fn build_chain(
    registry: &PluginRegistry,
    args: &ChainArgs,
    config: &HostConfig,
    sample_rate: f32,
    block_size: usize,
) -> anyhow::Result<ChainController> {
    let mut chain = ChainController::with_settings(
        sample_rate,
        block_size,
        args.routing_mode(config),
        args.gain_db(config),
    )?;
    if let Some(spec) = &args.chain {
        for plugin in parse_chain(spec)? {
            add_plugin(&mut chain, registry, &plugin, InsertPosition::Append)?;
        }
    }
    for &index in &args.bypass {
        chain
            .set_bypass(index, true)
            .with_context(|| format!("cannot bypass entry {index}"))?;
    }
    Ok(chain)
}

/// Display labels for every node in the chain's route.
///
/// Entries use their chain name and index; endpoints use the engine's names.
pub fn node_labels(chain: &ChainController) -> BTreeMap<NodeId, String> {
    let engine = chain.engine();
    let endpoints = chain.endpoints();
    let mut labels = BTreeMap::new();
    for id in [endpoints.input, endpoints.master_gain, endpoints.output] {
        labels.insert(id, engine.node_name(id).unwrap_or("?").to_string());
    }
    for (index, entry) in chain.store().iter().enumerate() {
        labels.insert(entry.node_id(), format!("[{index}] {}", entry.name()));
    }
    labels
}

fn port_label(labels: &BTreeMap<NodeId, String>, port: Port) -> String {
    let side = if port.channel == 0 { "L" } else { "R" };
    match labels.get(&port.node) {
        Some(name) => format!("{name}.{side}"),
        None => format!("{}.{side}", port.node),
    }
}

/// `"Audio Input.L → [0] Gain.L"` for each connection.
pub fn describe_connections(chain: &ChainController) -> Vec<String> {
    let labels = node_labels(chain);
    chain
        .connections()
        .iter()
        .map(|c: &Connection| {
            format!(
                "{} → {}",
                port_label(&labels, c.source),
                port_label(&labels, c.dest)
            )
        })
        .collect()
}

/// Print the chain in signal order.
pub fn print_chain(chain: &ChainController) {
    let snapshot = chain.snapshot();
    println!(
        "Chain ({} entries, {} input, master {:.1} dB)",
        snapshot.entries.len(),
        snapshot.mode,
        snapshot.master_gain_db
    );
    if snapshot.entries.is_empty() {
        println!("  (empty: input passes straight to master)");
    }
    for entry in &snapshot.entries {
        let mut flags = Vec::new();
        if entry.bypassed {
            flags.push("bypassed");
        }
        if entry.has_editor {
            flags.push("editor");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        println!("  [{}] {}{flags}", entry.index, entry.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain() {
        let chain = parse_chain("gain:gain_db=-3|lowpass:cutoff=800,| swap ").unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].params, [("gain_db".to_string(), -3.0)]);
        assert_eq!(chain[1].uid, "lowpass");
        assert_eq!(chain[2], PluginSpec { uid: "swap".into(), params: vec![] });
    }

    #[test]
    fn test_manifest_uid_keeps_colon() {
        let spec = parse_plugin_spec("manifest:warm:cutoff=900").unwrap();
        assert_eq!(spec.uid, "manifest:warm");
        assert_eq!(spec.params, [("cutoff".to_string(), 900.0)]);

        let spec = parse_plugin_spec("manifest:warm").unwrap();
        assert_eq!(spec.uid, "manifest:warm");
        assert!(spec.params.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_chain("gain:gain_db=loud").is_err());
        assert!(parse_chain("gain:gain_db=1,width").is_err());
        assert!(parse_plugin_spec(":cutoff=1").is_err());
        assert!(parse_chain("").unwrap().is_empty());
    }

    #[test]
    fn test_build_chain_merges_flags_and_config() {
        let mut config = HostConfig::default();
        config.routing.mono = true;
        config.master.gain_db = -6.0;
        let registry = PluginRegistry::new();
        let args = ChainArgs {
            chain: Some("gain|pan:pan=0.5|width".into()),
            bypass: vec![1],
            gain_db: Some(-3.0),
            ..ChainArgs::default()
        };

        let chain = build_chain(&registry, &args, &config, 48000.0, 128).unwrap();
        let snapshot = chain.snapshot();
        assert_eq!(snapshot.entries.len(), 3);
        assert!(snapshot.entries[1].bypassed);
        assert_eq!(snapshot.mode, RoutingMode::ForcedMono);
        assert_eq!(snapshot.master_gain_db, -3.0);
    }

    #[test]
    fn test_bad_param_leaves_chain_untouched() {
        let registry = PluginRegistry::new();
        let mut chain = ChainController::new(48000.0, 64).unwrap();
        let spec = parse_plugin_spec("gain:cutoff=3").unwrap();
        let err = add_plugin(&mut chain, &registry, &spec, InsertPosition::Append).unwrap_err();
        assert!(err.to_string().contains("no parameter 'cutoff'"));
        assert!(chain.is_empty());
        assert_eq!(chain.revision(), 1);

        let spec = parse_plugin_spec("reverb").unwrap();
        assert!(add_plugin(&mut chain, &registry, &spec, InsertPosition::Append).is_err());
    }

    #[test]
    fn test_describe_connections_labels_entries() {
        let registry = PluginRegistry::new();
        let args = ChainArgs {
            chain: Some("gain".into()),
            ..ChainArgs::default()
        };
        let chain = build_chain(&registry, &args, &HostConfig::default(), 48000.0, 64).unwrap();
        let lines = describe_connections(&chain);
        assert_eq!(lines.len(), 6);
        assert!(lines.iter().any(|l| l.ends_with("[0] Gain.L") && l.starts_with("Audio Input.L")));
        assert!(lines.iter().any(|l| l.contains("Master Gain.R → Audio Output.R")));
    }
}
