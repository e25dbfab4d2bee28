//! Plugin registry for the rack host.
//!
//! This crate provides a centralized registry for discovering and
//! instantiating plugins. It always carries the built-in processors and can
//! scan directories for TOML plugin manifests that preset a built-in
//! processor under a new name.
//!
//! # Features
//!
//! - **Plugin Discovery**: list descriptors, scan directories for manifests
//! - **Factory Pattern**: [`PluginRegistry`] implements [`NodeFactory`]
//! - **Scan Reports**: unreadable or invalid manifests are collected, not fatal
//!
//! # Example
//!
//! ```rust
//! use rack_core::{ChainController, InsertPosition};
//! use rack_registry::PluginRegistry;
//!
//! let registry = PluginRegistry::new();
//! let mut chain = ChainController::new(48000.0, 256)?;
//!
//! let lowpass = registry.get("lowpass").unwrap();
//! chain.insert_plugin(&registry, lowpass, InsertPosition::Append)?;
//! chain.set_param(0, "cutoff", 800.0)?;
//! # Ok::<(), rack_core::ChainError>(())
//! ```

pub mod builtin;
mod error;
pub mod manifest;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rack_core::{AudioNode, NodeFactory, ParamDescriptor, PluginDescriptor, PluginError};

pub use builtin::{ProcessorCategory, ProcessorKind};
pub use error::RegistryError;
pub use manifest::PluginManifest;

/// `format` of built-in descriptors.
pub const FORMAT_BUILTIN: &str = "builtin";
/// `format` of manifest descriptors.
pub const FORMAT_MANIFEST: &str = "manifest";

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: PluginDescriptor,
    processor: ProcessorKind,
    params: BTreeMap<String, f32>,
}

/// A file a scan could not register.
#[derive(Debug)]
pub struct FailedFile {
    /// Offending file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub error: RegistryError,
}

/// Outcome of a directory scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Uids registered (or refreshed) by the scan.
    pub discovered: Vec<String>,
    /// Files that were skipped.
    pub failed: Vec<FailedFile>,
}

impl ScanReport {
    fn merge(&mut self, other: ScanReport) {
        self.discovered.extend(other.discovered);
        self.failed.extend(other.failed);
    }
}

/// Registry of all available plugins.
///
/// Built-in processors are always registered under their processor id
/// (`"gain"`, `"lowpass"`, ...). Manifests are registered under
/// `manifest:<file stem>`.
pub struct PluginRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// Create a new registry with all built-in processors registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(ProcessorKind::ALL.len()),
        };
        for kind in ProcessorKind::ALL {
            registry.register(
                PluginDescriptor {
                    uid: kind.id().to_string(),
                    name: kind.name().to_string(),
                    format: FORMAT_BUILTIN.to_string(),
                    category: kind.category().name().to_string(),
                    description: kind.description().to_string(),
                    location: None,
                },
                kind,
                BTreeMap::new(),
            );
        }
        registry
    }

    /// Register or replace an entry by uid.
    fn register(
        &mut self,
        descriptor: PluginDescriptor,
        processor: ProcessorKind,
        params: BTreeMap<String, f32>,
    ) {
        let entry = RegistryEntry {
            descriptor,
            processor,
            params,
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.descriptor.uid == entry.descriptor.uid)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Register a parsed manifest. Returns its uid.
    pub fn register_manifest(&mut self, manifest: PluginManifest) -> String {
        let uid = manifest.uid();
        let descriptor = PluginDescriptor {
            uid: uid.clone(),
            name: manifest.name,
            format: FORMAT_MANIFEST.to_string(),
            category: manifest
                .category
                .unwrap_or_else(|| manifest.processor.category().name().to_string()),
            description: manifest
                .description
                .unwrap_or_else(|| manifest.processor.description().to_string()),
            location: Some(manifest.path),
        };
        self.register(descriptor, manifest.processor, manifest.params);
        uid
    }

    /// Scan one directory (non-recursive) for `*.toml` manifests.
    ///
    /// Files are visited in path order. Invalid files are reported in
    /// [`ScanReport::failed`] and do not stop the scan.
    ///
    /// # Errors
    ///
    /// Fails only if the directory itself cannot be read.
    pub fn scan(&mut self, dir: &Path) -> Result<ScanReport, RegistryError> {
        let read_dir = std::fs::read_dir(dir).map_err(|e| RegistryError::read(dir, e))?;
        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut report = ScanReport::default();
        for path in paths {
            match PluginManifest::load(&path) {
                Ok(manifest) => {
                    let uid = self.register_manifest(manifest);
                    tracing::info!(uid = %uid, path = %path.display(), "discovered plugin");
                    report.discovered.push(uid);
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), "skipping plugin manifest: {error}");
                    report.failed.push(FailedFile { path, error });
                }
            }
        }
        Ok(report)
    }

    /// Scan several directories. Missing directories are skipped; unreadable
    /// ones are reported as failed.
    pub fn scan_all<P: AsRef<Path>>(&mut self, dirs: &[P]) -> ScanReport {
        let mut report = ScanReport::default();
        for dir in dirs {
            let dir = dir.as_ref();
            if !dir.exists() {
                tracing::debug!(dir = %dir.display(), "plugin search path does not exist");
                continue;
            }
            match self.scan(dir) {
                Ok(found) => report.merge(found),
                Err(error) => report.failed.push(FailedFile {
                    path: dir.to_path_buf(),
                    error,
                }),
            }
        }
        report
    }

    /// Returns descriptors for all registered plugins.
    pub fn descriptors(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Returns descriptors in a category (case-insensitive).
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a PluginDescriptor> {
        self.descriptors()
            .filter(move |d| d.category.eq_ignore_ascii_case(category))
    }

    /// Get a descriptor by uid.
    pub fn get(&self, uid: &str) -> Option<&PluginDescriptor> {
        self.entry(uid).map(|e| &e.descriptor)
    }

    /// Backing processor of a registered plugin.
    pub fn processor(&self, uid: &str) -> Option<ProcessorKind> {
        self.entry(uid).map(|e| e.processor)
    }

    /// Parameter descriptors of a registered plugin.
    pub fn params(&self, uid: &str) -> Option<Vec<ParamDescriptor>> {
        let node = self.entry(uid)?.processor.create(48000.0);
        Some((0..node.param_count()).filter_map(|i| node.param_info(i)).collect())
    }

    /// Parameter presets a manifest applies on instantiation.
    pub fn presets(&self, uid: &str) -> Option<&BTreeMap<String, f32>> {
        self.entry(uid).map(|e| &e.params)
    }

    /// Returns the number of registered plugins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no plugins are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, uid: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.descriptor.uid == uid)
    }
}

impl NodeFactory for PluginRegistry {
    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        sample_rate: f32,
        _block_size: usize,
    ) -> Result<Box<dyn AudioNode>, PluginError> {
        let entry = self
            .entry(&descriptor.uid)
            .ok_or_else(|| PluginError::UnknownPlugin(descriptor.uid.clone()))?;
        let mut node = entry.processor.create(sample_rate);
        for (key, &value) in &entry.params {
            let index = node.param_index(key).ok_or_else(|| PluginError::Instantiation {
                name: descriptor.name.clone(),
                reason: format!("processor '{}' has no parameter '{key}'", entry.processor),
            })?;
            node.set_param(index, value);
        }
        node.reset();
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = PluginRegistry::new();
        assert_eq!(registry.len(), 8);
        assert!(registry.descriptors().all(|d| d.format == FORMAT_BUILTIN));
    }

    #[test]
    fn test_get_plugin() {
        let registry = PluginRegistry::new();
        let gain = registry.get("gain").unwrap();
        assert_eq!(gain.name, "Gain");
        assert_eq!(gain.category, "Utility");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_in_category() {
        let registry = PluginRegistry::new();
        assert_eq!(registry.in_category("filter").count(), 2);
        assert_eq!(registry.in_category("Spatial").count(), 2);
    }

    #[test]
    fn test_params() {
        let registry = PluginRegistry::new();
        let params = registry.params("invert").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].key, "right");
        assert!(registry.params("swap").unwrap().is_empty());
    }

    #[test]
    fn test_all_plugins_instantiate() {
        let registry = PluginRegistry::new();
        for descriptor in registry.descriptors() {
            let mut node = registry
                .instantiate(descriptor, 48000.0, 64)
                .unwrap_or_else(|e| panic!("{}: {e}", descriptor.uid));
            let (mut l, mut r) = ([0.5; 64], [-0.5; 64]);
            node.process(&mut l, &mut r);
            assert!(l.iter().chain(r.iter()).all(|s| s.is_finite()));
        }
    }

    #[test]
    fn test_manifest_presets_apply() {
        let mut registry = PluginRegistry::new();
        let manifest = PluginManifest::parse(
            "name = \"Quiet\"\nprocessor = \"gain\"\n[params]\ngain_db = -12.0",
            Path::new("quiet.toml"),
        )
        .unwrap();
        let uid = registry.register_manifest(manifest);
        assert_eq!(uid, "manifest:quiet");

        let descriptor = registry.get(&uid).unwrap().clone();
        assert_eq!(descriptor.format, FORMAT_MANIFEST);
        assert_eq!(descriptor.description, ProcessorKind::Gain.description());
        let node = registry.instantiate(&descriptor, 48000.0, 64).unwrap();
        assert_eq!(node.get_param(0), Some(-12.0));
    }

    #[test]
    fn test_unknown_uid() {
        let registry = PluginRegistry::new();
        let mut descriptor = registry.get("gain").unwrap().clone();
        descriptor.uid = "manifest:missing".into();
        let err = registry.instantiate(&descriptor, 48000.0, 64).err().unwrap();
        assert_eq!(err, PluginError::UnknownPlugin("manifest:missing".into()));
    }
}
