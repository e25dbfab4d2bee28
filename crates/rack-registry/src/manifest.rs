//! On-disk plugin manifests.
//!
//! A manifest is a TOML file naming a built-in processor and presetting some
//! of its parameters:
//!
//! ```toml
//! name = "Warm Lowpass"
//! processor = "lowpass"
//! description = "Gentle top-end roll-off"
//!
//! [params]
//! cutoff = 1200.0
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::builtin::ProcessorKind;
use crate::error::RegistryError;

/// Parsed and validated manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    /// Display name.
    pub name: String,
    /// Backing processor.
    pub processor: ProcessorKind,
    /// One-line description.
    pub description: Option<String>,
    /// Category override.
    pub category: Option<String>,
    /// Parameter presets by key.
    pub params: BTreeMap<String, f32>,
    /// File the manifest was read from.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    name: String,
    processor: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    params: BTreeMap<String, f32>,
}

impl PluginManifest {
    /// Read and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| RegistryError::read(path, e))?;
        Self::parse(&contents, path)
    }

    /// Parse and validate manifest text. `path` is recorded and used in errors.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, RegistryError> {
        let raw: RawManifest =
            toml::from_str(contents).map_err(|e| RegistryError::parse(path, e))?;

        if raw.name.trim().is_empty() {
            return Err(RegistryError::invalid(path, "name is empty"));
        }
        let processor = ProcessorKind::from_id(&raw.processor).ok_or_else(|| {
            RegistryError::invalid(path, format!("unknown processor '{}'", raw.processor))
        })?;

        let node = processor.create(48000.0);
        for (key, value) in &raw.params {
            if node.param_index(key).is_none() {
                return Err(RegistryError::invalid(
                    path,
                    format!("processor '{processor}' has no parameter '{key}'"),
                ));
            }
            if !value.is_finite() {
                return Err(RegistryError::invalid(
                    path,
                    format!("parameter '{key}' is not finite"),
                ));
            }
        }

        Ok(Self {
            name: raw.name,
            processor,
            description: raw.description,
            category: raw.category,
            params: raw.params,
            path: path.to_path_buf(),
        })
    }

    /// Registry uid: `manifest:<file stem>`.
    pub fn uid(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.to_lowercase());
        format!("manifest:{stem}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<PluginManifest, RegistryError> {
        PluginManifest::parse(text, Path::new("/plugins/warm.toml"))
    }

    #[test]
    fn parses_full_manifest() {
        let manifest = parse(
            r#"
            name = "Warm Lowpass"
            processor = "lowpass"
            description = "Gentle"
            [params]
            cutoff = 1200.0
            "#,
        )
        .unwrap();
        assert_eq!(manifest.processor, ProcessorKind::Lowpass);
        assert_eq!(manifest.params.get("cutoff"), Some(&1200.0));
        assert_eq!(manifest.uid(), "manifest:warm");
        assert_eq!(manifest.category, None);
    }

    #[test]
    fn rejects_unknown_processor() {
        let err = parse("name = \"X\"\nprocessor = \"reverb\"").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidManifest { .. }));
        assert!(err.to_string().contains("reverb"));
    }

    #[test]
    fn rejects_unknown_param() {
        let err = parse("name = \"X\"\nprocessor = \"gain\"\n[params]\ncutoff = 1.0").unwrap_err();
        assert!(err.to_string().contains("no parameter 'cutoff'"));
    }

    #[test]
    fn rejects_bad_toml_and_missing_fields() {
        assert!(matches!(parse("name = "), Err(RegistryError::Parse { .. })));
        assert!(matches!(parse("name = \"X\""), Err(RegistryError::Parse { .. })));
        assert!(matches!(
            parse("name = \"  \"\nprocessor = \"gain\""),
            Err(RegistryError::InvalidManifest { .. })
        ));
    }
}
