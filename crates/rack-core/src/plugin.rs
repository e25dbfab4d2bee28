//! Plugin lifecycle adapter.
//!
//! A [`PluginDescriptor`] names something installable. A [`NodeFactory`] turns
//! a descriptor into a live [`AudioNode`], and [`PluginAdapter`] drives the
//! lifecycle around it: instantiate at the host's sample rate and block size,
//! check the stereo bus layout, prepare, and hand back a [`PreparedNode`] ready
//! for insertion into the chain.
//!
//! The adapter never touches the chain. A failure here leaves the store and
//! the routing graph exactly as they were.

use std::path::PathBuf;

use serde::Serialize;

use crate::node::{AudioNode, BusLayout};

/// Sample rate the adapter prepares nodes at unless configured otherwise.
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// Block size the adapter prepares nodes at unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Metadata describing an installable plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginDescriptor {
    /// Unique identifier, stable across scans.
    pub uid: String,
    /// Display name.
    pub name: String,
    /// Origin format, for example `"builtin"` or `"manifest"`.
    pub format: String,
    /// Category for listing.
    pub category: String,
    /// One-line description.
    pub description: String,
    /// File the descriptor was read from, if any.
    pub location: Option<PathBuf>,
}

/// Errors raised while turning a descriptor into a node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PluginError {
    /// No factory knows this uid.
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    /// The factory failed to build the node.
    #[error("failed to instantiate {name}: {reason}")]
    Instantiation {
        /// Descriptor name.
        name: String,
        /// Factory diagnostic.
        reason: String,
    },

    /// The node refused the required bus layout.
    #[error("{name} does not support the {layout} bus layout")]
    UnsupportedLayout {
        /// Descriptor name.
        name: String,
        /// Requested layout.
        layout: BusLayout,
    },
}

impl PluginError {
    /// Human-readable diagnostic text.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

/// Builds nodes from descriptors.
pub trait NodeFactory {
    /// Create a node for `descriptor`.
    ///
    /// The returned node need not be prepared; the adapter prepares it.
    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        sample_rate: f32,
        block_size: usize,
    ) -> Result<Box<dyn AudioNode>, PluginError>;
}

/// A node ready for insertion into the chain.
pub struct PreparedNode {
    pub(crate) node: Box<dyn AudioNode>,
    pub(crate) name: String,
    pub(crate) external: bool,
    pub(crate) prepared_for: Option<(f32, usize)>,
}

impl PreparedNode {
    /// Wrap a processor supplied directly by the host.
    ///
    /// It is prepared at insertion time against the chain's settings.
    pub fn local(node: Box<dyn AudioNode>) -> Self {
        let name = node.name().to_string();
        Self {
            node,
            name,
            external: false,
            prepared_for: None,
        }
    }

    /// Display name used for the chain entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the node came from a plugin descriptor.
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Whether the node offers an editor surface.
    pub fn has_editor(&self) -> bool {
        self.node.has_editor()
    }

    /// The wrapped node.
    pub fn node(&self) -> &dyn AudioNode {
        self.node.as_ref()
    }

    pub(crate) fn ensure_prepared(&mut self, sample_rate: f32, block_size: usize) {
        if self.prepared_for != Some((sample_rate, block_size)) {
            self.node.prepare(sample_rate, block_size);
            self.prepared_for = Some((sample_rate, block_size));
        }
    }
}

impl core::fmt::Debug for PreparedNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PreparedNode")
            .field("name", &self.name)
            .field("external", &self.external)
            .field("prepared_for", &self.prepared_for)
            .finish()
    }
}

/// Instantiates and prepares plugins at fixed processing settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PluginAdapter {
    sample_rate: f32,
    block_size: usize,
}

impl Default for PluginAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_BLOCK_SIZE)
    }
}

impl PluginAdapter {
    /// Adapter preparing nodes at `sample_rate` and `block_size`.
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size: block_size.max(1),
        }
    }

    /// Sample rate nodes are prepared at.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Block size nodes are prepared at.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Instantiate `descriptor` through `factory` and prepare it for stereo.
    ///
    /// # Errors
    ///
    /// Factory failures propagate unchanged. A node that does not accept the
    /// stereo layout yields [`PluginError::UnsupportedLayout`].
    pub fn instantiate(
        &self,
        factory: &dyn NodeFactory,
        descriptor: &PluginDescriptor,
    ) -> Result<PreparedNode, PluginError> {
        let result = self.build(factory, descriptor);
        #[cfg(feature = "tracing")]
        log_failure(descriptor, &result);
        result
    }

    fn build(
        &self,
        factory: &dyn NodeFactory,
        descriptor: &PluginDescriptor,
    ) -> Result<PreparedNode, PluginError> {
        let mut node = factory.instantiate(descriptor, self.sample_rate, self.block_size)?;
        if !node.supports_layout(BusLayout::STEREO) {
            return Err(PluginError::UnsupportedLayout {
                name: descriptor.name.clone(),
                layout: BusLayout::STEREO,
            });
        }
        node.prepare(self.sample_rate, self.block_size);
        Ok(PreparedNode {
            node,
            name: descriptor.name.clone(),
            external: true,
            prepared_for: Some((self.sample_rate, self.block_size)),
        })
    }

    /// Whether a prepared node offers an editor surface.
    pub fn has_editor(&self, node: &PreparedNode) -> bool {
        node.has_editor()
    }
}

#[cfg(feature = "tracing")]
fn log_failure(descriptor: &PluginDescriptor, result: &Result<PreparedNode, PluginError>) {
    if let Err(e) = result {
        tracing::warn!(uid = %descriptor.uid, "plugin instantiation failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        prepared: Arc<AtomicUsize>,
        stereo: bool,
    }

    impl AudioNode for Probe {
        fn name(&self) -> &str {
            "probe"
        }
        fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {
            self.prepared.fetch_add(1, Ordering::SeqCst);
        }
        fn process(&mut self, _left: &mut [f32], _right: &mut [f32]) {}
        fn reset(&mut self) {}
        fn supports_layout(&self, layout: BusLayout) -> bool {
            self.stereo && layout == BusLayout::STEREO
        }
    }

    struct ProbeFactory {
        prepared: Arc<AtomicUsize>,
    }

    impl NodeFactory for ProbeFactory {
        fn instantiate(
            &self,
            descriptor: &PluginDescriptor,
            _sample_rate: f32,
            _block_size: usize,
        ) -> Result<Box<dyn AudioNode>, PluginError> {
            match descriptor.uid.as_str() {
                "ok" => Ok(Box::new(Probe {
                    prepared: Arc::clone(&self.prepared),
                    stereo: true,
                })),
                "mono-only" => Ok(Box::new(Probe {
                    prepared: Arc::clone(&self.prepared),
                    stereo: false,
                })),
                "broken" => Err(PluginError::Instantiation {
                    name: descriptor.name.clone(),
                    reason: "missing resource".into(),
                }),
                other => Err(PluginError::UnknownPlugin(other.into())),
            }
        }
    }

    fn descriptor(uid: &str) -> PluginDescriptor {
        PluginDescriptor {
            uid: uid.into(),
            name: format!("Plugin {uid}"),
            format: "test".into(),
            category: "Test".into(),
            description: String::new(),
            location: None,
        }
    }

    #[test]
    fn test_instantiate_prepares_once() {
        let prepared = Arc::new(AtomicUsize::new(0));
        let factory = ProbeFactory {
            prepared: Arc::clone(&prepared),
        };
        let adapter = PluginAdapter::default();
        let mut node = adapter.instantiate(&factory, &descriptor("ok")).unwrap();
        assert_eq!(prepared.load(Ordering::SeqCst), 1);
        assert!(node.is_external());
        assert_eq!(node.name(), "Plugin ok");
        assert!(!adapter.has_editor(&node));

        node.ensure_prepared(DEFAULT_SAMPLE_RATE, DEFAULT_BLOCK_SIZE);
        assert_eq!(prepared.load(Ordering::SeqCst), 1);
        node.ensure_prepared(48000.0, DEFAULT_BLOCK_SIZE);
        assert_eq!(prepared.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_layout_rejected_before_prepare() {
        let prepared = Arc::new(AtomicUsize::new(0));
        let factory = ProbeFactory {
            prepared: Arc::clone(&prepared),
        };
        let err = PluginAdapter::default()
            .instantiate(&factory, &descriptor("mono-only"))
            .unwrap_err();
        assert!(matches!(err, PluginError::UnsupportedLayout { .. }));
        assert!(err.diagnostic().contains("2 in / 2 out"));
        assert_eq!(prepared.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_factory_errors_propagate() {
        let factory = ProbeFactory {
            prepared: Arc::new(AtomicUsize::new(0)),
        };
        let adapter = PluginAdapter::new(48000.0, 0);
        assert_eq!(adapter.block_size(), 1);
        let err = adapter.instantiate(&factory, &descriptor("broken")).unwrap_err();
        assert_eq!(err.diagnostic(), "failed to instantiate Plugin broken: missing resource");
        let err = adapter.instantiate(&factory, &descriptor("nope")).unwrap_err();
        assert_eq!(err, PluginError::UnknownPlugin("nope".into()));
    }

    #[test]
    fn test_local_node_is_unprepared() {
        let prepared = Arc::new(AtomicUsize::new(0));
        let node = PreparedNode::local(Box::new(Probe {
            prepared,
            stereo: true,
        }));
        assert!(!node.is_external());
        assert_eq!(node.name(), "probe");
        assert_eq!(node.prepared_for, None);
    }
}
