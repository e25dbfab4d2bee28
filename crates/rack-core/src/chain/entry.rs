//! Chain entries: one user-visible slot wrapping exactly one node.

use serde::Serialize;

use crate::graph::NodeId;
use crate::node::NodeHandle;

/// Stable identity of a chain entry, unchanged by reordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(pub(crate) u64);

impl EntryId {
    /// Raw numeric identifier.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for EntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One slot of the plugin chain.
///
/// The entry is the sole owner of its node. Bypassed entries stay in the
/// store and are skipped by graph synthesis.
#[derive(Debug)]
pub struct ChainEntry {
    pub(crate) id: EntryId,
    name: String,
    node: NodeHandle,
    node_id: NodeId,
    bypassed: bool,
    external: bool,
    has_editor: bool,
}

impl ChainEntry {
    /// Wrap a node registered in the routing engine under `node_id`.
    ///
    /// The identity is assigned when the entry is inserted into a store.
    pub fn new(name: impl Into<String>, node: NodeHandle, node_id: NodeId, external: bool) -> Self {
        Self {
            id: EntryId(0),
            name: name.into(),
            node,
            node_id,
            bypassed: false,
            external,
            has_editor: false,
        }
    }

    /// Record whether the node exposes an editor.
    pub fn with_editor(mut self, has_editor: bool) -> Self {
        self.has_editor = has_editor;
        self
    }

    /// Stable identity.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owned node.
    pub fn node(&self) -> &NodeHandle {
        &self.node
    }

    /// Routing engine id of the node.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Whether the entry is skipped during routing.
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Whether the node came from a plugin descriptor.
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Whether the node exposes an editor, as reported at insert time.
    pub fn has_editor(&self) -> bool {
        self.has_editor
    }

    pub(crate) fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }
}
