//! Read-only views of the chain for the UI shell.

use serde::Serialize;

use super::entry::EntryId;
use super::synth::RoutingMode;

/// One entry as the UI sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySnapshot {
    /// Position in signal order.
    pub index: usize,
    /// Stable identity.
    pub id: EntryId,
    /// Display name.
    pub name: String,
    /// Whether the entry is skipped during routing.
    pub bypassed: bool,
    /// Whether the node came from a plugin descriptor.
    pub external: bool,
    /// Whether the node offers an editor surface.
    pub has_editor: bool,
}

/// The whole chain as the UI sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainSnapshot {
    /// Entries in signal order.
    pub entries: Vec<EntrySnapshot>,
    /// Input routing mode.
    pub mode: RoutingMode,
    /// Master level in dB.
    pub master_gain_db: f32,
    /// Revision of the route that was current when the snapshot was taken.
    pub revision: u64,
}

impl ChainSnapshot {
    /// Entries that take part in routing.
    pub fn active(&self) -> impl Iterator<Item = &EntrySnapshot> {
        self.entries.iter().filter(|e| !e.bypassed)
    }
}
