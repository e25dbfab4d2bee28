//! Commands that mutate the chain.

use crate::plugin::PreparedNode;

use super::store::InsertPosition;
use super::synth::RoutingMode;

/// A mutation request from the UI shell.
///
/// Commands are consumed by [`ChainController::apply`](super::ChainController::apply)
/// on the control thread. Index-based commands fail without effect when the
/// index is out of range.
#[derive(Debug)]
pub enum ChainCommand {
    /// Insert a prepared node.
    Insert {
        /// Node to insert, from [`PluginAdapter`](crate::PluginAdapter) or
        /// [`PreparedNode::local`].
        plugin: PreparedNode,
        /// Where to place it.
        position: InsertPosition,
    },
    /// Remove the entry at `index`, dropping its node.
    Remove {
        /// Entry index.
        index: usize,
    },
    /// Relocate the entry at `from` to `to`.
    Move {
        /// Current index.
        from: usize,
        /// Target index.
        to: usize,
    },
    /// Swap the entry at `index` with its predecessor. No-op at the top.
    MoveUp {
        /// Entry index.
        index: usize,
    },
    /// Swap the entry at `index` with its successor. No-op at the bottom.
    MoveDown {
        /// Entry index.
        index: usize,
    },
    /// Enable or disable bypass for an entry.
    SetBypass {
        /// Entry index.
        index: usize,
        /// New bypass state.
        bypassed: bool,
    },
    /// Switch between stereo and forced-mono input routing.
    SetRoutingMode(RoutingMode),
    /// Set the master level in dB.
    SetMasterGainDb(f32),
}
