//! Compiled routes: the immutable form of the topology the audio thread runs.
//!
//! A [`CompiledRoute`] is produced by
//! [`RoutingEngine::commit()`](super::RoutingEngine::commit) and published
//! through an `ArcSwap`. It is never mutated after creation, so the audio
//! thread sees a complete topology or the previous one.

use crate::node::WeakNode;

use super::port::{Connection, NodeId};

/// Where one input channel draws signal from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChannelSource {
    /// Buffer slot written by the source node.
    pub buffer: usize,
    /// Channel of that slot.
    pub channel: usize,
}

/// Sources summed into each of a node's two input channels.
pub(crate) type InputMap = [Vec<ChannelSource>; 2];

/// One instruction of a compiled route.
#[derive(Debug)]
pub(crate) enum RouteStep {
    /// Copy the external input into a buffer slot.
    WriteInput { buffer: usize },
    /// Gather inputs, run a node in place, store the result.
    Process {
        node_id: NodeId,
        node: WeakNode,
        inputs: InputMap,
        output: usize,
    },
    /// Gather the final output.
    ReadOutput { inputs: InputMap },
}

/// Immutable snapshot of the routing topology.
#[derive(Debug)]
pub struct CompiledRoute {
    pub(crate) steps: Vec<RouteStep>,
    pub(crate) buffer_count: usize,
    pub(crate) connections: Vec<Connection>,
    pub(crate) revision: u64,
}

impl CompiledRoute {
    /// Route that renders silence. Installed before the first commit.
    pub(crate) fn empty() -> Self {
        Self {
            steps: Vec::new(),
            buffer_count: 0,
            connections: Vec::new(),
            revision: 0,
        }
    }

    /// Connections this route was compiled from, in sorted order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Commit counter value that produced this route.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of instructions.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Number of buffer slots the route writes.
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Processor nodes in execution order.
    pub fn processing_order(&self) -> Vec<NodeId> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                RouteStep::Process { node_id, .. } => Some(*node_id),
                _ => None,
            })
            .collect()
    }
}
