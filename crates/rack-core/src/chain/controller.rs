//! The chain controller: command surface over the store and routing engine.
//!
//! Every successful structural mutation resynthesizes the graph and commits
//! it before returning. A failed mutation touches nothing, so the committed
//! route (and its revision) stays as it was.
//!
//! Removed entries are parked until every processor has finished a block on
//! a route without them, so a node is never freed on the audio thread.

use std::sync::Arc;

use crate::graph::{CompiledRoute, Connection, NodeId, RouteProcessor, RoutingEngine};
use crate::node::{AudioNode, NodeHandle};
use crate::plugin::{NodeFactory, PluginAdapter, PluginDescriptor, PreparedNode};

use super::ChainError;
use super::command::ChainCommand;
use super::entry::ChainEntry;
use super::master_gain::MasterGain;
use super::snapshot::{ChainSnapshot, EntrySnapshot};
use super::store::{ChainEntryStore, InsertPosition};
use super::synth::{self, Endpoints, RoutingMode};

/// Owns the chain and keeps the routing graph in sync with it.
///
/// The controller lives on the control thread. Audio threads obtain a
/// [`RouteProcessor`] from [`processor()`](Self::processor) and never touch
/// the controller directly.
pub struct ChainController {
    store: ChainEntryStore,
    engine: RoutingEngine,
    master: MasterGain,
    endpoints: Endpoints,
    mode: RoutingMode,
    /// Removed entries and the revision that dropped them from the route.
    retired: Vec<(u64, ChainEntry)>,
}

impl ChainController {
    /// Empty stereo chain at unity master gain.
    ///
    /// # Errors
    ///
    /// Propagates routing failures from the initial commit.
    pub fn new(sample_rate: f32, block_size: usize) -> Result<Self, ChainError> {
        Self::with_settings(sample_rate, block_size, RoutingMode::Stereo, 0.0)
    }

    /// Empty chain with an explicit routing mode and master level.
    ///
    /// The initial route (Input → Master Gain → Output) is committed before
    /// this returns.
    pub fn with_settings(
        sample_rate: f32,
        block_size: usize,
        mode: RoutingMode,
        master_gain_db: f32,
    ) -> Result<Self, ChainError> {
        let mut engine = RoutingEngine::new(sample_rate, block_size);
        let master = MasterGain::new(master_gain_db, sample_rate, engine.block_size());
        let endpoints = Endpoints {
            input: engine.input(),
            master_gain: engine.add_node(master.node()),
            output: engine.output(),
        };
        let mut controller = Self {
            store: ChainEntryStore::new(),
            engine,
            master,
            endpoints,
            mode,
            retired: Vec::new(),
        };
        controller.resynthesize()?;
        Ok(controller)
    }

    // --- Queries ---

    /// Audio-thread executor following this chain's committed routes.
    pub fn processor(&self) -> RouteProcessor {
        self.engine.processor()
    }

    /// The underlying routing engine.
    pub fn engine(&self) -> &RoutingEngine {
        &self.engine
    }

    /// The entry store.
    pub fn store(&self) -> &ChainEntryStore {
        &self.store
    }

    /// The fixed Input, Master Gain and Output node ids.
    pub fn endpoints(&self) -> Endpoints {
        self.endpoints
    }

    /// Current input routing mode.
    pub fn routing_mode(&self) -> RoutingMode {
        self.mode
    }

    /// Master level in dB.
    pub fn master_gain_db(&self) -> f32 {
        self.master.gain_db()
    }

    /// The master gain stage.
    pub fn master_gain(&self) -> &MasterGain {
        &self.master
    }

    /// Number of entries, bypassed ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the chain has no entries.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Entry at `index`.
    pub fn entry(&self, index: usize) -> Option<&ChainEntry> {
        self.store.get(index)
    }

    /// Routing node id of the entry at `index`.
    pub fn entry_node_id(&self, index: usize) -> Option<NodeId> {
        self.store.get(index).map(ChainEntry::node_id)
    }

    /// Connection set of the committed route.
    pub fn connections(&self) -> Vec<Connection> {
        self.engine.current_route().connections().to_vec()
    }

    /// Revision of the committed route. Increments on every rebuild.
    pub fn revision(&self) -> u64 {
        self.engine.revision()
    }

    /// Processing settings nodes are prepared at.
    pub fn adapter(&self) -> PluginAdapter {
        PluginAdapter::new(self.engine.sample_rate(), self.engine.block_size())
    }

    /// Read-only view for the UI shell.
    pub fn snapshot(&self) -> ChainSnapshot {
        let entries = self
            .store
            .iter()
            .enumerate()
            .map(|(index, entry)| EntrySnapshot {
                index,
                id: entry.id(),
                name: entry.name().to_string(),
                bypassed: entry.is_bypassed(),
                external: entry.is_external(),
                has_editor: entry.has_editor(),
            })
            .collect();
        ChainSnapshot {
            entries,
            mode: self.mode,
            master_gain_db: self.master.gain_db(),
            revision: self.engine.revision(),
        }
    }

    // --- Mutations ---

    /// Apply one command.
    pub fn apply(&mut self, command: ChainCommand) -> Result<(), ChainError> {
        match command {
            ChainCommand::Insert { plugin, position } => self.insert(plugin, position).map(drop),
            ChainCommand::Remove { index } => self.remove(index),
            ChainCommand::Move { from, to } => self.move_entry(from, to),
            ChainCommand::MoveUp { index } => self.move_up(index),
            ChainCommand::MoveDown { index } => self.move_down(index),
            ChainCommand::SetBypass { index, bypassed } => self.set_bypass(index, bypassed),
            ChainCommand::SetRoutingMode(mode) => self.set_routing_mode(mode).map(drop),
            ChainCommand::SetMasterGainDb(db) => {
                self.set_master_gain_db(db);
                Ok(())
            }
        }
    }

    /// Insert a prepared node. Returns the index it landed at.
    ///
    /// Nodes prepared for different settings than the chain's are prepared
    /// again before they enter the graph.
    pub fn insert(&mut self, mut plugin: PreparedNode, position: InsertPosition) -> Result<usize, ChainError> {
        plugin.ensure_prepared(self.engine.sample_rate(), self.engine.block_size());
        let has_editor = plugin.has_editor();
        let PreparedNode {
            node, name, external, ..
        } = plugin;

        let handle = NodeHandle::new(node);
        let node_id = self.engine.add_node(&handle);
        let index = self
            .store
            .insert(
                ChainEntry::new(name, handle, node_id, external).with_editor(has_editor),
                position,
            );
        self.resynthesize()?;

        #[cfg(feature = "tracing")]
        tracing::info!(index, node = %node_id, external, "plugin inserted into chain");
        Ok(index)
    }

    /// Insert a processor supplied directly by the host.
    pub fn insert_node(&mut self, node: Box<dyn AudioNode>, position: InsertPosition) -> Result<usize, ChainError> {
        self.insert(PreparedNode::local(node), position)
    }

    /// Instantiate a plugin through `factory` and insert it.
    ///
    /// # Errors
    ///
    /// [`ChainError::Instantiation`] if the adapter fails; the chain is left
    /// untouched.
    pub fn insert_plugin(
        &mut self,
        factory: &dyn NodeFactory,
        descriptor: &PluginDescriptor,
        position: InsertPosition,
    ) -> Result<usize, ChainError> {
        let plugin = self.adapter().instantiate(factory, descriptor)?;
        self.insert(plugin, position)
    }

    /// Remove the entry at `index`.
    ///
    /// The route without the node is committed first. The node itself is
    /// dropped here once every processor has rendered that route, or later by
    /// [`release_retired()`](Self::release_retired).
    pub fn remove(&mut self, index: usize) -> Result<(), ChainError> {
        let len = self.store.len();
        let entry = self
            .store
            .remove(index)
            .ok_or(ChainError::IndexOutOfRange { index, len })?;
        self.engine.remove_node(entry.node_id())?;
        let route = self.resynthesize()?;

        #[cfg(feature = "tracing")]
        tracing::info!(index, name = entry.name(), "plugin removed from chain");
        self.retired.push((route.revision(), entry));
        self.release_retired();
        Ok(())
    }

    /// Drop removed entries no processor can still be running.
    ///
    /// Called after every rebuild; a host with a live stream should also call
    /// it periodically. Returns how many entries were dropped.
    pub fn release_retired(&mut self) -> usize {
        if self.retired.is_empty() {
            return 0;
        }
        let settled = self.engine.settled_revision();
        let before = self.retired.len();
        self.retired.retain(|(revision, _)| *revision > settled);
        let released = before - self.retired.len();

        #[cfg(feature = "tracing")]
        if released > 0 {
            tracing::debug!(released, pending = self.retired.len(), "retired entries dropped");
        }
        released
    }

    /// Removed entries still waiting for the audio side to move on.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// Relocate the entry at `from` to `to`.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), ChainError> {
        let len = self.store.len();
        if !self.store.move_entry(from, to) {
            let index = if from >= len { from } else { to };
            return Err(ChainError::IndexOutOfRange { index, len });
        }
        self.resynthesize()?;

        #[cfg(feature = "tracing")]
        tracing::info!(from, to, "chain entry moved");
        Ok(())
    }

    /// Move the entry at `index` one slot towards Input.
    pub fn move_up(&mut self, index: usize) -> Result<(), ChainError> {
        self.check_index(index)?;
        self.move_entry(index, index.saturating_sub(1))
    }

    /// Move the entry at `index` one slot towards Master Gain.
    pub fn move_down(&mut self, index: usize) -> Result<(), ChainError> {
        let last = self.check_index(index)?;
        self.move_entry(index, (index + 1).min(last))
    }

    /// Set the bypass flag of the entry at `index`.
    pub fn set_bypass(&mut self, index: usize, bypassed: bool) -> Result<(), ChainError> {
        if !self.store.set_bypass(index, bypassed) {
            return Err(ChainError::IndexOutOfRange {
                index,
                len: self.store.len(),
            });
        }
        self.resynthesize()?;

        #[cfg(feature = "tracing")]
        tracing::info!(index, bypassed, "chain entry bypass changed");
        Ok(())
    }

    /// Switch the input routing mode. Returns whether it changed.
    ///
    /// The graph is only rebuilt on an actual change.
    pub fn set_routing_mode(&mut self, mode: RoutingMode) -> Result<bool, ChainError> {
        if mode == self.mode {
            return Ok(false);
        }
        self.mode = mode;
        self.resynthesize()?;

        #[cfg(feature = "tracing")]
        tracing::info!(mode = %mode, "routing mode changed");
        Ok(true)
    }

    /// Set the master level in dB. Returns the level applied after clamping.
    pub fn set_master_gain_db(&mut self, db: f32) -> f32 {
        self.master.set_gain_db(db)
    }

    /// Set the master level from a linear factor.
    pub fn set_master_gain_linear(&mut self, linear: f32) -> f32 {
        self.master.set_gain_linear(linear)
    }

    /// Set a parameter on an entry's node by key. Returns the value applied.
    pub fn set_param(&mut self, index: usize, key: &str, value: f32) -> Result<f32, ChainError> {
        let entry = self.store.get(index).ok_or(ChainError::IndexOutOfRange {
            index,
            len: self.store.len(),
        })?;
        let mut node = entry.node().lock();
        let param = node.param_index(key).ok_or_else(|| ChainError::UnknownParam {
            entry: index,
            key: key.to_string(),
        })?;
        node.set_param(param, value);
        Ok(node.get_param(param).unwrap_or(value))
    }

    /// Rebuild and commit the graph from the current store.
    pub fn resynthesize(&mut self) -> Result<Arc<CompiledRoute>, ChainError> {
        let route = synth::rebuild(&mut self.engine, &self.store, self.mode, self.endpoints)?;
        self.release_retired();
        Ok(route)
    }

    /// Index of the last entry, or an error if `index` is out of range.
    fn check_index(&self, index: usize) -> Result<usize, ChainError> {
        let len = self.store.len();
        if index < len {
            Ok(len - 1)
        } else {
            Err(ChainError::IndexOutOfRange { index, len })
        }
    }
}

impl core::fmt::Debug for ChainController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChainController")
            .field("entries", &self.store.len())
            .field("mode", &self.mode)
            .field("master", &self.master)
            .field("revision", &self.engine.revision())
            .finish()
    }
}
