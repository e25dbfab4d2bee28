//! Routing engine: control-side topology, validation, and atomic publication.
//!
//! [`RoutingEngine`] is owned by the control thread. It keeps the node table
//! and the working connection set, validates every mutation, and on
//! [`commit()`](RoutingEngine::commit) compiles the working set into a
//! [`CompiledRoute`] that it swaps into the shared slot read by
//! [`RouteProcessor`]s.
//!
//! Mutations between two commits are invisible to the audio thread. A caller
//! that removes every connection and adds a fresh set, then commits, publishes
//! the new topology in one step.
//!
//! Slots of removed nodes are recycled once a commit has published a route
//! without them. Compiled routes carry their own weak node references, so a
//! recycled [`NodeId`] never redirects a route that is still in flight.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::node::{BusLayout, NodeHandle, WeakNode};

use super::RoutingError;
use super::port::{Connection, NodeId, Port};
use super::processor::RouteProcessor;
use super::route::{ChannelSource, CompiledRoute, InputMap, RouteStep};

/// The role of a node in the routing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// External audio input. Exactly one per engine.
    Input,
    /// External audio output. Exactly one per engine.
    Output,
    /// A processing node.
    Processor,
}

enum NodeKind {
    Input,
    Output,
    Processor(WeakNode),
}

struct NodeData {
    kind: NodeKind,
    name: String,
    layout: BusLayout,
}

impl NodeData {
    fn role(&self) -> NodeRole {
        match self.kind {
            NodeKind::Input => NodeRole::Input,
            NodeKind::Output => NodeRole::Output,
            NodeKind::Processor(_) => NodeRole::Processor,
        }
    }

    /// Channels this node emits. Output emits nothing.
    fn output_channels(&self) -> usize {
        match self.kind {
            NodeKind::Output => 0,
            _ => self.layout.outputs,
        }
    }

    /// Channels this node accepts. Input accepts nothing.
    fn input_channels(&self) -> usize {
        match self.kind {
            NodeKind::Input => 0,
            _ => self.layout.inputs,
        }
    }
}

/// Buffers a new processor allocates beyond the current node count.
const POOL_HEADROOM: usize = 16;

/// Port-level audio routing graph with atomic route publication.
pub struct RoutingEngine {
    nodes: Vec<Option<NodeData>>,
    /// Slots free for reuse.
    free: Vec<u32>,
    /// Slots emptied since the last commit.
    retired: Vec<u32>,
    /// Last finished revision of every processor handed out.
    finished: Mutex<Vec<Weak<AtomicU64>>>,
    connections: BTreeSet<Connection>,
    published: Arc<ArcSwap<CompiledRoute>>,
    input: NodeId,
    output: NodeId,
    sample_rate: f32,
    block_size: usize,
    revision: u64,
}

impl RoutingEngine {
    /// Engine with its Input and Output endpoints and no connections.
    ///
    /// The published route renders silence until the first commit.
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        let mut engine = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            retired: Vec::new(),
            finished: Mutex::new(Vec::new()),
            connections: BTreeSet::new(),
            published: Arc::new(ArcSwap::from_pointee(CompiledRoute::empty())),
            input: NodeId(0),
            output: NodeId(0),
            sample_rate,
            block_size: block_size.max(1),
            revision: 0,
        };
        engine.input = engine.insert_node(NodeKind::Input, "Audio Input".to_string());
        engine.output = engine.insert_node(NodeKind::Output, "Audio Output".to_string());
        engine
    }

    /// The Input endpoint.
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// The Output endpoint.
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Sample rate nodes are prepared for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Largest block a processor will hand to a node.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    // --- Nodes ---

    /// Register a processing node. The engine keeps only a weak reference.
    pub fn add_node(&mut self, node: &NodeHandle) -> NodeId {
        let name = node.name();
        let id = self.insert_node(NodeKind::Processor(node.downgrade()), name);
        #[cfg(feature = "tracing")]
        tracing::debug!("route_add: node {id}");
        id
    }

    /// Remove a processing node and every connection touching it.
    ///
    /// The endpoints cannot be removed. Takes effect on the next commit.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), RoutingError> {
        match self.node(id) {
            None => return Err(RoutingError::NodeNotFound(id)),
            Some(data) if data.role() != NodeRole::Processor => {
                return Err(RoutingError::EndpointRemoval(id));
            }
            Some(_) => {}
        }
        self.connections.retain(|c| !c.touches(id));
        self.nodes[id.0 as usize] = None;
        self.retired.push(id.0);
        #[cfg(feature = "tracing")]
        tracing::debug!("route_remove: node {id}");
        Ok(())
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Role of a node.
    pub fn role(&self, id: NodeId) -> Option<NodeRole> {
        self.node(id).map(NodeData::role)
    }

    /// Display name of a node.
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    /// Number of live nodes, endpoints included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    // --- Connections ---

    /// Working connection set, sorted.
    pub fn connections(&self) -> Vec<Connection> {
        self.connections.iter().copied().collect()
    }

    /// Number of connections in the working set.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether the working set contains `connection`.
    pub fn is_connected(&self, connection: &Connection) -> bool {
        self.connections.contains(connection)
    }

    /// Add a connection to the working set.
    ///
    /// # Errors
    ///
    /// Unknown nodes, out-of-range channels, edges into Input or out of
    /// Output, duplicates, and edges that would close a cycle are rejected.
    pub fn add_connection(&mut self, connection: Connection) -> Result<(), RoutingError> {
        let Connection { source, dest } = connection;
        let src = self
            .node(source.node)
            .ok_or(RoutingError::NodeNotFound(source.node))?;
        let dst = self
            .node(dest.node)
            .ok_or(RoutingError::NodeNotFound(dest.node))?;

        if src.role() == NodeRole::Output {
            return Err(RoutingError::InvalidConnection(format!(
                "{} is an output endpoint and has no outgoing channels",
                source.node
            )));
        }
        if dst.role() == NodeRole::Input {
            return Err(RoutingError::InvalidConnection(format!(
                "{} is an input endpoint and has no incoming channels",
                dest.node
            )));
        }
        if source.channel >= src.output_channels() {
            return Err(RoutingError::ChannelOutOfRange {
                port: source,
                channels: src.output_channels(),
            });
        }
        if dest.channel >= dst.input_channels() {
            return Err(RoutingError::ChannelOutOfRange {
                port: dest,
                channels: dst.input_channels(),
            });
        }
        if self.connections.contains(&connection) {
            return Err(RoutingError::DuplicateConnection(connection));
        }
        if source.node == dest.node || self.can_reach(dest.node, source.node) {
            return Err(RoutingError::CycleDetected(connection));
        }

        self.connections.insert(connection);
        #[cfg(feature = "tracing")]
        tracing::debug!("route_connect: {connection}");
        Ok(())
    }

    /// Remove a connection from the working set. Returns whether it existed.
    pub fn remove_connection(&mut self, connection: &Connection) -> bool {
        let removed = self.connections.remove(connection);
        if removed {
            #[cfg(feature = "tracing")]
            tracing::debug!("route_disconnect: {connection}");
        }
        removed
    }

    // --- Publication ---

    /// Compile the working set and publish it to every [`RouteProcessor`].
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::CycleDetected`] if the working set is not
    /// acyclic, which [`add_connection()`](Self::add_connection) prevents.
    pub fn commit(&mut self) -> Result<Arc<CompiledRoute>, RoutingError> {
        let mut route = self.compile()?;
        self.revision += 1;
        route.revision = self.revision;
        let route = Arc::new(route);
        self.published.store(Arc::clone(&route));
        self.free.append(&mut self.retired);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            revision = self.revision,
            connections = route.connections.len(),
            steps = route.steps.len(),
            "route_commit"
        );
        Ok(route)
    }

    /// The route currently visible to the audio thread.
    pub fn current_route(&self) -> Arc<CompiledRoute> {
        self.published.load_full()
    }

    /// Number of commits so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Audio-side executor reading this engine's published routes.
    ///
    /// Its buffer pool is sized for the current node table plus headroom, so
    /// the audio thread only allocates if the graph grows well past that.
    pub fn processor(&self) -> RouteProcessor {
        let finished = Arc::new(AtomicU64::new(self.revision));
        let mut all = self.finished.lock();
        all.retain(|w| w.strong_count() > 0);
        all.push(Arc::downgrade(&finished));
        RouteProcessor::new(
            Arc::clone(&self.published),
            self.block_size,
            self.nodes.len() + POOL_HEADROOM,
            finished,
        )
    }

    /// Oldest revision any live processor may still be rendering.
    ///
    /// Each processor reports the revision of its last completed block; one
    /// that has not run yet counts as current when it was created. With no
    /// live processors this is the latest revision.
    pub fn settled_revision(&self) -> u64 {
        let mut all = self.finished.lock();
        all.retain(|w| w.strong_count() > 0);
        all.iter()
            .filter_map(Weak::upgrade)
            .map(|f| f.load(Ordering::Acquire))
            .min()
            .unwrap_or(self.revision)
    }

    // --- Internals ---

    fn insert_node(&mut self, kind: NodeKind, name: String) -> NodeId {
        let data = NodeData {
            kind,
            name,
            layout: BusLayout::STEREO,
        };
        if let Some(slot) = self.free.pop() {
            self.nodes[slot as usize] = Some(data);
            return NodeId(slot);
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(data));
        id
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Whether `to` is reachable from `from` along existing connections.
    fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            for c in &self.connections {
                if c.source.node == current && !visited.contains(&c.dest.node) {
                    queue.push_back(c.dest.node);
                }
            }
        }
        false
    }

    /// Kahn sort over the nodes that take part in routing, then one buffer
    /// slot per node that produces signal.
    fn compile(&self) -> Result<CompiledRoute, RoutingError> {
        let mut participants: BTreeSet<NodeId> = BTreeSet::from([self.input, self.output]);
        for c in &self.connections {
            participants.insert(c.source.node);
            participants.insert(c.dest.node);
        }

        let mut in_degree: BTreeMap<NodeId, usize> =
            participants.iter().map(|&id| (id, 0)).collect();
        let mut successors: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for c in &self.connections {
            if successors
                .entry(c.source.node)
                .or_default()
                .insert(c.dest.node)
            {
                *in_degree.entry(c.dest.node).or_default() += 1;
            }
        }

        let mut ready: BTreeSet<NodeId> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order = Vec::with_capacity(participants.len());
        while let Some(id) = ready.pop_first() {
            order.push(id);
            for next in successors.get(&id).into_iter().flatten() {
                if let Some(d) = in_degree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(*next);
                    }
                }
            }
        }
        if order.len() != participants.len() {
            let culprit = self
                .connections
                .iter()
                .find(|c| !order.contains(&c.dest.node))
                .copied()
                .unwrap_or(Connection::new(self.input, 0, self.output, 0));
            return Err(RoutingError::CycleDetected(culprit));
        }

        let mut buffer_of: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut steps = Vec::with_capacity(order.len());
        for id in order {
            let Some(data) = self.node(id) else {
                return Err(RoutingError::NodeNotFound(id));
            };
            match &data.kind {
                NodeKind::Input => {
                    let buffer = buffer_of.len();
                    buffer_of.insert(id, buffer);
                    steps.push(RouteStep::WriteInput { buffer });
                }
                NodeKind::Processor(node) => {
                    let inputs = self.input_map(id, &buffer_of);
                    let output = buffer_of.len();
                    buffer_of.insert(id, output);
                    steps.push(RouteStep::Process {
                        node_id: id,
                        node: node.clone(),
                        inputs,
                        output,
                    });
                }
                NodeKind::Output => {
                    let inputs = self.input_map(id, &buffer_of);
                    steps.push(RouteStep::ReadOutput { inputs });
                }
            }
        }

        Ok(CompiledRoute {
            steps,
            buffer_count: buffer_of.len(),
            connections: self.connections(),
            revision: 0,
        })
    }

    fn input_map(&self, dest: NodeId, buffer_of: &BTreeMap<NodeId, usize>) -> InputMap {
        let mut inputs: InputMap = [Vec::new(), Vec::new()];
        for c in self.connections.iter().filter(|c| c.dest.node == dest) {
            let Port { node, channel } = c.source;
            if let (Some(&buffer), Some(slot)) = (buffer_of.get(&node), inputs.get_mut(c.dest.channel))
            {
                slot.push(ChannelSource { buffer, channel });
            }
        }
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::AudioNode;

    struct Thru;

    impl AudioNode for Thru {
        fn name(&self) -> &str {
            "Thru"
        }
        fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}
        fn process(&mut self, _left: &mut [f32], _right: &mut [f32]) {}
        fn reset(&mut self) {}
    }

    fn thru() -> NodeHandle {
        NodeHandle::new(Box::new(Thru))
    }

    #[test]
    fn test_new_has_endpoints_only() {
        let engine = RoutingEngine::new(48000.0, 64);
        assert_eq!(engine.node_count(), 2);
        assert_eq!(engine.role(engine.input()), Some(NodeRole::Input));
        assert_eq!(engine.role(engine.output()), Some(NodeRole::Output));
        assert_eq!(engine.connection_count(), 0);
        assert_eq!(engine.revision(), 0);
    }

    #[test]
    fn test_add_connection_validates_endpoints() {
        let mut engine = RoutingEngine::new(48000.0, 64);
        let (i, o) = (engine.input(), engine.output());
        assert!(matches!(
            engine.add_connection(Connection::new(o, 0, i, 0)),
            Err(RoutingError::InvalidConnection(_))
        ));
        assert!(matches!(
            engine.add_connection(Connection::new(i, 2, o, 0)),
            Err(RoutingError::ChannelOutOfRange { .. })
        ));
        assert!(matches!(
            engine.add_connection(Connection::new(i, 0, NodeId(99), 0)),
            Err(RoutingError::NodeNotFound(_))
        ));
        engine.add_connection(Connection::new(i, 0, o, 0)).unwrap();
        assert!(matches!(
            engine.add_connection(Connection::new(i, 0, o, 0)),
            Err(RoutingError::DuplicateConnection(_))
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut engine = RoutingEngine::new(48000.0, 64);
        let (ha, hb) = (thru(), thru());
        let a = engine.add_node(&ha);
        let b = engine.add_node(&hb);
        engine.add_connection(Connection::new(a, 0, b, 0)).unwrap();
        assert!(matches!(
            engine.add_connection(Connection::new(b, 1, a, 1)),
            Err(RoutingError::CycleDetected(_))
        ));
        assert!(matches!(
            engine.add_connection(Connection::new(a, 0, a, 1)),
            Err(RoutingError::CycleDetected(_))
        ));
    }

    #[test]
    fn test_remove_node_drops_its_connections() {
        let mut engine = RoutingEngine::new(48000.0, 64);
        let h = thru();
        let n = engine.add_node(&h);
        engine
            .add_connection(Connection::new(engine.input(), 0, n, 0))
            .unwrap();
        engine
            .add_connection(Connection::new(n, 0, engine.output(), 0))
            .unwrap();
        engine.remove_node(n).unwrap();
        assert!(!engine.contains(n));
        assert_eq!(engine.connection_count(), 0);
        assert!(matches!(
            engine.remove_node(n),
            Err(RoutingError::NodeNotFound(_))
        ));
        assert!(matches!(
            engine.remove_node(engine.input()),
            Err(RoutingError::EndpointRemoval(_))
        ));
    }

    #[test]
    fn test_mutations_invisible_until_commit() {
        let mut engine = RoutingEngine::new(48000.0, 64);
        let (i, o) = (engine.input(), engine.output());
        engine.add_connection(Connection::new(i, 0, o, 0)).unwrap();
        assert!(engine.current_route().connections().is_empty());

        engine.commit().unwrap();
        assert_eq!(engine.current_route().connections().len(), 1);
        assert_eq!(engine.current_route().revision(), 1);

        engine.remove_connection(&Connection::new(i, 0, o, 0));
        assert_eq!(engine.current_route().connections().len(), 1);
    }

    #[test]
    fn test_compile_orders_topologically() {
        let mut engine = RoutingEngine::new(48000.0, 64);
        let (ha, hb) = (thru(), thru());
        let a = engine.add_node(&ha);
        let b = engine.add_node(&hb);
        // wire b before a in id order to make sure order comes from edges
        engine
            .add_connection(Connection::new(engine.input(), 0, b, 0))
            .unwrap();
        engine.add_connection(Connection::new(b, 0, a, 0)).unwrap();
        engine
            .add_connection(Connection::new(a, 0, engine.output(), 0))
            .unwrap();
        let route = engine.commit().unwrap();
        assert_eq!(route.processing_order(), vec![b, a]);
        assert_eq!(route.buffer_count(), 3);
        assert_eq!(route.step_count(), 4);
    }

    #[test]
    fn test_removed_slots_are_reused_after_commit() {
        let mut engine = RoutingEngine::new(48000.0, 64);
        let h = thru();
        let first = engine.add_node(&h);
        engine.remove_node(first).unwrap();
        let again = engine.add_node(&h);
        assert_ne!(again, first, "slot reused before a commit");
        engine.remove_node(again).unwrap();
        engine.commit().unwrap();

        let table = engine.nodes.len();
        for _ in 0..100 {
            let id = engine.add_node(&h);
            engine
                .add_connection(Connection::new(engine.input(), 0, id, 0))
                .unwrap();
            engine.commit().unwrap();
            engine.remove_node(id).unwrap();
            engine.commit().unwrap();
        }
        assert_eq!(engine.nodes.len(), table);
        assert_eq!(engine.node_count(), 2);
    }

    #[test]
    fn test_isolated_nodes_are_not_scheduled() {
        let mut engine = RoutingEngine::new(48000.0, 64);
        let h = thru();
        engine.add_node(&h);
        let route = engine.commit().unwrap();
        assert!(route.processing_order().is_empty());
    }
}
