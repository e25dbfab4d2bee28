//! Node identities and port-level connections.

use serde::Serialize;

/// Identifier of a node in the routing engine.
///
/// Assigned sequentially and never reused within one engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// One channel of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Port {
    /// Node the channel belongs to.
    pub node: NodeId,
    /// Channel index, 0 = left, 1 = right.
    pub channel: usize,
}

impl Port {
    /// Construct a port.
    #[inline]
    pub const fn new(node: NodeId, channel: usize) -> Self {
        Self { node, channel }
    }
}

impl core::fmt::Display for Port {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.node.0, self.channel)
    }
}

/// Directed edge from an output channel to an input channel.
///
/// Ordering is by source then destination, which keeps connection listings
/// stable across rebuilds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Connection {
    /// Output channel the signal leaves from.
    pub source: Port,
    /// Input channel the signal arrives at.
    pub dest: Port,
}

impl Connection {
    /// `(source, source_channel) → (dest, dest_channel)`.
    #[inline]
    pub const fn new(source: NodeId, source_channel: usize, dest: NodeId, dest_channel: usize) -> Self {
        Self {
            source: Port::new(source, source_channel),
            dest: Port::new(dest, dest_channel),
        }
    }

    /// Whether either end touches `node`.
    #[inline]
    pub fn touches(&self, node: NodeId) -> bool {
        self.source.node == node || self.dest.node == node
    }
}

impl core::fmt::Display for Connection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} → {}", self.source, self.dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let c = Connection::new(NodeId(0), 1, NodeId(3), 0);
        assert_eq!(c.to_string(), "0.1 → 3.0");
        assert_eq!(NodeId(7).to_string(), "NodeId(7)");
    }

    #[test]
    fn ordering_is_source_major() {
        let a = Connection::new(NodeId(0), 0, NodeId(5), 0);
        let b = Connection::new(NodeId(0), 1, NodeId(2), 0);
        let c = Connection::new(NodeId(1), 0, NodeId(0), 0);
        let mut v = vec![c, b, a];
        v.sort();
        assert_eq!(v, vec![a, b, c]);
    }

    #[test]
    fn touches_either_end() {
        let c = Connection::new(NodeId(2), 0, NodeId(4), 1);
        assert!(c.touches(NodeId(2)));
        assert!(c.touches(NodeId(4)));
        assert!(!c.touches(NodeId(3)));
    }
}
