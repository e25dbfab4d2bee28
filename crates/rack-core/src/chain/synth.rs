//! Graph synthesis: the full connection set derived from chain order.
//!
//! The rules, applied on every rebuild:
//!
//! 1. The first active (non-bypassed) entry sits directly after Input. With no
//!    active entries, Master Gain does.
//! 2. Active entries are chained in store order, channel 0 → 0 and 1 → 1.
//!    Bypassed entries are skipped entirely.
//! 3. The last active entry feeds Master Gain (or Input does, if none).
//! 4. In [`RoutingMode::ForcedMono`], the first hop out of Input takes Input
//!    channel 0 to both input channels of its destination. Every other hop
//!    uses the plain pairing.
//! 5. Master Gain feeds Output, 0 → 0 and 1 → 1.
//!
//! [`synthesize()`] computes the set as a pure function. [`rebuild()`] installs
//! it: every existing connection is removed, the fresh set is added, and the
//! result is committed as one route.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::graph::{CompiledRoute, Connection, NodeId, RoutingEngine, RoutingError};

use super::store::ChainEntryStore;

/// How Input fans out into the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Input channels map straight through.
    #[default]
    Stereo,
    /// Input channel 0 feeds both channels of the first hop.
    ForcedMono,
}

impl RoutingMode {
    /// `ForcedMono` when `mono` is set.
    pub fn from_mono(mono: bool) -> Self {
        if mono { Self::ForcedMono } else { Self::Stereo }
    }

    /// Whether this is `ForcedMono`.
    pub fn is_mono(self) -> bool {
        self == Self::ForcedMono
    }
}

impl core::fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Stereo => f.write_str("stereo"),
            Self::ForcedMono => f.write_str("mono"),
        }
    }
}

/// The three fixed nodes every route passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    /// External input.
    pub input: NodeId,
    /// Master gain stage.
    pub master_gain: NodeId,
    /// External output.
    pub output: NodeId,
}

/// Connection set for the store's active entries.
pub fn synthesize(store: &ChainEntryStore, mode: RoutingMode, endpoints: Endpoints) -> Vec<Connection> {
    synthesize_path(store.active_nodes(), mode, endpoints)
}

/// Connection set for an explicit sequence of active nodes.
pub fn synthesize_path(
    active: impl IntoIterator<Item = NodeId>,
    mode: RoutingMode,
    endpoints: Endpoints,
) -> Vec<Connection> {
    let mut connections = Vec::new();
    let mut last = endpoints.input;

    for node in active {
        link(&mut connections, last, node, mode, endpoints.input);
        last = node;
    }
    link(&mut connections, last, endpoints.master_gain, mode, endpoints.input);

    connections.push(Connection::new(endpoints.master_gain, 0, endpoints.output, 0));
    connections.push(Connection::new(endpoints.master_gain, 1, endpoints.output, 1));
    connections
}

fn link(out: &mut Vec<Connection>, from: NodeId, to: NodeId, mode: RoutingMode, input: NodeId) {
    if from == input && mode.is_mono() {
        out.push(Connection::new(from, 0, to, 0));
        out.push(Connection::new(from, 0, to, 1));
    } else {
        out.push(Connection::new(from, 0, to, 0));
        out.push(Connection::new(from, 1, to, 1));
    }
}

/// Replace the engine's connections with the synthesized set and commit.
///
/// The audio thread keeps running the previous route until the commit.
///
/// # Errors
///
/// Propagates [`RoutingError`] if the engine rejects a synthesized
/// connection, which only happens when the store names a node the engine
/// does not know.
pub fn rebuild(
    engine: &mut RoutingEngine,
    store: &ChainEntryStore,
    mode: RoutingMode,
    endpoints: Endpoints,
) -> Result<Arc<CompiledRoute>, RoutingError> {
    #[cfg(feature = "tracing")]
    tracing::debug!(mode = %mode, entries = store.len(), "rebuilding chain graph");

    for connection in engine.connections() {
        engine.remove_connection(&connection);
    }
    for connection in synthesize(store, mode, endpoints) {
        engine.add_connection(connection)?;
    }
    let route = engine.commit()?;

    #[cfg(feature = "tracing")]
    log_connections(engine, &route);
    Ok(route)
}

#[cfg(feature = "tracing")]
fn log_connections(engine: &RoutingEngine, route: &CompiledRoute) {
    for connection in route.connections() {
        tracing::trace!(
            source = engine.node_name(connection.source.node).unwrap_or("?"),
            dest = engine.node_name(connection.dest.node).unwrap_or("?"),
            "connection: {connection}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EP: Endpoints = Endpoints {
        input: NodeId(0),
        master_gain: NodeId(2),
        output: NodeId(1),
    };

    fn c(s: u32, sc: usize, d: u32, dc: usize) -> Connection {
        Connection::new(NodeId(s), sc, NodeId(d), dc)
    }

    #[test]
    fn test_empty_stereo() {
        let got = synthesize_path([], RoutingMode::Stereo, EP);
        assert_eq!(got, vec![c(0, 0, 2, 0), c(0, 1, 2, 1), c(2, 0, 1, 0), c(2, 1, 1, 1)]);
    }

    #[test]
    fn test_empty_mono_fans_into_master_gain() {
        let got = synthesize_path([], RoutingMode::ForcedMono, EP);
        assert_eq!(got, vec![c(0, 0, 2, 0), c(0, 0, 2, 1), c(2, 0, 1, 0), c(2, 1, 1, 1)]);
    }

    #[test]
    fn test_single_entry_mono() {
        let got = synthesize_path([NodeId(5)], RoutingMode::ForcedMono, EP);
        assert_eq!(
            got,
            vec![
                c(0, 0, 5, 0),
                c(0, 0, 5, 1),
                c(5, 0, 2, 0),
                c(5, 1, 2, 1),
                c(2, 0, 1, 0),
                c(2, 1, 1, 1),
            ]
        );
    }

    #[test]
    fn test_mono_applies_to_first_hop_only() {
        let got = synthesize_path([NodeId(5), NodeId(6)], RoutingMode::ForcedMono, EP);
        assert_eq!(&got[..2], &[c(0, 0, 5, 0), c(0, 0, 5, 1)]);
        assert_eq!(&got[2..4], &[c(5, 0, 6, 0), c(5, 1, 6, 1)]);
        assert_eq!(&got[4..6], &[c(6, 0, 2, 0), c(6, 1, 2, 1)]);
    }

    #[test]
    fn test_routing_mode_helpers() {
        assert_eq!(RoutingMode::from_mono(true), RoutingMode::ForcedMono);
        assert!(!RoutingMode::from_mono(false).is_mono());
        assert_eq!(RoutingMode::ForcedMono.to_string(), "mono");
        assert_eq!(RoutingMode::default(), RoutingMode::Stereo);
    }
}
