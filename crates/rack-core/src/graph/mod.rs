//! Port-level routing engine.
//!
//! Nodes are joined channel by channel: a [`Connection`] runs from one output
//! channel of a node to one input channel of another. That granularity is what
//! lets the host fan a single input channel out to both inputs of the first
//! node in forced-mono mode.
//!
//! # Architecture
//!
//! The engine is split in two halves:
//!
//! - [`RoutingEngine`]: owned by the control thread. Holds the node table and
//!   the working connection set, validates mutations (unknown nodes, channel
//!   ranges, duplicates, cycles), and compiles on
//!   [`commit()`](RoutingEngine::commit).
//! - [`RouteProcessor`]: owned by the audio thread. Loads the latest
//!   [`CompiledRoute`] from a shared `ArcSwap` once per block and executes it.
//!
//! Because only `commit()` publishes, any number of mutations between two
//! commits reaches the audio thread as a single atomic topology change.
//!
//! # Example
//!
//! ```rust
//! use rack_core::graph::{Connection, RoutingEngine};
//!
//! let mut engine = RoutingEngine::new(48000.0, 256);
//! let (input, output) = (engine.input(), engine.output());
//! engine.add_connection(Connection::new(input, 0, output, 0))?;
//! engine.add_connection(Connection::new(input, 1, output, 1))?;
//! engine.commit()?;
//!
//! let mut processor = engine.processor();
//! let (mut l, mut r) = ([0.0; 4], [0.0; 4]);
//! processor.process_block(&[0.5; 4], &[0.25; 4], &mut l, &mut r);
//! assert_eq!(l, [0.5; 4]);
//! # Ok::<(), rack_core::graph::RoutingError>(())
//! ```

pub mod buffer;
pub mod engine;
pub mod port;
pub mod processor;
pub mod route;

pub use buffer::StereoBuffer;
pub use engine::{NodeRole, RoutingEngine};
pub use port::{Connection, NodeId, Port};
pub use processor::RouteProcessor;
pub use route::CompiledRoute;

/// Errors raised by routing engine mutations.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// The node is not registered with the engine.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// Input and Output are permanent.
    #[error("endpoint {0} cannot be removed")]
    EndpointRemoval(NodeId),

    /// A port names a channel the node does not have.
    #[error("port {port} out of range (node has {channels} channels)")]
    ChannelOutOfRange {
        /// Offending port.
        port: Port,
        /// Channel count on that side of the node.
        channels: usize,
    },

    /// Structurally invalid edge, such as one leading into Input.
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// The edge already exists.
    #[error("connection {0} already exists")]
    DuplicateConnection(Connection),

    /// The edge would close a cycle.
    #[error("connection {0} would create a cycle")]
    CycleDetected(Connection),
}
