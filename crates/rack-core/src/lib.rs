//! Rack Core - plugin chain model and routing engine
//!
//! This crate holds everything the rack host needs to turn an ordered list of
//! plugins into a running audio graph, independent of any audio backend.
//!
//! # Core Abstractions
//!
//! ## Nodes
//!
//! - [`AudioNode`] - Object-safe trait for anything the graph can process
//! - [`NodeHandle`] / [`WeakNode`] - Single owner, weak references for routing
//!
//! ## Routing
//!
//! - [`RoutingEngine`] - Port-level connection graph, validated on the control thread
//! - [`RouteProcessor`] - Executes committed routes on the audio thread
//! - [`CompiledRoute`] - Immutable, atomically published topology
//!
//! ## Chain
//!
//! - [`ChainController`] - Command surface; resynthesizes the graph after every mutation
//! - [`ChainEntryStore`] - Ordered entries, the authoritative user configuration
//! - [`synthesize()`] / [`rebuild()`] - Connection set derived from chain order
//! - [`MasterGain`] - Always-present output level stage
//!
//! ## Plugins
//!
//! - [`PluginAdapter`] - Instantiate, check layout, prepare
//! - [`NodeFactory`] - Descriptor to node
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`db_to_gain`], [`gain_to_db`]
//! - [`SmoothedParam`] - Zipper-free parameter changes
//! - [`ParamDescriptor`] - Parameter metadata for editor surfaces
//!
//! # Design Principles
//!
//! - **Whole-topology rebuilds**: every chain mutation installs a fresh connection set
//! - **Atomic publication**: the audio thread sees the old route or the new one
//! - **Non-blocking audio path**: nodes are `try_lock`ed, never waited on
//!
//! # Features
//!
//! - `tracing`: emit `tracing` events for routing and chain mutations

pub mod chain;
pub mod graph;
pub mod math;
pub mod node;
pub mod param;
pub mod param_info;
pub mod plugin;

pub use chain::{
    ChainCommand, ChainController, ChainEntry, ChainEntryStore, ChainError, ChainSnapshot,
    Endpoints, EntryId, EntrySnapshot, InsertPosition, MASTER_MAX_DB, MASTER_MIN_DB, MasterGain,
    RoutingMode, rebuild, synthesize, synthesize_path,
};
pub use graph::{
    CompiledRoute, Connection, NodeId, NodeRole, Port, RouteProcessor, RoutingEngine,
    RoutingError, StereoBuffer,
};
pub use math::{SILENCE_DB, db_to_gain, db_to_linear, gain_to_db, linear_to_db, one_pole_coeff};
pub use node::{AudioNode, BusLayout, NodeHandle, WeakNode};
pub use param::SmoothedParam;
pub use param_info::{ParamDescriptor, ParamUnit};
pub use plugin::{
    DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, NodeFactory, PluginAdapter, PluginDescriptor,
    PluginError, PreparedNode,
};
