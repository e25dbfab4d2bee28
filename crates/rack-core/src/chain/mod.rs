//! The plugin chain: entries, graph synthesis, master gain, and the
//! controller that ties them to the routing engine.
//!
//! ```rust
//! use rack_core::{ChainController, InsertPosition, RoutingMode};
//! # use rack_core::AudioNode;
//! # struct Thru;
//! # impl AudioNode for Thru {
//! #     fn name(&self) -> &str { "Thru" }
//! #     fn prepare(&mut self, _: f32, _: usize) {}
//! #     fn process(&mut self, _: &mut [f32], _: &mut [f32]) {}
//! #     fn reset(&mut self) {}
//! # }
//!
//! let mut chain = ChainController::new(48000.0, 256)?;
//! chain.insert_node(Box::new(Thru), InsertPosition::Append)?;
//! chain.set_routing_mode(RoutingMode::ForcedMono)?;
//!
//! // Input fans channel 0 into both inputs of the first node.
//! let first = chain.entry_node_id(0).unwrap();
//! let into_first: Vec<_> = chain
//!     .connections()
//!     .into_iter()
//!     .filter(|c| c.dest.node == first)
//!     .map(|c| (c.source.channel, c.dest.channel))
//!     .collect();
//! assert_eq!(into_first, [(0, 0), (0, 1)]);
//! # Ok::<(), rack_core::ChainError>(())
//! ```

pub mod command;
pub mod controller;
pub mod entry;
pub mod master_gain;
pub mod snapshot;
pub mod store;
pub mod synth;

pub use command::ChainCommand;
pub use controller::ChainController;
pub use entry::{ChainEntry, EntryId};
pub use master_gain::{MASTER_MAX_DB, MASTER_MIN_DB, MasterGain};
pub use snapshot::{ChainSnapshot, EntrySnapshot};
pub use store::{ChainEntryStore, InsertPosition};
pub use synth::{Endpoints, RoutingMode, rebuild, synthesize, synthesize_path};

use crate::graph::RoutingError;
use crate::plugin::PluginError;

/// Errors raised by chain controller commands.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The index does not name an entry.
    #[error("entry index {index} out of range (chain has {len} entries)")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Chain length at the time of the request.
        len: usize,
    },

    /// The plugin could not be instantiated.
    #[error(transparent)]
    Instantiation(#[from] PluginError),

    /// The entry's node has no parameter with this key.
    #[error("entry {entry} has no parameter '{key}'")]
    UnknownParam {
        /// Entry index.
        entry: usize,
        /// Requested key.
        key: String,
    },

    /// The routing engine rejected the synthesized graph.
    #[error(transparent)]
    Routing(#[from] RoutingError),
}
