//! The audio processing node abstraction.
//!
//! Every unit the host can place in the routing graph implements
//! [`AudioNode`]: plugins created through a [`NodeFactory`](crate::NodeFactory),
//! processors handed in directly by the host, and the master gain stage.
//!
//! # Ownership
//!
//! A node lives behind a [`NodeHandle`], a strong reference owned by exactly
//! one party (a chain entry, or the master gain stage). The routing engine and
//! the compiled routes executed on the audio thread only hold [`WeakNode`]s,
//! so dropping the owning handle ends the node's life regardless of which
//! routes still mention it.
//!
//! # Real-time access
//!
//! Node state sits behind a `parking_lot::Mutex`. The audio thread never
//! blocks on it: [`WeakNode::try_process`] gives up and reports `false` when
//! the control thread currently holds the lock.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

use crate::param_info::ParamDescriptor;

/// Channel layout of a node's input and output buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusLayout {
    /// Number of input channels.
    pub inputs: usize,
    /// Number of output channels.
    pub outputs: usize,
}

impl BusLayout {
    /// Two inputs, two outputs. The only layout the chain routes.
    pub const STEREO: Self = Self {
        inputs: 2,
        outputs: 2,
    };
}

impl core::fmt::Display for BusLayout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} in / {} out", self.inputs, self.outputs)
    }
}

/// Object-safe trait for anything the routing graph can process.
///
/// Processing is in place on per-channel slices of equal length, at most the
/// block size passed to [`prepare()`](Self::prepare).
pub trait AudioNode: Send {
    /// Display name.
    fn name(&self) -> &str;

    /// Configure for a sample rate and maximum block size.
    ///
    /// Called before the node first processes audio and whenever the host
    /// changes either value. May allocate.
    fn prepare(&mut self, sample_rate: f32, block_size: usize);

    /// Process one block in place.
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);

    /// Clear internal state (filter memories, envelopes).
    fn reset(&mut self);

    /// Whether the node can run with the given bus layout.
    fn supports_layout(&self, layout: BusLayout) -> bool {
        layout == BusLayout::STEREO
    }

    /// Whether the node offers an interactive editor surface.
    fn has_editor(&self) -> bool {
        self.param_count() > 0
    }

    /// Number of parameters exposed to the editor surface.
    fn param_count(&self) -> usize {
        0
    }

    /// Parameter metadata by index.
    fn param_info(&self, _index: usize) -> Option<ParamDescriptor> {
        None
    }

    /// Current parameter value by index.
    fn get_param(&self, _index: usize) -> Option<f32> {
        None
    }

    /// Set a parameter. Values are clamped to the descriptor range.
    ///
    /// Returns `false` if the index does not exist.
    fn set_param(&mut self, _index: usize, _value: f32) -> bool {
        false
    }

    /// Look up a parameter index by its descriptor key.
    fn param_index(&self, key: &str) -> Option<usize> {
        (0..self.param_count()).find(|&i| self.param_info(i).is_some_and(|d| d.key == key))
    }
}

type SharedNode = Arc<Mutex<Box<dyn AudioNode>>>;

/// Owning handle to a node.
///
/// Not `Clone`: there is exactly one owner per node.
pub struct NodeHandle {
    inner: SharedNode,
}

impl NodeHandle {
    /// Take ownership of a node.
    pub fn new(node: Box<dyn AudioNode>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(node)),
        }
    }

    /// Non-owning reference for the routing engine.
    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Lock the node for control-side access.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn AudioNode>> {
        self.inner.lock()
    }

    /// Snapshot of the node's display name.
    pub fn name(&self) -> String {
        self.inner.lock().name().to_string()
    }

    /// Whether two handles refer to the same node.
    pub fn same_node(&self, other: &NodeHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl core::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeHandle").finish_non_exhaustive()
    }
}

/// Non-owning reference to a node.
#[derive(Clone)]
pub struct WeakNode {
    inner: Weak<Mutex<Box<dyn AudioNode>>>,
}

impl WeakNode {
    /// Whether the owning handle is still alive.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Process one block if the node is alive and not locked elsewhere.
    ///
    /// Returns `false` (buffers untouched) otherwise.
    pub fn try_process(&self, left: &mut [f32], right: &mut [f32]) -> bool {
        let Some(node) = self.inner.upgrade() else {
            return false;
        };
        let Some(mut guard) = node.try_lock() else {
            return false;
        };
        guard.process(left, right);
        true
    }
}

impl core::fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WeakNode")
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scale {
        factor: f32,
    }

    impl AudioNode for Scale {
        fn name(&self) -> &str {
            "Scale"
        }

        fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}

        fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
            for s in left.iter_mut().chain(right.iter_mut()) {
                *s *= self.factor;
            }
        }

        fn reset(&mut self) {}
    }

    #[test]
    fn weak_node_processes_while_owner_alive() {
        let handle = NodeHandle::new(Box::new(Scale { factor: 2.0 }));
        let weak = handle.downgrade();
        let mut l = [1.0, 2.0];
        let mut r = [3.0, 4.0];
        assert!(weak.try_process(&mut l, &mut r));
        assert_eq!(l, [2.0, 4.0]);
        assert_eq!(r, [6.0, 8.0]);
    }

    #[test]
    fn weak_node_dies_with_owner() {
        let handle = NodeHandle::new(Box::new(Scale { factor: 2.0 }));
        let weak = handle.downgrade();
        drop(handle);
        assert!(!weak.is_alive());
        let mut l = [1.0];
        let mut r = [1.0];
        assert!(!weak.try_process(&mut l, &mut r));
        assert_eq!(l, [1.0]);
    }

    #[test]
    fn locked_node_is_skipped() {
        let handle = NodeHandle::new(Box::new(Scale { factor: 0.0 }));
        let weak = handle.downgrade();
        let guard = handle.lock();
        let mut l = [1.0];
        let mut r = [1.0];
        assert!(!weak.try_process(&mut l, &mut r));
        drop(guard);
        assert!(weak.try_process(&mut l, &mut r));
        assert_eq!(l, [0.0]);
    }

    #[test]
    fn default_capabilities() {
        let node = Scale { factor: 1.0 };
        assert!(node.supports_layout(BusLayout::STEREO));
        assert!(!node.supports_layout(BusLayout {
            inputs: 1,
            outputs: 2
        }));
        assert!(!node.has_editor());
        assert_eq!(node.param_index("gain"), None);
    }
}
