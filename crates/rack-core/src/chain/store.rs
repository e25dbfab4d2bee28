//! The ordered chain entry store.
//!
//! Index order is signal order: index 0 is processed first after Input. The
//! store knows nothing about routing; [`ChainController`](super::ChainController)
//! resynthesizes the graph after each successful mutation.

use crate::graph::NodeId;

use super::entry::{ChainEntry, EntryId};

/// Where [`ChainEntryStore::insert`] places a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPosition {
    /// After the last entry.
    #[default]
    Append,
    /// At this index; out-of-range indices append.
    At(usize),
}

impl InsertPosition {
    /// Map a signed position: negative values append.
    ///
    /// ```rust
    /// use rack_core::InsertPosition;
    ///
    /// assert_eq!(InsertPosition::from_signed(-1), InsertPosition::Append);
    /// assert_eq!(InsertPosition::from_signed(2), InsertPosition::At(2));
    /// ```
    pub fn from_signed(position: i64) -> Self {
        usize::try_from(position).map_or(Self::Append, Self::At)
    }
}

impl From<Option<usize>> for InsertPosition {
    fn from(position: Option<usize>) -> Self {
        position.map_or(Self::Append, Self::At)
    }
}

/// Ordered sequence of chain entries.
#[derive(Debug, Default)]
pub struct ChainEntryStore {
    entries: Vec<ChainEntry>,
    next_id: u64,
}

impl ChainEntryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&ChainEntry> {
        self.entries.get(index)
    }

    /// Entries in signal order.
    pub fn iter(&self) -> impl Iterator<Item = &ChainEntry> {
        self.entries.iter()
    }

    /// Current index of the entry with `id`.
    pub fn position_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Node ids of the non-bypassed entries, in signal order.
    pub fn active_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries
            .iter()
            .filter(|e| !e.is_bypassed())
            .map(ChainEntry::node_id)
    }

    /// Insert an entry, assigning its identity. Returns the index it landed at.
    pub fn insert(&mut self, mut entry: ChainEntry, position: InsertPosition) -> usize {
        debug_assert!(
            self.entries.iter().all(|e| e.node_id() != entry.node_id()),
            "node {} already in chain",
            entry.node_id()
        );
        entry.id = EntryId(self.next_id);
        self.next_id += 1;

        match position {
            InsertPosition::At(index) if index < self.entries.len() => {
                self.entries.insert(index, entry);
                index
            }
            _ => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        }
    }

    /// Remove and return the entry at `index`. `None` if out of range.
    pub fn remove(&mut self, index: usize) -> Option<ChainEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Relocate the entry at `from` to `to`, shifting the entries between.
    ///
    /// Returns `false` without change if either index is out of range.
    /// `from == to` succeeds without change.
    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        let len = self.entries.len();
        if from >= len || to >= len {
            return false;
        }
        if from != to {
            let entry = self.entries.remove(from);
            self.entries.insert(to, entry);
        }
        true
    }

    /// Set the bypass flag of the entry at `index`.
    ///
    /// Returns `false` without change if the index is out of range.
    pub fn set_bypass(&mut self, index: usize, bypassed: bool) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.set_bypassed(bypassed);
                true
            }
            None => false,
        }
    }
}
