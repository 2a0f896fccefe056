//! Ordered collections of counted node references.

use std::fmt;
use std::marker::PhantomData;

use crate::arena::{NodeArena, NodeId};
use crate::node::Payload;

/// A change observed by a [`NodeList`].
///
/// Distinguishes append (no old value), removal (no new value), and
/// in-place replacement (both present).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Appended(NodeId),
    Removed(NodeId),
    Replaced(NodeId, NodeId),
}

/// An ordered sequence of counted references to nodes of category `T`.
///
/// Used wherever a node owns many children of one kind: statements,
/// arguments, parameters, declarations. Slots follow the arena's
/// forwarding table exactly like a [`crate::link::Link`], so an in-place
/// `replace` is observed by every list holding the node. A slot whose
/// target has been destroyed is purged by [`NodeList::compact`] — the
/// "replaced with nothing" signal is the list's structural delete, its
/// only deletion mechanism besides explicit removal.
pub struct NodeList<T> {
    items: Vec<NodeId>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Payload> NodeList<T> {
    /// An empty list.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Number of slots (dead slots included until compacted).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no slots.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a node, retaining it.
    pub fn push(&mut self, arena: &mut NodeArena, id: NodeId) -> ListChange {
        arena.retain(id);
        self.items.push(id);
        ListChange::Appended(id)
    }

    /// Append an id whose reference the caller has already counted (e.g.
    /// an edge stolen from a node being rewritten).
    pub fn push_retained(&mut self, id: NodeId) {
        self.items.push(id);
    }

    /// The stored ids, unresolved.
    pub fn raw_ids(&self) -> &[NodeId] {
        &self.items
    }

    /// The slot at `index`, resolved; `None` if dead or out of range.
    pub fn get(&self, arena: &NodeArena, index: usize) -> Option<NodeId> {
        let id = *self.items.get(index)?;
        arena.is_alive(id).then(|| arena.resolve(id))
    }

    /// Iterate the live, resolved ids in order.
    pub fn iter<'a>(&'a self, arena: &'a NodeArena) -> impl Iterator<Item = NodeId> + 'a {
        self.items
            .iter()
            .filter(|id| arena.is_alive(**id))
            .map(|id| arena.resolve(*id))
    }

    /// Collect the live, resolved ids.
    pub fn ids(&self, arena: &NodeArena) -> Vec<NodeId> {
        self.iter(arena).collect()
    }

    /// Remove (and release) every slot whose resolved payload matches.
    pub fn remove_where(
        &mut self,
        arena: &mut NodeArena,
        mut pred: impl FnMut(&NodeArena, NodeId) -> bool,
    ) -> Vec<ListChange> {
        let mut changes = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for id in std::mem::take(&mut self.items) {
            let resolved = arena.resolve(id);
            if arena.is_alive(resolved) && pred(arena, resolved) {
                arena.release(resolved);
                changes.push(ListChange::Removed(resolved));
            } else {
                kept.push(id);
            }
        }
        self.items = kept;
        changes
    }

    /// Chase forwarding on every slot and purge dead ones, reporting each
    /// observed change.
    pub fn compact(&mut self, arena: &mut NodeArena) -> Vec<ListChange> {
        let mut changes = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for id in std::mem::take(&mut self.items) {
            let resolved = arena.resolve_compress(id);
            if !arena.is_alive(resolved) {
                changes.push(ListChange::Removed(id));
            } else if resolved != id {
                changes.push(ListChange::Replaced(id, resolved));
                kept.push(resolved);
            } else {
                kept.push(id);
            }
        }
        self.items = kept;
        changes
    }

    /// Release every slot and clear the list.
    pub fn clear(&mut self, arena: &mut NodeArena) {
        for id in std::mem::take(&mut self.items) {
            arena.release(id);
        }
    }
}

impl<T: Payload> Default for NodeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for NodeList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}
