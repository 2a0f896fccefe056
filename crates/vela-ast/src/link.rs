//! Typed, counted edges between nodes.

use std::fmt;
use std::marker::PhantomData;

use crate::arena::{NodeArena, NodeId};
use crate::node::Payload;

/// A typed, counted edge from a holder to a node of category `T`, or unset.
///
/// Constructing through [`Link::to`] retains the target; [`Link::rebind`]
/// retargets cleanly; [`Link::release`] drops the edge. The arena is passed
/// explicitly (arena-passing style), so a `Link` cannot release in `Drop` —
/// owners release their links when they themselves are destroyed, which the
/// arena drives through [`crate::node::Node::owned_children`].
///
/// The stored id is never rewritten behind the holder's back: resolution
/// goes through the arena's forwarding table, so a `replace` elsewhere is
/// observed on the next access.
pub struct Link<T> {
    id: Option<NodeId>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Payload> Link<T> {
    /// An unset link.
    pub fn empty() -> Self {
        Self {
            id: None,
            _marker: PhantomData,
        }
    }

    /// Create a link to `id`, retaining the target.
    pub fn to(arena: &mut NodeArena, id: NodeId) -> Self {
        arena.retain(id);
        Self {
            id: Some(id),
            _marker: PhantomData,
        }
    }

    /// Adopt an id whose reference the caller has already counted.
    pub fn from_retained(id: NodeId) -> Self {
        Self {
            id: Some(id),
            _marker: PhantomData,
        }
    }

    /// Whether the link is unset.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }

    /// The stored id, unresolved (may be forwarded or dead).
    pub fn raw_id(&self) -> Option<NodeId> {
        self.id
    }

    /// The id of the live node this link currently designates.
    pub fn target(&self, arena: &NodeArena) -> Option<NodeId> {
        let id = self.id?;
        arena.is_alive(id).then(|| arena.resolve(id))
    }

    /// Borrow the target's payload, projected into `T`.
    pub fn get<'a>(&self, arena: &'a NodeArena) -> Option<&'a T> {
        self.id.and_then(|id| arena.get(id)).and_then(T::of)
    }

    /// Mutably borrow the target's payload, projected into `T`.
    pub fn get_mut<'a>(&self, arena: &'a mut NodeArena) -> Option<&'a mut T> {
        self.id.and_then(|id| arena.get_mut(id)).and_then(T::of_mut)
    }

    /// Retarget: release the current target (if any) and retain `id`.
    pub fn rebind(&mut self, arena: &mut NodeArena, id: Option<NodeId>) {
        if let Some(old) = self.id.take() {
            arena.release(old);
        }
        if let Some(new) = id {
            arena.retain(new);
        }
        self.id = id;
    }

    /// Release the current target and unset the link.
    pub fn release(&mut self, arena: &mut NodeArena) {
        self.rebind(arena, None);
    }

    /// Chase forwarding: update the stored id to the current target, and
    /// drop the edge if the target has been destroyed. Returns the
    /// (old, new) pair when anything changed.
    pub fn refresh(&mut self, arena: &mut NodeArena) -> Option<(NodeId, Option<NodeId>)> {
        let id = self.id?;
        let resolved = arena.resolve_compress(id);
        if !arena.is_alive(resolved) {
            self.id = None;
            return Some((id, None));
        }
        if resolved != id {
            self.id = Some(resolved);
            return Some((id, Some(resolved)));
        }
        None
    }

    /// A second counted link to the same target.
    pub fn duplicate(&self, arena: &mut NodeArena) -> Self {
        match self.id {
            Some(id) if arena.is_alive(id) => Link::to(arena, arena.resolve(id)),
            _ => Link::empty(),
        }
    }
}

impl<T> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Link({:?})", id),
            None => write!(f, "Link(-)"),
        }
    }
}

impl<T: Payload> Default for Link<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Expr, Node};
    use vela_core::Span;

    fn name_expr(arena: &mut NodeArena, name: &str) -> NodeId {
        arena.alloc(
            Node::Expr(Expr::UnresolvedName { name: name.into() }),
            Span::default(),
        )
    }

    #[test]
    fn to_retains_and_release_drops() {
        let mut arena = NodeArena::new();
        let id = name_expr(&mut arena, "a");
        let mut link: Link<Expr> = Link::to(&mut arena, id);
        assert_eq!(arena.refs(id), 1);
        assert!(matches!(
            link.get(&arena),
            Some(Expr::UnresolvedName { .. })
        ));
        link.release(&mut arena);
        assert!(link.is_empty());
        assert!(!arena.is_alive(id));
    }

    #[test]
    fn rebind_swaps_counts() {
        let mut arena = NodeArena::new();
        let a = name_expr(&mut arena, "a");
        let b = name_expr(&mut arena, "b");
        arena.retain(a);
        arena.retain(b);
        let mut link: Link<Expr> = Link::to(&mut arena, a);
        link.rebind(&mut arena, Some(b));
        assert_eq!(arena.refs(a), 1);
        assert_eq!(arena.refs(b), 2);
    }

    #[test]
    fn link_observes_replace() {
        let mut arena = NodeArena::new();
        let old = name_expr(&mut arena, "old");
        let new = name_expr(&mut arena, "new");
        let link: Link<Expr> = Link::to(&mut arena, old);

        arena.replace(old, new);

        match link.get(&arena) {
            Some(Expr::UnresolvedName { name }) => assert_eq!(name, "new"),
            other => panic!("expected forwarded target, got {:?}", other),
        }
        assert_eq!(link.target(&arena), Some(arena.resolve(new)));
    }

    #[test]
    fn refresh_reports_migration_and_death() {
        let mut arena = NodeArena::new();
        let old = name_expr(&mut arena, "old");
        let new = name_expr(&mut arena, "new");
        let mut link: Link<Expr> = Link::to(&mut arena, old);

        arena.replace(old, new);
        let change = link.refresh(&mut arena);
        assert_eq!(change, Some((old, Some(new))));

        arena.destroy(new);
        let change = link.refresh(&mut arena);
        assert_eq!(change, Some((new, None)));
        assert!(link.is_empty());
    }

    #[test]
    fn wrong_category_projects_to_none() {
        let mut arena = NodeArena::new();
        let id = name_expr(&mut arena, "a");
        let link: Link<crate::node::Stmt> = Link::to(&mut arena, id);
        assert!(link.get(&arena).is_none());
    }
}
