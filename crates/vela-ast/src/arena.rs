//! The node arena and replace protocol.
//!
//! All AST nodes of a session live in one [`NodeArena`] and are addressed
//! by stable [`NodeId`]s. Shared ownership is modeled with a per-slot
//! reference count, and in-place substitution with a forwarding table:
//! `replace(old, new)` rewrites the forwarding entry for `old`, so every
//! holder of `old` — typed links and list slots alike — observes `new`
//! afterwards without the holders knowing about each other.
//!
//! A slot whose payload has been dropped is *dead*; holders that resolve a
//! dead id observe absence and drop the edge. Reference counts never go
//! negative, and a count of zero always implies the payload is gone.

use vela_core::Span;

use crate::node::Node;

/// Stable index of a node in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Slot {
    payload: Option<Node>,
    span: Span,
    refs: u32,
    /// Where this slot was forwarded by `replace`, if anywhere.
    forward: Option<NodeId>,
}

/// Arena of AST nodes with reference counting and forwarding.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
}

impl NodeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new node with a reference count of zero.
    ///
    /// The node stays alive until its first retainer releases it; a node
    /// that never gets retained is owned by whoever allocated it.
    pub fn alloc(&mut self, node: Node, span: Span) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            payload: Some(node),
            span,
            refs: 0,
            forward: None,
        });
        id
    }

    /// Number of slots ever allocated (including dead ones).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the arena has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Follow the forwarding chain from `id` to the current target.
    pub fn resolve(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(next) = self.slots[current.index()].forward {
            current = next;
        }
        current
    }

    /// Follow the forwarding chain and compress it so later resolutions
    /// are single-step.
    pub fn resolve_compress(&mut self, id: NodeId) -> NodeId {
        let target = self.resolve(id);
        let mut current = id;
        while let Some(next) = self.slots[current.index()].forward {
            self.slots[current.index()].forward = Some(target);
            current = next;
        }
        target
    }

    /// Whether the node (after forwarding) still has a payload.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.slots[self.resolve(id).index()].payload.is_some()
    }

    /// Borrow the payload of the node `id` currently designates.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots[self.resolve(id).index()].payload.as_ref()
    }

    /// Mutably borrow the payload of the node `id` currently designates.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let target = self.resolve(id);
        self.slots[target.index()].payload.as_mut()
    }

    /// The source span of the node `id` currently designates.
    pub fn span(&self, id: NodeId) -> Span {
        self.slots[self.resolve(id).index()].span
    }

    /// Set the source span of the node `id` currently designates.
    pub fn set_span(&mut self, id: NodeId, span: Span) {
        let target = self.resolve(id);
        self.slots[target.index()].span = span;
    }

    /// Current reference count of the node `id` designates.
    pub fn refs(&self, id: NodeId) -> u32 {
        self.slots[self.resolve(id).index()].refs
    }

    /// Increment the reference count of the designated node.
    pub fn retain(&mut self, id: NodeId) {
        let target = self.resolve(id);
        let slot = &mut self.slots[target.index()];
        debug_assert!(slot.payload.is_some(), "retain of a dead node");
        slot.refs += 1;
    }

    /// Decrement the reference count; dropping to zero destroys the node
    /// and releases its owned subtree.
    pub fn release(&mut self, id: NodeId) {
        let target = self.resolve(id);
        let slot = &mut self.slots[target.index()];
        if slot.payload.is_none() {
            // Already destroyed; late releases of forwarded-and-dead ids
            // are tolerated so holders can drop edges in any order.
            return;
        }
        debug_assert!(slot.refs > 0, "release below zero");
        slot.refs = slot.refs.saturating_sub(1);
        if slot.refs == 0 {
            self.destroy(target);
        }
    }

    /// Destroy the designated node outright, releasing its owned subtree.
    ///
    /// This is the explicit subtree-delete mechanism; holders that later
    /// resolve the id observe a dead node and drop the edge.
    pub fn destroy(&mut self, id: NodeId) {
        let target = self.resolve(id);
        let Some(payload) = self.slots[target.index()].payload.take() else {
            return;
        };
        self.slots[target.index()].refs = 0;
        let mut children = Vec::new();
        payload.owned_children(&mut |child| children.push(child));
        for child in children {
            self.release(child);
        }
    }

    /// Substitute `new` for `old` everywhere `old` is referenced.
    ///
    /// Copies `old`'s span onto `new`, transfers `old`'s outstanding
    /// reference count, installs the forwarding entry, and destroys the
    /// orphaned old node (releasing its owned children). Returns `false`
    /// without effect when `new` is dead or when `old` and `new` already
    /// designate the same node.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        let old = self.resolve(old);
        let new = self.resolve(new);
        if old == new || self.slots[new.index()].payload.is_none() {
            return false;
        }
        if self.slots[old.index()].payload.is_none() {
            return false;
        }

        self.slots[new.index()].span = self.slots[old.index()].span;
        let migrated = self.slots[old.index()].refs;
        self.slots[old.index()].refs = 0;
        self.slots[new.index()].refs += migrated;

        let payload = self.slots[old.index()].payload.take();
        self.slots[old.index()].forward = Some(new);

        // The orphaned payload's owned children are released after the
        // forwarding entry is installed, so a child forwarded elsewhere
        // resolves correctly during teardown.
        if let Some(payload) = payload {
            let mut children = Vec::new();
            payload.owned_children(&mut |child| children.push(child));
            for child in children {
                self.release(child);
            }
        }
        true
    }

    /// Move the designated node's payload into a fresh slot, leaving a
    /// dummy in its place, and return the fresh id.
    ///
    /// This is the first half of wrapping a node (e.g. inserting a cast):
    /// holders keep pointing at the original slot, which the caller then
    /// refills via [`NodeArena::refill`], while the displaced payload
    /// becomes an ordinary child of the new wrapper. The fresh slot starts
    /// with a reference count of zero.
    pub fn displace(&mut self, id: NodeId) -> Option<NodeId> {
        use crate::node::Expr;
        let target = self.resolve(id);
        let payload = self.slots[target.index()].payload.take()?;
        let span = self.slots[target.index()].span;
        self.slots[target.index()].payload = Some(Node::Expr(Expr::Dummy));
        Some(self.alloc(payload, span))
    }

    /// Refill a displaced slot with a wrapper payload.
    pub fn refill(&mut self, id: NodeId, node: Node) {
        let target = self.resolve(id);
        debug_assert!(
            matches!(
                self.slots[target.index()].payload,
                Some(Node::Expr(crate::node::Expr::Dummy))
            ),
            "refill of a slot that was not displaced"
        );
        self.slots[target.index()].payload = Some(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Expr, LiteralValue};

    fn int_literal(arena: &mut NodeArena, value: i64) -> NodeId {
        let unknown = arena.alloc(Node::Type(crate::node::TypeNode::Unknown), Span::default());
        arena.alloc(
            Node::Expr(Expr::Literal {
                value: LiteralValue::Int(value),
                ty: unknown,
            }),
            Span::default(),
        )
    }

    #[test]
    fn alloc_starts_alive_with_zero_refs() {
        let mut arena = NodeArena::new();
        let id = int_literal(&mut arena, 1);
        assert!(arena.is_alive(id));
        assert_eq!(arena.refs(id), 0);
    }

    #[test]
    fn release_to_zero_destroys() {
        let mut arena = NodeArena::new();
        let id = int_literal(&mut arena, 1);
        arena.retain(id);
        arena.retain(id);
        arena.release(id);
        assert!(arena.is_alive(id));
        arena.release(id);
        assert!(!arena.is_alive(id));
    }

    #[test]
    fn release_never_goes_negative() {
        let mut arena = NodeArena::new();
        let id = int_literal(&mut arena, 1);
        arena.retain(id);
        arena.release(id);
        // Further releases on the dead slot are no-ops.
        arena.release(id);
        assert_eq!(arena.refs(id), 0);
        assert!(!arena.is_alive(id));
    }

    #[test]
    fn replace_forwards_all_holders() {
        let mut arena = NodeArena::new();
        let old = int_literal(&mut arena, 1);
        let new = int_literal(&mut arena, 2);
        arena.retain(old);
        arena.retain(old);
        arena.retain(old);

        assert!(arena.replace(old, new));

        // Every holder of `old` now designates `new`.
        assert_eq!(arena.resolve(old), arena.resolve(new));
        assert_eq!(arena.refs(new), 3);
        match arena.get(old) {
            Some(Node::Expr(Expr::Literal {
                value: LiteralValue::Int(v),
                ..
            })) => assert_eq!(*v, 2),
            other => panic!("expected forwarded literal, got {:?}", other),
        }
    }

    #[test]
    fn replace_copies_span() {
        let mut arena = NodeArena::new();
        let unknown = arena.alloc(Node::Type(crate::node::TypeNode::Unknown), Span::default());
        let old = arena.alloc(
            Node::Expr(Expr::Literal {
                value: LiteralValue::Int(1),
                ty: unknown,
            }),
            Span::new(7, 3, 1),
        );
        let new = int_literal(&mut arena, 2);
        arena.replace(old, new);
        assert_eq!(arena.span(new), Span::new(7, 3, 1));
    }

    #[test]
    fn replace_with_dead_target_is_ignored() {
        let mut arena = NodeArena::new();
        let old = int_literal(&mut arena, 1);
        let dead = int_literal(&mut arena, 2);
        arena.destroy(dead);
        assert!(!arena.replace(old, dead));
        assert!(arena.is_alive(old));
    }

    #[test]
    fn self_replace_is_ignored() {
        let mut arena = NodeArena::new();
        let id = int_literal(&mut arena, 1);
        assert!(!arena.replace(id, id));
        assert!(arena.is_alive(id));
    }

    #[test]
    fn second_replace_chases_the_chain() {
        let mut arena = NodeArena::new();
        let a = int_literal(&mut arena, 1);
        let b = int_literal(&mut arena, 2);
        let c = int_literal(&mut arena, 3);
        arena.retain(a);
        arena.replace(a, b);
        arena.replace(b, c);
        assert_eq!(arena.resolve(a), arena.resolve(c));
        assert_eq!(arena.refs(c), 1);
    }

    #[test]
    fn path_compression_preserves_target() {
        let mut arena = NodeArena::new();
        let a = int_literal(&mut arena, 1);
        let b = int_literal(&mut arena, 2);
        let c = int_literal(&mut arena, 3);
        arena.replace(a, b);
        arena.replace(b, c);
        let resolved = arena.resolve_compress(a);
        assert_eq!(resolved, arena.resolve(c));
        assert_eq!(arena.resolve(a), resolved);
    }

    #[test]
    fn displace_and_refill_wraps_in_place() {
        let mut arena = NodeArena::new();
        let id = int_literal(&mut arena, 42);
        arena.retain(id);

        let inner = arena.displace(id).unwrap();
        assert!(matches!(arena.get(id), Some(Node::Expr(Expr::Dummy))));
        arena.retain(inner);
        let unknown = arena.alloc(Node::Type(crate::node::TypeNode::Unknown), Span::default());
        arena.refill(
            id,
            Node::Expr(Expr::Cast {
                operand: crate::link::Link::from_retained(inner),
                ty: unknown,
                explicit: false,
            }),
        );

        // The holder's id now designates the cast, whose operand is the
        // original literal; no forwarding cycle was created.
        match arena.get(id) {
            Some(Node::Expr(Expr::Cast { operand, .. })) => {
                let operand = operand.raw_id().unwrap();
                assert_ne!(arena.resolve(operand), arena.resolve(id));
                assert!(matches!(
                    arena.get(operand),
                    Some(Node::Expr(Expr::Literal { .. }))
                ));
            }
            other => panic!("expected cast, got {:?}", other),
        }
    }
}
