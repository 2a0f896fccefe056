//! Access-control checks.
//!
//! An entity with neither PRIVATE nor PROTECTED is always visible. A
//! restricted entity is visible from inside the module that declared it,
//! or when it is a member of the enclosing type or any of the type's
//! lexically enclosing parents. The two violation kinds are reported
//! distinctly.

use vela_core::{Modifiers, ResolveError, Span};

use vela_ast::{Decl, Node, NodeArena, NodeId};

/// The outcome of a visibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    /// Invisible: declared PRIVATE elsewhere.
    Private,
    /// Invisible: declared PROTECTED elsewhere.
    Protected,
}

impl Visibility {
    /// Whether the reference is legal.
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }

    /// The error a violation maps to, if any.
    pub fn into_error(self, name: &str, span: Span) -> Option<ResolveError> {
        match self {
            Visibility::Visible => None,
            Visibility::Private => Some(ResolveError::PrivateAccess {
                name: name.to_string(),
                span,
            }),
            Visibility::Protected => Some(ResolveError::ProtectedAccess {
                name: name.to_string(),
                span,
            }),
        }
    }
}

/// Check whether `decl` may be referenced from the current context.
///
/// `declared_here` is true when the declaration belongs to the module
/// under analysis; it only grants access to module-level and block-scoped
/// declarations. Restricted type members are reachable solely through the
/// enclosing-type check, even inside their own module. `enclosing_types`
/// is the lexical stack of type declarations around the reference,
/// innermost last.
pub fn visibility_of(
    arena: &NodeArena,
    decl: NodeId,
    declared_here: bool,
    enclosing_types: &[NodeId],
) -> Visibility {
    let decl = arena.resolve(decl);
    let Some(Node::Decl(d)) = arena.get(decl) else {
        return Visibility::Visible;
    };
    let modifiers = d.modifiers();
    if !modifiers.is_restricted() {
        return Visibility::Visible;
    }
    let owner_type = d.parent().map(|p| arena.resolve(p)).filter(|&p| {
        matches!(arena.get(p), Some(Node::Decl(Decl::Class(_))))
    });
    if declared_here && owner_type.is_none() {
        return Visibility::Visible;
    }

    // A member of the enclosing type, or of any type lexically around it,
    // is reachable; walk each stack entry's parent chain as well.
    if let Some(owner) = owner_type {
        for &enclosing in enclosing_types.iter().rev() {
            let mut current = Some(arena.resolve(enclosing));
            while let Some(ty) = current {
                if ty == owner {
                    return Visibility::Visible;
                }
                current = match arena.get(ty) {
                    Some(Node::Decl(Decl::Class(c))) => c.parent.map(|p| arena.resolve(p)),
                    _ => None,
                };
            }
        }
    }

    if modifiers.contains(Modifiers::PRIVATE) {
        Visibility::Private
    } else {
        Visibility::Protected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ast::node::{ClassDecl, TypeKind, VariableDecl};
    use vela_ast::{Link, NodeList, Session};
    use vela_core::Span;

    fn class(session: &mut Session, name: &str, parent: Option<NodeId>) -> NodeId {
        session.arena_mut().alloc(
            Node::Decl(Decl::Class(ClassDecl {
                name: name.into(),
                modifiers: Modifiers::empty(),
                kind: TypeKind::Class,
                base: Link::empty(),
                body: NodeList::new(),
                ty: None,
                parent,
            })),
            Span::default(),
        )
    }

    fn field(session: &mut Session, name: &str, modifiers: Modifiers, parent: NodeId) -> NodeId {
        session.arena_mut().alloc(
            Node::Decl(Decl::Variable(VariableDecl {
                name: name.into(),
                modifiers,
                declared_type: Link::empty(),
                init: Link::empty(),
                parent: Some(parent),
            })),
            Span::default(),
        )
    }

    #[test]
    fn unrestricted_is_always_visible() {
        let mut session = Session::new();
        let owner = class(&mut session, "C", None);
        let member = field(&mut session, "x", Modifiers::PUBLIC, owner);
        assert_eq!(
            visibility_of(session.arena(), member, false, &[]),
            Visibility::Visible
        );
    }

    #[test]
    fn private_member_visible_only_in_enclosing_type() {
        let mut session = Session::new();
        let owner = class(&mut session, "C", None);
        let other = class(&mut session, "D", None);
        let member = field(&mut session, "x", Modifiers::PRIVATE, owner);

        assert_eq!(
            visibility_of(session.arena(), member, false, &[]),
            Visibility::Private
        );
        // The declaring module grants no access to type members; only the
        // enclosing-type stack does.
        assert_eq!(
            visibility_of(session.arena(), member, true, &[]),
            Visibility::Private
        );
        assert_eq!(
            visibility_of(session.arena(), member, false, &[owner]),
            Visibility::Visible
        );
        assert_eq!(
            visibility_of(session.arena(), member, false, &[other]),
            Visibility::Private
        );
    }

    #[test]
    fn private_module_level_decl_visible_in_its_module() {
        let mut session = Session::new();
        let decl = session.arena_mut().alloc(
            Node::Decl(Decl::Variable(VariableDecl {
                name: "hidden".into(),
                modifiers: Modifiers::PRIVATE,
                declared_type: Link::empty(),
                init: Link::empty(),
                parent: None,
            })),
            Span::default(),
        );
        assert_eq!(
            visibility_of(session.arena(), decl, true, &[]),
            Visibility::Visible
        );
        assert_eq!(
            visibility_of(session.arena(), decl, false, &[]),
            Visibility::Private
        );
    }

    #[test]
    fn lexically_enclosing_parent_grants_access() {
        let mut session = Session::new();
        let outer = class(&mut session, "Outer", None);
        let inner = class(&mut session, "Inner", Some(outer));
        let member = field(&mut session, "x", Modifiers::PROTECTED, outer);

        // From inside Inner, Outer's member is reachable via the parent
        // chain of the enclosing-type stack.
        assert_eq!(
            visibility_of(session.arena(), member, false, &[inner]),
            Visibility::Visible
        );
    }

    #[test]
    fn protected_reports_as_protected() {
        let mut session = Session::new();
        let owner = class(&mut session, "C", None);
        let member = field(&mut session, "x", Modifiers::PROTECTED, owner);
        let vis = visibility_of(session.arena(), member, false, &[]);
        assert_eq!(vis, Visibility::Protected);
        assert!(matches!(
            vis.into_error("x", Span::default()),
            Some(ResolveError::ProtectedAccess { .. })
        ));
    }
}
