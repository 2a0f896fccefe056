//! Named-entity helpers for declarations.
//!
//! Every declaration carries a simple (single-identifier) name, a modifier
//! set, and an optional parent entity; the qualified (dotted) name is
//! derived by walking parents, prefixed with the owning module's name.

use vela_core::{Modifiers, QualifiedName};

use crate::arena::{NodeArena, NodeId};
use crate::node::{Decl, Node};

impl Decl {
    /// The entity's simple name; always a single identifier.
    pub fn name(&self) -> &str {
        match self {
            Decl::Variable(v) => &v.name,
            Decl::Parameter(p) => &p.name,
            Decl::Function(f) => &f.name,
            Decl::Class(c) => &c.name,
            Decl::Property(p) => &p.name,
            Decl::EnumValue(e) => &e.name,
        }
    }

    /// The entity's modifier set; parameters and enum values have none.
    pub fn modifiers(&self) -> Modifiers {
        match self {
            Decl::Variable(v) => v.modifiers,
            Decl::Parameter(_) => Modifiers::empty(),
            Decl::Function(f) => f.modifiers,
            Decl::Class(c) => c.modifiers,
            Decl::Property(p) => p.modifiers,
            Decl::EnumValue(_) => Modifiers::empty(),
        }
    }

    /// The declaring entity, if any (non-owning).
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Decl::Variable(v) => v.parent,
            Decl::Parameter(p) => p.parent,
            Decl::Function(f) => f.parent,
            Decl::Class(c) => c.parent,
            Decl::Property(p) => p.parent,
            Decl::EnumValue(e) => e.parent,
        }
    }

    /// Attach the entity to a declaring parent.
    pub fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Decl::Variable(v) => v.parent = parent,
            Decl::Parameter(p) => p.parent = parent,
            Decl::Function(f) => f.parent = parent,
            Decl::Class(c) => c.parent = parent,
            Decl::Property(p) => p.parent = parent,
            Decl::EnumValue(e) => e.parent = parent,
        }
    }

    /// Whether this declaration is a function (of any kind).
    pub fn is_function(&self) -> bool {
        matches!(self, Decl::Function(_))
    }
}

/// Derive the qualified name of a declared entity by walking its parent
/// chain, outermost first, optionally prefixed with the module name.
pub fn qualified_name(
    arena: &NodeArena,
    module_name: Option<&QualifiedName>,
    id: NodeId,
) -> QualifiedName {
    let mut names = Vec::new();
    let mut current = Some(id);
    while let Some(id) = current {
        match arena.get(id) {
            Some(Node::Decl(decl)) => {
                names.push(decl.name().to_string());
                current = decl.parent();
            }
            _ => break,
        }
    }
    names.reverse();

    let mut segments: Vec<String> = module_name
        .map(|m| m.segments().to_vec())
        .unwrap_or_default();
    segments.extend(names);
    QualifiedName::from_segments(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Link;
    use crate::list::NodeList;
    use crate::node::{ClassDecl, TypeKind, VariableDecl};
    use vela_core::Span;

    #[test]
    fn qualified_name_walks_parents() {
        let mut arena = NodeArena::new();
        let class = arena.alloc(
            Node::Decl(Decl::Class(ClassDecl {
                name: "Player".into(),
                modifiers: Modifiers::empty(),
                kind: TypeKind::Class,
                base: Link::empty(),
                body: NodeList::new(),
                ty: None,
                parent: None,
            })),
            Span::default(),
        );
        let field = arena.alloc(
            Node::Decl(Decl::Variable(VariableDecl {
                name: "health".into(),
                modifiers: Modifiers::empty(),
                declared_type: Link::empty(),
                init: Link::empty(),
                parent: Some(class),
            })),
            Span::default(),
        );

        let module = QualifiedName::parse("game.entities");
        let qn = qualified_name(&arena, Some(&module), field);
        assert_eq!(qn.to_string(), "game.entities.Player.health");
        assert_eq!(qn.name(), "health");
    }

    #[test]
    fn simple_name_without_module() {
        let mut arena = NodeArena::new();
        let class = arena.alloc(
            Node::Decl(Decl::Class(ClassDecl {
                name: "Player".into(),
                modifiers: Modifiers::empty(),
                kind: TypeKind::Class,
                base: Link::empty(),
                body: NodeList::new(),
                ty: None,
                parent: None,
            })),
            Span::default(),
        );
        assert_eq!(qualified_name(&arena, None, class).to_string(), "Player");
    }
}
