//! Type queries over resolved and partially-resolved expressions.

use vela_ast::{BuiltIn, Decl, Expr, Node, NodeArena, NodeId, Session, TypeNode};

/// The built-in kind of a type node, if it is one.
pub fn builtin_of(arena: &NodeArena, ty: NodeId) -> Option<BuiltIn> {
    match arena.get(ty) {
        Some(Node::Type(TypeNode::BuiltIn(b))) => Some(*b),
        _ => None,
    }
}

/// Whether `ty` is the generic unknown (recovery) type or an unresolved
/// placeholder.
pub fn is_unknown(arena: &NodeArena, ty: NodeId) -> bool {
    matches!(
        arena.get(ty),
        Some(Node::Type(TypeNode::Unknown | TypeNode::Unresolved { .. })) | None
    )
}

/// The declared type of a variable, parameter, or field; unknown when the
/// declaration has not been resolved yet.
pub fn decl_type(session: &Session, decl: NodeId) -> NodeId {
    let arena = session.arena();
    let target = match arena.get(decl) {
        Some(Node::Decl(Decl::Variable(v))) => v.declared_type.target(arena),
        Some(Node::Decl(Decl::Parameter(p))) => p.declared_type.target(arena),
        _ => None,
    };
    target.unwrap_or(session.unknown_type())
}

/// The declared return type of a function; unknown when unresolved.
pub fn return_type(session: &Session, func: NodeId) -> NodeId {
    let arena = session.arena();
    match arena.get(func) {
        Some(Node::Decl(Decl::Function(f))) => f
            .return_type
            .target(arena)
            .unwrap_or(session.unknown_type()),
        _ => session.unknown_type(),
    }
}

/// The declared parameter types of a function, unknown for any parameter
/// whose type has not been resolved.
pub fn param_types(session: &Session, func: NodeId) -> Vec<NodeId> {
    let arena = session.arena();
    let Some(Node::Decl(Decl::Function(f))) = arena.get(func) else {
        return Vec::new();
    };
    f.params
        .ids(arena)
        .into_iter()
        .map(|param| decl_type(session, param))
        .collect()
}

/// The interned function type of a function declaration's signature.
pub fn signature_type(session: &mut Session, func: NodeId) -> NodeId {
    let params = param_types(session, func);
    let ret = return_type(session, func);
    session.function_type(params, ret)
}

/// The type a property yields: the getter's return type, or failing that
/// the setter's value-parameter type.
pub fn property_type(session: &Session, prop: NodeId) -> NodeId {
    let arena = session.arena();
    let Some(Node::Decl(Decl::Property(p))) = arena.get(prop) else {
        return session.unknown_type();
    };
    if let Some(getter) = p.getter.target(arena) {
        return return_type(session, getter);
    }
    if let Some(setter) = p.setter.target(arena) {
        if let Some(value) = param_types(session, setter).into_iter().next_back() {
            return value;
        }
    }
    session.unknown_type()
}

/// The static type of an expression, as far as resolution has determined
/// it; placeholders type as unknown.
pub fn expr_type(session: &mut Session, expr: NodeId) -> NodeId {
    enum Query {
        Ty(NodeId),
        Decl(NodeId),
        Func(NodeId),
        Prop(NodeId),
        CallOf(Option<NodeId>),
        ArrayOf(NodeId),
        Of(NodeId),
        Bool,
        Unknown,
    }

    let query = {
        let arena = session.arena();
        match arena.get(expr) {
            Some(Node::Expr(e)) => match e {
                Expr::Literal { ty, .. } => Query::Ty(*ty),
                Expr::VariableRef { decl } => Query::Decl(*decl),
                Expr::FieldRef { field, .. } => Query::Decl(*field),
                Expr::FunctionRef { func } => Query::Func(*func),
                Expr::MethodRef { func, .. } => Query::Func(*func),
                Expr::PropertyRef { prop, .. } => Query::Prop(*prop),
                Expr::TypeRef { ty } => Query::Ty(*ty),
                Expr::EnumValueRef { ty, .. } => Query::Ty(*ty),
                Expr::This { ty } => Query::Ty(*ty),
                Expr::Call { callee, .. } => Query::CallOf(callee.target(arena)),
                Expr::Cast { ty, .. } => Query::Ty(*ty),
                Expr::New { class_ty, .. } => Query::Ty(*class_ty),
                Expr::ArrayLit { elem_ty, .. } => Query::ArrayOf(*elem_ty),
                Expr::Assign { value, .. } => match value.target(arena) {
                    Some(v) => Query::Of(v),
                    None => Query::Unknown,
                },
                Expr::CompoundAssign { target, .. } => match target.target(arena) {
                    Some(t) => Query::Of(t),
                    None => Query::Unknown,
                },
                Expr::Not { .. } | Expr::OrderedOrEqual { .. } => Query::Bool,
                Expr::GroupRef { .. }
                | Expr::ModuleRef { .. }
                | Expr::Dummy
                | Expr::UnresolvedName { .. }
                | Expr::UnresolvedMember { .. }
                | Expr::UnresolvedBinary { .. }
                | Expr::UnresolvedUnary { .. }
                | Expr::UnresolvedIndex { .. }
                | Expr::UnresolvedNew { .. } => Query::Unknown,
            },
            _ => Query::Unknown,
        }
    };

    match query {
        Query::Ty(ty) => session.arena().resolve(ty),
        Query::Decl(decl) => decl_type(session, decl),
        Query::Func(func) => signature_type(session, func),
        Query::Prop(prop) => property_type(session, prop),
        Query::CallOf(callee) => match callee {
            Some(callee) => {
                let func = {
                    let arena = session.arena();
                    match arena.get(callee) {
                        Some(Node::Expr(Expr::FunctionRef { func })) => Some(*func),
                        Some(Node::Expr(Expr::MethodRef { func, .. })) => Some(*func),
                        _ => None,
                    }
                };
                match func {
                    Some(func) => return_type(session, func),
                    None => session.unknown_type(),
                }
            }
            None => session.unknown_type(),
        },
        Query::ArrayOf(elem) => session.array_of(elem),
        Query::Of(inner) => expr_type(session, inner),
        Query::Bool => session.builtin(BuiltIn::Bool),
        Query::Unknown => session.unknown_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ast::link::Link;
    use vela_ast::list::NodeList;
    use vela_ast::node::{FunctionDecl, FunctionKind, LiteralValue, VariableDecl};
    use vela_core::{Modifiers, Span};

    #[test]
    fn literal_types_as_annotated() {
        let mut session = Session::new();
        let int32 = session.builtin(BuiltIn::Int32);
        let lit = session.arena_mut().alloc(
            Node::Expr(Expr::Literal {
                value: LiteralValue::Int(1),
                ty: int32,
            }),
            Span::default(),
        );
        assert_eq!(expr_type(&mut session, lit), int32);
    }

    #[test]
    fn variable_ref_types_as_declared() {
        let mut session = Session::new();
        let int64 = session.builtin(BuiltIn::Int64);
        let link = Link::to(session.arena_mut(), int64);
        let decl = session.arena_mut().alloc(
            Node::Decl(Decl::Variable(VariableDecl {
                name: "x".into(),
                modifiers: Modifiers::empty(),
                declared_type: link,
                init: Link::empty(),
                parent: None,
            })),
            Span::default(),
        );
        let expr = session
            .arena_mut()
            .alloc(Node::Expr(Expr::VariableRef { decl }), Span::default());
        assert_eq!(expr_type(&mut session, expr), int64);
    }

    #[test]
    fn function_ref_types_as_signature() {
        let mut session = Session::new();
        let void = session.builtin(BuiltIn::Void);
        let ret = Link::to(session.arena_mut(), void);
        let func = session.arena_mut().alloc(
            Node::Decl(Decl::Function(FunctionDecl {
                name: "f".into(),
                modifiers: Modifiers::empty(),
                kind: FunctionKind::Free,
                params: NodeList::new(),
                return_type: ret,
                body: Link::empty(),
                initializer: Link::empty(),
                parent: None,
            })),
            Span::default(),
        );
        let expr = session
            .arena_mut()
            .alloc(Node::Expr(Expr::FunctionRef { func }), Span::default());
        let expected = session.function_type(vec![], void);
        assert_eq!(expr_type(&mut session, expr), expected);
    }

    #[test]
    fn placeholders_type_as_unknown() {
        let mut session = Session::new();
        let expr = session.arena_mut().alloc(
            Node::Expr(Expr::UnresolvedName { name: "x".into() }),
            Span::default(),
        );
        assert_eq!(expr_type(&mut session, expr), session.unknown_type());
    }
}
