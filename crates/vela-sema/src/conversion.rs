//! Implicit and explicit conversion rules.
//!
//! `can_convert` is the predicate overload resolution filters with;
//! `convert` performs the conversion, rewriting the expression in place:
//! an overload-group placeholder collapses to the matching overload, and
//! any other type change wraps the expression in a cast node through the
//! replace protocol.

use vela_core::{Problems, ResolveError};

use vela_ast::{
    BuiltIn, ClassDecl, Decl, Expr, Link, LiteralValue, Node, NodeArena, NodeId, Session, TypeNode,
};

use crate::types::{self, expr_type, is_unknown, signature_type};

// ============================================================================
// Type-level rules
// ============================================================================

/// Whether a built-in type converts to another built-in type.
///
/// Implicit conversions: identity, integer widening within the same
/// signedness, integer to floating-point, and `float` to `double`.
/// Explicit conversions additionally allow narrowing, cross-signedness,
/// and floating-point to integer. `void`, `bool`, and `string` convert
/// only to themselves.
pub fn can_convert_builtin(from: BuiltIn, to: BuiltIn, explicit: bool) -> bool {
    if from == to {
        return true;
    }
    if from.is_integer() && to.is_integer() {
        let widening = from.is_signed_integer() == to.is_signed_integer()
            && to.bit_width() >= from.bit_width();
        return widening || explicit;
    }
    if from.is_integer() && to.is_float() {
        return true;
    }
    if from.is_float() && to.is_float() {
        return to == BuiltIn::Double || explicit;
    }
    if from.is_float() && to.is_integer() {
        return explicit;
    }
    false
}

/// Whether an integer literal's value fits the target integer type's range.
pub fn literal_fits(value: i64, target: BuiltIn) -> bool {
    match target {
        BuiltIn::Int8 => i8::try_from(value).is_ok(),
        BuiltIn::Int16 => i16::try_from(value).is_ok(),
        BuiltIn::Int32 => i32::try_from(value).is_ok(),
        BuiltIn::Int64 => true,
        BuiltIn::UInt8 => u8::try_from(value).is_ok(),
        BuiltIn::UInt16 => u16::try_from(value).is_ok(),
        BuiltIn::UInt32 => u32::try_from(value).is_ok(),
        BuiltIn::UInt64 => value >= 0,
        _ => false,
    }
}

/// Whether `ancestor` appears on `ty`'s base-class chain (or is `ty`).
pub fn is_base_of(arena: &NodeArena, ancestor: NodeId, ty: NodeId) -> bool {
    let ancestor = arena.resolve(ancestor);
    let mut current = arena.resolve(ty);
    loop {
        if current == ancestor {
            return true;
        }
        let Some(Node::Type(TypeNode::Class { decl })) = arena.get(current) else {
            return false;
        };
        let base = match arena.get(*decl) {
            Some(Node::Decl(Decl::Class(ClassDecl { base, .. }))) => base.target(arena),
            _ => None,
        };
        match base {
            Some(base) => current = base,
            None => return false,
        }
    }
}

/// Whether the type `from` converts to `to` under the given strictness.
pub fn can_convert_types(session: &Session, from: NodeId, to: NodeId, explicit: bool) -> bool {
    let arena = session.arena();
    let from = arena.resolve(from);
    let to = arena.resolve(to);
    if from == to || is_unknown(arena, from) || is_unknown(arena, to) {
        return true;
    }
    if let (Some(f), Some(t)) = (types::builtin_of(arena, from), types::builtin_of(arena, to)) {
        return can_convert_builtin(f, t, explicit);
    }
    if explicit && is_class(arena, from) && is_class(arena, to) {
        return is_base_of(arena, to, from) || is_base_of(arena, from, to);
    }
    false
}

fn is_class(arena: &NodeArena, ty: NodeId) -> bool {
    matches!(arena.get(ty), Some(Node::Type(TypeNode::Class { .. })))
}

// ============================================================================
// Expression-level rules
// ============================================================================

/// Whether the expression converts to `target`.
///
/// Beyond the type-level rules this honors the literal carve-out (an
/// integer literal converts implicitly to any narrower integer type whose
/// range contains its value) and overload-group placeholders (convertible
/// when a candidate's signature matches the target function type).
pub fn can_convert(session: &mut Session, expr: NodeId, target: NodeId, explicit: bool) -> bool {
    let target = session.arena().resolve(target);

    enum Special {
        Group(Vec<NodeId>),
        IntLiteral(i64),
        None,
    }
    let special = match session.arena().get(expr) {
        Some(Node::Expr(Expr::GroupRef { candidates, .. })) => Special::Group(candidates.clone()),
        Some(Node::Expr(Expr::Literal {
            value: LiteralValue::Int(v),
            ..
        })) => Special::IntLiteral(*v),
        _ => Special::None,
    };

    match special {
        Special::Group(candidates) => candidates
            .iter()
            .any(|c| signature_type(session, *c) == target),
        Special::IntLiteral(v) => {
            if let Some(t) = types::builtin_of(session.arena(), target) {
                if t.is_integer() && literal_fits(v, t) {
                    return true;
                }
            }
            let from = expr_type(session, expr);
            can_convert_types(session, from, target, explicit)
        }
        Special::None => {
            let from = expr_type(session, expr);
            can_convert_types(session, from, target, explicit)
        }
    }
}

/// Convert the expression to `target` in place.
///
/// An overload-group placeholder collapses to the single candidate whose
/// signature matches; anything else that changes type is wrapped in a
/// cast node, displacing the original payload into a fresh slot so the
/// node never becomes its own child during the swap. Appends a diagnostic
/// and returns `false` when the conversion is not possible.
pub fn convert(
    session: &mut Session,
    problems: &mut Problems,
    expr: NodeId,
    target: NodeId,
    explicit: bool,
) -> bool {
    let target = session.arena().resolve(target);

    if let Some(Node::Expr(Expr::GroupRef { .. })) = session.arena().get(expr) {
        return convert_group(session, problems, expr, target);
    }

    let from = expr_type(session, expr);
    let arena = session.arena();
    if arena.resolve(from) == target || is_unknown(arena, from) || is_unknown(arena, target) {
        return true;
    }
    if !can_convert(session, expr, target, explicit) {
        let err = ResolveError::IncompatibleType {
            from: session.type_display(from),
            to: session.type_display(target),
            span: session.arena().span(expr),
        };
        problems.error(err);
        return false;
    }

    let arena = session.arena_mut();
    let Some(inner) = arena.displace(expr) else {
        return false;
    };
    arena.retain(inner);
    arena.refill(
        expr,
        Node::Expr(Expr::Cast {
            operand: Link::from_retained(inner),
            ty: target,
            explicit,
        }),
    );
    true
}

/// Collapse a `GroupRef` placeholder to the overload matching `target`.
fn convert_group(
    session: &mut Session,
    problems: &mut Problems,
    expr: NodeId,
    target: NodeId,
) -> bool {
    let (name, candidates, object) = match session.arena().get(expr) {
        Some(Node::Expr(Expr::GroupRef {
            name,
            candidates,
            object,
        })) => (name.clone(), candidates.clone(), object.raw_id()),
        _ => return false,
    };

    let matches: Vec<NodeId> = candidates
        .into_iter()
        .filter(|c| signature_type(session, *c) == target)
        .collect();

    let span = session.arena().span(expr);
    match matches.as_slice() {
        [] => {
            problems.error(ResolveError::IncompatibleType {
                from: name,
                to: session.type_display(target),
                span,
            });
            false
        }
        [func] => {
            let func = *func;
            let arena = session.arena_mut();
            let node = match object {
                Some(obj) => Expr::MethodRef {
                    object: Link::to(arena, obj),
                    func,
                },
                None => Expr::FunctionRef { func },
            };
            let new = arena.alloc(Node::Expr(node), span);
            arena.replace(expr, new);
            true
        }
        _ => {
            problems.error(ResolveError::AmbiguousConversion {
                name,
                target: session.type_display(target),
                span,
            });
            false
        }
    }
}
