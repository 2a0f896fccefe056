//! Overload resolution.
//!
//! `best_match` picks the unique best candidate for a call: filter by
//! arity and per-argument implicit convertibility, set aside candidates
//! that fit but are invisible from the call site (remembered for the
//! diagnostic), then reduce the competing set pairwise with
//! [`ranking::better_match`]. The winner's parameter types are imposed on
//! the argument expressions in place.

pub mod ranking;

use vela_core::{Problems, ResolveError, Span};

use vela_ast::{NodeId, Session};

use crate::conversion::{can_convert, convert};
use crate::types::{expr_type, param_types, signature_type};

use ranking::{better_match, Preference};

/// A call candidate: the function declaration and whether it is visible
/// from the call site.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub func: NodeId,
    pub visible: bool,
}

/// Pick the best candidate for a call with the given argument expressions.
///
/// On success the arguments have been converted to the winner's parameter
/// types. On failure a diagnostic has been appended and `None` is
/// returned.
pub fn best_match(
    session: &mut Session,
    problems: &mut Problems,
    name: &str,
    candidates: &[Candidate],
    args: &[NodeId],
    span: Span,
) -> Option<NodeId> {
    let mut fitting: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let params = param_types(session, candidate.func);
        if params.len() != args.len() {
            continue;
        }
        let fits = args
            .iter()
            .zip(&params)
            .all(|(&arg, &param)| can_convert(session, arg, param, false));
        if fits {
            fitting.push(*candidate);
        }
    }

    let invisible_match = fitting.iter().any(|c| !c.visible);
    let competing: Vec<NodeId> = fitting
        .iter()
        .filter(|c| c.visible)
        .map(|c| c.func)
        .collect();

    if competing.is_empty() {
        let rendered: Vec<String> = args
            .iter()
            .map(|&a| {
                let ty = expr_type(session, a);
                session.type_display(ty)
            })
            .collect();
        problems.error(ResolveError::NoMatchingOverload {
            name: name.to_string(),
            args: rendered.join(", "),
            invisible_match,
            span,
        });
        return None;
    }

    let arg_types: Vec<NodeId> = args.iter().map(|&a| expr_type(session, a)).collect();
    let signatures: Vec<Vec<NodeId>> = competing
        .iter()
        .map(|&f| param_types(session, f))
        .collect();

    let mut best = 0;
    for index in 1..competing.len() {
        match better_match(
            session.arena(),
            &signatures[best],
            &signatures[index],
            &arg_types,
        ) {
            Preference::Left => {}
            Preference::Right => best = index,
            Preference::Neither => {
                let tied: Vec<String> = [best, index]
                    .iter()
                    .map(|&i| {
                        let sig = signature_type(session, competing[i]);
                        session.type_display(sig)
                    })
                    .collect();
                problems.error(ResolveError::AmbiguousCall {
                    name: name.to_string(),
                    candidates: tied.join(" / "),
                    span,
                });
                return None;
            }
        }
    }

    let winner = competing[best];
    for (&arg, &param) in args.iter().zip(&signatures[best]) {
        convert(session, problems, arg, param, false);
    }
    Some(winner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ast::node::{
        Decl, Expr, FunctionDecl, FunctionKind, LiteralValue, Node, ParameterDecl,
    };
    use vela_ast::{BuiltIn, Link, NodeList};
    use vela_core::Modifiers;

    fn function(session: &mut Session, name: &str, param_types: &[BuiltIn]) -> NodeId {
        let void = session.builtin(BuiltIn::Void);
        let mut params = NodeList::new();
        for (i, bt) in param_types.iter().enumerate() {
            let ty = session.builtin(*bt);
            let arena = session.arena_mut();
            let link = Link::to(arena, ty);
            let param = arena.alloc(
                Node::Decl(Decl::Parameter(ParameterDecl {
                    name: format!("p{i}"),
                    declared_type: link,
                    parent: None,
                })),
                Span::default(),
            );
            params.push(arena, param);
        }
        let arena = session.arena_mut();
        let ret = Link::to(arena, void);
        arena.alloc(
            Node::Decl(Decl::Function(FunctionDecl {
                name: name.into(),
                modifiers: Modifiers::empty(),
                kind: FunctionKind::Free,
                params,
                return_type: ret,
                body: Link::empty(),
                initializer: Link::empty(),
                parent: None,
            })),
            Span::default(),
        )
    }

    fn literal(session: &mut Session, value: i64, ty: BuiltIn) -> NodeId {
        let ty = session.builtin(ty);
        session.arena_mut().alloc(
            Node::Expr(Expr::Literal {
                value: LiteralValue::Int(value),
                ty,
            }),
            Span::default(),
        )
    }

    fn visible(funcs: &[NodeId]) -> Vec<Candidate> {
        funcs
            .iter()
            .map(|&func| Candidate {
                func,
                visible: true,
            })
            .collect()
    }

    #[test]
    fn exact_match_selected_regardless_of_declaration_order() {
        let mut session = Session::new();
        let mut problems = Problems::new();
        let a = function(&mut session, "f", &[BuiltIn::Int32]);
        let b = function(&mut session, "f", &[BuiltIn::Int64]);

        let arg = literal(&mut session, 1, BuiltIn::Int32);
        let winner = best_match(
            &mut session,
            &mut problems,
            "f",
            &visible(&[a, b]),
            &[arg],
            Span::default(),
        );
        assert_eq!(winner, Some(a));

        let arg = literal(&mut session, 1, BuiltIn::Int32);
        let winner = best_match(
            &mut session,
            &mut problems,
            "f",
            &visible(&[b, a]),
            &[arg],
            Span::default(),
        );
        assert_eq!(winner, Some(a));
        assert!(problems.is_empty());
    }

    #[test]
    fn narrower_convertible_candidate_wins() {
        let mut session = Session::new();
        let mut problems = Problems::new();
        let wide = function(&mut session, "f", &[BuiltIn::UInt64]);
        let narrow = function(&mut session, "f", &[BuiltIn::UInt32]);

        let arg = literal(&mut session, 1, BuiltIn::UInt16);
        let winner = best_match(
            &mut session,
            &mut problems,
            "f",
            &visible(&[wide, narrow]),
            &[arg],
            Span::default(),
        );
        assert_eq!(winner, Some(narrow));
        assert!(problems.is_empty());
    }

    #[test]
    fn no_fit_reports_with_invisible_note() {
        let mut session = Session::new();
        let mut problems = Problems::new();
        let hidden = function(&mut session, "f", &[BuiltIn::Int32]);

        let arg = literal(&mut session, 1, BuiltIn::Int32);
        let winner = best_match(
            &mut session,
            &mut problems,
            "f",
            &[Candidate {
                func: hidden,
                visible: false,
            }],
            &[arg],
            Span::default(),
        );
        assert_eq!(winner, None);
        assert_eq!(problems.error_count(), 1);
        let message = problems.iter().next().unwrap().message.clone();
        assert!(message.contains("not visible"));
    }

    #[test]
    fn wrong_arity_never_fits() {
        let mut session = Session::new();
        let mut problems = Problems::new();
        let f = function(&mut session, "f", &[BuiltIn::Int32, BuiltIn::Int32]);

        let arg = literal(&mut session, 1, BuiltIn::Int32);
        let winner = best_match(
            &mut session,
            &mut problems,
            "f",
            &visible(&[f]),
            &[arg],
            Span::default(),
        );
        assert_eq!(winner, None);
        assert_eq!(problems.error_count(), 1);
    }

    #[test]
    fn unbreakable_tie_is_ambiguous() {
        let mut session = Session::new();
        let mut problems = Problems::new();
        let f = function(&mut session, "f", &[BuiltIn::Float]);
        let g = function(&mut session, "f", &[BuiltIn::Double]);

        // An argument of unknown type converts to both and triggers no
        // ranking rule.
        let unknown = session.unknown_type();
        let arg = session.arena_mut().alloc(
            Node::Expr(Expr::Literal {
                value: LiteralValue::Int(0),
                ty: unknown,
            }),
            Span::default(),
        );
        let winner = best_match(
            &mut session,
            &mut problems,
            "f",
            &visible(&[f, g]),
            &[arg],
            Span::default(),
        );
        assert_eq!(winner, None);
        assert_eq!(problems.error_count(), 1);
        let message = problems.iter().next().unwrap().message.clone();
        assert!(message.contains("ambiguous"));
    }

    #[test]
    fn winner_converts_arguments_in_place() {
        let mut session = Session::new();
        let mut problems = Problems::new();
        let f = function(&mut session, "f", &[BuiltIn::Int64]);

        let arg = literal(&mut session, 7, BuiltIn::Int32);
        session.arena_mut().retain(arg);
        let winner = best_match(
            &mut session,
            &mut problems,
            "f",
            &visible(&[f]),
            &[arg],
            Span::default(),
        );
        assert_eq!(winner, Some(f));
        assert!(matches!(
            session.arena().get(arg),
            Some(Node::Expr(Expr::Cast { .. }))
        ));
    }
}
