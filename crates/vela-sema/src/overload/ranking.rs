//! Pairwise candidate ranking.
//!
//! `better_match` compares two candidate signatures against the call's
//! argument types with a per-argument, left-to-right lexicographic scan.
//! It is deliberately not a total order: combinations outside the rules
//! below never break a tie and leave the decision to an earlier differing
//! argument or to the ambiguity report.

use vela_ast::{NodeArena, NodeId};

use crate::types::builtin_of;

/// Which of two candidates fits the arguments better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    Left,
    Right,
    Neither,
}

/// Rank `left` against `right` for the given argument types.
///
/// Per argument: an exact parameter-type match wins outright; for an
/// integer argument, an integer parameter pair prefers matching signedness
/// then the narrower width, an integer parameter beats a floating-point
/// one, and `double` beats `float`. The first argument to produce a
/// preference decides.
pub fn better_match(
    arena: &NodeArena,
    left: &[NodeId],
    right: &[NodeId],
    args: &[NodeId],
) -> Preference {
    for ((&arg, &f), &g) in args.iter().zip(left).zip(right) {
        let arg = arena.resolve(arg);
        let f = arena.resolve(f);
        let g = arena.resolve(g);

        let exact_f = arg == f;
        let exact_g = arg == g;
        match (exact_f, exact_g) {
            (true, true) => continue,
            (true, false) => return Preference::Left,
            (false, true) => return Preference::Right,
            (false, false) => {}
        }

        // The numeric preference rules apply only to integer arguments.
        let Some(a) = builtin_of(arena, arg) else {
            continue;
        };
        if !a.is_integer() {
            continue;
        }
        let (Some(fb), Some(gb)) = (builtin_of(arena, f), builtin_of(arena, g)) else {
            continue;
        };

        if fb.is_integer() && gb.is_integer() {
            if fb.is_signed_integer() != gb.is_signed_integer() {
                return if fb.is_signed_integer() == a.is_signed_integer() {
                    Preference::Left
                } else {
                    Preference::Right
                };
            }
            if fb.bit_width() != gb.bit_width() {
                return if fb.bit_width() < gb.bit_width() {
                    Preference::Left
                } else {
                    Preference::Right
                };
            }
            continue;
        }
        if fb.is_integer() && gb.is_float() {
            return Preference::Left;
        }
        if fb.is_float() && gb.is_integer() {
            return Preference::Right;
        }
        if fb.is_float() && gb.is_float() && fb != gb {
            return if fb.bit_width() > gb.bit_width() {
                Preference::Left
            } else {
                Preference::Right
            };
        }
    }
    Preference::Neither
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ast::{BuiltIn, Session};

    fn tys(session: &mut Session, builtins: &[BuiltIn]) -> Vec<NodeId> {
        builtins.iter().map(|b| session.builtin(*b)).collect()
    }

    #[test]
    fn exact_match_wins() {
        let mut session = Session::new();
        let f = tys(&mut session, &[BuiltIn::Int32]);
        let g = tys(&mut session, &[BuiltIn::Int64]);
        let args = tys(&mut session, &[BuiltIn::Int32]);
        assert_eq!(
            better_match(session.arena(), &f, &g, &args),
            Preference::Left
        );
        assert_eq!(
            better_match(session.arena(), &g, &f, &args),
            Preference::Right
        );
    }

    #[test]
    fn matching_signedness_preferred() {
        let mut session = Session::new();
        let f = tys(&mut session, &[BuiltIn::UInt64]);
        let g = tys(&mut session, &[BuiltIn::Int64]);
        let args = tys(&mut session, &[BuiltIn::UInt16]);
        assert_eq!(
            better_match(session.arena(), &f, &g, &args),
            Preference::Left
        );
    }

    #[test]
    fn narrower_width_preferred_within_signedness() {
        let mut session = Session::new();
        let f = tys(&mut session, &[BuiltIn::Int64]);
        let g = tys(&mut session, &[BuiltIn::Int32]);
        let args = tys(&mut session, &[BuiltIn::Int16]);
        assert_eq!(
            better_match(session.arena(), &f, &g, &args),
            Preference::Right
        );
    }

    #[test]
    fn integer_parameter_beats_float() {
        let mut session = Session::new();
        let f = tys(&mut session, &[BuiltIn::Float]);
        let g = tys(&mut session, &[BuiltIn::Int64]);
        let args = tys(&mut session, &[BuiltIn::Int16]);
        assert_eq!(
            better_match(session.arena(), &f, &g, &args),
            Preference::Right
        );
    }

    #[test]
    fn double_beats_float_for_integer_argument() {
        let mut session = Session::new();
        let f = tys(&mut session, &[BuiltIn::Double]);
        let g = tys(&mut session, &[BuiltIn::Float]);
        let args = tys(&mut session, &[BuiltIn::Int32]);
        assert_eq!(
            better_match(session.arena(), &f, &g, &args),
            Preference::Left
        );
    }

    #[test]
    fn unrelated_combination_never_breaks_a_tie() {
        let mut session = Session::new();
        let f = tys(&mut session, &[BuiltIn::Float]);
        let g = tys(&mut session, &[BuiltIn::Double]);
        // A non-integer argument type leaves the float/double pair tied.
        let args = vec![session.unknown_type()];
        assert_eq!(
            better_match(session.arena(), &f, &g, &args),
            Preference::Neither
        );
    }

    #[test]
    fn earlier_argument_decides() {
        let mut session = Session::new();
        let f = tys(&mut session, &[BuiltIn::Int32, BuiltIn::Int64]);
        let g = tys(&mut session, &[BuiltIn::Int64, BuiltIn::Int32]);
        let args = tys(&mut session, &[BuiltIn::Int32, BuiltIn::Int32]);
        assert_eq!(
            better_match(session.arena(), &f, &g, &args),
            Preference::Left
        );
    }
}
