//! Vela: the semantic-resolution core of a small statically-typed
//! language.
//!
//! This facade re-exports the workspace crates:
//!
//! - [`core`]: Spans, qualified names, modifiers, errors, diagnostics
//! - [`ast`]: The node arena, counted edges, node variants, and the session
//! - [`sema`]: Symbol tables, conversion and overload rules, and the
//!   resolution pass
//!
//! The typical driver loop registers modules with an
//! [`ast::Session`], parses their bodies into the shared arena, and calls
//! [`sema::Analyzer::analyze_module`] per module, retrying in dependency
//! order whenever the pass reports
//! [`sema::Outcome::NeedsModules`].

pub use vela_ast as ast;
pub use vela_core as core;
pub use vela_sema as sema;

pub use vela_ast::{NodeArena, NodeId, Session};
pub use vela_core::{Problems, QualifiedName, ResolveError, Span};
pub use vela_sema::{Analyzer, Outcome};
