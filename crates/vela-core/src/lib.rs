//! Shared foundation types for the Vela semantic-resolution core.
//!
//! ## Modules
//!
//! - [`span`]: Source location tracking
//! - [`qualified_name`]: Dotted qualified names
//! - [`modifiers`]: Declaration modifier flags
//! - [`error`]: Resolution error types
//! - [`diagnostics`]: The append-only problem collector

pub mod diagnostics;
pub mod error;
pub mod modifiers;
pub mod qualified_name;
pub mod span;

pub use diagnostics::{Problem, ProblemKind, Problems};
pub use error::ResolveError;
pub use modifiers::Modifiers;
pub use qualified_name::QualifiedName;
pub use span::Span;
