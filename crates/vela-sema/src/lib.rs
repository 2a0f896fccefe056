//! Semantic resolution for the Vela compiler core.
//!
//! ## Modules
//!
//! - [`symbol_table`]: Scoped per-module symbol tables with member scopes
//! - [`types`]: Type queries over resolved and partially-resolved trees
//! - [`conversion`]: Implicit/explicit conversion rules and the cast rewrite
//! - [`visibility`]: Access checking for restricted declarations
//! - [`overload`]: Overload selection and argument-preference ranking
//! - [`resolver`]: The full-tree resolution pass over one module

pub mod conversion;
pub mod overload;
pub mod resolver;
pub mod symbol_table;
pub mod types;
pub mod visibility;

pub use overload::{best_match, Candidate};
pub use resolver::{Analyzer, Outcome};
pub use symbol_table::{FunctionGroup, Scope, SymbolEntry, SymbolTable, SymbolTables};
pub use visibility::Visibility;
