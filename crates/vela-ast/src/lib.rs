//! AST node model for the Vela semantic-resolution core.
//!
//! ## Modules
//!
//! - [`arena`]: Node storage, reference counting, and the replace protocol
//! - [`link`]: Typed, counted single-child edges
//! - [`list`]: Ordered collections of counted node references
//! - [`node`]: The tagged-union node variants per syntactic category
//! - [`entity`]: Named-entity helpers (qualified names, modifiers)
//! - [`session`]: The module registry and type-interning session

pub mod arena;
pub mod entity;
pub mod link;
pub mod list;
pub mod node;
pub mod session;

pub use arena::{NodeArena, NodeId};
pub use entity::qualified_name;
pub use link::Link;
pub use list::{ListChange, NodeList};
pub use node::{
    BinaryOp, BuiltIn, ClassDecl, Decl, EnumValueDecl, Expr, FunctionDecl, FunctionKind, Import,
    LiteralValue, Node, OrderKind, ParameterDecl, Payload, PropertyDecl, Stmt, TypeKind, TypeNode,
    UnaryOp, VariableDecl,
};
pub use session::{Module, ModuleId, Session};
