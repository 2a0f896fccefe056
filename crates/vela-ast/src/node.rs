//! AST node variants.
//!
//! Each syntactic category is a closed tagged union, so the resolution pass
//! is an exhaustive `match` per category and the compiler flags missing
//! cases. Placeholder (`Unresolved*`) forms are produced by the parser and
//! consumed by the resolution pass, which substitutes resolved forms in
//! place through the arena's replace protocol.
//!
//! ## Ownership
//!
//! Tree edges (a node to the children it owns) are counted: [`Link`] for
//! single children, [`NodeList`] for ordered children. Cross-references
//! (an expression to the declaration it names, a node to an interned type)
//! are plain [`NodeId`]s: declarations are owned by the statement lists
//! that contain them and interned types live for the whole session, so
//! counting those edges would only manufacture cycles.

use vela_core::{Modifiers, QualifiedName};

use crate::arena::NodeId;
use crate::link::Link;
use crate::list::NodeList;
use crate::session::ModuleId;

/// Top-level union over the syntactic categories.
#[derive(Debug)]
pub enum Node {
    Expr(Expr),
    Stmt(Stmt),
    Type(TypeNode),
    Decl(Decl),
    Import(Import),
}

/// Projection of [`Node`] into one syntactic category.
///
/// Implemented by each category enum so [`Link`] and [`NodeList`] can be
/// typed to a single kind of child.
pub trait Payload: Sized {
    /// Project a node into this category.
    fn of(node: &Node) -> Option<&Self>;
    /// Project a node mutably into this category.
    fn of_mut(node: &mut Node) -> Option<&mut Self>;
    /// Wrap a value of this category as a node.
    fn into_node(self) -> Node;
}

macro_rules! impl_payload {
    ($ty:ty, $variant:ident) => {
        impl Payload for $ty {
            fn of(node: &Node) -> Option<&Self> {
                match node {
                    Node::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn of_mut(node: &mut Node) -> Option<&mut Self> {
                match node {
                    Node::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_node(self) -> Node {
                Node::$variant(self)
            }
        }
    };
}

impl_payload!(Expr, Expr);
impl_payload!(Stmt, Stmt);
impl_payload!(TypeNode, Type);
impl_payload!(Decl, Decl);
impl_payload!(Import, Import);

// ============================================================================
// Types
// ============================================================================

/// Built-in (primitive) types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltIn {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
}

impl BuiltIn {
    /// Whether this is a signed or unsigned integer type.
    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    /// Whether this is a signed integer type.
    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            BuiltIn::Int8 | BuiltIn::Int16 | BuiltIn::Int32 | BuiltIn::Int64
        )
    }

    /// Whether this is an unsigned integer type.
    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            BuiltIn::UInt8 | BuiltIn::UInt16 | BuiltIn::UInt32 | BuiltIn::UInt64
        )
    }

    /// Whether this is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, BuiltIn::Float | BuiltIn::Double)
    }

    /// Bit width for numeric types, 0 otherwise.
    pub fn bit_width(self) -> u32 {
        match self {
            BuiltIn::Int8 | BuiltIn::UInt8 => 8,
            BuiltIn::Int16 | BuiltIn::UInt16 => 16,
            BuiltIn::Int32 | BuiltIn::UInt32 | BuiltIn::Float => 32,
            BuiltIn::Int64 | BuiltIn::UInt64 | BuiltIn::Double => 64,
            BuiltIn::Void | BuiltIn::Bool | BuiltIn::String => 0,
        }
    }

    /// The surface-syntax name of this type.
    pub fn name(self) -> &'static str {
        match self {
            BuiltIn::Void => "void",
            BuiltIn::Bool => "bool",
            BuiltIn::Int8 => "int8",
            BuiltIn::Int16 => "int16",
            BuiltIn::Int32 => "int32",
            BuiltIn::Int64 => "int64",
            BuiltIn::UInt8 => "uint8",
            BuiltIn::UInt16 => "uint16",
            BuiltIn::UInt32 => "uint32",
            BuiltIn::UInt64 => "uint64",
            BuiltIn::Float => "float",
            BuiltIn::Double => "double",
            BuiltIn::String => "string",
        }
    }

    /// Look up a built-in type by its surface name.
    pub fn by_name(name: &str) -> Option<BuiltIn> {
        Some(match name {
            "void" => BuiltIn::Void,
            "bool" => BuiltIn::Bool,
            "int8" => BuiltIn::Int8,
            "int16" => BuiltIn::Int16,
            "int32" => BuiltIn::Int32,
            "int64" => BuiltIn::Int64,
            "uint8" => BuiltIn::UInt8,
            "uint16" => BuiltIn::UInt16,
            "uint32" => BuiltIn::UInt32,
            "uint64" => BuiltIn::UInt64,
            "float" => BuiltIn::Float,
            "double" => BuiltIn::Double,
            "string" => BuiltIn::String,
            _ => return None,
        })
    }
}

/// Type nodes.
///
/// Array, function, and class types are structurally interned by the
/// session: identical shape means identical node id, so type equality is
/// id equality after forwarding resolution.
#[derive(Debug)]
pub enum TypeNode {
    /// Generic "not yet known" placeholder, also the recovery type.
    Unknown,
    /// Named placeholder carrying an unresolved qualified name.
    Unresolved { name: QualifiedName },
    /// Built-in type with lazily-populated synthetic members.
    BuiltIn(BuiltIn),
    /// Array type; `elem` is the element type id.
    Array { elem: NodeId },
    /// Function type: parameter type ids and return type id.
    Function { params: Vec<NodeId>, ret: NodeId },
    /// User-defined type backed by a class/struct/enum declaration.
    Class { decl: NodeId },
}

// ============================================================================
// Declarations
// ============================================================================

/// What flavor of callable a function declaration is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Module-level function.
    Free,
    /// Instance method.
    Method,
    /// Constructor.
    Constructor,
    /// Property read accessor.
    Getter,
    /// Property write accessor.
    Setter,
}

/// What flavor of user-defined type a class declaration introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Enum,
}

/// A variable declaration (module-level, local, or instance field).
#[derive(Debug)]
pub struct VariableDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub declared_type: Link<TypeNode>,
    pub init: Link<Expr>,
    /// Declaring entity, if any (non-owning).
    pub parent: Option<NodeId>,
}

/// A function parameter.
#[derive(Debug)]
pub struct ParameterDecl {
    pub name: String,
    pub declared_type: Link<TypeNode>,
    /// The declaring function (non-owning).
    pub parent: Option<NodeId>,
}

/// A function, method, constructor, or accessor.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub kind: FunctionKind,
    pub params: NodeList<Decl>,
    pub return_type: Link<TypeNode>,
    /// Body block; unset for extern declarations.
    pub body: Link<Stmt>,
    /// Constructor initializer (the implicit base-constructor call).
    pub initializer: Link<Expr>,
    pub parent: Option<NodeId>,
}

/// A class, struct, or enum declaration.
#[derive(Debug)]
pub struct ClassDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub kind: TypeKind,
    /// Base type; unset for base-less types and structs/enums.
    pub base: Link<TypeNode>,
    pub body: NodeList<Stmt>,
    /// The interned `TypeNode::Class` for this declaration (non-owning).
    pub ty: Option<NodeId>,
    pub parent: Option<NodeId>,
}

/// A synthesized or declared read/write property.
#[derive(Debug)]
pub struct PropertyDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub getter: Link<Decl>,
    pub setter: Link<Decl>,
    pub parent: Option<NodeId>,
}

/// A value of an enum declaration.
#[derive(Debug)]
pub struct EnumValueDecl {
    pub name: String,
    pub value: i64,
    pub parent: Option<NodeId>,
}

/// Declared entities.
#[derive(Debug)]
pub enum Decl {
    Variable(VariableDecl),
    Parameter(ParameterDecl),
    Function(FunctionDecl),
    Class(ClassDecl),
    Property(PropertyDecl),
    EnumValue(EnumValueDecl),
}

// ============================================================================
// Expressions
// ============================================================================

/// Literal values carried by [`Expr::Literal`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// Binary operators as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// The operator-method name this operator resolves to, if a single
    /// method exists for it. `!=`, `<=`, and `>=` have no method of their
    /// own and are rewritten structurally instead.
    pub fn method_name(self) -> Option<&'static str> {
        Some(match self {
            BinaryOp::Add => "plus",
            BinaryOp::Sub => "minus",
            BinaryOp::Mul => "times",
            BinaryOp::Div => "dividedBy",
            BinaryOp::Rem => "modulo",
            BinaryOp::Eq => "equals",
            BinaryOp::Lt => "lessThan",
            BinaryOp::Gt => "greaterThan",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Ne | BinaryOp::Le | BinaryOp::Ge => return None,
        })
    }
}

/// Unary operators as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    /// The operator-method name this operator resolves to.
    pub fn method_name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "negated",
            UnaryOp::Not => "not",
        }
    }
}

/// Which comparison an [`Expr::OrderedOrEqual`] node combines with `equals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    /// `<=` — equals or lessThan.
    LessOrEqual,
    /// `>=` — equals or greaterThan.
    GreaterOrEqual,
}

/// Expressions: resolved forms and the `Unresolved*` placeholders the
/// resolution pass consumes.
#[derive(Debug)]
pub enum Expr {
    /// A literal constant; `ty` is filled in by the resolution pass.
    Literal { value: LiteralValue, ty: NodeId },
    /// Reference to a variable or parameter declaration.
    VariableRef { decl: NodeId },
    /// Reference to an instance field through an object expression.
    FieldRef { object: Link<Expr>, field: NodeId },
    /// Reference to a single resolved function.
    FunctionRef { func: NodeId },
    /// Reference to a single resolved method bound to a receiver.
    MethodRef { object: Link<Expr>, func: NodeId },
    /// Placeholder value denoting a whole overload group; consumed when
    /// converted to a concrete function type.
    GroupRef {
        name: String,
        candidates: Vec<NodeId>,
        object: Link<Expr>,
    },
    /// Reference to a property, produced only on the left side of an
    /// assignment (the lvalue flag suppresses the getter-call rewrite).
    PropertyRef { object: Link<Expr>, prop: NodeId },
    /// A type used as a value (e.g. the left side of a static access).
    TypeRef { ty: NodeId },
    /// An imported module used as a namespace qualifier.
    ModuleRef { module: ModuleId },
    /// Reference to an enum value.
    EnumValueRef { value: NodeId, ty: NodeId },
    /// The receiver of the enclosing method.
    This { ty: NodeId },
    /// A resolved call.
    Call { callee: Link<Expr>, args: NodeList<Expr> },
    /// A conversion inserted by the pass or requested by the user.
    Cast {
        operand: Link<Expr>,
        ty: NodeId,
        explicit: bool,
    },
    /// Object creation with a resolved constructor.
    New {
        class_ty: NodeId,
        ctor: Option<NodeId>,
        args: NodeList<Expr>,
    },
    /// Array literal.
    ArrayLit { elem_ty: NodeId, elems: NodeList<Expr> },
    /// Plain storage assignment (field or variable target).
    Assign { target: Link<Expr>, value: Link<Expr> },
    /// Compound assignment (`+=` etc.) with its resolved operator method;
    /// evaluates the target once.
    CompoundAssign {
        target: Link<Expr>,
        method: NodeId,
        value: Link<Expr>,
    },
    /// Boolean negation, used for the `!=` rewrite.
    Not { operand: Link<Expr> },
    /// Combined `<=`/`>=` comparison referencing both the `equals` and the
    /// ordering method, since no single operator method exists for these.
    OrderedOrEqual {
        left: Link<Expr>,
        right: Link<Expr>,
        equals: NodeId,
        compare: NodeId,
        kind: OrderKind,
    },
    /// Placeholder installed while a node is being wrapped, so a node never
    /// becomes its own child during the swap.
    Dummy,

    // Placeholder forms produced by the parser.
    UnresolvedName { name: String },
    UnresolvedMember { object: Link<Expr>, name: String },
    UnresolvedBinary {
        op: BinaryOp,
        left: Link<Expr>,
        right: Link<Expr>,
        /// Compound-assignment form (`a op= b`).
        compound: bool,
    },
    UnresolvedUnary { op: UnaryOp, operand: Link<Expr> },
    UnresolvedIndex { object: Link<Expr>, index: Link<Expr> },
    UnresolvedNew {
        type_name: QualifiedName,
        args: NodeList<Expr>,
    },
}

// ============================================================================
// Statements
// ============================================================================

/// Statements.
#[derive(Debug)]
pub enum Stmt {
    /// A declaration in statement position.
    Decl { decl: Link<Decl> },
    /// An expression evaluated for effect.
    Expr { expr: Link<Expr> },
    /// A braced block opening an anonymous scope.
    Block { body: NodeList<Stmt> },
    If {
        cond: Link<Expr>,
        then_body: Link<Stmt>,
        else_body: Link<Stmt>,
    },
    While { cond: Link<Expr>, body: Link<Stmt> },
    DoWhile { body: Link<Stmt>, cond: Link<Expr> },
    For {
        init: Link<Stmt>,
        cond: Link<Expr>,
        step: Link<Expr>,
        body: Link<Stmt>,
    },
    Return { value: Link<Expr> },
    Empty,
}

// ============================================================================
// Imports
// ============================================================================

/// An import statement; `resolved` is filled once the target module exists.
#[derive(Debug)]
pub struct Import {
    pub name: QualifiedName,
    pub resolved: Option<ModuleId>,
}

// ============================================================================
// Child enumeration
// ============================================================================

impl Node {
    /// Visit the ids of all owned children (links and list slots).
    ///
    /// Used by the arena when destroying a node to release its subtree.
    /// Non-owning references (declaration backrefs, interned type ids,
    /// parents) are deliberately not visited.
    pub fn owned_children(&self, visit: &mut dyn FnMut(NodeId)) {
        fn link<T: Payload>(l: &Link<T>, visit: &mut dyn FnMut(NodeId)) {
            if let Some(id) = l.raw_id() {
                visit(id);
            }
        }
        fn list<T: Payload>(l: &NodeList<T>, visit: &mut dyn FnMut(NodeId)) {
            for id in l.raw_ids() {
                visit(*id);
            }
        }

        match self {
            Node::Expr(expr) => match expr {
                Expr::Literal { .. }
                | Expr::VariableRef { .. }
                | Expr::FunctionRef { .. }
                | Expr::TypeRef { .. }
                | Expr::ModuleRef { .. }
                | Expr::EnumValueRef { .. }
                | Expr::This { .. }
                | Expr::Dummy
                | Expr::UnresolvedName { .. } => {}
                Expr::FieldRef { object, .. }
                | Expr::MethodRef { object, .. }
                | Expr::GroupRef { object, .. }
                | Expr::PropertyRef { object, .. }
                | Expr::UnresolvedMember { object, .. } => link(object, visit),
                Expr::Call { callee, args } => {
                    link(callee, visit);
                    list(args, visit);
                }
                Expr::Cast { operand, .. } => link(operand, visit),
                Expr::New { args, .. } => list(args, visit),
                Expr::ArrayLit { elems, .. } => list(elems, visit),
                Expr::Assign { target, value } => {
                    link(target, visit);
                    link(value, visit);
                }
                Expr::CompoundAssign { target, value, .. } => {
                    link(target, visit);
                    link(value, visit);
                }
                Expr::Not { operand } => link(operand, visit),
                Expr::OrderedOrEqual { left, right, .. } => {
                    link(left, visit);
                    link(right, visit);
                }
                Expr::UnresolvedBinary { left, right, .. } => {
                    link(left, visit);
                    link(right, visit);
                }
                Expr::UnresolvedUnary { operand, .. } => link(operand, visit),
                Expr::UnresolvedIndex { object, index } => {
                    link(object, visit);
                    link(index, visit);
                }
                Expr::UnresolvedNew { args, .. } => list(args, visit),
            },
            Node::Stmt(stmt) => match stmt {
                Stmt::Decl { decl } => link(decl, visit),
                Stmt::Expr { expr } => link(expr, visit),
                Stmt::Block { body } => list(body, visit),
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    link(cond, visit);
                    link(then_body, visit);
                    link(else_body, visit);
                }
                Stmt::While { cond, body } => {
                    link(cond, visit);
                    link(body, visit);
                }
                Stmt::DoWhile { body, cond } => {
                    link(body, visit);
                    link(cond, visit);
                }
                Stmt::For {
                    init,
                    cond,
                    step,
                    body,
                } => {
                    link(init, visit);
                    link(cond, visit);
                    link(step, visit);
                    link(body, visit);
                }
                Stmt::Return { value } => link(value, visit),
                Stmt::Empty => {}
            },
            Node::Type(ty) => match ty {
                // Interned types are session-owned and never destroyed;
                // unresolved placeholders have no owned children.
                TypeNode::Unknown
                | TypeNode::Unresolved { .. }
                | TypeNode::BuiltIn(_)
                | TypeNode::Array { .. }
                | TypeNode::Function { .. }
                | TypeNode::Class { .. } => {}
            },
            Node::Decl(decl) => match decl {
                Decl::Variable(v) => {
                    link(&v.declared_type, visit);
                    link(&v.init, visit);
                }
                Decl::Parameter(p) => link(&p.declared_type, visit),
                Decl::Function(f) => {
                    list(&f.params, visit);
                    link(&f.return_type, visit);
                    link(&f.body, visit);
                    link(&f.initializer, visit);
                }
                Decl::Class(c) => {
                    link(&c.base, visit);
                    list(&c.body, visit);
                }
                Decl::Property(p) => {
                    link(&p.getter, visit);
                    link(&p.setter, visit);
                }
                Decl::EnumValue(_) => {}
            },
            Node::Import(_) => {}
        }
    }
}
