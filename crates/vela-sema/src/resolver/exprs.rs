//! Expression resolution.
//!
//! Placeholder nodes are rewritten into resolved forms in place: names to
//! declaration references, member accesses to field/property/method
//! references, operators to method calls, and index/new forms to their
//! element-access and constructor calls. Every rewrite moves the counted
//! child edges out of the node being replaced, so the release of the old
//! node never frees children the replacement adopted.

use vela_core::{Modifiers, QualifiedName, ResolveError, Span};

use vela_ast::session::ModuleId;
use vela_ast::{
    BinaryOp, BuiltIn, Decl, Expr, FunctionKind, Link, LiteralValue, Node, NodeId, NodeList,
    OrderKind, TypeNode, UnaryOp,
};

use crate::conversion::{can_convert, convert};
use crate::overload::{best_match, Candidate};
use crate::symbol_table::SymbolEntry;
use crate::types::{self, expr_type, is_unknown};

use super::Resolver;

/// Snapshot of an expression's shape, taken under a short arena borrow.
enum Shape {
    Literal {
        ty: NodeId,
        default: BuiltIn,
    },
    This {
        ty: NodeId,
    },
    Cast {
        operand: Option<NodeId>,
        ty: NodeId,
        explicit: bool,
    },
    ArrayLit {
        elem_ty: NodeId,
        elems: Vec<NodeId>,
    },
    Call {
        callee: Option<NodeId>,
        args: Vec<NodeId>,
    },
    Assign {
        target: Option<NodeId>,
        value: Option<NodeId>,
    },
    Name(String),
    Member {
        object: Option<NodeId>,
        name: String,
    },
    Binary {
        op: BinaryOp,
        left: Option<NodeId>,
        right: Option<NodeId>,
        compound: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Option<NodeId>,
    },
    Index {
        object: Option<NodeId>,
        index: Option<NodeId>,
    },
    NewExpr {
        type_name: QualifiedName,
        args: Vec<NodeId>,
    },
    Done,
}

impl Resolver<'_> {
    pub(crate) fn resolve_expr(&mut self, expr: NodeId) {
        let expr = self.session.arena().resolve(expr);
        let arena = self.session.arena();
        let shape = match arena.get(expr) {
            Some(Node::Expr(e)) => match e {
                Expr::Literal { value, ty } => Shape::Literal {
                    ty: *ty,
                    default: match value {
                        LiteralValue::Int(_) => BuiltIn::Int32,
                        LiteralValue::Float(_) => BuiltIn::Double,
                        LiteralValue::Bool(_) => BuiltIn::Bool,
                        LiteralValue::Str(_) => BuiltIn::String,
                    },
                },
                Expr::This { ty } => Shape::This { ty: *ty },
                Expr::Cast {
                    operand,
                    ty,
                    explicit,
                } => Shape::Cast {
                    operand: operand.target(arena),
                    ty: *ty,
                    explicit: *explicit,
                },
                Expr::ArrayLit { elem_ty, elems } => Shape::ArrayLit {
                    elem_ty: *elem_ty,
                    elems: elems.ids(arena),
                },
                Expr::Call { callee, args } => Shape::Call {
                    callee: callee.target(arena),
                    args: args.ids(arena),
                },
                Expr::Assign { target, value } => Shape::Assign {
                    target: target.target(arena),
                    value: value.target(arena),
                },
                Expr::UnresolvedName { name } => Shape::Name(name.clone()),
                Expr::UnresolvedMember { object, name } => Shape::Member {
                    object: object.target(arena),
                    name: name.clone(),
                },
                Expr::UnresolvedBinary {
                    op,
                    left,
                    right,
                    compound,
                } => Shape::Binary {
                    op: *op,
                    left: left.target(arena),
                    right: right.target(arena),
                    compound: *compound,
                },
                Expr::UnresolvedUnary { op, operand } => Shape::Unary {
                    op: *op,
                    operand: operand.target(arena),
                },
                Expr::UnresolvedIndex { object, index } => Shape::Index {
                    object: object.target(arena),
                    index: index.target(arena),
                },
                Expr::UnresolvedNew { type_name, args } => Shape::NewExpr {
                    type_name: type_name.clone(),
                    args: args.ids(arena),
                },
                // Already-resolved forms are terminal.
                _ => Shape::Done,
            },
            _ => return,
        };

        match shape {
            Shape::Literal { ty, default } => {
                if is_unknown(self.session.arena(), ty) {
                    let filled = self.session.builtin(default);
                    if let Some(Node::Expr(Expr::Literal { ty, .. })) =
                        self.session.arena_mut().get_mut(expr)
                    {
                        *ty = filled;
                    }
                }
            }
            Shape::This { ty } => self.resolve_this(expr, ty),
            Shape::Cast {
                operand,
                ty,
                explicit,
            } => self.resolve_cast(expr, operand, ty, explicit),
            Shape::ArrayLit { elem_ty, elems } => self.resolve_array_lit(expr, elem_ty, elems),
            Shape::Call { callee, args } => self.resolve_call(expr, callee, args),
            Shape::Assign { target, value } => self.resolve_assign(expr, target, value),
            Shape::Name(name) => self.resolve_name(expr, &name),
            Shape::Member { object, name } => self.resolve_member(expr, object, &name),
            Shape::Binary {
                op,
                left,
                right,
                compound,
            } => self.resolve_binary(expr, op, left, right, compound),
            Shape::Unary { op, operand } => self.resolve_unary(expr, op, operand),
            Shape::Index { object, index } => self.resolve_index(expr, object, index),
            Shape::NewExpr { type_name, args } => self.resolve_new(expr, &type_name, args),
            Shape::Done => {}
        }
    }

    /// Resolve a subexpression in rvalue position regardless of the
    /// current lvalue flag.
    fn resolve_rvalue(&mut self, expr: NodeId) {
        let saved = self.lvalue;
        self.lvalue = false;
        self.resolve_expr(expr);
        self.lvalue = saved;
    }

    /// Replace a placeholder node with a resolved form, keeping its span.
    fn replace_with(&mut self, expr: NodeId, node: Expr) {
        let arena = self.session.arena_mut();
        let span = arena.span(expr);
        let new = arena.alloc(Node::Expr(node), span);
        arena.replace(expr, new);
    }

    // ======================================================================
    // Simple forms
    // ======================================================================

    fn resolve_this(&mut self, expr: NodeId, ty: NodeId) {
        if !is_unknown(self.session.arena(), ty) {
            return;
        }
        match self.type_stack.last().copied() {
            Some(class) => {
                let class_ty = self.session.class_type(class);
                if let Some(Node::Expr(Expr::This { ty })) = self.session.arena_mut().get_mut(expr)
                {
                    *ty = class_ty;
                }
            }
            None => self.error(ResolveError::UnknownName {
                name: "this".to_string(),
                span: self.span_of(expr),
            }),
        }
    }

    /// A cast written in source: resolve the operand and target type and
    /// verify the conversion is allowed under the cast's strictness.
    fn resolve_cast(&mut self, expr: NodeId, operand: Option<NodeId>, ty: NodeId, explicit: bool) {
        let Some(operand) = operand else {
            return;
        };
        self.resolve_rvalue(operand);
        let resolved = self.resolve_type(ty);
        if let Some(Node::Expr(Expr::Cast { ty, .. })) = self.session.arena_mut().get_mut(expr) {
            *ty = resolved;
        }
        if !can_convert(self.session, operand, resolved, explicit) {
            let from = expr_type(self.session, operand);
            let err = ResolveError::IncompatibleType {
                from: self.session.type_display(from),
                to: self.session.type_display(resolved),
                span: self.span_of(expr),
            };
            self.error(err);
        }
    }

    fn resolve_array_lit(&mut self, expr: NodeId, elem_ty: NodeId, elems: Vec<NodeId>) {
        for &elem in &elems {
            self.resolve_rvalue(elem);
        }
        let mut elem_ty = self.session.arena().resolve(elem_ty);
        if is_unknown(self.session.arena(), elem_ty) {
            elem_ty = match elems.first() {
                Some(&first) => expr_type(self.session, first),
                None => return,
            };
            if let Some(Node::Expr(Expr::ArrayLit { elem_ty: slot, .. })) =
                self.session.arena_mut().get_mut(expr)
            {
                *slot = elem_ty;
            }
        }
        for &elem in &elems {
            convert(self.session, self.problems, elem, elem_ty, false);
        }
    }

    // ======================================================================
    // Names and members
    // ======================================================================

    /// Whether a declaration is a member of one of the enclosing types, so
    /// a bare reference to it needs an implicit `this` receiver.
    fn needs_this(&self, decl: NodeId) -> bool {
        match self.session.arena().get(decl) {
            Some(Node::Decl(d)) => match d.parent() {
                Some(parent) => {
                    !d.modifiers().contains(Modifiers::STATIC) && self.type_stack.contains(&parent)
                }
                None => false,
            },
            _ => false,
        }
    }

    /// A fresh `this` expression typed to the innermost enclosing class.
    fn this_link(&mut self) -> Link<Expr> {
        let ty = match self.type_stack.last().copied() {
            Some(class) => self.session.class_type(class),
            None => self.session.unknown_type(),
        };
        let arena = self.session.arena_mut();
        let this = arena.alloc(Node::Expr(Expr::This { ty }), Span::default());
        Link::to(arena, this)
    }

    fn resolve_name(&mut self, expr: NodeId, name: &str) {
        let span = self.span_of(expr);
        let Some((entry, _home)) = self.lookup_name(name) else {
            if let Some(module) = self.imported_module_named(name) {
                self.replace_with(expr, Expr::ModuleRef { module });
                return;
            }
            self.error(ResolveError::UnknownName {
                name: name.to_string(),
                span,
            });
            return;
        };

        match entry {
            SymbolEntry::Entity(decl) => self.resolve_name_entity(expr, name, decl, span),
            SymbolEntry::Group(group) => {
                let object = match group.functions.first() {
                    Some(&f) if self.needs_this(f) => self.this_link(),
                    _ => Link::empty(),
                };
                self.replace_with(
                    expr,
                    Expr::GroupRef {
                        name: name.to_string(),
                        candidates: group.functions,
                        object,
                    },
                );
            }
        }
    }

    fn resolve_name_entity(&mut self, expr: NodeId, name: &str, decl: NodeId, span: Span) {
        enum Kind {
            Storage,
            Function,
            Class,
            Property,
            EnumValue(Option<NodeId>),
        }
        let kind = match self.session.arena().get(decl) {
            Some(Node::Decl(Decl::Variable(_) | Decl::Parameter(_))) => Kind::Storage,
            Some(Node::Decl(Decl::Function(_))) => Kind::Function,
            Some(Node::Decl(Decl::Class(_))) => Kind::Class,
            Some(Node::Decl(Decl::Property(_))) => Kind::Property,
            Some(Node::Decl(Decl::EnumValue(v))) => Kind::EnumValue(v.parent),
            _ => return,
        };

        match kind {
            Kind::Storage => {
                self.check_visible(decl, name, span);
                if self.needs_this(decl) {
                    let object = self.this_link();
                    self.replace_with(
                        expr,
                        Expr::FieldRef {
                            object,
                            field: decl,
                        },
                    );
                } else {
                    self.replace_with(expr, Expr::VariableRef { decl });
                }
            }
            Kind::Function => {
                let object = if self.needs_this(decl) {
                    self.this_link()
                } else {
                    Link::empty()
                };
                self.replace_with(
                    expr,
                    Expr::GroupRef {
                        name: name.to_string(),
                        candidates: vec![decl],
                        object,
                    },
                );
            }
            Kind::Class => {
                self.check_visible(decl, name, span);
                let ty = self.session.class_type(decl);
                self.replace_with(expr, Expr::TypeRef { ty });
            }
            Kind::Property => {
                self.check_visible(decl, name, span);
                let object = if self.needs_this(decl) {
                    self.this_link()
                } else {
                    Link::empty()
                };
                self.rewrite_property_access(expr, name, decl, object, span);
            }
            Kind::EnumValue(parent) => {
                let ty = match parent {
                    Some(parent) => self.session.class_type(parent),
                    None => self.session.unknown_type(),
                };
                self.replace_with(expr, Expr::EnumValueRef { value: decl, ty });
            }
        }
    }

    /// In lvalue position a property stays a `PropertyRef` for the
    /// assignment rewrite; in rvalue position it becomes a getter call.
    fn rewrite_property_access(
        &mut self,
        expr: NodeId,
        name: &str,
        prop: NodeId,
        object: Link<Expr>,
        span: Span,
    ) {
        if self.lvalue {
            self.replace_with(expr, Expr::PropertyRef { object, prop });
            return;
        }
        let getter = match self.session.arena().get(prop) {
            Some(Node::Decl(Decl::Property(p))) => p.getter.target(self.session.arena()),
            _ => None,
        };
        let Some(getter) = getter else {
            // Release the receiver we built; the node keeps its old form.
            let arena = self.session.arena_mut();
            let mut object = object;
            object.release(arena);
            self.error(ResolveError::WriteOnlyProperty {
                name: name.to_string(),
                span,
            });
            return;
        };
        let arena = self.session.arena_mut();
        let callee = if object.is_empty() {
            arena.alloc(Node::Expr(Expr::FunctionRef { func: getter }), span)
        } else {
            arena.alloc(
                Node::Expr(Expr::MethodRef {
                    object,
                    func: getter,
                }),
                span,
            )
        };
        let callee_link = Link::to(arena, callee);
        let call = arena.alloc(
            Node::Expr(Expr::Call {
                callee: callee_link,
                args: NodeList::new(),
            }),
            span,
        );
        arena.replace(expr, call);
    }

    fn resolve_member(&mut self, expr: NodeId, object: Option<NodeId>, name: &str) {
        let span = self.span_of(expr);
        let Some(object) = object else {
            return;
        };
        self.resolve_rvalue(object);

        enum Owner {
            Module(ModuleId),
            Static(NodeId),
            Value,
        }
        let owner = match self.session.arena().get(object) {
            Some(Node::Expr(Expr::ModuleRef { module })) => Owner::Module(*module),
            Some(Node::Expr(Expr::TypeRef { ty })) => Owner::Static(*ty),
            _ => Owner::Value,
        };

        match owner {
            Owner::Module(module) => self.resolve_module_member(expr, module, name, span),
            Owner::Static(ty) => self.resolve_static_member(expr, ty, name, span),
            Owner::Value => {
                let ty = expr_type(self.session, object);
                if is_unknown(self.session.arena(), ty) {
                    return;
                }
                self.resolve_value_member(expr, ty, name, span);
            }
        }
    }

    /// `module.name` — a lookup in the named module's global scope; the
    /// resulting reference carries no receiver.
    fn resolve_module_member(&mut self, expr: NodeId, module: ModuleId, name: &str, span: Span) {
        let entry = self
            .tables
            .get(module)
            .and_then(|t| t.lookup_global(name))
            .cloned();
        let Some(entry) = entry else {
            let owner = self.session.module(module).name.to_string();
            self.error(ResolveError::UnknownMember {
                name: name.to_string(),
                owner,
                span,
            });
            return;
        };
        match entry {
            SymbolEntry::Entity(decl) => self.resolve_name_entity(expr, name, decl, span),
            SymbolEntry::Group(group) => self.replace_with(
                expr,
                Expr::GroupRef {
                    name: name.to_string(),
                    candidates: group.functions,
                    object: Link::empty(),
                },
            ),
        }
    }

    /// `Type.name` — enum values and static members only.
    fn resolve_static_member(&mut self, expr: NodeId, ty: NodeId, name: &str, span: Span) {
        let decl = match self.session.arena().get(ty) {
            Some(Node::Type(TypeNode::Class { decl })) => Some(*decl),
            _ => None,
        };
        let Some(decl) = decl else {
            self.error(ResolveError::UnknownMember {
                name: name.to_string(),
                owner: self.session.type_display(ty),
                span,
            });
            return;
        };
        enum StaticMember {
            EnumValue(NodeId, Option<NodeId>),
            Static(NodeId),
            Functions(Vec<NodeId>),
            None,
        }
        let member = match self.lookup_member(decl, name) {
            Some(SymbolEntry::Entity(member)) => match self.session.arena().get(member) {
                Some(Node::Decl(Decl::EnumValue(v))) => StaticMember::EnumValue(member, v.parent),
                Some(Node::Decl(d)) if d.modifiers().contains(Modifiers::STATIC) => {
                    StaticMember::Static(member)
                }
                _ => StaticMember::None,
            },
            Some(SymbolEntry::Group(group)) => {
                let statics: Vec<NodeId> = group
                    .functions
                    .iter()
                    .copied()
                    .filter(|&f| match self.session.arena().get(f) {
                        Some(Node::Decl(d)) => d.modifiers().contains(Modifiers::STATIC),
                        _ => false,
                    })
                    .collect();
                if statics.is_empty() {
                    StaticMember::None
                } else {
                    StaticMember::Functions(statics)
                }
            }
            None => StaticMember::None,
        };

        let accepted = match member {
            StaticMember::EnumValue(member, parent) => {
                let value_ty = match parent {
                    Some(parent) => self.session.class_type(parent),
                    None => ty,
                };
                self.replace_with(
                    expr,
                    Expr::EnumValueRef {
                        value: member,
                        ty: value_ty,
                    },
                );
                true
            }
            StaticMember::Static(member) => {
                self.check_visible(member, name, span);
                self.resolve_name_entity(expr, name, member, span);
                true
            }
            StaticMember::Functions(statics) => {
                self.replace_with(
                    expr,
                    Expr::GroupRef {
                        name: name.to_string(),
                        candidates: statics,
                        object: Link::empty(),
                    },
                );
                true
            }
            StaticMember::None => false,
        };
        if !accepted {
            self.error(ResolveError::UnknownMember {
                name: name.to_string(),
                owner: self.session.type_display(ty),
                span,
            });
        }
    }

    /// `value.name` — instance member lookup on the object's static type.
    fn resolve_value_member(&mut self, expr: NodeId, ty: NodeId, name: &str, span: Span) {
        let Some(entry) = self.lookup_member(ty, name) else {
            self.error(ResolveError::UnknownMember {
                name: name.to_string(),
                owner: self.session.type_display(ty),
                span,
            });
            return;
        };

        match entry {
            SymbolEntry::Entity(member) => {
                enum Kind {
                    Field,
                    Method,
                    Property,
                    EnumValue(Option<NodeId>),
                    Other,
                }
                let kind = match self.session.arena().get(member) {
                    Some(Node::Decl(Decl::Variable(_))) => Kind::Field,
                    Some(Node::Decl(Decl::Function(_))) => Kind::Method,
                    Some(Node::Decl(Decl::Property(_))) => Kind::Property,
                    Some(Node::Decl(Decl::EnumValue(v))) => Kind::EnumValue(v.parent),
                    _ => Kind::Other,
                };
                match kind {
                    Kind::Field => {
                        self.check_visible(member, name, span);
                        let object = self.steal_member_object(expr);
                        self.replace_with(
                            expr,
                            Expr::FieldRef {
                                object,
                                field: member,
                            },
                        );
                    }
                    Kind::Method => {
                        let object = self.steal_member_object(expr);
                        self.replace_with(
                            expr,
                            Expr::GroupRef {
                                name: name.to_string(),
                                candidates: vec![member],
                                object,
                            },
                        );
                    }
                    Kind::Property => {
                        self.check_visible(member, name, span);
                        let object = self.steal_member_object(expr);
                        self.rewrite_property_access(expr, name, member, object, span);
                    }
                    Kind::EnumValue(parent) => {
                        let value_ty = match parent {
                            Some(parent) => self.session.class_type(parent),
                            None => self.session.unknown_type(),
                        };
                        self.replace_with(
                            expr,
                            Expr::EnumValueRef {
                                value: member,
                                ty: value_ty,
                            },
                        );
                    }
                    Kind::Other => {}
                }
            }
            SymbolEntry::Group(group) => {
                let object = self.steal_member_object(expr);
                self.replace_with(
                    expr,
                    Expr::GroupRef {
                        name: name.to_string(),
                        candidates: group.functions,
                        object,
                    },
                );
            }
        }
    }

    /// Move the receiver edge out of an `UnresolvedMember` node so the
    /// replacement adopts the already-counted reference.
    fn steal_member_object(&mut self, expr: NodeId) -> Link<Expr> {
        let arena = self.session.arena_mut();
        match arena.get_mut(expr) {
            Some(Node::Expr(Expr::UnresolvedMember { object, .. })) => std::mem::take(object),
            _ => Link::empty(),
        }
    }

    // ======================================================================
    // Calls
    // ======================================================================

    fn resolve_call(&mut self, expr: NodeId, callee: Option<NodeId>, args: Vec<NodeId>) {
        let span = self.span_of(expr);
        for &arg in &args {
            self.resolve_rvalue(arg);
        }
        let Some(callee) = callee else {
            return;
        };
        self.resolve_rvalue(callee);
        // The callee link observes replacement; re-read its current form.
        let callee = self.session.arena().resolve(callee);

        enum CalleeKind {
            Group { name: String, candidates: Vec<NodeId> },
            Direct(NodeId),
            Value,
        }
        let kind = match self.session.arena().get(callee) {
            Some(Node::Expr(Expr::GroupRef {
                name, candidates, ..
            })) => CalleeKind::Group {
                name: name.clone(),
                candidates: candidates.clone(),
            },
            Some(Node::Expr(Expr::FunctionRef { func })) => CalleeKind::Direct(*func),
            Some(Node::Expr(Expr::MethodRef { func, .. })) => CalleeKind::Direct(*func),
            _ => CalleeKind::Value,
        };

        match kind {
            CalleeKind::Group { name, candidates } => {
                let candidates: Vec<Candidate> = candidates
                    .into_iter()
                    .map(|func| Candidate {
                        func,
                        visible: self.is_visible(func),
                    })
                    .collect();
                let winner = best_match(
                    self.session,
                    self.problems,
                    &name,
                    &candidates,
                    &args,
                    span,
                );
                if let Some(func) = winner {
                    self.collapse_group_callee(callee, func);
                }
            }
            CalleeKind::Direct(func) => {
                let name = self.function_name(func);
                let candidate = [Candidate {
                    func,
                    visible: self.is_visible(func),
                }];
                best_match(self.session, self.problems, &name, &candidate, &args, span);
            }
            CalleeKind::Value => self.resolve_value_call(callee, &args, span),
        }
    }

    /// Collapse a resolved overload group to a direct reference to the
    /// chosen function, carrying the receiver over.
    fn collapse_group_callee(&mut self, callee: NodeId, func: NodeId) {
        let arena = self.session.arena_mut();
        let object = match arena.get_mut(callee) {
            Some(Node::Expr(Expr::GroupRef { object, .. })) => std::mem::take(object),
            _ => return,
        };
        let span = arena.span(callee);
        let node = if object.is_empty() {
            Expr::FunctionRef { func }
        } else {
            Expr::MethodRef { object, func }
        };
        let new = arena.alloc(Node::Expr(node), span);
        arena.replace(callee, new);
    }

    /// A call through a function-typed value: the arguments convert to the
    /// value's parameter types.
    fn resolve_value_call(&mut self, callee: NodeId, args: &[NodeId], span: Span) {
        let ty = expr_type(self.session, callee);
        if is_unknown(self.session.arena(), ty) {
            return;
        }
        let params = match self.session.arena().get(ty) {
            Some(Node::Type(TypeNode::Function { params, .. })) => Some(params.clone()),
            _ => None,
        };
        let Some(params) = params else {
            self.error(ResolveError::NotCallable { span });
            return;
        };
        if params.len() != args.len() {
            self.error(ResolveError::NotCallable { span });
            return;
        }
        for (&arg, &param) in args.iter().zip(&params) {
            convert(self.session, self.problems, arg, param, false);
        }
    }

    // ======================================================================
    // Assignment
    // ======================================================================

    fn resolve_assign(&mut self, expr: NodeId, target: Option<NodeId>, value: Option<NodeId>) {
        let span = self.span_of(expr);
        let (Some(target), Some(value)) = (target, value) else {
            return;
        };

        // Index assignment becomes a setElement call on the container.
        if let Some(Node::Expr(Expr::UnresolvedIndex { .. })) = self.session.arena().get(target) {
            self.resolve_index_assign(expr, target, value, span);
            return;
        }

        let saved = self.lvalue;
        self.lvalue = true;
        self.resolve_expr(target);
        self.lvalue = saved;
        let target = self.session.arena().resolve(target);
        self.resolve_rvalue(value);

        enum TargetKind {
            Property(NodeId),
            Storage,
            Other,
        }
        let kind = match self.session.arena().get(target) {
            Some(Node::Expr(Expr::PropertyRef { prop, .. })) => TargetKind::Property(*prop),
            Some(Node::Expr(Expr::VariableRef { .. } | Expr::FieldRef { .. })) => {
                TargetKind::Storage
            }
            _ => TargetKind::Other,
        };

        match kind {
            TargetKind::Property(prop) => self.rewrite_property_assign(expr, target, prop, value, span),
            TargetKind::Storage => {
                let ty = expr_type(self.session, target);
                convert(self.session, self.problems, value, ty, false);
            }
            TargetKind::Other => {}
        }
    }

    /// Rewrite `obj.prop = value` into a setter call.
    fn rewrite_property_assign(
        &mut self,
        expr: NodeId,
        target: NodeId,
        prop: NodeId,
        value: NodeId,
        span: Span,
    ) {
        let (name, setter) = match self.session.arena().get(prop) {
            Some(Node::Decl(Decl::Property(p))) => {
                (p.name.clone(), p.setter.target(self.session.arena()))
            }
            _ => return,
        };
        let Some(setter) = setter else {
            self.error(ResolveError::ReadOnlyProperty { name, span });
            return;
        };
        if let Some(&param) = types::param_types(self.session, setter).last() {
            convert(self.session, self.problems, value, param, false);
        }

        let arena = self.session.arena_mut();
        let object = match arena.get_mut(target) {
            Some(Node::Expr(Expr::PropertyRef { object, .. })) => std::mem::take(object),
            _ => return,
        };
        let value_link = match arena.get_mut(expr) {
            Some(Node::Expr(Expr::Assign { value, .. })) => std::mem::take(value),
            _ => return,
        };
        let callee = if object.is_empty() {
            arena.alloc(Node::Expr(Expr::FunctionRef { func: setter }), span)
        } else {
            arena.alloc(
                Node::Expr(Expr::MethodRef {
                    object,
                    func: setter,
                }),
                span,
            )
        };
        let callee_link = Link::to(arena, callee);
        let mut call_args = NodeList::new();
        if let Some(v) = value_link.raw_id() {
            call_args.push_retained(v);
        }
        let call = arena.alloc(
            Node::Expr(Expr::Call {
                callee: callee_link,
                args: call_args,
            }),
            span,
        );
        arena.replace(expr, call);
    }

    /// Rewrite `obj[index] = value` into `obj.setElement(index, value)`.
    fn resolve_index_assign(&mut self, expr: NodeId, target: NodeId, value: NodeId, span: Span) {
        let (object, index) = match self.session.arena().get(target) {
            Some(Node::Expr(Expr::UnresolvedIndex { object, index })) => (
                object.target(self.session.arena()),
                index.target(self.session.arena()),
            ),
            _ => return,
        };
        let (Some(object), Some(index)) = (object, index) else {
            return;
        };
        self.resolve_rvalue(object);
        self.resolve_rvalue(index);
        self.resolve_rvalue(value);

        let ty = expr_type(self.session, object);
        if is_unknown(self.session.arena(), ty) {
            return;
        }
        let Some(func) = self.operator_method(ty, "setElement", &[index, value], span) else {
            return;
        };

        let arena = self.session.arena_mut();
        let (object_link, index_link) = match arena.get_mut(target) {
            Some(Node::Expr(Expr::UnresolvedIndex { object, index })) => {
                (std::mem::take(object), std::mem::take(index))
            }
            _ => return,
        };
        let value_link = match arena.get_mut(expr) {
            Some(Node::Expr(Expr::Assign { value, .. })) => std::mem::take(value),
            _ => return,
        };
        let callee = arena.alloc(
            Node::Expr(Expr::MethodRef {
                object: object_link,
                func,
            }),
            span,
        );
        let callee_link = Link::to(arena, callee);
        let mut args = NodeList::new();
        if let Some(i) = index_link.raw_id() {
            args.push_retained(i);
        }
        if let Some(v) = value_link.raw_id() {
            args.push_retained(v);
        }
        let call = arena.alloc(
            Node::Expr(Expr::Call {
                callee: callee_link,
                args,
            }),
            span,
        );
        arena.replace(expr, call);
    }

    // ======================================================================
    // Operators
    // ======================================================================

    /// The member method candidates for an operator on a type, run through
    /// overload selection for the given arguments.
    fn operator_method(
        &mut self,
        ty: NodeId,
        name: &str,
        args: &[NodeId],
        span: Span,
    ) -> Option<NodeId> {
        let Some(entry) = self.lookup_member(ty, name) else {
            self.error(ResolveError::UnknownMember {
                name: name.to_string(),
                owner: self.session.type_display(ty),
                span,
            });
            return None;
        };
        let candidates: Vec<Candidate> = entry
            .functions(self.session.arena())
            .into_iter()
            .map(|func| Candidate {
                func,
                visible: self.is_visible(func),
            })
            .collect();
        best_match(self.session, self.problems, name, &candidates, args, span)
    }

    fn resolve_binary(
        &mut self,
        expr: NodeId,
        op: BinaryOp,
        left: Option<NodeId>,
        right: Option<NodeId>,
        compound: bool,
    ) {
        let span = self.span_of(expr);
        let (Some(left), Some(right)) = (left, right) else {
            return;
        };

        if compound {
            let saved = self.lvalue;
            self.lvalue = true;
            self.resolve_expr(left);
            self.lvalue = saved;
        } else {
            self.resolve_rvalue(left);
        }
        self.resolve_rvalue(right);

        let left_ty = expr_type(self.session, left);
        if is_unknown(self.session.arena(), left_ty) {
            return;
        }

        if compound {
            let Some(name) = op.method_name() else {
                return;
            };
            let Some(method) = self.operator_method(left_ty, name, &[right], span) else {
                return;
            };
            let arena = self.session.arena_mut();
            let (left_link, right_link) = match arena.get_mut(expr) {
                Some(Node::Expr(Expr::UnresolvedBinary { left, right, .. })) => {
                    (std::mem::take(left), std::mem::take(right))
                }
                _ => return,
            };
            let new = arena.alloc(
                Node::Expr(Expr::CompoundAssign {
                    target: left_link,
                    method,
                    value: right_link,
                }),
                span,
            );
            arena.replace(expr, new);
            return;
        }

        match op {
            BinaryOp::Ne => self.rewrite_negated_equals(expr, left_ty, right, span),
            BinaryOp::Le | BinaryOp::Ge => {
                self.rewrite_ordered_or_equal(expr, op, left_ty, right, span)
            }
            _ => {
                let Some(name) = op.method_name() else {
                    return;
                };
                let Some(method) = self.operator_method(left_ty, name, &[right], span) else {
                    return;
                };
                self.rewrite_binary_call(expr, method, span);
            }
        }
    }

    /// Replace the binary node with `left.method(right)`.
    fn rewrite_binary_call(&mut self, expr: NodeId, method: NodeId, span: Span) {
        let arena = self.session.arena_mut();
        let (left_link, right_link) = match arena.get_mut(expr) {
            Some(Node::Expr(Expr::UnresolvedBinary { left, right, .. })) => {
                (std::mem::take(left), std::mem::take(right))
            }
            _ => return,
        };
        let callee = arena.alloc(
            Node::Expr(Expr::MethodRef {
                object: left_link,
                func: method,
            }),
            span,
        );
        let callee_link = Link::to(arena, callee);
        let mut args = NodeList::new();
        if let Some(r) = right_link.raw_id() {
            args.push_retained(r);
        }
        let call = arena.alloc(
            Node::Expr(Expr::Call {
                callee: callee_link,
                args,
            }),
            span,
        );
        arena.replace(expr, call);
    }

    /// `a != b` has no operator method of its own; it becomes
    /// `!(a.equals(b))`.
    fn rewrite_negated_equals(&mut self, expr: NodeId, left_ty: NodeId, right: NodeId, span: Span) {
        let Some(method) = self.operator_method(left_ty, "equals", &[right], span) else {
            return;
        };
        let arena = self.session.arena_mut();
        let (left_link, right_link) = match arena.get_mut(expr) {
            Some(Node::Expr(Expr::UnresolvedBinary { left, right, .. })) => {
                (std::mem::take(left), std::mem::take(right))
            }
            _ => return,
        };
        let callee = arena.alloc(
            Node::Expr(Expr::MethodRef {
                object: left_link,
                func: method,
            }),
            span,
        );
        let callee_link = Link::to(arena, callee);
        let mut args = NodeList::new();
        if let Some(r) = right_link.raw_id() {
            args.push_retained(r);
        }
        let call = arena.alloc(
            Node::Expr(Expr::Call {
                callee: callee_link,
                args,
            }),
            span,
        );
        let operand = Link::to(arena, call);
        let not = arena.alloc(Node::Expr(Expr::Not { operand }), span);
        arena.replace(expr, not);
    }

    /// `a <= b` / `a >= b` reference both the `equals` and the ordering
    /// method, since no single operator method covers them.
    fn rewrite_ordered_or_equal(
        &mut self,
        expr: NodeId,
        op: BinaryOp,
        left_ty: NodeId,
        right: NodeId,
        span: Span,
    ) {
        let (compare_name, kind) = match op {
            BinaryOp::Le => ("lessThan", OrderKind::LessOrEqual),
            BinaryOp::Ge => ("greaterThan", OrderKind::GreaterOrEqual),
            _ => return,
        };
        // The ordering method drives argument conversion; equals must then
        // accept the same operand.
        let Some(compare) = self.operator_method(left_ty, compare_name, &[right], span) else {
            return;
        };
        let equals = self
            .lookup_member(left_ty, "equals")
            .map(|entry| entry.functions(self.session.arena()))
            .and_then(|funcs| {
                funcs.into_iter().find(|&f| {
                    let params = types::param_types(self.session, f);
                    params.len() == 1 && can_convert(self.session, right, params[0], false)
                })
            });
        let Some(equals) = equals else {
            self.error(ResolveError::UnknownMember {
                name: "equals".to_string(),
                owner: self.session.type_display(left_ty),
                span,
            });
            return;
        };

        let arena = self.session.arena_mut();
        let (left_link, right_link) = match arena.get_mut(expr) {
            Some(Node::Expr(Expr::UnresolvedBinary { left, right, .. })) => {
                (std::mem::take(left), std::mem::take(right))
            }
            _ => return,
        };
        let new = arena.alloc(
            Node::Expr(Expr::OrderedOrEqual {
                left: left_link,
                right: right_link,
                equals,
                compare,
                kind,
            }),
            span,
        );
        arena.replace(expr, new);
    }

    fn resolve_unary(&mut self, expr: NodeId, op: UnaryOp, operand: Option<NodeId>) {
        let span = self.span_of(expr);
        let Some(operand) = operand else {
            return;
        };
        self.resolve_rvalue(operand);
        let ty = expr_type(self.session, operand);
        if is_unknown(self.session.arena(), ty) {
            return;
        }
        let Some(method) = self.operator_method(ty, op.method_name(), &[], span) else {
            return;
        };
        let arena = self.session.arena_mut();
        let operand_link = match arena.get_mut(expr) {
            Some(Node::Expr(Expr::UnresolvedUnary { operand, .. })) => std::mem::take(operand),
            _ => return,
        };
        let callee = arena.alloc(
            Node::Expr(Expr::MethodRef {
                object: operand_link,
                func: method,
            }),
            span,
        );
        let callee_link = Link::to(arena, callee);
        let call = arena.alloc(
            Node::Expr(Expr::Call {
                callee: callee_link,
                args: NodeList::new(),
            }),
            span,
        );
        arena.replace(expr, call);
    }

    /// `obj[index]` in rvalue position becomes `obj.getElement(index)`.
    fn resolve_index(&mut self, expr: NodeId, object: Option<NodeId>, index: Option<NodeId>) {
        let span = self.span_of(expr);
        let (Some(object), Some(index)) = (object, index) else {
            return;
        };
        self.resolve_rvalue(object);
        self.resolve_rvalue(index);
        let ty = expr_type(self.session, object);
        if is_unknown(self.session.arena(), ty) {
            return;
        }
        let Some(func) = self.operator_method(ty, "getElement", &[index], span) else {
            return;
        };
        let arena = self.session.arena_mut();
        let (object_link, index_link) = match arena.get_mut(expr) {
            Some(Node::Expr(Expr::UnresolvedIndex { object, index })) => {
                (std::mem::take(object), std::mem::take(index))
            }
            _ => return,
        };
        let callee = arena.alloc(
            Node::Expr(Expr::MethodRef {
                object: object_link,
                func,
            }),
            span,
        );
        let callee_link = Link::to(arena, callee);
        let mut args = NodeList::new();
        if let Some(i) = index_link.raw_id() {
            args.push_retained(i);
        }
        let call = arena.alloc(
            Node::Expr(Expr::Call {
                callee: callee_link,
                args,
            }),
            span,
        );
        arena.replace(expr, call);
    }

    // ======================================================================
    // Object creation
    // ======================================================================

    fn resolve_new(&mut self, expr: NodeId, type_name: &QualifiedName, args: Vec<NodeId>) {
        let span = self.span_of(expr);
        for &arg in &args {
            self.resolve_rvalue(arg);
        }
        let class_ty = self.resolve_named_type(type_name, span);
        let decl = match self.session.arena().get(class_ty) {
            Some(Node::Type(TypeNode::Class { decl })) => *decl,
            _ => return,
        };

        let ctor = match self.lookup_member(decl, "init") {
            Some(entry) => {
                let candidates: Vec<Candidate> = entry
                    .functions(self.session.arena())
                    .into_iter()
                    .filter(|&f| {
                        matches!(
                            self.session.arena().get(f),
                            Some(Node::Decl(Decl::Function(func)))
                                if func.kind == FunctionKind::Constructor
                        )
                    })
                    .map(|func| Candidate {
                        func,
                        visible: self.is_visible(func),
                    })
                    .collect();
                best_match(self.session, self.problems, "init", &candidates, &args, span)
            }
            None => {
                self.error(ResolveError::NoMatchingOverload {
                    name: "init".to_string(),
                    args: String::new(),
                    invisible_match: false,
                    span,
                });
                None
            }
        };

        let arena = self.session.arena_mut();
        let args_list = match arena.get_mut(expr) {
            Some(Node::Expr(Expr::UnresolvedNew { args, .. })) => std::mem::take(args),
            _ => return,
        };
        let new = arena.alloc(
            Node::Expr(Expr::New {
                class_ty,
                ctor,
                args: args_list,
            }),
            span,
        );
        arena.replace(expr, new);
    }
}
