//! Declaration resolution: variables, functions, classes, and the
//! class-body machinery (base-member merge, implicit constructors,
//! property synthesis).

use rustc_hash::FxHashSet;

use vela_core::{Modifiers, ResolveError, Span};

use vela_ast::{
    BuiltIn, Decl, Expr, FunctionDecl, FunctionKind, Link, Node, NodeId, NodeList, ParameterDecl,
    PropertyDecl, Stmt, TypeKind, TypeNode,
};

use crate::conversion::convert;
use crate::symbol_table::SymbolEntry;
use crate::types::{self, expr_type};

use super::Resolver;

impl Resolver<'_> {
    // ======================================================================
    // Declare pass
    // ======================================================================

    /// Register a top-level declaration in the module scope before any
    /// body is resolved, so later declarations can reference earlier and
    /// later ones alike.
    pub(crate) fn declare_top(&mut self, stmt: NodeId) {
        let decl = match self.session.arena().get(stmt) {
            Some(Node::Stmt(Stmt::Decl { decl })) => decl.target(self.session.arena()),
            _ => None,
        };
        let Some(decl) = decl else {
            return;
        };
        self.declare_entity(decl);
        if matches!(
            self.session.arena().get(decl),
            Some(Node::Decl(Decl::Class(_)))
        ) {
            self.session.class_type(decl);
        }
    }

    /// Modifier checks plus insertion into the current scope.
    fn declare_entity(&mut self, decl: NodeId) {
        let span = self.span_of(decl);
        let (name, modifiers) = match self.session.arena().get(decl) {
            Some(Node::Decl(d)) => (d.name().to_string(), d.modifiers()),
            _ => return,
        };
        if modifiers.visibility_conflict() {
            self.error(ResolveError::ConflictingModifiers {
                name: name.clone(),
                span,
            });
        }
        self.decl_home.insert(decl, self.module);
        let added = {
            let arena = self.session.arena();
            self.tables.get_or_create(self.module).add(arena, decl)
        };
        if !added {
            self.error(ResolveError::DuplicateName { name, span });
        }
    }

    // ======================================================================
    // Dispatch
    // ======================================================================

    pub(crate) fn resolve_decl(&mut self, decl: NodeId, top_level: bool) {
        let decl = self.session.arena().resolve(decl);
        enum Kind {
            Variable,
            Function,
            Class,
            Other,
        }
        let kind = match self.session.arena().get(decl) {
            Some(Node::Decl(Decl::Variable(_))) => Kind::Variable,
            Some(Node::Decl(Decl::Function(_))) => Kind::Function,
            Some(Node::Decl(Decl::Class(_))) => Kind::Class,
            Some(Node::Decl(_)) => Kind::Other,
            _ => return,
        };
        match kind {
            Kind::Variable => self.resolve_variable(decl, !top_level),
            Kind::Function => {
                if !top_level {
                    self.declare_entity(decl);
                }
                self.resolve_function(decl);
            }
            Kind::Class => {
                if !top_level {
                    self.declare_entity(decl);
                    self.session.class_type(decl);
                }
                self.resolve_class(decl);
            }
            Kind::Other => {}
        }
    }

    // ======================================================================
    // Variables
    // ======================================================================

    /// Resolve a variable's declared type and initializer. `add_to_scope`
    /// is set for locals; module-level and member variables are already
    /// registered by the declare pass.
    pub(crate) fn resolve_variable(&mut self, decl: NodeId, add_to_scope: bool) {
        let span = self.span_of(decl);
        let (name, modifiers, declared, init) = match self.session.arena().get(decl) {
            Some(Node::Decl(Decl::Variable(v))) => (
                v.name.clone(),
                v.modifiers,
                v.declared_type.target(self.session.arena()),
                v.init.target(self.session.arena()),
            ),
            _ => return,
        };
        if add_to_scope && modifiers.visibility_conflict() {
            self.error(ResolveError::ConflictingModifiers {
                name: name.clone(),
                span,
            });
        }

        if let Some(init) = init {
            self.resolve_expr(init);
        }

        let mut ty = match declared {
            Some(node) => self.resolve_type(node),
            None => {
                // Inferred from the initializer.
                let inferred = match init {
                    Some(init) => expr_type(self.session, init),
                    None => self.session.unknown_type(),
                };
                let link = Link::to(self.session.arena_mut(), inferred);
                if let Some(Node::Decl(Decl::Variable(v))) = self.session.arena_mut().get_mut(decl)
                {
                    v.declared_type = link;
                }
                inferred
            }
        };

        if types::builtin_of(self.session.arena(), ty) == Some(BuiltIn::Void) {
            self.error(ResolveError::InvalidVoidUse { span });
            let unknown = self.session.unknown_type();
            let arena = self.session.arena_mut();
            let mut link = match arena.get_mut(decl) {
                Some(Node::Decl(Decl::Variable(v))) => std::mem::take(&mut v.declared_type),
                _ => return,
            };
            link.rebind(arena, Some(unknown));
            if let Some(Node::Decl(Decl::Variable(v))) = arena.get_mut(decl) {
                v.declared_type = link;
            }
            ty = unknown;
        }

        if let Some(init) = init {
            convert(self.session, self.problems, init, ty, false);
        }

        if add_to_scope {
            self.decl_home.insert(decl, self.module);
            let added = {
                let arena = self.session.arena();
                self.tables.get_or_create(self.module).add(arena, decl)
            };
            if !added {
                self.error(ResolveError::DuplicateName { name, span });
            }
        }
    }

    // ======================================================================
    // Functions
    // ======================================================================

    pub(crate) fn resolve_function(&mut self, func: NodeId) {
        let span = self.span_of(func);
        let (name, modifiers, body, ret_node, params) = match self.session.arena().get(func) {
            Some(Node::Decl(Decl::Function(f))) => (
                f.name.clone(),
                f.modifiers,
                f.body.target(self.session.arena()),
                f.return_type.target(self.session.arena()),
                f.params.ids(self.session.arena()),
            ),
            _ => return,
        };

        let is_extern = modifiers.contains(Modifiers::EXTERN);
        match (body, is_extern) {
            (None, false) => self.error(ResolveError::MissingBody {
                name: name.clone(),
                span,
            }),
            (Some(_), true) => self.error(ResolveError::ExternWithBody {
                name: name.clone(),
                span,
            }),
            _ => {}
        }

        match ret_node {
            Some(node) => {
                self.resolve_type(node);
            }
            None => {
                let void = self.session.builtin(BuiltIn::Void);
                let link = Link::to(self.session.arena_mut(), void);
                if let Some(Node::Decl(Decl::Function(f))) = self.session.arena_mut().get_mut(func)
                {
                    f.return_type = link;
                }
            }
        }

        for &param in &params {
            let pty = match self.session.arena().get(param) {
                Some(Node::Decl(Decl::Parameter(p))) => p.declared_type.target(self.session.arena()),
                _ => continue,
            };
            if let Some(node) = pty {
                let resolved = self.resolve_type(node);
                if types::builtin_of(self.session.arena(), resolved) == Some(BuiltIn::Void) {
                    self.error(ResolveError::InvalidVoidUse {
                        span: self.span_of(param),
                    });
                }
            }
        }

        self.fn_stack.push(func);
        self.table().enter_scope();
        for &param in &params {
            let added = {
                let arena = self.session.arena();
                self.tables.get_or_create(self.module).add(arena, param)
            };
            if !added {
                let pname = match self.session.arena().get(param) {
                    Some(Node::Decl(d)) => d.name().to_string(),
                    _ => String::new(),
                };
                self.error(ResolveError::DuplicateName {
                    name: pname,
                    span: self.span_of(param),
                });
            }
        }
        if let Some(body) = body {
            self.resolve_stmt(body, false);
        }
        self.table().leave_scope();
        self.fn_stack.pop();
    }

    // ======================================================================
    // Classes
    // ======================================================================

    pub(crate) fn resolve_class(&mut self, class: NodeId) {
        let (name, kind, base_node) = match self.session.arena().get(class) {
            Some(Node::Decl(Decl::Class(c))) => {
                (c.name.clone(), c.kind, c.base.target(self.session.arena()))
            }
            _ => return,
        };
        let class_ty = self.session.class_type(class);

        // Resolve the declared base, or attach the implicit core root.
        let mut base_ty = match base_node {
            Some(node) if kind == TypeKind::Class => {
                let resolved = self.resolve_type(node);
                matches!(
                    self.session.arena().get(resolved),
                    Some(Node::Type(TypeNode::Class { .. }))
                )
                .then_some(resolved)
            }
            _ => None,
        };
        if base_node.is_none()
            && base_ty.is_none()
            && kind == TypeKind::Class
            && !self.is_core_root(&name)
        {
            if let Some(root) = self.core_root_class() {
                if root != class {
                    let root_ty = self.session.class_type(root);
                    let link = Link::to(self.session.arena_mut(), root_ty);
                    if let Some(Node::Decl(Decl::Class(c))) =
                        self.session.arena_mut().get_mut(class)
                    {
                        c.base = link;
                    }
                    base_ty = Some(root_ty);
                }
            }
        }

        let mut members = self.class_member_decls(class);

        let merged = self.merge_base_members(class, base_ty);

        // Own members: attach parents, normalize constructors, register.
        for &member in &members {
            let span = self.span_of(member);
            let (mname, mmodifiers) = {
                let arena = self.session.arena_mut();
                let Some(Node::Decl(d)) = arena.get_mut(member) else {
                    continue;
                };
                d.set_parent(Some(class));
                if let Decl::Function(f) = d {
                    if f.name == "init" {
                        f.kind = FunctionKind::Constructor;
                    } else if f.kind == FunctionKind::Free {
                        f.kind = FunctionKind::Method;
                    }
                }
                (d.name().to_string(), d.modifiers())
            };
            if mmodifiers.visibility_conflict() {
                self.error(ResolveError::ConflictingModifiers {
                    name: mname.clone(),
                    span,
                });
            }
            self.decl_home.insert(member, self.module);
            let added = {
                let arena = self.session.arena();
                self.tables
                    .get_or_create(self.module)
                    .add_member(arena, class, member)
            };
            if !added {
                if merged.contains(&mname) {
                    // An own member shadows what was merged from a base.
                    self.table().remove_member(class, &mname);
                    let arena = self.session.arena();
                    self.tables
                        .get_or_create(self.module)
                        .add_member(arena, class, member);
                } else {
                    self.error(ResolveError::DuplicateName { name: mname, span });
                }
            }
        }

        // Implicit default constructor.
        let has_ctor = members.iter().any(|&m| {
            matches!(
                self.session.arena().get(m),
                Some(Node::Decl(Decl::Function(f))) if f.kind == FunctionKind::Constructor
            )
        });
        if !has_ctor && kind != TypeKind::Enum {
            let ctor = self.synthesize_default_ctor(class);
            members.push(ctor);
        }

        // Default initializers call the base class's default constructor,
        // unless the type has no base (core root) or is a struct.
        if kind == TypeKind::Class {
            if let Some(base_ty) = base_ty {
                self.attach_ctor_initializers(class_ty, base_ty, &members);
            }
        }

        // Member bodies.
        self.type_stack.push(class);
        self.table().enter_entity_scope(class);
        for &member in &members {
            enum MKind {
                Variable,
                Function,
                Class,
                Other,
            }
            let mkind = match self.session.arena().get(member) {
                Some(Node::Decl(Decl::Variable(_))) => MKind::Variable,
                Some(Node::Decl(Decl::Function(_))) => MKind::Function,
                Some(Node::Decl(Decl::Class(_))) => MKind::Class,
                _ => MKind::Other,
            };
            match mkind {
                MKind::Variable => self.resolve_variable(member, false),
                MKind::Function => self.resolve_function(member),
                MKind::Class => self.resolve_class(member),
                MKind::Other => {}
            }
        }
        self.table().leave_scope();
        self.type_stack.pop();

        // Non-private instance variables become read/write properties.
        if kind != TypeKind::Enum {
            for &member in &members {
                let synthesize = match self.session.arena().get(member) {
                    Some(Node::Decl(Decl::Variable(v))) => {
                        !v.modifiers.contains(Modifiers::PRIVATE)
                            && !v.modifiers.contains(Modifiers::STATIC)
                    }
                    _ => false,
                };
                if synthesize {
                    self.synthesize_property(class, class_ty, member);
                }
            }
        }
    }

    /// The declaration ids in a class body, in order.
    fn class_member_decls(&self, class: NodeId) -> Vec<NodeId> {
        let arena = self.session.arena();
        let Some(Node::Decl(Decl::Class(c))) = arena.get(class) else {
            return Vec::new();
        };
        c.body
            .iter(arena)
            .filter_map(|stmt| match arena.get(stmt) {
                Some(Node::Stmt(Stmt::Decl { decl })) => decl.target(arena),
                _ => None,
            })
            .collect()
    }

    fn is_core_root(&self, name: &str) -> bool {
        name == "Object"
            && self.session.module(self.module).name == *self.session.core_module_name()
    }

    /// The core root class declaration, if the core module is reachable.
    fn core_root_class(&mut self) -> Option<NodeId> {
        let core = if self.session.module(self.module).name == *self.session.core_module_name() {
            self.module
        } else {
            let core_name = self.session.core_module_name().clone();
            self.imports
                .iter()
                .copied()
                .find(|&m| self.session.module(m).name == core_name)?
        };
        match self.tables.get(core)?.lookup_global("Object")? {
            SymbolEntry::Entity(decl) => {
                let decl = *decl;
                matches!(
                    self.session.arena().get(decl),
                    Some(Node::Decl(Decl::Class(_)))
                )
                .then_some(decl)
            }
            SymbolEntry::Group(_) => None,
        }
    }

    /// Copy every non-private, non-constructor, non-variable member of
    /// each base class (nearest first) into this class's member scope.
    /// Returns the names that were merged.
    fn merge_base_members(&mut self, class: NodeId, base_ty: Option<NodeId>) -> FxHashSet<String> {
        let mut merged = FxHashSet::default();
        let mut chain = base_ty;
        while let Some(bty) = chain {
            let base_decl = match self.session.arena().get(bty) {
                Some(Node::Type(TypeNode::Class { decl })) => *decl,
                _ => break,
            };
            let home = self
                .decl_home
                .get(&base_decl)
                .copied()
                .unwrap_or(self.module);
            let entries: Vec<(String, SymbolEntry)> = self
                .tables
                .get(home)
                .and_then(|t| t.member_scope(base_decl))
                .map(|scope| {
                    scope
                        .entries()
                        .map(|(n, e)| (n.clone(), e.clone()))
                        .collect()
                })
                .unwrap_or_default();

            for (name, entry) in entries {
                let candidates = match entry {
                    SymbolEntry::Entity(id) => vec![id],
                    SymbolEntry::Group(group) => group.functions,
                };
                for id in candidates {
                    let inheritable = match self.session.arena().get(id) {
                        Some(Node::Decl(Decl::Variable(_))) => false,
                        Some(Node::Decl(Decl::Function(f))) => {
                            f.kind != FunctionKind::Constructor
                                && !f.modifiers.contains(Modifiers::PRIVATE)
                        }
                        Some(Node::Decl(d)) => !d.modifiers().contains(Modifiers::PRIVATE),
                        _ => false,
                    };
                    if !inheritable {
                        continue;
                    }
                    let added = {
                        let arena = self.session.arena();
                        self.tables
                            .get_or_create(self.module)
                            .add_member(arena, class, id)
                    };
                    if added {
                        merged.insert(name.clone());
                    }
                }
            }

            chain = match self.session.arena().get(base_decl) {
                Some(Node::Decl(Decl::Class(c))) => c.base.target(self.session.arena()),
                _ => None,
            };
        }
        merged
    }

    /// Append a synthesized declaration to the class body, wrapped in a
    /// declaration statement.
    fn push_class_member_stmt(&mut self, class: NodeId, decl: NodeId) {
        let arena = self.session.arena_mut();
        let decl_link = Link::to(arena, decl);
        let stmt = arena.alloc(
            Node::Stmt(Stmt::Decl { decl: decl_link }),
            Span::default(),
        );
        // The body list lives inside the class payload; take it out while
        // pushing so the arena stays borrowable.
        let mut body = match arena.get_mut(class) {
            Some(Node::Decl(Decl::Class(c))) => std::mem::take(&mut c.body),
            _ => return,
        };
        body.push(arena, stmt);
        if let Some(Node::Decl(Decl::Class(c))) = arena.get_mut(class) {
            c.body = body;
        }
    }

    /// Build and register the implicit empty default constructor.
    fn synthesize_default_ctor(&mut self, class: NodeId) -> NodeId {
        let void = self.session.builtin(BuiltIn::Void);
        let ctor = {
            let arena = self.session.arena_mut();
            let block = arena.alloc(
                Node::Stmt(Stmt::Block {
                    body: NodeList::new(),
                }),
                Span::default(),
            );
            let body = Link::to(arena, block);
            let return_type = Link::to(arena, void);
            arena.alloc(
                Node::Decl(Decl::Function(FunctionDecl {
                    name: "init".to_string(),
                    modifiers: Modifiers::empty(),
                    kind: FunctionKind::Constructor,
                    params: NodeList::new(),
                    return_type,
                    body,
                    initializer: Link::empty(),
                    parent: Some(class),
                })),
                Span::default(),
            )
        };
        self.decl_home.insert(ctor, self.module);
        self.push_class_member_stmt(class, ctor);
        {
            let arena = self.session.arena();
            self.tables
                .get_or_create(self.module)
                .add_member(arena, class, ctor);
        }
        ctor
    }

    /// Point every constructor without an explicit initializer at the
    /// base class's default constructor.
    fn attach_ctor_initializers(
        &mut self,
        class_ty: NodeId,
        base_ty: NodeId,
        members: &[NodeId],
    ) {
        let base_decl = match self.session.arena().get(base_ty) {
            Some(Node::Type(TypeNode::Class { decl })) => *decl,
            _ => return,
        };
        let Some(base_init) = self.default_ctor_of(base_decl) else {
            return;
        };

        for &member in members {
            let needs_init = match self.session.arena().get(member) {
                Some(Node::Decl(Decl::Function(f))) => {
                    f.kind == FunctionKind::Constructor && f.initializer.is_empty()
                }
                _ => false,
            };
            if !needs_init {
                continue;
            }
            let call = {
                let arena = self.session.arena_mut();
                let this = arena.alloc(Node::Expr(Expr::This { ty: class_ty }), Span::default());
                let object = Link::to(arena, this);
                let callee = arena.alloc(
                    Node::Expr(Expr::MethodRef {
                        object,
                        func: base_init,
                    }),
                    Span::default(),
                );
                let callee_link = Link::to(arena, callee);
                arena.alloc(
                    Node::Expr(Expr::Call {
                        callee: callee_link,
                        args: NodeList::new(),
                    }),
                    Span::default(),
                )
            };
            let link = Link::to(self.session.arena_mut(), call);
            if let Some(Node::Decl(Decl::Function(f))) = self.session.arena_mut().get_mut(member) {
                f.initializer = link;
            }
        }
    }

    /// The zero-parameter constructor of a class, if declared.
    fn default_ctor_of(&mut self, class: NodeId) -> Option<NodeId> {
        let entry = self.lookup_member(class, "init")?;
        let arena = self.session.arena();
        entry.functions(arena).into_iter().find(|&f| {
            matches!(
                arena.get(f),
                Some(Node::Decl(Decl::Function(func))) if func.params.is_empty()
            )
        })
    }

    /// Replace a non-private instance variable's symbol slot with a
    /// synthesized read/write property; the variable itself stays in the
    /// body as backing storage.
    fn synthesize_property(&mut self, class: NodeId, class_ty: NodeId, var: NodeId) {
        let (name, modifiers, var_ty) = match self.session.arena().get(var) {
            Some(Node::Decl(Decl::Variable(v))) => (
                v.name.clone(),
                v.modifiers,
                v.declared_type
                    .target(self.session.arena())
                    .unwrap_or(self.session.unknown_type()),
            ),
            _ => return,
        };
        let void = self.session.builtin(BuiltIn::Void);

        // Getter: return this.<var>
        let getter = {
            let arena = self.session.arena_mut();
            let this = arena.alloc(Node::Expr(Expr::This { ty: class_ty }), Span::default());
            let object = Link::to(arena, this);
            let field = arena.alloc(
                Node::Expr(Expr::FieldRef { object, field: var }),
                Span::default(),
            );
            let value = Link::to(arena, field);
            let ret = arena.alloc(Node::Stmt(Stmt::Return { value }), Span::default());
            let mut body = NodeList::new();
            body.push(arena, ret);
            let block = arena.alloc(Node::Stmt(Stmt::Block { body }), Span::default());
            let body_link = Link::to(arena, block);
            let return_type = Link::to(arena, var_ty);
            arena.alloc(
                Node::Decl(Decl::Function(FunctionDecl {
                    name: name.clone(),
                    modifiers: Modifiers::empty(),
                    kind: FunctionKind::Getter,
                    params: NodeList::new(),
                    return_type,
                    body: body_link,
                    initializer: Link::empty(),
                    parent: Some(class),
                })),
                Span::default(),
            )
        };

        // Setter: this.<var> = value
        let setter = {
            let arena = self.session.arena_mut();
            let param_ty = Link::to(arena, var_ty);
            let param = arena.alloc(
                Node::Decl(Decl::Parameter(ParameterDecl {
                    name: "value".to_string(),
                    declared_type: param_ty,
                    parent: None,
                })),
                Span::default(),
            );
            let mut params = NodeList::new();
            params.push(arena, param);

            let this = arena.alloc(Node::Expr(Expr::This { ty: class_ty }), Span::default());
            let object = Link::to(arena, this);
            let target = arena.alloc(
                Node::Expr(Expr::FieldRef { object, field: var }),
                Span::default(),
            );
            let value_ref = arena.alloc(Node::Expr(Expr::VariableRef { decl: param }), Span::default());
            let target_link = Link::to(arena, target);
            let value_link = Link::to(arena, value_ref);
            let assign = arena.alloc(
                Node::Expr(Expr::Assign {
                    target: target_link,
                    value: value_link,
                }),
                Span::default(),
            );
            let expr_link = Link::to(arena, assign);
            let stmt = arena.alloc(Node::Stmt(Stmt::Expr { expr: expr_link }), Span::default());
            let mut body = NodeList::new();
            body.push(arena, stmt);
            let block = arena.alloc(Node::Stmt(Stmt::Block { body }), Span::default());
            let body_link = Link::to(arena, block);
            let return_type = Link::to(arena, void);
            arena.alloc(
                Node::Decl(Decl::Function(FunctionDecl {
                    name: name.clone(),
                    modifiers: Modifiers::empty(),
                    kind: FunctionKind::Setter,
                    params,
                    return_type,
                    body: body_link,
                    initializer: Link::empty(),
                    parent: Some(class),
                })),
                Span::default(),
            )
        };

        let prop = {
            let arena = self.session.arena_mut();
            let getter_link = Link::to(arena, getter);
            let setter_link = Link::to(arena, setter);
            arena.alloc(
                Node::Decl(Decl::Property(PropertyDecl {
                    name: name.clone(),
                    modifiers,
                    getter: getter_link,
                    setter: setter_link,
                    parent: Some(class),
                })),
                Span::default(),
            )
        };
        self.decl_home.insert(prop, self.module);
        self.push_class_member_stmt(class, prop);

        // The property takes the variable's symbol slot.
        self.tables
            .get_or_create(self.module)
            .set_member_entry(class, name, SymbolEntry::Entity(prop));
    }
}
