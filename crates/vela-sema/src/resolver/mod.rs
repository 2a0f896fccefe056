//! The resolution pass.
//!
//! A full-tree walk over one module: name resolution, member and overload
//! resolution, visibility checking, type conversion, and the rewriting of
//! unresolved placeholder nodes into resolved forms through the arena's
//! replace protocol. Every language-level failure appends a diagnostic
//! and resolution continues with the unknown type standing in; the only
//! aborting condition is a missing dependency, reported through
//! [`Outcome::NeedsModules`].

mod decls;
mod exprs;
mod stmts;

use rustc_hash::{FxHashMap, FxHashSet};

use vela_core::{Problems, QualifiedName, ResolveError, Span};

use vela_ast::{
    BuiltIn, Decl, FunctionDecl, FunctionKind, Link, Node, NodeId, NodeList, ParameterDecl,
    PropertyDecl, Session, TypeNode,
};
use vela_ast::session::ModuleId;

use crate::symbol_table::{SymbolEntry, SymbolTable, SymbolTables};
use crate::visibility::visibility_of;

use vela_core::Modifiers;

/// The outcome of analyzing one module.
///
/// `NeedsModules` is control flow, not a diagnostic: the driver analyzes
/// the named modules first and re-invokes the pass on this module from an
/// unresolved tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The pass ran to completion; diagnostics (possibly none) are in the
    /// sink.
    Resolved,
    /// The module imports modules that are not yet analyzed. Non-empty.
    NeedsModules(Vec<String>),
}

/// The resolution driver, holding state that outlives single module runs:
/// per-module symbol tables, the home module of every declaration, and
/// the lazily-built member scopes of built-in and array types.
#[derive(Debug, Default)]
pub struct Analyzer {
    tables: SymbolTables,
    decl_home: FxHashMap<NodeId, ModuleId>,
    builtin_members: SymbolTable,
}

impl Analyzer {
    /// Create an analyzer with no state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the resolution pass over one module.
    pub fn analyze_module(
        &mut self,
        session: &mut Session,
        problems: &mut Problems,
        module: ModuleId,
    ) -> Outcome {
        let mut resolver = Resolver {
            session,
            problems,
            tables: &mut self.tables,
            decl_home: &mut self.decl_home,
            builtin_members: &mut self.builtin_members,
            module,
            imports: Vec::new(),
            fn_stack: Vec::new(),
            type_stack: Vec::new(),
            lvalue: false,
            missing: Vec::new(),
        };
        resolver.run()
    }

    /// The symbol tables built so far (tests and tooling).
    pub fn tables(&self) -> &SymbolTables {
        &self.tables
    }
}

/// Per-run resolution state.
pub(crate) struct Resolver<'a> {
    pub(crate) session: &'a mut Session,
    pub(crate) problems: &'a mut Problems,
    pub(crate) tables: &'a mut SymbolTables,
    pub(crate) decl_home: &'a mut FxHashMap<NodeId, ModuleId>,
    pub(crate) builtin_members: &'a mut SymbolTable,
    pub(crate) module: ModuleId,
    /// Directly-imported modules available for fallback lookup.
    pub(crate) imports: Vec<ModuleId>,
    /// Enclosing functions, innermost last.
    pub(crate) fn_stack: Vec<NodeId>,
    /// Enclosing type declarations, innermost last.
    pub(crate) type_stack: Vec<NodeId>,
    /// Suppresses the getter-call rewrite on the left side of an
    /// assignment.
    pub(crate) lvalue: bool,
    /// Required-but-unanalyzed module names collected during import
    /// resolution.
    pub(crate) missing: Vec<String>,
}

impl Resolver<'_> {
    pub(crate) fn run(&mut self) -> Outcome {
        // Re-invocation restarts from scratch.
        self.tables.reset(self.module);

        self.resolve_imports();
        if !self.missing.is_empty() {
            let mut names = std::mem::take(&mut self.missing);
            let mut seen = FxHashSet::default();
            names.retain(|name| seen.insert(name.clone()));
            return Outcome::NeedsModules(names);
        }

        let body = self
            .session
            .module(self.module)
            .body
            .ids(self.session.arena());
        for &stmt in &body {
            self.declare_top(stmt);
        }
        for &stmt in &body {
            self.resolve_stmt(stmt, true);
        }

        self.session.module_mut(self.module).resolved = true;
        Outcome::Resolved
    }

    /// Resolve import statements, including the implicit core import.
    ///
    /// Imports of modules that are registered but not yet analyzed, or
    /// not registered at all, accumulate in `missing`. A session without
    /// a core module runs freestanding.
    fn resolve_imports(&mut self) {
        let core = self.session.core_module_name().clone();
        let own = self.session.module(self.module).name.clone();

        if own != core {
            if let Some(core_id) = self.session.get(&core) {
                if self.session.module(core_id).resolved {
                    self.imports.push(core_id);
                } else {
                    self.missing.push(core.to_string());
                }
            }
        }

        let import_nodes = self.session.module(self.module).imports.clone();
        for imp in import_nodes {
            let name = match self.session.arena().get(imp) {
                Some(Node::Import(i)) => i.name.clone(),
                _ => continue,
            };
            if name == own {
                continue;
            }
            match self.session.get(&name) {
                Some(m) if self.session.module(m).resolved => {
                    if let Some(Node::Import(i)) = self.session.arena_mut().get_mut(imp) {
                        i.resolved = Some(m);
                    }
                    if !self.imports.contains(&m) {
                        self.imports.push(m);
                    }
                }
                _ => self.missing.push(name.to_string()),
            }
        }
    }

    // ======================================================================
    // Shared lookups
    // ======================================================================

    pub(crate) fn table(&mut self) -> &mut SymbolTable {
        self.tables.get_or_create(self.module)
    }

    pub(crate) fn error(&mut self, err: ResolveError) {
        self.problems.error(err);
    }

    pub(crate) fn span_of(&self, id: NodeId) -> Span {
        self.session.arena().span(id)
    }

    /// Whether the declaration belongs to the module under analysis.
    /// Declarations the pass has not registered (locals, synthesized
    /// nodes) count as local.
    pub(crate) fn declared_here(&self, decl: NodeId) -> bool {
        self.decl_home
            .get(&decl)
            .map_or(true, |m| *m == self.module)
    }

    /// Visibility-check a reference; appends the violation and returns
    /// `false` when illegal.
    pub(crate) fn check_visible(&mut self, decl: NodeId, name: &str, span: Span) -> bool {
        let vis = visibility_of(
            self.session.arena(),
            decl,
            self.declared_here(decl),
            &self.type_stack,
        );
        match vis.into_error(name, span) {
            Some(err) => {
                self.problems.error(err);
                false
            }
            None => true,
        }
    }

    /// Whether a declaration is visible without reporting.
    pub(crate) fn is_visible(&self, decl: NodeId) -> bool {
        visibility_of(
            self.session.arena(),
            decl,
            self.declared_here(decl),
            &self.type_stack,
        )
        .is_visible()
    }

    /// Local lookup, falling back to the namespaces of directly-imported
    /// modules (first match wins).
    pub(crate) fn lookup_name(&mut self, name: &str) -> Option<(SymbolEntry, ModuleId)> {
        if let Some(entry) = self.tables.get_or_create(self.module).lookup(name) {
            return Some((entry.clone(), self.module));
        }
        for &m in &self.imports {
            if let Some(entry) = self.tables.get(m).and_then(|t| t.lookup_global(name)) {
                return Some((entry.clone(), m));
            }
        }
        None
    }

    /// Member lookup on an entity or interned type, with the lazy
    /// synthetic members of built-in and array types and the
    /// owning-module fallback for ordinary entities.
    pub(crate) fn lookup_member(&mut self, owner: NodeId, name: &str) -> Option<SymbolEntry> {
        let owner = self.session.arena().resolve(owner);
        match self.session.arena().get(owner) {
            Some(Node::Type(TypeNode::Class { decl })) => {
                let decl = *decl;
                self.lookup_member(decl, name)
            }
            Some(Node::Type(_)) => {
                self.ensure_synthetic_members(owner);
                self.builtin_members.lookup_member(name, owner).cloned()
            }
            Some(Node::Decl(_)) => {
                let home = self.decl_home.get(&owner).copied().unwrap_or(self.module);
                let table = self.tables.get_or_create(home);
                if let Some(entry) = table.lookup_member(name, owner) {
                    return Some(entry.clone());
                }
                // Owning-module fallback.
                table.lookup_global(name).cloned()
            }
            _ => None,
        }
    }

    /// An imported module whose name (or last segment) matches, used to
    /// resolve namespace qualifiers.
    pub(crate) fn imported_module_named(&self, name: &str) -> Option<ModuleId> {
        self.imports.iter().copied().find(|&m| {
            let qn = &self.session.module(m).name;
            qn.to_string() == name || qn.name() == name
        })
    }

    // ======================================================================
    // Type resolution
    // ======================================================================

    /// Resolve a type node to its canonical interned form, replacing the
    /// placeholder in the tree. Failures report and yield the unknown
    /// type.
    pub(crate) fn resolve_type(&mut self, ty: NodeId) -> NodeId {
        let ty = self.session.arena().resolve(ty);

        enum Kind {
            Done,
            Array(NodeId),
            Named(QualifiedName),
            NotType,
        }
        let kind = match self.session.arena().get(ty) {
            Some(Node::Type(TypeNode::Unresolved { name })) => Kind::Named(name.clone()),
            Some(Node::Type(TypeNode::Array { elem })) => Kind::Array(*elem),
            Some(Node::Type(_)) => Kind::Done,
            _ => Kind::NotType,
        };

        match kind {
            Kind::Done => ty,
            Kind::NotType => self.session.unknown_type(),
            Kind::Array(elem) => {
                let elem = self.resolve_type(elem);
                let canonical = self.session.array_of(elem);
                if canonical != ty {
                    self.session.arena_mut().replace(ty, canonical);
                }
                canonical
            }
            Kind::Named(name) => {
                let resolved = self.resolve_named_type(&name, self.span_of(ty));
                if resolved != ty {
                    self.session.arena_mut().replace(ty, resolved);
                }
                resolved
            }
        }
    }

    fn resolve_named_type(&mut self, name: &QualifiedName, span: Span) -> NodeId {
        if name.is_simple() {
            if let Some(builtin) = BuiltIn::by_name(name.name()) {
                return self.session.builtin(builtin);
            }
        }

        let entry = if name.is_simple() {
            self.lookup_name(name.name())
        } else {
            // Qualified form: everything but the last segment names a
            // module.
            let segments = name.segments();
            let module_name =
                QualifiedName::from_segments(segments[..segments.len() - 1].to_vec());
            self.session.get(&module_name).and_then(|m| {
                self.tables
                    .get(m)
                    .and_then(|t| t.lookup_global(name.name()))
                    .cloned()
                    .map(|entry| (entry, m))
            })
        };

        match entry {
            Some((SymbolEntry::Entity(decl), _home))
                if matches!(
                    self.session.arena().get(decl),
                    Some(Node::Decl(Decl::Class(_)))
                ) =>
            {
                self.check_visible(decl, name.name(), span);
                self.session.class_type(decl)
            }
            _ => {
                self.error(ResolveError::UnknownType {
                    name: name.to_string(),
                    span,
                });
                self.session.unknown_type()
            }
        }
    }

    // ======================================================================
    // Synthetic members of built-in and array types
    // ======================================================================

    /// Populate the member scope of a built-in or array type on first
    /// request.
    pub(crate) fn ensure_synthetic_members(&mut self, ty: NodeId) {
        if self.builtin_members.has_member_scope(ty) {
            return;
        }

        enum Kind {
            Array(NodeId),
            Builtin(BuiltIn),
            Other,
        }
        let kind = match self.session.arena().get(ty) {
            Some(Node::Type(TypeNode::Array { elem })) => Kind::Array(*elem),
            Some(Node::Type(TypeNode::BuiltIn(b))) => Kind::Builtin(*b),
            _ => Kind::Other,
        };

        match kind {
            Kind::Array(elem) => {
                let int32 = self.session.builtin(BuiltIn::Int32);
                let void = self.session.builtin(BuiltIn::Void);
                self.add_synthetic_method(ty, "getElement", &[("index", int32)], elem);
                self.add_synthetic_method(
                    ty,
                    "setElement",
                    &[("index", int32), ("value", elem)],
                    void,
                );
                self.add_synthetic_length(ty, int32);
            }
            Kind::Builtin(b) => self.add_builtin_operators(ty, b),
            Kind::Other => {}
        }

        if !self.builtin_members.has_member_scope(ty) {
            // Leave an empty scope so the work happens once.
            self.builtin_members.enter_entity_scope(ty);
            self.builtin_members.leave_scope();
        }
    }

    fn add_builtin_operators(&mut self, ty: NodeId, builtin: BuiltIn) {
        let boolean = self.session.builtin(BuiltIn::Bool);
        if builtin.is_integer() || builtin.is_float() {
            for op in ["plus", "minus", "times", "dividedBy"] {
                self.add_synthetic_method(ty, op, &[("other", ty)], ty);
            }
            if builtin.is_integer() {
                self.add_synthetic_method(ty, "modulo", &[("other", ty)], ty);
            }
            for op in ["equals", "lessThan", "greaterThan"] {
                self.add_synthetic_method(ty, op, &[("other", ty)], boolean);
            }
            if builtin.is_signed_integer() || builtin.is_float() {
                self.add_synthetic_method(ty, "negated", &[], ty);
            }
        }
        match builtin {
            BuiltIn::Bool => {
                self.add_synthetic_method(ty, "and", &[("other", ty)], boolean);
                self.add_synthetic_method(ty, "or", &[("other", ty)], boolean);
                self.add_synthetic_method(ty, "equals", &[("other", ty)], boolean);
                self.add_synthetic_method(ty, "not", &[], boolean);
            }
            BuiltIn::String => {
                let string = ty;
                let int32 = self.session.builtin(BuiltIn::Int32);
                self.add_synthetic_method(ty, "plus", &[("other", string)], string);
                for op in ["equals", "lessThan", "greaterThan"] {
                    self.add_synthetic_method(ty, op, &[("other", string)], boolean);
                }
                self.add_synthetic_length(ty, int32);
            }
            _ => {}
        }
    }

    /// Build a synthetic method and register it in the type's member
    /// scope.
    fn add_synthetic_method(
        &mut self,
        ty: NodeId,
        name: &str,
        params: &[(&str, NodeId)],
        ret: NodeId,
    ) -> NodeId {
        let arena = self.session.arena_mut();
        let mut param_list = NodeList::new();
        for (pname, pty) in params {
            let declared_type = Link::to(arena, *pty);
            let param = arena.alloc(
                Node::Decl(Decl::Parameter(ParameterDecl {
                    name: (*pname).to_string(),
                    declared_type,
                    parent: None,
                })),
                Span::default(),
            );
            param_list.push(arena, param);
        }
        let return_type = Link::to(arena, ret);
        let func = arena.alloc(
            Node::Decl(Decl::Function(FunctionDecl {
                name: name.to_string(),
                modifiers: Modifiers::empty(),
                kind: FunctionKind::Method,
                params: param_list,
                return_type,
                body: Link::empty(),
                initializer: Link::empty(),
                parent: Some(ty),
            })),
            Span::default(),
        );
        arena.retain(func);
        self.builtin_members.add_member(self.session.arena(), ty, func);
        func
    }

    /// Build a read-only `length` property on a type.
    fn add_synthetic_length(&mut self, ty: NodeId, int32: NodeId) {
        let getter = {
            let arena = self.session.arena_mut();
            let return_type = Link::to(arena, int32);
            let getter = arena.alloc(
                Node::Decl(Decl::Function(FunctionDecl {
                    name: "length".to_string(),
                    modifiers: Modifiers::empty(),
                    kind: FunctionKind::Getter,
                    params: NodeList::new(),
                    return_type,
                    body: Link::empty(),
                    initializer: Link::empty(),
                    parent: Some(ty),
                })),
                Span::default(),
            );
            arena.retain(getter);
            getter
        };
        let arena = self.session.arena_mut();
        let getter_link = Link::to(arena, getter);
        let prop = arena.alloc(
            Node::Decl(Decl::Property(PropertyDecl {
                name: "length".to_string(),
                modifiers: Modifiers::empty(),
                getter: getter_link,
                setter: Link::empty(),
                parent: Some(ty),
            })),
            Span::default(),
        );
        arena.retain(prop);
        self.builtin_members.add_member(self.session.arena(), ty, prop);
    }
}
