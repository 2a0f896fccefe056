//! Scoped symbol tables.
//!
//! Each module owns one [`SymbolTable`]: a stack of lexical scopes (bottom
//! is the module-global scope and is never popped) plus a side table of
//! per-entity member scopes used for member lookup. Same-named functions
//! are grouped automatically into a [`FunctionGroup`] occupying a single
//! slot; any non-function collision is a conflict.

use rustc_hash::FxHashMap;

use vela_ast::{Decl, Node, NodeArena, NodeId, TypeNode};
use vela_ast::session::ModuleId;
use vela_core::QualifiedName;

/// An ordered, mutable set of function overloads sharing one name.
#[derive(Debug, Clone)]
pub struct FunctionGroup {
    /// The shared simple name.
    pub name: String,
    /// Overloads in declaration order.
    pub functions: Vec<NodeId>,
}

/// What a symbol-table slot holds.
#[derive(Debug, Clone)]
pub enum SymbolEntry {
    /// A single named entity.
    Entity(NodeId),
    /// A group of same-named function overloads.
    Group(FunctionGroup),
}

impl SymbolEntry {
    /// The function candidates this entry contributes, if any.
    pub fn functions(&self, arena: &NodeArena) -> Vec<NodeId> {
        match self {
            SymbolEntry::Entity(id) => match arena.get(*id) {
                Some(Node::Decl(Decl::Function(_))) => vec![arena.resolve(*id)],
                _ => Vec::new(),
            },
            SymbolEntry::Group(group) => group.functions.clone(),
        }
    }
}

/// A named-or-anonymous mapping from simple name to entry.
#[derive(Debug, Default)]
pub struct Scope {
    symbols: FxHashMap<String, SymbolEntry>,
}

impl Scope {
    fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.symbols.get(name)
    }

    /// Iterate the scope's entries in arbitrary order.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &SymbolEntry)> {
        self.symbols.iter()
    }
}

/// One parameter's contribution to a signature. Functions are declared
/// before their parameter types are resolved, so two written `int32`s are
/// distinct `Unresolved` nodes; comparing those by the written name (and
/// resolved types by interned id) catches collisions on both sides of
/// type resolution.
#[derive(Debug, PartialEq)]
enum SigKey {
    Resolved(NodeId),
    Written(QualifiedName),
    Array(Box<SigKey>),
    Missing,
}

fn sig_key(arena: &NodeArena, ty: Option<NodeId>) -> SigKey {
    let Some(ty) = ty else {
        return SigKey::Missing;
    };
    let ty = arena.resolve(ty);
    match arena.get(ty) {
        Some(Node::Type(TypeNode::Unresolved { name })) => SigKey::Written(name.clone()),
        Some(Node::Type(TypeNode::Array { elem })) => {
            SigKey::Array(Box::new(sig_key(arena, Some(*elem))))
        }
        _ => SigKey::Resolved(ty),
    }
}

/// The parameter-type signature of a function, for overload-collision
/// checks.
fn signature(arena: &NodeArena, func: NodeId) -> Vec<SigKey> {
    let Some(Node::Decl(Decl::Function(f))) = arena.get(func) else {
        return Vec::new();
    };
    f.params
        .ids(arena)
        .into_iter()
        .map(|param| match arena.get(param) {
            Some(Node::Decl(Decl::Parameter(p))) => sig_key(arena, p.declared_type.target(arena)),
            _ => SigKey::Missing,
        })
        .collect()
}

/// Insert an entity into a scope, grouping functions. Returns `false` on
/// conflict.
fn insert(scope: &mut Scope, arena: &NodeArena, entity: NodeId) -> bool {
    let entity = arena.resolve(entity);
    let Some(Node::Decl(decl)) = arena.get(entity) else {
        return false;
    };
    let name = decl.name().to_string();
    let is_function = decl.is_function();

    match scope.symbols.get_mut(&name) {
        None => {
            scope.symbols.insert(name, SymbolEntry::Entity(entity));
            true
        }
        Some(SymbolEntry::Entity(existing)) => {
            let existing = *existing;
            let existing_is_function = matches!(
                arena.get(existing),
                Some(Node::Decl(Decl::Function(_)))
            );
            if !is_function || !existing_is_function {
                return false;
            }
            if signature(arena, existing) == signature(arena, entity) {
                return false;
            }
            scope.symbols.insert(
                name.clone(),
                SymbolEntry::Group(FunctionGroup {
                    name,
                    functions: vec![existing, entity],
                }),
            );
            true
        }
        Some(SymbolEntry::Group(group)) => {
            if !is_function {
                return false;
            }
            let sig = signature(arena, entity);
            if group.functions.iter().any(|f| signature(arena, *f) == sig) {
                return false;
            }
            group.functions.push(entity);
            true
        }
    }
}

#[derive(Debug)]
enum ScopeSlot {
    /// Anonymous block scope.
    Anon(Scope),
    /// A pushed entity member scope, stored in the side table.
    Entity(NodeId),
}

/// The scoped symbol table of one module.
#[derive(Debug)]
pub struct SymbolTable {
    /// Bottom is the module-global scope; never popped.
    stack: Vec<ScopeSlot>,
    /// Member scopes by owning entity, created on first use.
    members: FxHashMap<NodeId, Scope>,
}

impl SymbolTable {
    /// Create a table with only the module-global scope.
    pub fn new() -> Self {
        Self {
            stack: vec![ScopeSlot::Anon(Scope::default())],
            members: FxHashMap::default(),
        }
    }

    /// Current nesting depth (1 = only the global scope).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Push a fresh anonymous scope (blocks, bodies).
    pub fn enter_scope(&mut self) {
        self.stack.push(ScopeSlot::Anon(Scope::default()));
    }

    /// Push `entity`'s member scope, creating it on first use.
    pub fn enter_entity_scope(&mut self, entity: NodeId) {
        self.members.entry(entity).or_default();
        self.stack.push(ScopeSlot::Entity(entity));
    }

    /// Pop the innermost scope unless only the global scope remains.
    pub fn leave_scope(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn slot_scope<'a>(&'a self, slot: &'a ScopeSlot) -> Option<&'a Scope> {
        match slot {
            ScopeSlot::Anon(scope) => Some(scope),
            ScopeSlot::Entity(entity) => self.members.get(entity),
        }
    }

    fn current_scope_mut(&mut self) -> &mut Scope {
        match self.stack.last_mut() {
            Some(ScopeSlot::Anon(scope)) => scope,
            Some(ScopeSlot::Entity(entity)) => {
                let entity = *entity;
                self.members.entry(entity).or_default()
            }
            None => unreachable!("scope stack is never empty"),
        }
    }

    /// Insert an entity into the current scope. `false` on conflict.
    pub fn add(&mut self, arena: &NodeArena, entity: NodeId) -> bool {
        let entity = arena.resolve(entity);
        if !matches!(arena.get(entity), Some(Node::Decl(_))) {
            return false;
        }
        insert(self.current_scope_mut(), arena, entity)
    }

    /// Insert into the bottom (module) scope regardless of nesting.
    pub fn add_global(&mut self, arena: &NodeArena, entity: NodeId) -> bool {
        match self.stack.first_mut() {
            Some(ScopeSlot::Anon(scope)) => insert(scope, arena, entity),
            _ => unreachable!("bottom scope is always anonymous"),
        }
    }

    /// Erase a name from the current scope.
    pub fn remove(&mut self, name: &str) -> bool {
        self.current_scope_mut().symbols.remove(name).is_some()
    }

    /// Search scopes innermost to outermost; the module scope is checked
    /// last.
    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        for slot in self.stack.iter().rev() {
            if let Some(entry) = self.slot_scope(slot).and_then(|s| s.get(name)) {
                return Some(entry);
            }
        }
        None
    }

    /// Look only in the module-global scope.
    pub fn lookup_global(&self, name: &str) -> Option<&SymbolEntry> {
        self.slot_scope(&self.stack[0]).and_then(|s| s.get(name))
    }

    /// Look only inside `entity`'s member scope; no outward walk.
    pub fn lookup_member(&self, name: &str, entity: NodeId) -> Option<&SymbolEntry> {
        self.members.get(&entity).and_then(|s| s.get(name))
    }

    /// Whether `entity` has a member scope at all.
    pub fn has_member_scope(&self, entity: NodeId) -> bool {
        self.members.contains_key(&entity)
    }

    /// Borrow `entity`'s member scope, if created.
    pub fn member_scope(&self, entity: NodeId) -> Option<&Scope> {
        self.members.get(&entity)
    }

    /// Insert a member directly into `entity`'s member scope, creating the
    /// scope on first use. `false` on conflict.
    pub fn add_member(&mut self, arena: &NodeArena, entity: NodeId, member: NodeId) -> bool {
        insert(self.members.entry(entity).or_default(), arena, member)
    }

    /// Install a prebuilt entry into `entity`'s member scope, overwriting
    /// any present entry (used when a property supersedes its backing
    /// variable).
    pub fn set_member_entry(&mut self, entity: NodeId, name: String, entry: SymbolEntry) {
        self.members.entry(entity).or_default().symbols.insert(name, entry);
    }

    /// Erase a name from `entity`'s member scope.
    pub fn remove_member(&mut self, entity: NodeId, name: &str) -> bool {
        self.members
            .get_mut(&entity)
            .map(|s| s.symbols.remove(name).is_some())
            .unwrap_or(false)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide index of symbol tables, one per module, created lazily.
#[derive(Debug, Default)]
pub struct SymbolTables {
    tables: FxHashMap<ModuleId, SymbolTable>,
}

impl SymbolTables {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// The module's table, created on first use.
    pub fn get_or_create(&mut self, module: ModuleId) -> &mut SymbolTable {
        self.tables.entry(module).or_default()
    }

    /// Replace the module's table with a fresh one (re-analysis starts
    /// from scratch).
    pub fn reset(&mut self, module: ModuleId) -> &mut SymbolTable {
        self.tables.insert(module, SymbolTable::new());
        self.tables.entry(module).or_default()
    }

    /// The module's table, if created.
    pub fn get(&self, module: ModuleId) -> Option<&SymbolTable> {
        self.tables.get(&module)
    }

    /// The module's table, mutably, if created.
    pub fn get_mut(&mut self, module: ModuleId) -> Option<&mut SymbolTable> {
        self.tables.get_mut(&module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ast::link::Link;
    use vela_ast::list::NodeList;
    use vela_ast::node::{
        ClassDecl, FunctionDecl, FunctionKind, ParameterDecl, TypeKind, VariableDecl,
    };
    use vela_ast::{BuiltIn, Session};
    use vela_core::{Modifiers, Span};

    fn var(session: &mut Session, name: &str) -> NodeId {
        session.arena_mut().alloc(
            Node::Decl(Decl::Variable(VariableDecl {
                name: name.into(),
                modifiers: Modifiers::empty(),
                declared_type: Link::empty(),
                init: Link::empty(),
                parent: None,
            })),
            Span::default(),
        )
    }

    fn function(session: &mut Session, name: &str, param_types: &[BuiltIn]) -> NodeId {
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
        session.arena_mut().alloc(
            Node::Decl(Decl::Function(FunctionDecl {
                name: name.into(),
                modifiers: Modifiers::empty(),
                kind: FunctionKind::Free,
                params,
                return_type: Link::empty(),
                body: Link::empty(),
                initializer: Link::empty(),
                parent: None,
            })),
            Span::default(),
        )
    }

    fn entity_id(entry: &SymbolEntry) -> NodeId {
        match entry {
            SymbolEntry::Entity(id) => *id,
            SymbolEntry::Group(_) => panic!("expected single entity"),
        }
    }

    #[test]
    fn shadowing_restores_on_leave() {
        let mut session = Session::new();
        let e1 = var(&mut session, "x");
        let e2 = var(&mut session, "x");
        let mut table = SymbolTable::new();

        assert!(table.add(session.arena(), e1));
        table.enter_scope();
        assert!(table.add(session.arena(), e2));

        assert_eq!(entity_id(table.lookup("x").unwrap()), e2);
        table.leave_scope();
        assert_eq!(entity_id(table.lookup("x").unwrap()), e1);
    }

    #[test]
    fn global_scope_is_never_popped() {
        let mut session = Session::new();
        let e = var(&mut session, "x");
        let mut table = SymbolTable::new();
        table.add(session.arena(), e);
        table.leave_scope();
        table.leave_scope();
        assert_eq!(entity_id(table.lookup("x").unwrap()), e);
        assert_eq!(table.depth(), 1);
    }

    #[test]
    fn per_entity_isolation() {
        let mut session = Session::new();
        let owner = session.arena_mut().alloc(
            Node::Decl(Decl::Class(ClassDecl {
                name: "Owner".into(),
                modifiers: Modifiers::empty(),
                kind: TypeKind::Class,
                base: Link::empty(),
                body: NodeList::new(),
                ty: None,
                parent: None,
            })),
            Span::default(),
        );
        let member = var(&mut session, "m");
        let unrelated = var(&mut session, "m");
        let mut table = SymbolTable::new();

        table.enter_entity_scope(owner);
        assert!(table.add(session.arena(), member));
        table.leave_scope();

        // Retrievable through the member scope, not the scope stack.
        assert_eq!(
            entity_id(table.lookup_member("m", owner).unwrap()),
            member
        );
        assert!(table.lookup("m").is_none());

        // An unrelated same-named entity does not leak into the owner's
        // member scope.
        table.enter_scope();
        table.add(session.arena(), unrelated);
        assert_eq!(
            entity_id(table.lookup_member("m", owner).unwrap()),
            member
        );
        table.leave_scope();
    }

    #[test]
    fn same_named_functions_form_a_group() {
        let mut session = Session::new();
        let f1 = function(&mut session, "f", &[BuiltIn::Int32]);
        let f2 = function(&mut session, "f", &[BuiltIn::Int64]);
        let mut table = SymbolTable::new();

        assert!(table.add(session.arena(), f1));
        assert!(table.add(session.arena(), f2));

        match table.lookup("f") {
            Some(SymbolEntry::Group(group)) => {
                assert_eq!(group.functions, vec![f1, f2]);
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn identical_signature_conflicts() {
        let mut session = Session::new();
        let f1 = function(&mut session, "f", &[BuiltIn::Int32]);
        let f2 = function(&mut session, "f", &[BuiltIn::Int32]);
        let mut table = SymbolTable::new();

        assert!(table.add(session.arena(), f1));
        assert!(!table.add(session.arena(), f2));
    }

    /// Functions as the declaration pass sees them: each written type is
    /// its own `Unresolved` node, not an interned id.
    fn written_function(session: &mut Session, name: &str, param_types: &[&str]) -> NodeId {
        let mut params = NodeList::new();
        for (i, written) in param_types.iter().enumerate() {
            let arena = session.arena_mut();
            let ty = arena.alloc(
                Node::Type(TypeNode::Unresolved {
                    name: QualifiedName::parse(written),
                }),
                Span::default(),
            );
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
        session.arena_mut().alloc(
            Node::Decl(Decl::Function(FunctionDecl {
                name: name.into(),
                modifiers: Modifiers::empty(),
                kind: FunctionKind::Free,
                params,
                return_type: Link::empty(),
                body: Link::empty(),
                initializer: Link::empty(),
                parent: None,
            })),
            Span::default(),
        )
    }

    #[test]
    fn identical_written_signature_conflicts() {
        let mut session = Session::new();
        let f1 = written_function(&mut session, "f", &["int32"]);
        let f2 = written_function(&mut session, "f", &["int32"]);
        let mut table = SymbolTable::new();

        assert!(table.add(session.arena(), f1));
        assert!(!table.add(session.arena(), f2));
    }

    #[test]
    fn distinct_written_signatures_group() {
        let mut session = Session::new();
        let f1 = written_function(&mut session, "f", &["int32"]);
        let f2 = written_function(&mut session, "f", &["int64"]);
        let mut table = SymbolTable::new();

        assert!(table.add(session.arena(), f1));
        assert!(table.add(session.arena(), f2));
        assert!(matches!(table.lookup("f"), Some(SymbolEntry::Group(_))));
    }

    #[test]
    fn non_function_collision_conflicts() {
        let mut session = Session::new();
        let v = var(&mut session, "x");
        let f = function(&mut session, "x", &[]);
        let v2 = var(&mut session, "x");
        let mut table = SymbolTable::new();

        assert!(table.add(session.arena(), v));
        // Function colliding with a non-function.
        assert!(!table.add(session.arena(), f));
        // Non-function colliding with a non-function.
        assert!(!table.add(session.arena(), v2));

        // And a non-function colliding with an existing function/group.
        let mut table = SymbolTable::new();
        let g = function(&mut session, "y", &[]);
        let vy = var(&mut session, "y");
        assert!(table.add(session.arena(), g));
        assert!(!table.add(session.arena(), vy));
    }

    #[test]
    fn add_global_lands_at_module_scope() {
        let mut session = Session::new();
        let e = var(&mut session, "helper");
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.enter_scope();
        assert!(table.add_global(session.arena(), e));
        table.leave_scope();
        table.leave_scope();
        assert_eq!(entity_id(table.lookup("helper").unwrap()), e);
    }

    #[test]
    fn remove_erases_from_current_scope() {
        let mut session = Session::new();
        let e = var(&mut session, "x");
        let mut table = SymbolTable::new();
        table.add(session.arena(), e);
        assert!(table.remove("x"));
        assert!(table.lookup("x").is_none());
        assert!(!table.remove("x"));
    }
}
