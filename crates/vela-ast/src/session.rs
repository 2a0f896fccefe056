//! The compilation session: module registry and type interning.
//!
//! The session is the explicit carrier of process-wide state. It owns the
//! node arena shared by every module of the compilation, the module
//! registry (one module per qualified name, created on first
//! lookup-with-create, alive for the session's lifetime), and the interning
//! tables that make array, function, and class types canonical: identical
//! shape means identical node id, so type equality is id equality.
//!
//! # Thread Safety
//!
//! The session is **not** thread-safe by design: the resolution pass is
//! single-threaded and synchronous, and creation-on-first-use of modules is
//! serialized trivially by `&mut` access.

use rustc_hash::FxHashMap;

use vela_core::{QualifiedName, Span};

use crate::arena::{NodeArena, NodeId};
use crate::list::NodeList;
use crate::node::{BuiltIn, Decl, Node, Stmt, TypeNode};

/// Identifier of a module in the session registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(u32);

impl ModuleId {
    /// The raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A registered module: a name, a body, and an import list.
#[derive(Debug)]
pub struct Module {
    /// The module's qualified name (registry key).
    pub name: QualifiedName,
    /// Top-level statements, in declaration order.
    pub body: NodeList<Stmt>,
    /// Import nodes, in declaration order.
    pub imports: Vec<NodeId>,
    /// Whether the resolution pass has completed for this module.
    pub resolved: bool,
}

/// Process-wide compilation state.
#[derive(Debug)]
pub struct Session {
    arena: NodeArena,
    modules: Vec<Module>,
    by_name: FxHashMap<String, ModuleId>,
    core_name: QualifiedName,
    unknown: NodeId,
    builtins: FxHashMap<BuiltIn, NodeId>,
    array_types: FxHashMap<NodeId, NodeId>,
    function_types: FxHashMap<(Vec<NodeId>, NodeId), NodeId>,
    class_types: FxHashMap<NodeId, NodeId>,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        let unknown = arena.alloc(Node::Type(TypeNode::Unknown), Span::default());
        arena.retain(unknown);
        Self {
            arena,
            modules: Vec::new(),
            by_name: FxHashMap::default(),
            core_name: QualifiedName::parse("vela.core"),
            unknown,
            builtins: FxHashMap::default(),
            array_types: FxHashMap::default(),
            function_types: FxHashMap::default(),
            class_types: FxHashMap::default(),
        }
    }

    /// The shared node arena.
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// The shared node arena, mutably.
    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    // ==========================================================================
    // Module registry
    // ==========================================================================

    /// The name of the core module implicitly imported everywhere else.
    pub fn core_module_name(&self) -> &QualifiedName {
        &self.core_name
    }

    /// Look up a module, creating it on first use.
    pub fn get_or_create(&mut self, name: &QualifiedName) -> ModuleId {
        if let Some(id) = self.by_name.get(&name.to_string()) {
            return *id;
        }
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(Module {
            name: name.clone(),
            body: NodeList::new(),
            imports: Vec::new(),
            resolved: false,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Look up a module without creating it.
    pub fn get(&self, name: &QualifiedName) -> Option<ModuleId> {
        self.by_name.get(&name.to_string()).copied()
    }

    /// Borrow a module.
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    /// Borrow a module mutably.
    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index()]
    }

    /// Borrow a module and the arena mutably at the same time.
    pub fn module_and_arena_mut(&mut self, id: ModuleId) -> (&mut Module, &mut NodeArena) {
        (&mut self.modules[id.index()], &mut self.arena)
    }

    /// All registered module ids.
    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> {
        (0..self.modules.len() as u32).map(ModuleId)
    }

    // ==========================================================================
    // Type interning
    // ==========================================================================

    /// The generic "not yet known" type, also the recovery type.
    pub fn unknown_type(&self) -> NodeId {
        self.unknown
    }

    /// The canonical node for a built-in type.
    pub fn builtin(&mut self, builtin: BuiltIn) -> NodeId {
        if let Some(id) = self.builtins.get(&builtin) {
            return *id;
        }
        let id = self
            .arena
            .alloc(Node::Type(TypeNode::BuiltIn(builtin)), Span::default());
        self.arena.retain(id);
        self.builtins.insert(builtin, id);
        id
    }

    /// The canonical array type over `elem`.
    pub fn array_of(&mut self, elem: NodeId) -> NodeId {
        let elem = self.arena.resolve(elem);
        if let Some(id) = self.array_types.get(&elem) {
            return *id;
        }
        let id = self
            .arena
            .alloc(Node::Type(TypeNode::Array { elem }), Span::default());
        self.arena.retain(id);
        self.array_types.insert(elem, id);
        id
    }

    /// The canonical function type with the given signature.
    pub fn function_type(&mut self, params: Vec<NodeId>, ret: NodeId) -> NodeId {
        let params: Vec<NodeId> = params.into_iter().map(|p| self.arena.resolve(p)).collect();
        let ret = self.arena.resolve(ret);
        let key = (params.clone(), ret);
        if let Some(id) = self.function_types.get(&key) {
            return *id;
        }
        let id = self
            .arena
            .alloc(Node::Type(TypeNode::Function { params, ret }), Span::default());
        self.arena.retain(id);
        self.function_types.insert(key, id);
        id
    }

    /// The canonical user-defined type backed by `decl`; records the type
    /// id on the class declaration.
    pub fn class_type(&mut self, decl: NodeId) -> NodeId {
        let decl = self.arena.resolve(decl);
        if let Some(id) = self.class_types.get(&decl) {
            return *id;
        }
        let id = self
            .arena
            .alloc(Node::Type(TypeNode::Class { decl }), Span::default());
        self.arena.retain(id);
        self.class_types.insert(decl, id);
        if let Some(Node::Decl(Decl::Class(class))) = self.arena.get_mut(decl) {
            class.ty = Some(id);
        }
        id
    }

    /// Render a type for diagnostics.
    pub fn type_display(&self, ty: NodeId) -> String {
        match self.arena.get(ty) {
            Some(Node::Type(TypeNode::Unknown)) => "unknown".to_string(),
            Some(Node::Type(TypeNode::Unresolved { name })) => name.to_string(),
            Some(Node::Type(TypeNode::BuiltIn(b))) => b.name().to_string(),
            Some(Node::Type(TypeNode::Array { elem })) => {
                format!("{}[]", self.type_display(*elem))
            }
            Some(Node::Type(TypeNode::Function { params, ret })) => {
                let params: Vec<_> = params.iter().map(|p| self.type_display(*p)).collect();
                format!("fn({}) -> {}", params.join(", "), self.type_display(*ret))
            }
            Some(Node::Type(TypeNode::Class { decl })) => match self.arena.get(*decl) {
                Some(Node::Decl(d)) => d.name().to_string(),
                _ => "class".to_string(),
            },
            _ => "?".to_string(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
