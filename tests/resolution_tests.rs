//! End-to-end resolution tests: modules are built directly in the arena
//! the way a parser would leave them, then run through the analyzer.

use vela::ast::{
    BinaryOp, BuiltIn, ClassDecl, Decl, Expr, FunctionDecl, FunctionKind, Import, Link,
    LiteralValue, ModuleId, Node, NodeId, NodeList, ParameterDecl, Session, Stmt, TypeKind,
    TypeNode, VariableDecl,
};
use vela::core::{Modifiers, Problems, QualifiedName, Span};
use vela::sema::{Analyzer, Outcome, SymbolEntry};

// ===========================================================================
// Builders
// ===========================================================================

fn named_type(session: &mut Session, name: &str) -> Link<TypeNode> {
    let arena = session.arena_mut();
    let node = arena.alloc(
        Node::Type(TypeNode::Unresolved {
            name: QualifiedName::parse(name),
        }),
        Span::default(),
    );
    Link::to(arena, node)
}

fn int_literal(session: &mut Session, value: i64) -> NodeId {
    let ty = session.unknown_type();
    session.arena_mut().alloc(
        Node::Expr(Expr::Literal {
            value: LiteralValue::Int(value),
            ty,
        }),
        Span::default(),
    )
}

fn decl_stmt(session: &mut Session, decl: NodeId) -> NodeId {
    let arena = session.arena_mut();
    let link = Link::to(arena, decl);
    arena.alloc(Node::Stmt(Stmt::Decl { decl: link }), Span::default())
}

fn expr_stmt(session: &mut Session, expr: NodeId) -> NodeId {
    let arena = session.arena_mut();
    let link = Link::to(arena, expr);
    arena.alloc(Node::Stmt(Stmt::Expr { expr: link }), Span::default())
}

fn push_top(session: &mut Session, module: ModuleId, stmt: NodeId) {
    let (m, arena) = session.module_and_arena_mut(module);
    m.body.push(arena, stmt);
}

fn field_var(session: &mut Session, name: &str, ty: &str, modifiers: Modifiers) -> NodeId {
    let declared_type = named_type(session, ty);
    session.arena_mut().alloc(
        Node::Decl(Decl::Variable(VariableDecl {
            name: name.into(),
            modifiers,
            declared_type,
            init: Link::empty(),
            parent: None,
        })),
        Span::default(),
    )
}

fn local_var(session: &mut Session, name: &str, init: NodeId) -> NodeId {
    let arena = session.arena_mut();
    let init = Link::to(arena, init);
    arena.alloc(
        Node::Decl(Decl::Variable(VariableDecl {
            name: name.into(),
            modifiers: Modifiers::empty(),
            declared_type: Link::empty(),
            init,
            parent: None,
        })),
        Span::default(),
    )
}

fn class_with(session: &mut Session, name: &str, members: Vec<NodeId>) -> NodeId {
    let mut body = NodeList::new();
    for decl in members {
        let stmt = decl_stmt(session, decl);
        body.push(session.arena_mut(), stmt);
    }
    session.arena_mut().alloc(
        Node::Decl(Decl::Class(ClassDecl {
            name: name.into(),
            modifiers: Modifiers::empty(),
            kind: TypeKind::Class,
            base: Link::empty(),
            body,
            ty: None,
            parent: None,
        })),
        Span::default(),
    )
}

/// A free function with one optional parameter and an empty body.
fn function(session: &mut Session, name: &str, param: Option<(&str, &str)>) -> NodeId {
    function_with_body(session, name, param, Vec::new())
}

/// A free function whose body block holds the given statements.
fn function_with_body(
    session: &mut Session,
    name: &str,
    param: Option<(&str, &str)>,
    stmts: Vec<NodeId>,
) -> NodeId {
    let mut params = NodeList::new();
    if let Some((pname, pty)) = param {
        let declared_type = named_type(session, pty);
        let arena = session.arena_mut();
        let p = arena.alloc(
            Node::Decl(Decl::Parameter(ParameterDecl {
                name: pname.into(),
                declared_type,
                parent: None,
            })),
            Span::default(),
        );
        params.push(arena, p);
    }
    let arena = session.arena_mut();
    let mut body_list = NodeList::new();
    for stmt in stmts {
        body_list.push(arena, stmt);
    }
    let block = arena.alloc(Node::Stmt(Stmt::Block { body: body_list }), Span::default());
    let body = Link::to(arena, block);
    arena.alloc(
        Node::Decl(Decl::Function(FunctionDecl {
            name: name.into(),
            modifiers: Modifiers::empty(),
            kind: FunctionKind::Free,
            params,
            return_type: Link::empty(),
            body,
            initializer: Link::empty(),
            parent: None,
        })),
        Span::default(),
    )
}

fn call_by_name(session: &mut Session, name: &str, args: Vec<NodeId>) -> NodeId {
    let arena = session.arena_mut();
    let callee = arena.alloc(
        Node::Expr(Expr::UnresolvedName { name: name.into() }),
        Span::default(),
    );
    let callee = Link::to(arena, callee);
    let mut list = NodeList::new();
    for arg in args {
        list.push(arena, arg);
    }
    arena.alloc(
        Node::Expr(Expr::Call { callee, args: list }),
        Span::default(),
    )
}

fn import(session: &mut Session, module: ModuleId, name: &str) -> NodeId {
    let arena = session.arena_mut();
    let imp = arena.alloc(
        Node::Import(Import {
            name: QualifiedName::parse(name),
            resolved: None,
        }),
        Span::default(),
    );
    arena.retain(imp);
    session.module_mut(module).imports.push(imp);
    imp
}

fn entity(entry: Option<&SymbolEntry>) -> NodeId {
    match entry {
        Some(SymbolEntry::Entity(id)) => *id,
        other => panic!("expected a single entity, got {:?}", other),
    }
}

fn assert_clean(problems: &Problems) {
    let messages: Vec<_> = problems.iter().map(|p| p.message.clone()).collect();
    assert!(problems.is_empty(), "unexpected diagnostics: {:?}", messages);
}

// ===========================================================================
// Classes
// ===========================================================================

#[test]
fn field_becomes_property_and_gets_implicit_ctor() {
    let mut session = Session::new();
    let core_name = session.core_module_name().clone();
    let core = session.get_or_create(&core_name);
    let object = class_with(&mut session, "Object", vec![]);
    let stmt = decl_stmt(&mut session, object);
    push_top(&mut session, core, stmt);

    let game = session.get_or_create(&QualifiedName::parse("game.main"));
    let x = field_var(&mut session, "x", "int32", Modifiers::empty());
    let a = class_with(&mut session, "A", vec![x]);
    let stmt = decl_stmt(&mut session, a);
    push_top(&mut session, game, stmt);

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, core),
        Outcome::Resolved
    );
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, game),
        Outcome::Resolved
    );
    assert_clean(&problems);

    let table = analyzer.tables().get(game).expect("module table");

    // The public field's symbol slot is now a read/write property; the
    // variable stays in the class body as backing storage only.
    let prop = entity(table.lookup_member("x", a));
    match session.arena().get(prop) {
        Some(Node::Decl(Decl::Property(p))) => {
            assert!(!p.getter.is_empty());
            assert!(!p.setter.is_empty());
        }
        other => panic!("expected property, got {:?}", other),
    }

    // A default constructor was synthesized, and its initializer calls the
    // implicit base class's constructor.
    let ctor = entity(table.lookup_member("init", a));
    match session.arena().get(ctor) {
        Some(Node::Decl(Decl::Function(f))) => {
            assert_eq!(f.kind, FunctionKind::Constructor);
            let init = f
                .initializer
                .target(session.arena())
                .expect("base constructor call");
            assert!(matches!(
                session.arena().get(init),
                Some(Node::Expr(Expr::Call { .. }))
            ));
        }
        other => panic!("expected constructor, got {:?}", other),
    }

    // The class implicitly derives the core root.
    match session.arena().get(a) {
        Some(Node::Decl(Decl::Class(c))) => {
            let base = c.base.target(session.arena()).expect("implicit base");
            assert!(matches!(
                session.arena().get(base),
                Some(Node::Type(TypeNode::Class { .. }))
            ));
        }
        other => panic!("expected class, got {:?}", other),
    }
}

// ===========================================================================
// Module dependencies
// ===========================================================================

#[test]
fn private_member_hidden_outside_its_type() {
    let mut session = Session::new();
    let app = session.get_or_create(&QualifiedName::simple("app"));

    // class C { private var x: int32; }
    let x = field_var(&mut session, "x", "int32", Modifiers::PRIVATE);
    let c = class_with(&mut session, "C", vec![x]);
    let stmt = decl_stmt(&mut session, c);
    push_top(&mut session, app, stmt);

    // fn peek(c: C) { c.x; } — same module, but outside the type.
    let access = {
        let arena = session.arena_mut();
        let object = arena.alloc(
            Node::Expr(Expr::UnresolvedName { name: "c".into() }),
            Span::default(),
        );
        let object = Link::to(arena, object);
        arena.alloc(
            Node::Expr(Expr::UnresolvedMember {
                object,
                name: "x".into(),
            }),
            Span::default(),
        )
    };
    let body_stmt = expr_stmt(&mut session, access);
    let peek = function_with_body(&mut session, "peek", Some(("c", "C")), vec![body_stmt]);
    let stmt = decl_stmt(&mut session, peek);
    push_top(&mut session, app, stmt);

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, app),
        Outcome::Resolved
    );
    assert_eq!(problems.error_count(), 1);
    let message = problems.iter().next().unwrap().message.clone();
    assert!(message.contains("'x' is private"), "{message}");
}

#[test]
fn unanalyzed_import_reports_needed_modules() {
    let mut session = Session::new();
    let m = session.get_or_create(&QualifiedName::simple("m"));
    let imp = import(&mut session, m, "n");

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();

    // The dependency signal is not a diagnostic.
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, m),
        Outcome::NeedsModules(vec!["n".to_string()])
    );
    assert_clean(&problems);

    // Once the dependency is analyzed, re-analysis completes and the
    // import is bound.
    let n = session.get_or_create(&QualifiedName::simple("n"));
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, n),
        Outcome::Resolved
    );
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, m),
        Outcome::Resolved
    );
    assert_clean(&problems);
    match session.arena().get(imp) {
        Some(Node::Import(i)) => assert_eq!(i.resolved, Some(n)),
        other => panic!("expected import node, got {:?}", other),
    }
}

#[test]
fn needed_modules_deduplicate_repeated_imports() {
    let mut session = Session::new();
    let m = session.get_or_create(&QualifiedName::simple("m"));
    import(&mut session, m, "n");
    import(&mut session, m, "p");
    import(&mut session, m, "n");

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, m),
        Outcome::NeedsModules(vec!["n".to_string(), "p".to_string()])
    );
    assert_clean(&problems);
}

#[test]
fn imported_function_is_callable() {
    let mut session = Session::new();
    let lib = session.get_or_create(&QualifiedName::simple("lib"));
    let helper = function(&mut session, "helper", None);
    let stmt = decl_stmt(&mut session, helper);
    push_top(&mut session, lib, stmt);

    let app = session.get_or_create(&QualifiedName::simple("app"));
    import(&mut session, app, "lib");
    let call = call_by_name(&mut session, "helper", vec![]);
    let stmt = expr_stmt(&mut session, call);
    push_top(&mut session, app, stmt);

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, lib),
        Outcome::Resolved
    );
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, app),
        Outcome::Resolved
    );
    assert_clean(&problems);

    let callee = match session.arena().get(call) {
        Some(Node::Expr(Expr::Call { callee, .. })) => {
            callee.target(session.arena()).expect("callee")
        }
        other => panic!("expected call, got {:?}", other),
    };
    match session.arena().get(callee) {
        Some(Node::Expr(Expr::FunctionRef { func })) => {
            assert_eq!(session.arena().resolve(*func), helper);
        }
        other => panic!("expected function ref, got {:?}", other),
    }
}

// ===========================================================================
// Overloads and operators
// ===========================================================================

#[test]
fn call_picks_exact_overload() {
    let mut session = Session::new();
    let app = session.get_or_create(&QualifiedName::simple("app"));
    let f_int = function(&mut session, "f", Some(("a", "int32")));
    let f_float = function(&mut session, "f", Some(("a", "float")));
    for func in [f_int, f_float] {
        let stmt = decl_stmt(&mut session, func);
        push_top(&mut session, app, stmt);
    }
    let arg = int_literal(&mut session, 1);
    let call = call_by_name(&mut session, "f", vec![arg]);
    let stmt = expr_stmt(&mut session, call);
    push_top(&mut session, app, stmt);

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, app),
        Outcome::Resolved
    );
    assert_clean(&problems);

    let callee = match session.arena().get(call) {
        Some(Node::Expr(Expr::Call { callee, .. })) => {
            callee.target(session.arena()).expect("callee")
        }
        other => panic!("expected call, got {:?}", other),
    };
    match session.arena().get(callee) {
        Some(Node::Expr(Expr::FunctionRef { func })) => {
            assert_eq!(session.arena().resolve(*func), f_int);
        }
        other => panic!("expected function ref, got {:?}", other),
    }
}

#[test]
fn duplicate_overload_signature_reports() {
    let mut session = Session::new();
    let app = session.get_or_create(&QualifiedName::simple("app"));

    // Two f(int32) overloads; parameter names differ, signatures do not.
    let first = function(&mut session, "f", Some(("a", "int32")));
    let second = function(&mut session, "f", Some(("b", "int32")));
    for func in [first, second] {
        let stmt = decl_stmt(&mut session, func);
        push_top(&mut session, app, stmt);
    }

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, app),
        Outcome::Resolved
    );
    assert_eq!(problems.error_count(), 1);
    let message = problems.iter().next().unwrap().message.clone();
    assert!(message.contains("duplicate declaration of 'f'"), "{message}");
}

#[test]
fn arithmetic_rewrites_to_operator_method_call() {
    let mut session = Session::new();
    let app = session.get_or_create(&QualifiedName::simple("app"));
    let left = int_literal(&mut session, 1);
    let right = int_literal(&mut session, 2);
    let binary = {
        let arena = session.arena_mut();
        let left = Link::to(arena, left);
        let right = Link::to(arena, right);
        arena.alloc(
            Node::Expr(Expr::UnresolvedBinary {
                op: BinaryOp::Add,
                left,
                right,
                compound: false,
            }),
            Span::default(),
        )
    };
    let stmt = expr_stmt(&mut session, binary);
    push_top(&mut session, app, stmt);

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, app),
        Outcome::Resolved
    );
    assert_clean(&problems);

    let rewritten = session.arena().resolve(binary);
    let callee = match session.arena().get(rewritten) {
        Some(Node::Expr(Expr::Call { callee, .. })) => {
            callee.target(session.arena()).expect("callee")
        }
        other => panic!("expected operator call, got {:?}", other),
    };
    match session.arena().get(callee) {
        Some(Node::Expr(Expr::MethodRef { func, .. })) => {
            match session.arena().get(*func) {
                Some(Node::Decl(Decl::Function(f))) => assert_eq!(f.name, "plus"),
                other => panic!("expected method decl, got {:?}", other),
            }
        }
        other => panic!("expected method ref, got {:?}", other),
    }
}

// ===========================================================================
// Statements and locals
// ===========================================================================

#[test]
fn non_boolean_condition_reports() {
    let mut session = Session::new();
    let app = session.get_or_create(&QualifiedName::simple("app"));
    let cond = int_literal(&mut session, 1);
    let if_stmt = {
        let arena = session.arena_mut();
        let cond = Link::to(arena, cond);
        let block = arena.alloc(
            Node::Stmt(Stmt::Block {
                body: NodeList::new(),
            }),
            Span::default(),
        );
        let then_body = Link::to(arena, block);
        arena.alloc(
            Node::Stmt(Stmt::If {
                cond,
                then_body,
                else_body: Link::empty(),
            }),
            Span::default(),
        )
    };
    push_top(&mut session, app, if_stmt);

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, app),
        Outcome::Resolved
    );
    assert_eq!(problems.error_count(), 1);
    let message = problems.iter().next().unwrap().message.clone();
    assert!(message.contains("expected a boolean"), "{message}");
}

#[test]
fn local_type_is_inferred_and_duplicates_report() {
    let mut session = Session::new();
    let app = session.get_or_create(&QualifiedName::simple("app"));

    let one = int_literal(&mut session, 1);
    let first = local_var(&mut session, "a", one);
    let two = int_literal(&mut session, 2);
    let second = local_var(&mut session, "a", two);

    let body = {
        let s1 = decl_stmt(&mut session, first);
        let s2 = decl_stmt(&mut session, second);
        let arena = session.arena_mut();
        let mut list = NodeList::new();
        list.push(arena, s1);
        list.push(arena, s2);
        arena.alloc(Node::Stmt(Stmt::Block { body: list }), Span::default())
    };
    let main = {
        let arena = session.arena_mut();
        let body = Link::to(arena, body);
        arena.alloc(
            Node::Decl(Decl::Function(FunctionDecl {
                name: "main".into(),
                modifiers: Modifiers::empty(),
                kind: FunctionKind::Free,
                params: NodeList::new(),
                return_type: Link::empty(),
                body,
                initializer: Link::empty(),
                parent: None,
            })),
            Span::default(),
        )
    };
    let stmt = decl_stmt(&mut session, main);
    push_top(&mut session, app, stmt);

    let mut analyzer = Analyzer::new();
    let mut problems = Problems::new();
    assert_eq!(
        analyzer.analyze_module(&mut session, &mut problems, app),
        Outcome::Resolved
    );
    assert_eq!(problems.error_count(), 1);
    let message = problems.iter().next().unwrap().message.clone();
    assert!(message.contains("duplicate declaration of 'a'"), "{message}");

    // The first local's type was inferred from its initializer.
    let int32 = session.builtin(BuiltIn::Int32);
    match session.arena().get(first) {
        Some(Node::Decl(Decl::Variable(v))) => {
            assert_eq!(v.declared_type.target(session.arena()), Some(int32));
        }
        other => panic!("expected variable, got {:?}", other),
    }
}
