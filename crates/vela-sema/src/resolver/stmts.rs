//! Statement resolution.

use vela_core::ResolveError;

use vela_ast::{BuiltIn, Decl, Node, NodeId, Stmt};

use crate::conversion::{can_convert, convert};
use crate::types::{self, expr_type};

use super::Resolver;

/// Snapshot of a statement's shape, taken before recursing so the arena
/// borrow does not outlive the dispatch.
enum StmtKind {
    Decl(Option<NodeId>),
    Expr(Option<NodeId>),
    Block(Vec<NodeId>),
    If {
        cond: Option<NodeId>,
        then_body: Option<NodeId>,
        else_body: Option<NodeId>,
    },
    While {
        cond: Option<NodeId>,
        body: Option<NodeId>,
    },
    DoWhile {
        body: Option<NodeId>,
        cond: Option<NodeId>,
    },
    For {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        step: Option<NodeId>,
        body: Option<NodeId>,
    },
    Return(Option<NodeId>),
    Empty,
}

impl Resolver<'_> {
    pub(crate) fn resolve_stmt(&mut self, stmt: NodeId, top_level: bool) {
        let stmt = self.session.arena().resolve(stmt);
        let arena = self.session.arena();
        let kind = match arena.get(stmt) {
            Some(Node::Stmt(s)) => match s {
                Stmt::Decl { decl } => StmtKind::Decl(decl.target(arena)),
                Stmt::Expr { expr } => StmtKind::Expr(expr.target(arena)),
                Stmt::Block { body } => StmtKind::Block(body.ids(arena)),
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                } => StmtKind::If {
                    cond: cond.target(arena),
                    then_body: then_body.target(arena),
                    else_body: else_body.target(arena),
                },
                Stmt::While { cond, body } => StmtKind::While {
                    cond: cond.target(arena),
                    body: body.target(arena),
                },
                Stmt::DoWhile { body, cond } => StmtKind::DoWhile {
                    body: body.target(arena),
                    cond: cond.target(arena),
                },
                Stmt::For {
                    init,
                    cond,
                    step,
                    body,
                } => StmtKind::For {
                    init: init.target(arena),
                    cond: cond.target(arena),
                    step: step.target(arena),
                    body: body.target(arena),
                },
                Stmt::Return { value } => StmtKind::Return(value.target(arena)),
                Stmt::Empty => StmtKind::Empty,
            },
            _ => return,
        };

        match kind {
            StmtKind::Decl(Some(decl)) => self.resolve_decl(decl, top_level),
            StmtKind::Decl(None) => {}
            StmtKind::Expr(Some(expr)) => self.resolve_expr(expr),
            StmtKind::Expr(None) => {}
            StmtKind::Block(body) => {
                self.table().enter_scope();
                for id in body {
                    self.resolve_stmt(id, false);
                }
                self.table().leave_scope();
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                if let Some(cond) = cond {
                    self.resolve_condition(cond);
                }
                for branch in [then_body, else_body].into_iter().flatten() {
                    self.table().enter_scope();
                    self.resolve_stmt(branch, false);
                    self.table().leave_scope();
                }
            }
            StmtKind::While { cond, body } => {
                if let Some(cond) = cond {
                    self.resolve_condition(cond);
                }
                if let Some(body) = body {
                    self.table().enter_scope();
                    self.resolve_stmt(body, false);
                    self.table().leave_scope();
                }
            }
            StmtKind::DoWhile { body, cond } => {
                if let Some(body) = body {
                    self.table().enter_scope();
                    self.resolve_stmt(body, false);
                    self.table().leave_scope();
                }
                if let Some(cond) = cond {
                    self.resolve_condition(cond);
                }
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                // The init declaration scopes over the whole loop.
                self.table().enter_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init, false);
                }
                if let Some(cond) = cond {
                    self.resolve_condition(cond);
                }
                if let Some(step) = step {
                    self.resolve_expr(step);
                }
                if let Some(body) = body {
                    self.resolve_stmt(body, false);
                }
                self.table().leave_scope();
            }
            StmtKind::Return(value) => self.resolve_return(stmt, value),
            StmtKind::Empty => {}
        }
    }

    /// Resolve a condition and require it to convert to boolean.
    fn resolve_condition(&mut self, cond: NodeId) {
        self.resolve_expr(cond);
        let boolean = self.session.builtin(BuiltIn::Bool);
        if can_convert(self.session, cond, boolean, false) {
            convert(self.session, self.problems, cond, boolean, false);
        } else {
            let actual = expr_type(self.session, cond);
            let err = ResolveError::ConditionNotBoolean {
                actual: self.session.type_display(actual),
                span: self.span_of(cond),
            };
            self.error(err);
        }
    }

    fn resolve_return(&mut self, stmt: NodeId, value: Option<NodeId>) {
        let span = self.span_of(stmt);
        let Some(&func) = self.fn_stack.last() else {
            self.error(ResolveError::ReturnOutsideFunction { span });
            if let Some(value) = value {
                self.resolve_expr(value);
            }
            return;
        };

        let ret = types::return_type(self.session, func);
        let is_void =
            types::builtin_of(self.session.arena(), ret) == Some(BuiltIn::Void);

        match value {
            Some(value) => {
                self.resolve_expr(value);
                if is_void {
                    let name = self.function_name(func);
                    self.error(ResolveError::ReturnValueFromVoid { name, span });
                } else if can_convert(self.session, value, ret, false) {
                    convert(self.session, self.problems, value, ret, false);
                } else {
                    let from = expr_type(self.session, value);
                    let err = ResolveError::IncompatibleReturn {
                        from: self.session.type_display(from),
                        to: self.session.type_display(ret),
                        span,
                    };
                    self.error(err);
                }
            }
            None => {
                if !is_void && !types::is_unknown(self.session.arena(), ret) {
                    let err = ResolveError::IncompatibleReturn {
                        from: "void".to_string(),
                        to: self.session.type_display(ret),
                        span,
                    };
                    self.error(err);
                }
            }
        }
    }

    pub(crate) fn function_name(&self, func: NodeId) -> String {
        match self.session.arena().get(func) {
            Some(Node::Decl(Decl::Function(f))) => f.name.clone(),
            _ => String::new(),
        }
    }
}
