//! Pass 4 (statements): assign types and validate statement typing.

use super::Analyzer;
use crate::errors::SemanticError;
use crate::types::Type;
use shrew_frontend::{Block, Decl, FnDecl, Program, Stmt, VarDecl};

impl Analyzer<'_> {
    pub fn check_types(&mut self, program: &Program) {
        for decl in &program.decls {
            self.typecheck_decl(decl);
        }
    }

    fn typecheck_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(v) => self.typecheck_var(v),
            Decl::Fn(f) => self.typecheck_fn(f),
            Decl::Class(c) => {
                self.table.enter_scope();
                for member in &c.members {
                    self.typecheck_decl(member);
                }
                self.table.exit_scope();
            }
            Decl::Interface(i) => {
                self.table.enter_scope();
                for member in &i.members {
                    self.typecheck_fn(member);
                }
                self.table.exit_scope();
            }
        }
    }

    /// A declaration's own type was resolved in the decl-check pass; all
    /// that remains is the optional initializer, which follows the
    /// assignment rule.
    fn typecheck_var(&mut self, var: &VarDecl) {
        let Some(init) = &var.init else { return };
        let init_ty = self.check_expr(init);
        let declared = self
            .decl_of_node
            .get(&var.name.id)
            .and_then(|id| self.decls.var(*id))
            .and_then(|v| v.ty.clone());
        if let Some(declared) = declared
            && !declared.is_compatible_with(&init_ty, &self.decls)
        {
            self.error(
                SemanticError::IncompatibleOperands {
                    op: "=",
                    lhs_type: self.type_name(&declared),
                    rhs_type: self.type_name(&init_ty),
                    span: init.span.into(),
                },
                init.span,
            );
        }
    }

    fn typecheck_fn(&mut self, func: &FnDecl) {
        let saved = self.current_return.take();
        self.current_return = Some(
            self.decl_of_node
                .get(&func.name.id)
                .and_then(|id| self.decls.function(*id))
                .and_then(|f| f.return_ty.clone())
                .unwrap_or(Type::Error),
        );
        self.table.enter_scope();
        if let Some(body) = &func.body {
            self.typecheck_block(body);
        }
        self.table.exit_scope();
        self.current_return = saved;
    }

    fn typecheck_block(&mut self, block: &Block) {
        self.table.enter_scope();
        for var in &block.decls {
            self.typecheck_var(var);
        }
        for stmt in &block.stmts {
            self.typecheck_stmt(stmt);
        }
        self.table.exit_scope();
    }

    fn typecheck_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
            Stmt::Block(block) => self.typecheck_block(block),
            Stmt::If(s) => {
                self.check_test(&s.test);
                self.table.enter_scope();
                self.typecheck_stmt(&s.then_body);
                self.table.exit_scope();
                if let Some(else_body) = &s.else_body {
                    self.table.enter_scope();
                    self.typecheck_stmt(else_body);
                    self.table.exit_scope();
                }
            }
            Stmt::While(s) => {
                self.check_test(&s.test);
                self.loop_depth += 1;
                self.table.enter_scope();
                self.typecheck_stmt(&s.body);
                self.table.exit_scope();
                self.loop_depth -= 1;
            }
            Stmt::For(s) => {
                if let Some(init) = &s.init {
                    self.check_expr(init);
                }
                self.check_test(&s.test);
                if let Some(step) = &s.step {
                    self.check_expr(step);
                }
                self.loop_depth += 1;
                self.table.enter_scope();
                self.typecheck_stmt(&s.body);
                self.table.exit_scope();
                self.loop_depth -= 1;
            }
            Stmt::Return(s) => {
                let given = match &s.value {
                    Some(value) => self.check_expr(value),
                    None => Type::Void,
                };
                if let Some(expected) = self.current_return.clone()
                    && !expected.is_compatible_with(&given, &self.decls)
                {
                    self.error(
                        SemanticError::ReturnMismatch {
                            given: self.type_name(&given),
                            expected: self.type_name(&expected),
                            span: s.span.into(),
                        },
                        s.span,
                    );
                }
            }
            Stmt::Break(span) => {
                if self.loop_depth == 0 {
                    self.error(
                        SemanticError::BreakOutsideLoop {
                            span: (*span).into(),
                        },
                        *span,
                    );
                }
            }
            Stmt::Print(s) => {
                for (index, arg) in s.args.iter().enumerate() {
                    let ty = self.check_expr(arg);
                    let printable =
                        matches!(ty, Type::Int | Type::Bool | Type::String | Type::Error);
                    if !printable {
                        self.error(
                            SemanticError::PrintArgMismatch {
                                position: index + 1,
                                given: self.type_name(&ty),
                                span: arg.span.into(),
                            },
                            arg.span,
                        );
                    }
                }
            }
            Stmt::Empty(_) => {}
        }
    }

    fn check_test(&mut self, test: &shrew_frontend::Expr) {
        let ty = self.check_expr(test);
        if ty != Type::Bool && !ty.is_error() {
            self.error(
                SemanticError::TestNotBoolean {
                    span: test.span.into(),
                },
                test.span,
            );
        }
    }
}
