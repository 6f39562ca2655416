//! Pass 2: resolve named types and identifier references.
//!
//! Expression types are not computed yet; this pass only links identifiers
//! to decls (recorded in `resolutions`) and fills in declared variable
//! types and function signatures on the decl arena.

use super::Analyzer;
use crate::errors::{LookingFor, SemanticError};
use crate::types::Type;
use shrew_frontend::{
    Block, ClassDecl, Decl, Expr, ExprKind, FnDecl, Ident, InterfaceDecl, PrimType, Program, Stmt,
    TypeExpr, VarDecl,
};
use shrew_identity::DeclId;

impl Analyzer<'_> {
    pub fn check_declarations(&mut self, program: &Program) {
        for decl in &program.decls {
            self.check_decl_decl(decl);
        }
    }

    fn check_decl_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(v) => self.check_decl_var(v),
            Decl::Fn(f) => self.check_decl_fn(f),
            Decl::Class(c) => self.check_decl_class(c),
            Decl::Interface(i) => self.check_decl_interface(i),
        }
    }

    fn check_decl_var(&mut self, var: &VarDecl) {
        let resolved = self.resolve_type_expr(&var.ty, LookingFor::Type);
        if let Some(&id) = self.decl_of_node.get(&var.name.id)
            && let Some(info) = self.decls.var_mut(id)
        {
            info.ty = resolved;
        }
        if let Some(init) = &var.init {
            self.check_decl_expr(init);
        }
    }

    fn check_decl_fn(&mut self, func: &FnDecl) {
        let resolved = self.resolve_type_expr(&func.return_ty, LookingFor::Type);
        if let Some(&id) = self.decl_of_node.get(&func.name.id)
            && let Some(info) = self.decls.function_mut(id)
        {
            info.return_ty = resolved;
        }

        self.table.enter_scope();
        for formal in &func.formals {
            self.check_decl_var(formal);
        }
        if let Some(body) = &func.body {
            self.check_decl_block(body);
        }
        self.table.exit_scope();

        if self.name(func.name.sym) == "main" {
            if !matches!(func.return_ty, TypeExpr::Prim(PrimType::Void, _)) {
                self.error(
                    SemanticError::Formatted {
                        message: "return value of 'main' function is expected to be void"
                            .to_string(),
                        span: func.name.span.into(),
                    },
                    func.name.span,
                );
            }
            if !func.formals.is_empty() {
                self.error(
                    SemanticError::NumArgsMismatch {
                        name: "main".to_string(),
                        expected: 0,
                        given: func.formals.len(),
                        span: func.name.span.into(),
                    },
                    func.name.span,
                );
            }
        }
    }

    fn check_decl_class(&mut self, class: &ClassDecl) {
        if let Some(extends) = &class.extends {
            self.resolve_named(extends, LookingFor::Class);
        }
        for interface in &class.implements {
            self.resolve_named(interface, LookingFor::Interface);
        }
        self.table.enter_scope();
        for member in &class.members {
            self.check_decl_decl(member);
        }
        self.table.exit_scope();
    }

    fn check_decl_interface(&mut self, interface: &InterfaceDecl) {
        self.table.enter_scope();
        for member in &interface.members {
            self.check_decl_fn(member);
        }
        self.table.exit_scope();
    }

    /// Resolve an identifier used as a type name. `reason` narrows what
    /// kinds of decl are acceptable and flavors the diagnostic.
    pub(crate) fn resolve_named(&mut self, ident: &Ident, reason: LookingFor) -> Option<DeclId> {
        let found = self.table.lookup(ident.sym);
        let acceptable = found.is_some_and(|id| match reason {
            LookingFor::Class => self.decls.is_class(id),
            LookingFor::Interface => self.decls.is_interface(id),
            _ => self.decls.is_class(id) || self.decls.is_interface(id),
        });
        if !acceptable {
            self.error(
                SemanticError::IdentifierNotDeclared {
                    name: self.name(ident.sym).to_string(),
                    reason,
                    span: ident.span.into(),
                },
                ident.span,
            );
            return None;
        }
        let id = found.expect("acceptable implies found");
        self.resolutions.insert(ident.id, id);
        Some(id)
    }

    /// Resolve a written type to a semantic type; `None` when any named
    /// component fails to resolve (the failure has been reported).
    pub(crate) fn resolve_type_expr(
        &mut self,
        ty: &TypeExpr,
        reason: LookingFor,
    ) -> Option<Type> {
        match ty {
            TypeExpr::Prim(prim, _) => Some(match prim {
                PrimType::Int => Type::Int,
                PrimType::Double => Type::Double,
                PrimType::Bool => Type::Bool,
                PrimType::String => Type::String,
                PrimType::Void => Type::Void,
            }),
            TypeExpr::Named(ident) => self
                .resolve_named(ident, reason)
                .map(|_| Type::Named(ident.sym)),
            TypeExpr::Array(elem, _) => self
                .resolve_type_expr(elem, LookingFor::Type)
                .map(|e| Type::Array(Box::new(e))),
        }
    }

    /// Re-read a type expression resolved earlier, without reporting.
    pub(crate) fn resolved_type_expr(&self, ty: &TypeExpr) -> Option<Type> {
        match ty {
            TypeExpr::Prim(prim, _) => Some(match prim {
                PrimType::Int => Type::Int,
                PrimType::Double => Type::Double,
                PrimType::Bool => Type::Bool,
                PrimType::String => Type::String,
                PrimType::Void => Type::Void,
            }),
            TypeExpr::Named(ident) => self
                .resolutions
                .contains_key(&ident.id)
                .then_some(Type::Named(ident.sym)),
            TypeExpr::Array(elem, _) => self
                .resolved_type_expr(elem)
                .map(|e| Type::Array(Box::new(e))),
        }
    }

    fn check_decl_block(&mut self, block: &Block) {
        self.table.enter_scope();
        for var in &block.decls {
            self.check_decl_var(var);
        }
        for stmt in &block.stmts {
            self.check_decl_stmt(stmt);
        }
        self.table.exit_scope();
    }

    fn check_decl_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => self.check_decl_expr(expr),
            Stmt::If(s) => {
                self.check_decl_expr(&s.test);
                self.table.enter_scope();
                self.check_decl_stmt(&s.then_body);
                self.table.exit_scope();
                if let Some(else_body) = &s.else_body {
                    self.table.enter_scope();
                    self.check_decl_stmt(else_body);
                    self.table.exit_scope();
                }
            }
            Stmt::While(s) => {
                self.check_decl_expr(&s.test);
                self.table.enter_scope();
                self.check_decl_stmt(&s.body);
                self.table.exit_scope();
            }
            Stmt::For(s) => {
                if let Some(init) = &s.init {
                    self.check_decl_expr(init);
                }
                self.check_decl_expr(&s.test);
                if let Some(step) = &s.step {
                    self.check_decl_expr(step);
                }
                self.table.enter_scope();
                self.check_decl_stmt(&s.body);
                self.table.exit_scope();
            }
            Stmt::Return(s) => {
                if let Some(value) = &s.value {
                    self.check_decl_expr(value);
                }
            }
            Stmt::Print(s) => {
                for arg in &s.args {
                    self.check_decl_expr(arg);
                }
            }
            Stmt::Block(block) => self.check_decl_block(block),
            Stmt::Break(_) | Stmt::Empty(_) => {}
        }
    }

    fn check_decl_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Binary(b) => {
                self.check_decl_expr(&b.left);
                self.check_decl_expr(&b.right);
            }
            ExprKind::Unary(u) => self.check_decl_expr(&u.operand),
            ExprKind::Assign(a) => {
                self.check_decl_expr(&a.target);
                self.check_decl_expr(&a.value);
            }
            ExprKind::Field(f) => match &f.base {
                // A bare identifier resolves now; a based access has to wait
                // for its base's type, which the type-check pass computes.
                None => match self.table.lookup(f.field.sym) {
                    Some(id) => {
                        self.resolutions.insert(f.field.id, id);
                    }
                    None => self.error(
                        SemanticError::IdentifierNotDeclared {
                            name: self.name(f.field.sym).to_string(),
                            reason: LookingFor::Variable,
                            span: f.field.span.into(),
                        },
                        f.field.span,
                    ),
                },
                Some(base) => self.check_decl_expr(base),
            },
            ExprKind::Index(i) => {
                self.check_decl_expr(&i.base);
                self.check_decl_expr(&i.subscript);
            }
            ExprKind::Call(c) => {
                match &c.base {
                    None => match self.table.lookup(c.method.sym) {
                        Some(id) if self.decls.is_fn(id) => {
                            self.resolutions.insert(c.method.id, id);
                        }
                        _ => self.error(
                            SemanticError::IdentifierNotDeclared {
                                name: self.name(c.method.sym).to_string(),
                                reason: LookingFor::Function,
                                span: c.method.span.into(),
                            },
                            c.method.span,
                        ),
                    },
                    Some(base) => self.check_decl_expr(base),
                }
                for actual in &c.actuals {
                    self.check_decl_expr(actual);
                }
            }
            ExprKind::New(n) => {
                self.resolve_named(&n.class, LookingFor::Class);
            }
            ExprKind::NewArray(n) => {
                self.check_decl_expr(&n.size);
                self.resolve_type_expr(&n.elem_ty, LookingFor::Type);
            }
            ExprKind::IntLiteral(_)
            | ExprKind::DoubleLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::Null
            | ExprKind::This
            | ExprKind::ReadInteger
            | ExprKind::ReadLine => {}
        }
    }
}
