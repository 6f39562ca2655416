//! Pass 3: inheritance and interface conformance.
//!
//! Within each class scope: a field may not shadow anything inherited or
//! required by an interface; a method overriding an inherited method must
//! keep the signature; every abstract method of an implemented interface
//! must be defined (possibly by inheritance) with an equivalent signature.
//! Inheritance cycles are diagnosed here before anything walks them.
//!
//! Every function body is still traversed, entering and exiting block
//! scopes, so scope re-entry stays aligned with the build pass.

use super::Analyzer;
use crate::errors::SemanticError;
use shrew_frontend::{Block, ClassDecl, Decl, FnDecl, Program, Stmt};

impl Analyzer<'_> {
    pub fn check_inheritance(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Var(_) => {}
                Decl::Fn(f) => self.inherit_fn(f),
                Decl::Class(c) => self.inherit_class(c),
                Decl::Interface(i) => {
                    self.table.enter_scope();
                    for member in &i.members {
                        self.inherit_fn(member);
                    }
                    self.table.exit_scope();
                }
            }
        }
    }

    fn inherit_fn(&mut self, func: &FnDecl) {
        self.table.enter_scope();
        if let Some(body) = &func.body {
            self.walk_block_scopes(body);
        }
        self.table.exit_scope();
    }

    fn inherit_class(&mut self, class: &ClassDecl) {
        self.check_inheritance_cycle(class);

        self.table.enter_scope();
        for member in &class.members {
            match member {
                Decl::Var(v) => {
                    let inherited = self
                        .table
                        .find_parent(v.name.sym)
                        .or_else(|| self.table.find_interface(v.name.sym));
                    if let Some(prev) = inherited {
                        self.error(
                            SemanticError::DeclConflict {
                                name: self.name(v.name.sym).to_string(),
                                span: v.name.span.into(),
                                previous: self.decls.span(prev).into(),
                            },
                            v.name.span,
                        );
                    }
                }
                Decl::Fn(f) => {
                    self.check_method_override(f);
                    self.inherit_fn(f);
                }
                Decl::Class(_) | Decl::Interface(_) => {}
            }
        }

        for interface_ident in &class.implements {
            let Some(&interface_id) = self.resolutions.get(&interface_ident.id) else {
                continue;
            };
            let Some(interface) = self.decls.interface(interface_id) else {
                continue;
            };
            let required = interface.members.clone();
            for method in required {
                let method_name = self.decls.name(method);
                let implemented = self
                    .table
                    .look_for_field(class.name.sym, method_name)
                    .is_some_and(|found| {
                        self.decls.is_fn(found) && self.decls.signatures_equivalent(method, found)
                    });
                if !implemented {
                    self.error(
                        SemanticError::InterfaceNotImplemented {
                            class_name: self.name(class.name.sym).to_string(),
                            interface_name: self.name(interface_ident.sym).to_string(),
                            span: interface_ident.span.into(),
                        },
                        interface_ident.span,
                    );
                    break;
                }
            }
        }
        self.table.exit_scope();
    }

    /// A method clashing with an inherited non-method is a conflict; one
    /// clashing with an inherited method must keep its signature. Checks
    /// are skipped while either signature is unresolved, since the missing
    /// piece has already been reported.
    fn check_method_override(&mut self, func: &FnDecl) {
        let own = self.decl_of_node.get(&func.name.id).copied();

        if let Some(prev) = self.table.find_parent(func.name.sym) {
            if !self.decls.is_fn(prev) {
                self.error(
                    SemanticError::DeclConflict {
                        name: self.name(func.name.sym).to_string(),
                        span: func.name.span.into(),
                        previous: self.decls.span(prev).into(),
                    },
                    func.name.span,
                );
            } else if let Some(own) = own
                && self.signatures_resolved(own, prev)
                && !self.decls.signatures_equivalent(own, prev)
            {
                self.error(
                    SemanticError::OverrideMismatch {
                        name: self.name(func.name.sym).to_string(),
                        span: func.name.span.into(),
                    },
                    func.name.span,
                );
            }
        }

        if let Some(required) = self.table.find_interface(func.name.sym)
            && self.decls.is_fn(required)
            && let Some(own) = own
            && self.signatures_resolved(own, required)
            && !self.decls.signatures_equivalent(own, required)
        {
            self.error(
                SemanticError::OverrideMismatch {
                    name: self.name(func.name.sym).to_string(),
                    span: func.name.span.into(),
                },
                func.name.span,
            );
        }
    }

    fn signatures_resolved(&self, a: shrew_identity::DeclId, b: shrew_identity::DeclId) -> bool {
        [a, b].iter().all(|id| {
            self.decls
                .function(*id)
                .is_some_and(|f| f.return_ty.is_some())
        })
    }

    fn check_inheritance_cycle(&mut self, class: &ClassDecl) {
        let mut seen = vec![class.name.sym];
        let mut cursor = class.extends.as_ref().map(|e| e.sym);
        while let Some(current) = cursor {
            if current == class.name.sym {
                self.error(
                    SemanticError::CyclicInheritance {
                        name: self.name(class.name.sym).to_string(),
                        span: class.name.span.into(),
                    },
                    class.name.span,
                );
                return;
            }
            if seen.contains(&current) {
                // A cycle not passing through this class; it is reported at
                // the classes it does pass through.
                return;
            }
            seen.push(current);
            cursor = self
                .decls
                .type_by_name(current)
                .and_then(|id| self.decls.class(id))
                .and_then(|c| c.extends);
        }
    }

    fn walk_block_scopes(&mut self, block: &Block) {
        self.table.enter_scope();
        for stmt in &block.stmts {
            self.walk_stmt_scopes(stmt);
        }
        self.table.exit_scope();
    }

    fn walk_stmt_scopes(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.walk_block_scopes(block),
            Stmt::If(s) => {
                self.table.enter_scope();
                self.walk_stmt_scopes(&s.then_body);
                self.table.exit_scope();
                if let Some(else_body) = &s.else_body {
                    self.table.enter_scope();
                    self.walk_stmt_scopes(else_body);
                    self.table.exit_scope();
                }
            }
            Stmt::While(s) => {
                self.table.enter_scope();
                self.walk_stmt_scopes(&s.body);
                self.table.exit_scope();
            }
            Stmt::For(s) => {
                self.table.enter_scope();
                self.walk_stmt_scopes(&s.body);
                self.table.exit_scope();
            }
            _ => {}
        }
    }
}
