//! Pass 1: build the symbol table and the decl arena.
//!
//! Scopes are created here and only here. A declaration whose name is
//! already taken in the current scope reports `DeclConflict` and is not
//! inserted, but its scopes are still created so that later passes can
//! re-enter scopes in creation order unconditionally.

use super::Analyzer;
use crate::decl_table::{ClassInfo, DeclInfo, FnInfo, InterfaceInfo, VarInfo};
use crate::errors::SemanticError;
use shrew_frontend::{Block, ClassDecl, Decl, FnDecl, InterfaceDecl, Program, Stmt, Symbol, VarDecl};
use shrew_identity::DeclId;

impl Analyzer<'_> {
    pub fn build_symbol_table(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Var(v) => {
                    self.declare_var(v, None);
                }
                Decl::Fn(f) => {
                    self.declare_fn(f, None, false);
                }
                Decl::Class(c) => self.declare_class(c),
                Decl::Interface(i) => self.declare_interface(i),
            }
        }
    }

    /// Insert under `name`, reporting `DeclConflict` against the existing
    /// entry when the current scope already has one.
    fn try_insert(&mut self, name: &shrew_frontend::Ident) -> bool {
        if let Some(prev) = self.table.local_lookup(name.sym) {
            self.error(
                SemanticError::DeclConflict {
                    name: self.name(name.sym).to_string(),
                    span: name.span.into(),
                    previous: self.decls.span(prev).into(),
                },
                name.span,
            );
            return false;
        }
        true
    }

    fn record(&mut self, name: &shrew_frontend::Ident, id: DeclId) {
        self.table.insert(name.sym, id);
        self.decl_of_node.insert(name.id, id);
        self.resolutions.insert(name.id, id);
    }

    fn declare_var(&mut self, var: &VarDecl, owner: Option<Symbol>) -> Option<DeclId> {
        if !self.try_insert(&var.name) {
            return None;
        }
        let id = self.decls.insert(DeclInfo::Var(VarInfo {
            name: var.name.sym,
            span: var.name.span,
            ty: None,
            owner,
            field_offset: None,
            global_offset: None,
        }));
        self.record(&var.name, id);
        Some(id)
    }

    fn declare_fn(
        &mut self,
        func: &FnDecl,
        owner: Option<Symbol>,
        owner_is_interface: bool,
    ) -> Option<DeclId> {
        let id = if self.try_insert(&func.name) {
            let id = self.decls.insert(DeclInfo::Fn(FnInfo {
                name: func.name.sym,
                span: func.name.span,
                return_ty: None,
                formals: Vec::new(),
                has_body: func.body.is_some(),
                owner,
                owner_is_interface,
                vtable_slot: None,
                label: None,
            }));
            self.record(&func.name, id);
            Some(id)
        } else {
            None
        };

        self.table.generate_scope(None);
        let mut formals = Vec::new();
        for formal in &func.formals {
            if let Some(fid) = self.declare_var(formal, None) {
                formals.push(fid);
            }
        }
        if let Some(id) = id
            && let Some(info) = self.decls.function_mut(id)
        {
            info.formals = formals;
        }
        if let Some(body) = &func.body {
            self.declare_block(body);
        }
        self.table.exit_scope();
        id
    }

    fn declare_class(&mut self, class: &ClassDecl) {
        let id = if self.try_insert(&class.name) {
            let id = self.decls.insert(DeclInfo::Class(ClassInfo {
                name: class.name.sym,
                span: class.name.span,
                extends: class.extends.as_ref().map(|e| e.sym),
                implements: class.implements.iter().map(|i| i.sym).collect(),
                members: Vec::new(),
                var_members: Vec::new(),
                fn_members: Vec::new(),
                inst_size: 0,
                vtable_size: 0,
            }));
            self.record(&class.name, id);
            self.decls.register_type(class.name.sym, id);
            Some(id)
        } else {
            None
        };

        self.table.generate_scope(Some(class.name.sym));
        if let Some(extends) = &class.extends {
            self.table.set_parent(extends.sym);
        }
        for interface in &class.implements {
            self.table.add_interface(interface.sym);
        }
        let mut members = Vec::new();
        for member in &class.members {
            let member_id = match member {
                Decl::Var(v) => self.declare_var(v, Some(class.name.sym)),
                Decl::Fn(f) => self.declare_fn(f, Some(class.name.sym), false),
                // The grammar only admits fields and methods as members.
                Decl::Class(_) | Decl::Interface(_) => None,
            };
            if let Some(mid) = member_id {
                members.push(mid);
            }
        }
        self.table.exit_scope();

        if let Some(id) = id
            && let Some(info) = self.decls.class_mut(id)
        {
            info.members = members;
        }
    }

    fn declare_interface(&mut self, interface: &InterfaceDecl) {
        let id = if self.try_insert(&interface.name) {
            let id = self.decls.insert(DeclInfo::Interface(InterfaceInfo {
                name: interface.name.sym,
                span: interface.name.span,
                members: Vec::new(),
            }));
            self.record(&interface.name, id);
            self.decls.register_type(interface.name.sym, id);
            Some(id)
        } else {
            None
        };

        self.table.generate_scope(Some(interface.name.sym));
        let mut members = Vec::new();
        for member in &interface.members {
            if let Some(mid) = self.declare_fn(member, Some(interface.name.sym), true) {
                members.push(mid);
            }
        }
        self.table.exit_scope();

        if let Some(id) = id
            && let Some(info) = self.decls.interface_mut(id)
        {
            info.members = members;
        }
    }

    fn declare_block(&mut self, block: &Block) {
        self.table.generate_scope(None);
        for var in &block.decls {
            self.declare_var(var, None);
        }
        for stmt in &block.stmts {
            self.declare_stmt(stmt);
        }
        self.table.exit_scope();
    }

    fn declare_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.declare_block(block),
            Stmt::If(s) => {
                self.table.generate_scope(None);
                self.declare_stmt(&s.then_body);
                self.table.exit_scope();
                if let Some(else_body) = &s.else_body {
                    self.table.generate_scope(None);
                    self.declare_stmt(else_body);
                    self.table.exit_scope();
                }
            }
            Stmt::While(s) => {
                self.table.generate_scope(None);
                self.declare_stmt(&s.body);
                self.table.exit_scope();
            }
            Stmt::For(s) => {
                self.table.generate_scope(None);
                self.declare_stmt(&s.body);
                self.table.exit_scope();
            }
            _ => {}
        }
    }
}
