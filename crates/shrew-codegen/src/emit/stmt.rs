//! Statement lowering.

use super::{Builtin, Emitter};
use crate::errors::CodegenError;
use crate::tac::Instr;
use shrew_frontend::{Block, Stmt, VarDecl};
use shrew_sema::Type;

impl Emitter<'_> {
    pub(crate) fn emit_block(&mut self, block: &Block) -> Result<(), CodegenError> {
        for var in &block.decls {
            self.emit_local_var(var)?;
        }
        for stmt in &block.stmts {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    fn emit_local_var(&mut self, var: &VarDecl) -> Result<(), CodegenError> {
        self.refuse_double(var)?;
        let id = self.decl_of(var.name.id);
        let name = self.interner.resolve(var.name.sym).to_string();
        let loc = self.new_frame_var(&name);
        self.var_locs.insert(id, loc);
        if let Some(init) = &var.init {
            let value = self.emit_rvalue(init)?;
            self.gen_assign(loc, value);
        }
        Ok(())
    }

    pub(crate) fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.emit_expr(expr)?;
            }
            Stmt::Block(block) => self.emit_block(block)?,
            Stmt::Empty(_) => {}
            Stmt::If(s) => {
                let test = self.emit_rvalue(&s.test)?;
                let else_label = self.new_label();
                self.gen_ifz(test, else_label.clone());
                self.emit_stmt(&s.then_body)?;
                let end_label = self.new_label();
                self.gen_goto(end_label.clone());
                self.gen_label(else_label);
                if let Some(else_body) = &s.else_body {
                    self.emit_stmt(else_body)?;
                }
                self.gen_label(end_label);
            }
            Stmt::While(s) => {
                let top_label = self.new_label();
                self.gen_label(top_label.clone());
                let test = self.emit_rvalue(&s.test)?;
                let end_label = self.new_label();
                self.loop_ends.push(end_label.clone());
                self.gen_ifz(test, end_label.clone());
                self.emit_stmt(&s.body)?;
                self.gen_goto(top_label);
                self.gen_label(end_label);
                self.loop_ends.pop();
            }
            Stmt::For(s) => {
                if let Some(init) = &s.init {
                    self.emit_expr(init)?;
                }
                let top_label = self.new_label();
                self.gen_label(top_label.clone());
                let test = self.emit_rvalue(&s.test)?;
                let end_label = self.new_label();
                self.loop_ends.push(end_label.clone());
                self.gen_ifz(test, end_label.clone());
                self.emit_stmt(&s.body)?;
                if let Some(step) = &s.step {
                    self.emit_expr(step)?;
                }
                self.gen_goto(top_label);
                self.gen_label(end_label);
                self.loop_ends.pop();
            }
            Stmt::Break(_) => {
                let label = self
                    .loop_ends
                    .last()
                    .cloned()
                    .expect("break outside loop survived type checking");
                self.gen_goto(label);
            }
            Stmt::Return(s) => match &s.value {
                Some(value) => {
                    let src = self.emit_rvalue(value)?;
                    self.tac.push(Instr::Return { src: Some(src) });
                }
                None => self.tac.push(Instr::Return { src: None }),
            },
            Stmt::Print(s) => {
                for arg in &s.args {
                    let value = self.emit_rvalue(arg)?;
                    let builtin = match self.analysis.expr_type(arg.id) {
                        Type::Int => Builtin::PrintInt,
                        Type::Bool => Builtin::PrintBool,
                        Type::String => Builtin::PrintString,
                        other => unreachable!("unprintable type {other:?} survived type checking"),
                    };
                    self.gen_builtin_call(builtin, &[value]);
                }
            }
        }
        Ok(())
    }
}
