//! The TAC emitter.
//!
//! `Emitter` owns the growing instruction list plus the label, temporary,
//! and offset counters. Lowering for expressions and statements lives in
//! `expr.rs` and `stmt.rs`; this module holds the facade, the frame
//! bookkeeping, and program/declaration emission.
//!
//! Runs only on programs that passed every check pass and the layout pass.

mod expr;
mod stmt;

use crate::errors::CodegenError;
use crate::tac::{Instr, LocId, Location, Segment, TacOp, TacProgram};
use rustc_hash::FxHashMap;
use shrew_frontend::{Decl, FnDecl, Interner, NodeId, Program, VarDecl};
use shrew_identity::DeclId;
use shrew_sema::{Analysis, Type, WORD_SIZE};
use smallvec::SmallVec;
use tracing::debug;

/// Locals and temporaries grow downward from here.
pub const OFFSET_TO_FIRST_LOCAL: i32 = -8;
/// Parameters (and the implicit receiver) grow upward from here.
pub const OFFSET_TO_FIRST_PARAM: i32 = 4;

/// Message printed by the emitted bounds-check sequence before halting.
pub const ERR_ARRAY_OUT_OF_BOUNDS: &str = "Shrew runtime error: array subscript out of bounds\n";
/// Message printed by the emitted array-size check before halting.
pub const ERR_ARRAY_BAD_SIZE: &str = "Shrew runtime error: array size is <= 0\n";

/// The runtime entry points the emitter may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Alloc,
    ReadLine,
    ReadInteger,
    StringEqual,
    PrintInt,
    PrintString,
    PrintBool,
    Halt,
}

impl Builtin {
    pub fn label(self) -> &'static str {
        match self {
            Builtin::Alloc => "_Alloc",
            Builtin::ReadLine => "_ReadLine",
            Builtin::ReadInteger => "_ReadInteger",
            Builtin::StringEqual => "_StringEqual",
            Builtin::PrintInt => "_PrintInt",
            Builtin::PrintString => "_PrintString",
            Builtin::PrintBool => "_PrintBool",
            Builtin::Halt => "_Halt",
        }
    }

    pub fn has_return(self) -> bool {
        matches!(
            self,
            Builtin::Alloc | Builtin::ReadLine | Builtin::ReadInteger | Builtin::StringEqual
        )
    }
}

/// Lower a checked, laid-out program to three-address code.
pub fn emit_program(
    program: &Program,
    analysis: &Analysis,
    interner: &Interner,
) -> Result<TacProgram, CodegenError> {
    Emitter::new(program, analysis, interner).emit()
}

pub struct Emitter<'a> {
    program: &'a Program,
    analysis: &'a Analysis,
    interner: &'a Interner,
    tac: TacProgram,
    next_label: u32,
    next_temp: u32,
    local_offset: i32,
    param_offset: i32,
    /// Emit location of every variable declaration seen so far.
    var_locs: FxHashMap<DeclId, LocId>,
    /// Innermost-last stack of loop exit labels for `break`.
    loop_ends: Vec<String>,
    /// Receiver slot when emitting a method body.
    this_loc: Option<LocId>,
}

impl<'a> Emitter<'a> {
    pub fn new(program: &'a Program, analysis: &'a Analysis, interner: &'a Interner) -> Self {
        Self {
            program,
            analysis,
            interner,
            tac: TacProgram::default(),
            next_label: 0,
            next_temp: 0,
            local_offset: OFFSET_TO_FIRST_LOCAL,
            param_offset: OFFSET_TO_FIRST_PARAM,
            var_locs: FxHashMap::default(),
            loop_ends: Vec::new(),
            this_loc: None,
        }
    }

    pub fn emit(mut self) -> Result<TacProgram, CodegenError> {
        let has_main = self.program.decls.iter().any(|decl| {
            matches!(decl, Decl::Fn(f) if self.interner.resolve(f.name.sym) == "main")
        });
        if !has_main {
            return Err(CodegenError::NoMainFound);
        }
        // Interface dispatch has no lowering; refuse before any method body
        // can reach for an interface method's (nonexistent) vtable slot.
        for decl in &self.program.decls {
            if let Decl::Interface(interface) = decl {
                return Err(CodegenError::InterfaceNotSupported {
                    span: interface.name.span.into(),
                });
            }
        }

        // Globals are addressable from every function, so their locations
        // exist before any body is emitted.
        for decl in &self.program.decls {
            if let Decl::Var(var) = decl {
                let id = self.decl_of(var.name.id);
                let offset = self
                    .analysis
                    .decls
                    .var(id)
                    .and_then(|v| v.global_offset)
                    .expect("layout pass must run before emission");
                let loc = self.tac.alloc_location(Location {
                    name: self.interner.resolve(var.name.sym).to_string(),
                    segment: Segment::Global,
                    offset,
                });
                self.var_locs.insert(id, loc);
            }
        }

        for decl in &self.program.decls {
            match decl {
                Decl::Var(var) => self.refuse_double(var)?,
                Decl::Fn(func) => self.emit_fn(func, false)?,
                Decl::Class(class) => {
                    for member in &class.members {
                        match member {
                            Decl::Var(field) => self.refuse_double(field)?,
                            Decl::Fn(method) => self.emit_fn(method, true)?,
                            _ => {}
                        }
                    }
                    let class_id = self.decl_of(class.name.id);
                    let info = self
                        .analysis
                        .decls
                        .class(class_id)
                        .expect("class registered during declaration pass");
                    let methods = info
                        .fn_members
                        .iter()
                        .map(|id| {
                            self.analysis
                                .decls
                                .function(*id)
                                .and_then(|f| f.label.clone())
                                .expect("method label assigned by layout")
                        })
                        .collect();
                    self.tac.push(Instr::VTable {
                        class: self.interner.resolve(class.name.sym).to_string(),
                        methods,
                    });
                }
                Decl::Interface(_) => unreachable!("interfaces refused above"),
            }
        }

        debug!(instrs = self.tac.instrs.len(), "TAC emission finished");
        Ok(self.tac)
    }

    fn refuse_double(&self, var: &VarDecl) -> Result<(), CodegenError> {
        let id = self.decl_of(var.name.id);
        if matches!(
            self.analysis.decls.var(id).and_then(|v| v.ty.as_ref()),
            Some(Type::Double)
        ) {
            return Err(CodegenError::DoubleNotSupported {
                span: var.ty.span().into(),
            });
        }
        Ok(())
    }

    fn emit_fn(&mut self, func: &FnDecl, is_method: bool) -> Result<(), CodegenError> {
        let id = self.decl_of(func.name.id);
        let label = self
            .analysis
            .decls
            .function(id)
            .and_then(|f| f.label.clone())
            .expect("function label assigned by layout");
        debug!(%label, "emit function");
        self.tac.push(Instr::Label { name: label });

        self.reset_frame();
        let begin = self.tac.instrs.len();
        self.tac.push(Instr::BeginFunc { frame_size: 0 });

        self.this_loc = if is_method {
            let offset = self.next_param();
            Some(self.tac.alloc_location(Location {
                name: "this".to_string(),
                segment: Segment::Frame,
                offset,
            }))
        } else {
            None
        };

        for formal in &func.formals {
            let formal_id = self.decl_of(formal.name.id);
            let offset = self.next_param();
            let loc = self.tac.alloc_location(Location {
                name: self.interner.resolve(formal.name.sym).to_string(),
                segment: Segment::Frame,
                offset,
            });
            self.var_locs.insert(formal_id, loc);
        }

        if let Some(body) = &func.body {
            self.emit_block(body)?;
        }

        self.tac.instrs[begin] = Instr::BeginFunc {
            frame_size: self.frame_size(),
        };
        self.tac.push(Instr::EndFunc);
        Ok(())
    }

    // ---- frame and counter bookkeeping --------------------------------

    fn reset_frame(&mut self) {
        self.local_offset = OFFSET_TO_FIRST_LOCAL;
        self.param_offset = OFFSET_TO_FIRST_PARAM;
    }

    fn frame_size(&self) -> i32 {
        OFFSET_TO_FIRST_LOCAL - self.local_offset
    }

    fn next_local(&mut self) -> i32 {
        let offset = self.local_offset;
        self.local_offset -= WORD_SIZE;
        offset
    }

    fn next_param(&mut self) -> i32 {
        let offset = self.param_offset;
        self.param_offset += WORD_SIZE;
        offset
    }

    pub(crate) fn new_label(&mut self) -> String {
        let label = format!("_L{}", self.next_label);
        self.next_label += 1;
        label
    }

    pub(crate) fn new_temp(&mut self) -> LocId {
        let name = format!("_tmp{}", self.next_temp);
        self.next_temp += 1;
        let offset = self.next_local();
        self.tac.alloc_location(Location {
            name,
            segment: Segment::Frame,
            offset,
        })
    }

    /// A named frame slot for a block-local variable.
    pub(crate) fn new_frame_var(&mut self, name: &str) -> LocId {
        let offset = self.next_local();
        self.tac.alloc_location(Location {
            name: name.to_string(),
            segment: Segment::Frame,
            offset,
        })
    }

    // ---- decl/resolution access ---------------------------------------

    pub(crate) fn decl_of(&self, node: NodeId) -> DeclId {
        *self
            .analysis
            .decl_of_node
            .get(&node)
            .expect("declaration registered during symbol-table build")
    }

    pub(crate) fn resolved(&self, node: NodeId) -> DeclId {
        *self
            .analysis
            .resolutions
            .get(&node)
            .expect("identifier resolved during check passes")
    }

    // ---- instruction generators ---------------------------------------

    pub(crate) fn gen_load_int(&mut self, value: i32) -> LocId {
        let dst = self.new_temp();
        self.tac.push(Instr::LoadIntConst { dst, value });
        dst
    }

    pub(crate) fn gen_load_str(&mut self, value: &str) -> LocId {
        let dst = self.new_temp();
        self.tac.push(Instr::LoadStrConst {
            dst,
            value: value.to_string(),
        });
        dst
    }

    pub(crate) fn gen_load_label(&mut self, label: String) -> LocId {
        let dst = self.new_temp();
        self.tac.push(Instr::LoadLabel { dst, label });
        dst
    }

    pub(crate) fn gen_assign(&mut self, dst: LocId, src: LocId) {
        self.tac.push(Instr::Assign { dst, src });
    }

    pub(crate) fn gen_load(&mut self, base: LocId, offset: i32) -> LocId {
        let dst = self.new_temp();
        self.tac.push(Instr::Load { dst, base, offset });
        dst
    }

    pub(crate) fn gen_store(&mut self, base: LocId, src: LocId, offset: i32) {
        self.tac.push(Instr::Store { base, src, offset });
    }

    pub(crate) fn gen_binary(&mut self, op: TacOp, left: LocId, right: LocId) -> LocId {
        let dst = self.new_temp();
        self.tac.push(Instr::Binary {
            op,
            dst,
            left,
            right,
        });
        dst
    }

    pub(crate) fn gen_label(&mut self, name: String) {
        self.tac.push(Instr::Label { name });
    }

    pub(crate) fn gen_goto(&mut self, label: String) {
        self.tac.push(Instr::Goto { label });
    }

    pub(crate) fn gen_ifz(&mut self, cond: LocId, label: String) {
        self.tac.push(Instr::IfZ { cond, label });
    }

    pub(crate) fn gen_lcall(&mut self, label: String, has_return: bool) -> Option<LocId> {
        let dst = has_return.then(|| self.new_temp());
        self.tac.push(Instr::LCall { label, dst });
        dst
    }

    pub(crate) fn gen_acall(&mut self, addr: LocId, has_return: bool) -> Option<LocId> {
        let dst = has_return.then(|| self.new_temp());
        self.tac.push(Instr::ACall { addr, dst });
        dst
    }

    pub(crate) fn gen_push_param(&mut self, src: LocId) {
        self.tac.push(Instr::PushParam { src });
    }

    pub(crate) fn gen_pop_params(&mut self, bytes: i32) {
        if bytes > 0 {
            self.tac.push(Instr::PopParams { bytes });
        }
    }

    /// Call a runtime entry point. Arguments are pushed right-to-left like
    /// ordinary calls.
    pub(crate) fn gen_builtin_call(&mut self, builtin: Builtin, args: &[LocId]) -> Option<LocId> {
        let pushes: SmallVec<[LocId; 2]> = args.iter().rev().copied().collect();
        for arg in pushes {
            self.gen_push_param(arg);
        }
        let dst = self.gen_lcall(builtin.label().to_string(), builtin.has_return());
        self.gen_pop_params(WORD_SIZE * args.len() as i32);
        dst
    }
}
