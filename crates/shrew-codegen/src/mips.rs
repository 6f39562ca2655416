//! The machine emitter boundary: walk the TAC list and print spim-flavored
//! MIPS assembly.
//!
//! Every location is memory-resident (fp- or gp-relative); `$t0`/`$t1` hold
//! operands, `$t2` results. Vtables switch to the data segment inline.
//! Runtime stubs for the built-ins are appended after the program text,
//! backed by spim syscalls.

use crate::tac::{Instr, LocId, Location, Segment, TacOp, TacProgram};

pub struct MipsEmitter<'a> {
    tac: &'a TacProgram,
    out: String,
    /// Interned string constants, in first-use order.
    strings: Vec<String>,
}

impl<'a> MipsEmitter<'a> {
    pub fn new(tac: &'a TacProgram) -> Self {
        Self {
            tac,
            out: String::new(),
            strings: Vec::new(),
        }
    }

    pub fn emit(mut self) -> String {
        self.raw(".text");
        self.raw(".align 2");
        self.raw(".globl main");

        let instrs = self.tac.instrs.clone();
        for instr in &instrs {
            self.instr(instr);
        }

        self.runtime_stubs();
        self.data_segment();
        self.out
    }

    fn raw(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn ins(&mut self, text: String) {
        self.out.push_str("\t");
        self.out.push_str(&text);
        self.out.push('\n');
    }

    fn loc(&self, id: LocId) -> &Location {
        self.tac.location(id)
    }

    /// Load a location's value into a register.
    fn load_reg(&mut self, reg: &str, id: LocId) {
        let loc = self.loc(id);
        let (offset, base) = self.address(loc);
        let line = format!("lw {reg}, {offset}({base})\t# load {}", loc.name);
        self.ins(line);
    }

    /// Store a register into a location.
    fn store_reg(&mut self, reg: &str, id: LocId) {
        let loc = self.loc(id);
        let (offset, base) = self.address(loc);
        let line = format!("sw {reg}, {offset}({base})\t# store {}", loc.name);
        self.ins(line);
    }

    fn address(&self, loc: &Location) -> (i32, &'static str) {
        match loc.segment {
            Segment::Global => (loc.offset, "$gp"),
            Segment::Frame => (loc.offset, "$fp"),
        }
    }

    fn string_label(&mut self, value: &str) -> String {
        let index = match self.strings.iter().position(|s| s == value) {
            Some(index) => index,
            None => {
                self.strings.push(value.to_string());
                self.strings.len() - 1
            }
        };
        format!("_string{index}")
    }

    fn instr(&mut self, instr: &Instr) {
        match instr {
            Instr::Label { name } => self.raw(&format!("{name}:")),
            Instr::LoadIntConst { dst, value } => {
                self.ins(format!("li $t2, {value}"));
                self.store_reg("$t2", *dst);
            }
            Instr::LoadStrConst { dst, value } => {
                let label = self.string_label(value);
                self.ins(format!("la $t2, {label}"));
                self.store_reg("$t2", *dst);
            }
            Instr::LoadLabel { dst, label } => {
                self.ins(format!("la $t2, {label}"));
                self.store_reg("$t2", *dst);
            }
            Instr::Assign { dst, src } => {
                self.load_reg("$t2", *src);
                self.store_reg("$t2", *dst);
            }
            Instr::Load { dst, base, offset } => {
                self.load_reg("$t0", *base);
                self.ins(format!("lw $t2, {offset}($t0)"));
                self.store_reg("$t2", *dst);
            }
            Instr::Store { base, src, offset } => {
                self.load_reg("$t1", *src);
                self.load_reg("$t0", *base);
                self.ins(format!("sw $t1, {offset}($t0)"));
            }
            Instr::Binary {
                op,
                dst,
                left,
                right,
            } => {
                self.load_reg("$t0", *left);
                self.load_reg("$t1", *right);
                let mnemonic = match op {
                    TacOp::Add => "add",
                    TacOp::Sub => "sub",
                    TacOp::Mul => "mul",
                    TacOp::Div => "div",
                    TacOp::Mod => "rem",
                    TacOp::Less => "slt",
                    TacOp::LessEq => "sle",
                    TacOp::Greater => "sgt",
                    TacOp::GreaterEq => "sge",
                    TacOp::Eq => "seq",
                    TacOp::Ne => "sne",
                    TacOp::And => "and",
                    TacOp::Or => "or",
                };
                self.ins(format!("{mnemonic} $t2, $t0, $t1"));
                self.store_reg("$t2", *dst);
            }
            Instr::Goto { label } => self.ins(format!("b {label}")),
            Instr::IfZ { cond, label } => {
                self.load_reg("$t0", *cond);
                self.ins(format!("beqz $t0, {label}"));
            }
            Instr::BeginFunc { frame_size } => {
                self.ins("subu $sp, $sp, 8\t# make room for fp, ra".to_string());
                self.ins("sw $fp, 8($sp)".to_string());
                self.ins("sw $ra, 4($sp)".to_string());
                self.ins("addiu $fp, $sp, 8".to_string());
                if *frame_size > 0 {
                    self.ins(format!("subu $sp, $sp, {frame_size}\t# frame"));
                }
            }
            Instr::EndFunc => self.epilogue(),
            Instr::PushParam { src } => {
                self.ins("subu $sp, $sp, 4".to_string());
                self.load_reg("$t0", *src);
                self.ins("sw $t0, 4($sp)".to_string());
            }
            Instr::PopParams { bytes } => {
                self.ins(format!("add $sp, $sp, {bytes}"));
            }
            Instr::LCall { label, dst } => {
                self.ins(format!("jal {label}"));
                if let Some(dst) = dst {
                    self.ins("move $t2, $v0".to_string());
                    self.store_reg("$t2", *dst);
                }
            }
            Instr::ACall { addr, dst } => {
                self.load_reg("$t0", *addr);
                self.ins("jalr $t0".to_string());
                if let Some(dst) = dst {
                    self.ins("move $t2, $v0".to_string());
                    self.store_reg("$t2", *dst);
                }
            }
            Instr::Return { src } => {
                if let Some(src) = src {
                    self.load_reg("$t0", *src);
                    self.ins("move $v0, $t0".to_string());
                }
                self.epilogue();
            }
            Instr::VTable { class, methods } => {
                self.raw(".data");
                self.raw(".align 2");
                self.raw(&format!("{class}:\t\t# dispatch table"));
                for method in methods {
                    self.raw(&format!("\t.word {method}"));
                }
                self.raw(".text");
            }
        }
    }

    fn epilogue(&mut self) {
        self.ins("move $sp, $fp".to_string());
        self.ins("lw $ra, -4($fp)".to_string());
        self.ins("lw $fp, 0($fp)".to_string());
        self.ins("jr $ra".to_string());
    }

    /// Syscall-backed implementations of the runtime entry points.
    /// Arguments arrive on the stack above $sp, like any call.
    fn runtime_stubs(&mut self) {
        let stubs = r#"
_PrintInt:
	lw $a0, 4($sp)
	li $v0, 1
	syscall
	jr $ra
_PrintString:
	lw $a0, 4($sp)
	li $v0, 4
	syscall
	jr $ra
_PrintBool:
	lw $t0, 4($sp)
	beqz $t0, _PrintBoolFalse
	la $a0, _boolTrue
	li $v0, 4
	syscall
	jr $ra
_PrintBoolFalse:
	la $a0, _boolFalse
	li $v0, 4
	syscall
	jr $ra
_Alloc:
	lw $a0, 4($sp)
	li $v0, 9
	syscall
	jr $ra
_ReadInteger:
	li $v0, 5
	syscall
	jr $ra
_ReadLine:
	la $a0, _readBuffer
	li $a1, 256
	li $v0, 8
	syscall
	la $v0, _readBuffer
	la $t0, _readBuffer
_ReadLineStrip:
	lb $t1, ($t0)
	beqz $t1, _ReadLineDone
	li $t2, 10
	bne $t1, $t2, _ReadLineNext
	sb $zero, ($t0)
	jr $ra
_ReadLineNext:
	addiu $t0, $t0, 1
	b _ReadLineStrip
_ReadLineDone:
	jr $ra
_StringEqual:
	lw $t0, 4($sp)
	lw $t1, 8($sp)
_StringEqualLoop:
	lb $t2, ($t0)
	lb $t3, ($t1)
	bne $t2, $t3, _StringEqualNo
	beqz $t2, _StringEqualYes
	addiu $t0, $t0, 1
	addiu $t1, $t1, 1
	b _StringEqualLoop
_StringEqualYes:
	li $v0, 1
	jr $ra
_StringEqualNo:
	li $v0, 0
	jr $ra
_Halt:
	li $v0, 10
	syscall
"#;
        self.out.push_str(stubs);
    }

    fn data_segment(&mut self) {
        self.raw(".data");
        self.raw("_boolTrue:\t.asciiz \"true\"");
        self.raw("_boolFalse:\t.asciiz \"false\"");
        self.raw("_readBuffer:\t.space 256");
        // Escape sequences pass through verbatim for the assembler to
        // interpret; the lexer guarantees no embedded quote or newline.
        let strings = self.strings.clone();
        for (index, value) in strings.iter().enumerate() {
            self.raw(&format!("_string{index}:\t.asciiz \"{value}\""));
        }
    }
}

/// Convenience wrapper matching the driver's final-codegen step.
pub fn emit_mips(tac: &TacProgram) -> String {
    MipsEmitter::new(tac).emit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::{Instr, Location, Segment, TacProgram};

    #[test]
    fn assembly_carries_entry_and_stubs() {
        let mut tac = TacProgram::default();
        let t0 = tac.alloc_location(Location {
            name: "_tmp0".into(),
            segment: Segment::Frame,
            offset: -8,
        });
        tac.push(Instr::Label {
            name: "main".into(),
        });
        tac.push(Instr::BeginFunc { frame_size: 4 });
        tac.push(Instr::LoadIntConst { dst: t0, value: 7 });
        tac.push(Instr::PushParam { src: t0 });
        tac.push(Instr::LCall {
            label: "_PrintInt".into(),
            dst: None,
        });
        tac.push(Instr::PopParams { bytes: 4 });
        tac.push(Instr::EndFunc);

        let asm = emit_mips(&tac);
        assert!(asm.contains(".globl main"));
        assert!(asm.contains("main:"));
        assert!(asm.contains("jal _PrintInt"));
        assert!(asm.contains("_Halt:"));
        assert!(asm.contains("_StringEqual:"));
    }

    #[test]
    fn string_constants_are_pooled() {
        let mut tac = TacProgram::default();
        let t0 = tac.alloc_location(Location {
            name: "_tmp0".into(),
            segment: Segment::Frame,
            offset: -8,
        });
        let t1 = tac.alloc_location(Location {
            name: "_tmp1".into(),
            segment: Segment::Frame,
            offset: -12,
        });
        tac.push(Instr::LoadStrConst {
            dst: t0,
            value: "hi".into(),
        });
        tac.push(Instr::LoadStrConst {
            dst: t1,
            value: "hi".into(),
        });

        let asm = emit_mips(&tac);
        assert!(asm.contains("_string0:\t.asciiz \"hi\""));
        assert!(!asm.contains("_string1"));
    }
}
