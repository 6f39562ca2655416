//! Shrew code generation: three-address-code emission and the MIPS text
//! backend.

pub mod emit;
pub mod errors;
pub mod mips;
pub mod tac;

pub use emit::{
    Builtin, ERR_ARRAY_BAD_SIZE, ERR_ARRAY_OUT_OF_BOUNDS, Emitter, OFFSET_TO_FIRST_LOCAL,
    OFFSET_TO_FIRST_PARAM, emit_program,
};
pub use errors::CodegenError;
pub use mips::{MipsEmitter, emit_mips};
pub use tac::{Instr, LocId, Location, Segment, TacOp, TacProgram};

#[cfg(test)]
mod tests {
    use super::*;
    use shrew_frontend::{Interner, parse_source};
    use shrew_sema::{analyze, assign_layout};

    fn emit_src(src: &str) -> TacProgram {
        try_emit(src).expect("program should lower")
    }

    fn try_emit(src: &str) -> Result<TacProgram, CodegenError> {
        let mut interner = Interner::new();
        let program = parse_source(src, &mut interner).expect("parse failure in test input");
        let mut analysis = analyze(&program, &interner);
        assert!(!analysis.has_errors(), "{:?}", analysis.errors);
        assign_layout(&mut analysis, &program, &interner);
        emit_program(&program, &analysis, &interner)
    }

    fn text(tac: &TacProgram) -> String {
        tac.to_string()
    }

    #[test]
    fn missing_main_is_refused() {
        let err = try_emit("void helper() {}").unwrap_err();
        assert!(matches!(err, CodegenError::NoMainFound));
    }

    #[test]
    fn interface_declarations_are_refused() {
        let err = try_emit("interface I { void m(); } void main() {}").unwrap_err();
        assert!(matches!(err, CodegenError::InterfaceNotSupported { .. }));
    }

    #[test]
    fn double_locals_are_refused() {
        let err = try_emit("void main() { double d; }").unwrap_err();
        assert!(matches!(err, CodegenError::DoubleNotSupported { .. }));
    }

    #[test]
    fn frame_size_counts_locals_and_temps() {
        let tac = emit_src("void main() { int x; x = 3; }");
        // One named local plus the constant's temporary.
        assert!(text(&tac).contains("BeginFunc 8"), "{}", text(&tac));
    }

    #[test]
    fn plain_assign_for_subtype_assignment() {
        let tac = emit_src(
            "class A {} class B extends A {}\
             void main() { A a; B b; b = New(B); a = b; }",
        );
        assert!(text(&tac).contains("\ta = b"), "{}", text(&tac));
    }

    #[test]
    fn array_length_reads_word_before_elements() {
        let tac = emit_src(
            "void main() { int[] a; a = NewArray(3, int); Print(a.length()); }",
        );
        let has_length_load = tac.instrs.iter().any(|i| {
            matches!(i, Instr::Load { base, offset: -4, .. }
                if tac.location(*base).name == "a")
        });
        assert!(has_length_load, "{}", text(&tac));
    }

    #[test]
    fn array_access_emits_bounds_check_and_halt() {
        let tac = emit_src(
            "void main() { int[] a; a = NewArray(3, int); Print(a[5]); }",
        );
        let dump = text(&tac);
        assert!(
            dump.contains(&format!("{:?}", ERR_ARRAY_OUT_OF_BOUNDS)),
            "{dump}"
        );
        assert!(dump.contains("LCall _Halt"), "{dump}");
        // The check reads the length word and combines both comparisons.
        assert!(dump.contains("*(a + -4)"), "{dump}");
        let or_count = tac
            .instrs
            .iter()
            .filter(|i| matches!(i, Instr::Binary { op: TacOp::Or, .. }))
            .count();
        assert_eq!(or_count, 1, "{dump}");
    }

    #[test]
    fn new_array_checks_size_and_stores_length() {
        let tac = emit_src("void main() { int[] a; a = NewArray(3, int); }");
        let dump = text(&tac);
        assert!(dump.contains(&format!("{:?}", ERR_ARRAY_BAD_SIZE)), "{dump}");
        assert!(dump.contains("LCall _Alloc"), "{dump}");
    }

    #[test]
    fn new_object_stores_vtable_label_at_offset_zero() {
        let tac = emit_src("class A { int n; } void main() { A a; a = New(A); }");
        let dump = text(&tac);
        // inst_size = vtable pointer + one field.
        assert!(dump.contains("_tmp0 = 8"), "{dump}");
        assert!(dump.contains("LCall _Alloc"), "{dump}");
        let stores_vtable = tac.instrs.iter().any(|i| {
            matches!(i, Instr::Store { offset: 0, .. })
        });
        assert!(stores_vtable, "{dump}");
        assert!(dump.contains("VTable A"), "{dump}");
    }

    #[test]
    fn method_call_dispatches_through_vtable() {
        let tac = emit_src(
            "class A { int n; int get() { return n; } }\
             void main() { A a; a = New(A); Print(a.get()); }",
        );
        let dump = text(&tac);
        // Receiver's vtable, then slot 0, then an indirect call with the
        // receiver pushed last.
        assert!(dump.contains("*(a + 0)"), "{dump}");
        assert!(dump.contains("ACall"), "{dump}");
        assert!(dump.contains("PushParam a"), "{dump}");
        assert!(dump.contains("PopParams 4"), "{dump}");
    }

    #[test]
    fn override_call_uses_inherited_slot() {
        let tac = emit_src(
            "class A { int f() { return 1; } int g() { return 2; } }\
             class B extends A { int g() { return 20; } }\
             void main() { B b; b = New(B); Print(b.g()); }",
        );
        let dump = text(&tac);
        // g keeps slot 1 -> vtable offset 4.
        let loads_slot = tac
            .instrs
            .iter()
            .any(|i| matches!(i, Instr::Load { offset: 4, .. }));
        assert!(loads_slot, "{dump}");
        assert!(dump.contains("VTable B"), "{dump}");
        assert!(dump.contains("_B.g"), "{dump}");
        assert!(dump.contains("_A.f"), "{dump}");
    }

    #[test]
    fn free_call_uses_prefixed_label_and_pops_args() {
        let tac = emit_src(
            "int add(int a, int b) { return a + b; }\
             void main() { Print(add(1, 2)); }",
        );
        let dump = text(&tac);
        assert!(dump.contains("LCall _add"), "{dump}");
        assert!(dump.contains("PopParams 8"), "{dump}");
    }

    #[test]
    fn string_equality_calls_runtime() {
        let tac = emit_src("void main() { Print(\"a\" == \"b\", \"a\" != \"b\"); }");
        let dump = text(&tac);
        let calls = dump.matches("LCall _StringEqual").count();
        assert_eq!(calls, 2, "{dump}");
        // != negates the runtime's answer.
        assert!(dump.contains("== _tmp"), "{dump}");
    }

    #[test]
    fn field_assignment_stores_through_this() {
        let tac = emit_src(
            "class Counter { int n; void bump() { n = n + 1; } }\
             void main() { Counter c; c = New(Counter); c.bump(); }",
        );
        let has_field_store = tac.instrs.iter().any(|i| {
            matches!(i, Instr::Store { base, offset: 4, .. }
                if tac.location(*base).name == "this")
        });
        assert!(has_field_store, "{}", text(&tac));
    }

    #[test]
    fn implicit_method_call_pushes_this() {
        let tac = emit_src(
            "class A { int f() { return 1; } int g() { return f(); } }\
             void main() { A a; a = New(A); Print(a.g()); }",
        );
        let dump = text(&tac);
        assert!(dump.contains("PushParam this"), "{dump}");
    }

    #[test]
    fn break_jumps_to_loop_end() {
        let tac = emit_src(
            "void main() { while (true) { break; } Print(1); }",
        );
        let dump = text(&tac);
        // Break targets the while's end label (allocated second).
        assert!(dump.contains("Goto _L1"), "{dump}");
    }

    #[test]
    fn if_else_shape() {
        let tac = emit_src(
            "void main() { if (1 < 2) Print(1); else Print(2); }",
        );
        let dump = text(&tac);
        assert!(dump.contains("IfZ _tmp2 Goto _L0"), "{dump}");
        assert!(dump.contains("Goto _L1"), "{dump}");
        assert!(dump.contains("_L0:"), "{dump}");
        assert!(dump.contains("_L1:"), "{dump}");
    }

    #[test]
    fn globals_live_off_the_global_pointer() {
        let tac = emit_src("int g; void main() { g = 4; }");
        let global = tac
            .locations()
            .iter()
            .find(|l| l.name == "g")
            .expect("global location");
        assert_eq!(global.segment, Segment::Global);
        assert_eq!(global.offset, 0);
    }

    #[test]
    fn parameters_start_above_the_frame_pointer() {
        let tac = emit_src(
            "int id(int x) { return x; } void main() { Print(id(3)); }",
        );
        let param = tac
            .locations()
            .iter()
            .find(|l| l.name == "x")
            .expect("parameter location");
        assert_eq!(param.segment, Segment::Frame);
        assert_eq!(param.offset, OFFSET_TO_FIRST_PARAM);
    }

    #[test]
    fn method_parameters_follow_the_receiver() {
        let tac = emit_src(
            "class A { int add(int x) { return x; } }\
             void main() { A a; a = New(A); Print(a.add(2)); }",
        );
        let this = tac
            .locations()
            .iter()
            .find(|l| l.name == "this")
            .expect("receiver location");
        assert_eq!(this.offset, 4);
        let param = tac
            .locations()
            .iter()
            .find(|l| l.name == "x")
            .expect("parameter location");
        assert_eq!(param.offset, 8);
    }
}
