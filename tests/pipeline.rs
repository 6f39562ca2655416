//! Whole-pipeline scenarios: source text in, TAC/assembly out, including
//! the build and check commands against real files.

use shrew::codegen::{CodegenError, ERR_ARRAY_OUT_OF_BOUNDS, Instr, TacProgram, emit_program};
use shrew::frontend::{Interner, parse_source};
use shrew::sema::{analyze, assign_layout};
use std::fs;

fn lower(src: &str) -> Result<TacProgram, CodegenError> {
    let mut interner = Interner::new();
    let program = parse_source(src, &mut interner).expect("test inputs parse");
    let mut analysis = analyze(&program, &interner);
    assert!(!analysis.has_errors(), "{:?}", analysis.errors);
    assign_layout(&mut analysis, &program, &interner);
    emit_program(&program, &analysis, &interner)
}

#[test]
fn array_length_lowers_to_length_word_load() {
    let tac = lower(
        "void main() { int[] a; a = NewArray(3, int); Print(a.length()); }",
    )
    .unwrap();
    let found = tac.instrs.iter().any(|instr| {
        matches!(instr, Instr::Load { base, offset: -4, .. }
            if tac.location(*base).name == "a")
    });
    assert!(found, "{tac}");
}

#[test]
fn subtype_assignment_lowers_to_plain_assign() {
    let tac = lower(
        "class A {} class B extends A {}\
         void main() { A a; B b; b = New(B); a = b; }",
    )
    .unwrap();
    let found = tac.instrs.iter().any(|instr| {
        matches!(instr, Instr::Assign { dst, src }
            if tac.location(*dst).name == "a" && tac.location(*src).name == "b")
    });
    assert!(found, "{tac}");
}

#[test]
fn out_of_bounds_access_carries_runtime_check() {
    let tac = lower(
        "void main() { int[] a; a = NewArray(3, int); Print(a[5]); }",
    )
    .unwrap();
    let dump = tac.to_string();
    assert!(
        dump.contains(&format!("{ERR_ARRAY_OUT_OF_BOUNDS:?}")),
        "{dump}"
    );
    assert!(dump.contains("LCall _PrintString"), "{dump}");
    assert!(dump.contains("LCall _Halt"), "{dump}");
}

#[test]
fn vtable_lists_methods_in_slot_order() {
    let tac = lower(
        "class Animal { void speak() {} void sleep() {} }\
         class Dog extends Animal { void speak() {} }\
         void main() { Dog d; d = New(Dog); d.speak(); }",
    )
    .unwrap();
    let vtables: Vec<(&str, &[String])> = tac
        .instrs
        .iter()
        .filter_map(|instr| match instr {
            Instr::VTable { class, methods } => Some((class.as_str(), methods.as_slice())),
            _ => None,
        })
        .collect();
    assert_eq!(vtables.len(), 2);
    let (_, dog_methods) = vtables
        .iter()
        .find(|(class, _)| *class == "Dog")
        .expect("Dog vtable");
    assert_eq!(*dog_methods, ["_Dog.speak", "_Animal.sleep"]);
}

#[test]
fn build_command_writes_assembly() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("hello.shrew");
    fs::write(&src_path, "void main() { Print(\"hello\"); }").unwrap();

    let code = shrew::commands::build::run(&src_path, None, false);
    assert_eq!(code, 0);

    let asm = fs::read_to_string(dir.path().join("hello.s")).unwrap();
    assert!(asm.contains(".globl main"), "{asm}");
    assert!(asm.contains("main:"), "{asm}");
    assert!(asm.contains("jal _PrintString"), "{asm}");
    assert!(asm.contains("\"hello\""), "{asm}");
}

#[test]
fn build_command_fails_on_semantic_errors() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("bad.shrew");
    fs::write(&src_path, "void main() { x = 1; }").unwrap();

    let code = shrew::commands::build::run(&src_path, None, false);
    assert_eq!(code, 1);
    assert!(!dir.path().join("bad.s").exists());
}

#[test]
fn check_command_walks_directories() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ok.shrew"), "void main() {}").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(
        dir.path().join("nested").join("also_ok.shrew"),
        "int twice(int n) { return n * 2; } void main() { Print(twice(2)); }",
    )
    .unwrap();

    let code = shrew::commands::check::run(&[dir.path().display().to_string()]);
    assert_eq!(code, 0);

    fs::write(dir.path().join("broken.shrew"), "void main() { break; }").unwrap();
    let code = shrew::commands::check::run(&[dir.path().display().to_string()]);
    assert_eq!(code, 1);
}

#[test]
fn interface_programs_stop_at_codegen_not_before() {
    let src = "interface I { void m(); }\
               class C implements I { void m() {} }\
               void main() { C c; c = New(C); c.m(); }";
    let mut interner = Interner::new();
    let program = parse_source(src, &mut interner).unwrap();
    let mut analysis = analyze(&program, &interner);
    assert!(!analysis.has_errors(), "{:?}", analysis.errors);
    assign_layout(&mut analysis, &program, &interner);
    let err = emit_program(&program, &analysis, &interner).unwrap_err();
    assert!(matches!(err, CodegenError::InterfaceNotSupported { .. }));
}

#[test]
fn double_programs_type_check_but_do_not_lower() {
    let src = "double half(double d) { return d / 2.0; }\
               void main() { double x; x = half(3.0); }";
    let mut interner = Interner::new();
    let program = parse_source(src, &mut interner).unwrap();
    let mut analysis = analyze(&program, &interner);
    assert!(!analysis.has_errors(), "{:?}", analysis.errors);
    assign_layout(&mut analysis, &program, &interner);
    let err = emit_program(&program, &analysis, &interner).unwrap_err();
    assert!(matches!(err, CodegenError::DoubleNotSupported { .. }));
}
