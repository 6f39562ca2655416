//! The semantic analyzer: four passes over the AST sharing one symbol
//! table, decl arena, and error list.
//!
//! Pass order is fixed: `build_symbol_table` creates scopes and registers
//! every declaration; `check_declarations` resolves named types and
//! identifier references; `check_inheritance` validates extends/implements;
//! `check_types` types every expression. Each pass traverses the AST in the
//! same preorder, so scope re-entry lines up with scope creation.

mod check_decl;
mod declare;
mod expr;
mod inherit;
mod stmt;

use crate::decl_table::DeclTable;
use crate::errors::{SemanticError, TypeError};
use crate::symbol_table::SymbolTable;
use crate::types::Type;
use rustc_hash::FxHashMap;
use shrew_frontend::{Interner, NodeId, Program, Span};
use shrew_identity::DeclId;
use tracing::debug;

/// Run all four check passes and bundle the results.
pub fn analyze(program: &Program, interner: &Interner) -> Analysis {
    let mut analyzer = Analyzer::new(interner);

    analyzer.build_symbol_table(program);
    debug!(scopes = analyzer.table.scopes().len(), "symbol table built");

    analyzer.table.reset();
    analyzer.check_declarations(program);
    debug!(errors = analyzer.errors.len(), "declaration check finished");

    analyzer.table.reset();
    analyzer.check_inheritance(program);
    debug!(errors = analyzer.errors.len(), "inheritance check finished");

    analyzer.table.reset();
    analyzer.check_types(program);
    debug!(errors = analyzer.errors.len(), "type check finished");

    analyzer.finish()
}

/// Everything the later stages (layout, codegen, inspection) need from
/// semantic analysis.
pub struct Analysis {
    pub table: SymbolTable,
    pub decls: DeclTable,
    /// Declaration-site identifier NodeId -> the decl it introduced.
    pub decl_of_node: FxHashMap<NodeId, DeclId>,
    /// Use-site identifier NodeId -> the decl it resolved to.
    pub resolutions: FxHashMap<NodeId, DeclId>,
    /// Every expression's resolved type.
    pub expr_types: FxHashMap<NodeId, Type>,
    pub errors: Vec<TypeError>,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Type of an expression; defaults to `error` for nodes the checker
    /// never reached (only possible in ill-formed programs).
    pub fn expr_type(&self, id: NodeId) -> Type {
        self.expr_types.get(&id).cloned().unwrap_or(Type::Error)
    }
}

pub struct Analyzer<'a> {
    interner: &'a Interner,
    pub table: SymbolTable,
    pub decls: DeclTable,
    pub decl_of_node: FxHashMap<NodeId, DeclId>,
    pub resolutions: FxHashMap<NodeId, DeclId>,
    pub expr_types: FxHashMap<NodeId, Type>,
    pub errors: Vec<TypeError>,
    /// Return type of the function being checked; `Type::Error` when the
    /// declared return type failed to resolve.
    current_return: Option<Type>,
    loop_depth: usize,
}

impl<'a> Analyzer<'a> {
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            table: SymbolTable::new(),
            decls: DeclTable::default(),
            decl_of_node: FxHashMap::default(),
            resolutions: FxHashMap::default(),
            expr_types: FxHashMap::default(),
            errors: Vec::new(),
            current_return: None,
            loop_depth: 0,
        }
    }

    pub fn finish(self) -> Analysis {
        Analysis {
            table: self.table,
            decls: self.decls,
            decl_of_node: self.decl_of_node,
            resolutions: self.resolutions,
            expr_types: self.expr_types,
            errors: self.errors,
        }
    }

    pub(crate) fn error(&mut self, error: SemanticError, span: Span) {
        self.errors.push(TypeError::new(error, span));
    }

    pub(crate) fn name(&self, sym: shrew_frontend::Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub(crate) fn type_name(&self, ty: &Type) -> String {
        ty.display(self.interner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrew_frontend::parse_source;

    fn analyze_src(src: &str) -> (Analysis, Interner) {
        let mut interner = Interner::new();
        let program = parse_source(src, &mut interner).expect("parse failure in test input");
        let analysis = analyze(&program, &interner);
        (analysis, interner)
    }

    fn first_code(analysis: &Analysis) -> String {
        analysis.errors.first().map(|e| e.code()).unwrap_or_default()
    }

    #[test]
    fn clean_program_has_no_errors() {
        let (analysis, _) = analyze_src(
            "class Animal { int legs; int count() { return legs; } }\
             class Dog extends Animal { int count() { return legs + 4; } }\
             void main() { Dog d; d = New(Dog); Print(d.count()); }",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn duplicate_class_reports_decl_conflict() {
        let (analysis, _) = analyze_src("class A {} class A {} void main() {}");
        assert_eq!(first_code(&analysis), "E2002");
        assert_eq!(analysis.errors.len(), 1);
        // The error points at the second declaration's name.
        assert_eq!(analysis.errors[0].span.column, 18);
    }

    #[test]
    fn duplicate_local_reports_decl_conflict() {
        let (analysis, _) = analyze_src("void main() { int x; bool x; }");
        assert_eq!(first_code(&analysis), "E2002");
    }

    #[test]
    fn shadowing_in_inner_block_is_fine() {
        let (analysis, _) = analyze_src("void main() { int x; { bool x; x = true; } x = 3; }");
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn override_with_different_signature_is_rejected() {
        let (analysis, _) = analyze_src(
            "class A { int f(int x) { return x; } }\
             class B extends A { bool f(int x) { return true; } }\
             void main() {}",
        );
        assert_eq!(first_code(&analysis), "E2003");
    }

    #[test]
    fn override_with_same_signature_is_fine() {
        let (analysis, _) = analyze_src(
            "class A { int f(int x) { return x; } }\
             class B extends A { int f(int y) { return y + 1; } }\
             void main() {}",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn field_may_not_shadow_inherited_field() {
        let (analysis, _) = analyze_src(
            "class A { int n; } class B extends A { bool n; } void main() {}",
        );
        assert_eq!(first_code(&analysis), "E2002");
    }

    #[test]
    fn missing_interface_method_is_reported() {
        let (analysis, _) = analyze_src(
            "interface I { void m(); } class C implements I {} void main() {}",
        );
        assert_eq!(first_code(&analysis), "E2004");
    }

    #[test]
    fn interface_satisfied_via_inheritance() {
        let (analysis, _) = analyze_src(
            "interface I { void m(); }\
             class Base { void m() {} }\
             class C extends Base implements I {}\
             void main() {}",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn interface_method_with_wrong_signature_is_reported() {
        let (analysis, _) = analyze_src(
            "interface I { void m(int x); }\
             class C implements I { void m(bool b) {} }\
             void main() {}",
        );
        // The member check reports the mismatch, then the conformance walk
        // reports the unimplemented interface.
        assert!(
            analysis.errors.iter().any(|e| e.code() == "E2003"),
            "{:?}",
            analysis.errors
        );
        assert!(analysis.errors.iter().any(|e| e.code() == "E2004"));
    }

    #[test]
    fn cyclic_extends_is_detected() {
        let (analysis, _) = analyze_src("class A extends A {} void main() {}");
        assert!(
            analysis.errors.iter().any(|e| e.code() == "E2019"),
            "{:?}",
            analysis.errors
        );
    }

    #[test]
    fn mutual_extends_cycle_is_detected_at_both_classes() {
        let (analysis, _) = analyze_src(
            "class A extends B {} class B extends A {} void main() {}",
        );
        let cycles = analysis.errors.iter().filter(|e| e.code() == "E2019").count();
        assert_eq!(cycles, 2, "{:?}", analysis.errors);
    }

    #[test]
    fn undeclared_identifier_reports_variable_lookup() {
        let (analysis, _) = analyze_src("void main() { x = 3; }");
        assert_eq!(first_code(&analysis), "E2001");
    }

    #[test]
    fn subtype_assignment_is_accepted_and_reverse_rejected() {
        let (analysis, _) = analyze_src(
            "class A {} class B extends A {}\
             void main() { A a; B b; b = New(B); a = b; }",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);

        let (analysis, _) = analyze_src(
            "class A {} class B extends A {}\
             void main() { A a; B b; a = New(A); b = a; }",
        );
        assert_eq!(first_code(&analysis), "E2006");
    }

    #[test]
    fn interface_typed_slot_accepts_implementing_class() {
        let (analysis, _) = analyze_src(
            "interface I { void m(); }\
             class C implements I { void m() {} }\
             void main() { I i; i = New(C); }",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn null_assigns_to_class_and_array_but_not_int() {
        let (analysis, _) = analyze_src(
            "class A {} void main() { A a; int[] xs; a = null; xs = null; }",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);

        let (analysis, _) = analyze_src("void main() { int x; x = null; }");
        assert_eq!(first_code(&analysis), "E2006");
    }

    #[test]
    fn arithmetic_and_relational_typing() {
        let (analysis, _) = analyze_src(
            "void main() { int x; double d; bool b; x = 1 + 2 * 3; d = 1.5 / 0.5; b = x < 3; }",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);

        let (analysis, _) = analyze_src("void main() { int x; x = 1 + true; }");
        assert_eq!(first_code(&analysis), "E2006");

        let (analysis, _) = analyze_src("void main() { bool b; b = 1 < 2.0; }");
        assert_eq!(first_code(&analysis), "E2006");
    }

    #[test]
    fn modulo_on_doubles_is_rejected() {
        let (analysis, _) = analyze_src("void main() { double d; d = 4.0 % 2.0; }");
        assert_eq!(first_code(&analysis), "E2006");
    }

    #[test]
    fn one_bad_operand_yields_one_error() {
        let (analysis, _) = analyze_src("void main() { int x; x = (1 + true) * 4 - 2; }");
        assert_eq!(analysis.errors.len(), 1, "{:?}", analysis.errors);
    }

    #[test]
    fn test_expressions_must_be_boolean() {
        let (analysis, _) = analyze_src("void main() { if (3) Print(1); }");
        assert_eq!(first_code(&analysis), "E2007");

        let (analysis, _) = analyze_src("void main() { while (1) Print(1); }");
        assert_eq!(first_code(&analysis), "E2007");
    }

    #[test]
    fn break_outside_loop_is_reported() {
        let (analysis, _) = analyze_src("void main() { break; }");
        assert_eq!(first_code(&analysis), "E2008");

        let (analysis, _) = analyze_src(
            "void main() { while (true) { if (true) break; } }",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn return_type_must_be_compatible() {
        let (analysis, _) = analyze_src("int f() { return true; } void main() {}");
        assert_eq!(first_code(&analysis), "E2009");

        let (analysis, _) = analyze_src("int f() { return; } void main() {}");
        assert_eq!(first_code(&analysis), "E2009");

        let (analysis, _) = analyze_src(
            "class A {} class B extends A {} A f() { return New(B); } void main() {}",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn call_checking_covers_arity_and_types() {
        let (analysis, _) = analyze_src(
            "int add(int a, int b) { return a + b; } void main() { Print(add(1)); }",
        );
        assert_eq!(first_code(&analysis), "E2010");

        let (analysis, _) = analyze_src(
            "int add(int a, int b) { return a + b; } void main() { Print(add(1, true)); }",
        );
        assert_eq!(first_code(&analysis), "E2011");
    }

    #[test]
    fn array_operations_are_typed() {
        let (analysis, _) = analyze_src(
            "void main() { int[] a; a = NewArray(4, int); a[0] = 1; Print(a.length()); }",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);

        let (analysis, _) = analyze_src("void main() { int[] a; a[true] = 1; }");
        assert_eq!(first_code(&analysis), "E2012");

        let (analysis, _) = analyze_src("void main() { int x; x[0] = 1; }");
        assert_eq!(first_code(&analysis), "E2013");

        let (analysis, _) = analyze_src("void main() { int[] a; a = NewArray(true, int); }");
        assert_eq!(first_code(&analysis), "E2014");
    }

    #[test]
    fn print_rejects_unprintable_arguments() {
        let (analysis, _) = analyze_src("class A {} void main() { A a; Print(a); }");
        assert_eq!(first_code(&analysis), "E2015");

        let (analysis, _) = analyze_src("void main() { Print(1, true, \"ok\"); }");
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn field_access_respects_class_scope() {
        let (analysis, _) = analyze_src(
            "class A { int n; int get() { return this.n; } } void main() {}",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);

        // From outside any class, instance fields are inaccessible.
        let (analysis, _) = analyze_src(
            "class A { int n; } void main() { A a; a = New(A); Print(a.n); }",
        );
        assert_eq!(first_code(&analysis), "E2017");

        let (analysis, _) = analyze_src(
            "class A { int n; } void main() { A a; a = New(A); Print(a.m); }",
        );
        assert_eq!(first_code(&analysis), "E2016");
    }

    #[test]
    fn field_of_unrelated_class_is_inaccessible() {
        let (analysis, _) = analyze_src(
            "class A { int x; }\
             class B { void m() { A a; a = New(A); a.x = 5; } }\
             void main() {}",
        );
        assert_eq!(first_code(&analysis), "E2017");
        assert_eq!(analysis.errors.len(), 1, "{:?}", analysis.errors);
    }

    #[test]
    fn base_fields_are_accessible_through_related_types() {
        let (analysis, _) = analyze_src(
            "class A { int x; }\
             class B extends A { int read(A other) { return other.x; } }\
             void main() {}",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn methods_are_callable_from_anywhere() {
        let (analysis, _) = analyze_src(
            "class A { int n; int get() { return n; } }\
             void main() { A a; a = New(A); Print(a.get()); }",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn this_outside_class_is_reported() {
        let (analysis, _) = analyze_src("void main() { Print(this); }");
        assert_eq!(first_code(&analysis), "E2018");
    }

    #[test]
    fn main_signature_is_validated() {
        let (analysis, _) = analyze_src("int main() { return 0; }");
        assert_eq!(first_code(&analysis), "E2090");

        let (analysis, _) = analyze_src("void main(int argc) {}");
        assert_eq!(first_code(&analysis), "E2010");
    }

    #[test]
    fn forward_references_between_classes_resolve() {
        let (analysis, _) = analyze_src(
            "class A { B partner; B make() { return New(B); } }\
             class B { int n; }\
             void main() {}",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }

    #[test]
    fn local_initializer_checks_compatibility() {
        let (analysis, _) = analyze_src("void main() { int x = 3; }");
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);

        let (analysis, _) = analyze_src("void main() { int x = true; }");
        assert_eq!(first_code(&analysis), "E2006");
    }

    #[test]
    fn string_equality_is_allowed() {
        let (analysis, _) = analyze_src(
            "void main() { string s; s = ReadLine(); Print(s == \"done\"); }",
        );
        assert!(analysis.errors.is_empty(), "{:?}", analysis.errors);
    }
}
