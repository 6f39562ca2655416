//! Layout pass: instance sizes, field offsets, vtable ordering, and emit
//! labels. Runs only on programs that passed all checks.
//!
//! Instance layout: the vtable pointer sits at offset 0 and fields pack
//! upward from 4, inherited fields first, so a derived instance is a valid
//! base instance prefix. A method overriding an inherited method takes over
//! the inherited vtable slot; new methods append.

use crate::analyzer::Analysis;
use rustc_hash::FxHashMap;
use shrew_frontend::{ClassDecl, Decl, Interner, Program, Symbol};
use shrew_identity::DeclId;
use tracing::debug;

/// Word size of the target, in bytes.
pub const WORD_SIZE: i32 = 4;

pub fn assign_layout(analysis: &mut Analysis, program: &Program, interner: &Interner) {
    let mut next_global = 0;
    for decl in &program.decls {
        match decl {
            Decl::Var(var) => {
                if let Some(&id) = analysis.decl_of_node.get(&var.name.id)
                    && let Some(info) = analysis.decls.var_mut(id)
                {
                    info.global_offset = Some(next_global);
                    next_global += WORD_SIZE;
                }
            }
            Decl::Fn(func) => {
                let name = interner.resolve(func.name.sym);
                let label = if name == "main" {
                    name.to_string()
                } else {
                    format!("_{name}")
                };
                if let Some(&id) = analysis.decl_of_node.get(&func.name.id)
                    && let Some(info) = analysis.decls.function_mut(id)
                {
                    info.label = Some(label);
                }
            }
            Decl::Class(class) => layout_class(analysis, class, interner),
            Decl::Interface(_) => {}
        }
    }
}

fn layout_class(analysis: &mut Analysis, class: &ClassDecl, interner: &Interner) {
    let Some(&class_id) = analysis.decl_of_node.get(&class.name.id) else {
        return;
    };

    // Root-to-leaf inheritance chain, so inherited members come first.
    let mut chain = vec![class_id];
    let mut cursor = analysis.decls.class(class_id).and_then(|c| c.extends);
    while let Some(parent) = cursor {
        let Some(parent_id) = analysis.decls.type_by_name(parent) else {
            break;
        };
        if chain.contains(&parent_id) {
            break;
        }
        let Some(parent_info) = analysis.decls.class(parent_id) else {
            break;
        };
        cursor = parent_info.extends;
        chain.push(parent_id);
    }

    let mut var_members: Vec<DeclId> = Vec::new();
    let mut fn_members: Vec<DeclId> = Vec::new();
    let mut slot_of: FxHashMap<Symbol, usize> = FxHashMap::default();
    for &link in chain.iter().rev() {
        let members = analysis
            .decls
            .class(link)
            .map(|c| c.members.clone())
            .unwrap_or_default();
        for member in members {
            if analysis.decls.is_var(member) {
                var_members.push(member);
            } else if analysis.decls.is_fn(member) {
                let name = analysis.decls.name(member);
                match slot_of.get(&name) {
                    // An override takes over the inherited slot.
                    Some(&slot) => fn_members[slot] = member,
                    None => {
                        slot_of.insert(name, fn_members.len());
                        fn_members.push(member);
                    }
                }
            }
        }
    }

    let inst_size = WORD_SIZE + WORD_SIZE * var_members.len() as i32;
    let vtable_size = WORD_SIZE * fn_members.len() as i32;
    debug!(
        class = interner.resolve(class.name.sym),
        inst_size,
        vtable_size,
        "class layout"
    );

    for (index, &field) in var_members.iter().enumerate() {
        if let Some(info) = analysis.decls.var_mut(field) {
            info.field_offset = Some(WORD_SIZE + WORD_SIZE * index as i32);
        }
    }
    for (slot, &method) in fn_members.iter().enumerate() {
        if let Some(info) = analysis.decls.function_mut(method) {
            info.vtable_slot = Some(slot);
        }
    }

    // Labels only for methods this class declares; inherited entries keep
    // the defining class's label.
    let class_name = interner.resolve(class.name.sym).to_string();
    let own_members = analysis
        .decls
        .class(class_id)
        .map(|c| c.members.clone())
        .unwrap_or_default();
    for member in own_members {
        if analysis.decls.is_fn(member) {
            let method_name = interner.resolve(analysis.decls.name(member)).to_string();
            if let Some(info) = analysis.decls.function_mut(member) {
                info.label = Some(format!("_{class_name}.{method_name}"));
            }
        }
    }

    if let Some(info) = analysis.decls.class_mut(class_id) {
        info.var_members = var_members;
        info.fn_members = fn_members;
        info.inst_size = inst_size;
        info.vtable_size = vtable_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{Analysis, analyze};
    use shrew_frontend::parse_source;
    use shrew_identity::DeclId;

    fn layout_of(src: &str) -> (Analysis, Interner) {
        let mut interner = Interner::new();
        let program = parse_source(src, &mut interner).unwrap();
        let mut analysis = analyze(&program, &interner);
        assert!(!analysis.has_errors(), "{:?}", analysis.errors);
        assign_layout(&mut analysis, &program, &interner);
        (analysis, interner)
    }

    fn class_named<'a>(
        analysis: &'a Analysis,
        interner: &Interner,
        name: &str,
    ) -> &'a crate::decl_table::ClassInfo {
        let sym = interner.get(name).unwrap();
        let id = analysis.decls.type_by_name(sym).unwrap();
        analysis.decls.class(id).unwrap()
    }

    fn labels(analysis: &Analysis, members: &[DeclId]) -> Vec<String> {
        members
            .iter()
            .map(|id| {
                analysis
                    .decls
                    .function(*id)
                    .and_then(|f| f.label.clone())
                    .unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn instance_size_counts_vtable_pointer_plus_fields() {
        let (analysis, interner) = layout_of(
            "class Base { int a; int b; } class Kid extends Base { int c; } void main() {}",
        );
        let base = class_named(&analysis, &interner, "Base");
        assert_eq!(base.inst_size, 12);
        let kid = class_named(&analysis, &interner, "Kid");
        assert_eq!(kid.inst_size, 16);
        assert_eq!(kid.var_members.len(), 3);

        // Inherited fields first, packed from offset 4.
        let offsets: Vec<i32> = kid
            .var_members
            .iter()
            .map(|id| analysis.decls.var(*id).unwrap().field_offset.unwrap())
            .collect();
        assert_eq!(offsets, vec![4, 8, 12]);
    }

    #[test]
    fn override_keeps_inherited_vtable_slot() {
        let (analysis, interner) = layout_of(
            "class Base { int first() { return 1; } int second() { return 2; } }\
             class Kid extends Base { int second() { return 20; } int third() { return 3; } }\
             void main() {}",
        );
        let kid = class_named(&analysis, &interner, "Kid");
        assert_eq!(kid.vtable_size, 12);
        assert_eq!(
            labels(&analysis, &kid.fn_members),
            vec!["_Base.first", "_Kid.second", "_Kid.third"]
        );

        let slots: Vec<usize> = kid
            .fn_members
            .iter()
            .map(|id| analysis.decls.function(*id).unwrap().vtable_slot.unwrap())
            .collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn vtable_has_no_duplicate_names(){
        let (analysis, interner) = layout_of(
            "class A { void f() {} void g() {} }\
             class B extends A { void f() {} }\
             class C extends B { void g() {} void h() {} }\
             void main() {}",
        );
        let c = class_named(&analysis, &interner, "C");
        let mut names: Vec<_> = c
            .fn_members
            .iter()
            .map(|id| analysis.decls.name(*id))
            .collect();
        let total = names.len();
        names.sort_by_key(|s| s.0);
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(total, 3);
    }

    #[test]
    fn globals_get_consecutive_offsets() {
        let (analysis, interner) = layout_of("int g; bool h; void main() {}");
        let offset = |name: &str| {
            let sym = interner.get(name).unwrap();
            let id = analysis.table.lookup(sym).unwrap();
            analysis.decls.var(id).unwrap().global_offset.unwrap()
        };
        assert_eq!(offset("g"), 0);
        assert_eq!(offset("h"), 4);
    }

    #[test]
    fn free_functions_are_prefixed_except_main() {
        let (analysis, interner) = layout_of("void helper() {} void main() { helper(); }");
        let label = |name: &str| {
            let sym = interner.get(name).unwrap();
            let id = analysis.table.lookup(sym).unwrap();
            analysis.decls.function(id).unwrap().label.clone().unwrap()
        };
        assert_eq!(label("helper"), "_helper");
        assert_eq!(label("main"), "main");
    }
}
