//! Shrew semantic analysis: scoped symbol table, the four check passes,
//! and the class-layout pass.

pub mod analyzer;
pub mod decl_table;
pub mod errors;
pub mod layout;
pub mod symbol_table;
pub mod types;

pub use analyzer::{Analysis, Analyzer, analyze};
pub use decl_table::{ClassInfo, DeclInfo, DeclTable, FnInfo, InterfaceInfo, VarInfo};
pub use errors::{LookingFor, SemanticError, TypeError};
pub use layout::{WORD_SIZE, assign_layout};
pub use symbol_table::{Scope, SymbolTable};
pub use types::Type;

use shrew_frontend::Interner;
use std::fmt::Write;

/// Render every scope with its owner/parent/interface metadata and entries,
/// for the `inspect symbols` view.
pub fn symbol_table_dump(analysis: &Analysis, interner: &Interner) -> String {
    let mut out = String::new();
    out.push_str("======== Symbol Table ========\n");
    for (index, scope) in analysis.table.scopes().iter().enumerate() {
        let mut header = format!("|- Scope {index}:");
        if let Some(owner) = scope.owner() {
            let _ = write!(header, " (owner: {})", interner.resolve(owner));
        }
        if let Some(parent) = scope.parent_owner() {
            let _ = write!(header, " (parent: {})", interner.resolve(parent));
        }
        if !scope.interfaces().is_empty() {
            let names: Vec<&str> = scope
                .interfaces()
                .iter()
                .map(|sym| interner.resolve(*sym))
                .collect();
            let _ = write!(header, " (implements: {})", names.join(", "));
        }
        out.push_str(&header);
        out.push('\n');

        let mut entries: Vec<(String, &'static str)> = scope
            .entries()
            .map(|(sym, id)| {
                let kind = match analysis.decls.get(id) {
                    DeclInfo::Var(_) => "variable",
                    DeclInfo::Fn(_) => "function",
                    DeclInfo::Class(_) => "class",
                    DeclInfo::Interface(_) => "interface",
                };
                (interner.resolve(sym).to_string(), kind)
            })
            .collect();
        entries.sort();
        for (name, kind) in entries {
            let _ = writeln!(out, "|  + {name} ({kind})");
        }
    }
    out.push_str("======== Symbol Table ========\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrew_frontend::parse_source;

    #[test]
    fn dump_lists_owners_and_entries() {
        let mut interner = Interner::new();
        let program = parse_source(
            "interface Show { void show(); }\
             class Base { int n; }\
             class Derived extends Base implements Show { void show() {} }\
             void main() {}",
            &mut interner,
        )
        .unwrap();
        let analysis = analyze(&program, &interner);
        assert!(!analysis.has_errors());

        let dump = symbol_table_dump(&analysis, &interner);
        assert!(dump.contains("(owner: Base)"));
        assert!(dump.contains("(parent: Base)"));
        assert!(dump.contains("(implements: Show)"));
        assert!(dump.contains("+ main (function)"));
        assert!(dump.contains("+ n (variable)"));
    }
}
