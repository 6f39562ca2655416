//! `shrew inspect`: print the AST, the symbol table, or the TAC stream.

use super::common::{
    Frontend, parse_or_report, read_source, report_codegen_error, report_semantic_errors,
};
use crate::cli::InspectType;
use shrew_codegen::emit_program;
use shrew_frontend::AstPrinter;
use shrew_sema::{analyze, assign_layout, symbol_table_dump};
use std::path::Path;

pub fn run(inspect_type: InspectType, file: &Path) -> i32 {
    let Some(source) = read_source(file) else {
        return 1;
    };
    let Some(Frontend { program, interner }) = parse_or_report(file, &source) else {
        return 1;
    };

    match inspect_type {
        InspectType::Ast => {
            print!("{}", AstPrinter::new(&interner).print(&program));
            0
        }
        InspectType::Symbols => {
            let analysis = analyze(&program, &interner);
            report_semantic_errors(file, &source, &analysis);
            print!("{}", symbol_table_dump(&analysis, &interner));
            i32::from(analysis.has_errors())
        }
        InspectType::Tac => {
            let mut analysis = analyze(&program, &interner);
            if analysis.has_errors() {
                report_semantic_errors(file, &source, &analysis);
                return 1;
            }
            assign_layout(&mut analysis, &program, &interner);
            match emit_program(&program, &analysis, &interner) {
                Ok(tac) => {
                    print!("{tac}");
                    0
                }
                Err(err) => {
                    report_codegen_error(file, &source, err);
                    1
                }
            }
        }
    }
}
