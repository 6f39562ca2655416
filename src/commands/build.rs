//! `shrew build`: run the whole pipeline and write MIPS assembly.

use super::common::{
    Frontend, parse_or_report, read_source, report_codegen_error, report_semantic_errors,
};
use shrew_codegen::{emit_mips, emit_program};
use shrew_sema::{analyze, assign_layout};
use std::fs;
use std::path::Path;
use tracing::info;

pub fn run(file: &Path, output: Option<&Path>, to_stdout: bool) -> i32 {
    let Some(source) = read_source(file) else {
        return 1;
    };
    let Some(Frontend { program, interner }) = parse_or_report(file, &source) else {
        return 1;
    };

    let mut analysis = analyze(&program, &interner);
    if analysis.has_errors() {
        let count = report_semantic_errors(file, &source, &analysis);
        eprintln!("{count} error{} found", if count == 1 { "" } else { "s" });
        return 1;
    }

    assign_layout(&mut analysis, &program, &interner);
    let tac = match emit_program(&program, &analysis, &interner) {
        Ok(tac) => tac,
        Err(err) => {
            report_codegen_error(file, &source, err);
            return 1;
        }
    };
    let assembly = emit_mips(&tac);

    if to_stdout {
        print!("{assembly}");
        return 0;
    }

    let out_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| file.with_extension("s"));
    match fs::write(&out_path, assembly) {
        Ok(()) => {
            info!(path = %out_path.display(), "wrote assembly");
            0
        }
        Err(err) => {
            eprintln!("shrew: cannot write '{}': {}", out_path.display(), err);
            1
        }
    }
}
