//! Shared helpers for the command implementations.

use crate::errors::report::render_to_stderr;
use miette::NamedSource;
use shrew_codegen::CodegenError;
use shrew_frontend::{Interner, ParseError, Program, parse_source};
use shrew_sema::Analysis;
use std::fs;
use std::path::Path;

pub struct Frontend {
    pub program: Program,
    pub interner: Interner,
}

pub fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(err) => {
            eprintln!("shrew: cannot read '{}': {}", path.display(), err);
            None
        }
    }
}

/// Lex and parse; renders the diagnostic and returns `None` on failure.
pub fn parse_or_report(path: &Path, source: &str) -> Option<Frontend> {
    let mut interner = Interner::new();
    match parse_source(source, &mut interner) {
        Ok(program) => Some(Frontend { program, interner }),
        Err(err) => {
            report_parse_error(path, source, err);
            None
        }
    }
}

fn named_source(path: &Path, source: &str) -> NamedSource<String> {
    NamedSource::new(path.display().to_string(), source.to_string())
}

pub fn report_parse_error(path: &Path, source: &str, err: ParseError) {
    let report = miette::Report::new(err).with_source_code(named_source(path, source));
    render_to_stderr(report.as_ref());
}

/// Render every accumulated semantic error; returns how many there were.
pub fn report_semantic_errors(path: &Path, source: &str, analysis: &Analysis) -> usize {
    for error in &analysis.errors {
        let report =
            miette::Report::new(error.error.clone()).with_source_code(named_source(path, source));
        render_to_stderr(report.as_ref());
    }
    analysis.errors.len()
}

pub fn report_codegen_error(path: &Path, source: &str, err: CodegenError) {
    let report = miette::Report::new(err).with_source_code(named_source(path, source));
    render_to_stderr(report.as_ref());
}
