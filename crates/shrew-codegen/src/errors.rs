//! Code-generation errors (E3xxx).
//!
//! Unlike semantic errors these are fatal: the emitter stops at the first
//! construct it cannot lower.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CodegenError {
    #[error("type 'double' is not supported at code generation")]
    #[diagnostic(code(E3001))]
    DoubleNotSupported {
        #[label("requires double support")]
        span: SourceSpan,
    },

    #[error("interfaces are not supported at code generation")]
    #[diagnostic(code(E3002))]
    InterfaceNotSupported {
        #[label("interface declared here")]
        span: SourceSpan,
    },

    #[error("no entry point: a 'main' function is required")]
    #[diagnostic(code(E3003), help("declare 'void main() {{ ... }}' at the top level"))]
    NoMainFound,
}
