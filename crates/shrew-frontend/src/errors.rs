//! Lexer (E0xxx) and parser (E1xxx) errors.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    #[diagnostic(code(E0001))]
    UnexpectedCharacter {
        ch: char,
        #[label("not valid here")]
        span: SourceSpan,
    },

    #[error("unterminated string constant")]
    #[diagnostic(code(E0002), help("string constants must close on the same line"))]
    UnterminatedString {
        #[label("string starts here")]
        span: SourceSpan,
    },

    #[error("unterminated comment")]
    #[diagnostic(code(E0003))]
    UnterminatedComment {
        #[label("comment starts here")]
        span: SourceSpan,
    },

    #[error("invalid numeric literal '{text}'")]
    #[diagnostic(code(E0004))]
    InvalidNumber {
        text: String,
        #[label("cannot be parsed")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParseError {
    #[error("expected {expected}, found '{found}'")]
    #[diagnostic(code(E1001))]
    ExpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token")]
        span: SourceSpan,
    },

    #[error("expected a type, found '{found}'")]
    #[diagnostic(code(E1002))]
    ExpectedType {
        found: String,
        #[label("not a type")]
        span: SourceSpan,
    },

    #[error("expected an expression, found '{found}'")]
    #[diagnostic(code(E1003))]
    ExpectedExpression {
        found: String,
        #[label("not an expression")]
        span: SourceSpan,
    },

    #[error("expected a declaration, found '{found}'")]
    #[diagnostic(code(E1004))]
    ExpectedDeclaration {
        found: String,
        #[label("not a declaration")]
        span: SourceSpan,
    },

    #[error("'void' is only valid as a function return type")]
    #[diagnostic(code(E1005))]
    VoidNotAllowed {
        #[label("variable cannot have type void")]
        span: SourceSpan,
    },

    #[error("initializers are only allowed on local variables")]
    #[diagnostic(code(E1006))]
    InitializerNotAllowed {
        #[label("remove the initializer")]
        span: SourceSpan,
    },

    #[error("invalid assignment target")]
    #[diagnostic(code(E1007))]
    InvalidAssignTarget {
        #[label("cannot assign to this expression")]
        span: SourceSpan,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),
}
