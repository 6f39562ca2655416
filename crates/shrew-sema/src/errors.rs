//! Semantic analysis errors (E2xxx).

use miette::{Diagnostic, SourceSpan};
use shrew_frontend::Span;
use thiserror::Error;

/// What kind of declaration a failed identifier lookup was hoping to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookingFor {
    Variable,
    Function,
    Class,
    Interface,
    Type,
}

impl std::fmt::Display for LookingFor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            LookingFor::Variable => "variable",
            LookingFor::Function => "function",
            LookingFor::Class => "class",
            LookingFor::Interface => "interface",
            LookingFor::Type => "type",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("no declaration found for {reason} '{name}'")]
    #[diagnostic(code(E2001))]
    IdentifierNotDeclared {
        name: String,
        reason: LookingFor,
        #[label("not declared")]
        span: SourceSpan,
    },

    #[error("declaration of '{name}' here conflicts with an earlier declaration")]
    #[diagnostic(code(E2002))]
    DeclConflict {
        name: String,
        #[label("redeclared here")]
        span: SourceSpan,
        #[label("first declared here")]
        previous: SourceSpan,
    },

    #[error("method '{name}' must match inherited type signature")]
    #[diagnostic(code(E2003))]
    OverrideMismatch {
        name: String,
        #[label("signature differs from the inherited method")]
        span: SourceSpan,
    },

    #[error("class '{class_name}' does not implement entire interface '{interface_name}'")]
    #[diagnostic(code(E2004))]
    InterfaceNotImplemented {
        class_name: String,
        interface_name: String,
        #[label("missing or mismatched interface method")]
        span: SourceSpan,
    },

    #[error("incompatible operand: {op} {operand_type}")]
    #[diagnostic(code(E2005))]
    IncompatibleOperand {
        op: &'static str,
        operand_type: String,
        #[label("operand has the wrong type")]
        span: SourceSpan,
    },

    #[error("incompatible operands: {lhs_type} {op} {rhs_type}")]
    #[diagnostic(code(E2006))]
    IncompatibleOperands {
        op: &'static str,
        lhs_type: String,
        rhs_type: String,
        #[label("operand types do not agree")]
        span: SourceSpan,
    },

    #[error("test expression must have boolean type")]
    #[diagnostic(code(E2007))]
    TestNotBoolean {
        #[label("expected bool")]
        span: SourceSpan,
    },

    #[error("break is only allowed inside a loop")]
    #[diagnostic(code(E2008))]
    BreakOutsideLoop {
        #[label("not inside a loop")]
        span: SourceSpan,
    },

    #[error("incompatible return: {given} given, {expected} expected")]
    #[diagnostic(code(E2009))]
    ReturnMismatch {
        given: String,
        expected: String,
        #[label("return value has the wrong type")]
        span: SourceSpan,
    },

    #[error("function '{name}' expects {expected} argument(s) but {given} given")]
    #[diagnostic(code(E2010))]
    NumArgsMismatch {
        name: String,
        expected: usize,
        given: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("incompatible argument {position}: {given} given, {expected} expected")]
    #[diagnostic(code(E2011))]
    ArgMismatch {
        position: usize,
        given: String,
        expected: String,
        #[label("argument has the wrong type")]
        span: SourceSpan,
    },

    #[error("array subscript must be an integer")]
    #[diagnostic(code(E2012))]
    SubscriptNotInteger {
        #[label("expected int")]
        span: SourceSpan,
    },

    #[error("[] can only be applied to arrays")]
    #[diagnostic(code(E2013))]
    BracketsOnNonArray {
        #[label("not an array")]
        span: SourceSpan,
    },

    #[error("size for NewArray must be an integer")]
    #[diagnostic(code(E2014))]
    NewArraySizeNotInteger {
        #[label("expected int")]
        span: SourceSpan,
    },

    #[error("incompatible argument {position}: {given} given, int/bool/string expected")]
    #[diagnostic(code(E2015))]
    PrintArgMismatch {
        position: usize,
        given: String,
        #[label("cannot be printed")]
        span: SourceSpan,
    },

    #[error("{base} has no such field '{field}'")]
    #[diagnostic(code(E2016))]
    FieldNotFoundInBase {
        field: String,
        base: String,
        #[label("field not found")]
        span: SourceSpan,
    },

    #[error("{base} field '{field}' only accessible within class scope")]
    #[diagnostic(code(E2017))]
    InaccessibleField {
        field: String,
        base: String,
        #[label("not accessible here")]
        span: SourceSpan,
    },

    #[error("'this' is only valid within class scope")]
    #[diagnostic(code(E2018))]
    ThisOutsideClassScope {
        #[label("no enclosing class")]
        span: SourceSpan,
    },

    #[error("class '{name}' inherits from itself")]
    #[diagnostic(code(E2019))]
    CyclicInheritance {
        name: String,
        #[label("inheritance cycle passes through this class")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(code(E2090))]
    Formatted {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },
}

/// A located semantic error; `span` duplicates the primary label so that
/// errors can be ordered by source position without digging into variants.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub error: SemanticError,
    pub span: Span,
}

impl TypeError {
    pub fn new(error: SemanticError, span: Span) -> Self {
        Self { error, span }
    }

    /// The diagnostic code, e.g. `E2006`.
    pub fn code(&self) -> String {
        use miette::Diagnostic;
        self.error
            .code()
            .map(|c| c.to_string())
            .unwrap_or_default()
    }
}
