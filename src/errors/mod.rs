//! Diagnostic rendering for the Shrew compiler.

pub mod report;

pub use report::{render_to_stderr, render_to_string, set_color_mode};
