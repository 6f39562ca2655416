//! Shrew compiler driver: CLI, commands, and diagnostic rendering.

pub mod cli;
pub mod commands;
pub mod errors;

pub use shrew_codegen as codegen;
pub use shrew_frontend as frontend;
pub use shrew_identity as identity;
pub use shrew_sema as sema;
