use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Color output mode
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect based on terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Shrew programming language compiler
#[derive(Parser)]
#[command(name = "shrew")]
#[command(version = "0.1.0")]
#[command(about = "Shrew programming language compiler", long_about = None)]
pub struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a Shrew source file to MIPS assembly
    Build {
        /// Path to the .shrew file to compile
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path; defaults to the input with a .s extension
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the assembly to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
    },
    /// Check Shrew source files for errors without generating code
    Check {
        /// Paths to check (files, directories, or glob patterns)
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<String>,
    },
    /// Inspect compilation output (AST, symbol table, TAC)
    Inspect {
        /// What to inspect: ast, symbols, tac
        #[arg(value_name = "TYPE")]
        inspect_type: InspectType,

        /// Path to the .shrew file to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Clone, Debug, ValueEnum)]
pub enum InspectType {
    Ast,
    Symbols,
    Tac,
}
