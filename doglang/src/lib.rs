//! doglang: a whitespace-separated toy language with two backends.
//!
//! `parser` turns source text into an `ir::ast::Program`; `backends` either
//! lowers it to x86-64 assembly or interprets it directly; `toolchain` links
//! the assembly with the host C compiler when the program should actually run.

pub mod backends;
pub mod error;
pub mod ir;
pub mod parser;
pub mod span;
pub mod toolchain;

pub use backends::interpreter::{Interpreter, Value};
pub use backends::x86_64::CodeGenerator;
pub use backends::{Backend, BackendType};
pub use error::CompileError;

/// Source text to a complete assembly listing.
pub fn generate_assembly(source: &str) -> Result<String, CompileError> {
    let program = parser::parse(source)?;
    CodeGenerator::new().compile(&program)
}

/// Source text to the value of its last top-level statement.
pub fn interpret(source: &str) -> Result<Value, CompileError> {
    let program = parser::parse(source)?;
    Ok(Interpreter::new().run(&program))
}
