pub mod interpreter;
pub mod x86_64;

use crate::error::CompileError;
use crate::ir::ast;

/// Turns a parsed program into this backend's textual output: an assembly
/// listing, or the value the program computes.
pub trait Backend {
    fn compile(&mut self, program: &ast::Program) -> Result<String, CompileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    X86_64,
    Interpreter,
}

impl BackendType {
    pub fn all() -> Vec<Self> {
        vec![Self::X86_64, Self::Interpreter]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Interpreter => "interp",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86-64 AT&T assembly, links against a `print` routine",
            Self::Interpreter => "tree-walking interpreter, prints the final value",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CompileError> {
        Self::all()
            .into_iter()
            .find(|backend| backend.name() == name)
            .ok_or_else(|| CompileError::UnknownBackend {
                name: name.to_string(),
            })
    }

    pub fn create(&self) -> Box<dyn Backend> {
        match self {
            Self::X86_64 => Box::new(x86_64::CodeGenerator::new()),
            Self::Interpreter => Box::new(interpreter::Interpreter::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_backends_by_name() {
        assert_eq!(BackendType::from_name("x86_64").unwrap(), BackendType::X86_64);
        assert_eq!(BackendType::from_name("interp").unwrap(), BackendType::Interpreter);
        assert!(matches!(
            BackendType::from_name("arm64"),
            Err(CompileError::UnknownBackend { .. })
        ));
    }

    #[test]
    fn both_backends_agree_through_the_trait() {
        let program = crate::parser::parse("x AWOO 2 ARF 3 x").unwrap();
        let value = BackendType::Interpreter.create().compile(&program).unwrap();
        assert_eq!(value, "6");
        let listing = BackendType::X86_64.create().compile(&program).unwrap();
        assert!(listing.contains("imulq"));
        assert!(listing.ends_with("ret\n"));
    }
}
