use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Syntax error at line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("Scratch registers exhausted: expression needs more than {pool} spilled operands")]
    RegistersExhausted { pool: usize },

    #[error("Unknown backend: {name}")]
    UnknownBackend { name: String },

    #[error("Toolchain error: {message}")]
    Toolchain { message: String },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::SyntaxError {
            line,
            message: message.into(),
        }
    }
}
