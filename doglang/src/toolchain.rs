//! Assembling, linking and running generated programs with the host C
//! compiler. Only x86-64 Linux hosts can run the output.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::CompileError;

/// Defines `print`: writes `%rax` as a decimal line through `printf` and
/// returns 0 so `main` exits cleanly.
pub const RUNTIME: &str = r#"    .section .rodata
.Lprint_format:
    .string "%ld\n"
    .text
    .globl print
print:
    pushq %rbp
    movq %rsp, %rbp
    movq %rax, %rsi
    leaq .Lprint_format(%rip), %rdi
    xorl %eax, %eax
    call printf@PLT
    xorl %eax, %eax
    movq %rbp, %rsp
    popq %rbp
    ret
    .section .note.GNU-stack,"",@progbits
"#;

const COMPILERS: [&str; 3] = ["cc", "gcc", "clang"];

pub fn supported_host() -> bool {
    cfg!(all(target_arch = "x86_64", target_os = "linux"))
}

pub struct Toolchain {
    compiler: PathBuf,
}

impl Toolchain {
    /// Finds the first C compiler driver on `PATH`.
    pub fn detect() -> Result<Self, CompileError> {
        if !supported_host() {
            return Err(CompileError::Toolchain {
                message: "generated code only runs on x86-64 Linux".to_string(),
            });
        }

        COMPILERS
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(|compiler| {
                debug!(compiler = %compiler.display(), "found C compiler");
                Self { compiler }
            })
            .ok_or_else(|| CompileError::Toolchain {
                message: format!("no C compiler found on PATH (tried {})", COMPILERS.join(", ")),
            })
    }

    /// Writes `<output>.s` and `<output>.runtime.s` next to `output` and links
    /// them into the executable `output`.
    pub fn build(&self, assembly: &str, output: &Path) -> Result<(), CompileError> {
        let (program_path, runtime_path) = sources_for(output);
        fs::write(&program_path, assembly)?;
        fs::write(&runtime_path, RUNTIME)?;

        debug!(
            program = %program_path.display(),
            output = %output.display(),
            "assembling and linking"
        );
        let result = Command::new(&self.compiler)
            .arg("-x")
            .arg("assembler")
            .arg(&program_path)
            .arg(&runtime_path)
            .arg("-o")
            .arg(output)
            .output()?;

        if !result.status.success() {
            return Err(CompileError::Toolchain {
                message: format!(
                    "{} failed ({}): {}",
                    self.compiler.display(),
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            });
        }
        Ok(())
    }

    /// Runs a linked program and returns what it printed, trimmed.
    pub fn run(&self, executable: &Path) -> Result<String, CompileError> {
        debug!(executable = %executable.display(), "running program");
        let result = Command::new(executable).output()?;
        if !result.status.success() {
            return Err(CompileError::Toolchain {
                message: format!("{} exited with {}", executable.display(), result.status),
            });
        }
        Ok(String::from_utf8_lossy(&result.stdout).trim().to_string())
    }
}

/// Assembly files `build` writes for the executable at `output`.
pub fn sources_for(output: &Path) -> (PathBuf, PathBuf) {
    (output.with_extension("s"), output.with_extension("runtime.s"))
}

/// Build-and-run in the system temp directory, cleaning up afterwards.
pub fn compile_and_run(assembly: &str, name: &str) -> Result<String, CompileError> {
    let toolchain = Toolchain::detect()?;
    let executable = std::env::temp_dir().join(format!("doglang-{}-{name}", std::process::id()));
    build_and_run(&toolchain, assembly, &executable)
}

/// Removes the assembly files and the executable whether or not the build
/// succeeded.
fn build_and_run(toolchain: &Toolchain, assembly: &str, executable: &Path) -> Result<String, CompileError> {
    let output = toolchain
        .build(assembly, executable)
        .and_then(|()| toolchain.run(executable));

    let (program_path, runtime_path) = sources_for(executable);
    for path in [program_path.as_path(), runtime_path.as_path(), executable] {
        let _ = fs::remove_file(path);
    }
    output
}
