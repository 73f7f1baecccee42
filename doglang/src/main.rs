use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{Level, info};

use doglang::backends::BackendType;
use doglang::parser;
use doglang::toolchain::{self, Toolchain};
use doglang::{CodeGenerator, Interpreter};

#[derive(Parser)]
#[command(name = "doglang")]
#[command(about = "Compiler and interpreter for doglang", version)]
struct Cli {
    /// Подробнее логи: -v, -vv, -vvv
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Прогоняет программу через выбранный backend
    Compile {
        /// Исходник (`-` для stdin)
        input: String,

        /// Нужный backend
        #[arg(short, long, default_value = "x86_64")]
        target: String,

        /// Куда записать результат (по умолчанию stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Показать ast
        #[arg(long)]
        show_ast: bool,
    },

    /// Интерпретирует программу и печатает результат
    Interpret {
        /// Исходник (`-` для stdin)
        input: String,
    },

    /// Распарсить и показать токены и ast
    Parse {
        /// Исходник (`-` для stdin)
        input: String,
    },

    /// Компилирует, линкует через cc и запускает
    Run {
        /// Исходник (`-` для stdin)
        input: String,

        /// Оставить исполняемый файл (и .s рядом) по этому пути
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Сравнивает результат интерпретатора и скомпилированной программы
    Check {
        /// Исходник (`-` для stdin)
        input: String,
    },

    /// Список backend'ов
    Backends,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile { input, target, output, show_ast } => {
            let backend_type = BackendType::from_name(&target)?;
            info!(input = %input, target = backend_type.name(), "compiling");

            let source = read_source(&input)?;
            let program = parser::parse(&source)?;

            if show_ast {
                eprintln!("=== AST ===");
                eprintln!("{:#?}", program);
            }

            let mut backend = backend_type.create();
            let mut text = backend.compile(&program)?;
            if !text.ends_with('\n') {
                text.push('\n');
            }

            match output {
                Some(path) => {
                    fs::write(&path, &text).with_context(|| format!("writing {}", path.display()))?;
                    info!(output = %path.display(), bytes = text.len(), "written");
                }
                None => print!("{text}"),
            }
        }
        Commands::Interpret { input } => {
            let source = read_source(&input)?;
            let program = parser::parse(&source)?;
            println!("{}", Interpreter::new().run(&program));
        }
        Commands::Parse { input } => {
            let source = read_source(&input)?;

            println!("=== SOURCE ===");
            println!("{}", source);
            println!("=== TOKENS ===");
            for lexeme in parser::lexer::tokenize(&source) {
                println!("{:>6}  {:?}", lexeme.span.to_string(), lexeme.token);
            }

            println!("=== AST ===");
            match parser::parse(&source) {
                Ok(program) => println!("{:#?}", program),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
        Commands::Run { input, output } => {
            let source = read_source(&input)?;
            let program = parser::parse(&source)?;
            let assembly = CodeGenerator::new().compile_program(&program)?.join("\n") + "\n";

            let printed = match output {
                Some(executable) => {
                    let toolchain = Toolchain::detect()?;
                    toolchain
                        .build(&assembly, &executable)
                        .with_context(|| format!("building {}", executable.display()))?;
                    info!(executable = %executable.display(), "built");
                    toolchain.run(&absolute(&executable)?)?
                }
                None => toolchain::compile_and_run(&assembly, &program_name(&input))?,
            };
            println!("{printed}");
        }
        Commands::Check { input } => {
            let source = read_source(&input)?;
            let program = parser::parse(&source)?;

            let interpreted = Interpreter::new().run(&program).to_string();
            let assembly = CodeGenerator::new().compile_program(&program)?.join("\n") + "\n";
            let compiled = toolchain::compile_and_run(&assembly, &program_name(&input))
                .context("running the compiled program")?;

            println!("interp: {interpreted}");
            println!("x86_64: {compiled}");
            if interpreted != compiled {
                bail!("backends disagree on {input}");
            }
            println!("PASS");
        }
        Commands::Backends => {
            println!("Supported backends:");
            for backend in BackendType::all() {
                println!("  {:8} - {}", backend.name(), backend.description());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_max_level(level)
        .init();
}

fn read_source(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("reading standard input")?;
        return Ok(source);
    }
    fs::read_to_string(input).with_context(|| format!("reading {input}"))
}

fn program_name(input: &str) -> String {
    Path::new(input)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| *stem != "-")
        .unwrap_or("stdin")
        .to_string()
}

/// `Command::new("a.out")` searches PATH; a bare file name has to be anchored.
fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("resolving the current directory")?;
    Ok(cwd.join(path))
}
