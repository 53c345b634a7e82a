//! mcc compiler CLI
//!
//! Single-invocation driver: `mcc program.c` compiles to an executable via
//! the system toolchain, `-S` keeps the assembly, and the stage flags stop
//! the pipeline early for inspection and test harnesses.

use clap::{CommandFactory, Parser as ClapParser};
use clap_complete::{Shell, generate};
use mcc::{CompilerConfig, OptimizationConfig, StopStage};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "mcc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile a small C subset to x86-64", long_about = None)]
struct Cli {
    /// Input C source file
    #[arg(required_unless_present = "completions")]
    input: Option<PathBuf>,

    /// Output path (defaults to the input filename without its extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after lexing
    #[arg(long)]
    lex: bool,

    /// Stop after parsing
    #[arg(long)]
    parse: bool,

    /// Stop after semantic analysis
    #[arg(long)]
    validate: bool,

    /// Stop after IR generation
    #[arg(long)]
    tacky: bool,

    /// Stop after assembly generation, before emission
    #[arg(long)]
    codegen: bool,

    /// Emit the .s file instead of assembling and linking
    #[arg(short = 'S')]
    emit_assembly: bool,

    /// Enable IR constant folding
    #[arg(long)]
    fold_constants: bool,

    /// Enable IR copy propagation
    #[arg(long)]
    propagate_copies: bool,

    /// Enable IR unreachable-code elimination
    #[arg(long)]
    eliminate_unreachable_code: bool,

    /// Enable IR dead-store elimination
    #[arg(long)]
    eliminate_dead_stores: bool,

    /// Enable all IR optimization passes
    #[arg(long)]
    optimize: bool,

    /// Load compiler configuration from a TOML file (flags override it)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Generate shell completion scripts and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

impl Cli {
    fn stop_stage(&self) -> Option<StopStage> {
        if self.lex {
            Some(StopStage::Lex)
        } else if self.parse {
            Some(StopStage::Parse)
        } else if self.validate {
            Some(StopStage::Validate)
        } else if self.tacky {
            Some(StopStage::Tacky)
        } else if self.codegen {
            Some(StopStage::Codegen)
        } else {
            None
        }
    }

    fn optimizations(&self) -> OptimizationConfig {
        if self.optimize {
            return OptimizationConfig::all();
        }
        OptimizationConfig {
            fold_constants: self.fold_constants,
            propagate_copies: self.propagate_copies,
            eliminate_unreachable_code: self.eliminate_unreachable_code,
            eliminate_dead_stores: self.eliminate_dead_stores,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mcc=warn".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        generate(shell, &mut command, "mcc", &mut io::stdout());
        return;
    }

    let input = cli.input.clone().expect("clap enforces the input argument");

    // File config first, then flags on top
    let mut config = match &cli.config {
        Some(path) => {
            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Error reading config {}: {}", path.display(), e);
                    process::exit(1);
                }
            };
            match CompilerConfig::from_toml(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
        None => CompilerConfig::new(),
    };
    let mut flag_config = CompilerConfig::new().with_optimizations(cli.optimizations());
    flag_config.stop_after = cli.stop_stage();
    flag_config.emit_assembly_only = cli.emit_assembly;
    config.merge(flag_config);

    let output = cli.output.clone().unwrap_or_else(|| {
        if config.emit_assembly_only {
            input.with_extension("s")
        } else {
            PathBuf::from(input.file_stem().unwrap_or_default())
        }
    });

    if let Err(e) = mcc::compile_file(&input, &output, &config) {
        eprintln!("{}", e);
        process::exit(1);
    }
}
