//! mcc compiler library
//!
//! Compiles a small C subset (the `int`/`long` scalar language with
//! functions, control flow, and static storage) to x86-64 assembly text.
//!
//! The pipeline, in order: lexing, parsing, semantic analysis (identifier
//! resolution, type checking, loop labeling), IR generation, optional IR
//! optimization, assembly generation (instruction selection, stack
//! allocation, fixup), and text emission. Each stage has a public entry
//! point so tests and the driver can stop anywhere:
//!
//! ```rust
//! use mcc::CompilerConfig;
//!
//! let asm = mcc::compile_to_assembly(
//!     "int main(void) { return 2 + 3 * 4; }",
//!     &CompilerConfig::default(),
//! ).unwrap();
//! assert!(asm.contains("main"));
//! ```

pub mod asm;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod emitter;
pub mod error;
pub mod ir;
pub mod irgen;
pub mod lexer;
pub mod loop_labeling;
pub mod optimizer;
pub mod parser;
pub mod resolver;
pub mod symbols;
pub mod typechecker;
pub mod types;

pub use config::{CompilerConfig, OptimizationConfig, StopStage};
pub use error::CompileError;
pub use irgen::IrGenerator;
pub use lexer::{Token, lex};
pub use loop_labeling::LoopLabeler;
pub use parser::Parser;
pub use resolver::Resolver;
pub use symbols::SymbolTable;
pub use typechecker::TypeChecker;

use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Run the three semantic passes over a parsed program. Returns the
/// validated tree, the populated symbol table, and the fresh-name counter
/// the IR generator continues from.
pub fn validate(source: &str) -> Result<(ast::Program, SymbolTable, usize), CompileError> {
    let program = parser::parse(source)?;
    let (resolved, counter) = Resolver::new().resolve_program(program)?;
    let mut symbols = SymbolTable::new();
    let checked = TypeChecker::new(&mut symbols).check_program(resolved)?;
    let labeled = LoopLabeler::new().label_program(checked)?;
    debug!(counter, "semantic analysis complete");
    Ok((labeled, symbols, counter))
}

/// Lower a source string to IR, applying whichever optimization passes the
/// configuration enables.
pub fn generate_ir(
    source: &str,
    config: &CompilerConfig,
) -> Result<(ir::Program, SymbolTable), CompileError> {
    let (program, mut symbols, counter) = validate(source)?;
    let mut ir_program = IrGenerator::new(&mut symbols, counter).generate_program(&program)?;
    optimizer::optimize_program(&mut ir_program, &symbols, &config.optimizations);
    debug!(
        top_levels = ir_program.top_levels.len(),
        "IR generation complete"
    );
    Ok((ir_program, symbols))
}

/// Lower a source string all the way to the final assembly program.
pub fn generate_assembly(
    source: &str,
    config: &CompilerConfig,
) -> Result<asm::Program, CompileError> {
    let (ir_program, symbols) = generate_ir(source, config)?;
    codegen::generate_program(&ir_program, &symbols)
}

/// Compile a source string to assembly text (the `.s` file contents).
pub fn compile_to_assembly(
    source: &str,
    config: &CompilerConfig,
) -> Result<String, CompileError> {
    emitter::emit_program(&generate_assembly(source, config)?)
}

/// Compile a source file. With `stop_after` set, the pipeline halts after
/// that stage and produces nothing; with `emit_assembly_only` the `.s` file
/// is kept; otherwise the system C compiler driver assembles and links it
/// into `output_path`.
pub fn compile_file(
    source_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), String> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| format!("Failed to read source file: {}", e))?;

    if let Some(stage) = config.stop_after {
        match stage {
            StopStage::Lex => {
                lexer::lex(&source).map_err(|e| e.to_string())?;
            }
            StopStage::Parse => {
                parser::parse(&source).map_err(|e| e.to_string())?;
            }
            StopStage::Validate => {
                validate(&source).map_err(|e| e.to_string())?;
            }
            StopStage::Tacky => {
                generate_ir(&source, config).map_err(|e| e.to_string())?;
            }
            StopStage::Codegen => {
                generate_assembly(&source, config).map_err(|e| e.to_string())?;
            }
        }
        debug!(?stage, "pipeline halted early");
        return Ok(());
    }

    let text = compile_to_assembly(&source, config).map_err(|e| e.to_string())?;
    let assembly_path = output_path.with_extension("s");
    fs::write(&assembly_path, text)
        .map_err(|e| format!("Failed to write assembly file: {}", e))?;
    if config.emit_assembly_only {
        return Ok(());
    }

    // Hand the .s file to the system toolchain for assembly and linking
    let output = Command::new("cc")
        .arg(&assembly_path)
        .arg("-o")
        .arg(output_path)
        .output()
        .map_err(|e| format!("Failed to run cc: {}", e))?;
    fs::remove_file(&assembly_path).ok();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("Assembling/linking failed:\n{}", stderr));
    }
    Ok(())
}
