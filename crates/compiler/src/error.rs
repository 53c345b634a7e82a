//! Compilation errors
//!
//! One variant per pipeline stage that can reject a program. Every error is
//! fatal: the stage reports it and the compilation stops with no partial
//! output.

/// Error type covering every stage of the pipeline.
///
/// The `Display` impl produces the single-line message the driver prints to
/// stderr, prefixed with the failing stage.
#[derive(Debug)]
pub enum CompileError {
    /// Unrecognized character in the input stream
    Lexical(String),
    /// Unexpected token kind
    Parse(String),
    /// Duplicate declaration, undeclared identifier, or invalid lvalue
    IdentifierResolution(String),
    /// Arity mismatch, conflicting redeclaration, misuse of a function name
    Type(String),
    /// `break` or `continue` outside any loop
    LoopLabeling(String),
    /// Internal invariant violation during IR generation
    IrGen(String),
    /// Internal invariant violation during assembly generation
    Codegen(String),
    /// A formatting error while writing assembly text
    Emit(std::fmt::Error),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Lexical(msg) => write!(f, "Lexical error: {}", msg),
            CompileError::Parse(msg) => write!(f, "Parse error: {}", msg),
            CompileError::IdentifierResolution(msg) => {
                write!(f, "Identifier resolution error: {}", msg)
            }
            CompileError::Type(msg) => write!(f, "Type error: {}", msg),
            CompileError::LoopLabeling(msg) => write!(f, "Loop labeling error: {}", msg),
            CompileError::IrGen(msg) => write!(f, "IR generation error: {}", msg),
            CompileError::Codegen(msg) => write!(f, "Codegen error: {}", msg),
            CompileError::Emit(e) => write!(f, "Code emission error: {}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::fmt::Error> for CompileError {
    fn from(e: std::fmt::Error) -> Self {
        CompileError::Emit(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_prefixes() {
        let cases = [
            (
                CompileError::Lexical("bad char".into()),
                "Lexical error: bad char",
            ),
            (
                CompileError::Parse("unexpected token".into()),
                "Parse error: unexpected token",
            ),
            (
                CompileError::IdentifierResolution("duplicate declaration".into()),
                "Identifier resolution error: duplicate declaration",
            ),
            (
                CompileError::Type("arity mismatch".into()),
                "Type error: arity mismatch",
            ),
            (
                CompileError::LoopLabeling("break outside loop".into()),
                "Loop labeling error: break outside loop",
            ),
            (
                CompileError::IrGen("missing type".into()),
                "IR generation error: missing type",
            ),
            (
                CompileError::Codegen("pseudo without backend symbol".into()),
                "Codegen error: pseudo without backend symbol",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_format_errors_convert() {
        let err = CompileError::from(std::fmt::Error);
        assert!(matches!(err, CompileError::Emit(_)));
        assert!(err.to_string().starts_with("Code emission error:"));
    }
}
