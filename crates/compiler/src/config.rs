//! Compiler configuration
//!
//! Where the pipeline stops, whether assembly is written instead of an
//! executable, and which IR optimization passes run. The driver builds this
//! from command-line flags; a TOML file can preset the optimization flags
//! and the flags then override it.

use serde::Deserialize;

/// Pipeline stage after which compilation halts (for inspection and tests)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStage {
    /// Stop after lexing
    Lex,
    /// Stop after parsing
    Parse,
    /// Stop after semantic analysis
    Validate,
    /// Stop after IR generation (and optimization, if enabled)
    Tacky,
    /// Stop after assembly generation, before emission
    Codegen,
}

/// Which IR optimization passes are enabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    pub fold_constants: bool,
    pub propagate_copies: bool,
    pub eliminate_unreachable_code: bool,
    pub eliminate_dead_stores: bool,
}

impl OptimizationConfig {
    /// Everything on (the `--optimize` flag).
    pub fn all() -> Self {
        OptimizationConfig {
            fold_constants: true,
            propagate_copies: true,
            eliminate_unreachable_code: true,
            eliminate_dead_stores: true,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.fold_constants
            || self.propagate_copies
            || self.eliminate_unreachable_code
            || self.eliminate_dead_stores
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Halt the pipeline after this stage instead of producing output
    pub stop_after: Option<StopStage>,
    /// Write the `.s` file and skip assembling/linking
    pub emit_assembly_only: bool,
    pub optimizations: OptimizationConfig,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop_after(mut self, stage: StopStage) -> Self {
        self.stop_after = Some(stage);
        self
    }

    pub fn with_optimizations(mut self, optimizations: OptimizationConfig) -> Self {
        self.optimizations = optimizations;
        self
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("invalid compiler config: {}", e))
    }

    /// Overlay `other` on top of this configuration. Set fields win;
    /// optimization flags are OR-ed.
    pub fn merge(&mut self, other: CompilerConfig) {
        if other.stop_after.is_some() {
            self.stop_after = other.stop_after;
        }
        self.emit_assembly_only |= other.emit_assembly_only;
        self.optimizations.fold_constants |= other.optimizations.fold_constants;
        self.optimizations.propagate_copies |= other.optimizations.propagate_copies;
        self.optimizations.eliminate_unreachable_code |=
            other.optimizations.eliminate_unreachable_code;
        self.optimizations.eliminate_dead_stores |= other.optimizations.eliminate_dead_stores;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runs_no_passes() {
        let config = CompilerConfig::default();
        assert!(config.stop_after.is_none());
        assert!(!config.optimizations.any_enabled());
    }

    #[test]
    fn test_from_toml() {
        let config = CompilerConfig::from_toml(
            r#"
            emit_assembly_only = true

            [optimizations]
            fold_constants = true
            eliminate_dead_stores = true
            "#,
        )
        .unwrap();
        assert!(config.emit_assembly_only);
        assert!(config.optimizations.fold_constants);
        assert!(config.optimizations.eliminate_dead_stores);
        assert!(!config.optimizations.propagate_copies);
    }

    #[test]
    fn test_stop_stage_from_toml() {
        let config = CompilerConfig::from_toml(r#"stop_after = "tacky""#).unwrap();
        assert_eq!(config.stop_after, Some(StopStage::Tacky));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(CompilerConfig::from_toml("stop_after = \"link\"").is_err());
    }

    #[test]
    fn test_merge_ors_optimizations() {
        let mut base = CompilerConfig::from_toml("[optimizations]\nfold_constants = true")
            .unwrap();
        base.merge(CompilerConfig::new().with_optimizations(OptimizationConfig {
            propagate_copies: true,
            ..Default::default()
        }));
        assert!(base.optimizations.fold_constants);
        assert!(base.optimizations.propagate_copies);
    }
}
