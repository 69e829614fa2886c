//! Compiler configuration

use serde::{Deserialize, Serialize};

/// Limits and options for one compilation
///
/// Missing keys take their defaults when loaded from JSON:
///
/// ```
/// use zkplay_compiler::CompilerConfig;
///
/// let config: CompilerConfig = serde_json::from_str(r#"{ "max_gates": 4096 }"#).unwrap();
/// assert_eq!(config.entry, "main");
/// assert_eq!(config.max_gates, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Name of the entry function
    pub entry: String,
    /// Upper bound on emitted gates
    pub max_gates: usize,
    /// Upper bound on iterations of a single loop
    pub max_unroll: u64,
    /// Upper bound on nested function inlining
    pub max_inline_depth: usize,
    /// Whether warnings are collected
    pub warnings: bool,
}

impl CompilerConfig {
    pub const DEFAULT_MAX_GATES: usize = 1 << 20;
    pub const DEFAULT_MAX_UNROLL: u64 = 10_000;
    pub const DEFAULT_MAX_INLINE_DEPTH: usize = 64;

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    pub fn with_max_gates(mut self, max_gates: usize) -> Self {
        self.max_gates = max_gates;
        self
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            entry: "main".to_string(),
            max_gates: Self::DEFAULT_MAX_GATES,
            max_unroll: Self::DEFAULT_MAX_UNROLL,
            max_inline_depth: Self::DEFAULT_MAX_INLINE_DEPTH,
            warnings: true,
        }
    }
}
