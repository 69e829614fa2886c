//! Builtin gate providers
//!
//! A builtin is a standard-library operation (`std::hash::mimc::permute`, ...)
//! whose constraints are contributed by a plug-in instead of being lowered
//! from source. The [`BuiltinRegistry`] maps qualified names to providers. It
//! is resolved once while type checking and consulted again while lowering;
//! the process-wide [`BuiltinRegistry::standard`] instance is immutable after
//! initialization and safe to share between concurrent compilations.

pub mod mimc;

use crate::error::{CompilerError, Result, SynthesisError};
use crate::types::Type;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use zkplay_runtime::{FieldElement, LinearCombination, Slot};

/// Constraint-emission surface handed to a builtin
pub trait BuiltinContext {
    /// Allocates a private slot. `value` must be `Some` when a witness is being generated.
    fn alloc(&mut self, value: Option<FieldElement>, label: &str)
        -> std::result::Result<Slot, SynthesisError>;

    /// Emits `a · b = c`
    fn constrain(
        &mut self,
        a: LinearCombination,
        b: LinearCombination,
        c: LinearCombination,
        label: &str,
    ) -> std::result::Result<(), SynthesisError>;

    /// Concrete value of `lc`, known for constants and while generating a witness
    fn value(&self, lc: &LinearCombination) -> Option<FieldElement>;
}

/// A pluggable, versioned gate provider
///
/// Inputs arrive as the scalar leaves of the declared parameters, in order;
/// the returned combinations are the scalar leaves of the return type.
/// Implementations must emit the same gates for the same input shapes no
/// matter which concrete values flow through them.
pub trait Builtin: Send + Sync {
    /// Fully qualified name, e.g. `std::hash::mimc::permute`
    fn name(&self) -> &str;

    /// Bumped whenever the emitted gate graph changes
    fn version(&self) -> u32;

    fn params(&self) -> Vec<Type>;

    fn returns(&self) -> Type;

    fn synthesize(
        &self,
        ctx: &mut dyn BuiltinContext,
        inputs: &[LinearCombination],
    ) -> std::result::Result<Vec<LinearCombination>, SynthesisError>;
}

/// Registry of builtins keyed by qualified name
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    entries: BTreeMap<String, Arc<dyn Builtin>>,
}

impl BuiltinRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry holding the standard library
    pub fn standard() -> &'static BuiltinRegistry {
        static STANDARD: OnceLock<BuiltinRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let mut registry = BuiltinRegistry::new();
            for builtin in mimc::builtins() {
                registry.entries.insert(builtin.name().to_string(), builtin);
            }
            registry
        })
    }

    /// Adds a provider. Names must be unique and live under `std::`.
    pub fn register(&mut self, builtin: impl Builtin + 'static) -> Result<()> {
        let name = builtin.name().to_string();
        if !name.starts_with("std::") {
            return Err(CompilerError::other(format!(
                "builtin name '{}' must start with 'std::'",
                name
            )));
        }
        if self.entries.contains_key(&name) {
            return Err(CompilerError::DuplicateBuiltin(name));
        }
        self.entries.insert(name, Arc::new(builtin));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Builtin> {
        self.entries.get(name).map(|builtin| builtin.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, builtin)| (name, builtin.version())))
            .finish()
    }
}
