//! Caller-owned cache of compiled circuits
//!
//! Nothing is cached implicitly: a caller that recompiles the same sources
//! repeatedly (an editor after every keystroke, a server handling many
//! requests) keeps a [`CompileCache`] and routes compilations through it.

use crate::error::Result;
use crate::{CompiledCircuit, Compiler};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Hit and miss counters of a [`CompileCache`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Compiled circuits keyed by a digest of the source and compiler settings
#[derive(Debug, Default)]
pub struct CompileCache {
    entries: HashMap<[u8; 32], Arc<CompiledCircuit>>,
    stats: CacheStats,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached circuit for `source`, compiling it on a miss
    ///
    /// Failed compilations are not cached.
    pub fn get_or_compile(
        &mut self,
        compiler: &Compiler,
        source: &str,
    ) -> Result<Arc<CompiledCircuit>> {
        let key = cache_key(compiler, source);
        if let Some(compiled) = self.entries.get(&key) {
            self.stats.hits += 1;
            debug!(key = %hex::encode(&key[..8]), "compile cache hit");
            return Ok(compiled.clone());
        }
        self.stats.misses += 1;
        debug!(key = %hex::encode(&key[..8]), "compile cache miss");
        let compiled = Arc::new(compiler.compile(source)?);
        self.entries.insert(key, compiled.clone());
        Ok(compiled)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry; the statistics are kept
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// SHA-256 over the configuration, the builtin versions and the source
fn cache_key(compiler: &Compiler, source: &str) -> [u8; 32] {
    let config = compiler.config();
    let mut hasher = Sha256::new();
    hasher.update(config.entry.as_bytes());
    hasher.update(b"\0");
    hasher.update((config.max_gates as u64).to_le_bytes());
    hasher.update(config.max_unroll.to_le_bytes());
    hasher.update((config.max_inline_depth as u64).to_le_bytes());
    hasher.update([u8::from(config.warnings)]);
    for name in compiler.registry().names() {
        let version = compiler.registry().get(name).map_or(0, |builtin| builtin.version());
        hasher.update(name.as_bytes());
        hasher.update(version.to_le_bytes());
    }
    hasher.update(b"\0");
    hasher.update(source.as_bytes());
    hasher.finalize().into()
}
