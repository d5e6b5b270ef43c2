use crate::IdGenerator;
use shortly_core::ShortId;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic short id generator using a sequential counter.
///
/// Produces zero-padded 8-character ids like "sq000000", "sq000001".
/// Intended for tests that need predictable ids; production code uses
/// [`crate::RandomGenerator`].
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    /// Creates a new sequential generator with a two-character prefix.
    ///
    /// The prefix plus the six-digit counter keeps ids at the fixed
    /// 8-character length.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            prefix: prefix.into(),
        }
    }

    /// Creates a sequential generator starting from a specific counter
    /// value.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            prefix: prefix.into(),
        }
    }
}

impl Default for SeqGenerator {
    fn default() -> Self {
        Self::with_prefix("sq")
    }
}

impl IdGenerator for SeqGenerator {
    fn generate(&self) -> ShortId {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortId::new_unchecked(format!("{}{:06}", self.prefix, count))
    }
}

/// A generator that returns the same id on every call.
///
/// Exists to exercise the documented overwrite behavior of backends
/// that do not re-check id uniqueness before insert.
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    id: ShortId,
}

impl FixedGenerator {
    pub fn new(id: ShortId) -> Self {
        Self { id }
    }
}

impl IdGenerator for FixedGenerator {
    fn generate(&self) -> ShortId {
        self.id.clone()
    }
}
