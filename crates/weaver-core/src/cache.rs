//! Single-flight memoization for one generation pass
//!
//! A [`PassCache`] maps a key to a lazily built value. However many threads
//! ask for the same key at once, the factory runs exactly once and every
//! caller receives the same `Arc`. A failed build is remembered as well: later
//! callers for that key see the same [`CacheError`] without re-running the
//! factory, while other keys are unaffected.
//!
//! Keys may hold [`SymbolId`]s, which are only stable inside one pass, so a
//! cache must be created per pass and dropped with it.

use crate::model::SymbolId;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Symbol(SymbolId),
    /// Unordered pair; build with [`CacheKey::pair`].
    Pair(SymbolId, SymbolId),
    Named(String),
}

impl CacheKey {
    /// Symmetric key: `pair(a, b) == pair(b, a)`.
    pub fn pair(a: SymbolId, b: SymbolId) -> Self {
        if a <= b {
            CacheKey::Pair(a, b)
        } else {
            CacheKey::Pair(b, a)
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        CacheKey::Named(name.into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Symbol(id) => write!(f, "{}", id),
            CacheKey::Pair(a, b) => write!(f, "({}, {})", a, b),
            CacheKey::Named(name) => write!(f, "{}", name),
        }
    }
}

/// A factory failure, shared by every caller of the failed key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("building '{key}' failed: {message}")]
pub struct CacheError {
    pub key: String,
    pub message: String,
}

type Slot<V> = Arc<OnceLock<Result<Arc<V>, CacheError>>>;

pub struct PassCache<V> {
    entries: DashMap<CacheKey, Slot<V>>,
    builds: AtomicUsize,
}

impl<V> PassCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            builds: AtomicUsize::new(0),
        }
    }

    /// Return the value for `key`, running `factory` if nobody has built it yet.
    ///
    /// The map lock is only held while the slot is looked up; the factory runs
    /// outside it, so factories may request other keys. A factory must not
    /// request its own key.
    pub fn get_or_create<E, F>(&self, key: CacheKey, factory: F) -> Result<Arc<V>, CacheError>
    where
        E: fmt::Display,
        F: FnOnce() -> Result<V, E>,
    {
        let slot = Arc::clone(&self.entries.entry(key.clone()).or_default());
        slot.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "building cache entry");
            factory().map(Arc::new).map_err(|e| CacheError {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .clone()
    }

    /// Completed entry for `key`, if one exists.
    pub fn get(&self, key: &CacheKey) -> Option<Result<Arc<V>, CacheError>> {
        let slot = self.entries.get(key).map(|entry| Arc::clone(entry.value()))?;
        slot.get().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many times a factory has run.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

impl<V> Default for PassCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for PassCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassCache")
            .field("entries", &self.entries.len())
            .field("builds", &self.builds())
            .finish()
    }
}
