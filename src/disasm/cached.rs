//! Memoizing wrapper around any decoder.
//!
//! Every anchor re-decodes the bytes before it, and epilogue idioms repeat
//! across a section, so the same windows come back many times.

use crate::disasm::{DecodeError, DecodeResult, InstructionDecoder};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::trace;

/// Default number of memoized windows
pub const DEFAULT_CACHE_CAPACITY: usize = 1 << 16;

/// Hit/miss counters of a [`CachingDecoder`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct CachingDecoder<D> {
    inner: D,
    capacity: usize,
    table: Mutex<HashMap<Vec<u8>, DecodeResult<Vec<String>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<D: InstructionDecoder> CachingDecoder<D> {
    pub fn new(inner: D, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            table: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.table.lock().map(|t| t.len()).unwrap_or(0),
        }
    }

    fn lookup(&self, window: &[u8]) -> Option<DecodeResult<Vec<String>>> {
        self.table.lock().ok()?.get(window).cloned()
    }

    fn remember(&self, window: &[u8], result: &DecodeResult<Vec<String>>) {
        // Timeouts say nothing about the bytes; let a later call retry them
        if matches!(result, Err(DecodeError::Timeout { .. })) {
            return;
        }
        if let Ok(mut table) = self.table.lock() {
            if table.len() < self.capacity {
                table.insert(window.to_vec(), result.clone());
            }
        }
    }
}

impl<D: InstructionDecoder> InstructionDecoder for CachingDecoder<D> {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        if let Some(hit) = self.lookup(window) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return hit;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        // lock is not held while decoding; racing threads may both decode
        // the same window
        let result = self.inner.decode(window);
        trace!(len = window.len(), ok = result.is_ok(), "Decoded uncached window");
        self.remember(window, &result);
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
