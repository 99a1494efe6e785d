//! Result cache client handed to the analysis service.
//!
//! Payloads are opaque strings here; decoding and shape checks happen in
//! [`decode_cached_result`], where anything unexpected becomes a miss.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::CacheError;
use crate::model::AnalysisResult;

pub trait ResultCache: Send + Sync {
    /// `Ok(None)` is a miss; `Err` means the cache could not be consulted.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn put(&self, key: &str, payload: String, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    expires_at: Instant,
}

/// Process-local TTL cache.
#[derive(Debug, Default)]
pub struct MemoryResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, CacheEntry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Unavailable("memory cache lock poisoned".to_string()))
    }
}

impl ResultCache for MemoryResultCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Ok(Some(entry.payload.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, payload: String, ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

/// Stand-in used when caching is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCache;

impl ResultCache for DisabledCache {
    fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("cache disabled".to_string()))
    }

    fn put(&self, _key: &str, _payload: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("cache disabled".to_string()))
    }
}

/// Decode a cached payload. Unparsable or mis-shaped payloads are `None`.
pub fn decode_cached_result(payload: &str) -> Option<AnalysisResult> {
    match serde_json::from_str::<AnalysisResult>(payload) {
        Ok(result) if result.is_well_formed() => Some(result),
        Ok(_) => {
            tracing::warn!("Cached analysis failed shape checks, ignoring");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cached analysis is not valid JSON for the contract, ignoring");
            None
        }
    }
}
