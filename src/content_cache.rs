use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

/// Keyed cache of shared values with per-entry expiry. A non-caching
/// instance stores nothing, so every lookup misses.
pub struct ContentCache<T> {
    cache: Option<RwLock<CacheMap<T>>>,
}

type CacheMap<T> = HashMap<String, CacheValue<T>>;

#[derive(Clone, Copy, Debug)]
pub enum Expire {
    Never,
    After(Duration),
}

impl Expire {
    /// `After(ttl)`, or `None` when `ttl_secs` is 0 and nothing should be cached.
    pub fn from_secs(ttl_secs: u64) -> Option<Expire> {
        if ttl_secs == 0 {
            None
        } else {
            Some(Expire::After(Duration::seconds(ttl_secs as i64)))
        }
    }
}

struct CacheValue<T> {
    expire_date: DateTime<Utc>,
    value: Arc<T>,
}

impl<T> ContentCache<T> {
    pub fn new() -> Self {
        ContentCache {
            cache: Some(RwLock::new(HashMap::new())),
        }
    }

    pub fn non_caching() -> Self {
        ContentCache {
            cache: None,
        }
    }

    pub fn add(&self, key: &str, content: T, expire_after: Expire) -> Arc<T> {
        let value = Arc::new(content);
        if let Some(ref cache) = self.cache {
            let expire_date = match expire_after {
                Expire::Never => DateTime::<Utc>::MAX_UTC,
                Expire::After(duration) => Utc::now() + duration,
            };

            let mut cache = cache.write().unwrap_or_else(|e| e.into_inner());
            cache.insert(key.to_string(), CacheValue {
                expire_date,
                value: value.clone(),
            });
        }
        value
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        let cache = self.cache.as_ref()?;
        let cache = cache.read().unwrap_or_else(|e| e.into_inner());
        let cache_value = cache.get(key)?;
        if Utc::now() > cache_value.expire_date {
            return None;
        }
        Some(cache_value.value.clone())
    }

    pub fn invalidate(&self, key: &str) {
        if let Some(ref cache) = self.cache {
            let mut cache = cache.write().unwrap_or_else(|e| e.into_inner());
            cache.remove(key);
        }
    }
}

impl<T> Default for ContentCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
