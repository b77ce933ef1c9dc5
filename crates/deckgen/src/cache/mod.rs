//! Namespaced, expiring cache for expensive external lookups.
//!
//! Keys are the SHA-256 of `"<namespace>:<query>"`, so identical query text in
//! two namespaces never collides. Expiry is lazy: an expired entry reads as a
//! miss and is only deleted by [`CacheStore::sweep_expired`].

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::db::{cache_repo, format_timestamp, Database, DatabaseError};

/// Logical namespace of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    Web,
    Images,
    Translation,
}

impl CacheNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::Web => "web",
            CacheNamespace::Images => "images",
            CacheNamespace::Translation => "translation",
        }
    }
}

/// Derives the hex-encoded cache key for a namespaced query.
pub fn cache_key(namespace: CacheNamespace, query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cache store backed by the `search_cache` table.
#[derive(Clone)]
pub struct CacheStore {
    db: Database,
}

impl CacheStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the cached value if a live entry exists.
    ///
    /// A live hit increments the hit counter. A payload that no longer
    /// deserializes into `T` is logged and treated as a miss.
    pub fn get<T: DeserializeOwned>(
        &self,
        namespace: CacheNamespace,
        query: &str,
    ) -> Result<Option<T>, DatabaseError> {
        let key = cache_key(namespace, query);
        let now = format_timestamp(Utc::now());
        let Some(row) = cache_repo::get_live(&self.db, &key, &now)? else {
            log::debug!("cache miss [{}] {}", namespace.as_str(), key);
            return Ok(None);
        };

        match serde_json::from_str(&row.results_json) {
            Ok(value) => {
                log::debug!(
                    "cache hit [{}] {} (hits={})",
                    namespace.as_str(),
                    key,
                    row.hit_count
                );
                Ok(Some(value))
            }
            Err(e) => {
                log::warn!(
                    "Discarding undecodable cache entry [{}] {}: {}",
                    namespace.as_str(),
                    key,
                    e
                );
                Ok(None)
            }
        }
    }

    /// Stores `value` under the namespaced query, valid for `ttl`.
    pub fn put<T: Serialize + ?Sized>(
        &self,
        namespace: CacheNamespace,
        query: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now();
        let row = cache_repo::CacheRow {
            query_hash: cache_key(namespace, query),
            query_text: query.to_string(),
            source_type: namespace.as_str().to_string(),
            results_json: serde_json::to_string(value)?,
            created_at: format_timestamp(now),
            expires_at: format_timestamp(now + ttl),
            hit_count: 1,
        };
        cache_repo::upsert(&self.db, &row)
    }

    /// Deletes entries of `namespace` that expired more than `retention_days` ago.
    pub fn sweep_expired(
        &self,
        namespace: CacheNamespace,
        retention_days: i64,
    ) -> Result<u64, DatabaseError> {
        let cutoff = format_timestamp(Utc::now() - Duration::days(retention_days));
        let deleted = cache_repo::delete_expired_before(&self.db, namespace.as_str(), &cutoff)?;
        if deleted > 0 {
            log::info!(
                "Swept {} expired cache entries from '{}'",
                deleted,
                namespace.as_str()
            );
        }
        Ok(deleted)
    }

    /// Current hit count of an entry, live or not.
    pub fn hit_count(
        &self,
        namespace: CacheNamespace,
        query: &str,
    ) -> Result<Option<i64>, DatabaseError> {
        Ok(cache_repo::peek(&self.db, &cache_key(namespace, query))?.map(|r| r.hit_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CacheStore {
        CacheStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_key_is_namespaced_and_stable() {
        let a = cache_key(CacheNamespace::Web, "solar");
        let b = cache_key(CacheNamespace::Images, "solar");
        assert_ne!(a, b);
        assert_eq!(a, cache_key(CacheNamespace::Web, "solar"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_put_then_get_returns_value_and_counts_hit() {
        let cache = store();
        let value = vec!["a".to_string(), "b".to_string()];
        cache
            .put(CacheNamespace::Web, "solar", &value, Duration::hours(1))
            .unwrap();

        let got: Option<Vec<String>> = cache.get(CacheNamespace::Web, "solar").unwrap();
        assert_eq!(got, Some(value));
        assert!(cache.hit_count(CacheNamespace::Web, "solar").unwrap().unwrap() >= 2);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = store();
        cache
            .put(CacheNamespace::Web, "old", &vec![1, 2], Duration::seconds(-1))
            .unwrap();
        let got: Option<Vec<i32>> = cache.get(CacheNamespace::Web, "old").unwrap();
        assert!(got.is_none());
        assert_eq!(cache.hit_count(CacheNamespace::Web, "old").unwrap(), Some(1));
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let cache = store();
        cache
            .put(CacheNamespace::Web, "q", &"web", Duration::hours(1))
            .unwrap();
        let got: Option<String> = cache.get(CacheNamespace::Translation, "q").unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_undecodable_payload_is_a_miss() {
        let cache = store();
        cache
            .put(CacheNamespace::Web, "q", &"text", Duration::hours(1))
            .unwrap();
        let got: Option<Vec<u32>> = cache.get(CacheNamespace::Web, "q").unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_sweep_expired_uses_retention_window() {
        let cache = store();
        cache
            .put(CacheNamespace::Web, "recent", &1, Duration::hours(-1))
            .unwrap();
        cache
            .put(CacheNamespace::Web, "ancient", &1, Duration::days(-10))
            .unwrap();

        assert_eq!(cache.sweep_expired(CacheNamespace::Web, 7).unwrap(), 1);
        assert!(cache
            .hit_count(CacheNamespace::Web, "recent")
            .unwrap()
            .is_some());
        assert!(cache
            .hit_count(CacheNamespace::Web, "ancient")
            .unwrap()
            .is_none());
    }
}
