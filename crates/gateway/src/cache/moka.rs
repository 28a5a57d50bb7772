//! # moka によるインプロセスキャッシュ
//!
//! エントリごとに異なるTTLを持たせるため `Expiry` を実装する。

use std::time::{Duration, Instant, SystemTime};

use ::moka::future::Cache;
use ::moka::Expiry;

use super::{CacheEntry, CacheError, CacheStore};

/// エントリ自身の `ttl` で失効させる。上書き時はTTLを張り直す。
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// プロセス内の共有キャッシュ。名前空間はキーのプレフィックスで分離する。
pub struct MokaCacheStore {
    inner: Cache<String, CacheEntry>,
}

impl MokaCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { inner }
    }

    fn scoped(namespace: &str, key: &str) -> String {
        format!("{namespace}::{key}")
    }

    /// 保持中のエントリ（TTL確認用）。
    pub async fn entry(&self, namespace: &str, key: &str) -> Option<CacheEntry> {
        self.inner.get(&Self::scoped(namespace, key)).await
    }
}

#[async_trait::async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entry(namespace, key).await.map(|entry| entry.url))
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            key: key.to_string(),
            url: value,
            inserted_at: SystemTime::now(),
            ttl,
        };
        self.inner.insert(Self::scoped(namespace, key), entry).await;
        Ok(())
    }

    async fn evict(&self, namespace: &str, key: &str) -> Result<(), CacheError> {
        self.inner.invalidate(&Self::scoped(namespace, key)).await;
        Ok(())
    }
}
