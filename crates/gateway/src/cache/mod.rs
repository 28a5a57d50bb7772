//! # ダウンロードURLキャッシュ
//!
//! 共有キャッシュ基盤（`CacheStore`）と、その上で名前空間を固定した `UrlCache`。
//! 書き込みは別タスクで実行し、呼び出し元を待たせない。
//! 削除は上限時間付きで完了まで待つ。削除直後の読み取りに古いURLを返さないため。
//! キャッシュの失敗はログに残して捨てる。操作全体を失敗させることはない。

pub mod moka;

pub use self::moka::MokaCacheStore;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;

use crate::naming::ObjectKey;

/// 削除を待つ時間の上限。超えた場合はログに残して処理を続ける。
pub const EVICT_TIMEOUT: Duration = Duration::from_secs(2);

/// キャッシュ基盤のエラー。Gatewayの呼び出し元には伝播しない。
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("キャッシュ基盤に接続できません: {0}")]
    Unavailable(String),
    #[error("キャッシュ操作に失敗: {0}")]
    Operation(String),
}

/// キャッシュに保持する1エントリ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub url: String,
    pub inserted_at: SystemTime,
    pub ttl: Duration,
}

/// 名前空間付きの共有キャッシュ基盤。
///
/// 同一キーへの並行した get/put/evict に対して安全であること。
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CacheError>;

    /// `ttl` 経過後にエントリを失効させる。既存エントリは上書きする。
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    async fn evict(&self, namespace: &str, key: &str) -> Result<(), CacheError>;
}

/// オブジェクトキー → 署名付きダウンロードURL のキャッシュ。
///
/// TTLの計算はGatewayの責務で、ここでは渡された値をそのまま使う。
///
/// `evict` のたびに世代を進める。`put` は読み取り時点の世代を受け取り、
/// 書き込みの前後で世代が変わっていれば書かない（書いた分は取り消す）。
/// これで削除と並行した書き込みが削除後に残ることを防ぐ。
/// 世代はこのプロセス内の `UrlCache` でのみ共有される。
#[derive(Clone)]
pub struct UrlCache {
    store: Arc<dyn CacheStore>,
    namespace: Arc<str>,
    generation: Arc<AtomicU64>,
}

impl UrlCache {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 現在の世代。`put` に渡す。
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// キャッシュ済みURLを返す。基盤の失敗はミスとして扱う。
    pub async fn get(&self, key: &ObjectKey) -> Option<String> {
        match self.store.get(&self.namespace, key.as_str()).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "URLキャッシュの読み取りに失敗");
                None
            }
        }
    }

    /// URLをバックグラウンドで書き込む。
    ///
    /// `since` 以降に `evict` があった場合は書き込まない。
    /// 返り値のハンドルは待たなくてよい。`ttl` がゼロなら何もしない。
    pub fn put(&self, key: &ObjectKey, url: String, ttl: Duration, since: u64) -> JoinHandle<()> {
        let store = self.store.clone();
        let namespace = self.namespace.clone();
        let generation = self.generation.clone();
        let key = key.clone();
        tokio::spawn(async move {
            if ttl.is_zero() || generation.load(Ordering::SeqCst) != since {
                return;
            }
            if let Err(e) = store.put(&namespace, key.as_str(), url, ttl).await {
                tracing::warn!(key = %key, error = %e, "URLキャッシュの書き込みに失敗");
                return;
            }
            if generation.load(Ordering::SeqCst) != since {
                // 書き込み中に削除が走った
                tracing::debug!(key = %key, "並行した削除のため書き込みを取り消す");
                if let Err(e) = store.evict(&namespace, key.as_str()).await {
                    tracing::warn!(key = %key, error = %e, "URLキャッシュの削除に失敗");
                }
            }
        })
    }

    /// エントリを削除し、完了（または `EVICT_TIMEOUT`）まで待つ。
    pub async fn evict(&self, key: &ObjectKey) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        match tokio::time::timeout(EVICT_TIMEOUT, self.store.evict(&self.namespace, key.as_str()))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "URLキャッシュの削除に失敗");
            }
            Err(_) => {
                tracing::warn!(key = %key, "URLキャッシュの削除が時間内に終わりませんでした");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// すべての操作が失敗するキャッシュ基盤
    struct BrokenStore;

    #[async_trait::async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _namespace: &str, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn put(
            &self,
            _namespace: &str,
            _key: &str,
            _value: String,
            _ttl: Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn evict(&self, _namespace: &str, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Operation("timeout".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let cache = UrlCache::new(Arc::new(BrokenStore), "file-url-cache");
        let key = ObjectKey::parse("foodimage/1/a.png").unwrap();

        assert_eq!(cache.get(&key).await, None);
        // タスク自体はパニックせずに完了する
        cache
            .put(&key, "memory://x".to_string(), Duration::from_secs(60), cache.generation())
            .await
            .unwrap();
        cache.evict(&key).await;
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let store: Arc<dyn CacheStore> = Arc::new(MokaCacheStore::new(100));
        let urls = UrlCache::new(store.clone(), "file-url-cache");
        let other = UrlCache::new(store, "user-profile");
        let key = ObjectKey::parse("foodimage/1/a.png").unwrap();

        urls.put(&key, "memory://file".to_string(), Duration::from_secs(60), urls.generation())
            .await
            .unwrap();

        assert_eq!(urls.get(&key).await.as_deref(), Some("memory://file"));
        assert_eq!(other.get(&key).await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_stored() {
        let cache = UrlCache::new(Arc::new(MokaCacheStore::new(100)), "file-url-cache");
        let key = ObjectKey::parse("foodimage/1/a.png").unwrap();

        cache
            .put(&key, "memory://x".to_string(), Duration::ZERO, cache.generation())
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn test_evict_is_visible_on_return() {
        let cache = UrlCache::new(Arc::new(MokaCacheStore::new(100)), "file-url-cache");
        let key = ObjectKey::parse("foodimage/1/a.png").unwrap();
        cache
            .put(&key, "memory://x".to_string(), Duration::from_secs(60), cache.generation())
            .await
            .unwrap();
        assert!(cache.get(&key).await.is_some());

        cache.evict(&key).await;
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn test_put_after_evict_is_discarded() {
        let cache = UrlCache::new(Arc::new(MokaCacheStore::new(100)), "file-url-cache");
        let key = ObjectKey::parse("foodimage/1/a.png").unwrap();

        // 読み取り時点の世代を控えた後で削除が走る
        let since = cache.generation();
        cache.evict(&key).await;
        cache
            .put(&key, "memory://stale".to_string(), Duration::from_secs(60), since)
            .await
            .unwrap();

        assert_eq!(cache.get(&key).await, None);
    }

    /// 書き込みの途中で世代を進めるキャッシュ基盤
    struct RacingStore {
        inner: MokaCacheStore,
        generation: Arc<AtomicU64>,
    }

    #[async_trait::async_trait]
    impl CacheStore for RacingStore {
        async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CacheError> {
            self.inner.get(namespace, key).await
        }

        async fn put(
            &self,
            namespace: &str,
            key: &str,
            value: String,
            ttl: Duration,
        ) -> Result<(), CacheError> {
            self.inner.put(namespace, key, value, ttl).await?;
            self.generation.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn evict(&self, namespace: &str, key: &str) -> Result<(), CacheError> {
            self.inner.evict(namespace, key).await
        }
    }

    #[tokio::test]
    async fn test_put_racing_evict_is_rolled_back() {
        let generation = Arc::new(AtomicU64::new(0));
        let mut cache = UrlCache::new(
            Arc::new(RacingStore {
                inner: MokaCacheStore::new(100),
                generation: generation.clone(),
            }),
            "file-url-cache",
        );
        cache.generation = generation;
        let key = ObjectKey::parse("foodimage/1/a.png").unwrap();

        cache
            .put(&key, "memory://stale".to_string(), Duration::from_secs(60), cache.generation())
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn test_evict_failure_is_swallowed_within_timeout() {
        let cache = UrlCache::new(Arc::new(BrokenStore), "file-url-cache");
        let key = ObjectKey::parse("foodimage/1/a.png").unwrap();
        let before = cache.generation();
        tokio::time::timeout(EVICT_TIMEOUT + Duration::from_secs(1), cache.evict(&key))
            .await
            .unwrap();
        assert_eq!(cache.generation(), before + 1);
    }
}
