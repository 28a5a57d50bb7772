//! # インメモリストレージ
//!
//! オブジェクトのメタデータだけを保持する実装。ローカル開発（`STORAGE_BACKEND=memory`）
//! とテストで使う。発行されるURLは `memory://` スキームで、実際には到達できない。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use super::{expires_at, ObjectDeleter, ObjectProbe, PresignedUrl, Signer};
use crate::error::GatewayError;
use crate::naming::ObjectKey;

/// 保存済みオブジェクトのメタデータ。
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
}

/// 各操作の呼び出し回数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub sign_put: usize,
    pub sign_get: usize,
    pub exists: usize,
    pub delete: usize,
}

/// インメモリのオブジェクトストレージ。
pub struct MemoryStorage {
    bucket: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    sign_put_calls: AtomicUsize,
    sign_get_calls: AtomicUsize,
    exists_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
            sign_put_calls: AtomicUsize::new(0),
            sign_get_calls: AtomicUsize::new(0),
            exists_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// オブジェクトを直接配置する（クライアントのPUT完了に相当）。
    pub async fn insert(&self, key: &ObjectKey, content_type: &str) {
        self.objects.write().await.insert(
            key.as_str().to_string(),
            StoredObject {
                content_type: content_type.to_string(),
            },
        );
    }

    /// Gatewayを経由せずにオブジェクトを消す（帯域外削除に相当）。
    pub async fn remove(&self, key: &ObjectKey) -> Option<StoredObject> {
        self.objects.write().await.remove(key.as_str())
    }

    pub async fn contains(&self, key: &ObjectKey) -> bool {
        self.objects.read().await.contains_key(key.as_str())
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            sign_put: self.sign_put_calls.load(Ordering::SeqCst),
            sign_get: self.sign_get_calls.load(Ordering::SeqCst),
            exists: self.exists_calls.load(Ordering::SeqCst),
            delete: self.delete_calls.load(Ordering::SeqCst),
        }
    }

    fn sign(&self, method: &str, key: &ObjectKey, ttl_minutes: u32) -> Result<PresignedUrl, GatewayError> {
        let expires_at = expires_at(ttl_minutes)?;
        // 同じキーでも署名ごとに異なるURLになる
        let nonce = uuid::Uuid::new_v4().simple();
        Ok(PresignedUrl {
            url: format!(
                "memory://{}/{}?method={method}&expires={expires_at}&sig={nonce}",
                self.bucket, key
            ),
            key: key.clone(),
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl Signer for MemoryStorage {
    async fn sign_put(
        &self,
        key: &ObjectKey,
        _content_type: &str,
        ttl_minutes: u32,
    ) -> Result<PresignedUrl, GatewayError> {
        self.sign_put_calls.fetch_add(1, Ordering::SeqCst);
        self.sign("PUT", key, ttl_minutes)
    }

    async fn sign_get(
        &self,
        key: &ObjectKey,
        ttl_minutes: u32,
        _response_cache_control: &str,
    ) -> Result<PresignedUrl, GatewayError> {
        self.sign_get_calls.fetch_add(1, Ordering::SeqCst);
        self.sign("GET", key, ttl_minutes)
    }
}

#[async_trait::async_trait]
impl ObjectProbe for MemoryStorage {
    async fn exists(&self, key: &ObjectKey) -> Result<bool, GatewayError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.contains(key).await)
    }
}

#[async_trait::async_trait]
impl ObjectDeleter for MemoryStorage {
    async fn delete(&self, key: &ObjectKey) -> Result<(), GatewayError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.objects.write().await.remove(key.as_str());
        Ok(())
    }
}
