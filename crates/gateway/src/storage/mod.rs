//! # オブジェクトストレージ
//!
//! 署名付きURL生成・存在確認・削除の3つの能力を個別のトレイトとして定義する。
//! Gatewayはこれらのトレイト越しにのみストレージへアクセスする。
//!
//! ## 実装
//! - `S3Storage`: S3互換ストレージ（AWS S3, MinIO, Cloudflare R2等）
//! - `MemoryStorage`: インメモリ実装（ローカル開発・テスト用）

#[cfg(feature = "vendor-aws")]
pub mod s3;
pub mod memory;

#[cfg(feature = "vendor-aws")]
pub use s3::S3Storage;
pub use memory::MemoryStorage;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::GatewayError;
use crate::naming::ObjectKey;

/// 署名付きURLの最大有効期限（分）。S3のSigV4署名は7日が上限。
pub const MAX_PRESIGN_MINUTES: u32 = 7 * 24 * 60;

/// 署名付きURL。生成後は変更しない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// 署名付きURL本体
    pub url: String,
    /// 署名対象のオブジェクトキー
    pub key: ObjectKey,
    /// 有効期限のUNIXタイムスタンプ（秒）
    pub expires_at: u64,
}

/// 署名付きURLを生成する能力。
///
/// 署名は認証情報を使ったローカル計算であり、ストレージへの通信は発生しない。
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
    /// PUT用の署名付きURLを生成する。`content_type` も署名対象に含める。
    async fn sign_put(
        &self,
        key: &ObjectKey,
        content_type: &str,
        ttl_minutes: u32,
    ) -> Result<PresignedUrl, GatewayError>;

    /// GET用の署名付きURLを生成する。
    /// `response_cache_control` はレスポンスのCache-Controlヘッダを上書きする。
    async fn sign_get(
        &self,
        key: &ObjectKey,
        ttl_minutes: u32,
        response_cache_control: &str,
    ) -> Result<PresignedUrl, GatewayError>;
}

/// オブジェクトの存在を確認する能力（本体の転送なし）。
#[async_trait::async_trait]
pub trait ObjectProbe: Send + Sync {
    /// 存在すれば `true`、存在しなければ `false`。それ以外の失敗は `Storage`。
    async fn exists(&self, key: &ObjectKey) -> Result<bool, GatewayError>;
}

/// オブジェクトを削除する能力。
#[async_trait::async_trait]
pub trait ObjectDeleter: Send + Sync {
    async fn delete(&self, key: &ObjectKey) -> Result<(), GatewayError>;
}

/// Gatewayが使うストレージ能力一式。
#[derive(Clone)]
pub struct StorageCapabilities {
    pub signer: Arc<dyn Signer>,
    pub probe: Arc<dyn ObjectProbe>,
    pub deleter: Arc<dyn ObjectDeleter>,
}

impl StorageCapabilities {
    /// 3つの能力をすべて実装する単一のバックエンドから構築する。
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: Signer + ObjectProbe + ObjectDeleter + 'static,
    {
        Self {
            signer: backend.clone(),
            probe: backend.clone(),
            deleter: backend,
        }
    }
}

/// 署名の有効期間（秒）。1〜`MAX_PRESIGN_MINUTES` 分の範囲外は拒否する。
pub(crate) fn presign_seconds(ttl_minutes: u32) -> Result<u32, GatewayError> {
    if ttl_minutes == 0 || ttl_minutes > MAX_PRESIGN_MINUTES {
        return Err(GatewayError::Validation(format!(
            "有効期限は 1〜{MAX_PRESIGN_MINUTES} 分で指定してください: {ttl_minutes}"
        )));
    }
    ttl_minutes
        .checked_mul(60)
        .ok_or_else(|| GatewayError::Validation(format!("有効期限が大きすぎます: {ttl_minutes}")))
}

/// 現在時刻から `ttl_minutes` 後のUNIXタイムスタンプ（秒）。
pub(crate) fn expires_at(ttl_minutes: u32) -> Result<u64, GatewayError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| GatewayError::Internal(format!("時刻取得失敗: {e}")))?
        .as_secs();
    Ok(now + u64::from(ttl_minutes) * 60)
}
