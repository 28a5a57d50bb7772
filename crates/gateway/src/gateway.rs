//! # FileGateway
//!
//! 署名付きURLの発行とファイル削除のオーケストレーション。
//!
//! ## 操作
//! - `issue_upload_url`: MIMEタイプ検証 → キー生成 → PUT署名
//! - `issue_download_url`: キャッシュ参照 → 存在確認 → GET署名 → キャッシュ書き込み
//! - `delete`: 存在確認 → 削除 → キャッシュ削除
//!
//! キャッシュ以外に状態を持たないため、`Arc` で共有して並行に呼び出してよい。
//! ストレージ呼び出しは各1回のみで、内部でリトライはしない。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::UrlCache;
use crate::config::GatewayConfig;
use crate::content_type::{self, AllowedTypes};
use crate::error::GatewayError;
use crate::naming::{self, ObjectKey};
use crate::storage::{StorageCapabilities, MAX_PRESIGN_MINUTES};

/// ダウンロードURLのレスポンスに付与するCache-Control。
pub const DOWNLOAD_CACHE_CONTROL: &str = "public, max-age=86400";

/// アップロードURLの発行結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub url: String,
    pub key: ObjectKey,
    pub expires_at: u64,
}

/// キャッシュに載せてよいTTL（分）。
///
/// 署名の有効期限から安全マージンを引き、キャッシュの最大保持時間で頭打ちにする。
/// 0以下になる場合は `None`（キャッシュしない）。
pub fn safe_cache_ttl_minutes(
    ttl_minutes: u32,
    safety_margin_minutes: u32,
    max_cache_lifetime_minutes: u32,
) -> Option<u32> {
    let remaining = i64::from(ttl_minutes) - i64::from(safety_margin_minutes);
    let capped = remaining.min(i64::from(max_cache_lifetime_minutes));
    u32::try_from(capped).ok().filter(|ttl| *ttl > 0)
}

/// 署名付きURLゲートウェイ。
#[derive(Clone)]
pub struct FileGateway {
    storage: StorageCapabilities,
    cache: UrlCache,
    allowed_types: Arc<AllowedTypes>,
    safety_margin_minutes: u32,
    max_cache_lifetime_minutes: u32,
    storage_timeout: Duration,
}

impl FileGateway {
    pub fn new(config: &GatewayConfig, storage: StorageCapabilities, cache: UrlCache) -> Self {
        Self {
            storage,
            cache,
            allowed_types: Arc::new(config.allowed_types.clone()),
            safety_margin_minutes: config.safety_margin_minutes,
            max_cache_lifetime_minutes: config.max_cache_lifetime_minutes,
            storage_timeout: config.storage_timeout,
        }
    }

    pub fn allowed_types(&self) -> &AllowedTypes {
        &self.allowed_types
    }

    /// アップロード用の署名付きURLと、新しく割り当てたオブジェクトキーを返す。
    pub async fn issue_upload_url(
        &self,
        owner_id: u64,
        purpose: &str,
        content_type: &str,
        ttl_minutes: u32,
    ) -> Result<UploadTarget, GatewayError> {
        let purpose = validate_purpose(purpose)?;
        validate_ttl(ttl_minutes)?;

        let extension = content_type::extension_for(content_type)
            .filter(|ext| self.allowed_types.is_allowed(ext))
            .ok_or_else(|| {
                let allowed: Vec<&str> = self.allowed_types.iter().collect();
                GatewayError::InvalidFileType(format!(
                    "{content_type}（許可されている形式: {}）",
                    allowed.join(",")
                ))
            })?;

        let key = naming::new_key(owner_id, purpose, extension);
        // 署名する値はクライアントが送るヘッダーと一致させる（大文字小文字も含む）
        let content_type = content_type.trim();
        let signed = self
            .bounded(self.storage.signer.sign_put(&key, content_type, ttl_minutes))
            .await?;

        tracing::debug!(key = %key, owner_id, ttl_minutes, "アップロードURLを発行");

        Ok(UploadTarget {
            url: signed.url,
            key,
            expires_at: signed.expires_at,
        })
    }

    /// ダウンロード用の署名付きURLを返す。キャッシュにあればそれを返す。
    pub async fn issue_download_url(
        &self,
        key: &str,
        ttl_minutes: u32,
    ) -> Result<String, GatewayError> {
        let key = ObjectKey::parse(key)?;
        validate_ttl(ttl_minutes)?;

        let generation = self.cache.generation();
        if let Some(url) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "キャッシュ済みのダウンロードURLを返却");
            return Ok(url);
        }

        if !self.bounded(self.storage.probe.exists(&key)).await? {
            return Err(GatewayError::NotFound(key.into_string()));
        }

        let signed = self
            .bounded(
                self.storage
                    .signer
                    .sign_get(&key, ttl_minutes, DOWNLOAD_CACHE_CONTROL),
            )
            .await?;

        match safe_cache_ttl_minutes(
            ttl_minutes,
            self.safety_margin_minutes,
            self.max_cache_lifetime_minutes,
        ) {
            Some(cache_ttl) => {
                self.cache.put(
                    &key,
                    signed.url.clone(),
                    Duration::from_secs(u64::from(cache_ttl) * 60),
                    generation,
                );
            }
            None => {
                tracing::debug!(key = %key, ttl_minutes, "有効期限が短いためキャッシュしない");
            }
        }

        tracing::debug!(key = %key, ttl_minutes, "ダウンロードURLを発行");
        Ok(signed.url)
    }

    /// オブジェクトを削除する。存在しなければ何もせず成功する。
    ///
    /// 戻った時点でキャッシュエントリは削除済み。
    /// 削除に失敗した場合はキャッシュにも触れない。
    pub async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let key = ObjectKey::parse(key)?;

        if !self.bounded(self.storage.probe.exists(&key)).await? {
            // 帯域外で消えたオブジェクトの古いURLを残さない
            self.cache.evict(&key).await;
            tracing::debug!(key = %key, "削除対象が存在しないためスキップ");
            return Ok(());
        }

        self.bounded(self.storage.deleter.delete(&key)).await?;
        self.cache.evict(&key).await;

        tracing::info!(key = %key, "ファイルを削除");
        Ok(())
    }

    /// ストレージ呼び出しに待ち時間の上限を設ける。
    /// 打ち切った場合もキャッシュは変更されない。
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.storage_timeout, call)
            .await
            .map_err(|_| {
                GatewayError::Storage(format!(
                    "ストレージ応答が{}秒以内に返りませんでした",
                    self.storage_timeout.as_secs_f32()
                ))
            })?
    }
}

fn validate_purpose(purpose: &str) -> Result<&str, GatewayError> {
    let purpose = purpose.trim();
    if purpose.is_empty() {
        return Err(GatewayError::Validation("用途（purpose）を空にすることはできません".to_string()));
    }
    if purpose.contains('/') {
        return Err(GatewayError::Validation(format!(
            "用途（purpose）に '/' は使えません: {purpose}"
        )));
    }
    Ok(purpose)
}

fn validate_ttl(ttl_minutes: u32) -> Result<(), GatewayError> {
    if ttl_minutes == 0 || ttl_minutes > MAX_PRESIGN_MINUTES {
        return Err(GatewayError::Validation(format!(
            "有効期限は 1〜{MAX_PRESIGN_MINUTES} 分で指定してください: {ttl_minutes}"
        )));
    }
    Ok(())
}
