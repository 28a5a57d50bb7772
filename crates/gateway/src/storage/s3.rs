//! # S3互換ストレージ実装
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIを使用する。
//! 署名付きURLはクライアント向けエンドポイント、HEAD/DELETEは内部エンドポイントへ向ける。

use std::collections::HashMap;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use s3::error::S3Error;

use super::{expires_at, presign_seconds, ObjectDeleter, ObjectProbe, PresignedUrl, Signer};
use crate::config::S3Settings;
use crate::error::GatewayError;
use crate::naming::ObjectKey;

/// S3互換ストレージ。
pub struct S3Storage {
    /// 内部通信用バケット（HEAD/DELETE）
    bucket_internal: s3::Bucket,
    /// クライアント向けバケット（署名付きURL生成用）。
    /// Docker内部ホスト名と外部ホスト名が異なる場合に使用。
    /// Noneの場合はbucket_internalを使用する。
    bucket_public: Option<s3::Bucket>,
}

impl S3Storage {
    pub fn new(bucket_internal: s3::Bucket, bucket_public: Option<s3::Bucket>) -> Self {
        Self {
            bucket_internal,
            bucket_public,
        }
    }

    /// S3互換バケットを初期化する。
    fn init_bucket(settings: &S3Settings, endpoint: &str) -> anyhow::Result<s3::Bucket> {
        let region = s3::Region::Custom {
            region: settings.region_for(endpoint),
            endpoint: endpoint.to_string(),
        };

        let credentials = s3::creds::Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )?;

        let bucket = s3::Bucket::new(&settings.bucket, region, credentials)?.with_path_style();

        Ok(*bucket)
    }

    /// 設定から構築する。
    pub fn from_settings(settings: &S3Settings) -> anyhow::Result<Self> {
        let bucket_internal = Self::init_bucket(settings, &settings.endpoint)?;

        let bucket_public = settings
            .public_endpoint
            .as_deref()
            .map(|public_ep| {
                tracing::info!(
                    s3_public_endpoint = %public_ep,
                    "クライアント向けS3エンドポイントを設定"
                );
                Self::init_bucket(settings, public_ep)
            })
            .transpose()?;

        Ok(Self::new(bucket_internal, bucket_public))
    }

    fn signing_bucket(&self) -> &s3::Bucket {
        self.bucket_public.as_ref().unwrap_or(&self.bucket_internal)
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[async_trait::async_trait]
impl Signer for S3Storage {
    async fn sign_put(
        &self,
        key: &ObjectKey,
        content_type: &str,
        ttl_minutes: u32,
    ) -> Result<PresignedUrl, GatewayError> {
        let seconds = presign_seconds(ttl_minutes)?;
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(content_type)
            .map_err(|e| GatewayError::Validation(format!("Content-Typeが不正: {e}")))?;
        headers.insert(CONTENT_TYPE, value);

        let url = self
            .signing_bucket()
            .presign_put(key.as_str(), seconds, Some(headers), None)
            .await
            .map_err(|e| GatewayError::Storage(format!("署名付きアップロードURL生成失敗: {e}")))?;

        Ok(PresignedUrl {
            url,
            key: key.clone(),
            expires_at: expires_at(ttl_minutes)?,
        })
    }

    async fn sign_get(
        &self,
        key: &ObjectKey,
        ttl_minutes: u32,
        response_cache_control: &str,
    ) -> Result<PresignedUrl, GatewayError> {
        let seconds = presign_seconds(ttl_minutes)?;
        let mut queries = HashMap::new();
        queries.insert(
            "response-cache-control".to_string(),
            response_cache_control.to_string(),
        );

        let url = self
            .signing_bucket()
            .presign_get(key.as_str(), seconds, Some(queries))
            .await
            .map_err(|e| {
                GatewayError::Storage(format!("署名付きダウンロードURL生成失敗: {e}"))
            })?;

        Ok(PresignedUrl {
            url,
            key: key.clone(),
            expires_at: expires_at(ttl_minutes)?,
        })
    }
}

#[async_trait::async_trait]
impl ObjectProbe for S3Storage {
    async fn exists(&self, key: &ObjectKey) -> Result<bool, GatewayError> {
        match self.bucket_internal.head_object(key.as_str()).await {
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) if is_success(status) => Ok(true),
            Ok((_, status)) => Err(GatewayError::Storage(format!(
                "存在確認に失敗: HTTP {status} ({key})"
            ))),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(GatewayError::Storage(format!("存在確認に失敗: {e}"))),
        }
    }
}

#[async_trait::async_trait]
impl ObjectDeleter for S3Storage {
    async fn delete(&self, key: &ObjectKey) -> Result<(), GatewayError> {
        let response = self
            .bucket_internal
            .delete_object(key.as_str())
            .await
            .map_err(|e| GatewayError::Storage(format!("ファイル削除に失敗: {e}")))?;

        let status = response.status_code();
        if !is_success(status) {
            return Err(GatewayError::Storage(format!(
                "ファイル削除に失敗: HTTP {status} ({key})"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MAX_PRESIGN_MINUTES;

    fn settings(public_endpoint: Option<&str>) -> S3Settings {
        S3Settings {
            endpoint: "http://localhost:9000".to_string(),
            public_endpoint: public_endpoint.map(str::to_string),
            region: None,
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "file-uploads".to_string(),
        }
    }

    /// 署名はローカル計算のみで完結し、サーバーがなくても生成できることを確認
    #[tokio::test]
    async fn test_presign_put_is_local() {
        let storage = S3Storage::from_settings(&settings(None)).unwrap();
        let key = ObjectKey::parse("foodimage/42/abc.png").unwrap();

        let signed = storage.sign_put(&key, "image/png", 30).await.unwrap();
        assert!(signed.url.starts_with("http://localhost:9000"));
        assert!(signed.url.contains("/file-uploads/foodimage/42/abc.png?"));
        assert!(signed.url.contains("X-Amz-Signature="));
        assert!(signed.url.contains("X-Amz-Expires=1800"));
        assert_eq!(signed.key, key);
    }

    #[tokio::test]
    async fn test_presign_rejects_out_of_range_ttl() {
        let storage = S3Storage::from_settings(&settings(None)).unwrap();
        let key = ObjectKey::parse("foodimage/42/abc.png").unwrap();

        for ttl in [0, MAX_PRESIGN_MINUTES + 1, 80_000, u32::MAX] {
            let err = storage.sign_put(&key, "image/png", ttl).await.unwrap_err();
            assert!(matches!(err, GatewayError::Validation(_)), "{ttl}");
            let err = storage.sign_get(&key, ttl, "no-cache").await.unwrap_err();
            assert!(matches!(err, GatewayError::Validation(_)), "{ttl}");
        }

        let signed = storage
            .sign_get(&key, MAX_PRESIGN_MINUTES, "no-cache")
            .await
            .unwrap();
        assert!(signed.url.contains("X-Amz-Expires=604800"));
    }

    #[tokio::test]
    async fn test_presign_get_uses_public_endpoint_and_cache_control() {
        let storage =
            S3Storage::from_settings(&settings(Some("https://files.example.com"))).unwrap();
        let key = ObjectKey::parse("foodimage/42/abc.png").unwrap();

        let signed = storage
            .sign_get(&key, 60, "public, max-age=86400")
            .await
            .unwrap();
        assert!(signed.url.starts_with("https://files.example.com"));
        assert!(signed.url.contains("response-cache-control="));
        assert!(signed.url.contains("X-Amz-Expires=3600"));
    }
}
