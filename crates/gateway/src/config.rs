//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 設定は起動時に一度だけ読み込み、以降は変更しない。

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::content_type::AllowedTypes;
use crate::gateway::FileGateway;
use crate::storage::MAX_PRESIGN_MINUTES;

/// ストレージバックエンドの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// S3互換ストレージ
    S3,
    /// インメモリ（ローカル開発用）
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("未知のストレージバックエンド: {other}（s3 または memory）"),
        }
    }
}

/// S3互換ストレージの接続設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    /// 内部通信用エンドポイント
    pub endpoint: String,
    /// クライアント向けエンドポイント（署名付きURL用）
    pub public_endpoint: Option<String>,
    /// 明示指定されたリージョン
    pub region: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

impl S3Settings {
    /// エンドポイントに対するリージョン名。
    ///
    /// 明示指定がなければAWS S3エンドポイント（s3.REGION.amazonaws.com）から検出し、
    /// Cloudflare R2 は "auto"、それ以外は us-east-1 とする。
    pub fn region_for(&self, endpoint: &str) -> String {
        if let Some(region) = &self.region {
            return region.clone();
        }
        if let Some(detected) = endpoint.find("s3.").and_then(|start| {
            let rest = &endpoint[start + 3..];
            rest.find(".amazonaws.com").map(|end| rest[..end].to_string())
        }) {
            return detected;
        }
        if endpoint.contains(".r2.cloudflarestorage.com") {
            return "auto".to_string();
        }
        "us-east-1".to_string()
    }
}

/// Gateway設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTPサーバーの待ち受けアドレス
    pub listen_addr: String,
    pub backend: StorageBackend,
    pub s3: S3Settings,
    /// アップロードを許可する拡張子
    pub allowed_types: AllowedTypes,
    /// URLキャッシュの名前空間
    pub cache_namespace: String,
    /// URLキャッシュの最大保持時間（分）
    pub max_cache_lifetime_minutes: u32,
    /// キャッシュしたURLに最低限残す有効期間（分）
    pub safety_margin_minutes: u32,
    /// URLキャッシュの最大エントリ数
    pub cache_capacity: u64,
    pub default_upload_ttl_minutes: u32,
    pub default_download_ttl_minutes: u32,
    /// ストレージ呼び出し1回あたりの待ち時間上限
    pub storage_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            backend: StorageBackend::S3,
            s3: S3Settings {
                endpoint: "http://localhost:9000".to_string(),
                public_endpoint: None,
                region: None,
                access_key: "minioadmin".to_string(),
                secret_key: "minioadmin".to_string(),
                bucket: "file-uploads".to_string(),
            },
            allowed_types: AllowedTypes::parse("jpg,png,gif,webp"),
            cache_namespace: "file-url-cache".to_string(),
            max_cache_lifetime_minutes: 30,
            safety_margin_minutes: 5,
            cache_capacity: 10_000,
            default_upload_ttl_minutes: 30,
            default_download_ttl_minutes: 60,
            storage_timeout: Duration::from_secs(10),
        }
    }
}

/// 数値などの設定値を読む。未設定ならデフォルト値。
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} の値が不正です ({raw}): {e}")),
        None => Ok(default),
    }
}

impl GatewayConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から構築する。未設定の項目はデフォルト値を使う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let string_or = |name: &str, default: String| lookup(name).unwrap_or(default);

        let config = Self {
            listen_addr: string_or("GATEWAY_LISTEN_ADDR", defaults.listen_addr),
            backend: parse_or(&lookup, "STORAGE_BACKEND", defaults.backend)?,
            s3: S3Settings {
                endpoint: string_or("S3_ENDPOINT", defaults.s3.endpoint),
                public_endpoint: lookup("S3_PUBLIC_ENDPOINT").filter(|s| !s.trim().is_empty()),
                region: lookup("S3_REGION").filter(|s| !s.trim().is_empty()),
                access_key: string_or("S3_ACCESS_KEY", defaults.s3.access_key),
                secret_key: string_or("S3_SECRET_KEY", defaults.s3.secret_key),
                bucket: string_or("S3_BUCKET", defaults.s3.bucket),
            },
            allowed_types: lookup("FILE_ALLOWED_TYPES")
                .map(|list| AllowedTypes::parse(&list))
                .unwrap_or(defaults.allowed_types),
            cache_namespace: string_or("FILE_URL_CACHE_NAMESPACE", defaults.cache_namespace),
            max_cache_lifetime_minutes: parse_or(
                &lookup,
                "FILE_URL_CACHE_MAX_MINUTES",
                defaults.max_cache_lifetime_minutes,
            )?,
            safety_margin_minutes: parse_or(
                &lookup,
                "FILE_URL_SAFETY_MARGIN_MINUTES",
                defaults.safety_margin_minutes,
            )?,
            cache_capacity: parse_or(&lookup, "FILE_URL_CACHE_CAPACITY", defaults.cache_capacity)?,
            default_upload_ttl_minutes: parse_or(
                &lookup,
                "UPLOAD_URL_TTL_MINUTES",
                defaults.default_upload_ttl_minutes,
            )?,
            default_download_ttl_minutes: parse_or(
                &lookup,
                "DOWNLOAD_URL_TTL_MINUTES",
                defaults.default_download_ttl_minutes,
            )?,
            storage_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STORAGE_TIMEOUT_SECS",
                defaults.storage_timeout.as_secs(),
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.allowed_types.is_empty() {
            anyhow::bail!("FILE_ALLOWED_TYPES が空です");
        }
        if self.s3.bucket.trim().is_empty() {
            anyhow::bail!("S3_BUCKET が空です");
        }
        if self.cache_namespace.trim().is_empty() {
            anyhow::bail!("FILE_URL_CACHE_NAMESPACE が空です");
        }
        for (name, ttl) in [
            ("UPLOAD_URL_TTL_MINUTES", self.default_upload_ttl_minutes),
            ("DOWNLOAD_URL_TTL_MINUTES", self.default_download_ttl_minutes),
        ] {
            if ttl == 0 || ttl > MAX_PRESIGN_MINUTES {
                anyhow::bail!("{name} は 1〜{MAX_PRESIGN_MINUTES} の範囲で指定してください: {ttl}");
            }
        }
        if self.safety_margin_minutes == 0 {
            // マージンがないとキャッシュしたURLが署名より長く残りうる
            anyhow::bail!("FILE_URL_SAFETY_MARGIN_MINUTES は1以上である必要があります");
        }
        if self.storage_timeout.is_zero() {
            anyhow::bail!("STORAGE_TIMEOUT_SECS は1以上である必要があります");
        }
        Ok(())
    }

    /// 起動時ログ用の要約（秘密情報を含まない）。
    pub fn log_summary(&self) {
        let allowed: Vec<&str> = self.allowed_types.iter().collect();
        tracing::info!(
            backend = ?self.backend,
            bucket = %self.s3.bucket,
            endpoint = %self.s3.endpoint,
            allowed_types = %allowed.join(","),
            cache_namespace = %self.cache_namespace,
            max_cache_lifetime_minutes = self.max_cache_lifetime_minutes,
            safety_margin_minutes = self.safety_margin_minutes,
            "Gateway設定を読み込みました"
        );
    }
}

/// Gatewayの共有状態。
pub struct GatewayState {
    /// 署名付きURLゲートウェイ
    pub gateway: FileGateway,
    /// 起動時に読み込んだ設定（デフォルトTTL等）
    pub config: GatewayConfig,
}

/// `SocketAddr` 形式の検証付きで待ち受けアドレスを返す。
pub fn listen_addr(config: &GatewayConfig) -> anyhow::Result<std::net::SocketAddr> {
    config
        .listen_addr
        .parse()
        .with_context(|| format!("GATEWAY_LISTEN_ADDR が不正です: {}", config.listen_addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.backend, StorageBackend::S3);
        assert_eq!(config.cache_namespace, "file-url-cache");
        assert_eq!(config.max_cache_lifetime_minutes, 30);
        assert_eq!(config.safety_margin_minutes, 5);
        assert!(config.allowed_types.is_allowed("webp"));
        assert_eq!(config.storage_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "Memory"),
            ("FILE_ALLOWED_TYPES", "png"),
            ("FILE_URL_CACHE_MAX_MINUTES", "10"),
            ("S3_PUBLIC_ENDPOINT", "https://files.example.com"),
            ("STORAGE_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert!(config.allowed_types.is_allowed("png"));
        assert!(!config.allowed_types.is_allowed("jpg"));
        assert_eq!(config.max_cache_lifetime_minutes, 10);
        assert_eq!(
            config.s3.public_endpoint.as_deref(),
            Some("https://files.example.com")
        );
        assert_eq!(config.storage_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for pairs in [
            [("FILE_URL_CACHE_MAX_MINUTES", "thirty")],
            [("FILE_ALLOWED_TYPES", " , ")],
            [("STORAGE_BACKEND", "gcs")],
            [("UPLOAD_URL_TTL_MINUTES", "0")],
            [("DOWNLOAD_URL_TTL_MINUTES", "20000")],
            [("STORAGE_TIMEOUT_SECS", "0")],
            [("FILE_URL_SAFETY_MARGIN_MINUTES", "0")],
        ] {
            assert!(
                GatewayConfig::from_lookup(lookup_from(&pairs)).is_err(),
                "{pairs:?} が受理されてしまった"
            );
        }
    }

    #[test]
    fn test_region_detection() {
        let mut s3 = GatewayConfig::default().s3;
        assert_eq!(s3.region_for("https://s3.ap-northeast-1.amazonaws.com"), "ap-northeast-1");
        assert_eq!(s3.region_for("https://acct.r2.cloudflarestorage.com"), "auto");
        assert_eq!(s3.region_for("http://localhost:9000"), "us-east-1");

        s3.region = Some("eu-west-1".to_string());
        assert_eq!(s3.region_for("https://s3.ap-northeast-1.amazonaws.com"), "eu-west-1");
    }

    #[test]
    fn test_listen_addr() {
        let config = GatewayConfig::default();
        assert_eq!(listen_addr(&config).unwrap().port(), 3000);
    }
}
