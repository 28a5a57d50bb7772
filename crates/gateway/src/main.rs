//! # File Gateway サーバー
//!
//! 環境変数から設定を読み込み、ストレージとキャッシュを組み立ててHTTPサーバーを起動する。

use std::sync::Arc;

use file_gateway::cache::{MokaCacheStore, UrlCache};
use file_gateway::config::{self, GatewayConfig, GatewayState, StorageBackend};
use file_gateway::endpoints;
use file_gateway::storage::{MemoryStorage, StorageCapabilities};
use file_gateway::FileGateway;
use tracing_subscriber::EnvFilter;

/// 設定に応じたストレージバックエンドを構築する。
fn build_storage(config: &GatewayConfig) -> anyhow::Result<StorageCapabilities> {
    match config.backend {
        #[cfg(feature = "vendor-aws")]
        StorageBackend::S3 => {
            let storage = file_gateway::storage::S3Storage::from_settings(&config.s3)?;
            Ok(StorageCapabilities::from_backend(Arc::new(storage)))
        }
        #[cfg(not(feature = "vendor-aws"))]
        StorageBackend::S3 => {
            anyhow::bail!("S3バックエンドは vendor-aws feature なしでビルドされています")
        }
        StorageBackend::Memory => {
            tracing::warn!("インメモリストレージで起動します（開発環境用）");
            Ok(StorageCapabilities::from_backend(Arc::new(
                MemoryStorage::new(config.s3.bucket.clone()),
            )))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    config.log_summary();

    let storage = build_storage(&config)?;
    let cache = UrlCache::new(
        Arc::new(MokaCacheStore::new(config.cache_capacity)),
        config.cache_namespace.clone(),
    );
    let gateway = FileGateway::new(&config, storage, cache);

    let addr = config::listen_addr(&config)?;
    let app = endpoints::router(Arc::new(GatewayState { gateway, config }));

    tracing::info!("File Gatewayを {} で起動します", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
