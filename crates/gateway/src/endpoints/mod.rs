//! # Gatewayエンドポイント
//!
//! 管理画面向けのHTTP API。各ハンドラは `FileGateway` の操作に1対1で対応する。
//!
//! ## API エンドポイント
//! - `POST /files/upload-url` — アップロード用署名付きURL発行
//! - `GET /files/download-url` — ダウンロード用署名付きURL発行
//! - `DELETE /files` — ファイル削除
//! - `GET /.well-known/file-gateway-info` — 公開設定情報

pub mod upload_url;
pub mod download_url;
pub mod delete;
pub mod gateway_info;


pub use upload_url::handle_upload_url;
pub use download_url::handle_download_url;
pub use delete::handle_delete;
pub use gateway_info::handle_gateway_info;

use std::sync::Arc;

use crate::config::GatewayState;

/// axumルーターを構築する。
pub fn router(state: Arc<GatewayState>) -> axum::Router {
    axum::Router::new()
        .route("/files/upload-url", axum::routing::post(handle_upload_url))
        .route("/files/download-url", axum::routing::get(handle_download_url))
        .route("/files", axum::routing::delete(handle_delete))
        .route(
            "/.well-known/file-gateway-info",
            axum::routing::get(handle_gateway_info),
        )
        .with_state(state)
}
