//! # POST /files/upload-url
//!
//! アップロード用の署名付きURL発行。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use file_types::*;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /files/upload-url — 署名付きURL発行。
///
/// URLと生成したオブジェクトキーを別々のフィールドで返す。
/// クライアントはアップロード完了後、このキーをドメインエンティティに記録する。
pub async fn handle_upload_url(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, GatewayError> {
    let ttl_minutes = body
        .ttl_minutes
        .unwrap_or(state.config.default_upload_ttl_minutes);

    let target = state
        .gateway
        .issue_upload_url(body.owner_id, &body.purpose, &body.content_type, ttl_minutes)
        .await?;

    Ok(Json(UploadUrlResponse {
        upload_url: target.url,
        key: target.key.into_string(),
        expires_at: target.expires_at,
    }))
}
