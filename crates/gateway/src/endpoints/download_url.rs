//! # GET /files/download-url
//!
//! ダウンロード用の署名付きURL発行。

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use file_types::*;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// GET /files/download-url?key=...&ttl_minutes=... — 署名付きURL発行。
pub async fn handle_download_url(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<DownloadUrlQuery>,
) -> Result<Json<DownloadUrlResponse>, GatewayError> {
    let ttl_minutes = query
        .ttl_minutes
        .unwrap_or(state.config.default_download_ttl_minutes);

    let download_url = state
        .gateway
        .issue_download_url(&query.key, ttl_minutes)
        .await?;

    Ok(Json(DownloadUrlResponse { download_url }))
}
