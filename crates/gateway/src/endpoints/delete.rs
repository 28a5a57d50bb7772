//! # DELETE /files
//!
//! ファイル削除。存在しないキーの削除も成功として扱う。

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use file_types::*;

use crate::config::GatewayState;
use crate::error::GatewayError;

/// DELETE /files?key=... — ファイル削除。成功時は 204 No Content。
pub async fn handle_delete(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<DeleteFileQuery>,
) -> Result<StatusCode, GatewayError> {
    state.gateway.delete(&query.key).await?;
    Ok(StatusCode::NO_CONTENT)
}
