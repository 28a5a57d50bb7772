//! # GET /.well-known/file-gateway-info
//!
//! 公開設定情報。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use file_types::*;

use crate::config::GatewayState;

/// GET /.well-known/file-gateway-info — 公開設定情報。
///
/// 管理画面がアップロード前に許可形式を確認するために使う。認証情報は含めない。
pub async fn handle_gateway_info(State(state): State<Arc<GatewayState>>) -> Json<GatewayInfo> {
    let config = &state.config;
    Json(GatewayInfo {
        allowed_extensions: state
            .gateway
            .allowed_types()
            .iter()
            .map(str::to_string)
            .collect(),
        max_cache_lifetime_minutes: config.max_cache_lifetime_minutes,
        safety_margin_minutes: config.safety_margin_minutes,
        default_upload_ttl_minutes: config.default_upload_ttl_minutes,
        default_download_ttl_minutes: config.default_download_ttl_minutes,
    })
}
