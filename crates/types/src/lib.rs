//! # File Gateway 共有型定義
//!
//! 管理画面向けエンドポイントのリクエスト/レスポンス構造体。
//! オブジェクトキーはすべて文字列のまま受け渡し、検証はGateway側で行う。

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// POST /files/upload-url
// ---------------------------------------------------------------------------

/// アップロード用署名付きURLの発行リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUrlRequest {
    /// アップロードするユーザー（またはエンティティ）のID
    pub owner_id: u64,
    /// 用途の名前空間（例: "foodimage", "avatar"）
    pub purpose: String,
    /// アップロードするファイルのMIMEタイプ
    pub content_type: String,
    /// 署名付きURLの有効期限（分）。省略時はGatewayのデフォルト値
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_minutes: Option<u32>,
}

/// アップロード用署名付きURLの発行結果。
///
/// URLとオブジェクトキーは独立したフィールドとして返す。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    /// クライアントがPUTするための署名付きURL
    pub upload_url: String,
    /// 生成されたオブジェクトキー（`{purpose}/{owner_id}/{random}.{ext}`）
    pub key: String,
    /// URL有効期限のUNIXタイムスタンプ（秒）
    pub expires_at: u64,
}

// ---------------------------------------------------------------------------
// GET /files/download-url
// ---------------------------------------------------------------------------

/// ダウンロード用署名付きURLの発行クエリ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadUrlQuery {
    /// 対象のオブジェクトキー
    pub key: String,
    /// 署名付きURLの有効期限（分）。省略時はGatewayのデフォルト値
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_minutes: Option<u32>,
}

/// ダウンロード用署名付きURLの発行結果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadUrlResponse {
    /// GET用の署名付きURL（キャッシュから返却される場合がある）
    pub download_url: String,
}

// ---------------------------------------------------------------------------
// DELETE /files
// ---------------------------------------------------------------------------

/// ファイル削除クエリ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteFileQuery {
    /// 削除するオブジェクトキー
    pub key: String,
}

// ---------------------------------------------------------------------------
// GET /.well-known/file-gateway-info
// ---------------------------------------------------------------------------

/// Gatewayの公開設定情報。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayInfo {
    /// アップロードを許可する拡張子
    pub allowed_extensions: Vec<String>,
    /// ダウンロードURLキャッシュの最大保持時間（分）
    pub max_cache_lifetime_minutes: u32,
    /// キャッシュしたURLに最低限残す有効期間（分）
    pub safety_margin_minutes: u32,
    /// アップロードURLのデフォルト有効期限（分）
    pub default_upload_ttl_minutes: u32,
    /// ダウンロードURLのデフォルト有効期限（分）
    pub default_download_ttl_minutes: u32,
}
