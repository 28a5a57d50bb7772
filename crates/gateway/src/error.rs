//! # Gateway エラー型
//!
//! 呼び出し元へ返すエラーの分類とHTTPステータスへの対応。
//! キャッシュ層のエラーはここに含めない（`cache::CacheError` 参照）。

use axum::http::StatusCode;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 対応表にないMIMEタイプ、または許可リストにない拡張子
    #[error("サポートされていないファイル形式: {0}")]
    InvalidFileType(String),
    /// 空のキーなど入力値が不正
    #[error("不正な入力: {0}")]
    Validation(String),
    /// オブジェクトが存在しない
    #[error("ファイルが存在しません: {0}")]
    NotFound(String),
    /// ストレージ操作に失敗（"存在しない"以外のすべて）
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GatewayError::InvalidFileType(_) | GatewayError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Storage(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GatewayError::InvalidFileType("application/pdf".into()), StatusCode::BAD_REQUEST),
            (GatewayError::Validation("key".into()), StatusCode::BAD_REQUEST),
            (GatewayError::NotFound("a/1/b.png".into()), StatusCode::NOT_FOUND),
            (GatewayError::Storage("HEAD 503".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (GatewayError::Internal("clock".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
