//! # File Gateway
//!
//! S3互換オブジェクトストレージへの署名付きURLを発行するゲートウェイ。
//!
//! ## 役割
//! - アップロード用署名付きURL（PUT）の発行とオブジェクトキーの割り当て
//! - MIMEタイプと拡張子許可リストによるアップロード形式の制限
//! - ダウンロード用署名付きURL（GET）の発行とキャッシュ
//! - 冪等なファイル削除
//!
//! キャッシュしたURLは、署名の有効期限より安全マージン分だけ早く失効させる。

pub mod cache;
pub mod config;
pub mod content_type;
pub mod endpoints;
pub mod error;
pub mod gateway;
pub mod naming;
pub mod storage;

pub use config::{GatewayConfig, GatewayState};
pub use error::GatewayError;
pub use gateway::{FileGateway, UploadTarget};
pub use naming::ObjectKey;
