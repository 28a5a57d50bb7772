//! # オブジェクトキー
//!
//! `{purpose}/{owner_id}/{random}.{extension}` 形式のキー生成。
//! 用途とオーナー単位でプレフィックス一覧・一括削除ができる構造を保つ。

use std::fmt;

use crate::error::GatewayError;

/// バケット内でオブジェクトを一意に識別するキー。
///
/// 空白のみのキーは構築できない。生成後は変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// 外部から受け取ったキー文字列を検証して構築する。
    pub fn parse(raw: impl Into<String>) -> Result<Self, GatewayError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(GatewayError::Validation(
                "ファイル名（キー）を空にすることはできません".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 末尾の拡張子（`.` 以降）。
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.0.rsplit('/').next()?;
        file_name.rsplit_once('.').map(|(_, ext)| ext)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 新しいオブジェクトキーを生成する。
///
/// ランダム部は128ビットのUUIDv4を区切りなしの16進32文字で表したもの。
/// `purpose` と `extension` は呼び出し側で検証済みであること。
pub fn new_key(owner_id: u64, purpose: &str, extension: &str) -> ObjectKey {
    let random = uuid::Uuid::new_v4().simple();
    ObjectKey(format!("{purpose}/{owner_id}/{random}.{extension}"))
}
