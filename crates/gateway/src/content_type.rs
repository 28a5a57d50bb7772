//! # コンテンツタイプ検証
//!
//! MIMEタイプから拡張子への固定対応表と、設定で与える拡張子の許可リスト。
//! 対応表で拡張子が決まっても、許可リストに含まれなければ拒否する。

use std::collections::BTreeSet;

/// MIMEタイプ → 拡張子の対応表。ここにないMIMEタイプはすべて拒否する。
const CONTENT_TYPE_TABLE: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// MIMEタイプに対応する拡張子を返す（大文字小文字は区別しない）。
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let normalized = content_type.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return None;
    }
    CONTENT_TYPE_TABLE
        .iter()
        .find(|(mime, _)| *mime == normalized)
        .map(|(_, ext)| *ext)
}

/// アップロードを許可する拡張子の集合。起動時に一度だけ構築する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedTypes {
    extensions: BTreeSet<String>,
}

impl AllowedTypes {
    /// カンマ区切りの拡張子リスト（例: `"jpg,png,gif,webp"`）から構築する。
    /// 空要素は無視し、すべて小文字に正規化する。
    pub fn parse(list: &str) -> Self {
        let extensions = list
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn is_allowed(&self, extension: &str) -> bool {
        self.extensions.contains(&extension.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}
