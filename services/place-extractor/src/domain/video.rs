// 動画IDとS3オブジェクトキー
//
// 1つの動画に関するオブジェクトはすべて`{video_id}/`プレフィックス配下に置く。

use thiserror::Error;

/// 入力ソースのファイル名
pub const SOURCE_OBJECT_NAME: &str = "source.json";

/// 抽出結果のファイル名
pub const EXTRACTED_OBJECT_NAME: &str = "extracted.json";

/// 動画IDの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VideoIdError {
    /// 空または空白のみ
    #[error("video_idが空です")]
    Empty,
    /// プレフィックスを壊す文字を含む
    #[error("video_idに使用できない文字が含まれています: {0}")]
    InvalidCharacter(String),
}

/// 検証済みの動画ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// 文字列から動画IDを作成する
    ///
    /// 前後の空白は除去する。空文字と`/`を含む値は拒否する。
    pub fn parse(value: &str) -> Result<Self, VideoIdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(VideoIdError::Empty);
        }
        if trimmed.contains('/') {
            return Err(VideoIdError::InvalidCharacter(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{video_id}/source.json`
    pub fn source_key(&self) -> String {
        format!("{}/{}", self.0, SOURCE_OBJECT_NAME)
    }

    /// `{video_id}/extracted.json`
    pub fn extracted_key(&self) -> String {
        format!("{}/{}", self.0, EXTRACTED_OBJECT_NAME)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
