// Lambda呼び出しの入出力

use serde::{Deserialize, Serialize};

/// Lambda呼び出しイベント
///
/// `video_id`以外のフィールドは無視する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InvocationEvent {
    #[serde(default)]
    pub video_id: Option<String>,
}

/// 正常終了時のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub video_id: String,
    /// 保存した抽出結果のS3キー
    pub s3_key: String,
}

impl InvocationResponse {
    pub fn ok(video_id: impl Into<String>, s3_key: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            video_id: video_id.into(),
            s3_key: s3_key.into(),
        }
    }
}
