// 分析対象のソースデータ
//
// S3の`{video_id}/source.json`に保存されている動画メタデータと字幕を表し、
// Geminiに渡すユーザーコンテンツへの変換を担う。

use serde::{Deserialize, Serialize};

/// 字幕が存在しない場合にtranscriptへ埋める文字列
pub const NO_TRANSCRIPT_PLACEHOLDER: &str = "(자막 없음)";

/// 動画の基本情報
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    /// 動画タイトル
    pub title: String,
    /// 動画の説明文
    pub description: String,
}

/// source.jsonの内容
///
/// 上流の収集処理によってフィールドが欠落・nullになることがあるため、
/// 全フィールドをデフォルト値で補完してデシリアライズする。
/// 未知のフィールドは無視する。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceData {
    /// 動画の基本情報
    #[serde(deserialize_with = "null_as_default")]
    pub video_info: VideoInfo,
    /// 固定コメント
    pub pinned_comment: Option<String>,
    /// 前処理済みの字幕テキスト
    pub processed_transcript: Option<String>,
}

/// Geminiへ送るユーザーコンテンツ（キー順序を固定するため専用構造体にする）
#[derive(Debug, Serialize)]
struct UserContent<'a> {
    title: &'a str,
    description: &'a str,
    pinned_comment: &'a str,
    transcript: &'a str,
}

impl SourceData {
    /// Geminiに渡すユーザーコンテンツを生成する
    ///
    /// title / description / pinned_comment / transcript の4キーを持つ
    /// 2スペースインデントのJSON文字列を返す。非ASCII文字はエスケープしない。
    ///
    /// - pinned_commentが無い（null・空文字含む）場合は空文字
    /// - transcriptが無い場合は`(자막 없음)`
    pub fn to_user_content(&self) -> Result<String, serde_json::Error> {
        let pinned_comment = non_empty(self.pinned_comment.as_deref()).unwrap_or("");
        let transcript =
            non_empty(self.processed_transcript.as_deref()).unwrap_or(NO_TRANSCRIPT_PLACEHOLDER);

        let content = UserContent {
            title: &self.video_info.title,
            description: &self.video_info.description,
            pinned_comment,
            transcript,
        };

        serde_json::to_string_pretty(&content)
    }

    /// 字幕が利用可能かどうか
    pub fn has_transcript(&self) -> bool {
        non_empty(self.processed_transcript.as_deref()).is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// `"video_info": null` をデフォルト値として扱う
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
