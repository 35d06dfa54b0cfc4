/// 訪問先抽出
///
/// ソースデータからGeminiへのリクエストを組み立て、
/// 構造化出力を`ExtractionOutput`に変換する。
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::domain::prompt::{RESPONSE_MIME_TYPE, SAFETY_CATEGORIES, SAFETY_THRESHOLD};
use crate::domain::{
    analysis_response_schema, AnalysisResult, ExtractionOutput, SourceData, TokenUsage,
    DEFAULT_MODEL_NAME, SYSTEM_PROMPT,
};
use crate::infrastructure::gemini_client::{
    Content, ContentGenerator, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    SafetySetting,
};
use crate::infrastructure::GeminiError;

/// ログに載せるモデル出力の最大文字数
const MAX_LOGGED_OUTPUT_CHARS: usize = 500;

/// 抽出処理のエラー型
#[derive(Debug, Error)]
pub enum ExtractError {
    /// ユーザーコンテンツの組み立てに失敗
    #[error("ユーザーコンテンツの生成に失敗: {0}")]
    UserContent(#[from] serde_json::Error),

    /// Gemini API呼び出しの失敗
    #[error("Gemini API呼び出しに失敗: {0}")]
    Generation(#[from] GeminiError),

    /// 応答本文がスキーマに合わない
    #[error("モデル出力がスキーマに一致しません: {reason}")]
    InvalidModelOutput { reason: String, raw: String },
}

/// 1回の呼び出しで使う抽出器
pub struct PlaceExtractor<'a, G>
where
    G: ContentGenerator,
{
    generator: &'a G,
    api_key: String,
    model_name: String,
}

impl<'a, G> PlaceExtractor<'a, G>
where
    G: ContentGenerator,
{
    /// 抽出器を作成（モデル名が空の場合はデフォルトモデル）
    pub fn new(generator: &'a G, api_key: impl Into<String>, model_name: &str) -> Self {
        let model_name = if model_name.trim().is_empty() {
            DEFAULT_MODEL_NAME.to_string()
        } else {
            model_name.trim().to_string()
        };

        Self {
            generator,
            api_key: api_key.into(),
            model_name,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// generateContentリクエストを組み立てる
    pub fn build_request(source: &SourceData) -> Result<GenerateContentRequest, ExtractError> {
        let user_content = source.to_user_content()?;

        Ok(GenerateContentRequest {
            system_instruction: Content::text(SYSTEM_PROMPT),
            contents: vec![Content::user(user_content)],
            generation_config: GenerationConfig {
                response_mime_type: RESPONSE_MIME_TYPE.to_string(),
                response_schema: analysis_response_schema(),
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: SAFETY_THRESHOLD.to_string(),
                })
                .collect(),
        })
    }

    /// 訪問先を抽出する
    ///
    /// # 戻り値
    /// - 応答本文がスキーマどおり: 解析結果とトークン使用量
    /// - 応答本文が空（安全フィルター等）: `AnalysisResult::empty_fallback()`
    /// - 応答本文がスキーマ不一致: `ExtractError::InvalidModelOutput`
    pub async fn extract(&self, source: &SourceData) -> Result<ExtractionOutput, ExtractError> {
        let request = Self::build_request(source)?;
        debug!(
            model = %self.model_name,
            has_transcript = source.has_transcript(),
            "Gemini分析リクエストを送信"
        );

        let response = self
            .generator
            .generate_content(&self.api_key, &self.model_name, &request)
            .await?;

        interpret_response(&response)
    }
}

/// generateContentの応答を抽出結果に変換する
pub fn interpret_response(
    response: &GenerateContentResponse,
) -> Result<ExtractionOutput, ExtractError> {
    let usage = response
        .usage_metadata
        .map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    let Some(text) = response.text() else {
        warn!(
            block_reason = response.block_reason().unwrap_or("(none)"),
            "Geminiの応答が空のため空の分析結果を返す"
        );
        return Ok(ExtractionOutput {
            result: AnalysisResult::empty_fallback(),
            usage,
        });
    };

    let result: AnalysisResult = serde_json::from_str(&text).map_err(|e| {
        error!(
            error = %e,
            output = %output_excerpt(&text),
            output_chars = text.chars().count(),
            "モデル出力を解析できません"
        );
        ExtractError::InvalidModelOutput {
            reason: e.to_string(),
            raw: text.clone(),
        }
    })?;

    Ok(ExtractionOutput { result, usage })
}

/// ログ用にモデル出力を先頭から切り詰める（文字単位）
fn output_excerpt(text: &str) -> String {
    match text.char_indices().nth(MAX_LOGGED_OUTPUT_CHARS) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_string(),
    }
}
