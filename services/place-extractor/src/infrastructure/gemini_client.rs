// GeminiClient - Gemini generateContent APIクライアント
//
// `models/{model}:generateContent`に構造化出力リクエストを送信する。
// 一時的なエラー（5xx, 429, タイムアウト）は指数バックオフで再試行する。

use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument};
use url::Url;

use super::config::generate_content_url;

/// 最大再試行回数
const MAX_RETRIES: u32 = 3;

/// リクエストタイムアウト（秒）
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// 接続タイムアウト（秒）
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// APIキーを渡すヘッダー
const API_KEY_HEADER: &str = "x-goog-api-key";

/// GeminiClient用エラー型
#[derive(Debug, Error)]
pub enum GeminiError {
    /// HTTPクライアントの構築に失敗
    #[error("HTTPクライアント構築エラー: {0}")]
    ClientBuild(String),

    /// HTTPエラー（ステータスコード付き）
    #[error("HTTPエラー: status={status}, message={message}")]
    HttpError { status: u16, message: String },

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    NetworkError(String),

    /// 再試行回数超過エラー
    #[error("再試行回数超過: {0}")]
    RetryExhausted(String),

    /// シリアライズエラー
    #[error("シリアライズエラー: {0}")]
    Serialize(String),

    /// レスポンスの解析に失敗
    #[error("レスポンス解析エラー: {0}")]
    Deserialize(String),
}

// ==================== ワイヤー型 ====================

/// テキストパート
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// 会話の1ターン（またはシステム指示）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

impl Content {
    /// ロールなしのテキストコンテンツ（systemInstruction用）
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }

    /// ユーザーターンのテキストコンテンツ
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            ..Self::text(text)
        }
    }
}

/// 生成設定
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

/// 安全フィルター設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// generateContentリクエスト
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

/// 候補
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

/// トークン使用量メタデータ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageMetadata {
    pub prompt_token_count: u64,
    pub candidates_token_count: u64,
}

/// プロンプトに対するフィードバック（ブロック理由など）
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

/// generateContentレスポンス
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// 先頭候補のテキストを連結して返す（空の場合はNone）
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// 応答が空になった理由（プロンプトのブロック理由、または候補の終了理由）
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
            .or_else(|| {
                self.candidates
                    .first()
                    .and_then(|c| c.finish_reason.as_deref())
            })
    }
}

/// エラーレスポンス本文（`{"error": {"code", "message", "status"}}`）
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// エラーレスポンス本文から人間が読めるメッセージを取り出す
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.status.is_empty() => {
            format!("{}: {}", envelope.error.status, envelope.error.message)
        }
        Ok(envelope) => envelope.error.message,
        Err(_) => body.to_string(),
    }
}

// ==================== クライアント ====================

/// コンテンツ生成トレイト（テスト用の抽象化）
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError>;
}

/// Gemini REST APIクライアント
#[derive(Clone)]
pub struct GeminiClient {
    /// HTTPクライアント（再試行ミドルウェア付き）
    client: ClientWithMiddleware,
    base_url: Url,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// ベースURLからクライアントを作成
    pub fn new(base_url: Url) -> Result<Self, GeminiError> {
        Self::with_retry_policy(
            base_url,
            ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES),
        )
    }

    /// 再試行ポリシーを指定してクライアントを作成
    pub fn with_retry_policy(
        base_url: Url,
        retry_policy: ExponentialBackoff,
    ) -> Result<Self, GeminiError> {
        info!(base_url = %base_url, "GeminiClientを初期化");

        let base_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GeminiError::ClientBuild(e.to_string()))?;

        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    #[instrument(skip(self, api_key, request))]
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = generate_content_url(&self.base_url, model);
        debug!(url = %url, "generateContentを呼び出し");

        let body =
            serde_json::to_string(request).map_err(|e| GeminiError::Serialize(e.to_string()))?;

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "generateContentリクエスト失敗");
                if e.is_timeout() || e.is_connect() {
                    GeminiError::NetworkError(e.to_string())
                } else {
                    GeminiError::RetryExhausted(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GeminiError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&text);
            error!(status = %status, message = %message, "generateContentエラー");
            return Err(GeminiError::HttpError {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "generateContentレスポンスの解析に失敗");
            GeminiError::Deserialize(e.to_string())
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// テスト用のContentGenerator
    ///
    /// 受け取ったリクエストを記録し、あらかじめ設定した応答を返す。
    #[derive(Clone)]
    pub struct MockContentGenerator {
        response: Arc<Mutex<Option<Result<GenerateContentResponse, String>>>>,
        pub requests: Arc<Mutex<Vec<(String, String, GenerateContentRequest)>>>,
    }

    impl MockContentGenerator {
        pub fn returning(response: GenerateContentResponse) -> Self {
            Self {
                response: Arc::new(Mutex::new(Some(Ok(response)))),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// JSON値から応答を作る
        pub fn returning_json(value: Value) -> Self {
            Self::returning(serde_json::from_value(value).expect("レスポンスJSONが不正"))
        }

        pub fn failing(message: &str) -> Self {
            Self {
                response: Arc::new(Mutex::new(Some(Err(message.to_string())))),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ContentGenerator for MockContentGenerator {
        async fn generate_content(
            &self,
            api_key: &str,
            model: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse, GeminiError> {
            self.requests.lock().unwrap().push((
                api_key.to_string(),
                model.to_string(),
                request.clone(),
            ));

            match self.response.lock().unwrap().clone() {
                Some(Ok(response)) => Ok(response),
                Some(Err(message)) => Err(GeminiError::HttpError {
                    status: 500,
                    message,
                }),
                None => Err(GeminiError::NetworkError("no response".to_string())),
            }
        }
    }

    fn sample_request() -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Content::text("system"),
            contents: vec![Content::user("hello")],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: json!({ "type": "OBJECT" }),
            },
            safety_settings: vec![SafetySetting {
                category: "HARM_CATEGORY_HARASSMENT".to_string(),
                threshold: "BLOCK_ONLY_HIGH".to_string(),
            }],
        }
    }

    // ==================== リクエスト シリアライズ テスト ====================

    #[test]
    fn test_request_uses_camel_case() {
        let value = serde_json::to_value(sample_request()).unwrap();

        assert_eq!(
            value,
            json!({
                "systemInstruction": { "parts": [{ "text": "system" }] },
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": { "type": "OBJECT" }
                },
                "safetySettings": [
                    { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_ONLY_HIGH" }
                ]
            })
        );
    }

    // ==================== レスポンス解析 テスト ====================

    #[test]
    fn test_response_text_and_usage() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "{\"summary\":" }, { "text": "\"x\",\"places\":[]}" }]
                },
                "finishReason": "STOP",
                "index": 0
            }],
            "usageMetadata": {
                "promptTokenCount": 812,
                "candidatesTokenCount": 64,
                "totalTokenCount": 876
            },
            "modelVersion": "gemini-2.5-flash-lite"
        }))
        .unwrap();

        assert_eq!(
            response.text().as_deref(),
            Some("{\"summary\":\"x\",\"places\":[]}")
        );
        let usage = response.usage_metadata.unwrap();
        assert_eq!(usage.prompt_token_count, 812);
        assert_eq!(usage.candidates_token_count, 64);
    }

    #[test]
    fn test_response_blocked_prompt() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" },
            "usageMetadata": { "promptTokenCount": 40 }
        }))
        .unwrap();

        assert!(response.text().is_none());
        assert_eq!(response.block_reason(), Some("SAFETY"));
        assert_eq!(response.usage_metadata.unwrap().candidates_token_count, 0);
    }

    #[test]
    fn test_response_candidate_without_content() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();

        assert!(response.text().is_none());
        assert_eq!(response.block_reason(), Some("SAFETY"));
    }

    #[test]
    fn test_response_empty_object() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();

        assert!(response.text().is_none());
        assert!(response.block_reason().is_none());
        assert!(response.usage_metadata.is_none());
    }

    // ==================== エラー テスト ====================

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "INVALID_ARGUMENT: API key not valid.");
    }

    #[test]
    fn test_error_message_plain_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_error_display_http_error() {
        let error = GeminiError::HttpError {
            status: 429,
            message: "RESOURCE_EXHAUSTED: quota".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("429"));
        assert!(display.contains("RESOURCE_EXHAUSTED"));
    }

    // ==================== クライアント作成 テスト ====================

    #[test]
    fn test_new_creates_client() {
        let client =
            GeminiClient::new(Url::parse("https://generativelanguage.googleapis.com").unwrap())
                .unwrap();

        let debug_str = format!("{:?}", client);
        assert!(debug_str.contains("GeminiClient"));
        assert!(debug_str.contains("generativelanguage.googleapis.com"));
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let mock = MockContentGenerator::returning(GenerateContentResponse::default());

        mock.generate_content("key", "model", &sample_request())
            .await
            .unwrap();

        assert_eq!(mock.request_count(), 1);
        let (key, model, _) = mock.requests.lock().unwrap()[0].clone();
        assert_eq!(key, "key");
        assert_eq!(model, "model");
    }

    // ==================== HTTP テスト ====================

    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash-lite:generateContent";

    /// 再試行間隔を短くしたクライアント
    fn client_for(server: &MockServer) -> GeminiClient {
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(1), Duration::from_millis(10))
            .build_with_max_retries(MAX_RETRIES);
        GeminiClient::with_retry_policy(Url::parse(&server.uri()).unwrap(), retry_policy)
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_content_sends_key_header_and_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "secret-key"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "{\"summary\":\"s\",\"places\":[]}" }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 5 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .generate_content("secret-key", "gemini-2.5-flash-lite", &sample_request())
            .await
            .unwrap();

        assert_eq!(
            response.text().as_deref(),
            Some("{\"summary\":\"s\",\"places\":[]}")
        );
        assert_eq!(response.usage_metadata.unwrap().prompt_token_count, 10);
    }

    #[tokio::test]
    async fn test_generate_content_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid.",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .generate_content("bad-key", "gemini-2.5-flash-lite", &sample_request())
            .await;

        match result {
            Err(GeminiError::HttpError { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "INVALID_ARGUMENT: API key not valid.");
            }
            other => panic!("Expected HttpError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_content_retries_transient_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": {
                    "code": 503,
                    "message": "The model is overloaded.",
                    "status": "UNAVAILABLE"
                }
            })))
            .expect(u64::from(MAX_RETRIES) + 1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .generate_content("k", "gemini-2.5-flash-lite", &sample_request())
            .await;

        match result {
            Err(GeminiError::HttpError { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "UNAVAILABLE: The model is overloaded.");
            }
            other => panic!("Expected HttpError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_content_invalid_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .generate_content("k", "gemini-2.5-flash-lite", &sample_request())
            .await;

        assert!(matches!(result, Err(GeminiError::Deserialize(_))));
    }

    #[test]
    fn test_constants() {
        assert_eq!(MAX_RETRIES, 3);
        assert_eq!(REQUEST_TIMEOUT_SECS, 120);
        assert_eq!(CONNECT_TIMEOUT_SECS, 10);
    }
}
