/// 抽出Lambdaの設定
///
/// 環境変数からS3バケット、モデル名、APIキーの取得元、
/// Gemini APIのベースURLを読み込む。
use thiserror::Error;
use url::Url;

use crate::domain::DEFAULT_MODEL_NAME;

/// APIキーを格納しているSSMパラメータ名のデフォルト値
pub const DEFAULT_API_KEY_PARAMETER: &str = "/place-extractor-lambda/gemini-api-key";

/// Gemini APIのデフォルトのベースURL
pub const DEFAULT_GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// 設定読み込みのエラー型
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid URL in {name}: {value}")]
    InvalidUrl { name: String, value: String },
}

/// Gemini APIキーの取得元
#[derive(Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    /// SSM Parameter Store（SecureString）のパラメータ名
    SsmParameter(String),
    /// 環境変数で直接指定されたキー（ローカル実行用）
    Literal(String),
}

impl std::fmt::Debug for ApiKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiKeySource::SsmParameter(name) => f.debug_tuple("SsmParameter").field(name).finish(),
            ApiKeySource::Literal(_) => f.write_str("Literal(***)"),
        }
    }
}

/// 抽出Lambdaの設定
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    bucket_name: String,
    model_name: String,
    api_key_source: ApiKeySource,
    gemini_base_url: Url,
}

impl ExtractorConfig {
    /// 明示的な値で設定を作成（テスト・ローカル実行用）
    pub fn new(
        bucket_name: impl Into<String>,
        model_name: Option<&str>,
        api_key_source: ApiKeySource,
        gemini_base_url: Url,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            model_name: model_name_or_default(model_name),
            api_key_source,
            gemini_base_url,
        }
    }

    /// 環境変数から設定を読み込み
    ///
    /// 環境変数:
    /// - S3_BUCKET_NAME: source.json / extracted.jsonを置くバケット（必須）
    /// - MODEL_NAME: Geminiモデル名（デフォルト: gemini-2.5-flash-lite）
    /// - GEMINI_API_KEY: APIキーを直接指定（設定時はSSMを参照しない）
    /// - GEMINI_API_KEY_PARAM: APIキーのSSMパラメータ名
    /// - GEMINI_API_BASE_URL: Gemini APIのベースURL
    pub fn from_env() -> Result<Self, ConfigError> {
        // 文字列オプションを読み込むヘルパー（空文字はNone扱い）
        let get_optional_string = |key: &str| -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.trim().is_empty())
        };

        let bucket_name = get_optional_string("S3_BUCKET_NAME")
            .ok_or_else(|| ConfigError::MissingEnvVar("S3_BUCKET_NAME".to_string()))?;

        let model_name = get_optional_string("MODEL_NAME");

        let api_key_source = match get_optional_string("GEMINI_API_KEY") {
            Some(key) => ApiKeySource::Literal(key),
            None => ApiKeySource::SsmParameter(
                get_optional_string("GEMINI_API_KEY_PARAM")
                    .unwrap_or_else(|| DEFAULT_API_KEY_PARAMETER.to_string()),
            ),
        };

        let base_url = get_optional_string("GEMINI_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE_URL.to_string());
        let gemini_base_url = parse_http_url("GEMINI_API_BASE_URL", &base_url)?;

        Ok(Self::new(
            bucket_name,
            model_name.as_deref(),
            api_key_source,
            gemini_base_url,
        ))
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// モデル名を上書きした設定を返す（空白のみの場合はデフォルト）
    pub fn with_model_name(mut self, model_name: &str) -> Self {
        self.model_name = model_name_or_default(Some(model_name));
        self
    }

    pub fn api_key_source(&self) -> &ApiKeySource {
        &self.api_key_source
    }

    pub fn gemini_base_url(&self) -> &Url {
        &self.gemini_base_url
    }
}

/// generateContentエンドポイントURLを構築
///
/// 例: `https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent`
pub fn generate_content_url(base_url: &Url, model: &str) -> String {
    format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.as_str().trim_end_matches('/'),
        model
    )
}

fn model_name_or_default(model_name: Option<&str>) -> String {
    model_name
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MODEL_NAME)
        .to_string()
}

fn parse_http_url(name: &str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        name: name.to_string(),
        value: value.to_string(),
    };

    let url = Url::parse(value).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}
