/// 抽出ハンドラー
///
/// 1回のLambda呼び出しを処理する。
/// source.jsonの取得 → Gemini分析 → メトリクス記録 → extracted.jsonの保存
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info};

use super::place_extractor::{ExtractError, PlaceExtractor};
use crate::domain::{
    InvocationEvent, InvocationResponse, LlmMetrics, SourceData, VideoId, VideoIdError,
};
use crate::infrastructure::{ApiKeyError, ApiKeyProvider, ContentGenerator, ObjectStore, S3OpsError};

/// ハンドラーのエラー型
///
/// どのエラーもLambdaの関数エラーとして呼び出し元に返る。
#[derive(Debug, Error)]
pub enum HandlerError {
    /// video_idの欠落・不正
    #[error("入力が不正です: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    ApiKey(#[from] ApiKeyError),

    #[error("S3操作に失敗: {0}")]
    Storage(#[from] S3OpsError),

    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

impl From<VideoIdError> for HandlerError {
    fn from(err: VideoIdError) -> Self {
        HandlerError::InvalidInput(err.to_string())
    }
}

/// 抽出リクエストを処理するハンドラー
pub struct ExtractionHandler<O, K, G>
where
    O: ObjectStore,
    K: ApiKeyProvider,
    G: ContentGenerator,
{
    store: O,
    api_key: K,
    generator: G,
    bucket_name: String,
    model_name: String,
}

impl<O, K, G> ExtractionHandler<O, K, G>
where
    O: ObjectStore,
    K: ApiKeyProvider,
    G: ContentGenerator,
{
    pub fn new(
        store: O,
        api_key: K,
        generator: G,
        bucket_name: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            api_key,
            generator,
            bucket_name: bucket_name.into(),
            model_name: model_name.into(),
        }
    }

    /// Lambda呼び出しを処理する
    ///
    /// # 処理フロー
    /// 1. video_idを検証（不正な場合はI/Oを行わずに失敗）
    /// 2. APIキーを取得
    /// 3. S3から`{video_id}/source.json`を取得
    /// 4. Geminiで分析（所要時間を計測）
    /// 5. `LLM_METRICS`ログを出力
    /// 6. `{video_id}/extracted.json`をS3に保存
    pub async fn handle(
        &self,
        event: InvocationEvent,
    ) -> Result<InvocationResponse, HandlerError> {
        info!(video_id = ?event.video_id, "Lambda呼び出しを受信");

        let result = self.process(event).await;
        if let Err(err) = &result {
            error!(error = %err, "処理中にエラーが発生");
        }
        result
    }

    async fn process(&self, event: InvocationEvent) -> Result<InvocationResponse, HandlerError> {
        let raw_video_id = event
            .video_id
            .ok_or_else(|| HandlerError::InvalidInput("video_idがありません".to_string()))?;
        let video_id = VideoId::parse(&raw_video_id)?;

        let api_key = self.api_key.api_key().await?;

        info!(
            bucket = %self.bucket_name,
            key = %video_id.source_key(),
            "S3ソースデータをダウンロード中"
        );
        let source: SourceData = self
            .store
            .get_json(&self.bucket_name, &video_id.source_key())
            .await?;

        let extractor = PlaceExtractor::new(&self.generator, api_key, &self.model_name);
        info!(model = %extractor.model_name(), "Gemini分析を開始");

        let started = Instant::now();
        let output = extractor.extract(&source).await?;
        let elapsed = started.elapsed();

        LlmMetrics::new(video_id.as_str(), elapsed, &output).log();

        let saved_key = video_id.extracted_key();
        info!(key = %saved_key, "分析結果をS3にアップロード中");
        self.store
            .put_json(&self.bucket_name, &saved_key, &output)
            .await?;

        info!(key = %saved_key, "処理完了");
        Ok(InvocationResponse::ok(video_id.as_str(), saved_key))
    }
}
