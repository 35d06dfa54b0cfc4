//! S3操作モジュール
//!
//! 動画ごとのsource.jsonを読み込み、抽出結果のextracted.jsonを書き込む。
//! すべてのリクエストに`ExpectedBucketOwner`を付与し、
//! 他アカウントのバケットへの読み書きを防ぐ。

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// JSONオブジェクトのContent-Type
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// S3操作のエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum S3OpsError {
    /// 指定キーのオブジェクトが存在しない
    #[error("オブジェクトが存在しません: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },
    /// AWS SDK エラー
    #[error("AWS S3 APIエラー: {0}")]
    AwsSdkError(String),
    /// レスポンスボディの読み取り失敗
    #[error("オブジェクト本文の読み取りに失敗: {0}")]
    ReadBody(String),
    /// JSONとして解釈できない
    #[error("JSONデシリアライズエラー: {0}")]
    Deserialize(String),
    /// JSONへの変換失敗
    #[error("JSONシリアライズエラー: {0}")]
    Serialize(String),
}

/// オブジェクトストレージ操作トレイト（テスト用の抽象化）
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// オブジェクトの本文を取得する
    async fn get_object_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>, S3OpsError>;

    /// JSONオブジェクトを保存する
    async fn put_json_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), S3OpsError>;

    /// オブジェクトを取得してJSONとしてデシリアライズする
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<T, S3OpsError> {
        let bytes = self.get_object_bytes(bucket, key).await?;
        serde_json::from_slice(&bytes).map_err(|e| S3OpsError::Deserialize(e.to_string()))
    }

    /// 値を整形済みJSON（2スペースインデント、非ASCIIはそのまま）で保存する
    async fn put_json<T: Serialize + Send + Sync>(
        &self,
        bucket: &str,
        key: &str,
        value: &T,
    ) -> Result<(), S3OpsError> {
        let body =
            serde_json::to_vec_pretty(value).map_err(|e| S3OpsError::Serialize(e.to_string()))?;
        self.put_json_object(bucket, key, body).await
    }
}

/// 実際のAWS S3 SDKを使用した実装
#[derive(Debug, Clone)]
pub struct AwsS3Ops {
    client: S3Client,
    /// バケット所有者として期待するアカウントID
    expected_bucket_owner: String,
}

impl AwsS3Ops {
    pub fn new(client: S3Client, expected_bucket_owner: impl Into<String>) -> Self {
        Self {
            client,
            expected_bucket_owner: expected_bucket_owner.into(),
        }
    }

    pub fn from_sdk_config(
        config: &aws_config::SdkConfig,
        expected_bucket_owner: impl Into<String>,
    ) -> Self {
        Self::new(S3Client::new(config), expected_bucket_owner)
    }
}

#[async_trait]
impl ObjectStore for AwsS3Ops {
    #[instrument(skip(self))]
    async fn get_object_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>, S3OpsError> {
        debug!("S3オブジェクトを取得");

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .expected_bucket_owner(&self.expected_bucket_owner)
            .send()
            .await
            .map_err(|err| get_object_error(bucket, key, err))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| S3OpsError::ReadBody(e.to_string()))?
            .into_bytes();

        info!(size = bytes.len(), "S3オブジェクトを取得しました");
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn put_json_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), S3OpsError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(JSON_CONTENT_TYPE)
            .expected_bucket_owner(&self.expected_bucket_owner)
            .send()
            .await
            .map_err(|err| {
                let message = DisplayErrorContext(&err).to_string();
                warn!(error = %message, "PutObjectエラー");
                S3OpsError::AwsSdkError(message)
            })?;

        info!("S3オブジェクトを保存しました");
        Ok(())
    }
}

/// GetObjectのSDKエラーを変換する（NoSuchKeyはNotFound）
fn get_object_error(bucket: &str, key: &str, err: SdkError<GetObjectError>) -> S3OpsError {
    let no_such_key = err
        .as_service_error()
        .map(|e| e.is_no_such_key())
        .unwrap_or(false);
    if no_such_key {
        return S3OpsError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
    }

    let message = DisplayErrorContext(&err).to_string();
    warn!(error = %message, "GetObjectエラー");
    S3OpsError::AwsSdkError(message)
}
