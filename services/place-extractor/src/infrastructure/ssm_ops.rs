//! SSM操作モジュール
//!
//! Parameter StoreからSecureStringパラメータ（Gemini APIキー）を取得する。

use async_trait::async_trait;
use aws_sdk_ssm::error::{DisplayErrorContext, SdkError};
use aws_sdk_ssm::operation::get_parameter::GetParameterError;
use aws_sdk_ssm::Client as SsmClient;
use thiserror::Error;
use tracing::{info, warn};

/// SSM操作のエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SsmOpsError {
    /// AWS SDK エラー
    #[error("AWS SSM APIエラー: {0}")]
    AwsSdkError(String),
    /// パラメータが存在しない、または値が空
    #[error("パラメータが見つかりません: {0}")]
    ParameterNotFound(String),
}

/// SSM操作トレイト（テスト用の抽象化）
#[async_trait]
pub trait SsmOps: Send + Sync {
    /// 復号済みのパラメータ値を取得する
    ///
    /// # 引数
    /// * `name` - パラメータ名（例: `/place-extractor-lambda/gemini-api-key`）
    async fn get_secure_parameter(&self, name: &str) -> Result<String, SsmOpsError>;
}

/// 実際のAWS SSM SDKを使用したSSM操作実装
#[derive(Debug, Clone)]
pub struct AwsSsmOps {
    client: SsmClient,
}

impl AwsSsmOps {
    pub fn new(client: SsmClient) -> Self {
        Self { client }
    }

    /// AWS設定からクライアントを作成
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(SsmClient::new(config))
    }
}

#[async_trait]
impl SsmOps for AwsSsmOps {
    async fn get_secure_parameter(&self, name: &str) -> Result<String, SsmOpsError> {
        info!(parameter_name = %name, "SSMからパラメータを取得中");

        let response = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|err| get_parameter_error(name, err))?;

        response
            .parameter()
            .and_then(|p| p.value())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SsmOpsError::ParameterNotFound(name.to_string()))
    }
}

/// GetParameterのSDKエラーを変換する（エラーコードとメッセージを含める）
fn get_parameter_error(name: &str, err: SdkError<GetParameterError>) -> SsmOpsError {
    let not_found = err
        .as_service_error()
        .map(|e| e.is_parameter_not_found())
        .unwrap_or(false);
    if not_found {
        return SsmOpsError::ParameterNotFound(name.to_string());
    }

    let message = DisplayErrorContext(&err).to_string();
    warn!(parameter_name = %name, error = %message, "GetParameterエラー");
    SsmOpsError::AwsSdkError(message)
}
