//! STS操作モジュール
//!
//! S3リクエストの`ExpectedBucketOwner`に使う自アカウントIDを取得する。

use async_trait::async_trait;
use aws_sdk_sts::error::{DisplayErrorContext, SdkError};
use aws_sdk_sts::operation::get_caller_identity::GetCallerIdentityError;
use aws_sdk_sts::Client as StsClient;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StsOpsError {
    #[error("AWS STS APIエラー: {0}")]
    AwsSdkError(String),
    #[error("GetCallerIdentityの応答にアカウントIDがありません")]
    MissingAccount,
}

/// STS操作トレイト（テスト用の抽象化）
#[async_trait]
pub trait StsOps: Send + Sync {
    /// 呼び出し元のAWSアカウントIDを取得する
    async fn current_account_id(&self) -> Result<String, StsOpsError>;
}

#[derive(Debug, Clone)]
pub struct AwsStsOps {
    client: StsClient,
}

impl AwsStsOps {
    pub fn new(client: StsClient) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(StsClient::new(config))
    }
}

#[async_trait]
impl StsOps for AwsStsOps {
    async fn current_account_id(&self) -> Result<String, StsOpsError> {
        let response = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(caller_identity_error)?;

        let account = response
            .account()
            .filter(|a| !a.is_empty())
            .ok_or(StsOpsError::MissingAccount)?
            .to_string();

        info!(account_id = %account, "アカウントIDを取得");
        Ok(account)
    }
}

fn caller_identity_error(err: SdkError<GetCallerIdentityError>) -> StsOpsError {
    StsOpsError::AwsSdkError(DisplayErrorContext(&err).to_string())
}
