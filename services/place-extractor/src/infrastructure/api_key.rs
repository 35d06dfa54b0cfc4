//! Gemini APIキーの取得
//!
//! Lambda実行環境が再利用される間はSSMから取得したキーをメモリに保持し、
//! 2回目以降の呼び出しではSSMにアクセスしない。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::config::ApiKeySource;
use super::ssm_ops::{AwsSsmOps, SsmOps, SsmOpsError};

/// APIキー取得のエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiKeyError {
    #[error("APIキーの取得に失敗: {0}")]
    Ssm(#[from] SsmOpsError),
}

/// APIキー提供トレイト
#[async_trait]
pub trait ApiKeyProvider: Send + Sync {
    async fn api_key(&self) -> Result<String, ApiKeyError>;
}

/// 固定のAPIキー（ローカル実行・テスト用）
#[derive(Clone)]
pub struct StaticApiKey(String);

impl StaticApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl std::fmt::Debug for StaticApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticApiKey(***)")
    }
}

#[async_trait]
impl ApiKeyProvider for StaticApiKey {
    async fn api_key(&self) -> Result<String, ApiKeyError> {
        Ok(self.0.clone())
    }
}

/// SSMから取得してプロセス内にキャッシュするAPIキー
///
/// 取得に失敗した場合はキャッシュせず、次回の呼び出しで再取得する。
pub struct CachedSsmApiKey<S>
where
    S: SsmOps,
{
    ssm: S,
    parameter_name: String,
    cached: OnceCell<String>,
}

impl<S> CachedSsmApiKey<S>
where
    S: SsmOps,
{
    pub fn new(ssm: S, parameter_name: impl Into<String>) -> Self {
        Self {
            ssm,
            parameter_name: parameter_name.into(),
            cached: OnceCell::new(),
        }
    }

    /// キャッシュ済みかどうか
    pub fn is_cached(&self) -> bool {
        self.cached.initialized()
    }
}

#[async_trait]
impl<S> ApiKeyProvider for CachedSsmApiKey<S>
where
    S: SsmOps,
{
    async fn api_key(&self) -> Result<String, ApiKeyError> {
        let key = self
            .cached
            .get_or_try_init(|| async {
                info!(parameter_name = %self.parameter_name, "SSMからAPIキーを取得中");
                self.ssm
                    .get_secure_parameter(&self.parameter_name)
                    .await
                    .map_err(|err| {
                        error!(
                            parameter_name = %self.parameter_name,
                            error = %err,
                            "APIキーの取得に失敗"
                        );
                        ApiKeyError::from(err)
                    })
            })
            .await?;

        Ok(key.clone())
    }
}

/// 設定に応じたAPIキー提供者
pub enum ConfiguredApiKey {
    Static(StaticApiKey),
    Ssm(CachedSsmApiKey<AwsSsmOps>),
}

impl ConfiguredApiKey {
    /// 取得元の設定から提供者を作成する（SSMクライアントはここで1度だけ作る）
    pub fn from_source(source: &ApiKeySource, sdk_config: &aws_config::SdkConfig) -> Self {
        match source {
            ApiKeySource::Literal(key) => ConfiguredApiKey::Static(StaticApiKey::new(key.clone())),
            ApiKeySource::SsmParameter(name) => ConfiguredApiKey::Ssm(CachedSsmApiKey::new(
                AwsSsmOps::from_sdk_config(sdk_config),
                name.clone(),
            )),
        }
    }
}

#[async_trait]
impl ApiKeyProvider for ConfiguredApiKey {
    async fn api_key(&self) -> Result<String, ApiKeyError> {
        match self {
            ConfiguredApiKey::Static(provider) => provider.api_key().await,
            ConfiguredApiKey::Ssm(provider) => provider.api_key().await,
        }
    }
}
