// Infrastructure layer modules
pub mod api_key;
pub mod config;
pub mod gemini_client;
pub mod logging;
pub mod s3_ops;
pub mod ssm_ops;
pub mod sts_ops;

// Re-exports
pub use api_key::{ApiKeyError, ApiKeyProvider, CachedSsmApiKey, ConfiguredApiKey, StaticApiKey};
pub use config::{ApiKeySource, ConfigError, ExtractorConfig};
pub use gemini_client::{ContentGenerator, GeminiClient, GeminiError};
pub use logging::{init_logging, invocation_span};
pub use s3_ops::{AwsS3Ops, ObjectStore, S3OpsError};
pub use ssm_ops::{AwsSsmOps, SsmOps, SsmOpsError};
pub use sts_ops::{AwsStsOps, StsOps, StsOpsError};
