// Domain layer modules
pub mod analysis;
pub mod invocation;
pub mod llm_metrics;
pub mod prompt;
pub mod source_data;
pub mod video;

// Re-exports
pub use analysis::{
    analysis_response_schema, AnalysisResult, ExtractionOutput, PlaceItem, TokenUsage,
};
pub use invocation::{InvocationEvent, InvocationResponse};
pub use llm_metrics::LlmMetrics;
pub use prompt::{DEFAULT_MODEL_NAME, SYSTEM_PROMPT};
pub use source_data::{SourceData, VideoInfo};
pub use video::{VideoId, VideoIdError};
