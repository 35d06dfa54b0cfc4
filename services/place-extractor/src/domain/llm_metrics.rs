// LLM呼び出しメトリクス
//
// CloudWatch Logs Insightsで`event = "LLM_METRICS"`を条件に集計できるよう、
// 各値をtracingのフィールドとして出力する（JSONログではトップレベルのキーになる）。
// 時刻はログレコード自体の`timestamp`を使う。

use std::time::Duration;
use tracing::info;

use super::analysis::ExtractionOutput;

/// メトリクスログの識別子
pub const LLM_METRICS_EVENT: &str = "LLM_METRICS";

/// 1回の抽出処理のメトリクス
#[derive(Debug, Clone, PartialEq)]
pub struct LlmMetrics {
    pub video_id: String,
    /// Gemini呼び出しの所要時間（秒、小数点以下2桁）
    pub latency: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub places_count: usize,
}

impl LlmMetrics {
    /// 抽出結果と所要時間からメトリクスを作成
    pub fn new(video_id: impl Into<String>, elapsed: Duration, output: &ExtractionOutput) -> Self {
        Self {
            video_id: video_id.into(),
            latency: round_seconds(elapsed),
            input_tokens: output.usage.input_tokens,
            output_tokens: output.usage.output_tokens,
            places_count: output.result.places_count(),
        }
    }

    /// メトリクスをinfoレベルで出力する
    pub fn log(&self) {
        info!(
            event = LLM_METRICS_EVENT,
            video_id = %self.video_id,
            latency = self.latency,
            input_tokens = self.input_tokens,
            output_tokens = self.output_tokens,
            places_count = self.places_count,
            "LLM_METRICS"
        );
    }
}

fn round_seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
