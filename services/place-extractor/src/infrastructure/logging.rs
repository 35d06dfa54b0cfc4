/// ログ基盤モジュール
///
/// CloudWatch Logs向けにJSON形式の構造化ログを出力する。
/// イベントのフィールドはトップレベルのキーに展開される（`LLM_METRICS`の集計に使う）。
use std::sync::Once;

use tracing::{Span, Subscriber};
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::{Layer as FmtLayer, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RUST_LOG未設定時のフィルター
const DEFAULT_FILTER: &str = "info";

static INIT: Once = Once::new();

/// Lambda環境向けのログサブスクライバーを初期化する
///
/// 複数回呼び出しても最初の1回のみ初期化する。
pub fn init_logging() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer(std::io::stdout))
            .init();
    });
}

/// JSON出力レイヤー
fn json_layer<S, W>(make_writer: W) -> FmtLayer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(make_writer)
}

/// 1回のLambda呼び出しに対応するspanを作成する
///
/// span内のログには`request_id`が付与される。
pub fn invocation_span(request_id: &str) -> Span {
    tracing::info_span!("invocation", request_id = %request_id)
}

/// テスト用のログサブスクライバーを初期化する（人間が読みやすい形式）
#[cfg(test)]
pub fn init_test_logging() {
    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    });
}
