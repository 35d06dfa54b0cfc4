/// 訪問先抽出Lambda関数
///
/// `{ "video_id": "..." }`で呼び出され、S3の`{video_id}/source.json`を
/// Geminiで分析して`{video_id}/extracted.json`に保存する。
/// Lambda関数としても、ローカルスクリプトとしても実行可能。
///
/// # 環境変数
/// - S3_BUCKET_NAME: ソース・結果を置くバケット（必須）
/// - MODEL_NAME: Geminiモデル名（デフォルト: gemini-2.5-flash-lite）
/// - GEMINI_API_KEY_PARAM: APIキーのSSMパラメータ名
/// - GEMINI_API_KEY: APIキー（ローカル用、設定時はSSMを参照しない）
/// - GEMINI_API_BASE_URL: Gemini APIのベースURL
///
/// # ローカル実行
/// ```bash
/// export S3_BUCKET_NAME=my-travel-videos
/// export GEMINI_API_KEY=your-api-key
///
/// cargo run --bin extractor -- --video-id dQw4w9WgXcQ
/// cargo run --bin extractor -- --video-id dQw4w9WgXcQ --model gemini-2.5-flash
/// ```
use clap::Parser;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use place_extractor::application::ExtractionHandler;
use place_extractor::domain::InvocationEvent;
use place_extractor::infrastructure::{
    init_logging, invocation_span, AwsS3Ops, AwsStsOps, ConfiguredApiKey, ExtractorConfig,
    GeminiClient, StsOps,
};
use tracing::{error, info, Instrument};

type Handler = ExtractionHandler<AwsS3Ops, ConfiguredApiKey, GeminiClient>;

/// コマンドライン引数（ローカル実行用）
#[derive(Parser, Debug)]
#[command(name = "extractor")]
#[command(about = "S3上の動画ソースデータから訪問先を抽出")]
struct CliArgs {
    /// 対象の動画ID
    #[arg(long, short = 'v')]
    video_id: String,

    /// Geminiモデル名（環境変数MODEL_NAMEより優先される）
    #[arg(long, short = 'm')]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        info!("Lambda関数として起動");
        run_lambda().await
    } else {
        let args = CliArgs::parse();
        info!("ローカルスクリプトとして起動");
        run_local(args).await
    }
}

/// Lambdaランタイムにハンドラーを登録する
///
/// AWSクライアントとAPIキーのキャッシュはコールドスタート時に1度だけ作成し、
/// 以降の呼び出しで再利用する。
async fn run_lambda() -> Result<(), Error> {
    let config = load_config()?;
    let handler = build_handler(&config).await?;
    let handler = &handler;

    let func = service_fn(move |event: LambdaEvent<InvocationEvent>| async move {
        let span = invocation_span(&event.context.request_id);
        handler
            .handle(event.payload)
            .instrument(span)
            .await
            .map_err(Error::from)
    });
    lambda_runtime::run(func).await?;
    Ok(())
}

/// 1件だけ処理して結果を標準出力に表示する
async fn run_local(args: CliArgs) -> Result<(), Error> {
    let mut config = load_config()?;
    if let Some(model) = args.model.as_deref() {
        config = config.with_model_name(model);
    }

    let handler = build_handler(&config).await?;
    let response = handler
        .handle(InvocationEvent {
            video_id: Some(args.video_id),
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn load_config() -> Result<ExtractorConfig, Error> {
    match ExtractorConfig::from_env() {
        Ok(config) => {
            info!(
                bucket = config.bucket_name(),
                model = config.model_name(),
                api_key_source = ?config.api_key_source(),
                gemini_base_url = %config.gemini_base_url(),
                "設定を読み込み"
            );
            Ok(config)
        }
        Err(err) => {
            error!(error = %err, "設定読み込み失敗");
            Err(err.into())
        }
    }
}

async fn build_handler(config: &ExtractorConfig) -> Result<Handler, Error> {
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    // ExpectedBucketOwnerに使う自アカウントID
    let account_id = AwsStsOps::from_sdk_config(&aws_config)
        .current_account_id()
        .await
        .inspect_err(|err| error!(error = %err, "アカウントIDの取得に失敗"))?;

    let store = AwsS3Ops::from_sdk_config(&aws_config, account_id);
    let api_key = ConfiguredApiKey::from_source(config.api_key_source(), &aws_config);
    let generator = GeminiClient::new(config.gemini_base_url().clone())?;

    Ok(ExtractionHandler::new(
        store,
        api_key,
        generator,
        config.bucket_name(),
        config.model_name(),
    ))
}
