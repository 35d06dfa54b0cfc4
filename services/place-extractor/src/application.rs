// アプリケーション層モジュール
pub mod extraction_handler;
pub mod place_extractor;

// 再エクスポート
pub use extraction_handler::{ExtractionHandler, HandlerError};
pub use place_extractor::{ExtractError, PlaceExtractor};
