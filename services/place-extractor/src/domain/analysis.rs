// 分析結果のモデル
//
// Geminiの構造化出力（summary + places）と、S3の`extracted.json`として
// 保存される出力ドキュメントを定義する。

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 有効な分析結果が得られなかった場合の要約文
pub const EMPTY_ANALYSIS_SUMMARY: &str = "분석 결과 없음 (안전 필터 또는 내용 없음)";

/// 抽出された1件の訪問先
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceItem {
    /// 本文から抽出した公式の場所名
    pub place_name: String,
    /// Google Maps検索用のクエリ
    pub search_query: String,
}

/// Geminiの構造化出力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 1〜2文の要約
    pub summary: String,
    /// 訪問先の一覧（該当なしの場合は空配列）
    pub places: Vec<PlaceItem>,
}

impl AnalysisResult {
    /// 安全フィルター等で応答本文が空だった場合の結果
    pub fn empty_fallback() -> Self {
        Self {
            summary: EMPTY_ANALYSIS_SUMMARY.to_string(),
            places: Vec::new(),
        }
    }

    pub fn places_count(&self) -> usize {
        self.places.len()
    }
}

/// トークン使用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// 入力（プロンプト）トークン数
    pub input_tokens: u64,
    /// 出力（候補）トークン数
    pub output_tokens: u64,
}

/// `extracted.json`として保存される抽出結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub result: AnalysisResult,
    pub usage: TokenUsage,
}

/// Geminiの`responseSchema`に渡すスキーマ（OpenAPIサブセット）
///
/// `AnalysisResult`の構造と一致させること。
pub fn analysis_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "요약문"
            },
            "places": {
                "type": "ARRAY",
                "description": "장소 목록",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "place_name": {
                            "type": "STRING",
                            "description": "본문에서 추출한 공식 장소명"
                        },
                        "search_query": {
                            "type": "STRING",
                            "description": "규칙에 따라 생성된 검색 쿼리"
                        }
                    },
                    "required": ["place_name", "search_query"],
                    "propertyOrdering": ["place_name", "search_query"]
                }
            }
        },
        "required": ["summary", "places"],
        "propertyOrdering": ["summary", "places"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fallback() {
        let result = AnalysisResult::empty_fallback();

        assert_eq!(result.summary, EMPTY_ANALYSIS_SUMMARY);
        assert!(result.places.is_empty());
        assert_eq!(result.places_count(), 0);
    }

    #[test]
    fn test_extraction_output_json_shape() {
        let output = ExtractionOutput {
            result: AnalysisResult {
                summary: "해운대 맛집을 소개합니다.".to_string(),
                places: vec![PlaceItem {
                    place_name: "해운대암소갈비집".to_string(),
                    search_query: "해운대암소갈비집 부산 해운대구".to_string(),
                }],
            },
            usage: TokenUsage {
                input_tokens: 1200,
                output_tokens: 85,
            },
        };

        let value = serde_json::to_value(&output).unwrap();

        assert_eq!(value["result"]["summary"], "해운대 맛집을 소개합니다.");
        assert_eq!(value["result"]["places"][0]["place_name"], "해운대암소갈비집");
        assert_eq!(
            value["result"]["places"][0]["search_query"],
            "해운대암소갈비집 부산 해운대구"
        );
        assert_eq!(value["usage"]["input_tokens"], 1200);
        assert_eq!(value["usage"]["output_tokens"], 85);
    }

    #[test]
    fn test_analysis_result_rejects_missing_places() {
        let parsed = serde_json::from_str::<AnalysisResult>(r#"{"summary": "요약"}"#);

        assert!(parsed.is_err());
    }

    #[test]
    fn test_schema_matches_model_fields() {
        let schema = analysis_response_schema();

        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["required"], json!(["summary", "places"]));
        let item = &schema["properties"]["places"]["items"];
        assert!(item["properties"]["place_name"].is_object());
        assert!(item["properties"]["search_query"].is_object());
    }
}
