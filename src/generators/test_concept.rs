use super::{column_lines, PromptTemplate};
use crate::config::schema::GenerationTypeConfig;
use crate::domain::model::DocumentKind;

/// Used unless `generation.test_concept.columns` is configured.
const DEFAULT_SECTIONS: &str = "- test_id: テストID
- test_type: テストタイプ（単体/結合/システム/受入）
- scope: テスト範囲
- objective: テスト目的
- approach: テストアプローチ
- environment: テスト環境
- schedule: スケジュール
- risks: リスクと対策";

pub struct TestConceptPrompt;

impl PromptTemplate for TestConceptPrompt {
    fn kind(&self) -> DocumentKind {
        DocumentKind::TestConcept
    }

    fn render(&self, input_text: &str, settings: Option<&GenerationTypeConfig>) -> String {
        let sections = match column_lines(settings) {
            lines if lines.is_empty() => DEFAULT_SECTIONS.to_string(),
            lines => lines,
        };

        format!(
            r#"
以下の内容から、テスト概念書を生成してください。

入力内容:
{input_text}

出力形式:
以下の構成でJSON配列形式で出力してください：
{sections}

以下の点に注意してください：
1. 各テストフェーズの目的と範囲を明確にする
2. テストアプローチは具体的な手法を記載
3. 必要な環境とツールを明記
4. リスクと対策は現実的な内容にする
5. スケジュールは工数を考慮した内容にする

必ず有効なJSON形式で出力してください。
"#
        )
    }
}
