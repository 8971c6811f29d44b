use super::{column_lines, criteria_text, PromptTemplate};
use crate::config::schema::GenerationTypeConfig;
use crate::domain::model::DocumentKind;

const DEFAULT_CRITERIA: &str = "セキュリティ、パフォーマンス、使いやすさ";

pub struct RequirementsPrompt;

impl PromptTemplate for RequirementsPrompt {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Requirements
    }

    fn render(&self, input_text: &str, settings: Option<&GenerationTypeConfig>) -> String {
        let criteria = criteria_text(settings);
        let criteria = if criteria.is_empty() {
            DEFAULT_CRITERIA.to_string()
        } else {
            criteria
        };

        format!(
            r#"
あなたはシステム要件定義のエキスパートです。
以下の内容から、システムの要件定義を生成してください。

==== 入力内容 ====
{input_text}

==== 重視する観点 ====
{criteria}

==== 出力形式 ====
必ず以下のカラムを持つJSON配列形式で出力してください：
{columns}

==== 出力例 ====
```json
[
  {{
    "id": "REQ-001",
    "category": "機能要件",
    "priority": "高",
    "description": "要件の詳細説明",
    "acceptance_criteria": "受入基準の詳細"
  }}
]
```

==== 注意事項 ====
1. 各要件は具体的で測定可能な内容にする
2. 優先度は「高」「中」「低」の3段階で設定
3. 受入基準は明確で検証可能な条件を記載
4. カテゴリは機能要件/非機能要件/ビジネス要件などで分類
5. 必ず```json と ``` で囲まれた有効なJSON配列を出力すること
6. 最低5個以上の要件を生成すること

JSONのみを出力し、説明文は不要です。
"#,
            columns = column_lines(settings),
        )
    }
}
