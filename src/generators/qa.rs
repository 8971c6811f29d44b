use super::{column_lines, PromptTemplate};
use crate::config::schema::GenerationTypeConfig;
use crate::domain::model::DocumentKind;

pub struct QaPrompt;

impl PromptTemplate for QaPrompt {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Qa
    }

    fn render(&self, input_text: &str, settings: Option<&GenerationTypeConfig>) -> String {
        format!(
            r#"
あなたはシステム開発のQ&Aドキュメント作成の専門家です。
以下の内容から、品質保証（QA）に関する質問と回答を生成してください。

==== 入力内容 ====
{input_text}

==== 出力形式 ====
必ず以下のカラムを持つJSON配列形式で出力してください：
{columns}

==== 出力例 ====
```json
[
  {{
    "id": "QA-001",
    "category": "機能",
    "question": "このシステムの主な機能は何ですか？",
    "answer": "主な機能は...",
    "status": "回答済み"
  }}
]
```

==== 注意事項 ====
1. 想定される質問と明確な回答を作成
2. 分類は「機能」「性能」「セキュリティ」「運用」などで設定
3. ステータスは「未回答」「回答済み」「確認中」などで設定
4. 技術的な質問と運用面の質問をバランスよく含める
5. 必ず```json と ``` で囲まれた有効なJSON配列を出力すること
6. 最低5個以上のQ&Aを生成すること

JSONのみを出力し、説明文は不要です。
"#,
            columns = column_lines(settings),
        )
    }
}
