use super::{column_lines, PromptTemplate};
use crate::config::schema::GenerationTypeConfig;
use crate::domain::model::DocumentKind;

pub struct TasksPrompt;

impl PromptTemplate for TasksPrompt {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Tasks
    }

    fn render(&self, input_text: &str, settings: Option<&GenerationTypeConfig>) -> String {
        format!(
            r#"
あなたはプロジェクト管理の専門家です。
以下の内容から、プロジェクトのタスクリストを生成してください。

==== 入力内容 ====
{input_text}

==== 出力形式 ====
必ず以下のカラムを持つJSON配列形式で出力してください：
{columns}

==== 出力例 ====
```json
[
  {{
    "id": "TASK-001",
    "title": "データベース設計",
    "assignee": "未定",
    "priority": "高",
    "estimated_hours": "8",
    "status": "未着手"
  }}
]
```

==== 注意事項 ====
1. タスクは具体的で実行可能な内容にする
2. 優先度は「高」「中」「低」の3段階で設定
3. 見積時間は実現可能な範囲で設定（単位：時間）
4. ステータスは「未着手」「進行中」「完了」「保留」などで設定
5. タスク間の依存関係を考慮した順序にする
6. 必ず```json と ``` で囲まれた有効なJSON配列を出力すること
7. 最低5個以上のタスクを生成すること

JSONのみを出力し、説明文は不要です。
"#,
            columns = column_lines(settings),
        )
    }
}
