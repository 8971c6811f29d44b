use super::{column_lines, PromptTemplate};
use crate::config::schema::GenerationTypeConfig;
use crate::domain::model::DocumentKind;

pub struct TestCasesPrompt;

impl PromptTemplate for TestCasesPrompt {
    fn kind(&self) -> DocumentKind {
        DocumentKind::TestCases
    }

    fn render(&self, input_text: &str, settings: Option<&GenerationTypeConfig>) -> String {
        format!(
            r#"
あなたはソフトウェアテストの専門家です。
以下の内容から、テストケースを生成してください。

==== 入力内容 ====
{input_text}

==== 出力形式 ====
必ず以下のカラムを持つJSON配列形式で出力してください：
{columns}

==== 出力例 ====
```json
[
  {{
    "id": "TC-001",
    "category": "正常系",
    "precondition": "ユーザーがログインしている状態",
    "steps": "1. メニューを開く 2. 設定を選択 3. 保存をクリック",
    "expected": "設定が正しく保存される",
    "priority": "高"
  }}
]
```

==== 注意事項 ====
1. 前提条件は明確で再現可能な状態を記載
2. 手順は具体的で番号付きのステップにする
3. 期待結果は検証可能な内容にする
4. 優先度は「高」「中」「低」の3段階で設定
5. 分類は「正常系」「異常系」「境界値」などで設定
6. 網羅的なテストケースを作成する
7. 必ず```json と ``` で囲まれた有効なJSON配列を出力すること
8. 最低5個以上のテストケースを生成すること

JSONのみを出力し、説明文は不要です。
"#,
            columns = column_lines(settings),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::GenerationConfig;

    #[test]
    fn test_prompt_uses_test_case_columns() {
        let generation = GenerationConfig::default();
        let prompt = TestCasesPrompt.render("ログイン画面", Some(&generation.test_cases));
        assert!(prompt.contains("- precondition: 前提条件\n- steps: 手順\n"));
        assert!(prompt.contains("8. 最低5個以上のテストケースを生成すること"));
    }
}
