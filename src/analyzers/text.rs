use super::{truncate_chars, Analysis, Analyzer, AnalyzerKind, AnalyzerOptions};
use crate::utils::encoding::EncodingHandler;
use crate::utils::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::path::Path;

const SUMMARY_LENGTH: usize = 200;

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*+]\s+(.+)").unwrap());
static NUMBERED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\.\s+(.+)").unwrap());

/// Plain text and Markdown files.
pub struct TextAnalyzer {
    options: AnalyzerOptions,
}

impl TextAnalyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self { options }
    }

    fn markdown_sections(text: &str) -> Vec<Value> {
        text.split('\n')
            .filter_map(|line| HEADING_RE.captures(line))
            .map(|caps| json!({"level": caps[1].len(), "title": &caps[2]}))
            .collect()
    }

    fn list_items(text: &str) -> Vec<String> {
        text.split('\n')
            .filter(|line| BULLET_RE.is_match(line) || NUMBERED_RE.is_match(line))
            .map(|line| line.trim().to_string())
            .collect()
    }

    fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
        text.split("\n\n").map(str::trim).filter(|p| !p.is_empty())
    }

    fn summary(text: &str) -> String {
        let first = Self::paragraphs(text).next().unwrap_or(text);
        if first.chars().count() > SUMMARY_LENGTH {
            format!("{}...", truncate_chars(first, SUMMARY_LENGTH))
        } else {
            first.to_string()
        }
    }
}

impl Analyzer for TextAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Text
    }

    fn analyze(&self, path: &Path) -> Result<Analysis> {
        let file_info = self.options.check_file(path)?;
        let (text, encoding) = EncodingHandler::read_file_auto(path)?;
        tracing::debug!("Read {} as {}", path.display(), encoding);

        let is_markdown = file_info.extension.eq_ignore_ascii_case(".md");
        let mut analysis = Analysis::new(AnalyzerKind::Text, file_info);

        analysis.statistics.insert("characters".into(), text.chars().count().into());
        analysis.statistics.insert("lines".into(), text.split('\n').count().into());
        analysis
            .statistics
            .insert("words".into(), text.split_whitespace().count().into());
        analysis
            .statistics
            .insert("paragraphs".into(), Self::paragraphs(&text).count().into());

        analysis.detail("encoding", encoding);
        let sections = if is_markdown {
            Self::markdown_sections(&text)
        } else {
            Vec::new()
        };
        analysis.detail("sections", sections);
        analysis.detail("lists", Self::list_items(&text));
        analysis.summary = Some(Self::summary(&text));
        analysis.full_text = Some(text);

        Ok(analysis)
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        self.options.check_file(path)?;
        let (text, _) = EncodingHandler::read_file_auto(path)?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "# 在庫管理システム\n\n概要の段落です。\n\n## 機能\n- 入庫登録\n* 出庫登録\n1. 棚卸\n本文 #タグ\n";

    #[test]
    fn test_markdown_analysis() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("requirements.md");
        std::fs::write(&path, SAMPLE).unwrap();

        let analysis = TextAnalyzer::new(AnalyzerOptions::default()).analyze(&path).unwrap();

        assert_eq!(analysis.statistics["lines"], json!(10));
        assert_eq!(analysis.statistics["paragraphs"], json!(3));
        assert_eq!(analysis.statistics["characters"], json!(SAMPLE.chars().count()));
        assert_eq!(
            analysis.details["sections"],
            json!([
                {"level": 1, "title": "在庫管理システム"},
                {"level": 2, "title": "機能"}
            ])
        );
        assert_eq!(
            analysis.details["lists"],
            json!(["- 入庫登録", "* 出庫登録", "1. 棚卸"])
        );
        assert_eq!(analysis.summary.as_deref(), Some("# 在庫管理システム"));
        assert_eq!(analysis.details["encoding"], json!("UTF-8"));
    }

    #[test]
    fn test_plain_text_has_no_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "# not a heading in txt\n").unwrap();

        let analysis = TextAnalyzer::new(AnalyzerOptions::default()).analyze(&path).unwrap();
        assert_eq!(analysis.details["sections"], json!([]));
    }

    #[test]
    fn test_long_summary_is_truncated() {
        let long = "あ".repeat(250);
        let summary = TextAnalyzer::summary(&long);
        assert_eq!(summary.chars().count(), SUMMARY_LENGTH + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_extract_text_decodes_shift_jis() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.txt");
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("要件定義書の下書きです。システムの概要を記載します。");
        std::fs::write(&path, &bytes).unwrap();

        let text = TextAnalyzer::new(AnalyzerOptions::default()).extract_text(&path).unwrap();
        assert_eq!(text, "要件定義書の下書きです。システムの概要を記載します。");
    }
}
