use ai_dev::analyzers::report::{format_analysis, ReportFormat};
use ai_dev::analyzers::{analyzer_for, AnalyzerOptions};
use ai_dev::domain::model::{ResponseFormat, SourceText};
use ai_dev::domain::ports::{AiModel, Pipeline};
use ai_dev::{
    AppConfig, ConfigManager, DocumentGenerator, DocumentKind, GenerationEngine,
    GenerationPipeline, GenerationRequest, LocalStorage, OutputFormat, Result,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tempfile::TempDir;

/// Answers every prompt with the same canned CLI output.
struct CannedModel {
    output: String,
}

#[async_trait]
impl AiModel for CannedModel {
    fn name(&self) -> &str {
        "canned"
    }

    fn command(&self) -> &str {
        "canned"
    }

    async fn execute(&self, _prompt: &str) -> Result<String> {
        Ok(self.output.clone())
    }

    fn format_request(&self, prompt: &str, _format: ResponseFormat, _encoding: &str) -> String {
        prompt.to_string()
    }

    async fn validate_command(&self) -> bool {
        true
    }
}

fn test_config(output_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.output.directory = output_dir.to_string_lossy().into_owned();
    config.output.timestamp = false;
    config
}

#[tokio::test]
async fn test_generate_qa_from_csv_in_shift_jis() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("faq.csv");
    std::fs::write(&input, "質問,回答\nパスワードを忘れた,再設定リンクを送る\n").unwrap();

    let model = CannedModel {
        output: "```json\n[{\"question\": \"パスワードを忘れた場合は？\", \"answer\": \"再設定リンクを送ります\"}]\n```".to_string(),
    };
    let config = test_config(temp_dir.path());

    let pipeline = GenerationPipeline::new(
        LocalStorage::default(),
        &model,
        DocumentGenerator::new(DocumentKind::Qa, &config),
        AnalyzerOptions::default(),
        GenerationRequest {
            kind: DocumentKind::Qa,
            input_file: input,
            output: None,
            format: Some(OutputFormat::Markdown),
            context: Vec::new(),
        },
    );
    let summary = GenerationEngine::new(pipeline).run().await.unwrap();

    assert_eq!(summary.record_count, 1);
    let expected = temp_dir.path().join("qa.md");
    assert_eq!(PathBuf::from(&summary.output_path), expected);

    // 預設輸出為 Shift_JIS + CRLF
    let bytes = std::fs::read(&expected).unwrap();
    let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(&bytes);
    assert!(!had_errors);
    assert!(text.starts_with("# QA Document\r\n\r\n| question"));
    assert!(text.contains("再設定リンクを送ります"));
}

#[tokio::test]
async fn test_pipeline_stages_through_public_api() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("requirements.txt");
    std::fs::write(&input, "在庫を登録できること").unwrap();

    let model = CannedModel {
        output: "not json at all".to_string(),
    };
    let mut config = test_config(temp_dir.path());
    config.output.encoding = "utf-8".to_string();

    let pipeline = GenerationPipeline::new(
        LocalStorage::default(),
        &model,
        DocumentGenerator::new(DocumentKind::Requirements, &config),
        AnalyzerOptions::default(),
        GenerationRequest {
            kind: DocumentKind::Requirements,
            input_file: input.clone(),
            output: Some(temp_dir.path().join("out").join("req.json")),
            format: Some(OutputFormat::Json),
            context: Vec::new(),
        },
    );

    let source: SourceText = pipeline.extract().await.unwrap();
    assert_eq!(source.text, "在庫を登録できること");

    // 無法解析的回應會得到空清單
    let result = pipeline.transform(source).await.unwrap();
    assert!(result.records.is_empty());

    let output_path = pipeline.load(result).await.unwrap();
    let written = std::fs::read_to_string(&output_path).unwrap();
    assert_eq!(written.trim(), "[]");
}

#[test]
fn test_analyze_csv_report() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("scores.csv");
    std::fs::write(&input, "name,score\nA,80\nB,90\n").unwrap();

    let analyzer = analyzer_for(&input, AnalyzerOptions::default()).unwrap();
    let analysis = analyzer.analyze(&input).unwrap();
    let report = format_analysis(&analysis, ReportFormat::Markdown).unwrap();

    assert!(report.starts_with("# Spreadsheet Analysis Report"));
    assert!(report.contains("- **name**: scores.csv"));
    assert!(report.contains("## Summary\nデータ: 2行 × 2列"));
}

#[test]
fn test_config_file_drives_typed_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ai-dev.yaml");
    std::fs::write(
        &path,
        "ai_models:\n  default: claude\noutput:\n  encoding: utf-8\n  default_format: csv\n",
    )
    .unwrap();

    let mut manager = ConfigManager::load(Some(path.as_path())).unwrap();
    let settings = manager.settings().unwrap();
    assert_eq!(settings.ai_models.default, "claude");
    assert_eq!(settings.output.encoding, "utf-8");
    assert_eq!(settings.output.line_ending, "crlf");

    manager.set("output.timestamp", serde_json::json!(false));
    let saved = manager.save(None).unwrap();
    let reloaded = ConfigManager::load(Some(saved.as_path())).unwrap().settings().unwrap();
    assert!(!reloaded.output.timestamp);
    assert_eq!(reloaded.output.default_format, "csv");
}

#[cfg(unix)]
#[tokio::test]
async fn test_generate_with_gemini_cli_process() {
    use ai_dev::ModelManager;
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("fake-gemini");
    std::fs::write(
        &script,
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 1.0.0; exit 0; fi\necho 'Loaded cached credentials.'\necho '[{\"id\": \"T-001\", \"task\": \"設計\"}]'\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let input = temp_dir.path().join("plan.md");
    std::fs::write(&input, "# 計画\n設計と実装").unwrap();

    let mut config = test_config(temp_dir.path());
    config.output.encoding = "utf-8".to_string();
    config.output.line_ending = "lf".to_string();
    if let Some(gemini) = config.ai_models.gemini.as_mut() {
        gemini.command = script.to_string_lossy().into_owned();
    }

    let manager = ModelManager::new(&config).await.unwrap();
    assert!(manager.validate_current_model().await);

    let pipeline = GenerationPipeline::new(
        LocalStorage::default(),
        manager.current_model(),
        DocumentGenerator::new(DocumentKind::Tasks, &config),
        AnalyzerOptions::default(),
        GenerationRequest {
            kind: DocumentKind::Tasks,
            input_file: input,
            output: None,
            format: Some(OutputFormat::Csv),
            context: Vec::new(),
        },
    );
    let summary = GenerationEngine::new(pipeline).run().await.unwrap();

    assert_eq!(summary.record_count, 1);
    let written = std::fs::read_to_string(temp_dir.path().join("tasks.csv")).unwrap();
    assert_eq!(written, "id,task\nT-001,設計\n");
}
