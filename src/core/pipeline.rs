use crate::analyzers::{self, AnalyzerOptions};
use crate::core::{Pipeline, SourceText, Storage, TransformResult};
use crate::domain::model::{DocumentKind, OutputFormat};
use crate::domain::ports::AiModel;
use crate::generators::DocumentGenerator;
use crate::utils::error::{AiDevError, Result};
use std::path::PathBuf;

/// What to generate, from which input, and where to put it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: DocumentKind,
    pub input_file: PathBuf,
    /// Explicit output path; `<output.directory>/<kind>.<ext>` when absent.
    pub output: Option<PathBuf>,
    /// Explicit format; `output.default_format` when absent.
    pub format: Option<OutputFormat>,
    pub context: Vec<(String, String)>,
}

/// Input document → AI model → rendered document written through `Storage`.
pub struct GenerationPipeline<'a, S: Storage> {
    storage: S,
    model: &'a dyn AiModel,
    generator: DocumentGenerator,
    options: AnalyzerOptions,
    request: GenerationRequest,
}

impl<'a, S: Storage> GenerationPipeline<'a, S> {
    pub fn new(
        storage: S,
        model: &'a dyn AiModel,
        generator: DocumentGenerator,
        options: AnalyzerOptions,
        request: GenerationRequest,
    ) -> Self {
        Self {
            storage,
            model,
            generator,
            options,
            request,
        }
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub fn generator(&self) -> &DocumentGenerator {
        &self.generator
    }
}

#[async_trait::async_trait]
impl<'a, S: Storage> Pipeline for GenerationPipeline<'a, S> {
    async fn extract(&self) -> Result<SourceText> {
        let path = self.request.input_file.clone();
        let options = self.options.clone();

        // 解析 pptx/xlsx/pdf 是同步且耗 CPU 的工作
        let (text, encoding) = tokio::task::spawn_blocking({
            let path = path.clone();
            move || analyzers::extract_source_text(&path, options)
        })
        .await
        .map_err(|e| AiDevError::analysis(format!("Text extraction task failed: {}", e)))??;

        tracing::debug!(
            "Read {} characters from {} ({})",
            text.chars().count(),
            path.display(),
            encoding
        );
        Ok(SourceText {
            path,
            text,
            encoding,
        })
    }

    async fn transform(&self, source: SourceText) -> Result<TransformResult> {
        if source.text.trim().is_empty() {
            return Err(AiDevError::ValidationError {
                message: format!("No text content found in {}", source.path.display()),
            });
        }

        let records = self
            .generator
            .generate(self.model, &source.text, &self.request.context)
            .await?;

        Ok(TransformResult {
            kind: self.generator.kind(),
            records,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let format = self.generator.resolve_format(self.request.format)?;
        let requested = match &self.request.output {
            Some(path) => path.clone(),
            None => self.generator.default_output_path(format),
        };
        let final_path = self.generator.final_output_path(&requested);

        let data = self
            .generator
            .render(&result.records, format, result.kind.title())?;
        let output_path = final_path.to_string_lossy().into_owned();

        tracing::debug!(
            "Writing {} records as {} ({} bytes)",
            result.records.len(),
            format,
            data.len()
        );
        self.storage.write_file(&output_path, &data).await?;
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::generators::test_support::MockModel;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                AiDevError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn utf8_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.output.encoding = "utf-8".to_string();
        config.output.line_ending = "lf".to_string();
        config.output.timestamp = false;
        config.output.directory = "out".to_string();
        config
    }

    fn request(kind: DocumentKind, input_file: PathBuf) -> GenerationRequest {
        GenerationRequest {
            kind,
            input_file,
            output: None,
            format: Some(OutputFormat::Json),
            context: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_extract_reads_input_text() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input.md");
        std::fs::write(&input, "# ログイン機能\nユーザーはログインできる").unwrap();

        let model = MockModel::new("[]");
        let config = utf8_config();
        let pipeline = GenerationPipeline::new(
            MockStorage::default(),
            &model,
            DocumentGenerator::new(DocumentKind::Requirements, &config),
            AnalyzerOptions::default(),
            request(DocumentKind::Requirements, input.clone()),
        );

        let source = pipeline.extract().await.unwrap();
        assert_eq!(source.path, input);
        assert!(source.text.contains("ログイン機能"));
        assert_eq!(source.encoding, "UTF-8");
    }

    #[tokio::test]
    async fn test_extract_missing_input_fails() {
        let dir = TempDir::new().unwrap();
        let model = MockModel::new("[]");
        let config = utf8_config();
        let pipeline = GenerationPipeline::new(
            MockStorage::default(),
            &model,
            DocumentGenerator::new(DocumentKind::Qa, &config),
            AnalyzerOptions::default(),
            request(DocumentKind::Qa, dir.path().join("missing.txt")),
        );

        assert!(matches!(pipeline.extract().await, Err(AiDevError::IoError(_))));
    }

    #[tokio::test]
    async fn test_transform_rejects_empty_source() {
        let model = MockModel::new("[]");
        let config = utf8_config();
        let pipeline = GenerationPipeline::new(
            MockStorage::default(),
            &model,
            DocumentGenerator::new(DocumentKind::Tasks, &config),
            AnalyzerOptions::default(),
            request(DocumentKind::Tasks, PathBuf::from("blank.txt")),
        );

        let source = SourceText {
            path: PathBuf::from("blank.txt"),
            text: "  \n".to_string(),
            encoding: "UTF-8".to_string(),
        };
        let err = pipeline.transform(source).await.unwrap_err();
        assert!(matches!(err, AiDevError::ValidationError { .. }));
        assert!(model.last_request().is_none());
    }

    #[tokio::test]
    async fn test_transform_and_load_write_rendered_document() {
        let model = MockModel::new(r#"```json
[{"id": "T-001", "task": "設計"}, {"id": "T-002", "task": "実装"}]
```"#);
        let config = utf8_config();
        let storage = MockStorage::default();
        let pipeline = GenerationPipeline::new(
            storage.clone(),
            &model,
            DocumentGenerator::new(DocumentKind::Tasks, &config),
            AnalyzerOptions::default(),
            GenerationRequest {
                context: vec![("project".to_string(), "在庫".to_string())],
                ..request(DocumentKind::Tasks, PathBuf::from("requirements.md"))
            },
        );

        let source = SourceText {
            path: PathBuf::from("requirements.md"),
            text: "在庫管理システムの要件".to_string(),
            encoding: "UTF-8".to_string(),
        };
        let result = pipeline.transform(source).await.unwrap();
        assert_eq!(result.kind, DocumentKind::Tasks);
        assert_eq!(result.records.len(), 2);

        let request = model.last_request().unwrap();
        assert!(request.starts_with("コンテキスト:\nproject: 在庫\n\n"));
        assert!(request.ends_with("[json|utf-8]"));

        let output_path = pipeline.load(result).await.unwrap();
        let expected = PathBuf::from("out").join("tasks.json");
        assert_eq!(output_path, expected.to_string_lossy());

        let written = storage.get_file(&output_path).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(json[1]["task"], serde_json::json!("実装"));
    }

    #[tokio::test]
    async fn test_load_uses_explicit_output_and_default_format() {
        let model = MockModel::new("[]");
        let mut config = utf8_config();
        config.output.default_format = "csv".to_string();
        let storage = MockStorage::default();
        let pipeline = GenerationPipeline::new(
            storage.clone(),
            &model,
            DocumentGenerator::new(DocumentKind::Qa, &config),
            AnalyzerOptions::default(),
            GenerationRequest {
                output: Some(PathBuf::from("docs/qa.csv")),
                format: None,
                ..request(DocumentKind::Qa, PathBuf::from("in.txt"))
            },
        );

        let result = TransformResult {
            kind: DocumentKind::Qa,
            records: vec![crate::core::Record::from_pairs([("question", "Q1"), ("answer", "A1")])],
        };
        let output_path = pipeline.load(result).await.unwrap();
        assert_eq!(output_path, PathBuf::from("docs/qa.csv").to_string_lossy());

        let written = String::from_utf8(storage.get_file(&output_path).await.unwrap()).unwrap();
        assert!(written.starts_with("question,answer\n"));
        assert!(written.contains("Q1,A1"));
    }
}
