pub mod qa;
pub mod requirements;
pub mod tasks;
pub mod test_cases;
pub mod test_concept;

use crate::config::schema::{AppConfig, Criterion, GenerationTypeConfig, OutputConfig};
use crate::domain::model::{DocumentKind, ModelResponse, OutputFormat, Record, ResponseFormat};
use crate::domain::ports::AiModel;
use crate::utils::encoding::EncodingHandler;
use crate::utils::error::Result;
use crate::utils::formatter::OutputFormatter;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Builds the built-in prompt for one document kind.
pub trait PromptTemplate: Send + Sync {
    fn kind(&self) -> DocumentKind;
    fn render(&self, input_text: &str, settings: Option<&GenerationTypeConfig>) -> String;
}

pub fn template_for(kind: DocumentKind) -> Box<dyn PromptTemplate> {
    match kind {
        DocumentKind::Requirements => Box::new(requirements::RequirementsPrompt),
        DocumentKind::Qa => Box::new(qa::QaPrompt),
        DocumentKind::Tasks => Box::new(tasks::TasksPrompt),
        DocumentKind::TestConcept => Box::new(test_concept::TestConceptPrompt),
        DocumentKind::TestCases => Box::new(test_cases::TestCasesPrompt),
    }
}

/// `- key: label` per configured column.
pub(crate) fn column_lines(settings: Option<&GenerationTypeConfig>) -> String {
    settings
        .map(|s| s.columns.as_slice())
        .unwrap_or_default()
        .iter()
        .flat_map(|column| column.iter())
        .map(|(key, label)| format!("- {}: {}", key, label))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn criteria_text(settings: Option<&GenerationTypeConfig>) -> String {
    settings
        .map(|s| s.criteria.as_slice())
        .unwrap_or_default()
        .iter()
        .flat_map(|criterion| match criterion {
            Criterion::Name(name) => vec![name.clone()],
            Criterion::Labeled(map) => map.values().cloned().collect(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Turns source text into document records through an AI model and writes
/// them out in the configured format and encoding.
pub struct DocumentGenerator {
    kind: DocumentKind,
    template: Box<dyn PromptTemplate>,
    settings: Option<GenerationTypeConfig>,
    output: OutputConfig,
}

impl DocumentGenerator {
    pub fn new(kind: DocumentKind, config: &AppConfig) -> Self {
        Self {
            kind,
            template: template_for(kind),
            settings: config.generation.for_kind(kind).cloned(),
            output: config.output.clone(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn output_config(&self) -> &OutputConfig {
        &self.output
    }

    pub fn build_prompt(&self, input_text: &str, context: &[(String, String)]) -> String {
        let settings = self.settings.as_ref();
        let prompt = match settings.and_then(|s| s.template.as_deref()) {
            Some(custom) => custom
                .replace("{input_text}", input_text)
                .replace("{columns}", &column_lines(settings))
                .replace("{criteria}", &criteria_text(settings)),
            None => self.template.render(input_text, settings),
        };

        if context.is_empty() {
            return prompt;
        }
        let context_str = context
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        format!("コンテキスト:\n{}\n\n{}", context_str, prompt)
    }

    pub async fn generate(
        &self,
        model: &dyn AiModel,
        input_text: &str,
        context: &[(String, String)],
    ) -> Result<Vec<Record>> {
        let prompt = self.build_prompt(input_text, context);
        tracing::debug!("Generating {} with {} ({} chars)", self.kind, model.name(), prompt.chars().count());

        let response = model
            .generate(&prompt, ResponseFormat::Json, &self.output.encoding)
            .await?;
        let records = Self::normalize_response(response);

        tracing::debug!("{} returned {} records", model.name(), records.len());
        Ok(records)
    }

    /// Lists pass through, a single object becomes one record, and text is
    /// parsed as JSON or kept as `{"content": text}`.
    pub fn normalize_response(response: ModelResponse) -> Vec<Record> {
        match response {
            ModelResponse::Json(value) => Self::records_from_value(value),
            ModelResponse::Text(text) => Self::records_from_text(text),
        }
    }

    fn records_from_value(value: Value) -> Vec<Record> {
        match value {
            Value::Array(items) => items.into_iter().map(Self::record_from_item).collect(),
            Value::Object(data) => vec![Record { data }],
            Value::String(text) => Self::records_from_text(text),
            Value::Null => Vec::new(),
            other => vec![Self::record_from_item(other)],
        }
    }

    fn records_from_text(text: String) -> Vec<Record> {
        match serde_json::from_str::<Value>(&text) {
            Ok(value @ (Value::Array(_) | Value::Object(_))) => Self::records_from_value(value),
            _ => vec![Record::from_pairs([("content", text)])],
        }
    }

    fn record_from_item(item: Value) -> Record {
        match item {
            Value::Object(data) => Record { data },
            other => {
                let mut data = Map::new();
                data.insert("content".to_string(), other);
                Record { data }
            }
        }
    }

    /// Resolves the format argument, falling back to `output.default_format`.
    pub fn resolve_format(&self, format: Option<OutputFormat>) -> Result<OutputFormat> {
        match format {
            Some(format) => Ok(format),
            None => self.output.default_format.parse(),
        }
    }

    /// `<output.directory>/<kind>.<ext>`
    pub fn default_output_path(&self, format: OutputFormat) -> PathBuf {
        Path::new(&self.output.directory)
            .join(format!("{}.{}", self.kind.file_stem(), format.extension()))
    }

    /// Appends `_YYYYmmdd_HHMMSS` to the file stem when `output.timestamp` is set.
    pub fn final_output_path(&self, output_path: &Path) -> PathBuf {
        if !self.output.timestamp {
            return output_path.to_path_buf();
        }

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match output_path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, timestamp, ext.to_string_lossy()),
            None => format!("{}_{}", stem, timestamp),
        };
        output_path.with_file_name(name)
    }

    /// Bytes of the rendered document in the configured encoding, BOM and
    /// line endings.
    pub fn render(&self, records: &[Record], format: OutputFormat, title: &str) -> Result<Vec<u8>> {
        let content = OutputFormatter::format_output(records, format, title)?;
        let encoding = EncodingHandler::normalize_encoding_name(&self.output.encoding);
        EncodingHandler::to_bytes(&content, &encoding, self.output.bom, &self.output.line_ending)
    }

    pub fn save_to_file(
        &self,
        records: &[Record],
        output_path: &Path,
        format: Option<OutputFormat>,
        title: &str,
    ) -> Result<PathBuf> {
        let format = self.resolve_format(format)?;
        let final_path = self.final_output_path(output_path);
        let data = self.render(records, format, title)?;

        if let Some(parent) = final_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&final_path, data)?;

        tracing::debug!("Saved {} records to {}", records.len(), final_path.display());
        Ok(final_path)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MockModel;
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.output.directory = dir.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn test_context_is_prefixed() {
        let generator = DocumentGenerator::new(DocumentKind::Qa, &AppConfig::default());
        let prompt = generator.build_prompt(
            "入力",
            &[("system".to_string(), "会計".to_string()), ("phase".to_string(), "設計".to_string())],
        );
        assert!(prompt.starts_with("コンテキスト:\nsystem: 会計\nphase: 設計\n\n\nあなたは"));
    }

    #[test]
    fn test_custom_template_is_substituted() {
        let mut config = AppConfig::default();
        config.generation.tasks.template =
            Some("入力:{input_text}\n列:\n{columns}\n観点:{criteria}".to_string());

        let generator = DocumentGenerator::new(DocumentKind::Tasks, &config);
        let prompt = generator.build_prompt("移行", &[]);
        assert!(prompt.starts_with("入力:移行\n列:\n- id: タスクID\n"));
        assert!(prompt.ends_with("観点:"));
    }

    #[test]
    fn test_normalize_response_shapes() {
        let list = DocumentGenerator::normalize_response(ModelResponse::Json(json!([{"id": 1}, "loose"])));
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].get_str("content"), Some("loose"));

        let single = DocumentGenerator::normalize_response(ModelResponse::Json(json!({"id": "QA-1"})));
        assert_eq!(single, vec![Record::from_pairs([("id", "QA-1")])]);

        let parsed = DocumentGenerator::normalize_response(ModelResponse::Text("[{\"id\": 2}]".to_string()));
        assert_eq!(parsed[0].data["id"], json!(2));

        let text = DocumentGenerator::normalize_response(ModelResponse::Text("自由記述".to_string()));
        assert_eq!(text, vec![Record::from_pairs([("content", "自由記述")])]);

        assert!(DocumentGenerator::normalize_response(ModelResponse::Json(Value::Null)).is_empty());
    }

    #[tokio::test]
    async fn test_generate_asks_for_json_in_output_encoding() {
        let model = MockModel::new("```json\n[{\"id\": \"REQ-001\", \"priority\": \"高\"}]\n```");
        let generator = DocumentGenerator::new(DocumentKind::Requirements, &AppConfig::default());

        let records = generator.generate(&model, "受注管理", &[]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_str("priority"), Some("高"));

        let request = model.last_request().unwrap();
        assert!(request.contains("受注管理"));
        assert!(request.ends_with("[json|shift-jis]"));
    }

    #[test]
    fn test_default_output_path_uses_kind_and_extension() {
        let generator = DocumentGenerator::new(DocumentKind::TestCases, &AppConfig::default());
        assert_eq!(
            generator.default_output_path(OutputFormat::Markdown),
            Path::new("./output").join("test_cases.md")
        );
    }

    #[test]
    fn test_save_to_file_applies_timestamp_and_encoding() {
        let dir = TempDir::new().unwrap();
        let generator = DocumentGenerator::new(DocumentKind::Requirements, &config_in(dir.path()));
        let records = vec![Record::from_pairs([("id", "REQ-001"), ("description", "検索")])];

        let target = dir.path().join("nested").join("requirements.csv");
        let saved = generator
            .save_to_file(&records, &target, Some(OutputFormat::Csv), "Requirements")
            .unwrap();

        let name = saved.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("requirements_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "requirements_20250101_120000.csv".len());

        let bytes = std::fs::read(&saved).unwrap();
        let (expected, _, _) = encoding_rs::SHIFT_JIS.encode("id,description\r\nREQ-001,検索\r\n");
        assert_eq!(bytes, expected.into_owned());
    }

    #[test]
    fn test_save_without_timestamp_uses_default_format() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(dir.path());
        config.output.timestamp = false;
        config.output.encoding = "utf-8".to_string();
        config.output.bom = true;
        config.output.line_ending = "lf".to_string();
        config.output.default_format = "json".to_string();

        let generator = DocumentGenerator::new(DocumentKind::Qa, &config);
        let target = dir.path().join("qa.json");
        let saved = generator
            .save_to_file(&[Record::from_pairs([("id", "QA-1")])], &target, None, "QA Document")
            .unwrap();

        assert_eq!(saved, target);
        let bytes = std::fs::read(&saved).unwrap();
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
        assert_eq!(&bytes[3..], "[\n  {\n    \"id\": \"QA-1\"\n  }\n]".as_bytes());
    }
}
