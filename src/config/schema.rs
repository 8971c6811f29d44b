use crate::domain::model::{DocumentKind, OutputFormat};
use crate::utils::encoding::EncodingHandler;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const AVAILABLE_MODELS: [&str; 2] = ["gemini", "claude"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub project: ProjectConfig,
    pub ai_models: AiModelsConfig,
    pub cli_execution: CliExecutionConfig,
    pub generation: GenerationConfig,
    pub output: OutputConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub version: String,
    pub description: String,
    pub encoding: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "My Project".to_string(),
            version: "1.0.0".to_string(),
            description: "Project description".to_string(),
            encoding: "shift-jis".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiModelsConfig {
    pub default: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ModelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude: Option<ModelConfig>,
}

impl AiModelsConfig {
    pub fn model(&self, name: &str) -> Option<&ModelConfig> {
        match name {
            "gemini" => self.gemini.as_ref(),
            "claude" => self.claude.as_ref(),
            _ => None,
        }
    }
}

impl Default for AiModelsConfig {
    fn default() -> Self {
        Self {
            default: "gemini".to_string(),
            gemini: Some(ModelConfig {
                command: "gemini".to_string(),
                model: None,
                models: Some(ModelCatalog {
                    default: Some("gemini-2.5-pro".to_string()),
                    available: vec![
                        "gemini-2.5-pro".to_string(),
                        "gemini-2.5-flash".to_string(),
                        "gemini-2.5-flash-lite".to_string(),
                    ],
                }),
                options: vec![
                    "--model=gemini-2.5-pro".to_string(),
                    "--temperature=0.7".to_string(),
                    "--max-tokens=8192".to_string(),
                    "--format=json".to_string(),
                ],
                timeout: 60,
            }),
            claude: Some(ModelConfig {
                command: "claude-code".to_string(),
                model: Some("claude-opus-4".to_string()),
                models: None,
                options: vec![
                    "--temperature=0.7".to_string(),
                    "--max-tokens=8192".to_string(),
                ],
                timeout: 60,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelCatalog>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl ModelConfig {
    /// Settings used when a provider has no section in the config file.
    pub fn fallback(name: &str) -> Self {
        let command = if name == "gemini" { "gemini" } else { "claude-code" };
        Self {
            command: command.to_string(),
            model: None,
            models: None,
            options: Vec::new(),
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCatalog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub available: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliExecutionConfig {
    pub shell: bool,
    pub buffer_size: usize,
    pub stream_output: bool,
    pub error_handling: String,
    pub max_retries: u32,
    pub retry_delay: u64,
}

impl CliExecutionConfig {
    pub fn retries_enabled(&self) -> bool {
        self.error_handling.eq_ignore_ascii_case("retry")
    }
}

impl Default for CliExecutionConfig {
    fn default() -> Self {
        Self {
            shell: true,
            buffer_size: 4096,
            stream_output: true,
            error_handling: "retry".to_string(),
            max_retries: 3,
            retry_delay: 2,
        }
    }
}

/// Either a bare criterion name or a single `key: label` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Criterion {
    Name(String),
    Labeled(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationTypeConfig {
    /// Single-entry maps of `json key: column label`.
    pub columns: Vec<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<Criterion>,
    /// Custom prompt; `{input_text}`, `{columns}` and `{criteria}` are substituted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl GenerationTypeConfig {
    fn with_columns(columns: &[(&str, &str)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(key, label)| BTreeMap::from([(key.to_string(), label.to_string())]))
                .collect(),
            criteria: Vec::new(),
            template: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub requirements: GenerationTypeConfig,
    pub qa: GenerationTypeConfig,
    pub tasks: GenerationTypeConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_concept: Option<GenerationTypeConfig>,
    pub test_cases: GenerationTypeConfig,
}

impl GenerationConfig {
    pub fn for_kind(&self, kind: DocumentKind) -> Option<&GenerationTypeConfig> {
        match kind {
            DocumentKind::Requirements => Some(&self.requirements),
            DocumentKind::Qa => Some(&self.qa),
            DocumentKind::Tasks => Some(&self.tasks),
            DocumentKind::TestConcept => self.test_concept.as_ref(),
            DocumentKind::TestCases => Some(&self.test_cases),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let mut requirements = GenerationTypeConfig::with_columns(&[
            ("id", "要件ID"),
            ("category", "カテゴリ"),
            ("priority", "優先度"),
            ("description", "説明"),
            ("acceptance_criteria", "受入基準"),
        ]);
        requirements.criteria = ["security", "performance", "usability", "scalability"]
            .into_iter()
            .map(|c| Criterion::Name(c.to_string()))
            .collect();

        Self {
            requirements,
            qa: GenerationTypeConfig::with_columns(&[
                ("id", "QA-ID"),
                ("category", "分類"),
                ("question", "質問"),
                ("answer", "回答"),
                ("status", "ステータス"),
            ]),
            tasks: GenerationTypeConfig::with_columns(&[
                ("id", "タスクID"),
                ("title", "タイトル"),
                ("assignee", "担当者"),
                ("priority", "優先度"),
                ("estimated_hours", "見積時間"),
                ("status", "ステータス"),
            ]),
            test_concept: None,
            test_cases: GenerationTypeConfig::with_columns(&[
                ("id", "TC-ID"),
                ("category", "分類"),
                ("precondition", "前提条件"),
                ("steps", "手順"),
                ("expected", "期待結果"),
                ("priority", "優先度"),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_format: String,
    pub encoding: String,
    pub bom: bool,
    pub line_ending: String,
    pub directory: String,
    pub timestamp: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "markdown".to_string(),
            encoding: "shift-jis".to_string(),
            bom: false,
            line_ending: "crlf".to_string(),
            directory: "./output".to_string(),
            timestamp: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub extract_images: bool,
    pub extract_tables: bool,
    pub max_file_size: String,
    pub input_encoding: String,
    pub supported_formats: Vec<String>,
}

impl AnalysisConfig {
    pub fn max_file_size_bytes(&self) -> Result<u64> {
        validation::parse_size("analysis.max_file_size", &self.max_file_size)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extract_images: true,
            extract_tables: true,
            max_file_size: "50MB".to_string(),
            input_encoding: "auto".to_string(),
            supported_formats: [".pptx", ".xlsx", ".csv", ".txt", ".md"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_one_of("ai_models.default", &self.ai_models.default, &AVAILABLE_MODELS)?;

        for name in AVAILABLE_MODELS {
            if let Some(model) = self.ai_models.model(name) {
                validation::validate_non_empty_string(
                    &format!("ai_models.{}.command", name),
                    &model.command,
                )?;
                validation::validate_positive_number(
                    &format!("ai_models.{}.timeout", name),
                    model.timeout,
                    1,
                )?;
            }
        }

        validation::validate_positive_number(
            "cli_execution.max_retries",
            u64::from(self.cli_execution.max_retries),
            1,
        )?;

        self.output
            .default_format
            .parse::<OutputFormat>()
            .map_err(|_| crate::utils::error::AiDevError::InvalidConfigValueError {
                field: "output.default_format".to_string(),
                value: self.output.default_format.clone(),
                reason: "Allowed values: json, csv, md, markdown, html".to_string(),
            })?;
        validation::validate_one_of("output.line_ending", &self.output.line_ending, &["crlf", "lf"])?;
        validation::validate_path("output.directory", &self.output.directory)?;

        for (field, encoding) in [
            ("output.encoding", &self.output.encoding),
            ("project.encoding", &self.project.encoding),
        ] {
            if !EncodingHandler::is_known(encoding) {
                return Err(crate::utils::error::AiDevError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: encoding.clone(),
                    reason: "Unknown encoding".to_string(),
                });
            }
        }

        self.analysis.max_file_size_bytes()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "output": {"encoding": "utf-8"},
            "generation": {"qa": {"columns": [{"id": "番号"}]}}
        }))
        .unwrap();

        assert_eq!(config.output.encoding, "utf-8");
        assert_eq!(config.output.line_ending, "crlf");
        assert_eq!(config.generation.qa.columns.len(), 1);
        assert_eq!(config.generation.tasks.columns.len(), 6);
        assert_eq!(config.ai_models.default, "gemini");
    }

    #[test]
    fn test_criteria_accept_names_and_labels() {
        let config: GenerationTypeConfig = serde_json::from_value(serde_json::json!({
            "columns": [],
            "criteria": ["security", {"performance": "性能"}]
        }))
        .unwrap();

        assert_eq!(config.criteria[0], Criterion::Name("security".to_string()));
        assert!(matches!(&config.criteria[1], Criterion::Labeled(map) if map["performance"] == "性能"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.ai_models.default = "gpt".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.output.line_ending = "cr".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.output.encoding = "klingon".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.output.default_format = "docx".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_fallback_commands() {
        assert_eq!(ModelConfig::fallback("gemini").command, "gemini");
        assert_eq!(ModelConfig::fallback("claude").command, "claude-code");
        assert_eq!(ModelConfig::fallback("claude").timeout, 60);
    }
}
