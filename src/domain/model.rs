use crate::utils::error::{AiDevError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One row of a generated document (a requirement, a QA pair, a task...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K: Into<String>, V: Into<Value>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let data = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Source text pulled out of an input document by the extract stage.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: PathBuf,
    pub text: String,
    pub encoding: String,
}

/// Output of the transform stage, handed to the load stage.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub kind: DocumentKind,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Requirements,
    Qa,
    Tasks,
    TestConcept,
    TestCases,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Requirements,
        DocumentKind::Qa,
        DocumentKind::Tasks,
        DocumentKind::TestConcept,
        DocumentKind::TestCases,
    ];

    /// Name used on the command line.
    pub fn cli_name(&self) -> &'static str {
        match self {
            DocumentKind::Requirements => "requirements",
            DocumentKind::Qa => "qa",
            DocumentKind::Tasks => "tasks",
            DocumentKind::TestConcept => "test-concept",
            DocumentKind::TestCases => "test-cases",
        }
    }

    /// Key under `generation.` in the configuration.
    pub fn config_key(&self) -> &'static str {
        match self {
            DocumentKind::Requirements => "requirements",
            DocumentKind::Qa => "qa",
            DocumentKind::Tasks => "tasks",
            DocumentKind::TestConcept => "test_concept",
            DocumentKind::TestCases => "test_cases",
        }
    }

    /// Stem of the default output file name.
    pub fn file_stem(&self) -> &'static str {
        self.config_key()
    }

    pub fn title(&self) -> &'static str {
        match self {
            DocumentKind::Requirements => "Requirements",
            DocumentKind::Qa => "QA Document",
            DocumentKind::Tasks => "Task List",
            DocumentKind::TestConcept => "Test Concept",
            DocumentKind::TestCases => "Test Cases",
        }
    }

    /// Noun used when reporting the number of generated rows.
    pub fn item_label(&self) -> &'static str {
        match self {
            DocumentKind::Tasks => "Tasks",
            DocumentKind::TestCases => "Cases",
            _ => "Items",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

impl FromStr for DocumentKind {
    type Err = AiDevError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        DocumentKind::ALL
            .into_iter()
            .find(|kind| kind.cli_name() == normalized)
            .ok_or_else(|| AiDevError::unsupported(format!("document kind '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
    Markdown,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AiDevError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            other => Err(AiDevError::unsupported(format!("output format '{}'", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Markdown => "markdown",
            other => other.extension(),
        };
        f.write_str(name)
    }
}

/// Format the AI model is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Text => "text",
        }
    }
}

/// What came back from an AI model after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Json(Value),
    Text(String),
}
