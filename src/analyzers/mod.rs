pub mod ooxml;
pub mod pdf;
pub mod pptx;
pub mod report;
pub mod spreadsheet;
pub mod table;
pub mod text;

use crate::config::schema::AnalysisConfig;
use crate::utils::encoding::EncodingHandler;
use crate::utils::error::{AiDevError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

pub use pdf::PdfAnalyzer;
pub use pptx::PptxAnalyzer;
pub use spreadsheet::SpreadsheetAnalyzer;
pub use text::TextAnalyzer;

pub const SUPPORTED_EXTENSIONS: [&str; 7] = [".txt", ".md", ".pptx", ".xlsx", ".xls", ".csv", ".pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    Text,
    PowerPoint,
    Spreadsheet,
    Pdf,
}

impl AnalyzerKind {
    pub fn label(&self) -> &'static str {
        match self {
            AnalyzerKind::Text => "Text",
            AnalyzerKind::PowerPoint => "PowerPoint",
            AnalyzerKind::Spreadsheet => "Spreadsheet",
            AnalyzerKind::Pdf => "PDF",
        }
    }

    pub fn for_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "md" => Some(AnalyzerKind::Text),
            "pptx" => Some(AnalyzerKind::PowerPoint),
            "xlsx" | "xls" | "csv" => Some(AnalyzerKind::Spreadsheet),
            "pdf" => Some(AnalyzerKind::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub extension: String,
    pub path: String,
}

impl FileInfo {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let absolute = std::path::absolute(path)?;
        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: metadata.len(),
            extension: extension_of(path),
            path: absolute.to_string_lossy().into_owned(),
        })
    }
}

/// Result of analyzing one file. Analyzer specific sections live in `details`.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    #[serde(skip)]
    pub kind: AnalyzerKind,
    pub file_info: FileInfo,
    pub statistics: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Analysis {
    pub fn new(kind: AnalyzerKind, file_info: FileInfo) -> Self {
        Self {
            kind,
            file_info,
            statistics: Map::new(),
            summary: None,
            full_text: None,
            details: Map::new(),
        }
    }

    pub fn detail(&mut self, key: &str, value: impl Into<Value>) {
        self.details.insert(key.to_string(), value.into());
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerOptions {
    pub max_file_size: Option<u64>,
    pub extract_tables: bool,
    pub extract_images: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            max_file_size: None,
            extract_tables: true,
            extract_images: true,
        }
    }
}

impl AnalyzerOptions {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        Ok(Self {
            max_file_size: Some(config.max_file_size_bytes()?),
            extract_tables: config.extract_tables,
            extract_images: config.extract_images,
        })
    }

    /// Checks that `path` is an existing regular file within the size limit.
    pub fn check_file(&self, path: &Path) -> Result<FileInfo> {
        if !path.exists() {
            return Err(AiDevError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            )));
        }
        if !path.is_file() {
            return Err(AiDevError::ValidationError {
                message: format!("Not a file: {}", path.display()),
            });
        }

        let info = FileInfo::from_path(path)?;
        if let Some(limit) = self.max_file_size {
            if info.size > limit {
                return Err(AiDevError::ValidationError {
                    message: format!(
                        "File is too large: {} ({} bytes, limit {} bytes)",
                        path.display(),
                        info.size,
                        limit
                    ),
                });
            }
        }
        Ok(info)
    }
}

pub trait Analyzer: Send + Sync {
    fn kind(&self) -> AnalyzerKind;

    /// Structured analysis: file info, statistics, summary and format specific details.
    fn analyze(&self, path: &Path) -> Result<Analysis>;

    /// Plain text content, used as input for document generation.
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// `.md` style extension including the dot, as given in the file name.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

pub fn analyzer_for(path: &Path, options: AnalyzerOptions) -> Result<Box<dyn Analyzer>> {
    let extension = extension_of(path);
    let kind = AnalyzerKind::for_extension(&extension).ok_or_else(|| {
        AiDevError::unsupported(if extension.is_empty() {
            path.display().to_string()
        } else {
            extension.clone()
        })
    })?;

    let analyzer: Box<dyn Analyzer> = match kind {
        AnalyzerKind::Text => Box::new(TextAnalyzer::new(options)),
        AnalyzerKind::PowerPoint => Box::new(PptxAnalyzer::new(options)),
        AnalyzerKind::Spreadsheet => Box::new(SpreadsheetAnalyzer::new(options)),
        AnalyzerKind::Pdf => Box::new(PdfAnalyzer::new(options)),
    };
    Ok(analyzer)
}

/// Reads a generation input. Slide decks, workbooks and PDFs go through
/// their analyzer; anything else is read as text with encoding detection.
/// Returns the text and the name of the source encoding.
pub fn extract_source_text(path: &Path, options: AnalyzerOptions) -> Result<(String, String)> {
    let extension = extension_of(path).to_lowercase();
    match extension.as_str() {
        ".pptx" | ".xlsx" | ".xls" | ".pdf" => {
            let analyzer = analyzer_for(path, options)?;
            let text = analyzer.extract_text(path)?;
            Ok((text, "UTF-8".to_string()))
        }
        _ => {
            options.check_file(path)?;
            EncodingHandler::read_file_auto(path)
        }
    }
}

/// First `max` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
