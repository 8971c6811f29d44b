//! Rendering of an [`Analysis`] for the `analyze file` command.

use super::{truncate_chars, Analysis};
use crate::utils::error::{AiDevError, Result};
use serde_json::{Map, Value};
use std::str::FromStr;

const PREVIEW_LENGTH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = AiDevError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Ok(ReportFormat::Markdown),
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(AiDevError::unsupported(other.to_string())),
        }
    }
}

pub fn format_analysis(analysis: &Analysis, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Markdown => Ok(format_markdown(analysis)),
        ReportFormat::Text => format_text(analysis),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(&analysis.to_value()?)?),
    }
}

/// Strings as they are, anything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn format_markdown(analysis: &Analysis) -> String {
    let mut lines = vec![format!("# {} Analysis Report\n", analysis.kind.label())];

    let info = &analysis.file_info;
    lines.push("## File Information".to_string());
    lines.push(format!("- **name**: {}", info.name));
    lines.push(format!("- **size**: {}", info.size));
    lines.push(format!("- **extension**: {}", info.extension));
    lines.push(format!("- **path**: {}", info.path));
    lines.push(String::new());

    lines.push("## Statistics".to_string());
    for (key, value) in &analysis.statistics {
        lines.push(format!("- **{}**: {}", key, display_value(value)));
    }
    lines.push(String::new());

    if let Some(summary) = &analysis.summary {
        lines.push("## Summary".to_string());
        lines.push(summary.clone());
        lines.push(String::new());
    }

    if let Some(full_text) = &analysis.full_text {
        lines.push("## Content Preview".to_string());
        lines.push("```".to_string());
        lines.push(truncate_chars(full_text, PREVIEW_LENGTH).to_string());
        if full_text.chars().count() > PREVIEW_LENGTH {
            lines.push("... (truncated)".to_string());
        }
        lines.push("```".to_string());
    }

    lines.join("\n")
}

pub fn format_text(analysis: &Analysis) -> Result<String> {
    let mut lines = vec![
        format!("{} Analysis Report", analysis.kind.label()),
        "=".repeat(50),
        String::new(),
    ];
    if let Value::Object(map) = analysis.to_value()? {
        dump(&map, 0, &mut lines);
    }
    Ok(lines.join("\n"))
}

fn dump(map: &Map<String, Value>, indent: usize, lines: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    for (key, value) in map {
        match value {
            Value::Object(inner) => {
                lines.push(format!("{}{}:", pad, key));
                dump(inner, indent + 2, lines);
            }
            Value::Array(items) => lines.push(format!("{}{}: [{} items]", pad, key, items.len())),
            other => lines.push(format!("{}{}: {}", pad, key, display_value(other))),
        }
    }
}
