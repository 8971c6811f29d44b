use crate::domain::model::{OutputFormat, Record};
use crate::utils::error::Result;
use serde_json::Value;

/// Renders generated records as Markdown, CSV, JSON or HTML.
pub struct OutputFormatter;

impl OutputFormatter {
    pub fn format_output(records: &[Record], format: OutputFormat, title: &str) -> Result<String> {
        match format {
            OutputFormat::Markdown => Ok(Self::to_markdown(records, title)),
            OutputFormat::Csv => Self::to_csv(records),
            OutputFormat::Json => Self::to_json(records),
            OutputFormat::Html => Ok(Self::to_html(records, title)),
        }
    }

    pub fn to_markdown(records: &[Record], title: &str) -> String {
        if records.is_empty() {
            return "No data available".to_string();
        }

        let mut lines = Vec::new();
        if !title.is_empty() {
            lines.push(format!("# {}", title));
            lines.push(String::new());
        }

        let headers = Self::headers(records);
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| Self::markdown_cell(record.data.get(h)))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                rows.iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render_row = |cells: &[String]| {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| {
                    let pad = width.saturating_sub(cell.chars().count());
                    format!(" {}{} ", cell, " ".repeat(pad))
                })
                .collect();
            format!("|{}|", padded.join("|"))
        };

        lines.push(render_row(&headers));
        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
        lines.push(format!("|{}|", separator.join("|")));
        for row in &rows {
            lines.push(render_row(row));
        }

        lines.join("\n")
    }

    pub fn to_csv(records: &[Record]) -> Result<String> {
        if records.is_empty() {
            return Ok(String::new());
        }

        let headers = Self::headers(records);
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&headers)?;
        for record in records {
            let row: Vec<String> = headers
                .iter()
                .map(|h| Self::cell_text(record.data.get(h)))
                .collect();
            writer.write_record(&row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn to_json(records: &[Record]) -> Result<String> {
        Ok(serde_json::to_string_pretty(records)?)
    }

    pub fn to_html(records: &[Record], title: &str) -> String {
        if records.is_empty() {
            return "<p>No data available</p>".to_string();
        }

        let mut html = vec![
            "<!DOCTYPE html>".to_string(),
            "<html>".to_string(),
            "<head>".to_string(),
            r#"<meta charset="UTF-8">"#.to_string(),
        ];
        if !title.is_empty() {
            html.push(format!("<title>{}</title>", escape_html(title)));
        }
        html.extend(
            [
                "<style>",
                "table { border-collapse: collapse; width: 100%; }",
                "th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }",
                "th { background-color: #f2f2f2; }",
                "tr:nth-child(even) { background-color: #f9f9f9; }",
                "</style>",
                "</head>",
                "<body>",
            ]
            .map(String::from),
        );
        if !title.is_empty() {
            html.push(format!("<h1>{}</h1>", escape_html(title)));
        }

        let headers = Self::headers(records);
        html.push("<table>".to_string());
        html.push("<thead>".to_string());
        html.push("<tr>".to_string());
        for header in &headers {
            html.push(format!("<th>{}</th>", escape_html(header)));
        }
        html.push("</tr>".to_string());
        html.push("</thead>".to_string());

        html.push("<tbody>".to_string());
        for record in records {
            html.push("<tr>".to_string());
            for header in &headers {
                let cell = escape_html(&Self::cell_text(record.data.get(header)));
                html.push(format!("<td>{}</td>", cell.replace('\n', "<br>")));
            }
            html.push("</tr>".to_string());
        }
        html.push("</tbody>".to_string());
        html.push("</table>".to_string());
        html.push("</body>".to_string());
        html.push("</html>".to_string());

        html.join("\n")
    }

    /// Column order: keys in the order they first appear across all records.
    fn headers(records: &[Record]) -> Vec<String> {
        let mut headers: Vec<String> = Vec::new();
        for record in records {
            for key in record.data.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }
        headers
    }

    fn cell_text(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}. {}", i + 1, Self::cell_text(Some(item))))
                .collect::<Vec<_>>()
                .join("\n"),
            Some(other) => other.to_string(),
        }
    }

    fn markdown_cell(value: Option<&Value>) -> String {
        Self::cell_text(value)
            .replace('|', "\\|")
            .replace("\r\n", "<br>")
            .replace('\n', "<br>")
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
