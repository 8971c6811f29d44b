use super::ooxml::{attr, Package};
use super::table::{Cell, CellValue, DataTable};
use super::{extension_of, Analysis, Analyzer, AnalyzerKind, AnalyzerOptions};
use crate::utils::encoding::EncodingHandler;
use crate::utils::error::{AiDevError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

const MAX_FORMULAS: usize = 100;
const CSV_SHEET_NAME: &str = "CSV Data";

/// `.xlsx` workbooks and `.csv` files.
pub struct SpreadsheetAnalyzer {
    options: AnalyzerOptions,
}

struct Sheet {
    name: String,
    table: DataTable,
}

struct Workbook {
    sheets: Vec<Sheet>,
    active_sheet: Option<String>,
    formulas: Vec<Value>,
    charts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SheetFormat {
    Csv,
    Xlsx,
}

impl SpreadsheetAnalyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self { options }
    }

    fn format_of(path: &Path) -> Result<SheetFormat> {
        let extension = extension_of(path).to_lowercase();
        match extension.as_str() {
            ".csv" => Ok(SheetFormat::Csv),
            ".xlsx" => Ok(SheetFormat::Xlsx),
            ".xls" => Err(AiDevError::unsupported(
                ".xls (legacy binary workbook, save it as .xlsx)",
            )),
            other => Err(AiDevError::unsupported(other.to_string())),
        }
    }

    fn analyze_csv(&self, analysis: &mut Analysis, path: &Path) -> Result<()> {
        let (table, encoding) = read_csv(path)?;

        analysis.detail("encoding", encoding);
        analysis.detail(
            "sheet_info",
            json!({"sheets": [CSV_SHEET_NAME], "active_sheet": CSV_SHEET_NAME}),
        );
        analysis.detail(
            "data_info",
            json!({
                "rows": table.row_count(),
                "columns": table.column_count(),
                "column_names": table.columns,
                "data_types": table.data_types(),
            }),
        );
        analysis.statistics = table.statistics();
        analysis.detail(
            "sample_data",
            json!({"head": table.head(10), "tail": table.tail(5)}),
        );
        analysis.detail("null_values", table.null_values());
        analysis.detail("unique_values", table.unique_values());
        analysis.summary = Some(table_summary(&table));
        Ok(())
    }

    fn analyze_xlsx(&self, analysis: &mut Analysis, path: &Path) -> Result<()> {
        let workbook = read_workbook(path)?;
        let sheet_names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();

        analysis.detail(
            "workbook_info",
            json!({
                "sheet_count": workbook.sheets.len(),
                "sheet_names": sheet_names,
                "active_sheet": workbook.active_sheet,
            }),
        );

        let sheets: Vec<Value> = workbook
            .sheets
            .iter()
            .map(|sheet| {
                json!({
                    "name": sheet.name,
                    "rows": sheet.table.row_count(),
                    "columns": sheet.table.column_count(),
                    "column_names": sheet.table.columns,
                    "data_types": sheet.table.data_types(),
                    "null_values": sheet.table.null_values(),
                    "sample_data": {"head": sheet.table.head(5)},
                })
            })
            .collect();
        analysis.detail("sheets", sheets);

        analysis.statistics = workbook
            .sheets
            .iter()
            .map(|sheet| (sheet.name.clone(), Value::Object(sheet.table.statistics())))
            .collect();
        analysis.detail("formulas", workbook.formulas);
        analysis.detail("charts", workbook.charts);
        analysis.summary = Some(workbook_summary(&workbook.sheets));
        Ok(())
    }
}

impl Analyzer for SpreadsheetAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Spreadsheet
    }

    fn analyze(&self, path: &Path) -> Result<Analysis> {
        let format = Self::format_of(path)?;
        let file_info = self.options.check_file(path)?;
        let mut analysis = Analysis::new(AnalyzerKind::Spreadsheet, file_info);

        match format {
            SheetFormat::Csv => self.analyze_csv(&mut analysis, path)?,
            SheetFormat::Xlsx => self.analyze_xlsx(&mut analysis, path)?,
        }
        Ok(analysis)
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        let format = Self::format_of(path)?;
        self.options.check_file(path)?;

        let sections = match format {
            SheetFormat::Csv => {
                let (table, _) = read_csv(path)?;
                vec![format!("=== {} ===", CSV_SHEET_NAME), table.to_text()]
            }
            SheetFormat::Xlsx => read_workbook(path)?
                .sheets
                .iter()
                .flat_map(|sheet| [format!("=== Sheet: {} ===", sheet.name), sheet.table.to_text()])
                .collect(),
        };
        Ok(sections.join("\n\n"))
    }
}

/// Reads a CSV file with encoding detection. Rows longer than the header
/// are skipped, shorter rows are padded with missing values.
fn read_csv(path: &Path) -> Result<(DataTable, String)> {
    let (text, encoding) = EncodingHandler::read_file_auto(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut width = None;
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let expected = *width.get_or_insert(record.len());
        if record.len() > expected {
            skipped += 1;
            continue;
        }
        rows.push(record.iter().map(CellValue::parse).collect());
    }
    if skipped > 0 {
        tracing::warn!("Skipped {} malformed lines in {}", skipped, path.display());
    }

    Ok((DataTable::from_rows(rows), encoding))
}

fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut package = Package::open(path)?;
    let workbook_xml = package
        .read_part("xl/workbook.xml")?
        .ok_or_else(|| AiDevError::analysis("xl/workbook.xml is missing"))?;
    let relationships = package.relationships("xl/workbook.xml")?;

    let shared_strings_part = relationships
        .values()
        .find(|rel| rel.is_type("/sharedStrings"))
        .map(|rel| rel.target.clone())
        .unwrap_or_else(|| "xl/sharedStrings.xml".to_string());
    let shared_strings = match package.read_part(&shared_strings_part)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let (entries, active_tab) = parse_workbook_sheets(&workbook_xml)?;

    let mut sheets = Vec::new();
    let mut formulas = Vec::new();
    for (name, rel_id) in entries {
        let Some(target) = relationships.get(&rel_id).map(|rel| rel.target.clone()) else {
            tracing::warn!("Sheet '{}' has no worksheet part", name);
            continue;
        };
        let Some(xml) = package.read_part(&target)? else {
            tracing::warn!("Worksheet part {} is missing", target);
            continue;
        };
        let table = parse_worksheet(&xml, &shared_strings, &name, &mut formulas)?;
        sheets.push(Sheet { name, table });
    }

    let active_sheet = sheets.get(active_tab).map(|s| s.name.clone());
    let charts = package
        .part_names()
        .iter()
        .filter(|name| name.starts_with("xl/charts/chart") && name.ends_with(".xml"))
        .count();

    Ok(Workbook {
        sheets,
        active_sheet,
        formulas,
        charts,
    })
}

/// Sheet `(name, relationship id)` pairs in workbook order and the active tab index.
fn parse_workbook_sheets(xml: &str) -> Result<(Vec<(String, String)>, usize)> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    let mut active_tab = 0;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sheet" => {
                    if let (Some(name), Some(rel_id)) = (attr(&e, "name")?, attr(&e, "r:id")?) {
                        sheets.push((name, rel_id));
                    }
                }
                b"workbookView" => {
                    active_tab = attr(&e, "activeTab")?
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok((sheets, active_tab))
}

/// Text of each `<si>`, leaving out phonetic runs.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text && !in_phonetic => {
                if let Some(current) = current.as_mut() {
                    current.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Default)]
struct CellBuilder {
    reference: Option<String>,
    cell_type: Option<String>,
    value: String,
    formula: String,
    has_value: bool,
}

impl CellBuilder {
    fn build(self, shared_strings: &[String]) -> Option<CellValue> {
        if !self.has_value {
            return None;
        }
        let value = self.value;
        match self.cell_type.as_deref() {
            Some("s") => value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| shared_strings.get(idx))
                .filter(|s| !s.is_empty())
                .map(|s| CellValue::Text(s.clone())),
            Some("b") => Some(CellValue::Bool(value.trim() == "1")),
            Some("str") | Some("inlineStr") | Some("e") => {
                (!value.is_empty()).then(|| CellValue::Text(value))
            }
            _ => match value.trim().parse::<f64>() {
                Ok(n) => Some(CellValue::Number(n)),
                Err(_) => (!value.is_empty()).then(|| CellValue::Text(value)),
            },
        }
    }
}

/// Zero-based `(column, row)` of an `A1` style reference.
fn cell_position(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let column = letters.chars().try_fold(0u32, |acc, c| {
        c.is_ascii_alphabetic()
            .then(|| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
    })?;
    let row: u32 = digits.parse().ok()?;
    Some((column - 1, row.checked_sub(1)?))
}

fn parse_worksheet(
    xml: &str,
    shared_strings: &[String],
    sheet_name: &str,
    formulas: &mut Vec<Value>,
) -> Result<DataTable> {
    let mut reader = Reader::from_str(xml);
    let mut grid: BTreeMap<u32, BTreeMap<u32, CellValue>> = BTreeMap::new();

    let mut row_index: u32 = 0;
    let mut next_column: u32 = 0;
    let mut cell: Option<CellBuilder> = None;
    let mut in_value = false;
    let mut in_formula = false;
    let mut in_inline_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_index = attr(&e, "r")?
                        .and_then(|r| r.parse::<u32>().ok())
                        .and_then(|r| r.checked_sub(1))
                        .unwrap_or(row_index);
                    next_column = 0;
                }
                b"c" => {
                    cell = Some(CellBuilder {
                        reference: attr(&e, "r")?,
                        cell_type: attr(&e, "t")?,
                        ..CellBuilder::default()
                    });
                }
                b"v" => in_value = true,
                b"f" => in_formula = true,
                b"t" => in_inline_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => next_column += 1,
            Event::Text(t) => {
                if let Some(cell) = cell.as_mut() {
                    if in_value {
                        cell.value.push_str(&t.unescape()?);
                        cell.has_value = true;
                    } else if in_formula {
                        cell.formula.push_str(&t.unescape()?);
                    } else if in_inline_text && !in_phonetic {
                        cell.value.push_str(&t.unescape()?);
                        cell.has_value = true;
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"f" => in_formula = false,
                b"t" => in_inline_text = false,
                b"rPh" => in_phonetic = false,
                b"row" => row_index += 1,
                b"c" => {
                    let Some(builder) = cell.take() else {
                        continue;
                    };
                    let (column, row) = builder
                        .reference
                        .as_deref()
                        .and_then(cell_position)
                        .unwrap_or((next_column, row_index));
                    next_column = column + 1;

                    if !builder.formula.is_empty() && formulas.len() < MAX_FORMULAS {
                        let reference = builder.reference.clone().unwrap_or_default();
                        formulas.push(json!({
                            "sheet": sheet_name,
                            "cell": reference,
                            "formula": format!("={}", builder.formula),
                        }));
                    }
                    if let Some(value) = builder.build(shared_strings) {
                        grid.entry(row).or_default().insert(column, value);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(DataTable::from_rows(grid_to_rows(grid)))
}

fn grid_to_rows(grid: BTreeMap<u32, BTreeMap<u32, CellValue>>) -> Vec<Vec<Cell>> {
    let Some(first_column) = grid.values().filter_map(|row| row.keys().next()).min().copied() else {
        return Vec::new();
    };
    let last_column = grid
        .values()
        .filter_map(|row| row.keys().next_back())
        .max()
        .copied()
        .unwrap_or(first_column);

    grid.into_values()
        .map(|mut row| {
            (first_column..=last_column)
                .map(|column| row.remove(&column))
                .collect()
        })
        .collect()
}

fn table_summary(table: &DataTable) -> String {
    let mut parts = vec![format!("データ: {}行 × {}列", table.row_count(), table.column_count())];

    if table.column_count() > 0 {
        let shown: Vec<&str> = table.columns.iter().take(5).map(String::as_str).collect();
        parts.push(format!("列: {}", shown.join(", ")));
        if table.column_count() > 5 {
            parts.push(format!("他{}列", table.column_count() - 5));
        }
    }

    let numeric = (0..table.column_count())
        .filter(|&i| table.column_type(i).is_numeric())
        .count();
    if numeric > 0 {
        parts.push(format!("数値列: {}個", numeric));
    }
    parts.join(" | ")
}

fn workbook_summary(sheets: &[Sheet]) -> String {
    let total_rows: usize = sheets.iter().map(|s| s.table.row_count()).sum();
    let mut summary = format!("シート数: {}, 総データ: {}行", sheets.len(), total_rows);

    if !sheets.is_empty() {
        let names: Vec<&str> = sheets.iter().take(3).map(|s| s.name.as_str()).collect();
        summary.push_str(&format!(" | シート: {}", names.join(", ")));
        if sheets.len() > 3 {
            summary.push_str(&format!(" 他{}シート", sheets.len() - 3));
        }
    }
    summary
}
