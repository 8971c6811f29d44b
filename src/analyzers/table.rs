//! Column-oriented view of spreadsheet data with the summary statistics
//! reported by the spreadsheet analyzer.

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    /// Interprets a raw CSV field.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Some(CellValue::Number(n));
            }
        }
        match trimmed {
            "True" | "TRUE" | "true" => Some(CellValue::Bool(true)),
            "False" | "FALSE" | "false" => Some(CellValue::Bool(false)),
            _ => Some(CellValue::Text(raw.to_string())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => json!(*n as i64),
            CellValue::Number(n) => json!(n),
            CellValue::Bool(b) => json!(b),
            CellValue::Text(s) => json!(s),
        }
    }

    pub fn display(&self) -> String {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(true) => "True".to_string(),
            CellValue::Bool(false) => "False".to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

pub type Cell = Option<CellValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Object,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int => "int64",
            ColumnType::Float => "float64",
            ColumnType::Bool => "bool",
            ColumnType::Object => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataTable {
    /// First row becomes the header. Blank header cells are named
    /// `Unnamed: n`, repeated names get a `.n` suffix.
    pub fn from_rows(mut rows: Vec<Vec<Cell>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let header = rows.remove(0);
        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);

        let mut seen: HashMap<String, usize> = HashMap::new();
        let columns = (0..width)
            .map(|i| {
                let base = match header.get(i).cloned().flatten() {
                    Some(value) => value.display(),
                    None => format!("Unnamed: {}", i),
                };
                let count = seen.entry(base.clone()).or_insert(0);
                let name = if *count == 0 {
                    base.clone()
                } else {
                    format!("{}.{}", base, count)
                };
                *count += 1;
                name
            })
            .collect();

        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[index])
    }

    pub fn column_type(&self, index: usize) -> ColumnType {
        let values: Vec<&CellValue> = self.column(index).flatten().collect();
        let has_missing = values.len() < self.rows.len();

        if values.is_empty() {
            return ColumnType::Float;
        }
        if values.iter().all(|v| matches!(v, CellValue::Number(_))) {
            let integral = values
                .iter()
                .all(|v| matches!(v, CellValue::Number(n) if n.fract() == 0.0));
            return if integral && !has_missing {
                ColumnType::Int
            } else {
                ColumnType::Float
            };
        }
        if !has_missing && values.iter().all(|v| matches!(v, CellValue::Bool(_))) {
            return ColumnType::Bool;
        }
        ColumnType::Object
    }

    pub fn null_count(&self, index: usize) -> usize {
        self.column(index).filter(|cell| cell.is_none()).count()
    }

    pub fn unique_count(&self, index: usize) -> usize {
        let mut values: Vec<String> = self
            .column(index)
            .flatten()
            .map(CellValue::display)
            .collect();
        values.sort();
        values.dedup();
        values.len()
    }

    pub fn data_types(&self) -> Map<String, Value> {
        self.per_column(|i| json!(self.column_type(i).name()))
    }

    pub fn null_values(&self) -> Map<String, Value> {
        self.per_column(|i| json!(self.null_count(i)))
    }

    pub fn unique_values(&self) -> Map<String, Value> {
        self.per_column(|i| json!(self.unique_count(i)))
    }

    fn per_column(&self, f: impl Fn(usize) -> Value) -> Map<String, Value> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), f(i)))
            .collect()
    }

    /// `numeric` (describe statistics) and `text` (unique, most common,
    /// missing) sections, each present only when such columns exist.
    pub fn statistics(&self) -> Map<String, Value> {
        let mut numeric = Map::new();
        let mut text = Map::new();

        for (i, name) in self.columns.iter().enumerate() {
            match self.column_type(i) {
                t if t.is_numeric() => {
                    let values: Vec<f64> =
                        self.column(i).flatten().filter_map(CellValue::as_number).collect();
                    numeric.insert(name.clone(), Value::Object(describe(&values)));
                }
                ColumnType::Object => {
                    text.insert(
                        name.clone(),
                        json!({
                            "unique": self.unique_count(i),
                            "most_common": self.most_common(i),
                            "missing": self.null_count(i),
                        }),
                    );
                }
                _ => {}
            }
        }

        let mut stats = Map::new();
        if !numeric.is_empty() {
            stats.insert("numeric".to_string(), Value::Object(numeric));
        }
        if !text.is_empty() {
            stats.insert("text".to_string(), Value::Object(text));
        }
        stats
    }

    /// Most frequent value; ties go to the smallest value.
    fn most_common(&self, index: usize) -> Option<String> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for value in self.column(index).flatten() {
            *counts.entry(value.display()).or_insert(0) += 1;
        }
        let max = counts.values().copied().max()?;
        counts
            .into_iter()
            .find(|(_, count)| *count == max)
            .map(|(value, _)| value)
    }

    pub fn head(&self, n: usize) -> Vec<Value> {
        self.records(self.rows.iter().take(n))
    }

    pub fn tail(&self, n: usize) -> Vec<Value> {
        self.records(self.rows.iter().skip(self.rows.len().saturating_sub(n)))
    }

    fn records<'a>(&self, rows: impl Iterator<Item = &'a Vec<Cell>>) -> Vec<Value> {
        rows.map(|row| {
            let record: Map<String, Value> = self
                .columns
                .iter()
                .zip(row)
                .map(|(name, cell)| {
                    (
                        name.clone(),
                        cell.as_ref().map(CellValue::to_json).unwrap_or(Value::Null),
                    )
                })
                .collect();
            Value::Object(record)
        })
        .collect()
    }

    /// Fixed-width rendering with a row index column, missing cells as `NaN`.
    pub fn to_text(&self) -> String {
        if self.rows.is_empty() {
            return format!(
                "Empty DataFrame\nColumns: [{}]\nIndex: []",
                self.columns.join(", ")
            );
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(CellValue::display).unwrap_or_else(|| "NaN".to_string()))
                    .map(|text| text.replace('\n', "\\n"))
                    .collect()
            })
            .collect();

        let index_width = (self.rows.len() - 1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let render = |index: String, values: &[String]| {
            let mut line = format!("{:>width$}", index, width = index_width);
            for (value, width) in values.iter().zip(&widths) {
                let pad = width.saturating_sub(value.chars().count());
                line.push_str("  ");
                line.push_str(&" ".repeat(pad));
                line.push_str(value);
            }
            line
        };

        let mut lines = vec![render(String::new(), &self.columns)];
        for (i, row) in cells.iter().enumerate() {
            lines.push(render(i.to_string(), row));
        }
        lines.join("\n")
    }
}

/// count, mean, std (sample), min, quartiles and max.
pub fn describe(values: &[f64]) -> Map<String, Value> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let count = sorted.len();

    let mean = if count > 0 {
        sorted.iter().sum::<f64>() / count as f64
    } else {
        f64::NAN
    };
    let std = if count > 1 {
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    } else {
        f64::NAN
    };

    let mut stats = Map::new();
    stats.insert("count".to_string(), json!(count as f64));
    stats.insert("mean".to_string(), Value::from(mean));
    stats.insert("std".to_string(), Value::from(std));
    stats.insert("min".to_string(), Value::from(quantile(&sorted, 0.0)));
    stats.insert("25%".to_string(), Value::from(quantile(&sorted, 0.25)));
    stats.insert("50%".to_string(), Value::from(quantile(&sorted, 0.5)));
    stats.insert("75%".to_string(), Value::from(quantile(&sorted, 0.75)));
    stats.insert("max".to_string(), Value::from(quantile(&sorted, 1.0)));
    stats
}

/// Linear interpolation between closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
