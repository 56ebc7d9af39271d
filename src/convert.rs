//! Format conversion between spreadsheets, CSV, JSON, JSON Lines and
//! Markdown.
//!
//! Spreadsheets and CSV files are tabular: the first row is the header and
//! every following row becomes one [`Record`]. When writing tables, the
//! header is the union of all record fields in first-seen order.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde_json::Value;

use crate::error::{DmError, Result};
use crate::record::Record;
use crate::store::{self, ensure_parent_dir};

/// Spreadsheet column dropped on import.
const PLACEHOLDER_COLUMN: &str = "-";

/// Supported conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertMode {
    ExcelToJsonl,
    ExcelToCsv,
    JsonlToExcel,
    JsonlToCsv,
    CsvToJsonl,
    JsonlToJson,
    JsonToJsonl,
    MarkdownToHtml,
}

impl ConvertMode {
    pub const ALL: [ConvertMode; 8] = [
        ConvertMode::ExcelToJsonl,
        ConvertMode::ExcelToCsv,
        ConvertMode::JsonlToExcel,
        ConvertMode::JsonlToCsv,
        ConvertMode::CsvToJsonl,
        ConvertMode::JsonlToJson,
        ConvertMode::JsonToJsonl,
        ConvertMode::MarkdownToHtml,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConvertMode::ExcelToJsonl => "excel2jsonl",
            ConvertMode::ExcelToCsv => "excel2csv",
            ConvertMode::JsonlToExcel => "jsonl2excel",
            ConvertMode::JsonlToCsv => "jsonl2csv",
            ConvertMode::CsvToJsonl => "csv2jsonl",
            ConvertMode::JsonlToJson => "jsonl2json",
            ConvertMode::JsonToJsonl => "json2jsonl",
            ConvertMode::MarkdownToHtml => "md2html",
        }
    }
}

impl FromStr for ConvertMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        ConvertMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unrecognised mode {s}"))
    }
}

impl fmt::Display for ConvertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert `input` into `output` according to `mode`.
pub fn convert(mode: ConvertMode, input: &Path, output: &Path) -> Result<()> {
    log::info!(
        "converting {} -> {} ({mode})",
        input.display(),
        output.display()
    );
    match mode {
        ConvertMode::ExcelToJsonl => store::write_jsonl(output, &read_excel(input)?, false),
        ConvertMode::ExcelToCsv => write_csv(output, &read_excel(input)?),
        ConvertMode::JsonlToExcel => write_excel(output, &store::read_jsonl(input)?),
        ConvertMode::JsonlToCsv => write_csv(output, &store::read_jsonl(input)?),
        ConvertMode::CsvToJsonl => store::write_jsonl(output, &read_csv(input)?, false),
        ConvertMode::JsonlToJson => store::write_json(output, &store::read_jsonl(input)?),
        ConvertMode::JsonToJsonl => store::write_jsonl(output, &store::read_json(input)?, false),
        ConvertMode::MarkdownToHtml => {
            let text = fs::read_to_string(input).map_err(|e| DmError::io(input, e))?;
            ensure_parent_dir(output)?;
            fs::write(output, markdown_to_html(&text)).map_err(|e| DmError::io(output, e))
        }
    }
}

/// Read the first sheet of a workbook.
///
/// Date cells become `YYYY-MM-DD` strings, integral floats become integers
/// and empty cells become `null`. A column headed `-` is dropped.
pub fn read_excel(path: &Path) -> Result<Vec<Record>> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DmError::InvalidArgument(format!("{} has no sheets", path.display())))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<Option<String>> = header
        .iter()
        .enumerate()
        .map(|(col, cell)| {
            let name = match cell_value(cell) {
                Value::Null => format!("Unnamed: {col}"),
                Value::String(s) => s,
                other => other.to_string(),
            };
            (name != PLACEHOLDER_COLUMN).then_some(name)
        })
        .collect();

    let records: Vec<Record> = rows
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .filter_map(|(col, name)| {
                    let name = name.as_ref()?;
                    let value = row.get(col).map(cell_value).unwrap_or(Value::Null);
                    Some((name.clone(), value))
                })
                .collect()
        })
        .collect();
    log::debug!(
        "read {} rows from sheet '{sheet_name}' of {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Value::from(*f as i64)
            } else {
                Value::from(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Value::String(datetime.date().to_string()),
            None => Value::from(dt.as_f64()),
        },
        Data::DateTimeIso(s) => {
            Value::String(s.split('T').next().unwrap_or(s.as_str()).to_string())
        }
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(e.to_string()),
    }
}

/// Write records to a single-sheet workbook.
pub fn write_excel(path: &Path, records: &[Record]) -> Result<()> {
    let columns = table_columns(records);
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string(0, column_index(col)?, name)?;
    }
    for (i, record) in records.iter().enumerate() {
        let row = u32::try_from(i + 1)
            .map_err(|_| DmError::InvalidArgument("too many rows for a worksheet".to_string()))?;
        for (col, name) in columns.iter().enumerate() {
            if let Some(value) = record.get(name) {
                write_cell(worksheet, row, column_index(col)?, value)?;
            }
        }
    }

    ensure_parent_dir(path)?;
    workbook.save(path)?;
    log::debug!("wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

fn column_index(col: usize) -> Result<u16> {
    u16::try_from(col)
        .map_err(|_| DmError::InvalidArgument("too many columns for a worksheet".to_string()))
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                ws.write_number(row, col, f)?;
            }
            None => {
                ws.write_string(row, col, n.to_string())?;
            }
        },
        Value::String(s) => {
            ws.write_string(row, col, s)?;
        }
        nested => {
            ws.write_string(row, col, nested.to_string())?;
        }
    }
    Ok(())
}

/// Read a CSV file with a header row. Every value is read as a string.
pub fn read_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut records: Vec<Record> = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(
            headers
                .iter()
                .zip(row.iter())
                .map(|(name, field)| (name.to_string(), Value::String(field.to_string())))
                .collect(),
        );
    }
    Ok(records)
}

/// Write records as CSV with a header row.
pub fn write_csv(path: &Path, records: &[Record]) -> Result<()> {
    let columns = table_columns(records);
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&columns)?;
    for record in records {
        writer.write_record(
            columns
                .iter()
                .map(|name| record.get(name).map(cell_text).unwrap_or_default()),
        )?;
    }
    writer.flush().map_err(|e| DmError::io(path, e))?;
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Union of the records' field names in first-seen order.
pub fn table_columns(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.to_string());
            }
        }
    }
    columns
}

/// Render CommonMark text to an HTML fragment.
pub fn markdown_to_html(text: &str) -> String {
    let parser = pulldown_cmark::Parser::new(text);
    let mut html = String::with_capacity(text.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}
