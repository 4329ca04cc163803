//! Row and Sheet Model
//!
//! Spreadsheet rows arrive loosely typed: any column may be missing and any
//! cell may be text or a number. `RowRecord` keeps the raw cells in column
//! order; `SaleRecord` is the typed view used by the analytics with explicit
//! default resolution for each field.

use crate::parse::{self, ParseResult};
use chrono::NaiveDate;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

pub const COL_PRODUCT: &str = "Produto";
pub const COL_REVENUE: &str = "Receita Total";
pub const COL_REGION: &str = "Região";
pub const COL_CATEGORY: &str = "Categoria";
pub const COL_SELLER: &str = "Vendedor";
pub const COL_CUSTOMER: &str = "Cliente";
pub const COL_DATE: &str = "Data";
pub const COL_QUANTITY: &str = "Quantidade";

/// Column stamped with the sheet a row came from
pub const COL_SHEET: &str = "guia";
/// Column stamped with the fetch timestamp
pub const COL_FETCHED_AT: &str = "ultima_atualizacao";

/// Bucket label used when a dimension column is missing or blank
pub const DEFAULT_LABEL: &str = "Outros";

/// A single raw cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Convert a JSON cell. Nulls and nested values are dropped.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(CellValue::Text(s.clone())),
            Value::Number(n) => n.as_f64().map(CellValue::Number),
            Value::Bool(b) => Some(CellValue::Text(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Textual form; integral numbers print without a fractional part
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            CellValue::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

/// One spreadsheet row: column label -> raw value, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRecord {
    cells: Vec<(String, CellValue)>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures
    pub fn with(mut self, column: &str, value: impl Into<CellValue>) -> Self {
        self.insert(column, value.into());
        self
    }

    /// Zip a header row with a value row. Missing trailing cells are skipped.
    pub fn from_pairs<'a, I>(headers: &[String], values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut row = Self::new();
        for (header, value) in headers.iter().zip(values) {
            if header.is_empty() {
                continue;
            }
            row.insert(header, CellValue::Text(value.trim().to_string()));
        }
        row
    }

    /// Build from a JSON object, keeping the object's key order
    pub fn from_json_object(obj: &serde_json::Map<String, Value>) -> Self {
        let mut row = Self::new();
        for (key, value) in obj {
            if let Some(cell) = CellValue::from_json(value) {
                row.insert(key.trim(), cell);
            }
        }
        row
    }

    /// Insert or replace a cell
    pub fn insert(&mut self, column: &str, value: CellValue) {
        match self.cells.iter_mut().find(|(c, _)| c == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    /// Exact label lookup, falling back to a case-insensitive match
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .or_else(|| self.cells.iter().find(|(c, _)| c.to_lowercase() == column.to_lowercase()))
            .map(|(_, v)| v)
    }

    /// Trimmed non-empty text of a column
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column)
            .filter(|v| !v.is_blank())
            .map(|v| v.as_text().trim().to_string())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when every cell is blank (trailing empty CSV lines)
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_blank())
    }
}

impl Serialize for RowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Typed view of a sales row
#[derive(Debug, Clone, Default)]
pub struct SaleRecord {
    pub product: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub seller: Option<String>,
    pub customer: Option<String>,
    pub date: Option<CellValue>,
    pub revenue: Option<CellValue>,
    pub quantity: Option<CellValue>,
}

impl SaleRecord {
    pub fn from_row(row: &RowRecord) -> Self {
        Self {
            product: row.text(COL_PRODUCT),
            category: row.text(COL_CATEGORY),
            region: row.text(COL_REGION),
            seller: row.text(COL_SELLER),
            customer: row.text(COL_CUSTOMER),
            date: row.get(COL_DATE).cloned(),
            revenue: row.get(COL_REVENUE).cloned(),
            quantity: row.get(COL_QUANTITY).cloned(),
        }
    }

    pub fn product_or_default(&self) -> &str {
        self.product.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn region_or_default(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn seller_or_default(&self) -> &str {
        self.seller.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn revenue(&self) -> ParseResult<f64> {
        parse::parse_amount(self.revenue.as_ref())
    }

    pub fn quantity(&self) -> ParseResult<i64> {
        parse::parse_quantity(self.quantity.as_ref())
    }

    pub fn sale_date(&self) -> ParseResult<NaiveDate> {
        parse::parse_date(self.date.as_ref())
    }
}

/// One tab of the spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub key: String,
    pub name: String,
    pub gid: u64,
    pub columns: Vec<String>,
    rows: Vec<RowRecord>,
}

impl SheetData {
    pub fn new(key: String, name: String, gid: u64, columns: Vec<String>, rows: Vec<RowRecord>) -> Self {
        Self {
            key,
            name,
            gid,
            columns,
            rows,
        }
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    /// Always equal to the number of rows held
    pub fn record_count(&self) -> usize {
        self.rows.len()
    }
}

impl Serialize for SheetData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("gid", &self.gid)?;
        map.serialize_entry("rows", &self.rows)?;
        map.serialize_entry("record_count", &self.record_count())?;
        map.serialize_entry("columns", &self.columns)?;
        map.end()
    }
}

/// Per-sheet counts exposed by the data endpoints
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SheetSummary {
    pub key: String,
    pub name: String,
    pub record_count: usize,
}

/// The cached data set: a flat row list or a set of named sheets
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCollection {
    Flat(Vec<RowRecord>),
    Sheets(Vec<SheetData>),
}

impl SheetCollection {
    /// Every row, sheets concatenated in order
    pub fn records(&self) -> Vec<&RowRecord> {
        match self {
            SheetCollection::Flat(rows) => rows.iter().collect(),
            SheetCollection::Sheets(sheets) => sheets.iter().flat_map(|s| s.rows.iter()).collect(),
        }
    }

    pub fn total_records(&self) -> usize {
        match self {
            SheetCollection::Flat(rows) => rows.len(),
            SheetCollection::Sheets(sheets) => sheets.iter().map(SheetData::record_count).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }

    pub fn sheet_count(&self) -> usize {
        match self {
            SheetCollection::Flat(_) => 1,
            SheetCollection::Sheets(sheets) => sheets.len(),
        }
    }

    pub fn sheet(&self, key: &str) -> Option<&SheetData> {
        match self {
            SheetCollection::Flat(_) => None,
            SheetCollection::Sheets(sheets) => sheets.iter().find(|s| s.key == key),
        }
    }

    pub fn summaries(&self) -> Vec<SheetSummary> {
        match self {
            SheetCollection::Flat(rows) => vec![SheetSummary {
                key: "main".to_string(),
                name: "Planilha Principal".to_string(),
                record_count: rows.len(),
            }],
            SheetCollection::Sheets(sheets) => sheets
                .iter()
                .map(|s| SheetSummary {
                    key: s.key.clone(),
                    name: s.name.clone(),
                    record_count: s.record_count(),
                })
                .collect(),
        }
    }
}

impl Serialize for SheetCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SheetCollection::Flat(rows) => {
                let mut seq = serializer.serialize_seq(Some(rows.len()))?;
                for row in rows {
                    seq.serialize_element(row)?;
                }
                seq.end()
            }
            SheetCollection::Sheets(sheets) => {
                let mut map = serializer.serialize_map(Some(sheets.len()))?;
                for sheet in sheets {
                    map.serialize_entry(&sheet.key, sheet)?;
                }
                map.end()
            }
        }
    }
}
