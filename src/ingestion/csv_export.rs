//! CSV strategies - public export and per-tab data endpoint both answer
//! with plain CSV text.

use crate::error::{DashboardError, Result};
use crate::ingestion::client::{SheetEndpoints, SheetHttp, ACCEPT_CSV};
use crate::ingestion::provider::{fetch_timestamp, stamp_rows, SheetProvider};
use crate::record::{CellValue, RowRecord, SheetCollection};
use async_trait::async_trait;
use csv::ReaderBuilder;
use std::time::Duration;

/// Parsed CSV table
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub columns: Vec<String>,
    pub rows: Vec<RowRecord>,
}

fn coerce_cell(s: &str) -> CellValue {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return CellValue::Text(String::new());
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return CellValue::Number(i as f64);
    }

    // Plain dotted decimals only; "1,5" and currency stay text for the
    // analytics parsers.
    if trimmed.contains('.') && !trimmed.contains(',') {
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return CellValue::Number(f);
            }
        }
    }

    CellValue::Text(trimmed.to_string())
}

/// Parse CSV text with a header row. Blank lines and all-blank rows are
/// dropped; short rows keep the cells they have.
pub fn parse_csv_table(csv_text: &str) -> Result<CsvTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.trim_start_matches('\u{feff}').as_bytes());

    let columns = rdr
        .headers()
        .map_err(|e| DashboardError::Parse(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    if columns.iter().all(|c| c.is_empty()) {
        return Err(DashboardError::Parse("CSV has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut row = RowRecord::new();

        for (idx, header) in columns.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            if let Some(cell) = record.get(idx) {
                row.insert(header, coerce_cell(cell));
            }
        }

        if !row.is_empty() && !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(CsvTable { columns, rows })
}

/// Strategy: public CSV export of one tab
pub struct CsvExportProvider {
    http: SheetHttp,
    endpoints: SheetEndpoints,
    gid: u32,
    timeout: Duration,
}

impl CsvExportProvider {
    pub fn new(http: SheetHttp, endpoints: SheetEndpoints, gid: u32, timeout: Duration) -> Self {
        Self {
            http,
            endpoints,
            gid,
            timeout,
        }
    }
}

#[async_trait]
impl SheetProvider for CsvExportProvider {
    async fn fetch(&self) -> Result<SheetCollection> {
        let body = self
            .http
            .get_text(&self.endpoints.csv_export(self.gid), ACCEPT_CSV, self.timeout)
            .await?;
        let mut table = parse_csv_table(&body)?;
        stamp_rows(&mut table.rows, None, None, &fetch_timestamp());
        Ok(SheetCollection::Flat(table.rows))
    }

    fn name(&self) -> &str {
        "public CSV export"
    }

    fn source_type(&self) -> &str {
        "csv"
    }

    fn source_uri(&self) -> Option<String> {
        Some(self.endpoints.csv_export(self.gid))
    }
}

/// Strategy: per-tab public data endpoint (CSV output)
#[derive(Clone)]
pub struct GvizTabProvider {
    http: SheetHttp,
    endpoints: SheetEndpoints,
    gid: u32,
    timeout: Duration,
}

impl GvizTabProvider {
    pub fn new(http: SheetHttp, endpoints: SheetEndpoints, gid: u32, timeout: Duration) -> Self {
        Self {
            http,
            endpoints,
            gid,
            timeout,
        }
    }

    /// Fetch any tab through this provider's endpoint
    pub async fn fetch_tab(&self, gid: u32) -> Result<CsvTable> {
        let body = self
            .http
            .get_text(&self.endpoints.gviz_csv(gid), ACCEPT_CSV, self.timeout)
            .await?;
        parse_csv_table(&body)
    }
}

#[async_trait]
impl SheetProvider for GvizTabProvider {
    async fn fetch(&self) -> Result<SheetCollection> {
        let mut table = self.fetch_tab(self.gid).await?;
        stamp_rows(&mut table.rows, None, None, &fetch_timestamp());
        Ok(SheetCollection::Flat(table.rows))
    }

    fn name(&self) -> &str {
        "tab data endpoint"
    }

    fn source_type(&self) -> &str {
        "gviz"
    }

    fn source_uri(&self) -> Option<String> {
        Some(self.endpoints.gviz_csv(self.gid))
    }
}
