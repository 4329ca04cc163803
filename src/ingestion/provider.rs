//! Sheet Provider Trait - one concrete way of obtaining spreadsheet data

use crate::error::Result;
use crate::record::{CellValue, RowRecord, SheetCollection, COL_FETCHED_AT, COL_SHEET};
use async_trait::async_trait;
use chrono::Local;

/// A single fetch strategy.
///
/// Implementations:
/// - AppsScriptProvider: deployed script returning every sheet as JSON
/// - AllTabsProvider: per-tab CSV pulls merged into named sheets
/// - CsvExportProvider: public CSV export of one tab
/// - HtmlScrapeProvider: JSON embedded in the edit page
/// - GvizTabProvider: per-tab public data endpoint
#[async_trait]
pub trait SheetProvider: Send + Sync {
    /// Fetch and normalize. Any failure is an `Err`; the chain decides what
    /// to do with it.
    async fn fetch(&self) -> Result<SheetCollection>;

    /// Human-readable strategy name, used in logs
    fn name(&self) -> &str;

    /// Strategy kind (e.g. "csv", "html", "script")
    fn source_type(&self) -> &str;

    /// Endpoint, if the strategy has a single one
    fn source_uri(&self) -> Option<String> {
        None
    }
}

/// Timestamp stamped on fetched rows
pub fn fetch_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Add the sheet-name and fetch-time columns to every row, and to the
/// column list when one is given.
pub fn stamp_rows(
    rows: &mut [RowRecord],
    columns: Option<&mut Vec<String>>,
    sheet_name: Option<&str>,
    fetched_at: &str,
) {
    for row in rows.iter_mut() {
        if let Some(name) = sheet_name {
            row.insert(COL_SHEET, CellValue::Text(name.to_string()));
        }
        row.insert(COL_FETCHED_AT, CellValue::Text(fetched_at.to_string()));
    }
    if let Some(columns) = columns {
        let mut extra = Vec::new();
        if sheet_name.is_some() {
            extra.push(COL_SHEET);
        }
        extra.push(COL_FETCHED_AT);
        for column in extra {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_rows_adds_columns_once() {
        let mut rows = vec![RowRecord::new().with("Produto", "A")];
        let mut columns = vec!["Produto".to_string(), COL_SHEET.to_string()];

        stamp_rows(&mut rows, Some(&mut columns), Some("vendas_01_2025"), "2025-01-01 10:00:00");

        assert_eq!(columns, vec!["Produto", COL_SHEET, COL_FETCHED_AT]);
        assert_eq!(rows[0].text(COL_SHEET).as_deref(), Some("vendas_01_2025"));
        assert_eq!(rows[0].text(COL_FETCHED_AT).as_deref(), Some("2025-01-01 10:00:00"));
    }
}
