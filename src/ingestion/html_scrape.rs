//! HTML strategy - the spreadsheet edit page embeds its initial data as a
//! JSON object assigned to `window._docs_initialData`.

use crate::error::{DashboardError, Result};
use crate::ingestion::client::{SheetEndpoints, SheetHttp, ACCEPT_HTML};
use crate::ingestion::provider::{fetch_timestamp, stamp_rows, SheetProvider};
use crate::record::{RowRecord, SheetCollection};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;

lazy_static! {
    static ref INITIAL_DATA: Regex = Regex::new(r"window\._docs_initialData\s*=\s*").unwrap();
}

/// Locate and decode the embedded JSON object. Only the first complete JSON
/// value after the assignment is read, so trailing script text is ignored.
pub fn extract_initial_data(html: &str) -> Result<Value> {
    let m = INITIAL_DATA
        .find(html)
        .ok_or_else(|| DashboardError::Parse("No embedded sheet data in page".to_string()))?;

    let rest = &html[m.end()..];
    if !rest.starts_with('{') {
        return Err(DashboardError::Parse("Embedded sheet data is not an object".to_string()));
    }

    serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| DashboardError::Parse("Embedded sheet data is empty".to_string()))?
        .map_err(|e| DashboardError::Parse(format!("Embedded sheet data is not valid JSON: {}", e)))
}

/// Read the first sheet's grid: `sheets[0].data[0].rowData[*].values[*].formattedValue`.
/// The first non-empty row is the header.
pub fn parse_initial_data(data: &Value) -> Result<Vec<RowRecord>> {
    let row_data = data
        .get("sheets")
        .and_then(|s| s.get(0))
        .and_then(|s| s.get("data"))
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("rowData"))
        .and_then(Value::as_array)
        .ok_or_else(|| DashboardError::Parse("Embedded data has no rowData".to_string()))?;

    let grid: Vec<Vec<String>> = row_data
        .iter()
        .filter_map(|row| row.get("values").and_then(Value::as_array))
        .filter(|values| !values.is_empty())
        .map(|values| {
            values
                .iter()
                .map(|cell| {
                    cell.get("formattedValue")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string()
                })
                .collect()
        })
        .collect();

    let (header, body) = grid
        .split_first()
        .ok_or_else(|| DashboardError::Parse("Embedded grid is empty".to_string()))?;
    let headers: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    Ok(body
        .iter()
        .map(|values| RowRecord::from_pairs(&headers, values.iter().map(String::as_str)))
        .filter(|row| !row.is_empty() && !row.is_blank())
        .collect())
}

/// Strategy: scrape the edit page
pub struct HtmlScrapeProvider {
    http: SheetHttp,
    endpoints: SheetEndpoints,
    timeout: Duration,
}

impl HtmlScrapeProvider {
    pub fn new(http: SheetHttp, endpoints: SheetEndpoints, timeout: Duration) -> Self {
        Self {
            http,
            endpoints,
            timeout,
        }
    }
}

#[async_trait]
impl SheetProvider for HtmlScrapeProvider {
    async fn fetch(&self) -> Result<SheetCollection> {
        let html = self
            .http
            .get_text(&self.endpoints.edit_page(), ACCEPT_HTML, self.timeout)
            .await?;
        let data = extract_initial_data(&html)?;
        let mut rows = parse_initial_data(&data)?;
        stamp_rows(&mut rows, None, None, &fetch_timestamp());
        Ok(SheetCollection::Flat(rows))
    }

    fn name(&self) -> &str {
        "HTML page scrape"
    }

    fn source_type(&self) -> &str {
        "html"
    }

    fn source_uri(&self) -> Option<String> {
        Some(self.endpoints.edit_page())
    }
}
