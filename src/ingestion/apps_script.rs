//! Script strategy - a deployed script endpoint that returns every sheet:
//! `{success, sheets: [{name, gid, data, columns}], totalSheets}`.

use crate::error::{DashboardError, Result};
use crate::ingestion::client::{SheetHttp, ACCEPT_JSON};
use crate::ingestion::provider::{fetch_timestamp, stamp_rows, SheetProvider};
use crate::record::{CellValue, RowRecord, SheetCollection, SheetData};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPayload {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub sheets: Vec<ScriptSheet>,
    #[serde(default)]
    pub total_sheets: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptSheet {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gid: Option<u64>,
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Rows arrive either as arrays zipped with `columns`, or as objects
fn script_row(value: &Value, columns: &[String]) -> Option<RowRecord> {
    match value {
        Value::Array(cells) => {
            let mut row = RowRecord::new();
            for (column, cell) in columns.iter().zip(cells) {
                if let Some(cell) = CellValue::from_json(cell) {
                    row.insert(column.trim(), cell);
                }
            }
            Some(row)
        }
        Value::Object(obj) => Some(RowRecord::from_json_object(obj)),
        _ => None,
    }
}

/// Normalize a script payload into the named-sheets shape. Sheets with no
/// rows are skipped.
pub fn parse_script_payload(payload: ScriptPayload, fetched_at: &str) -> Result<SheetCollection> {
    if !payload.success {
        let reason = payload.error.unwrap_or_else(|| "unknown error".to_string());
        return Err(DashboardError::Parse(format!("Script reported failure: {}", reason)));
    }

    info!(
        total_sheets = payload.total_sheets.unwrap_or(payload.sheets.len() as u64),
        "Script endpoint answered"
    );

    let mut sheets = Vec::new();
    for sheet in payload.sheets {
        let name = sheet.name.unwrap_or_else(|| "Unknown".to_string());
        let gid = sheet.gid.unwrap_or(0);

        let mut columns = if sheet.columns.is_empty() {
            sheet
                .data
                .iter()
                .find_map(Value::as_object)
                .map(|obj| obj.keys().cloned().collect())
                .unwrap_or_default()
        } else {
            sheet.columns
        };
        if columns.is_empty() || sheet.data.is_empty() {
            warn!(sheet = %name, "Sheet has no rows or columns, skipping");
            continue;
        }

        let mut rows: Vec<RowRecord> = sheet
            .data
            .iter()
            .filter_map(|v| script_row(v, &columns))
            .filter(|r| !r.is_empty() && !r.is_blank())
            .collect();
        if rows.is_empty() {
            continue;
        }
        stamp_rows(&mut rows, Some(&mut columns), Some(&name), fetched_at);

        info!(sheet = %name, records = rows.len(), "Sheet loaded");
        let data = SheetData::new(format!("guia_{}", gid), name, gid, columns, rows);
        // Keys are unique; a later sheet with the same gid replaces the earlier one
        match sheets.iter_mut().find(|s: &&mut SheetData| s.key == data.key) {
            Some(existing) => {
                warn!(key = %data.key, replaced = %existing.name, "Duplicate sheet gid, keeping the last one");
                *existing = data;
            }
            None => sheets.push(data),
        }
    }

    Ok(SheetCollection::Sheets(sheets))
}

/// Strategy: deployed script endpoint
pub struct AppsScriptProvider {
    http: SheetHttp,
    url: String,
    timeout: Duration,
}

impl AppsScriptProvider {
    pub fn new(http: SheetHttp, url: String, timeout: Duration) -> Self {
        Self { http, url, timeout }
    }
}

#[async_trait]
impl SheetProvider for AppsScriptProvider {
    async fn fetch(&self) -> Result<SheetCollection> {
        let body = self.http.get_text(&self.url, ACCEPT_JSON, self.timeout).await?;
        let payload: ScriptPayload = serde_json::from_str(&body)
            .map_err(|e| DashboardError::Parse(format!("Script answer is not valid JSON: {}", e)))?;
        parse_script_payload(payload, &fetch_timestamp())
    }

    fn name(&self) -> &str {
        "script endpoint"
    }

    fn source_type(&self) -> &str {
        "script"
    }

    fn source_uri(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{COL_FETCHED_AT, COL_PRODUCT, COL_SHEET};
    use serde_json::json;

    fn payload(value: Value) -> ScriptPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_array_rows_are_zipped_with_columns() {
        let p = payload(json!({
            "success": true,
            "totalSheets": 2,
            "sheets": [
                {"name": "Janeiro", "gid": 0, "columns": ["Produto", "Receita Total"],
                 "data": [["Notebook", 3500], ["Mouse", "49,90"]]},
                {"name": "Vazia", "gid": 5, "columns": ["Produto"], "data": []}
            ]
        }));

        let collection = parse_script_payload(p, "2025-01-01 00:00:00").unwrap();
        assert_eq!(collection.sheet_count(), 1);
        let sheet = collection.sheet("guia_0").unwrap();
        assert_eq!(sheet.name, "Janeiro");
        assert_eq!(sheet.record_count(), 2);
        assert_eq!(sheet.columns, vec!["Produto", "Receita Total", COL_SHEET, COL_FETCHED_AT]);
        assert_eq!(sheet.rows()[1].text(COL_SHEET).as_deref(), Some("Janeiro"));
        assert_eq!(sheet.rows()[0].get("Receita Total"), Some(&CellValue::Number(3500.0)));
    }

    #[test]
    fn test_object_rows_derive_columns() {
        let p = payload(json!({
            "success": true,
            "sheets": [{"name": "Fev", "gid": 123, "data": [{"Produto": "Mouse"}]}]
        }));
        let collection = parse_script_payload(p, "t").unwrap();
        let sheet = collection.sheet("guia_123").unwrap();
        assert_eq!(sheet.rows()[0].text(COL_PRODUCT).as_deref(), Some("Mouse"));
    }

    #[test]
    fn test_object_rows_keep_key_order() {
        let p = payload(json!({
            "success": true,
            "sheets": [{"name": "Mar", "gid": 2, "data": [
                {"Produto": "Mouse", "Data": "2025-03-01", "Receita Total": 50}
            ]}]
        }));
        let collection = parse_script_payload(p, "t").unwrap();
        let sheet = collection.sheet("guia_2").unwrap();
        assert_eq!(sheet.columns, vec!["Produto", "Data", "Receita Total", COL_SHEET, COL_FETCHED_AT]);
    }

    #[test]
    fn test_repeated_gid_keeps_last_sheet() {
        let p = payload(json!({
            "success": true,
            "sheets": [
                {"name": "Primeira", "columns": ["Produto"], "data": [["A"], ["B"]]},
                {"name": "Segunda", "columns": ["Produto"], "data": [["C"]]},
                {"name": "Outra", "gid": 7, "columns": ["Produto"], "data": [["D"]]}
            ]
        }));
        let collection = parse_script_payload(p, "t").unwrap();

        assert_eq!(collection.sheet_count(), 2);
        assert_eq!(collection.total_records(), 2);
        let first = collection.sheet("guia_0").unwrap();
        assert_eq!(first.name, "Segunda");
        assert_eq!(first.record_count(), 1);

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json.as_object().map(|o| o.len()), Some(2));
    }

    #[test]
    fn test_failure_flag_is_an_error() {
        let p = payload(json!({"success": false, "error": "Sheet not shared"}));
        let err = parse_script_payload(p, "t").unwrap_err();
        assert!(err.to_string().contains("Sheet not shared"));
    }
}
