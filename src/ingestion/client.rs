//! Shared HTTP client for the sheet strategies

use crate::error::{DashboardError, Result};
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const ACCEPT_CSV: &str = "text/csv,text/plain,*/*";
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_JSON: &str = "application/json";

/// Thin wrapper over `reqwest::Client` that turns non-200 answers and empty
/// bodies into errors, so every strategy fails the same way.
#[derive(Clone)]
pub struct SheetHttp {
    client: reqwest::Client,
}

impl SheetHttp {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DashboardError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn get_text(&self, url: &str, accept: &str, timeout: Duration) -> Result<String> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header("Accept", accept)
            .header("Accept-Language", "pt-BR,pt;q=0.9,en;q=0.8")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| DashboardError::Http(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(DashboardError::Http(format!("{} returned status {}", url, status.as_u16())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::Http(format!("Failed to read body from {}: {}", url, e)))?;
        if body.trim().is_empty() {
            return Err(DashboardError::Parse(format!("Empty body from {}", url)));
        }
        Ok(body)
    }
}

/// URL builder for the spreadsheet endpoints
#[derive(Debug, Clone)]
pub struct SheetEndpoints {
    base_url: String,
    spreadsheet_id: String,
}

impl SheetEndpoints {
    pub fn new(base_url: &str, spreadsheet_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    pub fn csv_export(&self, gid: u32) -> String {
        format!(
            "{}/spreadsheets/d/{}/export?format=csv&gid={}",
            self.base_url, self.spreadsheet_id, gid
        )
    }

    pub fn edit_page(&self) -> String {
        format!("{}/spreadsheets/d/{}/edit", self.base_url, self.spreadsheet_id)
    }

    pub fn gviz_csv(&self, gid: u32) -> String {
        format!(
            "{}/spreadsheets/d/{}/gviz/tq?tqx=out:csv&gid={}",
            self.base_url, self.spreadsheet_id, gid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let endpoints = SheetEndpoints::new("https://docs.google.com/", "abc");
        assert_eq!(
            endpoints.csv_export(0),
            "https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=0"
        );
        assert_eq!(endpoints.edit_page(), "https://docs.google.com/spreadsheets/d/abc/edit");
        assert_eq!(
            endpoints.gviz_csv(7),
            "https://docs.google.com/spreadsheets/d/abc/gviz/tq?tqx=out:csv&gid=7"
        );
    }
}
