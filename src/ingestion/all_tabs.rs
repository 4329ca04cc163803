//! All-tabs strategy - pulls tabs 0..N-1 one at a time through the per-tab
//! endpoint and merges every non-empty tab into the named-sheets shape.
//! Missing or failing tabs are skipped.

use crate::error::Result;
use crate::ingestion::csv_export::{CsvTable, GvizTabProvider};
use crate::ingestion::provider::{fetch_timestamp, stamp_rows, SheetProvider};
use crate::record::{SheetCollection, SheetData};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use tracing::{info, warn};

/// Display name for a tab: monthly sales sheets, one per tab
pub fn tab_display_name(gid: u32) -> String {
    format!("vendas_{:02}_2025", gid + 1)
}

pub fn tab_key(gid: u32) -> String {
    format!("guia_{}", gid)
}

type TabFuture<'a> = Pin<Box<dyn Future<Output = Result<CsvTable>> + Send + 'a>>;

/// Fetch tabs `0..tab_count` with `fetch_tab` and merge the non-empty ones
pub async fn collect_tabs<'a, F>(tab_count: u32, fetched_at: &str, mut fetch_tab: F) -> SheetCollection
where
    F: FnMut(u32) -> TabFuture<'a>,
{
    let mut sheets = Vec::new();

    for gid in 0..tab_count {
        match fetch_tab(gid).await {
            Ok(mut table) if !table.rows.is_empty() => {
                let name = tab_display_name(gid);
                stamp_rows(&mut table.rows, Some(&mut table.columns), Some(&name), fetched_at);
                info!(tab = gid + 1, records = table.rows.len(), "Tab loaded");
                sheets.push(SheetData::new(tab_key(gid), name, gid as u64, table.columns, table.rows));
            }
            Ok(_) => warn!(tab = gid + 1, "Tab is empty"),
            Err(e) => warn!(tab = gid + 1, error = %e, "Tab unavailable"),
        }
    }

    let total: usize = sheets.iter().map(SheetData::record_count).sum();
    info!(
        tabs_with_data = sheets.len(),
        tab_count,
        records = total,
        "All-tabs pull finished"
    );
    SheetCollection::Sheets(sheets)
}

/// Strategy: every tab through the per-tab endpoint
pub struct AllTabsProvider {
    tabs: GvizTabProvider,
    tab_count: u32,
}

impl AllTabsProvider {
    pub fn new(tabs: GvizTabProvider, tab_count: u32) -> Self {
        Self { tabs, tab_count }
    }
}

#[async_trait]
impl SheetProvider for AllTabsProvider {
    async fn fetch(&self) -> Result<SheetCollection> {
        let fetched_at = fetch_timestamp();
        let tabs = &self.tabs;
        Ok(collect_tabs(self.tab_count, &fetched_at, |gid| Box::pin(tabs.fetch_tab(gid))).await)
    }

    fn name(&self) -> &str {
        "all tabs"
    }

    fn source_type(&self) -> &str {
        "gviz"
    }
}
