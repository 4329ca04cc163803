//! Ingestion Module
//!
//! Pulls the sales spreadsheet through several redundant strategies:
//! - Script endpoint (JSON, every sheet)
//! - Per-tab CSV pulls merged into named sheets
//! - Public CSV export
//! - Edit-page scrape
//!
//! and normalizes each answer into a `SheetCollection`.

pub mod all_tabs;
pub mod apps_script;
pub mod chain;
pub mod client;
pub mod csv_export;
pub mod html_scrape;
pub mod provider;

pub use all_tabs::AllTabsProvider;
pub use apps_script::AppsScriptProvider;
pub use chain::{FetchChain, SheetSource};
pub use client::{SheetEndpoints, SheetHttp};
pub use csv_export::{CsvExportProvider, GvizTabProvider};
pub use html_scrape::HtmlScrapeProvider;
pub use provider::SheetProvider;
