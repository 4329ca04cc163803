pub mod analytics;
pub mod assistant;
pub mod cache;
pub mod config;
pub mod error;
pub mod failover;
pub mod http;
pub mod ingestion;
pub mod observability;
pub mod parse;
pub mod record;
pub mod report;
pub mod service;

pub use analytics::{aggregate, aggregate_collection, SalesAggregation};
pub use assistant::ConversationalResponder;
pub use cache::{SheetCache, spawn_refresh_loop};
pub use config::DashboardConfig;
pub use error::{DashboardError, ParseError, Result};
pub use ingestion::{FetchChain, SheetProvider, SheetSource};
pub use record::{CellValue, RowRecord, SheetCollection, SheetData};
pub use service::DashboardService;
