//! Fetch Strategy Chain
//!
//! Prioritized list of sheet providers. The first provider that returns a
//! non-empty collection wins; nothing is merged across providers.

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::failover::{self, Success};
use crate::ingestion::all_tabs::AllTabsProvider;
use crate::ingestion::apps_script::AppsScriptProvider;
use crate::ingestion::client::{SheetEndpoints, SheetHttp};
use crate::ingestion::csv_export::{CsvExportProvider, GvizTabProvider};
use crate::ingestion::html_scrape::HtmlScrapeProvider;
use crate::ingestion::provider::SheetProvider;
use crate::record::SheetCollection;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Anything that can produce a fresh collection; the cache depends on this
/// rather than on the concrete chain.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// `None` means every strategy failed: keep what you have.
    async fn fetch_all(&self) -> Option<SheetCollection>;
}

pub struct FetchChain {
    providers: Vec<Box<dyn SheetProvider>>,
}

impl FetchChain {
    pub fn new(providers: Vec<Box<dyn SheetProvider>>) -> Self {
        Self { providers }
    }

    /// Production order: script endpoint (when configured), all tabs, CSV
    /// export, page scrape, single tab.
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        let http = SheetHttp::new()?;
        let endpoints = SheetEndpoints::new(&config.sheets_base_url, &config.spreadsheet_id);
        let tabs = GvizTabProvider::new(http.clone(), endpoints.clone(), 0, config.csv_timeout);

        let mut providers: Vec<Box<dyn SheetProvider>> = Vec::new();
        if let Some(url) = &config.apps_script_url {
            providers.push(Box::new(AppsScriptProvider::new(
                http.clone(),
                url.clone(),
                config.script_timeout,
            )));
        }
        if config.tab_count > 0 {
            providers.push(Box::new(AllTabsProvider::new(tabs.clone(), config.tab_count)));
        }
        providers.push(Box::new(CsvExportProvider::new(
            http.clone(),
            endpoints.clone(),
            0,
            config.csv_timeout,
        )));
        providers.push(Box::new(HtmlScrapeProvider::new(http, endpoints, config.csv_timeout)));
        providers.push(Box::new(tabs));

        Ok(Self::new(providers))
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Run the chain, keeping the winner's name and the failures
    pub async fn run(&self) -> std::result::Result<Success<SheetCollection>, failover::Exhausted> {
        failover::first_success(
            &self.providers,
            |p| p.name().to_string(),
            |p| {
                debug!(strategy = %p.name(), kind = %p.source_type(), uri = ?p.source_uri(), "Trying fetch strategy");
                p.fetch()
            },
            |collection: &SheetCollection| !collection.is_empty(),
        )
        .await
    }
}

#[async_trait]
impl SheetSource for FetchChain {
    async fn fetch_all(&self) -> Option<SheetCollection> {
        match self.run().await {
            Ok(success) => {
                info!(
                    strategy = %success.provider,
                    records = success.value.total_records(),
                    sheets = success.value.sheet_count(),
                    "Sheet data fetched"
                );
                Some(success.value)
            }
            Err(exhausted) => {
                warn!(
                    attempts = exhausted.failures.len(),
                    "Every fetch strategy failed: {}",
                    exhausted.summary()
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::record::RowRecord;

    struct Fixed {
        name: String,
        rows: Option<usize>,
    }

    #[async_trait]
    impl SheetProvider for Fixed {
        async fn fetch(&self) -> Result<SheetCollection> {
            match self.rows {
                Some(n) => Ok(SheetCollection::Flat(
                    (0..n).map(|i| RowRecord::new().with("Produto", format!("P{}", i))).collect(),
                )),
                None => Err(DashboardError::Http("connection refused".to_string())),
            }
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn source_type(&self) -> &str {
            "fixed"
        }
    }

    fn fixed(name: &str, rows: Option<usize>) -> Box<dyn SheetProvider> {
        Box::new(Fixed {
            name: name.to_string(),
            rows,
        })
    }

    #[tokio::test]
    async fn test_first_non_empty_strategy_wins() {
        let chain = FetchChain::new(vec![fixed("empty", Some(0)), fixed("ten", Some(10)), fixed("five", Some(5))]);
        let collection = chain.fetch_all().await.unwrap();
        assert_eq!(collection.total_records(), 10);
    }

    #[tokio::test]
    async fn test_exhaustion_yields_none() {
        let chain = FetchChain::new(vec![fixed("down", None), fixed("empty", Some(0))]);
        assert!(chain.fetch_all().await.is_none());

        let exhausted = chain.run().await.unwrap_err();
        assert_eq!(exhausted.failures.len(), 2);
        assert_eq!(exhausted.failures[0].provider, "down");
    }

    #[test]
    fn test_production_order() {
        let config = DashboardConfig::default()
            .with_apps_script_url(Some("https://script.google.com/macros/s/x/exec".to_string()));
        let chain = FetchChain::from_config(&config).unwrap();
        assert_eq!(
            chain.provider_names(),
            vec!["script endpoint", "all tabs", "public CSV export", "HTML page scrape", "tab data endpoint"]
        );

        let without_script = FetchChain::from_config(&DashboardConfig::default()).unwrap();
        assert_eq!(without_script.provider_names()[0], "all tabs");
    }

    #[test]
    fn test_strategy_sources() {
        let config = DashboardConfig::default()
            .with_sheets_base_url("http://sheets.test")
            .with_spreadsheet_id("abc")
            .with_apps_script_url(Some("https://script.google.com/macros/s/x/exec".to_string()));
        let chain = FetchChain::from_config(&config).unwrap();

        let sources: Vec<(String, Option<String>)> = chain
            .providers
            .iter()
            .map(|p| (p.source_type().to_string(), p.source_uri()))
            .collect();
        assert_eq!(sources[0].1.as_deref(), Some("https://script.google.com/macros/s/x/exec"));
        assert_eq!(
            sources[2],
            ("csv".to_string(), Some("http://sheets.test/spreadsheets/d/abc/export?format=csv&gid=0".to_string()))
        );
    }
}
