//! HTTP server for the sales dashboard API

use anyhow::Result;
use clap::Parser;
use sales_dashboard::http::serve;
use sales_dashboard::observability::init_tracing;
use sales_dashboard::{spawn_refresh_loop, DashboardConfig, DashboardService};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Sales dashboard JSON API")]
struct ServerArgs {
    /// Port to listen on (defaults to BIND_ADDR or 8081)
    #[arg(long)]
    port: Option<u16>,

    /// Seconds between background refreshes (or set REFRESH_INTERVAL_SECS)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    refresh_secs: Option<u64>,
}

impl ServerArgs {
    fn apply(&self, mut config: DashboardConfig) -> DashboardConfig {
        if let Some(port) = self.port {
            config.bind_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(secs) = self.refresh_secs {
            config = config.with_refresh_interval(Duration::from_secs(secs));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = ServerArgs::parse();
    let config = args.apply(DashboardConfig::from_env());

    let service = Arc::new(DashboardService::from_config(&config)?);

    info!("Loading data at startup");
    let outcome = service.cache().refresh().await;
    info!(?outcome, "Initial load finished");

    let _refresh = spawn_refresh_loop(service.cache(), config.refresh_interval);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Sales dashboard API listening");

    serve(listener, service).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_and_refresh_override_config() {
        let args = ServerArgs::try_parse_from(["server", "--port=9000", "--refresh-secs", "60"]).unwrap();
        let config = args.apply(DashboardConfig::default());
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ServerArgs::try_parse_from(["server", "--port", "70000"]).is_err());
        assert!(ServerArgs::try_parse_from(["server", "--port", "abc"]).is_err());
        assert!(ServerArgs::try_parse_from(["server", "--refresh-secs", "0"]).is_err());
    }

    #[test]
    fn test_defaults_keep_config() {
        let args = ServerArgs::try_parse_from(["server"]).unwrap();
        let config = args.apply(DashboardConfig::default());
        assert_eq!(config.bind_addr, DashboardConfig::default().bind_addr);
    }
}
