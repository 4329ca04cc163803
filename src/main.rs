use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use sales_dashboard::analytics::aggregate_collection;
use sales_dashboard::cache::RefreshOutcome;
use sales_dashboard::observability::init_tracing;
use sales_dashboard::report::{self, ReportMetadata};
use sales_dashboard::{ConversationalResponder, DashboardConfig, FetchChain, SheetCache};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "sales-dashboard")]
#[command(about = "Sales spreadsheet analytics and assistant")]
struct Args {
    /// Spreadsheet id (or set SPREADSHEET_ID)
    #[arg(long)]
    spreadsheet_id: Option<String>,

    /// Script endpoint URL (or set APPS_SCRIPT_URL)
    #[arg(long)]
    script_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the spreadsheet once and print sheet counts
    Fetch,
    /// Print the Markdown sales analysis
    Report,
    /// Ask the assistant a question about the data
    Ask {
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let mut config = DashboardConfig::from_env();
    if let Some(id) = args.spreadsheet_id {
        config = config.with_spreadsheet_id(id);
    }
    if let Some(url) = args.script_url {
        config = config.with_apps_script_url(Some(url));
    }

    let chain = FetchChain::from_config(&config)?;
    info!(strategies = ?chain.provider_names(), "Fetching spreadsheet");
    let cache = SheetCache::new(Arc::new(chain));

    if cache.refresh().await == RefreshOutcome::Retained {
        bail!("no fetch strategy returned data");
    }
    let Some(snapshot) = cache.read() else {
        bail!("cache is empty after refresh");
    };

    match args.command {
        Command::Fetch => {
            println!("\n=== Sheets ({}) ===", snapshot.last_updated_label());
            for summary in snapshot.collection.summaries() {
                println!("{:<12} {:<20} {:>6} registros", summary.key, summary.name, summary.record_count);
            }
            println!("Total: {} registros", snapshot.collection.total_records());
        }
        Command::Report => {
            let agg = aggregate_collection(&snapshot.collection);
            let meta = ReportMetadata::new(Local::now(), Some(snapshot.last_updated_label()));
            println!("{}", report::render(&agg, &meta));
        }
        Command::Ask { message } => {
            let responder = ConversationalResponder::from_config(&config)?;
            let agg = aggregate_collection(&snapshot.collection);
            let label = snapshot.last_updated_label();
            let reply = responder.respond(&message, Some(&agg), Some(&label)).await;
            info!(source = ?reply.source, "Answer ready");
            println!("{}", reply.text);
        }
    }

    Ok(())
}
