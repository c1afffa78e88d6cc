use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{prelude::*, EnvFilter};
use url::Url;

use jobcrawler::{
    extract::HttpFetcher,
    frontier::FrontierStore,
    ingest::IngestionStore,
    listing::{ChromeBrowser, ChromeConfig},
    options::DEFAULT_BASE_URL,
    store::{MemoryStore, PgStore},
    Crawler, CrawlerOptions,
};

/// How long the browser waits for a page or element before giving up.
const IMPLICIT_WAIT: Duration = Duration::from_secs(4);
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// The browser sits idle while a page of listings is extracted over HTTP.
const BROWSER_IDLE_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// Crawls job listings into Postgres, growing the search terms from the
/// titles found. Safe to restart at any point.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", required_unless_present = "dry_run")]
    database_url: Option<String>,

    /// Job board to crawl
    #[arg(long, env = "JOBCRAWLER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: Url,

    /// Pause between retries of the same page, in milliseconds
    #[arg(long, default_value_t = 0)]
    retry_delay_ms: u64,

    /// Keep everything in memory instead of writing to Postgres
    #[arg(long)]
    dry_run: bool,

    /// Run the browser with a visible window
    #[arg(long)]
    show_browser: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("info"))
                .expect("telemetry: Creating EnvFilter"),
        )
        .init();

    let args = Args::parse();

    let options = CrawlerOptions {
        retry_delay: Duration::from_millis(args.retry_delay_ms),
        ..CrawlerOptions::new(args.base_url)
    };

    let pg = if args.dry_run {
        None
    } else {
        let database_url = args.database_url.context("DATABASE_URL is not set")?;
        let store = PgStore::connect(&database_url)
            .await
            .context("connecting to the database")?;
        Some(Arc::new(store))
    };

    let (frontier, ingestion): (Arc<dyn FrontierStore>, Arc<dyn IngestionStore>) = match &pg {
        Some(store) => (store.clone(), store.clone()),
        None => {
            tracing::warn!("dry run: nothing will be persisted");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        }
    };

    let browser = ChromeBrowser::launch(ChromeConfig {
        headless: !args.show_browser,
        implicit_wait: IMPLICIT_WAIT,
        idle_timeout: BROWSER_IDLE_TIMEOUT,
    })
    .context("launching the browser")?;
    let browser = Arc::new(browser);
    let fetcher = Arc::new(HttpFetcher::new(HTTP_TIMEOUT).context("building the HTTP client")?);

    let crawler = Crawler::new(options, browser, fetcher, frontier, ingestion);
    let result = crawler.run().await;

    if let Some(store) = pg {
        store.close().await;
    }
    let stats = result.context("crawl aborted")?;
    tracing::info!(
        jobs = stats.num_jobs_inserted,
        terms = stats.num_terms,
        "crawl finished"
    );
    Ok(())
}
