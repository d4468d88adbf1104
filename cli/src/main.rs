mod catalog;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use viewkit_core::LifecycleCache;
use viewkit_core::SessionSnapshot;
use viewkit_core::ViewCacheConfig;
use viewkit_core::ViewSession;
use viewkit_core::finalize_fn;

/// Browse a generated product catalog through a cached view session.
///
/// The session is rendered once, then left idle until the cache evicts it
/// and reports the snapshot handed to its finalize callback.
#[derive(Debug, Parser)]
#[command(name = "viewkit", version)]
struct Cli {
    /// TOML file with cache settings (`sweep_interval_ms`, `default_ttl_secs`,
    /// `default_amount_per_page`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of generated products.
    #[arg(long, default_value_t = 42, value_parser = clap::value_parser!(u32).range(0..=10_000))]
    items: u32,

    /// Products per page; defaults to the configured amount.
    #[arg(long, value_name = "N")]
    per_page: Option<usize>,

    /// Page to open before rendering.
    #[arg(long, value_name = "N")]
    page: Option<usize>,

    /// Sorter to select (`id` or `price`).
    #[arg(long, value_name = "LABEL")]
    sort: Option<String>,

    /// Reverse the selected sort order.
    #[arg(long)]
    reverse: bool,

    /// Hide sold-out products.
    #[arg(long)]
    in_stock: bool,

    /// Jump to the first product matching this id or name.
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Idle time-to-live of the session; defaults to the configured TTL.
    #[arg(long, value_name = "SECS")]
    ttl: Option<u64>,

    /// Exit after rendering instead of waiting for the session to expire.
    #[arg(long)]
    no_wait: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ViewCacheConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ViewCacheConfig::default(),
    };
    let per_page = cli.per_page.unwrap_or_else(|| config.amount_per_page());
    let ttl_secs = cli.ttl.unwrap_or(config.default_ttl_secs);

    let (finalized_tx, mut finalized_rx) = mpsc::unbounded_channel::<SessionSnapshot>();
    let session = ViewSession::builder(catalog::catalog_history(cli.items, per_page))
        .ttl_secs(ttl_secs)
        .finalize(finalize_fn(move |snapshot| {
            let finalized_tx = finalized_tx.clone();
            async move {
                finalized_tx.send(snapshot)?;
                anyhow::Ok(())
            }
        }))
        .build();

    let cache = Arc::new(LifecycleCache::new(config));
    let session_id = cache.put(session).await?;
    let sweeper = cache.spawn_sweeper();

    {
        let mut session = cache.acquire(session_id).await?;
        session.history_mut().goto_sub_page(catalog::CATALOG_PAGE)?;
        let mut unknown_sorter = false;
        session.history_mut().edit_current_page(|page| {
            let Some(pipeline) = page.pipeline_mut() else {
                return;
            };
            if let Some(label) = &cli.sort {
                unknown_sorter = !pipeline.select_sorter(label);
            }
            if cli.reverse {
                pipeline.toggle_reversed();
            }
            if cli.in_stock {
                pipeline.set_filter_enabled("in-stock", true);
            }
            if let Some(target) = cli.page {
                pipeline.goto_page(target);
            }
            if let Some(query) = &cli.search {
                pipeline.submit_search(catalog::search_label(query), query.as_str());
            }
        });
        if unknown_sorter {
            warn!(sorter = ?cli.sort, "unknown sorter; keeping catalog order");
        }

        let view = session.render().await?;
        println!("{}", view.body);

        if let Some(query) = &cli.search
            && session.window()?.search_match.is_none()
        {
            warn!(query = %query, "no product matched the search");
        }
    }

    if cli.no_wait {
        sweeper.shutdown().await;
        return Ok(());
    }

    let ttl = cache
        .info(session_id)
        .await
        .map(|info| info.ttl)
        .unwrap_or_default();
    info!(session_id = %session_id, ttl_secs = ttl.as_secs(), "waiting for the session to expire");
    let snapshot = finalized_rx
        .recv()
        .await
        .context("session was dropped without being finalized")?;
    println!(
        "finalized {} after {}s idle: {} on page {}/{}",
        snapshot.session_id,
        ttl.as_secs(),
        snapshot.history_identifiers.join(" > "),
        snapshot.current_page,
        snapshot.total_pages,
    );
    sweeper.shutdown().await;
    Ok(())
}
