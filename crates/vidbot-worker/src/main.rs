//! Search-and-prepare command line binary.
//!
//! `vidbot <query...>` searches the configured mirrors, prints the candidates
//! and prepares the first short-form one. A pasted link is prepared directly.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use vidbot_media::YtDlpFetcher;
use vidbot_models::{
    extract_first_url, extract_video_id, format_duration, format_views, normalize_query,
    PreparationJob, RequesterId, SearchCandidate,
};
use vidbot_search::{SearchAggregator, SearchConfig};
use vidbot_session::{CandidateCache, SessionStore};
use vidbot_worker::logging::init_tracing;
use vidbot_worker::metrics::install_exporter;
use vidbot_worker::{
    JsonlLibrary, LogNotifier, OutboxDelivery, PreparationExecutor, Preparer, WorkerConfig,
};

/// Requester id used for local command line runs.
const LOCAL_REQUESTER: RequesterId = RequesterId(0);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        eprintln!("usage: vidbot <query...>");
        std::process::exit(2);
    }

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        let addr: SocketAddr = addr.parse().context("invalid METRICS_ADDR")?;
        install_exporter(addr)?;
        info!(%addr, "Serving metrics");
    }

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let executor = build_executor(&config).await?;

    let job = match extract_first_url(&text).and_then(|url| extract_video_id(&url).map(|id| (url, id))) {
        Some((url, id)) => {
            info!(video_id = %id, "Preparing pasted link");
            Some(PreparationJob::new(LOCAL_REQUESTER, id).with_source_url(url))
        }
        None => search_job(&config, &text).await?,
    };

    let Some(job) = job else {
        println!("Nothing to prepare.");
        return Ok(());
    };

    if let Err(e) = executor.try_submit(job) {
        println!("{}", e);
    }
    executor.wait_idle().await;

    info!("Done");
    Ok(())
}

async fn build_executor(config: &WorkerConfig) -> anyhow::Result<PreparationExecutor> {
    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| format!("cannot create {}", config.download_dir.display()))?;

    let fetcher = YtDlpFetcher::new()
        .with_timeout(config.fetch_timeout)
        .with_max_filesize(&config.max_filesize);
    if let Err(e) = fetcher.check_available() {
        warn!(error = %e, "yt-dlp is not available; preparations will fail");
    }

    let library = JsonlLibrary::open(&config.library_path).await?;
    let preparer = Preparer::new(
        Arc::new(fetcher),
        Arc::new(library),
        Arc::new(OutboxDelivery::new(&config.outbox_dir)),
        &config.download_dir,
        config.max_clip_seconds,
    );

    Ok(PreparationExecutor::new(
        preparer,
        Arc::new(LogNotifier),
        config.max_concurrent_jobs,
    ))
}

/// Search, print the results, park them under a session token and pick the
/// first short-form candidate.
async fn search_job(config: &WorkerConfig, text: &str) -> anyhow::Result<Option<PreparationJob>> {
    let search_config = SearchConfig::from_env()?;
    let aggregator = SearchAggregator::from_config(&search_config)?;

    let query_norm = normalize_query(text);
    let candidates = aggregator
        .search_or_empty(text, config.max_search_results)
        .await;
    if candidates.is_empty() {
        println!("No results for \"{}\".", text.trim());
        return Ok(None);
    }

    for candidate in candidates.iter().take(config.max_inline_results) {
        print_candidate(candidate);
    }

    let sessions = SessionStore::new();
    let session = sessions
        .issue(text, &query_norm, config.token_ttl_seconds)
        .await;
    sessions
        .attach_candidates(&session.token, candidates.clone())
        .await?;
    info!(token = %session.token, count = candidates.len(), "Parked candidates");

    let cache = CandidateCache::new(config.candidate_cache_ttl);
    cache.put_all(candidates.iter().cloned());

    let Some(chosen) = sessions
        .candidates(&session.token)
        .await?
        .into_iter()
        .find(|c| c.is_short_form(config.max_clip_seconds))
    else {
        println!("No short-form candidate under {}s.", config.max_clip_seconds);
        return Ok(None);
    };

    // Bare-id lookups go through the cache the way a follow-up request would.
    let chosen = cache.get(&chosen.external_id).unwrap_or(chosen);
    println!("Preparing: {}", chosen.title);

    Ok(Some(
        PreparationJob::from_candidate(LOCAL_REQUESTER, chosen).with_query(Some(query_norm)),
    ))
}

fn print_candidate(candidate: &SearchCandidate) {
    println!(
        "{:>2}. {} [{}] {} views  {}",
        candidate.rank,
        candidate.title,
        format_duration(candidate.duration_seconds.map(|d| d as i64)),
        format_views(candidate.view_count),
        candidate.source_url
    );
}
