use std::path::Path;

use vidbot_media::YtDlpFetcher;
use vidbot_search::{BackendSelector, MirrorClient, SearchConfig};
use vidbot_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "vidbot-selfcheck: starting with download_dir={}",
        config.download_dir.display()
    );
    ensure_dir(&config.download_dir).await?;
    ensure_tools()?;
    ensure_mirror().await?;

    println!("vidbot-selfcheck: ok");
    Ok(())
}

async fn ensure_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("{} is not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_tools() -> anyhow::Result<()> {
    let yt_dlp = YtDlpFetcher::new().check_available()?;
    println!("vidbot-selfcheck: yt-dlp at {}", yt_dlp.display());

    let ffprobe =
        which::which("ffprobe").map_err(|e| anyhow::anyhow!("ffprobe not available: {}", e))?;
    println!("vidbot-selfcheck: ffprobe at {}", ffprobe.display());
    Ok(())
}

async fn ensure_mirror() -> anyhow::Result<()> {
    let search = SearchConfig::from_env()?;
    let selector = BackendSelector::new(&search, MirrorClient::new(&search)?)?;
    let handle = selector.refresh().await?;
    println!(
        "vidbot-selfcheck: mirror {} answered in {}ms",
        handle.base_url,
        handle.latency.as_millis()
    );
    Ok(())
}
