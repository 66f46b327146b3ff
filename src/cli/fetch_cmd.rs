//! `factfetch fetch` — run a batch over a sources file.

use crate::config::FetchConfig;
use crate::download::Downloader;
use crate::orchestrator::Orchestrator;
use crate::runlog::RunLog;
use crate::session::chromium::ChromiumSession;
use crate::sink::StoreSink;
use crate::sources::load_securities;
use crate::store::DocumentStore;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Overrides layered on top of the config file.
pub struct FetchArgs {
    pub sources: PathBuf,
    pub config: Option<PathBuf>,
    pub base_url: Option<String>,
    pub max_retries: Option<u32>,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => FetchConfig::load(path)?,
        None => FetchConfig::default(),
    };
    if let Some(url) = args.base_url {
        cfg.base_url = url;
    }
    if let Some(n) = args.max_retries {
        cfg.max_retries = n;
    }
    if cfg.base_url.is_empty() {
        bail!("no base URL configured; pass --base-url or set it in the config file");
    }

    let securities = load_securities(&args.sources)?;
    if securities.is_empty() {
        println!("Sources file is empty, nothing to do.");
        return Ok(());
    }

    std::fs::create_dir_all(&cfg.download_dir).with_context(|| {
        format!(
            "failed to create download dir: {}",
            cfg.download_dir.display()
        )
    })?;

    let store = DocumentStore::open(&cfg.db_path)?;
    let downloader = Downloader::new(&cfg.download_dir, cfg.download_timeout_ms)?;
    let sink = StoreSink::new(downloader, store);
    let log = RunLog::open(&cfg.log_path)?;

    // The one browser session for the whole batch. Failure here is fatal;
    // everything after is per-security.
    let session = ChromiumSession::launch(&cfg).await?;

    let orchestrator = Orchestrator::new(
        Box::new(session),
        Box::new(sink),
        Box::new(log),
        cfg,
    );

    let summary = orchestrator.run(&securities).await?;

    println!();
    println!(
        "Done: {} stored, {} exhausted, {} abandoned ({} total).",
        summary.stored,
        summary.exhausted,
        summary.abandoned,
        summary.total()
    );

    Ok(())
}
