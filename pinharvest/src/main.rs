use anyhow::{Context, Result, bail};
use clap::Parser;
use common::{HarvestMode, HarvestStatus, HarvestSummary, RenderSurface};
use dotenv::dotenv;
use harvester::bootstrap::{FEED_READY_TIMEOUT, ensure_feed_ready, is_valid_board_url, open_feed};
use harvester::{HarvestConfig, LogReporter, start_harvest};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use surface_snapshot::SnapshotSurface;
use surface_webdriver::WebDriverSurface;

use cli::Cli;
use console::{ProgressTracker, summary_table, write_summary_json};

mod cli;
mod console;

/// 展示层检查工作者是否结束的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(300);

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(summary) => {
            if let HarvestStatus::Aborted(_) = summary.status {
                std::process::exit(2);
            }
        }
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<HarvestSummary> {
    let config = cli.harvest_config();
    config.validate()?;

    match &cli.snapshot {
        Some(path) => run_snapshot(cli, path, config).await,
        None => run_browser(cli, config).await,
    }
}

/// 离线处理保存下来的看板页面
async fn run_snapshot(cli: &Cli, path: &Path, mut config: HarvestConfig) -> Result<HarvestSummary> {
    if config.mode == HarvestMode::Deep {
        log::warn!("Snapshot input only supports shallow mode, switching to shallow");
        config.mode = HarvestMode::Shallow;
    }
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    log::info!("Harvesting saved page {}", path.display());

    let surface = Arc::new(SnapshotSurface::from_html(cli.board_url.trim(), html));
    harvest(surface, config, cli).await
}

async fn run_browser(cli: &Cli, config: HarvestConfig) -> Result<HarvestSummary> {
    let board_url = cli.board_url.trim();
    if !is_valid_board_url(board_url) {
        bail!("Please pass a valid Pinterest board URL, got: {}", board_url);
    }

    log::info!("Launching Chrome via {}", cli.webdriver_url);
    let surface = Arc::new(WebDriverSurface::launch(&cli.browser_options()).await?);

    let result = async {
        prepare_board(&*surface, board_url, config.feed_wait()).await;
        harvest(Arc::clone(&surface), config, cli).await
    }
    .await;

    if let Err(e) = surface.quit().await {
        log::warn!("Failed to close the browser: {:#}", e);
    }
    result
}

/// 打开看板并等待条目出现，失败只记录日志
async fn prepare_board<S: RenderSurface>(surface: &S, board_url: &str, wait: Duration) {
    match open_feed(surface, board_url, wait).await {
        Ok(true) => {}
        Ok(false) => log::warn!("Board did not show any pins within {:?}", wait),
        Err(e) => {
            log::warn!("Failed to navigate to board: {}", e);
            return;
        }
    }
    match ensure_feed_ready(surface, FEED_READY_TIMEOUT).await {
        Ok(true) => log::info!("Board looks ready."),
        Ok(false) => log::info!("Board not fully ready, the harvest will still try to scroll and load."),
        Err(e) => log::warn!("Board readiness check failed: {}", e),
    }
}

async fn harvest<S: RenderSurface + 'static>(
    surface: Arc<S>,
    config: HarvestConfig,
    cli: &Cli,
) -> Result<HarvestSummary> {
    log::info!("Starting download in mode: {}", config.mode);
    let handle = start_harvest(surface, config, Arc::new(LogReporter))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut tracker = ProgressTracker::default();
    let mut cancel_requested = false;

    while !handle.is_finished() {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(line) = tracker.update(&handle.progress()) {
                    log::info!("{}", line);
                }
            }
            result = &mut ctrl_c, if !cancel_requested => {
                cancel_requested = true;
                match result {
                    Ok(()) => {
                        log::info!("Cancel requested...");
                        handle.cancel();
                    }
                    Err(e) => log::warn!("Failed to listen for Ctrl-C: {}", e),
                }
            }
        }
    }

    let summary = handle.join().await;
    println!("{}", summary_table(&summary));
    if let Some(path) = &cli.summary_json {
        write_summary_json(path, &summary).await?;
    }
    Ok(summary)
}
