//! newsgate binary: load configuration, then one run or a poll loop.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsgate::ai_adapter::build_provider;
use newsgate::config::{AiConfig, PipelineConfig};
use newsgate::history::HistoryStore;
use newsgate::ingest::config::load_sources_default;
use newsgate::notify::NotifierMux;
use newsgate::scheduler::{run_scheduler, SchedulerCfg};
use newsgate::{build_coordinator, build_sources};

/// `RUST_LOG` filter (default `newsgate=info,warn`); `LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsgate=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let prometheus = if newsgate::metrics::dump_requested() {
        Some(newsgate::metrics::install_prometheus()?)
    } else {
        None
    };

    let pipeline_cfg = PipelineConfig::load_default().context("loading pipeline config")?;
    let ai_cfg = AiConfig::load_default().context("loading AI config")?;
    let specs = load_sources_default().context("loading feed sources")?;
    if specs.is_empty() {
        warn!("no feed sources configured; nothing to do");
    }

    let sources = build_sources(&specs, pipeline_cfg.run.fetch_timeout_secs)?;
    let provider = build_provider(&ai_cfg)?;
    let notifier = NotifierMux::from_env();
    info!(
        sources = sources.len(),
        provider = provider.name(),
        channels = ?notifier.channel_names(),
        threshold = pipeline_cfg.dedup.threshold,
        "starting"
    );

    let mut coordinator = build_coordinator(&pipeline_cfg, provider, notifier);

    match SchedulerCfg::from_env() {
        Some(sched) => {
            info!(interval_secs = sched.interval_secs, "poll loop enabled");
            run_scheduler(sched, &mut coordinator, &sources, &pipeline_cfg.history).await;
        }
        None => {
            let mut history =
                HistoryStore::load(&pipeline_cfg.history.path, pipeline_cfg.history.max_items)?;
            let report = coordinator.run_once(&sources, &mut history).await?;
            if report.halted.is_some() {
                warn!(reason = ?report.halted, "run halted early");
            }
        }
    }

    if let Some(handle) = prometheus {
        println!("{}", handle.render());
    }
    Ok(())
}
