mod feed;

use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Bar, Config, SignalEvent};
use strategy::{StrategyFileConfig, StrategyRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    // stdout carries the signal stream, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env()?;
    let bars_path = cfg.require_bars_path()?.to_string();
    info!(mode = %cfg.run_mode, observation = cfg.observation_window, "signald starting");

    // ── Strategy registry ─────────────────────────────────────────────────────
    let strategy_file = StrategyFileConfig::load(&cfg.strategy_config_path)?;
    let mut registry = StrategyRegistry::from_config(&strategy_file, &cfg)?;

    if let Some(path) = &cfg.history_path {
        let history = feed::load_history(path).await?;
        let failed = registry.load_history(&history)?;
        if !failed.is_empty() {
            warn!(codes = ?failed, "Some instruments start without history");
        }
    }

    // ── Channels ──────────────────────────────────────────────────────────────
    let (bar_tx, bar_rx) = mpsc::channel::<Bar>(1024);
    let (signal_tx, mut signal_rx) = mpsc::channel::<SignalEvent>(1024);

    // ── Spawn tasks ───────────────────────────────────────────────────────────
    let feed_task = tokio::spawn(feed::replay(bars_path, bar_tx));
    let registry_task = tokio::spawn(registry.run(bar_rx, signal_tx));

    let printer = async {
        while let Some(event) = signal_rx.recv().await {
            println!("{}", serde_json::to_string(&event)?);
        }
        Ok::<_, anyhow::Error>(())
    };

    tokio::select! {
        res = printer => res?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting.");
            return Ok(());
        }
    }

    let replayed = feed_task.await??;
    registry_task.await?;
    info!(bars = replayed, "Replay finished");
    Ok(())
}
