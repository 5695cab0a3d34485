//! # homeruled — homerule daemon
//!
//! Composition root that wires the rule engine to its adapters and feeds it
//! sensor readings.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Construct the virtual device gateway, description table and notifier
//! - Seed the sensor and actuator inventory, then load the rule list
//! - Read one reading per line from stdin and push it into the engine
//! - Handle graceful shutdown (Ctrl-C or end of input)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod feed;

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use homerule_adapter_virtual::{LoggingNotifier, VirtualGateway};
use homerule_app::context::EngineContext;
use homerule_app::dispatch::DispatchQueue;
use homerule_app::ports::{AnomalyDescriptionLookup, DeviceGateway, SystemClock};
use homerule_app::services::RuleManager;

use crate::config::Config;

const REPORT_CAPACITY: usize = 256;
const INPUT_BUFFER: usize = 64;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter)?;

    // Dispatch machinery
    let (queue, worker) = DispatchQueue::new(REPORT_CAPACITY);
    let worker = worker.spawn();

    // Adapters
    let gateway = Arc::new(VirtualGateway::new());
    let notifier = Arc::new(LoggingNotifier::new());

    // Engine
    let context = EngineContext::new(
        gateway,
        queue,
        Arc::new(SystemClock),
        notifier,
        config.to_engine_config(),
    );
    let mut manager = RuleManager::new(context, config.descriptions());

    for spec in config.event_specs()? {
        manager.register_event(spec);
    }
    for spec in config.action_specs()? {
        manager.register_action(spec);
    }
    let results = manager.reload_all(config.rules.clone()).await;
    let loaded = results.iter().filter(|r| r.is_ok()).count();
    tracing::info!(
        events = manager.list_events().len(),
        actions = manager.list_actions().len(),
        rules = loaded,
        rejected = results.len() - loaded,
        "homeruled ready, reading sensor values from stdin"
    );

    let mut lines = spawn_stdin_reader();
    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    tracing::info!("input closed");
                    break;
                };
                handle_line(&manager, &line);
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for shutdown signal")?;
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    // Unbinding the rules releases every queue handle, so the worker stops
    // once in-flight jobs are handed off.
    let removed = manager.clear_rules();
    drop(manager);
    tracing::debug!(rules = removed, "rules unloaded");
    match tokio::time::timeout(SHUTDOWN_GRACE, worker).await {
        Ok(joined) => joined.context("dispatch worker panicked")?,
        Err(_) => tracing::warn!("dispatch worker still busy, exiting anyway"),
    }
    Ok(())
}

/// Read stdin on a plain thread; a pending blocking read would otherwise
/// hold up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(INPUT_BUFFER);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to read stdin");
                    break;
                }
            }
        }
    });
    rx
}

fn init_tracing(filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter).context("invalid logging filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("failed to install tracing subscriber")
}

fn handle_line<G, L>(manager: &RuleManager<G, L>, line: &str)
where
    G: DeviceGateway,
    L: AnomalyDescriptionLookup,
{
    let reading = match feed::parse_line(line) {
        Ok(Some(reading)) => reading,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(line, error = %err, "skipping invalid input line");
            return;
        }
    };
    if let Err(err) = feed::apply(manager, reading) {
        tracing::warn!(line, error = ?err, "reading rejected");
    }
}
