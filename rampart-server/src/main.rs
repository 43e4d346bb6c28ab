// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Rampart — UFW block-log abuse reporter
//
//  Pipeline:  tail → parse → filter → cooldown → report
//  Collaborators: webhook sink, self-address provider, daily digest
//  Config:    YAML + RAMPART_ env overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::Parser;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rampart_core::config::RampartConfig;
use rampart_core::error::RampartError;
use rampart_core::policy::PortServicePolicy;
use rampart_observability::digest;
use rampart_observability::sink::{NotifySink, Severity};
use rampart_observability::webhook::WebhookSink;
use rampart_report::client::HttpReporter;
use rampart_report::selfip::{self, SelfAddrs};
use rampart_store::cache::ReportCache;
use rampart_tail::pipeline::Pipeline;
use rampart_tail::tailer::LogTailer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rampart", version, about = "Rampart — UFW block-log abuse reporter")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/rampart/rampart.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Rampart starting");

    // ── Config ──
    let config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
        RampartConfig::load(&cli.config)?
    } else {
        info!("No config file found, using defaults");
        RampartConfig::default()
    };

    // ── Report cache (fatal on a present-but-unreadable store) ──
    let cache = ReportCache::load(
        &config.cache.file,
        Duration::from_secs(config.report.cooldown_secs),
    )?;

    // ── Notification sink ──
    let sink: Arc<dyn NotifySink> = Arc::new(WebhookSink::new(config.webhook.clone()));

    // ── Self-address provider: fetch once now, then refresh on a timer ──
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let self_addrs = Arc::new(SelfAddrs::new());
    self_addrs.refresh(&http, &config.self_ip.urls).await;
    info!(
        count = self_addrs.current().len(),
        "Fetched own addresses, they will be ignored in the log"
    );
    selfip::spawn_refresh(Arc::clone(&self_addrs), http, config.self_ip.clone());

    // ── Daily digest ──
    if config.digest.enabled {
        digest::spawn_daily(config.cache.file.clone(), Arc::clone(&sink));
    }

    // ── Reporter ──
    let reporter = Arc::new(HttpReporter::new(&config.report)?);

    // ── Tailer: start at end of file, never replay old content ──
    let log_file = config.monitor.log_file.clone();
    let mut tailer = match LogTailer::new(&log_file) {
        Ok(tailer) => tailer,
        Err(e) => {
            error!(path = %log_file.display(), error = %e, "Monitored log file is not readable, tailer will not start");
            sink.notify(
                Severity::Error,
                &format!("Log file `{}` is not readable: {e}", log_file.display()),
            );
            // Give the webhook task a chance to flush before exiting
            tokio::time::sleep(Duration::from_secs(1)).await;
            return Err(RampartError::LogFileUnreadable(log_file).into());
        }
    };

    let mut pipeline = Pipeline::new(
        cache,
        reporter,
        Arc::clone(&self_addrs),
        Arc::new(PortServicePolicy),
        Arc::clone(&sink),
    );

    // ── Watch loop: one change event processed to completion at a time ──
    let (tx, mut rx) = mpsc::channel::<()>(256);
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        match res {
            Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                // Coalescing is fine: one wakeup reads everything new
                let _ = tx.blocking_send(());
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Watch error"),
        }
    })?;
    watcher.watch(&log_file, RecursiveMode::NonRecursive)?;

    sink.notify(
        Severity::Success,
        &format!(
            "Rampart {} is up and monitoring `{}`.",
            env!("CARGO_PKG_VERSION"),
            log_file.display()
        ),
    );
    info!(path = %log_file.display(), "Ready, monitoring for block events");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = rx.recv() => {
                if changed.is_none() {
                    warn!("Watcher channel closed, stopping");
                    break;
                }
                match tailer.poll() {
                    Ok(lines) => {
                        for line in lines {
                            pipeline.process_line(&line).await;
                        }
                    }
                    Err(e) => warn!(error = %e, "Read cycle failed"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping");
                break;
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                warn!(error = %e, "Could not install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
