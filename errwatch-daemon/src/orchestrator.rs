//! Daemon orchestration -- assembly and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `errwatch-daemon`.
//! It builds the advisory store, HTTP transport and notifier from the
//! loaded configuration, wires them into an [`ErrataWatcher`], and runs
//! the main loop until SIGTERM/SIGINT or the shutdown token fires.
//!
//! # Shutdown
//!
//! 1. Cancel the shared shutdown token (poll scheduler leaves its wait)
//! 2. Stop background tasks (uptime updater)
//! 3. Stop the watcher (in-flight cycle gets a grace period)

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use errwatch_core::config::ErrwatchConfig;
use errwatch_core::pipeline::{HealthStatus, Pipeline};
use errwatch_ingest::{CycleReport, ErrataWatcher, ErrataWatcherBuilder, ReqwestFetcher};
use errwatch_store::SqliteStore;

use crate::health::{DaemonHealth, ModuleHealth, aggregate_status};
use crate::metrics_server;
use crate::notify::DaemonNotifier;

/// Watcher type assembled by the daemon.
pub type DaemonWatcher = ErrataWatcher<ReqwestFetcher, SqliteStore, DaemonNotifier>;

const WATCHER_MODULE: &str = "errata-watcher";
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const UPTIME_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: ErrwatchConfig,
    /// Feed polling pipeline.
    watcher: DaemonWatcher,
    /// Shared with the watcher's poll scheduler.
    shutdown: CancellationToken,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from `config_path` and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read, parsed or validated
    /// - The advisory store cannot be opened
    /// - The HTTP client cannot be constructed
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = ErrwatchConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    pub fn build_from_config(config: ErrwatchConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let store = SqliteStore::open(&config.store.path)
            .map_err(|e| anyhow::anyhow!("failed to open advisory store: {}", e))?;

        let http = ReqwestFetcher::new(
            Duration::from_secs(config.feed.request_timeout_secs),
            &config.feed.user_agent,
        )
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {}", e))?;

        let notifier = DaemonNotifier::from_config(&config.notify);
        tracing::info!(backend = notifier.backend_name(), "notifier configured");

        let shutdown = CancellationToken::new();
        let watcher = ErrataWatcherBuilder::new()
            .feed_config(config.feed.clone())
            .http(Arc::new(http))
            .store(Arc::new(store))
            .notifier(Arc::new(notifier))
            .shutdown_token(shutdown.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build errata watcher: {}", e))?;

        tracing::info!(
            feed = %config.feed.url,
            store = %config.store.path,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            watcher,
            shutdown,
            start_time: Instant::now(),
        })
    }

    /// Start the watcher and block until a shutdown signal is received.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    /// - cancellation of [`Orchestrator::shutdown_token`]
    pub async fn run(&mut self) -> Result<()> {
        self.watcher
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start errata watcher: {}", e))?;

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time, self.shutdown.clone()));

        tracing::info!("entering main event loop");
        let reason = self.wait_for_shutdown().await?;
        tracing::info!(reason, "shutdown requested");

        self.shutdown.cancel();
        if let Some(task) = uptime_task {
            let _ = task.await;
        }

        self.watcher
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop errata watcher: {}", e))?;
        Ok(())
    }

    /// Run exactly one ingestion cycle without starting the poll loop.
    pub async fn run_once(&self) -> CycleReport {
        self.watcher.run_once().await
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let modules = vec![ModuleHealth {
            name: WATCHER_MODULE.to_owned(),
            enabled: true,
            status: self.watcher.health_check().await,
        }];

        let uptime_secs = self.start_time.elapsed().as_secs();
        if self.config.metrics.enabled {
            use errwatch_core::metrics as m;
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        DaemonHealth {
            status: aggregate_status(&modules),
            uptime_secs,
            modules,
        }
    }

    /// Token that stops [`Orchestrator::run`] when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &ErrwatchConfig {
        &self.config
    }

    /// Get a reference to the watcher.
    pub fn watcher(&self) -> &DaemonWatcher {
        &self.watcher
    }

    async fn wait_for_shutdown(&self) -> Result<&'static str> {
        let signal = wait_for_shutdown_signal();
        tokio::pin!(signal);

        let mut health_tick = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        health_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        health_tick.tick().await;

        loop {
            tokio::select! {
                result = &mut signal => return result,
                () = self.shutdown.cancelled() => return Ok("shutdown token"),
                _ = health_tick.tick() => self.log_health().await,
            }
        }
    }

    async fn log_health(&self) {
        let health = self.health().await;
        match &health.status {
            HealthStatus::Healthy => {
                tracing::debug!(
                    uptime_secs = health.uptime_secs,
                    cycles = self.watcher.cycles_completed(),
                    "daemon healthy"
                );
            }
            HealthStatus::Degraded(reason) => {
                tracing::warn!(reason = %reason, "daemon degraded");
            }
            HealthStatus::Unhealthy(reason) => {
                tracing::error!(reason = %reason, "daemon unhealthy");
            }
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(
    start_time: Instant,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    use errwatch_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                () = shutdown.cancelled() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
