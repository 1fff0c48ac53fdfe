//! 권고 감시기 — 수집기와 스케줄러를 묶은 생명주기 모듈
//!
//! [`ErrataWatcher`]는 core의 [`Pipeline`] trait을 구현하여
//! `errwatch-daemon`에서 start/stop/health_check로 관리됩니다.
//!
//! ```text
//! start() --> spawn --> [run_on_start: ingest()] --> PollScheduler::run(ingest)
//!                                                           |
//! stop()  --> shutdown token --------------------------------+--> 루프 종료 대기 (grace) --> abort
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use errwatch_core::config::FeedConfig;
use errwatch_core::error::{ErrwatchError, PipelineError};
use errwatch_core::pipeline::{AdvisoryStore, HealthStatus, Notifier, Pipeline};

use crate::error::IngestError;
use crate::http::HttpFetcher;
use crate::ingestor::{CycleReport, FeedIngestor};
use crate::scheduler::PollScheduler;

/// 기본 정지 유예 시간
const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(30);

/// 감시기 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatcherState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 사이클 통계
#[derive(Debug, Default)]
struct WatcherStats {
    cycles_completed: AtomicU64,
    feed_failures: AtomicU64,
    advisories_new: AtomicU64,
    last_cycle_failed: AtomicBool,
}

impl WatcherStats {
    fn record(&self, report: &CycleReport) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        let failed = report.outcome.is_feed_failure();
        if failed {
            self.feed_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.last_cycle_failed.store(failed, Ordering::Relaxed);
        let new = u64::try_from(report.new_advisories.len()).unwrap_or(u64::MAX);
        self.advisories_new.fetch_add(new, Ordering::Relaxed);
    }
}

/// 권고 감시기
///
/// `stop()` 후 재시작이 필요하면 [`ErrataWatcherBuilder`]로 새 인스턴스를 생성해야 합니다.
pub struct ErrataWatcher<H, S, N> {
    ingestor: Arc<FeedIngestor<H, S, N>>,
    interval: Duration,
    run_on_start: bool,
    stop_grace: Duration,
    state: WatcherState,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
    stats: Arc<WatcherStats>,
}

impl<H, S, N> ErrataWatcher<H, S, N>
where
    H: HttpFetcher,
    S: AdvisoryStore,
    N: Notifier,
{
    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            WatcherState::Initialized => "initialized",
            WatcherState::Running => "running",
            WatcherState::Stopped => "stopped",
        }
    }

    /// 완료된 사이클 수
    pub fn cycles_completed(&self) -> u64 {
        self.stats.cycles_completed.load(Ordering::Relaxed)
    }

    /// 피드 단계에서 실패한 사이클 수
    pub fn feed_failures(&self) -> u64 {
        self.stats.feed_failures.load(Ordering::Relaxed)
    }

    /// 누적 신규 권고 수
    pub fn advisories_new(&self) -> u64 {
        self.stats.advisories_new.load(Ordering::Relaxed)
    }

    /// 종료 토큰. 취소하면 폴링 루프가 다음 대기 시점에 종료됩니다.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 사이클 하나를 즉시 실행합니다 (수동 트리거용).
    pub async fn run_once(&self) -> CycleReport {
        let report = self.ingestor.ingest().await;
        self.stats.record(&report);
        report
    }

    /// 폴링 루프가 스스로 끝날 때까지 기다립니다 (종료 토큰 취소 후).
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "poll loop task failed");
        }
        if self.state == WatcherState::Running {
            self.state = WatcherState::Stopped;
        }
    }
}

impl<H, S, N> Pipeline for ErrataWatcher<H, S, N>
where
    H: HttpFetcher,
    S: AdvisoryStore,
    N: Notifier,
{
    async fn start(&mut self) -> Result<(), ErrwatchError> {
        match self.state {
            WatcherState::Running => return Err(PipelineError::AlreadyRunning.into()),
            WatcherState::Stopped => {
                return Err(PipelineError::InitFailed(
                    "watcher cannot be restarted, build a new instance".to_owned(),
                )
                .into());
            }
            WatcherState::Initialized => {}
        }

        info!(
            feed = %self.ingestor.feed_url(),
            interval_secs = self.interval.as_secs(),
            run_on_start = self.run_on_start,
            "starting errata watcher"
        );

        let ingestor = Arc::clone(&self.ingestor);
        let stats = Arc::clone(&self.stats);
        let token = self.shutdown.clone();
        let interval = self.interval;
        let run_on_start = self.run_on_start;

        let task = tokio::spawn(async move {
            if run_on_start && !token.is_cancelled() {
                stats.record(&ingestor.ingest().await);
            }

            let mut scheduler = PollScheduler::with_shutdown(interval, token);
            scheduler
                .run(|| {
                    let ingestor = Arc::clone(&ingestor);
                    let stats = Arc::clone(&stats);
                    async move {
                        stats.record(&ingestor.ingest().await);
                    }
                })
                .await;
        });

        self.task = Some(task);
        self.state = WatcherState::Running;
        info!("errata watcher started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ErrwatchError> {
        if self.state != WatcherState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping errata watcher");
        self.shutdown.cancel();

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.stop_grace, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "poll loop task failed"),
                Err(_) => {
                    warn!(
                        grace_secs = self.stop_grace.as_secs(),
                        "in-flight cycle did not finish within grace period, aborting"
                    );
                    task.abort();
                    let _ = task.await;
                }
            }
        }

        self.state = WatcherState::Stopped;
        info!(cycles = self.cycles_completed(), "errata watcher stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            WatcherState::Running => {
                if self.task.as_ref().is_some_and(JoinHandle::is_finished) {
                    HealthStatus::Unhealthy("poll loop exited".to_owned())
                } else if self.stats.last_cycle_failed.load(Ordering::Relaxed) {
                    HealthStatus::Degraded(
                        "last cycle could not fetch or parse the feed".to_owned(),
                    )
                } else {
                    HealthStatus::Healthy
                }
            }
            WatcherState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            WatcherState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 권고 감시기 빌더
pub struct ErrataWatcherBuilder<H, S, N> {
    feed: Option<FeedConfig>,
    http: Option<Arc<H>>,
    store: Option<Arc<S>>,
    notifier: Option<Arc<N>>,
    stop_grace: Duration,
    shutdown: Option<CancellationToken>,
}

impl<H, S, N> Default for ErrataWatcherBuilder<H, S, N> {
    fn default() -> Self {
        Self {
            feed: None,
            http: None,
            store: None,
            notifier: None,
            stop_grace: DEFAULT_STOP_GRACE,
            shutdown: None,
        }
    }
}

impl<H, S, N> ErrataWatcherBuilder<H, S, N>
where
    H: HttpFetcher,
    S: AdvisoryStore,
    N: Notifier,
{
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 피드 설정을 지정합니다.
    pub fn feed_config(mut self, feed: FeedConfig) -> Self {
        self.feed = Some(feed);
        self
    }

    /// HTTP 전송 구현을 지정합니다.
    pub fn http(mut self, http: Arc<H>) -> Self {
        self.http = Some(http);
        self
    }

    /// 스토어를 지정합니다.
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// 알림 싱크를 지정합니다.
    pub fn notifier(mut self, notifier: Arc<N>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// `stop()`이 진행 중인 사이클을 기다리는 최대 시간을 지정합니다.
    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// 외부 종료 토큰을 연결합니다. 지정하지 않으면 새 토큰을 생성합니다.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// 감시기를 빌드합니다.
    pub fn build(self) -> Result<ErrataWatcher<H, S, N>, IngestError> {
        let feed = self.feed.ok_or_else(|| missing("feed"))?;
        feed.validate().map_err(|e| IngestError::Config {
            field: "feed".to_owned(),
            reason: e.to_string(),
        })?;
        let http = self.http.ok_or_else(|| missing("http"))?;
        let store = self.store.ok_or_else(|| missing("store"))?;
        let notifier = self.notifier.ok_or_else(|| missing("notifier"))?;

        let ingestor = FeedIngestor::from_config(&feed, http, store, notifier);

        Ok(ErrataWatcher {
            ingestor: Arc::new(ingestor),
            interval: Duration::from_secs(feed.poll_interval_secs),
            run_on_start: feed.run_on_start,
            stop_grace: self.stop_grace,
            state: WatcherState::Initialized,
            shutdown: self.shutdown.unwrap_or_default(),
            task: None,
            stats: Arc::new(WatcherStats::default()),
        })
    }
}

fn missing(field: &str) -> IngestError {
    IngestError::Config {
        field: field.to_owned(),
        reason: "not set on builder".to_owned(),
    }
}
