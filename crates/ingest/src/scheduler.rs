//! 폴링 스케줄러
//!
//! [`PollScheduler`]는 대기 중인 타이머 핸들을 최대 하나만 소유합니다.
//!
//! ```text
//!          schedule_next            fire              cycle returns
//!   Idle ---------------> Scheduled ------> Running ---------------> Idle
//!    |                      |  ^   |
//!    |          cancel()    |  |   | schedule_next (이전 핸들 대체)
//!    |<---------------------+  +---+
//!    |
//!    +-- shutdown() / shutdown token (Idle, Scheduled에서) --> Cancelled
//! ```
//!
//! 사이클 N+1의 타이머는 사이클 N이 반환된 뒤에만 설정되므로 사이클은 겹치지 않습니다.
//!
//! 콜백을 받는 진입점은 [`PollScheduler::schedule_next_with`] (예약 한 번)와
//! [`PollScheduler::run`] (종료까지 반복)입니다. [`PollScheduler::schedule_next`]는
//! 타이머만 설정하고 [`PollScheduler::next_fire`]로 발화를 기다립니다.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 스케줄러 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// 대기 중인 타이머 없음
    Idle,
    /// 타이머 하나가 대기 중
    Scheduled,
    /// 콜백 실행 중
    Running,
    /// 종료됨 (재시작 불가)
    Cancelled,
}

/// 대기 중인 예약 하나
#[derive(Debug)]
struct ScheduleHandle {
    id: u64,
    deadline: Instant,
    token: CancellationToken,
}

/// 폴링 스케줄러
#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    state: SchedulerState,
    pending: Option<ScheduleHandle>,
    shutdown: CancellationToken,
    next_id: u64,
}

impl PollScheduler {
    /// 새 스케줄러를 생성합니다.
    pub fn new(interval: Duration) -> Self {
        Self::with_shutdown(interval, CancellationToken::new())
    }

    /// 외부 종료 토큰에 연결된 스케줄러를 생성합니다.
    pub fn with_shutdown(interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            interval,
            state: SchedulerState::Idle,
            pending: None,
            shutdown,
            next_id: 0,
        }
    }

    /// 폴링 간격
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 현재 상태
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// 대기 중인 핸들의 식별자
    pub fn pending_id(&self) -> Option<u64> {
        self.pending.as_ref().map(|h| h.id)
    }

    /// 종료 토큰의 복제본을 반환합니다. 토큰을 취소하면 스케줄러가 종료됩니다.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 간격 후에 발화할 타이머를 설정합니다.
    ///
    /// 이미 대기 중인 타이머가 있으면 무효화하고 대체합니다.
    /// 종료된 스케줄러에서는 `None`을 반환합니다.
    pub fn schedule_next(&mut self) -> Option<u64> {
        if self.state == SchedulerState::Cancelled || self.shutdown.is_cancelled() {
            self.enter_cancelled();
            return None;
        }

        if let Some(previous) = self.pending.take() {
            previous.token.cancel();
            debug!(handle = previous.id, "pending poll superseded");
        }

        self.next_id += 1;
        let handle = ScheduleHandle {
            id: self.next_id,
            deadline: Instant::now() + self.interval,
            token: self.shutdown.child_token(),
        };
        debug!(
            handle = handle.id,
            interval_secs = self.interval.as_secs(),
            "next poll scheduled"
        );
        let id = handle.id;
        self.pending = Some(handle);
        self.state = SchedulerState::Scheduled;
        Some(id)
    }

    /// 대기 중인 타이머를 무효화합니다. 대기 중인 타이머가 없으면 아무것도 하지 않습니다.
    pub fn cancel(&mut self) {
        let Some(handle) = self.pending.take() else {
            return;
        };
        handle.token.cancel();
        debug!(handle = handle.id, "pending poll cancelled");
        if self.state == SchedulerState::Scheduled {
            self.state = SchedulerState::Idle;
        }
    }

    /// 스케줄러를 종료합니다. 이후 `schedule_next`는 `None`을 반환합니다.
    pub fn shutdown(&mut self) {
        self.shutdown.cancel();
        self.enter_cancelled();
    }

    fn enter_cancelled(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.token.cancel();
        }
        if self.state != SchedulerState::Cancelled {
            info!("poll scheduler cancelled");
        }
        self.state = SchedulerState::Cancelled;
    }

    /// 대기 중인 타이머가 발화할 때까지 기다립니다.
    ///
    /// 발화하면 `Running`으로 전이하고 핸들 식별자를 반환합니다.
    /// 대기 중인 타이머가 없거나 무효화되면 `None`.
    pub async fn next_fire(&mut self) -> Option<u64> {
        let (id, deadline, token) = {
            let handle = self.pending.as_ref()?;
            (handle.id, handle.deadline, handle.token.clone())
        };

        tokio::select! {
            biased;
            () = token.cancelled() => {
                if self.shutdown.is_cancelled() {
                    self.enter_cancelled();
                }
                None
            }
            () = tokio::time::sleep_until(deadline) => {
                self.pending = None;
                self.state = SchedulerState::Running;
                Some(id)
            }
        }
    }

    /// 콜백 실행이 끝났음을 기록합니다.
    pub fn finish_run(&mut self) {
        if self.state == SchedulerState::Running {
            self.state = SchedulerState::Idle;
        }
    }

    /// 간격 후에 `cycle`을 한 번 실행하도록 예약하고 발화를 기다립니다.
    ///
    /// `cycle`이 실행되었으면 `true`, 종료되었거나 타이머가 무효화되었으면 `false`.
    pub async fn schedule_next_with<F, Fut>(&mut self, cycle: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        if self.schedule_next().is_none() {
            return false;
        }
        let Some(handle) = self.next_fire().await else {
            return false;
        };
        debug!(handle, "poll timer fired");
        cycle().await;
        self.finish_run();
        true
    }

    /// 종료될 때까지 간격마다 `cycle`을 순차 실행합니다.
    ///
    /// 실행 중인 사이클은 중단하지 않으며, 종료 요청은 다음 타이머 대기 시점에 반영됩니다.
    pub async fn run<F, Fut>(&mut self, mut cycle: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        info!(
            interval_secs = self.interval.as_secs(),
            "poll scheduler started"
        );
        while self.schedule_next_with(&mut cycle).await {}
        info!("poll scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn cancel_before_schedule_is_noop() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        scheduler.cancel();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.pending_id(), None);
        // 이후에도 정상적으로 예약 가능
        assert!(scheduler.schedule_next().is_some());
        assert_eq!(scheduler.state(), SchedulerState::Scheduled);
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        scheduler.schedule_next();
        scheduler.cancel();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.pending_id(), None);
    }

    #[test]
    fn shutdown_is_terminal() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        scheduler.schedule_next();
        scheduler.shutdown();
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
        assert_eq!(scheduler.schedule_next(), None);
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn second_schedule_supersedes_first() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        let start = Instant::now();

        let first = scheduler.schedule_next().unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        let second = scheduler.schedule_next().unwrap();
        assert_ne!(first, second);

        // Given: 두 번 예약됨 / When: 대기 / Then: 두 번째 타이머만 15초 시점에 발화
        let fired = scheduler.next_fire().await;
        assert_eq!(fired, Some(second));
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        assert_eq!(scheduler.state(), SchedulerState::Running);

        // 두 번째 발화는 없음
        assert_eq!(scheduler.next_fire().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_does_not_fire() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(10));
        scheduler.schedule_next();
        scheduler.cancel();
        assert_eq!(scheduler.next_fire().await, None);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_token_interrupts_wait() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(3600));
        let token = scheduler.shutdown_token();
        scheduler.schedule_next();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        assert_eq!(scheduler.next_fire().await, None);
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_next_with_runs_callback_once_after_interval() {
        // Given
        let mut scheduler = PollScheduler::new(Duration::from_secs(30));
        let calls = AtomicUsize::new(0);
        let start = Instant::now();

        // When
        let fired = scheduler
            .schedule_next_with(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        // Then
        assert!(fired);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.pending_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_next_with_after_shutdown_skips_callback() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(30));
        scheduler.shutdown();
        let calls = AtomicUsize::new(0);

        let fired = scheduler
            .schedule_next_with(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(!fired);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn run_executes_cycles_sequentially_until_shutdown() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(60));
        let token = scheduler.shutdown_token();
        let cycles = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let counter = Arc::clone(&cycles);
        let running = Arc::clone(&in_flight);
        scheduler
            .run(move || {
                let counter = Arc::clone(&counter);
                let running = Arc::clone(&running);
                let token = token.clone();
                async move {
                    assert_eq!(running.fetch_add(1, Ordering::SeqCst), 0, "cycles overlap");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                        token.cancel();
                    }
                }
            })
            .await;

        assert_eq!(cycles.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
        // 타이머는 이전 사이클이 끝난 뒤에 설정됨: 3 * (60 + 5)
        assert_eq!(start.elapsed(), Duration::from_secs(195));
    }
}
