use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinSet;

use super::traits::{ShutdownPolicy, ShutdownReport};

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    completed: AtomicUsize,
    aborting: AtomicBool,
    idle: Notify,
}

/// Follows one job from submission until it finishes, panics or is aborted.
///
/// Lives inside the job's future, so an abort before the first poll still
/// releases it. A job dropped unfinished outside of an abort has panicked.
struct JobGuard {
    label: String,
    counters: Arc<Counters>,
    finished: bool,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if !self.finished {
            if self.counters.aborting.load(Ordering::SeqCst) {
                tracing::debug!(job = %self.label, "background job cancelled");
            } else {
                tracing::error!(job = %self.label, "background job panicked");
                self.finished = true;
            }
        }

        if self.finished {
            self.counters.completed.fetch_add(1, Ordering::SeqCst);
        }
        self.counters.pending.fetch_sub(1, Ordering::SeqCst);
        self.counters.idle.notify_waiters();
    }
}

/// Fire-and-forget job runner owned by the application.
///
/// Every job is its own Tokio task in a tracked [`JoinSet`], so a slow job
/// never holds up the others and a panic stays inside its task. No ordering
/// holds between jobs. Nothing is detached: [`shutdown`](Self::shutdown)
/// either drains the set or aborts it and reports what was lost.
pub struct BackgroundQueue {
    tasks: Mutex<Option<JoinSet<()>>>,
    counters: Arc<Counters>,
}

impl BackgroundQueue {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Some(JoinSet::new())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Start `job` on its own task. Must be called from inside a Tokio
    /// runtime. Returns `false` once the queue has been shut down.
    pub fn spawn<F>(&self, label: impl Into<String>, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        let mut tasks = self.tasks.lock();
        let Some(tasks) = tasks.as_mut() else {
            tracing::warn!(job = %label, "background queue is shut down; job rejected");
            return false;
        };

        // Reap finished tasks so the set only holds live ones.
        while tasks.try_join_next().is_some() {}

        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        let mut guard = JobGuard {
            label,
            counters: Arc::clone(&self.counters),
            finished: false,
        };
        tasks.spawn(async move {
            job.await;
            guard.finished = true;
            tracing::debug!(job = %guard.label, "background job finished");
        });
        true
    }

    /// Jobs not yet finished.
    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    /// Jobs finished so far, including ones that panicked.
    pub fn completed(&self) -> usize {
        self.counters.completed.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.tasks.lock().is_none()
    }

    /// Wait until every job submitted so far has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.counters.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting jobs and wind the running ones down according to
    /// `policy`.
    ///
    /// `Drain` waits at most `drain_timeout` for every job; anything still
    /// running after that is aborted and counted as dropped. `Drop` aborts
    /// everything at once. Calling this twice reports the first shutdown's
    /// totals again with nothing dropped.
    pub async fn shutdown(&self, policy: ShutdownPolicy, drain_timeout: Duration) -> ShutdownReport {
        let tasks = self.tasks.lock().take();
        let mut dropped = 0;

        if let Some(mut tasks) = tasks {
            let abort = match policy {
                ShutdownPolicy::Drain => {
                    let drained = tokio::time::timeout(drain_timeout, async {
                        while tasks.join_next().await.is_some() {}
                    })
                    .await;
                    if drained.is_err() {
                        tracing::warn!(
                            timeout_secs = drain_timeout.as_secs_f64(),
                            remaining = tasks.len(),
                            "background queue drain timed out; aborting remaining jobs"
                        );
                    }
                    drained.is_err()
                }
                ShutdownPolicy::Drop => true,
            };

            if abort {
                self.counters.aborting.store(true, Ordering::SeqCst);
                tasks.abort_all();
                while let Some(result) = tasks.join_next().await {
                    if result.is_err_and(|e| e.is_cancelled()) {
                        dropped += 1;
                    }
                }
            }
        }

        let report = ShutdownReport {
            completed: self.completed(),
            dropped,
        };
        tracing::info!(
            policy = policy.as_str(),
            completed = report.completed,
            dropped = report.dropped,
            "background queue stopped"
        );
        report
    }
}

impl Default for BackgroundQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn slow_job_does_not_hold_up_later_jobs() {
        let queue = BackgroundQueue::new();
        let (done_tx, done_rx) = oneshot::channel();

        queue.spawn("slow", std::future::pending::<()>());
        queue.spawn("quick", async move {
            let _ = done_tx.send(());
        });

        tokio::time::timeout(Duration::from_secs(1), done_rx)
            .await
            .expect("quick job should not wait for the slow one")
            .unwrap();
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.completed(), 1);
    }

    #[tokio::test]
    async fn panicking_job_does_not_affect_others() {
        let queue = BackgroundQueue::new();
        let ran = Arc::new(AtomicBool::new(false));

        queue.spawn("boom", async { panic!("job failure") });
        let flag = Arc::clone(&ran);
        queue.spawn("after", async move { flag.store(true, Ordering::SeqCst) });

        queue.wait_idle().await;
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(queue.completed(), 2);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn drain_runs_everything_queued() {
        let queue = BackgroundQueue::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let count = Arc::clone(&count);
            queue.spawn("count", async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        let report = queue
            .shutdown(ShutdownPolicy::Drain, Duration::from_secs(5))
            .await;

        assert_eq!(report, ShutdownReport { completed: 5, dropped: 0 });
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn drain_waits_for_jobs_concurrently() {
        let queue = BackgroundQueue::new();
        for _ in 0..5 {
            queue.spawn("sleep", tokio::time::sleep(Duration::from_millis(300)));
        }

        let started = std::time::Instant::now();
        let report = queue
            .shutdown(ShutdownPolicy::Drain, Duration::from_secs(1))
            .await;

        assert_eq!(report, ShutdownReport { completed: 5, dropped: 0 });
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn drop_policy_reports_discarded_jobs() {
        let queue = BackgroundQueue::new();
        let (started_tx, started_rx) = oneshot::channel();
        queue.spawn("blocker", async move {
            let _ = started_tx.send(());
            std::future::pending::<()>().await;
        });
        queue.spawn("stuck", std::future::pending::<()>());
        queue.spawn("stuck", std::future::pending::<()>());
        started_rx.await.unwrap();

        let report = queue
            .shutdown(ShutdownPolicy::Drop, Duration::from_secs(5))
            .await;

        assert_eq!(report, ShutdownReport { completed: 0, dropped: 3 });
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn drain_timeout_aborts_stuck_jobs() {
        let queue = BackgroundQueue::new();
        queue.spawn("stuck", std::future::pending::<()>());
        queue.spawn("quick", async {});

        let report = queue
            .shutdown(ShutdownPolicy::Drain, Duration::from_millis(50))
            .await;

        assert_eq!(report, ShutdownReport { completed: 1, dropped: 1 });
    }

    #[tokio::test]
    async fn spawn_after_shutdown_is_rejected() {
        let queue = BackgroundQueue::new();
        queue
            .shutdown(ShutdownPolicy::Drain, Duration::from_secs(1))
            .await;

        assert!(queue.is_shut_down());
        assert!(!queue.spawn("late", async {}));
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_empty() {
        let queue = BackgroundQueue::new();
        tokio::time::timeout(Duration::from_secs(1), queue.wait_idle())
            .await
            .unwrap();
    }
}
