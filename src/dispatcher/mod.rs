use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use indicatif::ProgressBar;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task;
use tracing::{debug, error};

use crate::tasks::Task;

pub const DEFAULT_CONCURRENCY: usize = 10;

// what a single task ended with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Reported,
    NothingFound,
    InvocationFailed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub reported: usize,
    pub nothing_found: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl DispatchSummary {
    pub fn completed(&self) -> usize {
        self.reported + self.nothing_found + self.failed + self.panicked
    }

    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Reported => self.reported += 1,
            TaskOutcome::NothingFound => self.nothing_found += 1,
            TaskOutcome::InvocationFailed => self.failed += 1,
        }
    }
}

/// The permits a running task holds.
///
/// Fields drop in declaration order, so the per-URL permit goes back before
/// the global one on every exit path, unwinding included.
struct SlotGuard {
    _url: Option<OwnedSemaphorePermit>,
    _global: OwnedSemaphorePermit,
}

/// Runs tasks under a global concurrency cap and an optional per-URL cap.
#[derive(Clone)]
pub struct Dispatcher {
    global: Arc<Semaphore>,
    capacity: usize,
    per_url: Option<usize>,
    progress: ProgressBar,
}

impl Dispatcher {
    pub fn new(capacity: usize, per_url: Option<usize>) -> Self {
        let capacity = capacity.max(1);
        Self {
            global: Arc::new(Semaphore::new(capacity)),
            capacity,
            per_url: per_url.map(|n| n.max(1)),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_slots(&self) -> usize {
        self.global.available_permits()
    }

    async fn acquire(
        global: Arc<Semaphore>,
        url: Option<Arc<Semaphore>>,
    ) -> Result<SlotGuard, tokio::sync::AcquireError> {
        // per-URL first so a task parked on its URL does not sit on a global slot
        let url = match url {
            Some(sem) => Some(sem.acquire_owned().await?),
            None => None,
        };
        let global = global.acquire_owned().await?;
        Ok(SlotGuard {
            _url: url,
            _global: global,
        })
    }

    /// Spawns one tokio task per `Task` and waits for all of them.
    ///
    /// A panic inside `work` is counted and its slots are still returned.
    pub async fn run<F, Fut>(&self, tasks: Vec<Task>, work: F) -> DispatchSummary
    where
        F: Fn(Task) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        let mut summary = DispatchSummary {
            dispatched: tasks.len(),
            ..Default::default()
        };

        let url_slots: HashMap<String, Arc<Semaphore>> = match self.per_url {
            Some(limit) => tasks
                .iter()
                .map(|t| (t.url.clone(), Arc::new(Semaphore::new(limit))))
                .collect(),
            None => HashMap::new(),
        };

        let work = Arc::new(work);
        let workers = FuturesUnordered::new();
        for t in tasks {
            let global = self.global.clone();
            let url_slot = url_slots.get(&t.url).cloned();
            let work = work.clone();
            let pb = self.progress.clone();
            workers.push(task::spawn(async move {
                let _slots = Self::acquire(global, url_slot).await.ok()?;
                debug!(url = %t.url, method = %t.method, "slot acquired");
                let outcome = work(t).await;
                pb.inc(1);
                Some(outcome)
            }));
        }

        let results: Vec<_> = workers.collect().await;
        for res in results {
            match res {
                Ok(Some(outcome)) => summary.record(outcome),
                // semaphores are never closed, so this cannot be reached
                Ok(None) => summary.failed += 1,
                Err(e) => {
                    error!("task aborted: {e}");
                    self.progress.inc(1);
                    summary.panicked += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn tasks(urls: usize, methods: &[&str]) -> Vec<Task> {
        let urls: Vec<String> = (0..urls).map(|i| format!("http://h{i}.test")).collect();
        let methods: Vec<String> = methods.iter().map(|m| m.to_string()).collect();
        crate::tasks::build_tasks(&urls, &methods).unwrap()
    }

    #[derive(Default)]
    struct Gauge {
        running: AtomicUsize,
        peak: AtomicUsize,
        done: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn join_waits_for_every_task() {
        let gauge = Arc::new(Gauge::default());
        let dispatcher = Dispatcher::new(3, None);
        let g = gauge.clone();
        let summary = dispatcher
            .run(tasks(5, &["GET", "POST", "JSON"]), move |_t| {
                let g = g.clone();
                async move {
                    g.enter();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    g.leave();
                    TaskOutcome::NothingFound
                }
            })
            .await;
        assert_eq!(summary.dispatched, 15);
        assert_eq!(summary.completed(), 15);
        assert_eq!(gauge.done.load(Ordering::SeqCst), 15);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn running_tasks_never_exceed_capacity() {
        for capacity in [1, 2, 5] {
            let gauge = Arc::new(Gauge::default());
            let dispatcher = Dispatcher::new(capacity, None);
            let g = gauge.clone();
            dispatcher
                .run(tasks(10, &["GET", "POST"]), move |_t| {
                    let g = g.clone();
                    async move {
                        g.enter();
                        tokio::time::sleep(Duration::from_millis(3)).await;
                        g.leave();
                        TaskOutcome::Reported
                    }
                })
                .await;
            let peak = gauge.peak.load(Ordering::SeqCst);
            assert!(peak <= capacity, "peak {peak} > capacity {capacity}");
            assert!(peak >= 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn slots_are_released_after_failures_and_panics() {
        let dispatcher = Dispatcher::new(4, Some(1));
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let summary = dispatcher
            .run(tasks(6, &["GET", "POST"]), move |_t| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n % 3 {
                        0 => TaskOutcome::InvocationFailed,
                        1 => panic!("injected failure"),
                        _ => TaskOutcome::Reported,
                    }
                }
            })
            .await;
        assert_eq!(summary.completed(), 12);
        assert_eq!(summary.failed, 4);
        assert_eq!(summary.panicked, 4);
        assert_eq!(summary.reported, 4);
        assert_eq!(dispatcher.available_slots(), dispatcher.capacity());

        // the dispatcher is still fully usable afterwards
        let again = dispatcher
            .run(tasks(2, &["GET"]), |_t| async { TaskOutcome::NothingFound })
            .await;
        assert_eq!(again.nothing_found, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn per_url_capacity_bounds_methods_of_one_url() {
        let per_url: Arc<Mutex<HashMap<String, (usize, usize)>>> = Arc::default();
        let dispatcher = Dispatcher::new(8, Some(2));
        let state = per_url.clone();
        dispatcher
            .run(tasks(3, &["GET", "POST", "JSON", "XML"]), move |t| {
                let state = state.clone();
                async move {
                    {
                        let mut s = state.lock().unwrap();
                        let entry = s.entry(t.url.clone()).or_default();
                        entry.0 += 1;
                        entry.1 = entry.1.max(entry.0);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    state.lock().unwrap().get_mut(&t.url).unwrap().0 -= 1;
                    TaskOutcome::Reported
                }
            })
            .await;
        let s = per_url.lock().unwrap();
        assert_eq!(s.len(), 3);
        for (url, (running, peak)) in s.iter() {
            assert_eq!(*running, 0, "{url}");
            assert!(*peak <= 2, "{url} peaked at {peak}");
        }
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped_to_one() {
        let dispatcher = Dispatcher::new(0, Some(0));
        assert_eq!(dispatcher.capacity(), 1);
        let summary = dispatcher
            .run(tasks(2, &["GET"]), |_t| async { TaskOutcome::Reported })
            .await;
        assert_eq!(summary.reported, 2);
    }
}
