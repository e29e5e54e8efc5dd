//! Single-slot task runner that coalesces bursts of requests.
//!
//! Each runner owns one long-lived worker thread. At most one task body
//! executes at a time. A new request cancels whatever is in flight and takes
//! its place; nothing is queued. Consecutive starts are spaced by at least the
//! configured interval, measured from the previous start.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{trace, warn};

/// Cooperative cancellation flag handed to every task body.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type TaskBody = dyn Fn(&CancellationToken) + Send + Sync;

/// A unit of work. Clones share identity; separately constructed tasks never
/// compare equal even if their bodies do the same thing.
#[derive(Clone)]
pub struct Task {
    body: Arc<TaskBody>,
}

impl Task {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&CancellationToken) + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
        }
    }

    pub fn same_as(&self, other: &Task) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }

    fn call(&self, token: &CancellationToken) {
        (self.body)(token)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("body", &Arc::as_ptr(&self.body).cast::<()>())
            .finish()
    }
}

#[derive(Clone)]
struct InFlight {
    task: Task,
    token: CancellationToken,
    generation: u64,
}

#[derive(Default)]
struct Slot {
    current: Option<InFlight>,
    busy: bool,
    last_start: Option<Instant>,
    generation: u64,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Slot>) -> MutexGuard<'a, Slot> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_for<'a>(&self, guard: MutexGuard<'a, Slot>, timeout: Duration) -> MutexGuard<'a, Slot> {
        self.changed
            .wait_timeout(guard, timeout)
            .unwrap_or_else(PoisonError::into_inner)
            .0
    }

    /// Blocks until the newest scheduled task may start, then marks the slot
    /// busy. Returns `None` once the runner shuts down.
    fn next(&self, min_interval: Duration) -> Option<InFlight> {
        let mut slot = self.lock();
        loop {
            if slot.shutdown {
                return None;
            }
            if slot.current.is_none() {
                slot = self.wait(slot);
                continue;
            }

            let now = Instant::now();
            let start_at = slot.last_start.map_or(now, |last| last + min_interval);
            if start_at > now {
                slot = self.wait_for(slot, start_at - now);
                continue;
            }

            if let Some(current) = slot.current.clone() {
                slot.busy = true;
                slot.last_start = Some(now);
                return Some(current);
            }
        }
    }

    fn work(&self, name: &str, min_interval: Duration) {
        while let Some(InFlight {
            task,
            token,
            generation,
        }) = self.next(min_interval)
        {
            trace!(runner = name, generation, "task started");
            let _busy = BusyGuard {
                shared: self,
                generation,
            };
            task.call(&token);

            if token.is_cancelled() {
                trace!(runner = name, generation, "task cancelled");
            } else {
                trace!(runner = name, generation, "task completed");
            }
        }
        trace!(runner = name, "worker shut down");
    }
}

/// Releases the worker slot even if the task body panics.
struct BusyGuard<'a> {
    shared: &'a Shared,
    generation: u64,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.shared.lock();
        slot.busy = false;
        if slot
            .current
            .as_ref()
            .is_some_and(|current| current.generation == self.generation)
        {
            slot.current = None;
        }
        drop(slot);
        self.shared.changed.notify_all();
    }
}

pub struct ThrottledRunner {
    name: String,
    min_interval: Duration,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl ThrottledRunner {
    /// Starts the runner's worker thread.
    pub fn new(name: impl Into<String>, min_interval: Duration) -> io::Result<Self> {
        let name = name.into();
        let shared = Arc::new(Shared::default());

        let worker = {
            let shared = Arc::clone(&shared);
            let name = name.clone();
            thread::Builder::new()
                .name(format!("{name}-worker"))
                .spawn(move || shared.work(&name, min_interval))?
        };

        Ok(Self {
            name,
            min_interval,
            shared,
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedules `task`, superseding whatever is in flight.
    ///
    /// Re-submitting the task that is already running or waiting is a no-op.
    pub fn run(&self, task: Task) {
        let mut slot = self.shared.lock();

        if let Some(current) = &slot.current
            && current.task.same_as(&task)
            && !current.token.is_cancelled()
        {
            return;
        }

        if let Some(previous) = slot.current.take() {
            previous.token.cancel();
            trace!(
                runner = self.name.as_str(),
                generation = previous.generation,
                "superseding in-flight task"
            );
        }

        slot.generation += 1;
        let generation = slot.generation;
        slot.current = Some(InFlight {
            task,
            token: CancellationToken::new(),
            generation,
        });
        drop(slot);
        self.shared.changed.notify_all();
    }

    /// Cancels the running or waiting task without scheduling another.
    pub fn stop(&self) {
        let mut slot = self.shared.lock();
        if let Some(current) = slot.current.take() {
            current.token.cancel();
            trace!(
                runner = self.name.as_str(),
                generation = current.generation,
                "stopped in-flight task"
            );
        }
        drop(slot);
        self.shared.changed.notify_all();
    }

    /// Waits until no task is scheduled and no task body is executing.
    pub fn block(&self) {
        let mut slot = self.shared.lock();
        while slot.current.is_some() || slot.busy {
            slot = self.shared.wait(slot);
        }
    }

    pub fn is_idle(&self) -> bool {
        let slot = self.shared.lock();
        slot.current.is_none() && !slot.busy
    }
}

impl Drop for ThrottledRunner {
    fn drop(&mut self) {
        self.stop();
        self.shared.lock().shutdown = true;
        self.shared.changed.notify_all();

        let Some(worker) = self.worker.take() else {
            return;
        };
        // A task body may drop the last owner of its own runner.
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            warn!(runner = self.name.as_str(), "worker thread panicked");
        }
    }
}

impl fmt::Debug for ThrottledRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottledRunner")
            .field("name", &self.name)
            .field("min_interval", &self.min_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn wait_until_cancelled(token: &CancellationToken, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if token.is_cancelled() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn newer_task_cancels_the_one_in_flight() {
        let runner = ThrottledRunner::new("test", Duration::ZERO).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first_log = Arc::clone(&log);
        let first = Task::new(move |token| {
            if !wait_until_cancelled(token, Duration::from_secs(5)) {
                first_log.lock().unwrap().push("first");
            }
        });
        let second_log = Arc::clone(&log);
        let second = Task::new(move |_| second_log.lock().unwrap().push("second"));

        runner.run(first);
        runner.run(second);
        runner.block();

        assert_eq!(*log.lock().unwrap(), ["second"]);
        assert!(runner.is_idle());
    }

    #[test]
    fn resubmitting_the_same_task_is_a_no_op() {
        let runner = ThrottledRunner::new("test", Duration::ZERO).unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        let task = Task::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
        });

        runner.run(task.clone());
        runner.run(task.clone());
        runner.run(task);
        runner.block();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn completed_task_can_run_again() {
        let runner = ThrottledRunner::new("test", Duration::ZERO).unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        let task = Task::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        runner.run(task.clone());
        runner.block();
        runner.run(task);
        runner.block();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn starts_are_spaced_by_the_minimum_interval() {
        let interval = Duration::from_millis(80);
        let runner = ThrottledRunner::new("test", interval).unwrap();
        let starts = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let starts = Arc::clone(&starts);
            runner.run(Task::new(move |_| starts.lock().unwrap().push(Instant::now())));
            runner.block();
        }

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 2);
        assert!(starts[1] - starts[0] >= interval);
    }

    #[test]
    fn stop_cancels_without_replacement() {
        let runner = ThrottledRunner::new("test", Duration::ZERO).unwrap();
        let observed = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&observed);
        let running = Arc::clone(&started);
        runner.run(Task::new(move |token| {
            running.store(true, Ordering::SeqCst);
            if wait_until_cancelled(token, Duration::from_secs(5)) {
                flag.store(true, Ordering::SeqCst);
            }
        }));
        while !started.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }

        runner.stop();
        runner.block();

        assert!(observed.load(Ordering::SeqCst));
        assert!(runner.is_idle());
    }

    #[test]
    fn every_run_executes_on_the_same_worker_thread() {
        let runner = ThrottledRunner::new("test", Duration::ZERO).unwrap();
        let threads = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..20 {
            let threads = Arc::clone(&threads);
            runner.run(Task::new(move |_| threads.lock().unwrap().push(thread::current().id())));
            runner.block();
        }

        let mut threads = threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 20);
        threads.dedup();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], thread::current().id());
    }

    #[test]
    fn dropping_the_runner_cancels_and_joins_its_worker() {
        let runner = ThrottledRunner::new("test", Duration::ZERO).unwrap();
        let started = Arc::new(AtomicBool::new(false));
        let observed = Arc::new(AtomicBool::new(false));

        let running = Arc::clone(&started);
        let flag = Arc::clone(&observed);
        runner.run(Task::new(move |token| {
            running.store(true, Ordering::SeqCst);
            if wait_until_cancelled(token, Duration::from_secs(5)) {
                flag.store(true, Ordering::SeqCst);
            }
        }));
        while !started.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }

        drop(runner);

        assert!(observed.load(Ordering::SeqCst));
    }

    #[test]
    fn block_on_idle_runner_returns_immediately() {
        let runner = ThrottledRunner::new("test", Duration::from_secs(60)).unwrap();
        runner.block();
        assert!(runner.is_idle());
    }
}
