//! Cooperative tick scheduler for coroutine handlers.
//!
//! A handler that returns a [`Routine`] does not finish inside the dispatch
//! that invoked it. The routine is handed to the [`TickScheduler`], which
//! resumes it once per host tick until it reports [`Step::Done`] or its
//! [`CoroutineHandle`] is cancelled. A newly spawned routine first runs on
//! the next tick.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error};

use labext_core::config::hooks::HookConfig;

use crate::error::panic_message;

/// What a routine wants after one resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Resume again on the next tick.
    Yield,
    /// Skip this many ticks, then resume.
    Wait(u32),
    /// Finished.
    Done,
}

/// A resumable unit of work.
pub trait Coroutine: Send {
    /// Runs until the next suspension point.
    fn resume(&mut self) -> Step;
}

struct FnRoutine<F>(F);

impl<F> Coroutine for FnRoutine<F>
where
    F: FnMut() -> Step + Send,
{
    fn resume(&mut self) -> Step {
        (self.0)()
    }
}

struct StepIter<I>(I);

impl<I> Coroutine for StepIter<I>
where
    I: Iterator<Item = Step> + Send,
{
    fn resume(&mut self) -> Step {
        self.0.next().unwrap_or(Step::Done)
    }
}

/// A boxed coroutine returned by a handler.
pub struct Routine {
    inner: Box<dyn Coroutine>,
}

impl Routine {
    /// Wraps a coroutine.
    pub fn new(coroutine: impl Coroutine + 'static) -> Self {
        Self {
            inner: Box::new(coroutine),
        }
    }

    /// A routine that calls `f` once per resumption.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut() -> Step + Send + 'static,
    {
        Self::new(FnRoutine(f))
    }

    /// A routine that yields each step in turn and is done when they run out.
    pub fn from_steps<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = Step>,
        I::IntoIter: Send + 'static,
    {
        Self::new(StepIter(steps.into_iter()))
    }

    fn resume(&mut self) -> Step {
        self.inner.resume()
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Routine(..)")
    }
}

#[derive(Debug, Default)]
struct HandleState {
    cancelled: AtomicBool,
    finished: AtomicBool,
}

/// Handle to a scheduled routine.
#[derive(Debug, Clone)]
pub struct CoroutineHandle {
    id: u64,
    state: Arc<HandleState>,
}

impl CoroutineHandle {
    /// Returns the scheduler-local id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stops the routine. It is never resumed again.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
    }

    /// Returns whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Returns whether the routine has left the scheduler.
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }
}

struct Task {
    name: String,
    handle: CoroutineHandle,
    routine: Routine,
    wait: u32,
}

impl Task {
    fn finish(self) {
        self.handle.state.finished.store(true, Ordering::Release);
    }
}

/// Per-tick summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Routines resumed this tick.
    pub resumed: usize,
    /// Routines that completed, were cancelled, or panicked this tick.
    pub finished: usize,
    /// Routines still scheduled after the tick.
    pub pending: usize,
}

/// Single-threaded cooperative scheduler driven by the host tick loop.
pub struct TickScheduler {
    queue: Mutex<VecDeque<Task>>,
    next_id: AtomicU64,
    ticks: AtomicU64,
    step_budget: usize,
}

impl TickScheduler {
    /// Creates a scheduler. `step_budget` caps resumptions per tick (0 = unlimited).
    pub fn new(step_budget: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            ticks: AtomicU64::new(0),
            step_budget,
        }
    }

    /// Creates a scheduler from hook configuration.
    pub fn from_config(config: &HookConfig) -> Self {
        Self::new(config.coroutine_step_budget)
    }

    /// Schedules a routine. Its first step runs on the next tick.
    pub fn spawn(&self, name: impl Into<String>, routine: Routine) -> CoroutineHandle {
        let handle = CoroutineHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            state: Arc::new(HandleState::default()),
        };
        let task = Task {
            name: name.into(),
            handle: handle.clone(),
            routine,
            wait: 0,
        };

        debug!(coroutine = %task.name, id = handle.id, "Coroutine scheduled");

        self.lock().push_back(task);
        handle
    }

    /// Advances every scheduled routine by one tick.
    ///
    /// Routines spawned while this runs are not resumed until the next tick.
    pub fn tick(&self) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let tasks = std::mem::take(&mut *self.lock());
        let mut report = TickReport::default();
        let mut deferred = VecDeque::new();
        let mut kept = VecDeque::new();

        for mut task in tasks {
            if task.handle.is_cancelled() {
                debug!(coroutine = %task.name, id = task.handle.id, "Coroutine cancelled");
                task.finish();
                report.finished += 1;
                continue;
            }

            if task.wait > 0 {
                task.wait -= 1;
                kept.push_back(task);
                continue;
            }

            if self.step_budget > 0 && report.resumed >= self.step_budget {
                deferred.push_back(task);
                continue;
            }

            report.resumed += 1;
            match catch_unwind(AssertUnwindSafe(|| task.routine.resume())) {
                Ok(Step::Yield) => kept.push_back(task),
                Ok(Step::Wait(ticks)) => {
                    task.wait = ticks;
                    kept.push_back(task);
                }
                Ok(Step::Done) => {
                    debug!(coroutine = %task.name, id = task.handle.id, tick, "Coroutine finished");
                    task.finish();
                    report.finished += 1;
                }
                Err(payload) => {
                    error!(
                        coroutine = %task.name,
                        id = task.handle.id,
                        tick,
                        error = %panic_message(payload.as_ref()),
                        "Coroutine panicked, dropping it"
                    );
                    task.finish();
                    report.finished += 1;
                }
            }
        }

        let mut queue = self.lock();
        let spawned = std::mem::take(&mut *queue);
        deferred.extend(kept);
        deferred.extend(spawned);
        *queue = deferred;
        report.pending = queue.len();

        report
    }

    /// Returns the number of scheduled routines.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Returns the number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Cancels and drops every scheduled routine.
    pub fn cancel_all(&self) {
        let tasks = std::mem::take(&mut *self.lock());
        for task in tasks {
            task.handle.cancel();
            task.finish();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Task>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickScheduler")
            .field("pending", &self.pending())
            .field("ticks", &self.ticks())
            .field("step_budget", &self.step_budget)
            .finish()
    }
}
