//! A bounded pool of workers that runs a fixed list of independent jobs to
//! completion.
//!
//! A [`Pool`] wraps each submitted [`Job`] in a [`Task`] which records the
//! job's [`Outcome`]. [`Pool::run()`] starts `workers` threads that pull tasks
//! from a shared queue until it is empty and returns only once every task has
//! an outcome. A failing (or panicking) job never stops the other jobs.
//!
//! ```rust
//! use wren::pool::{FnJob, Pool};
//!
//! let jobs = (0..5).map(|i| FnJob::new(move || match i {
//!     3 => wren::err!("three is right out"),
//!     _ => Ok(()),
//! }));
//!
//! let pool = Pool::new(jobs, 2).unwrap();
//! pool.run().unwrap();
//! assert!(pool.has_errors());
//! assert!(pool.tasks()[3].is_failed());
//! ```

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{Error, Result};

/// The number of workers used when none is configured.
pub const DEFAULT_WORKERS: usize = 10;

/// A single, independent unit of build work.
///
/// A job must not depend on the outcome or ordering of any other job, and
/// must only write to outputs that no other job writes to.
pub trait Job: Send + Sync {
    /// Performs the work.
    fn run(&self) -> Result<()>;

    /// A short, human readable description used in logs and reports.
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

impl<J: Job + ?Sized> Job for Box<J> {
    fn run(&self) -> Result<()> {
        (**self).run()
    }

    fn label(&self) -> Cow<'_, str> {
        (**self).label()
    }
}

/// A [`Job`] backed by a closure.
pub struct FnJob<F> {
    label: Cow<'static, str>,
    f: F,
}

impl<F: Fn() -> Result<()> + Send + Sync> FnJob<F> {
    pub fn new(f: F) -> Self {
        FnJob { label: Cow::Borrowed("closure"), f }
    }

    pub fn labeled<L: Into<Cow<'static, str>>>(label: L, f: F) -> Self {
        FnJob { label: label.into(), f }
    }
}

impl<F: Fn() -> Result<()> + Send + Sync> Job for FnJob<F> {
    fn run(&self) -> Result<()> {
        (self.f)()
    }

    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.label)
    }
}

impl<F> fmt::Debug for FnJob<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnJob").field("label", &self.label).finish()
    }
}

/// What happened when a task's job ran.
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeeded,
    Failed(Error),
}

/// A job paired with the outcome of running it.
///
/// The outcome is set exactly once, by the worker that ran the job, and is
/// never changed afterwards.
#[derive(Debug)]
pub struct Task<J> {
    job: J,
    claimed: AtomicBool,
    outcome: OnceCell<Outcome>,
}

impl<J: Job> Task<J> {
    pub fn new(job: J) -> Self {
        Task { job, claimed: AtomicBool::new(false), outcome: OnceCell::new() }
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    /// The outcome, or `None` if the job has not run yet.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.get()
    }

    /// The error the job failed with, if it failed.
    pub fn error(&self) -> Option<&Error> {
        match self.outcome.get()? {
            Outcome::Failed(e) => Some(e),
            Outcome::Succeeded => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error().is_some()
    }

    /// Runs the job and records its outcome. Panics are caught and recorded
    /// as failures. Returns `false` without running anything if another
    /// caller already claimed the task.
    fn execute(&self) -> bool {
        if self.claimed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let label = self.job.label();
        let start = Instant::now();
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.job.run())) {
            Ok(Ok(())) => Outcome::Succeeded,
            Ok(Err(e)) => Outcome::Failed(e),
            Err(payload) => Outcome::Failed(Error::from_panic(payload)),
        };

        tracing::debug!(
            job = %label,
            failed = matches!(outcome, Outcome::Failed(_)),
            elapsed = ?start.elapsed(),
            "finished job"
        );

        self.outcome.set(outcome).is_ok()
    }
}

/// Runs a list of tasks on a fixed number of worker threads.
#[derive(Debug)]
pub struct Pool<J> {
    tasks: Vec<Task<J>>,
    workers: NonZeroUsize,
}

impl<J: Job> Pool<J> {
    /// Wraps every job in a task, preserving the submission order. Fails if
    /// `workers` is zero.
    pub fn new<I>(jobs: I, workers: usize) -> Result<Self>
        where I: IntoIterator<Item = J>
    {
        let workers = NonZeroUsize::new(workers)
            .ok_or_else(|| error!("the worker count must be a positive integer"))?;

        let tasks = jobs.into_iter().map(Task::new).collect();
        Ok(Pool { tasks, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// The tasks in submission order, regardless of completion order.
    pub fn tasks(&self) -> &[Task<J>] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task<J>> {
        self.tasks
    }

    /// Returns `true` if any task failed.
    pub fn has_errors(&self) -> bool {
        self.tasks.iter().any(|t| t.is_failed())
    }

    /// Runs every task that has not yet run, blocking until all of them have
    /// an outcome.
    ///
    /// Each of the `workers` threads repeatedly takes the next pending task
    /// and runs it, exiting once no tasks remain. With one worker, tasks run
    /// sequentially in submission order. The only error returned is a failure
    /// to start the worker threads; job failures are recorded on their tasks.
    pub fn run(&self) -> Result<()> {
        let pending: VecDeque<usize> = (0..self.tasks.len())
            .filter(|&i| self.tasks[i].outcome().is_none())
            .collect();

        if pending.is_empty() {
            return Ok(());
        }

        let workers = self.workers.get();
        tracing::debug!(tasks = pending.len(), workers, "starting pool");

        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("wren-worker-{i}"))
            .build()?;

        let pending = Mutex::new(pending);
        threads.scope(|scope| {
            for worker in 0..workers {
                let pending = &pending;
                scope.spawn(move |_| self.work(worker, pending));
            }
        });

        Ok(())
    }

    fn work(&self, worker: usize, pending: &Mutex<VecDeque<usize>>) {
        let mut completed = 0;
        loop {
            // The guard must drop before the job runs.
            let Some(next) = pending.lock().pop_front() else {
                break;
            };

            if self.tasks[next].execute() {
                completed += 1;
            }
        }

        tracing::debug!(worker, completed, "worker exiting");
    }
}
