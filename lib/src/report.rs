use std::borrow::Cow;

use crate::error::Error;
use crate::pool::{Job, Pool};

/// The number of individual failures logged before giving up.
pub const DEFAULT_ERROR_CAP: usize = 10;

/// Reduces a finished [`Pool`] to a verdict and a bounded list of failures.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    cap: usize,
}

/// A failed task, by position in submission order.
#[derive(Debug)]
pub struct Failure<'p> {
    pub index: usize,
    pub label: Cow<'p, str>,
    pub error: &'p Error,
}

#[derive(Debug)]
pub struct Report<'p> {
    /// At most `cap` failures, in submission order.
    pub failures: Vec<Failure<'p>>,
    /// Whether the cap was reached and further failures were not listed.
    pub too_many: bool,
    /// Total number of failed tasks, listed or not.
    pub failed: usize,
    /// Total number of tasks.
    pub total: usize,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter::new(DEFAULT_ERROR_CAP)
    }
}

impl Reporter {
    pub fn new(cap: usize) -> Self {
        Reporter { cap }
    }

    /// Walks the tasks in submission order, collecting failures until `cap`
    /// of them have been seen. Reaching the cap sets `too_many`.
    pub fn report<'p, J: Job>(&self, pool: &'p Pool<J>) -> Report<'p> {
        let mut failures = vec![];
        let mut too_many = false;
        for (index, task) in pool.tasks().iter().enumerate() {
            if too_many {
                break;
            }

            if let Some(error) = task.error() {
                failures.push(Failure { index, label: task.job().label(), error });
                too_many = failures.len() >= self.cap;
            }
        }

        Report {
            failures,
            too_many,
            failed: pool.tasks().iter().filter(|t| t.is_failed()).count(),
            total: pool.tasks().len(),
        }
    }

    /// Reports `pool` to the log and returns `true` iff no task failed.
    pub fn log<J: Job>(&self, pool: &Pool<J>) -> bool {
        let report = self.report(pool);
        report.log();
        report.succeeded()
    }
}

impl Report<'_> {
    /// The build verdict: `true` only if no task failed.
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn log(&self) {
        for failure in &self.failures {
            tracing::error!("{} failed:\n{}", failure.label, failure.error);
        }

        if self.too_many {
            tracing::error!("Too many errors.");
        }

        if !self.succeeded() {
            tracing::info!("{} of {} jobs failed", self.failed, self.total);
        }
    }
}
