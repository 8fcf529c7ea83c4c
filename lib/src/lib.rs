//! A toolkit for building static sites out of many small, independent jobs.
//!
//! # Overview
//!
//! A site build is a flat list of [jobs](pool::Job): render this article,
//! render that page, link the fonts, compile the stylesheets. Jobs know
//! nothing about each other, so they can run in any order and in parallel.
//!
//! 1. The site binary enumerates its content with [`listing::list()`] and
//!    turns every entry into a job.
//! 2. A [`Pool`](pool::Pool) runs all of the jobs on a bounded number of
//!    worker threads and records each job's [`Outcome`](pool::Outcome).
//! 3. A [`Reporter`](report::Reporter) walks the outcomes in submission
//!    order, logs the first few failures, and reduces them to a verdict.
//!
//! The remaining modules are the building blocks jobs are made of:
//! [`markdown`] rendering and table-of-contents extraction, [`templating`],
//! [`assets`] compilation, and [`util::ensure_symlink()`].

#[macro_use]
pub mod error;
pub mod util;
pub mod data;
pub mod listing;
pub mod pool;
pub mod report;
pub mod markdown;
pub mod templating;
pub mod assets;

pub use pool::{FnJob, Job, Outcome, Pool, Task};
pub use report::{Report, Reporter};

pub use rayon;
