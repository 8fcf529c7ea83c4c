use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use wren::error::{Chainable, Result};
use wren::{err, error, listing, Job};

use crate::build::{BuildJob, JobKind};
use crate::config::Site;

/// Builds the full list of jobs for `site`: the fixed asset jobs first, then
/// one job per article, per page, and per static asset group.
///
/// Failing to list any of the content directories is an error, as is two
/// jobs writing to the same output path.
pub fn jobs(site: &Arc<Site>) -> Result<Vec<BuildJob>> {
    let mut jobs: Vec<_> = [
        JobKind::LinkFonts,
        JobKind::LinkImages,
        JobKind::CompileJavascripts,
        JobKind::CompileStylesheets,
    ].into_iter().map(|kind| BuildJob::new(kind, site)).collect();

    for entry in list(site, "articles")? {
        jobs.push(BuildJob::new(JobKind::RenderArticle { file: entry }, site));
    }

    for entry in list(site, "pages")? {
        jobs.push(BuildJob::new(JobKind::RenderPage { file: entry }, site));
    }

    for entry in list(site, "static")? {
        jobs.push(BuildJob::new(JobKind::LinkGroup { name: entry }, site));
    }

    check_outputs(&jobs)?;
    tracing::debug!("found {} jobs", jobs.len());
    Ok(jobs)
}

fn list(site: &Site, dir: &str) -> Result<Vec<String>> {
    let path = site.content(dir);
    let entries = listing::list(&path).chain_with(|| error! {
        format!("failed to enumerate {dir}"),
        "path" => path.display(),
    })?;

    Ok(entries.into_iter().map(|e| e.file_name).collect())
}

fn check_outputs(jobs: &[BuildJob]) -> Result<()> {
    let collision = |output: &Path, first: &BuildJob, second: &BuildJob| err! {
        "two jobs write the same output",
        "output" => output.display(),
        "first job" => first.label(),
        "second job" => second.label(),
    };

    let mut outputs: FxHashMap<PathBuf, &BuildJob> = FxHashMap::default();
    for job in jobs {
        for output in job.outputs() {
            if let Some(existing) = outputs.get(&output) {
                return collision(&output, *existing, job);
            }

            outputs.insert(output, job);
        }
    }

    // An output inside another job's output collides with it too.
    for (output, job) in &outputs {
        for ancestor in output.ancestors().skip(1) {
            match outputs.get(ancestor) {
                Some(owner) if !std::ptr::eq(*owner, *job) => {
                    return collision(ancestor, *owner, *job);
                }
                _ => continue,
            }
        }
    }

    Ok(())
}
