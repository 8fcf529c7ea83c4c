use std::fs;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};

use crate::error::{Chainable, Result};

/// A visible entry of a listed directory.
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: PathBuf,
    pub file_name: String,
    pub file_type: fs::FileType,
}

/// Returns `true` if `file_name` names a hidden entry.
pub fn is_hidden(file_name: &str) -> bool {
    file_name.starts_with('.')
}

/// Lists the visible entries directly inside `dir`, sorted by file name.
/// Symbolic links are followed. Fails if `dir` is not a readable directory.
pub fn list<P: AsRef<Path>>(dir: P) -> Result<Vec<Entry>> {
    let dir = dir.as_ref();
    let metadata = fs::metadata(dir).chain_with(|| error! {
        "failed to read content directory",
        "directory" => dir.display(),
    })?;

    if !metadata.is_dir() {
        return err! {
            "content path must be a directory",
            "path" => dir.display(),
        };
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort(true)
        .skip_hidden(false)
        .follow_links(true)
        .parallelism(Parallelism::Serial);

    let mut entries = vec![];
    for entry in walker {
        let entry = entry.chain_with(|| error! {
            "failed to enumerate content directory",
            "directory" => dir.display(),
        })?;

        let file_name = entry.file_name.to_string_lossy().into_owned();
        if is_hidden(&file_name) {
            continue;
        }

        entries.push(Entry { path: entry.path(), file_type: entry.file_type, file_name });
    }

    tracing::debug!(directory = %dir.display(), entries = entries.len(), "listed directory");
    Ok(entries)
}

impl Entry {
    /// File name without the extension.
    pub fn file_stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((left, _)) => left,
            None => &self.file_name,
        }
    }

    /// The final extension, if any.
    pub fn file_ext(&self) -> Option<&str> {
        self.file_name.rsplit_once('.').map(|(_, right)| right)
    }

    pub fn is_file(&self) -> bool {
        self.file_type.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.file_type.is_dir()
    }
}
