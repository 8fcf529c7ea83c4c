use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Chainable, Result};

/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        if ch.is_whitespace() || ch.is_control() {
            need_dash = !output.is_empty();
            continue;
        }

        for b in deunicode::deunicode_char(ch).unwrap_or("-").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => {
                    // All sequences of characters that aren't alphanumeric or
                    // `_` are converted into one `-`.
                    need_dash = !output.is_empty();
                }
            }
        }
    }

    output
}

/// `file` without its final extension.
pub fn trim_extension(file: &str) -> &str {
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}

/// Ensures that `dest` is a symbolic link pointing at `source`.
///
/// Creates the link if `dest` doesn't exist. A link that already points at
/// `source` is left untouched. Anything else at `dest`, including a real file
/// or directory, is removed and replaced by the link.
pub fn ensure_symlink<S, D>(source: S, dest: D) -> Result<()>
    where S: AsRef<Path>, D: AsRef<Path>
{
    let (source, dest) = (source.as_ref(), dest.as_ref());
    tracing::debug!(source = %source.display(), dest = %dest.display(), "checking symbolic link");

    match fs::symlink_metadata(dest) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            if fs::read_link(dest)? == source {
                tracing::debug!("link exists");
                return Ok(());
            }

            tracing::debug!("destination links to wrong source, replacing");
            remove_link(dest)?;
        }
        Ok(metadata) => {
            tracing::debug!("destination is not a link, replacing");
            let removed = match metadata.is_dir() {
                true => fs::remove_dir_all(dest),
                false => fs::remove_file(dest),
            };

            removed.chain_with(|| error! {
                "failed to remove existing destination",
                "path" => dest.display(),
            })?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("destination link does not exist, creating");
        }
        Err(e) => return Err(e.into()),
    }

    symlink(source, dest).chain_with(|| error! {
        "failed to create symbolic link",
        "source" => source.display(),
        "destination" => dest.display(),
    })
}

#[cfg(unix)]
fn symlink(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(windows)]
fn symlink(source: &Path, dest: &Path) -> io::Result<()> {
    match source.is_dir() {
        true => std::os::windows::fs::symlink_dir(source, dest),
        false => std::os::windows::fs::symlink_file(source, dest),
    }
}

#[cfg(unix)]
fn remove_link(dest: &Path) -> io::Result<()> {
    fs::remove_file(dest)
}

#[cfg(windows)]
fn remove_link(dest: &Path) -> io::Result<()> {
    fs::remove_file(dest).or_else(|_| fs::remove_dir(dest))
}


#[cfg(all(test, unix))]
mod symlink_tests {
    use std::fs;

    use super::ensure_symlink;

    #[test]
    fn creates_missing_links_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let dest = dir.path().join("symlink-dest");
        fs::write(&source, "source").unwrap();

        ensure_symlink(&source, &dest).unwrap();
        assert_eq!(fs::read_link(&dest).unwrap(), source);
        let first = fs::symlink_metadata(&dest).unwrap();

        ensure_symlink(&source, &dest).unwrap();
        assert_eq!(fs::read_link(&dest).unwrap(), source);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "source");

        // Untouched the second time around.
        let second = fs::symlink_metadata(&dest).unwrap();
        assert_eq!(first.modified().unwrap(), second.modified().unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn repoints_links_to_other_sources() {
        let dir = tempfile::tempdir().unwrap();
        let (old, new) = (dir.path().join("old"), dir.path().join("new"));
        fs::write(&old, "old").unwrap();
        fs::write(&new, "new").unwrap();

        let dest = dir.path().join("dest");
        std::os::unix::fs::symlink(&old, &dest).unwrap();

        ensure_symlink(&new, &dest).unwrap();
        assert_eq!(fs::read_link(&dest).unwrap(), new);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    }

    #[test]
    fn replaces_dangling_links() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let dest = dir.path().join("dest");
        std::os::unix::fs::symlink(dir.path().join("gone"), &dest).unwrap();

        fs::write(&source, "source").unwrap();
        ensure_symlink(&source, &dest).unwrap();
        assert_eq!(fs::read_link(&dest).unwrap(), source);
    }

    #[test]
    fn links_directories() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("fonts");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.woff"), "font").unwrap();

        let dest = dir.path().join("linked");
        ensure_symlink(&source, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("a.woff")).unwrap(), "font");
    }

    #[test]
    fn replaces_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let dest = dir.path().join("dest");
        fs::write(&source, "source").unwrap();
        fs::write(&dest, "stale").unwrap();

        ensure_symlink(&source, &dest).unwrap();
        assert_eq!(fs::read_link(&dest).unwrap(), source);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "source");
    }

    #[test]
    fn replaces_real_directories() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("fonts");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.woff"), "font").unwrap();

        let dest = dir.path().join("public-fonts");
        fs::create_dir_all(dest.join("nested")).unwrap();
        fs::write(dest.join("nested/old.woff"), "old").unwrap();

        ensure_symlink(&source, &dest).unwrap();
        assert!(fs::symlink_metadata(&dest).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(dest.join("a.woff")).unwrap(), "font");
        assert!(!dest.join("nested").exists());
    }
}
