//! Compiles a directory of scripts or stylesheets into one output file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{Chainable, Result};
use crate::listing::{self, Entry};

/// Concatenates every `.js` file in `dir`, in file name order, into `out`.
pub fn compile_javascripts<D: AsRef<Path>, O: AsRef<Path>>(dir: D, out: O) -> Result<()> {
    let sources = listing::list(dir.as_ref())?
        .into_iter()
        .filter(|e| e.is_file() && e.file_ext() == Some("js"));

    let mut compiled = vec![];
    for entry in sources {
        compiled.push(read(&entry)?);
    }

    write(out.as_ref(), &compiled)
}

/// Compiles every stylesheet in `dir`, in file name order, into `out`.
///
/// `.css` files are copied verbatim. `.scss` and `.sass` files are compiled
/// to CSS, except for partials (names starting with `_`), which are only
/// reachable through imports.
pub fn compile_stylesheets<D: AsRef<Path>, O: AsRef<Path>>(dir: D, out: O) -> Result<()> {
    let grass = Grass::default();
    let mut compiled = vec![];
    for entry in listing::list(dir.as_ref())? {
        if !entry.is_file() || entry.file_name.starts_with('_') {
            continue;
        }

        match entry.file_ext() {
            Some("css") => compiled.push(read(&entry)?),
            Some("scss") | Some("sass") => compiled.push(grass.compile(&entry.path)?),
            _ => continue,
        }
    }

    write(out.as_ref(), &compiled)
}

fn read(entry: &Entry) -> Result<String> {
    fs::read_to_string(&entry.path).chain_with(|| error! {
        "failed to read asset",
        "path" => entry.path.display(),
    })
}

fn write(out: &Path, parts: &[String]) -> Result<()> {
    let result = fs::File::create(out).and_then(|file| {
        let mut file = io::BufWriter::new(file);
        for part in parts {
            file.write_all(part.as_bytes())?;
            if !part.ends_with('\n') {
                file.write_all(b"\n")?;
            }
        }

        file.flush()
    });

    tracing::debug!(output = %out.display(), sources = parts.len(), "wrote compiled asset");
    result.chain_with(|| error! {
        "failed to write compiled asset",
        "path" => out.display(),
    })
}

#[cfg(feature = "sass")]
#[derive(Debug, Default)]
pub struct Grass {
    options: grass::Options<'static>,
}

#[cfg(feature = "sass")]
impl Grass {
    /// Compiles the Sass or SCSS file at `path` to CSS. The syntax is chosen
    /// by the file's extension.
    pub fn compile(&self, path: &Path) -> Result<String> {
        grass::from_path(path, &self.options).map_err(|e| error! {
            "failed to render sass as css",
            "path" => path.display(),
            e,
        })
    }
}

#[cfg(not(feature = "sass"))]
#[derive(Debug, Default)]
pub struct Grass;

#[cfg(not(feature = "sass"))]
impl Grass {
    pub fn compile(&self, path: &Path) -> Result<String> {
        err! {
            "sass support is disabled; enable the `sass` feature",
            "path" => path.display(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_javascripts_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("javascripts");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("b.js"), "var b = 2;").unwrap();
        fs::write(src.join("a.js"), "var a = 1;\n").unwrap();
        fs::write(src.join(".hidden.js"), "nope").unwrap();
        fs::write(src.join("notes.txt"), "nope").unwrap();

        let out = dir.path().join("app.js");
        compile_javascripts(&src, &out).unwrap();
        assert_eq!(fs::read_to_string(out).unwrap(), "var a = 1;\nvar b = 2;\n");
    }

    #[test]
    fn missing_source_directories_fail() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("app.js");
        assert!(compile_javascripts(dir.path().join("missing"), &out).is_err());
        assert!(!out.exists());
    }

    #[cfg(feature = "sass")]
    #[test]
    fn compiles_stylesheets() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("stylesheets");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("_vars.scss"), "$fg: #333;").unwrap();
        fs::write(src.join("a.css"), "p { margin: 0; }").unwrap();
        fs::write(src.join("b.scss"), "@import 'vars';\nbody { a { color: $fg; } }").unwrap();

        let out = dir.path().join("app.css");
        compile_stylesheets(&src, &out).unwrap();

        let css = fs::read_to_string(out).unwrap();
        assert!(css.starts_with("p { margin: 0; }\n"));
        assert!(css.contains("body a {"));
        assert!(css.contains("color: #333;"));
        assert!(!css.contains("$fg"));
    }

    #[cfg(feature = "sass")]
    #[test]
    fn sass_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.scss"), "body { color: $undefined; }").unwrap();

        let error = compile_stylesheets(dir.path(), dir.path().join("app.css")).unwrap_err();
        assert!(error.to_string().contains("bad.scss"));
    }
}
