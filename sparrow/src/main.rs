use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use wren::error::Result;
use wren::{Pool, Reporter};

use crate::config::{Settings, Site};

mod build;
mod config;
mod discover;
mod render;

pub const CONTENT_DIR: &str = "content";
pub const TARGET_DIR: &str = "public";
pub const CONFIG_FILE: &str = "config.toml";
pub const MAIN_LAYOUT: &str = "layouts/main.html";
pub const ARTICLE_VIEW: &str = "layouts/article.html";

pub fn main() -> ExitCode {
    let start = Instant::now();
    let settings = Settings::load(".");
    init_logging(settings.as_ref().map_or(false, |s| s.verbose));

    match finish(settings.and_then(|settings| build(".", settings)), start) {
        true => ExitCode::SUCCESS,
        false => ExitCode::FAILURE,
    }
}

/// Logs the outcome of a build started at `start`, whatever it was, and
/// returns `true` only if it fully succeeded.
fn finish(result: Result<bool>, start: Instant) -> bool {
    if let Err(e) = &result {
        tracing::error!("{e}");
    }

    tracing::info!("Built site in {:?}.", start.elapsed());
    matches!(result, Ok(true))
}

/// `RUST_LOG` wins if it's set. Otherwise `verbose` selects between debug
/// and info output.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Builds the site at `root`. Returns `Ok(false)` if any job failed and
/// `Err` if the build couldn't be attempted at all.
fn build<P: AsRef<Path>>(root: P, settings: Settings) -> Result<bool> {
    let site = Arc::new(Site::new(root, settings)?);
    site.create_output_dirs()?;

    let jobs = discover::jobs(&site)?;
    let pool = Pool::new(jobs, site.settings.concurrency)?;
    pool.run()?;

    Ok(Reporter::default().log(&pool))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(root: &Path, files: &[(&str, &str)]) {
        for (path, contents) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
    }

    fn scaffold(root: &Path) {
        write(root, &[
            ("layouts/main.html", "<title>{{ Title }}</title>{{ Body }}|{{ Release }}"),
            ("layouts/article.html", "<nav>{{ TOC }}</nav>{{ Content }}"),
            ("content/articles/index.md", "# Welcome\n\nHi."),
            ("content/articles/hello-world.md", "# Hello\n\n## Part one\n"),
            ("content/articles/.draft.md", "# Draft"),
            ("content/pages/about.html", "about {{ Title }} {{ G.author }}"),
            ("content/static/docs/guide.html", "guide"),
            ("content/fonts/a.woff", "font"),
            ("content/images/logo.png", "png"),
            ("content/javascripts/a.js", "var a;"),
            ("content/stylesheets/a.css", "p { margin: 0; }"),
            ("config.toml", "release = \"5\"\nauthor = \"Wren\"\n"),
        ]);
    }

    fn settings(root: &Path) -> Settings {
        use wren::data::{Format, Toml};

        let mut settings: Settings = Toml::read(root.join(CONFIG_FILE)).unwrap();
        settings.concurrency = 3;
        settings
    }

    #[test]
    fn builds_a_site() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        scaffold(root);

        assert!(build(root, settings(root)).unwrap());

        let public = fs::canonicalize(root).unwrap().join(TARGET_DIR);
        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.starts_with("<title>index</title><nav>"));
        assert!(index.contains("Welcome"));
        assert!(index.ends_with("|5"));

        let hello = fs::read_to_string(public.join("hello-world")).unwrap();
        assert!(hello.contains(r##"<a href="#part-one">Part one</a>"##));

        let about = fs::read_to_string(public.join("about")).unwrap();
        assert_eq!(about, "<title>about</title>about about Wren|5");

        assert!(!public.join(".draft").exists());
        assert_eq!(fs::read_to_string(public.join("assets/fonts/a.woff")).unwrap(), "font");
        assert_eq!(fs::read_to_string(public.join("assets/logo.png")).unwrap(), "png");
        assert_eq!(fs::read_to_string(public.join("assets/5/app.js")).unwrap(), "var a;\n");
        assert!(fs::read_to_string(public.join("assets/5/app.css")).unwrap().contains("margin"));
        assert_eq!(fs::read_to_string(public.join("static/docs/guide.html")).unwrap(), "guide");

        // Rebuilding over existing output leaves links alone and succeeds.
        assert!(build(root, settings(root)).unwrap());
    }

    #[test]
    fn failed_jobs_fail_the_build() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        scaffold(root);
        fs::remove_dir_all(root.join("content/images")).unwrap();
        fs::write(root.join("content/pages/broken.html"), "{{ 1 + }}").unwrap();

        assert!(!build(root, settings(root)).unwrap());

        // Unrelated jobs still ran.
        let public = root.join(TARGET_DIR);
        assert!(public.join("about").exists());
        assert!(public.join("assets/5/app.js").exists());
        assert!(!public.join("assets/logo.png").exists());
    }

    #[derive(Clone, Default)]
    struct Capture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn finish_logged(result: Result<bool>) -> (bool, String) {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let ok = tracing::subscriber::with_default(subscriber, || finish(result, Instant::now()));
        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        (ok, output)
    }

    #[test]
    fn build_time_is_always_logged() {
        let (ok, output) = finish_logged(Ok(true));
        assert!(ok);
        assert!(output.contains("Built site in"));

        let (ok, output) = finish_logged(Ok(false));
        assert!(!ok);
        assert!(output.contains("Built site in"));

        let (ok, output) = finish_logged(wren::err!("no layouts"));
        assert!(!ok);
        assert!(output.contains("no layouts"));
        assert!(output.contains("Built site in"));
    }

    #[test]
    fn missing_content_aborts_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        scaffold(root);
        fs::remove_dir_all(root.join("content/pages")).unwrap();

        assert!(build(root, settings(root)).is_err());
        assert!(!root.join(TARGET_DIR).join("about").exists());
        assert!(!root.join(TARGET_DIR).join("index.html").exists());
    }
}
