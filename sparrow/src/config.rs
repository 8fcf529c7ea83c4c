use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use wren::data::{Format, Toml};
use wren::error::{Chainable, Error, Result};
use wren::pool::DEFAULT_WORKERS;
use wren::templating::Engine;
use wren::{err, error};

/// Build settings: defaults, overridden by `config.toml`, overridden by the
/// environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub google_analytics_id: String,
    #[serde(default)]
    pub local_fonts: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_release")]
    pub release: String,
    #[serde(flatten)]
    pub globals: FxHashMap<String, serde_json::Value>,
}

/// Everything a build job needs to know about the site being built.
#[derive(Debug)]
pub struct Site {
    pub root: PathBuf,
    pub target: PathBuf,
    pub engine: Engine,
    pub settings: Settings,
}

fn default_concurrency() -> usize {
    DEFAULT_WORKERS
}

fn default_release() -> String {
    "1".into()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            concurrency: default_concurrency(),
            google_analytics_id: String::new(),
            local_fonts: false,
            verbose: false,
            release: default_release(),
            globals: FxHashMap::default(),
        }
    }
}

impl Settings {
    /// Reads `config.toml` from `root`, if there is one, and then applies the
    /// process environment.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let path = root.as_ref().join(crate::CONFIG_FILE);
        let mut settings: Settings = match path.is_file() {
            true => Toml::read(&path)?,
            false => Settings::default(),
        };

        settings.apply_env(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Overrides settings with the variables `var` knows about.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
        where F: Fn(&str) -> Option<String>
    {
        if let Some(value) = var("CONCURRENCY") {
            self.concurrency = value.trim().parse::<usize>()
                .map_err(Error::from_std)
                .chain_with(|| error! {
                    "CONCURRENCY must be a positive integer",
                    "value" => &value,
                })?;
        }

        if let Some(value) = var("GOOGLE_ANALYTICS_ID") {
            self.google_analytics_id = value;
        }

        if let Some(value) = var("LOCAL_FONTS") {
            self.local_fonts = parse_bool("LOCAL_FONTS", &value)?;
        }

        if let Some(value) = var("VERBOSE") {
            self.verbose = parse_bool("VERBOSE", &value)?;
        }

        if let Some(value) = var("RELEASE") {
            self.release = value;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return err!("CONCURRENCY must be a positive integer", "value" => 0);
        }

        if self.release.is_empty() || self.release.contains(['/', '\\']) || self.release == ".." {
            return err! {
                "RELEASE must name a single directory",
                "value" => &self.release,
            };
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => err! {
            format!("{name} must be a boolean"),
            "value" => value,
            "accepted" => "1, t, T, TRUE, true, True, 0, f, F, FALSE, false, False",
        }
    }
}

impl Site {
    /// Sets up a build of the site at `root`. All paths are made absolute so
    /// that symbolic links created by the build resolve from anywhere.
    pub fn new<P: AsRef<Path>>(root: P, settings: Settings) -> Result<Self> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).chain_with(|| error! {
            "site root must be an existing directory",
            "path" => root.display(),
        })?;

        let engine = Engine::new(&root, &settings.globals);
        Ok(Site { target: root.join(crate::TARGET_DIR), root, engine, settings })
    }

    pub fn content<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.root.join(crate::CONTENT_DIR).join(path)
    }

    pub fn output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.target.join(path)
    }

    /// Where compiled, versioned assets go: `public/assets/<release>`.
    pub fn versioned_assets(&self) -> PathBuf {
        self.target.join("assets").join(&self.settings.release)
    }

    /// Creates the output directories every build writes into.
    pub fn create_output_dirs(&self) -> Result<()> {
        let dirs = [
            self.target.clone(),
            self.target.join("assets"),
            self.versioned_assets(),
            self.target.join("static"),
        ];

        for dir in &dirs {
            fs::create_dir_all(dir).chain_with(|| error! {
                "failed to create output directory",
                "path" => dir.display(),
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| vars.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
    }

    #[test]
    fn defaults() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[])).unwrap();
        assert_eq!(settings.concurrency, 10);
        assert_eq!(settings.release, "1");
        assert!(!settings.local_fonts && !settings.verbose);
        assert!(settings.google_analytics_id.is_empty());
    }

    #[test]
    fn environment_overrides() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[
            ("CONCURRENCY", "3"),
            ("GOOGLE_ANALYTICS_ID", "UA-1"),
            ("LOCAL_FONTS", "T"),
            ("VERBOSE", "True"),
            ("RELEASE", "7"),
        ])).unwrap();

        assert_eq!(settings.concurrency, 3);
        assert_eq!(settings.google_analytics_id, "UA-1");
        assert!(settings.local_fonts);
        assert!(settings.verbose);
        assert_eq!(settings.release, "7");
    }

    #[test]
    fn bad_values_are_rejected() {
        for vars in [[("CONCURRENCY", "many")], [("LOCAL_FONTS", "yes")], [("VERBOSE", "")]] {
            assert!(Settings::default().apply_env(env(&vars)).is_err());
        }

        let mut settings = Settings::default();
        settings.apply_env(env(&[("CONCURRENCY", "0")])).unwrap();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.apply_env(env(&[("RELEASE", "../up")])).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn config_file_and_globals() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), concat!(
            "concurrency = 2\n",
            "local_fonts = true\n",
            "title = \"My Site\"\n",
            "[social]\n",
            "handle = \"@me\"\n",
        )).unwrap();

        let settings: Settings = Toml::read(dir.path().join("config.toml")).unwrap();
        assert_eq!(settings.concurrency, 2);
        assert!(settings.local_fonts);
        assert_eq!(settings.release, "1");
        assert_eq!(settings.globals["title"], "My Site");
        assert_eq!(settings.globals["social"]["handle"], "@me");
        assert!(!settings.globals.contains_key("concurrency"));
    }

    #[test]
    fn malformed_config_files_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "concurrency = \"ten\"\n").unwrap();
        assert!(Settings::load(dir.path()).is_err());
    }

    #[test]
    fn creates_output_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings { release: "42".into(), ..Settings::default() };
        let site = Site::new(dir.path(), settings).unwrap();
        site.create_output_dirs().unwrap();
        site.create_output_dirs().unwrap();

        assert!(site.target.join("assets/42").is_dir());
        assert!(site.target.join("static").is_dir());
        assert!(site.root.is_absolute());
    }
}
