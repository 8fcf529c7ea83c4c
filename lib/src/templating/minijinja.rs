use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use minijinja::{path_loader, AutoEscape, Environment};
use minijinja::value::Value;
use serde::Serialize;

use crate::error::{Chainable, Result};
use crate::templating::Locals;

/// Loads templates from beneath a site root.
///
/// Output is never HTML-escaped: values such as rendered markdown are
/// inserted as-is.
#[derive(Debug)]
pub struct Engine {
    root: PathBuf,
    env: Environment<'static>,
}

/// A view rendered inside a layout. The layout sees the rendered view as the
/// `Body` local.
#[derive(Debug)]
pub struct Template<'e> {
    layout: minijinja::Template<'e, 'e>,
    view: minijinja::Template<'e, 'e>,
}

impl Engine {
    /// Creates an engine loading templates from `root`. `globals` is
    /// available to every template as `G`.
    pub fn new<P: AsRef<Path>, G: Serialize>(root: P, globals: G) -> Self {
        let root = root.as_ref().to_path_buf();
        let mut env = Environment::new();
        env.set_loader(path_loader(&root));
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_global("G", Value::from_serializable(&globals));
        env.add_function("now", ext::now);
        env.add_filter("deslug", ext::deslug);
        env.add_filter("date", ext::date);
        env.add_filter("split", ext::split);
        Engine { root, env }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads `view` to be rendered inside `layout`. Both paths are either
    /// relative to the engine's root or absolute paths beneath it.
    pub fn load<L, V>(&self, layout: L, view: V) -> Result<Template<'_>>
        where L: AsRef<Path>, V: AsRef<Path>
    {
        let fetch = |path: &Path| {
            let name = self.template_name(path)?;
            self.env.get_template(&name).chain_with(|| error! {
                "failed to load template",
                "template" => path.display(),
            })
        };

        Ok(Template { layout: fetch(layout.as_ref())?, view: fetch(view.as_ref())? })
    }

    fn template_name(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut segments = vec![];
        for component in relative.components() {
            match component {
                Component::Normal(segment) => match segment.to_str() {
                    Some(segment) => segments.push(segment),
                    None => return err!("template path is not valid UTF-8", path.display()),
                },
                Component::CurDir => continue,
                _ => return err! {
                    "template path must lie beneath the site root",
                    "template" => path.display(),
                    "site root" => self.root.display(),
                },
            }
        }

        Ok(segments.join("/"))
    }
}

impl Template<'_> {
    /// Renders the view and then the layout with `locals`, writing the
    /// result to `out`.
    pub fn execute<W: Write>(&self, out: W, locals: &Locals) -> Result<()> {
        let body = self.view.render(locals).chain_with(|| error! {
            "failed to render view",
            "template" => self.view.name(),
        })?;

        let mut context = locals.clone();
        context.insert("Body".into(), body.into());
        let page = self.layout.render(&context).chain_with(|| error! {
            "failed to render layout",
            "template" => self.layout.name(),
        })?;

        let mut out = io::BufWriter::new(out);
        out.write_all(page.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

mod ext {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use minijinja::{value::{intern, Value}, Error, ErrorKind};

    pub fn deslug(value: &str) -> String {
        value.replace('-', " ")
    }

    pub fn date(value: Value, fmt: &str) -> Result<Value, Error> {
        if let Ok(ts) = i64::try_from(value.clone()) {
            let datetime = DateTime::<Utc>::from_timestamp(ts, 0)
                .ok_or_else(|| Error::new(
                    ErrorKind::InvalidOperation,
                    "invalid timestamp provided to `date`"
                ))?;

            return Ok(datetime.format(fmt).to_string().into());
        }

        let string = value.as_str()
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidOperation,
                format!("`date` must be applied to a string or integer, found {}", value.kind())
            ))?;

        let datetime = string.parse::<NaiveDate>().map(|d| d.format(fmt))
            .or_else(|_| string.parse::<NaiveTime>().map(|t| t.format(fmt)))
            .or_else(|_| string.parse::<NaiveDateTime>().map(|dt| dt.format(fmt)))
            .or_else(|_| string.parse::<DateTime<Utc>>().map(|dt| dt.format(fmt)))
            .map_err(|e| Error::new(
                ErrorKind::InvalidOperation,
                format!("failed to parse {string}: {e}")
            ))?;

        Ok(datetime.to_string().into())
    }

    pub fn split(value: &str, pat: &str, n: Option<usize>) -> Result<Value, Error> {
        match n {
            Some(n) => Ok(value.split(pat).nth(n).map(Value::from).unwrap_or(Value::UNDEFINED)),
            None => Ok(value.split(pat).map(intern).collect()),
        }
    }

    pub fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }
}
