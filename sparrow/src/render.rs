use std::fs;
use std::path::Path;

use serde_json::Value;

use wren::error::{Chainable, Result};
use wren::templating::Locals;
use wren::util::{ensure_symlink, trim_extension};
use wren::{error, listing, markdown};

use crate::config::{Settings, Site};
use crate::{ARTICLE_VIEW, MAIN_LAYOUT};

/// The locals every template sees, with `extra` taking precedence.
pub fn locals<I>(settings: &Settings, title: &str, extra: I) -> Locals
    where I: IntoIterator<Item = (&'static str, Value)>
{
    let mut locals = Locals::default();
    locals.insert("GoogleAnalyticsID".into(), settings.google_analytics_id.clone().into());
    locals.insert("LocalFonts".into(), settings.local_fonts.into());
    locals.insert("Release".into(), settings.release.clone().into());
    locals.insert("Title".into(), title.into());
    locals.insert("ViewportWidth".into(), "device-width".into());
    locals.extend(extra.into_iter().map(|(k, v)| (k.to_string(), v)));
    locals
}

/// Where a page or article named `file` is written, relative to the output
/// root. `index` gets an `.html` extension so local servers pick it up for
/// directory requests.
pub fn output_name(file: &str) -> String {
    match trim_extension(file) {
        "index" => "index.html".into(),
        stem => stem.into(),
    }
}

pub fn compile_article(site: &Site, file: &str) -> Result<()> {
    let name = trim_extension(file);
    tracing::debug!("rendering article: {name}");

    let path = site.content("articles").join(file);
    let source = fs::read_to_string(&path).chain_with(|| error! {
        "failed to read article",
        "path" => path.display(),
    })?;

    let content = markdown::render(&source, &markdown::Options::default());
    let toc = markdown::toc::render(&content).chain_with(|| error! {
        "failed to build table of contents",
        "path" => path.display(),
    })?;

    let locals = locals(&site.settings, name, [
        ("Content", Value::from(content)),
        ("TOC", Value::from(toc)),
    ]);

    render_view(site, ARTICLE_VIEW, &site.output(output_name(file)), &locals)
}

pub fn render_page(site: &Site, file: &str) -> Result<()> {
    let name = trim_extension(file);
    tracing::debug!("rendering page: {name}");

    let view = Path::new(crate::CONTENT_DIR).join("pages").join(file);
    let locals = locals(&site.settings, name, std::iter::empty());
    render_view(site, &view, &site.output(output_name(file)), &locals)
}

fn render_view<V: AsRef<Path>>(site: &Site, view: V, target: &Path, locals: &Locals) -> Result<()> {
    tracing::debug!("rendering: {}", target.display());
    let template = site.engine.load(MAIN_LAYOUT, view.as_ref())?;
    let file = fs::File::create(target).chain_with(|| error! {
        "failed to create output file",
        "path" => target.display(),
    })?;

    template.execute(file, locals).chain_with(|| error! {
        "failed to render view",
        "view" => view.as_ref().display(),
        "target" => target.display(),
    })
}

/// Links `content/fonts` to `public/assets/fonts` as a whole.
pub fn link_fonts(site: &Site) -> Result<()> {
    ensure_symlink(site.content("fonts"), site.output("assets/fonts"))
}

/// Links every visible entry of `content/images` into `public/assets`.
pub fn link_images(site: &Site) -> Result<()> {
    for entry in listing::list(site.content("images"))? {
        ensure_symlink(&entry.path, site.output("assets").join(&entry.file_name))?;
    }

    Ok(())
}

/// Links the static asset group `content/static/<name>` into
/// `public/static/<name>`.
pub fn link_group(site: &Site, name: &str) -> Result<()> {
    ensure_symlink(site.content("static").join(name), site.output("static").join(name))
}
