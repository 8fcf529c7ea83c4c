use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use wren::{assets, listing};
use wren::error::Result;
use wren::pool::Job;

use crate::config::Site;
use crate::render;

/// What a [`BuildJob`] does, along with the input it does it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    LinkFonts,
    LinkImages,
    CompileJavascripts,
    CompileStylesheets,
    RenderArticle { file: String },
    RenderPage { file: String },
    LinkGroup { name: String },
}

#[derive(Debug, Clone)]
pub struct BuildJob {
    pub kind: JobKind,
    pub site: Arc<Site>,
}

impl BuildJob {
    pub fn new(kind: JobKind, site: &Arc<Site>) -> Self {
        BuildJob { kind, site: site.clone() }
    }

    /// The output paths this job writes. Image links are named after the
    /// entries of `content/images`; if that can't be listed, the job fails
    /// when it runs and no outputs are claimed here.
    pub fn outputs(&self) -> Vec<PathBuf> {
        let site = &self.site;
        match &self.kind {
            JobKind::LinkFonts => vec![site.output("assets/fonts")],
            JobKind::LinkImages => listing::list(site.content("images"))
                .map(|entries| entries.into_iter()
                    .map(|e| site.output("assets").join(e.file_name))
                    .collect())
                .unwrap_or_default(),
            JobKind::CompileJavascripts => vec![site.versioned_assets().join("app.js")],
            JobKind::CompileStylesheets => vec![site.versioned_assets().join("app.css")],
            JobKind::RenderArticle { file } | JobKind::RenderPage { file } => {
                vec![site.output(render::output_name(file))]
            }
            JobKind::LinkGroup { name } => vec![site.output("static").join(name)],
        }
    }
}

impl Job for BuildJob {
    fn run(&self) -> Result<()> {
        let start = Instant::now();
        let site = &*self.site;
        let result = match &self.kind {
            JobKind::LinkFonts => render::link_fonts(site),
            JobKind::LinkImages => render::link_images(site),
            JobKind::CompileJavascripts => assets::compile_javascripts(
                site.content("javascripts"),
                site.versioned_assets().join("app.js"),
            ),
            JobKind::CompileStylesheets => assets::compile_stylesheets(
                site.content("stylesheets"),
                site.versioned_assets().join("app.css"),
            ),
            JobKind::RenderArticle { file } => render::compile_article(site, file),
            JobKind::RenderPage { file } => render::render_page(site, file),
            JobKind::LinkGroup { name } => render::link_group(site, name),
        };

        tracing::debug!("{} in {:?}", self.label(), start.elapsed());
        result
    }

    fn label(&self) -> Cow<'_, str> {
        match &self.kind {
            JobKind::LinkFonts => "link fonts".into(),
            JobKind::LinkImages => "link images".into(),
            JobKind::CompileJavascripts => "compile javascripts".into(),
            JobKind::CompileStylesheets => "compile stylesheets".into(),
            JobKind::RenderArticle { file } => format!("render article '{file}'").into(),
            JobKind::RenderPage { file } => format!("render page '{file}'").into(),
            JobKind::LinkGroup { name } => format!("link asset group '{name}'").into(),
        }
    }
}
