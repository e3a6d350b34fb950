//! HTML document rendering.
//!
//! Turns the configured documents into standalone HTML files. Rendering runs in
//! two phases:
//!
//! 1. **Resolve**: every citation key of every selected document goes through
//!    a [`CitationSource`]. Any failure stops the run here, before a single
//!    file is written.
//! 2. **Write**: each resolved document is rendered with maud and written to
//!    `<output>/<document>.html`.
//!
//! ## Page Structure
//!
//! ```text
//! header.profile     name, contact lines, Markdown summary
//! main
//!   section#papers   h2 title, ol.citations
//!   section#edu      h2 title, div.item rows (name, time, description)
//! ```
//!
//! Section titles, item text and contact lines are trusted HTML written by the
//! CV's author and are emitted without escaping. The page title is escaped.
//!
//! ## CSS
//!
//! `static/cv.css` is embedded at compile time. Theme variables generated from
//! `[theme]` are prepended, and the whole sheet is inlined in a `<style>`
//! element so each HTML file is self-contained for printing.

use crate::cite::{CitationSource, CiteError};
use crate::config::{self, CvConfig, DocumentConfig, Item, ProfileConfig, Section, SectionBody};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Section '{section}': {source}")]
    Citation { section: String, source: CiteError },
    #[error("Unknown document '{0}'")]
    UnknownDocument(String),
}

const CSS_STATIC: &str = include_str!("../static/cv.css");

/// A section whose citations have all been formatted.
#[derive(Debug)]
pub struct ResolvedSection<'a> {
    pub section: &'a Section,
    pub body: ResolvedBody<'a>,
}

#[derive(Debug)]
pub enum ResolvedBody<'a> {
    Items(&'a [Item]),
    /// Formatted HTML citations in key order.
    Citations(Vec<String>),
}

/// A document ready to be written. Holds no unresolved keys.
#[derive(Debug)]
pub struct ResolvedDocument<'a> {
    pub document: &'a DocumentConfig,
    pub title: String,
    pub sections: Vec<ResolvedSection<'a>>,
}

impl ResolvedDocument<'_> {
    pub fn citation_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| match &s.body {
                ResolvedBody::Citations(c) => c.len(),
                ResolvedBody::Items(_) => 0,
            })
            .sum()
    }

    pub fn item_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| match &s.body {
                ResolvedBody::Items(items) => items.len(),
                ResolvedBody::Citations(_) => 0,
            })
            .sum()
    }
}

/// Result of writing one document, reported by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub output: String,
    pub html_path: PathBuf,
    pub sections: usize,
    pub citations: usize,
    pub items: usize,
    pub wants_pdf: bool,
}

/// Pick documents by output name, or all of them when `names` is empty.
pub fn select_documents<'a>(
    config: &'a CvConfig,
    names: &[String],
) -> Result<Vec<&'a DocumentConfig>, RenderError> {
    if names.is_empty() {
        return Ok(config.documents.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            config
                .documents
                .iter()
                .find(|d| &d.output == name)
                .ok_or_else(|| RenderError::UnknownDocument(name.clone()))
        })
        .collect()
}

/// Resolve every citation in one document.
pub fn resolve_document<'a>(
    config: &'a CvConfig,
    document: &'a DocumentConfig,
    source: &dyn CitationSource,
) -> Result<ResolvedDocument<'a>, RenderError> {
    let sections = config
        .document_sections(document)
        .into_iter()
        .map(|section| resolve_section(section, source))
        .collect::<Result<Vec<_>, _>>()?;
    let title = document
        .title
        .clone()
        .unwrap_or_else(|| config.profile.name.clone());
    Ok(ResolvedDocument {
        document,
        title,
        sections,
    })
}

/// Resolve every selected document. Fails on the first bad key.
pub fn resolve_all<'a>(
    config: &'a CvConfig,
    documents: &[&'a DocumentConfig],
    source: &dyn CitationSource,
) -> Result<Vec<ResolvedDocument<'a>>, RenderError> {
    documents
        .iter()
        .map(|doc| resolve_document(config, *doc, source))
        .collect()
}

fn resolve_section<'a>(
    section: &'a Section,
    source: &dyn CitationSource,
) -> Result<ResolvedSection<'a>, RenderError> {
    let body = match &section.body {
        SectionBody::Items(items) => ResolvedBody::Items(items),
        SectionBody::Citations(keys) => ResolvedBody::Citations(
            keys.iter()
                .map(|key| source.reference(key))
                .collect::<Result<_, _>>()
                .map_err(|err| RenderError::Citation {
                    section: section.id.clone(),
                    source: err,
                })?,
        ),
    };
    Ok(ResolvedSection { section, body })
}

/// Resolve every selected document, then write them all.
///
/// Nothing is written, and `output_dir` is not created, unless every citation
/// resolves.
pub fn render_documents(
    config: &CvConfig,
    documents: &[&DocumentConfig],
    source: &dyn CitationSource,
    output_dir: &Path,
) -> Result<Vec<RenderedDocument>, RenderError> {
    let resolved = resolve_all(config, documents, source)?;
    write_documents(config, &resolved, output_dir)
}

/// Write every resolved document as `<output_dir>/<output>.html`.
pub fn write_documents(
    config: &CvConfig,
    documents: &[ResolvedDocument],
    output_dir: &Path,
) -> Result<Vec<RenderedDocument>, RenderError> {
    fs::create_dir_all(output_dir)?;
    let css = stylesheet(config);

    let mut rendered = Vec::with_capacity(documents.len());
    for doc in documents {
        let html_path = output_dir.join(format!("{}.html", doc.document.output));
        let markup = render_document(&config.profile, doc, &css);
        fs::write(&html_path, markup.into_string())?;
        rendered.push(RenderedDocument {
            output: doc.document.output.clone(),
            html_path,
            sections: doc.sections.len(),
            citations: doc.citation_count(),
            items: doc.item_count(),
            wants_pdf: doc.document.wants_pdf(&config.pdf),
        });
    }
    Ok(rendered)
}

/// Theme variables followed by the static stylesheet.
pub fn stylesheet(config: &CvConfig) -> String {
    let theme_css = config::generate_theme_css(&config.theme);
    format!("{}\n\n{}", theme_css, CSS_STATIC)
}

// ============================================================================
// HTML Components
// ============================================================================

fn base_document(title: &str, css: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body.cv {
                (content)
            }
        }
    }
}

fn render_profile(profile: &ProfileConfig) -> Markup {
    html! {
        header.profile {
            @if !profile.name.is_empty() {
                h1 { (profile.name) }
            }
            @if !profile.contact.is_empty() {
                ul.contact {
                    @for line in &profile.contact {
                        li { (PreEscaped(line)) }
                    }
                }
            }
            @if let Some(summary) = &profile.summary {
                div.summary { (PreEscaped(markdown(summary))) }
            }
        }
    }
}

fn render_section(resolved: &ResolvedSection) -> Markup {
    let section = resolved.section;
    html! {
        section.cv-section id=(section.id) {
            h2 { (PreEscaped(&section.title)) }
            @match &resolved.body {
                ResolvedBody::Items(items) => {
                    div.items {
                        @for item in *items {
                            (render_item(item))
                        }
                    }
                }
                ResolvedBody::Citations(citations) => {
                    ol.citations {
                        @for citation in citations {
                            li { (PreEscaped(citation)) }
                        }
                    }
                }
            }
        }
    }
}

fn render_item(item: &Item) -> Markup {
    html! {
        div.item {
            span.item-name { (PreEscaped(&item.name)) }
            @if let Some(time) = &item.time {
                span.item-time { (PreEscaped(time)) }
            }
            @if let Some(description) = &item.description {
                div.item-description { (PreEscaped(description)) }
            }
        }
    }
}

/// Render one full HTML document.
pub fn render_document(profile: &ProfileConfig, doc: &ResolvedDocument, css: &str) -> Markup {
    let content = html! {
        (render_profile(profile))
        main {
            @for section in &doc.sections {
                (render_section(section))
            }
        }
    };
    base_document(&doc.title, css, content)
}

fn markdown(source: &str) -> String {
    let parser = Parser::new(source);
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockSource;
    use tempfile::TempDir;

    fn config() -> CvConfig {
        toml::from_str(
            r#"
[profile]
name = "Jane Doe"
contact = ["<a href=\"mailto:jane@example.org\">jane@example.org</a>", "Minneapolis, MN"]
summary = "Works on *air quality*."

[[sections]]
id = "edu"
title = "Education &amp; Training"
items = [
  { name = "Ph.D.", time = "2014", description = "University of Minnesota" },
  { name = "B.S." },
]

[[sections]]
id = "papers"
title = "Papers"
citations = ["A", "B"]

[[documents]]
output = "cv"

[[documents]]
output = "short"
title = "Short <CV>"
sections = ["papers"]
pdf = false
"#,
        )
        .unwrap()
    }

    fn source() -> MockSource {
        MockSource::new(&[("A", "Smith, J. (2020) <i>A</i>."), ("B", "Doe, J. (2019) B.")])
    }

    #[test]
    fn resolve_formats_every_citation_in_order() {
        let config = config();
        let doc = resolve_document(&config, &config.documents[0], &source()).unwrap();
        assert_eq!(doc.title, "Jane Doe");
        assert_eq!(doc.sections.len(), 2);
        match &doc.sections[1].body {
            ResolvedBody::Citations(c) => {
                assert_eq!(c, &vec!["Smith, J. (2020) <i>A</i>.", "Doe, J. (2019) B."])
            }
            other => panic!("expected citations, got {other:?}"),
        }
        assert_eq!(doc.citation_count(), 2);
        assert_eq!(doc.item_count(), 2);
    }

    #[test]
    fn resolve_unknown_key_names_section() {
        let config = config();
        let source = MockSource::new(&[("A", "a")]);
        let err = resolve_document(&config, &config.documents[0], &source).unwrap_err();
        match err {
            RenderError::Citation { section, source } => {
                assert_eq!(section, "papers");
                assert_eq!(source, CiteError::UnknownKey("B".to_string()));
            }
            other => panic!("expected Citation error, got {other:?}"),
        }
    }

    #[test]
    fn failed_resolve_writes_nothing() {
        let config = config();
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        let docs = select_documents(&config, &[]).unwrap();

        // "short" would resolve on its own; "cv" fails on key B.
        let short = select_documents(&config, &["short".to_string()]).unwrap();
        assert!(resolve_all(&config, &short, &source()).is_ok());

        let result = render_documents(&config, &docs, &MockSource::new(&[("A", "a")]), &out);
        assert!(matches!(result, Err(RenderError::Citation { .. })));
        assert!(!out.exists());

        let rendered = render_documents(&config, &docs, &source(), &out).unwrap();
        assert_eq!(rendered.len(), 2);
        assert!(out.join("cv.html").exists());
    }

    #[test]
    fn select_documents_by_name() {
        let config = config();
        let all = select_documents(&config, &[]).unwrap();
        assert_eq!(all.len(), 2);

        let short = select_documents(&config, &["short".to_string()]).unwrap();
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].output, "short");

        let err = select_documents(&config, &["resume".to_string()]).unwrap_err();
        assert!(matches!(err, RenderError::UnknownDocument(name) if name == "resume"));
    }

    #[test]
    fn document_structure() {
        let config = config();
        let doc = resolve_document(&config, &config.documents[0], &source()).unwrap();
        let html = render_document(&config.profile, &doc, "body{}").into_string();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Jane Doe</title>"));
        assert!(html.contains("<h1>Jane Doe</h1>"));
        assert!(html.contains(r#"<a href="mailto:jane@example.org">jane@example.org</a>"#));
        assert!(html.contains("<em>air quality</em>"));
        assert!(html.contains(r#"id="edu""#));
        assert!(html.contains(r#"class="cv-section""#));
        assert!(html.contains("<h2>Education &amp; Training</h2>"));
        assert!(html.contains(r#"<span class="item-time">2014</span>"#));
        assert!(html.contains(r#"<ol class="citations"><li>Smith, J. (2020) <i>A</i>.</li>"#));
    }

    #[test]
    fn sections_follow_document_order() {
        let mut config = config();
        config.documents[0].sections = Some(vec!["papers".to_string(), "edu".to_string()]);
        let doc = resolve_document(&config, &config.documents[0], &source()).unwrap();
        let html = render_document(&config.profile, &doc, "").into_string();
        let papers = html.find(r#"id="papers""#).unwrap();
        let edu = html.find(r#"id="edu""#).unwrap();
        assert!(papers < edu);
    }

    #[test]
    fn item_without_time_or_description() {
        let html = render_item(&Item {
            name: "B.S.".to_string(),
            time: None,
            description: None,
        })
        .into_string();
        assert_eq!(html, r#"<div class="item"><span class="item-name">B.S.</span></div>"#);
    }

    #[test]
    fn page_title_is_escaped() {
        let config = config();
        let doc = resolve_document(&config, &config.documents[1], &source()).unwrap();
        let html = render_document(&config.profile, &doc, "").into_string();
        assert!(html.contains("<title>Short &lt;CV&gt;</title>"));
        assert!(!html.contains(r#"id="edu""#));
    }

    #[test]
    fn profile_without_summary_or_contact() {
        let html = render_profile(&ProfileConfig {
            name: "X".to_string(),
            contact: vec![],
            summary: None,
        })
        .into_string();
        assert_eq!(html, r#"<header class="profile"><h1>X</h1></header>"#);
    }

    #[test]
    fn stylesheet_prepends_theme_variables() {
        let css = stylesheet(&config());
        let vars = css.find("--color-accent").unwrap();
        let body = css.find(".cv-section").unwrap();
        assert!(vars < body);
    }

    #[test]
    fn fixture_project_resolves_every_document() {
        use crate::bib::Library;
        use crate::cite::Formatter;

        let tmp = crate::test_helpers::setup_fixtures();
        let config = config::load_config(tmp.path()).unwrap();
        let library = Library::load(&config.bibliography_paths(tmp.path())).unwrap();
        let formatter = Formatter::new(&library, config.name_style());

        let docs = select_documents(&config, &[]).unwrap();
        let resolved = resolve_all(&config, &docs, &formatter).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].citation_count(), 4);
        assert_eq!(resolved[1].title, "Publications");
        assert_eq!(resolved[1].sections.len(), 1);
    }

    #[test]
    fn write_documents_creates_html_files() {
        let config = config();
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        let docs = select_documents(&config, &[]).unwrap();
        let resolved = resolve_all(&config, &docs, &source()).unwrap();

        let rendered = write_documents(&config, &resolved, &out).unwrap();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].html_path, out.join("cv.html"));
        assert!(rendered[0].wants_pdf);
        assert!(!rendered[1].wants_pdf);
        assert_eq!(rendered[1].citations, 2);
        assert_eq!(rendered[1].items, 0);

        let html = fs::read_to_string(out.join("short.html")).unwrap();
        assert!(html.contains("Doe, J. (2019) B."));
        assert!(html.contains("--font-body"));
    }
}
