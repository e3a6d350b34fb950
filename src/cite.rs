//! Citation formatting.
//!
//! Maps a [`BibEntry`] to a single HTML citation line. The entry's type tag is
//! parsed into a [`CitationKind`] first, and each kind has its own typed field
//! set and template:
//!
//! | Kind | Shape |
//! |------|-------|
//! | `article` | `Authors (Year) Title. <i>Journal</i>. <b>Vol</b>:Issue Pages.` |
//! | `inproceedings` | `Authors (Year) Title. Presented at Venue, Location.` |
//! | `techreport` | `Authors (Year) "Title", tech. rep.: Institution, Location, Pages.` |
//! | `incollection` | `Authors (Year) "Title", in <i>Book</i>, ed. by Eds, Publisher, Pages, URL.` |
//!
//! Every optional field is an `Option<String>`; a missing field drops out
//! together with its separator. The assembled line always goes through
//! [`fields::collapse_periods`] last.
//!
//! The [`Formatter`] is the `ref(key)` helper used by the renderer: it looks a
//! key up in the [`Library`] and fails on unknown keys instead of returning an
//! empty string.

use crate::bib::{BibEntry, Library};
use crate::fields::{self, Field};
use crate::names::{self, NameStyle};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CiteError {
    #[error("invalid citation key {0}")]
    UnknownKey(String),
    #[error("unsupported citation type '{entry_type}' for {key}")]
    UnsupportedType { key: String, entry_type: String },
}

/// The entry types the CV knows how to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationKind {
    Article,
    Proceedings,
    Report,
    Collection,
}

impl CitationKind {
    /// Parse a BibTeX type tag. `conference` and the biblatex `report` are
    /// accepted as aliases.
    pub fn from_entry_type(entry_type: &str) -> Option<Self> {
        match entry_type.to_ascii_lowercase().as_str() {
            "article" => Some(Self::Article),
            "inproceedings" | "conference" => Some(Self::Proceedings),
            "techreport" | "report" => Some(Self::Report),
            "incollection" => Some(Self::Collection),
            _ => None,
        }
    }
}

/// Fields every template starts with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Head {
    pub authors: Option<String>,
    pub year: Option<String>,
    pub title: Option<String>,
}

impl Head {
    fn from_entry(entry: &BibEntry, style: &NameStyle) -> Self {
        Self {
            authors: entry
                .field("author")
                .map(|a| fields::escape_ampersands(&fields::decode_tex(a)))
                .and_then(|a| names::format_authors(&a, style)),
            year: Field::plain().clean(entry.field("year")),
            title: Field::title().clean(entry.field("title")),
        }
    }

    /// `Authors (Year)`, or `Authors.` when the year is missing.
    fn authors_year(&self) -> String {
        match (&self.authors, &self.year) {
            (Some(a), Some(y)) => format!("{a} ({y})"),
            (None, Some(y)) => format!("({y})"),
            (Some(a), None) if a.ends_with('.') || a.ends_with(".*") => a.clone(),
            (Some(a), None) => format!("{a}."),
            (None, None) => String::new(),
        }
    }

    fn quoted_title(&self) -> Option<String> {
        self.title.as_ref().map(|t| format!("\"{t}\""))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    pub head: Head,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub url: Option<String>,
}

impl Article {
    pub fn from_entry(entry: &BibEntry, style: &NameStyle) -> Self {
        Self {
            head: Head::from_entry(entry, style),
            journal: Field::plain().trim_period().clean(entry.field("journal")),
            volume: Field::plain().clean(entry.field("volume")),
            issue: Field::plain().clean(entry.field("number")),
            pages: Field::plain().pages().clean(entry.field("pages")),
            url: fields::clean_url(entry.field("url")),
        }
    }

    pub fn render(&self) -> String {
        let mut s = self.head.authors_year();
        if let Some(title) = &self.head.title {
            s = join_space(&s, &format!("{title}."));
        }
        if let Some(journal) = &self.journal {
            s = join_space(&s, &format!("{}.", fields::italic(journal)));
        }
        if let Some(volume) = &self.volume {
            s = join_space(&s, &fields::bold(volume));
        }
        if let Some(issue) = &self.issue {
            if self.volume.is_some() {
                s.push(':');
                s.push_str(issue);
            } else {
                s = join_space(&s, issue);
            }
        }
        match (&self.pages, &self.url) {
            (Some(pages), Some(url)) => s = join_space(&s, &format!("{}.", fields::link(url, pages))),
            (Some(pages), None) => s = join_space(&s, &format!("{pages}.")),
            (None, Some(url)) => s = join_space(&s, &format!("{}.", fields::link(url, url))),
            (None, None) => s.push('.'),
        }
        s
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proceedings {
    pub head: Head,
    pub venue: Option<String>,
    pub location: Option<String>,
}

impl Proceedings {
    pub fn from_entry(entry: &BibEntry, style: &NameStyle) -> Self {
        Self {
            head: Head::from_entry(entry, style),
            venue: Field::plain().clean(entry.field("booktitle")),
            location: Field::plain().clean(entry.field("address")),
        }
    }

    pub fn render(&self) -> String {
        let mut s = self.head.authors_year();
        if let Some(title) = &self.head.title {
            s = join_space(&s, &format!("{title}."));
        }
        let place = join_present(&[self.venue.clone(), self.location.clone()]);
        if !place.is_empty() {
            s = join_space(&s, &format!("Presented at {place}."));
        } else if !s.ends_with('.') {
            s.push('.');
        }
        s
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub head: Head,
    pub institution: Option<String>,
    pub location: Option<String>,
    pub pages: Option<String>,
    pub url: Option<String>,
}

impl Report {
    pub fn from_entry(entry: &BibEntry, style: &NameStyle) -> Self {
        Self {
            head: Head::from_entry(entry, style),
            institution: Field::plain().clean(entry.field("institution")),
            location: Field::plain().clean(entry.field("address")),
            pages: Field::plain().pages().clean(entry.field("pages")),
            url: fields::clean_url(entry.field("url")),
        }
    }

    pub fn render(&self) -> String {
        let s = self.head.authors_year();
        let locator = match (&self.pages, &self.url) {
            (Some(pages), Some(url)) => Some(fields::link(url, pages)),
            (Some(pages), None) => Some(pages.clone()),
            (None, Some(url)) => Some(fields::link(url, url)),
            (None, None) => None,
        };
        let publisher = join_present(&[self.institution.clone(), self.location.clone(), locator]);
        let mut tail = join_present(&[self.head.quoted_title(), Some("tech. rep.".to_string())]);
        if !publisher.is_empty() {
            tail = format!("{tail}: {publisher}");
        }
        join_space(&s, &format!("{tail}."))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub head: Head,
    pub booktitle: Option<String>,
    pub editors: Option<String>,
    pub publisher: Option<String>,
    pub pages: Option<String>,
    pub url: Option<String>,
}

impl Collection {
    pub fn from_entry(entry: &BibEntry, style: &NameStyle) -> Self {
        Self {
            head: Head::from_entry(entry, style),
            booktitle: Field::plain().clean(entry.field("booktitle")),
            editors: Field::plain().clean(entry.field("editor")),
            publisher: Field::plain().clean(entry.field("publisher")),
            pages: Field::plain().pages().clean(entry.field("pages")),
            url: fields::clean_url(entry.field("url")),
        }
    }

    pub fn render(&self) -> String {
        let s = self.head.authors_year();
        let parts = join_present(&[
            self.head.quoted_title(),
            self.booktitle
                .as_ref()
                .map(|b| format!("in {}", fields::italic(b))),
            self.editors.as_ref().map(|e| format!("ed. by {e}")),
            self.publisher.clone(),
            self.pages.clone(),
            self.url.clone(),
        ]);
        if parts.is_empty() {
            format!("{s}.")
        } else {
            join_space(&s, &format!("{parts}."))
        }
    }
}

/// A typed entry ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Citation {
    Article(Article),
    Proceedings(Proceedings),
    Report(Report),
    Collection(Collection),
}

impl Citation {
    pub fn from_entry(entry: &BibEntry, style: &NameStyle) -> Result<Self, CiteError> {
        let kind = CitationKind::from_entry_type(&entry.entry_type).ok_or_else(|| {
            CiteError::UnsupportedType {
                key: entry.key.clone(),
                entry_type: entry.entry_type.clone(),
            }
        })?;
        Ok(match kind {
            CitationKind::Article => Self::Article(Article::from_entry(entry, style)),
            CitationKind::Proceedings => Self::Proceedings(Proceedings::from_entry(entry, style)),
            CitationKind::Report => Self::Report(Report::from_entry(entry, style)),
            CitationKind::Collection => Self::Collection(Collection::from_entry(entry, style)),
        })
    }

    pub fn kind(&self) -> CitationKind {
        match self {
            Self::Article(_) => CitationKind::Article,
            Self::Proceedings(_) => CitationKind::Proceedings,
            Self::Report(_) => CitationKind::Report,
            Self::Collection(_) => CitationKind::Collection,
        }
    }

    /// The finished HTML line.
    pub fn render(&self) -> String {
        let raw = match self {
            Self::Article(a) => a.render(),
            Self::Proceedings(p) => p.render(),
            Self::Report(r) => r.render(),
            Self::Collection(c) => c.render(),
        };
        fields::collapse_periods(&raw)
    }
}

/// Resolves citation keys to formatted HTML.
///
/// The renderer depends on this trait rather than on [`Formatter`] so page
/// layout can be tested without bibliography files.
pub trait CitationSource {
    fn reference(&self, key: &str) -> Result<String, CiteError>;
}

/// Formats entries from a loaded [`Library`].
pub struct Formatter<'a> {
    library: &'a Library,
    style: NameStyle,
}

impl<'a> Formatter<'a> {
    pub fn new(library: &'a Library, style: NameStyle) -> Self {
        Self { library, style }
    }

    pub fn format_entry(&self, entry: &BibEntry) -> Result<String, CiteError> {
        Ok(Citation::from_entry(entry, &self.style)?.render())
    }
}

impl CitationSource for Formatter<'_> {
    fn reference(&self, key: &str) -> Result<String, CiteError> {
        let entry = self
            .library
            .get(key)
            .ok_or_else(|| CiteError::UnknownKey(key.to_string()))?;
        self.format_entry(entry)
    }
}

fn join_space(a: &str, b: &str) -> String {
    if a.is_empty() {
        b.to_string()
    } else {
        format!("{a} {b}")
    }
}

fn join_present(parts: &[Option<String>]) -> String {
    parts.iter().flatten().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameOrder;
    use crate::test_helpers::{entry, library_of};

    fn fmt(e: &BibEntry) -> String {
        Citation::from_entry(e, &NameStyle::default())
            .unwrap()
            .render()
    }

    // =========================================================================
    // Article
    // =========================================================================

    #[test]
    fn article_with_volume_and_issue() {
        let e = entry(
            "Smith2020",
            "article",
            &[
                ("author", "{Smith, J.}"),
                ("title", "{A Study}"),
                ("year", "{2020}"),
                ("journal", "{Journal of X}"),
                ("volume", "{5}"),
                ("number", "{2}"),
                ("pages", "{10--20}"),
            ],
        );
        assert_eq!(
            fmt(&e),
            "Smith, J. (2020) A Study. <i>Journal of X</i>. <b>5</b>:2 10–20."
        );
    }

    #[test]
    fn article_pages_linked_when_url_present() {
        let e = entry(
            "A",
            "article",
            &[
                ("author", "Smith, John"),
                ("title", "T"),
                ("year", "2020"),
                ("journal", "J"),
                ("volume", "5"),
                ("pages", "1--9"),
                ("url", "https://doi.org/x{\\_}y"),
            ],
        );
        assert_eq!(
            fmt(&e),
            r#"Smith, J. (2020) T. <i>J</i>. <b>5</b> <a href="https://doi.org/x_y">1–9</a>."#
        );
    }

    #[test]
    fn article_url_closes_line_without_pages() {
        let e = entry(
            "A",
            "article",
            &[
                ("author", "Smith, John"),
                ("title", "T"),
                ("year", "2020"),
                ("journal", "J"),
                ("url", "https://x.org"),
            ],
        );
        assert_eq!(
            fmt(&e),
            r#"Smith, J. (2020) T. <i>J</i>. <a href="https://x.org">https://x.org</a>."#
        );
    }

    #[test]
    fn article_without_volume_issue_pages_or_url() {
        let e = entry(
            "A",
            "article",
            &[
                ("author", "Smith, John"),
                ("title", "T"),
                ("year", "2020"),
                ("journal", "J"),
            ],
        );
        assert_eq!(fmt(&e), "Smith, J. (2020) T. <i>J</i>.");
    }

    #[test]
    fn article_issue_without_volume() {
        let e = entry(
            "A",
            "article",
            &[
                ("author", "Smith, John"),
                ("title", "T"),
                ("year", "2020"),
                ("journal", "J"),
                ("number", "3"),
                ("pages", "4"),
            ],
        );
        assert_eq!(fmt(&e), "Smith, J. (2020) T. <i>J</i>. 3 4.");
    }

    #[test]
    fn article_missing_journal_has_no_double_period() {
        let e = entry(
            "A",
            "article",
            &[("author", "Smith, John"), ("title", "Title."), ("year", "2021")],
        );
        let out = fmt(&e);
        assert_eq!(out, "Smith, J. (2021) Title.");
        assert!(!out.contains(".."));
    }

    #[test]
    fn article_without_year_terminates_authors() {
        let e = entry(
            "A",
            "article",
            &[("author", "Doe, Jane*"), ("title", "T"), ("journal", "J")],
        );
        assert_eq!(fmt(&e), "Doe, J.* T. <i>J</i>.");

        let e = entry(
            "B",
            "article",
            &[("author", "Plato"), ("title", "T"), ("journal", "J")],
        );
        assert_eq!(fmt(&e), "Plato. T. <i>J</i>.");
    }

    #[test]
    fn article_journal_trailing_period_trimmed() {
        let e = entry(
            "A",
            "article",
            &[
                ("author", "Smith, John"),
                ("title", "T"),
                ("year", "2020"),
                ("journal", "{Atmos. Environ.}"),
                ("volume", "12"),
            ],
        );
        assert_eq!(fmt(&e), "Smith, J. (2020) T. <i>Atmos. Environ</i>. <b>12</b>.");
    }

    #[test]
    fn article_decodes_tex_in_authors() {
        let e = entry(
            "A",
            "article",
            &[
                ("author", r#"{M{\"{u}}ller, Hans} and {Smith, John}"#),
                ("title", "T"),
                ("year", "2020"),
                ("journal", "J"),
            ],
        );
        assert_eq!(fmt(&e), "Müller, H. and J. Smith (2020) T. <i>J</i>.");
    }

    // =========================================================================
    // Proceedings, report, collection
    // =========================================================================

    #[test]
    fn proceedings_full() {
        let e = entry(
            "P",
            "inproceedings",
            &[
                ("author", "Tessum, Christopher and Hill, Jason"),
                ("title", "{Air Quality}"),
                ("year", "2018"),
                ("booktitle", "{CMAS Conference}"),
                ("address", "{Chapel Hill, NC}"),
            ],
        );
        assert_eq!(
            fmt(&e),
            "Tessum, C. and J. Hill (2018) Air Quality. Presented at CMAS Conference, Chapel Hill, NC."
        );
    }

    #[test]
    fn proceedings_location_missing() {
        let e = entry(
            "P",
            "conference",
            &[
                ("author", "Tessum, C."),
                ("title", "Talk"),
                ("year", "2018"),
                ("booktitle", "AGU"),
            ],
        );
        assert_eq!(fmt(&e), "Tessum, C. (2018) Talk. Presented at AGU.");
    }

    #[test]
    fn report_full() {
        let e = entry(
            "R",
            "techreport",
            &[
                ("author", "Tessum, Christopher"),
                ("title", "{Biofuels}"),
                ("year", "2010"),
                ("institution", "{University of Minnesota}"),
                ("address", "{Minneapolis, MN}"),
            ],
        );
        assert_eq!(
            fmt(&e),
            r#"Tessum, C. (2010) "Biofuels", tech. rep.: University of Minnesota, Minneapolis, MN."#
        );
    }

    #[test]
    fn report_with_url_locator() {
        let e = entry(
            "R",
            "techreport",
            &[
                ("author", "Tessum, Christopher"),
                ("title", "Biofuels"),
                ("year", "2010"),
                ("institution", "EPA"),
                ("url", "https://epa.gov/r"),
            ],
        );
        assert_eq!(
            fmt(&e),
            r#"Tessum, C. (2010) "Biofuels", tech. rep.: EPA, <a href="https://epa.gov/r">https://epa.gov/r</a>."#
        );
    }

    #[test]
    fn report_without_institution() {
        let e = entry(
            "R",
            "report",
            &[("author", "Tessum, C."), ("title", "Notes"), ("year", "2010")],
        );
        assert_eq!(fmt(&e), r#"Tessum, C. (2010) "Notes", tech. rep."#);
    }

    #[test]
    fn report_escapes_ampersand_and_keeps_particles() {
        let e = entry(
            "R",
            "techreport",
            &[
                ("author", "Jean de la Fontaine and Smith, Jr., John"),
                ("title", "T & U"),
                ("year", "2010"),
                ("institution", "{Air \\& Water Board}"),
            ],
        );
        assert_eq!(
            fmt(&e),
            r#"de la Fontaine, J. and J. Smith Jr. (2010) "T &amp; U", tech. rep.: Air &amp; Water Board."#
        );
    }

    #[test]
    fn collection_full() {
        let e = entry(
            "C",
            "incollection",
            &[
                ("author", "Tessum, Christopher"),
                ("title", "{Chapter}"),
                ("year", "2015"),
                ("booktitle", "{The Handbook}"),
                ("editor", "{J. Smith}"),
                ("publisher", "{Springer}"),
                ("pages", "{1--10}"),
                ("url", "{https://x.org}"),
            ],
        );
        assert_eq!(
            fmt(&e),
            r#"Tessum, C. (2015) "Chapter", in <i>The Handbook</i>, ed. by J. Smith, Springer, 1–10, https://x.org."#
        );
    }

    #[test]
    fn collection_skips_missing_parts() {
        let e = entry(
            "C",
            "incollection",
            &[
                ("author", "Tessum, Christopher"),
                ("title", "Chapter"),
                ("year", "2015"),
                ("booktitle", "Book"),
            ],
        );
        assert_eq!(fmt(&e), r#"Tessum, C. (2015) "Chapter", in <i>Book</i>."#);
    }

    // =========================================================================
    // Dispatch and lookup
    // =========================================================================

    #[test]
    fn kind_from_entry_type() {
        assert_eq!(
            CitationKind::from_entry_type("Article"),
            Some(CitationKind::Article)
        );
        assert_eq!(
            CitationKind::from_entry_type("inproceedings"),
            Some(CitationKind::Proceedings)
        );
        assert_eq!(
            CitationKind::from_entry_type("techreport"),
            Some(CitationKind::Report)
        );
        assert_eq!(
            CitationKind::from_entry_type("incollection"),
            Some(CitationKind::Collection)
        );
        assert_eq!(CitationKind::from_entry_type("book"), None);
    }

    #[test]
    fn unsupported_type_is_an_error() {
        let e = entry("B1", "book", &[("title", "A Book")]);
        let err = Citation::from_entry(&e, &NameStyle::default()).unwrap_err();
        assert_eq!(
            err,
            CiteError::UnsupportedType {
                key: "B1".to_string(),
                entry_type: "book".to_string(),
            }
        );
    }

    #[test]
    fn citation_reports_its_kind() {
        let e = entry("P", "inproceedings", &[("title", "T")]);
        let c = Citation::from_entry(&e, &NameStyle::default()).unwrap();
        assert_eq!(c.kind(), CitationKind::Proceedings);
    }

    #[test]
    fn formatter_unknown_key_is_error_not_empty() {
        let lib = library_of(vec![]);
        let f = Formatter::new(&lib, NameStyle::default());
        let err = f.reference("Missing2020").unwrap_err();
        assert_eq!(err, CiteError::UnknownKey("Missing2020".to_string()));
        assert_eq!(err.to_string(), "invalid citation key Missing2020");
    }

    #[test]
    fn formatter_resolves_known_key_with_style() {
        let lib = library_of(vec![entry(
            "K",
            "article",
            &[
                ("author", "{Smith, John} and {Doe, Jane*}"),
                ("title", "T"),
                ("year", "2020"),
                ("journal", "J"),
            ],
        )]);
        let style = NameStyle {
            subsequent: NameOrder::FamilyFirst,
            emphasize: vec!["Doe, J.".to_string()],
        };
        let f = Formatter::new(&lib, style);
        assert_eq!(
            f.reference("K").unwrap(),
            "Smith, J. and <u>Doe, J.</u>* (2020) T. <i>J</i>."
        );
    }
}
