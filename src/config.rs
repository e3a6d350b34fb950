//! Project configuration module.
//!
//! Handles loading, validating, and merging the project's `cv.toml`. Stock
//! defaults are serialized to a TOML table, the user file is merged on top, and
//! the result is deserialized and validated. Unknown keys are rejected to catch
//! typos early.
//!
//! ## Project Layout
//!
//! ```text
//! my-cv/
//! ├── cv.toml            # Sections, documents, profile, theme
//! ├── publications.bib
//! └── talks/             # Directories contribute every *.bib beneath them
//!     ├── 2019.bib
//!     └── 2020.bib
//! ```
//!
//! ## Sections and Documents
//!
//! A section holds either free-text `items` or a list of `citations`, never
//! both. Documents pick an ordered subset of sections by id; a document that
//! omits `sections` gets all of them in declaration order.
//!
//! ```toml
//! bibliographies = ["publications.bib", "talks"]
//!
//! [[sections]]
//! id = "education"
//! title = "Education"
//! items = [
//!   { name = "Ph.D., Civil Engineering", time = "2014", description = "University of Minnesota" },
//! ]
//!
//! [[sections]]
//! id = "papers"
//! title = "Peer-Reviewed Publications"
//! citations = ["Smith2020", "Doe2019"]
//!
//! [[documents]]
//! output = "cv"
//!
//! [[documents]]
//! output = "short"
//! title = "Short CV"
//! sections = ["papers"]
//! pdf = false
//! ```

use crate::names::{NameOrder, NameStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the project config inside the project directory.
pub const CONFIG_FILE: &str = "cv.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("No {CONFIG_FILE} found in {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `cv.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CvConfig {
    /// Bibliography files or directories, relative to the project directory.
    pub bibliographies: Vec<String>,
    /// Header block: name, contact lines, summary.
    pub profile: ProfileConfig,
    /// Author-list formatting.
    pub names: NamesConfig,
    /// Print-to-PDF settings.
    pub pdf: PdfConfig,
    /// Fonts and colors.
    pub theme: ThemeConfig,
    /// CV sections in declaration order.
    pub sections: Vec<Section>,
    /// Output documents.
    pub documents: Vec<DocumentConfig>,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            bibliographies: Vec::new(),
            profile: ProfileConfig::default(),
            names: NamesConfig::default(),
            pdf: PdfConfig::default(),
            theme: ThemeConfig::default(),
            sections: Vec::new(),
            documents: vec![DocumentConfig::default()],
        }
    }
}

impl CvConfig {
    /// Validate values and cross-references between documents and sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "sections.id must not be empty".into(),
                ));
            }
            if !ids.insert(section.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate section id '{}'",
                    section.id
                )));
            }
        }

        if self.documents.is_empty() {
            return Err(ConfigError::Validation(
                "at least one document is required".into(),
            ));
        }
        let mut outputs = HashSet::new();
        for doc in &self.documents {
            if doc.output.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "documents.output must not be empty".into(),
                ));
            }
            if doc.output.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "documents.output '{}' must be a file stem, not a path",
                    doc.output
                )));
            }
            if !outputs.insert(doc.output.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate document output '{}'",
                    doc.output
                )));
            }
            for id in doc.sections.iter().flatten() {
                if !ids.contains(id.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "document '{}' references unknown section '{id}'",
                        doc.output
                    )));
                }
            }
        }

        for (name, value) in [
            ("pdf.margin_top", self.pdf.margin_top),
            ("pdf.margin_bottom", self.pdf.margin_bottom),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{name} must be a non-negative number of inches"
                )));
            }
        }
        Ok(())
    }

    /// Sections of `doc` in the order the document lists them.
    pub fn document_sections<'a>(&'a self, doc: &'a DocumentConfig) -> Vec<&'a Section> {
        match &doc.sections {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.sections.iter().find(|s| &s.id == id))
                .collect(),
            None => self.sections.iter().collect(),
        }
    }

    /// Bibliography paths resolved against the project directory.
    pub fn bibliography_paths(&self, project: &Path) -> Vec<PathBuf> {
        self.bibliographies
            .iter()
            .map(|b| project.join(b))
            .collect()
    }

    pub fn name_style(&self) -> NameStyle {
        NameStyle {
            subsequent: self.names.subsequent,
            emphasize: self.names.emphasize.clone(),
        }
    }
}

/// Header block shown at the top of every document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    pub name: String,
    /// One line each: address, email, web page.
    pub contact: Vec<String>,
    /// Markdown paragraph under the header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Author-list formatting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamesConfig {
    /// Formatted names to underline, e.g. `"C.W. Tessum"` and `"Tessum, C.W."`.
    pub emphasize: Vec<String>,
    /// Layout of every author after the first.
    pub subsequent: NameOrder,
}

/// Paper sizes supported by the PDF printer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    #[default]
    Letter,
    A4,
}

impl PaperSize {
    /// `(width, height)` in inches.
    pub fn inches(self) -> (f64, f64) {
        match self {
            Self::Letter => (8.5, 11.0),
            Self::A4 => (8.27, 11.69),
        }
    }
}

/// Print-to-PDF settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfConfig {
    /// Print a PDF next to every HTML document unless the document opts out.
    pub enabled: bool,
    /// Top margin in inches.
    pub margin_top: f64,
    /// Bottom margin in inches.
    pub margin_bottom: f64,
    pub paper: PaperSize,
    /// Print CSS backgrounds and colors.
    pub print_background: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            margin_top: 1.0,
            margin_bottom: 1.0,
            paper: PaperSize::Letter,
            print_background: false,
        }
    }
}

/// Fonts and colors, emitted as CSS custom properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub font_family: String,
    pub font_size: String,
    /// Maximum width of the page body (CSS value).
    pub page_width: String,
    pub text: String,
    /// Times and secondary lines.
    pub text_muted: String,
    /// Section headings and links.
    pub accent: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            font_family: "Georgia, 'Times New Roman', serif".to_string(),
            font_size: "11pt".to_string(),
            page_width: "48rem".to_string(),
            text: "#111111".to_string(),
            text_muted: "#555555".to_string(),
            accent: "#1f4e79".to_string(),
        }
    }
}

/// One free-text row of an item section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Item {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Items(Vec<Item>),
    /// Citation keys resolved against the bibliography at render time.
    Citations(Vec<String>),
}

/// A named block of the CV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSection", into = "RawSection")]
pub struct Section {
    pub id: String,
    /// Trusted HTML fragment.
    pub title: String,
    pub body: SectionBody,
}

/// Wire shape of a section: exactly one of `items` or `citations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSection {
    id: String,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items: Option<Vec<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    citations: Option<Vec<String>>,
}

impl TryFrom<RawSection> for Section {
    type Error = String;

    fn try_from(raw: RawSection) -> Result<Self, Self::Error> {
        let body = match (raw.items, raw.citations) {
            (Some(items), None) => SectionBody::Items(items),
            (None, Some(keys)) => SectionBody::Citations(keys),
            (Some(_), Some(_)) => {
                return Err(format!(
                    "section '{}' has both items and citations",
                    raw.id
                ));
            }
            (None, None) => {
                return Err(format!(
                    "section '{}' needs either items or citations",
                    raw.id
                ));
            }
        };
        Ok(Self {
            id: raw.id,
            title: raw.title,
            body,
        })
    }
}

impl From<Section> for RawSection {
    fn from(section: Section) -> Self {
        let (items, citations) = match section.body {
            SectionBody::Items(items) => (Some(items), None),
            SectionBody::Citations(keys) => (None, Some(keys)),
        };
        Self {
            id: section.id,
            title: section.title,
            items,
            citations,
        }
    }
}

/// One output document: `<output>.html` and optionally `<output>.pdf`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentConfig {
    /// File stem inside the output directory.
    pub output: String,
    /// Page title. Falls back to the profile name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Section ids in order. All sections when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<String>>,
    /// Overrides `pdf.enabled` for this document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<bool>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            output: "cv".to_string(),
            title: None,
            sections: None,
            pdf: None,
        }
    }
}

impl DocumentConfig {
    pub fn wants_pdf(&self, pdf: &PdfConfig) -> bool {
        self.pdf.unwrap_or(pdf.enabled)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer the user's `cv.toml` is merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(CvConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values, arrays included, replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `cv.toml` from a project directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `cv.toml`.
pub fn load_raw_config(project: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = project.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CvConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CvConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the project config from `cv.toml` in `project`.
///
/// A project without `cv.toml` is an error: there is nothing to render.
pub fn load_config(project: &Path) -> Result<CvConfig, ConfigError> {
    let overlay = load_raw_config(project)?
        .ok_or_else(|| ConfigError::NotFound(project.to_path_buf()))?;
    resolve_config(stock_defaults_value(), Some(overlay))
}

/// Returns a fully-commented stock `cv.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# cv-press project file
# =====================
# Everything except the sections is optional. Values shown below are the
# defaults unless marked as an example. Unknown keys will cause an error.

# Bibliography files or directories, relative to this file. A directory
# contributes every *.bib file beneath it. Citation keys must be unique
# across all of them.
bibliographies = []

# ---------------------------------------------------------------------------
# Profile header
# ---------------------------------------------------------------------------
[profile]
name = ""
# One entry per line under the name.
contact = []
# Optional Markdown paragraph under the header.
# summary = "Research on *air quality* and energy systems."

# ---------------------------------------------------------------------------
# Author lists
# ---------------------------------------------------------------------------
[names]
# Formatted names to underline (yourself, advisees). Matched as exact
# substrings of the formatted name, so list both orders if needed.
emphasize = []
# Layout of every author after the first: "given-first" (J. Doe) or
# "family-first" (Doe, J.). The first author is always family-first.
subsequent = "given-first"

# ---------------------------------------------------------------------------
# PDF output (headless Chrome)
# ---------------------------------------------------------------------------
[pdf]
enabled = true
# Margins in inches.
margin_top = 1.0
margin_bottom = 1.0
# "letter" or "a4"
paper = "letter"
print_background = false

# ---------------------------------------------------------------------------
# Theme
# ---------------------------------------------------------------------------
[theme]
font_family = "Georgia, 'Times New Roman', serif"
font_size = "11pt"
page_width = "48rem"
text = "#111111"
text_muted = "#555555"
accent = "#1f4e79"

# ---------------------------------------------------------------------------
# Sections (example)
# ---------------------------------------------------------------------------
# Each section has either `items` or `citations`. Titles and item text are
# written as HTML and emitted as-is.
#
# [[sections]]
# id = "education"
# title = "Education"
# items = [
#   { name = "Ph.D., Civil Engineering", time = "2014", description = "University of Minnesota" },
# ]
#
# [[sections]]
# id = "papers"
# title = "Peer-Reviewed Publications"
# citations = ["Smith2020"]

# ---------------------------------------------------------------------------
# Documents
# ---------------------------------------------------------------------------
# Each document writes <output>.html (and <output>.pdf). `title` defaults to
# the profile name, `sections` to all sections, `pdf` to pdf.enabled.
[[documents]]
output = "cv"
"##
}

/// Generate CSS custom properties from theme config.
pub fn generate_theme_css(theme: &ThemeConfig) -> String {
    format!(
        r#":root {{
    --font-body: {font_family};
    --font-size: {font_size};
    --page-width: {page_width};
    --color-text: {text};
    --color-text-muted: {text_muted};
    --color-accent: {accent};
}}"#,
        font_family = theme.font_family,
        font_size = theme.font_size,
        page_width = theme.page_width,
        text = theme.text,
        text_muted = theme.text_muted,
        accent = theme.accent,
    )
}
