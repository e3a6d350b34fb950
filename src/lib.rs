//! # cv-press
//!
//! Formats a curriculum vitae from a TOML project file and BibTeX
//! bibliographies. Each configured document is written as standalone HTML and
//! optionally printed to PDF through headless Chrome.
//!
//! # Pipeline
//!
//! ```text
//! 1. Config    cv.toml        →  CvConfig      (stock defaults + user overrides)
//! 2. Load      *.bib          →  Library       (citation key → entry)
//! 3. Resolve   sections       →  HTML strings  (every key formatted up front)
//! 4. Write     documents      →  dist/*.html
//! 5. Print     dist/*.html    →  dist/*.pdf    (headless Chrome)
//! ```
//!
//! Steps 1 to 3 can fail on bad input; none of them writes anything. A missing
//! key or an unsupported entry type stops the run before the first HTML file
//! exists.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `cv.toml` loading, merging, validation, and theme CSS |
//! | [`bib`] | BibTeX loading into a [`bib::Library`] with duplicate-key detection |
//! | [`fields`] | Brace stripping, TeX accent decoding, page ranges, period collapsing |
//! | [`names`] | Author-list parsing, initials, corresponding-author and emphasis markers |
//! | [`cite`] | Per-entry-type citation templates and the key → HTML [`cite::Formatter`] |
//! | [`render`] | Section resolution and maud HTML documents |
//! | [`pdf`] | [`pdf::Printer`] seam, headless Chrome printer, transient local server |
//! | [`output`] | CLI output formatting for each stage |
//!
//! # Design Decisions
//!
//! ## Trusted Section Markup
//!
//! Section titles, item text and contact lines come from the CV's own author
//! and may contain inline HTML (`<i>`, links, `&amp;`). They are emitted as-is.
//! Citation strings are built from bibliography fields and also contain markup
//! (`<i>` journals, `<b>` volumes, `<u>` emphasis).
//!
//! ## Resolve Before Write
//!
//! Rendering is split into a resolve phase that formats every citation of every
//! selected document and a write phase that only touches the filesystem. There
//! is no partial output: either every document resolves or nothing is written.
//!
//! ## Printing Over HTTP
//!
//! Chrome loads the document from a short-lived `127.0.0.1` server rather than
//! `file://`, so relative assets resolve the same way they would when the
//! output directory is published.

pub mod bib;
pub mod cite;
pub mod config;
pub mod fields;
pub mod names;
pub mod output;
pub mod pdf;
pub mod render;

#[cfg(test)]
pub(crate) mod test_helpers;
