//! CLI output formatting for every pipeline stage.
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Bibliography load
//!
//! ```text
//! Bibliography
//! 001 publications.bib (12 entries)
//! 002 talks/2019.bib (3 entries)
//! Loaded 15 entries from 2 files
//! ```
//!
//! ## Render
//!
//! ```text
//! Documents
//! 001 cv → dist/cv.html
//!     6 sections, 15 citations, 9 items
//! 002 short → dist/short.html
//!     1 section, 12 citations, 0 items
//! Rendered 2 documents
//! ```
//!
//! ## PDF
//!
//! ```text
//! PDF
//! 001 cv → dist/cv.pdf (48.2 KB)
//! Printed 1 PDF
//! ```

use crate::bib::SourceSummary;
use crate::pdf::PrintedDocument;
use crate::render::{RenderedDocument, ResolvedDocument};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 entry`, `2 entries`.
fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// Show `path` relative to `base` when it lies beneath it.
fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Byte count as B, KB or MB with one decimal.
fn human_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

// ============================================================================
// Bibliography load
// ============================================================================

/// Format per-file entry counts and the total.
pub fn format_load_output(sources: &[SourceSummary], project: &Path) -> Vec<String> {
    let mut lines = vec!["Bibliography".to_string()];
    for (i, source) in sources.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            display_path(&source.path, project),
            count(source.entries, "entry", "entries")
        ));
    }
    let total: usize = sources.iter().map(|s| s.entries).sum();
    lines.push(format!(
        "Loaded {} from {}",
        count(total, "entry", "entries"),
        count(sources.len(), "file", "files")
    ));
    lines
}

pub fn print_load_output(sources: &[SourceSummary], project: &Path) {
    for line in format_load_output(sources, project) {
        println!("{}", line);
    }
}

// ============================================================================
// Render
// ============================================================================

/// Format one header line per written document plus its counts.
pub fn format_render_output(documents: &[RenderedDocument], base: &Path) -> Vec<String> {
    let mut lines = vec!["Documents".to_string()];
    for (i, doc) in documents.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}",
            format_index(i + 1),
            doc.output,
            display_path(&doc.html_path, base)
        ));
        lines.push(format!(
            "{}{}, {}, {}",
            indent(1),
            count(doc.sections, "section", "sections"),
            count(doc.citations, "citation", "citations"),
            count(doc.items, "item", "items")
        ));
    }
    lines.push(format!(
        "Rendered {}",
        count(documents.len(), "document", "documents")
    ));
    lines
}

pub fn print_render_output(documents: &[RenderedDocument], base: &Path) {
    for line in format_render_output(documents, base) {
        println!("{}", line);
    }
}

/// Summary line for `check`, which resolves without writing.
pub fn format_check_output(documents: &[ResolvedDocument]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, doc) in documents.iter().enumerate() {
        lines.push(format!(
            "{} {} ({}, {})",
            format_index(i + 1),
            doc.document.output,
            count(doc.sections.len(), "section", "sections"),
            count(doc.citation_count(), "citation", "citations")
        ));
    }
    let citations: usize = documents.iter().map(|d| d.citation_count()).sum();
    lines.push(format!(
        "Checked {}, {} resolved",
        count(documents.len(), "document", "documents"),
        count(citations, "citation", "citations")
    ));
    lines
}

pub fn print_check_output(documents: &[ResolvedDocument]) {
    for line in format_check_output(documents) {
        println!("{}", line);
    }
}

// ============================================================================
// PDF
// ============================================================================

pub fn format_pdf_output(printed: &[PrintedDocument], base: &Path) -> Vec<String> {
    let mut lines = vec!["PDF".to_string()];
    for (i, doc) in printed.iter().enumerate() {
        lines.push(format!(
            "{} {} → {} ({})",
            format_index(i + 1),
            doc.output,
            display_path(&doc.pdf_path, base),
            human_size(doc.bytes)
        ));
    }
    lines.push(format!("Printed {}", count(printed.len(), "PDF", "PDFs")));
    lines
}

pub fn print_pdf_output(printed: &[PrintedDocument], base: &Path) {
    for line in format_pdf_output(printed, base) {
        println!("{}", line);
    }
}

// ============================================================================
// Cite
// ============================================================================

/// Key on one line, formatted citation indented below it.
pub fn format_citations(citations: &[(String, String)]) -> Vec<String> {
    citations
        .iter()
        .flat_map(|(key, html)| [key.clone(), format!("{}{}", indent(1), html)])
        .collect()
}

pub fn print_citations(citations: &[(String, String)]) {
    for line in format_citations(citations) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn count_pluralizes() {
        assert_eq!(count(1, "entry", "entries"), "1 entry");
        assert_eq!(count(0, "entry", "entries"), "0 entries");
        assert_eq!(count(3, "entry", "entries"), "3 entries");
    }

    #[test]
    fn display_path_relative_when_possible() {
        assert_eq!(
            display_path(Path::new("/p/talks/a.bib"), Path::new("/p")),
            "talks/a.bib"
        );
        assert_eq!(
            display_path(Path::new("/other/a.bib"), Path::new("/p")),
            "/other/a.bib"
        );
    }

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024 + 512 * 1024), "3.5 MB");
    }

    // =========================================================================
    // Stage output tests
    // =========================================================================

    #[test]
    fn load_output_lists_files_and_total() {
        let sources = vec![
            SourceSummary {
                path: PathBuf::from("/p/publications.bib"),
                entries: 12,
            },
            SourceSummary {
                path: PathBuf::from("/p/talks/2019.bib"),
                entries: 1,
            },
        ];
        assert_eq!(
            format_load_output(&sources, Path::new("/p")),
            vec![
                "Bibliography",
                "001 publications.bib (12 entries)",
                "002 talks/2019.bib (1 entry)",
                "Loaded 13 entries from 2 files",
            ]
        );
    }

    #[test]
    fn render_output_lists_documents() {
        let docs = vec![RenderedDocument {
            output: "cv".to_string(),
            html_path: PathBuf::from("/p/dist/cv.html"),
            sections: 1,
            citations: 15,
            items: 0,
            wants_pdf: true,
        }];
        assert_eq!(
            format_render_output(&docs, Path::new("/p")),
            vec![
                "Documents",
                "001 cv → dist/cv.html",
                "    1 section, 15 citations, 0 items",
                "Rendered 1 document",
            ]
        );
    }

    #[test]
    fn pdf_output_shows_sizes() {
        let printed = vec![PrintedDocument {
            output: "cv".to_string(),
            pdf_path: PathBuf::from("/p/dist/cv.pdf"),
            bytes: 49_357,
        }];
        assert_eq!(
            format_pdf_output(&printed, Path::new("/p")),
            vec!["PDF", "001 cv → dist/cv.pdf (48.2 KB)", "Printed 1 PDF"]
        );
    }

    #[test]
    fn pdf_output_empty() {
        assert_eq!(
            format_pdf_output(&[], Path::new("/p")),
            vec!["PDF", "Printed 0 PDFs"]
        );
    }

    #[test]
    fn check_output_totals_citations() {
        let doc = crate::config::DocumentConfig::default();
        let resolved = vec![ResolvedDocument {
            document: &doc,
            title: "CV".to_string(),
            sections: vec![],
        }];
        assert_eq!(
            format_check_output(&resolved),
            vec!["001 cv (0 sections, 0 citations)", "Checked 1 document, 0 citations resolved"]
        );
    }

    #[test]
    fn citations_key_then_html() {
        let lines = format_citations(&[
            ("A".to_string(), "Smith, J. (2020) T.".to_string()),
            ("B".to_string(), "Doe, J. (2019) U.".to_string()),
        ]);
        assert_eq!(
            lines,
            vec!["A", "    Smith, J. (2020) T.", "B", "    Doe, J. (2019) U."]
        );
    }
}
