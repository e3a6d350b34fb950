//! Shared test utilities for the cv-press test suite.
//!
//! Provides fixture setup, in-memory bibliography builders, and a canned
//! [`CitationSource`] for render tests that should not depend on BibTeX.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let e = entry("Smith2020", "article", &[("author", "Smith, John"), ("year", "2020")]);
//! let lib = library_of(vec![e]);
//! assert!(lib.get("Smith2020").is_some());
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::bib::{BibEntry, Library};
use crate::cite::{CitationSource, CiteError};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/project/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/project");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Bibliography builders
// =========================================================================

/// Build an entry from `(field, raw value)` pairs.
pub fn entry(key: &str, entry_type: &str, fields: &[(&str, &str)]) -> BibEntry {
    BibEntry {
        key: key.to_string(),
        entry_type: entry_type.to_string(),
        fields: fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        source: PathBuf::from("test.bib"),
    }
}

/// A library holding exactly `entries`. Panics on duplicate keys.
pub fn library_of(entries: Vec<BibEntry>) -> Library {
    let mut library = Library::default();
    for e in entries {
        library.insert(e).unwrap();
    }
    library
}

// =========================================================================
// Canned citation source
// =========================================================================

/// Resolves keys from a fixed table; unknown keys fail like the real formatter.
pub struct MockSource {
    citations: HashMap<String, String>,
}

impl MockSource {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            citations: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl CitationSource for MockSource {
    fn reference(&self, key: &str) -> Result<String, CiteError> {
        self.citations
            .get(key)
            .cloned()
            .ok_or_else(|| CiteError::UnknownKey(key.to_string()))
    }
}
