//! Bibliography loading.
//!
//! Reads BibTeX files with the `biblatex` crate and flattens every record into
//! a [`BibEntry`]: a citation key, a lowercase type tag, and raw field text.
//!
//! ## Raw field text
//!
//! `biblatex` resolves a field into chunks, dropping the outer delimiters and
//! decoding most TeX commands. Brace-protected groups come back as verbatim
//! chunks; they are re-wrapped in braces here so the formatter still sees
//! `{Smith, John} and {Doe, Jane*}` as two grouped names. Anything the parser
//! leaves undecoded is handled later by [`crate::fields`].
//!
//! ## Key uniqueness
//!
//! Citation keys must be unique across every loaded source. A key seen twice
//! fails the whole load with [`BibError::DuplicateKey`], naming both files.

use biblatex::{Bibliography, Chunk, ParseErrorKind, Spanned};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BibError {
    #[error("Cannot read bibliography {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse bibliography {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Duplicate citation key '{key}' in {second} (first defined in {first})")]
    DuplicateKey {
        key: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Cannot walk bibliography directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// One bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub key: String,
    /// Lowercase entry type as written in the source (`article`, `techreport`, …).
    pub entry_type: String,
    /// Lowercase field name → raw value.
    pub fields: BTreeMap<String, String>,
    /// File the entry was loaded from.
    pub source: PathBuf,
}

impl BibEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Entry count for one loaded file, reported by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub path: PathBuf,
    pub entries: usize,
}

/// All loaded entries, keyed by citation key. Immutable once built.
#[derive(Debug, Default)]
pub struct Library {
    entries: BTreeMap<String, BibEntry>,
    sources: Vec<SourceSummary>,
}

impl Library {
    /// Load every file in order. Directories contribute all `*.bib` files
    /// beneath them, sorted by path.
    pub fn load(paths: &[PathBuf]) -> Result<Self, BibError> {
        let mut library = Self::default();
        for path in expand_sources(paths)? {
            let content = fs::read_to_string(&path).map_err(|source| BibError::Io {
                path: path.clone(),
                source,
            })?;
            library.add_source(&path, &content)?;
        }
        Ok(library)
    }

    /// Parse `content` and merge its entries, rejecting keys already present.
    pub fn add_source(&mut self, path: &Path, content: &str) -> Result<(), BibError> {
        let entries = parse_entries(path, content)?;
        let count = entries.len();
        for entry in entries {
            self.insert(entry)?;
        }
        self.sources.push(SourceSummary {
            path: path.to_path_buf(),
            entries: count,
        });
        Ok(())
    }

    /// Add a single entry, rejecting a key already present.
    pub fn insert(&mut self, entry: BibEntry) -> Result<(), BibError> {
        if let Some(existing) = self.entries.get(&entry.key) {
            return Err(BibError::DuplicateKey {
                key: entry.key,
                first: existing.source.clone(),
                second: entry.source,
            });
        }
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&BibEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sources(&self) -> &[SourceSummary] {
        &self.sources
    }

    pub fn iter(&self) -> impl Iterator<Item = &BibEntry> {
        self.entries.values()
    }
}

/// Parse one BibTeX source into entries, in file order.
pub fn parse_entries(path: &Path, content: &str) -> Result<Vec<BibEntry>, BibError> {
    let bibliography = Bibliography::parse(content).map_err(|e| match e.kind {
        ParseErrorKind::DuplicateKey(key) => BibError::DuplicateKey {
            key,
            first: path.to_path_buf(),
            second: path.to_path_buf(),
        },
        _ => BibError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    })?;
    Ok(bibliography
        .iter()
        .map(|entry| BibEntry {
            key: entry.key.clone(),
            entry_type: entry.entry_type.to_string().to_lowercase(),
            fields: entry
                .fields
                .iter()
                .map(|(name, chunks)| (name.to_lowercase(), raw_text(chunks)))
                .collect(),
            source: path.to_path_buf(),
        })
        .collect())
}

/// Rebuild raw field text from parsed chunks, re-bracing protected groups.
fn raw_text(chunks: &[Spanned<Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            Chunk::Normal(s) => s.clone(),
            Chunk::Verbatim(s) => format!("{{{s}}}"),
            Chunk::Math(s) => format!("${s}$"),
        })
        .collect()
}

/// Replace directories with the `.bib` files they contain.
fn expand_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>, BibError> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path) {
                let entry = entry?;
                let p = entry.path();
                if entry.file_type().is_file()
                    && p.extension().is_some_and(|e| e.eq_ignore_ascii_case("bib"))
                {
                    found.push(p.to_path_buf());
                }
            }
            found.sort();
            out.extend(found);
        } else {
            out.push(path.clone());
        }
    }
    Ok(out)
}
