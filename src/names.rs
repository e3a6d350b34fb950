//! Author-list formatting.
//!
//! Turns a BibTeX author field into the citation's author block:
//!
//! ```text
//! {Tessum, Christopher W.*} and {Hill, Jason} and {Marshall, Julian D.}
//!   → Tessum, C.W.*, J. Hill, and J.D. Marshall
//! ```
//!
//! ## Layouts
//!
//! Each name goes through [`biblatex::Person`], so every BibTeX layout works:
//! `Family, Given`, `Given Family`, `von Family, Given` and
//! `Family, Jr., Given`. Particles stay with the family name and suffixes
//! follow it. A name wrapped whole in braces is unwrapped first when it holds a
//! comma (`{Smith, John}`), and is kept as one literal corporate author when it
//! does not (`{Smith and Sons}`).
//!
//! ## Output shapes
//!
//! - first author: `Family, F.M.`
//! - later authors: `F.M. Family`, or `Family, F.M.` with
//!   [`NameOrder::FamilyFirst`]
//! - two authors are joined with ` and `, three or more with `, ` and a final
//!   `, and `
//! - the BibTeX placeholder `others` is dropped
//!
//! ## Markers
//!
//! A `*` anywhere in a name marks the corresponding author. It is removed
//! before parsing and re-attached after the formatted name. Emphasis
//! (underlining the CV owner or advisees) is a separate pass over the
//! formatted name and never affects parsing.

use biblatex::{Chunk, Chunks, Person, Spanned};
use serde::{Deserialize, Serialize};

/// Layout of every author after the first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameOrder {
    /// `J.R. Smith`
    #[default]
    GivenFirst,
    /// `Smith, J.R.`
    FamilyFirst,
}

/// How author lists are rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameStyle {
    pub subsequent: NameOrder,
    /// Exact substrings of a formatted name to wrap in `<u>…</u>`.
    pub emphasize: Vec<String>,
}

/// One parsed author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    /// Family name with any particle, e.g. `de la Fontaine`.
    pub family: String,
    /// Initials including their periods, e.g. `J.R.` or `J.-P.`.
    pub initials: String,
    /// `Jr.`, `III` and the like; empty when absent.
    pub suffix: String,
    pub corresponding: bool,
}

impl Name {
    /// Parse one author, detecting which layout it was written in.
    ///
    /// Returns `None` for a name that is empty once markers and braces are
    /// removed.
    pub fn parse(raw: &str) -> Option<Self> {
        let corresponding = raw.contains('*');
        let cleaned: String = raw.chars().filter(|c| *c != '*').collect();
        let trimmed = cleaned.trim();
        let inner = strip_group(trimmed);
        if inner.trim().is_empty() {
            return None;
        }

        let wrapped = inner.len() != trimmed.len();
        if wrapped && split_top_level(inner, |c| c == ',', 1).len() < 2 {
            let family = ungroup(inner);
            return (!family.is_empty()).then(|| Self {
                family,
                initials: String::new(),
                suffix: String::new(),
                corresponding,
            });
        }

        Self::from_person(&Person::parse(&name_chunks(inner)), corresponding)
    }

    fn from_person(person: &Person, corresponding: bool) -> Option<Self> {
        let family = [person.prefix.trim(), person.name.trim()]
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let family = family.trim_end_matches(',').trim().to_string();
        if family.is_empty() || family == "others" {
            return None;
        }
        let initials = person
            .given_name
            .split_whitespace()
            .map(initials_of)
            .collect();
        Some(Self {
            family,
            initials,
            suffix: person.suffix.trim().to_string(),
            corresponding,
        })
    }

    fn family_with_suffix(&self) -> String {
        if self.suffix.is_empty() {
            self.family.clone()
        } else {
            format!("{} {}", self.family, self.suffix)
        }
    }

    /// `Smith, J.R.`
    pub fn family_first(&self) -> String {
        let family = self.family_with_suffix();
        let mut s = if self.initials.is_empty() {
            family
        } else {
            format!("{family}, {}", self.initials)
        };
        if self.corresponding {
            s.push('*');
        }
        s
    }

    /// `J.R. Smith`
    pub fn given_first(&self) -> String {
        let family = self.family_with_suffix();
        let mut s = if self.initials.is_empty() {
            family
        } else {
            format!("{} {family}", self.initials)
        };
        if self.corresponding {
            s.push('*');
        }
        s
    }
}

/// Split a raw author field on top-level ` and ` and parse each name.
pub fn parse_list(raw: &str) -> Vec<Name> {
    // Padding lets a dangling leading or trailing `and` split off as an empty
    // name.
    let normalized = format!(" {} ", raw.split_whitespace().collect::<Vec<_>>().join(" "));
    split_on_and(&normalized)
        .iter()
        .filter_map(|n| Name::parse(n))
        .collect()
}

/// Format a raw author field. Returns `None` when no author could be parsed.
pub fn format_authors(raw: &str, style: &NameStyle) -> Option<String> {
    let names = parse_list(raw);
    if names.is_empty() {
        return None;
    }
    let formatted: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let s = match (i, style.subsequent) {
                (0, _) | (_, NameOrder::FamilyFirst) => name.family_first(),
                (_, NameOrder::GivenFirst) => name.given_first(),
            };
            emphasize(&s, &style.emphasize)
        })
        .collect();
    Some(join_names(&formatted))
}

/// Wrap the first configured substring found in `name` in underline markup.
pub fn emphasize(name: &str, targets: &[String]) -> String {
    targets
        .iter()
        .filter(|t| !t.is_empty())
        .find(|t| name.contains(t.as_str()))
        .map(|t| name.replacen(t.as_str(), &format!("<u>{t}</u>"), 1))
        .unwrap_or_else(|| name.to_string())
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

/// Initials for one given-name token.
///
/// `John` → `J.`, `C.W.` → `C.W.`, `Jean-Paul` → `J.-P.`, `w.` → `W.`
fn initials_of(token: &str) -> String {
    token
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.split('.')
                .filter_map(|piece| piece.chars().find(|c| c.is_alphabetic()))
                .map(|c| format!("{}.", c.to_uppercase()))
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Chunk a name the way biblatex does: top-level brace groups are verbatim.
fn name_chunks(s: &str) -> Chunks {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '{' => {
                if depth == 0 && !buf.is_empty() {
                    chunks.push(Spanned::zero(Chunk::Normal(std::mem::take(&mut buf))));
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    chunks.push(Spanned::zero(Chunk::Verbatim(std::mem::take(&mut buf))));
                }
            }
            '}' => {}
            c => buf.push(c),
        }
    }
    if !buf.is_empty() {
        let chunk = if depth == 0 {
            Chunk::Normal(buf)
        } else {
            Chunk::Verbatim(buf)
        };
        chunks.push(Spanned::zero(chunk));
    }
    chunks
}

/// Remove every brace from a token.
fn ungroup(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Strip one pair of braces enclosing the whole string.
fn strip_group(s: &str) -> &str {
    let t = s.trim();
    if t.starts_with('{') && t.ends_with('}') && group_spans(t) {
        &t[1..t.len() - 1]
    } else {
        t
    }
}

fn group_spans(s: &str) -> bool {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 && i != s.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Split on `sep` characters outside braces, at most `max` times.
fn split_top_level(s: &str, sep: impl Fn(char) -> bool, max: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            c if depth == 0 && sep(c) && parts.len() < max => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}

/// Split on the word `and` outside braces, case-insensitively.
fn split_on_and(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b' ' if depth == 0 && bytes.len() >= i + 5 => {
                let window = &bytes[i..i + 5];
                if window.eq_ignore_ascii_case(b" and ") {
                    parts.push(&s[start..i]);
                    start = i + 5;
                    i += 5;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&s[start..]);
    parts
}
