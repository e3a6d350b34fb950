//! Field-level text cleanup shared by every citation template.
//!
//! BibTeX values arrive as raw text: wrapped in one or two layers of braces,
//! sprinkled with TeX accent escapes, with `--` page ranges. Every template
//! runs its fields through the same small set of transforms before assembly:
//!
//! | Transform | Example |
//! |-----------|---------|
//! | [`strip_braces`] | `{{A Study}}` → `A Study` (n layers) |
//! | [`decode_tex`] | `M{\"{u}}ller` → `Müller` |
//! | [`page_range`] | `10--20` → `10–20` |
//! | [`italic`] / [`bold`] | `<i>Journal</i>`, `<b>5</b>` |
//! | [`collapse_periods`] | `Title..` → `Title.` |
//!
//! [`Field`] bundles these: it turns an optional raw value into
//! `Option<String>` so that "field absent" and "field present but empty after
//! cleanup" are the same thing to the templates.

use regex::Regex;
use std::sync::LazyLock;

static PERIOD_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{2,}").unwrap());
static AMPERSAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#?[A-Za-z0-9]+;)?").unwrap());

/// A TeX accent command on a single letter: `\"{u}`, `\'e`, `\~{a}`,
/// `\c{c}`, `\v s`.
const ACCENT: &str = r#"\\(["'`^~]|[cv](?:\s+|\b))\s*(?:\{([A-Za-z])\}|([A-Za-z]))"#;

static BRACED_ACCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\{{{ACCENT}\}}")).unwrap());
static BARE_ACCENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(ACCENT).unwrap());

/// Remove up to `layers` matching pairs of enclosing braces.
///
/// Only strips a pair when the opening brace at the start closes at the very
/// end, so `{A} and {B}` is left alone.
pub fn strip_braces(raw: &str, layers: usize) -> String {
    let mut s = raw.trim();
    for _ in 0..layers {
        if s.starts_with('{') && s.ends_with('}') && closes_at_end(s) {
            s = s[1..s.len() - 1].trim();
        } else {
            break;
        }
    }
    s.to_string()
}

/// Whether the brace opened at byte 0 is closed by the final byte.
fn closes_at_end(s: &str) -> bool {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == s.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Replace TeX accent escapes and escaped punctuation with plain Unicode.
///
/// Unknown letter/accent combinations are left untouched.
pub fn decode_tex(raw: &str) -> String {
    let decoded = replace_accents(&BRACED_ACCENT, raw);
    let decoded = replace_accents(&BARE_ACCENT, &decoded);
    decoded
        .replace(r"{\_}", "_")
        .replace(r"\_", "_")
        .replace(r"{\&}", "&")
        .replace(r"\&", "&")
}

/// Escape every `&` that does not already start an HTML entity.
///
/// biblatex resolves `\&` to a bare `&` while loading, so field values can
/// carry either form.
pub fn escape_ampersands(s: &str) -> String {
    AMPERSAND
        .replace_all(s, |caps: &regex::Captures| match caps.get(1) {
            Some(_) => caps[0].to_string(),
            None => "&amp;".to_string(),
        })
        .into_owned()
}

fn replace_accents(re: &Regex, s: &str) -> String {
    re.replace_all(s, |caps: &regex::Captures| {
        let accent = caps[1].trim();
        let letter = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match accented(accent, letter) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

fn accented(accent: &str, letter: &str) -> Option<char> {
    let c = match (accent, letter) {
        ("\"", "a") => 'ä',
        ("\"", "e") => 'ë',
        ("\"", "i") => 'ï',
        ("\"", "o") => 'ö',
        ("\"", "u") => 'ü',
        ("\"", "y") => 'ÿ',
        ("\"", "A") => 'Ä',
        ("\"", "E") => 'Ë',
        ("\"", "I") => 'Ï',
        ("\"", "O") => 'Ö',
        ("\"", "U") => 'Ü',
        ("'", "a") => 'á',
        ("'", "e") => 'é',
        ("'", "i") => 'í',
        ("'", "o") => 'ó',
        ("'", "u") => 'ú',
        ("'", "y") => 'ý',
        ("'", "c") => 'ć',
        ("'", "n") => 'ń',
        ("'", "s") => 'ś',
        ("'", "z") => 'ź',
        ("'", "A") => 'Á',
        ("'", "E") => 'É',
        ("'", "I") => 'Í',
        ("'", "O") => 'Ó',
        ("'", "U") => 'Ú',
        ("`", "a") => 'à',
        ("`", "e") => 'è',
        ("`", "i") => 'ì',
        ("`", "o") => 'ò',
        ("`", "u") => 'ù',
        ("`", "A") => 'À',
        ("`", "E") => 'È',
        ("^", "a") => 'â',
        ("^", "e") => 'ê',
        ("^", "i") => 'î',
        ("^", "o") => 'ô',
        ("^", "u") => 'û',
        ("~", "a") => 'ã',
        ("~", "n") => 'ñ',
        ("~", "o") => 'õ',
        ("~", "A") => 'Ã',
        ("~", "N") => 'Ñ',
        ("~", "O") => 'Õ',
        ("c", "c") => 'ç',
        ("c", "C") => 'Ç',
        ("c", "s") => 'ş',
        ("v", "c") => 'č',
        ("v", "s") => 'š',
        ("v", "z") => 'ž',
        ("v", "r") => 'ř',
        ("v", "C") => 'Č',
        ("v", "S") => 'Š',
        ("v", "Z") => 'Ž',
        _ => return None,
    };
    Some(c)
}

/// Turn a BibTeX `--` range separator into an en-dash.
pub fn page_range(pages: &str) -> String {
    pages.replace("--", "–")
}

pub fn italic(s: &str) -> String {
    format!("<i>{s}</i>")
}

pub fn bold(s: &str) -> String {
    format!("<b>{s}</b>")
}

/// Collapse any run of two or more periods into one.
///
/// Applied to every fully assembled citation. Several templates end a part
/// with a period unconditionally, so a title or journal that already ends in
/// one would otherwise produce `..`.
pub fn collapse_periods(s: &str) -> String {
    PERIOD_RUN.replace_all(s, ".").into_owned()
}

/// Hyperlink `text` to `url`.
pub fn link(url: &str, text: &str) -> String {
    format!(r#"<a href="{url}">{text}</a>"#)
}

/// Cleanup profile for one raw field value.
///
/// ```text
/// Field::plain()           {Elsevier}          → Elsevier
/// Field::title()           {{A Study}}         → A Study
/// Field::plain().pages()   {10--20}            → 10–20
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Field {
    layers: usize,
    pages: bool,
    trim_period: bool,
}

impl Field {
    pub fn plain() -> Self {
        Self {
            layers: 1,
            pages: false,
            trim_period: false,
        }
    }

    pub fn title() -> Self {
        Self {
            layers: 2,
            ..Self::plain()
        }
    }

    pub fn pages(self) -> Self {
        Self {
            pages: true,
            ..self
        }
    }

    /// Drop a trailing period, e.g. from abbreviated journal names
    /// (`Atmos. Environ.`) that the template terminates itself.
    pub fn trim_period(self) -> Self {
        Self {
            trim_period: true,
            ..self
        }
    }

    /// Clean a raw value. Absent and blank values both yield `None`.
    pub fn clean(&self, raw: Option<&str>) -> Option<String> {
        let mut s = escape_ampersands(&decode_tex(&strip_braces(raw?, self.layers)));
        if self.pages {
            s = page_range(&s);
        }
        // Leftover protective braces carry no meaning in HTML output.
        s.retain(|c| c != '{' && c != '}');
        let mut s = s.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.trim_period {
            while s.ends_with('.') {
                s.pop();
            }
        }
        (!s.is_empty()).then_some(s)
    }
}

/// Clean a URL: unescape underscores and drop braces and whitespace.
pub fn clean_url(raw: Option<&str>) -> Option<String> {
    let s = decode_tex(&strip_braces(raw?, 1));
    let s: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '{' && *c != '}')
        .collect();
    (!s.is_empty()).then_some(s)
}
