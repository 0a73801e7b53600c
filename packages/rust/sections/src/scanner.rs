//! Heading scanner for renderer-generated HTML.
//!
//! The input comes from a known renderer, so headings are located with a
//! small set of ordered regexes rather than a full HTML parse. Assumed
//! grammar subset:
//! - `<h2>`/`<h3>` elements never nest
//! - attributes never contain an unescaped `>`
//! - a heading's closing tag matches its opening level
//!
//! Anything outside that subset is simply not matched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use cardfeed_shared::{Heading, HeadingLevel};

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `<h2 ...>inner</h2>`, case-insensitive, across lines.
static H2_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&heading_pattern(2)).expect("H2 regex"));

/// Matches `<h3 ...>inner</h3>`.
static H3_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&heading_pattern(3)).expect("H3 regex"));

/// Heading element of level `n` whose inner text never contains another
/// `<hN` opening, so a dangling opening tag cannot swallow the next heading.
fn heading_pattern(n: u8) -> String {
    format!(r"(?is)<h{n}\b[^>]*>((?:[^<]|<[^h<]|<h[^{n}<]|<h{n}\w)*?)</h{n}\s*>")
}

/// Any tag, used to strip inner markup from heading text.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

/// Runs of whitespace.
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Named and numeric character references.
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("entity regex")
});

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Locate every H2 and H3 heading, ordered by start offset.
///
/// Never fails: unterminated or malformed headings are skipped.
pub fn scan_headings(html: &str) -> Vec<Heading> {
    let mut headings: Vec<Heading> = H2_RE
        .captures_iter(html)
        .map(|caps| to_heading(HeadingLevel::H2, &caps))
        .chain(
            H3_RE
                .captures_iter(html)
                .map(|caps| to_heading(HeadingLevel::H3, &caps)),
        )
        .collect();

    headings.sort_by_key(|h| h.start);
    headings
}

fn to_heading(level: HeadingLevel, caps: &Captures<'_>) -> Heading {
    let whole = caps.get(0).expect("group 0 always present");
    Heading {
        level,
        text: heading_text(&caps[1]),
        start: whole.start(),
        end: whole.end(),
    }
}

/// Strip inner markup, decode entities, collapse whitespace, trim.
pub fn heading_text(inner_html: &str) -> String {
    let without_tags = TAG_RE.replace_all(inner_html, "");
    let decoded = decode_entities(&without_tags);
    WS_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Decode the character references a markdown renderer emits in headings.
///
/// Unknown named references are left untouched.
pub fn decode_entities(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(name)
            };

            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
