//! Snippet cleanup: turns a raw, markup-polluted excerpt into readable prose.
//!
//! Cleaning is a fixed sequence of pure stages. Each stage is exposed on its
//! own so it can be exercised in isolation; [`clean_snippet`] runs them in
//! order:
//!
//! 1. [`strip_markup`]: decode HTML entities, replace tags with a space
//! 2. [`cut_truncation_markers`]: drop everything after `[+` or `…`
//! 3. [`remove_byline_noise`]: drop `D/M Outlet` aggregator bylines
//! 4. [`normalize_bullets`]: bullets and dashes become `". "`
//! 5. [`collapse_whitespace`]: newlines and whitespace runs become one space
//! 6. [`trim_incomplete_tail`]: cut a dangling word back to the last period
//! 7. trim
//!
//! Markup must go first: entities can hide the characters later stages match on.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("ENTITY regex should compile")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("TAG regex should compile"));
static BYLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{1,2}/\d{1,2}\s+[A-Z][A-Za-z\s.&-]{2,40}").expect("BYLINE regex should compile")
});
static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[•◦▪–\-]\s*").expect("BULLET regex should compile"));
static NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("NEWLINES regex should compile"));
static MULTI_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("MULTI_SPACE regex should compile"));
static TAIL_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-zА-Яа-яІіЇїЄєҐґ]{1,5}$").expect("TAIL_FRAGMENT regex should compile")
});

/// Markers aggregators append where they cut the article body.
const TRUNCATION_MARKERS: [&str; 2] = ["[+", "…"];

/// Run the full cleaning pipeline over a raw snippet.
///
/// The result is stable under re-cleaning: `clean_snippet(&clean_snippet(x))`
/// equals `clean_snippet(x)`.
pub fn clean_snippet(raw: &str) -> String {
    let text = strip_markup(raw);
    let text = cut_truncation_markers(&text);
    let text = remove_byline_noise(text);
    let text = normalize_bullets(&text);
    let text = collapse_whitespace(&text);
    let text = trim_incomplete_tail(&text);
    text.trim().to_string()
}

/// Decode entities, then replace every `<...>` tag with a single space.
pub fn strip_markup(text: &str) -> String {
    let decoded = decode_html_entities(text);
    TAG.replace_all(&decoded, " ").into_owned()
}

/// Decode named and numeric HTML entities until none are left.
///
/// Decoding repeats so that double-escaped input (`&amp;lt;`) cannot decode
/// further on a later pass. Unknown names are left untouched.
pub fn decode_html_entities(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = ENTITY
            .replace_all(&current, |caps: &Captures| {
                let body = &caps[1];
                match decode_entity(body) {
                    Some(c) => c.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        if code == 0 {
            return None;
        }
        return char::from_u32(code);
    }

    let c = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "bull" => '•',
        "middot" => '·',
        "laquo" => '«',
        "raquo" => '»',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "euro" => '€',
        _ => return None,
    };
    Some(c)
}

/// Keep only the text before the first truncation marker.
pub fn cut_truncation_markers(text: &str) -> &str {
    TRUNCATION_MARKERS
        .iter()
        .filter_map(|marker| text.find(*marker))
        .min()
        .map_or(text, |idx| &text[..idx])
}

/// Remove `15/11 Reuters`-style date + outlet prefixes left by aggregators.
///
/// Repeats until no byline is left, since removing one can expose another.
pub fn remove_byline_noise(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = BYLINE.replace_all(&current, "").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Turn list glyphs into sentence separators so fragments read as prose.
pub fn normalize_bullets(text: &str) -> String {
    BULLET.replace_all(text, ". ").into_owned()
}

pub fn collapse_whitespace(text: &str) -> String {
    let text = NEWLINES.replace_all(text, " ");
    MULTI_SPACE.replace_all(&text, " ").into_owned()
}

/// Cut a dangling, cut-off word back to the last full sentence.
///
/// Only applies when the text ends in a letter *and* a period exists to
/// anchor on. Without an anchor the text is returned unchanged so the only
/// sentence is never thrown away.
pub fn trim_incomplete_tail(text: &str) -> &str {
    let trimmed = text.trim_end();
    if TAIL_FRAGMENT.is_match(trimmed) {
        if let Some(last_dot) = trimmed.rfind('.') {
            return &trimmed[..=last_dot];
        }
    }
    text
}
