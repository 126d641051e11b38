//! Version and description inference from file headers.
//!
//! Files in a release tree carry their metadata in whatever convention their
//! language uses: `# Version:` comment headers, bare `Version:` lines inside
//! docstrings, `__version__ = "..."` assignments, and so on. Rather than parse
//! each language, each convention is a [`Matcher`] and the rules are tried in
//! table order; the first hit wins. Supporting another dialect means adding a
//! row to [`VERSION_RULES`] or [`DESCRIPTION_RULES`].

use chrono::{DateTime, Local};
use regex::Regex;
use std::sync::LazyLock;
use std::time::SystemTime;

/// Takes the whole file text, returns a non-empty value on a match.
pub type Matcher = fn(&str) -> Option<String>;

pub const VERSION_RULES: &[(&str, Matcher)] = &[
    ("comment-header", comment_version),
    ("bare-header", bare_version),
    ("assignment", assigned_version),
];

pub const DESCRIPTION_RULES: &[(&str, Matcher)] =
    &[("purpose-header", comment_purpose), ("docstring", docstring_summary)];

/// Only this many leading bytes are checked for NUL when sniffing binaries.
pub const BINARY_SNIFF_LEN: usize = 8 * 1024;

const DOCSTRING: &str = "\"\"\"";

// Line comment markers across shell, python, C-like, lua/sql, ini, batch.
// A bare `*` (block comment continuation) needs trailing whitespace so
// Markdown bold like `**Version:**` is not read as a comment.
const COMMENT: &str = r"(?:#+|//+|--+|;+|/\*+|\*+[ \t]|%+|(?i:rem)\b)";

static COMMENT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?m)^[ \t]*{COMMENT}[ \t]*(?i:version):[ \t]*(\S+)"))
        .expect("comment version pattern")
});

static BARE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Version:[ \t]*(\S+)").expect("bare version pattern"));

static ASSIGNED_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?mi)^[ \t]*(?:(?:export|readonly|declare|local|const|let|var|static)[ \t]+)*(?:[a-z0-9_]*_)?version_*[ \t]*(?::[^=\r\n]*)?=[ \t]*(?:"([^"\r\n]+)"|'([^'\r\n]+)')"#,
    )
    .expect("assigned version pattern")
});

static COMMENT_PURPOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?m)^[ \t]*{COMMENT}[ \t]*Purpose:([^\r\n]*)"))
        .expect("purpose pattern")
});

/// Outcome of running the rule tables over one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extracted {
    pub version: String,
    pub description: String,
    /// Name of the version rule that matched; `None` means the date fallback.
    pub version_rule: Option<&'static str>,
}

/// Best-effort `(version, description)` for a file. Never fails: when no rule
/// matches, the version is the modification date and the description is empty.
pub fn extract(content: &[u8], modified: SystemTime) -> Extracted {
    if looks_binary(content) {
        return Extracted {
            version: date_version(modified),
            description: String::new(),
            version_rule: None,
        };
    }
    let text = String::from_utf8_lossy(content);
    let (version, version_rule) = match first_match(VERSION_RULES, &text) {
        Some((rule, v)) => (v, Some(rule)),
        None => (date_version(modified), None),
    };
    let description = first_match(DESCRIPTION_RULES, &text)
        .map(|(_, d)| sanitize_description(&d))
        .unwrap_or_default();
    Extracted { version, description, version_rule }
}

/// Runs `rules` in order and returns the first rule name and value found.
pub fn first_match(rules: &[(&'static str, Matcher)], text: &str) -> Option<(&'static str, String)> {
    rules.iter().find_map(|(name, rule)| rule(text).map(|v| (*name, v)))
}

pub fn infer_version(text: &str) -> Option<String> {
    first_match(VERSION_RULES, text).map(|(_, v)| v)
}

pub fn infer_description(text: &str) -> String {
    first_match(DESCRIPTION_RULES, text).map(|(_, d)| sanitize_description(&d)).unwrap_or_default()
}

/// `YYYY.MM.DD` in local time.
pub fn date_version(modified: SystemTime) -> String {
    DateTime::<Local>::from(modified).format("%Y.%m.%d").to_string()
}

/// Tabs become single spaces and line breaks are dropped. Quote and backslash
/// escaping is left to the JSON serializer.
pub fn sanitize_description(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| if c == '\t' { ' ' } else { c })
        .collect()
}

pub fn looks_binary(content: &[u8]) -> bool {
    content[..content.len().min(BINARY_SNIFF_LEN)].contains(&0)
}

fn comment_version(text: &str) -> Option<String> {
    COMMENT_VERSION.captures(text).map(|c| c[1].to_string())
}

fn bare_version(text: &str) -> Option<String> {
    BARE_VERSION.captures(text).map(|c| c[1].to_string())
}

fn assigned_version(text: &str) -> Option<String> {
    let caps = ASSIGNED_VERSION.captures(text)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
}

fn comment_purpose(text: &str) -> Option<String> {
    COMMENT_PURPOSE
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .find(|p| !p.is_empty())
}

/// Second line of the first `"""` block whose delimiters both sit at the
/// start of a line.
fn docstring_summary(text: &str) -> Option<String> {
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let Some(rest) = line.strip_prefix(DOCSTRING) else {
            continue;
        };
        if rest.contains(DOCSTRING) {
            // one-liner, not a block
            continue;
        }
        let second = lines.next()?;
        if second.starts_with(DOCSTRING) {
            continue;
        }
        if !lines.any(|l| l.starts_with(DOCSTRING)) {
            return None;
        }
        let summary = second.trim_start();
        return if summary.is_empty() { None } else { Some(summary.to_string()) };
    }
    None
}
