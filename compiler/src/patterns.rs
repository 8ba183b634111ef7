//! Regex Patterns
//!
//! Static regex patterns shared by the template lexer, the
//! stylesheet lexer and the property expanders. Uses LazyLock
//! for one-time compilation at first access.
//!

use regex::Regex;
use std::sync::LazyLock;

// ------------------------------------------------------------- Public Consts

/// Captures `name="value"` pairs inside an open tag. Only double
/// quotes delimit values.
///
pub static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)([\w-]+)\s*=\s*"([^"]*)""#).unwrap());

/// Valid open and close tag names.
///
pub static TAG_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]+$").unwrap());

/// Finds `<link ...>` tags without tokenizing the template. Used
/// by staleness checks to discover linked stylesheets.
///
pub static LINK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<link\s[^>]*>").unwrap());

/// A script identifier, as bound by `<link rel="require">`.
///
pub static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").unwrap());

pub static STYLESHEET_REL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\srel\s*=\s*"stylesheet""#).unwrap());

pub static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\shref\s*=\s*"([^"]+)""#).unwrap());

/// Stylesheet `/* */` comments, possibly spanning lines.
///
pub static STYLE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

/// Separates the clauses of an `@media` header.
///
pub static MEDIA_AND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\band\b").unwrap());

/// Class and id names after the leading `.` or `#`.
///
pub static SELECTOR_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]+$").unwrap());

/// Splits a `font` shorthand like `bold italic 12 Helvetica`
/// into weight, style, size and family.
///
pub static FONT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(normal|bold)? ?(normal|italic)? ?(\d+\w*)? ?(.+)?$").unwrap()
});

/// Splits a `border` shorthand like `2 #000` into width and color.
///
pub static BORDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\w*)? ?(#[a-fA-F0-9]*)?$").unwrap());

/// A value wrapped in matching single or double quotes.
///
pub static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(?:"(.*)"|'(.*)')$"#).unwrap());
