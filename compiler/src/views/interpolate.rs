//! String Interpolation
//!
//! Rewrites attribute values and text that embed `<% %>` script
//! segments. The result renders either as a quoted literal or as
//! a self-invoking accumulator expression in the generated code,
//! and compiles into a block of literal/echo pieces for the
//! runtime interpreter.
//!

use crate::script::{self, BlockBuilder, Expr, Node, Scope, ScriptError};

// ------------------------------------------------------------- Public Types

/// One piece of a raw string split on script delimiters.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Plain text copied to the output.
    ///
    Literal(String),
    /// `<%- expr %>` or `<%= expr %>`, holding the trimmed expression.
    ///
    Echo(String),
    /// `<% stmt %>`, holding the trimmed statement.
    ///
    Control(String),
}

/// An attribute value or text run after interpolation. Keeps the
/// segments in source order.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    pub segments: Vec<Segment>,
}

/// Output piece of a compiled interpolation.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Literal(String),
    Echo(Expr),
}

/// Compiled interpolation: literal and echo pieces wrapped in the
/// blocks opened by control segments.
///
pub type CompiledText = Vec<Node<Piece>>;

// ------------------------------------------------------------- Public Implementations

impl Interpolation {
    /// True when no script segment is present.
    ///
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    /// The plain string value, if the interpolation is literal.
    ///
    pub fn as_literal(&self) -> Option<String> {
        if !self.is_literal() {
            return None;
        }

        Some(
            self.segments
                .iter()
                .map(|segment| match segment {
                    Segment::Literal(text) => text.as_str(),
                    _ => "",
                })
                .collect(),
        )
    }

    /// Renders the target-language expression. Literals become a
    /// quoted string; anything with script becomes an accumulator
    /// function called with the surrounding `this`.
    ///
    pub fn to_expression(&self) -> String {
        if let Some(literal) = self.as_literal() {
            return quote(&literal);
        }

        let mut js = String::from("(function(){var out=\"");

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => js.push_str(&escape(text)),
                Segment::Echo(expr) => {
                    js.push_str("\"+(");
                    js.push_str(expr);
                    js.push_str(")+\"");
                }
                Segment::Control(statement) => {
                    js.push_str("\";");
                    js.push_str(statement);
                    if !statement.ends_with(['{', '}', ';']) {
                        js.push(';');
                    }
                    js.push_str("out+=\"");
                }
            }
        }

        js.push_str("\";return out;}).call(this)");
        js
    }

    /// Parses every script segment for the runtime interpreter.
    ///
    pub fn compile(&self) -> Result<CompiledText, ScriptError> {
        let mut builder = BlockBuilder::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => builder.push(Piece::Literal(text.clone())),
                Segment::Echo(expr) => {
                    builder.push(Piece::Echo(script::parse_expression(expr)?));
                }
                Segment::Control(statement) => {
                    for directive in script::parse_directives(statement)? {
                        builder.apply(directive)?;
                    }
                }
            }
        }

        builder.finish()
    }
}

// ------------------------------------------------------------- Public Functions

/// Splits a raw string on `<% … %>` delimiters. An opening `<%`
/// without a closing `%>` is kept as literal text.
///
pub fn interpolate(raw: &str) -> Interpolation {
    let mut segments = Vec::new();
    let mut rest = raw;

    while let Some(start) = rest.find("<%") {
        let Some(length) = rest[start + 2..].find("%>") else {
            break;
        };

        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }

        let payload = rest[start + 2..start + 2 + length].trim();
        segments.push(match payload.strip_prefix(['-', '=']) {
            Some(expr) => Segment::Echo(expr.trim().to_string()),
            None => Segment::Control(payload.to_string()),
        });

        rest = &rest[start + 2 + length + 2..];
    }

    if !rest.is_empty() || segments.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }

    Interpolation { segments }
}

/// Evaluates a compiled interpolation to its output string.
///
pub fn render(text: &[Node<Piece>], scope: &mut Scope) -> Result<String, ScriptError> {
    let mut out = String::new();

    scope.scoped(|scope| {
        script::walk(text, scope, &mut |piece, scope| -> Result<(), ScriptError> {
            match piece {
                Piece::Literal(literal) => out.push_str(literal),
                Piece::Echo(expr) => {
                    out.push_str(&script::display(&script::evaluate(expr, scope)?));
                }
            }
            Ok(())
        })
    })?;

    Ok(out)
}

/// Quotes a string as a double-quoted target-language literal.
///
pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

/// Escapes a string for use between double quotes.
///
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            _ => escaped.push(c),
        }
    }

    escaped
}

// ------------------------------------------------------------- Unit Tests
