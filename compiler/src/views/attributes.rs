//! Attribute Extraction
//!
//! Scans the raw body of an open tag for `name="value"` pairs.
//! Values are entity-decoded and interpolated, so every attribute
//! carries an expression ready for code generation.
//!

use crate::patterns::ATTRIBUTE;
use crate::views::entities;
use crate::views::interpolate::{Interpolation, interpolate, quote};

// ------------------------------------------------------------- Public Types

/// A single tag attribute with its interpolated value.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Interpolation,
}

// ------------------------------------------------------------- Public Functions

/// Extracts attributes from a tag body in source order. Only
/// double-quoted values are recognized and anything else is
/// skipped. A repeated name keeps its first position but takes
/// the last value.
///
pub fn extract_attributes(body: &str) -> Vec<Attribute> {
    let mut attributes: Vec<Attribute> = Vec::new();

    for captures in ATTRIBUTE.captures_iter(body) {
        let name = &captures[1];
        let value = interpolate(&entities::decode(&captures[2]));

        match attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    attributes
}

/// Finds an attribute by name.
///
pub fn find<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|attr| attr.name == name)
}

/// Finds an attribute by name and returns its value when it
/// holds no script.
///
pub fn literal(attributes: &[Attribute], name: &str) -> Option<String> {
    find(attributes, name).and_then(|attr| attr.value.as_literal())
}

/// Serializes attributes into an object literal expression.
///
pub fn attributes_to_object(attributes: &[Attribute]) -> String {
    object_literal(
        attributes
            .iter()
            .map(|attr| (attr.name.as_str(), attr.value.to_expression())),
    )
}

/// Joins `(name, expression)` pairs into an object literal, one
/// property per line.
///
pub fn object_literal<'a>(entries: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let properties: Vec<String> = entries
        .into_iter()
        .map(|(name, expression)| format!("{}:{}", quote(name), expression))
        .collect();

    format!("{{{}}}", properties.join(",\n"))
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(attributes: &[Attribute]) -> Vec<&str> {
        attributes.iter().map(|attr| attr.name.as_str()).collect()
    }

    // ----------------------------------------- extract_attributes tests

    #[test]
    fn test_extract_empty() {
        assert!(extract_attributes("").is_empty());
    }

    #[test]
    fn test_extract_string_attributes() {
        let attributes = extract_attributes(" a=\"b\" c=\"d\"");

        assert_eq!(names(&attributes), vec!["a", "c"]);
        assert_eq!(literal(&attributes, "a"), Some("b".to_string()));
        assert_eq!(literal(&attributes, "c"), Some("d".to_string()));
    }

    #[test]
    fn test_extract_ignores_malformed() {
        let attributes = extract_attributes("a='b' c d=e f=\"g\"");
        assert_eq!(names(&attributes), vec!["f"]);
    }

    #[test]
    fn test_extract_decodes_entities() {
        let attributes = extract_attributes("title=\"a &amp; b\"");
        assert_eq!(literal(&attributes, "title"), Some("a & b".to_string()));
    }

    #[test]
    fn test_extract_duplicate_last_wins() {
        let attributes = extract_attributes("a=\"1\" b=\"2\" a=\"3\"");

        assert_eq!(names(&attributes), vec!["a", "b"]);
        assert_eq!(literal(&attributes, "a"), Some("3".to_string()));
    }

    #[test]
    fn test_extract_dynamic_value() {
        let attributes = extract_attributes("foo=\"<%- bar %>\" x=\"5\"");

        assert!(!find(&attributes, "foo").unwrap().value.is_literal());
        assert_eq!(literal(&attributes, "foo"), None);
    }

    // ----------------------------------------- attributes_to_object tests

    #[test]
    fn test_attributes_to_object() {
        let attributes = extract_attributes("a=\"1\" b=\"2\"");
        assert_eq!(attributes_to_object(&attributes), "{\"a\":\"1\",\n\"b\":\"2\"}");
    }

    #[test]
    fn test_attributes_to_object_empty() {
        assert_eq!(attributes_to_object(&[]), "{}");
    }
}
