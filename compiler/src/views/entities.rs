//! XML Entity Decoding
//!
//! Decodes the five predefined XML character references in text
//! content and attribute values. Anything else that starts with
//! `&` is left untouched.
//!

use std::borrow::Cow;

// ------------------------------------------------------------- Private Consts

const ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&quot;", '"'),
    ("&apos;", '\''),
    ("&lt;", '<'),
    ("&gt;", '>'),
];

// ------------------------------------------------------------- Public Functions

/// Decodes entity references in a single left-to-right pass, so
/// `&amp;lt;` becomes `&lt;` and not `<`. Borrows the input when
/// it contains no `&`.
///
pub fn decode(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        rest = &rest[start..];

        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, c)) => {
                decoded.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }

    decoded.push_str(rest);
    Cow::Owned(decoded)
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_all_entities() {
        assert_eq!(
            decode("&lt;a href=&quot;x&quot;&gt; &amp; &apos;"),
            "<a href=\"x\"> & '"
        );
    }

    #[test]
    fn test_decode_borrows_plain_text() {
        assert!(matches!(decode("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_decode_single_pass() {
        assert_eq!(decode("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_decode_leaves_unknown_references() {
        assert_eq!(decode("a &nbsp; b & c"), "a &nbsp; b & c");
    }
}
