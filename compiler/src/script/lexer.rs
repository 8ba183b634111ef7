//! Script Lexer
//!
//! Splits embedded script fragments into tokens. Fragments are
//! short (a single `<% %>` block or attribute echo) so the lexer
//! works eagerly over the whole fragment and hands the parser a
//! flat token list.
//!

use super::ScriptError;

// ------------------------------------------------------------- Public Types

/// A lexical unit of the embedded script language.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Punct(&'static str),
}

// ------------------------------------------------------------- Private Consts

/// Multi-character operators first so the longest match wins.
///
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "[", "]", "{", "}", ".", ",",
    ";", "?", ":", "!", "+", "-", "*", "/", "%", "<", ">", "=",
];

// ------------------------------------------------------------- Public Functions

/// Tokenizes a script fragment. Fails on characters outside the
/// supported grammar and on unterminated string literals.
///
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }

        if c == '"' || c == '\'' {
            let (value, consumed) = take_string(rest, c, source)?;
            tokens.push(Token::Str(value));
            rest = &rest[consumed..];
            continue;
        }

        if c.is_ascii_digit() {
            let (value, consumed) = take_number(rest, source)?;
            tokens.push(Token::Number(value));
            rest = &rest[consumed..];
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let end = rest
                .char_indices()
                .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_' || *ch == '$'))
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            tokens.push(Token::Ident(rest[..end].to_string()));
            rest = &rest[end..];
            continue;
        }

        match PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            Some(p) => {
                tokens.push(Token::Punct(*p));
                rest = &rest[p.len()..];
            }
            None => {
                return Err(ScriptError::Syntax {
                    fragment: source.to_string(),
                    message: format!("unexpected character '{}'", c),
                });
            }
        }
    }

    Ok(tokens)
}

// ------------------------------------------------------------- Private Functions

/// Reads a quoted string literal starting at the opening quote.
/// Supports the common backslash escapes. Returns the decoded
/// value and the number of bytes consumed including quotes.
///
fn take_string(input: &str, quote: char, source: &str) -> Result<(String, usize), ScriptError> {
    let mut value = String::new();
    let mut chars = input.char_indices().skip(1);

    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok((value, i + 1));
        }

        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, other)) => value.push(other),
                None => break,
            }
        } else {
            value.push(c);
        }
    }

    Err(ScriptError::Syntax {
        fragment: source.to_string(),
        message: "unterminated string literal".to_string(),
    })
}

/// Reads a decimal number literal with an optional fraction.
///
fn take_number(input: &str, source: &str) -> Result<(f64, usize), ScriptError> {
    let mut end = 0;
    let mut seen_dot = false;

    for (i, c) in input.char_indices() {
        if c.is_ascii_digit() {
            end = i + 1;
        } else if c == '.'
            && !seen_dot
            && input[i + 1..].starts_with(|n: char| n.is_ascii_digit())
        {
            seen_dot = true;
            end = i + 1;
        } else {
            break;
        }
    }

    input[..end]
        .parse::<f64>()
        .map(|n| (n, end))
        .map_err(|_| ScriptError::Syntax {
            fragment: source.to_string(),
            message: format!("invalid number '{}'", &input[..end]),
        })
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_member_call() {
        let tokens = tokenize("this.foo.toUpperCase()").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("this".to_string()),
                Token::Punct("."),
                Token::Ident("foo".to_string()),
                Token::Punct("."),
                Token::Ident("toUpperCase".to_string()),
                Token::Punct("("),
                Token::Punct(")"),
            ]
        );
    }

    #[test]
    fn test_tokenize_longest_operator_wins() {
        let tokens = tokenize("a !== b").unwrap();
        assert_eq!(tokens[1], Token::Punct("!=="));
    }

    #[test]
    fn test_tokenize_numbers_and_strings() {
        let tokens = tokenize("i + 1.5 + 'x\\'y'").unwrap();
        assert_eq!(tokens[2], Token::Number(1.5));
        assert_eq!(tokens[4], Token::Str("x'y".to_string()));
    }

    #[test]
    fn test_tokenize_number_then_member() {
        // "1." followed by a non-digit is not a fraction
        let tokens = tokenize("1.toFixed").unwrap();
        assert_eq!(tokens[0], Token::Number(1.0));
        assert_eq!(tokens[1], Token::Punct("."));
    }

    #[test]
    fn test_tokenize_unterminated_string() {
        assert!(matches!(
            tokenize("\"abc"),
            Err(ScriptError::Syntax { .. })
        ));
    }

    #[test]
    fn test_tokenize_unknown_character() {
        assert!(tokenize("a # b").is_err());
    }
}
