//! Stylesheet Lexer
//!
//! Splits stylesheet source on `{ } ; ,` and classifies each word
//! into selector, declaration and block tokens. Conditional
//! `@media` headers open blocks that may nest.
//!

use crate::patterns::{MEDIA_AND, SELECTOR_NAME, STYLE_COMMENT};
use crate::styles::StyleError;

// ------------------------------------------------------------- Public Types

/// Represents a token produced by the stylesheet lexer.
///
#[derive(Debug, Clone, PartialEq)]
pub enum StyleToken {
    Class(String),
    Id(String),
    Property { name: String, value: String },
    /// Clauses of an `@media` header, split on `and`.
    ///
    MediaQuery(Vec<String>),
    BeginDeclarationBlock,
    EndDeclarationBlock,
    BeginMediaQueryBlock,
    EndMediaQueryBlock,
}

// ------------------------------------------------------------- Private Types

/// Lexer state carried between words.
///
#[derive(Default)]
struct Lexer {
    tokens: Vec<StyleToken>,
    in_declaration_block: bool,
    media_query_depth: usize,
    expect_media_query_block: bool,
    /// Set by a `,` inside a declaration block. The next word
    /// extends the previous property value.
    ///
    continue_value: bool,
}

// ------------------------------------------------------------- Private Implementations

impl Lexer {
    fn tokenize(mut self, words: Vec<&str>) -> Result<Vec<StyleToken>, StyleError> {
        for word in words {
            self.word(word)?;
        }

        if self.in_declaration_block || self.media_query_depth > 0 || self.expect_media_query_block {
            return Err(StyleError::UnclosedBlock);
        }

        if self.has_pending_selector() {
            return Err(unexpected(self.last_selector()));
        }

        Ok(self.tokens)
    }

    fn word(&mut self, word: &str) -> Result<(), StyleError> {
        if self.continue_value && word != ";" && word != "}" {
            return self.extend_value(word);
        }
        self.continue_value = false;

        match word {
            "{" if self.expect_media_query_block => {
                self.expect_media_query_block = false;
                self.media_query_depth += 1;
                self.tokens.push(StyleToken::BeginMediaQueryBlock);
            }
            "{" => {
                if self.in_declaration_block || !self.has_pending_selector() {
                    return Err(unexpected(word));
                }
                self.in_declaration_block = true;
                self.tokens.push(StyleToken::BeginDeclarationBlock);
            }
            "}" if self.in_declaration_block => {
                self.in_declaration_block = false;
                self.tokens.push(StyleToken::EndDeclarationBlock);
            }
            "}" if self.media_query_depth > 0 && !self.has_pending_selector() => {
                self.media_query_depth -= 1;
                self.tokens.push(StyleToken::EndMediaQueryBlock);
            }
            ";" if !self.has_pending_selector() => {}
            "," if self.in_declaration_block => {
                if !matches!(self.tokens.last(), Some(StyleToken::Property { .. })) {
                    return Err(unexpected(word));
                }
                self.continue_value = true;
            }
            _ if self.in_declaration_block => self.property(word)?,
            _ if self.expect_media_query_block || self.has_pending_selector() => {
                return Err(unexpected(word));
            }
            _ if word.starts_with("@media") => self.media_query(word)?,
            _ => self.selector(word)?,
        }

        Ok(())
    }

    fn property(&mut self, word: &str) -> Result<(), StyleError> {
        let Some((name, value)) = word.split_once(':') else {
            return Err(unexpected(word));
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(unexpected(word));
        }

        self.tokens.push(StyleToken::Property {
            name: name.to_string(),
            value: value.trim().to_string(),
        });
        Ok(())
    }

    fn extend_value(&mut self, word: &str) -> Result<(), StyleError> {
        self.continue_value = false;

        match self.tokens.last_mut() {
            Some(StyleToken::Property { value, .. }) => {
                value.push_str(", ");
                value.push_str(word);
                Ok(())
            }
            _ => Err(unexpected(word)),
        }
    }

    fn media_query(&mut self, word: &str) -> Result<(), StyleError> {
        let conditions: Vec<String> = MEDIA_AND
            .split(&word["@media".len()..])
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(str::to_string)
            .collect();

        if conditions.is_empty() {
            return Err(unexpected(word));
        }

        self.expect_media_query_block = true;
        self.tokens.push(StyleToken::MediaQuery(conditions));
        Ok(())
    }

    fn selector(&mut self, word: &str) -> Result<(), StyleError> {
        let token = if let Some(name) = word.strip_prefix('.') {
            StyleToken::Class(name.to_string())
        } else if let Some(name) = word.strip_prefix('#') {
            StyleToken::Id(name.to_string())
        } else {
            return Err(unexpected(word));
        };

        if !SELECTOR_NAME.is_match(&word[1..]) {
            return Err(unexpected(word));
        }

        self.tokens.push(token);
        Ok(())
    }

    /// True when the last token is a selector still waiting for
    /// its declaration block.
    ///
    fn has_pending_selector(&self) -> bool {
        matches!(
            self.tokens.last(),
            Some(StyleToken::Class(_) | StyleToken::Id(_))
        )
    }

    fn last_selector(&self) -> String {
        match self.tokens.last() {
            Some(StyleToken::Class(name)) => format!(".{}", name),
            Some(StyleToken::Id(name)) => format!("#{}", name),
            _ => String::new(),
        }
    }
}

// ------------------------------------------------------------- Public Functions

/// Removes comments and splits source on `{ } ; ,`, keeping the
/// symbols as their own words. Words are trimmed and empty ones
/// dropped.
///
pub fn split_on_symbols(source: &str) -> Vec<String> {
    let source = STYLE_COMMENT.replace_all(source, "");
    let mut words = Vec::new();
    let mut start = 0;

    for (i, c) in source.char_indices() {
        if matches!(c, '{' | '}' | ';' | ',') {
            words.push(source[start..i].to_string());
            words.push(c.to_string());
            start = i + 1;
        }
    }
    words.push(source[start..].to_string());

    words
        .into_iter()
        .map(|word| word.trim().to_string())
        .filter(|word| !word.is_empty())
        .collect()
}

/// Tokenizes stylesheet source.
///
pub fn tokenize(source: &str) -> Result<Vec<StyleToken>, StyleError> {
    let words = split_on_symbols(source);
    Lexer::default().tokenize(words.iter().map(String::as_str).collect())
}

// ------------------------------------------------------------- Private Functions

fn unexpected(word: impl Into<String>) -> StyleError {
    StyleError::UnexpectedToken(word.into())
}

// ------------------------------------------------------------- Unit Tests
