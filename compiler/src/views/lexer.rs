//! Template Lexer
//!
//! Converts view template markup into a stream of tokens. Tags,
//! text, `<% %>` script blocks, comments and resource links are
//! recognized in a single left-to-right scan.
//!

use thiserror::Error;

use crate::patterns::{IDENTIFIER, TAG_NAME};
use crate::views::attributes::{self, Attribute, extract_attributes};
use crate::views::entities;

// ------------------------------------------------------------- Public Types

/// Represents a token produced by the lexer, in document order.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    OpenTag {
        name: String,
        attributes: Vec<Attribute>,
    },
    CloseTag {
        name: String,
    },
    /// Entity-decoded text content.
    ///
    Text {
        value: String,
    },
    /// Trimmed script payload. Echo blocks (`<%-` / `<%=`) have
    /// their marker removed.
    ///
    Script {
        value: String,
        is_echo: bool,
    },
    /// Body of a `<!-- -->` comment or a CDATA section.
    ///
    Comment {
        value: String,
    },
    /// A `<link>` tag. `attributes` holds everything besides
    /// `rel` and `href`.
    ///
    ResourceLink {
        rel: String,
        href: String,
        attributes: Vec<Attribute>,
    },
}

/// Errors that can occur during lexical analysis.
///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexerError {
    /// Markup that fits none of the recognized shapes. Carries the
    /// offending fragment and its byte offset in the template.
    ///
    #[error("unexpected token `{fragment}` at byte {position}: {reason}")]
    UnexpectedToken {
        fragment: String,
        position: usize,
        reason: &'static str,
    },
}

// ------------------------------------------------------------- Private Consts

/// Longest fragment quoted back in an error message.
///
const FRAGMENT_LIMIT: usize = 60;

// ------------------------------------------------------------- Private Types

/// Internal lexer state tracking the remaining input, current
/// position for error reporting, and accumulated tokens.
///
struct Lexer<'a> {
    /// Remaining input to be processed.
    ///
    input: &'a str,
    /// Byte offset of `input` within the prepared template.
    ///
    position: usize,
    /// Raw text collected since the last structural token.
    ///
    text: String,
    /// Accumulated tokens.
    ///
    tokens: Vec<Token>,
}

// ------------------------------------------------------------- Private Implementations

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            text: String::new(),
            tokens: Vec::new(),
        }
    }

    /// Main tokenization loop. Dispatches on the prefix at the
    /// current position until the input is exhausted.
    ///
    fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.input.is_empty() {
            if self.input.starts_with("<![CDATA[") {
                self.parse_delimited("<![CDATA[", "]]>", "unterminated CDATA section")?;
            } else if self.input.starts_with("<!--") {
                self.parse_delimited("<!--", "-->", "unterminated comment")?;
            } else if self.input.starts_with("<!") {
                return Err(self.error(self.input, "expected a comment or CDATA section"));
            } else if self.input.starts_with("<%") {
                self.parse_script()?;
            } else if self.input.starts_with("</") {
                self.parse_close_tag()?;
            } else if self.is_open_tag_start() {
                self.parse_open_tag()?;
            } else {
                self.consume_text();
            }
        }

        self.flush_text();
        Ok(self.tokens)
    }

    /// Advances the lexer position by n bytes.
    ///
    fn advance(&mut self, n: usize) {
        self.input = &self.input[n..];
        self.position += n;
    }

    /// Checks whether `<` is followed by a character that can
    /// start a tag name. Anything else is plain text.
    ///
    fn is_open_tag_start(&self) -> bool {
        self.input.starts_with('<')
            && self.input[1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    }

    /// Parses a comment or CDATA section into a Comment token.
    ///
    fn parse_delimited(
        &mut self,
        open: &str,
        close: &str,
        reason: &'static str,
    ) -> Result<(), LexerError> {
        let Some(end) = self.input[open.len()..].find(close) else {
            return Err(self.error(self.input, reason));
        };

        let value = self.input[open.len()..open.len() + end].to_string();
        self.push(Token::Comment { value });
        self.advance(open.len() + end + close.len());
        Ok(())
    }

    /// Parses a `<% %>` block into a Script token.
    ///
    fn parse_script(&mut self) -> Result<(), LexerError> {
        let Some(end) = self.input[2..].find("%>") else {
            return Err(self.error(self.input, "unterminated script block"));
        };

        let payload = self.input[2..2 + end].trim();
        let token = match payload.strip_prefix(['-', '=']) {
            Some(expr) => Token::Script {
                value: expr.trim().to_string(),
                is_echo: true,
            },
            None => Token::Script {
                value: payload.to_string(),
                is_echo: false,
            },
        };

        self.push(token);
        self.advance(2 + end + 2);
        Ok(())
    }

    /// Parses a `</name>` closing tag.
    ///
    fn parse_close_tag(&mut self) -> Result<(), LexerError> {
        let input = self.input;
        let Some(end) = input.find('>') else {
            return Err(self.error(input, "unterminated closing tag"));
        };

        let name = input[2..end].trim();
        if !TAG_NAME.is_match(name) {
            return Err(self.error(&input[..=end], "invalid closing tag name"));
        }

        self.push(Token::CloseTag {
            name: name.to_string(),
        });
        self.advance(end + 1);
        Ok(())
    }

    /// Parses an open tag including its attributes. Self-closing
    /// tags are followed by a synthetic CloseTag, and `link` tags
    /// become a ResourceLink.
    ///
    fn parse_open_tag(&mut self) -> Result<(), LexerError> {
        let input = self.input;
        let Some(end) = find_tag_end(input) else {
            return Err(self.error(input, "unterminated tag"));
        };

        let fragment = &input[..=end];
        let mut body = fragment[1..end].trim_end();
        let self_closing = body.ends_with('/');
        if self_closing {
            body = &body[..body.len() - 1];
        }

        let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let name = &body[..name_end];
        if !TAG_NAME.is_match(name) {
            return Err(self.error(fragment, "invalid tag name"));
        }

        let attributes = extract_attributes(&body[name_end..]);

        if name == "link" {
            let token = self.resource_link(fragment, attributes)?;
            self.push(token);
        } else {
            self.push(Token::OpenTag {
                name: name.to_string(),
                attributes,
            });
            if self_closing {
                self.push(Token::CloseTag {
                    name: name.to_string(),
                });
            }
        }

        self.advance(end + 1);
        Ok(())
    }

    /// Builds a ResourceLink from a `link` tag, which needs literal
    /// `rel` and `href` attributes.
    ///
    fn resource_link(
        &self,
        fragment: &str,
        mut attributes: Vec<Attribute>,
    ) -> Result<Token, LexerError> {
        let (Some(rel), Some(href)) = (
            attributes::literal(&attributes, "rel"),
            attributes::literal(&attributes, "href"),
        ) else {
            return Err(self.error(fragment, "link needs literal rel and href attributes"));
        };

        if rel == "require" {
            match attributes::literal(&attributes, "name") {
                None => {
                    return Err(self.error(fragment, "require link needs a literal name attribute"));
                }
                Some(name) if !IDENTIFIER.is_match(&name) => {
                    return Err(self.error(fragment, "require link name must be an identifier"));
                }
                Some(_) => {}
            }
        }

        attributes.retain(|attr| attr.name != "rel" && attr.name != "href");

        Ok(Token::ResourceLink {
            rel,
            href,
            attributes,
        })
    }

    /// Consumes text up to the next `<` after the current
    /// character.
    ///
    fn consume_text(&mut self) {
        let end = self.input[1..]
            .find('<')
            .map(|i| i + 1)
            .unwrap_or(self.input.len());

        self.text.push_str(&self.input[..end]);
        self.advance(end);
    }

    /// Pushes a structural token, emitting any pending text first.
    ///
    fn push(&mut self, token: Token) {
        self.flush_text();
        self.tokens.push(token);
    }

    /// Emits the pending text as a Text token unless it is blank.
    ///
    fn flush_text(&mut self) {
        let text = std::mem::take(&mut self.text);

        if !text.trim().is_empty() {
            self.tokens.push(Token::Text {
                value: entities::decode(&text).into_owned(),
            });
        }
    }

    fn error(&self, fragment: &str, reason: &'static str) -> LexerError {
        LexerError::UnexpectedToken {
            fragment: truncate(fragment),
            position: self.position,
            reason,
        }
    }
}

// ------------------------------------------------------------- Public Functions

/// Tokenizes template markup. A leading `<?xml ... ?>`
/// declaration and surrounding whitespace are ignored.
///
pub fn tokenize(markup: &str) -> Result<Vec<Token>, LexerError> {
    Lexer::new(strip_declaration(markup)).tokenize()
}

// ------------------------------------------------------------- Private Functions

fn strip_declaration(markup: &str) -> &str {
    let markup = markup.trim();

    if markup.starts_with("<?")
        && let Some(end) = markup.find("?>")
    {
        return markup[end + 2..].trim();
    }

    markup
}

/// Finds the `>` that ends an open tag, skipping any inside
/// double-quoted attribute values.
///
fn find_tag_end(input: &str) -> Option<usize> {
    let mut in_quotes = false;

    for (i, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '>' if !in_quotes => return Some(i),
            _ => {}
        }
    }

    None
}

fn truncate(fragment: &str) -> String {
    match fragment.char_indices().nth(FRAGMENT_LIMIT) {
        Some((i, _)) => format!("{}...", &fragment[..i]),
        None => fragment.to_string(),
    }
}

// ------------------------------------------------------------- Unit Tests
