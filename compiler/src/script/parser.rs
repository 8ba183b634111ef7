//! Script Parser
//!
//! Parses the embedded script subset: expressions used by echo
//! segments and style conditions, and the control directives
//! (`if`, `else`, loops, `var`) found in statement segments.
//! Control directives only open or close blocks; the block
//! builder stitches them around the surrounding template output.
//!

use super::ScriptError;
use super::lexer::{self, Token};
use serde_json::Value;

// ------------------------------------------------------------- Public Types

/// Expression tree evaluated against a scope at render time.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    This,
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
}

/// How a block was opened, so the matching close can be checked.
/// `forEach` callbacks close with `});`, everything else with `}`.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Closer {
    Brace,
    Callback,
}

/// A single control directive parsed out of a statement segment.
/// One segment may hold several, e.g. `} else {` or `} }`.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    If(Expr),
    ElseIf(Expr),
    Else,
    Each {
        item: String,
        index: Option<String>,
        iterable: Expr,
        closer: Closer,
    },
    End(Closer),
    Let {
        name: String,
        value: Expr,
    },
}

// ------------------------------------------------------------- Private Types

/// Recursive descent parser over a fragment's token list. Keeps
/// the original fragment text for error messages.
///
struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    source: &'a str,
}

// ------------------------------------------------------------- Private Implementations

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, source: &'a str) -> Self {
        Self {
            tokens,
            position: 0,
            source,
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(p)) if *p == punct)
    }

    fn is_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(i)) if i == name)
    }

    /// Consumes the punctuator if present. Returns whether it was.
    ///
    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), ScriptError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", punct)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ScriptError> {
        match self.advance() {
            Some(Token::Ident(name)) if !is_reserved(&name) => Ok(name),
            _ => Err(self.error("expected an identifier".to_string())),
        }
    }

    fn error(&self, message: String) -> ScriptError {
        ScriptError::Syntax {
            fragment: self.source.to_string(),
            message,
        }
    }

    // ----------------------------------------- directives

    fn parse_directives(&mut self) -> Result<Vec<Directive>, ScriptError> {
        let mut directives = Vec::new();

        while !self.is_at_end() {
            if self.eat_punct(";") {
                continue;
            }

            if self.eat_punct("}") {
                directives.push(self.parse_after_close()?);
            } else if self.is_ident("if") {
                self.position += 1;
                let condition = self.parse_parenthesized()?;
                self.expect_punct("{")?;
                directives.push(Directive::If(condition));
            } else if self.is_ident("for") {
                self.position += 1;
                directives.push(self.parse_for_of()?);
            } else if self.is_ident("var") || self.is_ident("let") || self.is_ident("const") {
                self.position += 1;
                let name = self.expect_ident()?;
                self.expect_punct("=")?;
                let value = self.parse_expression()?;
                self.eat_punct(";");
                directives.push(Directive::Let { name, value });
            } else if let Some(split) = self.find_for_each() {
                directives.push(self.parse_for_each(split)?);
            } else {
                return Err(self.error("unsupported statement".to_string()));
            }
        }

        Ok(directives)
    }

    /// Handles what follows a `}`: an else branch, the `);` of a
    /// forEach callback, or a plain block end.
    ///
    fn parse_after_close(&mut self) -> Result<Directive, ScriptError> {
        if self.is_ident("else") {
            self.position += 1;
            if self.is_ident("if") {
                self.position += 1;
                let condition = self.parse_parenthesized()?;
                self.expect_punct("{")?;
                return Ok(Directive::ElseIf(condition));
            }
            self.expect_punct("{")?;
            return Ok(Directive::Else);
        }

        if self.eat_punct(")") {
            self.eat_punct(";");
            return Ok(Directive::End(Closer::Callback));
        }

        Ok(Directive::End(Closer::Brace))
    }

    /// Parses `(var item[, index] of iterable) {` after `for`.
    ///
    fn parse_for_of(&mut self) -> Result<Directive, ScriptError> {
        self.expect_punct("(")?;

        if self.is_ident("var") || self.is_ident("let") || self.is_ident("const") {
            self.position += 1;
        }

        let item = self.expect_ident()?;
        let index = if self.eat_punct(",") {
            Some(self.expect_ident()?)
        } else {
            None
        };

        if !self.is_ident("of") {
            return Err(self.error("expected 'of' in for loop".to_string()));
        }
        self.position += 1;

        let iterable = self.parse_expression()?;
        self.expect_punct(")")?;
        self.expect_punct("{")?;

        Ok(Directive::Each {
            item,
            index,
            iterable,
            closer: Closer::Brace,
        })
    }

    /// Locates `.forEach(function` in the remaining tokens and
    /// returns the index of its `.`.
    ///
    fn find_for_each(&self) -> Option<usize> {
        (self.position..self.tokens.len()).find(|&i| {
            matches!(self.tokens.get(i), Some(Token::Punct(".")))
                && matches!(self.tokens.get(i + 1), Some(Token::Ident(m)) if m == "forEach")
                && matches!(self.tokens.get(i + 2), Some(Token::Punct("(")))
                && matches!(self.tokens.get(i + 3), Some(Token::Ident(f)) if f == "function")
        })
    }

    /// Parses `iterable.forEach(function (item, index) {`.
    ///
    fn parse_for_each(&mut self, split: usize) -> Result<Directive, ScriptError> {
        let target_tokens = self.tokens[self.position..split].to_vec();
        let mut target = Parser::new(target_tokens, self.source);
        let iterable = target.parse_expression()?;
        if !target.is_at_end() {
            return Err(self.error("unexpected tokens before forEach".to_string()));
        }

        // Skip ". forEach ( function"
        self.position = split + 4;

        self.expect_punct("(")?;
        let item = self.expect_ident()?;
        let index = if self.eat_punct(",") {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect_punct(")")?;
        self.expect_punct("{")?;

        Ok(Directive::Each {
            item,
            index,
            iterable,
            closer: Closer::Callback,
        })
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, ScriptError> {
        self.expect_punct("(")?;
        let expr = self.parse_expression()?;
        self.expect_punct(")")?;
        Ok(expr)
    }

    // ----------------------------------------- expressions

    fn parse_expression(&mut self) -> Result<Expr, ScriptError> {
        let condition = self.parse_binary(0)?;

        if self.eat_punct("?") {
            let then = self.parse_expression()?;
            self.expect_punct(":")?;
            let otherwise = self.parse_expression()?;
            return Ok(Expr::Conditional(
                Box::new(condition),
                Box::new(then),
                Box::new(otherwise),
            ));
        }

        Ok(condition)
    }

    /// Precedence climbing over the binary operator table.
    ///
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ScriptError> {
        let mut left = self.parse_unary()?;

        while let Some((op, precedence)) = self.peek_binary_op() {
            if precedence < min_precedence {
                break;
            }
            self.position += 1;
            let right = self.parse_binary(precedence + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn peek_binary_op(&self) -> Option<(BinaryOp, u8)> {
        let Some(Token::Punct(p)) = self.peek() else {
            return None;
        };

        let op = match *p {
            "||" => (BinaryOp::Or, 1),
            "&&" => (BinaryOp::And, 2),
            "==" => (BinaryOp::Eq, 3),
            "!=" => (BinaryOp::Ne, 3),
            "===" => (BinaryOp::StrictEq, 3),
            "!==" => (BinaryOp::StrictNe, 3),
            "<" => (BinaryOp::Lt, 4),
            "<=" => (BinaryOp::Le, 4),
            ">" => (BinaryOp::Gt, 4),
            ">=" => (BinaryOp::Ge, 4),
            "+" => (BinaryOp::Add, 5),
            "-" => (BinaryOp::Sub, 5),
            "*" => (BinaryOp::Mul, 6),
            "/" => (BinaryOp::Div, 6),
            "%" => (BinaryOp::Rem, 6),
            _ => return None,
        };

        Some(op)
    }

    fn parse_unary(&mut self) -> Result<Expr, ScriptError> {
        if self.eat_punct("!") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)));
        }
        if self.eat_punct("-") {
            return Ok(Expr::Unary(UnaryOp::Negate, Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.eat_punct(".") {
                let name = match self.advance() {
                    Some(Token::Ident(name)) => name,
                    _ => return Err(self.error("expected a property name".to_string())),
                };

                if self.eat_punct("(") {
                    let args = self.parse_list(")")?;
                    expr = Expr::Call {
                        target: Box::new(expr),
                        method: name,
                        args,
                    };
                } else {
                    expr = Expr::Member(Box::new(expr), name);
                }
            } else if self.eat_punct("[") {
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.is_punct("(") {
                return Err(self.error("only method calls are supported".to_string()));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ScriptError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(super::number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                "this" => Expr::This,
                _ if is_reserved(&name) => {
                    return Err(self.error(format!("unexpected keyword '{}'", name)));
                }
                _ => Expr::Ident(name),
            }),
            Some(Token::Punct("(")) => {
                let expr = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Some(Token::Punct("[")) => Ok(Expr::Array(self.parse_list("]")?)),
            Some(Token::Punct(p)) => Err(self.error(format!("unexpected '{}'", p))),
            None => Err(self.error("unexpected end of expression".to_string())),
        }
    }

    /// Parses comma separated expressions up to the closing punctuator.
    ///
    fn parse_list(&mut self, close: &str) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();

        if self.eat_punct(close) {
            return Ok(items);
        }

        loop {
            items.push(self.parse_expression()?);
            if self.eat_punct(close) {
                return Ok(items);
            }
            self.expect_punct(",")?;
        }
    }
}

// ------------------------------------------------------------- Public Functions

/// Parses a complete expression, as found in an echo segment or a
/// style condition. A single trailing `;` is tolerated.
///
pub fn parse_expression(source: &str) -> Result<Expr, ScriptError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens, source);
    let expr = parser.parse_expression()?;
    parser.eat_punct(";");

    if !parser.is_at_end() {
        return Err(parser.error("unexpected trailing input".to_string()));
    }

    Ok(expr)
}

/// Parses a statement segment into its control directives.
///
pub fn parse_directives(source: &str) -> Result<Vec<Directive>, ScriptError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens, source);
    parser.parse_directives()
}

// ------------------------------------------------------------- Private Functions

fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        "if" | "else" | "for" | "of" | "var" | "let" | "const" | "function" | "return"
    )
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    // ----------------------------------------- parse_expression tests

    #[test]
    fn test_parse_precedence() {
        let expr = parse_expression("a + b * c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                ident("a"),
                Box::new(Expr::Binary(BinaryOp::Mul, ident("b"), ident("c")))
            )
        );
    }

    #[test]
    fn test_parse_member_call() {
        let expr = parse_expression("this.foo.toUpperCase()").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                target: Box::new(Expr::Member(Box::new(Expr::This), "foo".to_string())),
                method: "toUpperCase".to_string(),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_parse_conditional() {
        let expr = parse_expression("a ? 'x' : 'y'").unwrap();
        assert!(matches!(expr, Expr::Conditional(..)));
    }

    #[test]
    fn test_parse_rejects_bare_call() {
        assert!(parse_expression("alert(1)").is_err());
    }

    #[test]
    fn test_parse_rejects_trailing_input() {
        assert!(parse_expression("a b").is_err());
    }

    // ----------------------------------------- parse_directives tests

    #[test]
    fn test_parse_if_else() {
        assert_eq!(
            parse_directives("if (this.foo) {").unwrap(),
            vec![Directive::If(Expr::Member(
                Box::new(Expr::This),
                "foo".to_string()
            ))]
        );
        assert_eq!(parse_directives("} else {").unwrap(), vec![Directive::Else]);
        assert_eq!(
            parse_directives("}").unwrap(),
            vec![Directive::End(Closer::Brace)]
        );
    }

    #[test]
    fn test_parse_else_if() {
        let directives = parse_directives("} else if (x > 1) {").unwrap();
        assert!(matches!(directives[0], Directive::ElseIf(_)));
    }

    #[test]
    fn test_parse_for_each() {
        let directives = parse_directives("this.letters.forEach(function (letter, i) {").unwrap();
        assert_eq!(
            directives,
            vec![Directive::Each {
                item: "letter".to_string(),
                index: Some("i".to_string()),
                iterable: Expr::Member(Box::new(Expr::This), "letters".to_string()),
                closer: Closer::Callback,
            }]
        );
        assert_eq!(
            parse_directives("});").unwrap(),
            vec![Directive::End(Closer::Callback)]
        );
    }

    #[test]
    fn test_parse_for_of() {
        let directives = parse_directives("for (var item of items) {").unwrap();
        assert_eq!(
            directives,
            vec![Directive::Each {
                item: "item".to_string(),
                index: None,
                iterable: Expr::Ident("items".to_string()),
                closer: Closer::Brace,
            }]
        );
    }

    #[test]
    fn test_parse_multiple_directives() {
        let directives = parse_directives("} }").unwrap();
        assert_eq!(directives.len(), 2);
    }

    #[test]
    fn test_parse_let() {
        let directives = parse_directives("var total = items.length;").unwrap();
        assert!(matches!(&directives[0], Directive::Let { name, .. } if name == "total"));
    }

    #[test]
    fn test_parse_unsupported_statement() {
        assert!(matches!(
            parse_directives("while (true) {"),
            Err(ScriptError::Syntax { .. })
        ));
    }
}
