//! Block Builder
//!
//! Statement segments in a template open and close blocks around
//! ordinary output (views, text, attribute literals). The builder
//! receives those items and directives in document order and
//! folds them into a nested tree, rejecting closes without an
//! open block, mismatched closers and blocks left open.
//!

use super::ScriptError;
use super::parser::{Closer, Directive, Expr};

// ------------------------------------------------------------- Public Types

/// A structured node in a compiled block. `T` is the payload of
/// plain items: view operations for templates, text pieces for
/// interpolated strings.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Node<T> {
    Item(T),
    Let {
        name: String,
        value: Expr,
    },
    If {
        branches: Vec<(Expr, Vec<Node<T>>)>,
        otherwise: Option<Vec<Node<T>>>,
    },
    Each {
        item: String,
        index: Option<String>,
        iterable: Expr,
        body: Vec<Node<T>>,
    },
}

/// Incrementally builds a `Vec<Node<T>>` from items and directives.
///
#[derive(Debug)]
pub struct BlockBuilder<T> {
    root: Vec<Node<T>>,
    open: Vec<Frame<T>>,
}

// ------------------------------------------------------------- Private Types

/// An open block waiting for its closing directive.
///
#[derive(Debug)]
enum Frame<T> {
    If {
        branches: Vec<(Expr, Vec<Node<T>>)>,
        condition: Option<Expr>,
        body: Vec<Node<T>>,
    },
    Each {
        item: String,
        index: Option<String>,
        iterable: Expr,
        closer: Closer,
        body: Vec<Node<T>>,
    },
}

// ------------------------------------------------------------- Public Implementations

impl<T> Default for BlockBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockBuilder<T> {
    pub fn new() -> Self {
        Self {
            root: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Appends a plain item to the innermost open block.
    ///
    pub fn push(&mut self, item: T) {
        self.current().push(Node::Item(item));
    }

    /// Applies a control directive, opening, switching or closing
    /// a block as required.
    ///
    pub fn apply(&mut self, directive: Directive) -> Result<(), ScriptError> {
        match directive {
            Directive::If(condition) => {
                self.open.push(Frame::If {
                    branches: Vec::new(),
                    condition: Some(condition),
                    body: Vec::new(),
                });
            }

            Directive::ElseIf(next) => match self.open.last_mut() {
                Some(Frame::If {
                    branches,
                    condition,
                    body,
                }) => {
                    let Some(previous) = condition.take() else {
                        return Err(ScriptError::Block("else if after else".to_string()));
                    };
                    branches.push((previous, std::mem::take(body)));
                    *condition = Some(next);
                }
                _ => return Err(ScriptError::Block("else if without if".to_string())),
            },

            Directive::Else => match self.open.last_mut() {
                Some(Frame::If {
                    branches,
                    condition,
                    body,
                }) => {
                    let Some(previous) = condition.take() else {
                        return Err(ScriptError::Block("else after else".to_string()));
                    };
                    branches.push((previous, std::mem::take(body)));
                }
                _ => return Err(ScriptError::Block("else without if".to_string())),
            },

            Directive::Each {
                item,
                index,
                iterable,
                closer,
            } => {
                self.open.push(Frame::Each {
                    item,
                    index,
                    iterable,
                    closer,
                    body: Vec::new(),
                });
            }

            Directive::End(closer) => self.close(closer)?,

            Directive::Let { name, value } => {
                self.current().push(Node::Let { name, value });
            }
        }

        Ok(())
    }

    /// Returns the finished tree. Fails if any block is still open.
    ///
    pub fn finish(self) -> Result<Vec<Node<T>>, ScriptError> {
        if let Some(frame) = self.open.last() {
            let kind = match frame {
                Frame::If { .. } => "if",
                Frame::Each { .. } => "loop",
            };
            return Err(ScriptError::Block(format!("unclosed {} block", kind)));
        }

        Ok(self.root)
    }
}

// ------------------------------------------------------------- Private Implementations

impl<T> BlockBuilder<T> {
    fn current(&mut self) -> &mut Vec<Node<T>> {
        match self.open.last_mut() {
            Some(Frame::If { body, .. }) | Some(Frame::Each { body, .. }) => body,
            None => &mut self.root,
        }
    }

    fn close(&mut self, closer: Closer) -> Result<(), ScriptError> {
        let node = match self.open.pop() {
            Some(Frame::If {
                mut branches,
                condition,
                body,
            }) => {
                if closer != Closer::Brace {
                    return Err(ScriptError::Block("'});' closes an if block".to_string()));
                }
                let otherwise = match condition {
                    Some(condition) => {
                        branches.push((condition, body));
                        None
                    }
                    None => Some(body),
                };
                Node::If {
                    branches,
                    otherwise,
                }
            }

            Some(Frame::Each {
                item,
                index,
                iterable,
                closer: opened_with,
                body,
            }) => {
                if closer != opened_with {
                    return Err(ScriptError::Block(
                        "loop closed with the wrong delimiter".to_string(),
                    ));
                }
                Node::Each {
                    item,
                    index,
                    iterable,
                    body,
                }
            }

            None => return Err(ScriptError::Block("close without open block".to_string())),
        };

        self.current().push(node);
        Ok(())
    }
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parser::parse_directives;
    use pretty_assertions::assert_eq;

    fn apply_all(builder: &mut BlockBuilder<&'static str>, source: &str) {
        for directive in parse_directives(source).unwrap() {
            builder.apply(directive).unwrap();
        }
    }

    #[test]
    fn test_if_else_structure() {
        let mut builder = BlockBuilder::new();
        apply_all(&mut builder, "if (a) {");
        builder.push("bar");
        apply_all(&mut builder, "} else {");
        builder.push("baz");
        apply_all(&mut builder, "}");
        builder.push("qux");

        let nodes = builder.finish().unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::If {
                    branches: vec![(Expr::Ident("a".to_string()), vec![Node::Item("bar")])],
                    otherwise: Some(vec![Node::Item("baz")]),
                },
                Node::Item("qux"),
            ]
        );
    }

    #[test]
    fn test_nested_loop_inside_if() {
        let mut builder = BlockBuilder::new();
        apply_all(&mut builder, "if (a) { items.forEach(function (x) {");
        builder.push("row");
        apply_all(&mut builder, "}); }");

        let nodes = builder.finish().unwrap();
        match &nodes[0] {
            Node::If { branches, .. } => match &branches[0].1[0] {
                Node::Each { item, body, .. } => {
                    assert_eq!(item, "x");
                    assert_eq!(body, &vec![Node::Item("row")]);
                }
                other => panic!("Expected Each, got {:?}", other),
            },
            other => panic!("Expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_block() {
        let mut builder: BlockBuilder<&str> = BlockBuilder::new();
        apply_all(&mut builder, "if (a) {");
        assert_eq!(
            builder.finish(),
            Err(ScriptError::Block("unclosed if block".to_string()))
        );
    }

    #[test]
    fn test_close_without_open() {
        let mut builder: BlockBuilder<&str> = BlockBuilder::new();
        let directive = parse_directives("}").unwrap().remove(0);
        assert!(builder.apply(directive).is_err());
    }

    #[test]
    fn test_wrong_closer_for_loop() {
        let mut builder: BlockBuilder<&str> = BlockBuilder::new();
        apply_all(&mut builder, "items.forEach(function (x) {");
        let directive = parse_directives("}").unwrap().remove(0);
        assert!(builder.apply(directive).is_err());
    }

    #[test]
    fn test_else_after_else() {
        let mut builder: BlockBuilder<&str> = BlockBuilder::new();
        apply_all(&mut builder, "if (a) { } else {");
        let directive = parse_directives("} else {").unwrap().remove(0);
        assert!(builder.apply(directive).is_err());
    }
}
