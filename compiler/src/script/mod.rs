//! Embedded Script
//!
//! The small scripting language allowed inside `<% %>` segments
//! and style conditions. Expressions cover member access, a
//! fixed set of string/array methods, arithmetic, comparison and
//! logic. Statements are limited to `if`/`else`, `for..of`,
//! `forEach` callbacks and `var` bindings, which open and close
//! blocks around the template output between them.
//!

pub mod block;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use block::{BlockBuilder, Node};
pub use eval::{Scope, display, evaluate, walk};
pub use parser::{Directive, Expr, parse_directives, parse_expression};

use serde_json::Value;
use thiserror::Error;

// ------------------------------------------------------------- Public Types

/// Errors raised while parsing or running embedded script.
///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// The fragment does not fit the supported grammar.
    ///
    #[error("invalid script `{fragment}`: {message}")]
    Syntax { fragment: String, message: String },

    /// Control blocks are not properly opened and closed.
    ///
    #[error("unbalanced script block: {0}")]
    Block(String),

    /// A method outside the supported set was called.
    ///
    #[error("unsupported method `{method}` on {target}")]
    UnknownMethod { method: String, target: String },

    /// A loop target evaluated to something other than an array.
    ///
    #[error("cannot iterate over {0}")]
    NotIterable(String),

    /// A numeric method argument falls outside the accepted range.
    ///
    #[error("{method}() argument must be between 0 and {max}, got {value}")]
    Range {
        method: String,
        value: f64,
        max: u32,
    },
}

// ------------------------------------------------------------- Public Functions

/// Builds a JSON number, keeping integral values integral so they
/// serialize as `1` rather than `1.0`. NaN and infinities have no
/// JSON form and become null.
///
pub fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
