//! Script Evaluation
//!
//! Evaluates expressions and walks compiled blocks against a
//! scope. Values are JSON values; the coercion rules follow the
//! loose semantics template authors expect from the generated
//! target code (string concatenation with `+`, truthiness,
//! `==` comparing numbers with numeric strings).
//!

use super::ScriptError;
use super::block::Node;
use super::parser::{BinaryOp, Expr, UnaryOp};
use serde_json::{Map, Value};
use std::cmp::Ordering;

// ------------------------------------------------------------- Private Consts

/// Largest digit count `toFixed` accepts.
///
const MAX_FIXED_DIGITS: u32 = 100;

// ------------------------------------------------------------- Public Types

/// Name resolution for one execution. Identifiers resolve to
/// locals (innermost frame first), then module bindings, then
/// properties of the data context, which is also `this`.
///
#[derive(Debug)]
pub struct Scope<'a> {
    this: &'a Value,
    modules: Map<String, Value>,
    frames: Vec<Map<String, Value>>,
}

// ------------------------------------------------------------- Public Implementations

impl<'a> Scope<'a> {
    pub fn new(this: &'a Value) -> Self {
        Self {
            this,
            modules: Map::new(),
            frames: vec![Map::new()],
        }
    }

    /// Binds a `require` dependency under its declared name.
    ///
    pub fn bind_module(&mut self, name: &str, value: Value) {
        self.modules.insert(name.to_string(), value);
    }

    /// Assigns a local in the innermost frame.
    ///
    pub fn set_local(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    pub fn lookup(&self, name: &str) -> Value {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.modules.get(name))
            .or_else(|| self.this.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Runs `f` in a fresh frame. Locals assigned inside it are
    /// dropped when it returns.
    ///
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_frame();
        let result = f(self);
        self.pop_frame();
        result
    }

    fn push_frame(&mut self) {
        self.frames.push(Map::new());
    }

    fn pop_frame(&mut self) {
        self.frames.pop();
    }
}

// ------------------------------------------------------------- Public Functions

/// Evaluates an expression to a value.
///
pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, ScriptError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Array(items) => items
            .iter()
            .map(|item| evaluate(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),

        Expr::This => Ok(scope.this.clone()),

        Expr::Ident(name) => Ok(scope.lookup(name)),

        Expr::Member(target, name) => {
            let target = evaluate(target, scope)?;
            Ok(member(&target, name))
        }

        Expr::Index(target, index) => {
            let target = evaluate(target, scope)?;
            let index = evaluate(index, scope)?;
            Ok(match (&target, &index) {
                (Value::Array(items), Value::Number(n)) => n
                    .as_f64()
                    .filter(|i| *i >= 0.0 && i.fract() == 0.0)
                    .and_then(|i| items.get(i as usize))
                    .cloned()
                    .unwrap_or(Value::Null),
                _ => member(&target, &display(&index)),
            })
        }

        Expr::Call {
            target,
            method,
            args,
        } => {
            let target = evaluate(target, scope)?;
            let args = args
                .iter()
                .map(|arg| evaluate(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call_method(&target, method, &args)
        }

        Expr::Unary(op, operand) => {
            let value = evaluate(operand, scope)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!is_truthy(&value)),
                UnaryOp::Negate => super::number(-to_number(&value)),
            })
        }

        Expr::Binary(BinaryOp::And, left, right) => {
            let left = evaluate(left, scope)?;
            if is_truthy(&left) {
                evaluate(right, scope)
            } else {
                Ok(left)
            }
        }

        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = evaluate(left, scope)?;
            if is_truthy(&left) {
                Ok(left)
            } else {
                evaluate(right, scope)
            }
        }

        Expr::Binary(op, left, right) => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            Ok(binary(*op, &left, &right))
        }

        Expr::Conditional(condition, then, otherwise) => {
            if is_truthy(&evaluate(condition, scope)?) {
                evaluate(then, scope)
            } else {
                evaluate(otherwise, scope)
            }
        }
    }
}

/// Walks a compiled block, calling `visit` for every item that
/// is reached. Conditionals pick their first truthy branch, loops
/// bind the item (and index) in a fresh frame per iteration.
/// `visit` may fail with any error that script errors convert
/// into.
///
pub fn walk<T, E, F>(nodes: &[Node<T>], scope: &mut Scope, visit: &mut F) -> Result<(), E>
where
    E: From<ScriptError>,
    F: FnMut(&T, &mut Scope) -> Result<(), E>,
{
    for node in nodes {
        match node {
            Node::Item(item) => visit(item, scope)?,

            Node::Let { name, value } => {
                let value = evaluate(value, scope)?;
                scope.set_local(name, value);
            }

            Node::If {
                branches,
                otherwise,
            } => {
                let mut taken = None;
                for (condition, body) in branches {
                    if is_truthy(&evaluate(condition, scope)?) {
                        taken = Some(body);
                        break;
                    }
                }
                if let Some(body) = taken.or(otherwise.as_ref()) {
                    walk(body, scope, visit)?;
                }
            }

            Node::Each {
                item,
                index,
                iterable,
                body,
            } => {
                let items = match evaluate(iterable, scope)? {
                    Value::Array(items) => items,
                    other => {
                        return Err(ScriptError::NotIterable(type_name(&other).to_string()).into());
                    }
                };

                for (i, value) in items.into_iter().enumerate() {
                    scope.push_frame();
                    scope.set_local(item, value);
                    if let Some(index) = index {
                        scope.set_local(index, super::number(i as f64));
                    }
                    let result = walk(body, scope, visit);
                    scope.pop_frame();
                    result?;
                }
            }
        }
    }

    Ok(())
}

/// Converts a value to the text it contributes when concatenated
/// into output. Missing values render as nothing.
///
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => format_number(f),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ------------------------------------------------------------- Private Functions

fn member(target: &Value, name: &str) -> Value {
    match (target, name) {
        (Value::String(s), "length") => super::number(s.chars().count() as f64),
        (Value::Array(items), "length") => super::number(items.len() as f64),
        (Value::Array(items), index) => index
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        (Value::Object(map), key) => map.get(key).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn call_method(target: &Value, method: &str, args: &[Value]) -> Result<Value, ScriptError> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);

    let result = match (target, method) {
        (Value::String(s), "toUpperCase") => Value::String(s.to_uppercase()),
        (Value::String(s), "toLowerCase") => Value::String(s.to_lowercase()),
        (Value::String(s), "trim") => Value::String(s.trim().to_string()),
        (Value::String(s), "indexOf") => {
            let needle = display(&arg(0));
            let position = s
                .find(&needle)
                .map(|byte| s[..byte].chars().count() as f64)
                .unwrap_or(-1.0);
            super::number(position)
        }
        (Value::String(s), "substring") => {
            let chars: Vec<char> = s.chars().collect();
            let clamp = |v: Value, default: usize| match v {
                Value::Null => default,
                v => (to_number(&v).max(0.0) as usize).min(chars.len()),
            };
            let start = clamp(arg(0), 0);
            let end = clamp(arg(1), chars.len());
            let (start, end) = if start > end { (end, start) } else { (start, end) };
            Value::String(chars[start..end].iter().collect())
        }
        (Value::Array(items), "join") => {
            let separator = match arg(0) {
                Value::Null => ",".to_string(),
                other => display(&other),
            };
            Value::String(
                items
                    .iter()
                    .map(display)
                    .collect::<Vec<_>>()
                    .join(&separator),
            )
        }
        (Value::Array(items), "indexOf") => {
            let needle = arg(0);
            let position = items
                .iter()
                .position(|item| strict_equals(item, &needle))
                .map(|i| i as f64)
                .unwrap_or(-1.0);
            super::number(position)
        }
        (Value::Number(_), "toFixed") => {
            let digits = match arg(0) {
                Value::Null => 0.0,
                v => match to_number(&v) {
                    n if n.is_nan() => 0.0,
                    n => n.trunc(),
                },
            };
            if !(0.0..=f64::from(MAX_FIXED_DIGITS)).contains(&digits) {
                return Err(ScriptError::Range {
                    method: method.to_string(),
                    value: digits,
                    max: MAX_FIXED_DIGITS,
                });
            }
            Value::String(format!("{:.*}", digits as usize, to_number(target)))
        }
        (_, "toString") => Value::String(display(target)),
        _ => {
            return Err(ScriptError::UnknownMethod {
                method: method.to_string(),
                target: type_name(target).to_string(),
            });
        }
    };

    Ok(result)
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if left.is_string() || right.is_string() || is_compound(left) || is_compound(right) {
                Value::String(format!("{}{}", display(left), display(right)))
            } else {
                super::number(to_number(left) + to_number(right))
            }
        }
        BinaryOp::Sub => super::number(to_number(left) - to_number(right)),
        BinaryOp::Mul => super::number(to_number(left) * to_number(right)),
        BinaryOp::Div => super::number(to_number(left) / to_number(right)),
        BinaryOp::Rem => super::number(to_number(left) % to_number(right)),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => Value::Bool(loose_equals(left, right)),
        BinaryOp::Ne => Value::Bool(!loose_equals(left, right)),
        BinaryOp::StrictEq => Value::Bool(strict_equals(left, right)),
        BinaryOp::StrictNe => Value::Bool(!strict_equals(left, right)),
        // Short-circuit operators are handled in `evaluate`.
        BinaryOp::And | BinaryOp::Or => Value::Null,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => to_number(left).partial_cmp(&to_number(right)),
    }
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_)) => to_number(left) == to_number(right),
        _ => strict_equals(left, right),
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

fn is_compound(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "undefined",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parser::parse_expression;
    use serde_json::json;

    fn eval(source: &str, data: &Value) -> Value {
        let scope = Scope::new(data);
        evaluate(&parse_expression(source).unwrap(), &scope).unwrap()
    }

    // ----------------------------------------- evaluate tests

    #[test]
    fn test_eval_this_member() {
        assert_eq!(eval("this.foo", &json!({"foo": "abc"})), json!("abc"));
    }

    #[test]
    fn test_eval_bare_identifier_reads_context() {
        assert_eq!(eval("bar", &json!({"bar": "abc"})), json!("abc"));
    }

    #[test]
    fn test_eval_method_call() {
        assert_eq!(
            eval("this.foo.toUpperCase()", &json!({"foo": "abc"})),
            json!("ABC")
        );
    }

    #[test]
    fn test_eval_number_plus_number() {
        assert_eq!(display(&eval("i + 1", &json!({"i": 0}))), "1");
    }

    #[test]
    fn test_eval_string_concatenation() {
        assert_eq!(eval("'Letter ' + x", &json!({"x": "A"})), json!("Letter A"));
        assert_eq!(eval("'n' + 2", &json!({})), json!("n2"));
    }

    #[test]
    fn test_eval_loose_equality() {
        assert_eq!(eval("x == 1", &json!({"x": "1"})), json!(true));
        assert_eq!(eval("x === 1", &json!({"x": "1"})), json!(false));
    }

    #[test]
    fn test_eval_short_circuit_returns_operand() {
        assert_eq!(eval("x || 'fallback'", &json!({})), json!("fallback"));
        assert_eq!(eval("x && x.y", &json!({})), Value::Null);
    }

    #[test]
    fn test_eval_length_and_index() {
        let data = json!({"letters": ["A", "B"]});
        assert_eq!(display(&eval("letters.length", &data)), "2");
        assert_eq!(eval("letters[1]", &data), json!("B"));
    }

    #[test]
    fn test_eval_unknown_method() {
        let data = json!({"x": 1});
        let scope = Scope::new(&data);
        let expr = parse_expression("x.explode()").unwrap();
        assert!(matches!(
            evaluate(&expr, &scope),
            Err(ScriptError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_eval_to_fixed() {
        let data = json!({"n": 1.005, "d": 2});
        assert_eq!(eval("this.n.toFixed(this.d)", &data), json!("1.00"));
        assert_eq!(eval("this.d.toFixed()", &data), json!("2"));
    }

    #[test]
    fn test_eval_to_fixed_digits_out_of_range() {
        let data = json!({"n": 1, "digits": 70000});
        let scope = Scope::new(&data);

        for source in ["this.n.toFixed(this.digits)", "this.n.toFixed(101)", "this.n.toFixed(-1)"] {
            let expr = parse_expression(source).unwrap();
            assert!(matches!(
                evaluate(&expr, &scope),
                Err(ScriptError::Range { .. })
            ));
        }
    }

    // ----------------------------------------- walk tests

    #[test]
    fn test_walk_loop_binds_item_and_index() {
        use crate::script::block::BlockBuilder;
        use crate::script::parser::parse_directives;

        let mut builder = BlockBuilder::new();
        for d in parse_directives("letters.forEach(function (letter, i) {").unwrap() {
            builder.apply(d).unwrap();
        }
        builder.push(parse_expression("letter + (i + 1)").unwrap());
        for d in parse_directives("});").unwrap() {
            builder.apply(d).unwrap();
        }
        let nodes = builder.finish().unwrap();

        let data = json!({"letters": ["A", "B"]});
        let mut scope = Scope::new(&data);
        let mut out = Vec::new();
        walk::<_, ScriptError, _>(&nodes, &mut scope, &mut |expr: &Expr, scope: &mut Scope| {
            out.push(display(&evaluate(expr, scope)?));
            Ok(())
        })
        .unwrap();

        assert_eq!(out, vec!["A1".to_string(), "B2".to_string()]);
        // loop variables do not leak out of the loop
        assert_eq!(scope.lookup("letter"), Value::Null);
    }

    #[test]
    fn test_walk_not_iterable() {
        use crate::script::block::BlockBuilder;
        use crate::script::parser::parse_directives;

        let mut builder: BlockBuilder<()> = BlockBuilder::new();
        for d in parse_directives("for (x of items) { }").unwrap() {
            builder.apply(d).unwrap();
        }
        let nodes = builder.finish().unwrap();
        let data = json!({"items": 5});
        let mut scope = Scope::new(&data);
        let result: Result<(), ScriptError> =
            walk(&nodes, &mut scope, &mut |_: &(), _: &mut Scope| Ok(()));
        assert_eq!(result, Err(ScriptError::NotIterable("number".to_string())));
    }

    // ----------------------------------------- display tests

    #[test]
    fn test_display_values() {
        assert_eq!(display(&Value::Null), "");
        assert_eq!(display(&json!(3.0)), "3");
        assert_eq!(display(&json!(1.5)), "1.5");
        assert_eq!(display(&json!(["a", 1])), "a,1");
    }
}
