//! View Runtime
//!
//! Executes a compiled [`Program`] against a data context. View
//! construction goes through the [`ViewRuntime`] trait, so the
//! same program can drive a real toolkit binding or the
//! [`TreeRuntime`], which records the tree for inspection.
//!

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::script::{self, Node, Scope, ScriptError};
use crate::views::generator::{Op, Program, TextSource};

// ------------------------------------------------------------- Public Types

/// Errors raised while executing a program.
///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("view{0} is used before it is created")]
    MissingView(usize),

    #[error("no root view was created")]
    NoRootView,
}

/// The view operations a program needs from its host.
///
pub trait ViewRuntime {
    type View: Clone;

    fn create_view(&mut self, view_type: &str, options: Map<String, Value>) -> Self::View;

    fn add(&mut self, parent: &Self::View, child: &Self::View);

    fn text(&self, view: &Self::View) -> Option<String>;

    fn set_text(&mut self, view: &Self::View, text: String);
}

/// Inputs of one execution: the data bound to `this` and the
/// values of required modules, keyed by `href`.
///
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub data: Value,
    pub modules: Map<String, Value>,
}

/// A [`ViewRuntime`] that records views in an arena.
///
#[derive(Debug, Default)]
pub struct TreeRuntime {
    nodes: Vec<TreeNode>,
}

/// A recorded view, serialized as `{type, options, children, text}`.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNode {
    #[serde(rename = "type")]
    pub view_type: String,
    pub options: Map<String, Value>,
    pub children: Vec<ViewNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// ------------------------------------------------------------- Private Types

#[derive(Debug)]
struct TreeNode {
    view_type: String,
    options: Map<String, Value>,
    children: Vec<usize>,
    text: Option<String>,
}

// ------------------------------------------------------------- Public Implementations

impl ExecutionContext {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            modules: Map::new(),
        }
    }

    pub fn with_module(mut self, href: &str, value: Value) -> Self {
        self.modules.insert(href.to_string(), value);
        self
    }
}

impl TreeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the recorded subtree rooted at `view`.
    ///
    pub fn tree(&self, view: usize) -> ViewNode {
        let node = &self.nodes[view];

        ViewNode {
            view_type: node.view_type.clone(),
            options: node.options.clone(),
            children: node.children.iter().map(|child| self.tree(*child)).collect(),
            text: node.text.clone(),
        }
    }
}

impl ViewRuntime for TreeRuntime {
    type View = usize;

    fn create_view(&mut self, view_type: &str, options: Map<String, Value>) -> usize {
        self.nodes.push(TreeNode {
            view_type: view_type.to_string(),
            options,
            children: Vec::new(),
            text: None,
        });
        self.nodes.len() - 1
    }

    fn add(&mut self, parent: &usize, child: &usize) {
        self.nodes[*parent].children.push(*child);
    }

    fn text(&self, view: &usize) -> Option<String> {
        self.nodes[*view].text.clone()
    }

    fn set_text(&mut self, view: &usize, text: String) {
        self.nodes[*view].text = Some(text);
    }
}

// ------------------------------------------------------------- Public Functions

/// Runs a program and returns the root view, `view1`.
///
pub fn execute<R: ViewRuntime>(
    program: &Program,
    context: &ExecutionContext,
    runtime: &mut R,
) -> Result<R::View, RuntimeError> {
    let mut scope = Scope::new(&context.data);
    for dependency in &program.dependencies {
        let value = context
            .modules
            .get(&dependency.href)
            .cloned()
            .unwrap_or(Value::Null);
        scope.bind_module(&dependency.name, value);
    }

    let mut views: HashMap<usize, R::View> = HashMap::new();
    let mut options = Map::new();

    script::walk(&program.body, &mut scope, &mut |op, scope| {
        run(op, scope, runtime, &mut views, &mut options)
    })?;

    views.remove(&1).ok_or(RuntimeError::NoRootView)
}

// ------------------------------------------------------------- Private Functions

fn run<R: ViewRuntime>(
    op: &Op,
    scope: &mut Scope,
    runtime: &mut R,
    views: &mut HashMap<usize, R::View>,
    options: &mut Map<String, Value>,
) -> Result<(), RuntimeError> {
    match op {
        Op::Options(spec) => *options = spec.evaluate(scope)?,
        Op::Create { id, view_type } => {
            let view = runtime.create_view(view_type, options.clone());
            views.insert(*id, view);
        }
        Op::Add { parent, child } => {
            let parent = views.get(parent).ok_or(RuntimeError::MissingView(*parent))?;
            let child = views.get(child).ok_or(RuntimeError::MissingView(*child))?;
            runtime.add(parent, child);
        }
        Op::AppendText { id, source } => {
            let view = views.get(id).ok_or(RuntimeError::MissingView(*id))?;
            let addition = match source {
                TextSource::Literal(text) => text.clone(),
                TextSource::Echo(expr) => script::display(&script::evaluate(expr, scope)?),
            };
            let text = runtime.text(view).unwrap_or_default() + &addition;
            runtime.set_text(view, text);
        }
        Op::Comment(_) => {}
    }

    Ok(())
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::options::OptionsSpec;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn create(id: usize, view_type: &str) -> Node<Op> {
        Node::Item(Op::Create {
            id,
            view_type: view_type.to_string(),
        })
    }

    fn program(body: Vec<Node<Op>>) -> Program {
        Program {
            function_name: "test".to_string(),
            dependencies: Vec::new(),
            body,
        }
    }

    #[test]
    fn test_execute_builds_tree() {
        let program = program(vec![
            Node::Item(Op::Options(OptionsSpec::default())),
            create(1, "View"),
            create(2, "Label"),
            Node::Item(Op::Add {
                parent: 1,
                child: 2,
            }),
            Node::Item(Op::AppendText {
                id: 2,
                source: TextSource::Literal("Hi".to_string()),
            }),
        ]);

        let mut runtime = TreeRuntime::new();
        let root = execute(&program, &ExecutionContext::default(), &mut runtime).unwrap();

        assert_eq!(
            serde_json::to_value(runtime.tree(root)).unwrap(),
            json!({"type": "View", "options": {}, "children": [
                {"type": "Label", "options": {}, "children": [], "text": "Hi"}
            ]})
        );
    }

    #[test]
    fn test_execute_text_is_additive() {
        let program = program(vec![
            create(1, "Label"),
            Node::Item(Op::AppendText {
                id: 1,
                source: TextSource::Literal("a".to_string()),
            }),
            Node::Item(Op::AppendText {
                id: 1,
                source: TextSource::Echo(script::parse_expression("this.b").unwrap()),
            }),
        ]);

        let mut runtime = TreeRuntime::new();
        let context = ExecutionContext::new(json!({"b": "c"}));
        let root = execute(&program, &context, &mut runtime).unwrap();

        assert_eq!(runtime.tree(root).text, Some("ac".to_string()));
    }

    #[test]
    fn test_execute_without_root() {
        let program = program(vec![]);
        let mut runtime = TreeRuntime::new();

        assert_eq!(
            execute(&program, &ExecutionContext::default(), &mut runtime),
            Err(RuntimeError::NoRootView)
        );
    }

    #[test]
    fn test_execute_missing_view() {
        let program = program(vec![Node::Item(Op::Add {
            parent: 1,
            child: 2,
        })]);
        let mut runtime = TreeRuntime::new();

        assert_eq!(
            execute(&program, &ExecutionContext::default(), &mut runtime),
            Err(RuntimeError::MissingView(1))
        );
    }
}
