//! View Code Generator
//!
//! Walks the template tokens with a tag stack and emits a module
//! exporting one factory function. The factory builds the view
//! tree when called with the data context as `this`. The same
//! walk produces a [`Program`], the executable form of that code
//! used by the runtime interpreter.
//!

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::script::{self, BlockBuilder, Expr, Node, ScriptError};
use crate::styles::expanders::ExpanderRegistry;
use crate::styles::{StyleError, StyleSheetTable};
use crate::views::attributes::{self, Attribute};
use crate::views::format;
use crate::views::interpolate::quote;
use crate::views::lexer::{self, LexerError, Token};
use crate::views::options::{self, OptionsSpec};
use crate::views::registry::ViewTypes;

// ------------------------------------------------------------- Public Types

/// Errors raised while compiling a template. Nothing is produced
/// when any of these occur.
///
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("template not found at `{}`", path.display())]
    TemplateNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    UnexpectedToken(#[from] LexerError),

    #[error("mismatched closing tag; saw `{found}` but expected `{expected}`")]
    MismatchedTag { expected: String, found: String },

    #[error("closing tag `{0}` has no open tag")]
    UnbalancedTag(String),

    #[error("tag `{0}` is never closed")]
    UnclosedTag(String),

    #[error("text `{0}` appears outside of any view")]
    TextOutsideView(String),

    #[error("template contains no views")]
    EmptyTemplate,

    #[error("unknown view type `{0}`")]
    UnknownViewType(String),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("stylesheet `{}` failed: {source}", path.display())]
    Style {
        path: PathBuf,
        #[source]
        source: StyleError,
    },
}

/// Where appended view text comes from.
///
#[derive(Debug, Clone, PartialEq)]
pub enum TextSource {
    Literal(String),
    Echo(Expr),
}

/// One step of a compiled template.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Computes the options for the next view.
    ///
    Options(OptionsSpec),
    /// Creates a view bound to `view{id}` from the current options.
    ///
    Create { id: usize, view_type: String },
    Add { parent: usize, child: usize },
    AppendText { id: usize, source: TextSource },
    Comment(String),
}

/// A `require` link.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub href: String,
}

/// Executable form of a compiled template.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub function_name: String,
    pub dependencies: Vec<Dependency>,
    pub body: Vec<Node<Op>>,
}

/// Result of compiling one template.
///
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledView {
    pub code: String,
    pub program: Program,
}

/// Compiles templates against a set of known view types and
/// property expanders. Linked stylesheets are compiled into the
/// caller's table and reused across templates.
///
pub struct ViewCompiler<'a> {
    view_types: &'a ViewTypes,
    expanders: &'a ExpanderRegistry,
    stylesheets: &'a mut StyleSheetTable,
}

// ------------------------------------------------------------- Private Types

/// An open tag on the stack.
///
struct Frame {
    name: String,
    id: usize,
}

/// Per-template state of one compile.
///
struct Generator<'c, 'a> {
    compiler: &'c mut ViewCompiler<'a>,
    directory: PathBuf,
    next_id: usize,
    stack: Vec<Frame>,
    dependencies: Vec<Dependency>,
    active_sheets: Vec<PathBuf>,
    js: String,
    builder: BlockBuilder<Op>,
}

// ------------------------------------------------------------- Public Implementations

impl<'a> ViewCompiler<'a> {
    pub fn new(
        view_types: &'a ViewTypes,
        expanders: &'a ExpanderRegistry,
        stylesheets: &'a mut StyleSheetTable,
    ) -> Self {
        Self {
            view_types,
            expanders,
            stylesheets,
        }
    }

    /// Reads and compiles the template at `path`.
    ///
    pub fn compile(&mut self, path: &Path) -> Result<CompiledView, CompileError> {
        let source = fs::read_to_string(path).map_err(|source| CompileError::TemplateNotFound {
            path: path.to_path_buf(),
            source,
        })?;

        self.compile_source(&source, path)
    }

    /// Compiles template markup. `path` names the generated
    /// function and anchors relative stylesheet links.
    ///
    pub fn compile_source(
        &mut self,
        source: &str,
        path: &Path,
    ) -> Result<CompiledView, CompileError> {
        let tokens = lexer::tokenize(source)?;
        log::trace!("Tokenized {} into {} tokens", path.display(), tokens.len());

        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut generator = Generator {
            compiler: self,
            directory,
            next_id: 1,
            stack: Vec::new(),
            dependencies: Vec::new(),
            active_sheets: Vec::new(),
            js: String::new(),
            builder: BlockBuilder::new(),
        };

        for token in tokens {
            generator.token(token)?;
        }

        generator.finish(path)
    }
}

// ------------------------------------------------------------- Private Implementations

impl Generator<'_, '_> {
    fn token(&mut self, token: Token) -> Result<(), CompileError> {
        match token {
            Token::ResourceLink {
                rel,
                href,
                attributes,
            } => self.link(&rel, href, &attributes),
            Token::OpenTag { name, attributes } => self.open_tag(name, &attributes),
            Token::CloseTag { name } => self.close_tag(name),
            Token::Text { value } => self.text(&value),
            Token::Script {
                value,
                is_echo: true,
            } => self.echo(&value),
            Token::Script {
                value,
                is_echo: false,
            } => self.control(&value),
            Token::Comment { value } => {
                let value = value.replace("*/", "* /");
                self.emit(&format!("/*{}*/", value));
                self.builder.push(Op::Comment(value));
                Ok(())
            }
        }
    }

    fn link(&mut self, rel: &str, href: String, attributes: &[Attribute]) -> Result<(), CompileError> {
        match rel {
            "require" => {
                if let Some(name) = attributes::literal(attributes, "name") {
                    let dependency = Dependency { name, href };
                    if !self.dependencies.contains(&dependency) {
                        self.dependencies.push(dependency);
                    }
                }
            }
            "stylesheet" => {
                let path = self.directory.join(&href);
                self.compiler
                    .stylesheets
                    .load(&path)
                    .map_err(|source| CompileError::Style {
                        path: path.clone(),
                        source,
                    })?;

                if !self.active_sheets.contains(&path) {
                    self.active_sheets.push(path);
                }
            }
            _ => log::debug!(
                "Ignoring link rel=\"{}\" href=\"{}\" {}",
                rel,
                href,
                attributes::attributes_to_object(attributes)
            ),
        }

        Ok(())
    }

    fn open_tag(&mut self, name: String, attributes: &[Attribute]) -> Result<(), CompileError> {
        if !self.compiler.view_types.contains(&name) {
            return Err(CompileError::UnknownViewType(name));
        }

        let sheets: Vec<_> = self
            .active_sheets
            .iter()
            .filter_map(|path| self.compiler.stylesheets.get(path))
            .collect();
        let spec = options::merge(&sheets, attributes, self.compiler.expanders)?;

        let id = self.next_id;
        self.next_id += 1;

        self.emit(&spec.to_statement());
        self.emit(&format!("var view{} = Ti.UI.create{}(options);", id, name));
        self.builder.push(Op::Options(spec));
        self.builder.push(Op::Create {
            id,
            view_type: name.clone(),
        });

        if let Some(parent) = self.stack.last().map(|frame| frame.id) {
            self.emit(&format!("view{}.add(view{});", parent, id));
            self.builder.push(Op::Add { parent, child: id });
        }

        self.stack.push(Frame { name, id });
        Ok(())
    }

    fn close_tag(&mut self, name: String) -> Result<(), CompileError> {
        match self.stack.pop() {
            None => Err(CompileError::UnbalancedTag(name)),
            Some(frame) if frame.name != name => Err(CompileError::MismatchedTag {
                expected: frame.name,
                found: name,
            }),
            Some(_) => Ok(()),
        }
    }

    fn text(&mut self, value: &str) -> Result<(), CompileError> {
        let value = value.trim_matches(['\n', '\r', '\t']);
        let id = self.current_view(value)?;

        self.emit(&format!(
            "view{id}.text = (view{id}.text || \"\") + {};",
            quote(value)
        ));
        self.builder.push(Op::AppendText {
            id,
            source: TextSource::Literal(value.to_string()),
        });
        Ok(())
    }

    fn echo(&mut self, value: &str) -> Result<(), CompileError> {
        let id = self.current_view(value)?;
        let expr = script::parse_expression(value)?;

        self.emit(&format!("view{id}.text = (view{id}.text || \"\") + ({});", value));
        self.builder.push(Op::AppendText {
            id,
            source: TextSource::Echo(expr),
        });
        Ok(())
    }

    fn control(&mut self, value: &str) -> Result<(), CompileError> {
        for directive in script::parse_directives(value)? {
            self.builder.apply(directive)?;
        }

        self.emit(value);
        Ok(())
    }

    fn current_view(&self, text: &str) -> Result<usize, CompileError> {
        self.stack
            .last()
            .map(|frame| frame.id)
            .ok_or_else(|| CompileError::TextOutsideView(text.to_string()))
    }

    fn emit(&mut self, statement: &str) {
        self.js.push_str(statement);
        self.js.push('\n');
    }

    /// Checks the final state and wraps the statements in the
    /// exported factory function.
    ///
    fn finish(self, path: &Path) -> Result<CompiledView, CompileError> {
        if let Some(frame) = self.stack.last() {
            return Err(CompileError::UnclosedTag(frame.name.clone()));
        }
        if self.next_id == 1 {
            return Err(CompileError::EmptyTemplate);
        }

        let body = self.builder.finish()?;
        let function_name = function_name(path);

        let mut code = format!("/* Compiled from {} */\n", path.display());
        for dependency in &self.dependencies {
            code.push_str(&format!(
                "var {} = require({});\n",
                dependency.name,
                quote(&dependency.href)
            ));
        }
        code.push_str(&format!(
            "module.exports = function {}View() {{\nvar options;\n{}return view1;\n}};\n",
            function_name, self.js
        ));

        log::debug!(
            "Generated {}View with {} views and {} dependencies",
            function_name,
            self.next_id - 1,
            self.dependencies.len()
        );

        Ok(CompiledView {
            code: format::format(&code),
            program: Program {
                function_name,
                dependencies: self.dependencies,
                body,
            },
        })
    }
}

// ------------------------------------------------------------- Private Functions

/// Derives the factory name from the template file stem, camel
/// casing dashes and dropping characters that cannot appear in an
/// identifier.
///
fn function_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();

    let mut name = String::with_capacity(stem.len());
    let mut upper = false;

    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
            if upper {
                name.push(c.to_ascii_uppercase());
            } else {
                name.push(c);
            }
            upper = false;
        } else {
            upper = !name.is_empty();
        }
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }

    name
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Result<CompiledView, CompileError> {
        let view_types = ViewTypes::titanium();
        let expanders = ExpanderRegistry::with_defaults();
        let mut stylesheets = StyleSheetTable::new();

        ViewCompiler::new(&view_types, &expanders, &mut stylesheets)
            .compile_source(source, Path::new("views/vc-test.xml"))
    }

    // ----------------------------------------- code tests

    #[test]
    fn test_compile_single_tag_code() {
        let compiled = compile("<View />").unwrap();

        assert_eq!(
            compiled.code,
            "/* Compiled from views/vc-test.xml */\n\
             module.exports = function vcTestView() {\n\
             \tvar options;\n\
             \toptions = {};\n\
             \tvar view1 = Ti.UI.createView(options);\n\
             \treturn view1;\n\
             };\n"
        );
    }

    #[test]
    fn test_compile_nested_adds_child() {
        let code = compile("<View a=\"1\"><TextArea b=\"2\" /></View>").unwrap().code;

        assert!(code.contains("var view2 = Ti.UI.createTextArea(options);"));
        assert!(code.contains("view1.add(view2);"));
    }

    #[test]
    fn test_compile_text_and_echo() {
        let code = compile("<Label>\n\tHi \"you\"<%- this.name %></Label>").unwrap().code;

        assert!(code.contains("view1.text = (view1.text || \"\") + \"Hi \\\"you\\\"\";"));
        assert!(code.contains("view1.text = (view1.text || \"\") + (this.name);"));
    }

    #[test]
    fn test_compile_require_links_deduplicated() {
        let source = "<link rel=\"require\" href=\"test.js\" name=\"test\" />\
                      <link rel=\"require\" href=\"test.js\" name=\"test\" />\
                      <View/>";
        let compiled = compile(source).unwrap();

        assert_eq!(compiled.code.matches("var test = require(\"test.js\");").count(), 1);
        assert_eq!(compiled.program.dependencies.len(), 1);
    }

    #[test]
    fn test_compile_comments() {
        let code = compile("<View><!-- a */ b --><![CDATA[ c ]]></View>").unwrap().code;

        assert!(code.contains("/* a * / b */"));
        assert!(code.contains("/* c */"));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let source = "<View><% if (this.a) { %><Label>x</Label><% } %></View>";
        assert_eq!(compile(source).unwrap(), compile(source).unwrap());
    }

    #[test]
    fn test_function_name() {
        assert_eq!(function_name(Path::new("a/vc-test1.xml")), "vcTest1");
        assert_eq!(function_name(Path::new("main.xml")), "main");
        assert_eq!(function_name(Path::new("2col layout.xml")), "_2colLayout");
    }

    // ----------------------------------------- error tests

    #[test]
    fn test_compile_mismatched_tag() {
        let err = compile("<View><TextArea></View>").unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, CompileError::MismatchedTag { .. }));
        assert!(message.contains("TextArea"));
        assert!(message.contains("View"));
    }

    #[test]
    fn test_compile_unbalanced_tag() {
        assert!(matches!(
            compile("<View></View></View>"),
            Err(CompileError::UnbalancedTag(name)) if name == "View"
        ));
    }

    #[test]
    fn test_compile_unclosed_tag() {
        assert!(matches!(
            compile("<View><Label>"),
            Err(CompileError::UnclosedTag(name)) if name == "Label"
        ));
    }

    #[test]
    fn test_compile_text_outside_view() {
        assert!(matches!(
            compile("hello <View/>"),
            Err(CompileError::TextOutsideView(_))
        ));
    }

    #[test]
    fn test_compile_empty_template() {
        assert!(matches!(
            compile("<!-- nothing -->"),
            Err(CompileError::EmptyTemplate)
        ));
    }

    #[test]
    fn test_compile_unknown_view_type() {
        assert!(matches!(
            compile("<Div/>"),
            Err(CompileError::UnknownViewType(name)) if name == "Div"
        ));
    }

    #[test]
    fn test_compile_unclosed_control_block() {
        assert!(matches!(
            compile("<View><% if (this.a) { %></View>"),
            Err(CompileError::Script(_))
        ));
    }

    #[test]
    fn test_compile_missing_stylesheet() {
        assert!(matches!(
            compile("<link rel=\"stylesheet\" href=\"missing.iss\"/><View/>"),
            Err(CompileError::Style { .. })
        ));
    }

    #[test]
    fn test_compile_missing_template() {
        let view_types = ViewTypes::titanium();
        let expanders = ExpanderRegistry::new();
        let mut stylesheets = StyleSheetTable::new();
        let mut compiler = ViewCompiler::new(&view_types, &expanders, &mut stylesheets);

        let err = compiler.compile(Path::new("/nonexistent/view.xml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/view.xml"));
    }
}
