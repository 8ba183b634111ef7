//! Stylesheet Compiler
//!
//! Compiles the stylesheet dialect into per-class and per-id
//! declaration maps. Each declaration remembers the `@media`
//! conditions in effect where it was written, outermost first.
//! Compiled sheets live in a [`StyleSheetTable`] owned by the
//! caller and keyed by file path.
//!

pub mod expanders;
pub mod lexer;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use serde::Serialize;
use thiserror::Error;

use crate::common::colors::{NC, RED};
use lexer::StyleToken;

// ------------------------------------------------------------- Public Types

/// Errors raised while compiling a stylesheet.
///
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("stylesheet not found at `{}`", path.display())]
    StyleSheetNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unexpected token `{0}` in stylesheet")]
    UnexpectedToken(String),

    #[error("unclosed block at end of stylesheet")]
    UnclosedBlock,
}

/// A single `name: value` declaration.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub conditions: Vec<String>,
}

/// Declarations of one selector, keyed by property name.
///
pub type Rules = BTreeMap<String, Declaration>;

/// A compiled stylesheet.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleSheet {
    pub ids: BTreeMap<String, Rules>,
    pub classes: BTreeMap<String, Rules>,
}

/// Compiled stylesheets keyed by source path.
///
#[derive(Debug, Clone, Default)]
pub struct StyleSheetTable {
    sheets: BTreeMap<PathBuf, StyleSheet>,
}

// ------------------------------------------------------------- Private Types

enum Selector {
    Class(String),
    Id(String),
}

// ------------------------------------------------------------- Public Implementations

impl StyleSheetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and compiles the stylesheet at `path`, replacing any
    /// entry already held for it.
    ///
    pub fn compile(&mut self, path: &Path) -> Result<&StyleSheet, StyleError> {
        let source = fs::read_to_string(path).map_err(|source| StyleError::StyleSheetNotFound {
            path: path.to_path_buf(),
            source,
        })?;

        let sheet = compile_source(&source)?;
        log::debug!(
            "Compiled stylesheet {} ({} classes, {} ids)",
            path.display(),
            sheet.classes.len(),
            sheet.ids.len()
        );

        self.sheets.insert(path.to_path_buf(), sheet);
        Ok(&self.sheets[path])
    }

    /// Returns the compiled sheet for `path`, compiling it first
    /// when it is not in the table yet.
    ///
    pub fn load(&mut self, path: &Path) -> Result<&StyleSheet, StyleError> {
        if !self.sheets.contains_key(path) {
            self.compile(path)?;
        }
        Ok(&self.sheets[path])
    }

    pub fn get(&self, path: &Path) -> Option<&StyleSheet> {
        self.sheets.get(path)
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, sheet: StyleSheet) {
        self.sheets.insert(path.into(), sheet);
    }

    /// Moves every entry of `other` into this table. Entries from
    /// `other` replace entries for the same path.
    ///
    pub fn merge(&mut self, other: StyleSheetTable) {
        self.sheets.extend(other.sheets);
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

// ------------------------------------------------------------- Public Functions

/// Compiles the stylesheet at `path` and prints it as JSON.
/// Exits with code 1 if the sheet cannot be compiled.
///
pub fn print(path: &Path) {
    let mut table = StyleSheetTable::new();

    let json = table
        .compile(path)
        .map_err(|err| err.to_string())
        .and_then(|sheet| serde_json::to_string_pretty(sheet).map_err(|err| err.to_string()));

    match json {
        Ok(json) => println!("{}", json),
        Err(err) => {
            eprintln!("{}Error in {}: {}{}", RED, path.display(), err, NC);
            process::exit(1);
        }
    }
}

/// Compiles stylesheet source. Declaring a selector again adds
/// to its rules, and a repeated property replaces the earlier
/// declaration.
///
pub fn compile_source(source: &str) -> Result<StyleSheet, StyleError> {
    let mut sheet = StyleSheet::default();
    let mut selector: Option<Selector> = None;
    let mut conditions: Vec<String> = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let mut depths: Vec<usize> = Vec::new();

    for token in lexer::tokenize(source)? {
        match token {
            StyleToken::MediaQuery(clauses) => pending = clauses,
            StyleToken::BeginMediaQueryBlock => {
                depths.push(conditions.len());
                conditions.append(&mut pending);
            }
            StyleToken::EndMediaQueryBlock => {
                conditions.truncate(depths.pop().unwrap_or(0));
            }
            StyleToken::Class(name) => {
                sheet.classes.entry(name.clone()).or_default();
                selector = Some(Selector::Class(name));
            }
            StyleToken::Id(name) => {
                sheet.ids.entry(name.clone()).or_default();
                selector = Some(Selector::Id(name));
            }
            StyleToken::Property { name, value } => {
                let rules = match &selector {
                    Some(Selector::Class(class)) => sheet.classes.entry(class.clone()).or_default(),
                    Some(Selector::Id(id)) => sheet.ids.entry(id.clone()).or_default(),
                    None => return Err(StyleError::UnexpectedToken(format!("{}:{}", name, value))),
                };

                rules.insert(
                    name.clone(),
                    Declaration {
                        name,
                        value,
                        conditions: conditions.clone(),
                    },
                );
            }
            StyleToken::BeginDeclarationBlock => {}
            StyleToken::EndDeclarationBlock => selector = None,
        }
    }

    Ok(sheet)
}

/// Converts a dashed property name to camel case, so
/// `background-color` becomes `backgroundColor`.
///
pub fn camelize(name: &str) -> String {
    let mut camelized = String::with_capacity(name.len());
    let mut upper = false;

    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            camelized.extend(c.to_uppercase());
            upper = false;
        } else {
            camelized.push(c);
        }
    }

    camelized
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn declaration(name: &str, value: &str, conditions: &[&str]) -> Declaration {
        Declaration {
            name: name.to_string(),
            value: value.to_string(),
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/stylesheets")
            .join(name)
    }

    // ----------------------------------------- compile_source tests

    #[test]
    fn test_compile_single_class() {
        let sheet = compile_source(".a { b:c }").unwrap();

        assert_eq!(
            sheet.classes["a"],
            Rules::from([("b".to_string(), declaration("b", "c", &[]))])
        );
        assert_eq!(
            serde_json::to_value(&sheet.classes["a"]).unwrap(),
            serde_json::json!({"b": {"name": "b", "value": "c", "conditions": []}})
        );
    }

    #[test]
    fn test_compile_ids_and_classes() {
        let sheet = compile_source("#main { width: 10 } .a { b: c; d: e; }").unwrap();

        assert_eq!(sheet.ids["main"]["width"], declaration("width", "10", &[]));
        assert_eq!(sheet.classes["a"].len(), 2);
    }

    #[test]
    fn test_compile_media_condition() {
        let sheet =
            compile_source("@media (Device.getOrientation() == \"portrait\") { .a { b:c } }")
                .unwrap();

        assert_eq!(
            sheet.classes["a"]["b"],
            declaration("b", "c", &["(Device.getOrientation() == \"portrait\")"])
        );
    }

    #[test]
    fn test_compile_nested_conditions_accumulate() {
        let source = "@media (outer) { @media (inner) and (other) { .a { b:c } } .d { e:f } } .g { h:i }";
        let sheet = compile_source(source).unwrap();

        assert_eq!(
            sheet.classes["a"]["b"].conditions,
            vec!["(outer)", "(inner)", "(other)"]
        );
        assert_eq!(sheet.classes["d"]["e"].conditions, vec!["(outer)"]);
        assert!(sheet.classes["g"]["h"].conditions.is_empty());
    }

    #[test]
    fn test_compile_later_declaration_wins() {
        let sheet = compile_source(".a { b: 1; c: 2 } .a { b: 3 }").unwrap();

        assert_eq!(sheet.classes["a"]["b"].value, "3");
        assert_eq!(sheet.classes["a"]["c"].value, "2");
    }

    #[test]
    fn test_compile_empty_block_registers_selector() {
        let sheet = compile_source(".a { }").unwrap();
        assert!(sheet.classes["a"].is_empty());
    }

    // ----------------------------------------- StyleSheetTable tests

    #[test]
    fn test_table_compile_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, ".a {{ b:c }}").unwrap();

        let mut table = StyleSheetTable::new();
        let sheet = table.compile(file.path()).unwrap();

        assert_eq!(sheet.classes["a"]["b"].value, "c");
        assert!(table.get(file.path()).is_some());
    }

    #[test]
    fn test_table_recompile_overwrites() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, ".a {{ b:c }}").unwrap();

        let mut table = StyleSheetTable::new();
        table.compile(file.path()).unwrap();

        fs::write(file.path(), ".z { y:x }").unwrap();
        assert_eq!(table.load(file.path()).unwrap().classes.len(), 1);
        assert!(table.load(file.path()).unwrap().classes.contains_key("a"));

        let sheet = table.compile(file.path()).unwrap();
        assert!(sheet.classes.contains_key("z"));
        assert!(!sheet.classes.contains_key("a"));
    }

    #[test]
    fn test_table_missing_file() {
        let mut table = StyleSheetTable::new();
        let err = table.compile(Path::new("/nonexistent/main.iss")).unwrap_err();

        assert!(matches!(err, StyleError::StyleSheetNotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/main.iss"));
    }

    #[test]
    fn test_table_merge() {
        let mut first = StyleSheetTable::new();
        first.insert("a.iss", compile_source(".a { b:1 }").unwrap());
        first.insert("b.iss", compile_source(".b { c:1 }").unwrap());

        let mut second = StyleSheetTable::new();
        second.insert("a.iss", compile_source(".a { b:2 }").unwrap());

        first.merge(second);

        assert_eq!(first.len(), 2);
        assert_eq!(first.get(Path::new("a.iss")).unwrap().classes["a"]["b"].value, "2");
    }

    #[test]
    fn test_table_compile_fixture() {
        let mut table = StyleSheetTable::new();
        let sheet = table.compile(&fixture("single.css")).unwrap();

        assert_eq!(sheet.classes["a"]["b"], declaration("b", "c", &[]));
    }

    #[test]
    fn test_table_compile_fixture_with_condition() {
        let mut table = StyleSheetTable::new();
        let sheet = table.compile(&fixture("portrait.css")).unwrap();

        assert_eq!(
            sheet.classes["a"]["b"],
            declaration("b", "c", &["(Device.getOrientation() == \"portrait\")"])
        );
    }

    #[test]
    fn test_table_load_keeps_existing_entry() {
        let mut table = StyleSheetTable::new();
        table.insert(fixture("single.css"), StyleSheet::default());

        let sheet = table.load(&fixture("single.css")).unwrap();

        assert!(sheet.classes.is_empty());
        assert_eq!(table.len(), 1);
    }

    // ----------------------------------------- camelize tests

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("background-color"), "backgroundColor");
        assert_eq!(camelize("border-top-left-radius"), "borderTopLeftRadius");
        assert_eq!(camelize("width"), "width");
    }
}
