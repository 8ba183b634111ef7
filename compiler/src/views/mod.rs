//! View Template Compiler
//!
//! Compiles XML view templates (.xml) into JavaScript view
//! factories. Each template is tokenized, styled from its linked
//! stylesheets and turned into a `module.exports` function that
//! builds the view tree through `Ti.UI.create*`. The same compile
//! yields an executable program so templates can be rendered
//! in-process against JSON data.
//!

pub mod attributes;
pub mod config;
pub mod entities;
pub mod format;
pub mod generator;
pub mod interpolate;
pub mod lexer;
pub mod options;
pub mod registry;
pub mod runtime;
pub mod validator;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::common::colors::{GREEN, NC, RED, YELLOW};
use crate::styles::StyleSheetTable;
use crate::styles::expanders::ExpanderRegistry;
use config::ViewsConfig;
use generator::{CompileError, ViewCompiler};
use runtime::{ExecutionContext, RuntimeError, TreeRuntime, ViewNode};
use validator::CompiledFile;

// ------------------------------------------------------------- Public Types

/// Errors raised while rendering a template in-process.
///
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read data file `{}`", path.display())]
    DataNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in `{}`: {source}", path.display())]
    InvalidData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

// ------------------------------------------------------------- Public Functions

/// Compiles every template in the project. If any template
/// fails, all factories written in this run are reverted and
/// the process exits with code 1.
///
pub fn compile(verbose: bool) {
    let config = ViewsConfig::read();
    let templates = config.find_templates();

    if templates.is_empty() {
        println!("{}No view templates found{}", YELLOW, NC);
        return;
    }

    if verbose {
        println!("{}Compiling view templates...{}", YELLOW, NC);
    }

    compile_batch(&config, &templates, verbose);
}

/// Compiles only stale templates for incremental builds. A
/// template is stale when it or a stylesheet it links is newer
/// than its compiled factory.
///
pub fn compile_stale(verbose: bool) {
    let config = ViewsConfig::read();
    let stale_files = config.find_stale_templates();

    if stale_files.is_empty() {
        return;
    }

    if verbose {
        let count = stale_files.len();
        if count == 1 {
            println!("{}Compiling 1 stale view template...{}", YELLOW, NC);
        } else {
            println!(
                "{}Compiling {} stale view templates...{}",
                YELLOW, count, NC
            );
        }
    }

    compile_batch(&config, &stale_files, verbose);
}

/// Checks if view compilation is needed for watch mode. Returns
/// false early if auto_compile is disabled in the project
/// config, avoiding unnecessary file stat checks.
///
pub fn should_auto_compile() -> bool {
    let config = ViewsConfig::read();
    config.auto_compile && config.is_stale()
}

/// Compiles a template, renders it against the JSON in `data`
/// (an empty object when absent) and prints the view tree.
///
pub fn render(template: &Path, data: Option<&Path>) {
    let config = ViewsConfig::read();

    let result = match data {
        Some(path) => load_data(path),
        None => Ok(Value::Object(Map::new())),
    }
    .and_then(|data| render_tree(&config, template, data));

    let tree = match result {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("{}Error in {}: {}{}", RED, template.display(), err, NC);
            process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&tree) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            eprintln!("{}Failed to serialize view tree: {}{}", RED, err, NC);
            process::exit(1);
        }
    }
}

/// Compiles `template` and executes it against `data`,
/// returning the recorded root view.
///
pub fn render_tree(
    config: &ViewsConfig,
    template: &Path,
    data: Value,
) -> Result<ViewNode, RenderError> {
    let view_types = config.view_types();
    let expanders = ExpanderRegistry::with_defaults();
    let mut stylesheets = StyleSheetTable::new();

    let compiled =
        ViewCompiler::new(&view_types, &expanders, &mut stylesheets).compile(template)?;
    log::debug!(
        "Compiled {} with {} dependencies",
        template.display(),
        compiled.program.dependencies.len()
    );

    let mut runtime = TreeRuntime::new();
    let root = runtime::execute(&compiled.program, &ExecutionContext::new(data), &mut runtime)?;

    Ok(runtime.tree(root))
}

/// Reads and parses a JSON data file.
///
pub fn load_data(path: &Path) -> Result<Value, RenderError> {
    let content = fs::read_to_string(path).map_err(|source| RenderError::DataNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| RenderError::InvalidData {
        path: path.to_path_buf(),
        source,
    })
}

// ------------------------------------------------------------- Private Functions

/// Compiles a batch of templates sharing one stylesheet table.
/// Every template is attempted so all errors are reported; any
/// failure reverts the written files and exits with code 1.
///
fn compile_batch(config: &ViewsConfig, templates: &[PathBuf], verbose: bool) {
    let view_types = config.view_types();
    let expanders = ExpanderRegistry::with_defaults();
    let mut stylesheets = StyleSheetTable::new();
    let mut compiler = ViewCompiler::new(&view_types, &expanders, &mut stylesheets);

    let mut compiled_files = Vec::new();
    let mut failed = false;

    for template in templates {
        match compile_file(&mut compiler, config, template, verbose) {
            Some(file) => compiled_files.push(file),
            None => failed = true,
        }
    }

    if failed {
        validator::revert_files(&compiled_files);
        eprintln!("{}View compilation failed{}", RED, NC);
        process::exit(1);
    }

    print_compiled_count(compiled_files.len());
}

/// Compiles a single template and writes its factory. Returns
/// the written file for potential rollback, or None with the
/// error printed to stderr.
///
fn compile_file(
    compiler: &mut ViewCompiler<'_>,
    config: &ViewsConfig,
    template: &Path,
    verbose: bool,
) -> Option<CompiledFile> {
    let compiled = match compiler.compile(template) {
        Ok(compiled) => compiled,
        Err(err) => {
            eprintln!("{}Error in {}: {}{}", RED, template.display(), err, NC);
            return None;
        }
    };

    let output = config.output_path(template);

    match validator::write_output(&output, &compiled.code) {
        Ok(file) => {
            if verbose {
                println!(
                    "  {} -> {}{}{}",
                    template.display(),
                    GREEN,
                    output.display(),
                    NC
                );
            }
            Some(file)
        }
        Err(err) => {
            eprintln!("{}Failed to write {}: {}{}", RED, output.display(), err, NC);
            None
        }
    }
}

/// Prints the compilation success message with proper grammar.
///
fn print_compiled_count(count: usize) {
    if count == 1 {
        println!("{}Compiled 1 view template{}", GREEN, NC);
    } else {
        println!("{}Compiled {} view templates{}", GREEN, count, NC);
    }
}

// ------------------------------------------------------------- Unit Tests
