//! Configuration and Path Utilities
//!
//! Handles reading view settings from ingot.toml, path
//! transformations between templates and their compiled
//! factories, and staleness detection for incremental
//! compilation.
//!

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::SystemTime;

use crate::common::colors::{NC, RED};
use crate::patterns::{HREF, LINK_TAG, STYLESHEET_REL};
use crate::views::registry::ViewTypes;

// ------------------------------------------------------------- Public Consts

/// Default root directory containing `.xml` view templates.
///
pub const VIEWS_PATH: &str = "app/views/";

/// Default output directory for compiled `.js` factories.
/// Generated files mirror the source directory structure.
///
pub const OUTPUT_PATH: &str = "Resources/views/";

// ------------------------------------------------------------- Private Consts

/// User's project config file. Settings live under `[views]`.
///
const INGOT_TOML: &str = "ingot.toml";

const TEMPLATE_EXT: &str = "xml";

const OUTPUT_EXT: &str = "js";

// ------------------------------------------------------------- Public Types

/// The `[views]` section of ingot.toml, with defaults for every
/// missing key.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ViewsConfig {
    /// Compile automatically in watch mode. Defaults to true.
    ///
    pub auto_compile: bool,
    pub source: PathBuf,
    pub output: PathBuf,
    /// View types registered on top of the Titanium set.
    ///
    pub types: Vec<String>,
}

// ------------------------------------------------------------- Private Types

/// Top level of ingot.toml. Sections other than `[views]` belong
/// to other tools and are ignored.
///
#[derive(Debug, Default, Deserialize)]
struct IngotToml {
    #[serde(default)]
    views: ViewsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewsSection {
    auto_compile: Option<bool>,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    types: Option<Vec<String>>,
}

// ------------------------------------------------------------- Public Implementations

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            auto_compile: true,
            source: PathBuf::from(VIEWS_PATH),
            output: PathBuf::from(OUTPUT_PATH),
            types: Vec::new(),
        }
    }
}

impl ViewsConfig {
    /// Reads ingot.toml from the working directory. A missing or
    /// unreadable file yields the defaults; a file that is not
    /// valid TOML exits with an error.
    ///
    pub fn read() -> Self {
        let Ok(content) = fs::read_to_string(INGOT_TOML) else {
            return Self::default();
        };

        match Self::from_toml(&content) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}Invalid {}: {}{}", RED, INGOT_TOML, e, NC);
                process::exit(1);
            }
        }
    }

    /// Parses the `[views]` section, filling missing keys with
    /// their defaults.
    ///
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let views = toml::from_str::<IngotToml>(content)?.views;
        let defaults = Self::default();

        Ok(Self {
            auto_compile: views.auto_compile.unwrap_or(defaults.auto_compile),
            source: views.source.unwrap_or(defaults.source),
            output: views.output.unwrap_or(defaults.output),
            types: views.types.unwrap_or_default(),
        })
    }

    /// The Titanium view types plus the configured extras.
    ///
    pub fn view_types(&self) -> ViewTypes {
        let mut view_types = ViewTypes::titanium();
        for name in &self.types {
            view_types.register(name);
        }
        view_types
    }

    /// Recursively finds all templates under the source
    /// directory, sorted for a stable compile order.
    ///
    pub fn find_templates(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files_with_ext(&self.source, TEMPLATE_EXT, &mut files);
        files.sort();
        files
    }

    /// Converts a template path to its output path. Transforms
    /// app/views/home/index.xml to Resources/views/home/index.js.
    ///
    pub fn output_path(&self, template: &Path) -> PathBuf {
        let relative = template.strip_prefix(&self.source).unwrap_or(template);
        self.output.join(relative).with_extension(OUTPUT_EXT)
    }

    /// Finds all templates that need recompilation: those newer
    /// than their output, or linking a stylesheet that is.
    ///
    pub fn find_stale_templates(&self) -> Vec<PathBuf> {
        let templates = self.find_templates();

        if !self.output.exists() {
            // No output directory - everything is stale
            return templates;
        }

        templates
            .into_iter()
            .filter(|template| {
                let output = self.output_path(template);
                if is_source_newer(template, &output) {
                    return true;
                }

                fs::read_to_string(template)
                    .map(|content| {
                        linked_stylesheets(template, &content)
                            .iter()
                            .any(|sheet| is_source_newer(sheet, &output))
                    })
                    .unwrap_or(false)
            })
            .collect()
    }

    /// True when any template needs recompilation.
    ///
    pub fn is_stale(&self) -> bool {
        !self.find_stale_templates().is_empty()
    }
}

// ------------------------------------------------------------- Public Functions

/// Paths of the stylesheets a template links, resolved against
/// the template's directory.
///
pub fn linked_stylesheets(template: &Path, content: &str) -> Vec<PathBuf> {
    let directory = template.parent().unwrap_or(Path::new(""));

    LINK_TAG
        .find_iter(content)
        .map(|tag| tag.as_str())
        .filter(|tag| STYLESHEET_REL.is_match(tag))
        .filter_map(|tag| HREF.captures(tag))
        .map(|captures| directory.join(&captures[1]))
        .collect()
}

/// Ensures the parent directory exists for a file path.
/// Creates all intermediate directories as needed before
/// writing compiled output files.
///
pub fn ensure_directory_exists(file_path: &Path) {
    if let Some(parent) = file_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
}

// ------------------------------------------------------------- Private Functions

/// Recursively collects files with a specific extension.
/// Walks the directory tree depth-first and accumulates
/// matching files into the provided vector.
///
fn collect_files_with_ext(dir: &Path, ext: &str, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();

            if path.is_dir() {
                collect_files_with_ext(&path, ext, files);
            } else if path.extension().is_some_and(|e| e == ext) {
                files.push(path);
            }
        }
    }
}

/// Checks if a source file is newer than its output.
/// Returns true if the source exists but output doesn't,
/// or if source mtime is greater than output mtime.
///
fn is_source_newer(source: &Path, output: &Path) -> bool {
    match (get_mtime(source), get_mtime(output)) {
        (Some(s), Some(o)) => s > o,
        (Some(_), None) => true, // Source exists but output doesn't
        _ => false,
    }
}

fn get_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

// ------------------------------------------------------------- Unit Tests
