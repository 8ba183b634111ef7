//! Batch Rollback
//!
//! Tracks every factory written during a batch compile together
//! with what the file held before. If any template in the batch
//! fails, all written files are restored so the output directory
//! never mixes fresh and stale factories.
//!

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::views::config;

// ------------------------------------------------------------- Public Types

/// Represents a compiled file with its output path and the
/// previous content for potential rollback.
///
#[derive(Debug)]
pub struct CompiledFile {
    /// Path to the generated output file.
    ///
    pub output: PathBuf,
    /// Previous file content, `None` if the file was new.
    ///
    pub previous: Option<String>,
}

// ------------------------------------------------------------- Public Functions

/// Writes generated code to `output`, remembering the previous
/// content for [`revert_files`].
///
pub fn write_output(output: &Path, code: &str) -> io::Result<CompiledFile> {
    config::ensure_directory_exists(output);

    let previous = fs::read_to_string(output).ok();
    fs::write(output, code)?;

    Ok(CompiledFile {
        output: output.to_path_buf(),
        previous,
    })
}

/// Restores files to their previous state after a failed
/// batch. New files are deleted, while modified files are
/// restored to their original content.
///
pub fn revert_files(files: &[CompiledFile]) {
    for file in files {
        let result = match &file.previous {
            Some(previous) => fs::write(&file.output, previous),
            None => fs::remove_file(&file.output),
        };

        if let Err(e) = result {
            log::warn!("Failed to revert {}: {}", file.output.display(), e);
        }
    }
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_output_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a/b/view.js");

        let file = write_output(&output, "code").unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "code");
        assert_eq!(file.previous, None);
    }

    #[test]
    fn test_revert_restores_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("view.js");
        fs::write(&output, "old").unwrap();

        let file = write_output(&output, "new").unwrap();
        revert_files(&[file]);

        assert_eq!(fs::read_to_string(&output).unwrap(), "old");
    }

    #[test]
    fn test_revert_removes_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("view.js");

        let file = write_output(&output, "new").unwrap();
        revert_files(&[file]);

        assert!(!output.exists());
    }

    #[test]
    fn test_revert_keeps_empty_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("view.js");
        fs::write(&output, "").unwrap();

        let file = write_output(&output, "new").unwrap();
        revert_files(&[file]);

        assert_eq!(fs::read_to_string(&output).unwrap(), "");
    }
}
