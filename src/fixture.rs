//! Fixture project staging.
//!
//! Copies a pre-authored project tree out of a read-only fixture root into a
//! test case's project directory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Stages the named fixture project into `project_dir`.
///
/// Performs a full recursive copy preserving directory structure and file
/// contents. Symbolic links are not followed and not copied; each skipped
/// link is logged at warn level (fixture trees are plain source trees, and a
/// link could point outside the sandbox).
pub fn stage_fixture(fixture_root: &Path, name: &str, project_dir: &Path) -> Result<PathBuf> {
    let source = fixture_root.join(name);
    if !source.is_dir() {
        return Err(Error::FixtureNotFound(source));
    }

    tracing::debug!(fixture = %name, dest = ?project_dir, "staging fixture project");
    copy_tree(&source, project_dir)?;
    Ok(source)
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;

    let entries = std::fs::read_dir(source).map_err(|e| Error::io(source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(source, e))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());

        let file_type = entry.file_type().map_err(|e| Error::io(&from, e))?;
        if file_type.is_symlink() {
            tracing::warn!(path = ?from, "skipping symlink in fixture tree");
        } else if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(|e| Error::io(&from, e))?;
        }
    }
    Ok(())
}
