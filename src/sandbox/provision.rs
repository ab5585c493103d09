//! Directory provisioning for sandbox layouts.

use std::path::Path;

use crate::error::{Error, Result};

use super::SandboxLayout;

/// Creates every directory in the layout, including intermediate segments.
///
/// Idempotent: provisioning the same layout twice is a no-op. Failures are
/// fatal for the test case and carry the offending path.
pub fn provision(layout: &SandboxLayout) -> Result<()> {
    for dir in [
        &layout.case_dir,
        &layout.cache_dir,
        &layout.project_dir,
    ] {
        create_dir(dir)?;
    }
    tracing::debug!(case_dir = ?layout.case_dir, "provisioned sandbox directories");
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}
