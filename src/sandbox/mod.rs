//! Sandbox directory lifecycle: path resolution and provisioning.

mod layout;
mod provision;

pub use layout::{CacheScope, SandboxLayout, TestId, CACHE_SUBDIR, PROJECT_SUBDIR};
pub use provision::provision;
