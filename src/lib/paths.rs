//! Shared helpers reused across modules (e.g., path validation).

use std::path::{Component, Path};

/// Returns true if the path is non-empty, relative, and free of parent traversal.
pub fn is_plain_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path.is_relative()
        && path
            .components()
            .all(|component| !matches!(component, Component::ParentDir))
}
