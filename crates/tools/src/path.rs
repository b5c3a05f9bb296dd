//! Root-directory confinement for the local file tools.
//!
//! Every path a tool touches is resolved against a single allowed root and
//! must stay inside it after symlinks and `..` components are resolved.

use std::path::{Component, Path, PathBuf};

/// Error returned when a requested path cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Access denied: file is outside allowed directory")]
    OutsideRoot { requested: String },

    #[error("Allowed directory '{root}' is not accessible: {reason}")]
    RootUnavailable { root: String, reason: String },
}

/// Canonicalize the allowed root itself.
pub fn canonical_root(root: &Path) -> Result<PathBuf, PathError> {
    root.canonicalize().map_err(|e| PathError::RootUnavailable {
        root: root.display().to_string(),
        reason: e.to_string(),
    })
}

/// Resolve `requested` (relative to `root`) and check it stays inside `root`.
///
/// Absolute paths and lexical escapes (`../..`) are rejected before touching
/// the filesystem. Existing paths are then canonicalized so a symlink inside
/// the root cannot point outside it. A path that does not exist yet is
/// returned joined but unresolved; the caller's I/O reports the miss.
pub fn resolve_within(root: &Path, requested: &str) -> Result<PathBuf, PathError> {
    let root = canonical_root(root)?;
    let outside = || PathError::OutsideRoot {
        requested: requested.to_string(),
    };

    let relative = Path::new(requested);
    let mut depth: usize = 0;
    for component in relative.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => depth = depth.checked_sub(1).ok_or_else(outside)?,
            Component::RootDir | Component::Prefix(_) => return Err(outside()),
        }
    }

    let joined = root.join(relative);
    if !joined.exists() {
        return Ok(joined);
    }

    let resolved = joined.canonicalize().map_err(|_| outside())?;
    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(outside())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_filename_resolves_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        let resolved = resolve_within(dir.path(), "notes.txt").unwrap();
        assert!(resolved.ends_with("notes.txt"));
        assert!(resolved.starts_with(dir.path().canonicalize().unwrap()));
    }

    #[test]
    fn traversal_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_within(dir.path(), "../../etc/passwd").unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));
        assert_eq!(
            err.to_string(),
            "Access denied: file is outside allowed directory"
        );
    }

    #[test]
    fn inner_parent_components_are_allowed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();

        let resolved = resolve_within(dir.path(), "sub/../a.txt").unwrap();
        assert!(resolved.ends_with("a.txt"));
    }

    #[test]
    fn absolute_path_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_within(dir.path(), "/etc/passwd").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_is_denied() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "s").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("link.txt"))
            .unwrap();

        assert!(resolve_within(dir.path(), "link.txt").is_err());
    }

    #[test]
    fn missing_root_is_reported() {
        let err = resolve_within(Path::new("/nonexistent/ragpilot-root"), "a.txt").unwrap_err();
        assert!(matches!(err, PathError::RootUnavailable { .. }));
    }
}
