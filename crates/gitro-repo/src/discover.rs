use std::path::{Path, PathBuf};

use crate::RepoError;

/// Resolve the supplied path to a repository directory.
///
/// A directory is used as-is. A regular file is treated as a gitdir
/// pointer: its first line must be `gitdir: <path>`. An absolute target is
/// used directly; a relative target is resolved against the directory
/// containing the pointer, or one level higher when the pointer file is
/// itself named `.git`. The result must be an existing directory.
pub fn resolve_repo_path(path: &Path) -> Result<PathBuf, RepoError> {
    if path.is_dir() {
        return Ok(path.to_path_buf());
    }

    if path.is_file() {
        let target = parse_gitdir_pointer(path)?;
        let resolved = if target.is_absolute() {
            target
        } else {
            let base = pointer_base(path);
            match base {
                Some(base) => base.join(&target),
                None => target,
            }
        };
        if resolved.is_dir() {
            return Ok(resolved);
        }
        return Err(RepoError::NotARepository(resolved));
    }

    Err(RepoError::NotARepository(path.to_path_buf()))
}

/// Parse a pointer file containing `gitdir: <path>`.
pub fn parse_gitdir_pointer(path: &Path) -> Result<PathBuf, RepoError> {
    let content = std::fs::read_to_string(path).map_err(|e| RepoError::InvalidPointer {
        path: path.to_path_buf(),
        reason: format!("cannot read pointer file: {e}"),
    })?;
    let first_line = content.lines().next().unwrap_or("").trim();
    let target = first_line
        .strip_prefix("gitdir: ")
        .ok_or_else(|| RepoError::NotARepository(path.to_path_buf()))?;
    Ok(PathBuf::from(target.trim()))
}

/// Base directory for resolving a relative pointer target.
fn pointer_base(pointer: &Path) -> Option<&Path> {
    let parent = pointer.parent()?;
    if pointer.file_name().is_some_and(|n| n == ".git") {
        parent.parent()
    } else {
        Some(parent)
    }
}
