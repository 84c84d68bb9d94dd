//! # FsPath Trait
//!
//! Real-path resolution (`realpath`) with a default implementation.
//!
//! ## Responsibility
//! - Resolve symlinks and normalize `.`/`..` so the write pipeline can
//!   place its temp file next to the file that is actually replaced
//!
//! ## Dependencies
//! - [`FsRead`] for checking path existence
//! - [`FsLink`] for symlink resolution
//!
//! ## Usage
//!
//! ```rust
//! use atomic_file_write::{FsPath, FsWrite, MemoryFs};
//! use std::path::Path;
//!
//! let fs = MemoryFs::new();
//! fs.write(Path::new("/file.txt"), b"").unwrap();
//! let path = fs.canonicalize(Path::new("/./file.txt")).unwrap();
//! assert_eq!(path, Path::new("/file.txt"));
//! ```

use std::path::{Component, Path, PathBuf};

use crate::{FileType, FsError, FsLink, FsRead};

/// Maximum depth for symlink resolution to prevent infinite loops.
const MAX_SYMLINK_DEPTH: usize = 40;

/// Real-path resolution with a default implementation.
///
/// # Default Implementation
///
/// Drivers that store symlinks as data opt in with an empty impl
/// (`impl FsPath for MyFs {}`) and get a component-by-component walk over
/// [`FsLink`]. Drivers backed by an OS override
/// [`canonicalize`](FsPath::canonicalize) with the native call.
pub trait FsPath: FsRead + FsLink {
    /// Resolve all symlinks and normalize path (`.`, `..`).
    ///
    /// All path components must exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] - A component doesn't exist
    /// - [`FsError::InvalidData`] - Symlink loop detected (exceeded max depth)
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        resolve_path_internal(self, path, 0)
    }
}

/// Walks the path component by component, following symlinks.
fn resolve_path_internal<F: FsRead + FsLink + ?Sized>(
    fs: &F,
    path: &Path,
    depth: usize,
) -> Result<PathBuf, FsError> {
    if depth > MAX_SYMLINK_DEPTH {
        return Err(FsError::InvalidData {
            path: path.to_path_buf(),
            details: format!("symlink loop detected (exceeded max depth of {MAX_SYMLINK_DEPTH})"),
        });
    }

    let mut resolved = PathBuf::new();

    for component in path.components() {
        match component {
            Component::RootDir => {
                resolved = PathBuf::from("/");
            }
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
                if resolved.as_os_str().is_empty() {
                    resolved = PathBuf::from("/");
                }
            }
            Component::Normal(name) => {
                resolved.push(name);

                let meta = fs.symlink_metadata(&resolved)?;
                if meta.file_type == FileType::Symlink {
                    let target = fs.read_link(&resolved)?;
                    resolved.pop();

                    // Relative targets resolve against the link's directory.
                    let full_target = if target.is_absolute() {
                        target
                    } else {
                        resolved.join(&target)
                    };
                    resolved = resolve_path_internal(fs, &full_target, depth + 1)?;
                }
            }
            Component::Prefix(_) => {
                resolved.push(component);
            }
        }
    }

    if resolved.as_os_str().is_empty() {
        resolved = PathBuf::from("/");
    }

    if !fs.exists(&resolved)? {
        return Err(FsError::NotFound { path: resolved });
    }

    Ok(resolved)
}

/// Lexical path normalization without filesystem access.
///
/// Handles `.`, `..`, and repeated separators but does NOT follow symlinks.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::RootDir => {
                normalized.push(Component::RootDir);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
                if normalized.as_os_str().is_empty() && path.has_root() {
                    normalized.push(Component::RootDir);
                }
            }
            Component::Normal(name) => {
                normalized.push(name);
            }
            Component::Prefix(prefix) => {
                normalized.push(prefix.as_os_str());
            }
        }
    }

    normalized
}
