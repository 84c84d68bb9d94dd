//! Path-based mutation operations.

use std::path::Path;

use crate::FsError;

/// Path-based write operations for a filesystem driver.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite: Send + Sync {
    /// Write data to a file in place (creates if not exists, truncates if exists).
    ///
    /// This is the plain, non-atomic write. The atomic pipeline never calls it.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if parent directory does not exist
    /// - [`FsError::NotAFile`] if the path is a directory
    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Remove a file.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file does not exist
    /// - [`FsError::NotAFile`] if the path is a directory
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Rename a file, replacing `to` if it exists.
    ///
    /// Must be atomic: any reader of `to` sees either the old entry or the
    /// new one, never a partial state.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the source path does not exist
    /// - [`FsError::NotAFile`] if `to` is a directory
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;
}
