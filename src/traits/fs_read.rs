//! Read-side operations used by the write pipeline.

use std::path::Path;

use crate::{FsError, Metadata};

/// Read operations for a filesystem driver.
///
/// All methods use `&self` (interior mutability). Drivers manage their own synchronization.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access. Drivers should use interior mutability (`RwLock`, `Mutex`)
/// for thread-safe state management.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
pub trait FsRead: Send + Sync {
    /// Read entire file contents as bytes.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotAFile`] if the path is a directory
    /// - [`FsError::PermissionDenied`] if read access is denied
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Check if a path exists.
    ///
    /// Returns `Ok(true)` if the path exists, `Ok(false)` if it does not.
    /// Only returns an error for unexpected failures (e.g., I/O errors).
    fn exists(&self, path: &Path) -> Result<bool, FsError>;

    /// Get metadata for a path (follows symlinks, like `stat`).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_read_is_object_safe() {
        fn _check(_: &dyn FsRead) {}
    }

    #[test]
    fn fs_read_requires_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        fn _check<T: FsRead>() {
            _assert_send_sync::<T>();
        }
    }
}
