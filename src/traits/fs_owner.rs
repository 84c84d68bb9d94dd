//! Ownership operations.

use std::path::Path;

use crate::{FsError, Ownership};

/// Numeric ownership operations (`chown`).
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsOwnership`.
pub trait FsOwnership: Send + Sync {
    /// Change the owner of a file.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::PermissionDenied`] if the process may not give the file away
    /// - [`FsError::NotSupported`] if the platform has no numeric owners
    fn set_owner(&self, path: &Path, owner: Ownership) -> Result<(), FsError>;

    /// Whether this driver exposes numeric user/group ids.
    ///
    /// Ownership is only copied from an existing file when this returns `true`.
    fn supports_owner_ids(&self) -> bool;
}
