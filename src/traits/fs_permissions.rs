//! Permission management operations.

use std::path::Path;

use crate::FsError;

/// Permission management operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Note
///
/// Reading permissions is done via [`FsRead::metadata`](super::FsRead::metadata).
/// This trait only provides the ability to set permissions.
pub trait FsPermissions: Send + Sync {
    /// Set the mode bits of a file (`chmod`).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::InvalidMode`] if `mode` has bits outside `0o7777`
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), FsError>;
}
