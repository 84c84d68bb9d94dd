//! # Filesystem Driver Traits
//!
//! The syscall surface the atomic write pipeline needs, split into small
//! component traits and combined into [`FsAtomic`].
//!
//! ## Quick Reference
//!
//! | Trait | Operations | Used by step |
//! |-------|------------|--------------|
//! | [`FsPath`] | `canonicalize` | resolve real path |
//! | [`FsRead`] | `metadata`, `exists`, `read` | copy attributes |
//! | [`FsHandles`] | `open`, `write_at`, `close` | create and fill the temp file |
//! | [`FsSync`] | `fsync` | flush to stable storage |
//! | [`FsOwnership`] | `set_owner`, `supports_owner_ids` | chown |
//! | [`FsPermissions`] | `set_permissions` | chmod |
//! | [`FsWrite`] | `rename`, `remove_file`, `write` | publish, rollback |
//! | [`FsLink`] | `symlink`, `read_link`, `symlink_metadata` | default `canonicalize` |
//!
//! ## Blanket Implementation
//!
//! Implement the component traits and you get [`FsAtomic`] automatically:
//!
//! ```rust
//! use atomic_file_write::{FsAtomic, MemoryFs, NativeFs};
//!
//! fn takes_driver<B: FsAtomic>(_backend: &B) {}
//! takes_driver(&MemoryFs::new());
//! takes_driver(&NativeFs::new());
//! ```
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self` to enable concurrent
//! access. Drivers use interior mutability for thread-safe state management.
//!
//! ## Object Safety
//!
//! All traits, including [`FsAtomic`], are object-safe:
//!
//! ```rust
//! use atomic_file_write::FsAtomic;
//!
//! fn process(fs: &dyn FsAtomic) {
//!     let _ = fs.exists(std::path::Path::new("/file.txt"));
//! }
//! ```

mod fs_handles;
mod fs_link;
mod fs_owner;
mod fs_path;
mod fs_permissions;
mod fs_read;
mod fs_sync;
mod fs_write;

pub use fs_handles::FsHandles;
pub use fs_link::FsLink;
pub use fs_owner::FsOwnership;
pub use fs_path::FsPath;
pub use fs_permissions::FsPermissions;
pub use fs_read::FsRead;
pub use fs_sync::FsSync;
pub use fs_write::FsWrite;

pub(crate) use fs_path::normalize_path;

/// Everything an atomic write needs from a filesystem driver.
///
/// # Blanket Implementation
///
/// Automatically implemented for any type implementing all component traits.
/// You never need to implement `FsAtomic` directly.
pub trait FsAtomic:
    FsRead + FsWrite + FsHandles + FsSync + FsPermissions + FsOwnership + FsPath
{
}

impl<T> FsAtomic for T where
    T: FsRead + FsWrite + FsHandles + FsSync + FsPermissions + FsOwnership + FsPath
{
}
