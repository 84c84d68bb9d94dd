//! # atomic-file-write
//!
//! Crash-safe file replacement: write to a uniquely named sibling temp
//! file, flush it, then atomically rename it over the target.
//!
//! A reader of the target sees either the complete old content or the
//! complete new content, never a mix. Concurrent writes to the same path
//! made through one [`WriteCoordinator`] run strictly in submission order.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use atomic_file_write::{write_file, write_file_sync, WriteOptions};
//!
//! # async fn run() -> Result<(), atomic_file_write::FsError> {
//! // Async: queued behind earlier writes to the same path.
//! write_file("settings.json", r#"{"theme":"dark"}"#, WriteOptions::new()).await?;
//!
//! // Sync: same pipeline on the calling thread, no queue.
//! write_file_sync("settings.json", "{}", &WriteOptions::new().mode(0o600))?;
//! # Ok(())
//! # }
//! ```
//!
//! ---
//!
//! ## The Pipeline
//!
//! | Step | Driver call | On failure |
//! |------|-------------|------------|
//! | resolve real path | [`FsPath::canonicalize`] | fall back to the given path |
//! | pick temp name | none ([`temp_name`]) | n/a |
//! | copy attributes | [`FsRead::metadata`] | keep defaults |
//! | create temp | [`FsHandles::open`] | abort |
//! | write payload | [`FsHandles::write_at`] | close, unlink, abort |
//! | flush | [`FsSync::fsync`] | close, unlink, abort |
//! | close | [`FsHandles::close`] | unlink, abort |
//! | chown, chmod | [`FsOwnership`], [`FsPermissions`] | unlink, abort |
//! | publish | [`FsWrite::rename`] | unlink, abort |
//!
//! Cleanup errors are logged and swallowed; the caller always receives the
//! error of the step that failed.
//!
//! ---
//!
//! ## Drivers
//!
//! Every step goes through the [`FsAtomic`] driver traits, so the same
//! pipeline runs over the host filesystem ([`NativeFs`]), an in-memory
//! tree ([`MemoryFs`]), or any wrapped driver built with [`Layer`].
//!
//! ```rust
//! use atomic_file_write::{FsAtomicExt, FsRead, MemoryFs, WriteOptions};
//! use std::path::Path;
//!
//! let fs = MemoryFs::new();
//! fs.write_file_atomic(Path::new("/out.txt"), "hello", &WriteOptions::new())?;
//! assert_eq!(fs.read(Path::new("/out.txt"))?, b"hello");
//! # Ok::<(), atomic_file_write::FsError>(())
//! ```
//!
//! ---
//!
//! ## Error Handling
//!
//! All operations return `Result<T, FsError>`. Errors include context:
//!
//! ```rust
//! use atomic_file_write::FsError;
//! use std::path::PathBuf;
//!
//! let err = FsError::InvalidMode { path: PathBuf::from("/out.txt"), mode: 0o170000 };
//! assert_eq!(err.to_string(), "invalid mode 0o170000 for /out.txt");
//! ```
//!
//! ---
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and installs no subscriber: `warn`
//! for failed writes (with the failing step), `debug` for published writes
//! and swallowed cleanup errors, `trace` for queue movement.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | `Serialize`/`Deserialize` for [`WriteOptions`] and friends; `FsAtomicJson::write_json_atomic` |

mod attributes;
mod backends;
mod coordinator;
mod error;
mod ext;
mod layer;
mod options;
mod queue;
mod tmpname;
mod traits;
mod types;
mod writer;

use std::path::Path;
use std::sync::OnceLock;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use options::{Encoding, Payload, WriteOptions};
pub use types::{FileType, Handle, Metadata, OpenFlags, Ownership, Permissions};

// Public re-exports - driver traits
pub use traits::{
    FsAtomic, FsHandles, FsLink, FsOwnership, FsPath, FsPermissions, FsRead, FsSync, FsWrite,
};

// Public re-exports - drivers
pub use backends::{MemoryFs, NativeFs};

// Public re-exports - write pipeline
pub use attributes::{resolve_attributes, ResolvedAttributes};
pub use coordinator::{PendingWrite, WriteCoordinator};
pub use queue::PathQueue;
pub use tmpname::temp_name;
pub use writer::AtomicWriter;

// Public re-exports - infrastructure
pub use ext::FsAtomicExt;
pub use layer::{Layer, LayerExt};

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FsAtomicJson;

/// The process-wide coordinator behind [`write_file`].
///
/// Created on first use. Writes issued through it are serialized per path
/// across the whole process.
pub fn default_coordinator() -> &'static WriteCoordinator<NativeFs> {
    static DEFAULT: OnceLock<WriteCoordinator<NativeFs>> = OnceLock::new();
    DEFAULT.get_or_init(|| WriteCoordinator::new(NativeFs::new()))
}

/// Atomically write `payload` to `path` on the host filesystem.
///
/// The write is queued when this is called, behind any earlier write to
/// the same path submitted through [`default_coordinator`]; awaiting the
/// returned [`PendingWrite`] yields its result. Must be called within a
/// tokio runtime.
///
/// # Errors
///
/// The error of the first failing step. The target is left untouched.
pub fn write_file(
    path: impl AsRef<Path>,
    payload: impl Into<Payload>,
    options: WriteOptions,
) -> PendingWrite {
    default_coordinator().submit(path, payload, options)
}

/// Atomically write `payload` to `path` on the host filesystem, blocking
/// the calling thread.
///
/// Not serialized against [`write_file`] or other synchronous writers.
///
/// # Errors
///
/// The error of the first failing step. The target is left untouched.
pub fn write_file_sync(
    path: impl AsRef<Path>,
    payload: impl Into<Payload>,
    options: &WriteOptions,
) -> Result<(), FsError> {
    AtomicWriter::new(&NativeFs::new()).run(path.as_ref(), &payload.into(), options)
}
