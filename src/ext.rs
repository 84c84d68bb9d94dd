//! # Extension Traits
//!
//! Atomic-write methods on every driver.
//!
//! ## Overview
//!
//! [`FsAtomicExt`] puts the synchronous pipeline directly on any
//! [`FsAtomic`] driver, so callers holding a driver don't need to build an
//! [`AtomicWriter`] themselves. Blanket-implemented; drivers get it for free.
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, `FsAtomicJson::write_json_atomic`
//! serializes a value and publishes it through the same pipeline.
//!
//! Enable with:
//! ```toml
//! [dependencies]
//! atomic-file-write = { version = "0.1", features = ["serde"] }
//! ```

use std::path::Path;

use crate::{AtomicWriter, FsAtomic, FsError, Payload, WriteOptions};

/// Atomic-write methods for any driver.
///
/// # Example
///
/// ```rust
/// use atomic_file_write::{FsAtomic, FsAtomicExt, FsError, WriteOptions};
/// use std::path::Path;
///
/// fn save_state<B: FsAtomic>(backend: &B, state: &str) -> Result<(), FsError> {
///     backend.write_file_atomic(Path::new("/state"), state, &WriteOptions::new().mode(0o600))
/// }
/// ```
pub trait FsAtomicExt: FsAtomic {
    /// Atomically replace `path` with `payload` on the calling thread.
    ///
    /// Not queued: overlapping calls for the same path must be serialized by
    /// the caller.
    ///
    /// # Errors
    ///
    /// The error of the first failing step; see [`AtomicWriter::run`].
    fn write_file_atomic(
        &self,
        path: &Path,
        payload: impl Into<Payload>,
        options: &WriteOptions,
    ) -> Result<(), FsError>
    where
        Self: Sized,
    {
        AtomicWriter::new(self).run(path, &payload.into(), options)
    }
}

// Blanket implementation - any FsAtomic driver gets FsAtomicExt for free
impl<B: FsAtomic + ?Sized> FsAtomicExt for B {}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::Serialize;

    /// JSON extension for atomic writes.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait FsAtomicJson: FsAtomic {
        /// Serialize `value` as pretty-printed JSON and atomically write it.
        ///
        /// The encoding in `options` is irrelevant: JSON is always UTF-8.
        ///
        /// # Errors
        ///
        /// - `FsError::Serialization` if `value` cannot be serialized
        /// - Any error from the write pipeline
        ///
        /// # Example
        ///
        /// ```rust
        /// use atomic_file_write::{FsAtomicJson, FsRead, MemoryFs, WriteOptions};
        /// use std::path::Path;
        ///
        /// let fs = MemoryFs::new();
        /// let value = serde_json::json!({ "retries": 3 });
        /// fs.write_json_atomic(Path::new("/conf.json"), &value, &WriteOptions::new()).unwrap();
        /// assert!(fs.read(Path::new("/conf.json")).unwrap().starts_with(b"{"));
        /// ```
        fn write_json_atomic<T: Serialize + ?Sized>(
            &self,
            path: &Path,
            value: &T,
            options: &WriteOptions,
        ) -> Result<(), FsError>
        where
            Self: Sized,
        {
            let json = serde_json::to_vec_pretty(value)
                .map_err(|e| FsError::Serialization(e.to_string()))?;
            AtomicWriter::new(self).run(path, &Payload::Bytes(json), options)
        }
    }

    // Blanket implementation
    impl<B: FsAtomic + ?Sized> FsAtomicJson for B {}
}

#[cfg(feature = "serde")]
pub use json::FsAtomicJson;
