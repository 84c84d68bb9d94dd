//! # Layer Trait
//!
//! Tower-style middleware composition for drivers.
//!
//! ## Overview
//!
//! A [`Layer`] wraps a driver in a middleware that implements the same
//! driver traits, so the write pipeline runs through it unchanged. Typical
//! middlewares inject faults at a given step, record the syscall sequence,
//! or log each call.
//!
//! ```text
//! Driver ──▶ Layer::layer() ──▶ Wrapped driver ──▶ AtomicWriter / WriteCoordinator
//! ```
//!
//! ## Example
//!
//! ```rust
//! use atomic_file_write::Layer;
//!
//! struct FailRenames;
//!
//! struct FailRenamesMiddleware<B> {
//!     inner: B,
//! }
//!
//! impl<B> Layer<B> for FailRenames {
//!     type Backend = FailRenamesMiddleware<B>;
//!
//!     fn layer(self, backend: B) -> Self::Backend {
//!         FailRenamesMiddleware { inner: backend }
//!     }
//! }
//! ```

use crate::FsAtomic;

/// A layer that wraps a driver to add behavior.
///
/// # Design Notes
///
/// - `layer(self, backend)` consumes both the layer and the driver
/// - Middlewares meant for the write pipeline implement every component
///   trait of [`FsAtomic`], delegating what they don't change
pub trait Layer<B> {
    /// The wrapped driver type.
    type Backend;

    /// Wrap `backend` with this layer.
    fn layer(self, backend: B) -> Self::Backend;
}

/// Fluent `.layer()` on any driver.
///
/// ```rust
/// use atomic_file_write::{FsAtomic, Layer, LayerExt};
///
/// fn wrap<B: FsAtomic, L: Layer<B>>(backend: B, layer: L) -> L::Backend {
///     backend.layer(layer)
/// }
/// ```
pub trait LayerExt: FsAtomic + Sized {
    /// Apply a layer to this driver.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Backend {
        layer.layer(self)
    }
}

// Blanket implementation - any FsAtomic driver gets LayerExt for free
impl<B: FsAtomic> LayerExt for B {}
