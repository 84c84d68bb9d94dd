//! Filesystem drivers.
//!
//! | Driver | Storage | Owner ids |
//! |--------|---------|-----------|
//! | [`NativeFs`] | host filesystem via `std::fs` | Unix only |
//! | [`MemoryFs`] | in-process map | configurable |

mod memory;
mod native;

pub use memory::MemoryFs;
pub use native::NativeFs;
