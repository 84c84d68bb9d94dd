//! Mode and ownership resolution for the replacement file.

use std::path::Path;

use tracing::trace;

use crate::{FsAtomic, Ownership, WriteOptions};

/// The mode and owner applied to a temp file before it is published.
///
/// `None` leaves the attribute to the filesystem default. Computed once per
/// write and never re-derived, even if the target changes before the rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedAttributes {
    /// Permission bits for `open` and `chmod`.
    pub mode: Option<u32>,
    /// Owner for `chown`.
    pub owner: Option<Ownership>,
}

impl ResolvedAttributes {
    /// Returns `true` when both attributes are set.
    pub fn is_complete(&self) -> bool {
        self.mode.is_some() && self.owner.is_some()
    }
}

/// Resolve the attributes for a write to `real_path`.
///
/// Explicit options win; a mode of `0` counts as unset. Anything left unset is copied from the file
/// currently at `real_path`; ownership is only copied when the driver
/// [supports numeric owner ids](crate::FsOwnership::supports_owner_ids).
/// A failed lookup (missing file, permission denied, ...) is not an error:
/// the unset attributes simply stay unset.
pub fn resolve_attributes<B: FsAtomic + ?Sized>(
    fs: &B,
    real_path: &Path,
    options: &WriteOptions,
) -> ResolvedAttributes {
    let mut attrs = ResolvedAttributes {
        // Zero means unset.
        mode: options.mode.filter(|&mode| mode != 0),
        owner: options.owner,
    };
    if attrs.is_complete() {
        return attrs;
    }

    let meta = match fs.metadata(real_path) {
        Ok(meta) => meta,
        Err(err) => {
            trace!(path = %real_path.display(), error = %err, "no attributes to inherit");
            return attrs;
        }
    };

    if attrs.mode.is_none() {
        attrs.mode = Some(meta.permissions.mode());
    }
    if attrs.owner.is_none() && fs.supports_owner_ids() {
        attrs.owner = meta.owner;
    }
    attrs
}
