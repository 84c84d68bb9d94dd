//! In-memory filesystem driver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::traits::normalize_path;
use crate::{
    FileType, FsError, FsHandles, FsLink, FsOwnership, FsPath, FsPermissions, FsRead, FsSync,
    FsWrite, Handle, Metadata, OpenFlags, Ownership, Permissions,
};

/// Maximum symlink hops followed by `metadata` and `open`.
const MAX_SYMLINK_DEPTH: usize = 40;

/// A thread-safe in-memory filesystem.
///
/// Models files, directories and symlinks with Unix mode bits and numeric
/// owners. Paths are absolute and `/`-rooted; `.` and `..` are resolved
/// lexically before lookup.
///
/// Useful for tests and for embedding the write pipeline over a virtual
/// store.
///
/// ```rust
/// use atomic_file_write::{FsAtomicExt, FsRead, MemoryFs, WriteOptions};
/// use std::path::Path;
///
/// let fs = MemoryFs::new();
/// fs.create_dir_all(Path::new("/etc/app")).unwrap();
/// fs.write_file_atomic(Path::new("/etc/app/conf"), "x=1", &WriteOptions::new()).unwrap();
/// assert_eq!(fs.read(Path::new("/etc/app/conf")).unwrap(), b"x=1");
/// ```
pub struct MemoryFs {
    /// Every entry, keyed by absolute path. `/` always exists.
    entries: RwLock<HashMap<PathBuf, Node>>,

    /// Open handles and the path each was opened at.
    handles: RwLock<HashMap<u64, OpenFile>>,

    next_handle: AtomicU64,

    owner_ids: bool,

    default_owner: Ownership,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    mode: u32,
    owner: Ownership,
}

#[derive(Debug, Clone)]
enum NodeKind {
    File(Vec<u8>),
    Directory,
    Symlink(PathBuf),
}

struct OpenFile {
    path: PathBuf,
    flags: OpenFlags,
}

impl MemoryFs {
    /// Mode given to files created without an explicit mode.
    pub const DEFAULT_FILE_MODE: u32 = Permissions::default_file().mode();

    /// Create an empty filesystem containing only `/`.
    pub fn new() -> Self {
        let default_owner = Ownership::new(0, 0);
        let mut entries = HashMap::new();
        entries.insert(
            PathBuf::from("/"),
            Node {
                kind: NodeKind::Directory,
                mode: Permissions::default_dir().mode(),
                owner: default_owner,
            },
        );
        Self {
            entries: RwLock::new(entries),
            handles: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            owner_ids: true,
            default_owner,
        }
    }

    /// Toggle numeric owner support, emulating platforms without uids.
    ///
    /// When disabled, `set_owner` fails with [`FsError::NotSupported`].
    pub fn with_owner_ids(mut self, enabled: bool) -> Self {
        self.owner_ids = enabled;
        self
    }

    /// Owner given to newly created entries.
    pub fn with_default_owner(mut self, owner: Ownership) -> Self {
        self.default_owner = owner;
        self
    }

    /// Create a directory and all missing parents.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if a component exists and is not a directory
    pub fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let path = &normalize_path(path);
        let mut entries = self.entries.write();
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            match entries.get(&current) {
                Some(node) if matches!(node.kind, NodeKind::Directory) => {}
                Some(_) => return Err(FsError::NotADirectory { path: current }),
                None => {
                    let mode = Permissions::default_dir().mode();
                    entries.insert(current.clone(), self.new_node(NodeKind::Directory, mode));
                }
            }
        }
        Ok(())
    }

    /// Direct children of `dir`, sorted.
    pub fn list(&self, dir: &Path) -> Vec<PathBuf> {
        let dir = &normalize_path(dir);
        let mut children: Vec<PathBuf> = self
            .entries
            .read()
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect();
        children.sort();
        children
    }

    /// Number of handles that have been opened and not closed.
    pub fn open_handles(&self) -> usize {
        self.handles.read().len()
    }

    fn new_node(&self, kind: NodeKind, mode: u32) -> Node {
        Node {
            kind,
            mode,
            owner: self.default_owner,
        }
    }

    /// Follow symlinks until a non-link path (which may not exist) is reached.
    fn follow(&self, path: &Path) -> Result<PathBuf, FsError> {
        let entries = self.entries.read();
        let mut current = normalize_path(path);
        for _ in 0..=MAX_SYMLINK_DEPTH {
            match entries.get(&current).map(|n| &n.kind) {
                Some(NodeKind::Symlink(target)) => {
                    current = match current.parent() {
                        Some(parent) if target.is_relative() => normalize_path(&parent.join(target)),
                        _ => normalize_path(target),
                    };
                }
                _ => return Ok(current),
            }
        }
        Err(FsError::InvalidData {
            path: path.to_path_buf(),
            details: format!("symlink loop detected (exceeded max depth of {MAX_SYMLINK_DEPTH})"),
        })
    }

    fn check_parent(entries: &HashMap<PathBuf, Node>, path: &Path) -> Result<(), FsError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        match entries.get(parent) {
            Some(node) if matches!(node.kind, NodeKind::Directory) => Ok(()),
            Some(_) => Err(FsError::NotADirectory {
                path: parent.to_path_buf(),
            }),
            None => Err(FsError::NotFound {
                path: parent.to_path_buf(),
            }),
        }
    }

    fn node_metadata(node: &Node) -> Metadata {
        let (file_type, size) = match &node.kind {
            NodeKind::File(data) => (FileType::File, data.len() as u64),
            NodeKind::Directory => (FileType::Directory, 0),
            NodeKind::Symlink(target) => (FileType::Symlink, target.as_os_str().len() as u64),
        };
        Metadata {
            file_type,
            size,
            permissions: Permissions::from_mode(node.mode),
            owner: Some(node.owner),
        }
    }

    fn check_mode(path: &Path, mode: u32) -> Result<(), FsError> {
        if Permissions::is_valid_mode(mode) {
            Ok(())
        } else {
            Err(FsError::InvalidMode {
                path: path.to_path_buf(),
                mode,
            })
        }
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFs")
            .field("entries", &self.entries.read().len())
            .field("open_handles", &self.open_handles())
            .field("owner_ids", &self.owner_ids)
            .finish()
    }
}

impl FsRead for MemoryFs {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let resolved = self.follow(path)?;
        match self.entries.read().get(&resolved).map(|n| &n.kind) {
            Some(NodeKind::File(data)) => Ok(data.clone()),
            Some(_) => Err(FsError::NotAFile { path: resolved }),
            None => Err(FsError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }

    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        let resolved = self.follow(path)?;
        Ok(self.entries.read().contains_key(&resolved))
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let resolved = self.follow(path)?;
        self.entries
            .read()
            .get(&resolved)
            .map(Self::node_metadata)
            .ok_or_else(|| FsError::NotFound {
                path: path.to_path_buf(),
            })
    }
}

impl FsWrite for MemoryFs {
    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let resolved = self.follow(path)?;
        let mut entries = self.entries.write();
        Self::check_parent(&entries, &resolved)?;
        match entries.get_mut(&resolved) {
            Some(Node {
                kind: NodeKind::File(content),
                ..
            }) => *content = data.to_vec(),
            Some(_) => return Err(FsError::NotAFile { path: resolved }),
            None => {
                let node = self.new_node(NodeKind::File(data.to_vec()), Self::DEFAULT_FILE_MODE);
                entries.insert(resolved, node);
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let path = &normalize_path(path);
        let mut entries = self.entries.write();
        match entries.get(path).map(|n| &n.kind) {
            Some(NodeKind::Directory) => Err(FsError::NotAFile {
                path: path.to_path_buf(),
            }),
            Some(_) => {
                entries.remove(path);
                Ok(())
            }
            None => Err(FsError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let (from, to) = (&normalize_path(from), &normalize_path(to));
        let mut entries = self.entries.write();
        Self::check_parent(&entries, to)?;
        if let Some(Node {
            kind: NodeKind::Directory,
            ..
        }) = entries.get(to)
        {
            return Err(FsError::NotAFile {
                path: to.to_path_buf(),
            });
        }
        let node = entries.remove(from).ok_or_else(|| FsError::NotFound {
            path: from.to_path_buf(),
        })?;
        entries.insert(to.to_path_buf(), node);
        Ok(())
    }
}

impl FsHandles for MemoryFs {
    fn open(&self, path: &Path, flags: OpenFlags, mode: Option<u32>) -> Result<Handle, FsError> {
        if let Some(mode) = mode {
            Self::check_mode(path, mode)?;
        }
        let resolved = self.follow(path)?;
        {
            let mut entries = self.entries.write();
            Self::check_parent(&entries, &resolved)?;
            match entries.get_mut(&resolved) {
                Some(Node {
                    kind: NodeKind::File(content),
                    ..
                }) => {
                    if flags.truncate {
                        content.clear();
                    }
                }
                Some(_) => return Err(FsError::NotAFile { path: resolved }),
                None if flags.create => {
                    let mode = mode.unwrap_or(Self::DEFAULT_FILE_MODE);
                    entries.insert(resolved.clone(), self.new_node(NodeKind::File(Vec::new()), mode));
                }
                None => return Err(FsError::NotFound { path: resolved }),
            }
        }

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.handles.write().insert(
            id,
            OpenFile {
                path: resolved,
                flags,
            },
        );
        Ok(Handle(id))
    }

    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let handles = self.handles.read();
        let open = handles
            .get(&handle.0)
            .ok_or(FsError::InvalidHandle { handle })?;
        if !open.flags.write {
            return Err(FsError::PermissionDenied {
                path: open.path.clone(),
                operation: "write",
            });
        }

        let mut entries = self.entries.write();
        match entries.get_mut(&open.path).map(|n| &mut n.kind) {
            Some(NodeKind::File(content)) => {
                let range = usize::try_from(offset)
                    .ok()
                    .and_then(|start| Some(start..start.checked_add(data.len())?));
                let Some(std::ops::Range { start, end }) = range else {
                    return Err(FsError::InvalidData {
                        path: open.path.clone(),
                        details: format!("write at offset {offset} overflows the file size"),
                    });
                };
                if content.len() < end {
                    content.resize(end, 0);
                }
                content[start..end].copy_from_slice(data);
                Ok(data.len())
            }
            // The file was unlinked or replaced while open.
            _ => Err(FsError::NotFound {
                path: open.path.clone(),
            }),
        }
    }

    fn close(&self, handle: Handle) -> Result<(), FsError> {
        self.handles
            .write()
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(FsError::InvalidHandle { handle })
    }
}

impl FsSync for MemoryFs {
    fn fsync(&self, handle: Handle) -> Result<(), FsError> {
        if self.handles.read().contains_key(&handle.0) {
            Ok(())
        } else {
            Err(FsError::InvalidHandle { handle })
        }
    }
}

impl FsPermissions for MemoryFs {
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        Self::check_mode(path, mode)?;
        let resolved = self.follow(path)?;
        let mut entries = self.entries.write();
        let node = entries.get_mut(&resolved).ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })?;
        node.mode = mode;
        Ok(())
    }
}

impl FsOwnership for MemoryFs {
    fn set_owner(&self, path: &Path, owner: Ownership) -> Result<(), FsError> {
        if !self.owner_ids {
            return Err(FsError::NotSupported { operation: "chown" });
        }
        let resolved = self.follow(path)?;
        let mut entries = self.entries.write();
        let node = entries.get_mut(&resolved).ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })?;
        node.owner = owner;
        Ok(())
    }

    fn supports_owner_ids(&self) -> bool {
        self.owner_ids
    }
}

impl FsLink for MemoryFs {
    fn symlink(&self, target: &Path, link: &Path) -> Result<(), FsError> {
        let link = &normalize_path(link);
        let mut entries = self.entries.write();
        Self::check_parent(&entries, link)?;
        if entries.contains_key(link) {
            return Err(FsError::AlreadyExists {
                path: link.to_path_buf(),
                operation: "symlink",
            });
        }
        let node = self.new_node(NodeKind::Symlink(target.to_path_buf()), 0o777);
        entries.insert(link.to_path_buf(), node);
        Ok(())
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        let path = &normalize_path(path);
        match self.entries.read().get(path).map(|n| &n.kind) {
            Some(NodeKind::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(FsError::InvalidData {
                path: path.to_path_buf(),
                details: "not a symlink".to_string(),
            }),
            None => Err(FsError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        let path = &normalize_path(path);
        self.entries
            .read()
            .get(path)
            .map(Self::node_metadata)
            .ok_or_else(|| FsError::NotFound {
                path: path.to_path_buf(),
            })
    }
}

impl FsPath for MemoryFs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_exists() {
        let fs = MemoryFs::new();
        assert!(fs.exists(Path::new("/")).unwrap());
        assert!(fs.metadata(Path::new("/")).unwrap().is_dir());
    }

    #[test]
    fn open_creates_with_mode_and_default_owner() {
        let fs = MemoryFs::new().with_default_owner(Ownership::new(500, 501));
        let handle = fs.open(Path::new("/f"), OpenFlags::WRITE, Some(0o600)).unwrap();
        fs.write_at(handle, b"abc", 0).unwrap();
        fs.close(handle).unwrap();

        let meta = fs.metadata(Path::new("/f")).unwrap();
        assert_eq!(meta.size, 3);
        assert_eq!(meta.permissions.mode(), 0o600);
        assert_eq!(meta.owner, Some(Ownership::new(500, 501)));
    }

    #[test]
    fn open_truncates_but_keeps_existing_mode() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/f"), b"long content").unwrap();
        fs.set_permissions(Path::new("/f"), 0o640).unwrap();

        let handle = fs.open(Path::new("/f"), OpenFlags::WRITE, Some(0o600)).unwrap();
        fs.close(handle).unwrap();

        assert_eq!(fs.read(Path::new("/f")).unwrap(), b"");
        assert_eq!(fs.metadata(Path::new("/f")).unwrap().permissions.mode(), 0o640);
    }

    #[test]
    fn open_rejects_invalid_mode() {
        let fs = MemoryFs::new();
        let err = fs.open(Path::new("/f"), OpenFlags::WRITE, Some(0o10000)).unwrap_err();
        assert!(matches!(err, FsError::InvalidMode { mode: 0o10000, .. }));
        assert!(!fs.exists(Path::new("/f")).unwrap());
    }

    #[test]
    fn open_requires_parent_directory() {
        let fs = MemoryFs::new();
        let err = fs.open(Path::new("/missing/f"), OpenFlags::WRITE, None).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn write_at_offset_zero_fills_gaps() {
        let fs = MemoryFs::new();
        let handle = fs.open(Path::new("/f"), OpenFlags::WRITE, None).unwrap();
        fs.write_at(handle, b"yz", 2).unwrap();
        fs.close(handle).unwrap();
        assert_eq!(fs.read(Path::new("/f")).unwrap(), [0, 0, b'y', b'z']);
    }

    #[test]
    fn write_at_rejects_offset_overflow() {
        let fs = MemoryFs::new();
        let handle = fs.open(Path::new("/f"), OpenFlags::WRITE, None).unwrap();
        assert!(matches!(
            fs.write_at(handle, b"x", u64::MAX),
            Err(FsError::InvalidData { .. })
        ));
        fs.close(handle).unwrap();
        assert_eq!(fs.read(Path::new("/f")).unwrap(), b"");
    }

    #[test]
    fn closed_handle_is_invalid() {
        let fs = MemoryFs::new();
        let handle = fs.open(Path::new("/f"), OpenFlags::WRITE, None).unwrap();
        fs.close(handle).unwrap();
        assert!(matches!(fs.fsync(handle), Err(FsError::InvalidHandle { .. })));
        assert!(matches!(fs.close(handle), Err(FsError::InvalidHandle { .. })));
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn read_only_handle_rejects_writes() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/f"), b"data").unwrap();
        let handle = fs.open(Path::new("/f"), OpenFlags::READ, None).unwrap();
        assert!(matches!(
            fs.write_at(handle, b"x", 0),
            Err(FsError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn rename_replaces_destination() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/a"), b"new").unwrap();
        fs.write(Path::new("/b"), b"old").unwrap();

        fs.rename(Path::new("/a"), Path::new("/b")).unwrap();
        assert_eq!(fs.read(Path::new("/b")).unwrap(), b"new");
        assert!(!fs.exists(Path::new("/a")).unwrap());
    }

    #[test]
    fn rename_onto_directory_fails() {
        let fs = MemoryFs::new();
        fs.create_dir_all(Path::new("/dir")).unwrap();
        fs.write(Path::new("/a"), b"x").unwrap();
        assert!(matches!(
            fs.rename(Path::new("/a"), Path::new("/dir")),
            Err(FsError::NotAFile { .. })
        ));
        assert!(fs.exists(Path::new("/a")).unwrap());
    }

    #[test]
    fn metadata_follows_symlinks() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/target"), b"12345").unwrap();
        fs.symlink(Path::new("target"), Path::new("/link")).unwrap();

        assert!(fs.metadata(Path::new("/link")).unwrap().is_file());
        assert_eq!(fs.metadata(Path::new("/link")).unwrap().size, 5);
        assert!(fs.symlink_metadata(Path::new("/link")).unwrap().is_symlink());
    }

    #[test]
    fn chown_unsupported_without_owner_ids() {
        let fs = MemoryFs::new().with_owner_ids(false);
        fs.write(Path::new("/f"), b"").unwrap();
        assert!(!fs.supports_owner_ids());
        assert!(matches!(
            fs.set_owner(Path::new("/f"), Ownership::new(1, 1)),
            Err(FsError::NotSupported { .. })
        ));
    }

    #[test]
    fn list_returns_direct_children() {
        let fs = MemoryFs::new();
        fs.create_dir_all(Path::new("/a/b")).unwrap();
        fs.write(Path::new("/a/f"), b"").unwrap();
        assert_eq!(
            fs.list(Path::new("/a")),
            vec![PathBuf::from("/a/b"), PathBuf::from("/a/f")]
        );
    }
}
