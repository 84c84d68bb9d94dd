//! Driver over the host filesystem.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::{
    FileType, FsError, FsHandles, FsLink, FsOwnership, FsPath, FsPermissions, FsRead, FsSync,
    FsWrite, Handle, Metadata, OpenFlags, Ownership, Permissions,
};

/// The host filesystem, through `std::fs`.
///
/// Handles are entries in a table of open [`File`]s. The table lock is
/// only held to look a handle up, never across a syscall, so a slow write
/// or fsync on one file does not stall work on others. Paths are used as
/// given, so relative paths resolve against the current directory.
///
/// On Unix the creation mode, permission bits and numeric owners map
/// directly onto the OS. Elsewhere ownership is unsupported and
/// `set_permissions` only toggles the read-only flag (owner write bit).
#[derive(Default)]
pub struct NativeFs {
    files: Mutex<HashMap<u64, OpenFile>>,
    next_handle: AtomicU64,
}

struct OpenFile {
    path: PathBuf,
    file: Arc<File>,
}

impl NativeFs {
    /// Create a driver with an empty handle table.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_file<T>(
        &self,
        handle: Handle,
        f: impl FnOnce(&File) -> std::io::Result<T>,
        operation: &'static str,
    ) -> Result<T, FsError> {
        let (path, file) = {
            let files = self.files.lock();
            let open = files.get(&handle.0).ok_or(FsError::InvalidHandle { handle })?;
            (open.path.clone(), Arc::clone(&open.file))
        };
        f(&file).map_err(|e| FsError::io(operation, &path, e))
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

impl std::fmt::Debug for NativeFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFs")
            .field("open_handles", &self.files.lock().len())
            .finish()
    }
}

fn convert_metadata(meta: &fs::Metadata) -> Metadata {
    let file_type = if meta.file_type().is_symlink() {
        FileType::Symlink
    } else if meta.is_dir() {
        FileType::Directory
    } else {
        FileType::File
    };

    #[cfg(unix)]
    let (permissions, owner) = {
        use std::os::unix::fs::MetadataExt;
        (
            Permissions::from_mode(meta.mode()),
            Some(Ownership::new(meta.uid(), meta.gid())),
        )
    };
    #[cfg(not(unix))]
    let (permissions, owner) = {
        let mode = if meta.permissions().readonly() { 0o444 } else { 0o644 };
        (Permissions::from_mode(mode), None)
    };

    Metadata {
        file_type,
        size: meta.len(),
        permissions,
        owner,
    }
}

impl FsRead for NativeFs {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        fs::read(path).map_err(|e| FsError::io("read", path, e))
    }

    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        path.try_exists().map_err(|e| FsError::io("exists", path, e))
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        fs::metadata(path)
            .map(|m| convert_metadata(&m))
            .map_err(|e| FsError::io("stat", path, e))
    }
}

impl FsWrite for NativeFs {
    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        fs::write(path, data).map_err(|e| FsError::io("write", path, e))
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path).map_err(|e| FsError::io("unlink", path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(from, to).map_err(|e| FsError::io("rename", from, e))
    }
}

impl FsHandles for NativeFs {
    fn open(&self, path: &Path, flags: OpenFlags, mode: Option<u32>) -> Result<Handle, FsError> {
        let mut options = OpenOptions::new();
        options
            .read(flags.read)
            .write(flags.write)
            .create(flags.create)
            .truncate(flags.truncate);

        if let Some(mode) = mode {
            Self::check_mode(path, mode)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(mode);
            }
        }

        let file = options.open(path).map_err(|e| FsError::io("open", path, e))?;
        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.files.lock().insert(
            id,
            OpenFile {
                path: path.to_path_buf(),
                file: Arc::new(file),
            },
        );
        Ok(Handle(id))
    }

    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError> {
        self.with_file(
            handle,
            |file| {
                #[cfg(unix)]
                {
                    use std::os::unix::fs::FileExt;
                    file.write_all_at(data, offset)?;
                }
                #[cfg(not(unix))]
                {
                    use std::io::{Seek, SeekFrom, Write};
                    let mut file = file;
                    file.seek(SeekFrom::Start(offset))?;
                    file.write_all(data)?;
                }
                Ok(data.len())
            },
            "write",
        )
    }

    fn close(&self, handle: Handle) -> Result<(), FsError> {
        // The descriptor closes once the last in-flight syscall drops its
        // clone; std swallows close errors.
        self.files
            .lock()
            .remove(&handle.0)
            .map(drop)
            .ok_or(FsError::InvalidHandle { handle })
    }
}

impl FsSync for NativeFs {
    fn fsync(&self, handle: Handle) -> Result<(), FsError> {
        self.with_file(handle, File::sync_all, "fsync")
    }
}

impl FsPermissions for NativeFs {
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        Self::check_mode(path, mode)?;

        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            fs::Permissions::from_mode(mode)
        };
        #[cfg(not(unix))]
        let permissions = {
            let mut permissions = fs::metadata(path)
                .map_err(|e| FsError::io("chmod", path, e))?
                .permissions();
            permissions.set_readonly(mode & 0o200 == 0);
            permissions
        };

        fs::set_permissions(path, permissions).map_err(|e| FsError::io("chmod", path, e))
    }
}

impl FsOwnership for NativeFs {
    #[cfg(unix)]
    fn set_owner(&self, path: &Path, owner: Ownership) -> Result<(), FsError> {
        std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid))
            .map_err(|e| FsError::io("chown", path, e))
    }

    #[cfg(not(unix))]
    fn set_owner(&self, _path: &Path, _owner: Ownership) -> Result<(), FsError> {
        Err(FsError::NotSupported { operation: "chown" })
    }

    fn supports_owner_ids(&self) -> bool {
        cfg!(unix)
    }
}

impl FsLink for NativeFs {
    fn symlink(&self, target: &Path, link: &Path) -> Result<(), FsError> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(target, link).map_err(|e| FsError::io("symlink", link, e))
        }
        #[cfg(windows)]
        {
            std::os::windows::fs::symlink_file(target, link)
                .map_err(|e| FsError::io("symlink", link, e))
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = (target, link);
            Err(FsError::NotSupported {
                operation: "symlink",
            })
        }
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        fs::read_link(path).map_err(|e| FsError::io("readlink", path, e))
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        fs::symlink_metadata(path)
            .map(|m| convert_metadata(&m))
            .map_err(|e| FsError::io("lstat", path, e))
    }
}

impl FsPath for NativeFs {
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        fs::canonicalize(path).map_err(|e| FsError::io("realpath", path, e))
    }
}
