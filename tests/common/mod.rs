//! Shared middleware for integration tests: syscall recording and fault
//! injection over any driver.

#![allow(dead_code)]

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use atomic_file_write::*;
use parking_lot::{Condvar, Mutex};

/// A latch that holds callers in `wait` until `open` is called.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }

    /// Block until opened, giving up after ten seconds.
    pub fn wait(&self) {
        let mut open = self.open.lock();
        if !*open {
            let _ = self
                .cond
                .wait_while_for(&mut open, |open| !*open, Duration::from_secs(10));
        }
    }
}

/// A pipeline step that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Open,
    Write,
    Fsync,
    Close,
    Chown,
    Chmod,
    Rename,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::Open,
        Step::Write,
        Step::Fsync,
        Step::Close,
        Step::Chown,
        Step::Chmod,
        Step::Rename,
    ];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(PathBuf),
    Write(Handle, Vec<u8>),
    Fsync(Handle),
    Close(Handle),
    Chown(PathBuf),
    Chmod(PathBuf, u32),
    Rename(PathBuf, PathBuf),
    Unlink(PathBuf),
}

impl Call {
    pub fn step(&self) -> Option<Step> {
        match self {
            Call::Open(_) => Some(Step::Open),
            Call::Write(..) => Some(Step::Write),
            Call::Fsync(_) => Some(Step::Fsync),
            Call::Close(_) => Some(Step::Close),
            Call::Chown(_) => Some(Step::Chown),
            Call::Chmod(..) => Some(Step::Chmod),
            Call::Rename(..) => Some(Step::Rename),
            Call::Unlink(_) => None,
        }
    }
}

/// Records every mutating call and optionally fails one step.
#[derive(Default)]
pub struct InstrumentLayer {
    fail_on: Option<Step>,
    write_delay: Option<Duration>,
    hold: Option<(Vec<u8>, Arc<Gate>)>,
}

impl InstrumentLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call of `step` with an injected backend error.
    pub fn fail_on(mut self, step: Step) -> Self {
        self.fail_on = Some(step);
        self
    }

    /// Hold any `write_at` of exactly `payload` until `gate` opens.
    pub fn hold_payload(mut self, payload: &[u8], gate: Arc<Gate>) -> Self {
        self.hold = Some((payload.to_vec(), gate));
        self
    }

    /// Sleep inside `write_at` to widen the window of each write.
    pub fn write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }
}

impl<B: FsAtomic> Layer<B> for InstrumentLayer {
    type Backend = Instrumented<B>;

    fn layer(self, backend: B) -> Self::Backend {
        Instrumented {
            inner: backend,
            fail_on: self.fail_on,
            write_delay: self.write_delay,
            hold: self.hold,
            calls: Mutex::new(Vec::new()),
        }
    }
}

pub struct Instrumented<B> {
    pub inner: B,
    fail_on: Option<Step>,
    write_delay: Option<Duration>,
    hold: Option<(Vec<u8>, Arc<Gate>)>,
    calls: Mutex<Vec<Call>>,
}

impl<B> Instrumented<B> {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Recorded pipeline steps in order, without payloads or paths.
    pub fn steps(&self) -> Vec<Step> {
        self.calls.lock().iter().filter_map(Call::step).collect()
    }

    fn record(&self, call: Call) -> Result<(), FsError> {
        let step = call.step();
        self.calls.lock().push(call);
        match step {
            Some(step) if self.fail_on == Some(step) => {
                Err(FsError::Backend(format!("injected {step} fault")))
            }
            _ => Ok(()),
        }
    }
}

impl<B: FsAtomic> FsRead for Instrumented<B> {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.inner.read(path)
    }
    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        self.inner.exists(path)
    }
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.inner.metadata(path)
    }
}

impl<B: FsAtomic> FsWrite for Instrumented<B> {
    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        self.inner.write(path, data)
    }
    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        self.record(Call::Unlink(path.to_path_buf()))?;
        self.inner.remove_file(path)
    }
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.record(Call::Rename(from.to_path_buf(), to.to_path_buf()))?;
        self.inner.rename(from, to)
    }
}

impl<B: FsAtomic> FsHandles for Instrumented<B> {
    fn open(&self, path: &Path, flags: OpenFlags, mode: Option<u32>) -> Result<Handle, FsError> {
        self.record(Call::Open(path.to_path_buf()))?;
        self.inner.open(path, flags, mode)
    }
    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError> {
        self.record(Call::Write(handle, data.to_vec()))?;
        if let Some(delay) = self.write_delay {
            std::thread::sleep(delay);
        }
        if let Some((payload, gate)) = &self.hold {
            if payload.as_slice() == data {
                gate.wait();
            }
        }
        self.inner.write_at(handle, data, offset)
    }
    fn close(&self, handle: Handle) -> Result<(), FsError> {
        let injected = self.record(Call::Close(handle));
        // The handle is released even when the close is reported as failed.
        let closed = self.inner.close(handle);
        injected.and(closed)
    }
}

impl<B: FsAtomic> FsSync for Instrumented<B> {
    fn fsync(&self, handle: Handle) -> Result<(), FsError> {
        self.record(Call::Fsync(handle))?;
        self.inner.fsync(handle)
    }
}

impl<B: FsAtomic> FsPermissions for Instrumented<B> {
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        self.record(Call::Chmod(path.to_path_buf(), mode))?;
        self.inner.set_permissions(path, mode)
    }
}

impl<B: FsAtomic> FsOwnership for Instrumented<B> {
    fn set_owner(&self, path: &Path, owner: Ownership) -> Result<(), FsError> {
        self.record(Call::Chown(path.to_path_buf()))?;
        self.inner.set_owner(path, owner)
    }
    fn supports_owner_ids(&self) -> bool {
        self.inner.supports_owner_ids()
    }
}

impl<B: FsAtomic> FsLink for Instrumented<B> {
    fn symlink(&self, target: &Path, link: &Path) -> Result<(), FsError> {
        self.inner.symlink(target, link)
    }
    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        self.inner.read_link(path)
    }
    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.inner.symlink_metadata(path)
    }
}

impl<B: FsAtomic> FsPath for Instrumented<B> {
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        self.inner.canonicalize(path)
    }
}

/// A memory driver with `/data/out.txt` holding `original`, mode 0o640,
/// owned by 1000:1000.
pub fn seeded_memory_fs() -> MemoryFs {
    let fs = MemoryFs::new();
    fs.create_dir_all(Path::new("/data")).unwrap();
    fs.write(Path::new("/data/out.txt"), b"original").unwrap();
    fs.set_permissions(Path::new("/data/out.txt"), 0o640).unwrap();
    fs.set_owner(Path::new("/data/out.txt"), Ownership::new(1000, 1000))
        .unwrap();
    fs
}

/// Entries of a directory on the host filesystem, sorted by name.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
