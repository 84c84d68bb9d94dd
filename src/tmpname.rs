//! Temp file naming.
//!
//! A temp name is the real target path plus `.` plus a 32-bit MurmurHash3
//! digest of a constant key, the process id and a per-process invocation
//! counter. The counter makes names unique within the process; the pid
//! keeps unrelated processes writing the same target apart.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Constant key the hash state starts from.
const SEED_KEY: &str = concat!(env!("CARGO_PKG_NAME"), "/tmpname");

/// Incremented once per generated name, never reset.
static INVOCATIONS: AtomicU64 = AtomicU64::new(0);

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Incremental MurmurHash3 (x86, 32-bit).
///
/// Feeding input in several [`update`](Self::update) calls yields the same
/// digest as one call over the concatenation.
#[derive(Debug, Clone)]
pub(crate) struct Murmur3 {
    h1: u32,
    tail: [u8; 4],
    tail_len: usize,
    total_len: u64,
}

impl Murmur3 {
    pub(crate) fn with_seed(seed: u32) -> Self {
        Self {
            h1: seed,
            tail: [0; 4],
            tail_len: 0,
            total_len: 0,
        }
    }

    pub(crate) fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.total_len += bytes.len() as u64;
        for &byte in bytes {
            self.tail[self.tail_len] = byte;
            self.tail_len += 1;
            if self.tail_len == 4 {
                self.h1 ^= mix_k1(u32::from_le_bytes(self.tail));
                self.h1 = self
                    .h1
                    .rotate_left(13)
                    .wrapping_mul(5)
                    .wrapping_add(0xe654_6b64);
                self.tail_len = 0;
            }
        }
        self
    }

    pub(crate) fn finish(&self) -> u32 {
        let mut h1 = self.h1;
        if self.tail_len > 0 {
            let k1 = self.tail[..self.tail_len]
                .iter()
                .rev()
                .fold(0u32, |k, &b| (k << 8) | u32::from(b));
            h1 ^= mix_k1(k1);
        }
        // The reference algorithm folds in the length modulo 2^32.
        h1 ^= self.total_len as u32;
        fmix32(h1)
    }
}

fn mix_k1(k1: u32) -> u32 {
    k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Derive the next temp file path for `base`.
///
/// Every call in the lifetime of the process returns a different name for
/// the same base.
///
/// ```rust
/// use atomic_file_write::temp_name;
/// use std::path::Path;
///
/// let a = temp_name(Path::new("/data/state.json"));
/// let b = temp_name(Path::new("/data/state.json"));
/// assert_ne!(a, b);
/// assert!(a.to_string_lossy().starts_with("/data/state.json."));
/// ```
pub fn temp_name(base: &Path) -> PathBuf {
    let invocation = INVOCATIONS.fetch_add(1, Ordering::Relaxed) + 1;
    let digest = Murmur3::with_seed(0)
        .update(SEED_KEY.as_bytes())
        .update(std::process::id().to_string().as_bytes())
        .update(invocation.to_string().as_bytes())
        .finish();

    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".{digest}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn murmur(bytes: &[u8], seed: u32) -> u32 {
        Murmur3::with_seed(seed).update(bytes).finish()
    }

    #[test]
    fn murmur3_reference_vectors() {
        assert_eq!(murmur(b"", 0), 0);
        assert_eq!(murmur(b"", 1), 0x514e_28b7);
        assert_eq!(murmur(b"hello", 0), 0x248b_fa47);
        assert_eq!(
            murmur(b"The quick brown fox jumps over the lazy dog", 0),
            0x2e4f_f723
        );
    }

    #[test]
    fn murmur3_chunked_input_matches_single_pass() {
        let whole = murmur(b"The quick brown fox jumps over the lazy dog", 7);
        let chunked = Murmur3::with_seed(7)
            .update(b"The qu")
            .update(b"")
            .update(b"ick brown fox j")
            .update(b"umps over the lazy dog")
            .finish();
        assert_eq!(whole, chunked);
    }

    #[test]
    fn temp_name_is_a_sibling_with_numeric_suffix() {
        let name = temp_name(Path::new("/var/lib/app/state.json"));
        assert_eq!(name.parent(), Some(Path::new("/var/lib/app")));

        let file_name = name.file_name().unwrap().to_string_lossy().into_owned();
        let suffix = file_name.strip_prefix("state.json.").unwrap();
        assert!(suffix.parse::<u32>().is_ok(), "suffix {suffix} is not a u32");
    }

    #[test]
    fn temp_names_do_not_repeat() {
        let base = Path::new("/tmp/out.txt");
        let names: HashSet<PathBuf> = (0..200).map(|_| temp_name(base)).collect();
        assert_eq!(names.len(), 200);
    }

    #[test]
    fn temp_names_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..50)
                        .map(|_| temp_name(Path::new("/shared")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(all.insert(name));
            }
        }
        assert_eq!(all.len(), 200);
    }
}
