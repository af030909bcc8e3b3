//! A file-with-lockfile reference backend.
//!
//! Replacement of the blob on disk is atomic by writing to a temporary
//! sibling and renaming over the target (POSIX `rename(2)` is atomic within
//! a filesystem). An advisory lock on a separate `.lock` file serializes
//! writers across processes sharing the same filesystem, per spec §6's
//! file-backend contract.
//!
//! There is no portable, cross-platform way to block for a filesystem
//! change notification from a plain file, so [`FileBackend::wait_for_change`]
//! polls at [`FileBackend::with_poll_interval`]'s interval, as spec §9's
//! design notes anticipate.

use crate::Backend;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use syncell_core::{Error, Result, Version};

const VERSION_HEADER_LEN: usize = 8;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Sentinel meaning "no write observed yet" — real file versions start at 1.
const NO_VERSION: u64 = 0;

/// A versioned cell backed by a single file plus an advisory `.lock` file.
#[derive(Clone)]
pub struct FileBackend {
    data_path: PathBuf,
    lock_path: PathBuf,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
    last_seen: Arc<AtomicU64>,
}

impl FileBackend {
    /// Open (without creating) a backend rooted at `data_path`. The lock
    /// file is `data_path` with `.lock` appended.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        let data_path = data_path.into();
        let mut lock_path = data_path.clone().into_os_string();
        lock_path.push(".lock");
        FileBackend {
            data_path,
            lock_path: PathBuf::from(lock_path),
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown: Arc::new(AtomicBool::new(false)),
            last_seen: Arc::new(AtomicU64::new(NO_VERSION)),
        }
    }

    /// Override the polling interval used by `wait_for_change`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn lock_file(&self) -> Result<File> {
        let f = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)?;
        f.lock_exclusive()?;
        Ok(f)
    }

    fn read_raw(&self) -> Result<Option<(u64, Vec<u8>)>> {
        let mut bytes = Vec::new();
        match File::open(&self.data_path) {
            Ok(mut f) => {
                f.read_to_end(&mut bytes)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        if bytes.len() < VERSION_HEADER_LEN {
            return Err(Error::Other(format!(
                "corrupt cell file {:?}: truncated header",
                self.data_path
            )));
        }
        let version = u64::from_le_bytes(bytes[..VERSION_HEADER_LEN].try_into().unwrap());
        let blob = bytes[VERSION_HEADER_LEN..].to_vec();
        Ok(Some((version, blob)))
    }

    fn install(&self, version: u64, blob: &[u8]) -> Result<()> {
        let dir = self
            .data_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&version.to_le_bytes())?;
        tmp.write_all(blob)?;
        tmp.flush()?;
        tmp.persist(&self.data_path)
            .map_err(|e| Error::BackendIo(e.error))?;
        Ok(())
    }
}

impl Backend for FileBackend {
    fn read(&self) -> Result<Option<(Version, Vec<u8>)>> {
        Ok(self
            .read_raw()?
            .map(|(v, blob)| (Version::from_raw(v), blob)))
    }

    fn write(&self, blob: Vec<u8>) -> Result<Version> {
        let _guard = self.lock_file()?;
        let next = self.read_raw()?.map(|(v, _)| v).unwrap_or(NO_VERSION) + 1;
        self.install(next, &blob)?;
        Ok(Version::from_raw(next))
    }

    fn try_write(&self, blob: Vec<u8>, expected: Option<Version>) -> Result<bool> {
        let _guard = self.lock_file()?;
        let current = self.read_raw()?.map(|(v, _)| v);
        let matches = match (current, expected) {
            (None, None) => true,
            (Some(c), Some(e)) => c == e.into_raw(),
            _ => false,
        };
        if !matches {
            return Ok(false);
        }
        let next = current.unwrap_or(NO_VERSION) + 1;
        self.install(next, &blob)?;
        Ok(true)
    }

    fn wait_for_change(&self) -> Result<bool> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(false);
            }
            let current = self.read_raw()?.map(|(v, _)| v).unwrap_or(NO_VERSION);
            if current != self.last_seen.load(Ordering::SeqCst) {
                self.last_seen.store(current, Ordering::SeqCst);
                return Ok(true);
            }
            thread::sleep(self.poll_interval);
        }
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
