//! JSONL file backend with lock-scoped atomic mutation.
//!
//! Each locator is one `<root>/<locator>.jsonl` file. A mutation:
//! - takes `<file>.lock` with `create_new` (retrying while busy)
//! - loads the log, runs the mutator
//! - rewrites the file atomically when the mutator reports a change
//! - removes the lock file on drop

use chrono::Utc;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::StreamError;
use crate::jsonl::{read_lines_from_path, write_lines_to_path};
use crate::locator::LocatorSet;
use crate::log::StreamLog;
use crate::protocol::StandardStream;

pub const DEFAULT_LOCK_RETRY_ATTEMPTS: u32 = 50;
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(20);

pub fn locator_lock_path(log_path: &Path) -> PathBuf {
    let mut path: OsString = log_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

/// Load a locator log from disk.
pub fn load_log_jsonl(path: impl AsRef<Path>) -> Result<StreamLog, StreamError> {
    Ok(StreamLog::from_lines(read_lines_from_path(path)?))
}

/// How long a busy lock is waited for before `LockBusy` surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRetry {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for LockRetry {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_LOCK_RETRY_ATTEMPTS,
            interval: DEFAULT_LOCK_RETRY_INTERVAL,
        }
    }
}

/// Execute one lock-scoped mutation against a locator JSONL file.
///
/// The mutator returns `(value, changed)`; `changed = true` persists the log
/// before the lock is released.
pub fn mutate_log_jsonl<T, F>(
    path: impl AsRef<Path>,
    retry: LockRetry,
    mutator: F,
) -> Result<T, StreamError>
where
    F: FnOnce(&mut StreamLog) -> Result<(T, bool), StreamError>,
{
    let path = path.as_ref();
    let mut attempt = 0;
    let _guard = loop {
        match LocatorFileLockGuard::acquire(path) {
            Ok(guard) => break guard,
            Err(err) if err.is_retryable() && attempt < retry.attempts => {
                attempt += 1;
                debug!(path = %path.display(), attempt, "stream lock busy, retrying");
                std::thread::sleep(retry.interval);
            }
            Err(err) => return Err(err),
        }
    };

    let mut log = load_log_jsonl(path)?;
    let (value, changed) = mutator(&mut log)?;
    if changed {
        write_lines_to_path(path, &log.to_lines())?;
    }
    Ok(value)
}

struct LocatorFileLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl LocatorFileLockGuard {
    fn acquire(path: &Path) -> Result<Self, StreamError> {
        let lock_path = locator_lock_path(path);
        let lock_io = |message: String| StreamError::LockIo {
            lock_path: lock_path.display().to_string(),
            message,
        };
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| lock_io(e.to_string()))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StreamError::LockBusy {
                    lock_path: lock_path.display().to_string(),
                })
            }
            Err(err) => Err(lock_io(err.to_string())),
        }
    }
}

impl Drop for LocatorFileLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// A stream stored as one JSONL file per locator under a root directory.
#[derive(Debug, Clone)]
pub struct JsonlStream {
    name: String,
    root: PathBuf,
    locators: LocatorSet,
    lock_retry: LockRetry,
}

impl JsonlStream {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, locators: LocatorSet) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            locators,
            lock_retry: LockRetry::default(),
        }
    }

    pub fn with_lock_retry(mut self, lock_retry: LockRetry) -> Self {
        self.lock_retry = lock_retry;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locator_path(&self, locator: &str) -> Result<PathBuf, StreamError> {
        if !self.locators.contains(locator) {
            return Err(StreamError::UnknownLocator(locator.to_string()));
        }
        Ok(self.root.join(format!("{locator}.jsonl")))
    }
}

impl StandardStream for JsonlStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn locators(&self) -> &LocatorSet {
        &self.locators
    }

    fn mutate<T, F>(&self, locator: &str, mutator: F) -> Result<T, StreamError>
    where
        F: FnOnce(&mut StreamLog) -> Result<(T, bool), StreamError>,
    {
        mutate_log_jsonl(self.locator_path(locator)?, self.lock_retry, mutator)
    }

    fn read<T, F>(&self, locator: &str, reader: F) -> Result<T, StreamError>
    where
        F: FnOnce(&StreamLog) -> Result<T, StreamError>,
    {
        let log = load_log_jsonl(self.locator_path(locator)?)?;
        reader(&log)
    }
}
