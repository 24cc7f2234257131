//! Stream configuration loaded from TOML.
//!
//! ```toml
//! name = "orders"
//! locators = ["east", "west"]
//! root = "/var/lib/recstream/orders"
//! lock_retry_attempts = 50
//! lock_retry_interval_ms = 20
//! mutex_poll_interval_ms = 200
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::atomic_store::{
    DEFAULT_LOCK_RETRY_ATTEMPTS, DEFAULT_LOCK_RETRY_INTERVAL, JsonlStream, LockRetry,
};
use crate::error::StreamError;
use crate::locator::LocatorSet;
use crate::memory::MemoryStream;
use crate::mutex::{DEFAULT_MUTEX_POLL_INTERVAL, MutexOptions};

fn default_locators() -> Vec<String> {
    vec!["default".to_string()]
}

fn default_lock_retry_attempts() -> u32 {
    DEFAULT_LOCK_RETRY_ATTEMPTS
}

fn default_lock_retry_interval_ms() -> u64 {
    DEFAULT_LOCK_RETRY_INTERVAL.as_millis() as u64
}

fn default_mutex_poll_interval_ms() -> u64 {
    DEFAULT_MUTEX_POLL_INTERVAL.as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    pub name: String,
    #[serde(default = "default_locators")]
    pub locators: Vec<String>,
    /// Directory holding one JSONL file per locator. Required by `open_jsonl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(default = "default_lock_retry_attempts")]
    pub lock_retry_attempts: u32,
    #[serde(default = "default_lock_retry_interval_ms")]
    pub lock_retry_interval_ms: u64,
    #[serde(default = "default_mutex_poll_interval_ms")]
    pub mutex_poll_interval_ms: u64,
}

impl StreamConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locators: default_locators(),
            root: None,
            lock_retry_attempts: DEFAULT_LOCK_RETRY_ATTEMPTS,
            lock_retry_interval_ms: default_lock_retry_interval_ms(),
            mutex_poll_interval_ms: default_mutex_poll_interval_ms(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_locators<I, N>(mut self, locators: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.locators = locators.into_iter().map(Into::into).collect();
        self
    }

    pub fn parse(text: &str) -> Result<Self, StreamError> {
        let config: Self = toml::from_str(text).map_err(|e| StreamError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StreamError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&text).map_err(|err| match err {
            StreamError::Config(message) => {
                StreamError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.name.trim().is_empty() {
            return Err(StreamError::Config("name must not be blank".to_string()));
        }
        self.locator_set().map(|_| ())
    }

    pub fn locator_set(&self) -> Result<LocatorSet, StreamError> {
        LocatorSet::new(self.locators.iter().cloned())
    }

    pub fn lock_retry(&self) -> LockRetry {
        LockRetry {
            attempts: self.lock_retry_attempts,
            interval: Duration::from_millis(self.lock_retry_interval_ms),
        }
    }

    pub fn open_memory(&self) -> Result<MemoryStream, StreamError> {
        self.validate()?;
        Ok(MemoryStream::new(self.name.clone(), self.locator_set()?))
    }

    pub fn open_jsonl(&self) -> Result<JsonlStream, StreamError> {
        self.validate()?;
        let root = self
            .root
            .clone()
            .ok_or_else(|| StreamError::Config("root is required for a JSONL stream".to_string()))?;
        Ok(JsonlStream::new(self.name.clone(), root, self.locator_set()?)
            .with_lock_retry(self.lock_retry()))
    }

    pub fn mutex_options(
        &self,
        id: impl Into<String>,
        details: impl Into<String>,
    ) -> Result<MutexOptions, StreamError> {
        Ok(MutexOptions::new(id, details)?
            .with_poll_interval(Duration::from_millis(self.mutex_poll_interval_ms)))
    }
}
