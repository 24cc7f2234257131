//! In-memory backend: one `parking_lot::Mutex<StreamLog>` per locator.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::error::StreamError;
use crate::locator::LocatorSet;
use crate::log::StreamLog;
use crate::protocol::StandardStream;

#[derive(Debug)]
pub struct MemoryStream {
    name: String,
    locators: LocatorSet,
    logs: BTreeMap<String, Mutex<StreamLog>>,
}

impl MemoryStream {
    pub fn new(name: impl Into<String>, locators: LocatorSet) -> Self {
        let logs = locators
            .names()
            .iter()
            .map(|locator| (locator.clone(), Mutex::new(StreamLog::default())))
            .collect();
        Self {
            name: name.into(),
            locators,
            logs,
        }
    }

    /// A single-locator stream whose locator is named `default`.
    pub fn single(name: impl Into<String>) -> Result<Self, StreamError> {
        Ok(Self::new(name, LocatorSet::single("default")?))
    }

    fn log(&self, locator: &str) -> Result<&Mutex<StreamLog>, StreamError> {
        self.logs
            .get(locator)
            .ok_or_else(|| StreamError::UnknownLocator(locator.to_string()))
    }
}

impl StandardStream for MemoryStream {
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
        let mut guard = self.log(locator)?.lock();
        let (value, _changed) = mutator(&mut guard)?;
        Ok(value)
    }

    fn read<T, F>(&self, locator: &str, reader: F) -> Result<T, StreamError>
    where
        F: FnOnce(&StreamLog) -> Result<T, StreamError>,
    {
        let guard = self.log(locator)?.lock();
        reader(&guard)
    }
}
