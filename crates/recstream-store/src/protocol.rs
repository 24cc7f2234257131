//! The narrow protocol a backend offers to the handling engine.

use crate::error::StreamError;
use crate::locator::LocatorSet;
use crate::log::StreamLog;

/// A backing store holding one [`StreamLog`] per resource locator.
///
/// `mutate` is the only write path. Implementations must run the closure
/// with exclusive access to the locator's log and persist the log before
/// releasing it when the closure reports `changed = true`. That exclusivity
/// is what makes claim a compare-and-append.
///
/// Mutators check everything before they write: a closure returning `Err`
/// has not touched the log, so backends may hand it the live log.
pub trait StandardStream: Send + Sync {
    fn name(&self) -> &str;

    fn locators(&self) -> &LocatorSet;

    fn mutate<T, F>(&self, locator: &str, mutator: F) -> Result<T, StreamError>
    where
        F: FnOnce(&mut StreamLog) -> Result<(T, bool), StreamError>;

    fn read<T, F>(&self, locator: &str, reader: F) -> Result<T, StreamError>
    where
        F: FnOnce(&StreamLog) -> Result<T, StreamError>;
}
