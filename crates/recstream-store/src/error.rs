//! Store-layer errors.

use recstream_kernel::{CompositeStatusError, HandlingStatus, InternalRecordId, OperationError};

/// Errors from JSONL line I/O.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted substrate: {0}")]
    Corrupt(String),
}

fn describe_target(internal_record_id: &Option<InternalRecordId>) -> String {
    match internal_record_id {
        Some(id) => format!("record {id}"),
        None => "the stream".to_string(),
    }
}

/// Everything that can go wrong while executing against a stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    CompositeStatus(#[from] CompositeStatusError),

    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error(
        "{operation} cannot run for {} concern '{concern}': status is {observed}, expected one of {allowed:?}",
        describe_target(.internal_record_id)
    )]
    InvalidTransition {
        operation: &'static str,
        internal_record_id: Option<InternalRecordId>,
        concern: String,
        observed: HandlingStatus,
        allowed: Vec<HandlingStatus>,
    },

    #[error("record {internal_record_id} not found in locator '{locator}'")]
    RecordNotFound {
        locator: String,
        internal_record_id: InternalRecordId,
    },

    #[error("resource locator '{0}' is not part of this stream")]
    UnknownLocator(String),

    #[error(
        "stream has {count} resource locators; specify one for operations addressed by internal record id"
    )]
    LocatorRequired { count: usize },

    #[error("invalid resource locator name '{name}': {reason}")]
    InvalidLocator { name: String, reason: String },

    #[error(
        "existing record(s) {internal_record_ids:?} found for id '{serialized_id}' under {strategy}"
    )]
    ExistingRecordFound {
        strategy: &'static str,
        serialized_id: String,
        internal_record_ids: Vec<InternalRecordId>,
    },

    #[error("stream lock busy: {lock_path}")]
    LockBusy { lock_path: String },

    #[error("failed to acquire stream lock {lock_path}: {message}")]
    LockIo { lock_path: String, message: String },

    #[error("object (de)serialization failed for {type_name}: {message}")]
    Object { type_name: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Join(String),
}

impl StreamError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StreamError::LockBusy { .. })
    }
}

/// Failure of a mutex-guarded action, kept apart from mutex bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum MutexError<E> {
    #[error("mutex-guarded action failed: {0}")]
    Action(E),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl<E> MutexError<E> {
    pub fn into_action(self) -> Option<E> {
        match self {
            MutexError::Action(err) => Some(err),
            MutexError::Stream(_) => None,
        }
    }
}
