//! # recstream-store
//!
//! Backends and protocols over the pure kernel in `recstream-kernel`.
//!
//! This crate provides:
//! - `StandardStream`, the lock-scoped read/mutate seam every backend implements
//! - `MemoryStream` (process-local) and `JsonlStream` (one JSONL file per locator)
//! - `RecordStream`, the record put/query protocol
//! - `HandlingProtocol`, claims, transitions, blocks and status queries
//! - `StreamDistributedMutex`, a mutex built from handling one record
//!
//! ## Data model
//!
//! ```text
//! <root>/<locator>.jsonl   (sequence, record and handling-entry lines)
//!     ↕  load / atomic rewrite under <locator>.jsonl.lock
//! StreamLog                (records + handling entries of one locator)
//!     ↕  mutate / read
//! RecordStream · HandlingProtocol · StreamDistributedMutex
//! ```

pub mod atomic_store;
pub mod config;
pub mod error;
pub mod handling;
pub mod jsonl;
pub mod locator;
pub mod log;
pub mod memory;
pub mod mutex;
pub mod protocol;
pub mod records;

pub use atomic_store::{
    DEFAULT_LOCK_RETRY_ATTEMPTS, DEFAULT_LOCK_RETRY_INTERVAL, JsonlStream, LockRetry,
    load_log_jsonl, locator_lock_path, mutate_log_jsonl,
};
pub use config::StreamConfig;
pub use error::{JsonlError, MutexError, StreamError};
pub use handling::{HandlingOutcome, HandlingProtocol, TryHandleRecordResult};
pub use jsonl::{read_lines, read_lines_from_path, write_lines, write_lines_to_path};
pub use locator::{LocatorSet, validate_locator_name};
pub use log::{
    LatestStatuses, PruneSummary, STREAM_LINE_SCHEMA, StreamLine, StreamLineBody, StreamLog,
};
pub use memory::MemoryStream;
pub use mutex::{
    DEFAULT_MUTEX_POLL_INTERVAL, MutexLease, MutexObject, MutexOptions, StreamDistributedMutex,
    execute_synchronously_using_stream_mutex, execute_using_stream_mutex_async,
};
pub use protocol::StandardStream;
pub use records::{
    LocatedRecord, PutRecordResult, RecordStream, StreamObject, deserialize_object, put_op_for,
};
