//! Stream distributed mutex.
//!
//! A mutex is a `MutexObject` record whose handling under one concern is
//! the lock: claiming it (`Running`) acquires, and self-canceling the run
//! releases, leaving the record claimable again. Waiters poll.

use recstream_kernel::{
    Concern, ExistingRecordStrategy, HandlingOp, HasTypeRepresentation, InternalRecordId,
    OperationError, RecordFilter, RecordTransitionOp, TryHandleRecordOp, TypeRepresentation,
    TypeSelectionStrategy, require_non_blank,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MutexError, StreamError};
use crate::handling::{HandlingOutcome, HandlingProtocol};
use crate::protocol::StandardStream;
use crate::records::{RecordStream, StreamObject, put_op_for};

pub const DEFAULT_MUTEX_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The record a mutex is anchored on; its id is the mutex name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutexObject {
    pub id: String,
}

impl HasTypeRepresentation for MutexObject {
    fn type_representation() -> TypeRepresentation {
        TypeRepresentation::new("MutexObject", "1")
    }
}

impl StreamObject for MutexObject {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexOptions {
    pub id: String,
    pub details: String,
    pub concern: Concern,
    pub poll_interval: Duration,
}

impl MutexOptions {
    pub fn new(id: impl Into<String>, details: impl Into<String>) -> Result<Self, OperationError> {
        let id = id.into();
        let details = details.into();
        require_non_blank("mutexId", &id)?;
        require_non_blank("details", &details)?;
        Ok(Self {
            id,
            details,
            concern: Concern::mutex_default(),
            poll_interval: DEFAULT_MUTEX_POLL_INTERVAL,
        })
    }

    pub fn with_concern(mut self, concern: impl Into<String>) -> Result<Self, OperationError> {
        self.concern = Concern::new(concern)?;
        Ok(self)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Proof of holding a mutex, consumed by release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexLease {
    pub resource_locator: String,
    pub internal_record_id: InternalRecordId,
    pub holder: Uuid,
}

/// Make sure the mutex record exists and return where it lives.
fn ensure_mutex_record<S: StandardStream>(
    records: &RecordStream<S>,
    id: &str,
) -> Result<(String, InternalRecordId), StreamError> {
    let op = put_op_for(
        &MutexObject { id: id.to_string() },
        TypeSelectionStrategy::UseDeclaredType,
    )?
    .with_existing_record_strategy(ExistingRecordStrategy::DoNotWriteIfFoundByIdAndType, None)?;
    let result = records.put(&op)?;
    let internal_record_id = result
        .internal_record_id
        .or_else(|| result.existing_record_ids.first().copied())
        .ok_or_else(|| StreamError::Config(format!("mutex record '{id}' could not be written")))?;
    Ok((result.resource_locator, internal_record_id))
}

/// A named mutex over one stream.
#[derive(Debug)]
pub struct StreamDistributedMutex<S> {
    records: RecordStream<S>,
    handling: HandlingProtocol<S>,
    options: MutexOptions,
}

impl<S> Clone for StreamDistributedMutex<S> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            handling: self.handling.clone(),
            options: self.options.clone(),
        }
    }
}

impl<S: StandardStream> StreamDistributedMutex<S> {
    pub fn new(backend: Arc<S>, options: MutexOptions) -> Self {
        Self {
            records: RecordStream::new(Arc::clone(&backend)),
            handling: HandlingProtocol::new(backend),
            options,
        }
    }

    pub fn options(&self) -> &MutexOptions {
        &self.options
    }

    fn claim_op(
        &self,
        locator: &str,
        internal_record_id: InternalRecordId,
        holder: Uuid,
    ) -> Result<TryHandleRecordOp, StreamError> {
        Ok(TryHandleRecordOp::new(self.options.concern.as_str())?
            .with_filter(RecordFilter::new().with_internal_record_ids([internal_record_id]))
            .with_details(format!("holder {holder}: {}", self.options.details))?
            .with_resource_locator(locator)?)
    }

    /// One claim attempt; `Ok(None)` when another holder has the mutex.
    fn try_acquire(
        &self,
        locator: &str,
        internal_record_id: InternalRecordId,
        holder: Uuid,
    ) -> Result<Option<MutexLease>, StreamError> {
        let op = self.claim_op(locator, internal_record_id, holder)?;
        match self.handling.try_handle_record(&op) {
            Ok(result) if result.record_to_handle.is_some() => Ok(Some(MutexLease {
                resource_locator: locator.to_string(),
                internal_record_id,
                holder,
            })),
            Ok(_) => Ok(None),
            Err(err) if err.is_retryable() => {
                debug!(mutex = %self.options.id, %err, "mutex claim attempt lost to a busy lock");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Block the calling thread until the mutex is held.
    pub fn wait_one(&self) -> Result<MutexLease, StreamError> {
        let (locator, internal_record_id) = ensure_mutex_record(&self.records, &self.options.id)?;
        let holder = Uuid::new_v4();
        loop {
            if let Some(lease) = self.try_acquire(&locator, internal_record_id, holder)? {
                debug!(mutex = %self.options.id, %holder, "mutex acquired");
                return Ok(lease);
            }
            std::thread::sleep(self.options.poll_interval);
        }
    }

    fn release_op(&self, lease: &MutexLease) -> Result<RecordTransitionOp, StreamError> {
        Ok(RecordTransitionOp::self_cancel_running(
            lease.internal_record_id,
            self.options.concern.as_str(),
            format!("released by holder {}", lease.holder),
        )?
        .with_resource_locator(lease.resource_locator.clone())?)
    }

    /// Release a held mutex so the next waiter can claim it.
    ///
    /// A busy store lock is waited out at the poll interval; only
    /// non-retryable errors are returned.
    pub fn release(&self, lease: &MutexLease) -> Result<(), StreamError> {
        let op = self.release_op(lease)?;
        loop {
            match self.handling.apply_transition(&op) {
                Ok(()) => break,
                Err(err) if err.is_retryable() => {
                    debug!(mutex = %self.options.id, %err, "mutex release waiting on a busy lock");
                    std::thread::sleep(self.options.poll_interval);
                }
                Err(err) => return Err(err),
            }
        }
        debug!(mutex = %self.options.id, holder = %lease.holder, "mutex released");
        Ok(())
    }

    fn release_or_warn(&self, lease: &MutexLease) {
        if let Err(err) = self.release(lease) {
            warn!(mutex = %self.options.id, %err, "failed to release mutex during unwind");
        }
    }
}

impl<S: StandardStream + 'static> StreamDistributedMutex<S> {
    /// Async twin of [`StreamDistributedMutex::wait_one`].
    pub async fn wait_one_async(&self) -> Result<MutexLease, StreamError> {
        let records = self.records.clone();
        let id = self.options.id.clone();
        let (locator, internal_record_id) =
            tokio::task::spawn_blocking(move || ensure_mutex_record(&records, &id))
                .await
                .map_err(|e| StreamError::Join(e.to_string()))??;

        let holder = Uuid::new_v4();
        loop {
            let op = self.claim_op(&locator, internal_record_id, holder)?;
            match self.handling.execute_async(HandlingOp::TryHandleRecord(op)).await {
                Ok(HandlingOutcome::Claimed(result)) if result.record_to_handle.is_some() => {
                    debug!(mutex = %self.options.id, %holder, "mutex acquired");
                    return Ok(MutexLease {
                        resource_locator: locator,
                        internal_record_id,
                        holder,
                    });
                }
                Ok(_) => {}
                Err(err) if err.is_retryable() => {
                    debug!(mutex = %self.options.id, %err, "mutex claim attempt lost to a busy lock");
                }
                Err(err) => return Err(err),
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Async twin of [`StreamDistributedMutex::release`].
    pub async fn release_async(&self, lease: &MutexLease) -> Result<(), StreamError> {
        let op = HandlingOp::Transition(self.release_op(lease)?);
        loop {
            match self.handling.execute_async(op.clone()).await {
                Ok(_) => break,
                Err(err) if err.is_retryable() => {
                    debug!(mutex = %self.options.id, %err, "mutex release waiting on a busy lock");
                    tokio::time::sleep(self.options.poll_interval).await;
                }
                Err(err) => return Err(err),
            }
        }
        debug!(mutex = %self.options.id, holder = %lease.holder, "mutex released");
        Ok(())
    }
}

/// Releases the lease when dropped, including during unwinding.
struct ReleaseOnDrop<'a, S: StandardStream> {
    mutex: &'a StreamDistributedMutex<S>,
    lease: Option<MutexLease>,
}

impl<S: StandardStream> ReleaseOnDrop<'_, S> {
    /// Release now and report the outcome instead of logging it.
    fn release(mut self) -> Result<(), StreamError> {
        match self.lease.take() {
            Some(lease) => self.mutex.release(&lease),
            None => Ok(()),
        }
    }
}

impl<S: StandardStream> Drop for ReleaseOnDrop<'_, S> {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            self.mutex.release_or_warn(&lease);
        }
    }
}

/// Async counterpart of [`ReleaseOnDrop`]: releases on tokio's blocking
/// pool, and also covers a caller dropping the future mid-action.
struct ReleaseOnDropAsync<S: StandardStream + 'static> {
    mutex: StreamDistributedMutex<S>,
    lease: Option<MutexLease>,
}

impl<S: StandardStream + 'static> ReleaseOnDropAsync<S> {
    async fn release(&mut self) -> Result<(), StreamError> {
        let Some(lease) = self.lease.clone() else {
            return Ok(());
        };
        let released = self.mutex.release_async(&lease).await;
        self.lease = None;
        released
    }
}

impl<S: StandardStream + 'static> Drop for ReleaseOnDropAsync<S> {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        let mutex = self.mutex.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || mutex.release_or_warn(&lease));
            }
            Err(_) => mutex.release_or_warn(&lease),
        }
    }
}

fn finish<T, E>(
    mutex_id: &str,
    outcome: Result<T, E>,
    released: Result<(), StreamError>,
) -> Result<T, MutexError<E>> {
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(MutexError::Stream(release_err)),
        (Err(action_err), Ok(())) => Err(MutexError::Action(action_err)),
        (Err(action_err), Err(release_err)) => {
            warn!(mutex = mutex_id, err = %release_err, "failed to release mutex after action failure");
            Err(MutexError::Action(action_err))
        }
    }
}

/// Run `action` while holding the named mutex.
///
/// The mutex is released whether the action returns `Ok`, `Err`, or panics.
/// An action error wins over a release error, which is then only logged.
pub fn execute_synchronously_using_stream_mutex<S, T, E, F>(
    backend: Arc<S>,
    options: MutexOptions,
    action: F,
) -> Result<T, MutexError<E>>
where
    S: StandardStream,
    F: FnOnce() -> Result<T, E>,
{
    let mutex = StreamDistributedMutex::new(backend, options);
    let lease = mutex.wait_one()?;
    let guard = ReleaseOnDrop {
        mutex: &mutex,
        lease: Some(lease),
    };
    let outcome = action();
    let released = guard.release();
    finish(&mutex.options.id, outcome, released)
}

/// Async twin of [`execute_synchronously_using_stream_mutex`].
pub async fn execute_using_stream_mutex_async<S, T, E, F, Fut>(
    backend: Arc<S>,
    options: MutexOptions,
    action: F,
) -> Result<T, MutexError<E>>
where
    S: StandardStream + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mutex = StreamDistributedMutex::new(backend, options);
    let lease = mutex.wait_one_async().await?;
    let mut guard = ReleaseOnDropAsync {
        mutex: mutex.clone(),
        lease: Some(lease),
    };
    let outcome = action().await;
    let released = guard.release().await;
    finish(&mutex.options.id, outcome, released)
}
