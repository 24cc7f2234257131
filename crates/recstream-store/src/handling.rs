//! The record-handling engine.
//!
//! Every state change is a read-modify-append inside one backend `mutate`
//! call, so the status check and the append it guards see the same log.
//! Status is never stored: it is replayed from handling entries each time.

use chrono::{DateTime, Utc};
use recstream_kernel::{
    BlockAction, Concern, GetCompositeHandlingStatusByIdsOp, GetCompositeHandlingStatusByTagsOp,
    GetHandlingHistoryOfRecordOp, GetHandlingStatusOp, HandlingEntryMetadata, HandlingOp,
    HandlingStatus, HandlingStatusCompositionStrategy, InternalRecordId,
    RECORD_HANDLING_DISABLED_CONCERN, RecordBlockOp, RecordFilter, RecordHandlingStatus,
    RecordTransitionOp, STREAM_HANDLING_DISABLED_CONCERN, StreamBlockOp, StreamRecord,
    StreamRecordHandlingEntry, Tag, TryHandleRecordOp, current_status, merge_tags,
    reduce_to_composite_handling_status, status_prior_to_block,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::StreamError;
use crate::log::StreamLog;
use crate::protocol::StandardStream;

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryHandleRecordResult {
    /// The claimed record, now `Running` for the concern.
    pub record_to_handle: Option<StreamRecord>,
    pub resource_locator: Option<String>,
    /// Whether handling is disabled for the whole stream.
    pub is_blocked: bool,
}

impl TryHandleRecordResult {
    fn nothing(is_blocked: bool) -> Self {
        Self {
            record_to_handle: None,
            resource_locator: None,
            is_blocked,
        }
    }
}

/// What executing a [`HandlingOp`] produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HandlingOutcome {
    Claimed(TryHandleRecordResult),
    Applied,
    Status(RecordHandlingStatus),
    Composite { status: HandlingStatus },
    History { entries: Vec<StreamRecordHandlingEntry> },
}

enum Claim {
    StreamBlocked,
    Nothing,
    Claimed(StreamRecord),
}

fn entry_metadata(
    record: Option<&StreamRecord>,
    internal_record_id: Option<InternalRecordId>,
    concern: &str,
    status: HandlingStatus,
    tags: Vec<Tag>,
    now: DateTime<Utc>,
) -> HandlingEntryMetadata {
    HandlingEntryMetadata {
        internal_record_id,
        concern: concern.to_string(),
        status,
        id: record.map(|r| r.metadata.id.clone()),
        object_type: record.map(|r| r.metadata.object_type.clone()),
        tags,
        timestamp_utc: now,
        object_timestamp_utc: record.and_then(|r| r.metadata.object_timestamp_utc),
    }
}

fn entry_tags(record: &StreamRecord, inherit_record_tags: bool, tags: &[Tag]) -> Vec<Tag> {
    if inherit_record_tags {
        merge_tags(&record.metadata.tags, tags)
    } else {
        tags.to_vec()
    }
}

fn require_record(
    log: &StreamLog,
    locator: &str,
    internal_record_id: InternalRecordId,
) -> Result<StreamRecord, StreamError> {
    log.record(internal_record_id)
        .cloned()
        .ok_or_else(|| StreamError::RecordNotFound {
            locator: locator.to_string(),
            internal_record_id,
        })
}

fn claim_in_log(
    log: &mut StreamLog,
    op: &TryHandleRecordOp,
    now: DateTime<Utc>,
) -> Result<(Claim, bool), StreamError> {
    if log.is_stream_blocked() {
        return Ok((Claim::StreamBlocked, false));
    }

    let concern = op.concern().as_str();
    let chosen = {
        let statuses = log.latest_statuses(concern);
        let mut candidates: Vec<&StreamRecord> = log
            .records()
            .iter()
            .filter(|record| {
                op.minimum_internal_record_id()
                    .is_none_or(|minimum| record.internal_record_id >= minimum)
            })
            .filter(|record| op.filter().matches(record))
            .collect();
        op.order().sort(&mut candidates);
        candidates
            .into_iter()
            .find(|record| {
                !statuses.is_record_blocked(record.internal_record_id)
                    && statuses
                        .concern_status(record.internal_record_id)
                        .is_claimable()
            })
            .cloned()
    };

    let Some(record) = chosen else {
        return Ok((Claim::Nothing, false));
    };

    let internal_record_id = record.internal_record_id;
    let tags = entry_tags(&record, op.inherit_record_tags(), op.tags());
    if log.history(Some(internal_record_id), concern).next().is_none() {
        log.append_entry(
            entry_metadata(
                Some(&record),
                Some(internal_record_id),
                concern,
                HandlingStatus::Requested,
                tags.clone(),
                now,
            ),
            None,
        );
    }
    log.append_entry(
        entry_metadata(
            Some(&record),
            Some(internal_record_id),
            concern,
            HandlingStatus::Running,
            tags,
            now,
        ),
        op.details().map(str::to_string),
    );
    Ok((Claim::Claimed(record), true))
}

/// Handling operations over a backend.
#[derive(Debug)]
pub struct HandlingProtocol<S> {
    backend: Arc<S>,
}

impl<S> Clone for HandlingProtocol<S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<S: StandardStream> HandlingProtocol<S> {
    pub fn new(backend: Arc<S>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<S> {
        &self.backend
    }

    /// Claim the first eligible record for the op's concern.
    ///
    /// Returns no record when nothing is eligible; that is not an error.
    pub fn try_handle_record(&self, op: &TryHandleRecordOp) -> Result<TryHandleRecordResult, StreamError> {
        for locator in self
            .backend
            .locators()
            .scope(op.specified_resource_locator())?
        {
            let now = Utc::now();
            match self
                .backend
                .mutate(locator, |log| claim_in_log(log, op, now))?
            {
                Claim::StreamBlocked => {
                    debug!(locator, concern = %op.concern(), "handling disabled for stream");
                    return Ok(TryHandleRecordResult::nothing(true));
                }
                Claim::Nothing => {}
                Claim::Claimed(record) => {
                    debug!(
                        locator,
                        concern = %op.concern(),
                        internal_record_id = record.internal_record_id,
                        "claimed record"
                    );
                    return Ok(TryHandleRecordResult {
                        record_to_handle: Some(record),
                        resource_locator: Some(locator.to_string()),
                        is_blocked: false,
                    });
                }
            }
        }
        Ok(TryHandleRecordResult::nothing(false))
    }

    /// Complete, fail, cancel, self-cancel, retry, or cancel a request.
    pub fn apply_transition(&self, op: &RecordTransitionOp) -> Result<(), StreamError> {
        let locator = self
            .backend
            .locators()
            .resolve(op.specified_resource_locator())?;
        let now = Utc::now();
        let concern = op.concern().as_str();
        let id = op.internal_record_id();
        let transition = op.transition();
        self.backend.mutate(locator, |log| {
            let record = require_record(log, locator, id)?;
            let observed = log.concern_status(id, concern);
            let allowed = transition.allowed_from();
            if !allowed.contains(&observed) {
                return Err(StreamError::InvalidTransition {
                    operation: transition.operation_name(),
                    internal_record_id: Some(id),
                    concern: concern.to_string(),
                    observed,
                    allowed: allowed.to_vec(),
                });
            }
            log.append_entry(
                entry_metadata(
                    Some(&record),
                    Some(id),
                    concern,
                    transition.target(),
                    entry_tags(&record, op.inherit_record_tags(), op.tags()),
                    now,
                ),
                op.details().map(str::to_string),
            );
            Ok(((), true))
        })?;
        debug!(
            locator,
            concern,
            internal_record_id = id,
            status = %transition.target(),
            "{}",
            transition.operation_name()
        );
        Ok(())
    }

    /// Block or unblock handling of one record for every concern.
    pub fn apply_record_block(&self, op: &RecordBlockOp) -> Result<(), StreamError> {
        let locator = self
            .backend
            .locators()
            .resolve(op.specified_resource_locator())?;
        let now = Utc::now();
        let id = op.internal_record_id();
        let status = self.backend.mutate(locator, |log| {
            let record = require_record(log, locator, id)?;
            let history = log.history_statuses(Some(id), RECORD_HANDLING_DISABLED_CONCERN);
            let status = match op.action() {
                BlockAction::Block => HandlingStatus::Blocked,
                BlockAction::Unblock => status_prior_to_block(history.iter().copied())
                    .ok_or_else(|| StreamError::InvalidTransition {
                        operation: "CancelBlockedRecordHandling",
                        internal_record_id: Some(id),
                        concern: RECORD_HANDLING_DISABLED_CONCERN.to_string(),
                        observed: current_status(history.iter().copied()),
                        allowed: vec![HandlingStatus::Blocked],
                    })?,
            };
            log.append_entry(
                entry_metadata(
                    Some(&record),
                    Some(id),
                    RECORD_HANDLING_DISABLED_CONCERN,
                    status,
                    op.tags().to_vec(),
                    now,
                ),
                Some(op.details().to_string()),
            );
            Ok((status, true))
        })?;
        info!(locator, internal_record_id = id, %status, details = op.details(), "record handling flag changed");
        Ok(())
    }

    /// Disable or enable handling for the whole stream, on every locator.
    pub fn apply_stream_block(&self, op: &StreamBlockOp) -> Result<(), StreamError> {
        let now = Utc::now();
        let mut applied = 0usize;
        let mut observed = HandlingStatus::None;
        for locator in self.backend.locators().names() {
            let (wrote, seen) = self.backend.mutate(locator, |log| {
                let history = log.history_statuses(None, STREAM_HANDLING_DISABLED_CONCERN);
                let seen = current_status(history.iter().copied());
                let status = match op.action() {
                    BlockAction::Block => Some(HandlingStatus::Blocked),
                    BlockAction::Unblock => status_prior_to_block(history),
                };
                let Some(status) = status else {
                    return Ok(((false, seen), false));
                };
                log.append_entry(
                    entry_metadata(
                        None,
                        None,
                        STREAM_HANDLING_DISABLED_CONCERN,
                        status,
                        op.tags().to_vec(),
                        now,
                    ),
                    Some(op.details().to_string()),
                );
                Ok(((true, seen), true))
            })?;
            if wrote {
                applied += 1;
            }
            observed = seen;
        }
        if applied == 0 {
            return Err(StreamError::InvalidTransition {
                operation: "EnableHandlingForStream",
                internal_record_id: None,
                concern: STREAM_HANDLING_DISABLED_CONCERN.to_string(),
                observed,
                allowed: vec![HandlingStatus::Blocked],
            });
        }
        info!(
            stream = self.backend.name(),
            action = ?op.action(),
            locators = applied,
            details = op.details(),
            "stream handling flag changed"
        );
        Ok(())
    }

    /// Stream-level status: `Blocked` while handling is disabled.
    pub fn stream_handling_status(&self) -> Result<HandlingStatus, StreamError> {
        let mut statuses = Vec::new();
        for locator in self.backend.locators().names() {
            statuses.push(self.backend.read(locator, |log| Ok(log.stream_status()))?);
        }
        Ok(reduce_to_composite_handling_status(
            &statuses,
            HandlingStatusCompositionStrategy::default(),
        )?)
    }

    pub fn get_handling_status(&self, op: &GetHandlingStatusOp) -> Result<RecordHandlingStatus, StreamError> {
        let locator = self
            .backend
            .locators()
            .resolve(op.specified_resource_locator())?;
        let status = self.backend.read(locator, |log| {
            require_record(log, locator, op.internal_record_id())?;
            Ok(log.observed_status(op.internal_record_id(), op.concern().as_str()))
        })?;
        Ok(RecordHandlingStatus {
            resource_locator: locator.to_string(),
            internal_record_id: op.internal_record_id(),
            concern: op.concern().clone(),
            status,
        })
    }

    /// Observed status of every matching record, per locator.
    pub fn handling_statuses(
        &self,
        concern: &Concern,
        filter: &RecordFilter,
    ) -> Result<Vec<RecordHandlingStatus>, StreamError> {
        let mut out = Vec::new();
        for locator in self.backend.locators().names() {
            let found = self.backend.read(locator, |log| {
                let statuses = log.latest_statuses(concern.as_str());
                Ok(log
                    .records()
                    .iter()
                    .filter(|record| filter.matches(record))
                    .map(|record| {
                        (
                            record.internal_record_id,
                            statuses.observed_status(record.internal_record_id),
                        )
                    })
                    .collect::<Vec<_>>())
            })?;
            out.extend(
                found
                    .into_iter()
                    .map(|(internal_record_id, status)| RecordHandlingStatus {
                        resource_locator: locator.clone(),
                        internal_record_id,
                        concern: concern.clone(),
                        status,
                    }),
            );
        }
        Ok(out)
    }

    fn composite(
        &self,
        concern: &Concern,
        filter: &RecordFilter,
        composition: HandlingStatusCompositionStrategy,
    ) -> Result<HandlingStatus, StreamError> {
        let statuses: Vec<HandlingStatus> = self
            .handling_statuses(concern, filter)?
            .into_iter()
            .map(|found| found.status)
            .collect();
        Ok(reduce_to_composite_handling_status(&statuses, composition)?)
    }

    pub fn get_composite_handling_status_by_ids(
        &self,
        op: &GetCompositeHandlingStatusByIdsOp,
    ) -> Result<HandlingStatus, StreamError> {
        self.composite(op.concern(), &op.filter(), op.composition())
    }

    pub fn get_composite_handling_status_by_tags(
        &self,
        op: &GetCompositeHandlingStatusByTagsOp,
    ) -> Result<HandlingStatus, StreamError> {
        self.composite(op.concern(), &op.filter(), op.composition())
    }

    /// Entries of one (record, concern) pair in append order.
    pub fn get_handling_history_of_record(
        &self,
        op: &GetHandlingHistoryOfRecordOp,
    ) -> Result<Vec<StreamRecordHandlingEntry>, StreamError> {
        let locator = self
            .backend
            .locators()
            .resolve(op.specified_resource_locator())?;
        self.backend.read(locator, |log| {
            Ok(log
                .history(Some(op.internal_record_id()), op.concern().as_str())
                .cloned()
                .collect())
        })
    }

    /// Run any handling operation.
    pub fn execute(&self, op: &HandlingOp) -> Result<HandlingOutcome, StreamError> {
        Ok(match op {
            HandlingOp::TryHandleRecord(op) => HandlingOutcome::Claimed(self.try_handle_record(op)?),
            HandlingOp::Transition(op) => {
                self.apply_transition(op)?;
                HandlingOutcome::Applied
            }
            HandlingOp::RecordBlock(op) => {
                self.apply_record_block(op)?;
                HandlingOutcome::Applied
            }
            HandlingOp::StreamBlock(op) => {
                self.apply_stream_block(op)?;
                HandlingOutcome::Applied
            }
            HandlingOp::GetHandlingStatus(op) => HandlingOutcome::Status(self.get_handling_status(op)?),
            HandlingOp::GetCompositeHandlingStatusByIds(op) => HandlingOutcome::Composite {
                status: self.get_composite_handling_status_by_ids(op)?,
            },
            HandlingOp::GetCompositeHandlingStatusByTags(op) => HandlingOutcome::Composite {
                status: self.get_composite_handling_status_by_tags(op)?,
            },
            HandlingOp::GetHandlingHistoryOfRecord(op) => HandlingOutcome::History {
                entries: self.get_handling_history_of_record(op)?,
            },
        })
    }
}

impl<S: StandardStream + 'static> HandlingProtocol<S> {
    /// Run an operation on tokio's blocking pool.
    pub async fn execute_async(&self, op: HandlingOp) -> Result<HandlingOutcome, StreamError> {
        let protocol = self.clone();
        tokio::task::spawn_blocking(move || protocol.execute(&op))
            .await
            .map_err(|e| StreamError::Join(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStream;
    use crate::records::RecordStream;
    use recstream_kernel::{
        DescribedSerialization, PutRecordOp, StringSerializedIdentifier, TagMatchStrategy,
        TypeRepresentation,
    };

    fn setup() -> (RecordStream<MemoryStream>, HandlingProtocol<MemoryStream>) {
        let backend = Arc::new(MemoryStream::single("work").expect("valid stream"));
        (
            RecordStream::new(Arc::clone(&backend)),
            HandlingProtocol::new(backend),
        )
    }

    fn put(records: &RecordStream<MemoryStream>, id: &str, tags: Vec<Tag>) -> InternalRecordId {
        let op = PutRecordOp::new(
            StringSerializedIdentifier::new(id, TypeRepresentation::unversioned("string")),
            DescribedSerialization::json(TypeRepresentation::new("Job", "1"), "{}"),
        )
        .expect("valid put")
        .with_tags(tags);
        records
            .put(&op)
            .expect("put should succeed")
            .internal_record_id
            .expect("record should be written")
    }

    fn claim(handling: &HandlingProtocol<MemoryStream>, concern: &str) -> Option<InternalRecordId> {
        handling
            .try_handle_record(&TryHandleRecordOp::new(concern).expect("valid op"))
            .expect("claim should not error")
            .record_to_handle
            .map(|record| record.internal_record_id)
    }

    fn status(handling: &HandlingProtocol<MemoryStream>, id: InternalRecordId, concern: &str) -> HandlingStatus {
        handling
            .get_handling_status(&GetHandlingStatusOp::new(concern, id).expect("valid op"))
            .expect("status query")
            .status
    }

    #[test]
    fn first_claim_writes_requested_then_running() {
        let (records, handling) = setup();
        let id = put(&records, "a", vec![]);
        assert_eq!(claim(&handling, "indexer"), Some(id));

        let history = handling
            .get_handling_history_of_record(
                &GetHandlingHistoryOfRecordOp::new(id, "indexer").expect("valid op"),
            )
            .expect("history");
        let statuses: Vec<HandlingStatus> = history.iter().map(|e| e.status()).collect();
        assert_eq!(statuses, vec![HandlingStatus::Requested, HandlingStatus::Running]);
        assert_eq!(claim(&handling, "indexer"), None);
    }

    #[test]
    fn concerns_are_independent() {
        let (records, handling) = setup();
        let id = put(&records, "a", vec![]);
        assert_eq!(claim(&handling, "indexer"), Some(id));
        assert_eq!(claim(&handling, "mailer"), Some(id));
        assert_eq!(status(&handling, id, "indexer"), HandlingStatus::Running);
    }

    #[test]
    fn claims_follow_order_and_minimum() {
        let (records, handling) = setup();
        let first = put(&records, "a", vec![]);
        let second = put(&records, "b", vec![]);
        let third = put(&records, "c", vec![]);

        let newest = TryHandleRecordOp::new("indexer")
            .expect("valid op")
            .with_order(recstream_kernel::OrderRecordsBy::InternalRecordIdDescending);
        let claimed = handling.try_handle_record(&newest).expect("claim");
        assert_eq!(claimed.record_to_handle.map(|r| r.internal_record_id), Some(third));

        let floor = TryHandleRecordOp::new("indexer")
            .expect("valid op")
            .with_minimum_internal_record_id(second)
            .expect("valid floor");
        let claimed = handling.try_handle_record(&floor).expect("claim");
        assert_eq!(claimed.record_to_handle.map(|r| r.internal_record_id), Some(second));
        assert_eq!(claim(&handling, "indexer"), Some(first));
    }

    #[test]
    fn illegal_transitions_name_the_observed_status() {
        let (records, handling) = setup();
        let id = put(&records, "a", vec![]);
        let err = handling
            .apply_transition(&RecordTransitionOp::complete(id, "indexer").expect("valid op"))
            .expect_err("nothing is running");
        insta::assert_snapshot!(
            err.to_string(),
            @"CompleteRunningHandleRecordExecution cannot run for record 1 concern 'indexer': status is none, expected one of [Running]"
        );
        match err {
            StreamError::InvalidTransition {
                operation, observed, ..
            } => {
                assert_eq!(operation, "CompleteRunningHandleRecordExecution");
                assert_eq!(observed, HandlingStatus::None);
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[test]
    fn cancel_request_stops_pending_work() {
        let (records, handling) = setup();
        let id = put(&records, "a", vec![]);
        handling
            .apply_transition(
                &RecordTransitionOp::cancel_request(id, "indexer", "not needed").expect("valid op"),
            )
            .expect("cancel request");
        assert_eq!(status(&handling, id, "indexer"), HandlingStatus::Canceled);
        assert_eq!(claim(&handling, "indexer"), None);
    }

    #[test]
    fn record_block_hides_record_from_claims() {
        let (records, handling) = setup();
        let blocked = put(&records, "a", vec![]);
        let open = put(&records, "b", vec![]);
        handling
            .apply_record_block(&RecordBlockOp::block(blocked, "poison").expect("valid op"))
            .expect("block");
        assert_eq!(status(&handling, blocked, "indexer"), HandlingStatus::Blocked);
        assert_eq!(claim(&handling, "indexer"), Some(open));

        handling
            .apply_record_block(&RecordBlockOp::cancel_block(blocked, "fixed").expect("valid op"))
            .expect("unblock");
        assert_eq!(status(&handling, blocked, "indexer"), HandlingStatus::None);
        assert_eq!(claim(&handling, "indexer"), Some(blocked));
    }

    #[test]
    fn unblocking_an_unblocked_record_is_rejected() {
        let (records, handling) = setup();
        let id = put(&records, "a", vec![]);
        assert!(matches!(
            handling.apply_record_block(&RecordBlockOp::cancel_block(id, "oops").expect("valid op")),
            Err(StreamError::InvalidTransition { .. })
        ));
        assert!(matches!(
            handling.apply_stream_block(&StreamBlockOp::enable("oops").expect("valid op")),
            Err(StreamError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn running_work_can_finish_while_stream_is_disabled() {
        let (records, handling) = setup();
        let id = put(&records, "a", vec![]);
        assert_eq!(claim(&handling, "indexer"), Some(id));
        handling
            .apply_stream_block(&StreamBlockOp::disable("deploy").expect("valid op"))
            .expect("disable");

        let blocked = handling
            .try_handle_record(&TryHandleRecordOp::new("other").expect("valid op"))
            .expect("claim");
        assert!(blocked.is_blocked);
        assert!(blocked.record_to_handle.is_none());

        handling
            .apply_transition(&RecordTransitionOp::complete(id, "indexer").expect("valid op"))
            .expect("complete while disabled");
        assert_eq!(
            handling.stream_handling_status().expect("stream status"),
            HandlingStatus::Blocked
        );
    }

    #[test]
    fn inherited_tags_are_merged_into_entries() {
        let (records, handling) = setup();
        let id = put(&records, "a", vec![Tag::new("team", "search")]);
        let op = TryHandleRecordOp::new("indexer")
            .expect("valid op")
            .inheriting_record_tags(true)
            .with_tags(vec![Tag::new("worker", "w1")]);
        handling.try_handle_record(&op).expect("claim");
        let history = handling
            .get_handling_history_of_record(
                &GetHandlingHistoryOfRecordOp::new(id, "indexer").expect("valid op"),
            )
            .expect("history");
        assert_eq!(
            history[1].metadata.tags,
            vec![Tag::new("team", "search"), Tag::new("worker", "w1")]
        );
    }

    #[test]
    fn composite_by_tags_reduces_matching_records() {
        let (records, handling) = setup();
        let batch = vec![Tag::new("batch", "7")];
        let first = put(&records, "a", batch.clone());
        put(&records, "b", batch.clone());
        put(&records, "c", vec![]);

        let op = GetCompositeHandlingStatusByTagsOp::new(
            "indexer",
            batch,
            TagMatchStrategy::RecordContainsAllQueryTags,
        )
        .expect("valid op");
        assert_eq!(
            handling.get_composite_handling_status_by_tags(&op).expect("composite"),
            HandlingStatus::None
        );

        assert_eq!(claim(&handling, "indexer"), Some(first));
        assert_eq!(
            handling.get_composite_handling_status_by_tags(&op).expect("composite"),
            HandlingStatus::Running
        );
    }

    #[test]
    fn execute_dispatches_every_variant() {
        let (records, handling) = setup();
        let id = put(&records, "a", vec![]);
        let claimed = handling
            .execute(&HandlingOp::TryHandleRecord(
                TryHandleRecordOp::new("indexer").expect("valid op"),
            ))
            .expect("execute");
        assert!(matches!(claimed, HandlingOutcome::Claimed(ref result) if result.record_to_handle.is_some()));

        let applied = handling
            .execute(&HandlingOp::Transition(
                RecordTransitionOp::complete(id, "indexer").expect("valid op"),
            ))
            .expect("execute");
        assert_eq!(applied, HandlingOutcome::Applied);

        let composite = handling
            .execute(&HandlingOp::GetCompositeHandlingStatusByIds(
                GetCompositeHandlingStatusByIdsOp::new(
                    "indexer",
                    vec![StringSerializedIdentifier::new(
                        "a",
                        TypeRepresentation::unversioned("string"),
                    )],
                )
                .expect("valid op"),
            ))
            .expect("execute");
        assert_eq!(
            composite,
            HandlingOutcome::Composite {
                status: HandlingStatus::Completed
            }
        );
    }

    #[tokio::test]
    async fn execute_async_runs_on_blocking_pool() {
        let (records, handling) = setup();
        let id = put(&records, "a", vec![]);
        let outcome = handling
            .execute_async(HandlingOp::GetHandlingStatus(
                GetHandlingStatusOp::new("indexer", id).expect("valid op"),
            ))
            .await
            .expect("execute async");
        match outcome {
            HandlingOutcome::Status(found) => assert_eq!(found.status, HandlingStatus::None),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
