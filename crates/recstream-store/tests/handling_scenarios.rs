use recstream_kernel::{
    GetCompositeHandlingStatusByIdsOp, GetHandlingHistoryOfRecordOp, GetHandlingStatusOp,
    HandlingStatus, HasTypeRepresentation, InternalRecordId, RecordBlockOp, RecordFilter,
    RecordTransitionOp, StreamBlockOp, StringSerializedIdentifier, Tag, TryHandleRecordOp,
    TypeRepresentation, TypeSelectionStrategy,
};
use recstream_store::{
    HandlingProtocol, JsonlStream, LocatorSet, MemoryStream, RecordStream, StandardStream,
    StreamError, StreamObject,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Shipment {
    code: String,
    destination: String,
}

impl HasTypeRepresentation for Shipment {
    fn type_representation() -> TypeRepresentation {
        TypeRepresentation::new("Shipment", "1")
    }
}

impl StreamObject for Shipment {
    type Id = String;

    fn id(&self) -> String {
        self.code.clone()
    }

    fn tags(&self) -> Vec<Tag> {
        vec![Tag::new("destination", self.destination.clone())]
    }
}

fn shipment(code: &str, destination: &str) -> Shipment {
    Shipment {
        code: code.to_string(),
        destination: destination.to_string(),
    }
}

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "recstream-store-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn put<S: StandardStream>(records: &RecordStream<S>, object: &Shipment) -> InternalRecordId {
    records
        .put_object(object, TypeSelectionStrategy::UseDeclaredType)
        .expect("put should succeed")
        .internal_record_id
        .expect("record should be written")
}

fn claim_for<S: StandardStream>(
    handling: &HandlingProtocol<S>,
    concern: &str,
    code: &str,
) -> Option<InternalRecordId> {
    let id = StringSerializedIdentifier::from_id(&code.to_string()).expect("id should serialize");
    let op = TryHandleRecordOp::new(concern)
        .expect("valid op")
        .with_filter(RecordFilter::new().with_ids([id]));
    handling
        .try_handle_record(&op)
        .expect("claim should not error")
        .record_to_handle
        .map(|record| record.internal_record_id)
}

fn status<S: StandardStream>(
    handling: &HandlingProtocol<S>,
    id: InternalRecordId,
    concern: &str,
) -> HandlingStatus {
    handling
        .get_handling_status(&GetHandlingStatusOp::new(concern, id).expect("valid op"))
        .expect("status query should succeed")
        .status
}

fn history<S: StandardStream>(
    handling: &HandlingProtocol<S>,
    id: InternalRecordId,
    concern: &str,
) -> Vec<HandlingStatus> {
    handling
        .get_handling_history_of_record(
            &GetHandlingHistoryOfRecordOp::new(id, concern).expect("valid op"),
        )
        .expect("history query should succeed")
        .iter()
        .map(|entry| entry.status())
        .collect()
}

fn run_full_lifecycle<S: StandardStream>(backend: Arc<S>) {
    let records = RecordStream::new(Arc::clone(&backend));
    let handling = HandlingProtocol::new(backend);
    let first = put(&records, &shipment("sh-1", "oslo"));
    put(&records, &shipment("sh-2", "lima"));

    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(first));
    assert_eq!(status(&handling, first, "A"), HandlingStatus::Running);

    handling
        .apply_transition(
            &RecordTransitionOp::cancel_running(first, "A", "operator stop").expect("valid op"),
        )
        .expect("cancel running");
    assert_eq!(status(&handling, first, "A"), HandlingStatus::CanceledRunning);

    handling
        .apply_stream_block(&StreamBlockOp::disable("maintenance").expect("valid op"))
        .expect("disable stream");
    assert_eq!(status(&handling, first, "A"), HandlingStatus::Blocked);
    assert_eq!(claim_for(&handling, "A", "sh-1"), None);

    handling
        .apply_stream_block(&StreamBlockOp::enable("maintenance over").expect("valid op"))
        .expect("enable stream");
    assert_eq!(status(&handling, first, "A"), HandlingStatus::CanceledRunning);

    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(first));
    assert_eq!(status(&handling, first, "A"), HandlingStatus::Running);

    handling
        .apply_transition(
            &RecordTransitionOp::self_cancel_running(first, "A", "shutting down")
                .expect("valid op"),
        )
        .expect("self cancel");
    assert_eq!(
        status(&handling, first, "A"),
        HandlingStatus::SelfCanceledRunning
    );

    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(first));
    handling
        .apply_transition(&RecordTransitionOp::complete(first, "A").expect("valid op"))
        .expect("complete");
    assert_eq!(status(&handling, first, "A"), HandlingStatus::Completed);
    assert_eq!(claim_for(&handling, "A", "sh-1"), None);
    assert_eq!(status(&handling, first, "A"), HandlingStatus::Completed);

    assert_eq!(
        history(&handling, first, "A"),
        vec![
            HandlingStatus::Requested,
            HandlingStatus::Running,
            HandlingStatus::CanceledRunning,
            HandlingStatus::Running,
            HandlingStatus::SelfCanceledRunning,
            HandlingStatus::Running,
            HandlingStatus::Completed,
        ]
    );
}

#[test]
fn full_lifecycle_on_memory_stream() {
    run_full_lifecycle(Arc::new(
        MemoryStream::single("shipments").expect("valid stream"),
    ));
}

#[test]
fn full_lifecycle_on_jsonl_stream() {
    let tmp = TempDirGuard::new("lifecycle");
    run_full_lifecycle(Arc::new(JsonlStream::new(
        "shipments",
        tmp.path(),
        LocatorSet::single("main").expect("valid locator"),
    )));
}

#[test]
fn failed_work_is_retried_then_completed() {
    let backend = Arc::new(MemoryStream::single("shipments").expect("valid stream"));
    let records = RecordStream::new(Arc::clone(&backend));
    let handling = HandlingProtocol::new(backend);
    let id = put(&records, &shipment("sh-1", "oslo"));

    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(id));
    handling
        .apply_transition(&RecordTransitionOp::fail(id, "A", "carrier timeout").expect("valid op"))
        .expect("fail");
    assert_eq!(status(&handling, id, "A"), HandlingStatus::Failed);
    assert_eq!(claim_for(&handling, "A", "sh-1"), None);

    handling
        .apply_transition(&RecordTransitionOp::retry_failed(id, "A", "carrier back").expect("valid op"))
        .expect("retry");
    assert_eq!(status(&handling, id, "A"), HandlingStatus::RetryFailed);
    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(id));
    handling
        .apply_transition(&RecordTransitionOp::complete(id, "A").expect("valid op"))
        .expect("complete");

    let composite = handling
        .get_composite_handling_status_by_ids(
            &GetCompositeHandlingStatusByIdsOp::new(
                "A",
                vec![StringSerializedIdentifier::from_id(&"sh-1".to_string()).expect("id")],
            )
            .expect("valid op"),
        )
        .expect("composite");
    assert_eq!(composite, HandlingStatus::Completed);
}

#[test]
fn record_unblock_restores_prior_status() {
    let backend = Arc::new(MemoryStream::single("shipments").expect("valid stream"));
    let records = RecordStream::new(Arc::clone(&backend));
    let handling = HandlingProtocol::new(backend);
    let id = put(&records, &shipment("sh-1", "oslo"));

    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(id));
    handling
        .apply_transition(&RecordTransitionOp::fail(id, "A", "bad address").expect("valid op"))
        .expect("fail");
    handling
        .apply_transition(&RecordTransitionOp::retry_failed(id, "A", "fixed").expect("valid op"))
        .expect("retry");

    handling
        .apply_record_block(&RecordBlockOp::block(id, "legal hold").expect("valid op"))
        .expect("block");
    assert_eq!(status(&handling, id, "A"), HandlingStatus::Blocked);
    assert_eq!(claim_for(&handling, "A", "sh-1"), None);

    handling
        .apply_record_block(&RecordBlockOp::cancel_block(id, "released").expect("valid op"))
        .expect("unblock");
    assert_eq!(status(&handling, id, "A"), HandlingStatus::RetryFailed);
    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(id));
}

#[test]
fn stream_enable_restores_retry_failed_status() {
    let backend = Arc::new(MemoryStream::single("shipments").expect("valid stream"));
    let records = RecordStream::new(Arc::clone(&backend));
    let handling = HandlingProtocol::new(backend);
    let id = put(&records, &shipment("sh-1", "oslo"));

    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(id));
    handling
        .apply_transition(&RecordTransitionOp::fail(id, "A", "carrier timeout").expect("valid op"))
        .expect("fail");
    handling
        .apply_transition(&RecordTransitionOp::retry_failed(id, "A", "carrier back").expect("valid op"))
        .expect("retry");
    assert_eq!(status(&handling, id, "A"), HandlingStatus::RetryFailed);

    handling
        .apply_stream_block(&StreamBlockOp::disable("maintenance").expect("valid op"))
        .expect("disable");
    assert_eq!(status(&handling, id, "A"), HandlingStatus::Blocked);
    let blocked = handling
        .try_handle_record(&TryHandleRecordOp::new("A").expect("valid op"))
        .expect("claim should not error");
    assert!(blocked.is_blocked);
    assert!(blocked.record_to_handle.is_none());

    handling
        .apply_stream_block(&StreamBlockOp::enable("maintenance done").expect("valid op"))
        .expect("enable");
    assert_eq!(status(&handling, id, "A"), HandlingStatus::RetryFailed);
    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(id));
    assert_eq!(
        history(&handling, id, "A"),
        vec![
            HandlingStatus::Requested,
            HandlingStatus::Running,
            HandlingStatus::Failed,
            HandlingStatus::RetryFailed,
            HandlingStatus::Running,
        ]
    );
}

#[test]
fn jsonl_stream_survives_reopen() {
    let tmp = TempDirGuard::new("reopen");
    let locators = LocatorSet::new(["east", "west"]).expect("valid locators");
    let open = || Arc::new(JsonlStream::new("shipments", tmp.path(), locators.clone()));

    let first_records = RecordStream::new(open());
    let oslo = first_records
        .put_object(&shipment("sh-1", "oslo"), TypeSelectionStrategy::UseDeclaredType)
        .expect("put");
    let locator = oslo.resource_locator.clone();
    let id = oslo.internal_record_id.expect("record should be written");
    let handling = HandlingProtocol::new(open());
    assert_eq!(claim_for(&handling, "A", "sh-1"), Some(id));

    let reopened = RecordStream::new(open());
    let latest: Shipment = reopened
        .get_latest_object_by_id::<Shipment>(&"sh-1".to_string())
        .expect("get should succeed")
        .expect("shipment should exist");
    assert_eq!(latest, shipment("sh-1", "oslo"));

    let reopened_handling = HandlingProtocol::new(open());
    let observed = reopened_handling
        .get_handling_status(
            &GetHandlingStatusOp::new("A", id)
                .expect("valid op")
                .with_resource_locator(locator)
                .expect("valid locator"),
        )
        .expect("status");
    assert_eq!(observed.status, HandlingStatus::Running);
}

#[test]
fn internal_id_operations_need_a_locator_on_multi_locator_streams() {
    let backend = Arc::new(MemoryStream::new(
        "shipments",
        LocatorSet::new(["east", "west"]).expect("valid locators"),
    ));
    let err = HandlingProtocol::new(backend)
        .get_handling_status(&GetHandlingStatusOp::new("A", 1).expect("valid op"))
        .expect_err("locator should be required");
    match err {
        StreamError::LocatorRequired { count } => assert_eq!(count, 2),
        other => panic!("expected locator-required error, got {other:?}"),
    }
}

fn claim_concurrently<S: StandardStream + 'static>(backend: Arc<S>, records: usize, workers: usize) {
    let store = RecordStream::new(Arc::clone(&backend));
    for idx in 0..records {
        put(&store, &shipment(&format!("sh-{idx}"), "oslo"));
    }

    let barrier = Arc::new(Barrier::new(workers + 1));
    let mut handles = Vec::new();
    for _ in 0..workers {
        let handling = HandlingProtocol::new(Arc::clone(&backend));
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let mut claimed = Vec::new();
            loop {
                let op = TryHandleRecordOp::new("A").expect("valid op");
                match handling.try_handle_record(&op) {
                    Ok(result) => match result.record_to_handle {
                        Some(record) => claimed.push((
                            result.resource_locator.expect("locator should be reported"),
                            record.internal_record_id,
                        )),
                        None => break,
                    },
                    Err(err) if err.is_retryable() => continue,
                    Err(err) => panic!("claim failed: {err}"),
                }
            }
            claimed
        }));
    }
    barrier.wait();

    let mut all: Vec<(String, InternalRecordId)> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("worker should join"))
        .collect();
    let total = all.len();
    all.sort();
    all.dedup();
    assert_eq!(total, records, "every record is claimed exactly once");
    assert_eq!(all.len(), records);
}

#[test]
fn concurrent_claims_never_double_claim_in_memory() {
    claim_concurrently(
        Arc::new(MemoryStream::new(
            "shipments",
            LocatorSet::new(["east", "west"]).expect("valid locators"),
        )),
        24,
        6,
    );
}

#[test]
fn concurrent_claims_never_double_claim_on_jsonl() {
    let tmp = TempDirGuard::new("contention");
    claim_concurrently(
        Arc::new(JsonlStream::new(
            "shipments",
            tmp.path(),
            LocatorSet::single("main").expect("valid locator"),
        )),
        12,
        4,
    );
}
