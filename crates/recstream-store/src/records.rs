//! Record puts, gets and prunes.

use chrono::{DateTime, Utc};
use recstream_kernel::{
    DescribedSerialization, ExistingRecordStrategy, HasTypeRepresentation, InternalRecordId,
    OrderRecordsBy, PruneBoundary, PruneOp, PutRecordOp, RecordFilter, StreamRecord,
    StreamRecordMetadata, StringSerializedIdentifier, Tag, TypeRepresentation,
    TypeSelectionStrategy, VersionMatchStrategy, deserialize_identifier,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::StreamError;
use crate::log::{PruneSummary, StreamLog};
use crate::protocol::StandardStream;

/// An object that can be written to and read back from a stream.
pub trait StreamObject: HasTypeRepresentation + Serialize + DeserializeOwned {
    type Id: Serialize + DeserializeOwned + HasTypeRepresentation;

    fn id(&self) -> Self::Id;

    fn tags(&self) -> Vec<Tag> {
        Vec::new()
    }

    fn object_timestamp_utc(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// The type this value reports for itself. Defaults to the declared type.
    fn runtime_type_representation(&self) -> TypeRepresentation {
        Self::type_representation()
    }
}

/// Build the put for a typed object.
pub fn put_op_for<T: StreamObject>(
    object: &T,
    type_selection: TypeSelectionStrategy,
) -> Result<PutRecordOp, StreamError> {
    let object_type = match type_selection {
        TypeSelectionStrategy::UseDeclaredType => T::type_representation(),
        TypeSelectionStrategy::UseRuntimeType => object.runtime_type_representation(),
    };
    let payload = serde_json::to_string(object).map_err(|e| StreamError::Object {
        type_name: object_type.to_string(),
        message: e.to_string(),
    })?;
    let id = StringSerializedIdentifier::from_id(&object.id())?;
    let mut op = PutRecordOp::new(id, DescribedSerialization::json(object_type, payload))?
        .with_tags(object.tags());
    if let Some(timestamp) = object.object_timestamp_utc() {
        op = op.with_object_timestamp(timestamp);
    }
    Ok(op)
}

/// Outcome of a put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutRecordResult {
    pub resource_locator: String,
    /// `None` when an existing record suppressed the write.
    pub internal_record_id: Option<InternalRecordId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub existing_record_ids: Vec<InternalRecordId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pruned_record_ids: Vec<InternalRecordId>,
}

/// A record together with the locator that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedRecord {
    pub resource_locator: String,
    pub record: StreamRecord,
}

/// Record-level operations over a backend.
#[derive(Debug)]
pub struct RecordStream<S> {
    backend: Arc<S>,
}

impl<S> Clone for RecordStream<S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

fn is_existing_match(op: &PutRecordOp, record: &StreamRecord) -> bool {
    let strategy = op.existing_record_strategy();
    if !op
        .id()
        .matches(&record.metadata.id, VersionMatchStrategy::SpecifiedVersion)
    {
        return false;
    }
    if strategy.matches_type() && record.metadata.object_type != op.payload().payload_type {
        return false;
    }
    if strategy.matches_content() && record.payload != *op.payload() {
        return false;
    }
    true
}

fn put_into_log(
    log: &mut StreamLog,
    locator: &str,
    op: &PutRecordOp,
    now: DateTime<Utc>,
) -> Result<(PutRecordResult, bool), StreamError> {
    use ExistingRecordStrategy as E;

    let strategy = op.existing_record_strategy();
    let existing: Vec<InternalRecordId> = match strategy {
        E::None => Vec::new(),
        _ => log
            .records()
            .iter()
            .filter(|record| is_existing_match(op, record))
            .map(|record| record.internal_record_id)
            .collect(),
    };

    let mut result = PutRecordResult {
        resource_locator: locator.to_string(),
        internal_record_id: None,
        existing_record_ids: existing.clone(),
        pruned_record_ids: Vec::new(),
    };

    match strategy {
        E::ThrowIfFoundById | E::ThrowIfFoundByIdAndType | E::ThrowIfFoundByIdAndTypeAndContent
            if !existing.is_empty() =>
        {
            return Err(StreamError::ExistingRecordFound {
                strategy: strategy.as_str(),
                serialized_id: op.id().serialized_id.clone(),
                internal_record_ids: existing,
            });
        }
        E::DoNotWriteIfFoundById
        | E::DoNotWriteIfFoundByIdAndType
        | E::DoNotWriteIfFoundByIdAndTypeAndContent
            if !existing.is_empty() =>
        {
            debug!(
                locator,
                serialized_id = %op.id().serialized_id,
                "existing record found, put skipped"
            );
            return Ok((result, false));
        }
        E::PruneIfFoundById | E::PruneIfFoundByIdAndType => {
            let keep = usize::try_from(op.retention_count().unwrap_or(0)).unwrap_or(0);
            let doomed = &existing[..existing.len().saturating_sub(keep)];
            log.remove_records(doomed);
            result.pruned_record_ids = doomed.to_vec();
        }
        _ => {}
    }

    let internal_record_id = log.append_record(
        StreamRecordMetadata {
            id: op.id().clone(),
            object_type: op.payload().payload_type.clone(),
            tags: op.tags().to_vec(),
            timestamp_utc: now,
            object_timestamp_utc: op.object_timestamp_utc(),
        },
        op.payload().clone(),
    );
    debug!(locator, internal_record_id, "record appended");
    result.internal_record_id = Some(internal_record_id);
    Ok((result, true))
}

impl<S: StandardStream> RecordStream<S> {
    pub fn new(backend: Arc<S>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<S> {
        &self.backend
    }

    /// Append a record, honoring the put's existing-record strategy.
    pub fn put(&self, op: &PutRecordOp) -> Result<PutRecordResult, StreamError> {
        let locators = self.backend.locators();
        let locator = match op.specified_resource_locator() {
            Some(specified) => locators.resolve(Some(specified))?,
            None => locators.route(&op.id().serialized_id),
        };
        let now = Utc::now();
        self.backend
            .mutate(locator, |log| put_into_log(log, locator, op, now))
    }

    pub fn put_object<T: StreamObject>(
        &self,
        object: &T,
        type_selection: TypeSelectionStrategy,
    ) -> Result<PutRecordResult, StreamError> {
        self.put(&put_op_for(object, type_selection)?)
    }

    pub fn get_record_by_internal_record_id(
        &self,
        internal_record_id: InternalRecordId,
        specified_resource_locator: Option<&str>,
    ) -> Result<Option<StreamRecord>, StreamError> {
        let locator = self.backend.locators().resolve(specified_resource_locator)?;
        self.backend
            .read(locator, |log| Ok(log.record(internal_record_id).cloned()))
    }

    /// Matching records; locators are visited in configured order and each
    /// locator's records are sorted by `order`.
    pub fn get_all_records(
        &self,
        filter: &RecordFilter,
        order: OrderRecordsBy,
    ) -> Result<Vec<LocatedRecord>, StreamError> {
        let mut out = Vec::new();
        for locator in self.backend.locators().names() {
            let found = self.backend.read(locator, |log| {
                let mut matching: Vec<&StreamRecord> =
                    log.records().iter().filter(|r| filter.matches(r)).collect();
                order.sort(&mut matching);
                Ok(matching.into_iter().cloned().collect::<Vec<_>>())
            })?;
            out.extend(found.into_iter().map(|record| LocatedRecord {
                resource_locator: locator.clone(),
                record,
            }));
        }
        Ok(out)
    }

    /// Most recently written matching record across all locators.
    pub fn get_latest_record(&self, filter: &RecordFilter) -> Result<Option<LocatedRecord>, StreamError> {
        let mut latest: Option<LocatedRecord> = None;
        for locator in self.backend.locators().names() {
            let candidate = self.backend.read(locator, |log| {
                Ok(log
                    .records()
                    .iter()
                    .filter(|r| filter.matches(r))
                    .max_by_key(|r| r.internal_record_id)
                    .cloned())
            })?;
            if let Some(record) = candidate {
                let newer = latest.as_ref().is_none_or(|current| {
                    (record.metadata.timestamp_utc, record.internal_record_id)
                        > (
                            current.record.metadata.timestamp_utc,
                            current.record.internal_record_id,
                        )
                });
                if newer {
                    latest = Some(LocatedRecord {
                        resource_locator: locator.clone(),
                        record,
                    });
                }
            }
        }
        Ok(latest)
    }

    pub fn does_any_exist(&self, filter: &RecordFilter) -> Result<bool, StreamError> {
        for locator in self.backend.locators().names() {
            if self
                .backend
                .read(locator, |log| Ok(log.records().iter().any(|r| filter.matches(r))))?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn get_distinct_string_serialized_ids(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<StringSerializedIdentifier>, StreamError> {
        let mut ids = BTreeSet::new();
        for locator in self.backend.locators().names() {
            self.backend.read(locator, |log| {
                ids.extend(
                    log.records()
                        .iter()
                        .filter(|r| filter.matches(r))
                        .map(|r| r.metadata.id.clone()),
                );
                Ok(())
            })?;
        }
        Ok(ids.into_iter().collect())
    }

    /// Latest object of type `T` with this id, regardless of type versions.
    pub fn get_latest_object_by_id<T: StreamObject>(&self, id: &T::Id) -> Result<Option<T>, StreamError> {
        let filter = RecordFilter::new()
            .with_ids([StringSerializedIdentifier::from_id(id)?])
            .with_object_types([T::type_representation()])
            .with_version_match_strategy(VersionMatchStrategy::Any);
        let Some(found) = self.get_latest_record(&filter)? else {
            return Ok(None);
        };
        deserialize_object::<T>(&found.record).map(Some)
    }

    pub fn get_latest_object_id<K>(&self, filter: &RecordFilter) -> Result<Option<K>, StreamError>
    where
        K: DeserializeOwned,
    {
        match self.get_latest_record(filter)? {
            Some(found) => Ok(Some(deserialize_identifier(found.record.serialized_id())?)),
            None => Ok(None),
        }
    }

    /// Remove records older than the boundary together with their entries.
    pub fn prune(&self, op: &PruneOp) -> Result<PruneSummary, StreamError> {
        let mut total = PruneSummary::default();
        for locator in self
            .backend
            .locators()
            .scope(op.specified_resource_locator())?
        {
            let summary = self.backend.mutate(locator, |log| {
                let summary = match op.boundary() {
                    PruneBoundary::BeforeInternalRecordId(id) => {
                        log.prune_before_internal_record_id(id)
                    }
                    PruneBoundary::BeforeTimestamp(timestamp) => log.prune_before_timestamp(timestamp),
                };
                let changed = summary.records_removed > 0 || summary.entries_removed > 0;
                Ok((summary, changed))
            })?;
            info!(
                locator,
                records = summary.records_removed,
                entries = summary.entries_removed,
                details = op.details(),
                "pruned stream"
            );
            total.absorb(summary);
        }
        Ok(total)
    }
}

pub fn deserialize_object<T: StreamObject>(record: &StreamRecord) -> Result<T, StreamError> {
    serde_json::from_str(&record.payload.payload).map_err(|e| StreamError::Object {
        type_name: record.payload.payload_type.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::LocatorSet;
    use crate::memory::MemoryStream;
    use recstream_kernel::TagMatchStrategy;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        number: String,
        amount: i64,
        #[serde(default)]
        revised: bool,
    }

    impl HasTypeRepresentation for Invoice {
        fn type_representation() -> TypeRepresentation {
            TypeRepresentation::new("Invoice", "1")
        }
    }

    impl StreamObject for Invoice {
        type Id = String;

        fn id(&self) -> String {
            self.number.clone()
        }

        fn tags(&self) -> Vec<Tag> {
            vec![Tag::new("kind", "invoice")]
        }

        fn runtime_type_representation(&self) -> TypeRepresentation {
            if self.revised {
                TypeRepresentation::new("RevisedInvoice", "1")
            } else {
                Self::type_representation()
            }
        }
    }

    fn invoice(number: &str, amount: i64) -> Invoice {
        Invoice {
            number: number.to_string(),
            amount,
            revised: false,
        }
    }

    fn stream() -> RecordStream<MemoryStream> {
        RecordStream::new(Arc::new(MemoryStream::single("records").expect("valid stream")))
    }

    #[test]
    fn typed_put_and_get_latest() {
        let records = stream();
        records
            .put_object(&invoice("inv-1", 10), TypeSelectionStrategy::UseDeclaredType)
            .expect("first put");
        records
            .put_object(&invoice("inv-1", 25), TypeSelectionStrategy::UseDeclaredType)
            .expect("second put");

        let latest: Invoice = records
            .get_latest_object_by_id::<Invoice>(&"inv-1".to_string())
            .expect("get should succeed")
            .expect("object should exist");
        assert_eq!(latest.amount, 25);
        assert!(
            records
                .get_latest_object_by_id::<Invoice>(&"inv-2".to_string())
                .expect("get should succeed")
                .is_none()
        );
    }

    #[test]
    fn runtime_type_selection_records_reported_type() {
        let records = stream();
        let mut revised = invoice("inv-9", 1);
        revised.revised = true;
        records
            .put_object(&revised, TypeSelectionStrategy::UseRuntimeType)
            .expect("put");
        let all = records
            .get_all_records(&RecordFilter::new(), OrderRecordsBy::default())
            .expect("get all");
        assert_eq!(all[0].record.metadata.object_type.name, "RevisedInvoice");
    }

    #[test]
    fn throw_if_found_rejects_duplicates() {
        let records = stream();
        let op = put_op_for(&invoice("inv-1", 1), TypeSelectionStrategy::UseDeclaredType)
            .expect("op")
            .with_existing_record_strategy(ExistingRecordStrategy::ThrowIfFoundById, None)
            .expect("strategy");
        records.put(&op).expect("first put");
        assert!(matches!(
            records.put(&op),
            Err(StreamError::ExistingRecordFound { .. })
        ));
    }

    #[test]
    fn do_not_write_compares_content_when_asked() {
        let records = stream();
        let strategy = ExistingRecordStrategy::DoNotWriteIfFoundByIdAndTypeAndContent;
        let first = put_op_for(&invoice("inv-1", 1), TypeSelectionStrategy::UseDeclaredType)
            .expect("op")
            .with_existing_record_strategy(strategy, None)
            .expect("strategy");
        let changed = put_op_for(&invoice("inv-1", 2), TypeSelectionStrategy::UseDeclaredType)
            .expect("op")
            .with_existing_record_strategy(strategy, None)
            .expect("strategy");

        assert!(records.put(&first).expect("put").internal_record_id.is_some());
        let skipped = records.put(&first).expect("put");
        assert_eq!(skipped.internal_record_id, None);
        assert_eq!(skipped.existing_record_ids, vec![1]);
        assert_eq!(records.put(&changed).expect("put").internal_record_id, Some(2));
    }

    #[test]
    fn prune_if_found_keeps_retention_count() {
        let records = stream();
        for amount in 0..4 {
            records
                .put_object(&invoice("inv-1", amount), TypeSelectionStrategy::UseDeclaredType)
                .expect("put");
        }
        let op = put_op_for(&invoice("inv-1", 99), TypeSelectionStrategy::UseDeclaredType)
            .expect("op")
            .with_existing_record_strategy(ExistingRecordStrategy::PruneIfFoundById, Some(1))
            .expect("strategy");
        let result = records.put(&op).expect("put");
        assert_eq!(result.pruned_record_ids, vec![1, 2, 3]);
        assert_eq!(result.internal_record_id, Some(5));

        let remaining: Vec<InternalRecordId> = records
            .get_all_records(&RecordFilter::new(), OrderRecordsBy::default())
            .expect("get all")
            .into_iter()
            .map(|found| found.record.internal_record_id)
            .collect();
        assert_eq!(remaining, vec![4, 5]);
    }

    #[test]
    fn queries_honor_tags_and_ids() {
        let records = stream();
        records
            .put_object(&invoice("inv-1", 1), TypeSelectionStrategy::UseDeclaredType)
            .expect("put");
        records
            .put_object(&invoice("inv-2", 2), TypeSelectionStrategy::UseDeclaredType)
            .expect("put");

        let tagged = RecordFilter::new().with_tags(
            vec![Tag::new("kind", "invoice")],
            TagMatchStrategy::RecordContainsAllQueryTags,
        );
        assert!(records.does_any_exist(&tagged).expect("exists"));
        let ids = records
            .get_distinct_string_serialized_ids(&tagged)
            .expect("distinct ids");
        assert_eq!(ids.len(), 2);

        let latest: Option<String> = records
            .get_latest_object_id(&RecordFilter::new())
            .expect("latest id");
        assert_eq!(latest.as_deref(), Some("inv-2"));

        let untagged = RecordFilter::new()
            .with_tags(vec![Tag::new("kind", "receipt")], TagMatchStrategy::RecordContainsAnyQueryTag);
        assert!(!records.does_any_exist(&untagged).expect("exists"));
    }

    #[test]
    fn prune_before_internal_record_id_spans_locators() {
        let backend = Arc::new(MemoryStream::new(
            "records",
            LocatorSet::new(["a", "b"]).expect("locators"),
        ));
        let records = RecordStream::new(backend);
        for n in 0..6 {
            records
                .put_object(&invoice(&format!("inv-{n}"), n), TypeSelectionStrategy::UseDeclaredType)
                .expect("put");
        }
        let summary = records
            .prune(&PruneOp::before_internal_record_id(2, "trim").expect("op"))
            .expect("prune");
        let remaining = records
            .get_all_records(&RecordFilter::new(), OrderRecordsBy::default())
            .expect("get all");
        assert_eq!(summary.records_removed + remaining.len(), 6);
        assert!(remaining.iter().all(|found| found.record.internal_record_id >= 2));
    }
}
