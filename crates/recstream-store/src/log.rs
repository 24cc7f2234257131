//! In-memory state of one resource locator.
//!
//! A `StreamLog` is the unit every backend serializes access to:
//! - records and handling entries in append order
//! - monotonic id sequences that survive pruning
//! - history replay for (record, concern) pairs and block flags

use chrono::{DateTime, Utc};
use recstream_kernel::{
    DescribedSerialization, HandlingEntryMetadata, HandlingStatus, InternalHandlingEntryId,
    InternalRecordId, RECORD_HANDLING_DISABLED_CONCERN, STREAM_HANDLING_DISABLED_CONCERN,
    StreamRecord, StreamRecordHandlingEntry, StreamRecordMetadata, current_status,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const STREAM_LINE_SCHEMA: &str = "recstream.line.v1";

fn default_stream_line_schema() -> String {
    STREAM_LINE_SCHEMA.to_string()
}

/// One persisted line of a locator log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamLineBody {
    Sequence {
        next_internal_record_id: InternalRecordId,
        next_internal_handling_entry_id: InternalHandlingEntryId,
    },
    Record {
        record: StreamRecord,
    },
    HandlingEntry {
        entry: StreamRecordHandlingEntry,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamLine {
    #[serde(default = "default_stream_line_schema")]
    pub schema: String,
    #[serde(flatten)]
    pub body: StreamLineBody,
}

impl StreamLine {
    fn new(body: StreamLineBody) -> Self {
        Self {
            schema: STREAM_LINE_SCHEMA.to_string(),
            body,
        }
    }
}

/// Per-record statuses for one concern, built by [`StreamLog::latest_statuses`].
#[derive(Debug, Clone, Default)]
pub struct LatestStatuses {
    stream_blocked: bool,
    concern: HashMap<InternalRecordId, HandlingStatus>,
    record_blocks: HashMap<InternalRecordId, HandlingStatus>,
}

impl LatestStatuses {
    /// Status of the concern's own latest entry, ignoring block flags.
    pub fn concern_status(&self, internal_record_id: InternalRecordId) -> HandlingStatus {
        self.concern
            .get(&internal_record_id)
            .copied()
            .unwrap_or(HandlingStatus::None)
    }

    pub fn is_record_blocked(&self, internal_record_id: InternalRecordId) -> bool {
        self.record_blocks.get(&internal_record_id) == Some(&HandlingStatus::Blocked)
    }

    /// Same answer as [`StreamLog::observed_status`].
    pub fn observed_status(&self, internal_record_id: InternalRecordId) -> HandlingStatus {
        if self.stream_blocked || self.is_record_blocked(internal_record_id) {
            return HandlingStatus::Blocked;
        }
        self.concern_status(internal_record_id)
    }
}

/// Records and handling entries of a single locator.
#[derive(Debug, Clone)]
pub struct StreamLog {
    records: Vec<StreamRecord>,
    entries: Vec<StreamRecordHandlingEntry>,
    next_internal_record_id: InternalRecordId,
    next_internal_handling_entry_id: InternalHandlingEntryId,
}

impl Default for StreamLog {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            entries: Vec::new(),
            next_internal_record_id: 1,
            next_internal_handling_entry_id: 1,
        }
    }
}

/// Counts removed by a prune.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneSummary {
    pub records_removed: usize,
    pub entries_removed: usize,
}

impl PruneSummary {
    pub fn absorb(&mut self, other: PruneSummary) {
        self.records_removed += other.records_removed;
        self.entries_removed += other.entries_removed;
    }
}

impl StreamLog {
    /// Rebuild a log from persisted lines.
    ///
    /// Sequences never move backwards: a `Sequence` line only raises them,
    /// and every record or entry raises them past its own id.
    pub fn from_lines(lines: Vec<StreamLine>) -> Self {
        let mut log = Self::default();
        for line in lines {
            match line.body {
                StreamLineBody::Sequence {
                    next_internal_record_id,
                    next_internal_handling_entry_id,
                } => {
                    log.next_internal_record_id =
                        log.next_internal_record_id.max(next_internal_record_id);
                    log.next_internal_handling_entry_id = log
                        .next_internal_handling_entry_id
                        .max(next_internal_handling_entry_id);
                }
                StreamLineBody::Record { record } => {
                    log.next_internal_record_id =
                        log.next_internal_record_id.max(record.internal_record_id + 1);
                    log.records.push(record);
                }
                StreamLineBody::HandlingEntry { entry } => {
                    log.next_internal_handling_entry_id = log
                        .next_internal_handling_entry_id
                        .max(entry.internal_handling_entry_id + 1);
                    log.entries.push(entry);
                }
            }
        }
        log.records.sort_by_key(|record| record.internal_record_id);
        log.entries
            .sort_by_key(|entry| entry.internal_handling_entry_id);
        log
    }

    pub fn to_lines(&self) -> Vec<StreamLine> {
        let mut lines = Vec::with_capacity(1 + self.records.len() + self.entries.len());
        lines.push(StreamLine::new(StreamLineBody::Sequence {
            next_internal_record_id: self.next_internal_record_id,
            next_internal_handling_entry_id: self.next_internal_handling_entry_id,
        }));
        lines.extend(self.records.iter().cloned().map(|record| {
            StreamLine::new(StreamLineBody::Record { record })
        }));
        lines.extend(self.entries.iter().cloned().map(|entry| {
            StreamLine::new(StreamLineBody::HandlingEntry { entry })
        }));
        lines
    }

    pub fn records(&self) -> &[StreamRecord] {
        &self.records
    }

    pub fn entries(&self) -> &[StreamRecordHandlingEntry] {
        &self.entries
    }

    pub fn record(&self, internal_record_id: InternalRecordId) -> Option<&StreamRecord> {
        self.records
            .binary_search_by_key(&internal_record_id, |record| record.internal_record_id)
            .ok()
            .map(|index| &self.records[index])
    }

    pub fn append_record(
        &mut self,
        metadata: StreamRecordMetadata,
        payload: DescribedSerialization,
    ) -> InternalRecordId {
        let internal_record_id = self.next_internal_record_id;
        self.next_internal_record_id += 1;
        self.records.push(StreamRecord {
            internal_record_id,
            metadata,
            payload,
        });
        internal_record_id
    }

    pub fn append_entry(
        &mut self,
        metadata: HandlingEntryMetadata,
        details: Option<String>,
    ) -> InternalHandlingEntryId {
        let internal_handling_entry_id = self.next_internal_handling_entry_id;
        self.next_internal_handling_entry_id += 1;
        self.entries.push(StreamRecordHandlingEntry {
            internal_handling_entry_id,
            metadata,
            details,
        });
        internal_handling_entry_id
    }

    /// Entries for one (record, concern) pair, oldest first.
    pub fn history<'a>(
        &'a self,
        internal_record_id: Option<InternalRecordId>,
        concern: &'a str,
    ) -> impl Iterator<Item = &'a StreamRecordHandlingEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.is_for(internal_record_id, concern))
    }

    pub fn history_statuses(
        &self,
        internal_record_id: Option<InternalRecordId>,
        concern: &str,
    ) -> Vec<HandlingStatus> {
        self.history(internal_record_id, concern)
            .map(StreamRecordHandlingEntry::status)
            .collect()
    }

    /// Status of the pair's latest entry, ignoring block flags.
    pub fn concern_status(&self, internal_record_id: InternalRecordId, concern: &str) -> HandlingStatus {
        current_status(
            self.history(Some(internal_record_id), concern)
                .map(StreamRecordHandlingEntry::status),
        )
    }

    pub fn stream_status(&self) -> HandlingStatus {
        current_status(self.history_statuses(None, STREAM_HANDLING_DISABLED_CONCERN))
    }

    pub fn record_block_status(&self, internal_record_id: InternalRecordId) -> HandlingStatus {
        current_status(self.history_statuses(Some(internal_record_id), RECORD_HANDLING_DISABLED_CONCERN))
    }

    pub fn is_stream_blocked(&self) -> bool {
        self.stream_status() == HandlingStatus::Blocked
    }

    pub fn is_record_blocked(&self, internal_record_id: InternalRecordId) -> bool {
        self.record_block_status(internal_record_id) == HandlingStatus::Blocked
    }

    /// Status a caller observes: block flags first, then the concern's own.
    pub fn observed_status(&self, internal_record_id: InternalRecordId, concern: &str) -> HandlingStatus {
        if self.is_stream_blocked() || self.is_record_blocked(internal_record_id) {
            return HandlingStatus::Blocked;
        }
        self.concern_status(internal_record_id, concern)
    }

    /// Latest status of every record for one concern, plus the record
    /// block flags, in a single pass over the entries.
    pub fn latest_statuses(&self, concern: &str) -> LatestStatuses {
        let mut index = LatestStatuses {
            stream_blocked: self.is_stream_blocked(),
            ..LatestStatuses::default()
        };
        for entry in &self.entries {
            let Some(id) = entry.metadata.internal_record_id else {
                continue;
            };
            if entry.metadata.concern == concern {
                index.concern.insert(id, entry.status());
            } else if entry.metadata.concern == RECORD_HANDLING_DISABLED_CONCERN {
                index.record_blocks.insert(id, entry.status());
            }
        }
        index
    }

    /// Remove the given records and every entry that references them.
    pub fn remove_records(&mut self, internal_record_ids: &[InternalRecordId]) -> PruneSummary {
        if internal_record_ids.is_empty() {
            return PruneSummary::default();
        }
        let records_before = self.records.len();
        let entries_before = self.entries.len();
        self.records
            .retain(|record| !internal_record_ids.contains(&record.internal_record_id));
        self.entries.retain(|entry| {
            entry
                .metadata
                .internal_record_id
                .is_none_or(|id| !internal_record_ids.contains(&id))
        });
        PruneSummary {
            records_removed: records_before - self.records.len(),
            entries_removed: entries_before - self.entries.len(),
        }
    }

    pub fn prune_before_internal_record_id(&mut self, boundary: InternalRecordId) -> PruneSummary {
        let doomed: Vec<InternalRecordId> = self
            .records
            .iter()
            .map(|record| record.internal_record_id)
            .filter(|id| *id < boundary)
            .collect();
        self.remove_records(&doomed)
    }

    pub fn prune_before_timestamp(&mut self, boundary: DateTime<Utc>) -> PruneSummary {
        let doomed: Vec<InternalRecordId> = self
            .records
            .iter()
            .filter(|record| record.metadata.timestamp_utc < boundary)
            .map(|record| record.internal_record_id)
            .collect();
        self.remove_records(&doomed)
    }
}
