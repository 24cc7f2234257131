//! Records, handling entries, and record filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::concern::Concern;
use crate::error::OperationError;
use crate::identifier::{InternalHandlingEntryId, InternalRecordId, StringSerializedIdentifier};
use crate::status::HandlingStatus;
use crate::strategy::parse_named;
use crate::tags::{Tag, TagMatchStrategy, fuzzy_match_tags};
use crate::type_repr::{TypeRepresentation, VersionMatchStrategy, matches_any_type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SerializationFormat {
    #[default]
    Json,
}

/// An opaque serialized payload together with its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribedSerialization {
    pub payload_type: TypeRepresentation,
    #[serde(default)]
    pub format: SerializationFormat,
    pub payload: String,
}

impl DescribedSerialization {
    pub fn json(payload_type: TypeRepresentation, payload: impl Into<String>) -> Self {
        Self {
            payload_type,
            format: SerializationFormat::Json,
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecordMetadata {
    pub id: StringSerializedIdentifier,
    pub object_type: TypeRepresentation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    pub timestamp_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_timestamp_utc: Option<DateTime<Utc>>,
}

/// An immutable entry in a locator's record log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub internal_record_id: InternalRecordId,
    pub metadata: StreamRecordMetadata,
    pub payload: DescribedSerialization,
}

impl StreamRecord {
    pub fn serialized_id(&self) -> &str {
        &self.metadata.id.serialized_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlingEntryMetadata {
    /// `None` for stream-level entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_record_id: Option<InternalRecordId>,
    /// Concern name as written; reserved names appear here for block flags.
    pub concern: String,
    pub status: HandlingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StringSerializedIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<TypeRepresentation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    pub timestamp_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_timestamp_utc: Option<DateTime<Utc>>,
}

/// One immutable transition in a handling history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecordHandlingEntry {
    pub internal_handling_entry_id: InternalHandlingEntryId,
    pub metadata: HandlingEntryMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl StreamRecordHandlingEntry {
    pub fn status(&self) -> HandlingStatus {
        self.metadata.status
    }

    pub fn is_for(&self, internal_record_id: Option<InternalRecordId>, concern: &str) -> bool {
        self.metadata.internal_record_id == internal_record_id && self.metadata.concern == concern
    }
}

/// Ordering applied to candidate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderRecordsBy {
    #[default]
    InternalRecordIdAscending,
    InternalRecordIdDescending,
}

impl FromStr for OrderRecordsBy {
    type Err = OperationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_named(
            "orderRecordsBy",
            raw,
            &[
                ("ascending", OrderRecordsBy::InternalRecordIdAscending),
                (
                    "internal-record-id-ascending",
                    OrderRecordsBy::InternalRecordIdAscending,
                ),
                ("descending", OrderRecordsBy::InternalRecordIdDescending),
                (
                    "internal-record-id-descending",
                    OrderRecordsBy::InternalRecordIdDescending,
                ),
            ],
        )
    }
}

impl OrderRecordsBy {
    pub fn sort(&self, records: &mut [&StreamRecord]) {
        match self {
            OrderRecordsBy::InternalRecordIdAscending => {
                records.sort_by_key(|record| record.internal_record_id)
            }
            OrderRecordsBy::InternalRecordIdDescending => {
                records.sort_by_key(|record| std::cmp::Reverse(record.internal_record_id))
            }
        }
    }
}

/// What a put does when matching records already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExistingRecordStrategy {
    #[default]
    None,
    ThrowIfFoundById,
    ThrowIfFoundByIdAndType,
    ThrowIfFoundByIdAndTypeAndContent,
    DoNotWriteIfFoundById,
    DoNotWriteIfFoundByIdAndType,
    DoNotWriteIfFoundByIdAndTypeAndContent,
    PruneIfFoundById,
    PruneIfFoundByIdAndType,
}

impl ExistingRecordStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExistingRecordStrategy::None => "none",
            ExistingRecordStrategy::ThrowIfFoundById => "throw-if-found-by-id",
            ExistingRecordStrategy::ThrowIfFoundByIdAndType => "throw-if-found-by-id-and-type",
            ExistingRecordStrategy::ThrowIfFoundByIdAndTypeAndContent => {
                "throw-if-found-by-id-and-type-and-content"
            }
            ExistingRecordStrategy::DoNotWriteIfFoundById => "do-not-write-if-found-by-id",
            ExistingRecordStrategy::DoNotWriteIfFoundByIdAndType => {
                "do-not-write-if-found-by-id-and-type"
            }
            ExistingRecordStrategy::DoNotWriteIfFoundByIdAndTypeAndContent => {
                "do-not-write-if-found-by-id-and-type-and-content"
            }
            ExistingRecordStrategy::PruneIfFoundById => "prune-if-found-by-id",
            ExistingRecordStrategy::PruneIfFoundByIdAndType => "prune-if-found-by-id-and-type",
        }
    }

    pub fn is_prune(&self) -> bool {
        matches!(
            self,
            ExistingRecordStrategy::PruneIfFoundById
                | ExistingRecordStrategy::PruneIfFoundByIdAndType
        )
    }

    /// Whether existing records are matched on object type as well as id.
    pub fn matches_type(&self) -> bool {
        !matches!(
            self,
            ExistingRecordStrategy::None
                | ExistingRecordStrategy::ThrowIfFoundById
                | ExistingRecordStrategy::DoNotWriteIfFoundById
                | ExistingRecordStrategy::PruneIfFoundById
        )
    }

    /// Whether existing records are matched on payload content too.
    pub fn matches_content(&self) -> bool {
        matches!(
            self,
            ExistingRecordStrategy::ThrowIfFoundByIdAndTypeAndContent
                | ExistingRecordStrategy::DoNotWriteIfFoundByIdAndTypeAndContent
        )
    }

    /// Check a retention count against this strategy.
    pub fn validate_retention_count(&self, retention_count: Option<i64>) -> Result<(), OperationError> {
        match (self.is_prune(), retention_count) {
            (true, None) => Err(OperationError::MissingRetentionCount {
                strategy: self.as_str().to_string(),
            }),
            (false, Some(_)) => Err(OperationError::RetentionCountWithoutPruning {
                strategy: self.as_str().to_string(),
            }),
            (true, Some(count)) if count < 0 => {
                Err(OperationError::NegativeRetentionCount { count })
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for ExistingRecordStrategy {
    type Err = OperationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let table: Vec<(&str, ExistingRecordStrategy)> = [
            ExistingRecordStrategy::None,
            ExistingRecordStrategy::ThrowIfFoundById,
            ExistingRecordStrategy::ThrowIfFoundByIdAndType,
            ExistingRecordStrategy::ThrowIfFoundByIdAndTypeAndContent,
            ExistingRecordStrategy::DoNotWriteIfFoundById,
            ExistingRecordStrategy::DoNotWriteIfFoundByIdAndType,
            ExistingRecordStrategy::DoNotWriteIfFoundByIdAndTypeAndContent,
            ExistingRecordStrategy::PruneIfFoundById,
            ExistingRecordStrategy::PruneIfFoundByIdAndType,
        ]
        .into_iter()
        .map(|strategy| (strategy.as_str(), strategy))
        .collect();
        parse_named("existingRecordStrategy", raw, &table)
    }
}

/// Which type a typed put records for its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeSelectionStrategy {
    /// The type the object declares statically.
    #[default]
    UseDeclaredType,
    /// The type the value reports for itself, which may be more specific.
    UseRuntimeType,
}

impl FromStr for TypeSelectionStrategy {
    type Err = OperationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_named(
            "typeSelectionStrategy",
            raw,
            &[
                ("declared", TypeSelectionStrategy::UseDeclaredType),
                ("use-declared-type", TypeSelectionStrategy::UseDeclaredType),
                ("runtime", TypeSelectionStrategy::UseRuntimeType),
                ("use-runtime-type", TypeSelectionStrategy::UseRuntimeType),
            ],
        )
    }
}

/// Criteria selecting records. Empty criteria place no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_record_ids: Vec<InternalRecordId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<StringSerializedIdentifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier_types: Vec<TypeRepresentation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_types: Vec<TypeRepresentation>,
    #[serde(default)]
    pub version_match_strategy: VersionMatchStrategy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub tag_match_strategy: TagMatchStrategy,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_internal_record_ids(mut self, ids: impl IntoIterator<Item = InternalRecordId>) -> Self {
        self.internal_record_ids = ids.into_iter().collect();
        self
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = StringSerializedIdentifier>) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }

    pub fn with_identifier_types(
        mut self,
        types: impl IntoIterator<Item = TypeRepresentation>,
    ) -> Self {
        self.identifier_types = types.into_iter().collect();
        self
    }

    pub fn with_object_types(mut self, types: impl IntoIterator<Item = TypeRepresentation>) -> Self {
        self.object_types = types.into_iter().collect();
        self
    }

    pub fn with_version_match_strategy(mut self, strategy: VersionMatchStrategy) -> Self {
        self.version_match_strategy = strategy;
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>, strategy: TagMatchStrategy) -> Self {
        self.tags = tags;
        self.tag_match_strategy = strategy;
        self
    }

    pub fn matches(&self, record: &StreamRecord) -> bool {
        let metadata = &record.metadata;
        let strategy = self.version_match_strategy;

        if !self.internal_record_ids.is_empty()
            && !self.internal_record_ids.contains(&record.internal_record_id)
        {
            return false;
        }
        if !self.ids.is_empty() && !self.ids.iter().any(|id| id.matches(&metadata.id, strategy)) {
            return false;
        }
        if !matches_any_type(&metadata.id.identifier_type, &self.identifier_types, strategy) {
            return false;
        }
        if !matches_any_type(&metadata.object_type, &self.object_types, strategy) {
            return false;
        }
        if !self.tags.is_empty()
            && !fuzzy_match_tags(&metadata.tags, &self.tags, self.tag_match_strategy)
        {
            return false;
        }
        true
    }
}

/// A (record, concern) status as observed by a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHandlingStatus {
    pub resource_locator: String,
    pub internal_record_id: InternalRecordId,
    pub concern: Concern,
    pub status: HandlingStatus,
}
