//! # Recstream Kernel
//!
//! Pure logic for an append-only record stream with cooperative record
//! handling. Nothing in this crate performs I/O: backends in
//! `recstream-store` feed it histories and records, and it answers what a
//! record's status is, whether a transition is legal, and which records a
//! filter selects.
//!
//! ## Layers
//!
//! ```text
//! TypeRepresentation / Tag      ← version-aware type and tag matching
//!     │
//! StringSerializedIdentifier    ← ids in string form, with their type
//!     │
//! StreamRecord / HandlingEntry  ← immutable log items
//!     │
//! HandlingStatus                ← replay and composite reduction
//!     │
//! HandlingOp                    ← validated handling commands
//! ```

pub mod concern;
pub mod error;
pub mod identifier;
pub mod operation;
pub mod record;
pub mod status;
mod strategy;
pub mod tags;
pub mod type_repr;

pub use concern::{
    Concern, DEFAULT_MUTEX_CONCERN, RECORD_HANDLING_DISABLED_CONCERN,
    STREAM_HANDLING_DISABLED_CONCERN, is_reserved_concern, throw_if_invalid_concern,
};
pub use error::{CompositeStatusError, OperationError, require_non_blank};
pub use identifier::{
    InternalHandlingEntryId, InternalRecordId, StringSerializedIdentifier,
    deserialize_identifier, serialize_identifier,
};
pub use operation::{
    BlockAction, GetCompositeHandlingStatusByIdsOp, GetCompositeHandlingStatusByTagsOp,
    GetHandlingHistoryOfRecordOp, GetHandlingStatusOp, HandlingOp, PruneBoundary, PruneOp,
    PutRecordOp, RecordBlockOp, RecordTransition, RecordTransitionOp, StreamBlockOp,
    TryHandleRecordOp,
};
pub use record::{
    DescribedSerialization, ExistingRecordStrategy, HandlingEntryMetadata, OrderRecordsBy,
    RecordFilter, RecordHandlingStatus, SerializationFormat, StreamRecord,
    StreamRecordHandlingEntry, StreamRecordMetadata, TypeSelectionStrategy,
};
pub use status::{
    CLAIMABLE_STATUSES, HandlingStatus, HandlingStatusCompositionStrategy, current_status,
    reduce_to_composite_handling_status, status_prior_to_block,
};
pub use tags::{Tag, TagMatchStrategy, fuzzy_match_tags, merge_tags, parse_tags};
pub use type_repr::{
    HasTypeRepresentation, TypeRepresentation, TypeRepresentationWithAndWithoutVersion,
    VersionMatchStrategy, equals_according_to_strategy, matches_any_type,
};
