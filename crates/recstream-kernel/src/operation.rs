//! Handling and record operations.
//!
//! Every operation is an immutable command whose constructor validates its
//! arguments before any storage is touched:
//! - concerns must be non-blank and not reserved
//! - details must be non-blank where the operation has to explain itself
//! - internal record ids are positive
//! - query tag lists are non-empty
//!
//! [`HandlingOp`] is the sum of all handling commands; the store executes
//! it as one unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::concern::Concern;
use crate::error::{OperationError, require_non_blank};
use crate::identifier::{InternalRecordId, StringSerializedIdentifier};
use crate::record::{
    DescribedSerialization, ExistingRecordStrategy, OrderRecordsBy, RecordFilter,
};
use crate::status::{CLAIMABLE_STATUSES, HandlingStatus, HandlingStatusCompositionStrategy};
use crate::tags::{Tag, TagMatchStrategy};
use crate::type_repr::VersionMatchStrategy;

fn require_positive_record_id(value: InternalRecordId) -> Result<(), OperationError> {
    if value <= 0 {
        return Err(OperationError::NonPositive {
            parameter: "internalRecordId",
            value,
        });
    }
    Ok(())
}

fn normalize_details(details: Option<String>) -> Result<Option<String>, OperationError> {
    match details {
        Some(details) => {
            require_non_blank("details", &details)?;
            Ok(Some(details))
        }
        None => Ok(None),
    }
}

fn required_details(details: impl Into<String>) -> Result<String, OperationError> {
    let details = details.into();
    require_non_blank("details", &details)?;
    Ok(details)
}

fn normalize_locator(locator: Option<String>) -> Result<Option<String>, OperationError> {
    match locator {
        Some(locator) => {
            require_non_blank("specifiedResourceLocator", &locator)?;
            Ok(Some(locator))
        }
        None => Ok(None),
    }
}

/// Claim the first eligible record for a concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TryHandleRecordOpSerde")]
pub struct TryHandleRecordOp {
    concern: Concern,
    filter: RecordFilter,
    order: OrderRecordsBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum_internal_record_id: Option<InternalRecordId>,
    inherit_record_tags: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    specified_resource_locator: Option<String>,
}

#[derive(Deserialize)]
struct TryHandleRecordOpSerde {
    concern: String,
    #[serde(default)]
    filter: RecordFilter,
    #[serde(default)]
    order: OrderRecordsBy,
    #[serde(default)]
    minimum_internal_record_id: Option<InternalRecordId>,
    #[serde(default)]
    inherit_record_tags: bool,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    specified_resource_locator: Option<String>,
}

impl TryFrom<TryHandleRecordOpSerde> for TryHandleRecordOp {
    type Error = OperationError;

    fn try_from(value: TryHandleRecordOpSerde) -> Result<Self, Self::Error> {
        let mut op = Self::new(value.concern)?
            .with_filter(value.filter)
            .with_order(value.order)
            .inheriting_record_tags(value.inherit_record_tags)
            .with_tags(value.tags);
        if let Some(minimum) = value.minimum_internal_record_id {
            op = op.with_minimum_internal_record_id(minimum)?;
        }
        if let Some(details) = value.details {
            op = op.with_details(details)?;
        }
        if let Some(locator) = value.specified_resource_locator {
            op = op.with_resource_locator(locator)?;
        }
        Ok(op)
    }
}

impl TryHandleRecordOp {
    pub fn new(concern: impl Into<String>) -> Result<Self, OperationError> {
        Ok(Self {
            concern: Concern::new(concern)?,
            filter: RecordFilter::default(),
            order: OrderRecordsBy::default(),
            minimum_internal_record_id: None,
            inherit_record_tags: false,
            tags: Vec::new(),
            details: None,
            specified_resource_locator: None,
        })
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_order(mut self, order: OrderRecordsBy) -> Self {
        self.order = order;
        self
    }

    pub fn with_minimum_internal_record_id(
        mut self,
        minimum: InternalRecordId,
    ) -> Result<Self, OperationError> {
        if minimum <= 0 {
            return Err(OperationError::NonPositive {
                parameter: "minimumInternalRecordId",
                value: minimum,
            });
        }
        self.minimum_internal_record_id = Some(minimum);
        Ok(self)
    }

    pub fn inheriting_record_tags(mut self, inherit: bool) -> Self {
        self.inherit_record_tags = inherit;
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Result<Self, OperationError> {
        self.details = normalize_details(Some(details.into()))?;
        Ok(self)
    }

    pub fn with_resource_locator(mut self, locator: impl Into<String>) -> Result<Self, OperationError> {
        self.specified_resource_locator = normalize_locator(Some(locator.into()))?;
        Ok(self)
    }

    pub fn concern(&self) -> &Concern {
        &self.concern
    }

    pub fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    pub fn order(&self) -> OrderRecordsBy {
        self.order
    }

    pub fn minimum_internal_record_id(&self) -> Option<InternalRecordId> {
        self.minimum_internal_record_id
    }

    pub fn inherit_record_tags(&self) -> bool {
        self.inherit_record_tags
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn specified_resource_locator(&self) -> Option<&str> {
        self.specified_resource_locator.as_deref()
    }
}

/// A transition applied to one (record, concern) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordTransition {
    CompleteRunning,
    FailRunning,
    CancelRunning,
    SelfCancelRunning,
    RetryFailed,
    CancelRequest,
}

impl RecordTransition {
    pub fn operation_name(&self) -> &'static str {
        match self {
            RecordTransition::CompleteRunning => "CompleteRunningHandleRecordExecution",
            RecordTransition::FailRunning => "FailRunningHandleRecordExecution",
            RecordTransition::CancelRunning => "CancelRunningHandleRecordExecution",
            RecordTransition::SelfCancelRunning => "SelfCancelRunningHandleRecordExecution",
            RecordTransition::RetryFailed => "RetryFailedHandleRecordExecution",
            RecordTransition::CancelRequest => "CancelHandleRecordExecutionRequest",
        }
    }

    /// Statuses of the concern's own history this transition may start from.
    pub fn allowed_from(&self) -> &'static [HandlingStatus] {
        match self {
            RecordTransition::CompleteRunning
            | RecordTransition::FailRunning
            | RecordTransition::CancelRunning
            | RecordTransition::SelfCancelRunning => &[HandlingStatus::Running],
            RecordTransition::RetryFailed => &[HandlingStatus::Failed],
            RecordTransition::CancelRequest => CLAIMABLE_STATUSES,
        }
    }

    pub fn target(&self) -> HandlingStatus {
        match self {
            RecordTransition::CompleteRunning => HandlingStatus::Completed,
            RecordTransition::FailRunning => HandlingStatus::Failed,
            RecordTransition::CancelRunning => HandlingStatus::CanceledRunning,
            RecordTransition::SelfCancelRunning => HandlingStatus::SelfCanceledRunning,
            RecordTransition::RetryFailed => HandlingStatus::RetryFailed,
            RecordTransition::CancelRequest => HandlingStatus::Canceled,
        }
    }

    pub fn requires_details(&self) -> bool {
        !matches!(self, RecordTransition::CompleteRunning)
    }
}

/// Move one (record, concern) pair along the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordTransitionOpSerde")]
pub struct RecordTransitionOp {
    transition: RecordTransition,
    internal_record_id: InternalRecordId,
    concern: Concern,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
    inherit_record_tags: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    specified_resource_locator: Option<String>,
}

#[derive(Deserialize)]
struct RecordTransitionOpSerde {
    transition: RecordTransition,
    internal_record_id: InternalRecordId,
    concern: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    inherit_record_tags: bool,
    #[serde(default)]
    specified_resource_locator: Option<String>,
}

impl TryFrom<RecordTransitionOpSerde> for RecordTransitionOp {
    type Error = OperationError;

    fn try_from(value: RecordTransitionOpSerde) -> Result<Self, Self::Error> {
        let op = Self::new(
            value.transition,
            value.internal_record_id,
            value.concern,
            value.details,
        )?
        .with_tags(value.tags)
        .inheriting_record_tags(value.inherit_record_tags);
        match value.specified_resource_locator {
            Some(locator) => op.with_resource_locator(locator),
            None => Ok(op),
        }
    }
}

impl RecordTransitionOp {
    pub fn new(
        transition: RecordTransition,
        internal_record_id: InternalRecordId,
        concern: impl Into<String>,
        details: Option<String>,
    ) -> Result<Self, OperationError> {
        let concern = Concern::new(concern)?;
        require_positive_record_id(internal_record_id)?;
        let details = match (transition.requires_details(), details) {
            (true, None) => return Err(OperationError::Blank { parameter: "details" }),
            (_, details) => normalize_details(details)?,
        };
        Ok(Self {
            transition,
            internal_record_id,
            concern,
            details,
            tags: Vec::new(),
            inherit_record_tags: false,
            specified_resource_locator: None,
        })
    }

    pub fn complete(
        internal_record_id: InternalRecordId,
        concern: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Self::new(
            RecordTransition::CompleteRunning,
            internal_record_id,
            concern,
            None,
        )
    }

    pub fn fail(
        internal_record_id: InternalRecordId,
        concern: impl Into<String>,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Self::new(
            RecordTransition::FailRunning,
            internal_record_id,
            concern,
            Some(details.into()),
        )
    }

    pub fn cancel_running(
        internal_record_id: InternalRecordId,
        concern: impl Into<String>,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Self::new(
            RecordTransition::CancelRunning,
            internal_record_id,
            concern,
            Some(details.into()),
        )
    }

    pub fn self_cancel_running(
        internal_record_id: InternalRecordId,
        concern: impl Into<String>,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Self::new(
            RecordTransition::SelfCancelRunning,
            internal_record_id,
            concern,
            Some(details.into()),
        )
    }

    pub fn retry_failed(
        internal_record_id: InternalRecordId,
        concern: impl Into<String>,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Self::new(
            RecordTransition::RetryFailed,
            internal_record_id,
            concern,
            Some(details.into()),
        )
    }

    pub fn cancel_request(
        internal_record_id: InternalRecordId,
        concern: impl Into<String>,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Self::new(
            RecordTransition::CancelRequest,
            internal_record_id,
            concern,
            Some(details.into()),
        )
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn inheriting_record_tags(mut self, inherit: bool) -> Self {
        self.inherit_record_tags = inherit;
        self
    }

    pub fn with_resource_locator(mut self, locator: impl Into<String>) -> Result<Self, OperationError> {
        self.specified_resource_locator = normalize_locator(Some(locator.into()))?;
        Ok(self)
    }

    pub fn transition(&self) -> RecordTransition {
        self.transition
    }

    pub fn internal_record_id(&self) -> InternalRecordId {
        self.internal_record_id
    }

    pub fn concern(&self) -> &Concern {
        &self.concern
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn inherit_record_tags(&self) -> bool {
        self.inherit_record_tags
    }

    pub fn specified_resource_locator(&self) -> Option<&str> {
        self.specified_resource_locator.as_deref()
    }
}

/// Whether a block flag is being raised or lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockAction {
    Block,
    Unblock,
}

/// Block or unblock handling of one record for every concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordBlockOpSerde")]
pub struct RecordBlockOp {
    action: BlockAction,
    internal_record_id: InternalRecordId,
    details: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    specified_resource_locator: Option<String>,
}

#[derive(Deserialize)]
struct RecordBlockOpSerde {
    action: BlockAction,
    internal_record_id: InternalRecordId,
    details: String,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    specified_resource_locator: Option<String>,
}

impl TryFrom<RecordBlockOpSerde> for RecordBlockOp {
    type Error = OperationError;

    fn try_from(value: RecordBlockOpSerde) -> Result<Self, Self::Error> {
        let op = Self::new(value.action, value.internal_record_id, value.details)?
            .with_tags(value.tags);
        match value.specified_resource_locator {
            Some(locator) => op.with_resource_locator(locator),
            None => Ok(op),
        }
    }
}

impl RecordBlockOp {
    /// Disable handling of a record.
    pub fn block(
        internal_record_id: InternalRecordId,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Self::new(BlockAction::Block, internal_record_id, details)
    }

    /// Re-enable handling of a blocked record.
    pub fn cancel_block(
        internal_record_id: InternalRecordId,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Self::new(BlockAction::Unblock, internal_record_id, details)
    }

    fn new(
        action: BlockAction,
        internal_record_id: InternalRecordId,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        require_positive_record_id(internal_record_id)?;
        Ok(Self {
            action,
            internal_record_id,
            details: required_details(details)?,
            tags: Vec::new(),
            specified_resource_locator: None,
        })
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_resource_locator(mut self, locator: impl Into<String>) -> Result<Self, OperationError> {
        self.specified_resource_locator = normalize_locator(Some(locator.into()))?;
        Ok(self)
    }

    pub fn action(&self) -> BlockAction {
        self.action
    }

    pub fn internal_record_id(&self) -> InternalRecordId {
        self.internal_record_id
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn specified_resource_locator(&self) -> Option<&str> {
        self.specified_resource_locator.as_deref()
    }
}

/// Disable or enable handling for the whole stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StreamBlockOpSerde")]
pub struct StreamBlockOp {
    action: BlockAction,
    details: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
}

#[derive(Deserialize)]
struct StreamBlockOpSerde {
    action: BlockAction,
    details: String,
    #[serde(default)]
    tags: Vec<Tag>,
}

impl TryFrom<StreamBlockOpSerde> for StreamBlockOp {
    type Error = OperationError;

    fn try_from(value: StreamBlockOpSerde) -> Result<Self, Self::Error> {
        let op = match value.action {
            BlockAction::Block => Self::disable(value.details)?,
            BlockAction::Unblock => Self::enable(value.details)?,
        };
        Ok(op.with_tags(value.tags))
    }
}

impl StreamBlockOp {
    pub fn disable(details: impl Into<String>) -> Result<Self, OperationError> {
        Ok(Self {
            action: BlockAction::Block,
            details: required_details(details)?,
            tags: Vec::new(),
        })
    }

    pub fn enable(details: impl Into<String>) -> Result<Self, OperationError> {
        Ok(Self {
            action: BlockAction::Unblock,
            details: required_details(details)?,
            tags: Vec::new(),
        })
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn action(&self) -> BlockAction {
        self.action
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }
}

/// Observed status of one (record, concern) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GetHandlingStatusOpSerde")]
pub struct GetHandlingStatusOp {
    concern: Concern,
    internal_record_id: InternalRecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    specified_resource_locator: Option<String>,
}

#[derive(Deserialize)]
struct GetHandlingStatusOpSerde {
    concern: String,
    internal_record_id: InternalRecordId,
    #[serde(default)]
    specified_resource_locator: Option<String>,
}

impl TryFrom<GetHandlingStatusOpSerde> for GetHandlingStatusOp {
    type Error = OperationError;

    fn try_from(value: GetHandlingStatusOpSerde) -> Result<Self, Self::Error> {
        let op = Self::new(value.concern, value.internal_record_id)?;
        match value.specified_resource_locator {
            Some(locator) => op.with_resource_locator(locator),
            None => Ok(op),
        }
    }
}

impl GetHandlingStatusOp {
    pub fn new(
        concern: impl Into<String>,
        internal_record_id: InternalRecordId,
    ) -> Result<Self, OperationError> {
        let concern = Concern::new(concern)?;
        require_positive_record_id(internal_record_id)?;
        Ok(Self {
            concern,
            internal_record_id,
            specified_resource_locator: None,
        })
    }

    pub fn with_resource_locator(mut self, locator: impl Into<String>) -> Result<Self, OperationError> {
        self.specified_resource_locator = normalize_locator(Some(locator.into()))?;
        Ok(self)
    }

    pub fn concern(&self) -> &Concern {
        &self.concern
    }

    pub fn internal_record_id(&self) -> InternalRecordId {
        self.internal_record_id
    }

    pub fn specified_resource_locator(&self) -> Option<&str> {
        self.specified_resource_locator.as_deref()
    }
}

/// Composite status over every record carrying one of the given ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GetCompositeHandlingStatusByIdsOpSerde")]
pub struct GetCompositeHandlingStatusByIdsOp {
    concern: Concern,
    ids: Vec<StringSerializedIdentifier>,
    version_match_strategy: VersionMatchStrategy,
    composition: HandlingStatusCompositionStrategy,
}

#[derive(Deserialize)]
struct GetCompositeHandlingStatusByIdsOpSerde {
    concern: String,
    ids: Vec<StringSerializedIdentifier>,
    #[serde(default)]
    version_match_strategy: VersionMatchStrategy,
    #[serde(default)]
    composition: HandlingStatusCompositionStrategy,
}

impl TryFrom<GetCompositeHandlingStatusByIdsOpSerde> for GetCompositeHandlingStatusByIdsOp {
    type Error = OperationError;

    fn try_from(value: GetCompositeHandlingStatusByIdsOpSerde) -> Result<Self, Self::Error> {
        Ok(Self::new(value.concern, value.ids)?
            .with_version_match_strategy(value.version_match_strategy)
            .with_composition(value.composition))
    }
}

impl GetCompositeHandlingStatusByIdsOp {
    pub fn new(
        concern: impl Into<String>,
        ids: Vec<StringSerializedIdentifier>,
    ) -> Result<Self, OperationError> {
        let concern = Concern::new(concern)?;
        if ids.is_empty() {
            return Err(OperationError::Empty { parameter: "ids" });
        }
        Ok(Self {
            concern,
            ids,
            version_match_strategy: VersionMatchStrategy::default(),
            composition: HandlingStatusCompositionStrategy::default(),
        })
    }

    pub fn with_version_match_strategy(mut self, strategy: VersionMatchStrategy) -> Self {
        self.version_match_strategy = strategy;
        self
    }

    pub fn with_composition(mut self, composition: HandlingStatusCompositionStrategy) -> Self {
        self.composition = composition;
        self
    }

    pub fn concern(&self) -> &Concern {
        &self.concern
    }

    pub fn ids(&self) -> &[StringSerializedIdentifier] {
        &self.ids
    }

    pub fn composition(&self) -> HandlingStatusCompositionStrategy {
        self.composition
    }

    pub fn filter(&self) -> RecordFilter {
        RecordFilter::new()
            .with_ids(self.ids.iter().cloned())
            .with_version_match_strategy(self.version_match_strategy)
    }
}

/// Composite status over every record matching the given tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GetCompositeHandlingStatusByTagsOpSerde")]
pub struct GetCompositeHandlingStatusByTagsOp {
    concern: Concern,
    tags_to_match: Vec<Tag>,
    tag_match_strategy: TagMatchStrategy,
    composition: HandlingStatusCompositionStrategy,
}

#[derive(Deserialize)]
struct GetCompositeHandlingStatusByTagsOpSerde {
    concern: String,
    tags_to_match: Vec<Tag>,
    #[serde(default)]
    tag_match_strategy: TagMatchStrategy,
    #[serde(default)]
    composition: HandlingStatusCompositionStrategy,
}

impl TryFrom<GetCompositeHandlingStatusByTagsOpSerde> for GetCompositeHandlingStatusByTagsOp {
    type Error = OperationError;

    fn try_from(value: GetCompositeHandlingStatusByTagsOpSerde) -> Result<Self, Self::Error> {
        Ok(
            Self::new(value.concern, value.tags_to_match, value.tag_match_strategy)?
                .with_composition(value.composition),
        )
    }
}

impl GetCompositeHandlingStatusByTagsOp {
    pub fn new(
        concern: impl Into<String>,
        tags_to_match: Vec<Tag>,
        tag_match_strategy: TagMatchStrategy,
    ) -> Result<Self, OperationError> {
        let concern = Concern::new(concern)?;
        if tags_to_match.is_empty() {
            return Err(OperationError::Empty {
                parameter: "tagsToMatch",
            });
        }
        Ok(Self {
            concern,
            tags_to_match,
            tag_match_strategy,
            composition: HandlingStatusCompositionStrategy::default(),
        })
    }

    pub fn with_composition(mut self, composition: HandlingStatusCompositionStrategy) -> Self {
        self.composition = composition;
        self
    }

    pub fn concern(&self) -> &Concern {
        &self.concern
    }

    pub fn tags_to_match(&self) -> &[Tag] {
        &self.tags_to_match
    }

    pub fn composition(&self) -> HandlingStatusCompositionStrategy {
        self.composition
    }

    pub fn filter(&self) -> RecordFilter {
        RecordFilter::new().with_tags(self.tags_to_match.clone(), self.tag_match_strategy)
    }
}

/// Ordered handling history of one (record, concern) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GetHandlingHistoryOfRecordOpSerde")]
pub struct GetHandlingHistoryOfRecordOp {
    internal_record_id: InternalRecordId,
    concern: Concern,
    #[serde(skip_serializing_if = "Option::is_none")]
    specified_resource_locator: Option<String>,
}

#[derive(Deserialize)]
struct GetHandlingHistoryOfRecordOpSerde {
    internal_record_id: InternalRecordId,
    concern: String,
    #[serde(default)]
    specified_resource_locator: Option<String>,
}

impl TryFrom<GetHandlingHistoryOfRecordOpSerde> for GetHandlingHistoryOfRecordOp {
    type Error = OperationError;

    fn try_from(value: GetHandlingHistoryOfRecordOpSerde) -> Result<Self, Self::Error> {
        let op = Self::new(value.internal_record_id, value.concern)?;
        match value.specified_resource_locator {
            Some(locator) => op.with_resource_locator(locator),
            None => Ok(op),
        }
    }
}

impl GetHandlingHistoryOfRecordOp {
    pub fn new(
        internal_record_id: InternalRecordId,
        concern: impl Into<String>,
    ) -> Result<Self, OperationError> {
        let concern = Concern::new(concern)?;
        require_positive_record_id(internal_record_id)?;
        Ok(Self {
            internal_record_id,
            concern,
            specified_resource_locator: None,
        })
    }

    pub fn with_resource_locator(mut self, locator: impl Into<String>) -> Result<Self, OperationError> {
        self.specified_resource_locator = normalize_locator(Some(locator.into()))?;
        Ok(self)
    }

    pub fn internal_record_id(&self) -> InternalRecordId {
        self.internal_record_id
    }

    pub fn concern(&self) -> &Concern {
        &self.concern
    }

    pub fn specified_resource_locator(&self) -> Option<&str> {
        self.specified_resource_locator.as_deref()
    }
}

/// Every handling command, as one closed set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HandlingOp {
    TryHandleRecord(TryHandleRecordOp),
    Transition(RecordTransitionOp),
    RecordBlock(RecordBlockOp),
    StreamBlock(StreamBlockOp),
    GetHandlingStatus(GetHandlingStatusOp),
    GetCompositeHandlingStatusByIds(GetCompositeHandlingStatusByIdsOp),
    GetCompositeHandlingStatusByTags(GetCompositeHandlingStatusByTagsOp),
    GetHandlingHistoryOfRecord(GetHandlingHistoryOfRecordOp),
}

impl HandlingOp {
    pub fn name(&self) -> &'static str {
        match self {
            HandlingOp::TryHandleRecord(_) => "TryHandleRecord",
            HandlingOp::Transition(op) => op.transition.operation_name(),
            HandlingOp::RecordBlock(op) => match op.action {
                BlockAction::Block => "BlockRecordHandling",
                BlockAction::Unblock => "CancelBlockedRecordHandling",
            },
            HandlingOp::StreamBlock(op) => match op.action {
                BlockAction::Block => "DisableHandlingForStream",
                BlockAction::Unblock => "EnableHandlingForStream",
            },
            HandlingOp::GetHandlingStatus(_) => "GetHandlingStatus",
            HandlingOp::GetCompositeHandlingStatusByIds(_) => "GetCompositeHandlingStatusByIds",
            HandlingOp::GetCompositeHandlingStatusByTags(_) => "GetCompositeHandlingStatusByTags",
            HandlingOp::GetHandlingHistoryOfRecord(_) => "GetHandlingHistoryOfRecord",
        }
    }

    pub fn concern(&self) -> Option<&Concern> {
        match self {
            HandlingOp::TryHandleRecord(op) => Some(&op.concern),
            HandlingOp::Transition(op) => Some(&op.concern),
            HandlingOp::GetHandlingStatus(op) => Some(&op.concern),
            HandlingOp::GetCompositeHandlingStatusByIds(op) => Some(&op.concern),
            HandlingOp::GetCompositeHandlingStatusByTags(op) => Some(&op.concern),
            HandlingOp::GetHandlingHistoryOfRecord(op) => Some(&op.concern),
            HandlingOp::RecordBlock(_) | HandlingOp::StreamBlock(_) => None,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            HandlingOp::TryHandleRecord(op) => op.details.as_deref(),
            HandlingOp::Transition(op) => op.details.as_deref(),
            HandlingOp::RecordBlock(op) => Some(&op.details),
            HandlingOp::StreamBlock(op) => Some(&op.details),
            _ => None,
        }
    }

    pub fn tags(&self) -> &[Tag] {
        match self {
            HandlingOp::TryHandleRecord(op) => &op.tags,
            HandlingOp::Transition(op) => &op.tags,
            HandlingOp::RecordBlock(op) => &op.tags,
            HandlingOp::StreamBlock(op) => &op.tags,
            HandlingOp::GetCompositeHandlingStatusByTags(op) => &op.tags_to_match,
            _ => &[],
        }
    }

    /// Whether executing this operation may append to the log.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            HandlingOp::TryHandleRecord(_)
                | HandlingOp::Transition(_)
                | HandlingOp::RecordBlock(_)
                | HandlingOp::StreamBlock(_)
        )
    }
}

/// Append a record to the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PutRecordOpSerde")]
pub struct PutRecordOp {
    id: StringSerializedIdentifier,
    payload: DescribedSerialization,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_timestamp_utc: Option<DateTime<Utc>>,
    existing_record_strategy: ExistingRecordStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    retention_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    specified_resource_locator: Option<String>,
}

#[derive(Deserialize)]
struct PutRecordOpSerde {
    id: StringSerializedIdentifier,
    payload: DescribedSerialization,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    object_timestamp_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    existing_record_strategy: ExistingRecordStrategy,
    #[serde(default)]
    retention_count: Option<i64>,
    #[serde(default)]
    specified_resource_locator: Option<String>,
}

impl TryFrom<PutRecordOpSerde> for PutRecordOp {
    type Error = OperationError;

    fn try_from(value: PutRecordOpSerde) -> Result<Self, Self::Error> {
        let mut op = Self::new(value.id, value.payload)?
            .with_tags(value.tags)
            .with_existing_record_strategy(value.existing_record_strategy, value.retention_count)?;
        if let Some(timestamp) = value.object_timestamp_utc {
            op = op.with_object_timestamp(timestamp);
        }
        match value.specified_resource_locator {
            Some(locator) => op.with_resource_locator(locator),
            None => Ok(op),
        }
    }
}

impl PutRecordOp {
    pub fn new(id: StringSerializedIdentifier, payload: DescribedSerialization) -> Result<Self, OperationError> {
        require_non_blank("identifierType", &id.identifier_type.name)?;
        require_non_blank("payloadType", &payload.payload_type.name)?;
        Ok(Self {
            id,
            payload,
            tags: Vec::new(),
            object_timestamp_utc: None,
            existing_record_strategy: ExistingRecordStrategy::None,
            retention_count: None,
            specified_resource_locator: None,
        })
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_object_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.object_timestamp_utc = Some(timestamp);
        self
    }

    /// Set the existing-record strategy together with its retention count.
    pub fn with_existing_record_strategy(
        mut self,
        strategy: ExistingRecordStrategy,
        retention_count: Option<i64>,
    ) -> Result<Self, OperationError> {
        strategy.validate_retention_count(retention_count)?;
        self.existing_record_strategy = strategy;
        self.retention_count = retention_count;
        Ok(self)
    }

    pub fn with_resource_locator(mut self, locator: impl Into<String>) -> Result<Self, OperationError> {
        self.specified_resource_locator = normalize_locator(Some(locator.into()))?;
        Ok(self)
    }

    pub fn id(&self) -> &StringSerializedIdentifier {
        &self.id
    }

    pub fn payload(&self) -> &DescribedSerialization {
        &self.payload
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn object_timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.object_timestamp_utc
    }

    pub fn existing_record_strategy(&self) -> ExistingRecordStrategy {
        self.existing_record_strategy
    }

    pub fn retention_count(&self) -> Option<i64> {
        self.retention_count
    }

    pub fn specified_resource_locator(&self) -> Option<&str> {
        self.specified_resource_locator.as_deref()
    }
}

/// Where a prune cuts the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneBoundary {
    /// Remove records with a smaller internal record id.
    BeforeInternalRecordId(InternalRecordId),
    /// Remove records written before this instant.
    BeforeTimestamp(DateTime<Utc>),
}

/// Remove old records and their handling entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PruneOpSerde")]
pub struct PruneOp {
    boundary: PruneBoundary,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    specified_resource_locator: Option<String>,
}

#[derive(Deserialize)]
struct PruneOpSerde {
    boundary: PruneBoundary,
    details: String,
    #[serde(default)]
    specified_resource_locator: Option<String>,
}

impl TryFrom<PruneOpSerde> for PruneOp {
    type Error = OperationError;

    fn try_from(value: PruneOpSerde) -> Result<Self, Self::Error> {
        let op = match value.boundary {
            PruneBoundary::BeforeInternalRecordId(id) => {
                Self::before_internal_record_id(id, value.details)?
            }
            PruneBoundary::BeforeTimestamp(timestamp) => {
                Self::before_timestamp(timestamp, value.details)?
            }
        };
        match value.specified_resource_locator {
            Some(locator) => op.with_resource_locator(locator),
            None => Ok(op),
        }
    }
}

impl PruneOp {
    pub fn before_internal_record_id(
        internal_record_id: InternalRecordId,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        require_positive_record_id(internal_record_id)?;
        Ok(Self {
            boundary: PruneBoundary::BeforeInternalRecordId(internal_record_id),
            details: required_details(details)?,
            specified_resource_locator: None,
        })
    }

    pub fn before_timestamp(
        timestamp: DateTime<Utc>,
        details: impl Into<String>,
    ) -> Result<Self, OperationError> {
        Ok(Self {
            boundary: PruneBoundary::BeforeTimestamp(timestamp),
            details: required_details(details)?,
            specified_resource_locator: None,
        })
    }

    pub fn with_resource_locator(mut self, locator: impl Into<String>) -> Result<Self, OperationError> {
        self.specified_resource_locator = normalize_locator(Some(locator.into()))?;
        Ok(self)
    }

    pub fn boundary(&self) -> PruneBoundary {
        self.boundary
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn specified_resource_locator(&self) -> Option<&str> {
        self.specified_resource_locator.as_deref()
    }
}
