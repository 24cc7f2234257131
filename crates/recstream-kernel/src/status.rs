//! Handling status, history replay, and composite-status reduction.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{CompositeStatusError, OperationError};
use crate::strategy::parse_named;

/// Status of one (record, concern) pair, or of a reserved block flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlingStatus {
    Unknown,
    None,
    Requested,
    Running,
    Completed,
    Failed,
    Canceled,
    CanceledRunning,
    SelfCanceled,
    SelfCanceledRunning,
    RetryFailed,
    Blocked,
}

/// Statuses from which a record may be claimed for a concern.
pub const CLAIMABLE_STATUSES: &[HandlingStatus] = &[
    HandlingStatus::None,
    HandlingStatus::Requested,
    HandlingStatus::RetryFailed,
    HandlingStatus::CanceledRunning,
    HandlingStatus::SelfCanceledRunning,
];

impl HandlingStatus {
    pub const ALL: [HandlingStatus; 12] = [
        HandlingStatus::Unknown,
        HandlingStatus::None,
        HandlingStatus::Requested,
        HandlingStatus::Running,
        HandlingStatus::Completed,
        HandlingStatus::Failed,
        HandlingStatus::Canceled,
        HandlingStatus::CanceledRunning,
        HandlingStatus::SelfCanceled,
        HandlingStatus::SelfCanceledRunning,
        HandlingStatus::RetryFailed,
        HandlingStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlingStatus::Unknown => "unknown",
            HandlingStatus::None => "none",
            HandlingStatus::Requested => "requested",
            HandlingStatus::Running => "running",
            HandlingStatus::Completed => "completed",
            HandlingStatus::Failed => "failed",
            HandlingStatus::Canceled => "canceled",
            HandlingStatus::CanceledRunning => "canceled_running",
            HandlingStatus::SelfCanceled => "self_canceled",
            HandlingStatus::SelfCanceledRunning => "self_canceled_running",
            HandlingStatus::RetryFailed => "retry_failed",
            HandlingStatus::Blocked => "blocked",
        }
    }

    pub fn is_claimable(&self) -> bool {
        CLAIMABLE_STATUSES.contains(self)
    }

    /// Running work stopped by either party; the record can be claimed again.
    fn is_interrupted(&self) -> bool {
        matches!(
            self,
            HandlingStatus::SelfCanceled
                | HandlingStatus::SelfCanceledRunning
                | HandlingStatus::CanceledRunning
        )
    }

    fn is_pending_request(&self) -> bool {
        matches!(
            self,
            HandlingStatus::Requested | HandlingStatus::RetryFailed
        )
    }
}

impl Display for HandlingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlingStatus {
    type Err = OperationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let table: Vec<(&str, HandlingStatus)> = HandlingStatus::ALL
            .iter()
            .filter(|status| **status != HandlingStatus::Unknown)
            .map(|status| (status.as_str(), *status))
            .collect();
        parse_named("handlingStatus", raw, &table)
    }
}

/// Options for composing many statuses into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandlingStatusCompositionStrategy {
    /// Treat external cancellations as completions.
    #[serde(default)]
    pub ignore_cancel: bool,
}

impl HandlingStatusCompositionStrategy {
    pub fn ignoring_cancel() -> Self {
        Self {
            ignore_cancel: true,
        }
    }
}

/// Reduce a set of statuses to a single composite status.
///
/// Rules are evaluated in order and the first match wins:
/// empty, blocked, failed, running, canceled request (unless ignored),
/// interrupted running work, unknown, pending request, none, all completed.
pub fn reduce_to_composite_handling_status(
    statuses: &[HandlingStatus],
    strategy: HandlingStatusCompositionStrategy,
) -> Result<HandlingStatus, CompositeStatusError> {
    let any = |predicate: fn(&HandlingStatus) -> bool| statuses.iter().any(predicate);

    if statuses.is_empty() {
        return Ok(HandlingStatus::None);
    }
    if any(|s| *s == HandlingStatus::Blocked) {
        return Ok(HandlingStatus::Blocked);
    }
    if any(|s| *s == HandlingStatus::Failed) {
        return Ok(HandlingStatus::Failed);
    }
    if any(|s| *s == HandlingStatus::Running) {
        return Ok(HandlingStatus::Running);
    }
    if !strategy.ignore_cancel && any(|s| *s == HandlingStatus::Canceled) {
        return Ok(HandlingStatus::Canceled);
    }
    if any(HandlingStatus::is_interrupted) {
        return Ok(HandlingStatus::SelfCanceledRunning);
    }
    if any(|s| *s == HandlingStatus::Unknown) {
        return Ok(HandlingStatus::Unknown);
    }
    if any(HandlingStatus::is_pending_request) {
        return Ok(HandlingStatus::Requested);
    }
    if any(|s| *s == HandlingStatus::None) {
        return Ok(HandlingStatus::None);
    }

    let leftover: Vec<HandlingStatus> = statuses
        .iter()
        .copied()
        .filter(|s| {
            !(*s == HandlingStatus::Completed
                || (strategy.ignore_cancel && *s == HandlingStatus::Canceled))
        })
        .collect();
    if leftover.is_empty() {
        return Ok(HandlingStatus::Completed);
    }

    Err(CompositeStatusError::CannotReduce { statuses: leftover })
}

/// Status at the end of an ordered history; `None` when empty.
pub fn current_status(history: impl IntoIterator<Item = HandlingStatus>) -> HandlingStatus {
    history.into_iter().last().unwrap_or(HandlingStatus::None)
}

/// If the history currently ends blocked, the status it held just before
/// the block began.
///
/// Consecutive blocks collapse into one: re-blocking an already blocked
/// history does not move the restore point, and a single unblock clears it.
pub fn status_prior_to_block(
    history: impl IntoIterator<Item = HandlingStatus>,
) -> Option<HandlingStatus> {
    let mut current = HandlingStatus::None;
    let mut restore_to = HandlingStatus::None;
    for status in history {
        if status == HandlingStatus::Blocked && current != HandlingStatus::Blocked {
            restore_to = current;
        }
        current = status;
    }
    (current == HandlingStatus::Blocked).then_some(restore_to)
}
