//! Handling concerns.
//!
//! A concern names one handling workflow over a stream. Two concern names
//! are reserved for the stream-level and record-level block flags; callers
//! can never build a [`Concern`] carrying either of them.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::OperationError;

/// Reserved concern whose history records stream-wide handling blocks.
pub const STREAM_HANDLING_DISABLED_CONCERN: &str = "RecordHandlingDisabledForStream";

/// Reserved concern whose history records per-record handling blocks.
pub const RECORD_HANDLING_DISABLED_CONCERN: &str = "RecordHandlingDisabledForRecord";

/// Default concern used by the stream distributed mutex.
pub const DEFAULT_MUTEX_CONCERN: &str = "StreamMutex";

/// A validated, caller-usable concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Concern(String);

impl Concern {
    /// Build a concern, rejecting blank and reserved names.
    pub fn new(value: impl Into<String>) -> Result<Self, OperationError> {
        let value = value.into();
        throw_if_invalid_concern("concern", &value)?;
        Ok(Self(value))
    }

    pub fn mutex_default() -> Self {
        Self(DEFAULT_MUTEX_CONCERN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Concern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Concern {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Concern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Concern::new(raw).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&str> for Concern {
    type Error = OperationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Concern::new(value)
    }
}

pub fn is_reserved_concern(value: &str) -> bool {
    value == STREAM_HANDLING_DISABLED_CONCERN || value == RECORD_HANDLING_DISABLED_CONCERN
}

/// Reject blank and reserved concern names for `parameter`.
pub fn throw_if_invalid_concern(parameter: &'static str, value: &str) -> Result<(), OperationError> {
    if value.trim().is_empty() {
        return Err(OperationError::Blank { parameter });
    }
    if is_reserved_concern(value) {
        return Err(OperationError::ReservedConcern {
            parameter,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_concerns_are_rejected() {
        for reserved in [
            STREAM_HANDLING_DISABLED_CONCERN,
            RECORD_HANDLING_DISABLED_CONCERN,
        ] {
            let err = Concern::new(reserved).expect_err("reserved concern must be rejected");
            assert!(err.to_string().contains("is reserved for internal use"));
        }
        insta::assert_snapshot!(
            Concern::new(STREAM_HANDLING_DISABLED_CONCERN).unwrap_err().to_string(),
            @"concern 'RecordHandlingDisabledForStream' is reserved for internal use"
        );
    }

    #[test]
    fn blank_concern_is_rejected() {
        assert_eq!(
            Concern::new("  \t"),
            Err(OperationError::Blank {
                parameter: "concern"
            })
        );
    }

    #[test]
    fn mutex_concern_is_not_reserved() {
        assert_eq!(Concern::mutex_default().as_str(), DEFAULT_MUTEX_CONCERN);
        assert!(Concern::new(DEFAULT_MUTEX_CONCERN).is_ok());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Concern = serde_json::from_str("\"indexer\"").expect("must parse");
        assert_eq!(ok.as_str(), "indexer");
        let err = serde_json::from_str::<Concern>("\"RecordHandlingDisabledForRecord\"")
            .expect_err("reserved concern must not deserialize");
        assert!(err.to_string().contains("is reserved for internal use"));
    }
}
