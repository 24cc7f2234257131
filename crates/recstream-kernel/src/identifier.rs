//! String-serialized record identifiers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OperationError;
use crate::type_repr::{HasTypeRepresentation, TypeRepresentation, VersionMatchStrategy};
use crate::type_repr::equals_according_to_strategy;

/// Monotonic id assigned to a record by its locator.
pub type InternalRecordId = i64;

/// Monotonic id assigned to a handling entry by its locator.
pub type InternalHandlingEntryId = i64;

/// An object identifier in its string form, with the identifier's type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StringSerializedIdentifier {
    pub serialized_id: String,
    pub identifier_type: TypeRepresentation,
}

impl StringSerializedIdentifier {
    pub fn new(serialized_id: impl Into<String>, identifier_type: TypeRepresentation) -> Self {
        Self {
            serialized_id: serialized_id.into(),
            identifier_type,
        }
    }

    /// Serialize a typed id. Strings are stored bare; anything else as JSON.
    pub fn from_id<K>(id: &K) -> Result<Self, OperationError>
    where
        K: Serialize + HasTypeRepresentation,
    {
        Ok(Self::new(
            serialize_identifier(id)?,
            K::type_representation(),
        ))
    }

    /// Whether this identifier names the same object as `other`.
    pub fn matches(&self, other: &StringSerializedIdentifier, strategy: VersionMatchStrategy) -> bool {
        self.serialized_id == other.serialized_id
            && equals_according_to_strategy(&self.identifier_type, &other.identifier_type, strategy)
    }
}

pub fn serialize_identifier<K: Serialize>(id: &K) -> Result<String, OperationError> {
    let value = serde_json::to_value(id).map_err(|e| OperationError::Malformed {
        parameter: "id",
        message: e.to_string(),
    })?;
    Ok(match value {
        Value::String(raw) => raw,
        other => other.to_string(),
    })
}

pub fn deserialize_identifier<K: DeserializeOwned>(raw: &str) -> Result<K, OperationError> {
    serde_json::from_str::<K>(raw)
        .or_else(|_| serde_json::from_value::<K>(Value::String(raw.to_string())))
        .map_err(|e| OperationError::Malformed {
            parameter: "serializedId",
            message: e.to_string(),
        })
}
