//! Type representations and version-aware type matching.
//!
//! Records carry the type of their identifier and of their payload. Readers
//! and claimants filter on those types either loosely (any version) or
//! strictly (the exact version they were built against).

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::OperationError;
use crate::strategy::parse_named;

/// A named type with an optional version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeRepresentation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl TypeRepresentation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    pub fn unversioned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn without_version(&self) -> Self {
        Self::unversioned(self.name.clone())
    }

    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }
}

impl Display for TypeRepresentation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{version}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for TypeRepresentation {
    type Err = OperationError;

    /// Parses `name` or `name@version`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (name, version) = match trimmed.split_once('@') {
            Some((name, version)) => (name.trim(), Some(version.trim())),
            None => (trimmed, None),
        };
        if name.is_empty() {
            return Err(OperationError::Blank {
                parameter: "typeRepresentation",
            });
        }
        match version {
            Some("") => Err(OperationError::Malformed {
                parameter: "typeRepresentation",
                message: format!("'{trimmed}' has an empty version"),
            }),
            Some(version) => Ok(Self::new(name, version)),
            None => Ok(Self::unversioned(name)),
        }
    }
}

/// How strictly a type's version participates in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionMatchStrategy {
    #[default]
    Any,
    SpecifiedVersion,
}

impl VersionMatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionMatchStrategy::Any => "any",
            VersionMatchStrategy::SpecifiedVersion => "specified-version",
        }
    }
}

impl FromStr for VersionMatchStrategy {
    type Err = OperationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_named(
            "versionMatchStrategy",
            raw,
            &[
                ("any", VersionMatchStrategy::Any),
                ("specified-version", VersionMatchStrategy::SpecifiedVersion),
            ],
        )
    }
}

/// A type representation held in both its versioned and version-stripped form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRepresentationWithAndWithoutVersion {
    with_version: TypeRepresentation,
    without_version: TypeRepresentation,
}

impl TypeRepresentationWithAndWithoutVersion {
    pub fn new(type_representation: &TypeRepresentation) -> Self {
        Self {
            with_version: type_representation.clone(),
            without_version: type_representation.without_version(),
        }
    }

    pub fn with_version(&self) -> &TypeRepresentation {
        &self.with_version
    }

    pub fn without_version(&self) -> &TypeRepresentation {
        &self.without_version
    }

    /// `Any` selects the version-stripped form, `SpecifiedVersion` the
    /// versioned one.
    pub fn by_strategy(&self, strategy: VersionMatchStrategy) -> &TypeRepresentation {
        match strategy {
            VersionMatchStrategy::Any => &self.without_version,
            VersionMatchStrategy::SpecifiedVersion => &self.with_version,
        }
    }
}

impl From<&TypeRepresentation> for TypeRepresentationWithAndWithoutVersion {
    fn from(value: &TypeRepresentation) -> Self {
        Self::new(value)
    }
}

/// Compare two type representations under a version-match strategy.
pub fn equals_according_to_strategy(
    first: &TypeRepresentation,
    second: &TypeRepresentation,
    strategy: VersionMatchStrategy,
) -> bool {
    let first = TypeRepresentationWithAndWithoutVersion::new(first);
    let second = TypeRepresentationWithAndWithoutVersion::new(second);
    first.by_strategy(strategy) == second.by_strategy(strategy)
}

/// Whether `candidate` matches any of `accepted` under `strategy`.
///
/// An empty `accepted` list places no constraint.
pub fn matches_any_type(
    candidate: &TypeRepresentation,
    accepted: &[TypeRepresentation],
    strategy: VersionMatchStrategy,
) -> bool {
    accepted.is_empty()
        || accepted
            .iter()
            .any(|expected| equals_according_to_strategy(candidate, expected, strategy))
}

/// Types that know how they are represented in a stream.
pub trait HasTypeRepresentation {
    fn type_representation() -> TypeRepresentation;
}

impl HasTypeRepresentation for String {
    fn type_representation() -> TypeRepresentation {
        TypeRepresentation::unversioned("string")
    }
}

impl HasTypeRepresentation for i64 {
    fn type_representation() -> TypeRepresentation {
        TypeRepresentation::unversioned("i64")
    }
}

impl HasTypeRepresentation for u64 {
    fn type_representation() -> TypeRepresentation {
        TypeRepresentation::unversioned("u64")
    }
}

impl HasTypeRepresentation for uuid::Uuid {
    fn type_representation() -> TypeRepresentation {
        TypeRepresentation::unversioned("uuid")
    }
}
