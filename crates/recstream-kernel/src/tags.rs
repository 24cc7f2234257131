//! Tags and tag matching.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::OperationError;
use crate::strategy::parse_named;

/// A named, optionally valued tag. Names need not be unique within a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={value}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([^=\s][^=]*?)\s*(?:=(.*))?$").expect("tag pattern is a valid regex")
    })
}

impl FromStr for Tag {
    type Err = OperationError;

    /// Parses `name` or `name=value`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let captures = tag_pattern()
            .captures(raw)
            .ok_or_else(|| OperationError::Malformed {
                parameter: "tag",
                message: format!("'{raw}' is not of the form name[=value]"),
            })?;
        let name = captures[1].to_string();
        Ok(match captures.get(2) {
            Some(value) => Tag::new(name, value.as_str()),
            None => Tag::name_only(name),
        })
    }
}

/// Parse a raw JSON tag list, rejecting `null` elements.
///
/// In-process tag lists are `Vec<Tag>` and cannot hold a null; this is the
/// boundary where one can still appear.
pub fn parse_tags(parameter: &'static str, raw: &Value) -> Result<Vec<Tag>, OperationError> {
    let items = match raw {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(OperationError::Malformed {
                parameter,
                message: format!("expected an array of tags, got {other}"),
            });
        }
    };

    if items.iter().any(Value::is_null) {
        return Err(OperationError::NullTagElement { parameter });
    }

    items
        .iter()
        .map(|item| {
            serde_json::from_value::<Tag>(item.clone()).map_err(|e| OperationError::Malformed {
                parameter,
                message: e.to_string(),
            })
        })
        .collect()
}

/// How record tags are compared against query tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagMatchStrategy {
    #[default]
    RecordContainsAnyQueryTag,
    RecordContainsAllQueryTags,
    RecordContainsAllQueryTagsAndNoneOther,
}

impl TagMatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagMatchStrategy::RecordContainsAnyQueryTag => "record-contains-any-query-tag",
            TagMatchStrategy::RecordContainsAllQueryTags => "record-contains-all-query-tags",
            TagMatchStrategy::RecordContainsAllQueryTagsAndNoneOther => {
                "record-contains-all-query-tags-and-none-other"
            }
        }
    }
}

impl FromStr for TagMatchStrategy {
    type Err = OperationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        parse_named(
            "tagMatchStrategy",
            raw,
            &[
                ("any", TagMatchStrategy::RecordContainsAnyQueryTag),
                (
                    "record-contains-any-query-tag",
                    TagMatchStrategy::RecordContainsAnyQueryTag,
                ),
                ("all", TagMatchStrategy::RecordContainsAllQueryTags),
                (
                    "record-contains-all-query-tags",
                    TagMatchStrategy::RecordContainsAllQueryTags,
                ),
                (
                    "exact",
                    TagMatchStrategy::RecordContainsAllQueryTagsAndNoneOther,
                ),
                (
                    "record-contains-all-query-tags-and-none-other",
                    TagMatchStrategy::RecordContainsAllQueryTagsAndNoneOther,
                ),
            ],
        )
    }
}

/// Match a record's tags against query tags.
///
/// A record without tags never matches. Query tags are expected to be
/// non-empty; operations enforce that before reaching here.
pub fn fuzzy_match_tags(record_tags: &[Tag], query_tags: &[Tag], strategy: TagMatchStrategy) -> bool {
    if record_tags.is_empty() {
        return false;
    }

    let record: BTreeSet<&Tag> = record_tags.iter().collect();
    let query: BTreeSet<&Tag> = query_tags.iter().collect();

    match strategy {
        TagMatchStrategy::RecordContainsAnyQueryTag => !record.is_disjoint(&query),
        TagMatchStrategy::RecordContainsAllQueryTags => query.is_subset(&record),
        TagMatchStrategy::RecordContainsAllQueryTagsAndNoneOther => record == query,
    }
}

/// Union of two tag lists, preserving first-seen order and dropping duplicates.
pub fn merge_tags(first: &[Tag], second: &[Tag]) -> Vec<Tag> {
    let mut seen = BTreeSet::new();
    first
        .iter()
        .chain(second)
        .filter(|tag| seen.insert((*tag).clone()))
        .cloned()
        .collect()
}
