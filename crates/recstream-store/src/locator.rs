//! Resource locators: the named shards a stream is split into.
//!
//! Puts route by a SHA-256 digest of the string-serialized id, so the same
//! id always lands on the same locator for a fixed locator list. Operations
//! addressed by internal record id need an explicit locator unless the
//! stream has only one.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::error::StreamError;

fn locator_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,63}$").expect("locator pattern is valid")
    })
}

/// Check that a locator name is usable as a file stem.
pub fn validate_locator_name(name: &str) -> Result<(), StreamError> {
    if !locator_name_pattern().is_match(name) {
        return Err(StreamError::InvalidLocator {
            name: name.to_string(),
            reason: "expected 1-64 characters of [A-Za-z0-9_.-], starting alphanumeric"
                .to_string(),
        });
    }
    Ok(())
}

/// The ordered, non-empty set of locators of one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorSet {
    names: Vec<String>,
}

impl LocatorSet {
    pub fn new<I, N>(names: I) -> Result<Self, StreamError>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            validate_locator_name(&name)?;
            if unique.contains(&name) {
                return Err(StreamError::InvalidLocator {
                    name,
                    reason: "listed more than once".to_string(),
                });
            }
            unique.push(name);
        }
        if unique.is_empty() {
            return Err(StreamError::Config(
                "a stream needs at least one resource locator".to_string(),
            ));
        }
        Ok(Self { names: unique })
    }

    pub fn single(name: impl Into<String>) -> Result<Self, StreamError> {
        Self::new([name.into()])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }

    /// Locator a new record with this serialized id is written to.
    pub fn route(&self, serialized_id: &str) -> &str {
        let digest = Sha256::digest(serialized_id.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let index = (u64::from_be_bytes(prefix) % self.names.len() as u64) as usize;
        &self.names[index]
    }

    /// Locator for an operation addressed by internal record id.
    pub fn resolve(&self, specified: Option<&str>) -> Result<&str, StreamError> {
        match specified {
            Some(name) => self
                .names
                .iter()
                .find(|candidate| candidate.as_str() == name)
                .map(String::as_str)
                .ok_or_else(|| StreamError::UnknownLocator(name.to_string())),
            None if self.names.len() == 1 => Ok(&self.names[0]),
            None => Err(StreamError::LocatorRequired {
                count: self.names.len(),
            }),
        }
    }

    /// Locators a query visits: the specified one, or all in order.
    pub fn scope(&self, specified: Option<&str>) -> Result<Vec<&str>, StreamError> {
        match specified {
            Some(_) => Ok(vec![self.resolve(specified)?]),
            None => Ok(self.names.iter().map(String::as_str).collect()),
        }
    }
}
