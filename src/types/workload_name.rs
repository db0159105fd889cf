// ABOUTME: DNS-compatible workload name validation.
// ABOUTME: Workload names become stack names and service discovery labels, so RFC 1123 applies.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkloadNameError {
    #[error("workload name cannot be empty")]
    Empty,

    #[error("workload name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("workload name must start with a letter")]
    StartsWithNonLetter,

    #[error("workload name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("workload name cannot contain consecutive hyphens")]
    ConsecutiveHyphens,

    #[error("invalid character in workload name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkloadName(String);

impl WorkloadName {
    pub fn new(value: &str) -> Result<Self, WorkloadNameError> {
        if value.is_empty() {
            return Err(WorkloadNameError::Empty);
        }

        if value.len() > 63 {
            return Err(WorkloadNameError::TooLong);
        }

        if !value.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(WorkloadNameError::StartsWithNonLetter);
        }

        if value.ends_with('-') {
            return Err(WorkloadNameError::EndsWithHyphen);
        }

        if value.contains("--") {
            return Err(WorkloadNameError::ConsecutiveHyphens);
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-')
        {
            return Err(WorkloadNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// PascalCase form used for logical resource IDs in templates.
    pub fn logical_id(&self) -> String {
        self.0
            .split('-')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect()
    }
}

impl fmt::Display for WorkloadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for WorkloadName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WorkloadName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        WorkloadName::new(&s).map_err(serde::de::Error::custom)
    }
}
