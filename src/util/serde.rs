//! Serializable identifier and priority types shared across the crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied task identifier. Not checked for uniqueness.
pub type TaskId = String;

/// Scheduling priority. Higher values are admitted sooner.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub i64);

impl Priority {
    /// Priority given to tasks that do not set one.
    pub const DEFAULT: Self = Self(0);

    /// Wrap a raw priority value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw priority value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for Priority {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
