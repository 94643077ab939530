//! Validated table name for the job store.

use std::fmt;
use thiserror::Error;

/// Name of the job table used when none is configured.
pub const DEFAULT_TABLE_NAME: &str = "__pgq_jobs";

/// Longest table name accepted, leaving room for the derived
/// `idx_<table>_status` index name within `PostgreSQL`'s 63-byte limit.
const MAX_TABLE_NAME_LEN: usize = 52;

/// Error returned for table names that are not plain lowercase identifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "invalid job table name '{0}', expected 1-52 lowercase ASCII letters, digits, or \
     underscores not starting with a digit"
)]
pub struct TableNameError(pub String);

/// Job table identifier.
///
/// The name is interpolated into SQL, so only unquoted lowercase
/// identifiers are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Creates a validated table name.
    ///
    /// # Errors
    ///
    /// Returns [`TableNameError`] when the value is empty, too long, starts
    /// with a digit, or contains characters other than lowercase ASCII
    /// letters, digits, and underscores.
    pub fn new(value: impl Into<String>) -> Result<Self, TableNameError> {
        let raw = value.into();
        let starts_well = raw
            .chars()
            .next()
            .is_some_and(|first| first == '_' || first.is_ascii_lowercase());
        let is_valid = starts_well
            && raw.len() <= MAX_TABLE_NAME_LEN
            && raw
                .chars()
                .all(|ch| ch == '_' || ch.is_ascii_lowercase() || ch.is_ascii_digit());

        if !is_valid {
            return Err(TableNameError(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the table name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE_NAME.to_owned())
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
