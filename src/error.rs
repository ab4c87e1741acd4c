//! Error types shared by the console's views and data sources.
//!
//! Sources report [`SourceError`]; the views wrap it into the operation that
//! failed ([`FetchError`], [`LoadError`], [`SaveError`]). None of these are stored
//! by the views themselves: they are logged and handed back to the host page from
//! `poll()`, which decides how to surface them.
//!
//! [`ProgrammingError`] is different: it describes a misconfigured view and is
//! returned from constructors so the binary aborts at startup.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a data source implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Field level validation errors, keyed by field name.
    #[error("validation failed for {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    Invalid(BTreeMap<String, Vec<String>>),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A collection page could not be fetched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to fetch page {page}")]
pub struct FetchError {
    pub page: u32,
    #[source]
    pub source: SourceError,
}

/// A single entity could not be loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to load {id}")]
pub struct LoadError {
    pub id: String,
    #[source]
    pub source: SourceError,
}

/// A form submission was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to save")]
pub struct SaveError {
    #[from]
    pub source: SourceError,
}

impl SaveError {
    /// Validation messages for one field, if the source rejected it.
    pub fn field_errors(&self, field: &str) -> &[String] {
        match &self.source {
            SourceError::Invalid(fields) => fields.get(field).map(Vec::as_slice).unwrap_or(&[]),
            _ => &[],
        }
    }
}

/// A view was configured in a way it cannot honour.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgrammingError {
    #[error("view `{view}` enables row expansion but its renderer has no expanded row")]
    ExpansionWithoutRenderer { view: String },
}

/// Configuration file problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("page_size must be between 1 and {max}, got {value}")]
    PageSize { value: u32, max: u32 },

    #[error("unknown log level `{0}`")]
    LogLevel(String),
}
