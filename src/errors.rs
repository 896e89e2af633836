// src/errors.rs
//! Error taxonomy.
//!
//! Everything a single task can do wrong is a [`TaskError`]; the runner records
//! it as an [`ErrorRecord`](crate::report::ErrorRecord) and moves on. Only
//! [`RunError`] (output could not be written) ends a run.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Why a record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid data: contains no case data")]
    MissingCases,
    #[error("Invalid data: {0} is null")]
    NullField(String),
    #[error("Invalid data: {0} is not a number")]
    NotANumber(String),
}

/// Failures of the fetch/cache collaborator.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network error for {url}: {msg}")]
    Network { url: String, msg: String },
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },
    #[error("no cached copy of {0} for a historical date")]
    CacheMiss(String),
    #[error("could not parse {url}: {msg}")]
    Parse { url: String, msg: String },
    #[error("cache I/O: {0}")]
    Io(String),
}

/// Coarse classification used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    TaskExecution,
    Validation,
    Structural,
}

/// Anything that sinks one task's contribution for one run.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("{0}")]
    Execution(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid data: {0}")]
    Structural(String),
    #[error("task exceeded its deadline of {0:?}")]
    Timeout(Duration),
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::Validation(_) => ErrorKind::Validation,
            TaskError::Structural(_) => ErrorKind::Structural,
            TaskError::Execution(_)
            | TaskError::Fetch(_)
            | TaskError::Timeout(_)
            | TaskError::Panicked(_) => ErrorKind::TaskExecution,
        }
    }

    /// Shorthand for source code: `TaskError::exec(format!(..))`.
    pub fn exec(msg: impl Into<String>) -> Self {
        TaskError::Execution(msg.into())
    }
}

/// Problems while assembling the task registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid version key `{key}` for {task}: expected YYYY-MM-DD")]
    BadVersionKey { task: String, key: String },
}

/// Failures outside any task: these end the run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Output(String),
}

impl RunError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        RunError::Io { path: path.as_ref().display().to_string(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(TaskError::from(ValidationError::MissingCases).kind(), ErrorKind::Validation);
        assert_eq!(TaskError::Structural(s!("0 rows")).kind(), ErrorKind::Structural);
        assert_eq!(TaskError::Timeout(Duration::from_secs(1)).kind(), ErrorKind::TaskExecution);
        assert_eq!(
            TaskError::from(FetchError::CacheMiss(s!("http://x"))).kind(),
            ErrorKind::TaskExecution
        );
    }

    #[test]
    fn messages_name_the_field() {
        let e = ValidationError::NullField(s!("deaths"));
        assert_eq!(e.to_string(), "Invalid data: deaths is null");
    }
}
