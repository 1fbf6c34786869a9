//! Error types for notionify-core

use std::fmt;

use thiserror::Error;

/// Result type alias using notionify-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while synchronizing a folder or a single file
#[derive(Error, Debug)]
pub enum Error {
    /// Another attempt is already syncing the same fingerprint
    #[error("Sync already in progress for {fingerprint}")]
    DuplicateInProgress { fingerprint: String },

    /// The mapping store could not be read or written
    #[error("Mapping store unavailable during {operation}: {source}")]
    StoreUnavailable {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// A storage or database collaborator call failed
    #[error("{operation} failed for {context}: {source}")]
    Collaborator {
        operation: &'static str,
        context: String,
        #[source]
        source: CollaboratorError,
    },

    /// One or more entries of a folder batch failed
    #[error("{0}")]
    PartialBatchFailure(BatchFailure),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn collaborator(
        operation: &'static str,
        context: impl fmt::Display,
        source: CollaboratorError,
    ) -> Self {
        Self::Collaborator {
            operation,
            context: context.to_string(),
            source,
        }
    }

    pub const fn store(operation: &'static str, source: StoreError) -> Self {
        Self::StoreUnavailable { operation, source }
    }

    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateInProgress { .. })
    }
}

/// Failure reported by an external collaborator (storage or database API)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The API answered with a non-success status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered with a payload we could not interpret
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(crate::http::sanitize(&error))
    }
}

/// Failure reported by the mapping store backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<libsql::Error> for StoreError {
    fn from(error: libsql::Error) -> Self {
        Self::Backend(crate::http::sanitize(&error))
    }
}

/// Aggregate of per-entry errors collected while processing one folder batch
#[derive(Debug, Default)]
pub struct BatchFailure {
    errors: Vec<Error>,
}

impl BatchFailure {
    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `None` when nothing failed.
    pub fn into_option(self) -> Option<Self> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} entries failed", self.errors.len())?;
        for (index, error) in self.errors.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(formatter, "{separator}{error}")?;
        }
        Ok(())
    }
}
