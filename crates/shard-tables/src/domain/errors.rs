//! # Domain Errors
//!
//! Error types for shard table resolution and provisioning.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Error reported by a catalog or lock backend.
///
/// Port implementations wrap whatever their driver returns in this type so
/// the service can pass it through unchanged.
#[derive(Debug)]
pub struct BackendError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl BackendError {
    /// Create a backend error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error wrapping an underlying driver error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Backend-provided message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source("I/O failure", err)
    }
}

/// Stage of a provisioning call, reported by deadline and cancellation errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionStage {
    /// Waiting for the creation lock.
    LockWait,
    /// Checking whether the shard table exists.
    ExistenceCheck,
    /// Fetching the template DDL.
    TemplateFetch,
    /// Executing the CREATE TABLE statement.
    Create,
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LockWait => "lock wait",
            Self::ExistenceCheck => "existence check",
            Self::TemplateFetch => "template fetch",
            Self::Create => "create",
        };
        f.write_str(name)
    }
}

/// Sharding error types.
#[derive(Debug, Error)]
pub enum ShardError {
    /// Malformed split request. `field` names the offending input.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Provisioner built without a mandatory field or with an invalid one.
    /// Surfaced on first use, not at construction.
    #[error("provisioner configuration error: {0}")]
    Configuration(String),

    /// Lock retry budget exhausted.
    #[error("failed to acquire shard creation lock {key} after {attempts} attempts")]
    LockAcquisition {
        /// Lock key
        key: String,
        /// Attempts made
        attempts: u32,
        /// Last backend error seen while attempting, if any
        last_error: Option<String>,
    },

    /// Catalog lookup failed (existence check or template DDL fetch).
    #[error("catalog query failed for {schema}.{table}: {source}")]
    CatalogQuery {
        /// Schema queried
        schema: String,
        /// Table queried
        table: String,
        /// Backend error
        #[source]
        source: BackendError,
    },

    /// CREATE TABLE execution failed. Never retried.
    #[error("DDL execution failed for {schema}.{table}: {source}")]
    DdlExecution {
        /// Target schema
        schema: String,
        /// Table being created
        table: String,
        /// Backend error
        #[source]
        source: BackendError,
    },

    /// Template DDL could not be rewritten for the shard table.
    #[error("template DDL for {template} is unusable: {reason}")]
    TemplateDdl {
        /// Template table name
        template: String,
        /// Why the rewrite failed
        reason: String,
    },

    /// A bucket boundary is not representable.
    #[error("calendar error: {0}")]
    Calendar(String),

    /// A split result broke a coverage rule.
    #[error("shard invariant violated: {0}")]
    InvariantViolation(String),

    /// Caller deadline passed.
    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded {
        /// Where the call was when the deadline passed
        stage: ProvisionStage,
    },

    /// Caller cancelled the call.
    #[error("cancelled during {stage}")]
    Cancelled {
        /// Where the call was when it observed cancellation
        stage: ProvisionStage,
    },
}

impl ShardError {
    /// Validation error for `field`.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Field named by a validation error.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
