//! Error types for SwapOps Core
//!
//! Provides error handling for:
//! - Malformed raw records coming from collaborators
//! - Collaborator (backend) call failures
//! - Mutations rejected before any remote call
//! - Mutation sequencing failures in the coordinator
//! - Configuration loading
//!
//! Identity resolution never fails with an error: an unresolvable record
//! is reported through `Option` and dropped from mutation-eligible views.

use std::path::PathBuf;

/// Errors while ingesting raw records
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// JSON could not be parsed
    #[error("invalid record json: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is neither a list, a known envelope, nor a single object
    #[error("expected a record list, got {0}")]
    NotAList(&'static str),

    /// `$ref` points at an `$id` that never appears in the payload
    #[error("dangling record reference: {0}")]
    DanglingReference(String),

    /// The same `$id` is declared twice
    #[error("duplicate record id: {0}")]
    DuplicateId(String),
}

/// Collaborator call failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote answered with a failure status
    #[error("remote returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// Entity does not exist remotely
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Remote refused the write on business grounds
    #[error("rejected: {0}")]
    Rejected(String),

    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// No response in time
    #[error("remote call timed out")]
    Timeout,
}

impl BackendError {
    /// Create not-found error
    #[inline]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Check if the entity was missing remotely
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Status { code: 404, .. })
    }

    /// Check if a later attempt could succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Status { code, .. } => *code >= 500,
            _ => false,
        }
    }
}

impl From<RecordError> for BackendError {
    fn from(err: RecordError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Mutation rejected before any remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No resolvable staff id
    #[error("no staff id selected")]
    MissingStaffId,

    /// No station selected
    #[error("no station selected")]
    MissingStationId,

    /// No battery selected
    #[error("no battery selected")]
    MissingBatteryId,
}

/// Mutation kinds sequenced by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Assign staff to a station
    AddStaff,
    /// Remove staff from a station
    RemoveStaff,
    /// Detach a battery from its slot
    RemoveBattery,
    /// Change station status
    SetStatus,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AddStaff => "add staff",
            Self::RemoveStaff => "remove staff",
            Self::RemoveBattery => "remove battery",
            Self::SetStatus => "set status",
        };
        f.write_str(name)
    }
}

/// Reads the coordinator performs to keep views consistent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshStage {
    /// Station summary list
    Summaries,
    /// Single station detail
    Detail,
}

impl std::fmt::Display for RefreshStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Summaries => f.write_str("station summaries"),
            Self::Detail => f.write_str("station detail"),
        }
    }
}

/// Main coordinator error type
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Rejected before any remote call
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The remote write failed
    #[error("{operation} failed: {source}")]
    Mutation {
        operation: MutationKind,
        #[source]
        source: BackendError,
    },

    /// A required read failed; the operation stopped at this stage
    #[error("refreshing {stage} failed: {source}")]
    Refresh {
        stage: RefreshStage,
        station: Option<String>,
        #[source]
        source: BackendError,
    },
}

impl CoordinatorError {
    /// Create mutation failure
    #[inline]
    pub fn mutation(operation: MutationKind, source: BackendError) -> Self {
        Self::Mutation { operation, source }
    }

    /// Create refresh failure
    #[inline]
    pub fn refresh(stage: RefreshStage, station: Option<&str>, source: BackendError) -> Self {
        Self::Refresh {
            stage,
            station: station.map(str::to_string),
            source,
        }
    }

    /// Check if the request never reached the backend
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the remote write went through even though the call failed
    ///
    /// True only for refresh failures: the mutation succeeded but the view
    /// could not be brought up to date.
    #[inline]
    #[must_use]
    pub fn mutation_applied(&self) -> bool {
        matches!(self, Self::Refresh { .. })
    }

    /// Underlying backend error, if any
    #[must_use]
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::Validation(_) => None,
            Self::Mutation { source, .. } | Self::Refresh { source, .. } => Some(source),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_classification() {
        assert!(BackendError::Timeout.is_transient());
        assert!(BackendError::Transport("reset".into()).is_transient());
        assert!(BackendError::Status {
            code: 503,
            message: "busy".into()
        }
        .is_transient());
        assert!(!BackendError::Rejected("no".into()).is_transient());

        assert!(BackendError::not_found("station", "ST1").is_not_found());
        assert!(BackendError::Status {
            code: 404,
            message: String::new()
        }
        .is_not_found());
    }

    #[test]
    fn coordinator_error_display() {
        let err = CoordinatorError::mutation(MutationKind::AddStaff, BackendError::Timeout);
        assert_eq!(err.to_string(), "add staff failed: remote call timed out");

        let err = CoordinatorError::from(ValidationError::MissingStationId);
        assert!(err.to_string().contains("no station selected"));
    }

    #[test]
    fn coordinator_error_classification() {
        let validation = CoordinatorError::from(ValidationError::MissingStaffId);
        assert!(validation.is_validation());
        assert!(!validation.mutation_applied());
        assert!(validation.backend_error().is_none());

        let refresh = CoordinatorError::refresh(
            RefreshStage::Detail,
            Some("ST1"),
            BackendError::Timeout,
        );
        assert!(refresh.mutation_applied());
        assert_eq!(refresh.backend_error(), Some(&BackendError::Timeout));
    }
}
