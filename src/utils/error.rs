use thiserror::Error;

use crate::domain::model::JobStatus;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    #[error("Schema conflict at column '{path}': {message}")]
    SchemaConflict { path: String, message: String },

    #[error("Transient I/O failure: {message}")]
    TransientIo { message: String },

    #[error("Input not found: {location}")]
    InputNotFound { location: String },

    #[error("Job '{reference_id}' already exists")]
    DuplicateJob { reference_id: String },

    #[error("Job '{reference_id}' not found")]
    JobNotFound { reference_id: String },

    #[error("Job '{reference_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        reference_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidConfigValue { field: String, reason: String },

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Whether the coordinator is allowed to retry the failed call. Everything
    /// except a transient collaborator failure surfaces immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::TransientIo { .. })
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        PipelineError::MalformedInput {
            message: message.into(),
        }
    }

    pub fn schema_conflict(path: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::SchemaConflict {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        PipelineError::TransientIo {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
