//! Error types for the driftgate pipeline.
//!
//! Errors raised inside a stage are [`StageError`]s. The orchestrator wraps
//! each one exactly once into a [`PipelineError`] that records which stage
//! failed. Callers branch on [`ErrorKind`] rather than on message text.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input file missing, unreadable, or not a delimited table.
    DataLoad,
    /// The schema manifest itself is malformed or incomplete.
    SchemaConfig,
    /// Loaded data does not satisfy the schema manifest.
    SchemaViolation,
    /// A report, table, or split could not be written.
    Persistence,
    /// Mirroring a folder to the remote store failed.
    Sync,
    /// A collaborator stage failed for a reason outside the kinds above.
    External,
}

/// Error raised from within a single pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to load dataset {path}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    #[error("schema configuration error: {message}")]
    SchemaConfig { message: String },

    #[error("{dataset} dataset violates schema: {message}")]
    SchemaViolation {
        dataset: String,
        message: String,
        missing: Vec<String>,
    },

    #[error("failed to write {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to sync {local} to {remote}: {reason}")]
    Sync {
        local: PathBuf,
        remote: String,
        reason: String,
    },

    #[error("{stage} failed: {reason}")]
    External { stage: String, reason: String },
}

impl StageError {
    pub fn data_load(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::DataLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn schema_config(message: impl Into<String>) -> Self {
        Self::SchemaConfig {
            message: message.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    pub fn external(stage: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::External {
            stage: stage.into(),
            reason: reason.to_string(),
        }
    }

    /// The tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataLoad { .. } => ErrorKind::DataLoad,
            Self::SchemaConfig { .. } => ErrorKind::SchemaConfig,
            Self::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            Self::Persistence { .. } => ErrorKind::Persistence,
            Self::Sync { .. } => ErrorKind::Sync,
            Self::External { .. } => ErrorKind::External,
        }
    }
}

/// The stage a [`PipelineError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Ingestion,
    Validation,
    Transformation,
    Training,
    Sync,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ingestion => "data ingestion",
            Self::Validation => "data validation",
            Self::Transformation => "data transformation",
            Self::Training => "model training",
            Self::Sync => "remote sync",
        };
        f.write_str(name)
    }
}

/// A stage failure annotated with the stage it came from.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: StageError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: StageError) -> Self {
        Self { stage, source }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Failure to assemble [`crate::settings::PipelineSettings`] from its layered sources.
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct SettingsError(#[from] Box<figment::Error>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        let err = StageError::data_load("/tmp/missing.csv", "not found");
        assert_eq!(err.kind(), ErrorKind::DataLoad);

        let err = StageError::schema_config("no numerical_columns");
        assert_eq!(err.kind(), ErrorKind::SchemaConfig);

        let err = StageError::persistence(
            "/tmp/report.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_pipeline_error_wraps_stage() {
        let inner = StageError::SchemaViolation {
            dataset: "test".into(),
            message: "expected 3 columns, found 2".into(),
            missing: Vec::new(),
        };
        let err = PipelineError::new(PipelineStage::Validation, inner);
        assert_eq!(err.stage(), PipelineStage::Validation);
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert_eq!(
            err.to_string(),
            "data validation stage failed: test dataset violates schema: expected 3 columns, found 2"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
