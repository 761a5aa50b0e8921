//! Immutable records handed from one pipeline stage to the next.
//!
//! Fields are private and there are no setters; once a stage returns an
//! artifact, downstream stages can only read it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output of ingestion: the two split files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    trained_file_path: PathBuf,
    test_file_path: PathBuf,
}

impl DataIngestionArtifact {
    pub fn new(trained_file_path: impl Into<PathBuf>, test_file_path: impl Into<PathBuf>) -> Self {
        Self {
            trained_file_path: trained_file_path.into(),
            test_file_path: test_file_path.into(),
        }
    }

    pub fn trained_file_path(&self) -> &Path {
        &self.trained_file_path
    }

    pub fn test_file_path(&self) -> &Path {
        &self.test_file_path
    }
}

/// Output of validation.
///
/// Only built after both schema checks pass, so the valid paths are always
/// populated. `validation_status` summarizes drift only. The invalid paths
/// are never populated by this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    validation_status: bool,
    valid_train_file_path: PathBuf,
    valid_test_file_path: PathBuf,
    invalid_train_file_path: Option<PathBuf>,
    invalid_test_file_path: Option<PathBuf>,
    drift_report_file_path: PathBuf,
}

impl DataValidationArtifact {
    pub fn new(
        validation_status: bool,
        valid_train_file_path: impl Into<PathBuf>,
        valid_test_file_path: impl Into<PathBuf>,
        drift_report_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            validation_status,
            valid_train_file_path: valid_train_file_path.into(),
            valid_test_file_path: valid_test_file_path.into(),
            invalid_train_file_path: None,
            invalid_test_file_path: None,
            drift_report_file_path: drift_report_file_path.into(),
        }
    }

    pub fn validation_status(&self) -> bool {
        self.validation_status
    }

    pub fn valid_train_file_path(&self) -> &Path {
        &self.valid_train_file_path
    }

    pub fn valid_test_file_path(&self) -> &Path {
        &self.valid_test_file_path
    }

    pub fn invalid_train_file_path(&self) -> Option<&Path> {
        self.invalid_train_file_path.as_deref()
    }

    pub fn invalid_test_file_path(&self) -> Option<&Path> {
        self.invalid_test_file_path.as_deref()
    }

    pub fn drift_report_file_path(&self) -> &Path {
        &self.drift_report_file_path
    }
}

/// Output of transformation. The orchestrator passes it through unopened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    transformed_object_file_path: PathBuf,
    transformed_train_file_path: PathBuf,
    transformed_test_file_path: PathBuf,
}

impl DataTransformationArtifact {
    pub fn new(
        transformed_object_file_path: impl Into<PathBuf>,
        transformed_train_file_path: impl Into<PathBuf>,
        transformed_test_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transformed_object_file_path: transformed_object_file_path.into(),
            transformed_train_file_path: transformed_train_file_path.into(),
            transformed_test_file_path: transformed_test_file_path.into(),
        }
    }

    pub fn transformed_object_file_path(&self) -> &Path {
        &self.transformed_object_file_path
    }

    pub fn transformed_train_file_path(&self) -> &Path {
        &self.transformed_train_file_path
    }

    pub fn transformed_test_file_path(&self) -> &Path {
        &self.transformed_test_file_path
    }
}

/// Output of training and the pipeline's final result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    trained_model_file_path: PathBuf,
}

impl ModelTrainerArtifact {
    pub fn new(trained_model_file_path: impl Into<PathBuf>) -> Self {
        Self {
            trained_model_file_path: trained_model_file_path.into(),
        }
    }

    pub fn trained_model_file_path(&self) -> &Path {
        &self.trained_model_file_path
    }
}
