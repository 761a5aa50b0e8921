//! Seams for the collaborator stages the orchestrator drives.
//!
//! Each stage receives its own config by reference and returns the artifact
//! the next stage consumes. Validation is not a seam: the orchestrator runs
//! [`crate::validation::DataValidation`] directly.

use crate::artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelTrainerArtifact,
};
use crate::config::{DataIngestionConfig, DataTransformationConfig, ModelTrainerConfig};
use crate::error::StageError;
use std::path::Path;

/// Produces the train/test split files.
pub trait IngestionStage: Send + Sync {
    fn initiate(&self, config: &DataIngestionConfig) -> Result<DataIngestionArtifact, StageError>;
}

/// Turns validated tables into model-ready data.
pub trait TransformationStage: Send + Sync {
    fn initiate(
        &self,
        validation: &DataValidationArtifact,
        config: &DataTransformationConfig,
    ) -> Result<DataTransformationArtifact, StageError>;
}

/// Fits and saves a model.
pub trait TrainerStage: Send + Sync {
    fn initiate(
        &self,
        transformation: &DataTransformationArtifact,
        config: &ModelTrainerConfig,
    ) -> Result<ModelTrainerArtifact, StageError>;
}

/// Mirrors a local folder to a remote object store.
pub trait FolderSync: Send + Sync {
    fn sync_folder_to_s3(&self, local_folder: &Path, remote_url: &str) -> Result<(), StageError>;
}
