//! Run context and the per-stage configs derived from it.
//!
//! A [`TrainingPipelineConfig`] is built once per pipeline run. Every stage
//! config takes its paths from that context, so two runs with different
//! timestamps never share an output location.

use crate::settings::{CommandSettings, PipelineSettings};
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Format of the per-run timestamp embedded in artifact and remote paths.
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

const DATA_INGESTION_DIR: &str = "data_ingestion";
const FEATURE_STORE_DIR: &str = "feature_store";
const INGESTED_DIR: &str = "ingested";
const TRAIN_FILE_NAME: &str = "train.csv";
const TEST_FILE_NAME: &str = "test.csv";

const DATA_VALIDATION_DIR: &str = "data_validation";
const VALID_DIR: &str = "validated";
const INVALID_DIR: &str = "invalid";
const DRIFT_REPORT_DIR: &str = "drift_report";
const DRIFT_REPORT_FILE_NAME: &str = "report.yaml";

const DATA_TRANSFORMATION_DIR: &str = "data_transformation";
const TRANSFORMED_DATA_DIR: &str = "transformed";
const TRANSFORMED_OBJECT_DIR: &str = "transformed_object";
const TRANSFORMED_TRAIN_FILE_NAME: &str = "train.npy";
const TRANSFORMED_TEST_FILE_NAME: &str = "test.npy";
const PREPROCESSOR_FILE_NAME: &str = "preprocessing.pkl";

const MODEL_TRAINER_DIR: &str = "model_trainer";
const TRAINED_MODEL_DIR: &str = "trained_model";
const MODEL_FILE_NAME: &str = "model.pkl";

/// Immutable context for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPipelineConfig {
    timestamp: String,
    artifact_dir: PathBuf,
    settings: PipelineSettings,
}

impl TrainingPipelineConfig {
    /// Context stamped with the current local time.
    pub fn new(settings: PipelineSettings) -> Self {
        Self::at(settings, Local::now())
    }

    pub fn at(settings: PipelineSettings, when: DateTime<Local>) -> Self {
        Self::with_timestamp(settings, when.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn with_timestamp(settings: PipelineSettings, timestamp: impl Into<String>) -> Self {
        let timestamp = timestamp.into();
        let artifact_dir = settings.artifact_root.join(&timestamp);
        Self {
            timestamp,
            artifact_dir,
            settings,
        }
    }

    pub fn pipeline_name(&self) -> &str {
        &self.settings.pipeline_name
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// `<artifact_root>/<timestamp>`
    pub fn artifact_dir(&self) -> &std::path::Path {
        &self.artifact_dir
    }

    pub fn model_dir(&self) -> &std::path::Path {
        &self.settings.model_dir
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }
}

/// Paths and parameters for ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    pub data_ingestion_dir: PathBuf,
    pub source_file_path: PathBuf,
    pub feature_store_file_path: PathBuf,
    pub training_file_path: PathBuf,
    pub testing_file_path: PathBuf,
    pub train_test_split_ratio: f64,
    pub seed: u64,
    pub drop_columns: Vec<String>,
}

impl DataIngestionConfig {
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let ingestion = &pipeline.settings().ingestion;
        let data_ingestion_dir = pipeline.artifact_dir().join(DATA_INGESTION_DIR);
        let feature_store_name = ingestion
            .source_file
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("source.csv"));
        Self {
            source_file_path: ingestion.source_file.clone(),
            feature_store_file_path: data_ingestion_dir
                .join(FEATURE_STORE_DIR)
                .join(feature_store_name),
            training_file_path: data_ingestion_dir.join(INGESTED_DIR).join(TRAIN_FILE_NAME),
            testing_file_path: data_ingestion_dir.join(INGESTED_DIR).join(TEST_FILE_NAME),
            train_test_split_ratio: ingestion.test_ratio,
            seed: ingestion.seed,
            drop_columns: ingestion.drop_columns.clone(),
            data_ingestion_dir,
        }
    }
}

/// Paths for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataValidationConfig {
    pub data_validation_dir: PathBuf,
    pub valid_data_dir: PathBuf,
    pub invalid_data_dir: PathBuf,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub invalid_train_file_path: PathBuf,
    pub invalid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub schema_file_path: PathBuf,
}

impl DataValidationConfig {
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let mut config = Self::under(pipeline.artifact_dir().join(DATA_VALIDATION_DIR));
        config.schema_file_path = pipeline.settings().schema_file.clone();
        config
    }

    /// Standard layout rooted at `data_validation_dir`, using the default schema location.
    pub fn under(data_validation_dir: PathBuf) -> Self {
        let valid_data_dir = data_validation_dir.join(VALID_DIR);
        let invalid_data_dir = data_validation_dir.join(INVALID_DIR);
        Self {
            valid_train_file_path: valid_data_dir.join(TRAIN_FILE_NAME),
            valid_test_file_path: valid_data_dir.join(TEST_FILE_NAME),
            invalid_train_file_path: invalid_data_dir.join(TRAIN_FILE_NAME),
            invalid_test_file_path: invalid_data_dir.join(TEST_FILE_NAME),
            drift_report_file_path: data_validation_dir
                .join(DRIFT_REPORT_DIR)
                .join(DRIFT_REPORT_FILE_NAME),
            schema_file_path: PipelineSettings::default().schema_file,
            valid_data_dir,
            invalid_data_dir,
            data_validation_dir,
        }
    }
}

/// Paths and command for transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTransformationConfig {
    pub data_transformation_dir: PathBuf,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub transformed_object_file_path: PathBuf,
    pub command: CommandSettings,
}

impl DataTransformationConfig {
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let data_transformation_dir = pipeline.artifact_dir().join(DATA_TRANSFORMATION_DIR);
        let data_dir = data_transformation_dir.join(TRANSFORMED_DATA_DIR);
        Self {
            transformed_train_file_path: data_dir.join(TRANSFORMED_TRAIN_FILE_NAME),
            transformed_test_file_path: data_dir.join(TRANSFORMED_TEST_FILE_NAME),
            transformed_object_file_path: data_transformation_dir
                .join(TRANSFORMED_OBJECT_DIR)
                .join(PREPROCESSOR_FILE_NAME),
            command: pipeline.settings().transformation.clone(),
            data_transformation_dir,
        }
    }
}

/// Paths and command for training.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTrainerConfig {
    pub model_trainer_dir: PathBuf,
    pub trained_model_file_path: PathBuf,
    pub final_model_dir: PathBuf,
    pub command: CommandSettings,
}

impl ModelTrainerConfig {
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let model_trainer_dir = pipeline.artifact_dir().join(MODEL_TRAINER_DIR);
        Self {
            trained_model_file_path: model_trainer_dir
                .join(TRAINED_MODEL_DIR)
                .join(MODEL_FILE_NAME),
            final_model_dir: pipeline.model_dir().to_path_buf(),
            command: pipeline.settings().trainer.clone(),
            model_trainer_dir,
        }
    }
}
