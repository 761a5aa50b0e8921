//! # driftgate-core: data validation gate for a batch training pipeline
//!
//! Runs four stages in order, each producing a typed artifact for the next:
//! ingestion, validation, transformation, and training. Validation checks the
//! train/test split against a YAML schema manifest and compares every numeric
//! column with a two-sample Kolmogorov–Smirnov test.
//!
//! Ingestion, transformation, training, and remote sync sit behind traits in
//! [`stage`]; the crate ships a CSV splitter, command runners, and an `aws`
//! CLI sync as defaults.

// Foundation
pub mod error;
pub mod observe;
pub mod persistence;
pub mod settings;

// Data model
pub mod artifact;
pub mod config;
pub mod dataset;
pub mod schema;

// Validation
pub mod drift;
pub mod validation;

// Stages & orchestration
pub mod command;
pub mod ingestion;
pub mod pipeline;
pub mod stage;
pub mod sync;

// Re-exports
pub use artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelTrainerArtifact,
};
pub use config::TrainingPipelineConfig;
pub use drift::{DRIFT_THRESHOLD, DriftReport, ks_2samp};
pub use error::{ErrorKind, PipelineError, PipelineStage, SettingsError, StageError};
pub use observe::{PipelineObserver, TracingObserver};
pub use pipeline::{PipelineState, TrainingPipeline};
pub use settings::{PipelineSettings, SettingsOverrides, load_settings};
pub use validation::DataValidation;
