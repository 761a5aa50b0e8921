//! Sequential stage machine: ingestion -> validation -> transformation -> training.
//!
//! Each stage runs once per run. Its artifact is the only input the next stage
//! sees. The first error is wrapped with the failing stage and returned. No
//! later stage runs and nothing is retried. A drifted validation artifact is
//! not an error and flows into transformation unchanged.

use crate::artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelTrainerArtifact,
};
use crate::command::{CommandTrainer, CommandTransformation};
use crate::config::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelTrainerConfig,
    TrainingPipelineConfig,
};
use crate::error::{PipelineError, PipelineStage, StageError};
use crate::ingestion::CsvSplitIngestion;
use crate::observe::{PipelineObserver, default_observer};
use crate::schema::SchemaManifest;
use crate::stage::{FolderSync, IngestionStage, TrainerStage, TransformationStage};
use crate::sync::{AwsCliSync, artifact_remote_url, model_remote_url};
use crate::validation::DataValidation;
use std::sync::Arc;

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Ingestion,
    Validation,
    Transformation,
    Training,
    Done,
    Failed,
}

/// The training pipeline orchestrator.
///
/// Stages left unset run the bundled implementations, built on use with the
/// pipeline's observer.
pub struct TrainingPipeline {
    config: TrainingPipelineConfig,
    ingestion: Option<Box<dyn IngestionStage>>,
    transformation: Option<Box<dyn TransformationStage>>,
    trainer: Option<Box<dyn TrainerStage>>,
    sync: Box<dyn FolderSync>,
    schema: Option<Arc<SchemaManifest>>,
    observer: Arc<dyn PipelineObserver>,
    state: PipelineState,
}

impl TrainingPipeline {
    /// Pipeline with the bundled collaborators.
    pub fn new(config: TrainingPipelineConfig) -> Self {
        let sync = AwsCliSync::with_program(config.settings().sync.program.clone());
        Self {
            ingestion: None,
            transformation: None,
            trainer: None,
            sync: Box::new(sync),
            schema: None,
            observer: default_observer(),
            state: PipelineState::Ingestion,
            config,
        }
    }

    pub fn with_ingestion(mut self, stage: impl IngestionStage + 'static) -> Self {
        self.ingestion = Some(Box::new(stage));
        self
    }

    pub fn with_transformation(mut self, stage: impl TransformationStage + 'static) -> Self {
        self.transformation = Some(Box::new(stage));
        self
    }

    pub fn with_trainer(mut self, stage: impl TrainerStage + 'static) -> Self {
        self.trainer = Some(Box::new(stage));
        self
    }

    pub fn with_sync(mut self, sync: impl FolderSync + 'static) -> Self {
        self.sync = Box::new(sync);
        self
    }

    /// Use an already loaded manifest instead of reading the configured schema file.
    pub fn with_schema(mut self, schema: Arc<SchemaManifest>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &TrainingPipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn start_data_ingestion(&mut self) -> Result<DataIngestionArtifact, PipelineError> {
        self.enter(PipelineState::Ingestion, "data ingestion");
        let config = DataIngestionConfig::new(&self.config);
        let result = match &self.ingestion {
            Some(stage) => stage.initiate(&config),
            None => CsvSplitIngestion::new()
                .with_observer(self.observer.clone())
                .initiate(&config),
        };
        self.settle(PipelineStage::Ingestion, PipelineState::Validation, result)
    }

    pub fn start_data_validation(
        &mut self,
        ingestion: &DataIngestionArtifact,
    ) -> Result<DataValidationArtifact, PipelineError> {
        self.enter(PipelineState::Validation, "data validation");
        let result = self.validate(ingestion);
        let artifact =
            self.settle(PipelineStage::Validation, PipelineState::Transformation, result)?;
        if !artifact.validation_status() {
            self.observer.warn(&format!(
                "Validation reported drift (see {}); continuing to transformation",
                artifact.drift_report_file_path().display()
            ));
        }
        Ok(artifact)
    }

    pub fn start_data_transformation(
        &mut self,
        validation: &DataValidationArtifact,
    ) -> Result<DataTransformationArtifact, PipelineError> {
        self.enter(PipelineState::Transformation, "data transformation");
        let config = DataTransformationConfig::new(&self.config);
        let result = match &self.transformation {
            Some(stage) => stage.initiate(validation, &config),
            None => CommandTransformation::new()
                .with_observer(self.observer.clone())
                .initiate(validation, &config),
        };
        self.settle(PipelineStage::Transformation, PipelineState::Training, result)
    }

    pub fn start_model_trainer(
        &mut self,
        transformation: &DataTransformationArtifact,
    ) -> Result<ModelTrainerArtifact, PipelineError> {
        self.enter(PipelineState::Training, "model training");
        let config = ModelTrainerConfig::new(&self.config);
        let result = match &self.trainer {
            Some(stage) => stage.initiate(transformation, &config),
            None => CommandTrainer::new()
                .with_observer(self.observer.clone())
                .initiate(transformation, &config),
        };
        self.settle(PipelineStage::Training, PipelineState::Done, result)
    }

    /// Mirror the artifact and model directories, keyed by the run timestamp.
    pub fn sync_outputs(&mut self) -> Result<(), PipelineError> {
        let result = self.mirror();
        let state = self.state;
        self.settle(PipelineStage::Sync, state, result)
    }

    /// Run every stage in order, then sync if enabled.
    ///
    /// Consumes the pipeline: a run context serves exactly one run.
    pub fn run_pipeline(mut self) -> Result<ModelTrainerArtifact, PipelineError> {
        let ingestion = self.start_data_ingestion()?;
        let validation = self.start_data_validation(&ingestion)?;
        let transformation = self.start_data_transformation(&validation)?;
        let model = self.start_model_trainer(&transformation)?;

        if self.config.settings().sync.enabled {
            self.sync_outputs()?;
        }
        self.observer.info(&format!(
            "Pipeline '{}' finished: {model:?}",
            self.config.pipeline_name()
        ));
        Ok(model)
    }

    fn validate(
        &self,
        ingestion: &DataIngestionArtifact,
    ) -> Result<DataValidationArtifact, StageError> {
        let config = DataValidationConfig::new(&self.config);
        let schema = match &self.schema {
            Some(schema) => schema.clone(),
            None => Arc::new(SchemaManifest::load(&config.schema_file_path)?),
        };
        DataValidation::with_schema(ingestion.clone(), config, schema)
            .with_observer(self.observer.clone())
            .initiate_data_validation()
    }

    fn mirror(&self) -> Result<(), StageError> {
        let sync = &self.config.settings().sync;
        let timestamp = self.config.timestamp();
        if sync.bucket.is_empty() {
            return Err(StageError::Sync {
                local: self.config.artifact_dir().to_path_buf(),
                remote: String::new(),
                reason: "sync is enabled but no bucket is configured".to_string(),
            });
        }

        let artifact_url = artifact_remote_url(&sync.bucket, timestamp);
        self.observer.info(&format!("Syncing artifacts to {artifact_url}"));
        self.sync.sync_folder_to_s3(self.config.artifact_dir(), &artifact_url)?;

        let model_url = model_remote_url(&sync.bucket, timestamp);
        self.observer.info(&format!("Syncing model to {model_url}"));
        self.sync.sync_folder_to_s3(self.config.model_dir(), &model_url)
    }

    fn enter(&mut self, state: PipelineState, label: &str) {
        self.state = state;
        self.observer.info(&format!("Starting {label}"));
    }

    fn settle<T: std::fmt::Debug>(
        &mut self,
        stage: PipelineStage,
        next: PipelineState,
        result: Result<T, StageError>,
    ) -> Result<T, PipelineError> {
        match result {
            Ok(value) => {
                self.state = next;
                self.observer.info(&format!("Completed {stage}: {value:?}"));
                Ok(value)
            }
            Err(source) => {
                self.state = PipelineState::Failed;
                let err = PipelineError::new(stage, source);
                self.observer.error(&err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::settings::PipelineSettings;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl PipelineObserver for RecordingObserver {
        fn info(&self, message: &str) {
            self.events.lock().unwrap().push(message.to_string());
        }

        fn warn(&self, message: &str) {
            self.events.lock().unwrap().push(message.to_string());
        }

        fn error(&self, message: &str) {
            self.events.lock().unwrap().push(message.to_string());
        }
    }

    struct FailingIngestion;

    impl IngestionStage for FailingIngestion {
        fn initiate(
            &self,
            config: &DataIngestionConfig,
        ) -> Result<DataIngestionArtifact, StageError> {
            Err(StageError::data_load(&config.source_file_path, "unreachable"))
        }
    }

    #[test]
    fn test_failure_sets_failed_state() {
        let config = TrainingPipelineConfig::with_timestamp(PipelineSettings::default(), "t");
        let mut pipeline = TrainingPipeline::new(config).with_ingestion(FailingIngestion);
        assert_eq!(pipeline.state(), PipelineState::Ingestion);

        let err = pipeline.start_data_ingestion().unwrap_err();
        assert_eq!(err.stage(), PipelineStage::Ingestion);
        assert_eq!(err.kind(), ErrorKind::DataLoad);
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }

    #[test]
    fn test_sync_without_bucket_fails() {
        let config = TrainingPipelineConfig::with_timestamp(PipelineSettings::default(), "t");
        let mut pipeline = TrainingPipeline::new(config);
        let err = pipeline.sync_outputs().unwrap_err();
        assert_eq!(err.stage(), PipelineStage::Sync);
        assert_eq!(err.kind(), ErrorKind::Sync);
        assert_eq!(pipeline.config().artifact_dir(), Path::new("Artifacts/t"));
    }

    #[test]
    fn test_observer_reaches_bundled_ingestion() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.csv");
        std::fs::write(&source, "_id,a\nx0,1\nx1,2\nx2,3\nx3,4\nx4,5\n").unwrap();
        let mut settings = PipelineSettings {
            artifact_root: dir.path().join("Artifacts"),
            ..PipelineSettings::default()
        };
        settings.ingestion.source_file = source;

        let observer = Arc::new(RecordingObserver::default());
        let mut pipeline =
            TrainingPipeline::new(TrainingPipelineConfig::with_timestamp(settings, "t"))
                .with_observer(observer.clone());
        pipeline.start_data_ingestion().unwrap();

        let events = observer.events.lock().unwrap();
        assert!(events.iter().any(|e| e.starts_with("Read 5 rows x 1 columns")));
        assert!(events.iter().any(|e| e.starts_with("Exported 4 train rows")));
    }
}
