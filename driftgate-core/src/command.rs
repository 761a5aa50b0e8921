//! Transformation and training delegated to external programs.
//!
//! The program receives its inputs and expected outputs as `DRIFTGATE_*`
//! environment variables and must create every expected output file.

use crate::artifact::{DataTransformationArtifact, DataValidationArtifact, ModelTrainerArtifact};
use crate::config::{DataTransformationConfig, ModelTrainerConfig};
use crate::error::StageError;
use crate::observe::{PipelineObserver, default_observer};
use crate::settings::CommandSettings;
use crate::stage::{TrainerStage, TransformationStage};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Runs the configured transformation program.
pub struct CommandTransformation {
    observer: Arc<dyn PipelineObserver>,
}

impl CommandTransformation {
    pub fn new() -> Self {
        Self {
            observer: default_observer(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl Default for CommandTransformation {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformationStage for CommandTransformation {
    fn initiate(
        &self,
        validation: &DataValidationArtifact,
        config: &DataTransformationConfig,
    ) -> Result<DataTransformationArtifact, StageError> {
        let outputs = [
            (
                "DRIFTGATE_TRANSFORMED_TRAIN_FILE",
                config.transformed_train_file_path.as_path(),
            ),
            (
                "DRIFTGATE_TRANSFORMED_TEST_FILE",
                config.transformed_test_file_path.as_path(),
            ),
            (
                "DRIFTGATE_TRANSFORMED_OBJECT_FILE",
                config.transformed_object_file_path.as_path(),
            ),
        ];
        let status = if validation.validation_status() {
            "true"
        } else {
            "false"
        };
        let mut env: Vec<(&str, OsString)> = vec![
            ("DRIFTGATE_VALIDATION_STATUS", status.into()),
            (
                "DRIFTGATE_VALID_TRAIN_FILE",
                validation.valid_train_file_path().into(),
            ),
            (
                "DRIFTGATE_VALID_TEST_FILE",
                validation.valid_test_file_path().into(),
            ),
            (
                "DRIFTGATE_DRIFT_REPORT_FILE",
                validation.drift_report_file_path().into(),
            ),
        ];
        env.extend(outputs.iter().map(|(k, p)| (*k, OsString::from(*p))));

        run_stage_command(
            "data transformation",
            &config.command,
            &env,
            &outputs.map(|(_, p)| p),
            self.observer.as_ref(),
        )?;

        Ok(DataTransformationArtifact::new(
            &config.transformed_object_file_path,
            &config.transformed_train_file_path,
            &config.transformed_test_file_path,
        ))
    }
}

/// Runs the configured training program.
pub struct CommandTrainer {
    observer: Arc<dyn PipelineObserver>,
}

impl CommandTrainer {
    pub fn new() -> Self {
        Self {
            observer: default_observer(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl Default for CommandTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainerStage for CommandTrainer {
    fn initiate(
        &self,
        transformation: &DataTransformationArtifact,
        config: &ModelTrainerConfig,
    ) -> Result<ModelTrainerArtifact, StageError> {
        let env: Vec<(&str, OsString)> = vec![
            (
                "DRIFTGATE_TRANSFORMED_TRAIN_FILE",
                transformation.transformed_train_file_path().into(),
            ),
            (
                "DRIFTGATE_TRANSFORMED_TEST_FILE",
                transformation.transformed_test_file_path().into(),
            ),
            (
                "DRIFTGATE_TRANSFORMED_OBJECT_FILE",
                transformation.transformed_object_file_path().into(),
            ),
            (
                "DRIFTGATE_TRAINED_MODEL_FILE",
                config.trained_model_file_path.as_os_str().to_owned(),
            ),
            (
                "DRIFTGATE_FINAL_MODEL_DIR",
                config.final_model_dir.as_os_str().to_owned(),
            ),
        ];

        std::fs::create_dir_all(&config.final_model_dir)
            .map_err(|e| StageError::persistence(&config.final_model_dir, e))?;
        run_stage_command(
            "model training",
            &config.command,
            &env,
            &[config.trained_model_file_path.as_path()],
            self.observer.as_ref(),
        )?;

        Ok(ModelTrainerArtifact::new(&config.trained_model_file_path))
    }
}

fn run_stage_command(
    stage: &str,
    settings: &CommandSettings,
    env: &[(&str, OsString)],
    outputs: &[&Path],
    observer: &dyn PipelineObserver,
) -> Result<(), StageError> {
    let program = settings
        .program
        .as_deref()
        .ok_or_else(|| StageError::external(stage, "no program configured"))?;

    for output in outputs {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StageError::persistence(parent, e))?;
        }
    }

    observer.info(&format!("Running {stage} program: {program} {:?}", settings.args));
    let output = Command::new(program)
        .args(&settings.args)
        .envs(env.iter().map(|(k, v)| (*k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| StageError::external(stage, format!("failed to spawn {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StageError::external(
            stage,
            format!("{program} exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    if let Some(missing) = outputs.iter().find(|p| !p.exists()) {
        return Err(StageError::external(
            stage,
            format!("{program} did not produce {}", missing.display()),
        ));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::TrainingPipelineConfig;
    use crate::error::ErrorKind;
    use crate::settings::PipelineSettings;
    use tempfile::TempDir;

    fn shell(script: &str) -> CommandSettings {
        CommandSettings {
            program: Some("sh".to_string()),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn pipeline(
        dir: &Path,
        transform: CommandSettings,
        trainer: CommandSettings,
    ) -> TrainingPipelineConfig {
        let settings = PipelineSettings {
            artifact_root: dir.join("Artifacts"),
            model_dir: dir.join("final_model"),
            transformation: transform,
            trainer,
            ..PipelineSettings::default()
        };
        TrainingPipelineConfig::with_timestamp(settings, "run")
    }

    #[test]
    fn test_transformation_receives_paths_and_status() {
        let dir = TempDir::new().unwrap();
        let config = pipeline(
            dir.path(),
            shell(
                "printf %s \"$DRIFTGATE_VALIDATION_STATUS\" > \"$DRIFTGATE_TRANSFORMED_TRAIN_FILE\" \
                 && cp \"$DRIFTGATE_VALID_TEST_FILE\" \"$DRIFTGATE_TRANSFORMED_TEST_FILE\" \
                 && touch \"$DRIFTGATE_TRANSFORMED_OBJECT_FILE\"",
            ),
            CommandSettings::default(),
        );
        let valid_test = dir.path().join("valid_test.csv");
        std::fs::write(&valid_test, "a\n1\n").unwrap();
        let validation = DataValidationArtifact::new(
            false,
            dir.path().join("valid_train.csv"),
            &valid_test,
            dir.path().join("report.yaml"),
        );

        let transform_config = DataTransformationConfig::new(&config);
        let artifact = CommandTransformation::new()
            .initiate(&validation, &transform_config)
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(artifact.transformed_train_file_path()).unwrap(),
            "false"
        );
        assert_eq!(
            std::fs::read_to_string(artifact.transformed_test_file_path()).unwrap(),
            "a\n1\n"
        );
    }

    #[test]
    fn test_trainer_failure_is_external() {
        let dir = TempDir::new().unwrap();
        let config = pipeline(
            dir.path(),
            CommandSettings::default(),
            shell("echo boom >&2; exit 3"),
        );
        let transformation = DataTransformationArtifact::new("o", "tr", "te");
        let err = CommandTrainer::new()
            .initiate(&transformation, &ModelTrainerConfig::new(&config))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::External);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_missing_output_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = pipeline(dir.path(), CommandSettings::default(), shell("true"));
        let transformation = DataTransformationArtifact::new("o", "tr", "te");
        let err = CommandTrainer::new()
            .initiate(&transformation, &ModelTrainerConfig::new(&config))
            .unwrap_err();
        assert!(err.to_string().contains("did not produce"));
    }

    #[test]
    fn test_unconfigured_program() {
        let dir = TempDir::new().unwrap();
        let config = pipeline(dir.path(), CommandSettings::default(), CommandSettings::default());
        let transformation = DataTransformationArtifact::new("o", "tr", "te");
        let err = CommandTrainer::new()
            .initiate(&transformation, &ModelTrainerConfig::new(&config))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::External);
    }
}
