//! CLI subcommand handlers.

use crate::Commands;
use driftgate_core::artifact::DataValidationArtifact;
use driftgate_core::config::DataValidationConfig;
use driftgate_core::schema::SchemaManifest;
use driftgate_core::{
    DataIngestionArtifact, DataValidation, PipelineSettings, TrainingPipeline,
    TrainingPipelineConfig, load_settings,
};
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run => handle_run(workspace, config_file),
        Commands::Validate {
            train,
            test,
            output,
        } => handle_validate(workspace, config_file, train, test, output),
        Commands::Schema { path } => handle_schema(&path),
    }
}

fn settings(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<PipelineSettings> {
    let settings = load_settings(Some(workspace), config_file, None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    Ok(settings.resolve_paths(workspace))
}

fn handle_run(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<()> {
    let settings = settings(workspace, config_file)?;
    let config = TrainingPipelineConfig::new(settings);
    tracing::info!(artifact_dir = %config.artifact_dir().display(), "Starting pipeline run");

    let model = TrainingPipeline::new(config).run_pipeline()?;
    println!("{}", serde_json::to_string_pretty(&model)?);
    Ok(())
}

fn handle_validate(
    workspace: &Path,
    config_file: Option<&Path>,
    train: PathBuf,
    test: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let settings = settings(workspace, config_file)?;
    let artifact = validate_split(settings, train, test, output)?;
    if !artifact.validation_status() {
        tracing::warn!(
            report = %artifact.drift_report_file_path().display(),
            "Drift detected"
        );
    }
    println!("{}", serde_json::to_string_pretty(&artifact)?);
    Ok(())
}

fn validate_split(
    settings: PipelineSettings,
    train: PathBuf,
    test: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<DataValidationArtifact> {
    let config = match output {
        Some(dir) => {
            let mut config = DataValidationConfig::under(dir.join("data_validation"));
            config.schema_file_path = settings.schema_file.clone();
            config
        }
        None => DataValidationConfig::new(&TrainingPipelineConfig::new(settings)),
    };
    let ingestion = DataIngestionArtifact::new(train, test);
    Ok(DataValidation::new(ingestion, config)?.initiate_data_validation()?)
}

fn handle_schema(path: &Path) -> anyhow::Result<()> {
    let manifest = SchemaManifest::load(path)?;
    let numeric = manifest.required_numeric()?;
    let summary = serde_json::json!({
        "columns": manifest.column_count(),
        "numerical_columns": numeric,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
