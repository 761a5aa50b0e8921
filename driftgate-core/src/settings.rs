//! Layered settings for a pipeline run.
//!
//! Uses `figment`: defaults -> config file -> environment -> explicit overrides.
//! The config file is `driftgate.toml` in the workspace unless one is given
//! explicitly.

use crate::error::SettingsError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the workspace-level config file.
pub const CONFIG_FILE_NAME: &str = "driftgate.toml";

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Name recorded in the run context.
    pub pipeline_name: String,
    /// Root under which each run gets a timestamped artifact directory.
    pub artifact_root: PathBuf,
    /// Schema manifest consulted by validation.
    pub schema_file: PathBuf,
    /// Directory the trained model is published to.
    pub model_dir: PathBuf,
    pub ingestion: IngestionSettings,
    pub transformation: CommandSettings,
    pub trainer: CommandSettings,
    pub sync: SyncSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            pipeline_name: "driftgate".to_string(),
            artifact_root: PathBuf::from("Artifacts"),
            schema_file: PathBuf::from("data_schema/schema.yaml"),
            model_dir: PathBuf::from("final_model"),
            ingestion: IngestionSettings::default(),
            transformation: CommandSettings::default(),
            trainer: CommandSettings::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Resolve every relative path against `workspace`.
    pub fn resolve_paths(mut self, workspace: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = workspace.join(&*p);
            }
        };
        resolve(&mut self.artifact_root);
        resolve(&mut self.schema_file);
        resolve(&mut self.model_dir);
        resolve(&mut self.ingestion.source_file);
        self
    }
}

/// Settings for the CSV-splitting ingestion stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Source table that is split into train and test.
    pub source_file: PathBuf,
    /// Fraction of rows assigned to the test split.
    pub test_ratio: f64,
    /// Seed for the row shuffle.
    pub seed: u64,
    /// Columns dropped from the source before splitting.
    pub drop_columns: Vec<String>,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            source_file: PathBuf::from("data/source.csv"),
            test_ratio: 0.2,
            seed: 42,
            drop_columns: vec!["_id".to_string()],
        }
    }
}

/// An external program that implements a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub program: Option<String>,
    pub args: Vec<String>,
}

/// Remote mirroring of run outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub enabled: bool,
    /// Bucket name, without the `s3://` scheme.
    pub bucket: String,
    /// Executable used by the CLI-backed syncer.
    pub program: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            program: "aws".to_string(),
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers intact.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncOverrides>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Load settings from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides
/// 2. Environment variables (`DRIFTGATE_SYNC__ENABLED`, `DRIFTGATE_SCHEMA_FILE`, ...)
/// 3. `config_file` if given, otherwise `<workspace>/driftgate.toml`
/// 4. Built-in defaults
pub fn load_settings(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&SettingsOverrides>,
) -> Result<PipelineSettings, SettingsError> {
    let mut figment = Figment::from(Serialized::defaults(PipelineSettings::default()));

    match (config_file, workspace) {
        (Some(file), _) => {
            figment = figment.merge(Toml::file(file));
        }
        (None, Some(ws)) => {
            let ws_config = ws.join(CONFIG_FILE_NAME);
            if ws_config.exists() {
                figment = figment.merge(Toml::file(&ws_config));
            }
        }
        (None, None) => {}
    }

    figment = figment.merge(Env::prefixed("DRIFTGATE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| SettingsError::from(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_sources() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(Some(dir.path()), None, None).unwrap();
        assert!(!settings.sync.enabled);
        assert_eq!(settings.ingestion.test_ratio, 0.2);
        assert_eq!(settings.schema_file, PathBuf::from("data_schema/schema.yaml"));
    }

    #[test]
    fn test_workspace_file_and_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "artifact_root = \"runs\"\n\n[sync]\nbucket = \"training-bucket\"\n\n[trainer]\nprogram = \"python3\"\nargs = [\"train.py\"]\n",
        )
        .unwrap();

        let overrides = SettingsOverrides {
            sync: Some(SyncOverrides {
                enabled: Some(true),
            }),
            ..Default::default()
        };
        let settings = load_settings(Some(dir.path()), None, Some(&overrides)).unwrap();
        assert_eq!(settings.artifact_root, PathBuf::from("runs"));
        assert_eq!(settings.sync.bucket, "training-bucket");
        assert!(settings.sync.enabled);
        assert_eq!(settings.sync.program, "aws");
        assert_eq!(settings.trainer.program.as_deref(), Some("python3"));
        assert_eq!(settings.trainer.args, vec!["train.py".to_string()]);
    }

    #[test]
    fn test_resolve_paths() {
        let settings = PipelineSettings::default().resolve_paths(Path::new("/srv/ws"));
        assert_eq!(settings.artifact_root, PathBuf::from("/srv/ws/Artifacts"));
        assert_eq!(
            settings.schema_file,
            PathBuf::from("/srv/ws/data_schema/schema.yaml")
        );
    }
}
