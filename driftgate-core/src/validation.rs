//! Schema conformance and drift checks over the train/test split.
//!
//! [`DataValidation::initiate_data_validation`] runs the checks in a fixed
//! order: load, column count, numeric-column presence, drift. The first schema
//! failure aborts the run. Drift is a normal outcome recorded in the artifact
//! status, never an error.

use crate::artifact::{DataIngestionArtifact, DataValidationArtifact};
use crate::config::DataValidationConfig;
use crate::dataset::Dataset;
use crate::drift::{ColumnDrift, DRIFT_THRESHOLD, DriftReport, ks_2samp};
use crate::error::StageError;
use crate::observe::{PipelineObserver, default_observer};
use crate::persistence;
use crate::schema::SchemaManifest;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Outcome of the numeric-column presence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericPresence {
    missing: BTreeSet<String>,
}

impl NumericPresence {
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }

    /// Required numeric columns absent from the table or not numeric-typed.
    pub fn missing(&self) -> &BTreeSet<String> {
        &self.missing
    }
}

/// The validation stage.
pub struct DataValidation {
    ingestion_artifact: DataIngestionArtifact,
    config: DataValidationConfig,
    schema: Arc<SchemaManifest>,
    threshold: f64,
    observer: Arc<dyn PipelineObserver>,
}

impl DataValidation {
    /// Build the stage, loading the schema manifest named by `config`.
    pub fn new(
        ingestion_artifact: DataIngestionArtifact,
        config: DataValidationConfig,
    ) -> Result<Self, StageError> {
        let schema = SchemaManifest::load(&config.schema_file_path)?;
        Ok(Self::with_schema(
            ingestion_artifact,
            config,
            Arc::new(schema),
        ))
    }

    /// Build the stage around an already loaded manifest.
    pub fn with_schema(
        ingestion_artifact: DataIngestionArtifact,
        config: DataValidationConfig,
        schema: Arc<SchemaManifest>,
    ) -> Self {
        Self {
            ingestion_artifact,
            config,
            schema,
            threshold: DRIFT_THRESHOLD,
            observer: default_observer(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Override the significance level. The pipeline always uses [`DRIFT_THRESHOLD`].
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn schema(&self) -> &SchemaManifest {
        &self.schema
    }

    pub fn read_data(path: &Path) -> Result<Dataset, StageError> {
        Dataset::from_csv(path)
    }

    /// Cardinality check only: names and order are not compared.
    pub fn validate_number_of_columns(&self, dataset: &Dataset) -> bool {
        let required = self.schema.column_count();
        self.observer.info(&format!("Required number of columns: {required}"));
        self.observer.info(&format!("Dataset has columns: {:?}", dataset.column_names()));
        if dataset.column_count() == required {
            self.observer.info("Number of columns validation passed");
            true
        } else {
            self.observer.error("Number of columns validation failed");
            false
        }
    }

    /// Check that every declared numeric column is present and numeric-typed.
    pub fn is_numerical_columns_exist(
        &self,
        dataset: &Dataset,
    ) -> Result<NumericPresence, StageError> {
        let required = self.schema.required_numeric().inspect_err(|_| {
            self.observer.error("'numerical_columns' key not found in schema manifest");
        })?;
        let present = dataset.numeric_column_names();

        let missing: BTreeSet<String> = required
            .difference(&present)
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            self.observer.info("Numerical columns validation passed");
        } else {
            self.observer.error(&format!("Missing numerical columns: {missing:?}"));
        }
        Ok(NumericPresence { missing })
    }

    /// Compare every numeric column of `base` with the same column of `current`.
    ///
    /// Missing cells are dropped from each series independently, so the two
    /// samples may differ in length. Columns that are not numeric in both
    /// tables, or that have no values left on either side, get no entry.
    pub fn drift_report(&self, base: &Dataset, current: &Dataset) -> DriftReport {
        let mut report = DriftReport::new();
        for column in base.numeric_columns() {
            let name = column.name.as_str();
            let Some(reference) = column.numeric_non_missing() else {
                continue;
            };
            let Some(observed) = current.column(name).and_then(|c| c.numeric_non_missing()) else {
                self.observer.warn(&format!(
                    "Column '{name}' is not numeric in the comparison dataset; skipping drift test"
                ));
                continue;
            };
            let Some(result) = ks_2samp(&reference, &observed) else {
                self.observer.warn(&format!(
                    "Column '{name}' has no values on one side; skipping drift test"
                ));
                continue;
            };

            let verdict = ColumnDrift::from_p_value(result.p_value, self.threshold);
            if verdict.drift_status {
                self.observer.warn(&format!(
                    "Drift in column '{name}': p_value={:.6}",
                    verdict.p_value
                ));
            }
            report.insert(name, verdict);
        }
        report
    }

    /// Compute the drift report, persist it, and return the overall status.
    ///
    /// `true` means no column drifted.
    pub fn detect_dataset_drift(
        &self,
        base: &Dataset,
        current: &Dataset,
    ) -> Result<bool, StageError> {
        let report = self.drift_report(base, current);
        persistence::atomic_write_yaml(&self.config.drift_report_file_path, &report)?;

        let status = report.is_drift_free();
        if status {
            self.observer.info("No data drift detected between train and test");
        } else {
            self.observer.warn(&format!(
                "Data drift detected in {:?}; see {}",
                report.drifted_columns(),
                self.config.drift_report_file_path.display()
            ));
        }
        Ok(status)
    }

    /// Run every check and produce the validation artifact.
    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact, StageError> {
        let train = Self::read_data(self.ingestion_artifact.trained_file_path())?;
        let test = Self::read_data(self.ingestion_artifact.test_file_path())?;

        self.ensure_column_count(&train, "train")?;
        self.ensure_column_count(&test, "test")?;
        self.ensure_numeric_columns(&train, "train")?;
        self.ensure_numeric_columns(&test, "test")?;
        self.observer.info("Schema validation passed for both train and test datasets");

        let status = self.detect_dataset_drift(&train, &test)?;

        persistence::atomic_write(&self.config.valid_train_file_path, train.raw_bytes())?;
        persistence::atomic_write(&self.config.valid_test_file_path, test.raw_bytes())?;
        self.observer.info("Validated train and test datasets saved");

        let artifact = DataValidationArtifact::new(
            status,
            &self.config.valid_train_file_path,
            &self.config.valid_test_file_path,
            &self.config.drift_report_file_path,
        );
        self.observer.info("Data validation artifact created");
        Ok(artifact)
    }

    fn ensure_column_count(&self, dataset: &Dataset, label: &str) -> Result<(), StageError> {
        if self.validate_number_of_columns(dataset) {
            return Ok(());
        }
        Err(StageError::SchemaViolation {
            dataset: label.to_string(),
            message: format!(
                "expected {} columns, found {}",
                self.schema.column_count(),
                dataset.column_count()
            ),
            missing: Vec::new(),
        })
    }

    fn ensure_numeric_columns(&self, dataset: &Dataset, label: &str) -> Result<(), StageError> {
        let presence = self.is_numerical_columns_exist(dataset)?;
        if presence.is_satisfied() {
            return Ok(());
        }
        let missing: Vec<String> = presence.missing.into_iter().collect();
        Err(StageError::SchemaViolation {
            dataset: label.to_string(),
            message: format!("missing numerical columns: {}", missing.join(", ")),
            missing,
        })
    }
}
