//! CSV-splitting ingestion: source table -> feature store copy -> train/test split.

use crate::artifact::DataIngestionArtifact;
use crate::config::DataIngestionConfig;
use crate::error::StageError;
use crate::observe::{PipelineObserver, default_observer};
use crate::persistence;
use crate::stage::IngestionStage;
use csv::StringRecord;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;
use std::sync::Arc;

/// Reads a source CSV, drops configured columns, and writes a seeded
/// shuffle split into train and test files.
pub struct CsvSplitIngestion {
    observer: Arc<dyn PipelineObserver>,
}

impl CsvSplitIngestion {
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

impl Default for CsvSplitIngestion {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionStage for CsvSplitIngestion {
    fn initiate(&self, config: &DataIngestionConfig) -> Result<DataIngestionArtifact, StageError> {
        let ratio = config.train_test_split_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(StageError::external(
                "data ingestion",
                format!("test ratio must be strictly between 0 and 1, got {ratio}"),
            ));
        }

        let (headers, rows) = read_projected(&config.source_file_path, &config.drop_columns)?;
        self.observer.info(&format!(
            "Read {} rows x {} columns from {}",
            rows.len(),
            headers.len(),
            config.source_file_path.display()
        ));

        persistence::atomic_write(
            &config.feature_store_file_path,
            &encode(&config.feature_store_file_path, &headers, rows.iter())?,
        )?;

        let test_len = (rows.len() as f64 * ratio).ceil() as usize;
        if test_len == 0 || test_len >= rows.len() {
            return Err(StageError::external(
                "data ingestion",
                format!("cannot split {} rows with test ratio {ratio}", rows.len()),
            ));
        }

        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(config.seed));
        let (test_idx, train_idx) = order.split_at(test_len);

        persistence::atomic_write(
            &config.training_file_path,
            &encode(
                &config.training_file_path,
                &headers,
                train_idx.iter().map(|&i| &rows[i]),
            )?,
        )?;
        persistence::atomic_write(
            &config.testing_file_path,
            &encode(
                &config.testing_file_path,
                &headers,
                test_idx.iter().map(|&i| &rows[i]),
            )?,
        )?;
        self.observer.info(&format!(
            "Exported {} train rows and {} test rows",
            train_idx.len(),
            test_idx.len()
        ));

        Ok(DataIngestionArtifact::new(
            &config.training_file_path,
            &config.testing_file_path,
        ))
    }
}

fn read_projected(
    path: &Path,
    drop_columns: &[String],
) -> Result<(StringRecord, Vec<StringRecord>), StageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| StageError::data_load(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| StageError::data_load(path, format!("cannot read header: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(StageError::data_load(path, "no columns to parse from file"));
    }

    let keep: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !drop_columns.iter().any(|d| d == name))
        .map(|(i, _)| i)
        .collect();
    let project = |record: &StringRecord| -> StringRecord {
        keep.iter().filter_map(|&i| record.get(i)).collect()
    };

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            StageError::data_load(path, format!("malformed row {}: {e}", idx + 2))
        })?;
        rows.push(project(&record));
    }
    Ok((project(&headers), rows))
}

fn encode<'a>(
    path: &Path,
    headers: &StringRecord,
    rows: impl Iterator<Item = &'a StringRecord>,
) -> Result<Vec<u8>, StageError> {
    let to_err = |e: csv::Error| StageError::persistence(path, std::io::Error::other(e));
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers).map_err(to_err)?;
    for row in rows {
        writer.write_record(row).map_err(to_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| StageError::persistence(path, std::io::Error::other(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingPipelineConfig;
    use crate::dataset::Dataset;
    use crate::error::ErrorKind;
    use crate::settings::PipelineSettings;
    use tempfile::TempDir;

    fn config_for(dir: &Path, source: &str, ratio: f64) -> DataIngestionConfig {
        let source_path = dir.join("source.csv");
        std::fs::write(&source_path, source).unwrap();
        let mut settings = PipelineSettings {
            artifact_root: dir.join("Artifacts"),
            ..PipelineSettings::default()
        };
        settings.ingestion.source_file = source_path;
        settings.ingestion.test_ratio = ratio;
        DataIngestionConfig::new(&TrainingPipelineConfig::with_timestamp(settings, "run"))
    }

    fn source(rows: usize) -> String {
        let mut text = String::from("_id,a,b\n");
        for i in 0..rows {
            text.push_str(&format!("id{i},{i},{}\n", i * 2));
        }
        text
    }

    #[test]
    fn test_split_drops_id_and_partitions_rows() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path(), &source(10), 0.2);

        let artifact = CsvSplitIngestion::new().initiate(&config).unwrap();
        let train = Dataset::from_csv(artifact.trained_file_path()).unwrap();
        let test = Dataset::from_csv(artifact.test_file_path()).unwrap();

        assert_eq!(train.column_names(), vec!["a", "b"]);
        assert_eq!(train.row_count(), 8);
        assert_eq!(test.row_count(), 2);
        assert!(config.feature_store_file_path.exists());

        let mut all: Vec<f64> = train
            .column("a")
            .unwrap()
            .numeric_non_missing()
            .unwrap();
        all.extend(test.column("a").unwrap().numeric_non_missing().unwrap());
        all.sort_by(f64::total_cmp);
        assert_eq!(all, (0..10).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let a = CsvSplitIngestion::new()
            .initiate(&config_for(dir_a.path(), &source(20), 0.25))
            .unwrap();
        let b = CsvSplitIngestion::new()
            .initiate(&config_for(dir_b.path(), &source(20), 0.25))
            .unwrap();
        assert_eq!(
            std::fs::read(a.test_file_path()).unwrap(),
            std::fs::read(b.test_file_path()).unwrap()
        );
    }

    #[test]
    fn test_missing_source_is_data_load_error() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(dir.path(), "a\n1\n", 0.2);
        config.source_file_path = dir.path().join("absent.csv");
        let err = CsvSplitIngestion::new().initiate(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
    }

    #[test]
    fn test_too_few_rows() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path(), "a\n1\n", 0.2);
        let err = CsvSplitIngestion::new().initiate(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::External);
    }
}
