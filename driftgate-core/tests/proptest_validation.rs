//! Property-based tests for the KS test and the schema checks using proptest.

use proptest::prelude::*;

use driftgate_core::DataValidation;
use driftgate_core::artifact::DataIngestionArtifact;
use driftgate_core::config::DataValidationConfig;
use driftgate_core::dataset::Dataset;
use driftgate_core::drift::ks_2samp;
use driftgate_core::schema::SchemaManifest;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

fn engine(schema_yaml: &str) -> DataValidation {
    let schema = SchemaManifest::from_yaml_str(schema_yaml).unwrap();
    DataValidation::with_schema(
        DataIngestionArtifact::new("train.csv", "test.csv"),
        DataValidationConfig::under("data_validation".into()),
        Arc::new(schema),
    )
}

/// A table whose columns are named `c0..cN`; `numeric[i]` decides whether
/// column `i` holds numbers or words.
fn table(numeric: &[bool], rows: usize) -> Dataset {
    let header: Vec<String> = (0..numeric.len()).map(|i| format!("c{i}")).collect();
    let mut body = header.join(",");
    body.push('\n');
    for r in 0..rows {
        let row: Vec<String> = numeric
            .iter()
            .map(|&is_num| if is_num { r.to_string() } else { format!("w{r}") })
            .collect();
        body.push_str(&row.join(","));
        body.push('\n');
    }
    Dataset::from_csv_bytes(Path::new("gen.csv"), body.into_bytes()).unwrap()
}

fn sample() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1000i32..1000, 1..40)
        .prop_map(|v| v.into_iter().map(f64::from).collect())
}

// --- KS test properties ---

proptest! {
    #[test]
    fn identical_samples_never_drift(data in sample()) {
        let result = ks_2samp(&data, &data).unwrap();
        prop_assert_eq!(result.statistic, 0.0);
        prop_assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn statistic_and_p_value_are_bounded(a in sample(), b in sample()) {
        let result = ks_2samp(&a, &b).unwrap();
        prop_assert!((0.0..=1.0).contains(&result.statistic));
        prop_assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn test_is_symmetric(a in sample(), b in sample()) {
        let ab = ks_2samp(&a, &b).unwrap();
        let ba = ks_2samp(&b, &a).unwrap();
        prop_assert_eq!(ab.statistic, ba.statistic);
        prop_assert!((ab.p_value - ba.p_value).abs() < 1e-9);
    }

    #[test]
    fn input_order_does_not_matter(a in sample(), b in sample()) {
        let mut reversed = a.clone();
        reversed.reverse();
        prop_assert_eq!(ks_2samp(&a, &b), ks_2samp(&reversed, &b));
    }
}

// --- Schema check properties ---

proptest! {
    #[test]
    fn column_count_check_is_cardinality_only(declared in 1usize..8, actual in 1usize..8) {
        let columns: String = (0..declared).map(|i| format!("  - name: s{i}\n")).collect();
        let validation = engine(&format!("columns:\n{columns}numerical_columns: []\n"));
        let dataset = table(&vec![true; actual], 3);
        prop_assert_eq!(validation.validate_number_of_columns(&dataset), declared == actual);
    }

    #[test]
    fn missing_numeric_columns_are_the_set_difference(
        numeric in prop::collection::vec(any::<bool>(), 1..8),
        required in prop::collection::btree_set(0usize..10, 0..6),
    ) {
        let required: BTreeSet<String> = required.into_iter().map(|i| format!("c{i}")).collect();
        let list: Vec<&str> = required.iter().map(String::as_str).collect();
        let validation = engine(&format!(
            "columns: []\nnumerical_columns: [{}]\n",
            list.join(", ")
        ));
        let dataset = table(&numeric, 4);

        let present: BTreeSet<String> = numeric
            .iter()
            .enumerate()
            .filter(|(_, is_num)| **is_num)
            .map(|(i, _)| format!("c{i}"))
            .collect();
        let expected: BTreeSet<String> = required.difference(&present).cloned().collect();

        let presence = validation.is_numerical_columns_exist(&dataset).unwrap();
        prop_assert_eq!(presence.missing(), &expected);
        prop_assert_eq!(presence.is_satisfied(), expected.is_empty());
    }

    #[test]
    fn drift_report_is_deterministic(numeric in prop::collection::vec(any::<bool>(), 1..6)) {
        let validation = engine("columns: []\nnumerical_columns: []\n");
        let base = table(&numeric, 12);
        let current = table(&numeric, 7);
        let first = validation.drift_report(&base, &current);
        let second = validation.drift_report(&base, &current);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), numeric.iter().filter(|n| **n).count());
    }
}
