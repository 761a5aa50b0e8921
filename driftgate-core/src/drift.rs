//! Two-sample Kolmogorov–Smirnov drift detection.
//!
//! The statistic is computed exactly: for samples of size `n1` and `n2`, every
//! ECDF gap is an integer multiple of `1 / (n1 * n2)`, so the supremum is
//! tracked as an integer and compared without floating-point slack. The
//! two-sided p-value `P(D >= d)` is exact (lattice-path counting) while the
//! larger sample has at most [`EXACT_SAMPLE_LIMIT`] values, and uses the
//! limiting Kolmogorov distribution `Q(sqrt(n1 * n2 / (n1 + n2)) * d)` beyond
//! that. The limiting form carries no finite-sample correction, so large-sample
//! p-values differ slightly from an exact one-sample `KS(n)` tail evaluated at
//! the effective size.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Significance level below which a column is declared drifted.
pub const DRIFT_THRESHOLD: f64 = 0.05;

/// Largest sample size for which the exact p-value is computed.
pub const EXACT_SAMPLE_LIMIT: usize = 10_000;

/// Result of a two-sample KS test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sided two-sample KS test.
///
/// NaNs are ignored. Returns `None` if either sample is empty after that.
pub fn ks_2samp(data1: &[f64], data2: &[f64]) -> Option<KsResult> {
    let mut a: Vec<f64> = data1.iter().copied().filter(|x| !x.is_nan()).collect();
    let mut b: Vec<f64> = data2.iter().copied().filter(|x| !x.is_nan()).collect();
    if a.is_empty() || b.is_empty() {
        return None;
    }
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n1, n2) = (a.len(), b.len());
    let scale = n1 as i64 * n2 as i64;
    let gap = max_ecdf_gap(&a, &b);
    let statistic = gap as f64 / scale as f64;

    let p_value = if gap == 0 {
        1.0
    } else if n1.max(n2) <= EXACT_SAMPLE_LIMIT {
        exact_p_value(n1, n2, gap)
    } else {
        let en = (n1 * n2) as f64 / (n1 + n2) as f64;
        kolmogorov_sf(en.sqrt() * statistic)
    };

    Some(KsResult {
        statistic,
        p_value: p_value.clamp(0.0, 1.0),
    })
}

/// Largest `|i * n2 - j * n1|` over the merged sorted samples, where `i` and
/// `j` count values `<= x` in each sample.
fn max_ecdf_gap(a: &[f64], b: &[f64]) -> i64 {
    let (n1, n2) = (a.len() as i64, b.len() as i64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut best = 0i64;
    while i < a.len() && j < b.len() {
        let x = if a[i] <= b[j] { a[i] } else { b[j] };
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        best = best.max((i as i64 * n2 - j as i64 * n1).abs());
    }
    best
}

/// Fraction of monotone lattice paths from `(0, 0)` to `(n1, n2)` that touch
/// the region `|i * n2 - j * n1| >= gap`.
///
/// `row[j]` holds the touching fraction of paths ending at `(i, j)`. A path
/// into `(i, j)` arrives from `(i - 1, j)` with weight `i / (i + j)` and from
/// `(i, j - 1)` with weight `j / (i + j)`, so values stay within `[0, 1]`.
fn exact_p_value(n1: usize, n2: usize, gap: i64) -> f64 {
    let (m, n) = (n1 as i64, n2 as i64);
    let mut row = vec![0.0f64; n2 + 1];
    for i in 0..=n1 {
        for j in 0..=n2 {
            if (i as i64 * n - j as i64 * m).abs() >= gap {
                row[j] = 1.0;
                continue;
            }
            if i == 0 && j == 0 {
                row[j] = 0.0;
                continue;
            }
            let total = (i + j) as f64;
            let from_prev_row = if i > 0 { row[j] * i as f64 / total } else { 0.0 };
            let from_prev_col = if j > 0 {
                row[j - 1] * j as f64 / total
            } else {
                0.0
            };
            row[j] = from_prev_row + from_prev_col;
        }
    }
    row[n2]
}

/// Survival function of the limiting Kolmogorov distribution.
fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda < 0.2 {
        return 1.0;
    }
    let mut sum = 0.0;
    for k in 1..=100u32 {
        let kf = f64::from(k);
        let term = (-2.0 * kf * kf * lambda * lambda).exp();
        sum += if k % 2 == 1 { term } else { -term };
        if term < 1e-16 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Drift verdict for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub p_value: f64,
    pub drift_status: bool,
}

impl ColumnDrift {
    /// Apply the decision rule: `p_value >= threshold` means no drift.
    pub fn from_p_value(p_value: f64, threshold: f64) -> Self {
        Self {
            p_value,
            drift_status: p_value < threshold,
        }
    }
}

/// Per-column drift verdicts, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriftReport(BTreeMap<String, ColumnDrift>);

impl DriftReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, drift: ColumnDrift) {
        self.0.insert(column.into(), drift);
    }

    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnDrift)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when no column drifted. A single drifted column fails the whole report.
    pub fn is_drift_free(&self) -> bool {
        self.0.values().all(|d| !d.drift_status)
    }

    pub fn drifted_columns(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, d)| d.drift_status)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}
