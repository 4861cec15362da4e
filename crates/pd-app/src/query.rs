//! Query helpers for extracting data from loaded runs.

use std::fmt::Write as _;

use pd_results::{Dataset, RunManifest, RunRecord};

use crate::error::{AppError, AppResult};

/// Summary of a run for display.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub project_name: String,
    pub timestamp: String,
    pub engine_version: String,
    pub outputs: Vec<(&'static str, f64)>,
    pub chamber_keys: Vec<String>,
    pub sample_count: usize,
    pub theta_range: (f64, f64),
}

pub fn get_run_summary(manifest: &RunManifest, record: &RunRecord) -> RunSummary {
    let theta_min = record.t.first().copied().unwrap_or(0.0);
    let theta_max = record.t.last().copied().unwrap_or(0.0);
    RunSummary {
        run_id: manifest.run_id.clone(),
        project_name: manifest.project_name.clone(),
        timestamp: manifest.timestamp.clone(),
        engine_version: manifest.engine_version.clone(),
        outputs: manifest.outputs.pairs().to_vec(),
        chamber_keys: record.cvs.keys.clone(),
        sample_count: record.t.len(),
        theta_range: (theta_min, theta_max),
    }
}

/// `(θ, value)` for one chamber, skipping angles where it was absent.
pub fn chamber_series(record: &RunRecord, dataset: &str, key: &str) -> AppResult<Vec<(f64, f64)>> {
    let rows = match record.dataset(dataset)? {
        Dataset::Rows(rows) => rows,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "{dataset} is not a per-chamber dataset"
            )));
        }
    };
    let row = record
        .chamber_row(rows, key)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown chamber: {key}")))?;
    Ok(record
        .t
        .iter()
        .zip(row)
        .filter(|(_, v)| v.is_finite())
        .map(|(t, v)| (*t, *v))
        .collect())
}

fn cell(v: f64) -> String {
    if v.is_nan() { String::new() } else { format!("{v}") }
}

/// Render one dataset as CSV. Per-angle data gets a leading `theta`
/// column; absent samples are empty cells.
pub fn dataset_to_csv(record: &RunRecord, path: &str) -> AppResult<String> {
    let name = path.trim_start_matches('/').replace('/', "_");
    let mut out = String::new();
    match record.dataset(path)? {
        Dataset::Scalar(v) => {
            let _ = writeln!(out, "{name}\n{}", cell(v));
        }
        Dataset::Count(n) => {
            let _ = writeln!(out, "{name}\n{n}");
        }
        Dataset::Keys(keys) => {
            let _ = writeln!(out, "{name}");
            for k in keys {
                let _ = writeln!(out, "{k}");
            }
        }
        Dataset::Series(values) => {
            if values.len() == record.t.len() && name != "t" {
                let _ = writeln!(out, "theta,{name}");
                for (t, v) in record.t.iter().zip(values) {
                    let _ = writeln!(out, "{t},{}", cell(*v));
                }
            } else {
                let _ = writeln!(out, "{name}");
                for v in values {
                    let _ = writeln!(out, "{}", cell(*v));
                }
            }
        }
        Dataset::Rows(rows) => {
            let _ = writeln!(out, "theta,{}", record.cvs.keys.join(","));
            for (col, t) in record.t.iter().enumerate() {
                let cells: Vec<String> = rows
                    .iter()
                    .map(|row| row.get(col).copied().map(cell).unwrap_or_default())
                    .collect();
                let _ = writeln!(out, "{t},{}", cells.join(","));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pd_results::{CvIndex, RunOutputs};

    use super::*;

    fn record() -> RunRecord {
        RunRecord {
            t: vec![0.0, 0.5, 1.0],
            p: vec![vec![1e5, 1.1e5, f64::NAN], vec![f64::NAN, 2e5, 2.5e5]],
            cvs: CvIndex {
                keys: vec!["s1".to_string(), "d1".to_string()],
                n: 2,
            },
            ..RunRecord::default()
        }
    }

    #[test]
    fn per_chamber_csv_has_key_header_and_blank_absences() {
        let csv = dataset_to_csv(&record(), "/p").unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "theta,s1,d1");
        assert_eq!(lines[1], "0,100000,");
        assert_eq!(lines[3], "1,,250000");
    }

    #[test]
    fn chamber_series_skips_absent_samples() {
        let s = chamber_series(&record(), "/p", "d1").unwrap();
        assert_eq!(s, vec![(0.5, 2e5), (1.0, 2.5e5)]);
        assert!(chamber_series(&record(), "/t", "d1").is_err());
        assert!(chamber_series(&record(), "/p", "ddd").is_err());
    }

    #[test]
    fn summary_reports_range_and_outputs() {
        let manifest = RunManifest::new("abc", "demo", "0.1.0", RunOutputs::default());
        let s = get_run_summary(&manifest, &record());
        assert_eq!(s.sample_count, 3);
        assert_eq!(s.theta_range, (0.0, 1.0));
        assert_eq!(s.outputs.len(), 11);
    }
}
