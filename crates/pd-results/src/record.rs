//! The persisted run record.
//!
//! Datasets are addressed by slash paths: `/t`, `/p`, `/T`, `/rho`, `/V`,
//! `/dV`, `/Q` (one row per chamber, `NaN` where the chamber is absent),
//! `/forces/<name>`, `/CVs/keys`, `/CVs/N`, `/mech/<name>` and
//! `/losses/<name>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::nan;
use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CvIndex {
    pub keys: Vec<String>,
    #[serde(rename = "N")]
    pub n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ForcesRecord {
    /// Per-angle series summed over the chambers
    pub series: BTreeMap<String, Vec<f64>>,
    /// Cycle means, keyed `mean_<name>`
    pub means: BTreeMap<String, f64>,
    pub f_back_n: f64,
    pub inertial_n: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RunRecord {
    #[serde(with = "nan::series")]
    pub t: Vec<f64>,
    #[serde(with = "nan::rows")]
    pub p: Vec<Vec<f64>>,
    #[serde(rename = "T", with = "nan::rows")]
    pub temperature: Vec<Vec<f64>>,
    #[serde(with = "nan::rows")]
    pub rho: Vec<Vec<f64>>,
    #[serde(rename = "V", with = "nan::rows")]
    pub volume: Vec<Vec<f64>>,
    #[serde(rename = "dV", with = "nan::rows")]
    pub dvolume: Vec<Vec<f64>>,
    #[serde(rename = "Q", with = "nan::rows")]
    pub heat: Vec<Vec<f64>>,
    pub forces: ForcesRecord,
    #[serde(rename = "CVs")]
    pub cvs: CvIndex,
    /// Mechanical configuration echoed for provenance
    pub mech: BTreeMap<String, f64>,
    pub losses: BTreeMap<String, f64>,
}

/// Borrowed view of one dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dataset<'a> {
    Scalar(f64),
    Count(usize),
    Series(&'a [f64]),
    /// One row per chamber
    Rows(&'a [Vec<f64>]),
    Keys(&'a [String]),
}

impl RunRecord {
    pub fn dataset(&self, path: &str) -> ResultsResult<Dataset<'_>> {
        let unknown = || ResultsError::UnknownDataset {
            path: path.to_string(),
        };
        let trimmed = path.trim_start_matches('/');
        let (group, name) = match trimmed.split_once('/') {
            Some((g, n)) => (g, Some(n)),
            None => (trimmed, None),
        };
        let found = match (group, name) {
            ("t", None) => Dataset::Series(&self.t),
            ("p", None) => Dataset::Rows(&self.p),
            ("T", None) => Dataset::Rows(&self.temperature),
            ("rho", None) => Dataset::Rows(&self.rho),
            ("V", None) => Dataset::Rows(&self.volume),
            ("dV", None) => Dataset::Rows(&self.dvolume),
            ("Q", None) => Dataset::Rows(&self.heat),
            ("CVs", Some("keys")) => Dataset::Keys(&self.cvs.keys),
            ("CVs", Some("N")) => Dataset::Count(self.cvs.n),
            ("forces", Some("f_back")) => Dataset::Scalar(self.forces.f_back_n),
            ("forces", Some("inertial")) => Dataset::Scalar(self.forces.inertial_n),
            ("forces", Some(n)) => match self.forces.series.get(n) {
                Some(s) => Dataset::Series(s),
                None => Dataset::Scalar(*self.forces.means.get(n).ok_or_else(unknown)?),
            },
            ("mech", Some(n)) => Dataset::Scalar(*self.mech.get(n).ok_or_else(unknown)?),
            ("losses", Some(n)) => Dataset::Scalar(*self.losses.get(n).ok_or_else(unknown)?),
            _ => return Err(unknown()),
        };
        Ok(found)
    }

    /// Every addressable dataset path.
    pub fn dataset_paths(&self) -> Vec<String> {
        let mut out: Vec<String> = ["/t", "/p", "/T", "/rho", "/V", "/dV", "/Q", "/CVs/keys", "/CVs/N"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        out.push("/forces/f_back".to_string());
        out.push("/forces/inertial".to_string());
        out.extend(self.forces.series.keys().map(|k| format!("/forces/{k}")));
        out.extend(self.forces.means.keys().map(|k| format!("/forces/{k}")));
        out.extend(self.mech.keys().map(|k| format!("/mech/{k}")));
        out.extend(self.losses.keys().map(|k| format!("/losses/{k}")));
        out
    }

    /// Row of a per-chamber dataset for chamber `key`.
    pub fn chamber_row<'a>(&'a self, rows: &'a [Vec<f64>], key: &str) -> Option<&'a [f64]> {
        let idx = self.cvs.keys.iter().position(|k| k == key)?;
        rows.get(idx).map(Vec::as_slice)
    }
}
