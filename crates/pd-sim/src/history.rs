//! Per-column time-series storage.
//!
//! Arenas are sized for the fixed chamber and path sets and grow one column
//! per committed step. Cells of chambers that do not exist hold NaN.

use crate::error::{SimError, SimResult};

/// Column-major `rows × cols` arena of f64, NaN-initialized per column.
#[derive(Debug, Clone, Default)]
pub struct Field {
    rows: usize,
    data: Vec<f64>,
}

impl Field {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            data: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.data.len().checked_div(self.rows).unwrap_or(0)
    }

    fn push_column(&mut self) {
        self.data.extend(std::iter::repeat_n(f64::NAN, self.rows));
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let rows = self.rows;
        if let Some(cell) = self.data.get_mut(col * rows + row) {
            *cell = value;
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data
            .get(col * self.rows + row)
            .copied()
            .unwrap_or(f64::NAN)
    }

    pub fn column(&self, col: usize) -> &[f64] {
        let start = (col * self.rows).min(self.data.len());
        let end = (start + self.rows).min(self.data.len());
        &self.data[start..end]
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.cols()).map(|c| self.get(row, c)).collect()
    }

    /// Row-major copy, one `Vec` per row.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|r| self.row(r)).collect()
    }
}

/// Values recorded for one chamber at one column.
#[derive(Debug, Clone, Copy)]
pub struct CvSample {
    pub p_pa: f64,
    pub t_k: f64,
    pub rho_kg_m3: f64,
    pub m_kg: f64,
    pub v_m3: f64,
    pub dv_m3_per_rad: f64,
    pub q_w: f64,
}

#[derive(Debug, Clone, Default)]
pub struct History {
    pub theta: Vec<f64>,
    pub p: Field,
    pub t: Field,
    pub rho: Field,
    pub m: Field,
    pub v: Field,
    pub dv: Field,
    pub q: Field,
    /// Path flow rate, positive from `key1` to `key2` [kg/s]
    pub mdot: Field,
    /// Upstream specific enthalpy carried by each path [J/kg]
    pub h_up: Field,
}

impl History {
    pub fn new(n_cv: usize, n_path: usize) -> Self {
        Self {
            theta: Vec::new(),
            p: Field::new(n_cv),
            t: Field::new(n_cv),
            rho: Field::new(n_cv),
            m: Field::new(n_cv),
            v: Field::new(n_cv),
            dv: Field::new(n_cv),
            q: Field::new(n_cv),
            mdot: Field::new(n_path),
            h_up: Field::new(n_path),
        }
    }

    fn cv_fields_mut(&mut self) -> [&mut Field; 7] {
        [
            &mut self.p,
            &mut self.t,
            &mut self.rho,
            &mut self.m,
            &mut self.v,
            &mut self.dv,
            &mut self.q,
        ]
    }

    pub fn clear(&mut self) {
        self.theta.clear();
        for f in self.cv_fields_mut() {
            f.clear();
        }
        self.mdot.clear();
        self.h_up.clear();
    }

    /// Open a new all-NaN column at `theta`; returns its index.
    pub fn push_column(&mut self, theta: f64) -> usize {
        self.theta.push(theta);
        for f in self.cv_fields_mut() {
            f.push_column();
        }
        self.mdot.push_column();
        self.h_up.push_column();
        self.theta.len() - 1
    }

    pub fn len(&self) -> usize {
        self.theta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.theta.is_empty()
    }

    pub fn last_column(&self) -> SimResult<usize> {
        self.theta
            .len()
            .checked_sub(1)
            .ok_or_else(|| SimError::invariant("history has no columns"))
    }

    pub fn record_cv(&mut self, row: usize, col: usize, s: CvSample) {
        self.p.set(row, col, s.p_pa);
        self.t.set(row, col, s.t_k);
        self.rho.set(row, col, s.rho_kg_m3);
        self.m.set(row, col, s.m_kg);
        self.v.set(row, col, s.v_m3);
        self.dv.set(row, col, s.dv_m3_per_rad);
        self.q.set(row, col, s.q_w);
    }

    pub fn record_path(&mut self, row: usize, col: usize, mdot: f64, h_up: f64) {
        self.mdot.set(row, col, mdot);
        self.h_up.set(row, col, h_up);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_columns_are_nan() {
        let mut h = History::new(3, 1);
        let c = h.push_column(0.0);
        assert_eq!(c, 0);
        assert!(h.p.column(0).iter().all(|v| v.is_nan()));
        h.record_cv(
            1,
            0,
            CvSample {
                p_pa: 1e5,
                t_k: 300.0,
                rho_kg_m3: 1.2,
                m_kg: 1e-5,
                v_m3: 1e-5 / 1.2,
                dv_m3_per_rad: 0.0,
                q_w: 0.0,
            },
        );
        assert_eq!(h.p.get(1, 0), 1e5);
        assert!(h.p.get(0, 0).is_nan());
        assert!(h.t.get(2, 0).is_nan());
    }

    #[test]
    fn rows_are_stable_across_columns() {
        let mut f = Field::new(2);
        f.push_column();
        f.push_column();
        f.set(0, 0, 1.0);
        f.set(0, 1, 2.0);
        f.set(1, 1, 5.0);
        assert_eq!(f.cols(), 2);
        assert_eq!(f.row(0), vec![1.0, 2.0]);
        let rows = f.to_rows();
        assert!(rows[1][0].is_nan());
        assert_eq!(rows[1][1], 5.0);
    }
}
