//! Cycle-integrated quantities read back from a [`History`].

use std::f64::consts::TAU;

use pd_core::numeric::{cycle_mean, trapz};

use crate::error::SimResult;
use crate::flow_path::FlowRegistry;
use crate::history::{Field, History};

/// Per-column sum over the rows that hold a value.
pub fn column_sums(field: &Field) -> Vec<f64> {
    (0..field.cols())
        .map(|c| field.column(c).iter().filter(|v| v.is_finite()).sum())
        .collect()
}

/// Cycle-mean heat into the gas, all chambers [W].
pub fn mean_heat_to_gas(history: &History) -> SimResult<f64> {
    Ok(cycle_mean(&history.theta, &column_sums(&history.q))?)
}

/// Indicated power `ω/2π · Σ∮ −p dV` [W]; positive when the gas is
/// compressed.
pub fn pv_power(history: &History, omega: f64) -> SimResult<f64> {
    let integrand: Vec<f64> = (0..history.len())
        .map(|c| {
            history
                .p
                .column(c)
                .iter()
                .zip(history.dv.column(c))
                .filter(|(p, dv)| p.is_finite() && dv.is_finite())
                .map(|(p, dv)| -p * dv)
                .sum()
        })
        .collect();
    Ok(trapz(&history.theta, &integrand)? * omega / TAU)
}

/// Signed path flows leaving `node` per column [kg/s].
fn outflow_series(history: &History, flows: &FlowRegistry, node: &str) -> Vec<f64> {
    let mut out = vec![0.0; history.len()];
    for (i, path) in flows.iter().enumerate() {
        let sign = if path.key1 == node {
            1.0
        } else if path.key2 == node {
            -1.0
        } else {
            continue;
        };
        for (c, slot) in out.iter_mut().enumerate() {
            *slot += sign * history.mdot.get(i, c);
        }
    }
    out
}

/// Cycle-mean net flow leaving `node` [kg/s].
pub fn mean_flow_from(history: &History, flows: &FlowRegistry, node: &str) -> SimResult<f64> {
    Ok(cycle_mean(&history.theta, &outflow_series(history, flows, node))?)
}

/// Mass-weighted enthalpy of everything that flowed into `node` during the
/// cycle [J/kg]. `None` if nothing did.
pub fn mixed_enthalpy_into(
    history: &History,
    flows: &FlowRegistry,
    node: &str,
) -> SimResult<Option<f64>> {
    let mut mass = vec![0.0; history.len()];
    let mut energy = vec![0.0; history.len()];
    for (i, path) in flows.iter().enumerate() {
        let sign = if path.key2 == node {
            1.0
        } else if path.key1 == node {
            -1.0
        } else {
            continue;
        };
        for c in 0..history.len() {
            let inflow = sign * history.mdot.get(i, c);
            if inflow > 0.0 {
                mass[c] += inflow;
                energy[c] += inflow * history.h_up.get(i, c);
            }
        }
    }
    let m = trapz(&history.theta, &mass)?;
    if m <= 0.0 {
        return Ok(None);
    }
    Ok(Some(trapz(&history.theta, &energy)? / m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow_path::FlowPath;
    use crate::history::CvSample;
    use pd_flow::{ConstantArea, IsentropicNozzle};

    fn nozzle() -> IsentropicNozzle {
        IsentropicNozzle::new("n", 1.0, ConstantArea(1e-6)).unwrap()
    }

    fn sample(p: f64, dv: f64) -> CvSample {
        CvSample {
            p_pa: p,
            t_k: 300.0,
            rho_kg_m3: 1.0,
            m_kg: 1e-5,
            v_m3: 1e-5,
            dv_m3_per_rad: dv,
            q_w: 2.0,
        }
    }

    #[test]
    fn constant_pressure_compression_power() {
        let mut h = History::new(2, 0);
        for i in 0..=100 {
            let c = h.push_column(TAU * i as f64 / 100.0);
            h.record_cv(0, c, sample(2e5, -1e-6));
            // Second row absent for the first half
            if i >= 50 {
                h.record_cv(1, c, sample(1e5, 0.0));
            }
        }
        let w = pv_power(&h, 100.0).unwrap();
        assert!((w - 2e5 * 1e-6 * 100.0).abs() < 1e-9);
        let q = mean_heat_to_gas(&h).unwrap();
        // 2 W always, plus 2 W over the last 50.5 of 100 bins
        assert!((q - 3.01).abs() < 1e-9, "q = {q}");
    }

    #[test]
    fn node_flows_follow_path_orientation() {
        let mut flows = FlowRegistry::new();
        flows.add(FlowPath::new("in", "a", nozzle()));
        flows.add(FlowPath::new("a", "out", nozzle()));
        flows.add(FlowPath::new("b", "out", nozzle()));
        let mut h = History::new(0, 3);
        for i in 0..=10 {
            let c = h.push_column(TAU * i as f64 / 10.0);
            h.record_path(0, c, 0.01, 3e5);
            h.record_path(1, c, 0.004, 4e5);
            h.record_path(2, c, 0.006, 5e5);
        }
        assert!((mean_flow_from(&h, &flows, "in").unwrap() - 0.01).abs() < 1e-12);
        assert!((mean_flow_from(&h, &flows, "out").unwrap() + 0.01).abs() < 1e-12);
        let h_mix = mixed_enthalpy_into(&h, &flows, "out").unwrap().unwrap();
        assert!((h_mix - 4.6e5).abs() < 1e-6);
        assert_eq!(mixed_enthalpy_into(&h, &flows, "in").unwrap(), None);
    }
}
