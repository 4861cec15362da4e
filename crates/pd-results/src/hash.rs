//! Content-based hashing for run IDs.

use pd_project::schema::Project;
use sha2::{Digest, Sha256};

/// Hex sha256 over the canonical project JSON and the engine version.
pub fn compute_run_id(project: &Project, engine_version: &str) -> String {
    let mut hasher = Sha256::new();

    let project_json = serde_json::to_string(project).unwrap_or_default();
    hasher.update(project_json.as_bytes());
    hasher.update(engine_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pd_project::schema::*;

    fn project(omega: f64) -> Project {
        Project {
            version: 1,
            name: "hash".to_string(),
            fluid: FluidDef {
                species: "Air".to_string(),
                backend: FluidBackendDef::IdealGas,
            },
            geometry: GeometryDef {
                displacement_m3: 1e-4,
                volume_ratio: 2.2,
                wrap_height_m: 0.03,
                orbiting_radius_m: 0.005,
                phi_ie_rad: 20.0,
                discharge_angle_rad: 3.5,
                suction_clearance_m3: 2e-6,
                wrap_thickness_m: 0.004,
                discharge_dead_volume_m3: 2e-6,
                compression_pairs: 2,
                plenum_volume_m3: 5e-4,
            },
            inlet: InletDef {
                pressure_pa: 1e5,
                temperature_k: 300.0,
            },
            outlet: OutletDef { pressure_pa: 3e5 },
            omega_rad_s: omega,
            ports: PortsDef::default(),
            leakage: LeakageDef::default(),
            tubes: TubesDef::default(),
            heat_transfer: HeatTransferDef::Adiabatic,
            mech: MechDef::default(),
            solver: SolverDef::default(),
            merge: MergeDef::default(),
            flooded: false,
        }
    }

    #[test]
    fn hash_stability() {
        let p = project(314.0);
        assert_eq!(compute_run_id(&p, "v1"), compute_run_id(&p, "v1"));
        assert_eq!(compute_run_id(&p, "v1").len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        assert_ne!(
            compute_run_id(&project(314.0), "v1"),
            compute_run_id(&project(300.0), "v1")
        );
        assert_ne!(
            compute_run_id(&project(314.0), "v1"),
            compute_run_id(&project(314.0), "v2")
        );
    }
}
