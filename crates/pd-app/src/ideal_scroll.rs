//! Idealized scroll family: closed-form chamber volumes in crank angle.
//!
//! Chambers, in row order:
//!
//! - `sa`: shell-side suction plenum, constant volume
//! - `s1`, `s2`: suction pockets, opening from the clearance volume at θ = 0
//!   and closing at θ = 2π with half the displacement each
//! - `c1.k`, `c2.k` for k = 1..N: compression pairs; the last pair opens to
//!   discharge at θ_d
//! - `d1`, `d2`, `dd`: the two discharge pockets and the centre region, alive
//!   from θ_d until they merge
//! - `ddd`: the merged discharge chamber
//!
//! Volumes fall linearly with the pocket's age, so the pocket volume at
//! discharge is exactly the closed suction volume over the volume ratio.
//! Every succession is volume-continuous.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use pd_project::schema::GeometryDef;
use pd_sim::{ChamberShape, ForceCoefficients, ForceGeometry, InvoluteSpan, VolumeFunction};

/// Window below θ_d inside which a newly born discharge pocket has age zero [rad].
const BIRTH_SNAP: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdealScroll {
    pub displacement_m3: f64,
    pub volume_ratio: f64,
    pub wrap_height_m: f64,
    pub orbiting_radius_m: f64,
    pub phi_ie_rad: f64,
    pub theta_d: f64,
    pub suction_clearance_m3: f64,
    pub wrap_thickness_m: f64,
    pub dead_volume_m3: f64,
    pub compression_pairs: usize,
    pub plenum_volume_m3: f64,
}

/// Which closed form a chamber follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PocketKind {
    Plenum,
    Suction,
    /// 1-based pair index
    Compression(usize),
    Discharge,
    Centre,
    Merged,
}

impl IdealScroll {
    pub fn from_def(g: &GeometryDef) -> Self {
        Self {
            displacement_m3: g.displacement_m3,
            volume_ratio: g.volume_ratio,
            wrap_height_m: g.wrap_height_m,
            orbiting_radius_m: g.orbiting_radius_m,
            phi_ie_rad: g.phi_ie_rad,
            theta_d: g.discharge_angle_rad,
            suction_clearance_m3: g.suction_clearance_m3,
            wrap_thickness_m: g.wrap_thickness_m,
            dead_volume_m3: g.discharge_dead_volume_m3,
            compression_pairs: g.compression_pairs,
            plenum_volume_m3: g.plenum_volume_m3,
        }
    }

    /// Involute base radius from `r_o = π r_b − t`.
    pub fn base_radius(&self) -> f64 {
        (self.orbiting_radius_m + self.wrap_thickness_m) / PI
    }

    /// Closed suction pocket volume.
    pub fn pocket_max(&self) -> f64 {
        self.suction_clearance_m3 + 0.5 * self.displacement_m3
    }

    /// Pocket volume at discharge.
    pub fn pocket_at_discharge(&self) -> f64 {
        self.pocket_max() / self.volume_ratio
    }

    fn compression_span(&self) -> f64 {
        TAU * (self.compression_pairs - 1) as f64 + self.theta_d
    }

    fn compression_slope(&self) -> f64 {
        (self.pocket_max() - self.pocket_at_discharge()) / self.compression_span()
    }

    /// Angle since the last discharge of a discharge pocket. The pockets
    /// are born just short of θ_d, so angles within `BIRTH_SNAP` below it
    /// count as age zero.
    fn discharge_pocket_age(&self, theta: f64) -> f64 {
        let age = theta - self.theta_d;
        if age > -BIRTH_SNAP {
            age.max(0.0)
        } else {
            age + TAU
        }
    }

    /// Angle since the last merge-side discharge for the merged chamber,
    /// which lives through θ = 0 and ends just short of θ_d.
    fn merged_age(&self, theta: f64) -> f64 {
        (theta - self.theta_d).rem_euclid(TAU)
    }

    /// Whether a chamber of `kind` can exist at `theta`.
    pub fn is_live(&self, kind: PocketKind, theta: f64) -> bool {
        match kind {
            PocketKind::Compression(k) if k == self.compression_pairs => theta <= self.theta_d,
            PocketKind::Discharge => theta >= self.theta_d - BIRTH_SNAP,
            _ => true,
        }
    }

    /// Compression pockets between the suction pockets and the centre.
    pub fn compression_pockets_alive(&self, theta: f64) -> usize {
        if theta < self.theta_d {
            self.compression_pairs
        } else {
            self.compression_pairs - 1
        }
    }

    fn shrinking_pocket(&self, age: f64) -> (f64, f64) {
        let v0 = self.pocket_at_discharge();
        (v0 * (1.0 - age / TAU), -v0 / TAU)
    }

    pub fn volume(&self, kind: PocketKind, theta: f64) -> (f64, f64) {
        match kind {
            PocketKind::Plenum => (self.plenum_volume_m3, 0.0),
            PocketKind::Suction => {
                let rate = 0.5 * self.displacement_m3 / TAU;
                (self.suction_clearance_m3 + rate * theta, rate)
            }
            PocketKind::Compression(k) => {
                let age = TAU * (k - 1) as f64 + theta;
                let slope = self.compression_slope();
                (self.pocket_max() - slope * age, -slope)
            }
            PocketKind::Discharge => self.shrinking_pocket(self.discharge_pocket_age(theta)),
            PocketKind::Centre => (self.dead_volume_m3, 0.0),
            PocketKind::Merged => {
                let (v, dv) = self.shrinking_pocket(self.merged_age(theta));
                (2.0 * v + self.dead_volume_m3, 2.0 * dv)
            }
        }
    }

    /// Wall involute angles of the pockets that have both flanks.
    pub fn involute_span(&self, kind: PocketKind, theta: f64) -> Option<InvoluteSpan> {
        let (phi_max, phi_min) = match kind {
            PocketKind::Suction => (self.phi_ie_rad, self.phi_ie_rad - theta),
            PocketKind::Compression(k) => {
                let outer = self.phi_ie_rad - theta - TAU * (k - 1) as f64;
                (outer, outer - TAU)
            }
            _ => return None,
        };
        Some(InvoluteSpan {
            phi_min: phi_min.max(0.0),
            phi_max: phi_max.max(0.0),
        })
    }

    /// Chamber keys with their closed form and force class, in row order.
    pub fn chambers(&self) -> Vec<(String, PocketKind, ChamberShape)> {
        let mut out = vec![
            ("sa".to_string(), PocketKind::Plenum, ChamberShape::Plenum),
            ("s1".to_string(), PocketKind::Suction, ChamberShape::Suction),
            ("s2".to_string(), PocketKind::Suction, ChamberShape::Suction),
        ];
        for k in 1..=self.compression_pairs {
            for side in [1, 2] {
                out.push((
                    compression_key(side, k),
                    PocketKind::Compression(k),
                    ChamberShape::Compression,
                ));
            }
        }
        out.push(("d1".to_string(), PocketKind::Discharge, ChamberShape::Discharge));
        out.push(("d2".to_string(), PocketKind::Discharge, ChamberShape::Discharge));
        out.push(("dd".to_string(), PocketKind::Centre, ChamberShape::Discharge));
        out.push(("ddd".to_string(), PocketKind::Merged, ChamberShape::DischargeMerged));
        out
    }
}

/// Clearance path family between two chambers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leak {
    /// Along the flank contact between neighbouring pockets of one side
    Flank,
    /// Across the wrap tip bounding the given pocket
    Radial(PocketKind),
    /// Straight from the centre to a suction pocket, open only while no
    /// compression pocket lies between them
    CentreToSuction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakPath {
    pub key1: String,
    pub key2: String,
    pub leak: Leak,
}

impl LeakPath {
    fn new(key1: impl Into<String>, key2: impl Into<String>, leak: Leak) -> Self {
        Self {
            key1: key1.into(),
            key2: key2.into(),
            leak,
        }
    }
}

impl IdealScroll {
    /// Flank leakage throat `δ h` [m²].
    pub fn flank_leak_area(&self, gap_m: f64) -> f64 {
        gap_m * self.wrap_height_m
    }

    /// Radial leakage throat: `δ` times the tip arc length
    /// `r_b (φ_max² − φ_min²) / 2` of the pocket's wall [m²].
    pub fn radial_leak_area(&self, gap_m: f64, kind: PocketKind, theta: f64) -> f64 {
        self.involute_span(kind, theta).map_or(0.0, |span| {
            0.5 * gap_m * self.base_radius() * (span.phi_max.powi(2) - span.phi_min.powi(2))
        })
    }

    /// Every leakage path of the family.
    pub fn leakage_paths(&self) -> Vec<LeakPath> {
        let n = self.compression_pairs;
        let mut out = Vec::new();
        for side in [1, 2] {
            out.push(LeakPath::new(format!("s{side}"), compression_key(side, 1), Leak::Flank));
            for k in 1..n {
                out.push(LeakPath::new(
                    compression_key(side, k),
                    compression_key(side, k + 1),
                    Leak::Flank,
                ));
            }
            out.push(LeakPath::new(compression_key(side, n), "ddd", Leak::Flank));
        }
        for (side, other) in [(1, 2), (2, 1)] {
            out.push(LeakPath::new(
                format!("s{side}"),
                compression_key(other, 1),
                Leak::Radial(PocketKind::Suction),
            ));
            for k in 1..n {
                out.push(LeakPath::new(
                    compression_key(side, k),
                    compression_key(other, k + 1),
                    Leak::Radial(PocketKind::Compression(k)),
                ));
            }
        }
        if n == 1 {
            for side in [1, 2] {
                out.push(LeakPath::new(format!("s{side}"), "ddd", Leak::CentreToSuction));
            }
        }
        out
    }
}

pub fn compression_key(side: usize, pair: usize) -> String {
    format!("c{side}.{pair}")
}

/// One chamber's volume function.
#[derive(Debug, Clone, Copy)]
pub struct Pocket {
    pub geo: IdealScroll,
    pub kind: PocketKind,
}

impl VolumeFunction for Pocket {
    fn volume(&self, theta: f64) -> (f64, f64) {
        self.geo.volume(self.kind, theta)
    }

    fn involute_angles(&self, theta: f64) -> Option<InvoluteSpan> {
        self.geo.involute_span(self.kind, theta)
    }
}

impl ForceGeometry for IdealScroll {
    fn wrap_height(&self) -> f64 {
        self.wrap_height_m
    }

    fn orbiting_radius(&self) -> f64 {
        self.orbiting_radius_m
    }

    fn phi_ie(&self) -> f64 {
        self.phi_ie_rad
    }

    /// Tangential only, sized so each pocket's torque is its `−p dV/dθ`.
    fn coefficients(&self, _key: &str, shape: ChamberShape, theta: f64, dv: f64) -> ForceCoefficients {
        if shape == ChamberShape::Plenum {
            return ForceCoefficients::default();
        }
        let big_theta = self.phi_ie_rad - FRAC_PI_2 - theta;
        ForceCoefficients::from_volume_rate(big_theta, dv, self.orbiting_radius_m)
    }

    /// The wrap tips at the centre see discharge pressure.
    fn tip_area(&self, key: &str, _shape: ChamberShape) -> f64 {
        match key {
            "dd" | "ddd" => 2.0 * self.wrap_thickness_m * (self.orbiting_radius_m + self.wrap_thickness_m),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn geo(pairs: usize) -> IdealScroll {
        IdealScroll {
            displacement_m3: 1.048e-4,
            volume_ratio: 2.2,
            wrap_height_m: 0.03,
            orbiting_radius_m: 0.005,
            phi_ie_rad: 20.0,
            theta_d: 3.5,
            suction_clearance_m3: 2e-6,
            wrap_thickness_m: 0.004,
            dead_volume_m3: 2e-6,
            compression_pairs: pairs,
            plenum_volume_m3: 5e-4,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12 * a.abs().max(b.abs()).max(1e-9)
    }

    #[test]
    fn successions_are_volume_continuous() {
        for pairs in [1, 2, 3] {
            let g = geo(pairs);
            let s_end = g.volume(PocketKind::Suction, TAU).0;
            assert!(close(s_end, g.volume(PocketKind::Compression(1), 0.0).0));
            for k in 1..pairs {
                let end = g.volume(PocketKind::Compression(k), TAU).0;
                assert!(close(end, g.volume(PocketKind::Compression(k + 1), 0.0).0));
            }
            let at_d = g.volume(PocketKind::Compression(pairs), g.theta_d).0;
            assert!(close(at_d, g.volume(PocketKind::Discharge, g.theta_d).0));
            let merged_before = g.volume(PocketKind::Merged, g.theta_d - 1e-12).0;
            assert!((merged_before - g.dead_volume_m3).abs() < 1e-15);
        }
    }

    #[test]
    fn merge_sums_the_sources() {
        let g = geo(2);
        let theta = 5.0;
        let sources = 2.0 * g.volume(PocketKind::Discharge, theta).0 + g.volume(PocketKind::Centre, theta).0;
        assert!(close(sources, g.volume(PocketKind::Merged, theta).0));
    }

    #[test]
    fn displacement_and_ratio_hold() {
        let g = geo(2);
        let swept = 2.0 * (g.volume(PocketKind::Suction, TAU).0 - g.volume(PocketKind::Suction, 0.0).0);
        assert!(close(swept, g.displacement_m3));
        let ratio = g.volume(PocketKind::Compression(1), 0.0).0
            / g.volume(PocketKind::Compression(2), g.theta_d).0;
        assert!(close(ratio, g.volume_ratio));
    }

    #[test]
    fn chamber_order_and_count() {
        let keys: Vec<String> = geo(2).chambers().into_iter().map(|(k, _, _)| k).collect();
        assert_eq!(
            keys,
            ["sa", "s1", "s2", "c1.1", "c2.1", "c1.2", "c2.2", "d1", "d2", "dd", "ddd"]
        );
    }

    #[test]
    fn pocket_torque_matches_pdv() {
        let g = geo(2);
        let (theta, dv, p) = (1.3, -4e-6, 2.5e5);
        let k = g.coefficients("c1.1", ChamberShape::Compression, theta, dv);
        let big = g.phi_ie_rad - FRAC_PI_2 - theta;
        let (s, c) = big.sin_cos();
        let tau = g.orbiting_radius_m * (c * p * k.fy - s * p * k.fx);
        assert!((tau + p * dv).abs() < 1e-9);
    }

    #[test]
    fn discharge_pockets_are_born_full_just_short_of_discharge() {
        let g = geo(2);
        let birth = g.theta_d - pd_sim::events::APPROACH_GAP;
        let (v_born, _) = g.volume(PocketKind::Discharge, birth);
        assert!(close(v_born, g.pocket_at_discharge()));
        let (v_last, _) = g.volume(PocketKind::Compression(2), birth);
        assert!((v_born - v_last).abs() < 1e-9 * v_last);
        // The merged chamber is nearly emptied into the centre at the same angle
        let (v_ddd, _) = g.volume(PocketKind::Merged, birth);
        assert!((v_ddd - g.dead_volume_m3).abs() < 1e-12);
    }

    #[test]
    fn merged_volume_is_periodic() {
        let g = geo(3);
        assert!(close(g.volume(PocketKind::Merged, 0.0).0, g.volume(PocketKind::Merged, TAU).0));
    }

    #[test]
    fn last_pair_is_gone_after_discharge() {
        let g = geo(2);
        assert!(g.is_live(PocketKind::Compression(2), g.theta_d));
        assert!(!g.is_live(PocketKind::Compression(2), g.theta_d + 0.1));
        assert!(g.is_live(PocketKind::Compression(1), 6.0));
        assert_eq!(g.compression_pockets_alive(1.0), 2);
        assert_eq!(g.compression_pockets_alive(4.0), 1);
        assert_eq!(geo(1).compression_pockets_alive(4.0), 0);
    }

    #[test]
    fn leakage_paths_follow_pairs() {
        let keys = |g: IdealScroll| -> Vec<(String, String, Leak)> {
            g.leakage_paths()
                .into_iter()
                .map(|p| (p.key1, p.key2, p.leak))
                .collect()
        };
        let two = keys(geo(2));
        assert_eq!(two.len(), 10);
        assert!(two.contains(&("c1.1".into(), "c1.2".into(), Leak::Flank)));
        assert!(two.contains(&("c2.2".into(), "ddd".into(), Leak::Flank)));
        assert!(two.contains(&(
            "c2.1".into(),
            "c1.2".into(),
            Leak::Radial(PocketKind::Compression(1))
        )));
        assert!(two.iter().all(|(_, _, l)| *l != Leak::CentreToSuction));

        let one = keys(geo(1));
        assert_eq!(one.len(), 8);
        assert!(one.contains(&("s2".into(), "ddd".into(), Leak::CentreToSuction)));
    }

    #[test]
    fn radial_throat_opens_with_suction_wall() {
        let g = geo(2);
        let suction = PocketKind::Suction;
        assert_eq!(g.radial_leak_area(1e-5, suction, 0.0), 0.0);
        let a1 = g.radial_leak_area(1e-5, suction, 1.0);
        let a2 = g.radial_leak_area(1e-5, suction, 2.0);
        assert!(a1 > 0.0 && a2 > a1);
        assert_eq!(g.radial_leak_area(1e-5, PocketKind::Plenum, 1.0), 0.0);
        assert!(close(g.flank_leak_area(1e-5), 3e-7));
    }

    proptest! {
        #[test]
        fn pocket_volumes_stay_positive(theta in 0.0..TAU, pairs in 1usize..5, ratio in 1.1f64..4.0) {
            let g = IdealScroll { volume_ratio: ratio, ..geo(pairs) };
            for (_, kind, _) in g.chambers() {
                if !g.is_live(kind, theta) {
                    continue;
                }
                let (v, _) = g.volume(kind, theta);
                prop_assert!(v > 0.0, "{kind:?} at {theta}");
            }
        }

        #[test]
        fn compression_pockets_shrink(theta in 0.0..TAU, pairs in 1usize..5) {
            let g = geo(pairs);
            for k in 1..=pairs {
                prop_assert!(g.volume(PocketKind::Compression(k), theta).1 < 0.0);
            }
            prop_assert!(g.volume(PocketKind::Suction, theta).1 > 0.0);
        }
    }
}
