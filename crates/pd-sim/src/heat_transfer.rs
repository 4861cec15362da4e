//! Chamber wall heat transfer.

use pd_fluids::FluidState;

use crate::control_volume::{ChamberShape, InvoluteSpan};

/// What a heat-transfer model gets to see for one chamber at one angle.
#[derive(Debug, Clone, Copy)]
pub struct HeatTransferInput<'a> {
    pub key: &'a str,
    pub shape: ChamberShape,
    pub theta: f64,
    pub state: &'a FluidState,
    pub volume_m3: f64,
    pub span: Option<InvoluteSpan>,
    pub t_wall_k: f64,
}

/// Heat into the gas [W]; positive when the wall is hotter.
pub trait HeatTransferModel: Send + Sync {
    fn heat_rate(&self, input: &HeatTransferInput<'_>) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Adiabatic;

impl HeatTransferModel for Adiabatic {
    fn heat_rate(&self, _input: &HeatTransferInput<'_>) -> f64 {
        0.0
    }
}

/// Convective exchange with walls at the lump temperature.
///
/// Area is the two plates (`2 V / h`) plus, when the chamber reports its
/// involute span, both flank walls `h · r_b · (φ_max² − φ_min²)`.
#[derive(Debug, Clone, Copy)]
pub struct WallConvection {
    pub htc_w_per_m2k: f64,
    pub wrap_height_m: f64,
    pub base_radius_m: f64,
    /// Plenum and other non-pocket chambers exchange nothing with the wraps.
    pub skip_plenum: bool,
}

impl WallConvection {
    pub fn area(&self, volume_m3: f64, span: Option<InvoluteSpan>) -> f64 {
        let plates = 2.0 * volume_m3 / self.wrap_height_m;
        let flanks = span
            .map(|s| self.wrap_height_m * self.base_radius_m * (s.phi_max.powi(2) - s.phi_min.powi(2)).abs())
            .unwrap_or(0.0);
        plates + flanks
    }
}

impl HeatTransferModel for WallConvection {
    fn heat_rate(&self, input: &HeatTransferInput<'_>) -> f64 {
        if self.skip_plenum && input.shape == ChamberShape::Plenum {
            return 0.0;
        }
        let area = self.area(input.volume_m3, input.span);
        self.htc_w_per_m2k * area * (input.t_wall_k - input.state.t_k())
    }
}
