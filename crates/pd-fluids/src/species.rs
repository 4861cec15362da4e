//! Working fluids.

use pd_core::units::constants::{P_REF_PA, T_REF_K};

const R_UNIVERSAL: f64 = 8.314_462_618;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Air,
    N2,
    O2,
    CO2,
    He,
    Ar,
    /// Refrigerant R134a
    R134a,
    /// Refrigerant R32
    R32,
    /// Refrigerant R1234yf
    R1234yf,
    Propane,
}

impl Species {
    pub const ALL: [Species; 10] = [
        Species::Air,
        Species::N2,
        Species::O2,
        Species::CO2,
        Species::He,
        Species::Ar,
        Species::R134a,
        Species::R32,
        Species::R1234yf,
        Species::Propane,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Species::Air => "Air",
            Species::N2 => "N2",
            Species::O2 => "O2",
            Species::CO2 => "CO2",
            Species::He => "He",
            Species::Ar => "Ar",
            Species::R134a => "R134a",
            Species::R32 => "R32",
            Species::R1234yf => "R1234yf",
            Species::Propane => "Propane",
        }
    }

    /// Molar mass [kg/mol].
    pub fn molar_mass(&self) -> f64 {
        match self {
            Species::Air => 0.028_965,
            Species::N2 => 0.028_013,
            Species::O2 => 0.031_999,
            Species::CO2 => 0.044_010,
            Species::He => 0.004_003,
            Species::Ar => 0.039_948,
            Species::R134a => 0.102_03,
            Species::R32 => 0.052_024,
            Species::R1234yf => 0.114_04,
            Species::Propane => 0.044_097,
        }
    }

    /// Specific gas constant [J/(kg·K)].
    pub fn gas_constant(&self) -> f64 {
        R_UNIVERSAL / self.molar_mass()
    }

    /// Ideal-gas cp near room temperature [J/(kg·K)].
    pub fn cp0(&self) -> f64 {
        match self {
            Species::Air => 1005.0,
            Species::N2 => 1040.0,
            Species::O2 => 918.0,
            Species::CO2 => 844.0,
            Species::He => 5193.0,
            Species::Ar => 520.3,
            Species::R134a => 852.0,
            Species::R32 => 822.0,
            Species::R1234yf => 880.0,
            Species::Propane => 1670.0,
        }
    }

    pub fn cv0(&self) -> f64 {
        self.cp0() - self.gas_constant()
    }

    /// Reference state (T, p) where ideal-gas entropy is zero.
    pub fn entropy_reference(&self) -> (f64, f64) {
        (T_REF_K, P_REF_PA)
    }

    #[cfg(feature = "coolprop")]
    pub(crate) fn rfluids_pure(&self) -> rfluids::substance::Pure {
        use rfluids::substance::Pure;
        match self {
            Species::Air => Pure::Air,
            Species::N2 => Pure::Nitrogen,
            Species::O2 => Pure::Oxygen,
            Species::CO2 => Pure::CarbonDioxide,
            Species::He => Pure::Helium,
            Species::Ar => Pure::Argon,
            Species::R134a => Pure::R134a,
            Species::R32 => Pure::R32,
            Species::R1234yf => Pure::R1234yf,
            Species::Propane => Pure::nPropane,
        }
    }
}

impl std::str::FromStr for Species {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Species::ALL
            .into_iter()
            .find(|sp| sp.key().eq_ignore_ascii_case(wanted))
            .ok_or("unknown species")
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_roundtrip() {
        for sp in Species::ALL {
            assert_eq!(sp.key().parse::<Species>().unwrap(), sp);
        }
        assert_eq!("r134A".parse::<Species>().unwrap(), Species::R134a);
        assert!("unobtainium".parse::<Species>().is_err());
    }

    #[test]
    fn air_gas_constant() {
        assert!((Species::Air.gas_constant() - 287.05).abs() < 0.1);
        assert!(Species::Air.cv0() > 700.0 && Species::Air.cv0() < 730.0);
    }
}
