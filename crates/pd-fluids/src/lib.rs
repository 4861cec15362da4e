//! pd-fluids: fluid property service for the chamber simulator.
//!
//! Provides:
//! - Species definitions with ideal-gas constants
//! - Immutable thermodynamic state snapshots (`FluidState`)
//! - The `FluidModel` trait: state from any two independent properties
//! - An ideal-gas backend (always available)
//! - A CoolProp backend via `rfluids` (feature `coolprop`)
//!
//! # Example
//!
//! ```
//! use pd_fluids::{FluidModel, IdealGasModel, Species, StateInput};
//! use pd_core::units::{k, pa};
//!
//! let model = IdealGasModel::new();
//! let state = model
//!     .state(StateInput::PT { p: pa(101_325.0), t: k(300.0) }, Species::Air)
//!     .unwrap();
//! assert!(state.rho_kg_m3() > 1.0);
//! ```

#[cfg(feature = "coolprop")]
pub mod coolprop;
pub mod error;
pub mod ideal_gas;
pub mod model;
pub mod species;
pub mod state;

#[cfg(feature = "coolprop")]
pub use coolprop::CoolPropModel;
pub use error::{FluidError, FluidResult};
pub use ideal_gas::IdealGasModel;
pub use model::{FluidModel, Property};
pub use species::Species;
pub use state::{FluidState, SpecEnergy, SpecEnthalpy, SpecEntropy, SpecHeatCapacity, StateInput};
